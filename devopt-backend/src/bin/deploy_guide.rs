//! Prints the manual deployment steps for a container host.
//!
//! Run with no arguments for the AWS App Runner walkthrough:
//!   cargo run --bin deploy_guide
//!   cargo run --bin deploy_guide -- heroku

use clap::Parser;
use devopt_backend::deploy::{DeployGuide, Platform};

#[derive(Parser)]
#[command(name = "deploy_guide", about = "Print DevOpt deployment steps")]
struct Args {
    /// Target platform (aws, azure, gcp, heroku)
    platform: Option<Platform>,

    /// List the supported platforms instead of printing a guide
    #[arg(long)]
    list: bool,
}

fn main() {
    let args = Args::parse();

    if args.list {
        for platform in Platform::all() {
            println!("{:<8} {}", platform.slug(), platform.display_name());
        }
        return;
    }

    let guide = DeployGuide::for_platform(args.platform.unwrap_or_default());
    print!("{}", guide.render());
}
