//! README and GitHub Actions workflow generation

use serde::Deserialize;

use crate::deploy::{Platform, CONTAINER_PORT, REQUIRED_ENV_VARS};

fn default_project_name() -> String {
    "DevOpt Platform".to_string()
}

fn default_description() -> String {
    "AI agent analytics, coordination and marketplace backend".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReadmeProject {
    #[serde(default = "default_project_name")]
    pub name: String,
    #[serde(default = "default_description")]
    pub description: String,
    /// Repository owner; falls back to the configured GitHub user
    #[serde(default)]
    pub owner: Option<String>,
}

impl Default for ReadmeProject {
    fn default() -> Self {
        Self {
            name: default_project_name(),
            description: default_description(),
            owner: None,
        }
    }
}

/// Lowercase, dash-separated repository name
pub fn repository_slug(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

pub fn generate_deployment_readme(project: &ReadmeProject) -> String {
    let slug = repository_slug(&project.name);
    let owner = project.owner.as_deref().unwrap_or("your-org");

    let mut readme = format!("# {}\n\n{}\n\n", project.name, project.description);

    readme.push_str("## Quick Start\n\n");
    readme.push_str(&format!(
        "```bash\ngit clone https://github.com/{owner}/{slug}.git\ncd {slug}\ncp .env.example .env\ncargo run --release\n```\n\n"
    ));
    readme.push_str(&format!(
        "Or with Docker:\n\n```bash\ndocker build -t {slug} .\ndocker run -p {port}:{port} --env-file .env {slug}\n```\n\n",
        port = CONTAINER_PORT
    ));

    readme.push_str("## Configuration\n\n| Variable | Purpose |\n| --- | --- |\n");
    for (name, description) in REQUIRED_ENV_VARS {
        readme.push_str(&format!("| `{}` | {} |\n", name, description));
    }

    readme.push_str("\n## Deployment\n\n");
    for platform in Platform::all() {
        readme.push_str(&format!(
            "- **{}**: `cargo run --bin deploy_guide -- {}`\n",
            platform.display_name(),
            platform.slug()
        ));
    }

    readme.push_str(&format!(
        "\nAfter deploying, `GET /health` should report `healthy`.\n\n## Issues\n\nhttps://github.com/{owner}/{slug}/issues\n"
    ));
    readme
}

const WORKFLOW_HEADER: &str = r#"name: Build and Deploy

on:
  push:
    branches: [main]
  pull_request:

env:
  IMAGE_NAME: devopt-backend

jobs:
  build:
    runs-on: ubuntu-latest
    steps:
      - uses: actions/checkout@v4
      - uses: dtolnay/rust-toolchain@stable
      - name: Test
        run: cargo test --all
      - name: Build image
        run: docker build -t $IMAGE_NAME:${{ github.sha }} .
"#;

fn deploy_steps(platform: Platform) -> &'static str {
    match platform {
        Platform::AwsAppRunner => {
            r#"      - uses: aws-actions/configure-aws-credentials@v4
        with:
          aws-access-key-id: ${{ secrets.AWS_ACCESS_KEY_ID }}
          aws-secret-access-key: ${{ secrets.AWS_SECRET_ACCESS_KEY }}
          aws-region: ${{ secrets.AWS_REGION }}
      - name: Start App Runner deployment
        run: aws apprunner start-deployment --service-arn ${{ secrets.APPRUNNER_SERVICE_ARN }}
"#
        }
        Platform::AzureContainerApps => {
            r#"      - uses: azure/login@v2
        with:
          creds: ${{ secrets.AZURE_CREDENTIALS }}
      - name: Deploy container app
        run: az containerapp up --name $IMAGE_NAME --resource-group ${{ secrets.AZURE_RESOURCE_GROUP }} --source .
"#
        }
        Platform::GoogleCloudRun => {
            r#"      - uses: google-github-actions/auth@v2
        with:
          credentials_json: ${{ secrets.GCP_CREDENTIALS }}
      - uses: google-github-actions/setup-gcloud@v2
      - name: Deploy to Cloud Run
        run: gcloud run deploy $IMAGE_NAME --source . --region ${{ secrets.GCP_REGION }} --allow-unauthenticated
"#
        }
        Platform::Heroku => {
            r#"      - name: Push and release container
        env:
          HEROKU_API_KEY: ${{ secrets.HEROKU_API_KEY }}
        run: |
          heroku container:login
          heroku container:push web -a ${{ secrets.HEROKU_APP_NAME }}
          heroku container:release web -a ${{ secrets.HEROKU_APP_NAME }}
"#
        }
    }
}

/// Workflow that tests and builds the image, then deploys once per target on main.
/// Duplicate targets are dropped.
pub fn generate_workflow(targets: &[Platform]) -> String {
    let mut workflow = WORKFLOW_HEADER.to_string();
    let mut seen = Vec::new();
    for &platform in targets {
        if seen.contains(&platform) {
            continue;
        }
        seen.push(platform);

        workflow.push_str(&format!(
            "\n  deploy-{}:\n    name: Deploy to {}\n    needs: build\n    if: github.ref == 'refs/heads/main'\n    runs-on: ubuntu-latest\n    steps:\n      - uses: actions/checkout@v4\n",
            platform.slug(),
            platform.display_name()
        ));
        workflow.push_str(deploy_steps(platform));
    }
    workflow
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug() {
        assert_eq!(repository_slug("DevOpt  Platform"), "devopt-platform");
        assert_eq!(repository_slug("agents"), "agents");
    }

    #[test]
    fn test_readme_contents() {
        let readme = generate_deployment_readme(&ReadmeProject {
            name: "Agent Hub".into(),
            description: "Coordinated agents".into(),
            owner: Some("acme".into()),
        });
        assert!(readme.starts_with("# Agent Hub\n\nCoordinated agents\n"));
        assert!(readme.contains("git clone https://github.com/acme/agent-hub.git"));
        assert!(readme.contains("| `STRIPE_WEBHOOK_SECRET` |"));
        assert!(readme.contains("deploy_guide -- heroku"));
    }

    #[test]
    fn test_readme_defaults() {
        let readme = generate_deployment_readme(&ReadmeProject::default());
        assert!(readme.contains("https://github.com/your-org/devopt-platform.git"));
    }

    #[test]
    fn test_workflow_jobs_per_target() {
        let workflow = generate_workflow(&[Platform::GoogleCloudRun, Platform::Heroku, Platform::GoogleCloudRun]);
        assert!(workflow.contains("  build:\n"));
        assert_eq!(workflow.matches("deploy-gcp:").count(), 1);
        assert!(workflow.contains("deploy-heroku:"));
        assert!(!workflow.contains("deploy-aws:"));
        assert!(workflow.contains("${{ secrets.HEROKU_API_KEY }}"));
    }

    #[test]
    fn test_workflow_without_targets_only_builds() {
        let workflow = generate_workflow(&[]);
        assert!(!workflow.contains("deploy-"));
        assert!(workflow.contains("docker build"));
    }
}
