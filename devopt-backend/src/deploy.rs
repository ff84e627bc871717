//! Deployment walkthrough for the supported container hosts
//!
//! The guide is static text: it never reads the environment, the clock or any
//! random source, so rendering the same platform always yields identical lines.

use serde::Serialize;
use strum::{EnumIter, EnumString, IntoEnumIterator};

/// Repository the hosted service is built from
pub const SOURCE_REPOSITORY: &str = "https://github.com/devopt-platform/devopt-backend";

/// Port the backend listens on inside the container
pub const CONTAINER_PORT: u16 = 5000;

/// Environment variables the deployed service expects
pub const REQUIRED_ENV_VARS: &[(&str, &str)] = &[
    ("OPENAI_API_KEY", "OpenAI key used by agent coordination"),
    ("DATABASE_URL", "SQLite database path"),
    ("SESSION_SECRET", "Random string for session signing"),
    ("STRIPE_SECRET_KEY", "Stripe key for marketplace payments"),
    ("STRIPE_WEBHOOK_SECRET", "Stripe webhook signing secret"),
    ("GITHUB_TOKEN", "Token for repository automation"),
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, EnumIter, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(ascii_case_insensitive)]
pub enum Platform {
    #[default]
    #[strum(serialize = "aws", serialize = "apprunner", serialize = "aws-app-runner")]
    AwsAppRunner,
    #[strum(serialize = "azure", serialize = "containerapps", serialize = "azure-container-apps")]
    AzureContainerApps,
    #[strum(serialize = "gcp", serialize = "cloudrun", serialize = "google-cloud-run")]
    GoogleCloudRun,
    #[strum(serialize = "heroku")]
    Heroku,
}

impl Platform {
    pub fn all() -> Vec<Platform> {
        Platform::iter().collect()
    }

    pub fn slug(&self) -> &'static str {
        match self {
            Platform::AwsAppRunner => "aws",
            Platform::AzureContainerApps => "azure",
            Platform::GoogleCloudRun => "gcp",
            Platform::Heroku => "heroku",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Platform::AwsAppRunner => "AWS App Runner",
            Platform::AzureContainerApps => "Azure Container Apps",
            Platform::GoogleCloudRun => "Google Cloud Run",
            Platform::Heroku => "Heroku",
        }
    }

    fn credentials_command(&self) -> &'static str {
        match self {
            Platform::AwsAppRunner => "aws configure",
            Platform::AzureContainerApps => "az login",
            Platform::GoogleCloudRun => "gcloud auth login",
            Platform::Heroku => "heroku login",
        }
    }

    fn console_url(&self) -> &'static str {
        match self {
            Platform::AwsAppRunner => "https://console.aws.amazon.com/apprunner",
            Platform::AzureContainerApps => "https://portal.azure.com/#create/Microsoft.ContainerApp",
            Platform::GoogleCloudRun => "https://console.cloud.google.com/run",
            Platform::Heroku => "https://dashboard.heroku.com/new-app",
        }
    }

    fn service_kind(&self) -> &'static str {
        match self {
            Platform::AwsAppRunner => "App Runner service",
            Platform::AzureContainerApps => "container app",
            Platform::GoogleCloudRun => "Cloud Run service",
            Platform::Heroku => "Heroku app (container stack)",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.slug())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DeployStep {
    pub number: usize,
    pub title: String,
    pub details: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeployGuide {
    pub platform: Platform,
    pub platform_name: &'static str,
    pub source_repository: &'static str,
    pub steps: Vec<DeployStep>,
}

impl DeployGuide {
    pub fn for_platform(platform: Platform) -> Self {
        let mut steps = Vec::new();
        let mut push = |title: String, details: Vec<String>| {
            steps.push(DeployStep {
                number: steps.len() + 1,
                title,
                details,
            });
        };

        push(
            "Configure cloud credentials".to_string(),
            vec![format!("Run: {}", platform.credentials_command())],
        );
        push(
            "Open the cloud console".to_string(),
            vec![platform.console_url().to_string()],
        );
        push(
            format!("Create the {} from the source repository", platform.service_kind()),
            vec![
                format!("Repository: {}", SOURCE_REPOSITORY),
                "Build: Dockerfile at the repository root".to_string(),
                format!("Port: {}", CONTAINER_PORT),
            ],
        );
        push(
            "Set environment variables".to_string(),
            REQUIRED_ENV_VARS
                .iter()
                .map(|(name, description)| format!("{:<22} {}", name, description))
                .collect(),
        );
        push(
            "Deploy and verify".to_string(),
            vec!["Check https://<service-url>/health returns status \"healthy\"".to_string()],
        );

        Self {
            platform,
            platform_name: platform.display_name(),
            source_repository: SOURCE_REPOSITORY,
            steps,
        }
    }

    /// Render the guide as terminal lines
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![
            format!("DevOpt deployment guide: {}", self.platform_name),
            String::new(),
            "Manual steps to complete:".to_string(),
        ];
        for step in &self.steps {
            lines.push(format!("{}. {}", step.number, step.title));
            for detail in &step.details {
                lines.push(format!("   {}", detail));
            }
        }
        lines.push(String::new());
        lines.push("Deployment preparation complete.".to_string());
        lines
    }

    pub fn render(&self) -> String {
        let mut out = self.lines().join("\n");
        out.push('\n');
        out
    }
}
