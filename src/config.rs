use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use validator::Validate;

use crate::cli::CliArgs;
use crate::error::AppError;

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct AppConfig {
    #[validate(nested)]
    pub site: SiteConfig,
    #[serde(default)]
    pub credentials: CredentialsConfig,
    #[validate(nested)]
    pub browser: BrowserConfig,
    pub session: SessionConfig,
    #[validate(nested)]
    pub scrape: ScrapeConfig,
    #[validate(nested)]
    pub connect: ConnectConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct SiteConfig {
    #[validate(url(message = "Site base URL must be a URL"))]
    pub base_url: String,
    #[validate(url(message = "Login URL must be a URL"))]
    pub login_url: String,
    /// Domain every injected session cookie is scoped to.
    #[validate(length(min = 1, message = "Cookie domain cannot be empty"))]
    pub cookie_domain: String,
    pub login_timeout_secs: u64,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
pub struct CredentialsConfig {
    #[validate(length(min = 1, message = "Username cannot be empty"))]
    pub username: String,
    #[validate(length(min = 1, message = "Password cannot be empty"))]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct BrowserConfig {
    #[validate(url(message = "WebDriver URL must be a URL"))]
    pub webdriver_url: String,
    pub headless: bool,
    pub login_headless: bool,
    #[validate(range(min = 1, message = "Navigation timeout must be positive"))]
    pub navigation_timeout_secs: u64,
    #[validate(range(min = 1, message = "Profile navigation timeout must be positive"))]
    pub profile_timeout_secs: u64,
    #[validate(range(min = 1, message = "Element timeout must be positive"))]
    pub element_timeout_secs: u64,
    pub settle_delay_ms: u64,
}

impl BrowserConfig {
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }

    pub fn profile_timeout(&self) -> Duration {
        Duration::from_secs(self.profile_timeout_secs)
    }

    pub fn element_timeout(&self) -> Duration {
        Duration::from_secs(self.element_timeout_secs)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionConfig {
    pub cookie_path: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct ScrapeConfig {
    #[validate(range(min = 1, message = "max_pages must be at least 1"))]
    pub max_pages: usize,
    pub scroll_attempts: usize,
    pub scroll_wait_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct ConnectConfig {
    #[validate(range(min = 1, max = 300, message = "Note limit must be between 1 and 300"))]
    pub max_note_chars: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    pub path: PathBuf,
    /// Where the unflattened records are kept, if anywhere.
    pub records_path: Option<PathBuf>,
}

impl AppConfig {
    fn builder() -> Result<config::ConfigBuilder<config::builder::DefaultState>, config::ConfigError> {
        Config::builder()
            .set_default("site.base_url", "https://www.linkedin.com/")?
            .set_default("site.login_url", "https://www.linkedin.com/login")?
            .set_default("site.cookie_domain", ".linkedin.com")?
            .set_default("site.login_timeout_secs", 30)?
            .set_default("browser.webdriver_url", "http://localhost:4444")?
            .set_default("browser.headless", true)?
            .set_default("browser.login_headless", false)?
            .set_default("browser.navigation_timeout_secs", 60)?
            .set_default("browser.profile_timeout_secs", 90)?
            .set_default("browser.element_timeout_secs", 10)?
            .set_default("browser.settle_delay_ms", 3000)?
            .set_default("session.cookie_path", "linkedin_cookies.json")?
            .set_default("scrape.max_pages", 1)?
            .set_default("scrape.scroll_attempts", 3)?
            .set_default("scrape.scroll_wait_ms", 4000)?
            .set_default("connect.max_note_chars", 300)?
            .set_default("output.path", "linkedin_profiles.csv")
    }

    pub fn load_with_cli_args(cli_args: &CliArgs) -> Result<Self, AppError> {
        let mut builder = Self::builder()?.add_source(File::with_name("config").required(false));

        if let Some(config_path) = &cli_args.config {
            builder = builder.add_source(File::from(config_path.as_path()));
        }

        builder = builder.add_source(Environment::with_prefix("SCOUT").separator("__"));

        // CLI flags win over every file and environment source
        if cli_args.headless {
            builder = builder.set_override("browser.headless", true)?;
        }
        if let Some(timeout) = cli_args.browser_timeout {
            builder = builder.set_override("browser.navigation_timeout_secs", timeout as i64)?;
        }
        if let Some(webdriver) = &cli_args.webdriver {
            builder = builder.set_override("browser.webdriver_url", webdriver.as_str())?;
        }

        let app_config: AppConfig = builder.build()?.try_deserialize()?;
        app_config.check()?;
        Ok(app_config)
    }

    /// Runs the `validator` rules. Credentials are checked separately, right before a login.
    fn check(&self) -> Result<(), AppError> {
        self.validate().map_err(|e| {
            AppError::InvalidInput(format!("Configuration validation failed: {}", e))
        })
    }
}
