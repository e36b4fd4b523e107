use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,

    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'L', long, value_name = "LEVEL", default_value = "info", global = true)]
    pub log_level: String,

    /// Run browser in headless mode
    #[arg(long, global = true)]
    pub headless: bool,

    /// Timeout for page navigation (in seconds)
    #[arg(long, value_name = "SECS", global = true)]
    pub browser_timeout: Option<u64>,

    /// WebDriver endpoint, e.g. http://localhost:4444
    #[arg(long, value_name = "URL", global = true)]
    pub webdriver: Option<String>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Log in and store the session cookies
    Login {
        /// Wait for a login completed by hand in a visible browser
        #[arg(long)]
        manual: bool,
    },

    /// Scrape a people-search listing into a table
    Scrape {
        /// Search results URL to start from
        #[arg(short, long)]
        url: String,

        /// Output CSV file path
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Number of result pages to walk
        #[arg(long)]
        max_pages: Option<usize>,

        /// Also keep the unflattened records as JSON
        #[arg(long, value_name = "FILE")]
        records: Option<PathBuf>,
    },

    /// Send a connection request with a note
    Connect {
        /// Profile URL to connect with
        #[arg(short, long)]
        profile: String,

        /// Note sent along with the invitation
        #[arg(short, long)]
        message: String,
    },

    /// Rebuild the output table from saved records
    Flatten {
        /// JSON records written by a previous scrape
        #[arg(short, long, value_name = "FILE")]
        records: PathBuf,

        /// Output CSV file path
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
}

impl Default for CliArgs {
    fn default() -> Self {
        Self {
            command: Command::Login { manual: false },
            config: None,
            log_level: "info".to_string(),
            headless: false,
            browser_timeout: None,
            webdriver: None,
        }
    }
}

impl CliArgs {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(format!(
                "Invalid log level '{}'. Valid levels are: {}",
                self.log_level,
                valid_levels.join(", ")
            ));
        }

        if self.browser_timeout == Some(0) {
            return Err("browser-timeout must be greater than 0".to_string());
        }

        match &self.command {
            Command::Scrape { url, max_pages, .. } => {
                if !url.starts_with("http://") && !url.starts_with("https://") {
                    return Err(format!("'{}' is not a search results URL", url));
                }
                if *max_pages == Some(0) {
                    return Err("max-pages must be greater than 0".to_string());
                }
            }
            Command::Connect { profile, message } => {
                if !profile.starts_with("http://") && !profile.starts_with("https://") {
                    return Err(format!("'{}' is not a profile URL", profile));
                }
                if message.trim().is_empty() {
                    return Err("message cannot be empty".to_string());
                }
            }
            Command::Login { .. } | Command::Flatten { .. } => {}
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_scrape_with_global_flags() {
        let args = CliArgs::try_parse_from([
            "talent-scout",
            "scrape",
            "--url",
            "https://www.linkedin.com/search/results/people/?keywords=rust",
            "--max-pages",
            "3",
            "-L",
            "debug",
            "--headless",
        ])
        .unwrap();

        assert!(args.headless);
        assert_eq!(args.log_level, "debug");
        assert!(matches!(args.command, Command::Scrape { max_pages: Some(3), .. }));
        assert!(args.validate().is_ok());
    }

    #[test]
    fn rejects_bad_log_level_and_zero_pages() {
        let args = CliArgs {
            log_level: "loud".into(),
            ..CliArgs::default()
        };
        assert!(args.validate().is_err());

        let args = CliArgs {
            command: Command::Scrape {
                url: "https://www.linkedin.com/search/results/people/".into(),
                output: None,
                max_pages: Some(0),
                records: None,
            },
            ..CliArgs::default()
        };
        assert!(args.validate().is_err());
    }

    #[test]
    fn connect_requires_a_message() {
        let args = CliArgs {
            command: Command::Connect {
                profile: "https://www.linkedin.com/in/jane/".into(),
                message: "  ".into(),
            },
            ..CliArgs::default()
        };
        assert!(args.validate().is_err());
    }
}
