use std::fmt;
use std::path::Path;
use std::time::Duration;

use crate::browser::{BrowserController, WebDriverBrowser};
use crate::cli::Command;
use crate::config::AppConfig;
use crate::error::AppError;
use crate::processor::{ProgressTracker, ResultSink};
use crate::scraping::{
    with_session_retry, ConnectionRequester, PageNavigator, ProfileExtractor, SearchWalker,
    WalkReport,
};
use crate::session::{CredentialStore, LoginMethod, SessionManager, SessionProvider};
use crate::shutdown::ShutdownSignal;

const MANUAL_LOGIN_WAIT: Duration = Duration::from_secs(300);

/// Outcome of one top-level command.
#[derive(Debug, Clone, PartialEq)]
pub enum RunStatus {
    Success { profiles: usize },
    LoggedIn,
    Sent,
    AuthFailed(String),
    SessionExpired(String),
    ActionUnavailable(String),
    PartialFailure { profiles: usize, details: String },
    Failed(String),
}

impl RunStatus {
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            RunStatus::Success { .. } | RunStatus::LoggedIn | RunStatus::Sent
        )
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            s if s.is_success() => 0,
            RunStatus::PartialFailure { .. } => 2,
            _ => 1,
        }
    }

    fn from_walk(profiles: usize, report: &WalkReport) -> Self {
        let mut problems = Vec::new();
        if !report.failed_profiles.is_empty() {
            problems.push(format!(
                "{} profiles without details ({})",
                report.failed_profiles.len(),
                report.failed_profiles.join(", ")
            ));
        }
        if report.skipped_cards > 0 {
            problems.push(format!("{} unreadable result cards", report.skipped_cards));
        }
        if report.interrupted {
            problems.push(format!("interrupted on page {}", report.pages));
        }

        if problems.is_empty() {
            RunStatus::Success { profiles }
        } else {
            RunStatus::PartialFailure {
                profiles,
                details: problems.join("; "),
            }
        }
    }
}

impl From<AppError> for RunStatus {
    fn from(err: AppError) -> Self {
        match err {
            AppError::AuthError(reason) => RunStatus::AuthFailed(reason),
            AppError::SessionExpired(reason) => RunStatus::SessionExpired(reason),
            AppError::ActionUnavailable(reason) => RunStatus::ActionUnavailable(reason),
            other => RunStatus::Failed(other.to_string()),
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Success { profiles } => write!(f, "Done ({} profiles)", profiles),
            RunStatus::LoggedIn => write!(f, "Logged in, session saved"),
            RunStatus::Sent => write!(f, "Connection request sent"),
            RunStatus::AuthFailed(reason) => write!(f, "Authentication failed: {}", reason),
            RunStatus::SessionExpired(reason) => write!(f, "Session expired: {}", reason),
            RunStatus::ActionUnavailable(reason) => {
                write!(f, "Connect action unavailable: {}", reason)
            }
            RunStatus::PartialFailure { profiles, details } => {
                write!(f, "Partial failure ({} profiles saved): {}", profiles, details)
            }
            RunStatus::Failed(reason) => write!(f, "Failed: {}", reason),
        }
    }
}

pub struct App {
    config: AppConfig,
    progress: ProgressTracker,
    shutdown: ShutdownSignal,
}

impl App {
    pub fn new_with_config(config: AppConfig, shutdown: ShutdownSignal) -> Self {
        Self {
            config,
            progress: ProgressTracker::new(),
            shutdown,
        }
    }

    pub async fn run(&self, command: &Command) -> RunStatus {
        let result = match command {
            Command::Login { manual } => self.login(*manual).await,
            Command::Scrape {
                url,
                output,
                max_pages,
                records,
            } => {
                let output = output.as_deref().unwrap_or(&self.config.output.path);
                let records = records.as_deref().or(self.config.output.records_path.as_deref());
                let max_pages = max_pages.unwrap_or(self.config.scrape.max_pages);
                self.scrape(url, output, max_pages, records).await
            }
            Command::Connect { profile, message } => self.connect(profile, message).await,
            Command::Flatten { records, output } => {
                let output = output.as_deref().unwrap_or(&self.config.output.path);
                Self::flatten(records, output)
            }
        };

        match result {
            Ok(status) => status,
            Err(e) => {
                tracing::error!("{}", e);
                self.progress.complete("Stopped");
                RunStatus::from(e)
            }
        }
    }

    fn session_manager(&self, headless: bool) -> SessionManager {
        SessionManager::new(
            CredentialStore::new(&self.config.session.cookie_path),
            BrowserController::new(&self.config.browser).with_headless(headless),
            self.config.site.clone(),
            self.config.credentials.clone(),
        )
    }

    async fn launch_browser(&self) -> Result<WebDriverBrowser, AppError> {
        self.progress.start("Initializing browser");
        BrowserController::new(&self.config.browser).launch().await
    }

    async fn close_browser(browser: WebDriverBrowser) {
        if let Err(e) = browser.quit().await {
            tracing::warn!("Failed to close browser: {}", e);
        }
    }

    async fn login(&self, manual: bool) -> Result<RunStatus, AppError> {
        self.progress.start("Logging in");
        if manual {
            // a human has to see the browser to log in by hand
            self.session_manager(false)
                .login_with(LoginMethod::Manual {
                    wait: MANUAL_LOGIN_WAIT,
                })
                .await?;
        } else {
            self.session_manager(self.config.browser.login_headless)
                .refresh_session()
                .await?;
        }
        self.progress.complete("Login complete");
        Ok(RunStatus::LoggedIn)
    }

    async fn scrape(
        &self,
        url: &str,
        output: &Path,
        max_pages: usize,
        records: Option<&Path>,
    ) -> Result<RunStatus, AppError> {
        let sessions = self.session_manager(self.config.browser.login_headless);
        let browser = self.launch_browser().await?;
        self.progress.start("Scraping search results");

        let result = self.walk(&browser, &sessions, url, max_pages).await;
        Self::close_browser(browser).await;
        let (sink, report) = result?;

        self.progress.start("Writing output");
        Self::write_outputs(&sink, output, records)?;

        self.progress
            .complete(&format!("Scraped {} profiles from {} pages", sink.len(), report.pages));
        Ok(RunStatus::from_walk(sink.len(), &report))
    }

    async fn walk(
        &self,
        browser: &WebDriverBrowser,
        sessions: &SessionManager,
        url: &str,
        max_pages: usize,
    ) -> Result<(ResultSink, WalkReport), AppError> {
        let navigator = PageNavigator::new(browser, &self.config.site, &self.config.browser);
        let walker = SearchWalker::new(
            ProfileExtractor::new(&self.config.scrape),
            max_pages,
            &self.progress,
        )
        .with_shutdown(self.shutdown.clone());

        let navigator = &navigator;
        let walker = &walker;
        with_session_retry(sessions, |session| async move {
            // a retried walk starts over with an empty collection
            let mut sink = ResultSink::new();
            let report = walker.walk(navigator, &session, url, &mut sink).await?;
            Ok((sink, report))
        })
        .await
    }

    async fn connect(&self, profile: &str, message: &str) -> Result<RunStatus, AppError> {
        let requester = ConnectionRequester::new(self.config.connect.max_note_chars);
        requester.validate_note(message)?;

        let sessions = self.session_manager(self.config.browser.login_headless);
        let browser = self.launch_browser().await?;
        self.progress.start("Sending connection request");

        let navigator = PageNavigator::new(&browser, &self.config.site, &self.config.browser);
        let result = {
            let navigator = &navigator;
            let requester = &requester;
            with_session_retry(&sessions, |session| async move {
                requester
                    .send_connection(navigator, &session, profile, message)
                    .await
            })
            .await
        };
        Self::close_browser(browser).await;

        result?;
        self.progress.complete("Connection request sent");
        Ok(RunStatus::Sent)
    }

    /// Raw records go first so a failed table write can be redone with `flatten`.
    fn write_outputs(
        sink: &ResultSink,
        output: &Path,
        records: Option<&Path>,
    ) -> Result<(), AppError> {
        if let Some(records) = records {
            sink.write_records(records)?;
        }
        sink.flatten_and_write(output)
    }

    fn flatten(records: &Path, output: &Path) -> Result<RunStatus, AppError> {
        let sink = ResultSink::read_records(records)?;
        sink.flatten_and_write(output)?;
        Ok(RunStatus::Success {
            profiles: sink.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scraping::models::{ProfileRecord, ProfileSummary};

    #[test]
    fn errors_map_to_statuses() {
        let status = RunStatus::from(AppError::AuthError("wrong password".into()));
        assert_eq!(status.to_string(), "Authentication failed: wrong password");
        assert_eq!(status.exit_code(), 1);

        let status = RunStatus::from(AppError::ActionUnavailable("no connect button".into()));
        assert_eq!(status.to_string(), "Connect action unavailable: no connect button");

        let status = RunStatus::from(AppError::NavigationTimeout {
            url: "https://www.linkedin.com/in/jane/".into(),
            secs: 90,
        });
        assert!(matches!(status, RunStatus::Failed(_)));
    }

    #[test]
    fn walk_with_failures_is_partial() {
        let clean = WalkReport {
            pages: 1,
            ..WalkReport::default()
        };
        let status = RunStatus::from_walk(10, &clean);
        assert_eq!(status.to_string(), "Done (10 profiles)");
        assert!(status.is_success());

        let failed = WalkReport {
            pages: 1,
            skipped_cards: 1,
            failed_profiles: vec!["https://www.linkedin.com/in/jane/".into()],
            interrupted: false,
        };
        let status = RunStatus::from_walk(9, &failed);
        assert!(matches!(status, RunStatus::PartialFailure { profiles: 9, .. }));
        assert_eq!(status.exit_code(), 2);
        assert!(status.to_string().contains("1 unreadable result cards"));
    }

    #[test]
    fn flatten_rebuilds_the_table_from_records() {
        let dir = tempfile::tempdir().unwrap();
        let records = dir.path().join("records.json");
        let output = dir.path().join("profiles.csv");
        ResultSink::from_records(vec![ProfileRecord::summary_only(ProfileSummary {
            name: "Jane Doe".into(),
            profile_url: "https://www.linkedin.com/in/jane".into(),
            ..Default::default()
        })])
        .write_records(&records)
        .unwrap();

        let status = App::flatten(&records, &output).unwrap();
        assert_eq!(status, RunStatus::Success { profiles: 1 });
        assert!(std::fs::read_to_string(&output).unwrap().starts_with("Name,"));
    }

    #[test]
    fn records_survive_a_failed_table_write() {
        let dir = tempfile::tempdir().unwrap();
        let records = dir.path().join("records.json");
        let output = dir.path().join("missing/dir/profiles.csv");
        let sink = ResultSink::from_records(vec![ProfileRecord::summary_only(ProfileSummary {
            name: "Jane Doe".into(),
            profile_url: "https://www.linkedin.com/in/jane".into(),
            ..Default::default()
        })]);

        let result = App::write_outputs(&sink, &output, Some(records.as_path()));

        assert!(matches!(result, Err(AppError::SerializationError(_))));
        let reloaded = ResultSink::read_records(&records).unwrap();
        assert_eq!(reloaded.records(), sink.records());
    }
}
