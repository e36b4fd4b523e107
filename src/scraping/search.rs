use std::collections::HashSet;

use super::dom::{parse_result_cards, RESULT_CARD};
use super::models::ProfileRecord;
use super::navigator::PageNavigator;
use super::profile::ProfileExtractor;
use crate::browser::{BrowserDriver, Selector};
use crate::error::AppError;
use crate::processor::{ProgressTracker, ResultSink};
use crate::session::Session;
use crate::shutdown::ShutdownSignal;

const NEXT_PAGE: &str = r#"button[aria-label="Next"]"#;

/// What happened during one walk, besides the records themselves.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct WalkReport {
    pub pages: usize,
    pub skipped_cards: usize,
    /// Profiles kept without experience/education because their page failed.
    pub failed_profiles: Vec<String>,
    pub interrupted: bool,
}

/// Walks a paginated people-search listing and enriches every card.
pub struct SearchWalker<'a> {
    extractor: ProfileExtractor,
    max_pages: usize,
    progress: &'a ProgressTracker,
    shutdown: Option<ShutdownSignal>,
}

impl<'a> SearchWalker<'a> {
    pub fn new(extractor: ProfileExtractor, max_pages: usize, progress: &'a ProgressTracker) -> Self {
        Self {
            extractor,
            max_pages,
            progress,
            shutdown: None,
        }
    }

    pub fn with_shutdown(mut self, shutdown: ShutdownSignal) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    fn stop_requested(&self) -> bool {
        self.shutdown.as_ref().is_some_and(ShutdownSignal::is_requested)
    }

    pub async fn walk<B: BrowserDriver>(
        &self,
        navigator: &PageNavigator<'_, B>,
        session: &Session,
        search_url: &str,
        sink: &mut ResultSink,
    ) -> Result<WalkReport, AppError> {
        navigator.inject_session(session).await?;
        navigator
            .open(search_url, navigator.config().navigation_timeout())
            .await?;

        let browser = navigator.browser();
        let mut report = WalkReport::default();
        let mut seen = HashSet::new();

        loop {
            report.pages += 1;

            if navigator.wait_for(&Selector::css(RESULT_CARD)).await?.is_none() {
                tracing::warn!("No result cards on page {}", report.pages);
            }
            let cards = parse_result_cards(&browser.content().await?)?;
            self.progress.log_page(report.pages, cards.len());
            tracing::info!("Page {}: {} result cards", report.pages, cards.len());

            for (index, card) in cards.into_iter().enumerate() {
                if self.stop_requested() {
                    report.interrupted = true;
                    return Ok(report);
                }

                let summary = match card {
                    Ok(summary) => summary,
                    Err(e) => {
                        tracing::warn!("Skipping card {} on page {}: {}", index, report.pages, e);
                        report.skipped_cards += 1;
                        continue;
                    }
                };
                if !seen.insert(summary.profile_url.clone()) {
                    tracing::debug!("Already visited {}", summary.profile_url);
                    continue;
                }

                self.progress.log_profile(&summary.name, sink.len());
                let url = summary.profile_url.clone();
                let record = match self.extractor.extract(navigator, summary.clone()).await {
                    Ok(record) => record,
                    Err(e) if e.is_fatal() => return Err(e),
                    Err(e) => {
                        tracing::warn!("Error extracting experience for {}: {}", url, e);
                        report.failed_profiles.push(url);
                        ProfileRecord::summary_only(summary)
                    }
                };
                sink.push(record);
            }

            if report.pages >= self.max_pages {
                tracing::info!("Reached page cap of {}", self.max_pages);
                break;
            }

            match browser.query_first(&Selector::css(NEXT_PAGE)).await? {
                Some(next) => {
                    browser.click(&next).await?;
                    navigator.settle().await;
                    navigator.check_session().await?;
                }
                None => {
                    tracing::info!("No next page after page {}", report.pages);
                    break;
                }
            }
        }

        Ok(report)
    }
}
