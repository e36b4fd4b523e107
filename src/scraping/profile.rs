use std::time::Duration;

use super::dom::{ProfileDocument, EXPERIENCE_BLOCK, EXPERIENCE_LOADED};
use super::models::{EducationEntry, ExperienceEntry, ProfileRecord, ProfileSummary};
use super::navigator::PageNavigator;
use crate::browser::{BrowserDriver, Selector};
use crate::config::ScrapeConfig;
use crate::error::AppError;

/// Reads experience and education from a profile's detail page.
pub struct ProfileExtractor {
    scroll_attempts: usize,
    scroll_wait: Duration,
}

impl ProfileExtractor {
    pub fn new(config: &ScrapeConfig) -> Self {
        Self {
            scroll_attempts: config.scroll_attempts,
            scroll_wait: Duration::from_millis(config.scroll_wait_ms),
        }
    }

    /// Opens `summary.profile_url` in a secondary page, reads it and closes the
    /// page again whatever happened.
    pub async fn extract<B: BrowserDriver>(
        &self,
        navigator: &PageNavigator<'_, B>,
        summary: ProfileSummary,
    ) -> Result<ProfileRecord, AppError> {
        let page = navigator
            .open_detail(&summary.profile_url, navigator.config().profile_timeout())
            .await?;
        let sections = self.read_sections(navigator).await;
        navigator.close_detail(page).await;

        let (experience, education) = sections?;
        tracing::debug!(
            "Extracted {} experience and {} education entries for {}",
            experience.len(),
            education.len(),
            summary.profile_url
        );
        Ok(ProfileRecord::new(summary, experience, education))
    }

    async fn read_sections<B: BrowserDriver>(
        &self,
        navigator: &PageNavigator<'_, B>,
    ) -> Result<(Vec<ExperienceEntry>, Vec<EducationEntry>), AppError> {
        self.load_lazy_sections(navigator).await?;

        if navigator
            .wait_for(&Selector::css(EXPERIENCE_BLOCK))
            .await?
            .is_none()
        {
            tracing::debug!("No experience blocks rendered, continuing without them");
        }

        let source = navigator.browser().content().await?;
        let document = ProfileDocument::parse(&source);
        Ok((document.experience(), document.education()))
    }

    /// The experience section renders lazily as the page scrolls.
    async fn load_lazy_sections<B: BrowserDriver>(
        &self,
        navigator: &PageNavigator<'_, B>,
    ) -> Result<(), AppError> {
        let loaded = Selector::css(EXPERIENCE_LOADED);
        for attempt in 1..=self.scroll_attempts {
            navigator.scroll_by_viewport().await?;
            if navigator
                .browser()
                .wait_for(&loaded, self.scroll_wait)
                .await?
                .is_some()
            {
                tracing::trace!("Experience section loaded after {} scrolls", attempt);
                break;
            }
        }
        Ok(())
    }
}
