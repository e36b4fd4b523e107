use std::future::Future;
use std::time::Duration;

use crate::browser::{BrowserDriver, PageHandle, Selector};
use crate::config::{BrowserConfig, SiteConfig};
use crate::error::AppError;
use crate::session::{is_login_url, Session, SessionProvider};

/// A secondary page opened next to the listing page. Must be handed back to
/// [`PageNavigator::close_detail`].
#[derive(Debug)]
pub struct DetailPage {
    handle: PageHandle,
    return_to: PageHandle,
}

/// Opens pages in one browser with an injected session and detects when the
/// site bounces us to its login page.
pub struct PageNavigator<'a, B: BrowserDriver> {
    browser: &'a B,
    site: &'a SiteConfig,
    config: &'a BrowserConfig,
}

impl<'a, B: BrowserDriver> PageNavigator<'a, B> {
    pub fn new(browser: &'a B, site: &'a SiteConfig, config: &'a BrowserConfig) -> Self {
        Self {
            browser,
            site,
            config,
        }
    }

    pub fn browser(&self) -> &'a B {
        self.browser
    }

    pub fn config(&self) -> &'a BrowserConfig {
        self.config
    }

    /// Replaces the browser's cookie jar with `session`, scoped to the site domain.
    /// WebDriver only accepts cookies for the current origin, so the site root is
    /// loaded first.
    pub async fn inject_session(&self, session: &Session) -> Result<(), AppError> {
        self.browser
            .goto(&self.site.base_url, self.config.navigation_timeout())
            .await?;
        self.browser.clear_cookies().await?;
        self.browser
            .add_cookies(&session.scoped_to(&self.site.cookie_domain))
            .await?;
        tracing::debug!("Injected {} session cookies", session.cookies.len());
        Ok(())
    }

    /// Navigates the current page and fails with `SessionExpired` when the site
    /// redirected to a login page.
    pub async fn open(&self, url: &str, timeout: Duration) -> Result<(), AppError> {
        tracing::debug!("Opening {}", url);
        self.browser.goto(url, timeout).await?;
        self.wait_until_ready().await?;
        self.check_session().await
    }

    /// Opens `url` in a new page. On failure the new page is already closed again.
    pub async fn open_detail(&self, url: &str, timeout: Duration) -> Result<DetailPage, AppError> {
        let return_to = self.browser.current_page().await?;
        let handle = self.browser.new_page().await?;
        let page = DetailPage { handle, return_to };

        match self.open(url, timeout).await {
            Ok(()) => Ok(page),
            Err(e) => {
                self.close_detail(page).await;
                Err(e)
            }
        }
    }

    /// Closes a detail page and returns to the page it was opened from. Failures
    /// are logged, never raised, so this is safe on every exit path.
    pub async fn close_detail(&self, page: DetailPage) {
        if let Err(e) = self.browser.close_page(&page.handle, &page.return_to).await {
            tracing::warn!("Failed to close page {:?}: {}", page.handle, e);
        }
    }

    pub async fn check_session(&self) -> Result<(), AppError> {
        let url = self.browser.current_url().await?;
        if is_login_url(&url) {
            tracing::warn!("Redirected to login page: {}", url);
            return Err(AppError::SessionExpired(format!("redirected to {}", url)));
        }
        Ok(())
    }

    /// Waits for `selector` up to the element timeout.
    pub async fn wait_for(&self, selector: &Selector) -> Result<Option<B::Element>, AppError> {
        self.browser
            .wait_for(selector, self.config.element_timeout())
            .await
    }

    /// Fixed pause for UI changes that have no element to wait on.
    pub async fn settle(&self) {
        tokio::time::sleep(self.config.settle_delay()).await;
    }

    async fn wait_until_ready(&self) -> Result<(), AppError> {
        if self.wait_for(&Selector::css("body")).await?.is_none() {
            self.settle().await;
        }
        Ok(())
    }

    pub async fn scroll_by_viewport(&self) -> Result<(), AppError> {
        self.browser
            .evaluate("window.scrollBy(0, window.innerHeight)")
            .await
            .map(|_| ())
    }

    pub async fn scroll_to_bottom(&self) -> Result<(), AppError> {
        self.browser
            .evaluate("window.scrollTo(0, document.body.scrollHeight)")
            .await
            .map(|_| ())
    }
}

/// Runs `operation` with the stored session (logging in first if none is stored).
/// If it fails with `SessionExpired`, refreshes the session exactly once and
/// reruns the whole operation; a second expiry is final.
pub async fn with_session_retry<P, F, Fut, T>(sessions: &P, mut operation: F) -> Result<T, AppError>
where
    P: SessionProvider + ?Sized,
    F: FnMut(Session) -> Fut,
    Fut: Future<Output = Result<T, AppError>>,
{
    let session = match sessions.get_session().await? {
        Some(session) => session,
        None => {
            tracing::info!("No stored session found, logging in");
            sessions.refresh_session().await?
        }
    };

    match operation(session).await {
        Err(AppError::SessionExpired(reason)) => {
            tracing::warn!("Session expired ({}), refreshing and retrying once", reason);
            let fresh = sessions.refresh_session().await?;
            match operation(fresh).await {
                Err(AppError::SessionExpired(reason)) => {
                    tracing::error!("Session expired again after refresh, aborting");
                    Err(AppError::SessionExpired(format!(
                        "still expired after refresh: {}",
                        reason
                    )))
                }
                other => other,
            }
        }
        other => other,
    }
}
