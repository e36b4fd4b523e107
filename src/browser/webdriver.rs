use async_trait::async_trait;
use cookie::SameSite;
use fantoccini::cookies::Cookie;
use fantoccini::elements::Element;
use fantoccini::error::{CmdError, ErrorStatus};
use fantoccini::wd::{TimeoutConfiguration, WindowHandle};
use fantoccini::{Client, ClientBuilder, Locator};
use serde_json::{json, Map, Value};
use std::time::Duration;
use tokio::sync::Mutex;

use super::{BrowserDriver, PageHandle, Selector};
use crate::config::BrowserConfig;
use crate::error::AppError;
use crate::session::SessionCookie;

/// Launches WebDriver sessions with the configured capabilities.
pub struct BrowserController {
    webdriver_url: String,
    headless: bool,
    page_load: Duration,
}

const SCRIPT_TIMEOUT: Duration = Duration::from_secs(30);

/// Extra time the client-side timer grants over the driver's own page-load
/// timeout before giving up on the command.
const BACKSTOP_MARGIN: Duration = Duration::from_secs(5);

fn page_load_timeouts(page_load: Duration) -> TimeoutConfiguration {
    TimeoutConfiguration::new(Some(SCRIPT_TIMEOUT), Some(page_load), Some(Duration::ZERO))
}

fn backstop(timeout: Duration) -> Duration {
    timeout + BACKSTOP_MARGIN
}

fn is_driver_timeout(err: &CmdError) -> bool {
    matches!(err, CmdError::Standard(e) if matches!(e.error, ErrorStatus::Timeout))
}

impl BrowserController {
    pub fn new(config: &BrowserConfig) -> Self {
        Self {
            webdriver_url: config.webdriver_url.clone(),
            headless: config.headless,
            page_load: config.navigation_timeout(),
        }
    }

    pub fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    pub async fn launch(&self) -> Result<WebDriverBrowser, AppError> {
        tracing::debug!(
            "Connecting to WebDriver at {} (headless: {})",
            self.webdriver_url,
            self.headless
        );

        let client = ClientBuilder::native()
            .capabilities(self.capabilities())
            .connect(&self.webdriver_url)
            .await
            .map_err(AppError::browser)?;

        let browser = WebDriverBrowser {
            client,
            page_load: Mutex::new(None),
        };
        if let Err(e) = browser.set_page_load_timeout(self.page_load).await {
            if let Err(quit) = browser.quit().await {
                tracing::warn!("Failed to close browser after setup error: {}", quit);
            }
            return Err(e);
        }
        Ok(browser)
    }

    fn capabilities(&self) -> Map<String, Value> {
        let mut chrome_args = vec!["--window-size=1920,1080", "--disable-gpu"];
        let mut firefox_args = vec![];
        if self.headless {
            chrome_args.push("--headless=new");
            firefox_args.push("-headless");
        }

        let mut caps = Map::new();
        caps.insert("goog:chromeOptions".into(), json!({ "args": chrome_args }));
        caps.insert("moz:firefoxOptions".into(), json!({ "args": firefox_args }));
        caps
    }
}

/// A [`BrowserDriver`] backed by a fantoccini WebDriver client.
pub struct WebDriverBrowser {
    client: Client,
    page_load: Mutex<Option<Duration>>,
}

impl WebDriverBrowser {
    /// Makes the driver abort a navigation after `timeout`. A dropped `goto`
    /// future does not stop the navigation, and later commands queue behind it.
    async fn set_page_load_timeout(&self, timeout: Duration) -> Result<(), AppError> {
        let mut current = self.page_load.lock().await;
        if *current != Some(timeout) {
            self.client
                .update_timeouts(page_load_timeouts(timeout))
                .await
                .map_err(AppError::browser)?;
            *current = Some(timeout);
        }
        Ok(())
    }

    pub async fn quit(self) -> Result<(), AppError> {
        self.client.close().await.map_err(AppError::browser)
    }

    fn window_handle(page: &PageHandle) -> Result<WindowHandle, AppError> {
        WindowHandle::try_from(page.0.clone()).map_err(AppError::browser)
    }
}

fn locator(selector: &Selector) -> Locator<'_> {
    match selector {
        Selector::Css(css) => Locator::Css(css),
        Selector::XPath(xpath) => Locator::XPath(xpath),
    }
}

fn to_cookie(record: &SessionCookie) -> Cookie<'static> {
    let mut cookie = Cookie::new(record.name.clone(), record.value.clone());
    cookie.set_domain(record.domain.clone());
    cookie.set_path(record.path.clone());
    cookie.set_secure(record.secure);
    cookie.set_http_only(record.http_only);
    cookie.set_same_site(match record.same_site.as_deref() {
        Some("Strict") => SameSite::Strict,
        Some("None") => SameSite::None,
        _ => SameSite::Lax,
    });
    cookie
}

fn from_cookie(cookie: &Cookie<'static>) -> SessionCookie {
    SessionCookie {
        name: cookie.name().to_string(),
        value: cookie.value().to_string(),
        domain: cookie.domain().unwrap_or_default().to_string(),
        path: cookie.path().unwrap_or("/").to_string(),
        secure: cookie.secure().unwrap_or(false),
        http_only: cookie.http_only().unwrap_or(false),
        same_site: cookie.same_site().map(|s| s.to_string()),
    }
}

#[async_trait]
impl BrowserDriver for WebDriverBrowser {
    type Element = Element;

    async fn add_cookies(&self, cookies: &[SessionCookie]) -> Result<(), AppError> {
        for record in cookies {
            self.client
                .add_cookie(to_cookie(record))
                .await
                .map_err(AppError::browser)?;
        }
        Ok(())
    }

    async fn clear_cookies(&self) -> Result<(), AppError> {
        self.client.delete_all_cookies().await.map_err(AppError::browser)
    }

    async fn cookies(&self) -> Result<Vec<SessionCookie>, AppError> {
        let cookies = self.client.get_all_cookies().await.map_err(AppError::browser)?;
        Ok(cookies.iter().map(from_cookie).collect())
    }

    async fn current_page(&self) -> Result<PageHandle, AppError> {
        let handle = self.client.window().await.map_err(AppError::browser)?;
        Ok(PageHandle(handle.into()))
    }

    async fn new_page(&self) -> Result<PageHandle, AppError> {
        let window = self.client.new_window(true).await.map_err(AppError::browser)?;
        self.client
            .switch_to_window(window.handle.clone())
            .await
            .map_err(AppError::browser)?;
        Ok(PageHandle(window.handle.into()))
    }

    async fn close_page(&self, page: &PageHandle, return_to: &PageHandle) -> Result<(), AppError> {
        self.client
            .switch_to_window(Self::window_handle(page)?)
            .await
            .map_err(AppError::browser)?;
        self.client.close_window().await.map_err(AppError::browser)?;
        self.client
            .switch_to_window(Self::window_handle(return_to)?)
            .await
            .map_err(AppError::browser)
    }

    async fn goto(&self, url: &str, timeout: Duration) -> Result<(), AppError> {
        self.set_page_load_timeout(timeout).await?;

        let timed_out = || AppError::NavigationTimeout {
            url: url.to_string(),
            secs: timeout.as_secs(),
        };
        match tokio::time::timeout(backstop(timeout), self.client.goto(url)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) if is_driver_timeout(&e) => Err(timed_out()),
            Ok(Err(e)) => Err(AppError::browser(e)),
            Err(_) => Err(timed_out()),
        }
    }

    async fn current_url(&self) -> Result<String, AppError> {
        let url = self.client.current_url().await.map_err(AppError::browser)?;
        Ok(url.to_string())
    }

    async fn query_all(&self, selector: &Selector) -> Result<Vec<Element>, AppError> {
        self.client
            .find_all(locator(selector))
            .await
            .map_err(AppError::browser)
    }

    async fn wait_for(
        &self,
        selector: &Selector,
        timeout: Duration,
    ) -> Result<Option<Element>, AppError> {
        match self
            .client
            .wait()
            .at_most(timeout)
            .for_element(locator(selector))
            .await
        {
            Ok(element) => Ok(Some(element)),
            Err(CmdError::WaitTimeout) => Ok(None),
            Err(e) => Err(AppError::browser(e)),
        }
    }

    async fn inner_text(&self, element: &Element) -> Result<String, AppError> {
        element.text().await.map_err(AppError::browser)
    }

    async fn attribute(&self, element: &Element, name: &str) -> Result<Option<String>, AppError> {
        element.attr(name).await.map_err(AppError::browser)
    }

    async fn is_visible(&self, element: &Element) -> Result<bool, AppError> {
        element.is_displayed().await.map_err(AppError::browser)
    }

    async fn click(&self, element: &Element) -> Result<(), AppError> {
        element.click().await.map_err(AppError::browser)
    }

    async fn fill(&self, element: &Element, text: &str) -> Result<(), AppError> {
        element.clear().await.map_err(AppError::browser)?;
        element.send_keys(text).await.map_err(AppError::browser)
    }

    async fn evaluate(&self, script: &str) -> Result<Value, AppError> {
        self.client
            .execute(script, vec![])
            .await
            .map_err(AppError::browser)
    }

    async fn content(&self) -> Result<String, AppError> {
        self.client.source().await.map_err(AppError::browser)
    }
}
