use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;
use tokio::time::Instant;
use url::Url;

use crate::browser::{BrowserDriver, Selector};
use crate::config::SiteConfig;
use crate::error::AppError;
use crate::session::SessionCookie;

// Matched against the URL path only. Search keywords and profile slugs may
// contain "login" or "signin" too.
static LOGIN_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^/(uas/)?(login|signin|authwall|checkpoint)\b").expect("valid regex")
});

static CHALLENGE_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^/checkpoint/challenge").expect("valid regex"));

const POLL_INTERVAL: Duration = Duration::from_millis(500);

fn url_path(url: &str) -> Option<String> {
    Url::parse(url).ok().map(|parsed| parsed.path().to_string())
}

/// True when `url` is one of the site's login, sign-in or challenge pages.
pub fn is_login_url(url: &str) -> bool {
    url_path(url).is_some_and(|path| LOGIN_PATH.is_match(&path))
}

fn is_challenge_url(url: &str) -> bool {
    url_path(url).is_some_and(|path| CHALLENGE_PATH.is_match(&path))
}

pub enum LoginMethod {
    /// Wait for a human to complete the login in a visible browser.
    Manual { wait: Duration },
    Automated { username: String, password: String },
}

/// Drives the login form and returns the cookie jar of the authenticated browser.
pub async fn handle_login<B: BrowserDriver>(
    browser: &B,
    site: &SiteConfig,
    method: LoginMethod,
) -> Result<Vec<SessionCookie>, AppError> {
    let timeout = Duration::from_secs(site.login_timeout_secs);
    browser.goto(&site.login_url, timeout).await?;

    match method {
        LoginMethod::Manual { wait } => {
            tracing::info!("Waiting up to {}s for manual login", wait.as_secs());
            // the human in front of the browser may have to solve a challenge first
            wait_for_login(browser, wait, false).await?;
        }
        LoginMethod::Automated { username, password } => {
            automated_login(browser, &username, &password, timeout).await?;
        }
    }

    browser.cookies().await
}

async fn automated_login<B: BrowserDriver>(
    browser: &B,
    username: &str,
    password: &str,
    timeout: Duration,
) -> Result<(), AppError> {
    let username_field = find_required(browser, &Selector::css("#username"), timeout).await?;
    browser.fill(&username_field, username).await?;

    let password_field = find_required(browser, &Selector::css("#password"), timeout).await?;
    browser.fill(&password_field, password).await?;

    let submit = find_required(
        browser,
        &Selector::XPath("//button[@type=\"submit\"]".into()),
        timeout,
    )
    .await?;
    browser.click(&submit).await?;

    wait_for_login(browser, timeout, true).await
}

async fn find_required<B: BrowserDriver>(
    browser: &B,
    selector: &Selector,
    timeout: Duration,
) -> Result<B::Element, AppError> {
    browser
        .wait_for(selector, timeout)
        .await?
        .ok_or_else(|| AppError::AuthError(format!("login form element {} not found", selector)))
}

async fn wait_for_login<B: BrowserDriver>(
    browser: &B,
    wait: Duration,
    fail_on_challenge: bool,
) -> Result<(), AppError> {
    let deadline = Instant::now() + wait;
    loop {
        let url = browser.current_url().await?;
        if fail_on_challenge && is_challenge_url(&url) {
            return Err(AppError::AuthError(
                "verification challenge detected - manual login required".into(),
            ));
        }
        if !is_login_url(&url) {
            tracing::debug!("Login completed, landed on {}", url);
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err(AppError::AuthError(format!("still on {} after login", url)));
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}
