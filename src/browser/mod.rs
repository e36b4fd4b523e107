//! The browser capability surface the scraping pipeline is written against.
//!
//! Everything in `scraping` and `session` talks to a [`BrowserDriver`]; the
//! fantoccini-backed [`WebDriverBrowser`] is the only production implementation.

mod webdriver;

#[cfg(test)]
pub mod testing;

pub use webdriver::{BrowserController, WebDriverBrowser};

use async_trait::async_trait;
use std::fmt;
use std::time::Duration;

use crate::error::AppError;
use crate::session::SessionCookie;

/// A way of locating elements on the current page.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Selector {
    Css(String),
    XPath(String),
}

impl Selector {
    pub fn css(css: impl Into<String>) -> Self {
        Selector::Css(css.into())
    }

    /// A `<button>` whose visible text contains `text`.
    pub fn button_with_text(text: &str) -> Self {
        Selector::XPath(format!(
            "//button[contains(normalize-space(.), '{}')]",
            text
        ))
    }

    /// A `<button>` containing `text` inside the first section of `<main>`, the
    /// profile's top card. Recommendation sidebars carry buttons with the same labels.
    pub fn top_card_button(text: &str) -> Self {
        Selector::XPath(format!(
            "(//main//section)[1]//button[contains(normalize-space(.), '{}')]",
            text
        ))
    }

    /// A button-like element containing `text` inside an open `role="menu"` popup.
    pub fn menu_item_with_text(text: &str) -> Self {
        Selector::XPath(format!(
            "//div[@role='menu']//*[self::button or @role='button'][contains(normalize-space(.), '{}')]",
            text
        ))
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Css(s) => write!(f, "css={}", s),
            Selector::XPath(s) => write!(f, "xpath={}", s),
        }
    }
}

/// Opaque identifier of a browser page (tab).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageHandle(pub String);

#[async_trait]
pub trait BrowserDriver: Send + Sync {
    type Element: Send + Sync;

    async fn add_cookies(&self, cookies: &[SessionCookie]) -> Result<(), AppError>;
    async fn clear_cookies(&self) -> Result<(), AppError>;
    async fn cookies(&self) -> Result<Vec<SessionCookie>, AppError>;

    async fn current_page(&self) -> Result<PageHandle, AppError>;
    /// Opens a new page and makes it current.
    async fn new_page(&self) -> Result<PageHandle, AppError>;
    /// Closes `page` and makes `return_to` current.
    async fn close_page(&self, page: &PageHandle, return_to: &PageHandle) -> Result<(), AppError>;

    async fn goto(&self, url: &str, timeout: Duration) -> Result<(), AppError>;
    async fn current_url(&self) -> Result<String, AppError>;

    async fn query_all(&self, selector: &Selector) -> Result<Vec<Self::Element>, AppError>;
    /// Polls for `selector` until it appears or `timeout` elapses. A timeout is `Ok(None)`.
    async fn wait_for(
        &self,
        selector: &Selector,
        timeout: Duration,
    ) -> Result<Option<Self::Element>, AppError>;

    async fn inner_text(&self, element: &Self::Element) -> Result<String, AppError>;
    async fn attribute(&self, element: &Self::Element, name: &str) -> Result<Option<String>, AppError>;
    async fn is_visible(&self, element: &Self::Element) -> Result<bool, AppError>;
    async fn click(&self, element: &Self::Element) -> Result<(), AppError>;
    async fn fill(&self, element: &Self::Element, text: &str) -> Result<(), AppError>;

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value, AppError>;
    /// Serialized DOM of the current page.
    async fn content(&self) -> Result<String, AppError>;

    async fn query_first(&self, selector: &Selector) -> Result<Option<Self::Element>, AppError> {
        Ok(self.query_all(selector).await?.into_iter().next())
    }
}
