//! Scripted in-memory browser for exercising the pipeline without WebDriver.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use super::{BrowserDriver, PageHandle, Selector};
use crate::error::AppError;
use crate::session::SessionCookie;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeElement {
    pub id: String,
}

#[derive(Default)]
struct State {
    page_urls: HashMap<String, String>,
    current_page: String,
    open_pages: Vec<String>,
    next_page: usize,
    redirects: VecDeque<String>,
    timeouts: HashSet<String>,
    documents: HashMap<String, String>,
    elements: HashMap<Selector, Vec<String>>,
    hidden: HashSet<String>,
    revealed_on_click: HashMap<String, Vec<(Selector, String)>>,
    navigate_on_click: HashMap<String, String>,
    cookies: Vec<SessionCookie>,
    actions: Vec<String>,
    content_fails: bool,
}

impl State {
    fn current_url(&self) -> String {
        self.page_urls
            .get(&self.current_page)
            .cloned()
            .unwrap_or_default()
    }
}

/// A browser whose pages, elements and redirects are set up by the test.
pub struct ScriptedBrowser {
    state: Mutex<State>,
}

impl Default for ScriptedBrowser {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedBrowser {
    pub fn new() -> Self {
        let state = State {
            current_page: "page-0".into(),
            open_pages: vec!["page-0".into()],
            next_page: 1,
            ..State::default()
        };
        Self {
            state: Mutex::new(state),
        }
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut State) -> T) -> T {
        let mut state = self.state.lock().unwrap();
        f(&mut state)
    }

    /// The next navigation lands on `url` instead of its target.
    pub fn redirect_next_goto(&self, url: &str) {
        self.with_state(|s| s.redirects.push_back(url.to_string()));
    }

    /// Navigating to `url` times out.
    pub fn time_out_on(&self, url: &str) {
        self.with_state(|s| s.timeouts.insert(url.to_string()));
    }

    /// Page source served while `url` is current.
    pub fn serve(&self, url: &str, html: &str) {
        self.with_state(|s| s.documents.insert(url.to_string(), html.to_string()));
    }

    /// The current page moves to `url` without a navigation, as after a form
    /// submitted by hand.
    pub fn land_on(&self, url: &str) {
        self.with_state(|s| {
            let page = s.current_page.clone();
            s.page_urls.insert(page, url.to_string());
        });
    }

    /// Every later page-source read fails.
    pub fn fail_content(&self) {
        self.with_state(|s| s.content_fails = true);
    }

    pub fn add_element(&self, selector: Selector, id: &str) {
        self.with_state(|s| s.elements.entry(selector).or_default().push(id.to_string()));
    }

    pub fn hide(&self, id: &str) {
        self.with_state(|s| s.hidden.insert(id.to_string()));
    }

    /// Clicking `trigger` makes `id` appear under `selector`.
    pub fn reveal_on_click(&self, trigger: &str, selector: Selector, id: &str) {
        self.with_state(|s| {
            s.revealed_on_click
                .entry(trigger.to_string())
                .or_default()
                .push((selector, id.to_string()))
        });
    }

    /// Clicking `trigger` makes `url` the current URL.
    pub fn navigate_on_click(&self, trigger: &str, url: &str) {
        self.with_state(|s| s.navigate_on_click.insert(trigger.to_string(), url.to_string()));
    }

    pub fn actions(&self) -> Vec<String> {
        self.with_state(|s| s.actions.clone())
    }

    pub fn clicked(&self, id: &str) -> bool {
        let wanted = format!("click {}", id);
        self.actions().iter().any(|a| *a == wanted)
    }

    pub fn open_pages(&self) -> Vec<String> {
        self.with_state(|s| s.open_pages.clone())
    }

    pub fn cookie_jar(&self) -> Vec<SessionCookie> {
        self.with_state(|s| s.cookies.clone())
    }

    fn find(&self, selector: &Selector) -> Vec<FakeElement> {
        self.with_state(|s| {
            s.elements
                .get(selector)
                .map(|ids| ids.iter().map(|id| FakeElement { id: id.clone() }).collect())
                .unwrap_or_default()
        })
    }
}

#[async_trait]
impl BrowserDriver for ScriptedBrowser {
    type Element = FakeElement;

    async fn add_cookies(&self, cookies: &[SessionCookie]) -> Result<(), AppError> {
        self.with_state(|s| s.cookies.extend_from_slice(cookies));
        Ok(())
    }

    async fn clear_cookies(&self) -> Result<(), AppError> {
        self.with_state(|s| s.cookies.clear());
        Ok(())
    }

    async fn cookies(&self) -> Result<Vec<SessionCookie>, AppError> {
        Ok(self.cookie_jar())
    }

    async fn current_page(&self) -> Result<PageHandle, AppError> {
        Ok(PageHandle(self.with_state(|s| s.current_page.clone())))
    }

    async fn new_page(&self) -> Result<PageHandle, AppError> {
        Ok(PageHandle(self.with_state(|s| {
            let id = format!("page-{}", s.next_page);
            s.next_page += 1;
            s.open_pages.push(id.clone());
            s.current_page = id.clone();
            s.actions.push(format!("new_page {}", id));
            id
        })))
    }

    async fn close_page(&self, page: &PageHandle, return_to: &PageHandle) -> Result<(), AppError> {
        self.with_state(|s| {
            s.open_pages.retain(|p| *p != page.0);
            s.current_page = return_to.0.clone();
            s.actions.push(format!("close_page {}", page.0));
        });
        Ok(())
    }

    async fn goto(&self, url: &str, timeout: Duration) -> Result<(), AppError> {
        self.with_state(|s| {
            s.actions.push(format!("goto {}", url));
            if s.timeouts.contains(url) {
                return Err(AppError::NavigationTimeout {
                    url: url.to_string(),
                    secs: timeout.as_secs(),
                });
            }
            let landed = s.redirects.pop_front().unwrap_or_else(|| url.to_string());
            let page = s.current_page.clone();
            s.page_urls.insert(page, landed);
            Ok(())
        })
    }

    async fn current_url(&self) -> Result<String, AppError> {
        Ok(self.with_state(|s| s.current_url()))
    }

    async fn query_all(&self, selector: &Selector) -> Result<Vec<FakeElement>, AppError> {
        Ok(self.find(selector))
    }

    async fn wait_for(
        &self,
        selector: &Selector,
        _timeout: Duration,
    ) -> Result<Option<FakeElement>, AppError> {
        Ok(self.find(selector).into_iter().next())
    }

    async fn inner_text(&self, element: &FakeElement) -> Result<String, AppError> {
        Ok(element.id.clone())
    }

    async fn attribute(&self, _element: &FakeElement, _name: &str) -> Result<Option<String>, AppError> {
        Ok(None)
    }

    async fn is_visible(&self, element: &FakeElement) -> Result<bool, AppError> {
        Ok(self.with_state(|s| !s.hidden.contains(&element.id)))
    }

    async fn click(&self, element: &FakeElement) -> Result<(), AppError> {
        self.with_state(|s| {
            s.actions.push(format!("click {}", element.id));
            if let Some(revealed) = s.revealed_on_click.remove(&element.id) {
                for (selector, id) in revealed {
                    s.elements.entry(selector).or_default().push(id);
                }
            }
            if let Some(url) = s.navigate_on_click.get(&element.id).cloned() {
                let page = s.current_page.clone();
                s.page_urls.insert(page, url);
            }
        });
        Ok(())
    }

    async fn fill(&self, element: &FakeElement, text: &str) -> Result<(), AppError> {
        self.with_state(|s| s.actions.push(format!("fill {} {}", element.id, text)));
        Ok(())
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value, AppError> {
        self.with_state(|s| s.actions.push(format!("evaluate {}", script)));
        Ok(serde_json::Value::Null)
    }

    async fn content(&self) -> Result<String, AppError> {
        self.with_state(|s| {
            if s.content_fails {
                return Err(AppError::BrowserError("page source unavailable".into()));
            }
            Ok(s.documents
                .get(&s.current_url())
                .cloned()
                .unwrap_or_else(|| "<html><body></body></html>".to_string()))
        })
    }
}
