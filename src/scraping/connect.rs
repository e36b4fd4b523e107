use std::fmt;

use super::navigator::PageNavigator;
use crate::browser::{BrowserDriver, Selector};
use crate::error::AppError;
use crate::session::Session;

/// Steps of the "connect with a note" flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectState {
    Navigated,
    ConnectVisible,
    ConnectInMenu,
    NoteDialogOpen,
    MessageFilled,
    Sent,
    Failed,
}

impl fmt::Display for ConnectState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectState::Navigated => "navigated",
            ConnectState::ConnectVisible => "connect visible",
            ConnectState::ConnectInMenu => "connect in menu",
            ConnectState::NoteDialogOpen => "note dialog open",
            ConnectState::MessageFilled => "message filled",
            ConnectState::Sent => "sent",
            ConnectState::Failed => "failed",
        };
        f.write_str(name)
    }
}

fn note_field() -> Selector {
    Selector::css("textarea[name='message']")
}

fn send_button() -> Selector {
    Selector::XPath("//button[normalize-space(.)='Send']".into())
}

/// Sends a connection invitation with a personalised note to one profile.
pub struct ConnectionRequester {
    max_note_chars: usize,
}

impl ConnectionRequester {
    pub fn new(max_note_chars: usize) -> Self {
        Self { max_note_chars }
    }

    /// Rejects notes the site would refuse, before any navigation happens.
    pub fn validate_note(&self, note: &str) -> Result<(), AppError> {
        let chars = note.chars().count();
        if note.trim().is_empty() {
            return Err(AppError::InvalidInput("connection note is empty".into()));
        }
        if chars > self.max_note_chars {
            return Err(AppError::InvalidInput(format!(
                "connection note has {} characters, the limit is {}",
                chars, self.max_note_chars
            )));
        }
        Ok(())
    }

    pub async fn send_connection<B: BrowserDriver>(
        &self,
        navigator: &PageNavigator<'_, B>,
        session: &Session,
        profile_url: &str,
        note: &str,
    ) -> Result<ConnectState, AppError> {
        self.validate_note(note)?;
        navigator.inject_session(session).await?;

        let page = navigator
            .open_detail(profile_url, navigator.config().navigation_timeout())
            .await?;

        let mut state = ConnectState::Navigated;
        let result = self.drive(navigator, note, &mut state).await;
        navigator.close_detail(page).await;

        match result {
            Ok(()) => {
                tracing::info!("Connection request sent to {}", profile_url);
                Ok(state)
            }
            Err(e) => {
                tracing::warn!(
                    "Connection request to {} failed after state '{}': {}",
                    profile_url,
                    state,
                    e
                );
                advance(&mut state, ConnectState::Failed);
                Err(e)
            }
        }
    }

    async fn drive<B: BrowserDriver>(
        &self,
        navigator: &PageNavigator<'_, B>,
        note: &str,
        state: &mut ConnectState,
    ) -> Result<(), AppError> {
        let browser = navigator.browser();

        navigator.scroll_to_bottom().await?;
        navigator.settle().await;

        let connect = match browser.query_first(&Selector::top_card_button("Connect")).await? {
            Some(button) => {
                advance(state, ConnectState::ConnectVisible);
                button
            }
            None => {
                tracing::debug!("'Connect' not visible, trying the 'More' menu");
                let more = browser
                    .query_first(&Selector::top_card_button("More"))
                    .await?
                    .ok_or_else(|| unavailable("no 'Connect' or 'More' action"))?;
                browser.click(&more).await?;

                let button = navigator
                    .wait_for(&Selector::menu_item_with_text("Connect"))
                    .await?
                    .ok_or_else(|| unavailable("'Connect' not found in the 'More' menu"))?;
                advance(state, ConnectState::ConnectInMenu);
                button
            }
        };

        if !browser.is_visible(&connect).await?
            || browser.attribute(&connect, "disabled").await?.is_some()
        {
            return Err(unavailable("'Connect' found but not clickable"));
        }
        tracing::debug!("Clicking '{}'", browser.inner_text(&connect).await?.trim());
        browser.click(&connect).await?;

        let add_note = navigator
            .wait_for(&Selector::button_with_text("Add a note"))
            .await?
            .ok_or_else(|| AppError::ElementNotFound("'Add a note' button".into()))?;
        browser.click(&add_note).await?;
        advance(state, ConnectState::NoteDialogOpen);

        let field = navigator
            .wait_for(&note_field())
            .await?
            .ok_or_else(|| AppError::ElementNotFound("note text area".into()))?;
        browser.fill(&field, note).await?;
        advance(state, ConnectState::MessageFilled);

        let send = navigator
            .wait_for(&send_button())
            .await?
            .ok_or_else(|| AppError::ElementNotFound("'Send' button".into()))?;
        browser.click(&send).await?;
        navigator.settle().await;
        advance(state, ConnectState::Sent);

        Ok(())
    }
}

fn advance(state: &mut ConnectState, next: ConnectState) {
    tracing::debug!("Connection flow: {} -> {}", state, next);
    *state = next;
}

fn unavailable(reason: &str) -> AppError {
    AppError::ActionUnavailable(reason.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::testing::ScriptedBrowser;
    use crate::config::{BrowserConfig, SiteConfig};
    use crate::scraping::navigator::with_session_retry;
    use crate::session::{MockSessionProvider, SessionCookie};

    const PROFILE: &str = "https://www.linkedin.com/in/jane-doe/";
    const NOTE: &str = "Hi Jane, I came across your profile and would love to connect.";

    fn site() -> SiteConfig {
        SiteConfig {
            base_url: "https://www.linkedin.com/".into(),
            login_url: "https://www.linkedin.com/login".into(),
            cookie_domain: ".linkedin.com".into(),
            login_timeout_secs: 1,
        }
    }

    fn browser_config() -> BrowserConfig {
        BrowserConfig {
            webdriver_url: "http://localhost:4444".into(),
            headless: true,
            login_headless: true,
            navigation_timeout_secs: 1,
            profile_timeout_secs: 1,
            element_timeout_secs: 1,
            settle_delay_ms: 0,
        }
    }

    fn session() -> Session {
        Session::new(vec![SessionCookie {
            name: "li_at".into(),
            value: "token".into(),
            domain: ".linkedin.com".into(),
            path: "/".into(),
            secure: true,
            http_only: true,
            same_site: None,
        }])
    }

    fn dialog(browser: &ScriptedBrowser) {
        browser.add_element(Selector::button_with_text("Add a note"), "add-note");
        browser.add_element(note_field(), "note");
        browser.add_element(send_button(), "send");
    }

    async fn send(browser: &ScriptedBrowser) -> Result<ConnectState, AppError> {
        let (site, config) = (site(), browser_config());
        let navigator = PageNavigator::new(browser, &site, &config);
        ConnectionRequester::new(300)
            .send_connection(&navigator, &session(), PROFILE, NOTE)
            .await
    }

    #[tokio::test]
    async fn sends_through_the_visible_connect_button() {
        let browser = ScriptedBrowser::new();
        browser.add_element(Selector::top_card_button("Connect"), "connect");
        dialog(&browser);

        let state = send(&browser).await.unwrap();

        assert_eq!(state, ConnectState::Sent);
        assert!(browser.clicked("connect"));
        assert!(browser.clicked("add-note"));
        assert!(browser.clicked("send"));
        assert!(browser.actions().contains(&format!("fill note {}", NOTE)));
        assert_eq!(browser.open_pages(), vec!["page-0".to_string()]);
    }

    #[tokio::test]
    async fn falls_back_to_the_more_menu() {
        let browser = ScriptedBrowser::new();
        browser.add_element(Selector::top_card_button("More"), "more");
        browser.reveal_on_click("more", Selector::menu_item_with_text("Connect"), "menu-connect");
        dialog(&browser);

        assert_eq!(send(&browser).await.unwrap(), ConnectState::Sent);
        assert!(browser.clicked("more"));
        assert!(browser.clicked("menu-connect"));
    }

    #[tokio::test]
    async fn missing_connect_action_is_unavailable_and_skips_the_dialog() {
        let browser = ScriptedBrowser::new();
        browser.add_element(Selector::top_card_button("More"), "more");
        dialog(&browser);

        let result = send(&browser).await;

        assert!(matches!(result, Err(AppError::ActionUnavailable(_))));
        assert!(!browser.clicked("add-note"));
        assert!(!browser.actions().iter().any(|a| a.starts_with("fill")));
        assert_eq!(browser.open_pages(), vec!["page-0".to_string()]);
    }

    #[tokio::test]
    async fn sidebar_connect_buttons_are_ignored() {
        let browser = ScriptedBrowser::new();
        // "People you may know" suggestions below the profile
        browser.add_element(Selector::button_with_text("Connect"), "suggested-connect");
        dialog(&browser);

        let result = send(&browser).await;

        assert!(matches!(result, Err(AppError::ActionUnavailable(_))));
        assert!(!browser.clicked("suggested-connect"));
        assert!(!browser.clicked("add-note"));
    }

    #[tokio::test]
    async fn hidden_connect_button_is_unavailable() {
        let browser = ScriptedBrowser::new();
        browser.add_element(Selector::top_card_button("Connect"), "connect");
        browser.hide("connect");
        dialog(&browser);

        let result = send(&browser).await;

        assert!(matches!(result, Err(AppError::ActionUnavailable(_))));
        assert!(!browser.clicked("connect"));
    }

    #[tokio::test]
    async fn missing_send_button_fails_and_still_closes_the_page() {
        let browser = ScriptedBrowser::new();
        browser.add_element(Selector::top_card_button("Connect"), "connect");
        browser.add_element(Selector::button_with_text("Add a note"), "add-note");
        browser.add_element(note_field(), "note");

        let result = send(&browser).await;

        assert!(matches!(result, Err(AppError::ElementNotFound(_))));
        assert_eq!(browser.open_pages(), vec!["page-0".to_string()]);
    }

    #[test]
    fn notes_over_the_limit_are_rejected() {
        let requester = ConnectionRequester::new(300);
        assert!(requester.validate_note(NOTE).is_ok());
        assert!(requester.validate_note("   ").is_err());
        assert!(requester.validate_note(&"x".repeat(301)).is_err());
    }

    #[tokio::test]
    async fn expired_session_is_refreshed_once_and_retried() {
        let browser = ScriptedBrowser::new();
        browser.add_element(Selector::top_card_button("Connect"), "connect");
        dialog(&browser);
        // first attempt: site root, then the profile bounces to login
        browser.redirect_next_goto("https://www.linkedin.com/");
        browser.redirect_next_goto("https://www.linkedin.com/login?session_redirect=jane");

        let mut sessions = MockSessionProvider::new();
        sessions
            .expect_get_session()
            .times(1)
            .returning(|| Ok(Some(session())));
        sessions
            .expect_refresh_session()
            .times(1)
            .returning(|| Ok(session()));

        let (site, config) = (site(), browser_config());
        let navigator = PageNavigator::new(&browser, &site, &config);
        let requester = ConnectionRequester::new(300);

        let navigator = &navigator;
        let requester = &requester;
        let state = with_session_retry(&sessions, |session| async move {
            requester
                .send_connection(navigator, &session, PROFILE, NOTE)
                .await
        })
        .await
        .unwrap();

        assert_eq!(state, ConnectState::Sent);
        let profile_visits = browser
            .actions()
            .iter()
            .filter(|a| *a == &format!("goto {}", PROFILE))
            .count();
        assert_eq!(profile_visits, 2);
    }

    #[tokio::test]
    async fn expiry_on_both_attempts_is_final() {
        let browser = ScriptedBrowser::new();
        for _ in 0..2 {
            browser.redirect_next_goto("https://www.linkedin.com/");
            browser.redirect_next_goto("https://www.linkedin.com/authwall");
        }

        let mut sessions = MockSessionProvider::new();
        sessions
            .expect_get_session()
            .returning(|| Ok(Some(session())));
        sessions
            .expect_refresh_session()
            .times(1)
            .returning(|| Ok(session()));

        let (site, config) = (site(), browser_config());
        let navigator = PageNavigator::new(&browser, &site, &config);
        let requester = ConnectionRequester::new(300);

        let navigator = &navigator;
        let requester = &requester;
        let result = with_session_retry(&sessions, |session| async move {
            requester
                .send_connection(navigator, &session, PROFILE, NOTE)
                .await
        })
        .await;

        assert!(matches!(result, Err(AppError::SessionExpired(_))));
        assert!(!browser.clicked("connect"));
    }
}
