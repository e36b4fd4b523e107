mod login;
mod store;

pub use login::{handle_login, is_login_url, LoginMethod};
pub use store::CredentialStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::browser::BrowserController;
use crate::config::{CredentialsConfig, SiteConfig};
use crate::error::AppError;

/// One cookie of an authenticated browser identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    #[serde(default = "default_path")]
    pub path: String,
    #[serde(default)]
    pub secure: bool,
    #[serde(default)]
    pub http_only: bool,
    #[serde(default)]
    pub same_site: Option<String>,
}

fn default_path() -> String {
    "/".to_string()
}

/// An authenticated identity on the target site, materialized as its cookie set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub saved_at: DateTime<Utc>,
    pub cookies: Vec<SessionCookie>,
}

impl Session {
    pub fn new(cookies: Vec<SessionCookie>) -> Self {
        Self {
            saved_at: Utc::now(),
            cookies,
        }
    }

    /// The cookie set rescoped to `domain` at path "/", the way it is injected
    /// into a fresh browser context.
    pub fn scoped_to(&self, domain: &str) -> Vec<SessionCookie> {
        self.cookies
            .iter()
            .map(|c| SessionCookie {
                domain: domain.to_string(),
                path: "/".to_string(),
                ..c.clone()
            })
            .collect()
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// The last persisted session, not validated against the site.
    async fn get_session(&self) -> Result<Option<Session>, AppError>;

    /// Logs in interactively and persists the resulting session, replacing any prior one.
    async fn refresh_session(&self) -> Result<Session, AppError>;
}

pub struct SessionManager {
    store: CredentialStore,
    browser: BrowserController,
    site: SiteConfig,
    credentials: CredentialsConfig,
}

impl SessionManager {
    pub fn new(
        store: CredentialStore,
        browser: BrowserController,
        site: SiteConfig,
        credentials: CredentialsConfig,
    ) -> Self {
        Self {
            store,
            browser,
            site,
            credentials,
        }
    }

    /// Logs in with `method` in a dedicated browser and persists the session.
    pub async fn login_with(&self, method: LoginMethod) -> Result<Session, AppError> {
        tracing::info!("Starting interactive login at {}", self.site.login_url);

        let browser = self.browser.launch().await?;
        let result = handle_login(&browser, &self.site, method).await;

        if let Err(e) = browser.quit().await {
            tracing::warn!("Failed to close login browser: {}", e);
        }

        let cookies = result?;
        if cookies.is_empty() {
            return Err(AppError::AuthError("login produced no cookies".into()));
        }

        let session = Session::new(cookies);
        self.store.save(&session).await?;
        tracing::info!(
            "Saved {} session cookies to {}",
            session.cookies.len(),
            self.store.path().display()
        );
        Ok(session)
    }
}

#[async_trait]
impl SessionProvider for SessionManager {
    async fn get_session(&self) -> Result<Option<Session>, AppError> {
        self.store.load().await
    }

    async fn refresh_session(&self) -> Result<Session, AppError> {
        self.credentials
            .validate()
            .map_err(|e| AppError::AuthError(format!("credentials not configured: {}", e)))?;

        self.login_with(LoginMethod::Automated {
            username: self.credentials.username.clone(),
            password: self.credentials.password.clone(),
        })
        .await
    }
}
