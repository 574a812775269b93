//! Session storage.
//!
//! Sessions are explicit state behind a trait, keyed by an opaque id
//! carried in an HttpOnly cookie. Nothing request-scoped reaches into
//! ambient globals; handlers go through the store on the application state.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "blogd-session";

/// One-shot notification message, drained on read.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Flash {
    pub kind: FlashKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FlashKind {
    Success,
    Error,
}

/// Server-side session state for one logged-in user.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: i64,
    pub flash: Option<Flash>,
}

/// Session persistence by opaque key.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, key: &str) -> Option<Session>;
    async fn set(&self, key: &str, session: Session);
    async fn clear(&self, key: &str);

    /// Remove and return the pending flash message, leaving the session
    /// otherwise intact.
    async fn take_flash(&self, key: &str) -> Option<Flash> {
        let mut session = self.get(key).await?;
        let flash = session.flash.take()?;
        self.set(key, session).await;
        Some(flash)
    }

    /// Set or replace the pending flash message on an existing session.
    async fn set_flash(&self, key: &str, flash: Flash) {
        if let Some(mut session) = self.get(key).await {
            session.flash = Some(flash);
            self.set(key, session).await;
        }
    }
}

/// Generate a fresh opaque session id.
pub fn new_session_id() -> String {
    Uuid::new_v4().to_string()
}

struct Entry {
    session: Session,
    expires_at: Instant,
}

/// In-memory session store with a fixed TTL. Sessions vanish on restart,
/// which only forces a re-login.
pub struct InMemorySessionStore {
    inner: Arc<RwLock<HashMap<String, Entry>>>,
    ttl: Duration,
}

impl InMemorySessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, key: &str) -> Option<Session> {
        let guard = self.inner.read().await;
        let entry = guard.get(key)?;
        if entry.expires_at < Instant::now() {
            return None;
        }
        Some(entry.session.clone())
    }

    async fn set(&self, key: &str, session: Session) {
        let mut guard = self.inner.write().await;
        guard.insert(
            key.to_string(),
            Entry {
                session,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    async fn clear(&self, key: &str) {
        let mut guard = self.inner.write().await;
        guard.remove(key);
    }
}

/// Extract the session id from a Cookie header value.
pub fn session_id_from_cookies(cookie_header: &str) -> Option<String> {
    cookie_header
        .split(';')
        .map(|part| part.trim())
        .find_map(|part| part.strip_prefix(&format!("{}=", SESSION_COOKIE)))
        .map(|s| s.to_string())
}

/// Build the Set-Cookie value for a session id.
pub fn session_cookie(session_id: &str, production: bool) -> String {
    let secure_flag = if production { "; Secure" } else { "" };
    format!(
        "{}={}; Path=/; SameSite=Strict; HttpOnly{}",
        SESSION_COOKIE, session_id, secure_flag
    )
}

/// Build the Set-Cookie value that clears the session cookie.
pub fn clear_session_cookie() -> String {
    format!("{}=; Path=/; Max-Age=0; HttpOnly", SESSION_COOKIE)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> InMemorySessionStore {
        InMemorySessionStore::new(Duration::from_secs(60))
    }

    #[tokio::test]
    async fn set_get_clear_round_trip() {
        let store = store();
        store
            .set(
                "k",
                Session {
                    user_id: 7,
                    flash: None,
                },
            )
            .await;

        assert_eq!(store.get("k").await.unwrap().user_id, 7);

        store.clear("k").await;
        assert!(store.get("k").await.is_none());
    }

    #[tokio::test]
    async fn expired_sessions_are_gone() {
        let store = InMemorySessionStore::new(Duration::from_secs(0));
        store
            .set(
                "k",
                Session {
                    user_id: 1,
                    flash: None,
                },
            )
            .await;
        assert!(store.get("k").await.is_none());
    }

    #[tokio::test]
    async fn flash_is_drained_on_read() {
        let store = store();
        store
            .set(
                "k",
                Session {
                    user_id: 1,
                    flash: None,
                },
            )
            .await;
        store
            .set_flash(
                "k",
                Flash {
                    kind: FlashKind::Success,
                    message: "Post created".to_string(),
                },
            )
            .await;

        let flash = store.take_flash("k").await.unwrap();
        assert_eq!(flash.message, "Post created");
        // Drained: a second read finds nothing, but the session survives.
        assert!(store.take_flash("k").await.is_none());
        assert!(store.get("k").await.is_some());
    }

    #[test]
    fn cookie_parsing_picks_out_session_id() {
        let header = "theme=dark; blogd-session=abc-123; other=1";
        assert_eq!(session_id_from_cookies(header).unwrap(), "abc-123");
        assert!(session_id_from_cookies("theme=dark").is_none());
    }

    #[test]
    fn cookie_attributes() {
        let cookie = session_cookie("abc", true);
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Secure"));
        assert!(cookie.contains("SameSite=Strict"));
        assert!(!session_cookie("abc", false).contains("Secure"));
    }
}
