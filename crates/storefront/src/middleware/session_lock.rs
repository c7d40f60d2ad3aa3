//! Per-session request serialization.
//!
//! Cart handlers read the session, change it and write it back. Two requests
//! carrying the same session cookie must not overlap, or the later write
//! drops the earlier one's changes. This layer sits outside the session
//! layer, so the lock covers the session load, the handler and the store
//! save.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tower_sessions::cookie::Cookie;

use super::session::SESSION_COOKIE_NAME;
use crate::state::AppState;

/// One lock per active session cookie.
#[derive(Debug, Default)]
pub struct SessionLocks {
    held: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl SessionLocks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no other request holds `key`.
    pub async fn acquire(&self, key: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut held = self.held.lock().await;
            Arc::clone(
                held.entry(key.to_string())
                    .or_insert_with(|| Arc::new(Mutex::new(()))),
            )
        };
        lock.lock_owned().await
    }

    /// Release `guard` and forget `key` once nobody is waiting on it.
    pub async fn release(&self, key: &str, guard: OwnedMutexGuard<()>) {
        drop(guard);
        let mut held = self.held.lock().await;
        if held.get(key).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            held.remove(key);
        }
    }

    /// Number of sessions currently tracked.
    pub async fn len(&self) -> usize {
        self.held.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Run requests that share a session cookie one at a time.
///
/// Requests without a session cookie start a fresh session and are not
/// serialized.
pub async fn session_lock_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let Some(key) = session_cookie(request.headers()) else {
        return next.run(request).await;
    };

    let locks = state.session_locks();
    let guard = locks.acquire(&key).await;
    let response = next.run(request).await;
    locks.release(&key, guard).await;

    response
}

fn session_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| Cookie::split_parse(value))
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == SESSION_COOKIE_NAME)
        .map(|cookie| cookie.value().to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use axum::http::HeaderValue;

    use super::*;

    #[tokio::test]
    async fn test_same_key_waits_for_release() {
        let locks = SessionLocks::new();
        let guard = locks.acquire("abc").await;

        let blocked = tokio::time::timeout(Duration::from_millis(20), locks.acquire("abc")).await;
        assert!(blocked.is_err());

        let other = tokio::time::timeout(Duration::from_millis(20), locks.acquire("xyz")).await;
        assert!(other.is_ok());

        locks.release("abc", guard).await;
        let reacquired =
            tokio::time::timeout(Duration::from_millis(20), locks.acquire("abc")).await;
        assert!(reacquired.is_ok());
    }

    #[tokio::test]
    async fn test_released_keys_are_forgotten() {
        let locks = SessionLocks::new();
        let first = locks.acquire("abc").await;
        let second = locks.acquire("xyz").await;
        assert_eq!(locks.len().await, 2);

        locks.release("abc", first).await;
        locks.release("xyz", second).await;
        assert!(locks.is_empty().await);
    }

    #[test]
    fn test_session_cookie_found_among_others() {
        let mut headers = HeaderMap::new();
        headers.append(header::COOKIE, HeaderValue::from_static("theme=dark"));
        headers.append(
            header::COOKIE,
            HeaderValue::from_static("lang=en; furnilux_session=s3ss10n; x=1"),
        );

        assert_eq!(session_cookie(&headers).as_deref(), Some("s3ss10n"));
    }

    #[test]
    fn test_no_session_cookie() {
        let mut headers = HeaderMap::new();
        assert!(session_cookie(&headers).is_none());

        headers.insert(header::COOKIE, HeaderValue::from_static("theme=dark"));
        assert!(session_cookie(&headers).is_none());
    }
}
