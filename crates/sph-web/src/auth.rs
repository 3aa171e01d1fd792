//! Cookie sessions and the login gate.

use axum::extract::{Request, State};
use axum::http::{HeaderMap, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use sph_db::{FlashLevel, User};

use crate::config::ServerConfig;
use crate::error::{Result, WebError};
use crate::state::AppState;
use crate::views::Page;

pub const SESSION_COOKIE: &str = "sph_session";

/// The authenticated caller, inserted by [`require_login`].
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub user: User,
}

impl Session {
    pub fn user_id(&self) -> i64 {
        self.user.id
    }

    pub async fn flash(&self, state: &AppState, level: FlashLevel, message: &str) -> Result<()> {
        Ok(state.db.push_flash(&self.token, level, message).await?)
    }

    /// Page chrome for this user; consumes the queued flash messages.
    pub async fn page(&self, state: &AppState) -> Result<Page> {
        let flashes = state.db.take_flashes(&self.token).await?;
        Ok(Page::user(&self.user.username, flashes))
    }
}

pub fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}

pub fn session_cookie(token: &str, config: &ServerConfig) -> String {
    let secure = if config.secure_cookies { "; Secure" } else { "" };
    format!(
        "{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}{secure}",
        config.session_ttl_secs
    )
}

pub fn expired_cookie() -> String {
    format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

/// Only same-site absolute paths are followed after login.
pub fn safe_next(next: &str) -> &str {
    if next.starts_with('/') && !next.starts_with("//") && !next.contains('\\') {
        next
    } else {
        "/contacts"
    }
}

fn login_redirect(request: &Request) -> Response {
    let next = request
        .uri()
        .path_and_query()
        .map_or("/", |pq| pq.as_str());
    let query = serde_urlencoded::to_string([("next", next)]).unwrap_or_default();
    Redirect::to(&format!("/login?{query}")).into_response()
}

/// Resolves the session cookie; anonymous callers are redirected to the
/// login page before any handler runs.
pub async fn require_login(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(token) = session_token(request.headers()) else {
        return login_redirect(&request);
    };

    match state
        .db
        .session_user(&token, state.config.session_ttl_secs)
        .await
    {
        Ok(Some(user)) => {
            request.extensions_mut().insert(Session { token, user });
            next.run(request).await
        }
        Ok(None) => {
            tracing::debug!("Unknown or expired session");
            login_redirect(&request)
        }
        Err(e) => WebError::from(e).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_session_token_from_cookie_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; sph_session=abc123; lang=sw"),
        );
        assert_eq!(session_token(&headers).as_deref(), Some("abc123"));

        headers.insert(header::COOKIE, HeaderValue::from_static("sph_session="));
        assert_eq!(session_token(&headers), None);
        assert_eq!(session_token(&HeaderMap::new()), None);
    }

    #[test]
    fn test_session_cookie_attributes() {
        let mut config = ServerConfig::default();
        let cookie = session_cookie("tok", &config);
        assert!(cookie.starts_with("sph_session=tok; Path=/; HttpOnly"));
        assert!(!cookie.contains("Secure"));

        config.secure_cookies = true;
        assert!(session_cookie("tok", &config).ends_with("; Secure"));
        assert!(expired_cookie().contains("Max-Age=0"));
    }

    #[test]
    fn test_safe_next() {
        assert_eq!(safe_next("/groups?page=2"), "/groups?page=2");
        assert_eq!(safe_next("//evil.example.com"), "/contacts");
        assert_eq!(safe_next("https://evil.example.com"), "/contacts");
        assert_eq!(safe_next(""), "/contacts");
    }
}
