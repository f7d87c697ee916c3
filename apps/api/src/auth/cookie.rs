use axum::http::{header, HeaderMap};

use crate::auth::jwt::TOKEN_TTL_DAYS;

pub const AUTH_COOKIE: &str = "jwt";

/// Finds the auth token: the `jwt` cookie first, then a Bearer header.
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    let from_cookie = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == AUTH_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string());

    from_cookie.or_else(|| {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from)
    })
}

/// `Set-Cookie` value carrying a freshly issued token.
pub fn auth_cookie(token: &str, secure: bool) -> String {
    let max_age = TOKEN_TTL_DAYS * 24 * 60 * 60;
    let mut cookie =
        format!("{AUTH_COOKIE}={token}; HttpOnly; Path=/; Max-Age={max_age}; SameSite=Strict");
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value that expires the auth cookie immediately.
pub fn cleared_cookie() -> String {
    format!(
        "{AUTH_COOKIE}=; HttpOnly; Path=/; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_token_from_cookie_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; jwt=abc.def.ghi; lang=en"),
        );
        assert_eq!(token_from_headers(&headers).as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn test_cookie_wins_over_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("jwt=from-cookie"));
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer from-header"),
        );
        assert_eq!(token_from_headers(&headers).as_deref(), Some("from-cookie"));
    }

    #[test]
    fn test_bearer_used_when_cookie_is_empty() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("jwt="));
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer from-header"),
        );
        assert_eq!(token_from_headers(&headers).as_deref(), Some("from-header"));
    }

    #[test]
    fn test_no_token() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic Zm9v"));
        assert!(token_from_headers(&headers).is_none());
    }

    #[test]
    fn test_auth_cookie_attributes() {
        let cookie = auth_cookie("tok", true);
        assert!(cookie.starts_with("jwt=tok;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Max-Age=2592000"));
        assert!(cookie.ends_with("; Secure"));
        assert!(!auth_cookie("tok", false).contains("Secure"));
    }
}
