use axum::http::HeaderMap;
use futures_util::future::BoxFuture;
use tracing::warn;

use super::authorizer::Role;
use super::principal::Principal;
use crate::backend::BackendClient;

/// Cookie carrying the backend access token when no bearer header is sent.
pub const BACKEND_TOKEN_COOKIE: &str = "sb-access-token";

/// Looks up the principal behind a request. `Ok(None)` means "nobody is signed in";
/// `Err` means the lookup itself failed.
pub trait SessionResolver: Send + Sync {
    fn resolve<'a>(&'a self, headers: &'a HeaderMap) -> BoxFuture<'a, anyhow::Result<Option<Principal>>>;
}

pub fn parse_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    for cookie in headers.get_all("cookie").iter() {
        let Ok(s) = cookie.to_str() else { continue; };
        for part in s.split(';') {
            if let Some((k, v)) = part.trim().split_once('=') {
                if k == name && !v.is_empty() { return Some(v.to_string()); }
            }
        }
    }
    None
}

pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let v = headers.get("authorization")?.to_str().ok()?;
    let (scheme, token) = v.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") { return None; }
    let token = token.trim();
    if token.is_empty() { None } else { Some(token.to_string()) }
}

/// Bearer header first, then the named cookie.
pub fn request_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    bearer_token(headers).or_else(|| parse_cookie(headers, cookie_name))
}

/// Used when no backend is configured: nobody is ever signed in.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSessionResolver;

impl SessionResolver for NoSessionResolver {
    fn resolve<'a>(&'a self, _headers: &'a HeaderMap) -> BoxFuture<'a, anyhow::Result<Option<Principal>>> {
        Box::pin(async { Ok(None) })
    }
}

/// Resolves the principal through the backend's auth and profiles endpoints.
#[derive(Debug, Clone)]
pub struct BackendSessionResolver {
    client: BackendClient,
}

impl BackendSessionResolver {
    pub fn new(client: BackendClient) -> Self { Self { client } }

    async fn lookup(&self, headers: &HeaderMap) -> anyhow::Result<Option<Principal>> {
        let Some(token) = request_token(headers, BACKEND_TOKEN_COOKIE) else { return Ok(None); };
        let user = match self.client.fetch_user(&token).await {
            Ok(u) => u,
            // expired or revoked tokens are "not signed in", not a failure
            Err(e) if e.is_auth_rejection() => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let role_text = self.client.fetch_profile_role(&user.id, &token).await?;
        let role = role_text.as_deref().and_then(Role::parse);
        if let (Some(text), None) = (role_text.as_deref(), role) {
            warn!(target: "guard", user = %user.id, "unknown role '{}' on profile", text);
        }
        Ok(Some(Principal { user_id: user.id, email: user.email, role }))
    }
}

impl SessionResolver for BackendSessionResolver {
    fn resolve<'a>(&'a self, headers: &'a HeaderMap) -> BoxFuture<'a, anyhow::Result<Option<Principal>>> {
        Box::pin(self.lookup(headers))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut h = HeaderMap::new();
        for (k, v) in pairs {
            h.append(*k, HeaderValue::from_str(v).unwrap());
        }
        h
    }

    #[test]
    fn cookie_parsing() {
        let h = headers(&[("cookie", "a=1; sb-access-token=tok; b=2")]);
        assert_eq!(parse_cookie(&h, "sb-access-token").as_deref(), Some("tok"));
        assert_eq!(parse_cookie(&h, "missing"), None);
        let h = headers(&[("cookie", "sb-access-token=")]);
        assert_eq!(parse_cookie(&h, "sb-access-token"), None);
        let h = headers(&[("cookie", "a=1"), ("cookie", "sb-access-token=second")]);
        assert_eq!(parse_cookie(&h, "sb-access-token").as_deref(), Some("second"));
    }

    #[test]
    fn bearer_parsing() {
        assert_eq!(bearer_token(&headers(&[("authorization", "Bearer abc")])).as_deref(), Some("abc"));
        assert_eq!(bearer_token(&headers(&[("authorization", "bearer  abc ")])).as_deref(), Some("abc"));
        assert_eq!(bearer_token(&headers(&[("authorization", "Basic abc")])), None);
        assert_eq!(bearer_token(&headers(&[("authorization", "Bearer ")])), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn bearer_wins_over_cookie() {
        let h = headers(&[("authorization", "Bearer hdr"), ("cookie", "sb-access-token=ck")]);
        assert_eq!(request_token(&h, BACKEND_TOKEN_COOKIE).as_deref(), Some("hdr"));
        let h = headers(&[("cookie", "sb-access-token=ck")]);
        assert_eq!(request_token(&h, BACKEND_TOKEN_COOKIE).as_deref(), Some("ck"));
    }

    #[tokio::test]
    async fn no_session_resolver_never_resolves() {
        let h = headers(&[("authorization", "Bearer abc")]);
        assert_eq!(NoSessionResolver.resolve(&h).await.unwrap(), None);
    }
}
