use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use axum::http::HeaderMap;
use base64::Engine;
use futures_util::future::BoxFuture;
use parking_lot::RwLock;
use crate::tprintln;

use super::principal::Principal;
use super::resolver::{request_token, SessionResolver};

pub const SESSION_COOKIE: &str = "expensia_session";

pub type SessionToken = String;

#[derive(Debug, Clone)]
pub struct Session {
    pub session_id: String,
    pub token: SessionToken,
    pub principal: Principal,
    pub issued_at: Instant,
    pub expires_at: Instant,
}

#[derive(Debug, Default)]
struct SessionTables {
    sessions: HashMap<SessionToken, Session>,
    user_index: HashMap<String, HashSet<SessionToken>>,
    /// Revoked token -> the instant it would have expired anyway.
    revoked: HashMap<SessionToken, Instant>,
}

impl SessionTables {
    fn unindex(&mut self, user_id: &str, token: &str) {
        if let Some(set) = self.user_index.get_mut(user_id) {
            set.remove(token);
            if set.is_empty() { self.user_index.remove(user_id); }
        }
    }

    fn prune_expired(&mut self, now: Instant) -> usize {
        let expired: Vec<(SessionToken, String)> = self
            .sessions
            .iter()
            .filter(|(_, s)| s.expires_at <= now)
            .map(|(t, s)| (t.clone(), s.principal.user_id.clone()))
            .collect();
        for (token, user_id) in &expired {
            self.sessions.remove(token);
            self.unindex(user_id, token);
        }
        self.revoked.retain(|_, expires_at| *expires_at > now);
        expired.len()
    }
}

fn gen_id() -> Result<String> {
    // 256-bit random token, base64url without padding
    let mut buf = [0u8; 32];
    getrandom::getrandom(&mut buf).map_err(|e| anyhow!("session token generation failed: {}", e))?;
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(buf))
}

/// In-process session store. Cloning shares the same tables.
#[derive(Clone)]
pub struct SessionManager {
    pub ttl: Duration,
    tables: Arc<RwLock<SessionTables>>,
}

impl Default for SessionManager {
    fn default() -> Self { Self::with_ttl(Duration::from_secs(60 * 60)) }
}

impl SessionManager {
    pub fn with_ttl(ttl: Duration) -> Self {
        Self { ttl, tables: Arc::new(RwLock::new(SessionTables::default())) }
    }

    /// Issue a new session; expired sessions and stale revocations are swept first.
    pub fn issue(&self, principal: Principal) -> Result<Session> {
        let now = Instant::now();
        let sess = Session {
            session_id: gen_id()?,
            token: gen_id()?,
            principal,
            issued_at: now,
            expires_at: now + self.ttl,
        };
        {
            let mut t = self.tables.write();
            t.prune_expired(now);
            t.user_index.entry(sess.principal.user_id.clone()).or_default().insert(sess.token.clone());
            t.sessions.insert(sess.token.clone(), sess.clone());
        }
        tprintln!("session.issue user={} sid={} ttl_secs={}", sess.principal.user_id, sess.session_id, self.ttl.as_secs());
        Ok(sess)
    }

    pub fn validate(&self, token: &str) -> Option<Principal> {
        let now = Instant::now();
        {
            let t = self.tables.read();
            if t.revoked.contains_key(token) { return None; }
            match t.sessions.get(token) {
                Some(s) if s.expires_at > now => return Some(s.principal.clone()),
                Some(_) => {}
                None => return None,
            }
        }
        // expired: drop it
        let mut t = self.tables.write();
        if let Some(s) = t.sessions.remove(token) {
            t.unindex(&s.principal.user_id, token);
        }
        None
    }

    pub fn logout(&self, token: &str) -> bool {
        let mut t = self.tables.write();
        let Some(s) = t.sessions.remove(token) else { return false; };
        t.unindex(&s.principal.user_id, token);
        t.revoked.insert(token.to_string(), s.expires_at);
        true
    }

    pub fn revoke_user(&self, user_id: &str) -> usize {
        let mut t = self.tables.write();
        let tokens = t.user_index.remove(user_id).unwrap_or_default();
        let mut count = 0usize;
        for tok in tokens {
            if let Some(s) = t.sessions.remove(&tok) {
                t.revoked.insert(tok, s.expires_at);
                count += 1;
            }
        }
        tprintln!("session.revoke user={} count={}", user_id, count);
        count
    }

    /// Drop expired sessions and revocations of tokens that have expired; returns sessions dropped.
    pub fn prune_expired(&self) -> usize {
        self.tables.write().prune_expired(Instant::now())
    }

    pub fn active_count(&self) -> usize {
        self.tables.read().sessions.len()
    }
}

impl SessionResolver for SessionManager {
    fn resolve<'a>(&'a self, headers: &'a HeaderMap) -> BoxFuture<'a, anyhow::Result<Option<Principal>>> {
        let principal = request_token(headers, SESSION_COOKIE).and_then(|t| self.validate(&t));
        Box::pin(async move { Ok(principal) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::Role;
    use axum::http::HeaderValue;

    fn editor() -> Principal { Principal::new("ana", Some(Role::Editor)) }

    #[test]
    fn issue_and_validate() -> Result<()> {
        let sm = SessionManager::default();
        let s = sm.issue(editor())?;
        assert_ne!(s.token, s.session_id);
        let p = sm.validate(&s.token).expect("valid");
        assert_eq!(p.user_id, "ana");
        assert_eq!(sm.validate("nope"), None);
        Ok(())
    }

    #[test]
    fn issued_tokens_are_distinct() -> Result<()> {
        let sm = SessionManager::default();
        let mut seen = HashSet::new();
        for _ in 0..64 {
            let s = sm.issue(editor())?;
            assert_eq!(s.token.len(), 43);
            assert!(seen.insert(s.token.clone()));
            assert!(seen.insert(s.session_id.clone()));
        }
        assert_eq!(sm.active_count(), 64);
        Ok(())
    }

    #[test]
    fn logout_revokes_token() -> Result<()> {
        let sm = SessionManager::default();
        let s = sm.issue(editor())?;
        assert!(sm.logout(&s.token));
        assert!(!sm.logout(&s.token));
        assert_eq!(sm.validate(&s.token), None);
        assert_eq!(sm.active_count(), 0);
        Ok(())
    }

    #[test]
    fn revoke_user_drops_all_their_sessions() -> Result<()> {
        let sm = SessionManager::default();
        let a1 = sm.issue(editor())?;
        let a2 = sm.issue(editor())?;
        let b = sm.issue(Principal::new("budi", Some(Role::Viewer)))?;
        assert_eq!(sm.revoke_user("ana"), 2);
        assert_eq!(sm.validate(&a1.token), None);
        assert_eq!(sm.validate(&a2.token), None);
        assert!(sm.validate(&b.token).is_some());
        Ok(())
    }

    #[test]
    fn expired_sessions_are_dropped() -> Result<()> {
        let sm = SessionManager::with_ttl(Duration::from_secs(0));
        let s = sm.issue(editor())?;
        assert_eq!(sm.validate(&s.token), None);
        assert_eq!(sm.active_count(), 0);
        assert!(sm.tables.read().user_index.is_empty());
        Ok(())
    }

    #[test]
    fn issue_sweeps_sessions_nobody_validated() -> Result<()> {
        let sm = SessionManager::with_ttl(Duration::from_secs(0));
        for _ in 0..1000 {
            sm.issue(editor())?;
        }
        // only the newest can still be present; everything older was swept
        assert!(sm.active_count() <= 1);
        assert!(sm.tables.read().user_index.values().map(|s| s.len()).sum::<usize>() <= 1);
        let remaining = sm.active_count();
        assert_eq!(sm.prune_expired(), remaining);
        assert_eq!(sm.active_count(), 0);
        assert!(sm.tables.read().user_index.is_empty());
        Ok(())
    }

    #[test]
    fn logout_cycles_leave_no_residue() -> Result<()> {
        let sm = SessionManager::with_ttl(Duration::from_secs(0));
        for _ in 0..1000 {
            let s = sm.issue(editor())?;
            sm.logout(&s.token);
        }
        sm.prune_expired();
        let t = sm.tables.read();
        assert!(t.revoked.is_empty());
        assert!(t.sessions.is_empty());
        assert!(t.user_index.is_empty());
        Ok(())
    }

    #[test]
    fn revocation_outlives_nothing_but_the_token() -> Result<()> {
        let sm = SessionManager::default();
        let s = sm.issue(editor())?;
        sm.logout(&s.token);
        sm.prune_expired();
        // still within its lifetime, so the revocation is kept
        assert!(sm.tables.read().revoked.contains_key(&s.token));
        assert!(sm.tables.read().user_index.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn resolves_from_cookie_or_bearer() -> Result<()> {
        let sm = SessionManager::default();
        let s = sm.issue(editor())?;

        let mut h = HeaderMap::new();
        h.insert("cookie", HeaderValue::from_str(&format!("{}={}", SESSION_COOKIE, s.token)).unwrap());
        assert_eq!(sm.resolve(&h).await?.map(|p| p.user_id).as_deref(), Some("ana"));

        let mut h = HeaderMap::new();
        h.insert("authorization", HeaderValue::from_str(&format!("Bearer {}", s.token)).unwrap());
        assert!(sm.resolve(&h).await?.is_some());

        assert_eq!(sm.resolve(&HeaderMap::new()).await?, None);
        Ok(())
    }
}
