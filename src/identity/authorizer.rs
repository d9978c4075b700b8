use axum::http::HeaderMap;
use tracing::{debug, warn};

use super::principal::Principal;
use super::resolver::SessionResolver;
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Viewer,
    Editor,
}

impl Role {
    /// Case-insensitive parse of the backend's role text; unknown text has no role.
    pub fn parse(s: &str) -> Option<Role> {
        match s.trim().to_ascii_lowercase().as_str() {
            "viewer" => Some(Role::Viewer),
            "editor" => Some(Role::Editor),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Viewer => "viewer",
            Role::Editor => "editor",
        }
    }

    pub fn grants(&self, cap: Capability) -> bool {
        match (self, cap) {
            (Role::Editor, _) => true,
            (Role::Viewer, Capability::Viewer) => true,
            (Role::Viewer, Capability::Editor) => false,
        }
    }
}

/// What an entry point requires of the principal. Mutating entry points require `Editor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Viewer,
    Editor,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::Viewer => "viewer",
            Capability::Editor => "editor",
        }
    }
}

fn unauthorized(required: Capability) -> AppError {
    AppError::unauthorized("unauthorized".to_string(), format!("{} capability required", required.as_str()))
}

/// Decide over an already-resolved principal. No side effects.
pub fn authorize(principal: Option<&Principal>, required: Capability) -> AppResult<()> {
    match principal {
        Some(p) if p.has_capability(required) => Ok(()),
        Some(p) => {
            debug!(target: "guard", user = %p.user_id, role = ?p.role, required = required.as_str(), "denied: role lacks capability");
            Err(unauthorized(required))
        }
        None => {
            debug!(target: "guard", required = required.as_str(), "denied: no session");
            Err(unauthorized(required))
        }
    }
}

/// Resolve the session behind `headers` and require `required` of it.
///
/// Resolution failures are reported exactly like a missing session; only the log line differs.
pub async fn guard(resolver: &dyn SessionResolver, headers: &HeaderMap, required: Capability) -> AppResult<Principal> {
    let principal = match resolver.resolve(headers).await {
        Ok(p) => p,
        Err(e) => {
            warn!(target: "guard", required = required.as_str(), "denied: session resolution failed: {:#}", e);
            return Err(unauthorized(required));
        }
    };
    authorize(principal.as_ref(), required)?;
    // authorize only succeeds with Some
    principal.ok_or_else(|| unauthorized(required))
}
