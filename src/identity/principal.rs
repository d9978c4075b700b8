use super::authorizer::{Capability, Role};

/// The signed-in user as seen by the guard. `role` is `None` when the backend has no role on
/// record or reports one this service does not know.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Principal {
    pub user_id: String,
    pub email: Option<String>,
    pub role: Option<Role>,
}

impl Principal {
    pub fn new<S: Into<String>>(user_id: S, role: Option<Role>) -> Self {
        Self { user_id: user_id.into(), email: None, role }
    }

    pub fn has_capability(&self, cap: Capability) -> bool {
        self.role.map(|r| r.grants(cap)).unwrap_or(false)
    }
}
