//! "Create" entry points as modal state on the project list.
//!
//! There is no page for creating a project or an expense. A request for one of those entry
//! points is rewritten into `/projects?modal=<token>[&project=<id>]`, and the list view opens
//! the overlay named by `modal`. The same inputs always serialize to the same location.

use tracing::debug;

pub const LIST_PATH: &str = "/projects";
pub const MODAL_PARAM: &str = "modal";
pub const PROJECT_PARAM: &str = "project";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    ProjectNew,
    ExpenseNew,
}

impl EntryKind {
    pub fn as_token(&self) -> &'static str {
        match self {
            EntryKind::ProjectNew => "project-new",
            EntryKind::ExpenseNew => "expense-new",
        }
    }

    pub fn from_token(s: &str) -> Option<EntryKind> {
        match s {
            "project-new" => Some(EntryKind::ProjectNew),
            "expense-new" => Some(EntryKind::ExpenseNew),
            _ => None,
        }
    }

    /// Only expense creation is scoped to a project.
    pub fn takes_project(&self) -> bool {
        matches!(self, EntryKind::ExpenseNew)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectTarget {
    pub base_path: &'static str,
    /// Ordered; `modal` is always first.
    pub query: Vec<(String, String)>,
}

impl RedirectTarget {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.query.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    pub fn query_string(&self) -> String {
        self.query
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// `base_path?k=v&...`, suitable for a `Location` header.
    pub fn location(&self) -> String {
        format!("{}?{}", self.base_path, self.query_string())
    }
}

/// Map a creation entry point onto the list view.
///
/// `context_reference` becomes `project` only for expense creation and only when non-empty.
pub fn compute_redirect(kind: EntryKind, context_reference: Option<&str>) -> RedirectTarget {
    let mut query = vec![(MODAL_PARAM.to_string(), kind.as_token().to_string())];
    if kind.takes_project() {
        if let Some(reference) = context_reference.filter(|r| !r.is_empty()) {
            query.push((PROJECT_PARAM.to_string(), reference.to_string()));
        }
    }
    let target = RedirectTarget { base_path: LIST_PATH, query };
    debug!(target: "navigation", kind = kind.as_token(), location = %target.location(), "computed redirect");
    target
}

/// Which overlay the list view should open, read back from its query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModalState {
    pub kind: EntryKind,
    pub project: Option<String>,
}

impl ModalState {
    /// `None` when `modal` is missing or not a known token. Repeated keys count as absent.
    pub fn from_query<K: AsRef<str>, V: AsRef<str>>(pairs: &[(K, V)]) -> Option<ModalState> {
        let kind = single_value(pairs, MODAL_PARAM).and_then(EntryKind::from_token)?;
        let project = if kind.takes_project() {
            single_value(pairs, PROJECT_PARAM).filter(|p| !p.is_empty()).map(str::to_string)
        } else {
            None
        };
        Some(ModalState { kind, project })
    }
}

/// The value of `key` when it occurs exactly once.
pub fn single_value<'a, K: AsRef<str>, V: AsRef<str>>(pairs: &'a [(K, V)], key: &str) -> Option<&'a str> {
    let mut found = pairs.iter().filter(|(k, _)| k.as_ref() == key).map(|(_, v)| v.as_ref());
    let first = found.next()?;
    if found.next().is_some() { None } else { Some(first) }
}
