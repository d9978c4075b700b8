//! Who is asking, and may they mutate.
//! The guard is a pure decision over an explicitly resolved principal; resolution sits behind
//! the `SessionResolver` seam so the backend lookup and the in-process store are interchangeable.

mod principal;
mod session;
mod resolver;
mod authorizer;

pub use principal::Principal;
pub use session::{Session, SessionToken, SessionManager, SESSION_COOKIE};
pub use resolver::{
    SessionResolver, NoSessionResolver, BackendSessionResolver, BACKEND_TOKEN_COOKIE,
    parse_cookie, bearer_token, request_token,
};
pub use authorizer::{Role, Capability, authorize, guard};
