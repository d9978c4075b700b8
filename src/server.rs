//!
//! expensia HTTP server
//! --------------------
//! Axum router for the navigation entry points.
//!
//! Responsibilities:
//! - Gate every "create" entry point behind the editor capability.
//! - Answer allowed requests with a 307 to the project list carrying the modal state.
//! - Report whether the backend client is configured.
//!
//! Page rendering lives elsewhere; no route here produces a page body.

use std::{net::SocketAddr, sync::Arc};

use axum::extract::rejection::PathRejection;
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Redirect, Response};
use axum::{routing::get, Json, Router};
use tracing::{info, warn};

use crate::backend::ClientConfig;
use crate::error::AppResult;
use crate::identity::{guard, BackendSessionResolver, Capability, NoSessionResolver, SessionResolver};
use crate::navigation::{compute_redirect, single_value, EntryKind, RedirectTarget, PROJECT_PARAM};

/// Shared server state injected into all handlers.
#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<dyn SessionResolver>,
    pub backend_configured: bool,
}

impl AppState {
    pub fn new(resolver: Arc<dyn SessionResolver>, backend_configured: bool) -> Self {
        Self { resolver, backend_configured }
    }

    /// Backend-backed sessions when the client can be built; otherwise nobody is signed in.
    pub fn from_client_config(cfg: &ClientConfig) -> Self {
        match cfg.build_client() {
            Some(client) => Self::new(Arc::new(BackendSessionResolver::new(client)), true),
            None => {
                warn!(target: "startup", "backend not configured; every guarded entry point will answer 401");
                Self::new(Arc::new(NoSessionResolver), false)
            }
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "expensia ok" }))
        .route("/health", get(health))
        .route("/projects/new", get(project_new))
        .route("/expenses/new", get(expense_new))
        .route("/projects/{project_id}/expenses/new", get(project_expense_new))
        .with_state(state)
}

/// Bind `0.0.0.0:<http_port>` and serve until the process exits.
pub async fn run_with_port(http_port: u16, state: AppState) -> anyhow::Result<()> {
    info!(
        target: "startup",
        "expensia starting: http_port={}, backend_configured={}",
        http_port, state.backend_configured
    );
    let addr: SocketAddr = format!("0.0.0.0:{}", http_port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    serve(listener, state).await
}

/// Serve on an already-bound listener.
pub async fn serve(listener: tokio::net::TcpListener, state: AppState) -> anyhow::Result<()> {
    info!("Starting server on {}", listener.local_addr()?);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

fn redirect_to(target: RedirectTarget) -> Response {
    Redirect::temporary(&target.location()).into_response()
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({"status":"ok","backend_configured": state.backend_configured}))
}

async fn project_new(State(state): State<AppState>, headers: HeaderMap) -> AppResult<Response> {
    guard(state.resolver.as_ref(), &headers, Capability::Editor).await?;
    Ok(redirect_to(compute_redirect(EntryKind::ProjectNew, None)))
}

async fn expense_new(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<Vec<(String, String)>>,
) -> AppResult<Response> {
    guard(state.resolver.as_ref(), &headers, Capability::Editor).await?;
    // a repeated `project` is a list, not a reference
    let project = single_value(&params, PROJECT_PARAM);
    Ok(redirect_to(compute_redirect(EntryKind::ExpenseNew, project)))
}

async fn project_expense_new(
    State(state): State<AppState>,
    headers: HeaderMap,
    path: Result<Path<String>, PathRejection>,
) -> AppResult<Response> {
    // authorization comes before any complaint about the segment
    guard(state.resolver.as_ref(), &headers, Capability::Editor).await?;
    let Path(project_id) = match path {
        Ok(p) => p,
        Err(rej) => return Ok(rej.into_response()),
    };
    Ok(redirect_to(compute_redirect(EntryKind::ExpenseNew, Some(&project_id))))
}
