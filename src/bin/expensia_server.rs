//!
//! expensia server binary
//! ----------------------
//! Command-line entry point for the navigation server. Supports configuration via CLI flags
//! and environment variables; flags win.

use anyhow::Result;
use std::env;

use expensia::backend::{self, ClientConfig};
use expensia::server::{self, AppState};

const DEFAULT_HTTP_PORT: u16 = 3000;

fn parse_port_env(name: &str) -> Option<u16> {
    match env::var(name) {
        Ok(val) => val.trim().parse::<u16>().ok(),
        Err(_) => None,
    }
}

fn arg_value(args: &[String], flag: &str) -> Option<String> {
    let mut i = 0;
    while i < args.len() {
        if args[i] == flag {
            return args.get(i + 1).cloned();
        }
        if let Some(v) = args[i].strip_prefix(flag).and_then(|rest| rest.strip_prefix('=')) {
            return Some(v.to_string());
        }
        i += 1;
    }
    None
}

fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Init logging; RUST_LOG overrides the default level
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    let args: Vec<String> = env::args().collect();

    if has_flag(&args, "--help") || has_flag(&args, "-h") {
        println!(
            "expensia server\n\nUSAGE:\n  expensia_server [--http-port N] [--backend-url URL] [--backend-key KEY]\n\nOPTIONS:\n  --http-port N        HTTP port (env: EXPENSIA_HTTP_PORT, default {})\n  --backend-url URL    Backend endpoint (env: {}, fallback {})\n  --backend-key KEY    Backend API key (env: {}, fallback {})\n",
            DEFAULT_HTTP_PORT,
            backend::ENV_URL, backend::ENV_URL_FALLBACK,
            backend::ENV_KEY, backend::ENV_KEY_FALLBACK,
        );
        return Ok(());
    }

    let http_port = arg_value(&args, "--http-port")
        .and_then(|v| v.parse::<u16>().ok())
        .or_else(|| parse_port_env("EXPENSIA_HTTP_PORT"))
        .unwrap_or(DEFAULT_HTTP_PORT);

    // CLI flags override the environment one setting at a time
    let env_cfg = ClientConfig::from_env();
    let arg_url = arg_value(&args, "--backend-url");
    let arg_key = arg_value(&args, "--backend-key");
    let cfg = if arg_url.is_some() || arg_key.is_some() {
        let url = arg_url.or_else(|| env_cfg.url.clone());
        let key = arg_key.or_else(|| env_cfg.raw_key.clone());
        ClientConfig::from_values(url.as_deref(), key.as_deref())
    } else {
        env_cfg
    };
    backend::init_client_config(cfg);

    let state = AppState::from_client_config(backend::client_config());
    server::run_with_port(http_port, state).await
}
