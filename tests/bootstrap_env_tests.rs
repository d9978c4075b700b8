//! Process-wide backend config read lazily from the environment.
//! Kept to a single test: the config is write-once per process.

use anyhow::Result;

use expensia::backend::{self, ClientConfig};

#[test]
fn first_read_falls_back_to_env_and_is_then_fixed() -> Result<()> {
    // a blank primary variable must not shadow the fallback
    std::env::set_var(backend::ENV_URL, "   ");
    std::env::set_var(backend::ENV_URL_FALLBACK, "https://proj.example.co");
    std::env::set_var(backend::ENV_KEY, " \".sb_publishable_envkey\" ");
    std::env::set_var(backend::ENV_KEY_FALLBACK, "fallback-key");

    let cfg = backend::client_config();
    assert_eq!(cfg.url.as_deref(), Some("https://proj.example.co"));
    assert_eq!(cfg.normalized_key.as_deref(), Some("sb_publishable_envkey"));
    assert!(cfg.key_was_repaired());
    assert!(backend::is_configured());

    let client = backend::build_client().expect("configured from env");
    assert_eq!(client.key(), "sb_publishable_envkey");
    assert_eq!(client.base_url().host_str(), Some("proj.example.co"));

    // already initialized: a later install is refused and nothing changes
    let other = ClientConfig::from_values(Some("https://other.example.co"), Some("k"));
    assert!(!backend::init_client_config(other));
    assert_eq!(backend::client_config().url.as_deref(), Some("https://proj.example.co"));

    // the environment is not consulted again
    std::env::remove_var(backend::ENV_URL_FALLBACK);
    assert!(backend::is_configured());
    Ok(())
}
