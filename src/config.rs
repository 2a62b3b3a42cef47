use std::path::PathBuf;

use serde::Deserialize;

use crate::guard::ProtectedPaths;

/// Figment key the app's table lives under (`[default.alcancia]` in
/// Rocket.toml, or `ROCKET_ALCANCIA_*` in the environment).
pub const CONFIG_KEY: &str = "alcancia";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub protected_paths: ProtectedPaths,
    /// Session lifetime; verification rejects tokens past it.
    pub session_ttl_days: i64,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            db_path: PathBuf::from("data/alcancia.sqlite"),
            protected_paths: ProtectedPaths::default(),
            session_ttl_days: 5,
        }
    }
}
