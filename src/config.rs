use std::{env, path::PathBuf};

use crate::moderation::EditPolicy;

/// AppConfig
///
/// The client's configuration, read once at start-up and immutable afterwards. Components receive
/// the values they need from it (the router its redirect targets, the repository its base URL).
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Runtime environment marker. Selects the log format and how strict loading is.
    pub env: Env,
    // Root of the portal REST API, without the `/api` suffix.
    pub api_base_url: String,
    // File the bearer token is persisted to between runs.
    pub token_path: PathBuf,
    // Where a guard sends a session it refuses.
    pub login_route: String,
    // Where unknown paths end up.
    pub fallback_route: String,
    pub edit_policy: EditPolicy,
}

/// Env
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

const LOCAL_API_BASE_URL: &str = "https://localhost:7256";
const DEFAULT_TOKEN_PATH: &str = ".blog-portal/token";
const DEFAULT_LOGIN_ROUTE: &str = "/login";
const DEFAULT_FALLBACK_ROUTE: &str = "/unauthorized";

impl Default for AppConfig {
    /// default
    ///
    /// Local values that need no environment, for tests and scaffolding.
    fn default() -> Self {
        Self {
            env: Env::Local,
            api_base_url: LOCAL_API_BASE_URL.to_string(),
            token_path: PathBuf::from(DEFAULT_TOKEN_PATH),
            login_route: DEFAULT_LOGIN_ROUTE.to_string(),
            fallback_route: DEFAULT_FALLBACK_ROUTE.to_string(),
            edit_policy: EditPolicy::default(),
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from environment variables.
    ///
    /// # Panics
    /// Panics in production when `API_BASE_URL` is missing, and in any environment when
    /// `EDIT_POLICY` holds an unknown value.
    pub fn load() -> Self {
        let env_str = env::var("APP_ENV").unwrap_or_else(|_| "local".to_string());
        let env = match env_str.as_str() {
            "production" => Env::Production,
            _ => Env::Local,
        };

        let api_base_url = match env {
            Env::Production => {
                env::var("API_BASE_URL").expect("FATAL: API_BASE_URL must be set in production.")
            }
            Env::Local => {
                env::var("API_BASE_URL").unwrap_or_else(|_| LOCAL_API_BASE_URL.to_string())
            }
        };

        let edit_policy = match env::var("EDIT_POLICY") {
            Ok(raw) => EditPolicy::parse(&raw).unwrap_or_else(|| {
                panic!("FATAL: EDIT_POLICY must be keep-approval or reset-to-pending, got {raw:?}")
            }),
            Err(_) => EditPolicy::default(),
        };

        Self {
            env,
            api_base_url,
            token_path: env::var("TOKEN_STORE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_TOKEN_PATH)),
            login_route: env::var("LOGIN_ROUTE").unwrap_or_else(|_| DEFAULT_LOGIN_ROUTE.to_string()),
            fallback_route: env::var("FALLBACK_ROUTE")
                .unwrap_or_else(|_| DEFAULT_FALLBACK_ROUTE.to_string()),
            edit_policy,
        }
    }
}
