use std::env;
use std::path::Path;
use std::time::Duration;

// Default configuration constants
pub const DEFAULT_GATE_BASE_URL: &str = "http://localhost:8084";
pub const DEFAULT_GATE_TOKEN: &str = "";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2_000;
pub const DEFAULT_WIZARD_TITLE: &str = "Create New Server Group";

/// Cloud provider every command built by this wizard targets
pub const PROVIDER: &str = "yandex";
/// Image search pattern used when loading images for an account
pub const IMAGE_QUERY_PATTERN: &str = "*";
/// Title shown on the task monitor while a server group is being created
pub const TASK_TITLE: &str = "Creating your server group";

pub fn load_env_file(env_file: Option<&str>) {
    if let Some(path) = env_file {
        dotenvy::from_path(Path::new(path)).ok();
    } else {
        dotenvy::dotenv().ok();
    }
}

pub fn get_gate_base_url() -> String {
    sanitize_base_url(&env::var("GATE_BASE_URL").unwrap_or_else(|_| DEFAULT_GATE_BASE_URL.to_string()))
}

pub fn get_gate_token() -> String {
    env::var("GATE_TOKEN").unwrap_or_else(|_| DEFAULT_GATE_TOKEN.to_string())
}

pub fn get_poll_interval() -> Duration {
    let ms = env::var("SGWIZ_POLL_INTERVAL_MS")
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(DEFAULT_POLL_INTERVAL_MS);
    Duration::from_millis(ms)
}

pub fn get_default_application() -> Option<String> {
    env::var("SGWIZ_APPLICATION")
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

pub fn sanitize_base_url(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        DEFAULT_GATE_BASE_URL.to_string()
    } else {
        trimmed.to_string()
    }
}
