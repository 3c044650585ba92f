use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use yansi::Paint;

use crate::config;
use crate::error::ApiError;
use crate::utils::build_query_string;

static SILENT: AtomicBool = AtomicBool::new(false);

pub fn set_silent(silent: bool) {
    SILENT.store(silent, Ordering::Relaxed);
}

fn log_output(msg: String) {
    if !SILENT.load(Ordering::Relaxed) {
        eprintln!("{}", msg);
    }
}

/// HTTP client for the gate REST API.
///
/// Every call is echoed as an equivalent curl command unless silenced with
/// [`set_silent`].
#[derive(Clone, Debug)]
pub struct GateClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl GateClient {
    pub fn new(base_url: &str, token: &str) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .user_agent(format!("sgwiz/{}", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ApiError::Network(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: config::sanitize_base_url(base_url),
            token: token.to_string(),
        })
    }

    /// Build a client from `GATE_BASE_URL` / `GATE_TOKEN`
    pub fn from_env() -> Result<Self, ApiError> {
        Self::new(&config::get_gate_base_url(), &config::get_gate_token())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn log_request(&self, method: &Method, url: &str, body: Option<&Value>) {
        let mut parts = Vec::new();
        parts.push(Paint::new("curl").fg(yansi::Color::Green).bold().to_string());
        parts.push(format!("-X {}", Paint::new(method.as_str()).fg(yansi::Color::Yellow).bold()));
        parts.push(format!("'{}'", Paint::new(url).fg(yansi::Color::Cyan)));

        if !self.token.is_empty() {
            parts.push(format!(
                "{} {}",
                Paint::new("-H").fg(yansi::Color::Magenta),
                Paint::new("'Authorization: Bearer ***'").fg(yansi::Color::Magenta)
            ));
        }
        if let Some(d) = body {
            parts.push(format!(
                "{} {}",
                Paint::new("-H").fg(yansi::Color::Magenta),
                Paint::new("'Content-Type: application/json'").fg(yansi::Color::Magenta)
            ));
            let json_str = serde_json::to_string_pretty(d).unwrap_or_default();
            let escaped_json = json_str.replace('\'', "'\\''");
            parts.push(format!(
                "{} {}",
                Paint::new("-d").fg(yansi::Color::Blue),
                Paint::new(format!("'{}'", escaped_json)).fg(yansi::Color::White)
            ));
        }
        log_output(format!("Request:\n{}", parts.join(" ")));
    }

    /// Perform a call and return the decoded JSON body
    pub async fn call(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&Value>,
        params: &[(String, String)],
    ) -> Result<Value, ApiError> {
        let url = format!("{}{}", self.base_url, endpoint);
        let url_for_log = if params.is_empty() {
            url.clone()
        } else {
            format!("{}?{}", url, build_query_string(params))
        };
        self.log_request(&method, &url_for_log, body);
        tracing::debug!(%method, endpoint, "gate request");

        let mut req = self.client.request(method, &url);
        if !self.token.is_empty() {
            req = req.bearer_auth(&self.token);
        }
        if !params.is_empty() {
            req = req.query(params);
        }
        if let Some(b) = body {
            req = req.json(b);
        }

        let response = req
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        if !status.is_success() {
            log_output(format!(
                "Response:\n{}",
                Paint::new(format!("HTTP {}: {}", status, text)).fg(yansi::Color::Red)
            ));
            return Err(ApiError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        // Grayed out so the payload does not drown the request line
        log_output(format!("Response:\n{}", Paint::new(&text).rgb(100, 100, 100)));

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| ApiError::Decode(e.to_string()))
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(String, String)],
    ) -> Result<T, ApiError> {
        let value = self.call(Method::GET, endpoint, None, params).await?;
        serde_json::from_value(value).map_err(|e| ApiError::Decode(e.to_string()))
    }
}
