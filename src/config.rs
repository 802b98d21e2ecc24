use std::time::Duration;

use crate::clock::ClockFormat;
use crate::render::RenderOptions;

#[derive(Clone, Debug)]
pub struct Config {
    pub base_url: String,
    pub endpoint: String,
    pub poll_secs: u64,
    pub clock_secs: u64,
    pub clock_format: ClockFormat,
    pub clock_enabled: bool,
    pub http_timeout_secs: u64,
    pub output_path: String,
    pub render_links: bool,
    pub oneshot: bool,
    pub title: String,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup; missing or unparsable values
    /// fall back to defaults.
    pub fn from_lookup<F>(get: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let num = |key: &str, default: u64| -> u64 {
            get(key).and_then(|v| v.trim().parse().ok()).unwrap_or(default)
        };
        let flag = |key: &str, default: bool| -> bool {
            get(key).and_then(|v| parse_flag(&v)).unwrap_or(default)
        };
        Self {
            base_url: get("DASHBOARD_URL").unwrap_or_else(|| "http://127.0.0.1:8000".to_string()),
            endpoint: get("DASHBOARD_ENDPOINT").unwrap_or_else(|| "/api/data".to_string()),
            poll_secs: num("POLL_SECS", 300).max(1),
            clock_secs: num("CLOCK_SECS", 1).max(1),
            clock_format: get("CLOCK_FORMAT")
                .and_then(|v| ClockFormat::parse(&v))
                .unwrap_or(ClockFormat::Full),
            clock_enabled: flag("CLOCK_ENABLED", true),
            http_timeout_secs: num("HTTP_TIMEOUT_SECS", 10).max(1),
            output_path: get("OUTPUT_PATH").unwrap_or_else(|| "./dashboard.html".to_string()),
            render_links: flag("RENDER_LINKS", true),
            oneshot: flag("ONESHOT", false),
            title: get("DASHBOARD_TITLE").unwrap_or_else(|| "Token Valuations".to_string()),
        }
    }

    /// Base URL and endpoint path joined with exactly one `/`.
    pub fn endpoint_url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        let path = self.endpoint.trim_start_matches('/');
        format!("{}/{}", base, path)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_secs)
    }

    pub fn clock_period(&self) -> Duration {
        Duration::from_secs(self.clock_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            links: self.render_links,
            highlight: self.render_links,
        }
    }
}

fn parse_flag(v: &str) -> Option<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
