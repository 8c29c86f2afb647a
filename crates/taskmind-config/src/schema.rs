//! Configuration schema definitions.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;
use crate::proxy::ProxyConfig;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub browser: SessionConfig,

    #[serde(default)]
    pub commands: CommandsConfig,

    #[serde(default)]
    pub workspace: WorkspaceConfig,

    #[serde(default)]
    pub recipes: RecipesConfig,

    #[serde(default)]
    pub server: ServerConfig,
}

/// Browser target connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_browser_host")]
    pub host: String,

    #[serde(default = "default_browser_port")]
    pub port: u16,

    /// Explicit target WebSocket URL; skips `/json/list` discovery.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub websocket_url: Option<String>,

    /// Target to attach to during discovery (first page target otherwise).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<String>,

    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    #[serde(default = "default_call_timeout_ms")]
    pub call_timeout_ms: u64,

    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,

    #[serde(default = "default_reconnect_base_ms")]
    pub reconnect_base_delay_ms: u64,

    #[serde(default = "default_reconnect_cap_ms")]
    pub reconnect_max_delay_ms: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy: Option<ProxyConfig>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            host: default_browser_host(),
            port: default_browser_port(),
            websocket_url: None,
            target_id: None,
            connect_timeout_ms: default_connect_timeout_ms(),
            call_timeout_ms: default_call_timeout_ms(),
            max_reconnect_attempts: default_max_reconnect_attempts(),
            reconnect_base_delay_ms: default_reconnect_base_ms(),
            reconnect_max_delay_ms: default_reconnect_cap_ms(),
            proxy: None,
        }
    }
}

impl SessionConfig {
    /// Session settings for an explicit target WebSocket URL.
    pub fn for_websocket(url: impl Into<String>) -> Self {
        Self {
            websocket_url: Some(url.into()),
            ..Default::default()
        }
    }

    /// Check the shape invariants: host and port present, timeouts positive.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::invalid("browser.host", "host cannot be empty"));
        }
        if self.port == 0 {
            return Err(ConfigError::invalid("browser.port", "port cannot be 0"));
        }
        if self.connect_timeout_ms == 0 {
            return Err(ConfigError::invalid(
                "browser.connect_timeout_ms",
                "connect timeout must be greater than 0",
            ));
        }
        if self.call_timeout_ms == 0 {
            return Err(ConfigError::invalid(
                "browser.call_timeout_ms",
                "call timeout must be greater than 0",
            ));
        }
        if self.reconnect_base_delay_ms > self.reconnect_max_delay_ms {
            return Err(ConfigError::invalid(
                "browser.reconnect_base_delay_ms",
                "base delay cannot exceed the maximum delay",
            ));
        }
        if let Some(url) = &self.websocket_url {
            if !url.starts_with("ws://") && !url.starts_with("wss://") {
                return Err(ConfigError::invalid(
                    "browser.websocket_url",
                    "websocket_url must start with ws:// or wss://",
                ));
            }
        }
        Ok(())
    }

    /// HTTP endpoint used for target discovery.
    pub fn http_endpoint(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    pub fn reconnect_base_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_base_delay_ms)
    }

    pub fn reconnect_max_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_max_delay_ms)
    }
}

fn default_browser_host() -> String {
    "127.0.0.1".to_string()
}

fn default_browser_port() -> u16 {
    9222
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

fn default_call_timeout_ms() -> u64 {
    30_000
}

fn default_max_reconnect_attempts() -> u32 {
    3
}

fn default_reconnect_base_ms() -> u64 {
    200
}

fn default_reconnect_cap_ms() -> u64 {
    5_000
}

/// Command module tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandsConfig {
    /// Deadline for the navigation load-complete predicate.
    #[serde(default = "default_navigation_timeout_ms")]
    pub navigation_timeout_ms: u64,

    /// Fixed interval between predicate polls.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Poll window when locating elements (scroll-to-text, click).
    #[serde(default = "default_element_window_ms")]
    pub element_poll_window_ms: u64,

    /// Upper bound accepted for a conditional wait window.
    #[serde(default = "default_wait_max_window_ms")]
    pub wait_max_window_ms: u64,

    /// Largest accepted page scale factor.
    #[serde(default = "default_max_zoom")]
    pub max_zoom: f64,
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            navigation_timeout_ms: default_navigation_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            element_poll_window_ms: default_element_window_ms(),
            wait_max_window_ms: default_wait_max_window_ms(),
            max_zoom: default_max_zoom(),
        }
    }
}

fn default_navigation_timeout_ms() -> u64 {
    30_000
}

fn default_poll_interval_ms() -> u64 {
    100
}

fn default_element_window_ms() -> u64 {
    5_000
}

fn default_wait_max_window_ms() -> u64 {
    300_000
}

fn default_max_zoom() -> f64 {
    5.0
}

/// Workspace settings for run contexts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    #[serde(default = "default_workspace_root")]
    pub root: PathBuf,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            root: default_workspace_root(),
        }
    }
}

fn default_workspace_root() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".task-mind"))
        .unwrap_or_else(|| PathBuf::from("/tmp/task-mind"))
}

/// Recipe source directories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipesConfig {
    /// Bundled example recipes (lowest priority).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example_dir: Option<PathBuf>,

    /// User recipes.
    #[serde(default = "default_user_recipes")]
    pub user_dir: PathBuf,

    /// Project-local recipes (highest priority).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_dir: Option<PathBuf>,
}

impl Default for RecipesConfig {
    fn default() -> Self {
        Self {
            example_dir: None,
            user_dir: default_user_recipes(),
            project_dir: None,
        }
    }
}

fn default_user_recipes() -> PathBuf {
    default_workspace_root().join("recipes")
}

/// Background service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_host")]
    pub host: String,

    #[serde(default = "default_server_port")]
    pub port: u16,

    #[serde(default = "default_pid_file")]
    pub pid_file: PathBuf,

    #[serde(default = "default_startup_timeout_ms")]
    pub startup_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
            pid_file: default_pid_file(),
            startup_timeout_ms: default_startup_timeout_ms(),
        }
    }
}

fn default_server_host() -> String {
    "127.0.0.1".to_string()
}

fn default_server_port() -> u16 {
    8093
}

fn default_pid_file() -> PathBuf {
    default_workspace_root().join("server.pid")
}

fn default_startup_timeout_ms() -> u64 {
    5_000
}

#[cfg(test)]
#[path = "schema_tests.rs"]
mod tests;
