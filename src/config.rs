//! Configuration management for the Bubble FTP server
//!
//! Values come from built-in defaults, an optional `config.toml` in the
//! working directory, and `BUBBLE_FTP_*` environment variables, in that order.

use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

const CONFIG_FILE: &str = "config";
const ENV_PREFIX: &str = "BUBBLE_FTP";

/// Complete server configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    // ═══ NETWORK ═══
    /// IP address the control listener binds to
    pub bind_address: String,

    /// Port for the control connection
    pub control_port: u16,

    /// Maximum number of sessions served at once
    pub max_workers: usize,

    // ═══ FILESYSTEM ═══
    /// Initial working directory of every session
    pub start_directory: String,

    /// Reject CWD targets that leave the start directory
    pub confine_to_start_directory: bool,

    // ═══ AUTHENTICATION ═══
    /// Gate navigation and listing commands behind a successful PASS
    pub require_login: bool,

    pub username: String,
    pub password: String,

    // ═══ LIMITS ═══
    /// Longest accepted control line, in bytes
    pub max_command_length: usize,

    /// Control read timeout in seconds, 0 disables it
    pub idle_timeout_secs: u64,

    /// Timeout for the outbound data connection
    pub data_connect_timeout_secs: u64,

    /// How long shutdown waits for sessions before aborting them
    pub shutdown_grace_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            control_port: 2121,
            max_workers: 10,
            start_directory: ".".to_string(),
            confine_to_start_directory: false,
            require_login: false,
            username: "bolhoso".to_string(),
            password: "mypass".to_string(),
            max_command_length: 512,
            idle_timeout_secs: 0,
            data_connect_timeout_secs: 10,
            shutdown_grace_secs: 5,
        }
    }
}

impl ServerConfig {
    /// Load configuration from defaults, `config.toml` and the environment.
    pub fn load() -> Result<Self, config::ConfigError> {
        let defaults = Self::default();

        let settings = Config::builder()
            .set_default("bind_address", defaults.bind_address)?
            .set_default("control_port", i64::from(defaults.control_port))?
            .set_default("max_workers", defaults.max_workers as i64)?
            .set_default("start_directory", defaults.start_directory)?
            .set_default(
                "confine_to_start_directory",
                defaults.confine_to_start_directory,
            )?
            .set_default("require_login", defaults.require_login)?
            .set_default("username", defaults.username)?
            .set_default("password", defaults.password)?
            .set_default("max_command_length", defaults.max_command_length as i64)?
            .set_default("idle_timeout_secs", defaults.idle_timeout_secs as i64)?
            .set_default(
                "data_connect_timeout_secs",
                defaults.data_connect_timeout_secs as i64,
            )?
            .set_default("shutdown_grace_secs", defaults.shutdown_grace_secs as i64)?
            .add_source(File::with_name(CONFIG_FILE).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?;

        let config: ServerConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validation for all configuration values
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        if self.control_port == 0 {
            return Err(config::ConfigError::Message(
                "control_port cannot be 0".into(),
            ));
        }

        if self.max_workers == 0 {
            return Err(config::ConfigError::Message(
                "max_workers must be greater than 0".into(),
            ));
        }

        if self.start_directory.is_empty() {
            return Err(config::ConfigError::Message(
                "start_directory cannot be empty".into(),
            ));
        }

        if self.username.is_empty() || self.password.is_empty() {
            return Err(config::ConfigError::Message(
                "username and password must both be set".into(),
            ));
        }

        if self.max_command_length == 0 {
            return Err(config::ConfigError::Message(
                "max_command_length must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Bind address and control port as a socket address string
    pub fn control_socket(&self) -> String {
        format!("{}:{}", self.bind_address, self.control_port)
    }

    pub fn start_directory_path(&self) -> PathBuf {
        PathBuf::from(&self.start_directory)
    }

    /// Control read timeout, if enabled
    pub fn idle_timeout(&self) -> Option<Duration> {
        (self.idle_timeout_secs > 0).then(|| Duration::from_secs(self.idle_timeout_secs))
    }

    pub fn data_connect_timeout(&self) -> Duration {
        Duration::from_secs(self.data_connect_timeout_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}
