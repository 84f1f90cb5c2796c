//! Server configuration from the environment

use crate::llm::LlmConfig;
use crate::runtime::WorkflowConfig;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_PORT: u16 = 8000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be {expected}, got '{value}'")]
    Invalid {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Where checkpoints live
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreKind {
    Sqlite(PathBuf),
    /// Lost on restart; for local experiments
    Memory,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub store: StoreKind,
    pub workflow: WorkflowConfig,
    pub llm: LlmConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::from_lookup(|name| std::env::var(name).ok())?;
        config.llm = LlmConfig::from_env();
        config.llm.http_timeout = Some(config.workflow.reasoning_timeout);
        Ok(config)
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| get(name).filter(|v| !v.trim().is_empty());

        let port = match get("SLIP_AGENT_PORT") {
            Some(v) => parse(&v, "SLIP_AGENT_PORT", "a port number")?,
            None => DEFAULT_PORT,
        };

        let store = match get("SLIP_AGENT_STORE").as_deref() {
            None | Some("sqlite") => StoreKind::Sqlite(get("SLIP_AGENT_DB_PATH").map_or_else(
                || {
                    let home = get("HOME").unwrap_or_else(|| "/tmp".to_string());
                    PathBuf::from(format!("{home}/.slip-agent/checkpoints.db"))
                },
                PathBuf::from,
            )),
            Some("memory") => StoreKind::Memory,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "SLIP_AGENT_STORE",
                    expected: "'sqlite' or 'memory'",
                    value: other.to_string(),
                })
            }
        };

        let defaults = WorkflowConfig::default();
        let workflow = WorkflowConfig {
            reasoning_timeout: seconds(
                get("SLIP_AGENT_REASONING_TIMEOUT_SECS"),
                "SLIP_AGENT_REASONING_TIMEOUT_SECS",
                defaults.reasoning_timeout,
            )?,
            tool_timeout: seconds(
                get("SLIP_AGENT_TOOL_TIMEOUT_SECS"),
                "SLIP_AGENT_TOOL_TIMEOUT_SECS",
                defaults.tool_timeout,
            )?,
        };

        Ok(Self {
            port,
            store,
            workflow,
            llm: LlmConfig::default(),
        })
    }
}

fn parse<T: std::str::FromStr>(value: &str, name: &'static str, expected: &'static str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        name,
        expected,
        value: value.to_string(),
    })
}

fn seconds(value: Option<String>, name: &'static str, default: Duration) -> Result<Duration, ConfigError> {
    match value {
        None => Ok(default),
        Some(v) => match parse::<u64>(&v, name, "a positive number of seconds")? {
            0 => Err(ConfigError::Invalid {
                name,
                expected: "a positive number of seconds",
                value: v,
            }),
            secs => Ok(Duration::from_secs(secs)),
        },
    }
}
