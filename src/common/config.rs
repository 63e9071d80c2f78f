//! Configuration file handling

use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::paths::config_path;
use super::Result;
use crate::dut::Domain;

/// Main configuration structure
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Data master connection settings
    #[serde(default)]
    pub data_master: DataMasterConfig,

    /// Command-line tool used for each command domain, keyed by domain name
    #[serde(default)]
    pub tools: HashMap<String, ToolConfig>,

    /// Timeout settings
    #[serde(default)]
    pub timeouts: Timeouts,

    /// Rules for telling connection failures apart from DUT rejections
    #[serde(default)]
    pub classification: Classification,
}

/// Data master connection settings
#[derive(Debug, Deserialize, Default)]
pub struct DataMasterConfig {
    /// Address handed to every tool invocation (e.g. "tcp/scuxl0001.acc")
    pub address: Option<String>,
}

/// Invocation of a DUT command-line tool
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct ToolConfig {
    /// Path to the tool executable
    pub path: PathBuf,

    /// Arguments placed before the data master address
    #[serde(default)]
    pub args: Vec<String>,
}

/// Timeout settings in seconds
#[derive(Debug, Deserialize)]
pub struct Timeouts {
    /// Upper bound for a single DUT command
    #[serde(default = "default_command")]
    pub command_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            command_secs: default_command(),
        }
    }
}

fn default_command() -> u64 {
    30
}

/// Failure classification settings
#[derive(Debug, Deserialize)]
pub struct Classification {
    /// Substrings of tool stderr that indicate the DUT could not be reached
    #[serde(default = "default_connection_markers")]
    pub connection_markers: Vec<String>,
}

impl Default for Classification {
    fn default() -> Self {
        Self {
            connection_markers: default_connection_markers(),
        }
    }
}

fn default_connection_markers() -> Vec<String> {
    vec![
        "eb-device".to_string(),
        "Etherbone".to_string(),
        "could not connect".to_string(),
        "Connection refused".to_string(),
    ]
}

impl Config {
    /// Load configuration from the default config file
    ///
    /// Returns default configuration if file doesn't exist
    pub fn load() -> Result<Self> {
        match config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load configuration from an explicit path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| super::Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| super::Error::ConfigParse(e.to_string()))?;

        for name in config.tools.keys() {
            if name.parse::<Domain>().is_err() {
                return Err(super::Error::ConfigParse(format!(
                    "unknown command domain '{}' in [tools]",
                    name
                )));
            }
        }

        Ok(config)
    }

    /// Get the tool for a domain
    ///
    /// Falls back to searching PATH for the domain's default tool name
    pub fn get_tool(&self, domain: Domain) -> Option<ToolConfig> {
        if let Some(config) = self.tools.get(domain.as_str()) {
            return Some(config.clone());
        }

        which::which(domain.default_tool()).ok().map(|path| ToolConfig {
            path,
            args: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_empty() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.timeouts.command_secs, 30);
        assert!(config.data_master.address.is_none());
        assert!(config
            .classification
            .connection_markers
            .iter()
            .any(|m| m == "eb-device"));
    }

    #[test]
    fn test_parse_tools_and_address() {
        let config = Config::parse(
            r#"
[data_master]
address = "tcp/localhost"

[tools.cmd]
path = "/opt/dm/bin/dm-cmd"

[tools.sched]
path = "/usr/local/bin/mock_dm"
args = ["sched"]

[timeouts]
command_secs = 5

[classification]
connection_markers = ["unreachable"]
"#,
        )
        .unwrap();

        assert_eq!(config.data_master.address.as_deref(), Some("tcp/localhost"));
        assert_eq!(config.timeouts.command_secs, 5);
        assert_eq!(config.classification.connection_markers, vec!["unreachable"]);

        let sched = config.get_tool(Domain::Sched).unwrap();
        assert_eq!(sched.path, PathBuf::from("/usr/local/bin/mock_dm"));
        assert_eq!(sched.args, vec!["sched"]);
    }

    #[test]
    fn test_unknown_domain_is_rejected() {
        let err = Config::parse("[tools.flux]\npath = \"x\"\n").unwrap_err();
        assert!(matches!(err, crate::common::Error::ConfigParse(_)));
    }
}
