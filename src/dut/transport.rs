//! DUT transport layer
//!
//! [`Transport`] is the seam between the harness and a live data master.
//! [`DataMaster`] is the production implementation: one tool process per
//! request (`dm-cmd` / `dm-sched`), bounded by a timeout, with the exit
//! status and stderr classified into an [`Outcome`]. An input artifact is
//! passed both as a path argument and, verbatim, on the tool's stdin.

use std::collections::BTreeMap;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;

use crate::common::config::{Config, ToolConfig};
use crate::common::{Error, Result};

use super::protocol::{Domain, Outcome, Request};

/// A request/response channel to one DUT instance
///
/// Implementations are exclusively borrowed (`&mut self`) for every call, so
/// a handle is never shared between concurrently running test cases.
#[async_trait]
pub trait Transport: Send {
    /// Send one request and wait for its outcome
    async fn send(&mut self, request: &Request) -> Outcome;

    /// Human-readable name of the DUT instance, for reports
    fn describe(&self) -> String {
        "dut".to_string()
    }
}

/// Process-backed connection to a data master
#[derive(Debug, Clone)]
pub struct DataMaster {
    address: String,
    tools: BTreeMap<Domain, ToolConfig>,
    timeout: Duration,
    connection_markers: Vec<String>,
}

impl DataMaster {
    /// Create a connection handle from explicit parts
    pub fn new(
        address: impl Into<String>,
        tools: BTreeMap<Domain, ToolConfig>,
        timeout: Duration,
        connection_markers: Vec<String>,
    ) -> Self {
        Self {
            address: address.into(),
            tools,
            timeout,
            connection_markers,
        }
    }

    /// Build the connection handle from configuration
    ///
    /// `address` and `timeout_secs` override the configured values.
    pub fn from_config(
        config: &Config,
        address: Option<String>,
        timeout_secs: Option<u64>,
    ) -> Result<Self> {
        let address = address
            .or_else(|| config.data_master.address.clone())
            .ok_or_else(|| {
                Error::Config(
                    "No data master address. Pass --data-master or set [data_master] address"
                        .to_string(),
                )
            })?;

        let mut tools = BTreeMap::new();
        for domain in Domain::ALL {
            let tool = config.get_tool(domain).ok_or_else(|| Error::ToolNotFound {
                name: domain.as_str().to_string(),
            })?;
            tools.insert(domain, tool);
        }

        let timeout = Duration::from_secs(timeout_secs.unwrap_or(config.timeouts.command_secs));

        Ok(Self::new(
            address,
            tools,
            timeout,
            config.classification.connection_markers.clone(),
        ))
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Decide whether a failed tool run means the DUT was unreachable
    fn is_connection_failure(&self, stderr: &str) -> bool {
        self.connection_markers
            .iter()
            .any(|marker| !marker.is_empty() && stderr.contains(marker.as_str()))
    }

    fn build_command(&self, tool: &ToolConfig, request: &Request) -> Command {
        let stdin = if request.payload.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        };

        let mut cmd = Command::new(&tool.path);
        cmd.args(&tool.args)
            .arg(&self.address)
            .args(&request.words)
            .stdin(stdin)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl Transport for DataMaster {
    async fn send(&mut self, request: &Request) -> Outcome {
        let Some(tool) = self.tools.get(&request.domain) else {
            return Outcome::connection(format!(
                "no tool configured for domain '{}'",
                request.domain
            ));
        };

        tracing::debug!(
            tool = %tool.path.display(),
            address = %self.address,
            command = %request.command_line(),
            "Sending DUT command"
        );

        let mut child = match self.build_command(tool, request).spawn() {
            Ok(child) => child,
            Err(e) => {
                return Outcome::connection(format!(
                    "failed to start '{}': {}",
                    tool.path.display(),
                    e
                ))
            }
        };

        // Feed the payload while collecting output; the pipe closes when `feed` ends
        let stdin = child.stdin.take();
        let feed = async move {
            if let (Some(mut stdin), Some(payload)) = (stdin, request.payload.as_ref()) {
                match stdin.write_all(payload.contents.as_bytes()).await {
                    // The tool may exit without reading its input
                    Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
                    other => return other,
                }
            }
            Ok(())
        };
        let exchange = async {
            let (fed, output) = tokio::join!(feed, child.wait_with_output());
            fed.and(output)
        };

        let output = match timeout(self.timeout, exchange).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return Outcome::connection(format!("channel broken: {}", e)),
            Err(_) => {
                return Outcome::connection(format!(
                    "no response from {} within {} seconds",
                    self.address,
                    self.timeout.as_secs()
                ))
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if output.status.success() {
            tracing::trace!(bytes = stdout.len(), "DUT command succeeded");
            return Outcome::Success(stdout);
        }

        let Some(code) = output.status.code() else {
            return Outcome::connection(format!(
                "'{}' terminated by signal: {}",
                tool.path.display(),
                stderr.trim()
            ));
        };

        let message = if stderr.trim().is_empty() {
            stdout.trim().to_string()
        } else {
            stderr.trim().to_string()
        };

        if self.is_connection_failure(&message) {
            tracing::warn!(code, %message, "DUT unreachable");
            Outcome::connection(message)
        } else {
            tracing::debug!(code, %message, "DUT rejected command");
            Outcome::validation(message)
        }
    }

    fn describe(&self) -> String {
        self.address.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn handle(markers: &[&str]) -> DataMaster {
        DataMaster::new(
            "tcp/localhost",
            BTreeMap::new(),
            Duration::from_secs(1),
            markers.iter().map(|m| m.to_string()).collect(),
        )
    }

    #[test]
    fn test_connection_markers() {
        let dm = handle(&["eb-device", ""]);
        assert!(dm.is_connection_failure("eb-device: could not connect to tcp/x"));
        assert!(!dm.is_connection_failure(
            "Validation of Neighbourhood: Node A of type tmsg cannot be childless"
        ));
    }

    #[test]
    fn test_from_config_requires_address() {
        let config = Config::default();
        let err = DataMaster::from_config(&config, None, None).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_from_config_uses_configured_tools_and_overrides() {
        let mut config = Config::default();
        config.data_master.address = Some("tcp/configured".to_string());
        for domain in Domain::ALL {
            config.tools.insert(
                domain.as_str().to_string(),
                ToolConfig {
                    path: PathBuf::from("/bin/true"),
                    args: vec![domain.as_str().to_string()],
                },
            );
        }

        let dm = DataMaster::from_config(&config, Some("tcp/flag".to_string()), Some(3)).unwrap();
        assert_eq!(dm.address(), "tcp/flag");
        assert_eq!(dm.timeout, Duration::from_secs(3));
        assert_eq!(dm.tools[&Domain::Sched].args, vec!["sched"]);
    }

    /// A sched tool that echoes its stdin, then its arguments
    #[cfg(unix)]
    fn echoing_sched() -> DataMaster {
        let mut tools = BTreeMap::new();
        tools.insert(
            Domain::Sched,
            ToolConfig {
                path: PathBuf::from("sh"),
                args: vec!["-c".to_string(), r#"cat; echo "args:$*""#.to_string()],
            },
        );
        DataMaster::new("tcp/dm", tools, Duration::from_secs(10), Vec::new())
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_payload_reaches_tool_stdin() {
        let mut dm = echoing_sched();
        let request = Request {
            domain: Domain::Sched,
            words: vec!["add".into(), "0".into(), "p.dot".into()],
            payload: Some(crate::dut::Payload {
                path: PathBuf::from("p.dot"),
                contents: "node A type=tmsg\n".to_string(),
            }),
        };

        assert_eq!(
            dm.send(&request).await,
            Outcome::Success("node A type=tmsg\nargs:add 0 p.dot\n".to_string())
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_no_payload_leaves_stdin_empty() {
        let mut dm = echoing_sched();
        let request = Request {
            domain: Domain::Sched,
            words: vec!["clear".into()],
            payload: None,
        };

        assert_eq!(
            dm.send(&request).await,
            Outcome::Success("args:clear\n".to_string())
        );
    }

    #[tokio::test]
    async fn test_missing_tool_is_connection_failure() {
        let mut dm = handle(&[]);
        let request = Request {
            domain: Domain::Cmd,
            words: vec!["status".into()],
            payload: None,
        };
        assert!(matches!(
            dm.send(&request).await,
            Outcome::Failure {
                kind: crate::dut::FailureKind::Connection,
                ..
            }
        ));
    }
}
