use crate::descriptor::RawContainer;
use async_trait::async_trait;
use dockboard_common::{InventoryError, Result};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, instrument};

/// Source of raw container inventory. Every call is a fresh round trip.
#[async_trait]
pub trait RuntimeInspector: Send + Sync {
    async fn list_container_ids(&self) -> Result<Vec<String>>;

    /// `ids` must be non-empty.
    async fn inspect(&self, ids: &[String]) -> Result<Vec<RawContainer>>;
}

#[derive(Debug, Clone)]
pub struct InspectorConfig {
    pub binary: String,
    pub timeout: Duration,
    /// Include stopped containers in the listing (`ps -a`).
    pub include_stopped: bool,
}

impl Default for InspectorConfig {
    fn default() -> Self {
        Self {
            binary: "docker".to_string(),
            timeout: Duration::from_secs(10),
            include_stopped: true,
        }
    }
}

/// Inspector backed by the runtime's command line client.
#[derive(Debug, Clone)]
pub struct CliInspector {
    config: InspectorConfig,
}

impl CliInspector {
    pub fn new(config: InspectorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &InspectorConfig {
        &self.config
    }

    async fn run(&self, args: &[&str], ids: &[String]) -> Result<Vec<u8>> {
        let mut command = Command::new(&self.config.binary);
        command
            .args(args)
            .args(ids)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = command.spawn().map_err(|e| {
            InventoryError::RuntimeUnavailable(format!(
                "failed to spawn {}: {}",
                self.config.binary, e
            ))
        })?;

        let output = tokio::time::timeout(self.config.timeout, child.wait_with_output())
            .await
            .map_err(|_| {
                InventoryError::RuntimeUnavailable(format!(
                    "{} {} timed out after {:?}",
                    self.config.binary,
                    args.join(" "),
                    self.config.timeout
                ))
            })?
            .map_err(|e| InventoryError::RuntimeUnavailable(e.to_string()))?;

        if !output.status.success() {
            return Err(InventoryError::RuntimeUnavailable(format!(
                "{} {} exited with {}: {}",
                self.config.binary,
                args.join(" "),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(output.stdout)
    }
}

#[async_trait]
impl RuntimeInspector for CliInspector {
    #[instrument(skip(self), fields(binary = %self.config.binary))]
    async fn list_container_ids(&self) -> Result<Vec<String>> {
        let args: &[&str] = if self.config.include_stopped {
            &["ps", "-a", "-q", "--no-trunc"]
        } else {
            &["ps", "-q", "--no-trunc"]
        };
        let stdout = self.run(args, &[]).await?;
        let ids = parse_id_list(&String::from_utf8_lossy(&stdout));
        debug!(count = ids.len(), "Listed containers");
        Ok(ids)
    }

    #[instrument(skip(self, ids), fields(binary = %self.config.binary, count = ids.len()))]
    async fn inspect(&self, ids: &[String]) -> Result<Vec<RawContainer>> {
        if ids.is_empty() {
            return Err(InventoryError::InvalidInput(
                "inspect requires at least one container id".to_string(),
            ));
        }
        let stdout = self.run(&["inspect", "--size"], ids).await?;
        parse_descriptors(&stdout)
    }
}

/// Parses line-delimited container ids, skipping blank lines.
pub fn parse_id_list(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parses the JSON array printed by `inspect`.
pub fn parse_descriptors(stdout: &[u8]) -> Result<Vec<RawContainer>> {
    serde_json::from_slice(stdout).map_err(|e| InventoryError::Parse(e.to_string()))
}
