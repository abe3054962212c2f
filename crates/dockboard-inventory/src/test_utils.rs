//! Scriptable [`RuntimeInspector`] for tests that must not touch a real runtime.

use crate::descriptor::{RawConfig, RawContainer, RawState};
use crate::inspector::RuntimeInspector;
use async_trait::async_trait;
use dockboard_common::{InventoryError, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Label written onto every container when call stamping is enabled.
pub const CALL_LABEL: &str = "dockboard.test.call";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Failure {
    Unavailable,
    Malformed,
}

pub struct FakeInspector {
    containers: Mutex<Vec<RawContainer>>,
    failure: Mutex<Option<Failure>>,
    delay: Duration,
    stamp: AtomicBool,
    list_calls: AtomicUsize,
    inspect_calls: AtomicUsize,
}

impl FakeInspector {
    pub fn new(containers: Vec<RawContainer>) -> Self {
        Self {
            containers: Mutex::new(containers),
            failure: Mutex::new(None),
            delay: Duration::ZERO,
            stamp: AtomicBool::new(false),
            list_calls: AtomicUsize::new(0),
            inspect_calls: AtomicUsize::new(0),
        }
    }

    /// Sleeps this long inside every listing call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Labels each inspected container with the number of the inspect call that produced it.
    pub fn stamp_calls(self) -> Self {
        self.stamp.store(true, Ordering::SeqCst);
        self
    }

    pub fn set_containers(&self, containers: Vec<RawContainer>) {
        *self.containers.lock().unwrap_or_else(|e| e.into_inner()) = containers;
    }

    /// Listing fails as if the runtime daemon were down.
    pub fn fail_unavailable(&self) {
        self.set_failure(Some(Failure::Unavailable));
    }

    /// Inspect returns output that does not parse.
    pub fn fail_malformed(&self) {
        self.set_failure(Some(Failure::Malformed));
    }

    pub fn recover(&self) {
        self.set_failure(None);
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn inspect_calls(&self) -> usize {
        self.inspect_calls.load(Ordering::SeqCst)
    }

    fn set_failure(&self, failure: Option<Failure>) {
        *self.failure.lock().unwrap_or_else(|e| e.into_inner()) = failure;
    }

    fn failure(&self) -> Option<Failure> {
        *self.failure.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl RuntimeInspector for FakeInspector {
    async fn list_container_ids(&self) -> Result<Vec<String>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.failure() == Some(Failure::Unavailable) {
            return Err(InventoryError::RuntimeUnavailable(
                "Cannot connect to the container runtime".to_string(),
            ));
        }

        let containers = self.containers.lock().unwrap_or_else(|e| e.into_inner());
        Ok(containers.iter().map(|c| c.id.clone()).collect())
    }

    async fn inspect(&self, ids: &[String]) -> Result<Vec<RawContainer>> {
        let call = self.inspect_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.failure() == Some(Failure::Malformed) {
            return Err(InventoryError::Parse(
                "expected value at line 1 column 1".to_string(),
            ));
        }

        let containers = self
            .containers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        let stamp = self.stamp.load(Ordering::SeqCst);

        Ok(ids
            .iter()
            .filter_map(|id| containers.iter().find(|c| &c.id == id).cloned())
            .map(|mut container| {
                if stamp {
                    container
                        .config
                        .get_or_insert_with(RawConfig::default)
                        .labels
                        .get_or_insert_with(HashMap::new)
                        .insert(CALL_LABEL.to_string(), call.to_string());
                }
                container
            })
            .collect())
    }
}

/// A running container with just enough detail to exercise the merge.
pub fn raw_container(id: &str, name: &str) -> RawContainer {
    RawContainer {
        id: id.to_string(),
        name: Some(format!("/{name}")),
        created: Some("2024-01-01T00:00:00Z".to_string()),
        state: Some(RawState {
            status: Some("running".to_string()),
            running: Some(true),
        }),
        config: Some(RawConfig {
            image: Some(format!("{name}:latest")),
            env: None,
            labels: None,
        }),
        ..Default::default()
    }
}
