use showcase_core::prelude::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::info;

/// Counts deploy launches and pushes instead of running anything.
#[derive(Clone, Default)]
pub struct RecordingDeployer {
    launches: Arc<AtomicUsize>,
    pushes: Arc<AtomicUsize>,
}

impl RecordingDeployer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    pub fn pushes(&self) -> usize {
        self.pushes.load(Ordering::SeqCst)
    }
}

impl Deployer for RecordingDeployer {
    async fn launch(&self) -> Result<LaunchReceipt, DeployError> {
        let n = self.launches.fetch_add(1, Ordering::SeqCst) + 1;
        info!("Recorded deploy launch #{n}");
        Ok(LaunchReceipt {
            log_file: format!("{LOG_PREFIX}mock-{n}{LOG_EXTENSION}"),
            pid: None,
        })
    }

    async fn push(&self) -> Result<PushReport, DeployError> {
        self.pushes.fetch_add(1, Ordering::SeqCst);
        Ok(PushReport {
            commit_message: "mock commit".to_string(),
            committed: true,
            output: String::new(),
        })
    }
}
