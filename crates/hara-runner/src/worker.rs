//! Off-thread pipeline execution.
//!
//! The pipeline itself is synchronous. [`PipelineWorker`] moves an owned copy
//! of the workbook onto tokio's blocking pool, publishes every event on an
//! [`EventBus`], and hands back a [`RunHandle`] to await the outcome. Only one
//! run may be active per worker.

use crate::event_bus::EventBus;
use hara_core::error::HaraError;
use hara_core::event::EventKind;
use hara_core::pipeline::{Pipeline, SheetSelection};
use hara_core::result::ResultTable;
use hara_core::sheet::Workbook;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinHandle};

/// Why a run could not be started.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("a pipeline run is already in progress")]
    Busy,
}

/// Runs pipelines one at a time in the background.
#[derive(Debug, Clone)]
pub struct PipelineWorker {
    bus: EventBus,
    slot: Arc<Semaphore>,
}

impl PipelineWorker {
    pub fn new(bus: EventBus) -> Self {
        Self {
            bus,
            slot: Arc::new(Semaphore::new(1)),
        }
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Whether a run is currently in flight.
    pub fn is_busy(&self) -> bool {
        self.slot.available_permits() == 0
    }

    /// Start a run. Must be called from within a tokio runtime.
    ///
    /// Refuses with [`WorkerError::Busy`] while a previous run has not
    /// finished; the slot frees itself when the blocking task ends.
    pub fn spawn(
        &self,
        pipeline: Pipeline,
        workbook: Workbook,
        selection: SheetSelection,
    ) -> Result<RunHandle, WorkerError> {
        let permit = Arc::clone(&self.slot)
            .try_acquire_owned()
            .map_err(|_| WorkerError::Busy)?;
        let bus = self.bus.clone();

        tracing::info!(
            scenarios = %selection.scenarios,
            risk_assessment = %selection.risk_assessment,
            "starting pipeline run"
        );
        let handle = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            pipeline.run(&workbook, &selection, &bus)
        });

        Ok(RunHandle {
            handle,
            bus: self.bus.clone(),
        })
    }
}

/// Pending outcome of a spawned run.
#[derive(Debug)]
pub struct RunHandle {
    handle: JoinHandle<Result<ResultTable, HaraError>>,
    bus: EventBus,
}

impl RunHandle {
    /// Wait for the run to finish.
    ///
    /// A task that died without reporting (panic escaping the pipeline,
    /// runtime shutdown) is turned into an internal error and announced on
    /// the bus as `Failed`.
    pub async fn wait(self) -> Result<ResultTable, HaraError> {
        match self.handle.await {
            Ok(outcome) => outcome,
            Err(e) => {
                let err = HaraError::Internal(join_error_message(&e));
                tracing::error!(error = %err, "pipeline task aborted");
                self.bus
                    .emit(EventKind::error(format!("Error during processing: {err}")));
                self.bus.emit(EventKind::Failed {
                    message: err.to_string(),
                });
                Err(err)
            }
        }
    }
}

fn join_error_message(e: &JoinError) -> String {
    if e.is_cancelled() {
        "pipeline run was cancelled".to_string()
    } else {
        format!("pipeline run panicked: {e}")
    }
}
