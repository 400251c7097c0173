use std::path::Path;
use std::sync::Arc;

use tracing::info;

use super::{EngineError, EngineMode, PreconditionError, ResultEnvelope, RunPayload};
use crate::clock::{resolve_asof, Clock, SystemClock};
use crate::output::{JsonFileSink, OutputSink};

/// Dispatches payloads to engines and owns the clock and output sink they
/// share.
#[derive(Clone)]
pub struct EngineRegistry {
    clock: Arc<dyn Clock>,
    sink: Arc<dyn OutputSink>,
    default_mode: EngineMode,
}

impl EngineRegistry {
    pub fn new(clock: Arc<dyn Clock>, sink: Arc<dyn OutputSink>) -> Self {
        Self {
            clock,
            sink,
            default_mode: EngineMode::default(),
        }
    }

    /// System clock and JSON file sink.
    pub fn standard() -> Self {
        Self::new(Arc::new(SystemClock), Arc::new(JsonFileSink))
    }

    /// Mode used when a payload does not name one.
    pub fn with_default_mode(mut self, mode: EngineMode) -> Self {
        self.default_mode = mode;
        self
    }

    pub fn default_mode(&self) -> EngineMode {
        self.default_mode
    }

    pub fn resolve_mode(&self, payload: &RunPayload) -> Result<EngineMode, PreconditionError> {
        match payload.mode.as_deref() {
            Some(mode) => mode.parse(),
            None => Ok(self.default_mode),
        }
    }

    /// Run the engine named by the payload's `mode`.
    pub fn run(
        &self,
        payload: &RunPayload,
        fixed_ts: Option<&str>,
        out_path: Option<&Path>,
    ) -> Result<ResultEnvelope, EngineError> {
        let mode = self.resolve_mode(payload)?;
        self.run_mode(mode, payload, fixed_ts, out_path)
    }

    /// Run a specific engine. With `out_path` the report is also persisted
    /// through the sink; without it nothing is written.
    pub fn run_mode(
        &self,
        mode: EngineMode,
        payload: &RunPayload,
        fixed_ts: Option<&str>,
        out_path: Option<&Path>,
    ) -> Result<ResultEnvelope, EngineError> {
        let asof = resolve_asof(fixed_ts, self.clock.as_ref());
        let envelope = mode.engine().evaluate(payload, asof)?;

        if let Some(path) = out_path {
            self.sink.write(&envelope.to_value()?, path)?;
        }

        info!(
            %mode,
            scenario = %envelope.scenario(),
            overall = envelope.overall_signal(),
            persisted = out_path.is_some(),
            "engine run complete"
        );
        Ok(envelope)
    }
}

impl Default for EngineRegistry {
    fn default() -> Self {
        Self::standard()
    }
}
