//! The execution loop: fetch — invoke — store — sleep.
//!
//! One sequential task for the process lifetime. Ticks never overlap, and
//! nothing that happens inside a tick can end the loop: fetch and store
//! failures are already swallowed by the bridge, and handler failures are
//! contained here.

use std::path::PathBuf;
use std::time::Duration;

use pulse_core::ExecutionContext;
use pulse_runtime::Handler;
use pulsegrid_bridge::KeyValueBridge;
use tracing::{debug, error, info, warn};

pub struct ExecutionLoop<B: KeyValueBridge> {
    bridge: B,
    handler: Box<dyn Handler>,
    ctx: ExecutionContext,
    interval: Duration,
    /// Provenance probe target, re-derived after every invocation attempt.
    module_path: PathBuf,
}

impl<B: KeyValueBridge> ExecutionLoop<B> {
    pub fn new(
        bridge: B,
        handler: Box<dyn Handler>,
        ctx: ExecutionContext,
        interval: Duration,
        module_path: PathBuf,
    ) -> Self {
        Self {
            bridge,
            handler,
            ctx,
            interval,
            module_path,
        }
    }

    /// Run until the process is killed.
    pub async fn run(mut self) {
        info!(
            input_key = %self.ctx.input_key,
            interval_secs = self.interval.as_secs(),
            "execution loop started"
        );
        loop {
            self.tick().await;
            tokio::time::sleep(self.interval).await;
        }
    }

    /// One tick. A missing input record leaves the context untouched; an
    /// invocation attempt (successful or not) advances `last_execution`
    /// and refreshes the provenance marker.
    async fn tick(&mut self) {
        let Some(value) = self.bridge.fetch(&self.ctx.input_key).await else {
            return;
        };

        match value {
            serde_json::Value::Object(record) => {
                match self.handler.call(&record, &mut self.ctx) {
                    Ok(result) => match self.ctx.output_key.clone() {
                        Some(output_key) => self.bridge.store(&output_key, &result).await,
                        None => debug!("no output key configured, result dropped"),
                    },
                    Err(err) => {
                        error!(error = %err, "handler invocation failed, no output this tick");
                    }
                }
            }
            other => {
                warn!(
                    input_key = %self.ctx.input_key,
                    found = %other,
                    "input record is not a JSON object, no output this tick"
                );
            }
        }

        self.ctx.mark_executed(&self.module_path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_core::{MetricsRecord, MetricsResult};
    use pulse_runtime::HandlerError;
    use pulsegrid_bridge::MemoryBridge;
    use serde_json::json;
    use std::path::Path;

    struct EchoHandler;

    impl Handler for EchoHandler {
        fn call(
            &self,
            record: &MetricsRecord,
            _ctx: &mut ExecutionContext,
        ) -> Result<MetricsResult, HandlerError> {
            Ok(record.clone())
        }
    }

    struct FailingHandler;

    impl Handler for FailingHandler {
        fn call(
            &self,
            _record: &MetricsRecord,
            _ctx: &mut ExecutionContext,
        ) -> Result<MetricsResult, HandlerError> {
            Err(HandlerError::Eval("boom".to_string()))
        }
    }

    fn make_loop(bridge: MemoryBridge, handler: Box<dyn Handler>) -> ExecutionLoop<MemoryBridge> {
        let ctx = ExecutionContext::new(
            "127.0.0.1",
            6379,
            "metrics",
            Some("metrics-out".to_string()),
            Path::new("/nonexistent/usermodule.rhai"),
        );
        ExecutionLoop::new(
            bridge,
            handler,
            ctx,
            Duration::from_secs(5),
            PathBuf::from("/nonexistent/usermodule.rhai"),
        )
    }

    #[tokio::test]
    async fn tick_fetches_invokes_and_stores() {
        let mut bridge = MemoryBridge::new();
        bridge.put_raw("metrics", r#"{"cpu_percent-0": 10.0}"#);

        let mut exec = make_loop(bridge, Box::new(EchoHandler));
        exec.tick().await;

        let stored = exec.bridge.get_raw("metrics-out").unwrap();
        let stored: serde_json::Value = serde_json::from_str(stored).unwrap();
        assert_eq!(stored, json!({"cpu_percent-0": 10.0}));
        assert!(exec.ctx.last_execution.is_some());
    }

    #[tokio::test]
    async fn missing_input_skips_without_advancing_context() {
        let mut exec = make_loop(MemoryBridge::new(), Box::new(EchoHandler));
        exec.tick().await;

        assert!(exec.bridge.get_raw("metrics-out").is_none());
        assert!(exec.ctx.last_execution.is_none());
    }

    #[tokio::test]
    async fn malformed_input_counts_as_absent() {
        let mut bridge = MemoryBridge::new();
        bridge.put_raw("metrics", "{not json");

        let mut exec = make_loop(bridge, Box::new(EchoHandler));
        exec.tick().await;

        assert!(exec.bridge.get_raw("metrics-out").is_none());
        assert!(exec.ctx.last_execution.is_none());
    }

    #[tokio::test]
    async fn non_object_input_is_contained_and_advances_context() {
        let mut bridge = MemoryBridge::new();
        bridge.put_raw("metrics", "[1, 2, 3]");

        let mut exec = make_loop(bridge, Box::new(EchoHandler));
        exec.tick().await;

        assert!(exec.bridge.get_raw("metrics-out").is_none());
        assert!(exec.ctx.last_execution.is_some());
    }

    #[tokio::test]
    async fn handler_failure_produces_no_output_and_loop_continues() {
        let mut bridge = MemoryBridge::new();
        bridge.put_raw("metrics", r#"{"cpu_percent-0": 10.0}"#);

        let mut exec = make_loop(bridge, Box::new(FailingHandler));
        exec.tick().await;
        assert!(exec.bridge.get_raw("metrics-out").is_none());
        assert!(exec.ctx.last_execution.is_some());

        // The next tick proceeds normally.
        exec.tick().await;
        assert!(exec.bridge.get_raw("metrics-out").is_none());
    }

    #[tokio::test]
    async fn no_output_key_drops_result_without_storing() {
        let mut bridge = MemoryBridge::new();
        bridge.put_raw("metrics", r#"{"v": 1}"#);

        let ctx = ExecutionContext::new(
            "127.0.0.1",
            6379,
            "metrics",
            None,
            Path::new("/nonexistent/usermodule.rhai"),
        );
        let mut exec = ExecutionLoop::new(
            bridge,
            Box::new(EchoHandler) as Box<dyn Handler>,
            ctx,
            Duration::from_secs(5),
            PathBuf::from("/nonexistent/usermodule.rhai"),
        );
        exec.tick().await;

        assert!(exec.bridge.get_raw("metrics-out").is_none());
        assert!(exec.ctx.last_execution.is_some());
    }
}
