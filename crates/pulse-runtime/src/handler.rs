//! The bound callable and its script-backed implementation.

use std::sync::Arc;

use pulse_core::{ExecutionContext, MetricsRecord, MetricsResult};
use rhai::serde::{from_dynamic, to_dynamic};
use rhai::{AST, Dynamic, Engine, Scope};

use crate::error::HandlerError;

/// The contract every resolved function satisfies: one synchronous call per
/// tick with the current record and the persistent context. Never invoked
/// concurrently — the loop is strictly sequential.
pub trait Handler: Send + Sync {
    fn call(
        &self,
        record: &MetricsRecord,
        ctx: &mut ExecutionContext,
    ) -> Result<MetricsResult, HandlerError>;
}

impl std::fmt::Debug for dyn Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("dyn Handler")
    }
}

/// A handler bound to a named function inside a compiled script AST.
///
/// Per call, the record and a context view are converted into script
/// values; the state map is passed as a *shared* value so mutations made by
/// the script (directly, or through the registered window functions) are
/// visible to the host, which reads the state back after the call.
pub struct ScriptHandler {
    engine: Arc<Engine>,
    ast: AST,
    entry_point: String,
}

impl ScriptHandler {
    pub fn new(engine: Arc<Engine>, ast: AST, entry_point: impl Into<String>) -> Self {
        Self {
            engine,
            ast,
            entry_point: entry_point.into(),
        }
    }

    pub fn entry_point(&self) -> &str {
        &self.entry_point
    }

    /// The context as the script sees it: identity and provenance fields
    /// plus the shared state handle.
    fn context_view(ctx: &ExecutionContext, state: Dynamic) -> rhai::Map {
        let mut view = rhai::Map::new();
        view.insert("store_host".into(), ctx.store_host.clone().into());
        view.insert("store_port".into(), Dynamic::from(ctx.store_port as i64));
        view.insert("input_key".into(), ctx.input_key.clone().into());
        view.insert(
            "output_key".into(),
            match &ctx.output_key {
                Some(key) => key.clone().into(),
                None => Dynamic::UNIT,
            },
        );
        view.insert(
            "function_revision".into(),
            ctx.function_revision.clone().into(),
        );
        view.insert(
            "last_execution".into(),
            match ctx.last_execution {
                Some(at) => at.to_rfc3339().into(),
                None => Dynamic::UNIT,
            },
        );
        view.insert("state".into(), state);
        view
    }
}

impl Handler for ScriptHandler {
    fn call(
        &self,
        record: &MetricsRecord,
        ctx: &mut ExecutionContext,
    ) -> Result<MetricsResult, HandlerError> {
        let record_dyn = to_dynamic(record).map_err(|e| HandlerError::State(e.to_string()))?;
        let state_dyn = to_dynamic(&ctx.state)
            .map_err(|e| HandlerError::State(e.to_string()))?
            .into_shared();

        let context_view = Self::context_view(ctx, state_dyn.clone());

        let result = self
            .engine
            .call_fn::<Dynamic>(
                &mut Scope::new(),
                &self.ast,
                &self.entry_point,
                (record_dyn, Dynamic::from(context_view)),
            )
            .map_err(|e| HandlerError::Eval(e.to_string()))?;

        // Whatever the script did to the shared state map becomes the next
        // tick's starting state.
        ctx.state =
            from_dynamic(&state_dyn.flatten()).map_err(|e| HandlerError::State(e.to_string()))?;

        if !result.is_map() {
            return Err(HandlerError::NotAMap(result.type_name()));
        }
        from_dynamic(&result).map_err(|e| HandlerError::Eval(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::build_engine;
    use serde_json::json;
    use std::path::Path;

    fn handler_for(script: &str) -> ScriptHandler {
        let engine = build_engine();
        let ast = engine.compile(script).unwrap();
        ScriptHandler::new(engine, ast, "handler")
    }

    fn ctx() -> ExecutionContext {
        ExecutionContext::new("127.0.0.1", 6379, "metrics", None, Path::new("/nonexistent"))
    }

    fn record(entries: &[(&str, serde_json::Value)]) -> MetricsRecord {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn script_receives_record_and_returns_map() {
        let handler = handler_for(
            r#"fn handler(record, context) {
                #{ "echo": record["cpu_percent-0"] }
            }"#,
        );
        let input = record(&[("cpu_percent-0", json!(42.0))]);
        let result = handler.call(&input, &mut ctx()).unwrap();
        assert_eq!(result["echo"], json!(42.0));
    }

    #[test]
    fn script_state_survives_across_calls() {
        let handler = handler_for(
            r#"fn handler(record, context) {
                let runs = if "runs" in context.state { context.state.runs } else { 0 };
                context.state.runs = runs + 1;
                #{ "runs": context.state.runs }
            }"#,
        );
        let input = record(&[]);
        let mut ctx = ctx();

        assert_eq!(handler.call(&input, &mut ctx).unwrap()["runs"], json!(1));
        assert_eq!(handler.call(&input, &mut ctx).unwrap()["runs"], json!(2));
        assert_eq!(ctx.state.extra["runs"], json!(2));
    }

    #[test]
    fn script_sees_context_identity_fields() {
        let handler = handler_for(
            r#"fn handler(record, context) {
                #{ "host": context.store_host, "revision": context.function_revision }
            }"#,
        );
        let result = handler.call(&record(&[]), &mut ctx()).unwrap();
        assert_eq!(result["host"], json!("127.0.0.1"));
        assert_eq!(result["revision"], json!("unknown"));
    }

    #[test]
    fn non_map_return_is_a_distinct_error() {
        let handler = handler_for("fn handler(record, context) { 42 }");
        let err = handler.call(&record(&[]), &mut ctx()).unwrap_err();
        assert!(matches!(err, HandlerError::NotAMap(_)));
    }

    #[test]
    fn script_runtime_error_is_contained_in_eval() {
        let handler = handler_for(
            r#"fn handler(record, context) {
                record["missing"].some_method()
            }"#,
        );
        let err = handler.call(&record(&[]), &mut ctx()).unwrap_err();
        assert!(matches!(err, HandlerError::Eval(_)));
    }

    #[test]
    fn state_unchanged_by_read_only_script() {
        let handler = handler_for("fn handler(record, context) { #{} }");
        let mut ctx = ctx();
        handler.call(&record(&[]), &mut ctx).unwrap();
        assert!(ctx.state.is_empty());
    }
}
