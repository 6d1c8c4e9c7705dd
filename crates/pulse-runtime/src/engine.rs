//! Script engine assembly.
//!
//! One shared [`Engine`] backs every compiled script. The window engine and
//! the ratio metrics are registered as host functions, so a deployed script
//! reuses the host's aggregation logic instead of carrying its own:
//!
//! ```rhai
//! fn handler(record, context) {
//!     let result = #{ "percent-network-egress": percent_network_egress(record) };
//!     result.mixin(moving_averages(context.state, record));
//!     result
//! }
//! ```

use std::sync::Arc;

use pulse_core::{ContextState, MetricsRecord};
use rhai::serde::{from_dynamic, to_dynamic};
use rhai::{Dynamic, Engine, EvalAltResult};

fn record_from(map: rhai::Map) -> Result<MetricsRecord, Box<EvalAltResult>> {
    from_dynamic(&Dynamic::from(map))
}

/// Build the shared script engine with the host function library installed.
pub fn build_engine() -> Arc<Engine> {
    let mut engine = Engine::new();

    engine.register_fn(
        "percent_network_egress",
        |record: rhai::Map| -> Result<f64, Box<EvalAltResult>> {
            Ok(pulsegrid_window::percent_network_egress(&record_from(
                record,
            )?))
        },
    );

    engine.register_fn(
        "percent_memory_cache",
        |record: rhai::Map| -> Result<f64, Box<EvalAltResult>> {
            Ok(pulsegrid_window::percent_memory_cache(&record_from(
                record,
            )?))
        },
    );

    // Mutates the script-visible state map in place: histories are pruned,
    // appended, and written back, exactly as for a native caller.
    engine.register_fn(
        "moving_averages",
        |state: &mut rhai::Map, record: rhai::Map| -> Result<rhai::Map, Box<EvalAltResult>> {
            let record = record_from(record)?;
            let mut context_state: ContextState = from_dynamic(&Dynamic::from(state.clone()))?;
            let averages = pulsegrid_window::moving_averages(&record, &mut context_state);
            *state = to_dynamic(&context_state)?
                .try_cast::<rhai::Map>()
                .ok_or("context state did not serialize to a map")?;
            to_dynamic(&averages)?
                .try_cast::<rhai::Map>()
                .ok_or_else(|| "moving averages did not serialize to a map".into())
        },
    );

    Arc::new(engine)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rhai::Scope;

    #[test]
    fn registered_ratios_are_callable_from_script() {
        let engine = build_engine();
        let script = r#"
            let record = #{
                "net_io_counters_eth0-bytes_sent": 30.0,
                "net_io_counters_eth0-bytes_recv": 70.0,
            };
            percent_network_egress(record)
        "#;
        let share = engine.eval::<f64>(script).unwrap();
        assert_eq!(share, 30.0);
    }

    #[test]
    fn registered_window_engine_mutates_state_map() {
        let engine = build_engine();
        let script = r#"
            let state = #{ "history": #{} };
            let record = #{
                "timestamp": "2026-08-04T10:00:00Z",
                "cpu_percent-0": 40.0,
            };
            let averages = moving_averages(state, record);
            [averages["avg-util-cpu0-60sec"], state.history["cpu_percent-0"].len()]
        "#;
        let out = engine.eval::<rhai::Array>(script).unwrap();
        assert_eq!(out[0].as_float().unwrap(), 40.0);
        assert_eq!(out[1].as_int().unwrap(), 1);
    }

    #[test]
    fn window_engine_accumulates_across_evaluations() {
        let engine = build_engine();
        let mut scope = Scope::new();
        scope.push("state", rhai::Map::new());

        let script = r#"
            let record = #{
                "timestamp": "2026-08-04T10:00:30Z",
                "cpu_percent-0": 20.0,
            };
            let averages = moving_averages(state, record);
            averages["avg-util-cpu0-60sec"]
        "#;
        let first = engine.eval_with_scope::<f64>(&mut scope, script).unwrap();
        assert_eq!(first, 20.0);

        let script = r#"
            let record = #{
                "timestamp": "2026-08-04T10:00:40Z",
                "cpu_percent-0": 40.0,
            };
            let averages = moving_averages(state, record);
            averages["avg-util-cpu0-60sec"]
        "#;
        let second = engine.eval_with_scope::<f64>(&mut scope, script).unwrap();
        assert_eq!(second, 30.0);
    }
}
