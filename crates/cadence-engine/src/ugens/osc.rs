//! `osc`, `sin`, `square`, `saw` and `tri`.
//!
//! `freq` (or `frequency`) accepts numbers, signals and musical strings
//! such as `"4n"`; inputs are added to it. `detune` is in cents.

use cadence_ir::{NodeKind, StartCall, Waveform};

use crate::context::Context;
use crate::input::Input;
use crate::registry::Registry;
use crate::spec::{Spec, SpecValue};
use crate::sum::sum;
use crate::unit::Unit;
use crate::value::Value;

const DEFAULT_FREQUENCY: f64 = 440.0;

pub(super) fn register(registry: &mut Registry) {
    registry.register("osc", |ctx, _, spec, inputs| {
        let waveform = spec
            .text("type")
            .and_then(Waveform::from_name)
            .unwrap_or(Waveform::Sine);
        Ok(make(ctx, waveform, spec, inputs))
    });
    for (name, waveform) in [
        ("sin", Waveform::Sine),
        ("square", Waveform::Square),
        ("saw", Waveform::Sawtooth),
        ("tri", Waveform::Triangle),
    ] {
        registry.register(name, move |ctx, _, spec, inputs| {
            Ok(make(ctx, waveform, spec, inputs))
        });
    }
}

fn frequency(ctx: &Context, spec: &Spec) -> Input {
    match spec.get("freq").or_else(|| spec.get("frequency")) {
        Some(SpecValue::Text(s)) => Input::Number(ctx.to_frequency(&Value::Text(s.clone()))),
        Some(_) => spec
            .input("freq")
            .or_else(|| spec.input("frequency"))
            .unwrap_or(Input::Number(DEFAULT_FREQUENCY)),
        None => Input::Number(DEFAULT_FREQUENCY),
    }
}

fn make(ctx: &mut Context, waveform: Waveform, spec: &Spec, inputs: Vec<Input>) -> Unit {
    let node = ctx.graph_mut().create(NodeKind::Oscillator { waveform });

    let mut freq = vec![frequency(ctx, spec)];
    freq.extend(inputs);
    ctx.connect_param(&sum(freq), node, "frequency");
    if let Some(detune) = spec.input("detune") {
        ctx.connect_param(&detune, node, "detune");
    }

    Unit::new(node)
        .on_start(move |ctx, t| {
            ctx.graph_mut().start(node, StartCall::at(t));
        })
        .on_stop(move |ctx, t| {
            ctx.graph_mut().stop(node, t);
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ContextConfig;
    use crate::synth::Synth;
    use serde_json::json;

    fn describe(spec: Spec, key: &'static str, inputs: Vec<f64>) -> serde_json::Value {
        let mut ctx = Context::new(ContextConfig::default());
        let synth = Synth::new(&mut ctx, &[], move |b, _| {
            let inputs = inputs.into_iter().map(Input::Number).collect();
            Ok(Some(b.ugen(key, spec, inputs)?.outlet()))
        })
        .unwrap();
        let out = synth.outlet().unwrap();
        ctx.describe(out)
    }

    #[test]
    fn defaults_to_a_440_sine() {
        assert_eq!(
            describe(Spec::new(), "osc", vec![]),
            json!({
                "name": "OscillatorNode",
                "type": "sine",
                "frequency": { "value": 440.0, "inputs": [] },
                "detune": { "value": 0.0, "inputs": [] },
                "inputs": []
            })
        );
    }

    #[test]
    fn type_and_detune() {
        let desc = describe(Spec::new().with("type", "tri").with("detune", 5.0), "osc", vec![]);
        assert_eq!(desc["type"], "triangle");
        assert_eq!(desc["detune"]["value"], 5.0);
        assert_eq!(describe(Spec::new(), "saw", vec![])["type"], "sawtooth");
        assert_eq!(describe(Spec::new(), "sinosc", vec![])["type"], "sine");
    }

    #[test]
    fn musical_frequency_and_numeric_inputs() {
        let desc = describe(Spec::new().with("freq", "4n"), "square", vec![]);
        assert_eq!(desc["frequency"]["value"], 2.0);
        let desc = describe(Spec::new().with("freq", 200.0), "sin", vec![20.0]);
        assert_eq!(desc["frequency"]["value"], 220.0);
    }
}
