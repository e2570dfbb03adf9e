//! `comp`: a dynamics compressor over the sum of its inputs.

use cadence_ir::NodeKind;

use crate::registry::Registry;
use crate::sum::sum;
use crate::unit::Unit;

const PARAMS: [&str; 5] = ["threshold", "knee", "ratio", "attack", "release"];

pub(super) fn register(registry: &mut Registry) {
    registry.register("comp", |ctx, _, spec, inputs| {
        let node = ctx.graph_mut().create(NodeKind::Compressor);
        for name in PARAMS {
            if let Some(value) = spec.input(name) {
                ctx.connect_param(&value, node, name);
            }
        }
        if !inputs.is_empty() {
            ctx.connect(&sum(inputs), node);
        }
        Ok(Unit::new(node))
    });
}

#[cfg(test)]
mod tests {
    use crate::config::ContextConfig;
    use crate::context::Context;
    use crate::spec::Spec;
    use crate::synth::Synth;
    use serde_json::json;

    #[test]
    fn compresses_its_input() {
        let mut ctx = Context::new(ContextConfig::default());
        let synth = Synth::new(&mut ctx, &[], |b, _| {
            let sin = b.ugen("sin", Spec::new(), vec![])?;
            let spec = Spec::new()
                .with("threshold", -20.0)
                .with("knee", 25.0)
                .with("ratio", 10.0)
                .with("attack", 0.05)
                .with("release", 0.1);
            Ok(Some(b.ugen("comp", spec, vec![sin.outlet()])?.outlet()))
        })
        .unwrap();

        assert_eq!(
            ctx.describe(synth.outlet().unwrap()),
            json!({
                "name": "DynamicsCompressorNode",
                "threshold": { "value": -20.0, "inputs": [] },
                "knee": { "value": 25.0, "inputs": [] },
                "ratio": { "value": 10.0, "inputs": [] },
                "reduction": { "value": 0.0, "inputs": [] },
                "attack": { "value": 0.05, "inputs": [] },
                "release": { "value": 0.1, "inputs": [] },
                "inputs": [{
                    "name": "OscillatorNode",
                    "type": "sine",
                    "frequency": { "value": 440.0, "inputs": [] },
                    "detune": { "value": 0.0, "inputs": [] },
                    "inputs": []
                }]
            })
        );
    }

    #[test]
    fn defaults_without_settings() {
        let mut ctx = Context::new(ContextConfig::default());
        let synth = Synth::new(&mut ctx, &[], |b, _| {
            Ok(Some(b.ugen("comp", Spec::new(), vec![])?.outlet()))
        })
        .unwrap();
        let desc = ctx.describe(synth.outlet().unwrap());
        assert_eq!(desc["threshold"]["value"], -24.0);
        assert_eq!(desc["ratio"]["value"], 12.0);
        assert_eq!(desc["inputs"], json!([]));
    }
}
