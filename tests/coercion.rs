//! Summation and multiplication through the public API.

use cadence::engine::{mul, sum, Sum};
use cadence::ir::{ParamRef, Waveform};
use cadence::{Context, ContextConfig, Graph, Input, NodeKind, Param};
use serde_json::json;

fn osc(graph: &mut Graph) -> Input {
    Input::Node(graph.create(NodeKind::Oscillator {
        waveform: Waveform::Square,
    }))
}

#[test]
fn literal_numbers_never_touch_the_graph() {
    let mut graph = Graph::new();
    let before = graph.len();
    assert!(matches!(sum(vec![1.0.into(), 2.5.into()]), Input::Number(n) if n == 3.5));
    assert!(matches!(mul(&mut graph, 3.0.into(), 4.0.into()), Input::Number(n) if n == 12.0));
    assert!(matches!(sum(vec![f64::NAN.into(), 1.0.into()]), Input::Number(n) if n == 1.0));
    assert_eq!(graph.len(), before);
}

#[test]
fn zero_and_one_simplify_products() {
    let mut graph = Graph::new();
    let o = osc(&mut graph);
    assert!(matches!(mul(&mut graph, 0.0.into(), o.clone()), Input::Number(n) if n == 0.0));
    let same = mul(&mut graph, o.clone(), 1.0.into());
    assert_eq!(same.to_node(&mut graph), o.to_node(&mut graph));
}

#[test]
fn two_signals_multiply_through_a_zero_gain() {
    let mut graph = Graph::new();
    let a = osc(&mut graph);
    let b = osc(&mut graph);
    let product = mul(&mut graph, a, b).to_node(&mut graph);
    let desc = graph.describe(product);
    assert_eq!(desc["gain"]["value"], 0.0);
    assert_eq!(desc["gain"]["inputs"][0]["type"], "square");
    assert_eq!(desc["inputs"][0]["type"], "square");
}

#[test]
fn realising_a_sum_is_memoised() {
    let mut graph = Graph::new();
    let a = osc(&mut graph);
    let s = Sum::new(vec![a, 1.0.into()]);
    let node = s.to_node(&mut graph);
    let len = graph.len();
    assert_eq!(s.to_node(&mut graph), node);
    assert_eq!(graph.len(), len);
}

#[test]
fn numbers_set_params_without_nodes() {
    let mut ctx = Context::new(ContextConfig::default());
    let gain = ctx.graph_mut().gain(1.0);
    let before = ctx.graph().len();
    ctx.connect_param(&sum(vec![0.25.into(), 0.5.into()]), gain, "gain");
    assert_eq!(ctx.graph().len(), before);
    assert_eq!(
        ctx.describe(gain),
        json!({ "name": "GainNode", "gain": { "value": 0.75, "inputs": [] }, "inputs": [] })
    );
}

#[test]
fn a_bound_param_mirrors_automation() {
    let mut ctx = Context::new(ContextConfig::default());
    let gain = ctx.graph_mut().gain(1.0);
    let level = Param::new(0.2);
    ctx.connect_param(&level.clone().into(), gain, "gain");

    level.linear_at(ctx.graph_mut(), 1.0, 2.0);
    let target = ctx.graph().param(ParamRef::new(gain, "gain")).unwrap();
    assert_eq!(target.value(), 0.2);
    assert!((target.value_at(1.0) - 0.6).abs() < 1e-12);
}

#[test]
fn disconnecting_a_link_spares_other_inputs() {
    let mut ctx = Context::new(ContextConfig::default());
    let bus = ctx.graph_mut().gain(1.0);
    let a = osc(ctx.graph_mut());
    let b = osc(ctx.graph_mut());
    let keep = ctx.connect(&a, bus);
    let drop = ctx.connect(&b, bus);
    drop.disconnect(ctx.graph_mut());
    let inputs: Vec<_> = ctx.graph().inputs(bus.into()).collect();
    assert_eq!(inputs.len(), 1);
    assert!(!keep.is_empty());
}
