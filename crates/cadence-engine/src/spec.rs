//! Keyword arguments handed to a ugen factory.

use std::collections::BTreeMap;

use cadence_ir::{finite, Buffer};

use crate::context::Context;
use crate::input::Input;
use crate::param::Param;
use crate::ugen::UGen;
use crate::value::Value;

#[derive(Clone, Debug)]
pub enum SpecValue {
    Number(f64),
    Text(String),
    Bool(bool),
    Input(Input),
    Buffer(Buffer),
    List(Vec<SpecValue>),
}

impl SpecValue {
    /// Numbers and flags as a finite number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            SpecValue::Number(n) => Some(finite(*n)),
            SpecValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }
}

impl From<f64> for SpecValue {
    fn from(n: f64) -> Self {
        SpecValue::Number(n)
    }
}

impl From<&str> for SpecValue {
    fn from(s: &str) -> Self {
        SpecValue::Text(s.to_string())
    }
}

impl From<bool> for SpecValue {
    fn from(b: bool) -> Self {
        SpecValue::Bool(b)
    }
}

impl From<Input> for SpecValue {
    fn from(input: Input) -> Self {
        SpecValue::Input(input)
    }
}

impl From<Param> for SpecValue {
    fn from(param: Param) -> Self {
        SpecValue::Input(param.into())
    }
}

impl From<&UGen> for SpecValue {
    fn from(ugen: &UGen) -> Self {
        SpecValue::Input(ugen.outlet())
    }
}

impl From<Buffer> for SpecValue {
    fn from(buffer: Buffer) -> Self {
        SpecValue::Buffer(buffer)
    }
}

impl<T: Into<SpecValue>> From<Vec<T>> for SpecValue {
    fn from(items: Vec<T>) -> Self {
        SpecValue::List(items.into_iter().map(Into::into).collect())
    }
}

/// Named ugen arguments, e.g. `{ "freq": 440, "type": "saw" }`.
///
/// Lookups are lenient: a value of the wrong shape reads as absent and
/// the factory falls back to its default.
#[derive(Clone, Debug, Default)]
pub struct Spec {
    entries: BTreeMap<String, SpecValue>,
}

impl Spec {
    /// An empty spec.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`set`](Self::set).
    pub fn with(mut self, key: &str, value: impl Into<SpecValue>) -> Self {
        self.set(key, value);
        self
    }

    /// Set `key`, replacing any previous value.
    pub fn set(&mut self, key: &str, value: impl Into<SpecValue>) {
        self.entries.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&SpecValue> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// A numeric option.
    pub fn number(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(SpecValue::as_number)
    }

    /// A numeric option, or `default` when absent.
    pub fn number_or(&self, key: &str, default: f64) -> f64 {
        self.number(key).unwrap_or(default)
    }

    /// The first of `keys` holding a number.
    pub fn first_number(&self, keys: &[&str], default: f64) -> f64 {
        keys.iter()
            .find_map(|k| self.number(k))
            .unwrap_or(default)
    }

    /// A boolean option; numbers count as true when nonzero.
    pub fn flag(&self, key: &str) -> bool {
        match self.get(key) {
            Some(SpecValue::Bool(b)) => *b,
            Some(SpecValue::Number(n)) => *n != 0.0,
            _ => false,
        }
    }

    /// A string option.
    pub fn text(&self, key: &str) -> Option<&str> {
        match self.get(key) {
            Some(SpecValue::Text(s)) => Some(s),
            _ => None,
        }
    }

    /// A connectable value; numbers count.
    pub fn input(&self, key: &str) -> Option<Input> {
        match self.get(key)? {
            SpecValue::Input(input) => Some(input.clone()),
            other => other.as_number().map(Input::Number),
        }
    }

    /// A buffer option.
    pub fn buffer(&self, key: &str) -> Option<&Buffer> {
        match self.get(key) {
            Some(SpecValue::Buffer(b)) => Some(b),
            _ => None,
        }
    }

    /// A list option.
    pub fn list(&self, key: &str) -> Option<&[SpecValue]> {
        match self.get(key) {
            Some(SpecValue::List(items)) => Some(items),
            _ => None,
        }
    }

    /// A time in seconds; strings go through the transport.
    pub fn time(&self, key: &str, ctx: &Context) -> Option<f64> {
        match self.get(key)? {
            SpecValue::Text(s) => Some(ctx.to_seconds(&Value::Text(s.clone()))),
            other => other.as_number(),
        }
    }

    /// Copy `from` to `to` unless `to` is already set.
    pub fn rename(&mut self, from: &str, to: &str) {
        if self.contains(to) {
            return;
        }
        if let Some(value) = self.entries.get(from).cloned() {
            self.entries.insert(to.to_string(), value);
        }
    }
}
