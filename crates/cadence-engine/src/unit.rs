//! What a ugen factory hands back.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::context::Context;
use crate::input::Input;
use crate::value::Value;

/// Lifecycle hook; receives the scheduled time.
pub type TimeFn = Rc<dyn Fn(&mut Context, f64)>;

/// A method exposed to synth dispatch.
pub type MethodFn = Rc<dyn Fn(&mut Context, &[Value])>;

/// Outlet, lifecycle hooks and named methods of one ugen instance.
#[derive(Clone)]
pub struct Unit {
    outlet: Input,
    start: Option<TimeFn>,
    stop: Option<TimeFn>,
    methods: BTreeMap<String, MethodFn>,
}

impl Unit {
    /// A unit with `outlet` and no hooks or methods.
    pub fn new(outlet: impl Into<Input>) -> Self {
        Self {
            outlet: outlet.into(),
            start: None,
            stop: None,
            methods: BTreeMap::new(),
        }
    }

    /// Run `f` when the synth starts.
    pub fn on_start(mut self, f: impl Fn(&mut Context, f64) + 'static) -> Self {
        self.start = Some(Rc::new(f));
        self
    }

    /// Run `f` when the synth stops.
    pub fn on_stop(mut self, f: impl Fn(&mut Context, f64) + 'static) -> Self {
        self.stop = Some(Rc::new(f));
        self
    }

    /// Expose `f` to synth dispatch as `name`.
    pub fn method(mut self, name: &str, f: impl Fn(&mut Context, &[Value]) + 'static) -> Self {
        self.methods.insert(name.to_string(), Rc::new(f));
        self
    }

    pub fn outlet(&self) -> &Input {
        &self.outlet
    }

    pub(crate) fn set_outlet(&mut self, outlet: Input) {
        self.outlet = outlet;
    }

    /// Run the start hook, if any.
    pub fn start(&self, ctx: &mut Context, t: f64) {
        if let Some(f) = &self.start {
            f(ctx, t);
        }
    }

    /// Run the stop hook, if any.
    pub fn stop(&self, ctx: &mut Context, t: f64) {
        if let Some(f) = &self.stop {
            f(ctx, t);
        }
    }

    /// Exposed method names, sorted.
    pub fn method_names(&self) -> impl Iterator<Item = &str> {
        self.methods.keys().map(String::as_str)
    }

    pub fn has_method(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    /// Call method `name`. Returns `false` if there is none.
    pub fn apply(&self, ctx: &mut Context, name: &str, args: &[Value]) -> bool {
        match self.methods.get(name) {
            Some(f) => {
                let f = f.clone();
                f(ctx, args);
                true
            }
            None => false,
        }
    }
}

impl fmt::Debug for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unit")
            .field("outlet", &self.outlet)
            .field("start", &self.start.is_some())
            .field("stop", &self.stop.is_some())
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ContextConfig;
    use std::cell::Cell;

    #[test]
    fn hooks_and_methods_are_called() {
        let mut ctx = Context::new(ContextConfig::default());
        let started = Rc::new(Cell::new(-1.0));
        let called = Rc::new(Cell::new(0.0));
        let (s, c) = (started.clone(), called.clone());
        let unit = Unit::new(1.0)
            .on_start(move |_, t| s.set(t))
            .method("poke", move |_, args| {
                c.set(args.first().and_then(Value::as_number).unwrap_or(0.0))
            });

        unit.start(&mut ctx, 0.5);
        unit.stop(&mut ctx, 1.0);
        assert_eq!(started.get(), 0.5);
        assert!(unit.apply(&mut ctx, "poke", &[3.0.into()]));
        assert_eq!(called.get(), 3.0);
        assert!(!unit.apply(&mut ctx, "missing", &[]));
        assert_eq!(unit.method_names().collect::<Vec<_>>(), vec!["poke"]);
    }
}
