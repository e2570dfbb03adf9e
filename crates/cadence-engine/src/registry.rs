//! Name → factory table for unit generators.

use std::collections::BTreeMap;
use std::rc::Rc;

use crate::context::Context;
use crate::error::{EngineError, Result};
use crate::input::Input;
use crate::spec::Spec;
use crate::ugen::UGen;
use crate::unit::Unit;

/// Builds a [`Unit`] for one ugen instance from its spec and resolved inputs.
pub type Factory = Rc<dyn Fn(&mut Context, &UGen, &Spec, Vec<Input>) -> Result<Unit>>;

/// Spec key renames applied before an aliased factory runs, `(from, to)`.
pub type Renames = Vec<(String, String)>;

#[derive(Clone)]
enum Entry {
    Native(Factory),
    Alias { target: String, renames: Renames },
}

#[derive(Clone, Default)]
pub struct Registry {
    entries: BTreeMap<String, Entry>,
}

impl Registry {
    /// An empty registry. See [`with_builtins`](Self::with_builtins).
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in ugen and alias.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        crate::ugens::register_builtins(&mut registry);
        registry.alias("sinosc", "sin", &[]);
        registry.alias("constant", "number", &[]);
        registry.alias(
            "gate",
            "asr",
            &[("attack", "a"), ("level", "s"), ("release", "r")],
        );
        registry
    }

    /// Register `factory` under `name`, replacing any previous entry.
    pub fn register(
        &mut self,
        name: &str,
        factory: impl Fn(&mut Context, &UGen, &Spec, Vec<Input>) -> Result<Unit> + 'static,
    ) {
        log::debug!("register ugen {name}");
        self.entries
            .insert(name.to_string(), Entry::Native(Rc::new(factory)));
    }

    /// Make `name` resolve to `target`, copying spec keys per `renames`.
    pub fn alias(&mut self, name: &str, target: &str, renames: &[(&str, &str)]) {
        log::debug!("alias ugen {name} -> {target}");
        self.entries.insert(
            name.to_string(),
            Entry::Alias {
                target: target.to_string(),
                renames: renames
                    .iter()
                    .map(|(from, to)| (from.to_string(), to.to_string()))
                    .collect(),
            },
        );
    }

    /// Whether `name` is registered or aliased.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Registered and aliased names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Follow aliases down to a factory, collecting renames outermost first.
    pub fn resolve(&self, name: &str) -> Result<(Factory, Renames)> {
        let mut renames = Renames::new();
        let mut visited: Vec<&str> = Vec::new();
        let mut current = name;
        loop {
            if visited.contains(&current) {
                return Err(EngineError::AliasCycle(current.to_string()));
            }
            visited.push(current);
            match self.entries.get(current) {
                Some(Entry::Native(factory)) => return Ok((factory.clone(), renames)),
                Some(Entry::Alias { target, renames: more }) => {
                    renames.extend(more.iter().cloned());
                    current = target.as_str();
                }
                None => return Err(EngineError::UnknownUGen(current.to_string())),
            }
        }
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.entries.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dummy(_: &mut Context, _: &UGen, _: &Spec, _: Vec<Input>) -> Result<Unit> {
        Ok(Unit::new(0.0))
    }

    #[test]
    fn aliases_chain_and_collect_renames() {
        let mut reg = Registry::new();
        reg.register("base", dummy);
        reg.alias("mid", "base", &[("x", "y")]);
        reg.alias("top", "mid", &[("a", "b")]);
        let (_, renames) = reg.resolve("top").unwrap();
        assert_eq!(
            renames,
            vec![("a".into(), "b".into()), ("x".into(), "y".into())]
        );
    }

    #[test]
    fn unknown_and_cyclic_names_are_errors() {
        let mut reg = Registry::new();
        reg.alias("a", "b", &[]);
        reg.alias("b", "a", &[]);
        reg.alias("c", "nowhere", &[]);
        assert!(matches!(reg.resolve("a"), Err(EngineError::AliasCycle(_))));
        assert!(matches!(
            reg.resolve("c"),
            Err(EngineError::UnknownUGen(name)) if name == "nowhere"
        ));
    }

    #[test]
    fn builtins_are_present() {
        let reg = Registry::with_builtins();
        for name in ["env", "adsr", "iter", "+", "*", "sin", "in", "out", "buf", "comp"] {
            assert!(reg.contains(name), "{name} missing");
        }
        assert!(reg.resolve("gate").is_ok());
        assert!(reg.resolve("sinosc").is_ok());
    }
}
