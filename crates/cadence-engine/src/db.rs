//! The ugens of one synth, and selector matching over them.

use std::rc::Rc;

use crate::ugen::{UGen, UGenKey};
use crate::unit::Unit;

#[derive(Clone, Debug)]
pub struct DbEntry {
    pub ugen: UGen,
    pub unit: Rc<Unit>,
}

/// Append-only while a synth is being described; read-only after.
#[derive(Clone, Debug, Default)]
pub struct SynthDb {
    entries: Vec<DbEntry>,
}

impl SynthDb {
    /// Create an empty database.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, ugen: UGen, unit: Unit) {
        self.entries.push(DbEntry {
            ugen,
            unit: Rc::new(unit),
        });
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    /// Every entry, in creation order.
    pub fn all(&self) -> &[DbEntry] {
        &self.entries
    }

    /// Number of ugens held.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries matching `selector`, in creation order.
    ///
    /// A selector is a comma separated list of alternatives such as
    /// `"sin.lfo, #amp"`.
    pub fn find(&self, selector: &str) -> Vec<&DbEntry> {
        let alternatives: Vec<Compound> = selector
            .split(',')
            .filter_map(|s| Compound::parse(s.trim()))
            .collect();
        self.entries
            .iter()
            .filter(|e| alternatives.iter().any(|c| c.matches(e.ugen.key())))
            .collect()
    }
}

/// One selector alternative: optional name, optional id, any classes.
#[derive(Debug, Default)]
struct Compound<'a> {
    name: Option<&'a str>,
    id: Option<&'a str>,
    classes: Vec<&'a str>,
}

impl<'a> Compound<'a> {
    fn parse(s: &'a str) -> Option<Self> {
        if s.is_empty() {
            return None;
        }
        let name_end = s.find(['#', '.']).unwrap_or(s.len());
        let mut compound = Compound {
            name: Some(&s[..name_end]).filter(|n| !n.is_empty()),
            ..Self::default()
        };
        let mut rest = &s[name_end..];
        while let Some(marker) = rest.chars().next() {
            let body = &rest[1..];
            let end = body.find(['#', '.']).unwrap_or(body.len());
            let part = &body[..end];
            if part.is_empty() {
                return None;
            }
            match marker {
                '#' => compound.id = Some(part),
                _ => compound.classes.push(part),
            }
            rest = &body[end..];
        }
        Some(compound)
    }

    fn matches(&self, key: &UGenKey) -> bool {
        self.name.map_or(true, |n| n == key.name)
            && self.id.map_or(true, |id| key.id.as_deref() == Some(id))
            && self.classes.iter().all(|c| key.has_class(c))
    }
}

/// Split `"label:method"` or `"method"` into selector and method.
///
/// The label runs up to the last `:`. The method must be a lowercase ASCII letter followed by at least one
/// word character. An empty label means every ugen. Returns `None` for
/// anything else.
pub fn parse_event(event: &str) -> Option<(Option<&str>, &str)> {
    let (label, method) = match event.rsplit_once(':') {
        Some((label, method)) => (Some(label).filter(|l| !l.is_empty()), method),
        None => (None, event),
    };
    let mut chars = method.chars();
    let head_ok = chars.next().is_some_and(|c| c.is_ascii_lowercase());
    let tail: Vec<char> = chars.collect();
    let tail_ok = !tail.is_empty() && tail.iter().all(|c| c.is_ascii_alphanumeric() || *c == '_');
    (head_ok && tail_ok).then_some((label, method))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ugen::SynthScope;
    use std::cell::RefCell;

    fn db(keys: &[&str]) -> SynthDb {
        let scope = Rc::new(RefCell::new(SynthScope::default()));
        let mut db = SynthDb::new();
        for (i, key) in keys.iter().enumerate() {
            let ugen = UGen::new(key.parse().unwrap(), i, scope.clone());
            db.push(ugen, Unit::new(0.0));
        }
        db
    }

    fn names(found: Vec<&DbEntry>) -> Vec<String> {
        found.iter().map(|e| e.ugen.key().to_string()).collect()
    }

    #[test]
    fn selectors_match_name_id_and_classes() {
        let db = db(&["sin#carrier.osc", "sin.lfo", "adsr#amp.env", "saw.osc.lfo"]);
        assert_eq!(names(db.find("sin")), vec!["sin#carrier.osc", "sin.lfo"]);
        assert_eq!(names(db.find("#amp")), vec!["adsr#amp.env"]);
        assert_eq!(names(db.find(".osc.lfo")), vec!["saw.osc.lfo"]);
        assert_eq!(names(db.find("sin.osc, .env")).len(), 2);
        assert!(db.find("tri").is_empty());
        assert!(db.find("sin..x").is_empty());
    }

    #[test]
    fn event_names() {
        assert_eq!(parse_event("release"), Some((None, "release")));
        assert_eq!(parse_event("amp:release"), Some((Some("amp"), "release")));
        assert_eq!(parse_event(":release"), Some((None, "release")));
        assert_eq!(parse_event("sin.lfo:setValue"), Some((Some("sin.lfo"), "setValue")));
        assert_eq!(parse_event("a:b:end"), Some((Some("a:b"), "end")));
        assert_eq!(parse_event("amp:re:"), None);
        assert_eq!(parse_event("Release"), None);
        assert_eq!(parse_event("r"), None);
        assert_eq!(parse_event(""), None);
    }
}
