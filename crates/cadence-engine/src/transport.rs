//! Tempo-aware conversion of musical time to seconds and hertz.
//!
//! Accepted string forms:
//!
//! | Form | Meaning |
//! |---|---|
//! | `250ms` | milliseconds |
//! | `1.5s` | seconds |
//! | `440hz` | frequency; its period when read as time |
//! | `4n`, `8n.`, `8nt` | note value, optionally dotted or triplet |
//! | `2m` | measures of 4/4 |
//! | `960i` | ticks at 480 per quarter note |
//! | `1.2.3` | bars.beats.sixteenths |
//! | `0.25` | bare seconds |
//!
//! Anything else reads as 0.

use cadence_ir::{clip, finite};

use crate::value::Value;

/// Ticks per quarter note for the `i` suffix.
pub const PPQN: f64 = 480.0;

pub const MIN_BPM: f64 = 1.0;
pub const MAX_BPM: f64 = 1000.0;

#[derive(Clone, Debug, PartialEq)]
pub struct Transport {
    bpm: f64,
}

impl Default for Transport {
    fn default() -> Self {
        Self { bpm: 120.0 }
    }
}

impl Transport {
    /// A transport at `bpm`, clamped into range.
    pub fn new(bpm: f64) -> Self {
        let mut transport = Self::default();
        transport.set_bpm(bpm);
        transport
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    /// Set the tempo, clamped to `[1, 1000]`. Non-finite input is ignored.
    pub fn set_bpm(&mut self, bpm: f64) {
        if bpm.is_finite() {
            self.bpm = clip(bpm, MIN_BPM, MAX_BPM);
        }
    }

    fn beat(&self) -> f64 {
        60.0 / self.bpm
    }

    /// Seconds for a number or a musical duration string.
    pub fn to_seconds(&self, value: &Value) -> f64 {
        match value {
            Value::Number(n) => finite(*n),
            Value::Text(s) => finite(self.parse_seconds(s.trim()).unwrap_or(0.0)),
        }
    }

    /// Hz for a number or a `"440hz"` string; other strings are musical durations.
    pub fn to_frequency(&self, value: &Value) -> f64 {
        let s = match value {
            Value::Number(n) => return finite(*n),
            Value::Text(s) => s.trim(),
        };
        if let Some(hz) = strip_suffix_ci(s, "hz") {
            return finite(hz.parse().unwrap_or(0.0));
        }
        if let Ok(n) = s.parse::<f64>() {
            return finite(n);
        }
        match self.parse_seconds(s) {
            Some(secs) if secs > 0.0 => finite(1.0 / secs),
            _ => 0.0,
        }
    }

    fn parse_seconds(&self, s: &str) -> Option<f64> {
        if let Ok(n) = s.parse::<f64>() {
            return Some(n);
        }
        if let Some(ms) = strip_suffix_ci(s, "ms") {
            return ms.parse::<f64>().ok().map(|n| n / 1000.0);
        }
        if let Some(hz) = strip_suffix_ci(s, "hz") {
            let hz: f64 = hz.parse().ok()?;
            return Some(if hz == 0.0 { 0.0 } else { 1.0 / hz });
        }
        if let Some(secs) = strip_suffix_ci(s, "s") {
            return secs.parse().ok();
        }
        if let Some(note) = s.strip_suffix("n.") {
            return self.note(note).map(|t| t * 1.5);
        }
        if let Some(note) = s.strip_suffix("nt") {
            return self.note(note).map(|t| t * 2.0 / 3.0);
        }
        if let Some(note) = s.strip_suffix('n') {
            return self.note(note);
        }
        if let Some(measures) = s.strip_suffix('m') {
            return measures.parse::<f64>().ok().map(|m| m * 4.0 * self.beat());
        }
        if let Some(ticks) = s.strip_suffix('i') {
            return ticks.parse::<f64>().ok().map(|t| t / PPQN * self.beat());
        }
        self.position(s)
    }

    /// Length of a `1/n` note.
    fn note(&self, n: &str) -> Option<f64> {
        let n: f64 = n.parse().ok()?;
        if n <= 0.0 {
            return None;
        }
        Some(4.0 / n * self.beat())
    }

    /// `bars.beats.sixteenths`, all numeric.
    fn position(&self, s: &str) -> Option<f64> {
        let mut parts = s.split('.');
        let bars: f64 = parts.next()?.parse().ok()?;
        let beats: f64 = parts.next()?.parse().ok()?;
        let sixteenths: f64 = parts.next()?.parse().ok()?;
        if parts.next().is_some() {
            return None;
        }
        Some((bars * 4.0 + beats + sixteenths / 4.0) * self.beat())
    }
}

fn strip_suffix_ci<'a>(s: &'a str, suffix: &str) -> Option<&'a str> {
    let split = s.len().checked_sub(suffix.len())?;
    if !s.is_char_boundary(split) {
        return None;
    }
    let (head, tail) = s.split_at(split);
    tail.eq_ignore_ascii_case(suffix).then_some(head)
}
