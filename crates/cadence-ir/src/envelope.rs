//! Envelope tables.
//!
//! A table is an initial level followed by segments, each approaching a
//! target level over a duration with a curve shape in `(0, 1)`. An optional
//! release node marks the segment entered on release; an optional loop node
//! before it makes the segments in between repeat until then.

use crate::numeric::finite;

/// Curve shape used when a table does not specify one.
pub const DEFAULT_CURVE: f64 = 0.05;

/// One envelope segment.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Segment {
    /// Level reached at the end of the segment.
    pub target: f64,
    /// Nominal duration in seconds.
    pub duration: f64,
    /// Fraction of the distance still left after `duration`.
    pub curve: f64,
}

impl Segment {
    /// A segment; non-finite fields become 0.
    pub fn new(target: f64, duration: f64, curve: f64) -> Self {
        Self {
            target: finite(target),
            duration: finite(duration),
            curve: finite(curve),
        }
    }
}

/// Entry in the flat token form of a table.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum EnvToken {
    /// Approach `.0` over `.1` seconds.
    Level(f64, f64),
    /// The next segment is the release node.
    Release,
    /// The next segment is the loop node.
    Loop,
}

/// Initial level, segments and release/loop markers.
#[derive(Clone, Debug, PartialEq)]
pub struct EnvelopeTable {
    init: f64,
    segments: Vec<Segment>,
    release_node: Option<usize>,
    loop_node: Option<usize>,
}

impl EnvelopeTable {
    /// A table with no release or loop node.
    pub fn new(init: f64, segments: Vec<Segment>) -> Self {
        Self {
            init: finite(init),
            segments,
            release_node: None,
            loop_node: None,
        }
    }

    /// Set the release node. Indices outside the table are discarded.
    pub fn with_release(mut self, node: Option<usize>) -> Self {
        self.release_node = self.checked(node, "release");
        self
    }

    /// Set the loop node. Indices outside the table are discarded.
    pub fn with_loop(mut self, node: Option<usize>) -> Self {
        self.loop_node = self.checked(node, "loop");
        self
    }

    fn checked(&self, node: Option<usize>, what: &str) -> Option<usize> {
        match node {
            Some(i) if i < self.segments.len() => Some(i),
            Some(i) => {
                log::warn!(
                    "envelope {what} node {i} out of range for {} segments, ignored",
                    self.segments.len()
                );
                None
            }
            None => None,
        }
    }

    /// Level before the first segment.
    pub fn init(&self) -> f64 {
        self.init
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Segment entered on release.
    pub fn release_node(&self) -> Option<usize> {
        self.release_node
    }

    /// Segment the sustain loops back to.
    pub fn loop_node(&self) -> Option<usize> {
        self.loop_node
    }

    /// Loop node and release node, when the loop can actually run.
    pub fn loop_span(&self) -> Option<(usize, usize)> {
        match (self.loop_node, self.release_node) {
            (Some(l), Some(r)) if l < r => Some((l, r)),
            _ => None,
        }
    }

    /// Attack to 1, decay to `s`, sustain, release to 0.
    pub fn adsr(a: f64, d: f64, s: f64, r: f64, curve: f64) -> Self {
        Self::new(
            0.0,
            vec![
                Segment::new(1.0, a, curve),
                Segment::new(s, d, curve),
                Segment::new(0.0, r, curve),
            ],
        )
        .with_release(Some(2))
    }

    /// [`adsr`](Self::adsr) preceded by a silent delay segment.
    pub fn dadsr(delay: f64, a: f64, d: f64, s: f64, r: f64, curve: f64) -> Self {
        Self::new(
            0.0,
            vec![
                Segment::new(0.0, delay, curve),
                Segment::new(1.0, a, curve),
                Segment::new(s, d, curve),
                Segment::new(0.0, r, curve),
            ],
        )
        .with_release(Some(3))
    }

    /// Attack to `s`, hold, release to 0.
    pub fn asr(a: f64, s: f64, r: f64, curve: f64) -> Self {
        Self::new(
            0.0,
            vec![Segment::new(s, a, curve), Segment::new(0.0, r, curve)],
        )
        .with_release(Some(1))
    }

    /// Hold at `level` until released, then fall to 0 over `r`.
    pub fn cutoff(r: f64, level: f64, curve: f64) -> Self {
        Self::new(
            level,
            vec![Segment::new(level, 0.0, 0.0), Segment::new(0.0, r, curve)],
        )
        .with_release(Some(1))
    }

    /// Build a table from the flat token form.
    ///
    /// `Release` and `Loop` point at the segment that follows them.
    pub fn from_tokens(init: f64, tokens: &[EnvToken], curve: f64) -> Self {
        let mut segments = Vec::new();
        let mut release = None;
        let mut looping = None;
        for token in tokens {
            match *token {
                EnvToken::Level(value, duration) => {
                    segments.push(Segment::new(value, duration, curve));
                }
                EnvToken::Release => release = Some(segments.len()),
                EnvToken::Loop => looping = Some(segments.len()),
            }
        }
        Self::new(init, segments)
            .with_release(release)
            .with_loop(looping)
    }
}
