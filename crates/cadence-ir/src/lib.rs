//! Core IR types for cadence.
//!
//! This crate holds the plain data the engine wires and schedules against:
//! the node arena standing in for the host audio graph, automation
//! timelines for node parameters, multichannel sample buffers and
//! envelope tables. Nothing here knows about time advancing.

mod automation;
mod buffer;
mod envelope;
mod graph;
mod numeric;

pub use automation::{AudioParam, Automation, MIN_TIME_CONSTANT};
pub use buffer::{
    AssetLoader, Buffer, BufferError, DecodedAudio, PeriodicWave, DEFAULT_SAMPLE_RATE,
    MAX_PERIODIC_WAVE_SIZE,
};
pub use envelope::{EnvToken, EnvelopeTable, Segment, DEFAULT_CURVE};
pub use graph::{
    Edge, EdgeId, Graph, Node, NodeKey, NodeKind, ParamRef, PlaybackState, StartCall, Target,
    Waveform, MAX_PARAMS,
};
pub use numeric::{clip, finite, MIN_CURVE};
