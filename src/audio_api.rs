use std::sync::Arc;

pub use crate::audio::Endpoint;

/// A prepared slice of interleaved audio at hardware channel width.
///
/// Built on the control thread by the router (see transport/router.rs),
/// then frozen behind an Arc for the flight duration. The render side only
/// ever reads it.
#[derive(Clone, Debug)]
pub struct Segment {
    pub data: Arc<[f32]>,
    pub channels: usize,
}

impl Segment {
    pub fn frames(&self) -> usize {
        if self.channels == 0 { 0 } else { self.data.len() / self.channels }
    }
}

/// Everything one endpoint needs for one play() call: an intro segment
/// played once, and optionally a loop segment repeated forever after it.
/// A linear run is just an intro with no loop.
#[derive(Clone, Debug)]
pub struct EndpointSchedule {
    pub track: usize,
    pub channel: usize,
    pub intro: Option<Segment>,
    pub looped: Option<Segment>,
}

/// Commands sent from the control thread into the render callback.
///
/// The engine can't slice buffers or build endpoint state itself (that
/// would allocate in the callback), so the transport prepares everything
/// up front and the engine just moves the plan in.
#[derive(Debug)]
pub enum EngineCommand {
    /// Replace the active plan. All endpoints share one future start
    /// timestamp in engine frames; that single deadline is what keeps the
    /// stems sample-aligned.
    Schedule {
        start_at: u64,
        endpoints: Vec<Endpoint>,
    },

    /// Drop the active plan. Idempotent.
    Stop,

    /// Per-track gain, takes effect on the next rendered block.
    SetVolume { track: usize, value: f32 },
}
