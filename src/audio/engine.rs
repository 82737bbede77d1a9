use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::audio_api::EngineCommand;
use crate::shared::{MAX_TRACKS, METER_INTERVAL_SECS};

use super::endpoint::Endpoint;
use super::meter::{self, MeterBank};

/// Render-side state machine. Lives inside the output callback; everything
/// here must stay allocation- and lock-free once a plan is in flight
/// (swapping a plan in moves a Vec the control thread already built).
pub struct Engine {
    channels: usize,
    clock: Arc<AtomicU64>,
    meters: Arc<MeterBank>,
    endpoints: Vec<Endpoint>,
    start_at: u64,
    volumes: [f32; MAX_TRACKS],
    next_meter_at: [u64; MAX_TRACKS],
    meter_interval_frames: u64,
}

impl Engine {
    pub fn new(channels: usize, sample_rate: u32, clock: Arc<AtomicU64>, meters: Arc<MeterBank>) -> Self {
        Self {
            channels,
            clock,
            meters,
            endpoints: Vec::new(),
            start_at: 0,
            volumes: [1.0; MAX_TRACKS],
            next_meter_at: [0; MAX_TRACKS],
            meter_interval_frames: (sample_rate as f64 * METER_INTERVAL_SECS) as u64,
        }
    }

    pub fn handle_cmd(&mut self, cmd: EngineCommand) {
        match cmd {
            EngineCommand::Schedule { start_at, endpoints } => {
                // the control thread built this Vec; taking it is just a move
                self.start_at = start_at;
                self.endpoints = endpoints;
            }
            EngineCommand::Stop => {
                self.endpoints.clear();
            }
            EngineCommand::SetVolume { track, value } => {
                if track < MAX_TRACKS {
                    self.volumes[track] = value.clamp(0.0, 1.0);
                }
            }
        }
    }

    pub fn render_block(&mut self, out: &mut [f32]) {
        out.fill(0.0);
        if self.channels == 0 {
            return;
        }
        let frames = (out.len() / self.channels) as u64;
        let t0 = self.clock.load(Ordering::Relaxed);

        for ep in &mut self.endpoints {
            let gain = self.volumes[ep.track.min(MAX_TRACKS - 1)];
            ep.render_into(out, self.channels, t0, self.start_at, gain);
        }

        // Each output channel carries exactly one endpoint (the router
        // zero-fills the rest), so levels are read straight off the block.
        for ep in &self.endpoints {
            if ep.track >= MAX_TRACKS || ep.channel >= self.channels {
                continue;
            }
            if t0 < self.next_meter_at[ep.track] {
                continue; // this track's meter updated too recently
            }
            if let Some(ms) =
                meter::decimated_mean_square(out, self.channels, ep.channel, 0, frames as usize)
            {
                self.meters.publish(ep.track, meter::mean_square_to_db(ms));
                self.next_meter_at[ep.track] = t0 + self.meter_interval_frames;
            }
        }

        self.endpoints.retain(|ep| !ep.is_done());

        // Publishing after the block means observers only ever see frame
        // counts that have actually been rendered.
        self.clock.store(t0 + frames, Ordering::Release);
    }
}
