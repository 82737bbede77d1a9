use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::Context;
use cpal::traits::{DeviceTrait, StreamTrait};
use crossbeam_channel::{Receiver, Sender};

use crate::audio_api::EngineCommand;

mod device;
mod endpoint;
mod engine;
mod meter;

pub use device::{HardwareFormat, find_output_device, list_output_devices, negotiated_format, next_device_name};
pub use endpoint::Endpoint;
pub use meter::MeterBank;

use engine::Engine;

/// Control-side handle to one open output stream. Dropping it tears the
/// stream down; rebuilding after a device switch means making a new one.
pub struct AudioHandle {
    tx: Sender<EngineCommand>,
    clock: Arc<AtomicU64>,
    meters: Arc<MeterBank>,
    pub format: HardwareFormat,
    pub device_name: String,
    _output_stream: cpal::Stream,
}

impl AudioHandle {
    pub fn send(&self, cmd: EngineCommand) {
        let _ = self.tx.try_send(cmd);
    }

    /// Frames the device has rendered since this stream started. The
    /// progress clock recomputes from this every tick instead of counting
    /// on its own, so missed ticks can't drift.
    pub fn now_frames(&self) -> u64 {
        self.clock.load(Ordering::Acquire)
    }

    pub fn meters(&self) -> &MeterBank {
        &self.meters
    }
}

/// Open `preferred` (by name) or whatever we can fall back to, negotiate a
/// format, and start rendering. Check `device_name` against what you asked
/// for to detect the fallback case.
pub fn start_audio(preferred: Option<&str>) -> anyhow::Result<AudioHandle> {
    let (tx, rx) = crossbeam_channel::bounded::<EngineCommand>(1024);

    let host = cpal::default_host();
    let (device, _exact) = find_output_device(&host, preferred)?;
    let device_name = device.name().unwrap_or_else(|_| "unknown".into());
    let (config, format) = negotiated_format(&device)?;

    let clock = Arc::new(AtomicU64::new(0));
    let meters = Arc::new(MeterBank::new());

    match config.sample_format() {
        cpal::SampleFormat::F32 => {
            let output_stream =
                build_output_stream_f32(&device, &config.into(), rx, format, clock.clone(), meters.clone())?;
            output_stream.play().context("failed to play output stream")?;

            Ok(AudioHandle {
                tx,
                clock,
                meters,
                format,
                device_name,
                _output_stream: output_stream,
            })
        }
        other => anyhow::bail!("unsupported sample format {other} (only f32 supported for now)"),
    }
}

fn build_output_stream_f32(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    rx: Receiver<EngineCommand>,
    format: HardwareFormat,
    clock: Arc<AtomicU64>,
    meters: Arc<MeterBank>,
) -> anyhow::Result<cpal::Stream> {
    let mut engine = Engine::new(format.channels, format.sample_rate, clock, meters);

    let err_fn = |err| eprintln!("audio output stream error: {err}");

    let stream = device.build_output_stream(
        config,
        move |data: &mut [f32], _info| {
            // drain pending control commands, then render the block
            while let Ok(cmd) = rx.try_recv() {
                engine.handle_cmd(cmd);
            }
            engine.render_block(data);
        },
        err_fn,
        None,
    )?;

    Ok(stream)
}
