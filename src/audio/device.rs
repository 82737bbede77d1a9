use anyhow::Context;
use cpal::traits::{DeviceTrait, HostTrait};

/// What the device actually negotiated. Owned here, read-only to the
/// transport, which routes one stem per channel up to `channels`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HardwareFormat {
    pub channels: usize,
    pub sample_rate: u32,
}

impl HardwareFormat {
    /// Advisory threshold: anything over 1 Hz off is worth telling the user
    /// about. Playback proceeds at the device rate either way.
    pub fn rate_mismatches(&self, song_rate: u32) -> bool {
        (self.sample_rate as i64 - song_rate as i64).abs() > 1
    }
}

/// cpal has no stable device ids, so the name doubles as the id. That also
/// matches what we persist between runs.
pub fn list_output_devices(host: &cpal::Host) -> Vec<String> {
    let Ok(devices) = host.output_devices() else {
        return Vec::new();
    };
    devices.filter_map(|d| d.name().ok()).collect()
}

/// Resolve a device by name, falling back to the default (and from there to
/// the first enumerated device) when the requested one has disappeared.
/// The bool is false when we had to fall back.
pub fn find_output_device(host: &cpal::Host, wanted: Option<&str>) -> anyhow::Result<(cpal::Device, bool)> {
    if let Some(name) = wanted {
        if let Ok(devices) = host.output_devices() {
            for d in devices {
                if d.name().map(|n| n == name).unwrap_or(false) {
                    return Ok((d, true));
                }
            }
        }
    }
    let fallback = host
        .default_output_device()
        .or_else(|| host.output_devices().ok().and_then(|mut d| d.next()))
        .context("no output device available")?;
    Ok((fallback, wanted.is_none()))
}

/// Name in the current device list after `current`, wrapping around.
pub fn next_device_name(host: &cpal::Host, current: &str) -> Option<String> {
    let names = list_output_devices(host);
    if names.is_empty() {
        return None;
    }
    let idx = names.iter().position(|n| n == current);
    let next = match idx {
        Some(i) => (i + 1) % names.len(),
        None => 0,
    };
    Some(names[next].clone())
}

pub fn negotiated_format(device: &cpal::Device) -> anyhow::Result<(cpal::SupportedStreamConfig, HardwareFormat)> {
    let config = device
        .default_output_config()
        .context("no default output config")?;
    let format = HardwareFormat {
        channels: config.channels() as usize,
        sample_rate: config.sample_rate(),
    };
    Ok((config, format))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_hertz_is_tolerated() {
        let hw = HardwareFormat { channels: 8, sample_rate: 48_000 };
        assert!(!hw.rate_mismatches(48_000));
        assert!(!hw.rate_mismatches(48_001));
        assert!(hw.rate_mismatches(44_100));
    }
}
