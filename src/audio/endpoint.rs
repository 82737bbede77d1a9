use crate::audio_api::{EndpointSchedule, Segment};

/// Render-side playback state for one scheduled track.
///
/// An endpoint plays its intro segment once from the shared start timestamp,
/// then either falls silent (linear run) or repeats its loop segment forever.
/// Position is always derived from the global frame clock, never from a
/// counter the endpoint advances itself.
#[derive(Debug)]
pub struct Endpoint {
    pub track: usize,
    pub channel: usize,
    intro: Option<Segment>,
    looped: Option<Segment>,
    done: bool,
}

impl Endpoint {
    pub fn new(sched: EndpointSchedule) -> Self {
        Self {
            track: sched.track,
            channel: sched.channel,
            intro: sched.intro,
            looped: sched.looped,
            done: false,
        }
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn intro(&self) -> Option<&Segment> {
        self.intro.as_ref()
    }

    pub fn looped(&self) -> Option<&Segment> {
        self.looped.as_ref()
    }

    /// Segment and frame offset for a given number of frames played since
    /// the scheduled start, or None once a linear run has run out.
    fn locate(&self, frames_played: u64) -> Option<(&Segment, usize)> {
        let intro_frames = self.intro.as_ref().map(|s| s.frames() as u64).unwrap_or(0);
        if frames_played < intro_frames {
            return self.intro.as_ref().map(|s| (s, frames_played as usize));
        }
        let looped = self.looped.as_ref()?;
        let loop_frames = (looped.frames() as u64).max(1);
        Some((looped, ((frames_played - intro_frames) % loop_frames) as usize))
    }

    /// Add this endpoint's contribution for the block into `out`
    /// (interleaved, already zeroed by the engine). `t0` is the global frame
    /// index of out's first frame; frames before `start_at` stay silent.
    pub fn render_into(&mut self, out: &mut [f32], channels: usize, t0: u64, start_at: u64, gain: f32) {
        if self.done || channels == 0 {
            return;
        }
        let frames = out.len() / channels;
        for i in 0..frames {
            let t = t0 + i as u64;
            if t < start_at {
                continue;
            }
            match self.locate(t - start_at) {
                Some((seg, pos)) => {
                    // segments are already hardware-width with zeros on
                    // every channel but ours, so this is a plain add
                    let base = pos * seg.channels;
                    let w = seg.channels.min(channels);
                    for c in 0..w {
                        out[i * channels + c] += seg.data[base + c] * gain;
                    }
                }
                None => {
                    self.done = true;
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn seg(frames: usize, channels: usize, channel: usize, value: f32) -> Segment {
        let mut data = vec![0.0f32; frames * channels];
        for f in 0..frames {
            data[f * channels + channel] = value;
        }
        Segment { data: Arc::from(data), channels }
    }

    #[test]
    fn silent_until_shared_start_time() {
        let sched = EndpointSchedule {
            track: 0,
            channel: 0,
            intro: Some(seg(8, 2, 0, 1.0)),
            looped: None,
        };
        let mut ep = Endpoint::new(sched);
        let mut out = vec![0.0f32; 16]; // 8 frames, 2 channels
        ep.render_into(&mut out, 2, 0, 4, 1.0);
        // frames 0..4 silent, 4..8 playing from segment position 0
        assert_eq!(&out[..8], &[0.0; 8]);
        assert_eq!(out[8], 1.0);
        assert_eq!(out[9], 0.0); // other channel untouched
    }

    #[test]
    fn linear_run_goes_silent_at_the_end() {
        let sched = EndpointSchedule {
            track: 0,
            channel: 1,
            intro: Some(seg(3, 2, 1, 0.5)),
            looped: None,
        };
        let mut ep = Endpoint::new(sched);
        let mut out = vec![0.0f32; 12]; // 6 frames
        ep.render_into(&mut out, 2, 0, 0, 1.0);
        assert_eq!(out[1], 0.5);
        assert_eq!(out[5], 0.5);
        assert_eq!(out[7], 0.0);
        assert!(ep.is_done());
    }

    #[test]
    fn loop_segment_repeats_after_intro() {
        let sched = EndpointSchedule {
            track: 0,
            channel: 0,
            intro: Some(seg(2, 1, 0, 1.0)),
            looped: Some(seg(3, 1, 0, 2.0)),
        };
        let mut ep = Endpoint::new(sched);
        let mut out = vec![0.0f32; 10];
        ep.render_into(&mut out, 1, 0, 0, 1.0);
        // 2 intro frames then the 3-frame loop wraps indefinitely
        assert_eq!(out, vec![1.0, 1.0, 2.0, 2.0, 2.0, 2.0, 2.0, 2.0, 2.0, 2.0]);
        assert!(!ep.is_done());
    }

    #[test]
    fn gain_is_applied() {
        let sched = EndpointSchedule {
            track: 0,
            channel: 0,
            intro: Some(seg(4, 1, 0, 1.0)),
            looped: None,
        };
        let mut ep = Endpoint::new(sched);
        let mut out = vec![0.0f32; 4];
        ep.render_into(&mut out, 1, 0, 0, 0.25);
        assert_eq!(out, vec![0.25; 4]);
    }
}
