/// The segmentation decided at play() time, in absolute song frames.
///
/// Linear runs play `[start_frame, end_frame)` once. Looping runs play an
/// intro `[start_frame, loop_end)` then cycle `[loop_start, loop_end)`
/// forever. The progress clock maps a render-frame count back onto an
/// absolute song position through this plan; it never integrates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PlaybackPlan {
    Linear {
        start_frame: u64,
        end_frame: u64,
    },
    Looping {
        start_frame: u64,
        loop_start: u64,
        loop_end: u64,
    },
}

impl PlaybackPlan {
    pub fn is_looping(&self) -> bool {
        matches!(self, PlaybackPlan::Looping { .. })
    }

    /// Absolute song frame after `frames_played` render frames since the
    /// scheduled start.
    pub fn absolute_frame(&self, frames_played: u64) -> u64 {
        match *self {
            PlaybackPlan::Linear { start_frame, end_frame } => {
                (start_frame + frames_played).min(end_frame)
            }
            PlaybackPlan::Looping { start_frame, loop_start, loop_end } => {
                let intro = loop_end.saturating_sub(start_frame);
                if frames_played < intro {
                    start_frame + frames_played
                } else {
                    // guarded so a collapsed loop region can't divide by zero
                    let loop_len = loop_end.saturating_sub(loop_start).max(1);
                    loop_start + (frames_played - intro) % loop_len
                }
            }
        }
    }

    pub fn progress(&self, frames_played: u64, song_len_frames: u64) -> f64 {
        if song_len_frames == 0 {
            return 0.0;
        }
        let p = self.absolute_frame(frames_played) as f64 / song_len_frames as f64;
        p.clamp(0.0, 1.0)
    }
}
