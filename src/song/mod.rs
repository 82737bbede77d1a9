use std::path::Path;

use crate::loader::stem_loader;
use crate::shared::MAX_TRACKS;

/// One mono stem of the loaded song.
///
/// `source` is decoded once per load and never written again. The two
/// scratch buffers are reused across play() calls: the router resizes and
/// fully overwrites them before anything is scheduled, so stale content is
/// never read.
pub struct Track {
    pub index: usize,
    pub name: String,
    pub source: Vec<f32>,
    pub sample_rate: u32,
    pub volume: f32,
    pub intro_scratch: Vec<f32>,
    pub loop_scratch: Vec<f32>,
}

/// The track buffer store. Torn down and rebuilt on every song load and on
/// every device change (channel count decides how many stems even load).
pub struct Song {
    pub name: String,
    pub tracks: Vec<Track>,
    /// Baseline taken from the FIRST decoded stem only. Stems of a
    /// different length simply end (or tail out silent) misaligned; we
    /// don't resample or truncate to hide that.
    pub len_frames: u64,
    pub sample_rate: u32,
    /// Stems past the hardware channel count, not loaded. Normal
    /// operation, not a fault.
    pub dropped: usize,
    /// File names that failed to decode; the rest of the song still loads.
    pub failed: Vec<String>,
}

impl Song {
    /// Index `dir`, keep the first `max_channels` stems by sorted name,
    /// decode each. Fails only when the directory itself can't be read or
    /// not a single stem decodes.
    pub fn load(dir: &Path, max_channels: usize) -> anyhow::Result<Song> {
        let paths = stem_loader::index_wav_in_dir(dir)?;
        let keep = paths.len().min(max_channels).min(MAX_TRACKS);
        let dropped = paths.len() - keep;

        let mut tracks = Vec::with_capacity(keep);
        let mut failed = Vec::new();
        let mut len_frames = 0u64;
        let mut sample_rate = 0u32;

        for path in paths.into_iter().take(keep) {
            let name = path
                .file_stem()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            match stem_loader::decode(&path) {
                Ok((rate, source)) => {
                    if tracks.is_empty() {
                        len_frames = source.len() as u64;
                        sample_rate = rate;
                    }
                    tracks.push(Track {
                        index: tracks.len(),
                        name,
                        source,
                        sample_rate: rate,
                        volume: 1.0,
                        intro_scratch: Vec::new(),
                        loop_scratch: Vec::new(),
                    });
                }
                Err(_) => failed.push(name),
            }
        }

        if tracks.is_empty() {
            anyhow::bail!("no stems could be decoded in {}", dir.display());
        }

        let name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| dir.display().to_string());

        Ok(Song { name, tracks, len_frames, sample_rate, dropped, failed })
    }
}
