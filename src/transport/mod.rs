use std::sync::Arc;

use crate::audio::{HardwareFormat, MeterBank};
use crate::audio_api::{Endpoint, EndpointSchedule, EngineCommand, Segment};
use crate::loader::library::SongNode;
use crate::shared::{DisplayState, InputEvent, SCHEDULE_LEAD_SECS, TrackDisplay};
use crate::song::Song;

mod plan;
mod router;
mod session;

pub use plan::PlaybackPlan;
use session::Session;

#[derive(Clone, Copy)]
enum State {
    Stopped,
    /// Linear vs looping is carried by the plan variant.
    Playing { start_at: u64, plan: PlaybackPlan },
}

/// The scheduling state machine. Runs entirely on the control thread and
/// talks to the render side only through the EngineCommands it returns;
/// main forwards those to the audio handle. Time comes in as the engine's
/// render-frame clock (`now`), never as wall time.
pub struct Transport {
    song: Option<Song>,
    hw: HardwareFormat,
    device_name: String,
    session: Session,
    state: State,
    progress: f64,
    is_looping: bool,
    advisory: Option<String>,
    library: Vec<SongNode>,
}

impl Transport {
    pub fn new(hw: HardwareFormat, device_name: String) -> Self {
        Self {
            song: None,
            hw,
            device_name,
            session: Session::default(),
            state: State::Stopped,
            progress: 0.0,
            is_looping: false,
            advisory: None,
            library: Vec::new(),
        }
    }

    pub fn is_playing(&self) -> bool {
        matches!(self.state, State::Playing { .. })
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn current_plan(&self) -> Option<PlaybackPlan> {
        match self.state {
            State::Playing { plan, .. } => Some(plan),
            State::Stopped => None,
        }
    }

    pub fn set_library(&mut self, nodes: Vec<SongNode>) {
        self.library = nodes;
    }

    /// Advisory for conditions detected outside the transport (device
    /// fallback, failed loads). One message at a time, latest wins.
    pub fn set_advisory(&mut self, msg: String) {
        self.advisory = Some(msg);
    }

    /// Called after a successful device switch, before the song is
    /// reinstalled. Clears the advisory; a degraded reload raises its own.
    pub fn set_hardware(&mut self, hw: HardwareFormat, device_name: String) {
        self.hw = hw;
        self.device_name = device_name;
        self.advisory = None;
    }

    /// Swap in a freshly loaded (or reloaded) song. `reset_session` is true
    /// for a user-initiated load; a device change keeps markers and loop
    /// region. Either way playback stops and progress rewinds to zero.
    pub fn install_song(&mut self, song: Song, reset_session: bool) -> Vec<EngineCommand> {
        let mut cmds = self.stop();
        self.progress = 0.0;
        if reset_session {
            self.session = Session::default();
        }

        // A successful load clears whatever advisory was up; degraded
        // conditions of this load then take its place.
        self.advisory = None;
        if !song.failed.is_empty() {
            self.advisory = Some(format!("could not decode: {}", song.failed.join(", ")));
        }
        if self.hw.rate_mismatches(song.sample_rate) {
            self.advisory = Some(format!(
                "song is {} Hz but the device runs at {} Hz; playback will be off-speed",
                song.sample_rate, self.hw.sample_rate
            ));
        }

        for track in &song.tracks {
            cmds.push(EngineCommand::SetVolume { track: track.index, value: track.volume });
        }
        self.song = Some(song);
        cmds
    }

    /// Song went away (load failure after a device change, for example).
    pub fn clear_song(&mut self) -> Vec<EngineCommand> {
        let cmds = self.stop();
        self.song = None;
        self.progress = 0.0;
        cmds
    }

    pub fn handle_input(&mut self, event: InputEvent, now: u64) -> Vec<EngineCommand> {
        match event {
            InputEvent::TogglePlay => self.toggle_play(now),
            InputEvent::ToggleLoop => self.toggle_loop(now),
            InputEvent::ResetLoop => self.reset_loop(now),
            InputEvent::SetLoopIn => self.set_loop_in(now),
            InputEvent::SetLoopOut => self.set_loop_out(now),
            InputEvent::SetMarker(slot) => {
                self.session.set_marker(slot, self.progress);
                Vec::new()
            }
            InputEvent::JumpToMarker(slot) => match self.session.marker(slot) {
                Some(p) => self.seek(p, now),
                None => Vec::new(),
            },
            InputEvent::JumpToStart => {
                let home = if self.is_looping { self.session.loop_start() } else { 0.0 };
                self.seek(home, now)
            }
            InputEvent::SeekBy(delta) => self.seek((self.progress + delta).clamp(0.0, 1.0), now),
            InputEvent::AdjustVolume(track, delta) => self.adjust_volume(track, delta),
            // rebuild-the-world events are main's problem
            InputEvent::LoadSong(_)
            | InputEvent::CycleDevice
            | InputEvent::RefreshHardware
            | InputEvent::Quit => Vec::new(),
        }
    }

    /// Schedule playback from `from` (or the resume point when omitted:
    /// loop-in while looping, else the current position). Stops any active
    /// plan first, slices every track's segments, and hands the engine one
    /// shared start timestamp a fixed lead ahead of `now`.
    pub fn play(&mut self, from: Option<f64>, now: u64) -> Vec<EngineCommand> {
        let resume = if self.is_looping { self.session.loop_start() } else { self.progress };
        let from = from.unwrap_or(resume).clamp(0.0, 1.0);

        let Some(song) = self.song.as_mut() else {
            return Vec::new();
        };
        let len = song.len_frames;
        let start_frame = (len as f64 * from).round() as u64;
        let loop_start = (len as f64 * self.session.loop_start()).round() as u64;
        let loop_end = (len as f64 * self.session.loop_end()).round() as u64;

        // A loop request starting at or past the loop-out point degrades to
        // a linear run for this start; the looping mode itself stays on.
        let plan = if self.is_looping && start_frame < loop_end {
            PlaybackPlan::Looping { start_frame, loop_start, loop_end }
        } else {
            PlaybackPlan::Linear { start_frame, end_frame: len }
        };

        let channels = self.hw.channels;
        let lead = (self.hw.sample_rate as f64 * SCHEDULE_LEAD_SECS).round() as u64;
        let start_at = now + lead;

        let mut endpoints = Vec::with_capacity(song.tracks.len());
        for track in &mut song.tracks {
            let (intro, looped) = match plan {
                PlaybackPlan::Linear { start_frame, end_frame } => (
                    prepare_segment(&track.source, &mut track.intro_scratch, channels, start_frame, end_frame, track.index),
                    None,
                ),
                PlaybackPlan::Looping { start_frame, loop_start, loop_end } => (
                    prepare_segment(&track.source, &mut track.intro_scratch, channels, start_frame, loop_end, track.index),
                    prepare_segment(&track.source, &mut track.loop_scratch, channels, loop_start, loop_end, track.index),
                ),
            };
            if intro.is_none() && looped.is_none() {
                continue; // degenerate, nothing to schedule for this track
            }
            endpoints.push(Endpoint::new(EndpointSchedule {
                track: track.index,
                channel: track.index,
                intro,
                looped,
            }));
        }

        self.progress = from;
        self.state = State::Playing { start_at, plan };
        vec![EngineCommand::Stop, EngineCommand::Schedule { start_at, endpoints }]
    }

    /// Halts all endpoints. Idempotent; the position stays where it is.
    pub fn stop(&mut self) -> Vec<EngineCommand> {
        self.state = State::Stopped;
        vec![EngineCommand::Stop]
    }

    pub fn toggle_play(&mut self, now: u64) -> Vec<EngineCommand> {
        if self.is_playing() {
            self.stop()
        } else {
            self.play(Some(self.progress), now)
        }
    }

    /// Flip looping mode. Mid-playback this re-derives the segmentation
    /// from the current position: the position is preserved, only the plan
    /// changes.
    pub fn toggle_loop(&mut self, now: u64) -> Vec<EngineCommand> {
        self.is_looping = !self.is_looping;
        if self.is_playing() {
            self.play(Some(self.progress), now)
        } else {
            Vec::new()
        }
    }

    pub fn seek(&mut self, progress: f64, now: u64) -> Vec<EngineCommand> {
        let was_playing = self.is_playing();
        let mut cmds = self.stop();
        self.progress = progress.clamp(0.0, 1.0);
        if was_playing {
            cmds.extend(self.play(Some(self.progress), now));
        }
        cmds
    }

    pub fn set_loop_in(&mut self, now: u64) -> Vec<EngineCommand> {
        self.session.set_loop_in(self.progress);
        self.rederive_if_looping(now)
    }

    pub fn set_loop_out(&mut self, now: u64) -> Vec<EngineCommand> {
        self.session.set_loop_out(self.progress);
        self.rederive_if_looping(now)
    }

    pub fn reset_loop(&mut self, now: u64) -> Vec<EngineCommand> {
        self.session.reset_loop();
        self.rederive_if_looping(now)
    }

    fn rederive_if_looping(&mut self, now: u64) -> Vec<EngineCommand> {
        if self.is_playing() && self.is_looping {
            self.play(Some(self.progress), now)
        } else {
            Vec::new()
        }
    }

    fn adjust_volume(&mut self, track: usize, delta: f32) -> Vec<EngineCommand> {
        let Some(song) = self.song.as_mut() else {
            return Vec::new();
        };
        let Some(t) = song.tracks.get_mut(track) else {
            return Vec::new();
        };
        t.volume = (t.volume + delta).clamp(0.0, 1.0);
        vec![EngineCommand::SetVolume { track, value: t.volume }]
    }

    pub fn set_volume(&mut self, track: usize, value: f32) -> Vec<EngineCommand> {
        let Some(song) = self.song.as_mut() else {
            return Vec::new();
        };
        let Some(t) = song.tracks.get_mut(track) else {
            return Vec::new();
        };
        t.volume = value.clamp(0.0, 1.0);
        vec![EngineCommand::SetVolume { track, value: t.volume }]
    }

    /// The progress clock. Recomputes the absolute position from the
    /// render clock and the active plan on every call; when a linear run
    /// hits the end of the song it auto-stops and rewinds.
    pub fn tick(&mut self, now: u64) -> Vec<EngineCommand> {
        let State::Playing { start_at, plan } = self.state else {
            return Vec::new();
        };
        let Some(song) = self.song.as_ref() else {
            return Vec::new();
        };
        let frames_played = now.saturating_sub(start_at);
        self.progress = plan.progress(frames_played, song.len_frames);
        if !plan.is_looping() && self.progress >= 1.0 {
            self.state = State::Stopped;
            self.progress = 0.0;
            return vec![EngineCommand::Stop];
        }
        Vec::new()
    }

    pub fn display_state(&self, meters: &MeterBank) -> DisplayState {
        let tracks = self
            .song
            .as_ref()
            .map(|song| {
                song.tracks
                    .iter()
                    .map(|t| TrackDisplay {
                        name: t.name.clone(),
                        volume: t.volume,
                        meter_db: meters.display_db(t.index),
                    })
                    .collect()
            })
            .unwrap_or_default();

        DisplayState {
            playing: self.is_playing(),
            looping: self.is_looping,
            progress: self.progress,
            loop_start: self.session.loop_start(),
            loop_end: self.session.loop_end(),
            markers: self.session.markers(),
            tracks,
            song_name: self.song.as_ref().map(|s| s.name.clone()).unwrap_or_default(),
            song_rate: self.song.as_ref().map(|s| s.sample_rate).unwrap_or(0),
            songs: self.library.iter().map(|n| n.name.clone()).collect(),
            device_name: self.device_name.clone(),
            device_channels: self.hw.channels,
            device_rate: self.hw.sample_rate,
            advisory: self.advisory.clone(),
        }
    }
}

/// Slice `[start, end)` of the source into the track's scratch, then
/// freeze a copy for the flight. Degenerate ranges and out-of-range
/// channels produce nothing.
fn prepare_segment(
    source: &[f32],
    scratch: &mut Vec<f32>,
    channels: usize,
    start: u64,
    end: u64,
    target: usize,
) -> Option<Segment> {
    if end <= start || target >= channels || channels == 0 {
        return None;
    }
    let count = (end - start) as usize;
    router::slice_into(source, scratch, channels, start as usize, count, target);
    Some(Segment { data: Arc::from(scratch.as_slice()), channels })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::song::Track;

    const LEN: u64 = 48_000;

    fn test_hw() -> HardwareFormat {
        HardwareFormat { channels: 4, sample_rate: 48_000 }
    }

    fn test_song(rate: u32, tracks: usize) -> Song {
        Song {
            name: "test".into(),
            tracks: (0..tracks)
                .map(|i| Track {
                    index: i,
                    name: format!("stem {i}"),
                    source: vec![0.1; LEN as usize],
                    sample_rate: rate,
                    volume: 1.0,
                    intro_scratch: Vec::new(),
                    loop_scratch: Vec::new(),
                })
                .collect(),
            len_frames: LEN,
            sample_rate: rate,
            dropped: 0,
            failed: Vec::new(),
        }
    }

    fn ready_transport() -> Transport {
        let mut t = Transport::new(test_hw(), "test device".into());
        t.install_song(test_song(48_000, 2), true);
        t
    }

    fn schedule_of(cmds: &[EngineCommand]) -> (u64, &Vec<Endpoint>) {
        for cmd in cmds {
            if let EngineCommand::Schedule { start_at, endpoints } = cmd {
                return (*start_at, endpoints);
            }
        }
        panic!("no Schedule command in {cmds:?}");
    }

    #[test]
    fn seek_reads_back_within_a_frame() {
        let mut t = ready_transport();
        for p in [0.0, 0.25, 0.37, 0.9999, 1.0] {
            t.seek(p, 0);
            assert!((t.progress() - p).abs() <= 1.0 / LEN as f64, "seek({p})");
        }
    }

    #[test]
    fn all_endpoints_share_one_future_start_timestamp() {
        let mut t = ready_transport();
        let cmds = t.play(Some(0.0), 10_000);
        let (start_at, endpoints) = schedule_of(&cmds);
        assert_eq!(start_at, 10_000 + 960); // 20 ms at 48 kHz
        assert_eq!(endpoints.len(), 2);
        assert_eq!(endpoints[0].channel, 0);
        assert_eq!(endpoints[1].channel, 1);
    }

    #[test]
    fn play_stops_active_endpoints_first() {
        let mut t = ready_transport();
        let cmds = t.play(Some(0.0), 0);
        assert!(matches!(cmds[0], EngineCommand::Stop));
    }

    #[test]
    fn toggle_loop_while_playing_preserves_progress() {
        let mut t = ready_transport();
        t.play(Some(0.0), 0); // start_at lands at frame 960 (20 ms lead)
        t.tick(960 + LEN / 2);
        let before = t.progress();
        assert!((before - 0.5).abs() < 1e-6);
        t.toggle_loop(960 + LEN / 2);
        assert!((t.progress() - before).abs() < 1e-9);
        assert!(t.is_playing());
    }

    #[test]
    fn marker_set_then_jump_is_exact() {
        let mut t = ready_transport();
        t.seek(0.62, 0);
        t.handle_input(InputEvent::SetMarker(4), 0);
        t.seek(0.1, 0);
        t.handle_input(InputEvent::JumpToMarker(4), 0);
        assert_eq!(t.progress(), 0.62);
    }

    #[test]
    fn jump_to_start_goes_to_loop_in_while_looping() {
        let mut t = ready_transport();
        t.seek(0.3, 0);
        t.set_loop_in(0);
        t.seek(0.8, 0);
        t.handle_input(InputEvent::JumpToStart, 0);
        assert_eq!(t.progress(), 0.0); // not looping: home is 0
        t.toggle_loop(0);
        t.seek(0.8, 0);
        t.handle_input(InputEvent::JumpToStart, 0);
        assert!((t.progress() - 0.3).abs() < 1e-9);
    }

    #[test]
    fn looping_start_past_loop_end_degrades_to_linear() {
        let mut t = ready_transport();
        t.seek(0.2, 0);
        t.set_loop_in(0);
        t.seek(0.5, 0);
        t.set_loop_out(0);
        t.toggle_loop(0);
        let cmds = t.play(Some(0.7), 0);
        assert!(matches!(t.current_plan(), Some(PlaybackPlan::Linear { .. })));
        let (_, endpoints) = schedule_of(&cmds);
        assert!(endpoints.iter().all(|e| e.looped().is_none()));
    }

    #[test]
    fn looping_run_schedules_intro_plus_loop_segments() {
        let mut t = ready_transport();
        t.seek(0.25, 0);
        t.set_loop_in(0);
        t.seek(0.5, 0);
        t.set_loop_out(0);
        t.toggle_loop(0);
        let cmds = t.play(None, 0); // resume point while looping is loop-in
        match t.current_plan() {
            Some(PlaybackPlan::Looping { start_frame, loop_start, loop_end }) => {
                assert_eq!(start_frame, LEN / 4);
                assert_eq!(loop_start, LEN / 4);
                assert_eq!(loop_end, LEN / 2);
            }
            other => panic!("expected a looping plan, got {other:?}"),
        }
        let (_, endpoints) = schedule_of(&cmds);
        for e in endpoints {
            let intro = e.intro().expect("intro segment");
            let looped = e.looped().expect("loop segment");
            assert_eq!(intro.frames() as u64, LEN / 4);
            assert_eq!(looped.frames() as u64, LEN / 4);
            assert_eq!(intro.channels, 4);
        }
    }

    #[test]
    fn linear_run_auto_stops_and_rewinds_at_the_end() {
        let mut t = ready_transport();
        t.play(Some(0.5), 0);
        let cmds = t.tick(LEN); // well past the end
        assert!(cmds.iter().any(|c| matches!(c, EngineCommand::Stop)));
        assert!(!t.is_playing());
        assert_eq!(t.progress(), 0.0);
    }

    #[test]
    fn looping_run_never_auto_stops() {
        let mut t = ready_transport();
        t.toggle_loop(0);
        t.play(Some(0.0), 0);
        let cmds = t.tick(LEN * 10);
        assert!(cmds.is_empty());
        assert!(t.is_playing());
        assert!(t.progress() < 1.0);
    }

    #[test]
    fn play_from_the_very_end_schedules_nothing() {
        let mut t = ready_transport();
        let cmds = t.play(Some(1.0), 0);
        let (_, endpoints) = schedule_of(&cmds);
        assert!(endpoints.is_empty());
    }

    #[test]
    fn tracks_beyond_the_channel_count_are_not_scheduled() {
        let mut t = Transport::new(HardwareFormat { channels: 2, sample_rate: 48_000 }, "dev".into());
        // the store would normally truncate at load; the router is the backstop
        t.install_song(test_song(48_000, 4), true);
        let cmds = t.play(Some(0.0), 0);
        let (_, endpoints) = schedule_of(&cmds);
        assert_eq!(endpoints.len(), 2);
    }

    #[test]
    fn rate_mismatch_raises_an_advisory_and_matching_reload_clears_it() {
        let mut t = ready_transport();
        t.install_song(test_song(44_100, 2), true);
        let ds = t.display_state(&MeterBank::new());
        assert!(ds.advisory.is_some(), "44.1k song on a 48k device");
        t.install_song(test_song(48_000, 2), true);
        let ds = t.display_state(&MeterBank::new());
        assert!(ds.advisory.is_none(), "matching reload clears the advisory");
    }

    #[test]
    fn device_change_keeps_the_session_but_rewinds() {
        let mut t = ready_transport();
        t.seek(0.3, 0);
        t.set_loop_in(0);
        t.handle_input(InputEvent::SetMarker(2), 0);
        t.play(Some(0.4), 0);

        t.set_hardware(HardwareFormat { channels: 8, sample_rate: 48_000 }, "other".into());
        t.install_song(test_song(48_000, 2), false);

        assert!(!t.is_playing());
        assert_eq!(t.progress(), 0.0);
        let ds = t.display_state(&MeterBank::new());
        assert!((ds.loop_start - 0.3).abs() < 1e-9);
        assert_eq!(ds.markers[1], Some(0.3));
        assert_eq!(ds.device_channels, 8);
    }

    #[test]
    fn user_song_load_resets_the_session() {
        let mut t = ready_transport();
        t.seek(0.3, 0);
        t.set_loop_in(0);
        t.handle_input(InputEvent::SetMarker(1), 0);
        t.install_song(test_song(48_000, 2), true);
        let ds = t.display_state(&MeterBank::new());
        assert_eq!(ds.loop_start, 0.0);
        assert_eq!(ds.markers, [None; crate::shared::NUM_MARKERS]);
    }

    #[test]
    fn volume_changes_emit_engine_commands_and_clamp() {
        let mut t = ready_transport();
        let cmds = t.handle_input(InputEvent::AdjustVolume(1, -0.3), 0);
        assert!(matches!(cmds[0], EngineCommand::SetVolume { track: 1, value } if (value - 0.7).abs() < 1e-6));
        let cmds = t.set_volume(1, 2.0);
        assert!(matches!(cmds[0], EngineCommand::SetVolume { track: 1, value } if value == 1.0));
    }
}
