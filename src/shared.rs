// Types shared between the TUI, the transport and main's wiring.
//
// Same split as always: the transport layer owns all playback and session
// state, the TUI renders a DisplayState snapshot every frame and resolves
// keypresses into semantic InputEvents for the backend to handle.

/// Hard cap on stems we will ever route; real interfaces top out at 32 outs.
pub const MAX_TRACKS: usize = 32;

/// Marker slots 1-9 (digit keys).
pub const NUM_MARKERS: usize = 9;

/// Lead time between issuing a schedule and the common start timestamp.
/// Every endpoint of one play() call gets the same deadline, which is the
/// whole alignment mechanism.
pub const SCHEDULE_LEAD_SECS: f64 = 0.020;

/// Per-track meter refresh floor.
pub const METER_INTERVAL_SECS: f64 = 0.030;

/// The meter reads every 10th sample, not the full buffer.
pub const METER_DECIMATION: usize = 10;

/// Floor for the meter display; non-finite levels clamp here too.
pub const MIN_METER_DB: f32 = -60.0;

#[derive(Clone, Debug, PartialEq)]
pub enum InputEvent {
    // transport command surface
    TogglePlay,
    ToggleLoop,
    ResetLoop,
    SetLoopIn,
    SetLoopOut,
    SetMarker(u8),    // slot 1-9
    JumpToMarker(u8), // slot 1-9
    JumpToStart,
    SeekBy(f64), // signed progress delta, arrow-key nudge

    // per-track volume, resolved by the tui against its selected track
    AdjustVolume(usize, f32),

    // handled in main because they rebuild the stream or the buffer store
    LoadSong(usize), // index into the library list
    CycleDevice,
    RefreshHardware,

    Quit,
}

#[derive(Clone, Debug)]
pub struct TrackDisplay {
    pub name: String,
    pub volume: f32,
    pub meter_db: f32,
}

/// One frame's worth of everything the TUI needs to draw.
#[derive(Clone, Debug)]
pub struct DisplayState {
    pub playing: bool,
    pub looping: bool,
    pub progress: f64,
    pub loop_start: f64,
    pub loop_end: f64,
    pub markers: [Option<f64>; NUM_MARKERS],
    pub tracks: Vec<TrackDisplay>,
    pub song_name: String,
    pub song_rate: u32,
    pub songs: Vec<String>,
    pub device_name: String,
    pub device_channels: usize,
    pub device_rate: u32,
    pub advisory: Option<String>,
}
