mod audio;
mod audio_api;
mod loader;
mod pipeline;
mod shared;
mod song;
mod transport;
mod tui;

use std::path::PathBuf;
use std::time::Instant;

use crossterm::terminal;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;

use loader::library::{self, SongNode};
use pipeline::persistence::{self, SavedSession};
use shared::InputEvent;
use song::Song;
use transport::Transport;

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    terminal::enable_raw_mode()?;
    let _guard = RawModeGuard; // auto drops when out of scope

    let root: PathBuf = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_default());

    let saved = persistence::load_session(&root).unwrap_or_default();
    let preferred = (!saved.device_name.is_empty()).then_some(saved.device_name.as_str());

    let mut audio = audio::start_audio(preferred)?;
    let mut transport = Transport::new(audio.format, audio.device_name.clone());
    if preferred.is_some_and(|p| p != audio.device_name) {
        transport.set_advisory(format!(
            "device '{}' unavailable; using '{}'",
            saved.device_name, audio.device_name
        ));
    }

    let songs = library::scan(&root);
    transport.set_library(songs.clone());

    // come back up on the last song, else the first playable one
    let mut current_song = songs
        .iter()
        .position(|n| n.name == saved.last_song)
        .or(if songs.is_empty() { None } else { Some(0) });
    if let Some(idx) = current_song {
        if !load_song_into(&mut transport, &audio, &songs[idx], true) {
            current_song = None;
        }
    }

    let backend = CrosstermBackend::new(std::io::stdout());
    let mut term = Terminal::new(backend)?;
    term.clear()?;

    let tick_rate = std::time::Duration::from_millis(16); // ~60fps progress polling
    let mut last_tick = Instant::now();
    let mut tui_state = tui::mode::TuiState::default();

    loop {
        let ds = transport.display_state(audio.meters());
        tui_state.sync(ds.tracks.len(), ds.songs.len());

        term.draw(|frame| {
            tui::view::render(frame, frame.area(), &ds, &tui_state);
        })?;

        let timeout = tick_rate.saturating_sub(last_tick.elapsed());
        let events = tui::input::poll_input(timeout, &mut tui_state)?;
        for event in events {
            match event {
                InputEvent::Quit => {
                    let session = SavedSession {
                        device_name: audio.device_name.clone(),
                        last_song: current_song
                            .and_then(|i| songs.get(i))
                            .map(|n| n.name.clone())
                            .unwrap_or_default(),
                    };
                    let _ = persistence::save_session(&root, &session);
                    drop(term);
                    for cmd in transport.stop() {
                        audio.send(cmd);
                    }
                    return Ok(());
                }
                InputEvent::LoadSong(idx) => {
                    if let Some(node) = songs.get(idx) {
                        if load_song_into(&mut transport, &audio, node, true) {
                            current_song = Some(idx);
                        } else {
                            current_song = None;
                        }
                    }
                }
                InputEvent::CycleDevice => {
                    let host = cpal::default_host();
                    if let Some(next) = audio::next_device_name(&host, &audio.device_name) {
                        switch_device(&mut audio, &mut transport, &songs, current_song, Some(next.as_str()));
                    }
                }
                InputEvent::RefreshHardware => {
                    // renegotiate with the current device; picks up channel
                    // count or rate changes without switching
                    let name = audio.device_name.clone();
                    switch_device(&mut audio, &mut transport, &songs, current_song, Some(name.as_str()));
                }
                other => {
                    let cmds = transport.handle_input(other, audio.now_frames());
                    for cmd in cmds {
                        audio.send(cmd);
                    }
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
            let cmds = transport.tick(audio.now_frames());
            for cmd in cmds {
                audio.send(cmd);
            }
        }
    }
}

/// Decode the song at `node` against the current hardware format and swap
/// it into the transport. Returns false (advisory raised, song cleared)
/// when nothing could be loaded.
fn load_song_into(
    transport: &mut Transport,
    audio: &audio::AudioHandle,
    node: &SongNode,
    reset_session: bool,
) -> bool {
    audio.meters().reset();
    match Song::load(&node.path, audio.format.channels) {
        Ok(song) => {
            for cmd in transport.install_song(song, reset_session) {
                audio.send(cmd);
            }
            true
        }
        Err(e) => {
            for cmd in transport.clear_song() {
                audio.send(cmd);
            }
            transport.set_advisory(format!("could not load {}: {e}", node.name));
            false
        }
    }
}

/// Full device change: stop, rebuild the stream, renegotiate the format,
/// then reload the current song at the new channel count. Session state
/// (markers, loop region) survives; progress rewinds.
fn switch_device(
    audio: &mut audio::AudioHandle,
    transport: &mut Transport,
    songs: &[SongNode],
    current_song: Option<usize>,
    wanted: Option<&str>,
) {
    for cmd in transport.stop() {
        audio.send(cmd);
    }
    match audio::start_audio(wanted) {
        Ok(new_audio) => {
            *audio = new_audio;
            transport.set_hardware(audio.format, audio.device_name.clone());
            if let Some(node) = current_song.and_then(|i| songs.get(i)) {
                load_song_into(transport, audio, node, false);
            }
            if wanted.is_some_and(|w| w != audio.device_name) {
                transport.set_advisory(format!(
                    "device '{}' unavailable; using '{}'",
                    wanted.unwrap_or_default(),
                    audio.device_name
                ));
            }
        }
        Err(e) => {
            // keep the old stream running rather than going silent
            transport.set_advisory(format!("device switch failed: {e}"));
        }
    }
}

struct RawModeGuard;
impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}
