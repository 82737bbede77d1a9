// Saved on quit, loaded on startup so the next run comes back up on the
// same interface and song.
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

const STEMCAST_DIR: &str = ".stemcast";
const SESSION_FILE: &str = "session.json";

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SavedSession {
    pub device_name: String,
    pub last_song: String, // library node name, empty when nothing loaded yet
}

// <library_root>/.stemcast/session.json
fn session_file_path(root: &Path) -> PathBuf {
    root.join(STEMCAST_DIR).join(SESSION_FILE)
}

pub fn load_session(root: &Path) -> Option<SavedSession> {
    let data = std::fs::read_to_string(session_file_path(root)).ok()?;
    serde_json::from_str(&data).ok()
}

pub fn save_session(root: &Path, session: &SavedSession) -> anyhow::Result<()> {
    let path = session_file_path(root);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(session)?;
    std::fs::write(&path, json)?;
    Ok(())
}
