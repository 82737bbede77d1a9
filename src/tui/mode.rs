// State local to the tui: which track the volume keys act on and which
// library entry Enter would load. Bounds are synced from DisplayState each
// frame so selections stay valid after loads and device changes.
#[derive(Clone, Debug, Default)]
pub struct TuiState {
    pub selected_track: usize,
    pub selected_song: usize,
    pub num_tracks: usize,
    pub num_songs: usize,
}

impl TuiState {
    pub fn sync(&mut self, num_tracks: usize, num_songs: usize) {
        self.num_tracks = num_tracks;
        self.num_songs = num_songs;
        if self.selected_track >= num_tracks {
            self.selected_track = num_tracks.saturating_sub(1);
        }
        if self.selected_song >= num_songs {
            self.selected_song = num_songs.saturating_sub(1);
        }
    }

    pub fn track_up(&mut self) {
        self.selected_track = self.selected_track.saturating_sub(1);
    }

    pub fn track_down(&mut self) {
        if self.selected_track + 1 < self.num_tracks {
            self.selected_track += 1;
        }
    }

    pub fn song_prev(&mut self) {
        self.selected_song = self.selected_song.saturating_sub(1);
    }

    pub fn song_next(&mut self) {
        if self.selected_song + 1 < self.num_songs {
            self.selected_song += 1;
        }
    }
}
