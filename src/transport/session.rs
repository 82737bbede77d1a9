use crate::shared::NUM_MARKERS;

/// Per-song session state: the loop region and the marker slots.
///
/// Resets when a new song loads, survives a device change. Every mutator
/// keeps `loop_start < loop_end`; when a new bound would break that, the
/// OTHER bound snaps back to its default (0 or 1).
#[derive(Clone, Debug)]
pub struct Session {
    loop_start: f64,
    loop_end: f64,
    markers: [Option<f64>; NUM_MARKERS],
}

impl Default for Session {
    fn default() -> Self {
        Self {
            loop_start: 0.0,
            loop_end: 1.0,
            markers: [None; NUM_MARKERS],
        }
    }
}

impl Session {
    pub fn loop_start(&self) -> f64 {
        self.loop_start
    }

    pub fn loop_end(&self) -> f64 {
        self.loop_end
    }

    pub fn markers(&self) -> [Option<f64>; NUM_MARKERS] {
        self.markers
    }

    /// Loop-in at `p`. Setting it at the very end of the song is ignored,
    /// there is no region left to loop.
    pub fn set_loop_in(&mut self, p: f64) {
        let p = p.clamp(0.0, 1.0);
        if p >= 1.0 {
            return;
        }
        self.loop_start = p;
        if self.loop_start >= self.loop_end {
            self.loop_end = 1.0;
        }
    }

    /// Loop-out at `p`; ignored at the very start for the same reason.
    pub fn set_loop_out(&mut self, p: f64) {
        let p = p.clamp(0.0, 1.0);
        if p <= 0.0 {
            return;
        }
        self.loop_end = p;
        if self.loop_start >= self.loop_end {
            self.loop_start = 0.0;
        }
    }

    pub fn reset_loop(&mut self) {
        self.loop_start = 0.0;
        self.loop_end = 1.0;
    }

    /// Slots are 1-9; anything else is ignored.
    pub fn set_marker(&mut self, slot: u8, p: f64) {
        if (1..=NUM_MARKERS as u8).contains(&slot) {
            self.markers[slot as usize - 1] = Some(p.clamp(0.0, 1.0));
        }
    }

    pub fn marker(&self, slot: u8) -> Option<f64> {
        if (1..=NUM_MARKERS as u8).contains(&slot) {
            self.markers[slot as usize - 1]
        } else {
            None
        }
    }
}
