//! MIDI pitch table and frequency conversions
//!
//! Equal temperament, A4 (MIDI note 69) = 440 Hz.

use log::warn;

pub const MIDI_NOTE_COUNT: usize = 128;
pub const MIDI_NOTE_MAX: i32 = 127;

const A4_FREQ: f64 = 440.0;
const A4_NOTE: f64 = 69.0;

/// Converts a MIDI note number to its frequency in Hz.
pub fn midi_to_freq(midi: i32) -> f64 {
    if !(0..=MIDI_NOTE_MAX).contains(&midi) {
        warn!("MIDI note {} out of range in midi_to_freq()", midi);
    }
    (A4_FREQ.ln() + (midi as f64 - A4_NOTE) * 2.0_f64.ln() / 12.0).exp()
}

/// Converts a frequency in Hz to the nearest MIDI note number.
pub fn freq_to_midi(f: f64) -> i32 {
    let midi = (0.5 + A4_NOTE + 12.0 / 2.0_f64.ln() * (f / A4_FREQ).ln()) as i32;
    if !(0..=MIDI_NOTE_MAX).contains(&midi) {
        warn!("MIDI note {} out of range in freq_to_midi()", midi);
    }
    midi
}

/// Converts a MIDI note number to log-frequency.
pub fn midi_to_logf(midi: i32) -> f64 {
    if !(0..=MIDI_NOTE_MAX).contains(&midi) {
        warn!("MIDI note {} out of range in midi_to_logf()", midi);
    }
    A4_FREQ.ln() + (midi as f64 - A4_NOTE) * 2.0_f64.ln() / 12.0
}

/// Converts a log-frequency value to the nearest MIDI note number.
pub fn logf_to_midi(logf: f64) -> i32 {
    let midi = (0.5 + A4_NOTE + 12.0 / 2.0_f64.ln() * (logf - A4_FREQ.ln())) as i32;
    if !(0..=MIDI_NOTE_MAX).contains(&midi) {
        warn!("MIDI note {} out of range in logf_to_midi()", midi);
    }
    midi
}

/// Fixed 128-entry pitch reference table plus the run's pitch-adjustment
/// state. The frequency table is built once and never changes; only the
/// adjustment scalar and the accumulated shift statistics are mutable.
#[derive(Debug, Clone)]
pub struct PitchTable {
    freqs: [f64; MIDI_NOTE_COUNT],
    /// Pitch adjustment in half-notes, applied at note-detection time.
    pub adj_pitch: f64,
    /// Accumulated sub-semitone offsets seen by [`PitchTable::get_note`],
    /// used to suggest an adjustment after a run.
    pub pitch_shift: f64,
    pub n_pitch: u64,
}

impl Default for PitchTable {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl PitchTable {
    pub fn new(adj_pitch: f64) -> Self {
        let mut freqs = [0.0; MIDI_NOTE_COUNT];
        for (midi, f) in freqs.iter_mut().enumerate() {
            *f = midi_to_freq(midi as i32);
        }
        PitchTable {
            freqs,
            adj_pitch,
            pitch_shift: 0.0,
            n_pitch: 0,
        }
    }

    /// Reference frequency for a MIDI note.
    pub fn freq(&self, midi: usize) -> f64 {
        self.freqs[midi]
    }

    /// Maps a frequency estimate to a MIDI note, honoring the adjustment
    /// scalar and accumulating the pitch-shift statistic.
    ///
    /// Returns `None` for non-positive frequencies. Out-of-range notes are
    /// clamped to the MIDI range; noisy analysis produces these routinely,
    /// so they are not errors.
    pub fn get_note(&mut self, freq: f64) -> Option<i32> {
        const FACTOR: f64 = 17.31234049066756242; // 12 / ln(2)
        if freq <= 0.0 {
            return None;
        }
        let dnote = 69.5 + FACTOR * (freq / A4_FREQ).ln() + self.adj_pitch;
        let inote = dnote as i32;
        self.pitch_shift += dnote - inote as f64;
        self.n_pitch += 1;
        Some(inote.clamp(0, MIDI_NOTE_MAX))
    }

    /// Average sub-semitone drift observed so far, or `None` before any
    /// note has been detected.
    pub fn suggested_adjustment(&self) -> Option<f64> {
        if self.n_pitch == 0 {
            None
        } else {
            Some(-(self.pitch_shift / self.n_pitch as f64 - 0.5))
        }
    }
}
