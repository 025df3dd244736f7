//! Configuration for the pitch-to-MIDI pipeline

use crate::error::{PitchError, Result};
use crate::window::Window;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub fft: FftConfig,
    pub notes: NotesConfig,
    pub filters: FilterConfig,
    pub cleanup: CleanupConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            fft: FftConfig::default(),
            notes: NotesConfig::default(),
            filters: FilterConfig::default(),
            cleanup: CleanupConfig::default(),
        }
    }
}

/// Spectral-transform parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FftConfig {
    /// FFT window length in samples.
    pub length: usize,
    /// Analysis hop in samples; 0 selects the default of `length / 4`.
    pub hop: usize,
    pub window: Window,
}

impl Default for FftConfig {
    fn default() -> Self {
        FftConfig {
            length: 2048,
            hop: 0,
            window: Window::Hanning,
        }
    }
}

impl FftConfig {
    /// Effective hop size after applying the `length / 4` default.
    pub fn effective_hop(&self) -> usize {
        if self.hop == 0 {
            self.length / 4
        } else {
            self.hop
        }
    }
}

/// Note-selection parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotesConfig {
    /// Bottom of the note search range (MIDI number).
    pub bottom: u8,
    /// Top of the note search range (MIDI number).
    pub top: u8,
    /// log10 of the cutoff ratio used to scale velocity.
    pub cut_ratio: f64,
    /// log10 of the cutoff ratio relative to the average power.
    pub rel_cut_ratio: f64,
    /// Absolute cutoff when true, relative-to-average when false.
    pub absolute_cutoff: bool,
    /// Velocity rise that re-triggers a sounding note; 128 disables it.
    pub peak_threshold: i32,
    /// Velocity above which a note turns on.
    pub on_threshold: i32,
    /// Velocity at or below which a sounding note turns off.
    pub off_threshold: i32,
    /// Pitch adjustment in half-notes.
    pub adj_pitch: f64,
}

impl Default for NotesConfig {
    fn default() -> Self {
        NotesConfig {
            bottom: 28, // E1
            top: 103,   // G7
            cut_ratio: -5.0,
            rel_cut_ratio: 1.0,
            absolute_cutoff: true,
            peak_threshold: 128,
            on_threshold: 8,
            off_threshold: 0,
            adj_pitch: 0.0,
        }
    }
}

/// Spectral post-filter parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Use phase-vocoder frequency correction.
    pub use_phase: bool,
    /// One-sided bin count for local-average (drum-removal) subtraction;
    /// 0 disables the filter.
    pub psub_n: usize,
    /// Subtraction factor for the local average.
    pub psub_f: f64,
    /// Subtraction factor for the octave image; 0 disables the filter.
    pub oct_f: f64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        FilterConfig {
            use_phase: true,
            psub_n: 0,
            psub_f: 0.0,
            oct_f: 0.0,
        }
    }
}

/// One short-note removal pass: drop On/Off pairs no longer than
/// `max_duration` steps with on-velocity at most `max_velocity`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ShortNotePass {
    pub max_duration: i32,
    pub max_velocity: u8,
}

/// Post-loop regulation parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanupConfig {
    pub short_note_passes: Vec<ShortNotePass>,
    pub remove_octaves: bool,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        CleanupConfig {
            short_note_passes: vec![
                ShortNotePass {
                    max_duration: 1,
                    max_velocity: 64,
                },
                ShortNotePass {
                    max_duration: 2,
                    max_velocity: 28,
                },
            ],
            remove_octaves: true,
        }
    }
}

/// Validates a configuration before the frame loop starts.
pub fn validate_config(config: &Config) -> Result<()> {
    if config.fft.length < 16 || config.fft.length % 2 != 0 {
        return Err(PitchError::ConfigValidationFailed(format!(
            "FFT length {} must be even and at least 16",
            config.fft.length
        )));
    }
    if config.fft.effective_hop() > config.fft.length {
        return Err(PitchError::ConfigValidationFailed(format!(
            "hop {} exceeds FFT length {}",
            config.fft.effective_hop(),
            config.fft.length
        )));
    }
    if matches!(config.fft.window, Window::Nuttall | Window::Triangular) {
        return Err(PitchError::UnsupportedWindow(
            config.fft.window.name().to_string(),
        ));
    }
    if config.notes.top > 127 || config.notes.bottom > 127 {
        return Err(PitchError::InvalidNoteRange(
            config.notes.bottom as i32,
            config.notes.top as i32,
        ));
    }
    if config.notes.top < config.notes.bottom {
        return Err(PitchError::InvalidNoteRange(
            config.notes.bottom as i32,
            config.notes.top as i32,
        ));
    }
    if config.notes.cut_ratio >= 0.0 {
        return Err(PitchError::ConfigValidationFailed(format!(
            "cut_ratio {} must be negative (log10 of a ratio below full scale)",
            config.notes.cut_ratio
        )));
    }
    Ok(())
}

/// Loads and validates a configuration from a JSON file.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = serde_json::from_str(&content)?;
    validate_config(&config)?;
    Ok(config)
}

/// Saves a configuration to a JSON file.
pub fn save_config<P: AsRef<Path>>(config: &Config, path: P) -> Result<()> {
    let content = serde_json::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}
