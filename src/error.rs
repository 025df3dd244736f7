//! Error types for the pitch-to-MIDI system

use std::fmt;

/// Custom error type for pitch-to-MIDI processing
#[derive(Debug, Clone)]
pub enum PitchError {
    /// E001: Invalid audio format (e.g., unsupported channel count)
    InvalidAudioFormat(String),
    /// E002: Audio file I/O error
    AudioFileError(String),
    /// E003: Configuration validation failed
    ConfigValidationFailed(String),
    /// E004: Unsupported window function
    UnsupportedWindow(String),
    /// E005: Invalid note range (top below bottom, or out of MIDI range)
    InvalidNoteRange(i32, i32),
    /// E006: Spectral processing error
    SpectralProcessingError(String),
    /// E007: Patch file error
    PatchFileError(String),
    /// E008: MIDI export error
    MidiExportError(String),
    /// E009: Short write during MIDI serialization (wrote, expected)
    MidiShortWrite(usize, usize),
}

impl fmt::Display for PitchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PitchError::InvalidAudioFormat(msg) => {
                write!(f, "E001: Invalid audio format - {}", msg)
            }
            PitchError::AudioFileError(msg) => {
                write!(f, "E002: Audio file I/O error - {}", msg)
            }
            PitchError::ConfigValidationFailed(msg) => {
                write!(f, "E003: Configuration validation failed - {}", msg)
            }
            PitchError::UnsupportedWindow(name) => {
                write!(f, "E004: Unsupported window function '{}'", name)
            }
            PitchError::InvalidNoteRange(bottom, top) => {
                write!(f, "E005: Invalid note range [{}, {}]", bottom, top)
            }
            PitchError::SpectralProcessingError(msg) => {
                write!(f, "E006: Spectral processing error - {}", msg)
            }
            PitchError::PatchFileError(msg) => {
                write!(f, "E007: Patch file error - {}", msg)
            }
            PitchError::MidiExportError(msg) => {
                write!(f, "E008: MIDI export error - {}", msg)
            }
            PitchError::MidiShortWrite(wrote, expected) => {
                write!(
                    f,
                    "E009: Short write during MIDI serialization ({} of {} bytes)",
                    wrote, expected
                )
            }
        }
    }
}

impl std::error::Error for PitchError {}

impl From<std::io::Error> for PitchError {
    fn from(err: std::io::Error) -> Self {
        PitchError::AudioFileError(format!("File I/O error: {}", err))
    }
}

impl From<hound::Error> for PitchError {
    fn from(err: hound::Error) -> Self {
        PitchError::AudioFileError(format!("WAV error: {}", err))
    }
}

impl From<serde_json::Error> for PitchError {
    fn from(err: serde_json::Error) -> Self {
        PitchError::ConfigValidationFailed(format!("JSON error: {}", err))
    }
}

impl From<anyhow::Error> for PitchError {
    fn from(err: anyhow::Error) -> Self {
        PitchError::SpectralProcessingError(format!("Generic error: {}", err))
    }
}

/// Result type alias for pitch-to-MIDI operations
pub type Result<T> = std::result::Result<T, PitchError>;
