//! Audio input via WAV files
//!
//! Thin wrapper around `hound` satisfying the sample-source contract of the
//! analysis core: on-demand reads of up to `n` frames into caller buffers,
//! returning fewer frames at end of stream without error.

use crate::error::{PitchError, Result};
use hound::{SampleFormat, WavReader};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Streaming WAV sample source, mono or stereo.
pub struct SampleSource {
    reader: WavReader<BufReader<File>>,
    channels: u16,
    samplerate: u32,
    norm: f64,
    float: bool,
}

impl SampleSource {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = WavReader::open(path.as_ref()).map_err(|e| {
            PitchError::AudioFileError(format!(
                "cannot open {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        let spec = reader.spec();
        if spec.channels != 1 && spec.channels != 2 {
            return Err(PitchError::InvalidAudioFormat(format!(
                "only mono and stereo inputs are supported, got {} channels",
                spec.channels
            )));
        }
        let float = spec.sample_format == SampleFormat::Float;
        let norm = if float {
            1.0
        } else {
            (1i64 << (spec.bits_per_sample - 1)) as f64
        };
        Ok(SampleSource {
            reader,
            channels: spec.channels,
            samplerate: spec.sample_rate,
            norm,
            float,
        })
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn samplerate(&self) -> u32 {
        self.samplerate
    }

    /// Total frame count declared by the WAV header.
    pub fn frames(&self) -> u32 {
        self.reader.duration()
    }

    /// Reads up to `len` frames into `left` and (for stereo input) `right`,
    /// normalized to [-1, 1]. Returns the number of whole frames read; a
    /// short count signals end of stream and is not an error.
    pub fn read(&mut self, left: &mut [f64], right: &mut [f64], len: usize) -> Result<usize> {
        debug_assert!(left.len() >= len && right.len() >= len);
        let mut frames = 0usize;
        if self.float {
            let mut samples = self.reader.samples::<f32>();
            'outer_f: while frames < len {
                for ch in 0..self.channels {
                    let s = match samples.next() {
                        Some(s) => s? as f64,
                        None => break 'outer_f,
                    };
                    if ch == 0 {
                        left[frames] = s;
                    } else {
                        right[frames] = s;
                    }
                }
                frames += 1;
            }
        } else {
            let mut samples = self.reader.samples::<i32>();
            'outer_i: while frames < len {
                for ch in 0..self.channels {
                    let s = match samples.next() {
                        Some(s) => s? as f64 / self.norm,
                        None => break 'outer_i,
                    };
                    if ch == 0 {
                        left[frames] = s;
                    } else {
                        right[frames] = s;
                    }
                }
                frames += 1;
            }
        }
        Ok(frames)
    }
}

/// Mixes the channel buffers down to one analysis signal: `0.5 * (l + r)`
/// for stereo, a plain copy for mono.
pub fn mix_channels(channels: u16, left: &[f64], right: &[f64], out: &mut [f64]) {
    if channels == 2 {
        for i in 0..out.len() {
            out[i] = 0.5 * (left[i] + right[i]);
        }
    } else {
        out.copy_from_slice(&left[..out.len()]);
    }
}

/// Checks that a file exists and parses as a mono or stereo WAV.
pub fn validate_audio_file<P: AsRef<Path>>(path: P) -> Result<()> {
    SampleSource::open(path).map(|_| ())
}
