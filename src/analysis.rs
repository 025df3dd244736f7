//! Note-intensity extraction from power spectra
//!
//! Iterative peak picking over a frequency range, mapping each peak to a
//! MIDI note and a velocity, then removing the peak's energy so the next
//! iteration finds the next strongest component.

use crate::audio::{mix_channels, SampleSource};
use crate::error::{PitchError, Result};
use crate::fft::SpectralTransform;
use crate::pitch::{freq_to_midi, PitchTable, MIDI_NOTE_COUNT};
use crate::window::Window;
use log::{info, warn};
use std::path::Path;

/// Spectral envelope sampled from a reference single-tone recording.
///
/// Used during peak removal to subtract a realistic envelope around a
/// detected peak instead of the heuristic left/right valley descent.
#[derive(Debug, Clone)]
pub struct PatchEnvelope {
    power: Vec<f64>,
    size: usize,
    max_power: f64,
    max_freq_index: f64,
}

impl PatchEnvelope {
    /// Builds the envelope from a patch WAV file: reads `plen` frames,
    /// mixes to mono, and takes the windowed power spectrum.
    pub fn from_wav<P: AsRef<Path>>(path: P, plen: usize, window: Window) -> Result<Self> {
        let mut source = SampleSource::open(&path)
            .map_err(|e| PitchError::PatchFileError(e.to_string()))?;
        let mut left = vec![0.0; plen];
        let mut right = vec![0.0; plen];
        if source.read(&mut left, &mut right, plen)? != plen {
            return Err(PitchError::PatchFileError(format!(
                "not enough patch data in {} (need {} frames)",
                path.as_ref().display(),
                plen
            )));
        }
        let mut x = vec![0.0; plen];
        mix_channels(source.channels(), &left, &right, &mut x);

        let mut transform = SpectralTransform::new(plen, window)?;
        let mut spectrum = vec![0.0; plen];
        let mut power = vec![0.0; plen / 2 + 1];
        transform.power_spectrum(&x, &mut spectrum, &mut power)?;

        let size = plen / 2;
        let mut max_power = 0.0;
        let mut max_freq_index = -1.0;
        for (i, &p) in power.iter().enumerate().take(size) {
            if p > max_power {
                max_power = p;
                max_freq_index = i as f64;
            }
        }
        if max_freq_index < 0.0 {
            return Err(PitchError::PatchFileError(
                "patch spectrum has no power".to_string(),
            ));
        }
        info!(
            "patch envelope: {} bins, peak power {:.3e} at bin {}",
            size, max_power, max_freq_index
        );
        Ok(PatchEnvelope {
            power,
            size,
            max_power,
            max_freq_index,
        })
    }

    /// Power of the patch relative to its maximum, linearly interpolated at
    /// the frequency whose ratio to the peak frequency is `freq_ratio`.
    /// Ratios landing outside the sampled envelope contribute zero.
    pub fn power_at(&self, freq_ratio: f64) -> f64 {
        let f = self.max_freq_index * freq_ratio;
        let i0 = f as usize;
        let i1 = i0 + 1;
        if i0 < 1 || i1 > self.size {
            return 0.0;
        }
        let dpdf = self.power[i1] - self.power[i0];
        (self.power[i0] + dpdf * (f - i0 as f64)) / self.max_power
    }
}

/// Analysis scratchpad: cutoff mode plus the optional patch envelope.
#[derive(Debug, Default)]
pub struct Scratchpad {
    /// Absolute cutoff (`10^cut_ratio`) when true; relative to the average
    /// power (`avg * 10^rel_cut_ratio`) when false.
    pub absolute_cutoff: bool,
    pub patch: Option<PatchEnvelope>,
}

impl Scratchpad {
    pub fn new(absolute_cutoff: bool) -> Self {
        Scratchpad {
            absolute_cutoff,
            patch: None,
        }
    }
}

/// Extracts one velocity per MIDI note from the power spectrum `p`.
///
/// `fp` optionally holds a corrected frequency per bin; without it the bin
/// center frequency `i / t0` is used. `[i0, i1)` is the frequency-index
/// search range and `t0` the FFT period in seconds. Peaks are consumed
/// until none exceeds the threshold; each is removed either by valley
/// descent or by subtracting the scaled patch envelope.
#[allow(clippy::too_many_arguments)]
pub fn note_intensity(
    p: &mut [f64],
    fp: Option<&[f64]>,
    cut_ratio: f64,
    rel_cut_ratio: f64,
    i0: usize,
    i1: usize,
    t0: f64,
    intens: &mut [u8; MIDI_NOTE_COUNT],
    pitch: &mut PitchTable,
    scratch: &Scratchpad,
) {
    debug_assert!(i0 >= 1 && i0 < i1 && i1 <= p.len());
    intens.fill(0);

    // Relative mode measures the threshold against the average power over
    // the search range.
    let mut av = 1.0;
    if !scratch.absolute_cutoff {
        av = p[i0..i1].iter().sum::<f64>() / (i1 - i0) as f64;
    }

    loop {
        let mut max = if scratch.absolute_cutoff {
            10.0_f64.powf(cut_ratio)
        } else {
            av * 10.0_f64.powf(rel_cut_ratio)
        };
        let mut imax = None;
        for i in i0..i1 {
            if p[i] > max {
                max = p[i];
                imax = Some(i);
            }
        }
        let imax = match imax {
            Some(i) => i,
            None => break, // no peak above threshold left
        };

        let freq = match fp {
            Some(fp) => fp[imax],
            None => imax as f64 / t0,
        };
        if let Some(note) = pitch.get_note(freq) {
            // The note must land inside the search range and not have been
            // assigned yet this frame.
            if note >= i0 as i32 && note <= i1 as i32 {
                let note = note as usize;
                if intens[note] == 0 {
                    // Scale the peak power from 10^cut_ratio up to 10^0
                    // onto the velocity range.
                    let x = 127.0 / (-cut_ratio) * (p[imax].log10() - cut_ratio);
                    if x >= 128.0 {
                        intens[note] = 127;
                    } else if x > 0.0 {
                        intens[note] = x as u8;
                    }
                }
            }
        } else {
            warn!("non-positive frequency estimate {:.3} at bin {}", freq, imax);
        }

        if let Some(patch) = &scratch.patch {
            // Subtract a scaled copy of the patch envelope centered on the
            // peak across the whole range.
            for i in i0..i1 {
                let f = match fp {
                    Some(fp) => fp[i],
                    None => i as f64 / t0,
                };
                p[i] -= max * patch.power_at(f / freq);
                if p[i] < 0.0 {
                    p[i] = 0.0;
                }
            }
        } else {
            // Valley removal: zero the peak and descend both slopes while
            // power decreases monotonically.
            p[imax] = 0.0;
            let mut i = imax + 1;
            while i < i1 - 1 && p[i] != 0.0 && p[i] >= p[i + 1] {
                p[i] = 0.0;
                i += 1;
            }
            if i == i1 - 1 {
                p[i] = 0.0;
            }
            let mut i = imax - 1;
            while i > i0 && p[i] != 0.0 && p[i - 1] <= p[i] {
                p[i] = 0.0;
                i -= 1;
            }
            if i == i0 {
                p[i] = 0.0;
            }
        }
    }
}

/// Folds a power spectrum into per-MIDI-note averages.
///
/// Each bin's (optionally phase-corrected) frequency selects a note; the
/// bin amplitudes assigned to one note are averaged and squared back into
/// power. Bins whose estimate falls outside the MIDI range are dropped.
pub fn average_power_per_note(
    len: usize,
    samplerate: f64,
    amp2: &[f64],
    dphi: Option<&[f64]>,
    ave2: &mut [f64; MIDI_NOTE_COUNT],
) {
    let mut counts = [0u32; MIDI_NOTE_COUNT];
    ave2.fill(0.0);
    for k in 1..(len + 1) / 2 {
        let f = match dphi {
            Some(dphi) => (k as f64 / len as f64 + dphi[k]) * samplerate,
            None => k as f64 / len as f64 * samplerate,
        };
        if f <= 0.0 {
            continue;
        }
        let midi = freq_to_midi(f);
        if (0..MIDI_NOTE_COUNT as i32).contains(&midi) {
            ave2[midi as usize] += amp2[k].sqrt();
            counts[midi as usize] += 1;
        }
    }
    for midi in 0..MIDI_NOTE_COUNT {
        if counts[midi] > 0 {
            let a = ave2[midi] / counts[midi] as f64;
            ave2[midi] = a * a;
        }
    }
}

/// Picks notes straight from a per-MIDI-note power table.
///
/// Like [`note_intensity`] but operating on the 128-entry table produced by
/// [`average_power_per_note`]; `[i0, i1)` is a MIDI note range here.
/// `oct_factor` reduces octave harmonics of each picked note; it defaults
/// to 0.0 (disabled) everywhere in the pipeline.
pub fn pickup_notes(
    amp2midi: &mut [f64; MIDI_NOTE_COUNT],
    cut_ratio: f64,
    rel_cut_ratio: f64,
    i0: usize,
    i1: usize,
    absolute_cutoff: bool,
    oct_factor: f64,
    intens: &mut [u8; MIDI_NOTE_COUNT],
) {
    intens.fill(0);
    let mut av = 1.0;
    if !absolute_cutoff {
        av = amp2midi[i0..i1].iter().sum::<f64>() / (i1 - i0) as f64;
    }
    loop {
        let mut max = if absolute_cutoff {
            10.0_f64.powf(cut_ratio)
        } else {
            av * 10.0_f64.powf(rel_cut_ratio)
        };
        let mut imax = None;
        for i in i0..i1 {
            if amp2midi[i] > max {
                max = amp2midi[i];
                imax = Some(i);
            }
        }
        let imax = match imax {
            Some(i) => i,
            None => break,
        };
        if intens[imax] == 0 {
            let x = 127.0 / (-cut_ratio) * (amp2midi[imax].log10() - cut_ratio);
            if x >= 128.0 {
                intens[imax] = 127;
            } else if x > 0.0 {
                intens[imax] = x as u8;
            }
            if oct_factor > 0.0 {
                // Walk the upper octaves of the picked note once each.
                let mut i = imax + 12;
                while i < MIDI_NOTE_COUNT {
                    let d = amp2midi[i].sqrt() - oct_factor * amp2midi[i - 12].sqrt();
                    amp2midi[i] = if d > 0.0 { d * d } else { 0.0 };
                    i += 12;
                }
            }
        }
        amp2midi[imax] = 0.0;
    }
}
