//! Wave-to-Notes Transcription System
//!
//! A deterministic signal-processing pipeline that transcribes a mono or
//! stereo waveform into note on/off events and writes them as a Standard
//! MIDI File: sliding-window FFT analysis, phase-vocoder frequency
//! correction, spectral peak picking, and a note-event regulator.

pub mod analysis;
pub mod audio;
pub mod config;
pub mod error;
pub mod fft;
pub mod filters;
pub mod hc;
pub mod notes;
pub mod pitch;
pub mod smf;
pub mod vocoder;
pub mod window;

pub use config::Config;
pub use error::{PitchError, Result};
pub use notes::{EventKind, NoteEvent, NoteList};
pub use window::Window;

use analysis::{note_intensity, PatchEnvelope, Scratchpad};
use audio::{mix_channels, SampleSource};
use fft::SpectralTransform;
use filters::SpectrumFilters;
use log::{debug, info};
use pitch::{PitchTable, MIDI_NOTE_COUNT};
use std::path::Path;
use vocoder::PhaseVocoder;

/// Summary statistics of one transcription run.
#[derive(Debug, Clone)]
pub struct Summary {
    pub events: usize,
    pub minimum: i32,
    pub maximum: i32,
    pub division: u16,
    pub suggested_pitch_adjustment: Option<f64>,
}

/// Main processing pipeline for wave-to-MIDI conversion
pub struct PitchToMidi {
    config: Config,
}

impl PitchToMidi {
    /// Create a new processor with the given configuration
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Transcribes an audio file and writes the MIDI output.
    pub fn process(
        &self,
        input: &Path,
        output: &Path,
        patch: Option<&Path>,
    ) -> Result<Summary> {
        let (notes, division, summary) = self.transcribe(input, patch)?;
        smf::output_midi(&notes, division, output)?;
        Ok(summary)
    }

    /// Runs the analysis pipeline over `input`, returning the regulated
    /// note list, the SMF division value, and run statistics.
    pub fn transcribe(
        &self,
        input: &Path,
        patch: Option<&Path>,
    ) -> Result<(NoteList, u16, Summary)> {
        config::validate_config(&self.config)?;

        let len = self.config.fft.length;
        let hop = self.config.fft.effective_hop();
        let nlen = len / 2 + 1;

        let mut source = SampleSource::open(input)?;
        let samplerate = source.samplerate() as f64;
        info!(
            "input: {} Hz, {} channel(s), {} frames",
            source.samplerate(),
            source.channels(),
            source.frames()
        );

        // t0 is the FFT period (inverse of the smallest frequency); i0..i1
        // is the frequency-bin search range for the configured note span.
        let t0 = len as f64 / samplerate;
        let mut pitch_table = PitchTable::new(self.config.notes.adj_pitch);
        let mut i0 = (pitch_table.freq(self.config.notes.bottom as usize) * t0 - 0.5) as i64;
        let mut i1 = (pitch_table.freq(self.config.notes.top as usize) * t0 - 0.5) as i64 + 1;
        if i0 <= 0 {
            i0 = 1;
        }
        if i1 >= (len / 2) as i64 {
            i1 = (len / 2) as i64 - 1;
        }
        // A bottom note above the spectrum leaves no bins to search.
        if i0 >= i1 {
            return Err(PitchError::ConfigValidationFailed(format!(
                "note range [{}, {}] lies outside the spectrum at {} Hz",
                self.config.notes.bottom,
                self.config.notes.top,
                source.samplerate()
            )));
        }
        let (i0, i1) = (i0 as usize, i1 as usize);

        let mut scratch = Scratchpad::new(self.config.notes.absolute_cutoff);
        if let Some(patch_path) = patch {
            scratch.patch = Some(PatchEnvelope::from_wav(
                patch_path,
                len,
                self.config.fft.window,
            )?);
        }

        let mut transform = SpectralTransform::new(len, self.config.fft.window)?;
        info!("window: {}", self.config.fft.window.name());
        let mut vocoder = PhaseVocoder::new(len);
        let mut filters = SpectrumFilters::new();

        let mut left = vec![0.0; len];
        let mut right = vec![0.0; len];
        let mut x = vec![0.0; len];
        let mut spectrum = vec![0.0; len];
        let mut power = vec![0.0; nlen];
        let mut phase = vec![0.0; nlen];
        let mut dphi = vec![0.0; nlen];
        let mut vel = [0u8; MIDI_NOTE_COUNT];
        let mut on_event: [Option<usize>; MIDI_NOTE_COUNT] = [None; MIDI_NOTE_COUNT];
        let mut notes = NoteList::new();

        // Pre-fill the tail of the window so the first analyzed frame spans
        // the first `len` input samples once the initial shift happens.
        if hop != len {
            let fill = len - hop;
            if source.read(&mut left[hop..], &mut right[hop..], fill)? != fill {
                return Err(PitchError::AudioFileError(
                    "no audio data to analyze".to_string(),
                ));
            }
        }

        let mut step = 0i32;
        loop {
            // Slide the window: drop `hop` old samples, read `hop` new ones.
            left.copy_within(hop.., 0);
            right.copy_within(hop.., 0);
            let tail = len - hop;
            if source.read(&mut left[tail..], &mut right[tail..], hop)? != hop {
                break; // end of stream mid-hop ends the loop without error
            }
            mix_channels(source.channels(), &left, &right, &mut x);

            // Stage 1: power spectrum, optionally phase-corrected.
            if self.config.filters.use_phase {
                transform.polar_power_spectrum(&x, &mut spectrum, &mut power, &mut phase)?;
                vocoder.process(&mut power, &phase, hop, &mut dphi);
            } else {
                transform.power_spectrum(&x, &mut spectrum, &mut power)?;
            }
            filters.subtract_average(
                len,
                &mut power,
                self.config.filters.psub_n,
                self.config.filters.psub_f,
            );
            filters.subtract_octave(len, &mut power, self.config.filters.oct_f);

            // Stage 2: per-note intensities for this frame.
            if self.config.filters.use_phase {
                vocoder.corrected_frequencies(&mut dphi, samplerate);
                note_intensity(
                    &mut power,
                    Some(&dphi),
                    self.config.notes.cut_ratio,
                    self.config.notes.rel_cut_ratio,
                    i0,
                    i1,
                    t0,
                    &mut vel,
                    &mut pitch_table,
                    &scratch,
                );
            } else {
                note_intensity(
                    &mut power,
                    None,
                    self.config.notes.cut_ratio,
                    self.config.notes.rel_cut_ratio,
                    i0,
                    i1,
                    t0,
                    &mut vel,
                    &mut pitch_table,
                    &scratch,
                );
            }

            // Stage 3: velocity transitions into on/off events.
            notes.check(
                step,
                &vel,
                &mut on_event,
                self.config.notes.on_threshold,
                self.config.notes.off_threshold,
                self.config.notes.peak_threshold,
            );
            debug!("step {}: {} events so far", step, notes.len());
            step += 1;
        }

        // Post-loop cleanup passes, in order.
        notes.regulate();
        for pass in &self.config.cleanup.short_note_passes {
            notes.remove_short_notes(pass.max_duration, pass.max_velocity);
        }
        if self.config.cleanup.remove_octaves {
            notes.remove_octaves();
        }

        // Ticks per quarter note, assuming 120 BPM (one beat = 0.5 s).
        let division = (0.5 * samplerate / hop as f64) as u16;
        let summary = Summary {
            events: notes.len(),
            minimum: notes.minimum(),
            maximum: notes.maximum(),
            division,
            suggested_pitch_adjustment: pitch_table.suggested_adjustment(),
        };
        info!(
            "events: {}, note range [{}, {}], division {}",
            summary.events, summary.minimum, summary.maximum, summary.division
        );
        Ok((notes, division, summary))
    }
}

/// Validate configuration and input files before processing.
pub fn validate_input<P: AsRef<Path>>(input_path: P, config: &Config) -> Result<()> {
    audio::validate_audio_file(input_path)?;
    config::validate_config(config)?;
    Ok(())
}
