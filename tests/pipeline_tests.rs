//! End-to-end pipeline tests on synthetic WAV input.

use pitch2midi::notes::EventKind;
use pitch2midi::{Config, PitchToMidi};
use std::f64::consts::PI;
use std::path::PathBuf;

/// Write a WAV of unit-scaled sine tones (plus a little noise) and return
/// its path. `channels` is 1 or 2; stereo carries the same signal on both.
fn write_sine_wav(name: &str, freq: f64, seconds: f64, channels: u16) -> PathBuf {
    let sr = 44100u32;
    let spec = hound::WavSpec {
        channels,
        sample_rate: sr,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let path = std::env::temp_dir().join(name);
    let mut writer = hound::WavWriter::create(&path, spec).unwrap();
    let n = (seconds * sr as f64) as usize;
    for i in 0..n {
        let t = i as f64 / sr as f64;
        let noise = (rand::random::<f64>() - 0.5) * 0.002;
        let s = 0.8 * (2.0 * PI * freq * t).sin() + noise;
        let sample = (s * 32767.0) as i16;
        for _ in 0..channels {
            writer.write_sample(sample).unwrap();
        }
    }
    writer.finalize().unwrap();
    path
}

fn test_config() -> Config {
    let mut config = Config::default();
    // A tighter cutoff keeps window-leakage sidelobes out of the picture
    // for the single-tone inputs used here.
    config.notes.cut_ratio = -3.0;
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sine_440_transcribes_to_a4() {
        let input = write_sine_wav("pitch2midi_e2e_a4.wav", 440.0, 1.0, 1);
        let processor = PitchToMidi::new(test_config());
        let (notes, division, summary) = processor.transcribe(&input, None).unwrap();
        std::fs::remove_file(&input).ok();

        assert!(summary.events >= 2);
        assert_eq!(summary.events % 2, 0);
        assert_eq!(summary.minimum, 69);
        assert_eq!(summary.maximum, 69);
        // 0.5 * 44100 / 512
        assert_eq!(division, 43);

        for ev in notes.events() {
            assert_eq!(ev.note, 69);
        }
        assert_eq!(notes.events()[0].kind, EventKind::On);
        assert!(notes.events()[0].vel > 8);
        assert_eq!(notes.events().last().unwrap().kind, EventKind::Off);
        assert!(notes.bins()[69] > 0);
    }

    #[test]
    fn test_sine_440_without_phase_correction() {
        let input = write_sine_wav("pitch2midi_e2e_nophase.wav", 440.0, 1.0, 1);
        let mut config = test_config();
        config.filters.use_phase = false;
        let processor = PitchToMidi::new(config);
        let (_, _, summary) = processor.transcribe(&input, None).unwrap();
        std::fs::remove_file(&input).ok();

        // Bin-center frequencies still land on A4.
        assert_eq!(summary.minimum, 69);
        assert_eq!(summary.maximum, 69);
    }

    #[test]
    fn test_stereo_input_is_downmixed() {
        let input = write_sine_wav("pitch2midi_e2e_stereo.wav", 440.0, 0.5, 2);
        let processor = PitchToMidi::new(test_config());
        let (notes, _, _) = processor.transcribe(&input, None).unwrap();
        std::fs::remove_file(&input).ok();

        assert!(!notes.is_empty());
        for ev in notes.events() {
            assert_eq!(ev.note, 69);
        }
    }

    #[test]
    fn test_octave_apart_tones() {
        // 220 Hz is A3 (MIDI 57), 880 Hz is A5 (MIDI 81).
        let sr = 44100u32;
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: sr,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let path = std::env::temp_dir().join("pitch2midi_e2e_two_tone.wav");
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for i in 0..sr {
            let t = i as f64 / sr as f64;
            let s = 0.45 * (2.0 * PI * 220.0 * t).sin() + 0.45 * (2.0 * PI * 880.0 * t).sin();
            writer.write_sample((s * 32767.0) as i16).unwrap();
        }
        writer.finalize().unwrap();

        let mut config = test_config();
        config.cleanup.remove_octaves = false;
        let processor = PitchToMidi::new(config);
        let (notes, _, summary) = processor.transcribe(&path, None).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(summary.minimum, 57);
        assert_eq!(summary.maximum, 81);
        assert!(notes.bins()[57] > 0);
        assert!(notes.bins()[81] > 0);
    }

    #[test]
    fn test_process_writes_midi_file() {
        let input = write_sine_wav("pitch2midi_e2e_out.wav", 440.0, 0.5, 1);
        let output = std::env::temp_dir().join("pitch2midi_e2e_out.mid");
        let processor = PitchToMidi::new(test_config());
        let summary = processor.process(&input, &output, None).unwrap();
        let bytes = std::fs::read(&output).unwrap();
        std::fs::remove_file(&input).ok();
        std::fs::remove_file(&output).ok();

        assert!(summary.events >= 2);
        assert_eq!(&bytes[0..4], b"MThd");
        // Division 43 in the header.
        assert_eq!(&bytes[12..14], &[0x00, 43]);
    }

    #[test]
    fn test_rejects_too_many_channels() {
        let spec = hound::WavSpec {
            channels: 4,
            sample_rate: 44100,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let path = std::env::temp_dir().join("pitch2midi_e2e_quad.wav");
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for _ in 0..4096 {
            for _ in 0..4 {
                writer.write_sample(0i16).unwrap();
            }
        }
        writer.finalize().unwrap();

        let processor = PitchToMidi::new(test_config());
        let err = processor.transcribe(&path, None).unwrap_err();
        std::fs::remove_file(&path).ok();
        assert!(err.to_string().starts_with("E001"));
    }

    #[test]
    fn test_note_range_above_spectrum_is_an_error() {
        // At 8000 Hz, the bottom note's frequency is past Nyquist; the
        // search range is empty and must be rejected, not searched.
        let sr = 8000u32;
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: sr,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let path = std::env::temp_dir().join("pitch2midi_e2e_low_rate.wav");
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for i in 0..sr {
            let t = i as f64 / sr as f64;
            let s = 0.8 * (2.0 * PI * 400.0 * t).sin();
            writer.write_sample((s * 32767.0) as i16).unwrap();
        }
        writer.finalize().unwrap();

        for absolute in [true, false] {
            let mut config = test_config();
            config.notes.bottom = 120;
            config.notes.top = 127;
            config.notes.absolute_cutoff = absolute;
            let processor = PitchToMidi::new(config);
            let err = processor.transcribe(&path, None).unwrap_err();
            assert!(err.to_string().starts_with("E003"));
        }
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_too_short_input_is_an_error() {
        let input = write_sine_wav("pitch2midi_e2e_short.wav", 440.0, 0.01, 1);
        let processor = PitchToMidi::new(test_config());
        let err = processor.transcribe(&input, None).unwrap_err();
        std::fs::remove_file(&input).ok();
        assert!(err.to_string().starts_with("E002"));
    }
}
