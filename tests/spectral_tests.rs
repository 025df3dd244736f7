//! Validation tests for the spectral front end: windows, half-complex
//! algebra, the FFT wrapper, the phase vocoder, and the power filters.

use pitch2midi::fft::SpectralTransform;
use pitch2midi::filters::SpectrumFilters;
use pitch2midi::hc;
use pitch2midi::vocoder::PhaseVocoder;
use pitch2midi::window::Window;
use std::f64::consts::PI;

/// Generate a unit-amplitude sine at `freq` Hz.
fn generate_sine(n_samples: usize, sr: f64, freq: f64) -> Vec<f64> {
    (0..n_samples)
        .map(|i| (2.0 * PI * freq * i as f64 / sr).sin())
        .collect()
}

/// Deterministic pseudo-random half-complex buffer for round-trip tests.
fn generate_hc_buffer(len: usize) -> Vec<f64> {
    let mut state = 0x2545f4914f6cdd1du64;
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            (state >> 11) as f64 / (1u64 << 53) as f64 - 0.5
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_parse_names_and_numbers() {
        assert_eq!(Window::parse("hanning").unwrap(), Window::Hanning);
        assert_eq!(Window::parse("HAMMING").unwrap(), Window::Hamming);
        assert_eq!(Window::parse("bla").unwrap(), Window::Blackman);
        assert_eq!(Window::parse("none").unwrap(), Window::Rectangular);
        assert_eq!(Window::parse("rect").unwrap(), Window::Rectangular);
        assert_eq!(Window::parse("0").unwrap(), Window::Rectangular);
        assert_eq!(Window::parse("3").unwrap(), Window::Hanning);
        assert_eq!(Window::parse("6").unwrap(), Window::Steeper);
        assert!(Window::parse("7").is_err());
        assert!(Window::parse("gaussian").is_err());
    }

    #[test]
    fn test_window_accepted_but_unsupported() {
        // The selector accepts these names, but using them must fail.
        let nut = Window::parse("nuttall").unwrap();
        let tri = Window::parse("triangular").unwrap();
        assert!(nut.init_den(64).is_err());
        assert!(tri.init_den(64).is_err());
        let mut buf = vec![0.0; 16];
        assert!(nut.apply(&[1.0; 16], 1.0, &mut buf).is_err());
    }

    #[test]
    fn test_rectangular_den_is_n_squared() {
        let n = 256;
        let den = Window::Rectangular.init_den(n).unwrap();
        assert!((den - (n * n) as f64).abs() < 1e-9);
    }

    #[test]
    fn test_hanning_endpoints_are_zero() {
        let n = 128;
        let data = vec![1.0; n];
        let mut out = vec![0.0; n];
        Window::Hanning.apply(&data, 1.0, &mut out).unwrap();
        assert!(out[0].abs() < 1e-12);
        assert!(out[n - 1].abs() < 1e-12);
        // Mid-window coefficient close to 1.
        assert!((out[n / 2] - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_window_scale_divides() {
        let n = 64;
        let data = vec![2.0; n];
        let mut out = vec![0.0; n];
        Window::Rectangular.apply(&data, 4.0, &mut out).unwrap();
        for &x in &out {
            assert!((x - 0.5).abs() < 1e-12);
        }
    }

    #[test]
    fn test_apply_in_place_matches_apply() {
        let n = 64;
        let data: Vec<f64> = (0..n).map(|i| (i as f64 * 0.1).sin()).collect();
        let mut out = vec![0.0; n];
        Window::Blackman.apply(&data, 2.0, &mut out).unwrap();
        let mut in_place = data.clone();
        Window::Blackman.apply_in_place(&mut in_place, 2.0).unwrap();
        for (a, b) in out.iter().zip(in_place.iter()) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn test_hc_polar_roundtrip() {
        for len in [16usize, 17] {
            for conjugate in [false, true] {
                let buf = generate_hc_buffer(len);
                let mut amp = vec![0.0; len / 2 + 1];
                let mut phs = vec![0.0; len / 2 + 1];
                hc::to_polar(&buf, conjugate, &mut amp, &mut phs);
                let mut back = vec![0.0; len];
                hc::from_polar(&amp, &phs, conjugate, &mut back);
                // DC and Nyquist lose their sign into the amplitude.
                assert!((back[0] - buf[0].abs()).abs() < 1e-12);
                for i in 1..(len + 1) / 2 {
                    assert!((back[i] - buf[i]).abs() < 1e-12);
                    assert!((back[len - i] - buf[len - i]).abs() < 1e-12);
                }
            }
        }
    }

    #[test]
    fn test_hc_mul_div_roundtrip() {
        let len = 32;
        let x = generate_hc_buffer(len);
        let y = generate_hc_buffer(len);
        let mut prod = vec![0.0; len];
        hc::mul(&x, &y, &mut prod);
        let mut back = vec![0.0; len];
        hc::div(&prod, &y, &mut back);
        for i in 0..len {
            assert!((back[i] - x[i]).abs() < 1e-9, "bin {} diverged", i);
        }
    }

    #[test]
    fn test_hc_div_by_zero_bins() {
        let len = 16;
        let x = generate_hc_buffer(len);
        let y = vec![0.0; len];
        let mut z = vec![1.0; len];
        hc::div(&x, &y, &mut z);
        for (i, &v) in z.iter().enumerate() {
            assert_eq!(v, 0.0, "bin {} not zeroed", i);
            assert!(!v.is_nan());
        }
    }

    #[test]
    fn test_hc_abs_magnitudes() {
        let len = 8;
        // bin 1 = 3 + 4i
        let mut x = vec![0.0; len];
        x[0] = -2.0;
        x[1] = 3.0;
        x[len - 1] = 4.0;
        x[len / 2] = -5.0;
        let mut z = vec![0.0; len];
        hc::abs(&x, &mut z);
        assert_eq!(z[0], 2.0);
        assert!((z[1] - 5.0).abs() < 1e-12);
        assert_eq!(z[len - 1], 0.0);
        assert_eq!(z[len / 2], 5.0);
    }

    #[test]
    fn test_puckette_lock_smooths_neighbors() {
        let len = 16;
        let mut y = vec![0.0; len];
        y[4] = 1.0; // single real bin
        let mut z = vec![0.0; len];
        hc::puckette_lock(&y, &mut z);
        assert_eq!(z[3], 1.0);
        assert_eq!(z[4], 1.0);
        assert_eq!(z[5], 1.0);
        assert_eq!(z[2], 0.0);
        assert_eq!(z[6], 0.0);
    }

    #[test]
    fn test_fft_sine_peak_bin() {
        let n = 2048;
        let sr = 44100.0;
        let bin = 100;
        let freq = bin as f64 * sr / n as f64;
        let signal = generate_sine(n, sr, freq);

        let mut transform = SpectralTransform::new(n, Window::Rectangular).unwrap();
        let mut spectrum = vec![0.0; n];
        let mut power = vec![0.0; n / 2 + 1];
        transform
            .power_spectrum(&signal, &mut spectrum, &mut power)
            .unwrap();

        let peak = power
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(peak, bin);
        // Unit sine, rectangular window: peak power (A * n/2)^2 / n^2 = 1/4.
        assert!((power[bin] - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_vocoder_first_frame_passthrough() {
        let len = 64;
        let nlen = len / 2 + 1;
        let mut vocoder = PhaseVocoder::new(len);
        let mut power: Vec<f64> = (0..nlen).map(|i| i as f64).collect();
        let phase = vec![0.3; nlen];
        let mut dphi = vec![9.9; nlen];
        vocoder.process(&mut power, &phase, len / 4, &mut dphi);
        for i in 0..nlen {
            assert_eq!(power[i], i as f64);
            assert_eq!(dphi[i], 0.0);
        }
    }

    #[test]
    fn test_vocoder_bin_centered_sine_has_zero_correction() {
        let n = 256;
        let hop = n / 4;
        let sr = n as f64; // one bin = 1 Hz
        let bin = 8;
        let signal = generate_sine(n + hop, sr, bin as f64);

        let mut transform = SpectralTransform::new(n, Window::Hanning).unwrap();
        let mut vocoder = PhaseVocoder::new(n);
        let mut spectrum = vec![0.0; n];
        let mut power = vec![0.0; n / 2 + 1];
        let mut phase = vec![0.0; n / 2 + 1];
        let mut dphi = vec![0.0; n / 2 + 1];

        for start in [0, hop] {
            transform
                .polar_power_spectrum(&signal[start..start + n], &mut spectrum, &mut power, &mut phase)
                .unwrap();
            vocoder.process(&mut power, &phase, hop, &mut dphi);
        }
        // A bin-centered tone advances exactly the expected phase per hop.
        assert!(dphi[bin].abs() < 1e-6);
        vocoder.corrected_frequencies(&mut dphi, sr);
        assert!((dphi[bin] - bin as f64).abs() < 1e-4);
    }

    #[test]
    fn test_vocoder_blends_power_from_second_frame() {
        let len = 16;
        let nlen = len / 2 + 1;
        let mut vocoder = PhaseVocoder::new(len);
        let phase = vec![0.0; nlen];
        let mut dphi = vec![0.0; nlen];

        let mut power = vec![4.0; nlen];
        vocoder.process(&mut power, &phase, len / 4, &mut dphi);
        let mut power = vec![16.0; nlen];
        vocoder.process(&mut power, &phase, len / 4, &mut dphi);
        // ((sqrt(16) + sqrt(4)) / 2)^2 = 9
        for &p in &power[..nlen] {
            assert!((p - 9.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_subtract_average_noop_cases() {
        let n = 32;
        let mut filters = SpectrumFilters::new();
        let orig: Vec<f64> = (0..n / 2 + 1).map(|i| (i + 1) as f64).collect();
        let mut p = orig.clone();
        filters.subtract_average(n, &mut p, 0, 1.0);
        assert_eq!(p, orig);
        filters.subtract_average(n, &mut p, 5, 0.0);
        assert_eq!(p, orig);
    }

    #[test]
    fn test_subtract_average_flattens_constant_spectrum() {
        let n = 64;
        let mut filters = SpectrumFilters::new();
        // Constant spectrum: the local average equals every bin, so a
        // factor-1 subtraction zeroes the whole spectrum.
        let mut p = vec![2.0; n / 2 + 1];
        filters.subtract_average(n, &mut p, 3, 1.0);
        for &v in &p {
            assert!(v.abs() < 1e-12);
        }
    }

    #[test]
    fn test_subtract_average_keeps_isolated_peak() {
        let n = 64;
        let mut filters = SpectrumFilters::new();
        let mut p = vec![0.0; n / 2 + 1];
        p[10] = 100.0;
        filters.subtract_average(n, &mut p, 3, 1.0);
        assert!(p[10] > 0.0);
        let total: f64 = p.iter().sum();
        assert!((total - p[10]).abs() < 1e-12);
    }

    #[test]
    fn test_subtract_octave_noop_and_image_removal() {
        let n = 64;
        let mut filters = SpectrumFilters::new();
        let orig: Vec<f64> = (0..n / 2 + 1).map(|i| (i % 7) as f64).collect();
        let mut p = orig.clone();
        filters.subtract_octave(n, &mut p, 0.0);
        assert_eq!(p, orig);

        // A fundamental at bin 5 with an equal image at bin 10: the image
        // is attenuated, the fundamental untouched.
        let mut p = vec![0.0; n / 2 + 1];
        p[5] = 1.0;
        p[10] = 1.0;
        filters.subtract_octave(n, &mut p, 1.0);
        assert!((p[5] - 1.0).abs() < 1e-12);
        assert!(p[10] < 1e-12);
    }
}
