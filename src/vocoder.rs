//! Phase-vocoder frequency correction
//!
//! Refines bin-center frequency estimates from the phase drift between
//! consecutive analysis frames.

use std::f64::consts::PI;

/// Per-bin phase history across frames.
///
/// The first frame has no prior phase, so its correction is zero and its
/// power passes through unchanged. From the second frame on the measured
/// phase advance minus the expected advance for the bin is wrapped into
/// `(-pi, pi]` and converted into a frequency correction in cycles/sample,
/// and the power is blended with the previous frame's.
pub struct PhaseVocoder {
    len: usize,
    prev_power: Vec<f64>,
    prev_phase: Vec<f64>,
    primed: bool,
}

impl PhaseVocoder {
    /// `len` is the FFT length; history buffers span `len/2 + 1` bins.
    pub fn new(len: usize) -> Self {
        let nlen = len / 2 + 1;
        PhaseVocoder {
            len,
            prev_power: vec![0.0; nlen],
            prev_phase: vec![0.0; nlen],
            primed: false,
        }
    }

    /// Consumes one frame of power and phase, producing the per-bin
    /// frequency correction in `dphi` (cycles/sample) and blending `power`
    /// in place. `hop` is the analysis stride in samples.
    pub fn process(&mut self, power: &mut [f64], phase: &[f64], hop: usize, dphi: &mut [f64]) {
        let nlen = self.len / 2 + 1;
        debug_assert!(power.len() >= nlen && phase.len() >= nlen && dphi.len() >= nlen);
        let twopi = 2.0 * PI;
        if !self.primed {
            for i in 0..nlen {
                dphi[i] = 0.0;
                self.prev_power[i] = power[i];
                self.prev_phase[i] = phase[i];
            }
            self.primed = true;
            return;
        }
        for i in 0..nlen {
            let expected = twopi * i as f64 / self.len as f64 * hop as f64;
            let mut d = phase[i] - self.prev_phase[i] - expected;
            // Repeated add/subtract rather than a single modulo; the
            // rounding of the two is not bit-identical.
            while d >= PI {
                d -= twopi;
            }
            while d < -PI {
                d += twopi;
            }
            dphi[i] = d / twopi / hop as f64;

            let blended = 0.5 * (power[i].sqrt() + self.prev_power[i].sqrt());
            self.prev_power[i] = power[i];
            self.prev_phase[i] = phase[i];
            power[i] = blended * blended;
        }
    }

    /// Turns the correction terms into absolute frequencies:
    /// `(k/len + dphi[k]) * samplerate`, written over `dphi`.
    pub fn corrected_frequencies(&self, dphi: &mut [f64], samplerate: f64) {
        let nlen = self.len / 2 + 1;
        for (i, d) in dphi.iter_mut().enumerate().take(nlen) {
            *d = (i as f64 / self.len as f64 + *d) * samplerate;
        }
    }

    /// Drops the frame history, as at the start of a new stream.
    pub fn reset(&mut self) {
        self.primed = false;
    }
}
