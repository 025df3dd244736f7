//! Power-spectrum post-filters
//!
//! Local-average subtraction (suppresses drums and other non-tonal energy)
//! and octave-image subtraction. Both use the same rule: subtract in the
//! amplitude domain and square the result, clamping at zero:
//! `p[i] = max(0, sqrt(p[i]) - factor * sqrt(q[i]))^2`.

/// Scratch-buffer owner for the spectrum filters. Buffers are sized on
/// first use and grown (never shrunk) when a larger spectrum arrives.
#[derive(Debug, Default)]
pub struct SpectrumFilters {
    ave: Vec<f64>,
    oct: Vec<f64>,
}

impl SpectrumFilters {
    pub fn new() -> Self {
        Self::default()
    }

    fn grow(buf: &mut Vec<f64>, len: usize) {
        if buf.len() < len {
            buf.resize(len, 0.0);
        }
    }

    /// Subtracts `factor` times the local average over a centered window of
    /// `2m + 1` bins (clipped at the spectrum edges) from the power
    /// spectrum `p` of an `n`-point FFT. `m == 0` or `factor == 0.0` is a
    /// no-op and returns without touching the scratch buffer.
    pub fn subtract_average(&mut self, n: usize, p: &mut [f64], m: usize, factor: f64) {
        if m == 0 || factor == 0.0 {
            return;
        }
        let nlen = n / 2 + 1;
        debug_assert!(p.len() >= nlen);
        Self::grow(&mut self.ave, nlen);
        let ave = &mut self.ave;
        let im = m as isize;
        for i in 0..nlen {
            let mut sum = 0.0;
            let mut nave = 0u32;
            for k in -im..=im {
                let j = i as isize + k;
                if j < 0 || j >= nlen as isize {
                    continue;
                }
                sum += p[j as usize];
                nave += 1;
            }
            ave[i] = if nave > 1 { sum / nave as f64 } else { sum };
        }
        for i in 0..nlen {
            let d = p[i].sqrt() - factor * ave[i].sqrt();
            p[i] = if d > 0.0 { d * d } else { 0.0 };
        }
    }

    /// Builds a synthetic octave image (bin `i` copied to `2i`, with
    /// half-weighted spill into `2i - 1` and `2i + 1`) and subtracts it from
    /// the spectrum with the sqrt-subtract-square rule. A zero factor is a
    /// no-op.
    pub fn subtract_octave(&mut self, n: usize, p: &mut [f64], factor: f64) {
        if factor == 0.0 {
            return;
        }
        let nlen = (n + 1) / 2;
        let size = n / 2 + 1;
        debug_assert!(p.len() >= nlen);
        Self::grow(&mut self.oct, size);
        let oct = &mut self.oct;
        for o in oct.iter_mut().take(size) {
            *o = 0.0;
        }
        oct[0] = p[0];
        for i in 1..nlen / 2 + 1 {
            let i2 = i * 2;
            if i2 >= size {
                break;
            }
            oct[i2] = factor * p[i];
            if i2 >= 2 {
                oct[i2 - 1] = 0.5 * factor * p[i];
            }
            if i2 + 1 < nlen {
                oct[i2 + 1] = 0.5 * factor * p[i];
            }
        }
        for i in 0..nlen {
            let d = p[i].sqrt() - factor * oct[i].sqrt();
            p[i] = if d > 0.0 { d * d } else { 0.0 };
        }
    }
}
