//! Forward real-FFT wrapper producing half-complex spectra

use crate::error::Result;
use crate::hc;
use crate::window::Window;
use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

/// Reusable forward transform for one FFT length and window type.
///
/// Owns the execution plan and all scratch buffers, so per-frame analysis
/// allocates nothing. Output is the packed half-complex layout described
/// in [`crate::hc`].
pub struct SpectralTransform {
    len: usize,
    window: Window,
    den: f64,
    fft: Arc<dyn Fft<f64>>,
    buf: Vec<Complex<f64>>,
    scratch: Vec<Complex<f64>>,
    windowed: Vec<f64>,
}

impl SpectralTransform {
    pub fn new(len: usize, window: Window) -> Result<Self> {
        let den = window.init_den(len)?;
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(len);
        let scratch_len = fft.get_inplace_scratch_len();
        Ok(SpectralTransform {
            len,
            window,
            den,
            fft,
            buf: vec![Complex::new(0.0, 0.0); len],
            scratch: vec![Complex::new(0.0, 0.0); scratch_len],
            windowed: vec![0.0; len],
        })
    }

    /// FFT length in samples.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Window density factor (`n * sum(w^2)`) for power normalization.
    pub fn den(&self) -> f64 {
        self.den
    }

    pub fn window(&self) -> Window {
        self.window
    }

    /// Windows `data` and runs the forward FFT, packing the result into the
    /// half-complex buffer `spectrum` (length `len`).
    pub fn execute(&mut self, data: &[f64], spectrum: &mut [f64]) -> Result<()> {
        debug_assert_eq!(data.len(), self.len);
        debug_assert_eq!(spectrum.len(), self.len);
        self.window.apply(data, 1.0, &mut self.windowed)?;
        for (c, &x) in self.buf.iter_mut().zip(self.windowed.iter()) {
            *c = Complex::new(x, 0.0);
        }
        self.fft.process_with_scratch(&mut self.buf, &mut self.scratch);
        let len = self.len;
        spectrum[0] = self.buf[0].re;
        for k in 1..(len + 1) / 2 {
            spectrum[k] = self.buf[k].re;
            spectrum[len - k] = self.buf[k].im;
        }
        if len % 2 == 0 {
            spectrum[len / 2] = self.buf[len / 2].re;
        }
        Ok(())
    }

    /// Power spectrum of `data`: window, FFT, then `amp^2 / den` per bin.
    /// `power` must hold `len/2 + 1` elements; `spectrum` holds the raw
    /// half-complex output as a side effect.
    pub fn power_spectrum(
        &mut self,
        data: &[f64],
        spectrum: &mut [f64],
        power: &mut [f64],
    ) -> Result<()> {
        self.execute(data, spectrum)?;
        hc::to_amp2(spectrum, self.den, power);
        Ok(())
    }

    /// Power spectrum plus phase, for the phase-vocoder path.
    pub fn polar_power_spectrum(
        &mut self,
        data: &[f64],
        spectrum: &mut [f64],
        power: &mut [f64],
        phase: &mut [f64],
    ) -> Result<()> {
        self.execute(data, spectrum)?;
        hc::to_polar_power(spectrum, false, self.den, power, phase);
        Ok(())
    }
}
