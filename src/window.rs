//! FFT windowing functions
//!
//! The window shapes follow "Numerical Recipes in C" 2nd Ed., Sec. 13.4
//! (data windowing), plus a steeper 30-dB/octave rolloff variant.

use crate::error::{PitchError, Result};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Supported FFT window functions.
///
/// `Nuttall` and `Triangular` are accepted by the selector but not yet
/// implemented; applying them is a configuration error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Window {
    Rectangular,
    Parzen,
    Welch,
    Hanning,
    Hamming,
    Blackman,
    Steeper,
    Nuttall,
    Triangular,
}

impl Default for Window {
    fn default() -> Self {
        Window::Hanning
    }
}

impl Window {
    /// Parses a window selector: either the numeric value (0-6) or a name.
    /// Only the first three characters of a name are significant, and the
    /// match is case-insensitive.
    pub fn parse(value: &str) -> Result<Window> {
        if let Ok(num) = value.parse::<u32>() {
            return match num {
                0 => Ok(Window::Rectangular),
                1 => Ok(Window::Parzen),
                2 => Ok(Window::Welch),
                3 => Ok(Window::Hanning),
                4 => Ok(Window::Hamming),
                5 => Ok(Window::Blackman),
                6 => Ok(Window::Steeper),
                _ => Err(PitchError::UnsupportedWindow(value.to_string())),
            };
        }
        let lower = value.to_ascii_lowercase();
        let prefix: String = lower.chars().take(3).collect();
        match prefix.as_str() {
            "non" | "rec" => Ok(Window::Rectangular),
            "par" => Ok(Window::Parzen),
            "wel" => Ok(Window::Welch),
            "han" => Ok(Window::Hanning),
            "ham" => Ok(Window::Hamming),
            "bla" => Ok(Window::Blackman),
            "ste" => Ok(Window::Steeper),
            "nut" => Ok(Window::Nuttall),
            "tri" => Ok(Window::Triangular),
            _ => Err(PitchError::UnsupportedWindow(value.to_string())),
        }
    }

    /// Human-readable window description.
    pub fn name(&self) -> &'static str {
        match self {
            Window::Rectangular => "No window (rectangular)",
            Window::Parzen => "Parzen window",
            Window::Welch => "Welch window",
            Window::Hanning => "Hanning window",
            Window::Hamming => "Hamming window",
            Window::Blackman => "Blackman window",
            Window::Steeper => "Steeper 30-dB/octave rolloff window",
            Window::Nuttall => "Nuttall window (unsupported)",
            Window::Triangular => "Triangular window (unsupported)",
        }
    }

    /// Window coefficient at point `i` of an `n`-point window.
    ///
    /// Returns an error for the accepted-but-unimplemented kinds so that no
    /// output is produced for them.
    fn factor(&self, i: usize, n: usize) -> Result<f64> {
        let i = i as f64;
        let n = n as f64;
        let value = match self {
            Window::Rectangular => 1.0,
            Window::Parzen => 1.0 - ((i - 0.5 * (n - 1.0)) / (0.5 * (n + 1.0))).abs(),
            Window::Welch => {
                let t = (i - 0.5 * (n - 1.0)) / (0.5 * (n + 1.0));
                1.0 - t * t
            }
            Window::Hanning => 0.5 * (1.0 - (2.0 * PI * i / (n - 1.0)).cos()),
            Window::Hamming => 0.54 - 0.46 * (2.0 * PI * i / (n - 1.0)).cos(),
            Window::Blackman => {
                0.42 - 0.5 * (2.0 * PI * i / (n - 1.0)).cos()
                    + 0.08 * (4.0 * PI * i / (n - 1.0)).cos()
            }
            Window::Steeper => {
                0.375 - 0.5 * (2.0 * PI * i / (n - 1.0)).cos()
                    + 0.125 * (4.0 * PI * i / (n - 1.0)).cos()
            }
            Window::Nuttall | Window::Triangular => {
                return Err(PitchError::UnsupportedWindow(self.name().to_string()));
            }
        };
        Ok(value)
    }

    /// Applies the window to `data`, dividing by `scale`, writing into `out`.
    pub fn apply(&self, data: &[f64], scale: f64, out: &mut [f64]) -> Result<()> {
        let n = data.len();
        debug_assert!(out.len() >= n);
        match self {
            Window::Rectangular => {
                for i in 0..n {
                    out[i] = data[i] / scale;
                }
            }
            Window::Nuttall | Window::Triangular => {
                return Err(PitchError::UnsupportedWindow(self.name().to_string()));
            }
            _ => {
                for i in 0..n {
                    out[i] = data[i] * self.factor(i, n)? / scale;
                }
            }
        }
        Ok(())
    }

    /// In-place variant of [`Window::apply`].
    pub fn apply_in_place(&self, data: &mut [f64], scale: f64) -> Result<()> {
        let n = data.len();
        match self {
            Window::Rectangular => {
                for x in data.iter_mut() {
                    *x /= scale;
                }
            }
            Window::Nuttall | Window::Triangular => {
                return Err(PitchError::UnsupportedWindow(self.name().to_string()));
            }
            _ => {
                for i in 0..n {
                    data[i] = data[i] * self.factor(i, n)? / scale;
                }
            }
        }
        Ok(())
    }

    /// Window density factor: `n * sum(w(i)^2)`, used to normalize power
    /// spectra so that energy is comparable across window types.
    pub fn init_den(&self, n: usize) -> Result<f64> {
        let mut den = 0.0;
        for i in 0..n {
            let w = self.factor(i, n)?;
            den += w * w;
        }
        Ok(den * n as f64)
    }
}
