//! Half-complex spectral algebra
//!
//! A half-complex buffer of logical length `len` packs the `len/2 + 1`
//! complex coefficients of a real FFT: index 0 holds the DC term (real
//! only), index `len/2` holds the Nyquist term (real only, even `len`),
//! and indices `k` / `len - k` hold the real/imaginary pair for bin `k`
//! with `k` in `1..(len + 1) / 2`.

/// Converts a half-complex buffer to polar form.
///
/// `amp` and `phs` must hold `len/2 + 1` elements. With `conjugate` set,
/// the phase of the conjugated coefficient is returned. Phase at the DC
/// and Nyquist bins is 0 by definition, as is the phase of a zero bin.
pub fn to_polar(freq: &[f64], conjugate: bool, amp: &mut [f64], phs: &mut [f64]) {
    let len = freq.len();
    phs[0] = 0.0;
    amp[0] = freq[0].abs();
    for i in 1..(len + 1) / 2 {
        let rl = freq[i];
        let im = freq[len - i];
        amp[i] = rl.hypot(im);
        phs[i] = if amp[i] > 0.0 {
            if conjugate {
                (-im).atan2(rl)
            } else {
                im.atan2(rl)
            }
        } else {
            0.0
        };
    }
    if len % 2 == 0 {
        phs[len / 2] = 0.0;
        amp[len / 2] = freq[len / 2].abs();
    }
}

/// Converts a half-complex buffer to power (amplitude squared over `scale`)
/// plus phase. Same layout contract as [`to_polar`].
pub fn to_polar_power(freq: &[f64], conjugate: bool, scale: f64, amp2: &mut [f64], phs: &mut [f64]) {
    let len = freq.len();
    phs[0] = 0.0;
    amp2[0] = freq[0] * freq[0] / scale;
    for i in 1..(len + 1) / 2 {
        let rl = freq[i];
        let im = freq[len - i];
        amp2[i] = (rl * rl + im * im) / scale;
        phs[i] = if amp2[i] > 0.0 {
            if conjugate {
                (-im).atan2(rl)
            } else {
                im.atan2(rl)
            }
        } else {
            0.0
        };
    }
    if len % 2 == 0 {
        phs[len / 2] = 0.0;
        amp2[len / 2] = freq[len / 2] * freq[len / 2] / scale;
    }
}

/// Power spectrum of a half-complex buffer: `(re^2 + im^2) / scale` per bin.
pub fn to_amp2(freq: &[f64], scale: f64, amp2: &mut [f64]) {
    let len = freq.len();
    amp2[0] = freq[0] * freq[0] / scale;
    for i in 1..(len + 1) / 2 {
        let rl = freq[i];
        let im = freq[len - i];
        amp2[i] = (rl * rl + im * im) / scale;
    }
    if len % 2 == 0 {
        amp2[len / 2] = freq[len / 2] * freq[len / 2] / scale;
    }
}

/// Rebuilds a half-complex buffer from polar form; inverse of [`to_polar`].
pub fn from_polar(amp: &[f64], phs: &[f64], conjugate: bool, freq: &mut [f64]) {
    let len = freq.len();
    freq[0] = amp[0];
    for i in 1..(len + 1) / 2 {
        let rl = amp[i] * phs[i].cos();
        let im = if conjugate {
            -amp[i] * phs[i].sin()
        } else {
            amp[i] * phs[i].sin()
        };
        freq[i] = rl;
        freq[len - i] = im;
    }
    if len % 2 == 0 {
        freq[len / 2] = amp[len / 2];
    }
}

/// Bin-wise complex multiply `z = x * y` of half-complex buffers.
pub fn mul(x: &[f64], y: &[f64], z: &mut [f64]) {
    let len = x.len();
    z[0] = x[0] * y[0];
    for i in 1..(len + 1) / 2 {
        let rx = x[i];
        let ix = x[len - i];
        let ry = y[i];
        let iy = y[len - i];
        z[i] = rx * ry - ix * iy;
        z[len - i] = rx * iy + ix * ry;
    }
    if len % 2 == 0 {
        z[len / 2] = x[len / 2] * y[len / 2];
    }
}

/// Bin-wise complex divide `z = x / y` of half-complex buffers.
///
/// A bin whose denominator magnitude is exactly zero yields a zero result
/// bin rather than a NaN.
pub fn div(x: &[f64], y: &[f64], z: &mut [f64]) {
    let len = x.len();
    z[0] = if y[0] == 0.0 { 0.0 } else { x[0] / y[0] };
    for i in 1..(len + 1) / 2 {
        let rx = x[i];
        let ix = x[len - i];
        let ry = y[i];
        let iy = y[len - i];
        let den = ry * ry + iy * iy;
        if den == 0.0 {
            z[i] = 0.0;
            z[len - i] = 0.0;
        } else {
            z[i] = (rx * ry + ix * iy) / den;
            z[len - i] = (ix * ry - rx * iy) / den;
        }
    }
    if len % 2 == 0 {
        let ny = y[len / 2];
        z[len / 2] = if ny == 0.0 { 0.0 } else { x[len / 2] / ny };
    }
}

/// Bin-wise complex magnitude: real part of `z` gets `|x|`, imaginary part 0.
pub fn abs(x: &[f64], z: &mut [f64]) {
    let len = x.len();
    z[0] = x[0].abs();
    for i in 1..(len + 1) / 2 {
        let rx = x[i];
        let ix = x[len - i];
        z[i] = rx.hypot(ix);
        z[len - i] = 0.0;
    }
    if len % 2 == 0 {
        z[len / 2] = x[len / 2].abs();
    }
}

/// Three-bin smoothing convolution across the packed buffer, used to
/// stabilize phase locking (Puckette). `y` and `z` must be distinct.
pub fn puckette_lock(y: &[f64], z: &mut [f64]) {
    let len = y.len();
    z[0] = y[0];
    for k in 1..(len + 1) / 2 {
        z[k] = y[k];
        z[len - k] = y[len - k];
        if k > 1 {
            z[k] += y[k - 1];
            z[len - k] += y[len - (k - 1)];
        }
        if k < (len + 1) / 2 - 1 {
            z[k] += y[k + 1];
            z[len - k] += y[len - (k + 1)];
        }
    }
    if len % 2 == 0 {
        z[len / 2] = y[len / 2];
    }
}
