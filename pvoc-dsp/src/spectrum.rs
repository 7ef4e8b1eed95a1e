//! Conversions between the packed real-FFT spectrum and its polar
//! amplitude/phase form, plus the optional spectral gate.
//!
//! The packed spectrum of FFT length `points` carries the DC real part
//! in `[0]` and the Nyquist real part in `[1]`; the polar buffer is two
//! slots longer and holds `points/2 + 1` amplitude/phase pairs.

/// Unravel a packed spectrum into amplitude/phase pairs.
///
/// The phase is the *negated* `atan2` of the bin; [`polar_to_cart`]
/// negates again on the way back, so the two must always be used as a
/// pair. A zero-amplitude bin gets phase zero.
pub fn cart_to_polar(spectrum: &[f64], polar_spectrum: &mut [f64]) {
    let points = spectrum.len();
    let half_points = points / 2;

    polar_spectrum.fill(0.0);

    for band_number in 0..=half_points {
        let amp_index = band_number * 2;
        let phase_index = amp_index + 1;

        let (real_part, imag_part) = if band_number == 0 {
            (spectrum[amp_index], 0.0)
        } else if band_number == half_points {
            (spectrum[1], 0.0)
        } else {
            (spectrum[amp_index], spectrum[phase_index])
        };

        polar_spectrum[amp_index] = real_part.hypot(imag_part);
        polar_spectrum[phase_index] = if polar_spectrum[amp_index] == 0.0 {
            0.0
        } else {
            -imag_part.atan2(real_part)
        };
    }
}

/// Turn amplitude/phase pairs back into a packed spectrum. The Nyquist
/// band's real value lands in `spectrum[1]`.
pub fn polar_to_cart(polar_spectrum: &[f64], spectrum: &mut [f64]) {
    let points = spectrum.len();
    let half_points = points / 2;

    for band_number in 0..=half_points {
        let amp_index = band_number * 2;
        let phase_index = amp_index + 1;

        let (real_value, imag_value) = if polar_spectrum[amp_index] == 0.0 {
            (0.0, 0.0)
        } else if band_number == 0 || band_number == half_points {
            (
                polar_spectrum[amp_index] * polar_spectrum[phase_index].cos(),
                0.0,
            )
        } else {
            (
                polar_spectrum[amp_index] * polar_spectrum[phase_index].cos(),
                -polar_spectrum[amp_index] * polar_spectrum[phase_index].sin(),
            )
        };

        let real_index = if band_number == half_points { 1 } else { amp_index };
        spectrum[real_index] = real_value;

        if band_number != half_points && band_number != 0 {
            spectrum[phase_index] = imag_value;
        }
    }
}

/// Zero out quiet bands before resynthesis.
///
/// A band is removed when its amplitude falls below `mask_ratio` times
/// the loudest band of this frame, or below `min_amplitude` relative to
/// full scale (`max_sample_value` is the largest value the input's bit
/// depth can hold). Phases are left alone.
pub fn simple_spectral_gate(
    polar_spectrum: &mut [f64],
    points: usize,
    min_amplitude: f64,
    mask_ratio: f64,
    max_sample_value: f64,
) {
    let half_points = points / 2;

    let mut max_amplitude = 0.0f64;
    for band_number in 0..=half_points {
        let amp_index = band_number * 2;
        if polar_spectrum[amp_index] > max_amplitude {
            max_amplitude = polar_spectrum[amp_index];
        }
    }

    let mask_amplitude = mask_ratio * max_amplitude;

    for band_number in 0..=half_points {
        let amp_index = band_number * 2;
        let normalized_amp = polar_spectrum[amp_index] / max_sample_value;

        if polar_spectrum[amp_index] < mask_amplitude || normalized_amp < min_amplitude {
            polar_spectrum[amp_index] = 0.0;
        }
    }
}
