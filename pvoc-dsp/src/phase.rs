//! Phase propagation for time stretching.
//!
//! Each band's phase advance since the previous analysis frame is
//! scaled by the time-scale factor and accumulated onto the previous
//! *output* phase, so the stretched frames line up at the new hop
//! distance. The raw frame-to-frame difference is deliberately left
//! unwrapped here; only the accumulated output phase is folded back
//! into (-pi, pi].

use std::f64::consts::PI;

const TWO_PI: f64 = 2.0 * PI;

/// Fold a phase into (-pi, pi].
pub(crate) fn wrap_phase(phase: f64) -> f64 {
    let mut wrapped = phase;
    while wrapped > PI {
        wrapped -= TWO_PI;
    }
    while wrapped < -PI {
        wrapped += TWO_PI;
    }
    wrapped
}

/// Rewrite the phases of `polar_spectrum` in place for a time-scaled
/// resynthesis frame; amplitudes are untouched.
///
/// With `phase_lock` set, each band borrows the phase delta of
/// whichever of its three neighbours is loudest in the current frame,
/// offset by the per-band phase distance, which keeps tonal components
/// from drifting apart. A silent band simply holds its previous output
/// phase.
#[allow(clippy::too_many_arguments)]
pub fn phase_interpolate(
    polar_spectrum: &mut [f64],
    last_phase_in: &mut [f64],
    last_phase_out: &mut [f64],
    points: usize,
    decimation: usize,
    scale_factor: f64,
    phase_lock: bool,
) {
    let phase_per_band = (decimation as f64 * TWO_PI) / points as f64;
    let half_points = points / 2;

    for band_number in 0..=half_points {
        let amp_index = band_number * 2;
        let phase_index = amp_index + 1;

        if polar_spectrum[amp_index] == 0.0 {
            polar_spectrum[phase_index] = last_phase_out[band_number];
            continue;
        }

        let mut phase_difference = 0.0;

        if phase_lock {
            let mut max_amplitude = 0.0;

            if band_number > 1 {
                max_amplitude = polar_spectrum[amp_index - 2];
                phase_difference =
                    (polar_spectrum[phase_index - 2] - last_phase_in[band_number - 1])
                        - phase_per_band;
            }

            if polar_spectrum[amp_index] > max_amplitude {
                max_amplitude = polar_spectrum[amp_index];
                phase_difference = polar_spectrum[phase_index] - last_phase_in[band_number];
            }

            if band_number != half_points && polar_spectrum[amp_index + 2] > max_amplitude {
                phase_difference =
                    (polar_spectrum[phase_index + 2] - last_phase_in[band_number + 1])
                        + phase_per_band;
            }
        } else {
            phase_difference = polar_spectrum[phase_index] - last_phase_in[band_number];
        }

        last_phase_in[band_number] = polar_spectrum[phase_index];

        phase_difference *= scale_factor;

        let new_phase = wrap_phase(last_phase_out[band_number] + phase_difference);
        polar_spectrum[phase_index] = new_phase;
        last_phase_out[band_number] = new_phase;
    }
}
