//! Additive oscillator-bank resynthesis for pitch shifting.

use std::f64::consts::PI;

use crate::phase::wrap_phase;

const TWO_PI: f64 = 2.0 * PI;

/// Sum one output hop's worth of table-lookup oscillators, one per
/// analysis band, into `output`.
///
/// Each band's phase delta since the previous frame becomes an
/// instantaneous frequency, scaled by `scale_factor`; amplitude and
/// frequency are then ramped linearly across the `interpolation`
/// samples of this hop. Oscillator phase persists across frames in
/// `sine_index`, and the table is read by *truncating* the running
/// address.
///
/// The phase slots of `polar_spectrum` are overwritten with the
/// computed frequencies, so the buffer cannot be used as a spectrum
/// again within the same block.
#[allow(clippy::too_many_arguments)]
pub fn add_synth(
    polar_spectrum: &mut [f64],
    output: &mut [f64],
    last_amp: &mut [f64],
    last_freq: &mut [f64],
    last_phase_in: &mut [f64],
    sine_table: &[f64],
    sine_index: &mut [f64],
    scale_factor: f64,
    interpolation: usize,
    decimation: usize,
    points: usize,
) {
    let half_points = points / 2;
    let table_size = sine_table.len() as f64;

    let one_over_interp = 1.0 / interpolation as f64;
    let cycles_band = scale_factor * table_size / points as f64;
    let cycles_frame = scale_factor * table_size / (decimation as f64 * TWO_PI);

    // shifting up leaves the top partials above Nyquist; skip them
    let number_partials = if scale_factor > 1.0 {
        (half_points as f64 / scale_factor) as usize
    } else {
        half_points
    };

    for band_number in 0..number_partials {
        let amp_index = band_number * 2;
        let freq_index = amp_index + 1;

        let mut address = sine_index[band_number];

        if polar_spectrum[amp_index] == 0.0 {
            polar_spectrum[freq_index] = band_number as f64 * cycles_band;
        } else {
            let phase_difference =
                wrap_phase(polar_spectrum[freq_index] - last_phase_in[band_number]);
            last_phase_in[band_number] = polar_spectrum[freq_index];

            polar_spectrum[freq_index] =
                phase_difference * cycles_frame + band_number as f64 * cycles_band;

            let mut amplitude = last_amp[band_number];
            let amp_increment = (polar_spectrum[amp_index] - amplitude) * one_over_interp;
            let mut frequency = last_freq[band_number];
            let freq_increment = (polar_spectrum[freq_index] - frequency) * one_over_interp;

            for sample in output.iter_mut().take(interpolation) {
                *sample += amplitude * sine_table[address as usize];
                address += frequency;

                while address >= table_size {
                    address -= table_size;
                }
                while address < 0.0 {
                    address += table_size;
                }

                amplitude += amp_increment;
                frequency += freq_increment;
            }
        }

        last_freq[band_number] = polar_spectrum[freq_index];
        last_amp[band_number] = polar_spectrum[amp_index];
        sine_index[band_number] = address;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::windows::{sine_table, SINE_TABLE_SIZE};

    struct Bank {
        polar: Vec<f64>,
        last_amp: Vec<f64>,
        last_freq: Vec<f64>,
        last_phase_in: Vec<f64>,
        sine_index: Vec<f64>,
        table: Vec<f64>,
    }

    impl Bank {
        fn new(points: usize) -> Self {
            let half_points = points / 2;
            Self {
                polar: vec![0.0; points + 2],
                last_amp: vec![0.0; half_points + 1],
                last_freq: vec![0.0; half_points + 1],
                last_phase_in: vec![0.0; half_points + 1],
                sine_index: vec![0.0; half_points + 1],
                table: sine_table(),
            }
        }

        fn run(&mut self, output: &mut [f64], scale: f64, interpolation: usize, decimation: usize, points: usize) {
            add_synth(
                &mut self.polar,
                output,
                &mut self.last_amp,
                &mut self.last_freq,
                &mut self.last_phase_in,
                &self.table,
                &mut self.sine_index,
                scale,
                interpolation,
                decimation,
                points,
            );
        }
    }

    #[test]
    fn test_single_partial_tracks_table_frequency() {
        // one steady partial at band 1 with zero phase delta must read
        // the table at exactly cycles_band entries per sample
        let points = 16;
        let interpolation = 64;
        let mut bank = Bank::new(points);
        bank.polar[2] = 1.0;
        bank.polar[3] = 0.0;
        bank.last_amp[1] = 1.0;
        bank.last_freq[1] = SINE_TABLE_SIZE as f64 / points as f64;

        let mut output = vec![0.0; interpolation];
        bank.run(&mut output, 1.0, interpolation, interpolation, points);

        let cycles_band = SINE_TABLE_SIZE as f64 / points as f64;
        for (sample, value) in output.iter().enumerate() {
            let address = (sample as f64 * cycles_band) % SINE_TABLE_SIZE as f64;
            let expected = bank.table[address as usize];
            assert!(
                (value - expected).abs() < 1e-12,
                "sample {sample}: {value} != {expected}"
            );
        }
        // oscillator state persists for the next frame
        assert!((bank.sine_index[1] - (interpolation as f64 * cycles_band) % SINE_TABLE_SIZE as f64).abs() < 1e-9);
    }

    #[test]
    fn test_amplitude_ramps_linearly() {
        let points = 16;
        let interpolation = 32;
        let mut bank = Bank::new(points);
        // band 0 oscillates at frequency zero: pure table[0] = 0.5
        bank.polar[0] = 1.0;
        bank.polar[1] = 0.0;

        let mut output = vec![0.0; interpolation];
        bank.run(&mut output, 1.0, interpolation, interpolation, points);

        // amplitude climbs from 0 toward 1 in interpolation steps
        let step = 1.0 / interpolation as f64;
        for (sample, value) in output.iter().enumerate() {
            let expected = sample as f64 * step * 0.5;
            assert!((value - expected).abs() < 1e-12);
        }
        assert_eq!(bank.last_amp[0], 1.0);
    }

    #[test]
    fn test_silent_band_keeps_oscillator_parked() {
        let points = 16;
        let mut bank = Bank::new(points);
        bank.sine_index[1] = 123.0;

        let mut output = vec![0.0; 8];
        bank.run(&mut output, 1.0, 8, 8, points);

        assert!(output.iter().all(|&value| value == 0.0));
        assert_eq!(bank.sine_index[1], 123.0);
        // the frequency slot is reset to the band center
        let cycles_band = SINE_TABLE_SIZE as f64 / points as f64;
        assert_eq!(bank.last_freq[1], cycles_band);
    }

    #[test]
    fn test_upward_shift_drops_top_partials() {
        let points = 16;
        let mut bank = Bank::new(points);
        // band 6 of 8 is above half_points / 2 partials for scale 2.0
        bank.polar[12] = 1.0;
        bank.last_amp[6] = 1.0;

        let mut output = vec![0.0; 8];
        bank.run(&mut output, 2.0, 8, 8, points);

        assert!(output.iter().all(|&value| value == 0.0));
    }
}
