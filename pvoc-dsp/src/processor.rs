//! The processor: validated configuration, the fold/unfold helpers and
//! the per-block driver loop.

use std::fmt;

use crossbeam_channel::Sender;
use pvoc_audioio::{Reader, Writer};

use crate::buffers::SlidingBuffer;
use crate::error::PvocError;
use crate::fft::{Direction, Fft};
use crate::phase::phase_interpolate;
use crate::planner::compute_time_scale_data;
use crate::spectrum::{cart_to_polar, polar_to_cart, simple_spectral_gate};
use crate::synth::add_synth;
use crate::windows::{scale_windows, sine_table, WindowKind};

pub const MAX_BANDS: usize = 8192;

const ALLOWED_OVERLAPS: [f64; 4] = [0.5, 1.0, 2.0, 4.0];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    TimeStretch,
    PitchShift,
}

impl Operation {
    pub fn name(self) -> &'static str {
        match self {
            Operation::TimeStretch => "Time Scale",
            Operation::PitchShift => "Pitch Shift",
        }
    }
}

/// Immutable processing configuration plus the hop sizes derived from
/// it. Construction validates everything; a `Pvoc` that exists can run.
#[derive(Debug, Clone)]
pub struct Pvoc {
    pub bands: usize,
    pub overlap: f64,
    pub scale_factor: f64,
    pub points: usize,
    pub window_size: usize,
    pub decimation: usize,
    pub interpolation: usize,
    pub operation: Operation,
    pub phase_lock: bool,
    pub window: WindowKind,
    pub gating_amplitude_db: f64,
    pub gating_threshold_db: f64,
    pub rate_limited: bool,
    gating_amplitude: f64,
    gating_threshold: f64,
}

impl Pvoc {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        bands: usize,
        overlap: f64,
        scale_factor: f64,
        operation: Operation,
        phase_lock: bool,
        window_name: &str,
        gating_amplitude_db: f64,
        gating_threshold_db: f64,
    ) -> Result<Self, PvocError> {
        if !(1..=MAX_BANDS).contains(&bands) || !bands.is_power_of_two() {
            return Err(PvocError::InvalidConfig(format!(
                "bands must be a power of 2 less than or equal to {MAX_BANDS}, got {bands}"
            )));
        }
        if !ALLOWED_OVERLAPS.contains(&overlap) {
            return Err(PvocError::InvalidConfig(format!(
                "overlap must be 0.5, 1.0, 2.0 or 4.0, got {overlap}"
            )));
        }
        if scale_factor < 0.0 {
            return Err(PvocError::InvalidConfig(format!(
                "scale multiplier cannot be negative, got {scale_factor}"
            )));
        }
        if gating_amplitude_db > 0.0 {
            return Err(PvocError::InvalidConfig(format!(
                "resynthesis gating amplitude must be less than 0, got {gating_amplitude_db}"
            )));
        }
        if gating_threshold_db > 0.0 {
            return Err(PvocError::InvalidConfig(format!(
                "resynthesis gating threshold below maximum must be less than 0, got {gating_threshold_db}"
            )));
        }
        let window = window_name
            .parse::<WindowKind>()
            .map_err(PvocError::InvalidConfig)?;

        let gating_amplitude = if gating_amplitude_db != 0.0 {
            10.0f64.powf(gating_amplitude_db / 20.0)
        } else {
            0.0
        };
        let gating_threshold = if gating_threshold_db != 0.0 {
            10.0f64.powf(gating_threshold_db / 20.0)
        } else {
            0.0
        };

        let points = bands * 2;
        let window_size = (bands as f64 * 2.0 * overlap) as usize;

        let mut pvoc = Self {
            bands,
            overlap,
            scale_factor,
            points,
            window_size,
            decimation: 0,
            interpolation: 0,
            operation,
            phase_lock,
            window,
            gating_amplitude_db,
            gating_threshold_db,
            rate_limited: false,
            gating_amplitude,
            gating_threshold,
        };

        match operation {
            Operation::TimeStretch => {
                let plan = compute_time_scale_data(window_size, scale_factor);
                pvoc.scale_factor = plan.scale_factor;
                pvoc.interpolation = plan.interpolation;
                pvoc.decimation = plan.decimation;
                pvoc.rate_limited = plan.rate_limited;
            }
            Operation::PitchShift => {
                // fixed hops at a quarter of the band count per overlap
                pvoc.interpolation = (bands as f64 * overlap / 4.0) as usize;
                pvoc.decimation = pvoc.interpolation;
            }
        }

        Ok(pvoc)
    }

    /// Run the whole batch job over `reader` and `writer`.
    ///
    /// Progress percentages (0-100, duplicates allowed) are sent on
    /// `progress`; the returned `Result` is the single terminal
    /// outcome. If the host drops the progress receiver the run stops
    /// cleanly at the next block boundary.
    pub fn run(
        &self,
        reader: &mut dyn Reader,
        writer: &mut dyn Writer,
        progress: &Sender<u32>,
    ) -> Result<(), PvocError> {
        let num_chans = reader.num_chans();
        if num_chans == 0 {
            return Err(PvocError::InvalidArgument(
                "reader reports zero channels; was it opened?".into(),
            ));
        }

        let half_points = self.points / 2;
        let total_frames = reader.num_sample_frames();
        let max_sample_value = 2.0f64.powi(reader.bit_depth() as i32 - 1);
        let gating = self.gating_amplitude != 0.0 || self.gating_threshold != 0.0;

        let mut channels: Vec<ChannelState> = (0..num_chans)
            .map(|_| ChannelState::new(self.window_size, self.points, half_points))
            .collect();

        let sine_table = sine_table();
        let fft = Fft::new();

        let mut analysis_window = self.window.generate(self.window_size);
        let mut synthesis_window = self.window.generate(self.window_size);
        scale_windows(
            &mut analysis_window,
            &mut synthesis_window,
            self.points,
            self.interpolation,
        );

        tracing::debug!(
            operation = self.operation.name(),
            decimation = self.decimation,
            interpolation = self.interpolation,
            window_size = self.window_size,
            channels = num_chans,
            "starting processing run"
        );

        let mut in_pointer = -(self.window_size as isize);
        let mut out_pointer = (in_pointer * self.interpolation as isize) / self.decimation as isize;
        let mut total_samples_read = 0usize;

        if progress.send(0).is_err() {
            return Ok(());
        }

        loop {
            in_pointer += self.decimation as isize;
            out_pointer += self.interpolation as isize;

            let (_, samples_read) = reader.read_next()?;
            total_samples_read += samples_read;

            if samples_read > 0 {
                for (channel, state) in channels.iter_mut().enumerate() {
                    let channel_samples = reader.extract_channel(channel)?;
                    let float_samples: Vec<f64> =
                        channel_samples.iter().map(|&sample| sample as f64).collect();
                    state.input.shift_in(&float_samples, samples_read)?;
                }
            } else {
                // past end of file: keep sliding so the tail drains
                for state in channels.iter_mut() {
                    state.input.shift_over(self.decimation)?;
                }
            }

            for state in channels.iter_mut() {
                window_fold(
                    state.input.data(),
                    &analysis_window,
                    &mut state.spectrum,
                    in_pointer,
                );
                fft.real_fft(&mut state.spectrum, Direction::TimeToFreq);
                cart_to_polar(&state.spectrum, &mut state.polar);

                if gating {
                    simple_spectral_gate(
                        &mut state.polar,
                        self.points,
                        self.gating_amplitude,
                        self.gating_threshold,
                        max_sample_value,
                    );
                }

                match self.operation {
                    Operation::TimeStretch => {
                        phase_interpolate(
                            &mut state.polar,
                            &mut state.last_phase_in,
                            &mut state.last_phase_out,
                            self.points,
                            self.decimation,
                            self.scale_factor,
                            self.phase_lock,
                        );
                        polar_to_cart(&state.polar, &mut state.spectrum);
                        fft.real_fft(&mut state.spectrum, Direction::FreqToTime);
                        overlap_add(
                            &state.spectrum,
                            &synthesis_window,
                            state.output.data_mut(),
                            out_pointer,
                        );
                    }
                    Operation::PitchShift => {
                        add_synth(
                            &mut state.polar,
                            state.output.data_mut(),
                            &mut state.last_amp,
                            &mut state.last_freq,
                            &mut state.last_phase_in,
                            &sine_table,
                            &mut state.sine_index,
                            self.scale_factor,
                            self.interpolation,
                            self.decimation,
                            self.points,
                        );
                    }
                }
            }

            let check_time = match self.operation {
                Operation::TimeStretch => out_pointer + self.interpolation as isize,
                Operation::PitchShift => {
                    out_pointer + self.window_size as isize - self.interpolation as isize
                }
            };

            if check_time >= 0 {
                writer.zero_write_buffer();
                for (channel, state) in channels.iter().enumerate() {
                    let ints = state.output.rounded_ints();
                    writer.interleave_channel(channel, &ints[..self.interpolation])?;
                }
                writer.write_next()?;
            }

            for state in channels.iter_mut() {
                state.output.shift_over(self.interpolation)?;
            }

            if !channels[0].input.has_valid_samples() {
                break;
            }

            let percent =
                (total_samples_read as f64 / total_frames as f64 * 100.0) as u32;
            if progress.send(percent).is_err() {
                return Ok(());
            }
        }

        Ok(())
    }
}

impl fmt::Display for Pvoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:>24}   {}", "Operation:", self.operation.name())?;
        writeln!(f, "{:>24}   {}", "Bands:", self.bands)?;
        writeln!(f, "{:>24}   {:.6}", "Overlap:", self.overlap)?;
        write!(f, "{:>24}   {:.6}", "Scaling:", self.scale_factor)?;
        if self.operation == Operation::TimeStretch && self.rate_limited {
            write!(
                f,
                " (limited to {})",
                if self.scale_factor < 1.0 { "min" } else { "max" }
            )?;
        }
        writeln!(f)?;
        writeln!(f, "{:>24}   {}", "Windowing Func:", self.window)?;
        writeln!(f, "{:>24}   {} samples", "Decimation Length:", self.decimation)?;
        writeln!(
            f,
            "{:>24}   {} samples",
            "Interpolation Length:", self.interpolation
        )?;
        if self.operation == Operation::TimeStretch {
            writeln!(f, "{:>24}   {}", "Phase Locking:", self.phase_lock)?;
        }
        if self.gating_amplitude_db != 0.0 {
            writeln!(f, "{:>24}   {:.6}", "Gating Amp Min:", self.gating_amplitude_db)?;
        }
        if self.gating_threshold_db != 0.0 {
            writeln!(
                f,
                "{:>24}   {:.6}",
                "Gating Amp Thresh <Max:", self.gating_threshold_db
            )?;
        }
        Ok(())
    }
}

/// Everything the pipeline keeps per channel between blocks.
struct ChannelState {
    input: SlidingBuffer,
    output: SlidingBuffer,
    spectrum: Vec<f64>,
    polar: Vec<f64>,
    last_phase_in: Vec<f64>,
    last_phase_out: Vec<f64>,
    last_amp: Vec<f64>,
    last_freq: Vec<f64>,
    sine_index: Vec<f64>,
}

impl ChannelState {
    fn new(window_size: usize, points: usize, half_points: usize) -> Self {
        Self {
            input: SlidingBuffer::new(window_size),
            output: SlidingBuffer::new(window_size),
            spectrum: vec![0.0; points],
            polar: vec![0.0; points + 2],
            last_phase_in: vec![0.0; half_points + 1],
            last_phase_out: vec![0.0; half_points + 1],
            last_amp: vec![0.0; half_points + 1],
            last_freq: vec![0.0; half_points + 1],
            sine_index: vec![0.0; half_points + 1],
        }
    }
}

/// Multiply the input buffer by the analysis window and fold it, with
/// modulus rotation by `in_pointer`, into the FFT-length spectrum
/// buffer.
pub fn window_fold(
    input_buffer: &[f64],
    analysis_window: &[f64],
    spectrum_buffer: &mut [f64],
    in_pointer: isize,
) {
    let points = spectrum_buffer.len();

    spectrum_buffer.fill(0.0);

    let mut fold_index = in_pointer;
    while fold_index < 0 {
        fold_index += points as isize;
    }
    let mut fold_index = fold_index as usize % points;

    for (sample, window_value) in input_buffer.iter().zip(analysis_window) {
        spectrum_buffer[fold_index] += sample * window_value;
        fold_index += 1;
        if fold_index == points {
            fold_index = 0;
        }
    }
}

/// Unrotate one inverse-FFT frame and accumulate it, scaled by the
/// synthesis window, into the sliding output buffer.
pub fn overlap_add(
    spectrum: &[f64],
    synthesis_window: &[f64],
    output: &mut [f64],
    out_pointer: isize,
) {
    let points = spectrum.len();

    let mut read_index = out_pointer;
    while read_index < 0 {
        read_index += points as isize;
    }
    let mut read_index = read_index as usize % points;

    for (out, window_value) in output.iter_mut().zip(synthesis_window) {
        *out += spectrum[read_index] * window_value;
        read_index += 1;
        if read_index == points {
            read_index = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;
    use pvoc_audioio::AudioError;
    use std::f64::consts::PI;

    #[test]
    fn test_config_rejects_bad_bands() {
        for bands in [0, 3, 12, 16_384] {
            let result = Pvoc::new(bands, 1.0, 1.0, Operation::TimeStretch, false, "hamming", 0.0, 0.0);
            assert!(matches!(result, Err(PvocError::InvalidConfig(_))), "bands {bands}");
        }
    }

    #[test]
    fn test_config_rejects_bad_overlap() {
        let result = Pvoc::new(512, 3.0, 1.0, Operation::TimeStretch, false, "hamming", 0.0, 0.0);
        assert!(matches!(result, Err(PvocError::InvalidConfig(_))));
    }

    #[test]
    fn test_config_rejects_negative_scale() {
        let result = Pvoc::new(512, 1.0, -2.0, Operation::TimeStretch, false, "hamming", 0.0, 0.0);
        assert!(matches!(result, Err(PvocError::InvalidConfig(_))));
    }

    #[test]
    fn test_config_rejects_positive_gating() {
        let result = Pvoc::new(512, 1.0, 1.0, Operation::TimeStretch, false, "hamming", 3.0, 0.0);
        assert!(matches!(result, Err(PvocError::InvalidConfig(_))));
        let result = Pvoc::new(512, 1.0, 1.0, Operation::TimeStretch, false, "hamming", 0.0, 1.0);
        assert!(matches!(result, Err(PvocError::InvalidConfig(_))));
    }

    #[test]
    fn test_config_rejects_unknown_window() {
        let result = Pvoc::new(512, 1.0, 1.0, Operation::TimeStretch, false, "blackman", 0.0, 0.0);
        assert!(matches!(result, Err(PvocError::InvalidConfig(_))));
    }

    #[test]
    fn test_pitch_shift_hops_bypass_planner() {
        let pvoc = Pvoc::new(512, 2.0, 3.0, Operation::PitchShift, false, "hamming", 0.0, 0.0)
            .unwrap();
        assert_eq!(pvoc.interpolation, 256);
        assert_eq!(pvoc.decimation, 256);
        // the requested factor is kept as-is for pitch shifting
        assert_eq!(pvoc.scale_factor, 3.0);
    }

    #[test]
    fn test_window_fold_rotates_by_pointer() {
        // window of ones, input shorter than the FFT: pure rotation
        let input = [1.0, 2.0, 3.0, 4.0];
        let window = [1.0; 4];
        let mut spectrum = vec![0.0; 8];

        window_fold(&input, &window, &mut spectrum, 2);
        assert_eq!(spectrum, vec![0.0, 0.0, 1.0, 2.0, 3.0, 4.0, 0.0, 0.0]);

        window_fold(&input, &window, &mut spectrum, -2);
        assert_eq!(spectrum, vec![3.0, 4.0, 0.0, 0.0, 0.0, 0.0, 1.0, 2.0]);
    }

    #[test]
    fn test_window_fold_aliases_long_windows() {
        // input twice the FFT length folds back onto itself
        let input = [1.0; 8];
        let window = [1.0; 8];
        let mut spectrum = vec![0.0; 4];
        window_fold(&input, &window, &mut spectrum, 0);
        assert_eq!(spectrum, vec![2.0, 2.0, 2.0, 2.0]);
    }

    #[test]
    fn test_overlap_add_accumulates_rotated() {
        let spectrum = [1.0, 2.0, 3.0, 4.0];
        let window = [1.0; 4];
        let mut output = vec![10.0; 4];
        overlap_add(&spectrum, &window, &mut output, 1);
        // reads 2, 3, 4, then wraps to 1
        assert_eq!(output, vec![12.0, 13.0, 14.0, 11.0]);
    }

    // ---- in-memory reader/writer doubles for driving full runs ----

    struct MemReader {
        samples: Vec<i32>,
        num_chans: usize,
        bit_depth: u32,
        sample_rate: u32,
        frames_per_block: usize,
        position: usize,
        read_buffer: Vec<i32>,
    }

    impl MemReader {
        fn new(samples: Vec<i32>, num_chans: usize, bit_depth: u32) -> Self {
            Self {
                samples,
                num_chans,
                bit_depth,
                sample_rate: 44_100,
                frames_per_block: 0,
                position: 0,
                read_buffer: Vec::new(),
            }
        }
    }

    impl Reader for MemReader {
        fn open(&mut self, frames_per_block: usize) -> Result<(), AudioError> {
            self.frames_per_block = frames_per_block;
            self.read_buffer = vec![0; frames_per_block * self.num_chans];
            Ok(())
        }

        fn num_chans(&self) -> usize {
            self.num_chans
        }

        fn sample_rate(&self) -> u32 {
            self.sample_rate
        }

        fn bit_depth(&self) -> u32 {
            self.bit_depth
        }

        fn num_sample_frames(&self) -> usize {
            self.samples.len() / self.num_chans
        }

        fn duration(&self) -> f64 {
            self.num_sample_frames() as f64 / self.sample_rate as f64
        }

        fn read_next(&mut self) -> Result<(usize, usize), AudioError> {
            let total_frames = self.num_sample_frames();
            let frames = self.frames_per_block.min(total_frames - self.position);
            let start = self.position * self.num_chans;
            let count = frames * self.num_chans;
            self.read_buffer[..count].copy_from_slice(&self.samples[start..start + count]);
            self.position += frames;
            Ok((count, frames))
        }

        fn extract_channel(&self, channel: usize) -> Result<Vec<i32>, AudioError> {
            if channel >= self.num_chans {
                return Err(AudioError::ChannelOutOfBounds {
                    requested: channel,
                    last: self.num_chans - 1,
                });
            }
            Ok(self
                .read_buffer
                .iter()
                .skip(channel)
                .step_by(self.num_chans)
                .copied()
                .collect())
        }

        fn close(&mut self) {}
    }

    struct MemWriter {
        num_chans: usize,
        max_sample_value: i32,
        write_buffer: Vec<i32>,
        written: Vec<i32>,
    }

    impl MemWriter {
        fn new(num_chans: usize, bit_depth: u32) -> Self {
            Self {
                num_chans,
                max_sample_value: pvoc_audioio::max_signed_value(bit_depth).unwrap(),
                write_buffer: Vec::new(),
                written: Vec::new(),
            }
        }

        fn channel(&self, channel: usize) -> Vec<i32> {
            self.written
                .iter()
                .skip(channel)
                .step_by(self.num_chans)
                .copied()
                .collect()
        }
    }

    impl Writer for MemWriter {
        fn create(&mut self, frames_per_block: usize) -> Result<(), AudioError> {
            self.write_buffer = vec![0; frames_per_block * self.num_chans];
            Ok(())
        }

        fn zero_write_buffer(&mut self) {
            self.write_buffer.fill(0);
        }

        fn interleave_channel(&mut self, channel: usize, data: &[i32]) -> Result<(), AudioError> {
            if data.len() * self.num_chans != self.write_buffer.len() {
                return Err(AudioError::InterleaveLength);
            }
            for (frame, &sample) in data.iter().enumerate() {
                self.write_buffer[frame * self.num_chans + channel] = sample;
            }
            Ok(())
        }

        fn write_next(&mut self) -> Result<(), AudioError> {
            for &sample in &self.write_buffer {
                self.written
                    .push(sample.clamp(-self.max_sample_value, self.max_sample_value));
            }
            Ok(())
        }

        fn close(&mut self) -> Result<(), AudioError> {
            Ok(())
        }
    }

    fn sine_frames(frames: usize, amplitude: f64, frequency: f64) -> Vec<i32> {
        (0..frames)
            .map(|i| (amplitude * (2.0 * PI * frequency * i as f64).sin()).round() as i32)
            .collect()
    }

    #[test]
    fn test_unit_time_stretch_reproduces_sine() {
        let frames = 16_384;
        let amplitude = 10_000.0;
        let input = sine_frames(frames, amplitude, 440.0 / 44_100.0);

        let pvoc = Pvoc::new(512, 1.0, 1.0, Operation::TimeStretch, false, "hamming", 0.0, 0.0)
            .unwrap();
        assert_eq!(pvoc.decimation, pvoc.interpolation);
        let hop = pvoc.interpolation;

        let mut reader = MemReader::new(input.clone(), 1, 16);
        reader.open(pvoc.decimation).unwrap();
        let mut writer = MemWriter::new(1, 16);
        writer.create(pvoc.interpolation).unwrap();

        let (progress_tx, progress_rx) = unbounded();
        pvoc.run(&mut reader, &mut writer, &progress_tx).unwrap();
        drop(progress_tx);

        let progress: Vec<u32> = progress_rx.try_iter().collect();
        assert_eq!(progress.first(), Some(&0));
        assert!(progress.last().copied().unwrap_or(0) >= 100);

        // the emitted stream reproduces the input one hop late, outside
        // the windowed transients at either end
        let output = writer.channel(0);
        assert!(output.len() >= frames);
        for k in (pvoc.window_size + hop)..(frames - pvoc.window_size) {
            let produced = output[k + hop] as f64;
            let expected = input[k] as f64;
            assert!(
                (produced - expected).abs() < amplitude * 0.01,
                "sample {k}: produced {produced}, expected {expected}"
            );
        }
    }

    #[test]
    fn test_unit_pitch_shift_preserves_frequency() {
        // a bin-centered sine through the oscillator bank at scale 1.0
        // keeps its frequency; check via zero-crossing count
        let frames = 16_384;
        let cycles_per_sample = 32.0 / 1024.0;
        let input = sine_frames(frames, 8_000.0, cycles_per_sample);

        let pvoc = Pvoc::new(512, 1.0, 1.0, Operation::PitchShift, false, "hamming", 0.0, 0.0)
            .unwrap();

        let mut reader = MemReader::new(input, 1, 16);
        reader.open(pvoc.decimation).unwrap();
        let mut writer = MemWriter::new(1, 16);
        writer.create(pvoc.interpolation).unwrap();

        let (progress_tx, progress_rx) = unbounded();
        pvoc.run(&mut reader, &mut writer, &progress_tx).unwrap();
        drop(progress_rx);

        let output = writer.channel(0);
        let steady = &output[pvoc.window_size * 2..frames - pvoc.window_size];
        let peak = steady.iter().map(|s| s.abs()).max().unwrap();
        assert!(peak > 1_000, "resynthesis produced almost no signal");

        let crossings = steady
            .windows(2)
            .filter(|pair| (pair[0] < 0) != (pair[1] < 0))
            .count();
        let expected = 2.0 * cycles_per_sample * steady.len() as f64;
        let ratio = crossings as f64 / expected;
        assert!(
            (0.95..=1.05).contains(&ratio),
            "zero crossings {crossings}, expected about {expected}"
        );
    }

    #[test]
    fn test_run_stops_after_dropped_progress_receiver() {
        let input = sine_frames(8_192, 1_000.0, 0.01);
        let pvoc = Pvoc::new(256, 1.0, 1.0, Operation::TimeStretch, false, "vonhann", 0.0, 0.0)
            .unwrap();

        let mut reader = MemReader::new(input, 1, 16);
        reader.open(pvoc.decimation).unwrap();
        let mut writer = MemWriter::new(1, 16);
        writer.create(pvoc.interpolation).unwrap();

        let (progress_tx, progress_rx) = unbounded();
        drop(progress_rx);

        // a disconnected host is a cancellation, not an error
        pvoc.run(&mut reader, &mut writer, &progress_tx).unwrap();
        assert!(writer.written.is_empty());
    }

    #[test]
    fn test_stereo_channels_processed_independently() {
        let frames = 8_192;
        let left = sine_frames(frames, 6_000.0, 20.0 / 512.0);
        let right = sine_frames(frames, 3_000.0, 50.0 / 512.0);
        let mut interleaved = Vec::with_capacity(frames * 2);
        for i in 0..frames {
            interleaved.push(left[i]);
            interleaved.push(right[i]);
        }

        let pvoc = Pvoc::new(256, 1.0, 1.0, Operation::TimeStretch, false, "hamming", 0.0, 0.0)
            .unwrap();
        let hop = pvoc.interpolation;

        let mut reader = MemReader::new(interleaved, 2, 16);
        reader.open(pvoc.decimation).unwrap();
        let mut writer = MemWriter::new(2, 16);
        writer.create(pvoc.interpolation).unwrap();

        let (progress_tx, _progress_rx) = unbounded();
        pvoc.run(&mut reader, &mut writer, &progress_tx).unwrap();

        for (channel, source) in [(0, &left), (1, &right)] {
            let output = writer.channel(channel);
            for k in (pvoc.window_size + hop)..(frames - pvoc.window_size) {
                let produced = output[k + hop] as f64;
                let expected = source[k] as f64;
                assert!(
                    (produced - expected).abs() < 6_000.0 * 0.015,
                    "channel {channel} sample {k}: {produced} vs {expected}"
                );
            }
        }
    }

    #[test]
    fn test_block_count_stays_bounded() {
        let frames = 4_096;
        let input = sine_frames(frames, 1_000.0, 0.013);
        let pvoc = Pvoc::new(256, 1.0, 0.5, Operation::TimeStretch, false, "hamming", 0.0, 0.0)
            .unwrap();

        let mut reader = MemReader::new(input, 1, 16);
        reader.open(pvoc.decimation).unwrap();
        let mut writer = MemWriter::new(1, 16);
        writer.create(pvoc.interpolation).unwrap();

        let (progress_tx, progress_rx) = unbounded();
        pvoc.run(&mut reader, &mut writer, &progress_tx).unwrap();
        drop(progress_tx);

        // one progress message per processed block, plus the initial 0
        let blocks = progress_rx.try_iter().count() - 1;
        let bound = (frames + pvoc.window_size) / pvoc.decimation + 2;
        assert!(blocks <= bound, "{blocks} blocks exceeds bound {bound}");
    }
}
