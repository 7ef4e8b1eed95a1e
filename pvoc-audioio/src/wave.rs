//! WAV block reader/writer over `hound`.
//!
//! Samples stay in their native integer range; nothing here rescales to
//! a wider bit depth, so gating and clipping downstream see the file's
//! true values.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::{max_signed_value, AudioError, Reader, Writer};

fn wav_err(err: hound::Error) -> AudioError {
    match err {
        hound::Error::IoError(e) => AudioError::Io(e),
        other => AudioError::Format(other.to_string()),
    }
}

pub struct WaveReader {
    path: PathBuf,
    reader: Option<hound::WavReader<BufReader<File>>>,
    read_buffer: Vec<i32>,
    num_chans: usize,
    sample_rate: u32,
    bit_depth: u32,
    num_sample_frames: usize,
    duration: f64,
}

impl WaveReader {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            reader: None,
            read_buffer: Vec::new(),
            num_chans: 0,
            sample_rate: 0,
            bit_depth: 0,
            num_sample_frames: 0,
            duration: 0.0,
        }
    }
}

impl Reader for WaveReader {
    fn open(&mut self, frames_per_block: usize) -> Result<(), AudioError> {
        let reader = hound::WavReader::open(&self.path).map_err(wav_err)?;
        let spec = reader.spec();

        if spec.sample_format == hound::SampleFormat::Float {
            return Err(AudioError::Format(
                "floating point WAV is not supported".into(),
            ));
        }
        if spec.channels == 0 {
            return Err(AudioError::Format("WaveReader channel count is 0".into()));
        }
        if spec.sample_rate == 0 {
            return Err(AudioError::Format("WaveReader sample rate is 0".into()));
        }
        if spec.bits_per_sample == 0 {
            return Err(AudioError::Format("WaveReader bit depth is 0".into()));
        }

        self.num_chans = spec.channels as usize;
        self.sample_rate = spec.sample_rate;
        self.bit_depth = spec.bits_per_sample as u32;
        self.num_sample_frames = reader.duration() as usize;
        self.duration = self.num_sample_frames as f64 / self.sample_rate as f64;
        self.read_buffer = vec![0; frames_per_block * self.num_chans];
        self.reader = Some(reader);
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
        self.num_sample_frames
    }

    fn duration(&self) -> f64 {
        self.duration
    }

    fn read_next(&mut self) -> Result<(usize, usize), AudioError> {
        let Some(reader) = self.reader.as_mut() else {
            return Err(AudioError::Format("WaveReader is not open".into()));
        };

        let mut count = 0;
        let mut samples = reader.samples::<i32>();
        while count < self.read_buffer.len() {
            match samples.next() {
                Some(sample) => {
                    self.read_buffer[count] = sample.map_err(wav_err)?;
                    count += 1;
                }
                None => break,
            }
        }

        Ok((count, count / self.num_chans))
    }

    fn extract_channel(&self, channel: usize) -> Result<Vec<i32>, AudioError> {
        if self.num_chans == 0 {
            return Err(AudioError::Format("WaveReader has no channels to extract".into()));
        }
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

    fn close(&mut self) {
        self.reader = None;
    }
}

pub struct WaveWriter {
    path: PathBuf,
    num_chans: usize,
    sample_rate: u32,
    bit_depth: u32,
    writer: Option<hound::WavWriter<std::io::BufWriter<File>>>,
    write_buffer: Vec<i32>,
    max_sample_value: i32,
}

impl WaveWriter {
    pub fn new(path: &Path, num_chans: usize, sample_rate: u32, bit_depth: u32) -> Self {
        Self {
            path: path.to_path_buf(),
            num_chans,
            sample_rate,
            bit_depth,
            writer: None,
            write_buffer: Vec::new(),
            max_sample_value: 0,
        }
    }
}

impl Writer for WaveWriter {
    fn create(&mut self, frames_per_block: usize) -> Result<(), AudioError> {
        let max_sample_value = max_signed_value(self.bit_depth).ok_or_else(|| {
            AudioError::Format(format!("unsupported bit depth {}", self.bit_depth))
        })?;

        let spec = hound::WavSpec {
            channels: self.num_chans as u16,
            sample_rate: self.sample_rate,
            bits_per_sample: self.bit_depth as u16,
            sample_format: hound::SampleFormat::Int,
        };
        let writer = hound::WavWriter::create(&self.path, spec).map_err(wav_err)?;

        self.write_buffer = vec![0; frames_per_block * self.num_chans];
        self.max_sample_value = max_sample_value;
        self.writer = Some(writer);
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
        let Some(writer) = self.writer.as_mut() else {
            return Err(AudioError::Format("WaveWriter is not open".into()));
        };

        for &sample in &self.write_buffer {
            let clipped = sample.clamp(-self.max_sample_value, self.max_sample_value);
            writer.write_sample(clipped).map_err(wav_err)?;
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), AudioError> {
        if let Some(writer) = self.writer.take() {
            writer.finalize().map_err(wav_err)?;
        }
        Ok(())
    }
}
