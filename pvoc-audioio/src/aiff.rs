//! AIFF block reader/writer.
//!
//! The container is simple enough to handle directly: a `FORM`/`AIFF`
//! envelope, a `COMM` chunk with the stream parameters (sample rate as
//! an 80-bit extended float) and an `SSND` chunk of big-endian signed
//! PCM. Chunk sizes are patched on close once the frame count is known.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::{max_signed_value, AudioError, Reader, Writer};

const FORM_HEADER_SIZE: u32 = 12;
const COMM_BODY_SIZE: u32 = 18;
const SSND_HEADER_SIZE: u32 = 16;

/// Encode a sample rate as an 80-bit IEEE 754 extended float: a 15-bit
/// biased exponent followed by a 64-bit mantissa with an explicit
/// leading one.
fn encode_sample_rate(rate: u32) -> [u8; 10] {
    let mut out = [0u8; 10];
    if rate == 0 {
        return out;
    }

    let mut mantissa = rate as u64;
    let shift = mantissa.leading_zeros() as u16;
    mantissa <<= shift;
    let exponent: u16 = 16383 + 63 - shift;

    out[0..2].copy_from_slice(&exponent.to_be_bytes());
    out[2..10].copy_from_slice(&mantissa.to_be_bytes());
    out
}

fn decode_sample_rate(bytes: &[u8; 10]) -> u32 {
    let exponent = u16::from_be_bytes([bytes[0] & 0x7f, bytes[1]]) as i32;
    let mut mantissa_bytes = [0u8; 8];
    mantissa_bytes.copy_from_slice(&bytes[2..10]);
    let mantissa = u64::from_be_bytes(mantissa_bytes);

    if exponent == 0 && mantissa == 0 {
        return 0;
    }

    let shift = 16383 + 63 - exponent;
    if !(0..64).contains(&shift) {
        return 0;
    }
    (mantissa >> shift) as u32
}

/// Read as many bytes as the source can produce, tolerating a short
/// final block.
fn read_full(reader: &mut impl Read, buffer: &mut [u8]) -> Result<usize, AudioError> {
    let mut filled = 0;
    while filled < buffer.len() {
        let count = reader.read(&mut buffer[filled..])?;
        if count == 0 {
            break;
        }
        filled += count;
    }
    Ok(filled)
}

pub struct AiffReader {
    path: PathBuf,
    file: Option<BufReader<File>>,
    read_buffer: Vec<i32>,
    num_chans: usize,
    sample_rate: u32,
    bit_depth: u32,
    num_sample_frames: usize,
    duration: f64,
    frames_remaining: usize,
    bytes_per_sample: usize,
    frames_per_block: usize,
}

impl AiffReader {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            file: None,
            read_buffer: Vec::new(),
            num_chans: 0,
            sample_rate: 0,
            bit_depth: 0,
            num_sample_frames: 0,
            duration: 0.0,
            frames_remaining: 0,
            bytes_per_sample: 0,
            frames_per_block: 0,
        }
    }
}

impl Reader for AiffReader {
    fn open(&mut self, frames_per_block: usize) -> Result<(), AudioError> {
        let mut file = BufReader::new(File::open(&self.path)?);

        let mut header = [0u8; 12];
        file.read_exact(&mut header)?;
        if &header[..4] != b"FORM" || &header[8..] != b"AIFF" {
            return Err(AudioError::Format("invalid file type".into()));
        }

        let mut comm = None;
        let mut data_position = None;

        loop {
            let mut chunk = [0u8; 8];
            if file.read_exact(&mut chunk).is_err() {
                break;
            }
            let size = u32::from_be_bytes([chunk[4], chunk[5], chunk[6], chunk[7]]) as u64;
            let padded = size + size % 2;

            match &chunk[..4] {
                b"COMM" => {
                    let mut body = [0u8; 18];
                    file.read_exact(&mut body)?;

                    let num_chans = u16::from_be_bytes([body[0], body[1]]) as usize;
                    let num_frames =
                        u32::from_be_bytes([body[2], body[3], body[4], body[5]]) as usize;
                    let sample_size = u16::from_be_bytes([body[6], body[7]]) as u32;
                    let mut rate_bytes = [0u8; 10];
                    rate_bytes.copy_from_slice(&body[8..18]);
                    let sample_rate = decode_sample_rate(&rate_bytes);

                    comm = Some((num_chans, num_frames, sample_size, sample_rate));
                    if padded > 18 {
                        file.seek(SeekFrom::Current((padded - 18) as i64))?;
                    }
                }
                b"SSND" => {
                    let mut body = [0u8; 8];
                    file.read_exact(&mut body)?;
                    let offset =
                        u32::from_be_bytes([body[0], body[1], body[2], body[3]]) as u64;
                    data_position = Some(file.stream_position()? + offset);
                    file.seek(SeekFrom::Current(padded as i64 - 8))?;
                }
                _ => {
                    file.seek(SeekFrom::Current(padded as i64))?;
                }
            }
        }

        let Some((num_chans, num_frames, sample_size, sample_rate)) = comm else {
            return Err(AudioError::Format("AIFF file is missing a COMM chunk".into()));
        };
        let Some(data_position) = data_position else {
            return Err(AudioError::Format("AIFF file is missing an SSND chunk".into()));
        };

        if num_chans == 0 {
            return Err(AudioError::Format("AiffReader channel count is 0".into()));
        }
        if sample_rate == 0 {
            return Err(AudioError::Format("AiffReader sample rate is 0".into()));
        }
        if sample_size == 0 {
            return Err(AudioError::Format("AiffReader bit depth is 0".into()));
        }

        file.seek(SeekFrom::Start(data_position))?;

        self.num_chans = num_chans;
        self.sample_rate = sample_rate;
        self.bit_depth = sample_size;
        self.num_sample_frames = num_frames;
        self.duration = num_frames as f64 / sample_rate as f64;
        self.frames_remaining = num_frames;
        self.bytes_per_sample = ((sample_size + 7) / 8) as usize;
        self.frames_per_block = frames_per_block;
        self.read_buffer = vec![0; frames_per_block * num_chans];
        self.file = Some(file);
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
        let Some(file) = self.file.as_mut() else {
            return Err(AudioError::Format("AiffReader is not open".into()));
        };

        let frames_wanted = self.frames_per_block.min(self.frames_remaining);
        if frames_wanted == 0 {
            return Ok((0, 0));
        }

        let frame_bytes = self.num_chans * self.bytes_per_sample;
        let mut bytes = vec![0u8; frames_wanted * frame_bytes];
        let filled = read_full(file, &mut bytes)?;
        let frames = filled / frame_bytes;

        for (index, chunk) in bytes[..frames * frame_bytes]
            .chunks_exact(self.bytes_per_sample)
            .enumerate()
        {
            // big-endian signed, sign extended from the top byte
            let mut value = (chunk[0] as i8) as i32;
            for &byte in &chunk[1..] {
                value = (value << 8) | byte as i32;
            }
            self.read_buffer[index] = value;
        }

        self.frames_remaining -= frames;
        Ok((frames * self.num_chans, frames))
    }

    fn extract_channel(&self, channel: usize) -> Result<Vec<i32>, AudioError> {
        if self.num_chans == 0 {
            return Err(AudioError::Format("AiffReader has no channels to extract".into()));
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
        self.file = None;
    }
}

pub struct AiffWriter {
    path: PathBuf,
    num_chans: usize,
    sample_rate: u32,
    bit_depth: u32,
    file: Option<File>,
    write_buffer: Vec<i32>,
    frames_written: usize,
    bytes_per_sample: usize,
    max_sample_value: i32,
}

impl AiffWriter {
    pub fn new(path: &Path, num_chans: usize, sample_rate: u32, bit_depth: u32) -> Self {
        Self {
            path: path.to_path_buf(),
            num_chans,
            sample_rate,
            bit_depth,
            file: None,
            write_buffer: Vec::new(),
            frames_written: 0,
            bytes_per_sample: 0,
            max_sample_value: 0,
        }
    }
}

impl Writer for AiffWriter {
    fn create(&mut self, frames_per_block: usize) -> Result<(), AudioError> {
        let max_sample_value = max_signed_value(self.bit_depth).ok_or_else(|| {
            AudioError::Format(format!("unsupported bit depth {}", self.bit_depth))
        })?;

        let mut file = File::create(&self.path)?;

        // FORM envelope and COMM with a zero frame count; both sizes
        // are patched in close().
        file.write_all(b"FORM")?;
        file.write_all(&0u32.to_be_bytes())?;
        file.write_all(b"AIFF")?;

        file.write_all(b"COMM")?;
        file.write_all(&COMM_BODY_SIZE.to_be_bytes())?;
        file.write_all(&(self.num_chans as u16).to_be_bytes())?;
        file.write_all(&0u32.to_be_bytes())?;
        file.write_all(&(self.bit_depth as u16).to_be_bytes())?;
        file.write_all(&encode_sample_rate(self.sample_rate))?;

        file.write_all(b"SSND")?;
        file.write_all(&8u32.to_be_bytes())?;
        file.write_all(&0u32.to_be_bytes())?;
        file.write_all(&0u32.to_be_bytes())?;

        self.write_buffer = vec![0; frames_per_block * self.num_chans];
        self.frames_written = 0;
        self.bytes_per_sample = ((self.bit_depth + 7) / 8) as usize;
        self.max_sample_value = max_sample_value;
        self.file = Some(file);
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
        let Some(file) = self.file.as_mut() else {
            return Err(AudioError::Format("AiffWriter is not open".into()));
        };

        let mut bytes = Vec::with_capacity(self.write_buffer.len() * self.bytes_per_sample);
        for &sample in &self.write_buffer {
            let clipped = sample.clamp(-self.max_sample_value, self.max_sample_value);
            let encoded = clipped.to_be_bytes();
            bytes.extend_from_slice(&encoded[4 - self.bytes_per_sample..]);
        }
        file.write_all(&bytes)?;

        self.frames_written += self.write_buffer.len() / self.num_chans;
        Ok(())
    }

    fn close(&mut self) -> Result<(), AudioError> {
        let Some(mut file) = self.file.take() else {
            return Ok(());
        };

        let data_len = (self.frames_written * self.num_chans * self.bytes_per_sample) as u32;
        let mut pad = 0u32;
        if data_len % 2 == 1 {
            file.write_all(&[0])?;
            pad = 1;
        }

        let form_size = FORM_HEADER_SIZE - 8
            + 8
            + COMM_BODY_SIZE
            + 8
            + SSND_HEADER_SIZE - 8
            + data_len
            + pad;
        file.seek(SeekFrom::Start(4))?;
        file.write_all(&form_size.to_be_bytes())?;

        // COMM frame count lives right after the channel count
        file.seek(SeekFrom::Start(22))?;
        file.write_all(&(self.frames_written as u32).to_be_bytes())?;

        // SSND chunk size covers its offset/block-size fields plus data
        file.seek(SeekFrom::Start(42))?;
        file.write_all(&(8 + data_len).to_be_bytes())?;

        file.flush()?;
        Ok(())
    }
}
