//! Frame-oriented AIFF/WAV file access for the phase vocoder.
//!
//! The processing core never touches containers directly: it consumes a
//! [`Reader`] that hands out blocks of interleaved integer samples and a
//! [`Writer`] that accepts them back. Input format is detected from the
//! file's magic bytes, output format from the requested file extension.

mod aiff;
mod wave;

pub use aiff::{AiffReader, AiffWriter};
pub use wave::{WaveReader, WaveWriter};

use std::fs::File;
use std::io::Read;
use std::path::Path;

use thiserror::Error;

/// Errors raised by the audio file layer.
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Format(String),
    #[error("requested channel ({requested}) is out of bounds 0-{last}")]
    ChannelOutOfBounds { requested: usize, last: usize },
    #[error("data to interleave will not fit exactly into the write buffer")]
    InterleaveLength,
}

/// Largest positive sample value for a supported PCM bit depth.
pub fn max_signed_value(bit_depth: u32) -> Option<i32> {
    match bit_depth {
        8 => Some(127),
        16 => Some(32_767),
        24 => Some(8_388_607),
        32 => Some(2_147_483_647),
        _ => None,
    }
}

/// Block reader over a PCM audio file.
///
/// `open` must be called before anything else; it parses the header,
/// validates the stream parameters and sizes the read buffer to
/// `frames_per_block` frames.
pub trait Reader: Send {
    fn open(&mut self, frames_per_block: usize) -> Result<(), AudioError>;
    fn num_chans(&self) -> usize;
    fn sample_rate(&self) -> u32;
    fn bit_depth(&self) -> u32;
    fn num_sample_frames(&self) -> usize;
    /// Input length in seconds.
    fn duration(&self) -> f64;
    /// Read the next block into the internal buffer. Returns the number
    /// of samples read across all channels and the number of frames per
    /// channel; (0, 0) once the file is exhausted.
    fn read_next(&mut self) -> Result<(usize, usize), AudioError>;
    /// Deinterleaved copy of one channel of the most recently read
    /// block, always one full block long. Callers track how many of the
    /// leading samples are valid via the `read_next` frame count.
    fn extract_channel(&self, channel: usize) -> Result<Vec<i32>, AudioError>;
    fn close(&mut self);
}

/// Block writer producing a PCM audio file.
pub trait Writer: Send {
    /// Create (or truncate) the file and size the interleave buffer to
    /// `frames_per_block` frames. Stream parameters were fixed at
    /// construction.
    fn create(&mut self, frames_per_block: usize) -> Result<(), AudioError>;
    fn zero_write_buffer(&mut self);
    /// Scatter one channel's samples across the interleave buffer.
    /// `data` must be exactly one block long.
    fn interleave_channel(&mut self, channel: usize, data: &[i32]) -> Result<(), AudioError>;
    /// Encode one block. Samples beyond the bit-depth maximum are
    /// silently clamped, never reported as errors.
    fn write_next(&mut self) -> Result<(), AudioError>;
    /// Finalize headers and close the file.
    fn close(&mut self) -> Result<(), AudioError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Aiff,
    Wave,
}

/// Sniff the container from the first twelve bytes of the file:
/// `FORM`/`AIFF` or `RIFF`/`WAVE`.
pub fn file_type(path: &Path) -> Result<FileType, AudioError> {
    let mut file = File::open(path)?;
    let mut header = [0u8; 12];
    file.read_exact(&mut header)
        .map_err(|_| AudioError::Format("invalid file type".into()))?;

    if &header[..4] == b"FORM" && &header[8..] == b"AIFF" {
        Ok(FileType::Aiff)
    } else if &header[..4] == b"RIFF" && &header[8..] == b"WAVE" {
        Ok(FileType::Wave)
    } else {
        Err(AudioError::Format("invalid file type".into()))
    }
}

/// Pick the output container from the file extension, case-insensitive.
/// The file does not have to exist.
pub fn file_type_from_extension(path: &Path) -> Result<FileType, AudioError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match extension.as_deref() {
        Some("aif") | Some("aiff") => Ok(FileType::Aiff),
        Some("wav") | Some("wave") => Ok(FileType::Wave),
        _ => Err(AudioError::Format("invalid file type".into())),
    }
}

/// Construct the reader matching the file's magic bytes.
pub fn reader_for_path(path: &Path) -> Result<Box<dyn Reader>, AudioError> {
    match file_type(path)? {
        FileType::Aiff => Ok(Box::new(AiffReader::new(path))),
        FileType::Wave => Ok(Box::new(WaveReader::new(path))),
    }
}

/// Construct the writer matching the output extension. The stream
/// parameters are fixed here; the file itself is created by
/// [`Writer::create`].
pub fn writer_for_path(
    path: &Path,
    num_chans: usize,
    sample_rate: u32,
    bit_depth: u32,
) -> Result<Box<dyn Writer>, AudioError> {
    match file_type_from_extension(path)? {
        FileType::Aiff => Ok(Box::new(AiffWriter::new(path, num_chans, sample_rate, bit_depth))),
        FileType::Wave => Ok(Box::new(WaveWriter::new(path, num_chans, sample_rate, bit_depth))),
    }
}
