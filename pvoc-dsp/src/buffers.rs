//! Sliding analysis/synthesis buffers.
//!
//! A [`SlidingBuffer`] is a fixed-length FIFO over samples: every block
//! shifts the contents left by one hop and fills the tail with new
//! data. It tracks the last position holding real input (as opposed to
//! the zero padding that follows end of file) so the driver can tell
//! when the pipeline has fully drained.

use crate::error::PvocError;

#[derive(Debug, Clone)]
pub struct SlidingBuffer {
    data: Vec<f64>,
    last_valid_sample: isize,
    has_received_data: bool,
}

impl SlidingBuffer {
    pub fn new(length: usize) -> Self {
        Self {
            data: vec![0.0; length],
            last_valid_sample: -1,
            has_received_data: false,
        }
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [f64] {
        &mut self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// True while any position still holds real input data.
    pub fn has_valid_samples(&self) -> bool {
        self.last_valid_sample >= 0
    }

    /// Shift left by `data.len()` and copy `data` into the tail. Only
    /// the first `valid_samples` of the incoming data count as real
    /// input; the positions past them are zeroed.
    pub fn shift_in(&mut self, data: &[f64], valid_samples: usize) -> Result<(), PvocError> {
        let length = self.data.len();
        let incoming = data.len();

        if valid_samples > incoming {
            return Err(PvocError::InvalidArgument(format!(
                "valid samples {valid_samples} cannot be more than shifted data length {incoming}"
            )));
        }
        if incoming > length {
            return Err(PvocError::InvalidArgument(format!(
                "attempted to shift in {incoming} samples, but the buffer only holds {length}"
            )));
        }

        self.data.copy_within(incoming.., 0);
        self.data[length - incoming..].copy_from_slice(data);

        if !self.has_received_data {
            self.last_valid_sample = (length - incoming + valid_samples) as isize - 1;
        } else {
            self.last_valid_sample -= (incoming - valid_samples) as isize;
            self.last_valid_sample = self.last_valid_sample.max(-1);
        }

        self.data[length - incoming + valid_samples..].fill(0.0);
        self.has_received_data = true;
        Ok(())
    }

    /// Shift left by `length` positions and zero-fill the tail.
    pub fn shift_over(&mut self, length: usize) -> Result<(), PvocError> {
        let buffer_length = self.data.len();

        if length > buffer_length {
            return Err(PvocError::InvalidArgument(format!(
                "attempted to shift over {length} samples, but the buffer only holds {buffer_length}"
            )));
        }

        self.data.copy_within(length.., 0);
        self.data[buffer_length - length..].fill(0.0);

        if !self.has_received_data {
            self.last_valid_sample = (buffer_length - length) as isize - 1;
        } else {
            self.last_valid_sample -= length as isize;
            self.last_valid_sample = self.last_valid_sample.max(-1);
        }

        self.has_received_data = true;
        Ok(())
    }

    /// The contents rounded to the nearest integer, for handoff to a
    /// writer.
    pub fn rounded_ints(&self) -> Vec<i32> {
        self.data.iter().map(|&sample| sample.round() as i32).collect()
    }
}
