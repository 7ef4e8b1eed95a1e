//! Streaming phase-vocoder core.
//!
//! The pipeline slides an analysis window over the input in hops of
//! `decimation` samples, folds each grain into a real FFT, works on the
//! polar spectrum, and resynthesizes in hops of `interpolation` samples:
//! time stretching via phase propagation and overlap-add, pitch shifting
//! via an additive oscillator bank. [`Pvoc`] holds the configuration and
//! drives the whole per-block loop over a [`pvoc_audioio::Reader`] and
//! [`pvoc_audioio::Writer`] pair.

mod buffers;
mod error;
mod fft;
mod phase;
mod planner;
mod processor;
mod spectrum;
mod synth;
mod windows;

pub use buffers::SlidingBuffer;
pub use error::PvocError;
pub use fft::{Direction, Fft};
pub use phase::phase_interpolate;
pub use processor::{overlap_add, window_fold, Operation, Pvoc, MAX_BANDS};
pub use spectrum::{cart_to_polar, polar_to_cart, simple_spectral_gate};
pub use synth::add_synth;
pub use windows::{scale_windows, sine_table, WindowKind, SINE_TABLE_SIZE};
