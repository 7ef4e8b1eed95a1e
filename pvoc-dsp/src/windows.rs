//! Analysis/synthesis window shapes and gain scaling.
//!
//! Seven classic shapes, generated at the configured window size, plus
//! the normalization pass that scales an analysis/synthesis pair for
//! unity gain across the whole fold/FFT/resynthesis loop.

use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

const TWO_PI: f64 = 2.0 * PI;

/// Length of the shared oscillator lookup table.
pub const SINE_TABLE_SIZE: usize = 8192;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowKind {
    Hamming,
    VonHann,
    Kaiser,
    Sinc,
    Triangle,
    Ramp,
    Rectangle,
}

impl WindowKind {
    pub const ALL: [WindowKind; 7] = [
        WindowKind::Hamming,
        WindowKind::VonHann,
        WindowKind::Kaiser,
        WindowKind::Sinc,
        WindowKind::Triangle,
        WindowKind::Ramp,
        WindowKind::Rectangle,
    ];

    pub fn name(self) -> &'static str {
        match self {
            WindowKind::Hamming => "hamming",
            WindowKind::VonHann => "vonhann",
            WindowKind::Kaiser => "kaiser",
            WindowKind::Sinc => "sinc",
            WindowKind::Triangle => "triangle",
            WindowKind::Ramp => "ramp",
            WindowKind::Rectangle => "rectangle",
        }
    }

    /// All window names joined for help and error text.
    pub fn names() -> String {
        Self::ALL
            .iter()
            .map(|kind| kind.name())
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn generate(self, window_size: usize) -> Vec<f64> {
        match self {
            WindowKind::Hamming => raised_cosine(window_size, 0.54),
            WindowKind::VonHann => raised_cosine(window_size, 0.5),
            WindowKind::Kaiser => kaiser(window_size),
            WindowKind::Sinc => sinc(window_size),
            WindowKind::Triangle => triangle(window_size),
            WindowKind::Ramp => ramp(window_size),
            WindowKind::Rectangle => vec![1.0; window_size],
        }
    }
}

impl FromStr for WindowKind {
    type Err = String;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "hamming" => Ok(WindowKind::Hamming),
            "vonhann" => Ok(WindowKind::VonHann),
            "kaiser" => Ok(WindowKind::Kaiser),
            "sinc" => Ok(WindowKind::Sinc),
            "triangle" => Ok(WindowKind::Triangle),
            "ramp" => Ok(WindowKind::Ramp),
            "rectangle" => Ok(WindowKind::Rectangle),
            other => Err(format!(
                "invalid window function ({other}), valid options are: {}",
                Self::names()
            )),
        }
    }
}

impl fmt::Display for WindowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Quarter-cycle cosine table backing the oscillator bank: the values
/// are `0.5 * cos`, so a unit-amplitude partial contributes at half
/// scale from each of its positive and negative frequency halves.
pub fn sine_table() -> Vec<f64> {
    (0..SINE_TABLE_SIZE)
        .map(|i| 0.5 * (i as f64 * TWO_PI / SINE_TABLE_SIZE as f64).cos())
        .collect()
}

/// Shared raised-cosine helper: `a = 0.54` is hamming, `a = 0.5` the
/// von Hann window.
fn raised_cosine(window_size: usize, a: f64) -> Vec<f64> {
    let b = 1.0 - a;
    (0..window_size)
        .map(|i| a - b * (TWO_PI * i as f64 / (window_size - 1) as f64).cos())
        .collect()
}

fn kaiser(window_size: usize) -> Vec<f64> {
    let mut window = vec![0.0; window_size];
    let half_size = window_size / 2;
    let bes = bessel_i0(6.8);
    let xind = ((window_size - 1) * (window_size - 1)) as f64;

    for i in 0..half_size {
        let x = 4.0 * (i as f64) * (i as f64);
        let x = (1.0 - x / xind).sqrt();
        window[i + half_size] = bessel_i0(6.8 * x) / bes;
        window[half_size - i] = window[i + half_size];
    }
    window[window_size - 1] = 0.0;
    window[0] = 0.0;
    window
}

fn sinc(window_size: usize) -> Vec<f64> {
    let half_size = window_size as f64 / 2.0;
    (0..window_size)
        .map(|i| {
            let x = i as f64;
            if x == half_size {
                1.0
            } else {
                window_size as f64 * (PI * (x - half_size) / half_size).sin()
                    / (2.0 * PI * (x - half_size))
            }
        })
        .collect()
}

fn triangle(window_size: usize) -> Vec<f64> {
    let mut window = vec![0.0; window_size];
    let float_size = window_size as f64;
    let mut up = true;
    let mut value = 0.0;

    for slot in window.iter_mut() {
        *slot = 2.0 * value;
        if up {
            value += 1.0 / float_size;
            if value > 0.5 {
                value = 1.0 - value;
                up = false;
            }
        } else {
            value -= 1.0 / float_size;
        }
    }
    window
}

fn ramp(window_size: usize) -> Vec<f64> {
    (0..window_size)
        .map(|i| 1.0 - i as f64 / window_size as f64)
        .collect()
}

/// Scale an analysis/synthesis window pair in place for unity gain
/// across the unmodified analysis-synthesis procedure.
///
/// When the window is longer than the FFT, both copies also get a
/// sin(x)/x factor so they reach zero at multiples of the FFT length
/// (analysis) and of the interpolation hop (synthesis) away from the
/// window center.
pub fn scale_windows(
    analysis_window: &mut [f64],
    synthesis_window: &mut [f64],
    points: usize,
    interpolation: usize,
) {
    let window_size = analysis_window.len();
    let points_float = points as f64;
    let interpolation_float = interpolation as f64;

    if window_size > points {
        let mut x = -(window_size as f64 - 1.0) / 2.0;
        for i in 0..window_size {
            if x != 0.0 {
                analysis_window[i] *=
                    points_float * (PI * x / points_float).sin() / (PI * x);
                synthesis_window[i] *=
                    interpolation_float * (PI * x / interpolation_float).sin() / (PI * x);
            }
            x += 1.0;
        }
    }

    let sum: f64 = analysis_window.iter().sum();
    let anal_factor = 2.0 / sum;
    let synth_factor = if window_size > points {
        1.0 / anal_factor
    } else {
        anal_factor
    };

    for value in analysis_window.iter_mut() {
        *value *= anal_factor;
    }
    for value in synthesis_window.iter_mut() {
        *value *= synth_factor;
    }

    if window_size <= points {
        let mut sum = 0.0;
        let mut i = 0;
        while i < window_size {
            sum += synthesis_window[i] * synthesis_window[i];
            i += interpolation;
        }

        let sum = 1.0 / sum;
        for value in synthesis_window.iter_mut() {
            *value *= sum;
        }
    }
}

/// Modified Bessel function of the first kind, order zero, by its
/// convergent series. Bounded to 25 terms with early exit once a term
/// stops contributing.
fn bessel_i0(x: f64) -> f64 {
    let y = x / 2.0;
    let threshold = 1.0e-08;
    let mut e = 1.0;
    let mut de = 1.0;

    for i in 1..=25 {
        de = de * y / i as f64;
        let sde = de * de;
        e += sde;
        if e * threshold > sde {
            break;
        }
    }
    e
}
