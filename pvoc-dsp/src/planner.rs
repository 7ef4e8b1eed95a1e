//! Hop-size selection for time-scale modification.
//!
//! The achieved scale factor is always a ratio of two integer hop
//! sizes. The planner scans candidate hops from the largest usable
//! value (an eighth of the window) downward and keeps the ratio closest
//! to the request, stopping early once it is within one percent.

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct TimeScaleData {
    pub scale_factor: f64,
    pub decimation: usize,
    pub interpolation: usize,
    pub rate_limited: bool,
}

pub(crate) fn compute_time_scale_data(window_size: usize, scale_factor: f64) -> TimeScaleData {
    let max_rate = window_size / 8;

    let mut min_percent_error = -1.0f64;
    let mut best_interpolation = 0;
    let mut best_decimation = 0;
    let mut new_scale_factor = 1.0;

    if scale_factor > 1.0 {
        for interpolation in (1..=max_rate).rev() {
            let decimation = (((interpolation as f64) / scale_factor).floor() as usize).max(1);
            let temp_scale_factor = interpolation as f64 / decimation as f64;

            let percent_error = if temp_scale_factor > scale_factor {
                temp_scale_factor / scale_factor
            } else {
                scale_factor / temp_scale_factor
            };

            if min_percent_error < 0.0 || percent_error < min_percent_error {
                min_percent_error = percent_error;
                best_decimation = decimation;
                best_interpolation = interpolation;
                new_scale_factor = temp_scale_factor;

                // good enough, don't look further
                if percent_error < 1.01 {
                    break;
                }
            }
        }
    } else {
        for decimation in (1..=max_rate).rev() {
            let interpolation = (((decimation as f64) * scale_factor).floor() as usize).max(1);
            let temp_scale_factor = interpolation as f64 / decimation as f64;

            let percent_error = if temp_scale_factor > scale_factor {
                temp_scale_factor / scale_factor
            } else {
                scale_factor / temp_scale_factor
            };

            if min_percent_error < 0.0 || percent_error < min_percent_error {
                min_percent_error = percent_error;
                best_decimation = decimation;
                best_interpolation = interpolation;
                new_scale_factor = temp_scale_factor;

                // good enough, don't look further
                if percent_error < 1.01 {
                    break;
                }
            }
        }
    }

    // the request was out of reach if the best pick sits at the rate
    // ceiling and the requested factor lies beyond what that ceiling
    // can express
    let mut rate_limited = false;
    if scale_factor > 1.0 && best_interpolation == max_rate {
        rate_limited = scale_factor > max_rate as f64;
    } else if scale_factor < 1.0 && best_decimation == max_rate {
        rate_limited = scale_factor < 1.0 / max_rate as f64;
    }

    TimeScaleData {
        scale_factor: new_scale_factor,
        decimation: best_decimation,
        interpolation: best_interpolation,
        rate_limited,
    }
}
