//! Accelerometer samples and their mapping onto color channels.

use serde::{Deserialize, Serialize};

use crate::color::Color;

/// Width of one channel step across the nominal `[-1, +1]` axis range.
const AXIS_STEP: f64 = 2.0 / 255.0;

/// One normalized 3-axis accelerometer reading.
///
/// Each axis is nominally in `[-1.0, +1.0]`; drivers may briefly overshoot.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AxisSample {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl AxisSample {
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Map x, y, z onto red, green, blue.
    #[must_use]
    pub fn to_color(self) -> Color {
        Color::new(
            axis_to_channel(self.x),
            axis_to_channel(self.y),
            axis_to_channel(self.z),
        )
    }
}

/// Map an axis value in `[-1, +1]` to a channel byte.
///
/// Computes `round((v + 1) / (2 / 255))`, clamped to `[0, 255]`. `NaN`
/// maps to `0`.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn axis_to_channel(value: f64) -> u8 {
    let scaled = ((value + 1.0) / AXIS_STEP).round();
    if scaled.is_nan() {
        return 0;
    }
    scaled.clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_map_range_ends_to_channel_ends() {
        assert_eq!(axis_to_channel(-1.0), 0);
        assert_eq!(axis_to_channel(1.0), 255);
    }

    #[test]
    fn should_map_zero_to_midpoint() {
        let mid = axis_to_channel(0.0);
        assert!((127..=129).contains(&mid), "got {mid}");
    }

    #[test]
    fn should_clamp_overshooting_values() {
        assert_eq!(axis_to_channel(-1.4), 0);
        assert_eq!(axis_to_channel(1.3), 255);
        assert_eq!(axis_to_channel(f64::INFINITY), 255);
        assert_eq!(axis_to_channel(f64::NEG_INFINITY), 0);
    }

    #[test]
    fn should_map_nan_to_zero() {
        assert_eq!(axis_to_channel(f64::NAN), 0);
    }

    #[test]
    fn should_map_axes_to_red_green_blue() {
        let color = AxisSample::new(1.0, -1.0, 1.0).to_color();
        assert_eq!(color, Color::new(255, 0, 255));
    }
}
