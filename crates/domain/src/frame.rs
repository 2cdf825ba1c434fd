//! Bulb frame — the 10-byte command written to the color characteristic.
//!
//! | Offset | Value | Meaning |
//! |--------|-------|---------|
//! | 0 | `0x01` | Marker |
//! | 1 | G | Green channel |
//! | 2 | `0x01` | Marker |
//! | 3 | `0x00` | Padding |
//! | 4 | `0x01` | Marker |
//! | 5 | B | Blue channel |
//! | 6 | `0x01` | Marker |
//! | 7 | R | Red channel |
//! | 8 | `0x01` | Marker |
//! | 9 | `0x00` | Padding |
//!
//! The hardware reads green and blue before red; any other order shows the
//! wrong color.

use crate::color::Color;

/// Length of every frame, in bytes.
pub const FRAME_LEN: usize = 10;

const MARKER: u8 = 0x01;
const PADDING: u8 = 0x00;
const MARKER_OFFSETS: [usize; 5] = [0, 2, 4, 6, 8];
const PADDING_OFFSETS: [usize; 2] = [3, 9];
const GREEN: usize = 1;
const BLUE: usize = 5;
const RED: usize = 7;

/// Raw bytes for one color command. Only obtainable from a [`Color`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BulbFrame([u8; FRAME_LEN]);

impl BulbFrame {
    /// Encode a color into its wire frame.
    #[must_use]
    pub const fn encode(color: Color) -> Self {
        Self([
            MARKER, color.g, MARKER, PADDING, MARKER, color.b, MARKER, color.r, MARKER, PADDING,
        ])
    }

    /// Borrow the bytes to hand to the transport.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; FRAME_LEN] {
        &self.0
    }

    /// Recover the color carried by a raw frame.
    ///
    /// Returns `None` when the length, marker, or padding bytes do not match
    /// the layout above.
    #[must_use]
    pub fn decode(bytes: &[u8]) -> Option<Color> {
        let bytes: &[u8; FRAME_LEN] = bytes.try_into().ok()?;
        let markers_ok = MARKER_OFFSETS.iter().all(|&i| bytes[i] == MARKER);
        let padding_ok = PADDING_OFFSETS.iter().all(|&i| bytes[i] == PADDING);
        (markers_ok && padding_ok).then(|| Color::new(bytes[RED], bytes[GREEN], bytes[BLUE]))
    }

    /// The color this frame encodes.
    #[must_use]
    pub fn color(&self) -> Color {
        Color::new(self.0[RED], self.0[GREEN], self.0[BLUE])
    }
}

impl From<Color> for BulbFrame {
    fn from(color: Color) -> Self {
        Self::encode(color)
    }
}

impl AsRef<[u8]> for BulbFrame {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(hex: &str) -> BulbFrame {
        BulbFrame::encode(Color::from_hex(hex).unwrap())
    }

    #[test]
    fn should_encode_black_as_markers_only() {
        assert_eq!(
            frame("#000000").as_bytes(),
            &[0x01, 0, 0x01, 0, 0x01, 0, 0x01, 0, 0x01, 0]
        );
    }

    #[test]
    fn should_place_red_after_green_and_blue() {
        let bytes = *frame("#FF0000").as_bytes();
        assert_eq!(bytes[7], 255);
        assert_eq!(bytes[1], 0);
        assert_eq!(bytes[5], 0);
    }

    #[test]
    fn should_encode_each_channel_at_its_offset() {
        let bytes = *frame("#112233").as_bytes();
        assert_eq!(
            bytes,
            [0x01, 0x22, 0x01, 0x00, 0x01, 0x33, 0x01, 0x11, 0x01, 0x00]
        );
    }

    #[test]
    fn should_keep_markers_and_padding_for_any_color() {
        for hex in ["#FFFFFF", "#800080", "#030CFF", "#0A0B0C"] {
            let bytes = *frame(hex).as_bytes();
            assert_eq!(bytes.len(), FRAME_LEN);
            for i in MARKER_OFFSETS {
                assert_eq!(bytes[i], 0x01, "marker at {i} for {hex}");
            }
            assert_eq!(bytes[3], 0x00);
            assert_eq!(bytes[9], 0x00);
        }
    }

    #[test]
    fn should_decode_encoded_frame() {
        let color = Color::new(3, 12, 255);
        let encoded = BulbFrame::encode(color);
        assert_eq!(BulbFrame::decode(encoded.as_bytes()), Some(color));
        assert_eq!(encoded.color(), color);
    }

    #[test]
    fn should_reject_frame_with_wrong_length() {
        assert_eq!(BulbFrame::decode(&[0x01, 0, 0x01]), None);
    }

    #[test]
    fn should_reject_frame_with_bad_marker() {
        let mut bytes = *frame("#FFFFFF").as_bytes();
        bytes[4] = 0x02;
        assert_eq!(BulbFrame::decode(&bytes), None);
    }

    #[test]
    fn should_reject_frame_with_bad_padding() {
        let mut bytes = *frame("#FFFFFF").as_bytes();
        bytes[9] = 0xFF;
        assert_eq!(BulbFrame::decode(&bytes), None);
    }
}
