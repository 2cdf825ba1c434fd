//! Named colors — the closed vocabulary voice input resolves against.
//!
//! Matching is exact after lowercasing. A misrecognized phrase fails with
//! [`BulbError::UnknownColorName`] instead of picking a near match.

use crate::color::Color;
use crate::error::BulbError;

/// A color reachable by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NamedColor {
    pub name: &'static str,
    pub color: Color,
}

/// Every color name the resolver accepts.
pub const NAMED_COLORS: &[NamedColor] = &[
    NamedColor {
        name: "magenta",
        color: Color::new(0x80, 0x00, 0x80),
    },
    NamedColor {
        name: "yellow",
        color: Color::new(0xFF, 0xFF, 0x00),
    },
    NamedColor {
        name: "blue",
        color: Color::new(0x03, 0x0C, 0xFF),
    },
];

/// Resolve a free-form phrase to one of [`NAMED_COLORS`].
///
/// # Errors
///
/// Returns [`BulbError::UnknownColorName`] carrying the original phrase when
/// the lowercased phrase is not exactly one of the known names.
pub fn resolve(phrase: &str) -> Result<Color, BulbError> {
    let wanted = phrase.to_lowercase();
    NAMED_COLORS
        .iter()
        .find(|named| named.name == wanted)
        .map(|named| named.color)
        .ok_or_else(|| BulbError::UnknownColorName {
            name: phrase.to_owned(),
        })
}
