//! Observable controller state — what the UI renders.

use serde::Serialize;

use lumibulb_domain::color::Color;
use lumibulb_domain::connection::ConnectionState;

/// Snapshot of everything the UI shows about the bulb and its inputs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BulbControlState {
    /// Currently displayed color, `None` when the color box is hidden.
    pub color: Option<Color>,
    /// `#rrggbb` of [`color`](Self::color).
    pub hex: Option<String>,
    /// `rgb(r, g, b)` of [`color`](Self::color).
    pub rgb: Option<String>,
    pub recording: bool,
    pub streaming: bool,
    pub connection: ConnectionState,
    pub speech_available: bool,
    pub microphone_granted: bool,
}

impl BulbControlState {
    /// Show `color` and its derived strings.
    pub fn show(&mut self, color: Color) {
        self.color = Some(color);
        self.hex = Some(color.to_hex());
        self.rgb = Some(color.to_rgb_string());
    }

    /// Hide the color box.
    pub fn clear(&mut self) {
        self.color = None;
        self.hex = None;
        self.rgb = None;
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_start_hidden_and_disconnected() {
        let state = BulbControlState::default();
        assert_eq!(state.color, None);
        assert!(!state.recording);
        assert!(!state.streaming);
        assert!(!state.is_connected());
    }

    #[test]
    fn should_derive_strings_when_showing_color() {
        let mut state = BulbControlState::default();
        state.show(Color::new(128, 0, 128));
        assert_eq!(state.hex.as_deref(), Some("#800080"));
        assert_eq!(state.rgb.as_deref(), Some("rgb(128, 0, 128)"));

        state.clear();
        assert_eq!(state.hex, None);
        assert_eq!(state.rgb, None);
    }

    #[test]
    fn should_serialize_for_display() {
        let mut state = BulbControlState::default();
        state.show(Color::new(255, 255, 0));
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["color"], "#ffff00");
        assert_eq!(json["connection"], "disconnected");
    }
}
