// src/color.rs
use bevy_color::{ColorToComponents, LinearRgba, Srgba};
use serde::{Deserialize, Serialize};

use crate::error::SceneError;

/// sRGB color as written in the scene config (`"#6366F1"`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color(Srgba);

impl Color {
    /// Indigo used for first-of-three nodes and the 1→2 connections.
    pub const PRIMARY: Color = Color(Srgba::new(0x63 as f32 / 255.0, 0x66 as f32 / 255.0, 0xF1 as f32 / 255.0, 1.0));
    /// Violet used for the remaining nodes, hover, particles and grid sections.
    pub const ACCENT: Color = Color(Srgba::new(0x8B as f32 / 255.0, 0x5C as f32 / 255.0, 0xF6 as f32 / 255.0, 1.0));

    pub fn from_hex(hex: &str) -> Result<Self, SceneError> {
        Srgba::hex(hex)
            .map(Color)
            .map_err(|e| SceneError::InvalidColor(format!("{hex}: {e}")))
    }

    pub fn with_alpha(self, alpha: f32) -> Self {
        let mut srgba = self.0;
        srgba.alpha = alpha.clamp(0.0, 1.0);
        Color(srgba)
    }

    pub fn alpha(&self) -> f32 {
        self.0.alpha
    }

    pub fn into_linear_rgba(self) -> [f32; 4] {
        LinearRgba::from(self.0).to_f32_array()
    }

    pub fn into_linear_wgpu_color(self) -> wgpu::Color {
        let [r, g, b, a] = self.into_linear_rgba();
        wgpu::Color { r: r as f64, g: g as f64, b: b as f64, a: a as f64 }
    }
}

impl From<(u8, u8, u8)> for Color {
    fn from((r, g, b): (u8, u8, u8)) -> Self {
        Color(Srgba::rgb_u8(r, g, b))
    }
}

impl TryFrom<String> for Color {
    type Error = SceneError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Color::from_hex(&value)
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.0.to_hex()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn parses_palette_hex() {
        assert_eq!(Color::from_hex("#6366F1").unwrap(), Color::PRIMARY);
        assert_eq!(Color::from_hex("8B5CF6").unwrap(), Color::ACCENT);
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(Color::from_hex("#zz"), Err(SceneError::InvalidColor(_))));
    }

    #[test]
    fn alpha_is_kept_in_linear_space() {
        let rgba = Color::ACCENT.with_alpha(0.4).into_linear_rgba();
        assert_relative_eq!(rgba[3], 0.4);
        let white = Color::from((255, 255, 255)).into_linear_rgba();
        assert_relative_eq!(white[0], 1.0, epsilon = 1e-6);
    }

    #[test]
    fn serializes_as_hex_string() {
        let json = serde_json::to_string(&Color::PRIMARY).unwrap();
        let back: Color = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Color::PRIMARY);
        assert!(serde_json::from_str::<Color>("\"nope\"").is_err());
    }
}
