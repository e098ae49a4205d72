// src/driver.rs
//! Per-frame animation of the network: a slow sway, a tilt that follows the
//! pointer, and a scale pulse on hovered nodes of pulse layers.

use std::f32::consts::PI;

use glam::{Mat4, Vec2};

use crate::config::DriverConfig;

/// Pointer position normalized to [-1, 1], x to the right and y up.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PointerSample {
    pub x: f32,
    pub y: f32,
}

impl PointerSample {
    /// Normalizes a cursor position given in pixels from the top-left corner.
    pub fn from_screen(screen_pos: Vec2, viewport_size: Vec2) -> Option<Self> {
        if viewport_size.x <= 0.0 || viewport_size.y <= 0.0 {
            return None;
        }
        Some(Self {
            x: (screen_pos.x / viewport_size.x) * 2.0 - 1.0,
            y: -(screen_pos.y / viewport_size.y) * 2.0 + 1.0,
        })
    }
}

pub fn lerp(from: f32, to: f32, t: f32) -> f32 {
    from + (to - from) * t
}

#[derive(Debug, Clone)]
pub struct RotationDriver {
    config: DriverConfig,
    /// Euler angles (x, y) applied to the network group.
    rotation: Vec2,
}

impl RotationDriver {
    pub fn new(config: DriverConfig) -> Self {
        Self { config, rotation: Vec2::ZERO }
    }

    pub fn set_config(&mut self, config: DriverConfig) {
        self.config = config;
    }

    pub fn rotation(&self) -> Vec2 {
        self.rotation
    }

    /// Angles the pointer pulls the group toward.
    pub fn pointer_target(&self, pointer: PointerSample) -> Vec2 {
        let c = &self.config;
        Vec2::new(
            (pointer.y * c.pointer_gain - c.pointer_bias) * PI,
            (pointer.x * c.pointer_gain - c.pointer_bias) * PI,
        )
    }

    /// `pointer` is the last known sample; before the first cursor event it
    /// is the viewport center, so the group already leans toward the bias.
    pub fn tick(&mut self, elapsed_secs: f32, pointer: PointerSample) -> Vec2 {
        let c = &self.config;
        let sway = (elapsed_secs * c.sway_frequency).sin() * c.sway_amplitude;
        let target = self.pointer_target(pointer);
        let t = c.rotation_smoothing;

        // y restarts from the sway each frame, x accumulates
        self.rotation.x = lerp(self.rotation.x, target.x, t);
        self.rotation.y = lerp(sway, target.y, t);
        self.rotation
    }

    pub fn model_matrix(&self) -> Mat4 {
        Mat4::from_rotation_y(self.rotation.y) * Mat4::from_rotation_x(self.rotation.x)
    }
}

/// Scale of each node, converging toward the pulse scale while hovered.
#[derive(Debug, Clone)]
pub struct PulseDriver {
    scales: Vec<f32>,
}

impl PulseDriver {
    pub fn new(node_count: usize) -> Self {
        Self { scales: vec![1.0; node_count] }
    }

    pub fn scales(&self) -> &[f32] {
        &self.scales
    }

    pub fn scale(&self, node: usize) -> f32 {
        self.scales.get(node).copied().unwrap_or(1.0)
    }

    /// `pulses[i]` says whether node `i` belongs to a pulse layer; other nodes
    /// stay at scale 1.
    pub fn tick(&mut self, config: &DriverConfig, pulses: &[bool], hovered: Option<usize>) {
        if self.scales.len() != pulses.len() {
            self.scales.resize(pulses.len(), 1.0);
        }
        for (i, (scale, &pulse)) in self.scales.iter_mut().zip(pulses).enumerate() {
            if !pulse {
                continue;
            }
            let target = if hovered == Some(i) { config.pulse_scale } else { 1.0 };
            *scale = lerp(*scale, target, config.pulse_smoothing);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn pointer_normalization() {
        let viewport = Vec2::new(800.0, 600.0);
        let center = PointerSample::from_screen(Vec2::new(400.0, 300.0), viewport).unwrap();
        assert_relative_eq!(center.x, 0.0);
        assert_relative_eq!(center.y, 0.0);

        let top_left = PointerSample::from_screen(Vec2::ZERO, viewport).unwrap();
        assert_relative_eq!(top_left.x, -1.0);
        assert_relative_eq!(top_left.y, 1.0);

        assert!(PointerSample::from_screen(Vec2::ONE, Vec2::ZERO).is_none());
    }

    #[test]
    fn idle_pointer_leans_toward_bias() {
        let mut driver = RotationDriver::new(DriverConfig::default());
        let target = driver.pointer_target(PointerSample::default());
        assert_relative_eq!(target.x, -0.05 * PI, epsilon = 1e-6);
        assert_relative_eq!(target.y, -0.05 * PI, epsilon = 1e-6);

        let t = 5.0_f32;
        let rotation = driver.tick(t, PointerSample::default());
        let sway = (t * 0.1).sin() * 0.2;
        assert_relative_eq!(rotation.y, lerp(sway, target.y, 0.05), epsilon = 1e-6);
        assert_relative_eq!(rotation.x, target.x * 0.05, epsilon = 1e-6);

        for _ in 0..400 {
            driver.tick(0.0, PointerSample::default());
        }
        assert_relative_eq!(driver.rotation().x, target.x, epsilon = 1e-4);
    }

    #[test]
    fn tilt_converges_toward_pointer_target() {
        let mut driver = RotationDriver::new(DriverConfig::default());
        let pointer = PointerSample { x: 1.0, y: 1.0 };
        let target = driver.pointer_target(pointer);
        assert_relative_eq!(target.x, 0.05 * PI, epsilon = 1e-6);

        let first = driver.tick(0.0, pointer);
        assert_relative_eq!(first.x, target.x * 0.05, epsilon = 1e-6);
        for _ in 0..400 {
            driver.tick(0.0, pointer);
        }
        assert_relative_eq!(driver.rotation().x, target.x, epsilon = 1e-4);
        // y is one smoothing step from the sway toward the target
        assert_relative_eq!(driver.rotation().y, lerp(0.0, target.y, 0.05), epsilon = 1e-6);
    }

    #[test]
    fn pulse_only_affects_hovered_pulse_nodes() {
        let config = DriverConfig::default();
        let pulses = [false, true, true];
        let mut pulse = PulseDriver::new(pulses.len());

        pulse.tick(&config, &pulses, Some(1));
        assert_relative_eq!(pulse.scale(1), 1.04, epsilon = 1e-6);
        for _ in 0..200 {
            pulse.tick(&config, &pulses, Some(1));
        }
        assert_relative_eq!(pulse.scale(1), 1.4, epsilon = 1e-4);
        assert_relative_eq!(pulse.scale(2), 1.0);

        pulse.tick(&config, &pulses, Some(0));
        assert_relative_eq!(pulse.scale(0), 1.0);

        for _ in 0..200 {
            pulse.tick(&config, &pulses, None);
        }
        assert_relative_eq!(pulse.scale(1), 1.0, epsilon = 1e-4);
    }
}
