use std::f32::consts::TAU;

use glam::Vec3;

use crate::config::LayerSpec;

/// Node positions of one layer, in index order.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedLayer {
    pub center: Vec3,
    pub radius: f32,
    pub pulse: bool,
    pub positions: Vec<Vec3>,
}

impl LayerSpec {
    /// Places `count` nodes evenly on the circle of `radius` around `center`,
    /// in the plane perpendicular to z. Node `i` sits at angle `2π·i/count`.
    pub fn resolve(&self) -> ResolvedLayer {
        let center = Vec3::from_array(self.center);
        let positions = (0..self.count)
            .map(|i| {
                let angle = i as f32 / self.count as f32 * TAU;
                center + self.radius * Vec3::new(angle.cos(), angle.sin(), 0.0)
            })
            .collect();

        ResolvedLayer { center, radius: self.radius, pulse: self.pulse, positions }
    }
}

pub fn resolve_layers(layers: &[LayerSpec]) -> Vec<ResolvedLayer> {
    layers.iter().map(LayerSpec::resolve).collect()
}
