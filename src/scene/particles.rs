use glam::{Mat4, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::ParticleConfig;
use crate::models::SphereInstance;

/// Ambient cloud of points slowly turning around the origin.
#[derive(Debug)]
pub struct ParticleField {
    config: ParticleConfig,
    positions: Vec<Vec3>,
    rotation: Vec3,
}

impl ParticleField {
    pub fn new(config: ParticleConfig) -> Self {
        let positions = match config.seed {
            Some(seed) => scatter(&mut StdRng::seed_from_u64(seed), config.count, config.extent),
            None => scatter(&mut rand::thread_rng(), config.count, config.extent),
        };
        log::debug!("Scattered {} particles", positions.len());
        Self { config, positions, rotation: Vec3::ZERO }
    }

    /// Regenerates the cloud only when the config differs.
    pub fn set_config(&mut self, config: ParticleConfig) -> bool {
        if config == self.config {
            return false;
        }
        *self = Self::new(config);
        true
    }

    pub fn set_count(&mut self, count: u32) -> bool {
        let config = ParticleConfig { count, ..self.config.clone() };
        self.set_config(config)
    }

    pub fn config(&self) -> &ParticleConfig {
        &self.config
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn tick(&mut self, elapsed_secs: f32) {
        let time = elapsed_secs * 0.1;
        self.rotation = Vec3::new(time * 0.05, time * 0.075, 0.0);
    }

    pub fn rotation(&self) -> Vec3 {
        self.rotation
    }

    pub fn model_matrix(&self) -> Mat4 {
        Mat4::from_rotation_y(self.rotation.y) * Mat4::from_rotation_x(self.rotation.x)
    }

    pub fn sphere_instances(&self) -> Vec<SphereInstance> {
        let color = self.config.color.with_alpha(self.config.opacity).into_linear_rgba();
        // size is a diameter, like a point sprite
        let radius = self.config.size * 0.5;
        self.positions
            .iter()
            .map(|p| SphereInstance { position: p.to_array(), radius, color })
            .collect()
    }
}

fn scatter(rng: &mut impl Rng, count: u32, extent: f32) -> Vec<Vec3> {
    let half = extent * 0.5;
    (0..count)
        .map(|_| Vec3::new(rng.gen_range(-half..half), rng.gen_range(-half..half), rng.gen_range(-half..half)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn seeded(seed: u64) -> ParticleConfig {
        ParticleConfig { seed: Some(seed), ..ParticleConfig::default() }
    }

    #[test]
    fn particles_stay_inside_the_cube() {
        let field = ParticleField::new(ParticleConfig::default());
        assert_eq!(field.positions().len(), 500);
        assert!(field.positions().iter().all(|p| p.abs().max_element() <= 7.5));
    }

    #[test]
    fn seeded_fields_repeat() {
        let a = ParticleField::new(seeded(7));
        let b = ParticleField::new(seeded(7));
        let c = ParticleField::new(seeded(8));
        assert_eq!(a.positions(), b.positions());
        assert_ne!(a.positions(), c.positions());
    }

    #[test]
    fn count_change_regenerates() {
        let mut field = ParticleField::new(seeded(1));
        assert!(!field.set_count(500));
        assert!(field.set_count(12));
        assert_eq!(field.sphere_instances().len(), 12);
    }

    #[test]
    fn rotation_is_slow_and_linear() {
        let mut field = ParticleField::new(ParticleConfig { count: 0, ..ParticleConfig::default() });
        field.tick(100.0);
        assert_relative_eq!(field.rotation().x, 0.5, epsilon = 1e-6);
        assert_relative_eq!(field.rotation().y, 0.75, epsilon = 1e-6);
    }
}
