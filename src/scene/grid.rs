use glam::{Mat4, Vec3};

use crate::config::GridConfig;
use crate::models::LineInstance;

const CELL_LINE_WIDTH: f32 = 0.5;
const SECTION_LINE_WIDTH: f32 = 1.0;

/// A flat grid below the camera that keeps drifting toward the viewer.
#[derive(Debug)]
pub struct GridScene {
    config: GridConfig,
    /// Local segments `(start, end, is_section)`, split at every cell boundary.
    segments: Vec<(Vec3, Vec3, bool)>,
    offset: f32,
}

impl GridScene {
    pub fn new(config: GridConfig) -> Self {
        let segments = build_segments(&config);
        Self { config, segments, offset: 0.0 }
    }

    pub fn set_config(&mut self, config: GridConfig) -> bool {
        if config == self.config {
            return false;
        }
        *self = Self::new(config);
        true
    }

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Depth offset in [-0.5, 0.5).
    pub fn offset(&self) -> f32 {
        self.offset
    }

    pub fn tick(&mut self, elapsed_secs: f32) {
        self.offset = (elapsed_secs * self.config.scroll_speed).rem_euclid(1.0) - 0.5;
    }

    pub fn model_matrix(&self) -> Mat4 {
        Mat4::from_translation(Vec3::new(0.0, self.config.height, self.offset))
    }

    /// Opacity multiplier for a point `distance` away from the camera.
    pub fn fade(&self, distance: f32) -> f32 {
        let d = (distance / self.config.fade_distance).min(1.0);
        1.0 - d.powf(self.config.fade_strength)
    }

    pub fn line_instances(&self, eye: Vec3) -> Vec<LineInstance> {
        let model = self.model_matrix();
        self.segments
            .iter()
            .map(|&(start, end, is_section)| {
                let (color, width) = if is_section {
                    (self.config.section_color, SECTION_LINE_WIDTH)
                } else {
                    (self.config.cell_color, CELL_LINE_WIDTH)
                };
                let alpha_at = |p: Vec3| {
                    let fade = self.fade(model.transform_point3(p).distance(eye));
                    color.with_alpha(color.alpha() * fade).into_linear_rgba()
                };
                LineInstance {
                    start: start.to_array(),
                    end: end.to_array(),
                    width,
                    start_color: alpha_at(start),
                    end_color: alpha_at(end),
                }
            })
            .collect()
    }
}

fn grid_coordinates(half: f32, step: f32) -> Vec<f32> {
    let first = (-half / step).ceil() as i32;
    let last = (half / step).floor() as i32;
    (first..=last).map(|k| k as f32 * step).collect()
}

fn is_section_line(coord: f32, section_size: f32) -> bool {
    ((coord / section_size).round() * section_size - coord).abs() < 1e-4
}

fn build_segments(config: &GridConfig) -> Vec<(Vec3, Vec3, bool)> {
    let half_x = config.size[0] * 0.5;
    let half_z = config.size[1] * 0.5;

    let xs = grid_coordinates(half_x, config.cell_size);
    let zs = grid_coordinates(half_z, config.cell_size);

    // breakpoints along a line include the borders so the outermost cells are covered
    let with_borders = |coords: &[f32], half: f32| {
        let mut points = Vec::with_capacity(coords.len() + 2);
        points.push(-half);
        points.extend(coords.iter().copied().filter(|c| c.abs() < half));
        points.push(half);
        points
    };
    let x_breaks = with_borders(&xs, half_x);
    let z_breaks = with_borders(&zs, half_z);

    let mut segments = Vec::new();
    for &x in &xs {
        let section = is_section_line(x, config.section_size);
        segments.extend(z_breaks.windows(2).map(|w| (Vec3::new(x, 0.0, w[0]), Vec3::new(x, 0.0, w[1]), section)));
    }
    for &z in &zs {
        let section = is_section_line(z, config.section_size);
        segments.extend(x_breaks.windows(2).map(|w| (Vec3::new(w[0], 0.0, z), Vec3::new(w[1], 0.0, z), section)));
    }
    segments
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn reference_grid_layout() {
        let grid = GridScene::new(GridConfig::default());
        // 11 lines per axis, each split into 12 pieces (10 inner cells + 2 border slivers)
        assert_eq!(grid.segment_count(), 2 * 11 * 12);
        let sections = grid.line_instances(Vec3::new(0.0, 2.0, 5.0)).iter().filter(|l| l.width == SECTION_LINE_WIDTH).count();
        assert_eq!(sections, 2 * 3 * 12);
    }

    #[test]
    fn offset_wraps_every_unit() {
        let mut grid = GridScene::new(GridConfig::default());
        grid.tick(0.0);
        assert_relative_eq!(grid.offset(), -0.5);
        grid.tick(5.0);
        assert_relative_eq!(grid.offset(), 0.25, epsilon = 1e-5);
        grid.tick(1000.0);
        assert!((-0.5..0.5).contains(&grid.offset()));
    }

    #[test]
    fn fades_out_with_distance() {
        let grid = GridScene::new(GridConfig::default());
        assert_relative_eq!(grid.fade(0.0), 1.0);
        assert_relative_eq!(grid.fade(25.0), 0.0);
        assert_relative_eq!(grid.fade(100.0), 0.0);
        assert!(grid.fade(5.0) > grid.fade(10.0));
    }
}
