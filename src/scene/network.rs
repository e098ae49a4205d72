use glam::{Mat4, Vec2, Vec3};

use crate::camera::Camera;
use crate::color::Color;
use crate::config::NetworkConfig;
use crate::models::{LineInstance, SphereInstance};

use super::edge::{sample_edges, Edge};
use super::layer::{resolve_layers, ResolvedLayer};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Node {
    pub layer: usize,
    pub index: usize,
    pub position: Vec3,
    pub color: Color,
    pub pulse: bool,
}

/// Nodes and connections resolved from a `NetworkConfig`.
#[derive(Debug, Clone, Default)]
pub struct NetworkGeometry {
    pub layers: Vec<ResolvedLayer>,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl NetworkGeometry {
    pub fn build(config: &NetworkConfig) -> Self {
        let layers = resolve_layers(&config.layers);

        let nodes = layers
            .iter()
            .enumerate()
            .flat_map(|(layer_idx, layer)| {
                layer.positions.iter().enumerate().map(move |(index, &position)| Node {
                    layer: layer_idx,
                    index,
                    position,
                    color: if index % 3 == 0 { config.node_color } else { config.node_alt_color },
                    pulse: layer.pulse,
                })
            })
            .collect();

        let edges = layers
            .windows(2)
            .enumerate()
            .filter_map(|(k, pair)| config.edge_rule(k).map(|rule| sample_edges(&pair[0], &pair[1], rule)))
            .flatten()
            .collect();

        Self { layers, nodes, edges }
    }

    pub fn pulse_flags(&self) -> Vec<bool> {
        self.nodes.iter().map(|n| n.pulse).collect()
    }
}

/// The hero network. Geometry is rebuilt only when the config changes.
#[derive(Debug)]
pub struct NetworkScene {
    config: NetworkConfig,
    geometry: NetworkGeometry,
    pulses: Vec<bool>,
}

impl NetworkScene {
    pub fn new(config: NetworkConfig) -> Self {
        let geometry = NetworkGeometry::build(&config);
        log::debug!("Built network: {} nodes, {} edges", geometry.nodes.len(), geometry.edges.len());
        let pulses = geometry.pulse_flags();
        Self { config, geometry, pulses }
    }

    /// Returns `true` if the geometry was rebuilt.
    pub fn set_config(&mut self, config: NetworkConfig) -> bool {
        if config == self.config {
            return false;
        }
        *self = Self::new(config);
        true
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    pub fn geometry(&self) -> &NetworkGeometry {
        &self.geometry
    }

    pub fn pulse_flags(&self) -> &[bool] {
        &self.pulses
    }

    /// Node under `screen_pos`, if any. When several overlap the one nearest
    /// the camera wins.
    pub fn pick(&self, camera: &Camera, model: Mat4, scales: &[f32], screen_pos: Vec2) -> Option<usize> {
        self.geometry
            .nodes
            .iter()
            .enumerate()
            .filter_map(|(i, node)| {
                let world = model.transform_point3(node.position);
                let center = camera.world_to_screen(world)?;
                let scale = scales.get(i).copied().unwrap_or(1.0);
                let radius = camera.world_radius_to_screen_pixels(self.config.node_radius * scale, world);
                (center.distance(screen_pos) <= radius).then(|| (i, camera.view_depth(world)))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, _)| i)
    }

    pub fn sphere_instances(&self, scales: &[f32], hovered: Option<usize>) -> Vec<SphereInstance> {
        self.geometry
            .nodes
            .iter()
            .enumerate()
            .map(|(i, node)| {
                let color = if hovered == Some(i) { self.config.hover_color } else { node.color };
                SphereInstance {
                    position: node.position.to_array(),
                    radius: self.config.node_radius * scales.get(i).copied().unwrap_or(1.0),
                    color: color.into_linear_rgba(),
                }
            })
            .collect()
    }

    /// Sphere instances ordered farthest first, so alpha-blended billboards
    /// overlap like depth-tested geometry.
    pub fn sorted_sphere_instances(
        &self,
        camera: &Camera,
        model: Mat4,
        scales: &[f32],
        hovered: Option<usize>,
    ) -> Vec<SphereInstance> {
        let mut instances = self.sphere_instances(scales, hovered);
        sort_back_to_front(&mut instances, camera, model);
        instances
    }

    pub fn line_instances(&self) -> Vec<LineInstance> {
        self.geometry
            .edges
            .iter()
            .map(|edge| {
                let color = edge.style.color.with_alpha(edge.style.opacity).into_linear_rgba();
                LineInstance {
                    start: edge.start.to_array(),
                    end: edge.end.to_array(),
                    width: edge.style.width,
                    start_color: color,
                    end_color: color,
                }
            })
            .collect()
    }
}

pub fn sort_back_to_front(instances: &mut [SphereInstance], camera: &Camera, model: Mat4) {
    instances.sort_by(|a, b| {
        let depth_a = camera.view_depth(model.transform_point3(Vec3::from(a.position)));
        let depth_b = camera.view_depth(model.transform_point3(Vec3::from(b.position)));
        depth_b.total_cmp(&depth_a)
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CameraConfig, LayerSpec};

    #[test]
    fn reference_network_shape() {
        let scene = NetworkScene::new(NetworkConfig::default());
        let geometry = scene.geometry();
        assert_eq!(geometry.nodes.len(), 18);
        assert_eq!(geometry.edges.len(), 31);
        assert_eq!(scene.pulse_flags().iter().filter(|&&p| p).count(), 8);
        assert_eq!(geometry.nodes[0].color, Color::PRIMARY);
        assert_eq!(geometry.nodes[1].color, Color::ACCENT);
        assert_eq!(geometry.nodes[6].layer, 1);
        assert_eq!(geometry.nodes[6].index, 0);
    }

    #[test]
    fn set_config_is_memoized() {
        let mut scene = NetworkScene::new(NetworkConfig::default());
        assert!(!scene.set_config(NetworkConfig::default()));

        let mut config = NetworkConfig::default();
        config.layers.push(LayerSpec { center: [8.0, 0.0, 0.0], count: 2, radius: 1.0, pulse: false });
        assert!(scene.set_config(config));
        assert_eq!(scene.geometry().nodes.len(), 20);
        // the 2→3 pair reuses the last rule
        assert_eq!(scene.geometry().edges.len(), 31 + 4);
    }

    #[test]
    fn picks_node_under_cursor() {
        let config = NetworkConfig::default();
        let camera = Camera::new(&config.camera, 800, 600);
        let scene = NetworkScene::new(config);
        let scales = vec![1.0; scene.geometry().nodes.len()];

        // node 2 of the middle layer sits at (0, 2.5, 0)
        let target = camera.world_to_screen(Vec3::new(0.0, 2.5, 0.0)).unwrap();
        assert_eq!(scene.pick(&camera, Mat4::IDENTITY, &scales, target), Some(8));
        assert_eq!(scene.pick(&camera, Mat4::IDENTITY, &scales, Vec2::new(5.0, 5.0)), None);
    }

    /// Two single-node layers on the view axis, `near` closer to the camera.
    fn stacked_nodes() -> (NetworkScene, Camera) {
        let config = NetworkConfig {
            layers: vec![
                LayerSpec { center: [0.0, 0.0, 0.0], count: 1, radius: 0.0, pulse: false },
                LayerSpec { center: [0.0, 0.0, 2.0], count: 1, radius: 0.0, pulse: false },
            ],
            ..NetworkConfig::default()
        };
        let camera = Camera::new(&config.camera, 800, 600);
        (NetworkScene::new(config), camera)
    }

    #[test]
    fn overlapping_nodes_pick_the_nearest() {
        let (scene, camera) = stacked_nodes();
        let scales = [1.0, 1.0];
        let center = camera.world_to_screen(Vec3::ZERO).unwrap();
        assert!(camera.view_depth(Vec3::new(0.0, 0.0, 2.0)) < camera.view_depth(Vec3::ZERO));
        assert_eq!(scene.pick(&camera, Mat4::IDENTITY, &scales, center), Some(1));

        // turned around, the first layer is in front
        let flipped = Mat4::from_rotation_y(std::f32::consts::PI);
        assert_eq!(scene.pick(&camera, flipped, &scales, center), Some(0));
    }

    #[test]
    fn spheres_are_drawn_back_to_front() {
        let (scene, camera) = stacked_nodes();
        let sorted = scene.sorted_sphere_instances(&camera, Mat4::IDENTITY, &[1.0, 1.0], None);
        assert_eq!(sorted[0].position, [0.0, 0.0, 0.0]);
        assert_eq!(sorted[1].position, [0.0, 0.0, 2.0]);

        let flipped = Mat4::from_rotation_y(std::f32::consts::PI);
        let sorted = scene.sorted_sphere_instances(&camera, flipped, &[1.0, 1.0], None);
        assert_eq!(sorted[0].position, [0.0, 0.0, 2.0]);
    }

    #[test]
    fn hovered_node_is_recolored_and_scaled() {
        let scene = NetworkScene::new(NetworkConfig::default());
        let mut scales = vec![1.0; 18];
        scales[7] = 1.4;
        let instances = scene.sphere_instances(&scales, Some(7));
        assert_eq!(instances[7].color, Color::ACCENT.into_linear_rgba());
        assert!((instances[7].radius - 0.28).abs() < 1e-6);
        assert_eq!(instances[0].radius, 0.2);
    }

    #[test]
    fn lines_carry_edge_opacity() {
        let scene = NetworkScene::new(NetworkConfig::default());
        let lines = scene.line_instances();
        assert_eq!(lines.len(), 31);
        assert!(lines.iter().all(|l| (l.start_color[3] - 0.4).abs() < 1e-6));
    }

    #[test]
    fn single_layer_has_no_edges() {
        let config = NetworkConfig {
            layers: vec![LayerSpec { center: [0.0; 3], count: 5, radius: 1.0, pulse: true }],
            camera: CameraConfig { eye: [0.0, 0.0, 4.0], target: [0.0; 3], fov_y_degrees: 45.0 },
            ..NetworkConfig::default()
        };
        let scene = NetworkScene::new(config);
        assert_eq!(scene.geometry().nodes.len(), 5);
        assert!(scene.geometry().edges.is_empty());
    }
}
