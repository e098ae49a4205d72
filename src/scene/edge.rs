use glam::Vec3;

use crate::color::Color;
use crate::config::EdgeRule;
use crate::scene::layer::ResolvedLayer;

/// Endpoints closer than this are treated as coincident.
pub const MIN_EDGE_LENGTH: f32 = 0.01;
/// Offset applied to the end of a degenerate edge.
pub const DEGENERATE_OFFSET: Vec3 = Vec3::new(0.0, 0.0, 0.1);

pub const FALLBACK_START: Vec3 = Vec3::ZERO;
pub const FALLBACK_END: Vec3 = Vec3::Z;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeStyle {
    pub color: Color,
    pub width: f32,
    pub opacity: f32,
}

impl From<&EdgeRule> for EdgeStyle {
    fn from(rule: &EdgeRule) -> Self {
        Self { color: rule.color, width: rule.width, opacity: rule.opacity }
    }
}

/// A drawable connection. `end` may be synthetic if the input was degenerate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    pub start: Vec3,
    pub end: Vec3,
    pub style: EdgeStyle,
}

impl Edge {
    pub fn new(start: Vec3, end: Vec3, style: EdgeStyle) -> Self {
        let (start, end) = separate_endpoints(start, end);
        Self { start, end, style }
    }

    /// Builds an edge from untrusted coordinates. Anything that is not three
    /// finite numbers is replaced with a fallback point instead of failing.
    pub fn from_raw(start: &[f32], end: &[f32], style: EdgeStyle) -> Self {
        Self::new(
            sanitize_endpoint(start, FALLBACK_START),
            sanitize_endpoint(end, FALLBACK_END),
            style,
        )
    }

    pub fn length(&self) -> f32 {
        self.start.distance(self.end)
    }
}

pub fn sanitize_endpoint(raw: &[f32], fallback: Vec3) -> Vec3 {
    match raw {
        [x, y, z] if x.is_finite() && y.is_finite() && z.is_finite() => Vec3::new(*x, *y, *z),
        _ => {
            log::debug!("Malformed edge endpoint {:?}, using {}", raw, fallback);
            fallback
        }
    }
}

/// Keeps `end` unless it (nearly) coincides with `start`, in which case a point
/// `DEGENERATE_OFFSET` away is used.
pub fn separate_endpoints(start: Vec3, end: Vec3) -> (Vec3, Vec3) {
    if start.distance(end) < MIN_EDGE_LENGTH {
        (start, start + DEGENERATE_OFFSET)
    } else {
        (start, end)
    }
}

/// Connects `from` to `to`, keeping pair (i, j) when `(i + j) % modulus == 0`.
/// Pairs whose nodes coincide are skipped, so sampled edges always join two
/// real nodes.
pub fn sample_edges(from: &ResolvedLayer, to: &ResolvedLayer, rule: &EdgeRule) -> Vec<Edge> {
    let modulus = rule.modulus.max(1) as usize;
    let style = EdgeStyle::from(rule);

    from.positions
        .iter()
        .enumerate()
        .flat_map(move |(i, &start)| {
            to.positions
                .iter()
                .enumerate()
                .filter(move |(j, _)| (i + j) % modulus == 0)
                .filter(move |(_, end)| start.distance(**end) >= MIN_EDGE_LENGTH)
                .map(move |(_, &end)| Edge::new(start, end, style))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LayerSpec, NetworkConfig};
    use crate::scene::layer::resolve_layers;
    use approx::assert_relative_eq;

    fn style() -> EdgeStyle {
        EdgeStyle { color: Color::ACCENT, width: 0.5, opacity: 0.4 }
    }

    #[test]
    fn coincident_points_are_separated_along_z() {
        let edge = Edge::new(Vec3::ZERO, Vec3::ZERO, style());
        assert!(edge.length() >= 0.1 - 1e-6);
        assert_eq!(edge.end - edge.start, DEGENERATE_OFFSET);
    }

    #[test]
    fn near_coincident_points_are_separated() {
        let start = Vec3::new(1.0, 2.0, 3.0);
        let edge = Edge::new(start, start + Vec3::splat(0.001), style());
        assert_eq!(edge.start, start);
        assert_relative_eq!(edge.length(), 0.1, epsilon = 1e-5);
    }

    #[test]
    fn regular_edges_are_untouched() {
        let edge = Edge::new(Vec3::ZERO, Vec3::X, style());
        assert_eq!(edge.end, Vec3::X);
    }

    #[test]
    fn malformed_input_falls_back() {
        let edge = Edge::from_raw(&[1.0, 2.0], &[f32::NAN, 0.0, 0.0], style());
        assert_eq!(edge.start, FALLBACK_START);
        assert_eq!(edge.end, FALLBACK_END);

        let edge = Edge::from_raw(&[0.0, 0.0, f32::INFINITY, 1.0], &[2.0, 0.0, 0.0], style());
        assert_eq!(edge.start, FALLBACK_START);
        assert_eq!(edge.end, Vec3::new(2.0, 0.0, 0.0));
    }

    #[test]
    fn reference_design_edge_counts() {
        let network = NetworkConfig::default();
        let layers = resolve_layers(&network.layers);
        let first = sample_edges(&layers[0], &layers[1], &network.edge_rules[0]);
        let second = sample_edges(&layers[1], &layers[2], &network.edge_rules[1]);
        assert_eq!(first.len(), 16);
        // layer 1 node 0 and layer 2 node 2 both sit at (2.5, 0, 0)
        assert_eq!(second.len(), 15);
        assert!(first.iter().all(|e| e.style.color == Color::ACCENT));
        assert!(second.iter().all(|e| e.style.color == Color::PRIMARY));
    }

    #[test]
    fn endpoints_belong_to_their_layers() {
        let network = NetworkConfig::default();
        let layers = resolve_layers(&network.layers);
        for (k, pair) in layers.windows(2).enumerate() {
            for edge in sample_edges(&pair[0], &pair[1], &network.edge_rules[k]) {
                assert!(pair[0].positions.contains(&edge.start));
                assert!(pair[1].positions.contains(&edge.end));
            }
        }
    }

    #[test]
    fn coincident_nodes_are_not_connected() {
        let ring = LayerSpec { center: [0.0; 3], count: 4, radius: 1.0, pulse: false }.resolve();
        let rule = EdgeRule { modulus: 1, color: Color::PRIMARY, width: 1.0, opacity: 1.0 };
        let edges = sample_edges(&ring, &ring, &rule);
        assert_eq!(edges.len(), 12);
        assert!(edges.iter().all(|e| e.length() >= MIN_EDGE_LENGTH));
        assert!(edges.iter().all(|e| ring.positions.contains(&e.end)));
    }

    #[test]
    fn reference_design_has_no_synthetic_endpoints() {
        let network = NetworkConfig::default();
        let layers = resolve_layers(&network.layers);
        let second = sample_edges(&layers[1], &layers[2], &network.edge_rules[1]);
        assert!(second.iter().all(|e| e.end - e.start != DEGENERATE_OFFSET));
        assert!(second.iter().all(|e| layers[2].positions.contains(&e.end)));
    }
}
