pub mod edge;
pub mod grid;
pub mod layer;
pub mod network;
pub mod particles;

pub use grid::GridScene;
pub use network::NetworkScene;
pub use particles::ParticleField;
