// src/camera.rs
use glam::{Mat4, Vec2, Vec3, Vec4Swizzles};
use bytemuck::{Pod, Zeroable};

use crate::config::CameraConfig;

// Uniform sent to the GPU for each scene pass
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub struct SceneUniform {
    pub model_view: [[f32; 4]; 4], // view * model of the scene group
    pub proj: [[f32; 4]; 4],
    pub viewport: [f32; 2],        // pixels, used to size lines in screen space
    pub needs_srgb_output_conversion: u32, // 0 for false, 1 for true
    pub _padding: u32,             // pads the struct to 144 bytes
}

#[derive(Debug, Clone)]
pub struct Camera {
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub fov_y: f32,        // radians
    pub aspect_ratio: f32, // width / height
    pub viewport_size: Vec2,
    pub znear: f32,
    pub zfar: f32,
}

impl Camera {
    pub fn new(config: &CameraConfig, viewport_width: u32, viewport_height: u32) -> Self {
        let aspect_ratio = viewport_width as f32 / viewport_height as f32;
        Self {
            eye: Vec3::from_array(config.eye),
            target: Vec3::from_array(config.target),
            up: Vec3::Y,
            fov_y: config.fov_y_degrees.to_radians(),
            aspect_ratio: if aspect_ratio.is_finite() && aspect_ratio > 0.0 { aspect_ratio } else { 1.0 },
            viewport_size: Vec2::new(viewport_width as f32, viewport_height as f32),
            znear: 0.1,
            zfar: 1000.0,
        }
    }

    /// Called on window resize
    pub fn update_aspect_ratio(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.aspect_ratio = width as f32 / height as f32;
            self.viewport_size = Vec2::new(width as f32, height as f32);
        }
    }

    pub fn build_view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.target, self.up)
    }

    pub fn build_projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect_ratio, self.znear, self.zfar)
    }

    pub fn build_view_projection_matrix(&self) -> Mat4 {
        self.build_projection_matrix() * self.build_view_matrix()
    }

    pub fn uniform(&self, model: Mat4, needs_srgb_output_conversion: bool) -> SceneUniform {
        SceneUniform {
            model_view: (self.build_view_matrix() * model).to_cols_array_2d(),
            proj: self.build_projection_matrix().to_cols_array_2d(),
            viewport: self.viewport_size.to_array(),
            needs_srgb_output_conversion: needs_srgb_output_conversion as u32,
            _padding: 0,
        }
    }

    /// Distance from the camera along its viewing direction, negative behind it.
    pub fn view_depth(&self, world_pos: Vec3) -> f32 {
        -(self.build_view_matrix() * world_pos.extend(1.0)).z
    }

    /// Projects a world point to pixels, origin at the top-left.
    /// Returns `None` for points behind the camera.
    pub fn world_to_screen(&self, world_pos: Vec3) -> Option<Vec2> {
        if self.viewport_size.x == 0.0 || self.viewport_size.y == 0.0 {
            return None;
        }
        let clip = self.build_view_projection_matrix() * world_pos.extend(1.0);
        if clip.w <= 0.0 {
            return None;
        }
        let ndc = clip.xy() / clip.w;
        // NDC y points up, screen y points down
        Some(Vec2::new(
            (ndc.x * 0.5 + 0.5) * self.viewport_size.x,
            (1.0 - (ndc.y * 0.5 + 0.5)) * self.viewport_size.y,
        ))
    }

    /// Approximate on-screen radius in pixels of a sphere of `world_radius` at `world_pos`.
    pub fn world_radius_to_screen_pixels(&self, world_radius: f32, world_pos: Vec3) -> f32 {
        let depth = self.view_depth(world_pos);
        if depth <= 0.0 {
            return 0.0;
        }
        world_radius * self.viewport_size.y / (2.0 * (self.fov_y * 0.5).tan() * depth)
    }
}
