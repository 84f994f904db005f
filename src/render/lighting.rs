use glam::{Mat4, Vec3};

/// Base tint of direct sunlight, modulated by [`SunLight::color`].
pub const LIGHT_COLOR: Vec3 = Vec3::new(1.0, 0.95, 0.8);
pub const AMBIENT_COLOR: Vec3 = Vec3::new(0.6, 0.7, 0.8);
pub const AMBIENT_STRENGTH: f32 = 0.4;

pub fn default_light_direction() -> Vec3 {
    Vec3::new(0.3, -0.7, 0.5).normalize()
}

/// The scene's single directional light.
#[derive(Debug, Clone, PartialEq)]
pub struct SunLight {
    direction: Vec3,
    color: Vec3,
    intensity: f32,
    // Always identity until a shadow pass consumes them.
    shadow_view: Mat4,
    shadow_projection: Mat4,
}

impl Default for SunLight {
    fn default() -> Self {
        Self {
            direction: default_light_direction(),
            color: Vec3::new(1.0, 0.95, 0.85),
            intensity: 1.0,
            shadow_view: Mat4::IDENTITY,
            shadow_projection: Mat4::IDENTITY,
        }
    }
}

impl SunLight {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    /// Near-zero vectors are ignored.
    pub fn set_direction(&mut self, direction: Vec3) {
        if direction.length_squared() > 0.0001 {
            self.direction = direction.normalize();
        }
    }

    pub fn color(&self) -> Vec3 {
        self.color
    }

    pub fn set_color(&mut self, color: Vec3) {
        self.color = color;
    }

    pub fn intensity(&self) -> f32 {
        self.intensity
    }

    pub fn set_intensity(&mut self, intensity: f32) {
        self.intensity = intensity.max(0.0);
    }

    /// What actually reaches the shader: the base tint scaled by the sun.
    pub fn effective_color(&self) -> Vec3 {
        LIGHT_COLOR * self.color * self.intensity
    }

    /// Moves the sun along its daily arc. `time_of_day` wraps to `[0, 1)`.
    pub fn update(&mut self, time_of_day: f32, focus: Vec3, coverage: f32) {
        let angle = time_of_day.rem_euclid(1.0) * std::f32::consts::TAU;
        self.direction = Vec3::new(angle.cos() * 0.6, angle.sin(), (angle * 0.5).sin()).normalize();
        // Bright around noon, never fully dark
        self.intensity = (self.direction.y * 0.75 + 0.5).max(0.25);
        self.prepare_shadow_matrices(focus, coverage);
    }

    pub fn prepare_shadow_matrices(&mut self, _focus: Vec3, _coverage: f32) {
        self.shadow_view = Mat4::IDENTITY;
        self.shadow_projection = Mat4::IDENTITY;
    }

    pub fn shadow_view(&self) -> Mat4 {
        self.shadow_view
    }

    pub fn shadow_projection(&self) -> Mat4 {
        self.shadow_projection
    }
}
