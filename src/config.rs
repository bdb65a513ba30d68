//! Scene configuration, deserialized from the JSON the host page hands to `SceneMount`.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SceneError};
use crate::params::SceneParameters;


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CameraConfig {
    /// Vertical field of view in degrees
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
    pub position: [f32; 3],
    pub target: [f32; 3],
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_y: 25.0,
            near: 0.1,
            far: 100.0,
            position: [5.0, 5.0, 5.0],
            target: [0.0, 0.0, 0.0],
        }
    }
}


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RendererConfig {
    pub shadows: bool,
    pub shadow_map_size: u32,
    pub clear_color: [f32; 4],
    /// Size of the surface before the first mount
    pub initial_size: [u32; 2],
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            shadows: true,
            shadow_map_size: 1024,
            clear_color: [0.0, 0.0, 0.0, 1.0],
            initial_size: [100, 100],
        }
    }
}


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LightsConfig {
    pub directional_position: [f32; 3],
    pub shadow_bias: f32,
    pub shadow_normal_bias: f32,
}

impl Default for LightsConfig {
    fn default() -> Self {
        Self {
            directional_position: [0.0, 6.0, 1.0],
            shadow_bias: 0.0005,
            shadow_normal_bias: 0.0005,
        }
    }
}


/// Cube map face images, one per axis direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CubeFaces {
    pub positive_x: String,
    pub negative_x: String,
    pub positive_y: String,
    pub negative_y: String,
    pub positive_z: String,
    pub negative_z: String,
}

impl Default for CubeFaces {
    fn default() -> Self {
        Self {
            positive_x: "/Cube-Map/px.png".to_string(),
            negative_x: "/Cube-Map/nx.png".to_string(),
            positive_y: "/Cube-Map/py.png".to_string(),
            negative_y: "/Cube-Map/ny.png".to_string(),
            positive_z: "/Cube-Map/pz.png".to_string(),
            negative_z: "/Cube-Map/nz.png".to_string(),
        }
    }
}

impl CubeFaces {
    /// Faces in +X, -X, +Y, -Y, +Z, -Z order
    pub fn paths(&self) -> [&str; 6] {
        [
            &self.positive_x,
            &self.negative_x,
            &self.positive_y,
            &self.negative_y,
            &self.positive_z,
            &self.negative_z,
        ]
    }
}


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AssetsConfig {
    pub model: String,
    pub environment: CubeFaces,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            model: "/modelos/space_helmet/helmet.gltf".to_string(),
            environment: CubeFaces::default(),
        }
    }
}


#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ControlsConfig {
    pub enable_damping: bool,
    pub damping_factor: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,
}

impl Default for ControlsConfig {
    fn default() -> Self {
        Self {
            enable_damping: true,
            damping_factor: 0.05,
            min_distance: 0.5,
            max_distance: 50.0,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            pan_speed: 1.0,
        }
    }
}


#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SceneConfig {
    pub camera: CameraConfig,
    pub renderer: RendererConfig,
    pub lights: LightsConfig,
    pub assets: AssetsConfig,
    pub controls: ControlsConfig,
    /// Initial parameter values, before any panel edit
    pub parameters: SceneParameters,
}

impl SceneConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: SceneConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let c = &self.camera;
        if !(c.fov_y > 0.0 && c.fov_y < 180.0) {
            return Err(SceneError::Config(format!("camera.fovY must be in (0, 180), got {}", c.fov_y)));
        }
        if !(c.near > 0.0 && c.near < c.far) {
            return Err(SceneError::Config(format!(
                "camera planes must satisfy 0 < near < far, got near={} far={}",
                c.near, c.far
            )));
        }
        if c.position == c.target {
            return Err(SceneError::Config("camera.position must differ from camera.target".to_string()));
        }

        let k = &self.controls;
        if !(k.damping_factor > 0.0 && k.damping_factor <= 1.0) {
            return Err(SceneError::Config(format!(
                "controls.dampingFactor must be in (0, 1], got {}",
                k.damping_factor
            )));
        }
        if !(k.min_distance > 0.0 && k.min_distance < k.max_distance) {
            return Err(SceneError::Config(format!(
                "controls distances must satisfy 0 < min < max, got min={} max={}",
                k.min_distance, k.max_distance
            )));
        }

        if self.renderer.shadow_map_size == 0 {
            return Err(SceneError::Config("renderer.shadowMapSize must be positive".to_string()));
        }

        let a = &self.assets;
        if a.model.trim().is_empty() {
            return Err(SceneError::Config("assets.model is empty".to_string()));
        }
        if a.environment.paths().iter().any(|p| p.trim().is_empty()) {
            return Err(SceneError::Config("assets.environment has an empty face path".to_string()));
        }
        Ok(())
    }
}
