//! Seams between the scene lifecycle and the libraries it drives.

use three_d::Camera;

use crate::config::RendererConfig;
use crate::error::Result;
use crate::params::{ControlFolder, ParamChange, SceneParameters};
use crate::scene::Scene;


/// Per-frame values the renderer needs besides the scene and camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderSettings {
    /// Linear multiplier on scene radiance before tone mapping
    pub exposure: f32,
    pub clear_color: [f32; 4],
    pub shadows: bool,
}


/// Draws a [Scene] into a surface the host can attach to the page.
pub trait RenderEngine {
    type Surface;

    fn create_surface(&mut self, config: &RendererConfig) -> Result<Self::Surface>;

    fn set_size(&mut self, surface: &Self::Surface, width: u32, height: u32);

    fn draw(
        &mut self,
        surface: &Self::Surface,
        scene: &Scene,
        camera: &Camera,
        settings: &RenderSettings,
    ) -> Result<()>;

    /// Releases every GPU-side resource created for `scene`.
    /// Drawing again afterwards recreates them.
    fn dispose(&mut self, scene: &Scene);
}


/// Host-owned container the surface is mounted into.
pub trait MountTarget {
    type Surface;

    /// Current content-box size in pixels
    fn client_size(&self) -> (u32, u32);

    fn attach(&self, surface: &Self::Surface) -> Result<()>;

    fn detach(&self, surface: &Self::Surface) -> Result<()>;

    fn contains(&self, surface: &Self::Surface) -> bool;
}


/// What the panel needs to know about the frame being drawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanelFrame {
    pub time_ms: f64,
    pub width: u32,
    pub height: u32,
    /// Fraction of assets loaded while loading is in flight
    pub progress: Option<f32>,
}


/// Live-editing widget panel. Immediate-mode: controls are shown and
/// edits collected once per frame in [DebugPanel::poll].
pub trait DebugPanel {
    fn build(&mut self, folders: &[ControlFolder]);

    /// Shows the controls for the current values and returns the edits made this frame.
    fn poll(&mut self, frame: &PanelFrame, params: &SceneParameters) -> Vec<ParamChange>;

    /// Draws the panel over the frame that was just rendered
    fn render_overlay(&mut self);

    /// Whether the pointer is busy with the panel, in which case the camera ignores it
    fn wants_pointer(&self) -> bool;

    /// After this every operation is a no-op until [DebugPanel::build] is called again
    fn destroy(&mut self);

    fn is_destroyed(&self) -> bool;
}
