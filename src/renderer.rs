//! three-d backed WebGL2 renderer.

use std::sync::Arc;

use three_d::*;
use tracing::{debug, info};
use wasm_bindgen::JsCast;
use web_sys::{HtmlCanvasElement, WebGl2RenderingContext};

use crate::config::RendererConfig;
use crate::engine::{RenderEngine, RenderSettings};
use crate::error::{Result, SceneError};
use crate::params::HexColor;
use crate::scene::{Material, NodeKind, Scene};


/// Light intensities in the scene graph are physical-ish units tuned for
/// tone mapped output; three-d expects roughly unit intensities.
const LIGHT_SCALE: f32 = 0.1;
/// Env map intensity 1 maps to this much image based ambient light
const ENVIRONMENT_SCALE: f32 = 0.25;


fn srgba(color: HexColor) -> Srgba {
    let [r, g, b] = color.rgb();
    Srgba::new_opaque(r, g, b)
}


struct GpuMesh<M: three_d::Material> {
    model: Gm<Mesh, M>,
    cast_shadow: bool,
}


/// GPU-side copy of a [Scene] at one revision.
struct GpuScene {
    revision: u64,
    standard: Vec<GpuMesh<PhysicalMaterial>>,
    basic: Vec<GpuMesh<ColorMaterial>>,
    sun: Option<DirectionalLight>,
    ambient: Option<AmbientLight>,
    environment: Option<AmbientLight>,
}

impl GpuScene {
    fn new(context: &Context, scene: &Scene, settings: &RenderSettings) -> Self {
        let mut standard = Vec::new();
        let mut basic = Vec::new();
        let mut sun = None;
        let mut shadow = None;
        let mut ambient = None;

        scene.traverse(|node, world| match &node.kind {
            NodeKind::Mesh(mesh) => {
                let mut geometry = Mesh::new(context, &mesh.geometry);
                geometry.set_transformation(*world);
                match &mesh.material {
                    Material::Standard(m) => {
                        let cpu = match m.source.as_ref() {
                            Some(source) => source.as_ref().clone(),
                            None => CpuMaterial {
                                albedo: srgba(m.albedo),
                                metallic: m.metallic,
                                roughness: m.roughness,
                                ..Default::default()
                            },
                        };
                        standard.push(GpuMesh {
                            model: Gm::new(geometry, PhysicalMaterial::new(context, &cpu)),
                            cast_shadow: mesh.cast_shadow,
                        });
                    },
                    Material::Basic(m) => {
                        let cpu = CpuMaterial { albedo: srgba(m.color), ..Default::default() };
                        basic.push(GpuMesh {
                            model: Gm::new(geometry, ColorMaterial::new_opaque(context, &cpu)),
                            cast_shadow: mesh.cast_shadow,
                        });
                    },
                }
            },
            NodeKind::DirectionalLight(light) => {
                // shines from its position towards the origin
                let position = world.w.truncate();
                let direction = if position.magnitude2() > 0.0 { -position.normalize() } else { vec3(0.0, -1.0, 0.0) };
                sun = Some(DirectionalLight::new(
                    context,
                    light.intensity * LIGHT_SCALE,
                    srgba(light.color),
                    &direction,
                ));
                if light.cast_shadow {
                    shadow = Some(light.shadow.map_size);
                }
            },
            NodeKind::AmbientLight(light) => {
                ambient = Some(AmbientLight::new(context, light.intensity * LIGHT_SCALE, srgba(light.color)));
            },
            NodeKind::Group => {},
        });

        if let (Some(light), Some(map_size), true) = (sun.as_mut(), shadow, settings.shadows) {
            light.generate_shadow_map(
                map_size,
                standard
                    .iter()
                    .filter(|m| m.cast_shadow)
                    .map(|m| &m.model.geometry)
                    .chain(basic.iter().filter(|m| m.cast_shadow).map(|m| &m.model.geometry)),
            );
        }

        let environment = scene.environment().map(|env| {
            let [px, nx, py, ny, pz, nz] = &env.faces;
            let cube = TextureCubeMap::new(context, px, nx, py, ny, pz, nz);
            AmbientLight::new_with_environment(context, ENVIRONMENT_SCALE, Srgba::WHITE, &cube)
        });

        debug!(
            "GpuScene::new(): revision {}, {} lit meshes, {} unlit meshes, environment: {}",
            scene.revision(),
            standard.len(),
            basic.len(),
            environment.is_some()
        );
        Self {
            revision: scene.revision(),
            standard,
            basic,
            sun,
            ambient,
            environment,
        }
    }

    /// Pulls light values and exposure from the scene graph
    fn update_lights(&mut self, scene: &Scene, settings: &RenderSettings) {
        let exposure = settings.exposure;
        if let (Some(sun), Some(node)) = (self.sun.as_mut(), scene.directional_light()) {
            sun.intensity = node.intensity * LIGHT_SCALE * exposure;
            sun.color = srgba(node.color);
        }
        if let (Some(ambient), Some(node)) = (self.ambient.as_mut(), scene.ambient_light()) {
            ambient.intensity = node.intensity * LIGHT_SCALE * exposure;
            ambient.color = srgba(node.color);
        }
        if let Some(environment) = self.environment.as_mut() {
            let intensity = scene.env_map_intensity().unwrap_or(1.0);
            environment.intensity = intensity * ENVIRONMENT_SCALE * exposure;
        }
    }

    fn lights(&self) -> Vec<&dyn Light> {
        let mut lights: Vec<&dyn Light> = Vec::new();
        if let Some(sun) = self.sun.as_ref() {
            lights.push(sun);
        }
        if let Some(ambient) = self.ambient.as_ref() {
            lights.push(ambient);
        }
        if let Some(environment) = self.environment.as_ref() {
            lights.push(environment);
        }
        lights
    }
}


/// Renders into a canvas element through a WebGL2 context.
pub struct WebGlRenderer {
    canvas: HtmlCanvasElement,
    gl: WebGl2RenderingContext,
    context: Context,
    size: (u32, u32),
    device_pixel_ratio: f64,
    gpu: Option<GpuScene>,
}

impl WebGlRenderer {
    /// Creates a detached canvas with a WebGL2 context
    pub fn new() -> Result<Self> {
        let window = web_sys::window().ok_or_else(|| SceneError::Surface("no window".into()))?;
        let document = window.document().ok_or_else(|| SceneError::Surface("no document".into()))?;
        let canvas = document
            .create_element("canvas")?
            .dyn_into::<HtmlCanvasElement>()
            .map_err(|_| SceneError::Surface("created element is not a canvas".into()))?;

        let gl = canvas
            .get_context("webgl2")?
            .ok_or_else(|| SceneError::Surface("WebGL2 is not supported".into()))?
            .dyn_into::<WebGl2RenderingContext>()
            .map_err(|_| SceneError::Surface("not a WebGL2 context".into()))?;

        let context = Context::from_gl_context(Arc::new(context::Context::from_webgl2_context(gl.clone())))
            .map_err(|e| SceneError::Surface(format!("{:?}", e)))?;
        info!(
            "WebGlRenderer::new(): OpenGL version: {:?}",
            context.version()
        );

        Ok(Self {
            canvas,
            gl,
            context,
            size: (0, 0),
            device_pixel_ratio: window.device_pixel_ratio(),
            gpu: None,
        })
    }

    /// Shared with the egui overlay so both draw into the same canvas
    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn device_pixel_ratio(&self) -> f64 {
        self.device_pixel_ratio
    }

    /// Drawing buffer size in physical pixels
    pub fn physical_size(&self) -> (u32, u32) {
        self.size
    }
}

impl RenderEngine for WebGlRenderer {
    type Surface = HtmlCanvasElement;

    fn create_surface(&mut self, config: &RendererConfig) -> Result<HtmlCanvasElement> {
        let style = self.canvas.style();
        style.set_property("display", "block")?;
        debug!("WebGlRenderer::create_surface(): shadows={}", config.shadows);
        Ok(self.canvas.clone())
    }

    fn set_size(&mut self, surface: &HtmlCanvasElement, width: u32, height: u32) {
        let dpr = self.device_pixel_ratio;
        let physical = ((width as f64 * dpr).round() as u32, (height as f64 * dpr).round() as u32);
        surface.set_width(physical.0);
        surface.set_height(physical.1);
        let style = surface.style();
        let _ = style.set_property("width", &format!("{}px", width));
        let _ = style.set_property("height", &format!("{}px", height));
        self.size = physical;
    }

    fn draw(
        &mut self,
        _surface: &HtmlCanvasElement,
        scene: &Scene,
        camera: &Camera,
        settings: &RenderSettings,
    ) -> Result<()> {
        if self.gl.is_context_lost() {
            return Err(SceneError::Render("WebGL context lost".into()));
        }
        let (width, height) = self.size;
        if width == 0 || height == 0 {
            return Ok(());
        }

        let stale = self.gpu.as_ref().map_or(true, |gpu| gpu.revision != scene.revision());
        if stale {
            self.gpu = Some(GpuScene::new(&self.context, scene, settings));
        }
        let gpu = match self.gpu.as_mut() {
            Some(gpu) => gpu,
            None => return Ok(()),
        };

        gpu.update_lights(scene, settings);

        // the scene camera tracks CSS pixels, the drawing buffer is in physical pixels
        let mut render_camera = camera.clone();
        render_camera.set_viewport(Viewport::new_at_origo(width, height));

        let lights = gpu.lights();
        let [r, g, b, a] = settings.clear_color;
        RenderTarget::screen(&self.context, width, height)
            .clear(ClearState::color_and_depth(r, g, b, a, 1.0))
            .render(&render_camera, gpu.standard.iter().map(|m| &m.model), &lights)
            .render(&render_camera, gpu.basic.iter().map(|m| &m.model), &lights);
        Ok(())
    }

    fn dispose(&mut self, scene: &Scene) {
        if self.gpu.take().is_some() {
            info!("WebGlRenderer::dispose(): released GPU objects for revision {}", scene.revision());
        }
    }
}

