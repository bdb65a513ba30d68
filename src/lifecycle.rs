//! Mount, resize, animate and unmount of one scene.

use futures::future::LocalBoxFuture;
use three_d::Camera;
use tracing::{debug, info, warn};

use crate::camera::{resize_camera, scene_camera, OrbitControls, PointerInput};
use crate::config::SceneConfig;
use crate::engine::{DebugPanel, MountTarget, PanelFrame, RenderEngine, RenderSettings};
use crate::error::Result;
use crate::frame::FrameControl;
use crate::loader::{load_assets, AssetLoader, LoadChannels, LoadProgress, Loaded};
use crate::params::{control_folders, ParamChange, ParamKey, ParamValue, SceneParameters};
use crate::scene::Scene;


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Unmounted,
    Mounted,
}


/// Owns everything one mounted scene needs: the render surface, the scene
/// graph, camera and controls, the tweakable parameters and the panel.
///
/// Nothing here is global, so several lifecycles can live side by side.
/// A lifecycle starts [LifecycleState::Unmounted]; [SceneLifecycle::init]
/// mounts it into a target and [SceneLifecycle::cleanup] unmounts it.
pub struct SceneLifecycle<E, P, T>
where
    E: RenderEngine,
    P: DebugPanel,
    T: MountTarget<Surface = E::Surface>,
{
    config: SceneConfig,
    engine: E,
    surface: E::Surface,
    panel: P,
    scene: Scene,
    camera: Camera,
    controls: OrbitControls,
    params: SceneParameters,
    target: Option<T>,
    size: (u32, u32),
    loading: Option<LoadChannels>,
    pending_outcomes: usize,
    progress: Option<LoadProgress>,
}

impl<E, P, T> SceneLifecycle<E, P, T>
where
    E: RenderEngine,
    P: DebugPanel,
    T: MountTarget<Surface = E::Surface>,
{
    pub fn new(config: SceneConfig, mut engine: E, panel: P) -> Result<Self> {
        config.validate()?;

        let surface = engine.create_surface(&config.renderer)?;
        let [width, height] = config.renderer.initial_size;
        engine.set_size(&surface, width, height);

        let params = config.parameters.constrained();
        if params != config.parameters {
            warn!("SceneLifecycle::new(): initial parameters moved into their control ranges: {:?}", params);
        }
        let scene = Scene::with_defaults(&config, &params);
        let camera = scene_camera(&config.camera, width, height);
        let controls = OrbitControls::new(&config.controls, &camera);
        info!(
            "SceneLifecycle::new(): {} nodes, camera at {:?}",
            scene.node_count(),
            config.camera.position
        );

        Ok(Self {
            config,
            engine,
            surface,
            panel,
            scene,
            camera,
            controls,
            params,
            target: None,
            size: (width, height),
            loading: None,
            pending_outcomes: 0,
            progress: None,
        })
    }

    pub fn state(&self) -> LifecycleState {
        if self.target.is_some() {
            LifecycleState::Mounted
        } else {
            LifecycleState::Unmounted
        }
    }

    pub fn is_mounted(&self) -> bool {
        self.target.is_some()
    }

    pub fn target(&self) -> Option<&T> {
        self.target.as_ref()
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn panel(&self) -> &P {
        &self.panel
    }

    pub fn surface(&self) -> &E::Surface {
        &self.surface
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn params(&self) -> &SceneParameters {
        &self.params
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    /// Size the surface was last given
    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    pub fn is_loading(&self) -> bool {
        self.loading.is_some()
    }

    pub fn progress(&self) -> Option<&LoadProgress> {
        self.progress.as_ref()
    }

    /// Mounts the surface into `target`, sizes it and builds the panel.
    ///
    /// Calling this while mounted replaces the active target: the surface
    /// moves to the new target and the previous one is handed back.
    /// If attaching fails the previous mount stays active.
    pub fn init(&mut self, target: T) -> Result<Option<T>> {
        let previous = self.target.take();
        if let Some(prev) = previous.as_ref() {
            warn!("SceneLifecycle::init(): already mounted, replacing the active target");
            if prev.contains(&self.surface) {
                if let Err(e) = prev.detach(&self.surface) {
                    warn!("SceneLifecycle::init(): could not detach from previous target: {}", e);
                }
            }
        }

        if let Err(e) = target.attach(&self.surface) {
            if let Some(prev) = previous {
                if !prev.contains(&self.surface) {
                    if let Err(e) = prev.attach(&self.surface) {
                        warn!("SceneLifecycle::init(): could not restore previous target: {}", e);
                    }
                }
                self.target = Some(prev);
            }
            return Err(e);
        }
        self.target = Some(target);
        self.resize();

        if previous.is_none() || self.panel.is_destroyed() {
            self.panel.build(&control_folders());
        }
        info!("SceneLifecycle::init(): mounted at {}x{}", self.size.0, self.size.1);
        Ok(previous)
    }

    /// Matches the surface and camera to the active target's current size.
    /// Returns false when nothing is mounted.
    pub fn resize(&mut self) -> bool {
        let (width, height) = match self.target.as_ref() {
            Some(target) => target.client_size(),
            None => {
                debug!("SceneLifecycle::resize(): no active target");
                return false;
            },
        };

        self.engine.set_size(&self.surface, width, height);
        self.size = (width, height);
        if !resize_camera(&mut self.camera, width, height) {
            debug!("SceneLifecycle::resize(): zero-sized target {}x{}, keeping aspect", width, height);
        }
        true
    }

    /// Releases GPU resources, destroys the panel and detaches the surface.
    /// Returns the target that was active, if any.
    pub fn cleanup(&mut self) -> Option<T> {
        let target = match self.target.take() {
            Some(target) => target,
            None => {
                debug!("SceneLifecycle::cleanup(): not mounted");
                return None;
            },
        };

        self.engine.dispose(&self.scene);
        self.panel.destroy();
        if target.contains(&self.surface) {
            if let Err(e) = target.detach(&self.surface) {
                warn!("SceneLifecycle::cleanup(): could not detach surface: {}", e);
            }
        }
        info!("SceneLifecycle::cleanup(): unmounted");
        Some(target)
    }

    /// Starts loading the model and environment.
    /// The caller drives the returned future; its results are applied on the next [SceneLifecycle::tick].
    pub fn begin_loading<L: AssetLoader + ?Sized>(&mut self, loader: &L) -> LocalBoxFuture<'static, ()> {
        let (task, channels) = load_assets(loader, &self.config.assets);
        self.loading = Some(channels);
        self.pending_outcomes = 2;
        self.progress = None;
        info!("SceneLifecycle::begin_loading(): {}", self.config.assets.model);
        task
    }

    /// Applies finished loads to the scene graph. Returns the number of outcomes received.
    pub fn apply_loaded(&mut self) -> usize {
        let channels = match self.loading.as_mut() {
            Some(channels) => channels,
            None => return 0,
        };

        while let Ok(progress) = channels.progress.try_recv() {
            info!(
                "SceneLifecycle::apply_loaded(): loaded {} ({:.0}%)",
                progress.item,
                progress.fraction() * 100.0
            );
            self.progress = Some(progress);
        }

        let mut received = 0;
        while let Ok(outcome) = channels.outcomes.try_recv() {
            received += 1;
            match outcome {
                Ok(Loaded::Model(nodes)) => {
                    info!("SceneLifecycle::apply_loaded(): adding {} model nodes", nodes.len());
                    self.scene.append(nodes);
                    self.scene.cast_and_receive_shadows();
                    self.scene.set_env_map_intensity(self.params.env_map_intensity);
                },
                Ok(Loaded::Environment(environment)) => {
                    info!("SceneLifecycle::apply_loaded(): environment map ready");
                    self.scene.set_environment(environment);
                },
                Err(e) => warn!("SceneLifecycle::apply_loaded(): {}", e),
            }
        }

        self.pending_outcomes = self.pending_outcomes.saturating_sub(received);
        if self.pending_outcomes == 0 {
            self.loading = None;
            debug!("SceneLifecycle::apply_loaded(): all assets settled");
        }
        received
    }

    /// Stores a parameter edit and pushes it into the scene.
    /// Returns the value actually stored after clamping.
    pub fn apply_change(&mut self, change: ParamChange) -> Option<ParamChange> {
        let stored = match self.params.set(change) {
            Some(stored) => stored,
            None => {
                warn!("SceneLifecycle::apply_change(): rejected {:?}", change);
                return None;
            },
        };

        match (stored.key, stored.value) {
            (ParamKey::EnvMapIntensity, ParamValue::Number(v)) => {
                self.scene.set_env_map_intensity(v);
            },
            (ParamKey::DirectionalLightIntensity, ParamValue::Number(v)) => {
                if let Some(light) = self.scene.directional_light_mut() {
                    light.intensity = v;
                }
            },
            (ParamKey::DirectionalLightColor, ParamValue::Color(c)) => {
                if let Some(light) = self.scene.directional_light_mut() {
                    light.color = c;
                }
            },
            (ParamKey::AmbientLightIntensity, ParamValue::Number(v)) => {
                if let Some(light) = self.scene.ambient_light_mut() {
                    light.intensity = v;
                }
            },
            (ParamKey::AmbientLightColor, ParamValue::Color(c)) => {
                if let Some(light) = self.scene.ambient_light_mut() {
                    light.color = c;
                }
            },
            // read from the parameters every frame
            (ParamKey::ToneMappingExposure, _) => {},
            _ => {},
        }
        debug!("SceneLifecycle::apply_change(): {:?}", stored);
        Some(stored)
    }

    /// Routes pointer input to the camera unless the panel has the pointer
    pub fn handle_pointer(&mut self, input: PointerInput) -> bool {
        if self.target.is_none() || self.panel.wants_pointer() {
            return false;
        }
        self.controls.handle(input, &self.camera);
        true
    }

    pub fn render_settings(&self) -> RenderSettings {
        RenderSettings {
            exposure: self.params.tone_mapping_exposure,
            clear_color: self.config.renderer.clear_color,
            shadows: self.config.renderer.shadows,
        }
    }

    /// One animation frame. Returns [FrameControl::Stop] once unmounted.
    pub fn tick(&mut self, time_ms: f64) -> FrameControl {
        if self.target.is_none() {
            return FrameControl::Stop;
        }

        self.apply_loaded();

        let frame = PanelFrame {
            time_ms,
            width: self.size.0,
            height: self.size.1,
            progress: self
                .loading
                .as_ref()
                .map(|_| self.progress.as_ref().map_or(0.0, |p| p.fraction())),
        };
        for change in self.panel.poll(&frame, &self.params) {
            self.apply_change(change);
        }

        self.controls.update(&mut self.camera);

        let settings = self.render_settings();
        if let Err(e) = self.engine.draw(&self.surface, &self.scene, &self.camera, &settings) {
            warn!("SceneLifecycle::tick(): {}", e);
        }
        self.panel.render_overlay();

        FrameControl::Continue
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::{cell::RefCell, rc::Rc};

    use three_d::InnerSpace;

    use crate::camera::aspect;
    use crate::config::RendererConfig;
    use crate::error::SceneError;
    use crate::loader::tests::MockLoader;
    use crate::params::{ControlFolder, HexColor};
    use crate::scene::{Material, NodeKind};
    use crate::utils::are_floats_equal;

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct MockSurface(u32);

    #[derive(Default)]
    struct MockEngine {
        created: u32,
        size: Option<(u32, u32)>,
        draws: usize,
        disposed: usize,
        fail_draw: bool,
    }

    impl RenderEngine for MockEngine {
        type Surface = MockSurface;

        fn create_surface(&mut self, _config: &RendererConfig) -> Result<MockSurface> {
            self.created += 1;
            Ok(MockSurface(self.created))
        }

        fn set_size(&mut self, _surface: &MockSurface, width: u32, height: u32) {
            self.size = Some((width, height));
        }

        fn draw(
            &mut self,
            _surface: &MockSurface,
            _scene: &Scene,
            _camera: &Camera,
            _settings: &RenderSettings,
        ) -> Result<()> {
            if self.fail_draw {
                return Err(SceneError::Render("context lost".into()));
            }
            self.draws += 1;
            Ok(())
        }

        fn dispose(&mut self, _scene: &Scene) {
            self.disposed += 1;
        }
    }

    #[derive(Default)]
    struct TargetState {
        width: u32,
        height: u32,
        children: Vec<MockSurface>,
        fail_attach: bool,
    }

    #[derive(Clone)]
    struct MockTarget(Rc<RefCell<TargetState>>);

    impl MockTarget {
        fn new(width: u32, height: u32) -> Self {
            MockTarget(Rc::new(RefCell::new(TargetState { width, height, ..TargetState::default() })))
        }

        fn refusing(width: u32, height: u32) -> Self {
            let target = MockTarget::new(width, height);
            target.0.borrow_mut().fail_attach = true;
            target
        }

        fn set_size(&self, width: u32, height: u32) {
            let mut s = self.0.borrow_mut();
            s.width = width;
            s.height = height;
        }

        fn children(&self) -> usize {
            self.0.borrow().children.len()
        }
    }

    impl MountTarget for MockTarget {
        type Surface = MockSurface;

        fn client_size(&self) -> (u32, u32) {
            let s = self.0.borrow();
            (s.width, s.height)
        }

        fn attach(&self, surface: &MockSurface) -> Result<()> {
            if self.0.borrow().fail_attach {
                return Err(SceneError::Surface("appendChild failed".into()));
            }
            self.0.borrow_mut().children.push(*surface);
            Ok(())
        }

        fn detach(&self, surface: &MockSurface) -> Result<()> {
            self.0.borrow_mut().children.retain(|s| s != surface);
            Ok(())
        }

        fn contains(&self, surface: &MockSurface) -> bool {
            self.0.borrow().children.contains(surface)
        }
    }

    #[derive(Default)]
    struct MockPanel {
        builds: usize,
        controls: usize,
        destroyed: bool,
        queued: Vec<ParamChange>,
        wants_pointer: bool,
        overlays: usize,
        last_frame: Option<PanelFrame>,
    }

    impl DebugPanel for MockPanel {
        fn build(&mut self, folders: &[ControlFolder]) {
            self.builds += 1;
            self.destroyed = false;
            self.controls = folders.iter().map(|f| f.controls.len()).sum();
        }

        fn poll(&mut self, frame: &PanelFrame, _params: &SceneParameters) -> Vec<ParamChange> {
            if self.destroyed {
                return Vec::new();
            }
            self.last_frame = Some(*frame);
            std::mem::take(&mut self.queued)
        }

        fn render_overlay(&mut self) {
            if !self.destroyed {
                self.overlays += 1;
            }
        }

        fn wants_pointer(&self) -> bool {
            !self.destroyed && self.wants_pointer
        }

        fn destroy(&mut self) {
            self.destroyed = true;
            self.controls = 0;
        }

        fn is_destroyed(&self) -> bool {
            self.destroyed
        }
    }

    type Lifecycle = SceneLifecycle<MockEngine, MockPanel, MockTarget>;

    fn lifecycle() -> Lifecycle {
        SceneLifecycle::new(SceneConfig::default(), MockEngine::default(), MockPanel::default()).unwrap()
    }

    fn number(key: ParamKey, v: f32) -> ParamChange {
        ParamChange { key, value: ParamValue::Number(v) }
    }

    #[test]
    fn starts_unmounted_with_initial_size() {
        let lc = lifecycle();
        assert_eq!(lc.state(), LifecycleState::Unmounted);
        assert_eq!(lc.engine().size, Some((100, 100)));
        assert_eq!(lc.engine().created, 1);
        assert_eq!(lc.scene().node_count(), 3);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = SceneConfig::default();
        config.camera.near = 0.0;
        let result: Result<Lifecycle> = SceneLifecycle::new(config, MockEngine::default(), MockPanel::default());
        assert!(matches!(result, Err(SceneError::Config(_))));
    }

    #[test]
    fn init_sizes_surface_to_target() {
        let mut lc = lifecycle();
        let target = MockTarget::new(640, 480);
        let previous = lc.init(target.clone()).unwrap();

        assert!(previous.is_none());
        assert_eq!(lc.state(), LifecycleState::Mounted);
        assert_eq!(lc.engine().size, Some((640, 480)));
        assert_eq!(lc.size(), (640, 480));
        assert!(target.contains(lc.surface()));
        assert!(are_floats_equal(aspect(lc.camera()), 640.0 / 480.0, 1e-6));
        assert_eq!(lc.panel().builds, 1);
        assert_eq!(lc.panel().controls, 6);
    }

    #[test]
    fn resize_tracks_target_size() {
        let mut lc = lifecycle();
        let target = MockTarget::new(640, 480);
        lc.init(target.clone()).unwrap();

        target.set_size(1280, 400);
        assert!(lc.resize());
        assert_eq!(lc.engine().size, Some((1280, 400)));
        assert!(are_floats_equal(aspect(lc.camera()), 3.2, 1e-6));

        target.set_size(0, 0);
        assert!(lc.resize());
        assert_eq!(lc.engine().size, Some((0, 0)));
        assert!(are_floats_equal(aspect(lc.camera()), 3.2, 1e-6));
    }

    #[test]
    fn resize_without_target_is_a_no_op() {
        let mut lc = lifecycle();
        assert!(!lc.resize());
        assert_eq!(lc.engine().size, Some((100, 100)));
    }

    #[test]
    fn cleanup_detaches_and_destroys_panel() {
        let mut lc = lifecycle();
        let target = MockTarget::new(640, 480);
        lc.init(target.clone()).unwrap();
        assert_eq!(lc.tick(16.0), FrameControl::Continue);

        let released = lc.cleanup();
        assert!(released.is_some());
        assert_eq!(lc.state(), LifecycleState::Unmounted);
        assert_eq!(target.children(), 0);
        assert_eq!(lc.engine().disposed, 1);
        assert!(lc.panel().is_destroyed());

        // the destroyed panel ignores later operations
        lc.panel.queued.push(number(ParamKey::EnvMapIntensity, 50.0));
        let params = lc.params().clone();
        let frame = PanelFrame { time_ms: 0.0, width: 1, height: 1, progress: None };
        assert!(lc.panel.poll(&frame, &params).is_empty());
        assert!(!lc.panel().wants_pointer());
        let overlays = lc.panel().overlays;
        lc.panel.render_overlay();
        assert_eq!(lc.panel().overlays, overlays);
        assert!(!lc.handle_pointer(PointerInput::Rotate { dx: 10.0, dy: 0.0 }));

        // no further drawing, and a second cleanup is a no-op
        let draws = lc.engine().draws;
        assert_eq!(lc.tick(32.0), FrameControl::Stop);
        assert_eq!(lc.engine().draws, draws);
        assert!(lc.cleanup().is_none());
        assert_eq!(lc.engine().disposed, 1);
    }

    #[test]
    fn remount_after_cleanup_rebuilds_panel() {
        let mut lc = lifecycle();
        let first = MockTarget::new(300, 200);
        lc.init(first.clone()).unwrap();
        lc.cleanup();

        let second = MockTarget::new(500, 500);
        lc.init(second.clone()).unwrap();
        assert_eq!(lc.panel().builds, 2);
        assert!(!lc.panel().is_destroyed());
        assert_eq!(second.children(), 1);
        assert_eq!(first.children(), 0);
    }

    #[test]
    fn second_init_replaces_active_target() {
        let mut lc = lifecycle();
        let first = MockTarget::new(300, 200);
        let second = MockTarget::new(800, 800);
        lc.init(first.clone()).unwrap();

        let replaced = lc.init(second.clone()).unwrap();
        assert!(replaced.is_some());
        assert_eq!(first.children(), 0);
        assert_eq!(second.children(), 1);
        assert_eq!(lc.engine().size, Some((800, 800)));
        assert!(are_floats_equal(aspect(lc.camera()), 1.0, 1e-6));
        assert_eq!(lc.panel().builds, 1);
        assert_eq!(lc.engine().created, 1);
    }

    #[test]
    fn failed_attach_keeps_the_current_mount() {
        let mut lc = lifecycle();
        let first = MockTarget::new(300, 200);
        lc.init(first.clone()).unwrap();

        let refusing = MockTarget::refusing(800, 800);
        assert!(matches!(lc.init(refusing.clone()), Err(SceneError::Surface(_))));
        assert_eq!(lc.state(), LifecycleState::Mounted);
        assert_eq!(first.children(), 1);
        assert_eq!(refusing.children(), 0);
        assert_eq!(lc.size(), (300, 200));
        assert!(!lc.panel().is_destroyed());

        // still the first target that drives resize and drawing
        first.set_size(600, 200);
        assert!(lc.resize());
        assert!(are_floats_equal(aspect(lc.camera()), 3.0, 1e-6));
        assert_eq!(lc.tick(16.0), FrameControl::Continue);
        assert_eq!(lc.cleanup().map(|t| t.children()), Some(0));
    }

    #[test]
    fn failed_first_attach_stays_unmounted() {
        let mut lc = lifecycle();
        assert!(lc.init(MockTarget::refusing(640, 480)).is_err());
        assert_eq!(lc.state(), LifecycleState::Unmounted);
        assert_eq!(lc.panel().builds, 0);
        assert_eq!(lc.tick(16.0), FrameControl::Stop);
    }

    #[test]
    fn initial_parameters_are_held_to_control_ranges() {
        let config = SceneConfig::from_json(
            r#"{"parameters":{"toneMappingExposure":1000,"envMapIntensity":-5,"ambientLightColor":4294967295}}"#,
        )
        .unwrap();
        let lc: Lifecycle = SceneLifecycle::new(config, MockEngine::default(), MockPanel::default()).unwrap();

        assert_eq!(lc.params().tone_mapping_exposure, 10.0);
        assert_eq!(lc.params().env_map_intensity, 1.0);
        assert_eq!(lc.params().ambient_light_color, HexColor::WHITE);
        assert_eq!(lc.render_settings().exposure, 10.0);
        assert_eq!(lc.scene().ambient_light().map(|l| l.color), Some(HexColor::WHITE));
    }

    #[test]
    fn env_map_change_from_panel_reaches_standard_materials() {
        let mut lc = lifecycle();
        lc.init(MockTarget::new(640, 480)).unwrap();
        let task = lc.begin_loading(&MockLoader::ok());
        futures::executor::block_on(task);
        lc.tick(0.0);

        lc.panel.queued.push(number(ParamKey::EnvMapIntensity, 37.5));
        lc.tick(16.0);

        assert_eq!(lc.params().env_map_intensity, 37.5);
        let mut standard = 0;
        lc.scene().traverse(|node, _| {
            if let NodeKind::Mesh(mesh) = &node.kind {
                match &mesh.material {
                    Material::Standard(m) => {
                        assert_eq!(m.env_map_intensity, 37.5);
                        assert_eq!(m.metallic, 0.0);
                        assert_eq!(m.roughness, 1.0);
                        assert_eq!(m.albedo, HexColor::WHITE);
                        standard += 1;
                    },
                    Material::Basic(b) => assert_eq!(b.color, HexColor::default()),
                }
            }
        });
        assert_eq!(standard, 1);
    }

    #[test]
    fn ambient_color_goes_to_the_ambient_light() {
        let mut lc = lifecycle();
        lc.apply_change(ParamChange {
            key: ParamKey::AmbientLightColor,
            value: ParamValue::Color(HexColor(0x0000ff)),
        });
        lc.apply_change(number(ParamKey::DirectionalLightIntensity, 3.0));

        let mut scene = lc.scene().clone();
        assert_eq!(scene.ambient_light_mut().unwrap().color, HexColor(0x0000ff));
        let sun = scene.directional_light_mut().unwrap();
        assert_eq!(sun.color, HexColor::WHITE);
        assert_eq!(sun.intensity, 3.0);
    }

    #[test]
    fn exposure_is_clamped_and_fed_to_renderer() {
        let mut lc = lifecycle();
        let stored = lc.apply_change(number(ParamKey::ToneMappingExposure, 50.0)).unwrap();
        assert_eq!(stored.value, ParamValue::Number(10.0));
        assert_eq!(lc.render_settings().exposure, 10.0);
    }

    #[test]
    fn failed_load_leaves_scene_untouched() {
        let mut lc = lifecycle();
        lc.init(MockTarget::new(640, 480)).unwrap();
        let nodes = lc.scene().node_count();
        let revision = lc.scene().revision();

        let task = lc.begin_loading(&MockLoader::failing());
        assert!(lc.is_loading());
        futures::executor::block_on(task);
        assert_eq!(lc.tick(16.0), FrameControl::Continue);

        assert!(!lc.is_loading());
        assert_eq!(lc.scene().node_count(), nodes);
        assert_eq!(lc.scene().revision(), revision);
        assert!(lc.scene().environment().is_none());
        assert_eq!(lc.engine().draws, 1);
    }

    #[test]
    fn successful_load_adds_model_and_environment() {
        let mut lc = lifecycle();
        lc.init(MockTarget::new(640, 480)).unwrap();
        let task = lc.begin_loading(&MockLoader::ok());

        // nothing is visible before the task has run
        lc.tick(0.0);
        assert_eq!(lc.scene().node_count(), 3);
        assert_eq!(lc.panel().last_frame.and_then(|f| f.progress), Some(0.0));

        futures::executor::block_on(task);
        lc.tick(16.0);

        assert_eq!(lc.scene().node_count(), 4);
        assert!(lc.scene().environment().is_some());
        assert_eq!(lc.progress().map(|p| p.loaded), Some(7));
        lc.scene().traverse(|node, _| {
            if let NodeKind::Mesh(mesh) = &node.kind {
                assert!(mesh.cast_shadow && mesh.receive_shadow);
            }
        });

        lc.tick(32.0);
        assert_eq!(lc.panel().last_frame.and_then(|f| f.progress), None);
    }

    #[test]
    fn pointer_goes_to_panel_when_it_wants_it() {
        let mut lc = lifecycle();
        assert!(!lc.handle_pointer(PointerInput::Rotate { dx: 10.0, dy: 0.0 }));

        lc.init(MockTarget::new(640, 480)).unwrap();
        lc.panel.wants_pointer = true;
        assert!(!lc.handle_pointer(PointerInput::Rotate { dx: 10.0, dy: 0.0 }));

        lc.panel.wants_pointer = false;
        let before = *lc.camera().position();
        assert!(lc.handle_pointer(PointerInput::Rotate { dx: 50.0, dy: 0.0 }));
        lc.tick(16.0);
        assert!((lc.camera().position() - before).magnitude() > 0.0);
    }

    #[test]
    fn draw_errors_do_not_stop_the_loop() {
        let mut lc = lifecycle();
        lc.engine.fail_draw = true;
        lc.init(MockTarget::new(10, 10)).unwrap();
        assert_eq!(lc.tick(16.0), FrameControl::Continue);
        assert_eq!(lc.panel().overlays, 1);
    }

    #[test]
    fn parameters_are_per_instance() {
        let mut a = lifecycle();
        let b = lifecycle();
        a.apply_change(number(ParamKey::EnvMapIntensity, 80.0));
        assert_eq!(a.params().env_map_intensity, 80.0);
        assert_eq!(b.params().env_map_intensity, 1.0);
    }
}
