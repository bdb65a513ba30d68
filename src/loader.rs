//! Asynchronous asset loading with progress and completion channels.

use std::{cell::RefCell, rc::Rc};

use bus::{Bus, BusReader};
use futures::future::{self, LocalBoxFuture};
use tracing::debug;

use crate::config::{AssetsConfig, CubeFaces};
use crate::error::LoadError;
use crate::scene::{EnvironmentMap, SceneNode};


#[derive(Debug, Clone, PartialEq)]
pub struct LoadProgress {
    pub loaded: usize,
    pub total: usize,
    pub item: String,
}

impl LoadProgress {
    pub fn fraction(&self) -> f32 {
        if self.total == 0 {
            1.0
        } else {
            self.loaded as f32 / self.total as f32
        }
    }
}


/// Counts finished items (successful or not) and broadcasts progress.
pub struct LoadTracker {
    bus: Bus<LoadProgress>,
    loaded: usize,
    total: usize,
}

impl LoadTracker {
    pub fn new(total: usize) -> (Self, BusReader<LoadProgress>) {
        // room for every item so a slow reader never makes us drop one
        let mut bus = Bus::new(total.max(1));
        let rx = bus.add_rx();
        (Self { bus, loaded: 0, total }, rx)
    }

    pub fn item_done(&mut self, item: &str) {
        self.loaded = (self.loaded + 1).min(self.total);
        let progress = LoadProgress {
            loaded: self.loaded,
            total: self.total,
            item: item.to_string(),
        };
        debug!("LoadTracker::item_done(): {} ({}/{})", item, progress.loaded, progress.total);
        // non-blocking; a full bus only loses intermediate progress
        let _ = self.bus.try_broadcast(progress);
    }

    pub fn is_complete(&self) -> bool {
        self.loaded >= self.total
    }
}

pub type SharedTracker = Rc<RefCell<LoadTracker>>;


#[derive(Debug, Clone)]
pub enum Loaded {
    Model(Vec<SceneNode>),
    Environment(EnvironmentMap),
}

pub type LoadOutcome = Result<Loaded, LoadError>;


/// Fetches and decodes assets into scene nodes.
/// Implementations call [LoadTracker::item_done] once per file, failures included.
pub trait AssetLoader {
    fn load_model(&self, url: &str, tracker: SharedTracker)
        -> LocalBoxFuture<'static, Result<Vec<SceneNode>, LoadError>>;

    fn load_environment(&self, faces: &CubeFaces, tracker: SharedTracker)
        -> LocalBoxFuture<'static, Result<EnvironmentMap, LoadError>>;
}


/// Receiving ends of a running load.
pub struct LoadChannels {
    pub outcomes: BusReader<LoadOutcome>,
    pub progress: BusReader<LoadProgress>,
}


/// Starts loading the model and the environment concurrently.
/// The returned future must be driven to completion by the caller; both
/// outcomes are broadcast on `outcomes` once it finishes.
pub fn load_assets<L: AssetLoader + ?Sized>(
    loader: &L,
    assets: &AssetsConfig,
) -> (LocalBoxFuture<'static, ()>, LoadChannels) {
    // the model file plus six cube faces
    let (tracker, progress) = LoadTracker::new(1 + 6);
    let tracker = Rc::new(RefCell::new(tracker));

    let mut outcomes = Bus::<LoadOutcome>::new(2);
    let rx_outcomes = outcomes.add_rx();

    let model = loader.load_model(&assets.model, tracker.clone());
    let environment = loader.load_environment(&assets.environment, tracker);

    let task: LocalBoxFuture<'static, ()> = Box::pin(async move {
        let (model, environment) = future::join(model, environment).await;
        let _ = outcomes.try_broadcast(model.map(Loaded::Model));
        let _ = outcomes.try_broadcast(environment.map(Loaded::Environment));
    });

    (task, LoadChannels { outcomes: rx_outcomes, progress })
}


/// Makes configured asset paths absolute. Absolute and `data:` URLs are kept;
/// every other path goes through `join`, which resolves it against the page.
pub fn resolve_urls<F>(paths: &[&str], join: F) -> Result<Vec<String>, LoadError>
where
    F: Fn(&str) -> Result<String, String>,
{
    paths
        .iter()
        .map(|path| {
            if is_absolute_url(path) {
                Ok(path.to_string())
            } else {
                join(path).map_err(|reason| LoadError::Fetch { url: path.to_string(), reason })
            }
        })
        .collect()
}

fn is_absolute_url(path: &str) -> bool {
    path.starts_with("data:") || path.find("://").map_or(false, |i| i > 0)
}


#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Arc;
    use three_d::{CpuMesh, CpuTexture};

    use crate::scene::{BasicMaterial, Material, MeshNode, NodeKind};

    /// Loader that resolves immediately with canned results
    pub struct MockLoader {
        pub model: Result<Vec<SceneNode>, LoadError>,
        pub environment: Result<EnvironmentMap, LoadError>,
    }

    impl MockLoader {
        pub fn ok() -> Self {
            Self {
                model: Ok(vec![helmet()]),
                environment: Ok(environment()),
            }
        }

        pub fn failing() -> Self {
            Self {
                model: Err(LoadError::Fetch { url: "/helmet.gltf".into(), reason: "404".into() }),
                environment: Err(LoadError::Decode { url: "/px.png".into(), reason: "bad png".into() }),
            }
        }
    }

    impl AssetLoader for MockLoader {
        fn load_model(&self, url: &str, tracker: SharedTracker)
            -> LocalBoxFuture<'static, Result<Vec<SceneNode>, LoadError>>
        {
            let result = self.model.clone();
            let url = url.to_string();
            Box::pin(async move {
                tracker.borrow_mut().item_done(&url);
                result
            })
        }

        fn load_environment(&self, faces: &CubeFaces, tracker: SharedTracker)
            -> LocalBoxFuture<'static, Result<EnvironmentMap, LoadError>>
        {
            let result = self.environment.clone();
            let paths: Vec<String> = faces.paths().iter().map(|p| p.to_string()).collect();
            Box::pin(async move {
                for p in paths.iter() {
                    tracker.borrow_mut().item_done(p);
                }
                result
            })
        }
    }

    pub fn helmet() -> SceneNode {
        SceneNode::new(
            "helmet",
            NodeKind::Mesh(MeshNode {
                geometry: Arc::new(CpuMesh::cube()),
                material: Material::Basic(BasicMaterial::default()),
                cast_shadow: false,
                receive_shadow: false,
            }),
        )
    }

    pub fn environment() -> EnvironmentMap {
        let face = Arc::new(CpuTexture::default());
        EnvironmentMap {
            faces: [face.clone(), face.clone(), face.clone(), face.clone(), face.clone(), face],
        }
    }

    #[test]
    fn tracker_reports_fractions() {
        let (mut tracker, mut rx) = LoadTracker::new(4);
        tracker.item_done("a");
        tracker.item_done("b");
        let first = rx.try_recv().unwrap();
        assert_eq!(first.loaded, 1);
        assert_eq!(first.item, "a");
        assert_eq!(rx.try_recv().unwrap().fraction(), 0.5);
        assert!(!tracker.is_complete());
        tracker.item_done("c");
        tracker.item_done("d");
        assert!(tracker.is_complete());
    }

    #[test]
    fn tracker_never_exceeds_total() {
        let (mut tracker, _rx) = LoadTracker::new(1);
        tracker.item_done("a");
        tracker.item_done("a-again");
        assert!(tracker.is_complete());
        assert_eq!(LoadProgress { loaded: 0, total: 0, item: String::new() }.fraction(), 1.0);
    }

    #[test]
    fn both_outcomes_arrive_after_the_task_runs() {
        let (task, mut channels) = load_assets(&MockLoader::ok(), &AssetsConfig::default());
        assert!(channels.outcomes.try_recv().is_err());

        futures::executor::block_on(task);

        let mut models = 0;
        let mut environments = 0;
        while let Ok(outcome) = channels.outcomes.try_recv() {
            match outcome {
                Ok(Loaded::Model(nodes)) => {
                    assert_eq!(nodes.len(), 1);
                    models += 1;
                },
                Ok(Loaded::Environment(_)) => environments += 1,
                Err(e) => panic!("unexpected error {}", e),
            }
        }
        assert_eq!((models, environments), (1, 1));

        let mut last = None;
        while let Ok(p) = channels.progress.try_recv() {
            last = Some(p);
        }
        assert_eq!(last.map(|p| (p.loaded, p.total)), Some((7, 7)));
    }

    /// Joins the way a browser does for a page at http://host/app/index.html
    fn join_page(path: &str) -> Result<String, String> {
        if path.is_empty() {
            return Err("empty path".into());
        }
        Ok(match path.strip_prefix('/') {
            Some(rooted) => format!("http://host/{}", rooted),
            None => format!("http://host/app/{}", path.trim_start_matches("./")),
        })
    }

    #[test]
    fn default_paths_resolve_against_the_page() {
        let assets = AssetsConfig::default();
        let urls = resolve_urls(&[assets.model.as_str()], join_page).unwrap();
        assert_eq!(urls, vec!["http://host/modelos/space_helmet/helmet.gltf".to_string()]);

        let faces = resolve_urls(&assets.environment.paths(), join_page).unwrap();
        assert_eq!(faces[0], "http://host/Cube-Map/px.png");
        assert_eq!(faces[5], "http://host/Cube-Map/nz.png");
    }

    #[test]
    fn absolute_urls_are_kept_and_join_errors_surface() {
        let urls = resolve_urls(
            &["https://cdn.example.com/a.gltf", "data:image/png;base64,AAAA", "./b.png"],
            join_page,
        )
        .unwrap();
        assert_eq!(urls[0], "https://cdn.example.com/a.gltf");
        assert_eq!(urls[1], "data:image/png;base64,AAAA");
        assert_eq!(urls[2], "http://host/app/b.png");

        let err = resolve_urls(&["/ok.png", ""], join_page).unwrap_err();
        assert_eq!(err, LoadError::Fetch { url: String::new(), reason: "empty path".into() });
    }

    #[test]
    fn failures_travel_as_errors() {
        let (task, mut channels) = load_assets(&MockLoader::failing(), &AssetsConfig::default());
        futures::executor::block_on(task);
        let first = channels.outcomes.try_recv().unwrap();
        assert!(matches!(first, Err(LoadError::Fetch { .. })));
        let second = channels.outcomes.try_recv().unwrap();
        assert!(matches!(second, Err(LoadError::Decode { .. })));
    }
}
