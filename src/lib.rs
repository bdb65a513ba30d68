use wasm_bindgen::prelude::*;

pub mod error;
pub mod utils;
pub mod params;
pub mod config;
pub mod camera;
pub mod scene;
pub mod gltf;
pub mod engine;
pub mod loader;
pub mod frame;
pub mod lifecycle;

#[cfg(target_arch = "wasm32")]
pub mod renderer;
#[cfg(target_arch = "wasm32")]
pub mod panel;
#[cfg(target_arch = "wasm32")]
pub mod assets;
#[cfg(target_arch = "wasm32")]
pub mod mount;

pub use config::SceneConfig;
pub use error::{LoadError, SceneError};
pub use lifecycle::{LifecycleState, SceneLifecycle};
pub use params::{ParamChange, ParamKey, ParamValue, SceneParameters};

#[cfg(target_arch = "wasm32")]
pub use mount::{clean_up_scene, init_scene, SceneMount};


#[wasm_bindgen(start)]
pub fn start() {
    utils::set_panic_hook();
    #[cfg(target_arch = "wasm32")]
    utils::init_logging();
}
