use thiserror::Error;


/// Failure of a single asset load. Cloneable so it can travel over a [bus::Bus].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LoadError {
    #[error("failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("failed to decode {url}: {reason}")]
    Decode { url: String, reason: String },

    #[error("{url} requires unsupported extension {extension}")]
    UnsupportedExtension { url: String, extension: String },
}


#[derive(Debug, Error)]
pub enum SceneError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("render surface error: {0}")]
    Surface(String),

    #[error("render error: {0}")]
    Render(String),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("javascript error: {0}")]
    Js(String),
}

impl From<serde_json::Error> for SceneError {
    fn from(e: serde_json::Error) -> Self {
        SceneError::Config(e.to_string())
    }
}

impl From<wasm_bindgen::JsValue> for SceneError {
    fn from(v: wasm_bindgen::JsValue) -> Self {
        SceneError::Js(v.as_string().unwrap_or_else(|| format!("{:?}", v)))
    }
}

impl From<SceneError> for wasm_bindgen::JsValue {
    fn from(e: SceneError) -> Self {
        wasm_bindgen::JsValue::from_str(&e.to_string())
    }
}


pub type Result<T, E = SceneError> = std::result::Result<T, E>;
