//! Loading glTF models and cube map faces over HTTP.

use std::sync::Arc;

use futures::future::LocalBoxFuture;
use three_d::*;
use three_d_asset::io::{load_async, RawAssets};
use tracing::{info, warn};

use crate::config::CubeFaces;
use crate::error::LoadError;
use crate::gltf::check_supported;
use crate::loader::{resolve_urls, AssetLoader, SharedTracker};
use crate::params::HexColor;
use crate::scene::{EnvironmentMap, Material, MeshNode, NodeKind, SceneNode, StandardMaterial};


#[derive(Debug, Default, Clone, Copy)]
pub struct HttpAssetLoader;


/// Resolves `path` against the document base URL. three-d-asset would join it
/// onto its own base with `PathBuf::join`, which drops the base for `/` paths.
fn join_page(path: &str) -> Result<String, String> {
    let base = web_sys::window()
        .and_then(|w| w.document())
        .ok_or("no document")?
        .base_uri()
        .map_err(|e| format!("{:?}", e))?
        .ok_or("document has no base URL")?;
    web_sys::Url::new_with_base(path, &base)
        .map(|url| url.href())
        .map_err(|e| e.as_string().unwrap_or_else(|| format!("{:?}", e)))
}


/// Fetches absolute `urls`. Raw assets are keyed by these URLs.
async fn fetch(urls: &[String]) -> Result<RawAssets, LoadError> {
    load_async(urls).await.map_err(|e| LoadError::Fetch {
        url: urls.join(", "),
        reason: e.to_string(),
    })
}


fn decode_error(url: &str, e: impl ToString) -> LoadError {
    LoadError::Decode { url: url.to_string(), reason: e.to_string() }
}


/// One group per model with a mesh child per primitive
fn model_nodes(url: &str, model: CpuModel) -> SceneNode {
    let materials: Vec<Arc<CpuMaterial>> = model.materials.into_iter().map(Arc::new).collect();
    let mut root = SceneNode::new(
        if model.name.is_empty() { url.to_string() } else { model.name },
        NodeKind::Group,
    );

    for primitive in model.geometries.into_iter() {
        let mesh = match primitive.geometry {
            three_d_asset::Geometry::Triangles(mesh) => mesh,
            three_d_asset::Geometry::Points(_) => {
                warn!("model_nodes(): skipping point cloud {} in {}", primitive.name, url);
                continue;
            },
        };
        let material = match primitive.material_index.and_then(|i| materials.get(i)) {
            Some(source) => StandardMaterial {
                albedo: HexColor::from_rgb(source.albedo.r, source.albedo.g, source.albedo.b),
                metallic: source.metallic,
                roughness: source.roughness,
                source: Some(source.clone()),
                ..Default::default()
            },
            None => StandardMaterial::default(),
        };
        root.children.push(
            SceneNode::new(
                primitive.name,
                NodeKind::Mesh(MeshNode {
                    geometry: Arc::new(mesh),
                    material: Material::Standard(material),
                    cast_shadow: false,
                    receive_shadow: false,
                }),
            )
            .with_transform(primitive.transformation),
        );
    }
    root
}


async fn load_model(path: &str) -> Result<Vec<SceneNode>, LoadError> {
    let urls = resolve_urls(&[path], join_page)?;
    let url = urls[0].as_str();
    let mut raw = fetch(&urls).await?;
    check_supported(url, raw.get(url).map_err(|e| decode_error(url, e))?)?;
    let model: CpuModel = raw.deserialize(url).map_err(|e| decode_error(url, e))?;
    let root = model_nodes(url, model);
    info!("load_model(): {} has {} meshes", url, root.children.len());
    Ok(vec![root])
}


async fn load_faces(faces: &CubeFaces) -> Result<EnvironmentMap, LoadError> {
    let urls = resolve_urls(&faces.paths(), join_page)?;
    let mut raw = fetch(&urls).await?;
    let mut decoded = Vec::with_capacity(urls.len());
    for url in urls.iter() {
        let texture: CpuTexture = raw.deserialize(url).map_err(|e| decode_error(url, e))?;
        decoded.push(Arc::new(texture));
    }
    let faces: [Arc<CpuTexture>; 6] = decoded
        .try_into()
        .map_err(|_| decode_error(&urls[0], "expected six cube map faces"))?;
    Ok(EnvironmentMap { faces })
}


impl AssetLoader for HttpAssetLoader {
    fn load_model(&self, url: &str, tracker: SharedTracker)
        -> LocalBoxFuture<'static, Result<Vec<SceneNode>, LoadError>>
    {
        let url = url.to_string();
        Box::pin(async move {
            let result = load_model(&url).await;
            tracker.borrow_mut().item_done(&url);
            result
        })
    }

    fn load_environment(&self, faces: &CubeFaces, tracker: SharedTracker)
        -> LocalBoxFuture<'static, Result<EnvironmentMap, LoadError>>
    {
        let faces = faces.clone();
        Box::pin(async move {
            let result = load_faces(&faces).await;
            // the faces arrive together, so they finish together
            let mut tracker = tracker.borrow_mut();
            for path in faces.paths().iter() {
                tracker.item_done(path);
            }
            result
        })
    }
}
