use std::{f32::consts::PI, sync::Arc};

use three_d::*;

use crate::config::SceneConfig;
use crate::params::{HexColor, SceneParameters};


/// Physically based material that reacts to the environment map.
#[derive(Debug, Clone)]
pub struct StandardMaterial {
    pub albedo: HexColor,
    pub metallic: f32,
    pub roughness: f32,
    pub env_map_intensity: f32,
    /// Decoded material (textures included) when the mesh came from a model file
    pub source: Option<Arc<CpuMaterial>>,
}

impl Default for StandardMaterial {
    fn default() -> Self {
        Self {
            albedo: HexColor::WHITE,
            metallic: 0.0,
            roughness: 1.0,
            env_map_intensity: 1.0,
            source: None,
        }
    }
}


/// Unlit material, ignores lights and the environment.
#[derive(Debug, Clone, Default)]
pub struct BasicMaterial {
    pub color: HexColor,
    pub wireframe: bool,
}


#[derive(Debug, Clone)]
pub enum Material {
    Standard(StandardMaterial),
    Basic(BasicMaterial),
}


#[derive(Debug, Clone)]
pub struct MeshNode {
    pub geometry: Arc<CpuMesh>,
    pub material: Material,
    pub cast_shadow: bool,
    pub receive_shadow: bool,
}


#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowSettings {
    pub map_size: u32,
    pub bias: f32,
    pub normal_bias: f32,
}


#[derive(Debug, Clone)]
pub struct DirectionalLightNode {
    pub intensity: f32,
    pub color: HexColor,
    pub cast_shadow: bool,
    pub shadow: ShadowSettings,
}


#[derive(Debug, Clone)]
pub struct AmbientLightNode {
    pub intensity: f32,
    pub color: HexColor,
}


#[derive(Debug, Clone)]
pub enum NodeKind {
    Group,
    Mesh(MeshNode),
    DirectionalLight(DirectionalLightNode),
    AmbientLight(AmbientLightNode),
}


#[derive(Debug, Clone)]
pub struct SceneNode {
    pub name: String,
    /// Local transformation relative to the parent
    pub transform: Mat4,
    pub kind: NodeKind,
    pub children: Vec<SceneNode>,
}

impl SceneNode {
    pub fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            transform: Mat4::identity(),
            kind,
            children: Vec::new(),
        }
    }

    pub fn with_transform(mut self, transform: Mat4) -> Self {
        self.transform = transform;
        self
    }

    fn visit<F: FnMut(&SceneNode, &Mat4)>(&self, parent: &Mat4, f: &mut F) {
        let world = *parent * self.transform;
        f(self, &world);
        for child in self.children.iter() {
            child.visit(&world, f);
        }
    }

    fn visit_mut<F: FnMut(&mut SceneNode)>(&mut self, f: &mut F) {
        f(self);
        for child in self.children.iter_mut() {
            child.visit_mut(f);
        }
    }
}


/// Six decoded cube map faces in +X, -X, +Y, -Y, +Z, -Z order.
#[derive(Debug, Clone)]
pub struct EnvironmentMap {
    pub faces: [Arc<CpuTexture>; 6],
}


/// The scene graph drawn every frame.
/// `revision` changes whenever nodes are added or removed so the renderer
/// knows when to rebuild GPU objects; material and light values are read every frame.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    nodes: Vec<SceneNode>,
    environment: Option<EnvironmentMap>,
    revision: u64,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ground plane, directional light and ambient light
    pub fn with_defaults(config: &SceneConfig, params: &SceneParameters) -> Self {
        let mut scene = Scene::new();

        // CpuMesh::square() spans [-1, 1], scale it to 5x5 and lay it flat
        let plane = SceneNode::new(
            "base-plane",
            NodeKind::Mesh(MeshNode {
                geometry: Arc::new(CpuMesh::square()),
                material: Material::Standard(StandardMaterial {
                    env_map_intensity: params.env_map_intensity,
                    ..Default::default()
                }),
                cast_shadow: false,
                receive_shadow: true,
            }),
        )
        .with_transform(
            Mat4::from_translation(vec3(0.0, -1.0, 0.0))
                * Mat4::from_angle_x(radians(-0.5 * PI))
                * Mat4::from_scale(2.5),
        );

        let [x, y, z] = config.lights.directional_position;
        let sun = SceneNode::new(
            "directional-light",
            NodeKind::DirectionalLight(DirectionalLightNode {
                intensity: params.directional_light_intensity,
                color: params.directional_light_color,
                cast_shadow: config.renderer.shadows,
                shadow: ShadowSettings {
                    map_size: config.renderer.shadow_map_size,
                    bias: config.lights.shadow_bias,
                    normal_bias: config.lights.shadow_normal_bias,
                },
            }),
        )
        .with_transform(Mat4::from_translation(vec3(x, y, z)));

        let ambient = SceneNode::new(
            "ambient-light",
            NodeKind::AmbientLight(AmbientLightNode {
                intensity: params.ambient_light_intensity,
                color: params.ambient_light_color,
            }),
        );

        scene.append(vec![plane, sun, ambient]);
        scene
    }

    pub fn nodes(&self) -> &[SceneNode] {
        &self.nodes
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn environment(&self) -> Option<&EnvironmentMap> {
        self.environment.as_ref()
    }

    pub fn set_environment(&mut self, environment: EnvironmentMap) {
        self.environment = Some(environment);
        self.revision += 1;
    }

    /// Adds nodes to the scene root
    pub fn append(&mut self, nodes: Vec<SceneNode>) {
        if nodes.is_empty() {
            return;
        }
        self.nodes.extend(nodes);
        self.revision += 1;
    }

    /// Visits every node depth-first together with its world transformation
    pub fn traverse<F: FnMut(&SceneNode, &Mat4)>(&self, mut f: F) {
        let root = Mat4::identity();
        for node in self.nodes.iter() {
            node.visit(&root, &mut f);
        }
    }

    pub fn traverse_mut<F: FnMut(&mut SceneNode)>(&mut self, mut f: F) {
        for node in self.nodes.iter_mut() {
            node.visit_mut(&mut f);
        }
    }

    pub fn node_count(&self) -> usize {
        let mut n = 0;
        self.traverse(|_, _| n += 1);
        n
    }

    pub fn mesh_count(&self) -> usize {
        let mut n = 0;
        self.traverse(|node, _| {
            if let NodeKind::Mesh(_) = node.kind {
                n += 1;
            }
        });
        n
    }

    pub fn cast_and_receive_shadows(&mut self) {
        self.traverse_mut(|node| {
            if let NodeKind::Mesh(mesh) = &mut node.kind {
                mesh.cast_shadow = true;
                mesh.receive_shadow = true;
            }
        });
    }

    /// Sets the env map intensity of every standard material.
    /// Returns the number of materials touched.
    pub fn set_env_map_intensity(&mut self, intensity: f32) -> usize {
        let mut n = 0;
        self.traverse_mut(|node| {
            if let NodeKind::Mesh(MeshNode { material: Material::Standard(m), .. }) = &mut node.kind {
                m.env_map_intensity = intensity;
                n += 1;
            }
        });
        n
    }

    /// Env map intensity shared by the standard materials, if there are any
    pub fn env_map_intensity(&self) -> Option<f32> {
        let mut found = None;
        self.traverse(|node, _| {
            if found.is_none() {
                if let NodeKind::Mesh(MeshNode { material: Material::Standard(m), .. }) = &node.kind {
                    found = Some(m.env_map_intensity);
                }
            }
        });
        found
    }

    pub fn directional_light(&self) -> Option<&DirectionalLightNode> {
        self.nodes.iter().find_map(|n| match &n.kind {
            NodeKind::DirectionalLight(light) => Some(light),
            _ => None,
        })
    }

    pub fn ambient_light(&self) -> Option<&AmbientLightNode> {
        self.nodes.iter().find_map(|n| match &n.kind {
            NodeKind::AmbientLight(light) => Some(light),
            _ => None,
        })
    }

    pub fn directional_light_mut(&mut self) -> Option<&mut DirectionalLightNode> {
        self.nodes.iter_mut().find_map(|n| match &mut n.kind {
            NodeKind::DirectionalLight(light) => Some(light),
            _ => None,
        })
    }

    pub fn ambient_light_mut(&mut self) -> Option<&mut AmbientLightNode> {
        self.nodes.iter_mut().find_map(|n| match &mut n.kind {
            NodeKind::AmbientLight(light) => Some(light),
            _ => None,
        })
    }
}
