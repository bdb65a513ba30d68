//! Live-editable scene parameters and the panel controls bound to them.

use serde::{Deserialize, Serialize};


/// A 24-bit `0xRRGGBB` colour, the form the panel colour pickers edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HexColor(pub u32);

impl HexColor {
    pub const WHITE: HexColor = HexColor(0xffffff);

    pub fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        HexColor((u32::from(r) << 16) | (u32::from(g) << 8) | u32::from(b))
    }

    pub fn rgb(self) -> [u8; 3] {
        [(self.0 >> 16) as u8, (self.0 >> 8) as u8, self.0 as u8]
    }
}

impl Default for HexColor {
    fn default() -> Self {
        HexColor::WHITE
    }
}


#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamKey {
    EnvMapIntensity,
    ToneMappingExposure,
    DirectionalLightIntensity,
    DirectionalLightColor,
    AmbientLightIntensity,
    AmbientLightColor,
}

impl ParamKey {
    pub const ALL: [ParamKey; 6] = [
        ParamKey::EnvMapIntensity,
        ParamKey::ToneMappingExposure,
        ParamKey::DirectionalLightIntensity,
        ParamKey::DirectionalLightColor,
        ParamKey::AmbientLightIntensity,
        ParamKey::AmbientLightColor,
    ];
}


#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamValue {
    Number(f32),
    Color(HexColor),
}


/// A single edit coming out of the debug panel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamChange {
    pub key: ParamKey,
    pub value: ParamValue,
}


#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlKind {
    Slider { min: f32, max: f32, step: f32 },
    Color,
}


#[derive(Debug, Clone, PartialEq)]
pub struct ControlSpec {
    pub key: ParamKey,
    pub label: &'static str,
    pub kind: ControlKind,
}

impl ControlSpec {
    /// Clamps a number into the slider range and snaps it to the step grid.
    pub fn constrain(&self, value: ParamValue) -> Option<ParamValue> {
        match (self.kind, value) {
            (ControlKind::Slider { min, max, step }, ParamValue::Number(v)) => {
                if !v.is_finite() {
                    return None;
                }
                let mut v = v.clamp(min, max);
                if step > 0.0 {
                    // grid anchored at `min`, computed in f64 so on-grid values come back unchanged
                    let (min64, step64) = (f64::from(min), f64::from(step));
                    let snapped = ((f64::from(v) - min64) / step64).round() * step64 + min64;
                    v = (snapped as f32).clamp(min, max);
                }
                Some(ParamValue::Number(v))
            },
            (ControlKind::Color, ParamValue::Color(c)) => Some(ParamValue::Color(HexColor(c.0 & 0xffffff))),
            _ => None,
        }
    }
}


#[derive(Debug, Clone, PartialEq)]
pub struct ControlFolder {
    pub name: &'static str,
    pub controls: Vec<ControlSpec>,
}


/// The panel layout: a "Renderer" folder and a "Lights" folder.
pub fn control_folders() -> Vec<ControlFolder> {
    vec![
        ControlFolder {
            name: "Renderer",
            controls: vec![ControlSpec {
                key: ParamKey::ToneMappingExposure,
                label: "Exposure",
                kind: ControlKind::Slider { min: 1.0, max: 10.0, step: 0.0001 },
            }],
        },
        ControlFolder {
            name: "Lights",
            controls: vec![
                ControlSpec {
                    key: ParamKey::EnvMapIntensity,
                    label: "EnvMap Intensity",
                    kind: ControlKind::Slider { min: 1.0, max: 100.0, step: 0.0001 },
                },
                ControlSpec {
                    key: ParamKey::DirectionalLightIntensity,
                    label: "DL Intensity",
                    kind: ControlKind::Slider { min: 1.0, max: 10.0, step: 0.0001 },
                },
                ControlSpec {
                    key: ParamKey::DirectionalLightColor,
                    label: "DL Color",
                    kind: ControlKind::Color,
                },
                ControlSpec {
                    key: ParamKey::AmbientLightIntensity,
                    label: "AL Intensity",
                    kind: ControlKind::Slider { min: 1.0, max: 10.0, step: 0.0001 },
                },
                ControlSpec {
                    key: ParamKey::AmbientLightColor,
                    label: "AL Color",
                    kind: ControlKind::Color,
                },
            ],
        },
    ]
}

pub fn control_spec(key: ParamKey) -> Option<ControlSpec> {
    control_folders()
        .into_iter()
        .flat_map(|f| f.controls)
        .find(|c| c.key == key)
}


/// Current values of every tweakable parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SceneParameters {
    pub env_map_intensity: f32,
    pub tone_mapping_exposure: f32,
    pub directional_light_intensity: f32,
    pub directional_light_color: HexColor,
    pub ambient_light_intensity: f32,
    pub ambient_light_color: HexColor,
}

impl Default for SceneParameters {
    fn default() -> Self {
        Self {
            env_map_intensity: 1.0,
            tone_mapping_exposure: 1.7,
            directional_light_intensity: 10.0,
            directional_light_color: HexColor::WHITE,
            ambient_light_intensity: 5.9,
            ambient_light_color: HexColor::WHITE,
        }
    }
}

impl SceneParameters {
    pub fn get(&self, key: ParamKey) -> ParamValue {
        match key {
            ParamKey::EnvMapIntensity => ParamValue::Number(self.env_map_intensity),
            ParamKey::ToneMappingExposure => ParamValue::Number(self.tone_mapping_exposure),
            ParamKey::DirectionalLightIntensity => ParamValue::Number(self.directional_light_intensity),
            ParamKey::DirectionalLightColor => ParamValue::Color(self.directional_light_color),
            ParamKey::AmbientLightIntensity => ParamValue::Number(self.ambient_light_intensity),
            ParamKey::AmbientLightColor => ParamValue::Color(self.ambient_light_color),
        }
    }

    /// Stores a value after constraining it to its control.
    /// Returns the stored change, or `None` when the value kind does not match the key.
    pub fn set(&mut self, change: ParamChange) -> Option<ParamChange> {
        let spec = control_spec(change.key)?;
        let value = spec.constrain(change.value)?;
        match (change.key, value) {
            (ParamKey::EnvMapIntensity, ParamValue::Number(v)) => self.env_map_intensity = v,
            (ParamKey::ToneMappingExposure, ParamValue::Number(v)) => self.tone_mapping_exposure = v,
            (ParamKey::DirectionalLightIntensity, ParamValue::Number(v)) => self.directional_light_intensity = v,
            (ParamKey::DirectionalLightColor, ParamValue::Color(c)) => self.directional_light_color = c,
            (ParamKey::AmbientLightIntensity, ParamValue::Number(v)) => self.ambient_light_intensity = v,
            (ParamKey::AmbientLightColor, ParamValue::Color(c)) => self.ambient_light_color = c,
            _ => return None,
        }
        Some(ParamChange { key: change.key, value })
    }

    /// Copy with every value held to its control. A value the control
    /// rejects outright (NaN) falls back to the default.
    pub fn constrained(&self) -> Self {
        let mut out = Self::default();
        for key in ParamKey::ALL {
            out.set(ParamChange { key, value: self.get(key) });
        }
        out
    }
}
