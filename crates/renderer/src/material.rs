//! Material channels extracted from imported material descriptions.

use asset::material::{MaterialDescription, MaterialSemantic};
use glam::Vec3;

use crate::gpu_types::MaterialUniform;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MaterialProperties {
    pub base_color: Vec3,
    pub specular_color: Vec3,
    pub shininess: f32,
    pub roughness: f32,
    pub ambient_occlusion: f32,
}

impl Default for MaterialProperties {
    fn default() -> Self {
        Self {
            base_color: Vec3::ZERO,
            specular_color: Vec3::ZERO,
            shininess: 0.0,
            roughness: 0.0,
            ambient_occlusion: 1.0,
        }
    }
}

impl MaterialProperties {
    /// Best-effort conversion: each channel is taken only when present with
    /// the expected type, otherwise it keeps its default.
    pub fn from_description(desc: &MaterialDescription) -> Self {
        let mut props = Self::default();

        if let Some(c) = desc.float3(MaterialSemantic::BaseColor) {
            props.base_color = Vec3::from_array(c);
        }
        if let Some(c) = desc.float3(MaterialSemantic::Specular) {
            props.specular_color = Vec3::from_array(c);
        }
        if let Some(s) = desc.float(MaterialSemantic::SpecularExponent) {
            props.shininess = s;
        }
        // Roughness is declared as a float3; the first component is used.
        if let Some([r, _, _]) = desc.float3(MaterialSemantic::Roughness) {
            props.roughness = r;
        }

        props
    }

    pub fn to_uniform(&self, has_texture: bool) -> MaterialUniform {
        MaterialUniform {
            base_color: self.base_color.to_array(),
            has_texture: u32::from(has_texture),
            specular_color: self.specular_color.to_array(),
            shininess: self.shininess,
            roughness: self.roughness,
            ambient_occlusion: self.ambient_occlusion,
            _pad: [0.0; 2],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use asset::material::PropertyValue;

    #[test]
    fn missing_roughness_keeps_default() {
        let desc = MaterialDescription::new("m")
            .with(MaterialSemantic::BaseColor, PropertyValue::Float3([0.1, 0.2, 0.3]))
            .with(MaterialSemantic::SpecularExponent, PropertyValue::Float(12.0));
        let props = MaterialProperties::from_description(&desc);
        assert_eq!(props.roughness, 0.0);
        assert_eq!(props.ambient_occlusion, 1.0);
        assert_eq!(props.base_color, Vec3::new(0.1, 0.2, 0.3));
        assert_eq!(props.shininess, 12.0);
    }

    #[test]
    fn mistyped_channels_are_skipped() {
        let desc = MaterialDescription::new("m")
            .with(MaterialSemantic::BaseColor, PropertyValue::String("wood".into()))
            .with(MaterialSemantic::Specular, PropertyValue::Float(0.5))
            .with(MaterialSemantic::SpecularExponent, PropertyValue::Float3([1.0; 3]))
            .with(MaterialSemantic::Roughness, PropertyValue::Float(0.7));
        assert_eq!(MaterialProperties::from_description(&desc), MaterialProperties::default());
    }

    #[test]
    fn ambient_occlusion_is_always_one() {
        let desc = MaterialDescription::new("m")
            .with(MaterialSemantic::Roughness, PropertyValue::Float3([0.4, 0.9, 0.9]));
        let props = MaterialProperties::from_description(&desc);
        assert_eq!(props.roughness, 0.4);
        assert_eq!(props.ambient_occlusion, 1.0);
        assert_eq!(props.to_uniform(true).has_texture, 1);
    }
}
