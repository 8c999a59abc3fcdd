//! Imported material descriptions as a tagged property bag.
//!
//! Lookups are keyed by `(semantic, expected type)` and report whether the
//! property was present, absent, or present with a different type.

use std::collections::HashMap;

/// What a material property means to the shader.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MaterialSemantic {
    BaseColor,
    Specular,
    SpecularExponent,
    Roughness,
}

/// Declared type of a property value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PropertyType {
    String,
    Float,
    Float3,
}

#[derive(Clone, Debug, PartialEq)]
pub enum PropertyValue {
    /// Texture filename.
    String(String),
    Float(f32),
    Float3([f32; 3]),
}

impl PropertyValue {
    pub fn property_type(&self) -> PropertyType {
        match self {
            PropertyValue::String(_) => PropertyType::String,
            PropertyValue::Float(_) => PropertyType::Float,
            PropertyValue::Float3(_) => PropertyType::Float3,
        }
    }
}

/// Outcome of a typed property lookup.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Lookup<'a> {
    Present(&'a PropertyValue),
    Missing,
    WrongType(PropertyType),
}

impl<'a> Lookup<'a> {
    pub fn present(self) -> Option<&'a PropertyValue> {
        match self {
            Lookup::Present(value) => Some(value),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct MaterialDescription {
    pub name: String,
    properties: HashMap<MaterialSemantic, PropertyValue>,
}

impl MaterialDescription {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: HashMap::new(),
        }
    }

    /// Set a property; one value per semantic, the last write wins.
    pub fn set(&mut self, semantic: MaterialSemantic, value: PropertyValue) {
        self.properties.insert(semantic, value);
    }

    pub fn with(mut self, semantic: MaterialSemantic, value: PropertyValue) -> Self {
        self.set(semantic, value);
        self
    }

    pub fn lookup(&self, semantic: MaterialSemantic, expected: PropertyType) -> Lookup<'_> {
        match self.properties.get(&semantic) {
            None => Lookup::Missing,
            Some(value) if value.property_type() == expected => Lookup::Present(value),
            Some(value) => Lookup::WrongType(value.property_type()),
        }
    }

    pub fn float3(&self, semantic: MaterialSemantic) -> Option<[f32; 3]> {
        match self.lookup(semantic, PropertyType::Float3).present()? {
            PropertyValue::Float3(v) => Some(*v),
            _ => None,
        }
    }

    pub fn float(&self, semantic: MaterialSemantic) -> Option<f32> {
        match self.lookup(semantic, PropertyType::Float).present()? {
            PropertyValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn string(&self, semantic: MaterialSemantic) -> Option<&str> {
        match self.lookup(semantic, PropertyType::String).present()? {
            PropertyValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Build a description from an MTL material.
    ///
    /// A `map_Kd` texture takes the base color slot, replacing `Kd`.
    pub fn from_mtl(material: &tobj::Material) -> Self {
        let mut desc = Self::new(material.name.clone());

        match (&material.diffuse_texture, material.diffuse) {
            (Some(texture), _) if !texture.is_empty() => {
                desc.set(MaterialSemantic::BaseColor, PropertyValue::String(texture.clone()));
            }
            (_, Some(kd)) => desc.set(MaterialSemantic::BaseColor, PropertyValue::Float3(kd)),
            _ => {}
        }
        if let Some(ks) = material.specular {
            desc.set(MaterialSemantic::Specular, PropertyValue::Float3(ks));
        }
        if let Some(ns) = material.shininess {
            desc.set(MaterialSemantic::SpecularExponent, PropertyValue::Float(ns));
        }
        if let Some(pr) = material
            .unknown_param
            .get("Pr")
            .and_then(|raw| raw.trim().parse::<f32>().ok())
        {
            desc.set(MaterialSemantic::Roughness, PropertyValue::Float3([pr; 3]));
        }

        desc
    }
}
