//! Asset import: OBJ/MTL meshes, material property bags, textures.

pub mod locate;
pub mod material;
pub mod mesh;
pub mod obj;
pub mod texture;
