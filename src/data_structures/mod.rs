//! Engine data structures: objects, materials, textures and the world graph.
//!
//! - `texture` holds decoded textures and the registry sharing them
//! - `material` and `mesh` describe what one draw call uses
//! - `object` is a rigid model: shared buffers plus a node tree
//! - `registry` maps unique names to objects and vehicles
//! - `scene_graph` places registered objects in the world
//! - `skybox` and `frame` are the scene's built-in renderables

pub mod frame;
pub mod material;
pub mod mesh;
pub mod object;
pub mod registry;
pub mod scene_graph;
pub mod skybox;
pub mod texture;
