/**
 * This module contains all logic for building engine data from external
 * files: imported models, declarative shapes and world markup.
 */
pub mod gltf_scene;
pub mod import;
pub mod markup;
pub mod mesh;
pub mod obj;
pub mod shape;
pub mod texture;
pub mod world;
