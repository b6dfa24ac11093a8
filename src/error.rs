//! Error types shared by the loaders, the registries and the render path.

use std::path::PathBuf;

use thiserror::Error;

/// Failure while turning an asset or markup file into engine data.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("file {0:?} does not exist")]
    MissingFile(PathBuf),
    #[error("unsupported model format {0:?}")]
    UnsupportedFormat(PathBuf),
    #[error("obj import failed: {0}")]
    Obj(#[from] tobj::LoadError),
    #[error("gltf import failed: {0}")]
    Gltf(#[from] gltf::Error),
    #[error("{0:?} contains no meshes")]
    NoMeshes(PathBuf),
    #[error("{0:?} has no root node")]
    NoRootNode(PathBuf),
    #[error("markup is not well formed: {0}")]
    Markup(#[from] roxmltree::Error),
    #[error("markup does not match the world schema: {0}")]
    Schema(String),
    #[error("object buffers are inconsistent: {0}")]
    Geometry(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Failure on the per-frame path.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Render or shadow render was requested before `initialize`.
    #[error("{0} must be initialized before it is rendered")]
    NotInitialized(String),
    #[error("graphics backend: {0}")]
    Backend(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("an entry named {0:?} already exists")]
    Duplicate(String),
}
