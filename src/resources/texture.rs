use std::path::{Path, PathBuf};

use anyhow::Context as _;
use image::RgbaImage;

/// Reads and decodes an image file, guessing the format from its content.
pub fn load_image(path: &Path) -> anyhow::Result<RgbaImage> {
    let reader = image::ImageReader::open(path)
        .with_context(|| format!("could not open {:?}", path))?
        .with_guessed_format()?;
    let img = reader
        .decode()
        .with_context(|| format!("could not decode {:?}", path))?;
    Ok(img.to_rgba8())
}

/// Resolves a texture reference from a model file against its texture folder.
///
/// Absolute references are kept as they are.
pub fn resolve(texture_dir: &Path, reference: &str) -> PathBuf {
    // exporters on windows write backslashes
    let reference = reference.replace('\\', "/");
    let reference = Path::new(&reference);
    if reference.is_absolute() {
        reference.to_path_buf()
    } else {
        texture_dir.join(reference)
    }
}
