//! Overlay image construction: the asset store and the composer that turns a
//! show command into one bitmap plus a placement point.

mod assets;
mod composer;

pub use assets::AssetStore;
pub use composer::{compose, ComposedOverlay};

use std::path::PathBuf;
use thiserror::Error;

/// Failures while building the overlay bitmap.
///
/// Only the background template and the final PNG encode are required;
/// missing optional elements (signal icon, logo, font) degrade inside the
/// composer instead of surfacing here.
#[derive(Debug, Error)]
pub enum ComposeError {
    #[error("overlay background not found: {0}")]
    MissingBackground(PathBuf),

    #[error("image processing failed: {0}")]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
