//! Asset store for overlay composition resources.
//!
//! Resolves the resource directory (packaged `resources/` next to the
//! executable, else the executable directory itself), loads the fixed
//! background template, the numbered signal icons and the overlay font, and
//! turns logo references (URL, absolute or relative path) into local files.

use super::ComposeError;
use ab_glyph::FontVec;
use image::RgbaImage;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Fixed background template the composer draws onto.
const BACKGROUND_ASSET: &str = "overlay_double.png";

/// Typeface used for the station text block.
const FONT_ASSET: &str = "overlay.ttf";

/// Locates and loads overlay resources.
pub struct AssetStore {
    resource_dir: PathBuf,
}

impl AssetStore {
    pub fn new(resource_dir: PathBuf) -> Self {
        Self { resource_dir }
    }

    /// Resolve the default resource directory, or take the override as-is.
    pub fn locate(override_dir: Option<PathBuf>) -> Self {
        if let Some(dir) = override_dir {
            return Self::new(dir);
        }
        let exe_dir = std::env::current_exe()
            .ok()
            .and_then(|path| path.parent().map(Path::to_path_buf))
            .unwrap_or_else(|| PathBuf::from("."));
        let packaged = exe_dir.join("resources");
        Self::new(if packaged.is_dir() { packaged } else { exe_dir })
    }

    pub fn resource_dir(&self) -> &Path {
        &self.resource_dir
    }

    /// The background template every overlay starts from.
    pub fn background(&self) -> Result<RgbaImage, ComposeError> {
        let path = self.resource_dir.join(BACKGROUND_ASSET);
        if !path.is_file() {
            return Err(ComposeError::MissingBackground(path));
        }
        Ok(image::open(&path)?.to_rgba8())
    }

    /// Icon for a reception level ("0".."5"). `None` when the level has no
    /// asset; the composer skips the icon silently in that case.
    pub fn signal_icon(&self, level: &str) -> Option<RgbaImage> {
        if level.is_empty() || !level.chars().all(|c| c.is_ascii_alphanumeric()) {
            debug!(level, "ignoring signal level that is not a plain asset name");
            return None;
        }
        let path = self.resource_dir.join(format!("{level}.png"));
        if !path.is_file() {
            return None;
        }
        match image::open(&path) {
            Ok(icon) => Some(icon.to_rgba8()),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "failed to decode signal icon");
                None
            }
        }
    }

    /// The overlay font, or `None` when the asset is missing (the text block
    /// is then skipped with a warning).
    pub fn font(&self) -> Option<FontVec> {
        let path = self.resource_dir.join(FONT_ASSET);
        let bytes = std::fs::read(&path).ok()?;
        match FontVec::try_from_vec(bytes) {
            Ok(font) => Some(font),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "failed to parse overlay font");
                None
            }
        }
    }

    /// Resolve a logo reference to a local file.
    ///
    /// Remote URLs are downloaded to a temporary file; relative paths are
    /// tried against an ordered list of base directories (packaged web
    /// assets first, then development-tree fallbacks). `None` means "compose
    /// without a logo" and is always recoverable.
    pub async fn resolve_logo(&self, reference: &str) -> Option<PathBuf> {
        if reference.starts_with("http://") || reference.starts_with("https://") {
            return self.download_logo(reference).await;
        }
        // A leading slash usually means a web-root-relative path from the UI,
        // not a filesystem root; only take it verbatim when it really exists.
        let path = Path::new(reference);
        if path.is_absolute() && path.is_file() {
            return Some(path.to_path_buf());
        }
        self.find_relative_logo(reference)
    }

    async fn download_logo(&self, url: &str) -> Option<PathBuf> {
        let response = match reqwest::get(url).await {
            Ok(response) => response,
            Err(err) => {
                warn!(url, error = %err, "logo download failed");
                return None;
            }
        };
        let response = match response.error_for_status() {
            Ok(response) => response,
            Err(err) => {
                warn!(url, error = %err, "logo download rejected");
                return None;
            }
        };
        let bytes = match response.bytes().await {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(url, error = %err, "logo download interrupted");
                return None;
            }
        };
        let path = std::env::temp_dir().join(format!("radio_logo.{}", logo_extension(url)));
        if let Err(err) = tokio::fs::write(&path, &bytes).await {
            warn!(path = %path.display(), error = %err, "could not store downloaded logo");
            return None;
        }
        Some(path)
    }

    fn find_relative_logo(&self, reference: &str) -> Option<PathBuf> {
        let relative = reference.trim_start_matches('/');
        let candidates = [
            // Packaged app: web assets bundled under the resource directory.
            self.resource_dir.join("web").join(relative),
            self.resource_dir.join(relative),
            // Development tree: web assets relative to the working directory.
            PathBuf::from("web").join(relative),
            PathBuf::from("../web").join(relative),
        ];
        for candidate in candidates {
            debug!(candidate = %candidate.display(), "checking logo path");
            if candidate.is_file() {
                return Some(candidate);
            }
        }
        warn!(logo = reference, "logo not found in any candidate location");
        None
    }
}

/// File extension for a downloaded logo, taken from the URL when it looks
/// like one, defaulting to png.
fn logo_extension(url: &str) -> &str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    match path.rsplit_once('.') {
        Some((_, ext))
            if !ext.is_empty() && ext.len() <= 4 && ext.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            ext
        }
        _ => "png",
    }
}
