//! Builds the overlay bitmap for a show command.
//!
//! The layout is fixed by the background template: a text band for the
//! "now playing" line, a signal icon slot in the lower right of the band,
//! and a logo slot on the right edge. Optional elements degrade to absence;
//! only a missing template fails the composition.

use super::{AssetStore, ComposeError};
use crate::session::ShowRequest;
use ab_glyph::PxScale;
use image::imageops::{self, FilterType};
use image::{ImageFormat, Rgba, RgbaImage};
use imageproc::drawing::{draw_text_mut, text_size};
use std::io::Cursor;
use std::path::Path;
use tracing::{debug, warn};

/// Width of the text band on the template and its left offset.
const TEXT_BAND_WIDTH: f32 = 512.0;
const TEXT_BAND_LEFT: i32 = 123;

/// Pixel size of the station text (15 pt bold in the template's art).
const STATION_FONT_PX: f32 = 20.0;

const LABEL_COLOR: Rgba<u8> = Rgba([255, 255, 255, 255]);
const STATION_COLOR: Rgba<u8> = Rgba([255, 174, 0, 255]);

/// Signal icon slot: left edge, size, and distance from the bottom.
const SIGNAL_LEFT: i64 = 593;
const SIGNAL_SIZE: u32 = 32;
const SIGNAL_BOTTOM_MARGIN: i64 = 36;

/// Logo slot: width and left offset on the template.
const LOGO_SLOT_WIDTH: f32 = 256.0;
const LOGO_SLOT_LEFT: f32 = 645.0;

/// Logos taller than this height/width ratio are pinned by height, the rest
/// by width.
const LOGO_TALL_RATIO: f32 = 0.41;
const LOGO_TALL_HEIGHT: f32 = 90.0;
const LOGO_WIDE_WIDTH: f32 = 220.0;

/// A finished overlay: PNG bytes plus the placement point against the target
/// window. Built fresh per show command, never persisted.
#[derive(Debug)]
pub struct ComposedOverlay {
    pub png: Vec<u8>,
    pub position: (i32, i32),
}

/// Compose the overlay bitmap for a show request.
///
/// `logo` is the already-resolved local file, if any; `window` is the current
/// target window size used only for placement.
pub fn compose(
    assets: &AssetStore,
    request: &ShowRequest,
    logo: Option<&Path>,
    window: (u32, u32),
) -> Result<ComposedOverlay, ComposeError> {
    let mut canvas = assets.background()?;

    draw_station_text(&mut canvas, assets, request);
    draw_signal(&mut canvas, assets, &request.signal);
    if let Some(path) = logo {
        draw_logo(&mut canvas, path);
    }

    let position = placement(window, (canvas.width(), canvas.height()));
    let mut png = Cursor::new(Vec::new());
    canvas.write_to(&mut png, ImageFormat::Png)?;
    Ok(ComposedOverlay {
        png: png.into_inner(),
        position,
    })
}

fn draw_station_text(canvas: &mut RgbaImage, assets: &AssetStore, request: &ShowRequest) {
    let Some(font) = assets.font() else {
        warn!("overlay font missing; skipping station text");
        return;
    };
    let scale = PxScale::from(STATION_FONT_PX);

    // The label and name are measured independently: centering the combined
    // string has to survive the visually swapped order under RTL.
    let label_with_space = format!("{} ", request.now_playing);
    let (label_w, _) = text_size(scale, &font, &label_with_space);
    let (name_w, _) = text_size(scale, &font, &request.station);
    let combined = format!("{}{}", label_with_space, request.station);
    let (full_w, full_h) = text_size(scale, &font, &combined);

    let (origin_x, origin_y) = text_origin(canvas.height(), full_w, full_h);
    let (label_x, name_x) = text_slots(origin_x, label_w, name_w, request.rtl);

    draw_text_mut(
        canvas,
        LABEL_COLOR,
        label_x,
        origin_y,
        scale,
        &font,
        &request.now_playing,
    );
    draw_text_mut(
        canvas,
        STATION_COLOR,
        name_x,
        origin_y,
        scale,
        &font,
        &request.station,
    );
}

/// Centered origin of the combined text within the template band.
fn text_origin(canvas_height: u32, full_w: u32, full_h: u32) -> (i32, i32) {
    let x = (TEXT_BAND_WIDTH / 2.0 - full_w as f32 / 2.0) as i32 + TEXT_BAND_LEFT;
    let y = (canvas_height as f32 / 2.0 - full_h as f32 / 2.0) as i32;
    (x, y)
}

/// X positions of the label and the station name.
///
/// Under RTL the drawing order is swapped: the name sits at the origin and
/// the label follows it, so the label reads after the name while the pair
/// stays centered as a whole.
fn text_slots(origin_x: i32, label_w: u32, name_w: u32, rtl: bool) -> (i32, i32) {
    if rtl {
        (origin_x + name_w as i32, origin_x)
    } else {
        (origin_x, origin_x + label_w as i32)
    }
}

fn draw_signal(canvas: &mut RgbaImage, assets: &AssetStore, level: &str) {
    let Some(icon) = assets.signal_icon(level) else {
        return;
    };
    let icon = imageops::resize(&icon, SIGNAL_SIZE, SIGNAL_SIZE, FilterType::Lanczos3);
    let y = i64::from(canvas.height()) - SIGNAL_BOTTOM_MARGIN;
    imageops::overlay(canvas, &icon, SIGNAL_LEFT, y);
}

fn draw_logo(canvas: &mut RgbaImage, path: &Path) {
    let logo = match image::open(path) {
        Ok(logo) => logo.to_rgba8(),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "failed to decode logo; skipping");
            return;
        }
    };
    let (width, height) = logo_fit(logo.width() as f32, logo.height() as f32);
    let scaled = imageops::resize(
        &logo,
        width.round().max(1.0) as u32,
        height.round().max(1.0) as u32,
        FilterType::Lanczos3,
    );
    let x = (LOGO_SLOT_WIDTH / 2.0 - width / 2.0 + LOGO_SLOT_LEFT) as i64;
    let y = (canvas.height() as f32 / 2.0 - height / 2.0) as i64;
    debug!(width = f64::from(width), height = f64::from(height), "logo placed");
    imageops::overlay(canvas, &scaled, x, y);
}

/// Scale a logo into its slot preserving aspect ratio: tall logos are pinned
/// to 90 px high, the rest to 220 px wide.
fn logo_fit(width: f32, height: f32) -> (f32, f32) {
    if height > LOGO_TALL_RATIO * width {
        (width * LOGO_TALL_HEIGHT / height, LOGO_TALL_HEIGHT)
    } else {
        (LOGO_WIDE_WIDTH, height * LOGO_WIDE_WIDTH / width)
    }
}

/// Placement of the composed bitmap: horizontally centered in the target
/// window, one quarter of the way down.
fn placement(window: (u32, u32), bitmap: (u32, u32)) -> (i32, i32) {
    (
        window.0 as i32 / 2 - bitmap.0 as i32 / 2,
        window.1 as i32 / 4,
    )
}
