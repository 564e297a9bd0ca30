//! External collaborator seams.
//!
//! The process-injection capture runtime (the thing that actually draws
//! inside the game) is supplied externally; the session manager only ever
//! talks to it through these traits. All calls happen from the serialized
//! session context, never concurrently.

mod system;

pub use system::{SystemProcessLocator, UnlinkedCaptureHost};

use thiserror::Error;

/// Errors surfaced by capability implementations.
///
/// These are resource errors in the bridge's taxonomy: the caller logs them
/// and degrades rather than failing the command or the connection.
#[derive(Debug, Error)]
pub enum CapabilityError {
    #[error("window geometry unavailable: {0}")]
    Geometry(String),

    #[error("render host unavailable: {0}")]
    Render(String),
}

/// Identifies a running (and possibly hooked) game process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessHandle {
    pub pid: u32,
    pub name: String,
}

/// Window rectangle in screen coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindowRect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl WindowRect {
    pub fn width(&self) -> u32 {
        (self.right - self.left).max(0) as u32
    }

    pub fn height(&self) -> u32 {
        (self.bottom - self.top).max(0) as u32
    }
}

/// One overlay element pushed to the render host: a PNG image and where to
/// place it in the target window.
#[derive(Debug, Clone)]
pub struct OverlayElement {
    pub position: (i32, i32),
    pub image: Vec<u8>,
}

/// Channel the capture runtime reports diagnostic strings through.
///
/// Implementations send from whatever thread the runtime calls back on; the
/// session drains the receiving end on its own serialized context, so a
/// runtime callback can never re-enter session state.
pub type RuntimeMessageSender = tokio::sync::mpsc::UnboundedSender<String>;

/// Locates running game processes eligible for hooking.
pub trait ProcessLocator: Send + Sync {
    /// All running processes with the given executable name. The session
    /// manager filters out instances that are already hooked.
    fn find_running(&self, process_name: &str) -> Vec<ProcessHandle>;

    /// Whether another session already holds a hook on the process.
    fn is_already_hooked(&self, handle: &ProcessHandle) -> bool;
}

/// Reads window geometry for a target process.
pub trait WindowMetrics: Send + Sync {
    fn window_rect(&self, handle: &ProcessHandle) -> Result<WindowRect, CapabilityError>;
}

/// Draws overlay elements inside the hooked process.
pub trait RenderHost: Send + Sync {
    /// Push the element list into the game; an empty list clears the overlay.
    fn draw_overlay(
        &self,
        handle: &ProcessHandle,
        elements: &[OverlayElement],
    ) -> Result<(), CapabilityError>;

    /// Release the injection hook held on the process.
    fn release_hook(&self, handle: &ProcessHandle) -> Result<(), CapabilityError>;
}
