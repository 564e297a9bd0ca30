//! Host-side capability implementations.
//!
//! Process lookup is real (via `sysinfo`); geometry and drawing belong to the
//! injected capture runtime, which ships separately. [`UnlinkedCaptureHost`]
//! stands in until that runtime is wired up, reporting itself unavailable so
//! the session degrades along its normal paths.

use super::{
    CapabilityError, OverlayElement, ProcessHandle, ProcessLocator, RenderHost, WindowMetrics,
    WindowRect,
};
use std::ffi::OsStr;
use std::sync::Mutex;
use sysinfo::{ProcessesToUpdate, System};
use tracing::debug;

/// Finds game processes by executable name in the host process table.
pub struct SystemProcessLocator {
    system: Mutex<System>,
}

impl SystemProcessLocator {
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new()),
        }
    }
}

impl Default for SystemProcessLocator {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessLocator for SystemProcessLocator {
    fn find_running(&self, process_name: &str) -> Vec<ProcessHandle> {
        let mut system = self.system.lock().unwrap_or_else(|e| e.into_inner());
        system.refresh_processes(ProcessesToUpdate::All, true);
        system
            .processes_by_name(OsStr::new(process_name))
            .map(|process| ProcessHandle {
                pid: process.pid().as_u32(),
                name: process.name().to_string_lossy().into_owned(),
            })
            .collect()
    }

    fn is_already_hooked(&self, _handle: &ProcessHandle) -> bool {
        // Hook bookkeeping lives in the capture runtime; without it, no
        // process is ever marked hooked.
        false
    }
}

/// Stand-in for the injected capture runtime.
///
/// Geometry reads and draw calls report the host as unavailable; the session
/// logs and absorbs those failures, so every command still completes with its
/// normal response shape. Lifecycle reports go through the same message
/// channel a real runtime would use.
#[derive(Debug, Default)]
pub struct UnlinkedCaptureHost {
    messages: Option<super::RuntimeMessageSender>,
}

impl UnlinkedCaptureHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report lifecycle events through the given channel.
    pub fn with_messages(sender: super::RuntimeMessageSender) -> Self {
        Self {
            messages: Some(sender),
        }
    }

    fn report(&self, message: String) {
        if let Some(sender) = &self.messages {
            let _ = sender.send(message);
        }
    }
}

impl WindowMetrics for UnlinkedCaptureHost {
    fn window_rect(&self, handle: &ProcessHandle) -> Result<WindowRect, CapabilityError> {
        Err(CapabilityError::Geometry(format!(
            "no capture runtime attached to pid {}",
            handle.pid
        )))
    }
}

impl RenderHost for UnlinkedCaptureHost {
    fn draw_overlay(
        &self,
        handle: &ProcessHandle,
        elements: &[OverlayElement],
    ) -> Result<(), CapabilityError> {
        debug!(
            pid = handle.pid,
            elements = elements.len(),
            "draw requested without a capture runtime"
        );
        Err(CapabilityError::Render("no capture runtime attached".into()))
    }

    fn release_hook(&self, handle: &ProcessHandle) -> Result<(), CapabilityError> {
        self.report(format!("hook released for pid {}", handle.pid));
        Ok(())
    }
}
