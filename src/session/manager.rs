//! Overlay session state machine.
//!
//! One session per process: which game the overlay is attached to, the last
//! known target window geometry, and the auto-hide timer. Every operation,
//! including the timer's fire path, serializes on a single async mutex so a
//! detach can never race a show mid-composition and two attaches can never
//! both hook the same target.

use crate::capability::{
    OverlayElement, ProcessHandle, ProcessLocator, RenderHost, WindowMetrics, WindowRect,
};
use crate::overlay::{self, AssetStore};
use crate::session::types::{Game, SessionStatus, ShowRequest};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Delay before a shown overlay is hidden automatically.
pub const DEFAULT_HIDE_DELAY: Duration = Duration::from_millis(4000);

/// Everything known about the current attachment.
struct Attachment {
    game: Game,
    handle: ProcessHandle,
    window: WindowRect,
}

/// Mutable state guarded by the session mutex.
#[derive(Default)]
struct SessionState {
    attachment: Option<Attachment>,
    /// Dropping the sender cancels the pending auto-hide task.
    hide_cancel: Option<oneshot::Sender<()>>,
    /// Bumped on every arm and disarm; a stale fire compares and bows out.
    timer_generation: u64,
}

/// Process-wide overlay session manager.
pub struct SessionManager {
    state: Mutex<SessionState>,
    locator: Arc<dyn ProcessLocator>,
    metrics: Arc<dyn WindowMetrics>,
    render: Arc<dyn RenderHost>,
    assets: AssetStore,
    hide_delay: Duration,
}

impl SessionManager {
    pub fn new(
        locator: Arc<dyn ProcessLocator>,
        metrics: Arc<dyn WindowMetrics>,
        render: Arc<dyn RenderHost>,
        assets: AssetStore,
    ) -> Self {
        Self {
            state: Mutex::new(SessionState::default()),
            locator,
            metrics,
            render,
            assets,
            hide_delay: DEFAULT_HIDE_DELAY,
        }
    }

    /// Override the auto-hide delay.
    pub fn with_hide_delay(mut self, delay: Duration) -> Self {
        self.hide_delay = delay;
        self
    }

    /// Attach to a running instance of `game`.
    ///
    /// `false` is the expected outcome when no eligible process is running;
    /// the UI polls attach until the simulator is up. Attaching while already
    /// attached to the same game is a no-op success; attaching while attached
    /// to the other game detaches it first.
    pub async fn attach(&self, game: Game) -> bool {
        let mut state = self.state.lock().await;

        if let Some(attachment) = &state.attachment {
            if attachment.game == game {
                debug!(game = %game, "already attached");
                return true;
            }
        }
        self.do_detach(&mut state);

        let process_name = game.process_name();
        let Some(handle) = self.find_target(process_name) else {
            info!(game = %game, process = process_name, "process not found");
            return false;
        };

        // The target window may be reported lazily by the capture runtime;
        // a geometry failure is not an attach failure.
        let window = match self.metrics.window_rect(&handle) {
            Ok(rect) => rect,
            Err(err) => {
                warn!(error = %err, "window geometry unavailable; starting with an empty rect");
                WindowRect::default()
            }
        };

        info!(
            game = %game,
            pid = handle.pid,
            width = window.width(),
            height = window.height(),
            "attached"
        );
        state.attachment = Some(Attachment {
            game,
            handle,
            window,
        });
        true
    }

    fn find_target(&self, process_name: &str) -> Option<ProcessHandle> {
        self.locator
            .find_running(process_name)
            .into_iter()
            .find(|handle| !self.locator.is_already_hooked(handle))
    }

    /// Detach from the current target. Safe to call when already detached.
    pub async fn detach(&self) {
        let mut state = self.state.lock().await;
        self.do_detach(&mut state);
    }

    fn do_detach(&self, state: &mut SessionState) {
        Self::disarm_timer(state);
        if let Some(attachment) = state.attachment.take() {
            if let Err(err) = self.render.release_hook(&attachment.handle) {
                warn!(game = %attachment.game, error = %err, "failed to release hook");
            }
            info!(game = %attachment.game, "detached");
        }
    }

    /// Compose and push the overlay for a show command, then (re)arm the
    /// auto-hide timer. Logged no-op when detached.
    pub async fn show(self: Arc<Self>, request: ShowRequest) {
        let mut state = self.state.lock().await;
        let Some(attachment) = state.attachment.as_mut() else {
            info!("show ignored: not attached to any process");
            return;
        };

        // The target window may have moved or resized since the last call.
        match self.metrics.window_rect(&attachment.handle) {
            Ok(rect) => attachment.window = rect,
            Err(err) => {
                debug!(error = %err, "window geometry refresh failed; keeping last known size");
            }
        }

        let logo = match &request.logo {
            Some(reference) => self.assets.resolve_logo(reference).await,
            None => None,
        };

        let window = (attachment.window.width(), attachment.window.height());
        let composed = match overlay::compose(&self.assets, &request, logo.as_deref(), window) {
            Ok(composed) => composed,
            Err(err) => {
                warn!(error = %err, "overlay composition failed");
                return;
            }
        };

        let element = OverlayElement {
            position: composed.position,
            image: composed.png,
        };
        if let Err(err) = self.render.draw_overlay(&attachment.handle, &[element]) {
            warn!(error = %err, "overlay draw failed");
            return;
        }
        info!(station = %request.station, "overlay shown");
        Self::arm_timer(&self, &mut state);
    }

    /// Clear the overlay and disarm the auto-hide timer. No-op when detached.
    pub async fn hide(&self) {
        let mut state = self.state.lock().await;
        Self::disarm_timer(&mut state);
        self.clear_overlay(&state);
    }

    /// Current attachment snapshot.
    pub async fn status(&self) -> SessionStatus {
        let state = self.state.lock().await;
        SessionStatus {
            attached: state.attachment.is_some(),
            game: state.attachment.as_ref().map(|a| a.game),
        }
    }

    fn clear_overlay(&self, state: &SessionState) {
        let Some(attachment) = &state.attachment else {
            debug!("hide ignored: not attached");
            return;
        };
        if let Err(err) = self.render.draw_overlay(&attachment.handle, &[]) {
            warn!(error = %err, "failed to clear overlay");
            return;
        }
        info!("overlay hidden");
    }

    fn arm_timer(manager: &Arc<Self>, state: &mut SessionState) {
        Self::disarm_timer(state);
        let generation = state.timer_generation;
        let (cancel_tx, mut cancel_rx) = oneshot::channel();
        state.hide_cancel = Some(cancel_tx);

        let delay = manager.hide_delay;
        let manager = Arc::clone(manager);
        tokio::spawn(async move {
            tokio::select! {
                _ = &mut cancel_rx => {}
                () = sleep(delay) => manager.hide_expired(generation).await,
            }
        });
    }

    fn disarm_timer(state: &mut SessionState) {
        state.timer_generation += 1;
        // Dropping the sender wakes and ends the pending timer task.
        state.hide_cancel = None;
    }

    /// Timer fire path: identical to a client hide, unless a newer show or
    /// hide superseded this timer while it waited for the lock.
    async fn hide_expired(self: Arc<Self>, generation: u64) {
        let mut state = self.state.lock().await;
        if state.timer_generation != generation {
            return;
        }
        state.hide_cancel = None;
        debug!("auto-hide timer fired");
        self.clear_overlay(&state);
    }

    /// Drain capture-runtime messages on the session's serialized context.
    ///
    /// The injected runtime reports asynchronously from its own threads;
    /// taking the session lock per message keeps those reports from
    /// interleaving with command handling.
    pub fn spawn_runtime_message_drain(
        manager: Arc<Self>,
        mut messages: mpsc::UnboundedReceiver<String>,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(message) = messages.recv().await {
                let _state = manager.state.lock().await;
                info!(message = %message, "capture runtime");
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::CapabilityError;
    use image::{Rgba, RgbaImage};
    use std::collections::HashSet;
    use std::sync::Mutex as StdMutex;

    /// Records every capability call the session makes.
    #[derive(Default)]
    struct FakeCapture {
        running: StdMutex<Vec<ProcessHandle>>,
        hooked: StdMutex<HashSet<u32>>,
        find_calls: StdMutex<u32>,
        released: StdMutex<Vec<u32>>,
        /// Element count of each draw call; 0 is a clear.
        draws: StdMutex<Vec<usize>>,
    }

    impl FakeCapture {
        fn with_process(name: &str, pid: u32) -> Arc<Self> {
            let fake = Self::default();
            fake.running.lock().unwrap().push(ProcessHandle {
                pid,
                name: name.to_string(),
            });
            Arc::new(fake)
        }

        fn draws(&self) -> Vec<usize> {
            self.draws.lock().unwrap().clone()
        }

        fn released(&self) -> Vec<u32> {
            self.released.lock().unwrap().clone()
        }
    }

    impl ProcessLocator for FakeCapture {
        fn find_running(&self, process_name: &str) -> Vec<ProcessHandle> {
            *self.find_calls.lock().unwrap() += 1;
            self.running
                .lock()
                .unwrap()
                .iter()
                .filter(|handle| handle.name == process_name)
                .cloned()
                .collect()
        }

        fn is_already_hooked(&self, handle: &ProcessHandle) -> bool {
            self.hooked.lock().unwrap().contains(&handle.pid)
        }
    }

    impl WindowMetrics for FakeCapture {
        fn window_rect(&self, _handle: &ProcessHandle) -> Result<WindowRect, CapabilityError> {
            Ok(WindowRect {
                left: 0,
                top: 0,
                right: 1280,
                bottom: 720,
            })
        }
    }

    impl RenderHost for FakeCapture {
        fn draw_overlay(
            &self,
            _handle: &ProcessHandle,
            elements: &[OverlayElement],
        ) -> Result<(), CapabilityError> {
            self.draws.lock().unwrap().push(elements.len());
            Ok(())
        }

        fn release_hook(&self, handle: &ProcessHandle) -> Result<(), CapabilityError> {
            self.released.lock().unwrap().push(handle.pid);
            Ok(())
        }
    }

    fn assets_with_background() -> (tempfile::TempDir, AssetStore) {
        let dir = tempfile::tempdir().expect("temp dir");
        RgbaImage::from_pixel(820, 128, Rgba([0, 0, 0, 200]))
            .save(dir.path().join("overlay_double.png"))
            .expect("write background");
        let store = AssetStore::new(dir.path().to_path_buf());
        (dir, store)
    }

    fn manager_with(fake: &Arc<FakeCapture>, assets: AssetStore) -> Arc<SessionManager> {
        Arc::new(SessionManager::new(
            fake.clone(),
            fake.clone(),
            fake.clone(),
            assets,
        ))
    }

    fn show_request() -> ShowRequest {
        ShowRequest {
            station: "Truckers FM".into(),
            signal: "5".into(),
            logo: None,
            now_playing: "Now playing:".into(),
            rtl: false,
        }
    }

    /// Run queued tasks until `condition` holds, bailing out after a bounded
    /// number of scheduler turns.
    async fn settle(mut condition: impl FnMut() -> bool) -> bool {
        for _ in 0..100 {
            if condition() {
                return true;
            }
            tokio::task::yield_now().await;
        }
        condition()
    }

    /// Give spawned tasks a chance to run without waiting on anything.
    async fn drain() {
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn attach_fails_when_no_process_is_running() {
        let fake = Arc::new(FakeCapture::default());
        let (_dir, assets) = assets_with_background();
        let manager = manager_with(&fake, assets);

        assert!(!manager.attach(Game::Ats).await);
        let status = manager.status().await;
        assert!(!status.attached);
        assert_eq!(status.game, None);
    }

    #[tokio::test]
    async fn attach_twice_to_same_game_is_one_hook() {
        let fake = FakeCapture::with_process("eurotrucks2", 4242);
        let (_dir, assets) = assets_with_background();
        let manager = manager_with(&fake, assets);

        assert!(manager.attach(Game::Ets2).await);
        assert!(manager.attach(Game::Ets2).await);

        // The second attach short-circuits: no second lookup, no detach.
        assert_eq!(*fake.find_calls.lock().unwrap(), 1);
        assert!(fake.released().is_empty());
        assert_eq!(manager.status().await.game, Some(Game::Ets2));
    }

    #[tokio::test]
    async fn attach_to_other_game_detaches_previous_first() {
        let fake = FakeCapture::with_process("eurotrucks2", 4242);
        fake.running.lock().unwrap().push(ProcessHandle {
            pid: 5151,
            name: "amtrucks".into(),
        });
        let (_dir, assets) = assets_with_background();
        let manager = manager_with(&fake, assets);

        assert!(manager.attach(Game::Ets2).await);
        assert!(manager.attach(Game::Ats).await);

        assert_eq!(fake.released(), vec![4242]);
        assert_eq!(manager.status().await.game, Some(Game::Ats));
    }

    #[tokio::test]
    async fn already_hooked_instances_are_skipped() {
        let fake = FakeCapture::with_process("eurotrucks2", 4242);
        fake.hooked.lock().unwrap().insert(4242);
        let (_dir, assets) = assets_with_background();
        let manager = manager_with(&fake, assets);

        assert!(!manager.attach(Game::Ets2).await);
    }

    #[tokio::test]
    async fn detach_is_idempotent() {
        let fake = FakeCapture::with_process("eurotrucks2", 4242);
        let (_dir, assets) = assets_with_background();
        let manager = manager_with(&fake, assets);

        manager.detach().await; // detached already: nothing to release
        assert!(fake.released().is_empty());

        assert!(manager.attach(Game::Ets2).await);
        manager.detach().await;
        manager.detach().await;
        assert_eq!(fake.released(), vec![4242]);
        assert!(!manager.status().await.attached);
    }

    #[tokio::test]
    async fn show_while_detached_never_reaches_the_render_host() {
        let fake = Arc::new(FakeCapture::default());
        let (_dir, assets) = assets_with_background();
        let manager = manager_with(&fake, assets);

        manager.clone().show(show_request()).await;
        assert!(fake.draws().is_empty());
    }

    #[tokio::test]
    async fn show_pushes_one_element_and_hide_clears() {
        let fake = FakeCapture::with_process("eurotrucks2", 4242);
        let (_dir, assets) = assets_with_background();
        let manager = manager_with(&fake, assets);

        assert!(manager.attach(Game::Ets2).await);
        manager.clone().show(show_request()).await;
        manager.hide().await;

        assert_eq!(fake.draws(), vec![1, 0]);
    }

    #[tokio::test(start_paused = true)]
    async fn timer_fires_hide_after_the_delay() {
        let fake = FakeCapture::with_process("eurotrucks2", 4242);
        let (_dir, assets) = assets_with_background();
        let manager = manager_with(&fake, assets);

        assert!(manager.attach(Game::Ets2).await);
        manager.clone().show(show_request()).await;
        assert_eq!(fake.draws(), vec![1]);
        drain().await; // let the timer task register its sleep

        tokio::time::advance(Duration::from_millis(3999)).await;
        drain().await;
        assert_eq!(fake.draws(), vec![1], "must not fire early");

        tokio::time::advance(Duration::from_millis(2)).await;
        assert!(settle(|| fake.draws() == vec![1, 0]).await);
    }

    #[tokio::test(start_paused = true)]
    async fn hide_disarms_the_timer() {
        let fake = FakeCapture::with_process("eurotrucks2", 4242);
        let (_dir, assets) = assets_with_background();
        let manager = manager_with(&fake, assets);

        assert!(manager.attach(Game::Ets2).await);
        manager.clone().show(show_request()).await;
        manager.hide().await;
        assert_eq!(fake.draws(), vec![1, 0]);

        tokio::time::advance(Duration::from_millis(10_000)).await;
        drain().await;
        assert_eq!(fake.draws(), vec![1, 0], "disarmed timer must not fire");
    }

    #[tokio::test(start_paused = true)]
    async fn show_rearms_the_timer() {
        let fake = FakeCapture::with_process("eurotrucks2", 4242);
        let (_dir, assets) = assets_with_background();
        let manager = manager_with(&fake, assets);

        assert!(manager.attach(Game::Ets2).await);
        manager.clone().show(show_request()).await;
        drain().await;

        tokio::time::advance(Duration::from_millis(3000)).await;
        manager.clone().show(show_request()).await;
        assert_eq!(fake.draws(), vec![1, 1]);
        drain().await;

        // 6 s after the first show: only the re-armed timer counts.
        tokio::time::advance(Duration::from_millis(3000)).await;
        drain().await;
        assert_eq!(fake.draws(), vec![1, 1]);

        tokio::time::advance(Duration::from_millis(1001)).await;
        assert!(settle(|| fake.draws() == vec![1, 1, 0]).await);
    }

    #[tokio::test]
    async fn composition_failure_is_absorbed() {
        let fake = FakeCapture::with_process("eurotrucks2", 4242);
        // No background template in this store.
        let dir = tempfile::tempdir().expect("temp dir");
        let manager = manager_with(&fake, AssetStore::new(dir.path().to_path_buf()));

        assert!(manager.attach(Game::Ets2).await);
        manager.clone().show(show_request()).await;

        // The failed composition never reached the render host.
        assert!(fake.draws().is_empty());
    }
}
