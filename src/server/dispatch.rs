//! Parses command envelopes and routes them to the session manager.
//!
//! Bad input never kills a connection here: malformed JSON and unknown
//! commands get an `error` reply, domain failures come back as
//! `success:false` in the normal response shape.

use crate::server::messages::{AttachParams, ServerMessage, ShowParams};
use crate::session::{Game, SessionManager, ShowRequest};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

/// Handle one inbound text message and produce the reply.
pub async fn dispatch(session: &Arc<SessionManager>, raw: &str) -> ServerMessage {
    let value: Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(err) => {
            return ServerMessage::Error {
                message: format!("invalid JSON: {err}"),
            }
        }
    };
    let command = value
        .get("command")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    debug!(command = %command, "received command");

    match command.as_str() {
        "attach" => attach(session, value).await,
        "detach" => {
            session.detach().await;
            ServerMessage::DetachResult { success: true }
        }
        "show" => show(session, value).await,
        "hide" => {
            session.hide().await;
            ServerMessage::HideResult { success: true }
        }
        "status" => status_message(session).await,
        other => ServerMessage::Error {
            message: format!("Unknown command: {other}"),
        },
    }
}

/// The unsolicited greeting and the `status` reply share one shape.
pub async fn status_message(session: &Arc<SessionManager>) -> ServerMessage {
    let status = session.status().await;
    ServerMessage::Status {
        attached: status.attached,
        game: status.game.map(|game| game.id().to_string()),
    }
}

async fn attach(session: &Arc<SessionManager>, value: Value) -> ServerMessage {
    let params: AttachParams = match serde_json::from_value(value) {
        Ok(params) => params,
        Err(err) => {
            return ServerMessage::Error {
                message: format!("invalid attach parameters: {err}"),
            }
        }
    };
    let Some(game) = Game::from_id(&params.game) else {
        info!(game = %params.game, "attach rejected: unknown game id");
        return ServerMessage::AttachResult {
            success: false,
            game: params.game,
        };
    };
    let success = session.attach(game).await;
    ServerMessage::AttachResult {
        success,
        game: params.game,
    }
}

async fn show(session: &Arc<SessionManager>, value: Value) -> ServerMessage {
    let params: ShowParams = match serde_json::from_value(value) {
        Ok(params) => params,
        Err(err) => {
            return ServerMessage::Error {
                message: format!("invalid show parameters: {err}"),
            }
        }
    };
    Arc::clone(session)
        .show(ShowRequest {
            station: params.station,
            signal: params.signal,
            logo: params.logo,
            now_playing: params.now_playing,
            rtl: params.rtl,
        })
        .await;
    ServerMessage::ShowResult { success: true }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{
        CapabilityError, OverlayElement, ProcessHandle, ProcessLocator, RenderHost, WindowMetrics,
        WindowRect,
    };
    use crate::overlay::AssetStore;

    /// A host with no running games and no capture runtime.
    struct EmptyHost;

    impl ProcessLocator for EmptyHost {
        fn find_running(&self, _process_name: &str) -> Vec<ProcessHandle> {
            Vec::new()
        }

        fn is_already_hooked(&self, _handle: &ProcessHandle) -> bool {
            false
        }
    }

    impl WindowMetrics for EmptyHost {
        fn window_rect(&self, _handle: &ProcessHandle) -> Result<WindowRect, CapabilityError> {
            Ok(WindowRect::default())
        }
    }

    impl RenderHost for EmptyHost {
        fn draw_overlay(
            &self,
            _handle: &ProcessHandle,
            _elements: &[OverlayElement],
        ) -> Result<(), CapabilityError> {
            Ok(())
        }

        fn release_hook(&self, _handle: &ProcessHandle) -> Result<(), CapabilityError> {
            Ok(())
        }
    }

    fn fixture() -> (tempfile::TempDir, Arc<SessionManager>) {
        let dir = tempfile::tempdir().expect("temp dir");
        let host = Arc::new(EmptyHost);
        let manager = Arc::new(SessionManager::new(
            host.clone(),
            host.clone(),
            host,
            AssetStore::new(dir.path().to_path_buf()),
        ));
        (dir, manager)
    }

    #[tokio::test]
    async fn malformed_json_is_answered_not_fatal() {
        let (_dir, session) = fixture();
        let reply = dispatch(&session, "not json at all").await;
        assert!(matches!(reply, ServerMessage::Error { .. }));
    }

    #[tokio::test]
    async fn unknown_command_names_the_offender() {
        let (_dir, session) = fixture();
        let reply = dispatch(&session, r#"{"command":"reboot"}"#).await;
        let ServerMessage::Error { message } = reply else {
            panic!("expected an error reply");
        };
        assert!(message.contains("reboot"));
    }

    #[tokio::test]
    async fn missing_command_field_is_unknown() {
        let (_dir, session) = fixture();
        let reply = dispatch(&session, r#"{"hello":"world"}"#).await;
        assert!(matches!(reply, ServerMessage::Error { .. }));
    }

    #[tokio::test]
    async fn attach_defaults_to_ets2() {
        let (_dir, session) = fixture();
        let reply = dispatch(&session, r#"{"command":"attach"}"#).await;
        assert_eq!(
            reply,
            ServerMessage::AttachResult {
                success: false, // no process running in the fixture
                game: "ets2".into()
            }
        );
    }

    #[tokio::test]
    async fn attach_rejects_unknown_game() {
        let (_dir, session) = fixture();
        let reply = dispatch(&session, r#"{"command":"attach","game":"fs25"}"#).await;
        assert_eq!(
            reply,
            ServerMessage::AttachResult {
                success: false,
                game: "fs25".into()
            }
        );
    }

    #[tokio::test]
    async fn detach_and_hide_always_succeed() {
        let (_dir, session) = fixture();
        assert_eq!(
            dispatch(&session, r#"{"command":"detach"}"#).await,
            ServerMessage::DetachResult { success: true }
        );
        assert_eq!(
            dispatch(&session, r#"{"command":"hide"}"#).await,
            ServerMessage::HideResult { success: true }
        );
    }

    #[tokio::test]
    async fn show_replies_success_even_when_detached() {
        let (_dir, session) = fixture();
        let reply = dispatch(&session, r#"{"command":"show","station":"Truckers FM"}"#).await;
        assert_eq!(reply, ServerMessage::ShowResult { success: true });
    }

    #[tokio::test]
    async fn status_reports_detached() {
        let (_dir, session) = fixture();
        let reply = dispatch(&session, r#"{"command":"status"}"#).await;
        assert_eq!(
            reply,
            ServerMessage::Status {
                attached: false,
                game: None
            }
        );
    }
}
