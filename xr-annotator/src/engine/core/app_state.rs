use crate::engine::loading::progress::LoadingProgress;
use crate::rpc::web_rpc::WebRpcInterface;
use bevy::prelude::*;

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Hash, States)]
pub enum AppState {
    #[default]
    Loading,
    Running,
}

// Final transition to running state
pub fn transition_to_running(
    loading_progress: Res<LoadingProgress>,
    mut next_state: ResMut<NextState<AppState>>,
) {
    if loading_progress.is_complete() {
        println!("→ All systems ready, transitioning to Running state");
        next_state.set(AppState::Running);
    }
}

/// Report loading milestones to the page. A failure is reported once and
/// loading stops there.
pub fn update_loading_frontend(
    loading_progress: Res<LoadingProgress>,
    mut rpc_interface: ResMut<WebRpcInterface>,
    mut failure_sent: Local<bool>,
) {
    if !loading_progress.is_changed() {
        return;
    }

    if let Some(message) = &loading_progress.failure {
        if !*failure_sent {
            *failure_sent = true;
            rpc_interface.send_notification(
                "loading_failed",
                serde_json::json!({ "message": message }),
            );
        }
        return;
    }

    let steps = [
        loading_progress.session_loaded,
        loading_progress.terrain_loaded,
        loading_progress.scene_created,
    ];
    let done = steps.iter().filter(|step| **step).count();
    rpc_interface.send_notification(
        "loading_progress",
        serde_json::json!({
            "progress": done as f32 / steps.len() as f32,
            "states": loading_progress.loading_states,
            "complete": loading_progress.is_complete(),
        }),
    );
}
