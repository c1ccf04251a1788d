use crate::engine::assets::session_config::SessionConfig;
use crate::objects::export::ActivityLogRecord;
use crate::rpc::web_rpc::WebRpcInterface;
use crate::tools::interaction_systems::ObjectsChanged;
use bevy::prelude::*;
use rand::Rng;

const SESSION_ID_LENGTH: usize = 6;

/// Identifies this run in the activity log, and where records are posted.
#[derive(Resource, Debug, Clone)]
pub struct ActivityLog {
    pub session_id: String,
    /// Empty disables uploads.
    pub url: String,
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::new(String::new())
    }
}

impl ActivityLog {
    pub fn new(url: String) -> Self {
        Self {
            session_id: random_session_id(),
            url,
        }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(config.activity_log_url.clone())
    }
}

pub fn random_session_id() -> String {
    let mut rng = rand::thread_rng();
    (0..SESSION_ID_LENGTH)
        .map(|_| rng.gen_range(b'A'..=b'Z') as char)
        .collect()
}

/// Every change to the committed objects is mirrored to the page and, when
/// configured, posted to the log endpoint.
pub fn record_activity(
    mut changes: EventReader<ObjectsChanged>,
    log: Res<ActivityLog>,
    mut rpc_interface: ResMut<WebRpcInterface>,
) {
    for ObjectsChanged(snapshot) in changes.read() {
        let record = ActivityLogRecord {
            snapshot: snapshot.clone(),
            session_id: log.session_id.clone(),
        };

        let body = match serde_json::to_value(&record) {
            Ok(body) => body,
            Err(e) => {
                error!("Failed to serialize activity record: {}", e);
                continue;
            }
        };
        rpc_interface.send_notification("activity_log", body.clone());

        if !log.url.is_empty() {
            post_record(log.url.clone(), body.to_string());
        }
    }
}

#[cfg(target_arch = "wasm32")]
fn post_record(url: String, body: String) {
    wasm_bindgen_futures::spawn_local(async move {
        if let Err(e) = post_json(&url, &body).await {
            error!("Activity log upload failed: {}", e);
        }
    });
}

#[cfg(not(target_arch = "wasm32"))]
fn post_record(url: String, body: String) {
    debug!("Activity log upload skipped on native ({} bytes for {})", body.len(), url);
}

#[cfg(target_arch = "wasm32")]
async fn post_json(url: &str, body: &str) -> Result<(), String> {
    use wasm_bindgen::{JsCast, JsValue};
    use wasm_bindgen_futures::JsFuture;
    use web_sys::{Request, RequestInit, Response};

    let opts = RequestInit::new();
    opts.set_method("POST");
    opts.set_body(&JsValue::from_str(body));

    let request = Request::new_with_str_and_init(url, &opts)
        .map_err(|e| format!("request error: {:?}", e))?;
    request
        .headers()
        .set("Content-Type", "application/json")
        .map_err(|e| format!("header error: {:?}", e))?;

    let window = web_sys::window().ok_or("no window")?;
    let resp_value = JsFuture::from(window.fetch_with_request(&request))
        .await
        .map_err(|e| format!("fetch error: {:?}", e))?;
    let resp: Response = resp_value
        .dyn_into()
        .map_err(|_| "response is not a Response")?;

    if !resp.ok() {
        return Err(format!("HTTP {}", resp.status()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::registry::SpatialObjectRegistry;

    #[test]
    fn session_ids_are_six_uppercase_letters() {
        let id = random_session_id();
        assert_eq!(id.len(), SESSION_ID_LENGTH);
        assert!(id.chars().all(|c| c.is_ascii_uppercase()));
    }

    #[test]
    fn config_url_is_carried_over() {
        let config = SessionConfig {
            activity_log_url: "https://example.org/log".to_string(),
            ..default()
        };
        let log = ActivityLog::from_config(&config);
        assert_eq!(log.url, "https://example.org/log");
        assert_eq!(log.session_id.len(), SESSION_ID_LENGTH);
    }

    #[test]
    fn every_change_in_a_frame_is_logged() {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .add_event::<ObjectsChanged>()
            .init_resource::<ActivityLog>()
            .init_resource::<WebRpcInterface>()
            .add_systems(Update, record_activity);

        let mut registry = SpatialObjectRegistry::default();
        let first = registry.export_snapshot();
        registry.place_marker(Vec3::ZERO);
        let second = registry.export_snapshot();
        app.world_mut().send_event(ObjectsChanged(first));
        app.world_mut().send_event(ObjectsChanged(second));
        app.update();

        let rpc = app.world().resource::<WebRpcInterface>();
        let logged: Vec<_> = rpc
            .pending_notifications()
            .iter()
            .filter(|n| n.method == "activity_log")
            .collect();
        assert_eq!(logged.len(), 2);
        assert_ne!(logged[0].params, logged[1].params);
    }
}
