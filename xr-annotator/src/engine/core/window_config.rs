use bevy::prelude::*;
use bevy::window::PresentMode;

/// Browser builds render into the page's `#bevy` canvas.
pub fn create_window_config() -> Window {
    #[cfg(target_arch = "wasm32")]
    {
        Window {
            title: "XR Annotator".into(),
            canvas: Some("#bevy".into()),
            fit_canvas_to_parent: true,
            prevent_default_event_handling: false,
            present_mode: PresentMode::AutoVsync,
            ..default()
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    {
        Window {
            title: "XR Annotator".into(),
            present_mode: PresentMode::AutoVsync,
            ..default()
        }
    }
}
