use bevy::prelude::*;

#[derive(Resource, Default)]
pub struct LoadingProgress {
    pub session_loaded: bool,
    pub terrain_loaded: bool,
    pub scene_created: bool,
    pub loading_states: Vec<(String, i32)>,
    /// First fatal loading error. Once set the app stays in `Loading`.
    pub failure: Option<String>,
}

impl LoadingProgress {
    pub fn fail(&mut self, message: String) {
        if self.failure.is_none() {
            error!("Loading failed: {}", message);
            self.failure = Some(message);
        }
    }

    pub fn is_complete(&self) -> bool {
        self.session_loaded && self.terrain_loaded && self.scene_created && self.failure.is_none()
    }
}
