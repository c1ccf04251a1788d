use bevy::prelude::*;
use constants::interaction::DEFAULT_HEIGHT_OFFSET;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlayerError {
    #[error("Cannot teleport before VR session has started")]
    SessionNotStarted,
}

/// Emitted after every successful teleport.
#[derive(Event, Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PlayerMoved {
    /// Feet position rotated into the viewer frame.
    pub position: Vec3,
    pub offset_position: Vec3,
    pub height_offset: f32,
}

/// Where the user stands, and the tracking-space offset that puts them there.
#[derive(Resource, Debug, Clone, PartialEq)]
pub struct Player {
    world_position: Vec3,
    viewer_y_rotation: f32,
    height_offset: f32,
    session_started: bool,
    offset_position: Vec3,
}

impl Default for Player {
    fn default() -> Self {
        Self::new(Vec3::ZERO)
    }
}

impl Player {
    pub fn new(world_position: Vec3) -> Self {
        Self {
            world_position,
            viewer_y_rotation: 0.0,
            height_offset: DEFAULT_HEIGHT_OFFSET,
            session_started: false,
            offset_position: Vec3::new(0.0, -DEFAULT_HEIGHT_OFFSET, 0.0),
        }
    }

    /// Eye height applied before the session starts.
    pub fn with_height_offset(mut self, height_offset: f32) -> Self {
        self.height_offset = height_offset;
        self.offset_position = Vec3::new(0.0, -height_offset, 0.0);
        self
    }

    pub fn world_position(&self) -> Vec3 {
        self.world_position
    }

    pub fn height_offset(&self) -> f32 {
        self.height_offset
    }

    pub fn session_started(&self) -> bool {
        self.session_started
    }

    pub fn offset_position(&self) -> Vec3 {
        self.offset_position
    }

    /// Eye position in world space.
    pub fn eye_position(&self) -> Vec3 {
        self.world_position + Vec3::Y * self.height_offset
    }

    /// Mark the device session live and apply the pending position.
    pub fn start_session(&mut self) -> Result<PlayerMoved, PlayerError> {
        self.session_started = true;
        self.teleport(None)
    }

    /// Move the feet to `target`, or re-apply the current position.
    pub fn teleport(&mut self, target: Option<Vec3>) -> Result<PlayerMoved, PlayerError> {
        if !self.session_started {
            return Err(PlayerError::SessionNotStarted);
        }
        if let Some(target) = target {
            self.world_position = target;
        }

        let position = Quat::from_rotation_y(self.viewer_y_rotation) * self.world_position;
        self.offset_position = Vec3::new(
            -position.x,
            -position.y - self.height_offset,
            -position.z,
        );

        Ok(PlayerMoved {
            position,
            offset_position: self.offset_position,
            height_offset: self.height_offset,
        })
    }

    /// The new height takes effect immediately if the session is live.
    pub fn set_height_offset(&mut self, height_offset: f32) -> Result<PlayerMoved, PlayerError> {
        self.height_offset = height_offset;
        self.teleport(None)
    }

    /// Tracking space to world space. Inverse of the reference-space offset.
    pub fn rig_transform(&self) -> Transform {
        let offset_rotation = Quat::from_rotation_y(self.viewer_y_rotation);
        let inverse = offset_rotation.inverse();
        Transform::from_translation(inverse * -self.offset_position).with_rotation(inverse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn teleport_before_session_fails_without_moving() {
        let mut player = Player::new(Vec3::new(0.0, 5.0, -25.0));
        assert_eq!(
            player.teleport(Some(Vec3::new(10.0, 0.0, 0.0))),
            Err(PlayerError::SessionNotStarted)
        );
        assert_eq!(player.world_position(), Vec3::new(0.0, 5.0, -25.0));
    }

    #[test]
    fn offset_position_negates_feet_and_eye_height() {
        let mut player = Player::new(Vec3::new(0.0, 5.0, -25.0));
        let moved = player.start_session().unwrap();
        assert_eq!(moved.offset_position, Vec3::new(0.0, -6.0, 25.0));

        let moved = player.teleport(Some(Vec3::new(3.0, 2.0, 1.0))).unwrap();
        assert_eq!(moved.offset_position, Vec3::new(-3.0, -3.0, -1.0));
        assert_eq!(player.rig_transform().translation, Vec3::new(3.0, 3.0, 1.0));
    }

    #[test]
    fn height_offset_reteleports_in_place() {
        let mut player = Player::new(Vec3::new(1.0, 2.0, 3.0));
        assert!(player.set_height_offset(4.0).is_err());
        assert_eq!(player.height_offset(), 4.0);

        player.start_session().unwrap();
        let moved = player.set_height_offset(10.0).unwrap();
        assert_eq!(moved.offset_position.y, -12.0);
        assert_eq!(player.eye_position(), Vec3::new(1.0, 12.0, 3.0));
    }

    #[test]
    fn configured_height_applies_on_session_start() {
        let mut player = Player::new(Vec3::new(0.0, 3.0, 0.0)).with_height_offset(2.0);
        assert_eq!(player.rig_transform().translation, Vec3::new(0.0, 2.0, 0.0));
        let moved = player.start_session().unwrap();
        assert_eq!(moved.offset_position, Vec3::new(0.0, -5.0, 0.0));
    }
}
