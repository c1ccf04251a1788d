//! Viewer rig for the immersive session.
//!
//! The rig entity carries the tracking-space offset derived from the player
//! position; the head camera is posed inside it from the latest input frame.

/// Rig, head camera, controller pointers and the hand-held panels.
pub mod xr_rig;
