/// Stick components with an absolute value below this are treated as zero.
pub const AXES_DEAD_ZONE: f32 = 0.4;

/// Magnitude above which a stick axis counts as pushed in a direction.
pub const HOLD_THRESHOLD: f32 = 0.7;

/// Seconds between repeated "held" ticks while a stick axis stays pushed.
pub const HOLD_REPEAT_INTERVAL: f32 = 0.8;

/// Number of button slots reported by an xr-standard gamepad.
pub const GAMEPAD_BUTTON_SLOTS: usize = 8;

/// Thumbstick components live at these indices of the xr-standard axes array.
pub const THUMBSTICK_X_AXIS: usize = 2;
pub const THUMBSTICK_Y_AXIS: usize = 3;
