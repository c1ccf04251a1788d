pub mod assets;
pub mod camera;
pub mod core;
pub mod loading;
pub mod player;
pub mod scene;
pub mod settings;
