use bevy::prelude::*;
use constants::interaction::{DEFAULT_HEIGHT_OFFSET, MIN_TERRAIN_SCALE};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum SettingsError {
    #[error("unknown setting '{0}'")]
    UnknownSetting(String),
    #[error("{key} = {value} outside [{min}, {max}]")]
    OutOfRange {
        key: &'static str,
        value: f32,
        min: f32,
        max: f32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettingKey {
    HeightOffset,
    TerrainScale,
    MinimapScale,
    SunPhi,
    SunTheta,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SettingRange {
    pub min: f32,
    pub max: f32,
    pub step: f32,
}

impl SettingKey {
    pub const ALL: [SettingKey; 5] = [
        SettingKey::HeightOffset,
        SettingKey::TerrainScale,
        SettingKey::MinimapScale,
        SettingKey::SunPhi,
        SettingKey::SunTheta,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HeightOffset => "height_offset",
            Self::TerrainScale => "terrain_scale",
            Self::MinimapScale => "minimap_scale",
            Self::SunPhi => "sun_phi",
            Self::SunTheta => "sun_theta",
        }
    }

    pub fn range(&self) -> SettingRange {
        let (min, max, step) = match self {
            Self::HeightOffset => (0.0, 50.0, 0.01),
            Self::TerrainScale => (0.0, 100.0, 10.0),
            Self::MinimapScale => (0.5, 2.0, 0.01),
            Self::SunPhi => (0.0, 75.0, 1.0),
            Self::SunTheta => (0.0, 360.0, 1.0),
        };
        SettingRange { min, max, step }
    }
}

impl FromStr for SettingKey {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| SettingsError::UnknownSetting(s.to_string()))
    }
}

/// Values driven by the menu sliders.
#[derive(Resource, Debug, Clone, PartialEq)]
pub struct Settings {
    pub height_offset: f32,
    pub terrain_scale: f32,
    pub minimap_scale: f32,
    pub sun_phi: f32,
    pub sun_theta: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            height_offset: DEFAULT_HEIGHT_OFFSET,
            terrain_scale: 100.0,
            minimap_scale: 1.0,
            sun_phi: 10.0,
            sun_theta: 90.0,
        }
    }
}

impl Settings {
    pub fn get(&self, key: SettingKey) -> f32 {
        match key {
            SettingKey::HeightOffset => self.height_offset,
            SettingKey::TerrainScale => self.terrain_scale,
            SettingKey::MinimapScale => self.minimap_scale,
            SettingKey::SunPhi => self.sun_phi,
            SettingKey::SunTheta => self.sun_theta,
        }
    }

    pub fn set(&mut self, key: SettingKey, value: f32) -> Result<(), SettingsError> {
        let range = key.range();
        if !(range.min..=range.max).contains(&value) {
            return Err(SettingsError::OutOfRange {
                key: key.as_str(),
                value,
                min: range.min,
                max: range.max,
            });
        }

        let slot = match key {
            SettingKey::HeightOffset => &mut self.height_offset,
            SettingKey::TerrainScale => &mut self.terrain_scale,
            SettingKey::MinimapScale => &mut self.minimap_scale,
            SettingKey::SunPhi => &mut self.sun_phi,
            SettingKey::SunTheta => &mut self.sun_theta,
        };
        *slot = value;
        Ok(())
    }

    /// Uniform scale of the terrain container. Quadratic so low slider values
    /// give fine control over miniature views.
    pub fn terrain_scale_factor(&self) -> f32 {
        (self.terrain_scale / 100.0).powi(2).max(MIN_TERRAIN_SCALE)
    }

    /// Unit vector towards the sun. `sun_phi` is elevation above the horizon,
    /// `sun_theta` the azimuth, both in degrees.
    pub fn sun_direction(&self) -> Vec3 {
        let polar = (90.0 - self.sun_phi).to_radians();
        let azimuth = self.sun_theta.to_radians();
        Vec3::new(
            polar.sin() * azimuth.sin(),
            polar.cos(),
            polar.sin() * azimuth.cos(),
        )
    }
}

/// Menu tab a slider lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MenuTab {
    Terrain,
    Illumination,
    Settings,
}

#[derive(Debug, Clone, Serialize)]
pub struct SliderBinding {
    pub label: &'static str,
    pub tab: MenuTab,
    pub key: SettingKey,
    pub range: SettingRange,
}

/// Sliders offered by the hand menu, in display order.
const MENU_SLIDERS: [(&str, MenuTab, &str); 5] = [
    ("Terrain scale", MenuTab::Terrain, "terrain_scale"),
    ("Sun elevation", MenuTab::Illumination, "sun_phi"),
    ("Sun orientation", MenuTab::Illumination, "sun_theta"),
    ("Height above terrain", MenuTab::Settings, "height_offset"),
    ("Map scale", MenuTab::Settings, "minimap_scale"),
];

/// Slider bindings resolved at startup.
#[derive(Resource, Debug, Clone, Default)]
pub struct MenuSliders(pub Vec<SliderBinding>);

/// Resolve a slider target. A bad target is a wiring mistake, so this panics.
pub fn bind_slider(label: &'static str, tab: MenuTab, target: &str) -> SliderBinding {
    let key = target
        .parse::<SettingKey>()
        .unwrap_or_else(|e| panic!("Menu slider '{label}' bound to missing setting: {e}"));
    SliderBinding {
        label,
        tab,
        key,
        range: key.range(),
    }
}

pub fn bind_menu_sliders(mut commands: Commands) {
    let sliders = MENU_SLIDERS
        .iter()
        .map(|(label, tab, target)| bind_slider(*label, *tab, target))
        .collect();
    commands.insert_resource(MenuSliders(sliders));
}
