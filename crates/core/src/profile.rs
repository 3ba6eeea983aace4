//! Lighting profiles: a named set of zone colors and button states, stored
//! as JSON.

use crate::error::{Error, Result};
use crate::report::{ReportState, Rgb, Side, BUTTON_COUNT, ZONES_PER_SIDE};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Color for one zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneColor {
    pub side: Side,
    /// 0 = main light, 1 = inner top, 2 = outer top.
    pub position: u8,
    pub color: Rgb,
}

/// A saved lighting configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightingProfile {
    /// Profile display name.
    pub name: String,
    /// Zones to color; zones not listed stay off.
    #[serde(default)]
    pub zones: Vec<ZoneColor>,
    /// Button lights in wire order (A, B, C, D, FX-L, FX-R, Start).
    #[serde(default)]
    pub buttons: [bool; BUTTON_COUNT],
}

impl Default for LightingProfile {
    fn default() -> Self {
        let zone = |side, position, color| ZoneColor {
            side,
            position,
            color,
        };
        Self {
            name: "Default".into(),
            zones: vec![
                zone(Side::Left, 0, Rgb::new(0x00, 0x40, 0xFF)),
                zone(Side::Left, 1, Rgb::new(0x00, 0x20, 0x80)),
                zone(Side::Left, 2, Rgb::new(0x00, 0x10, 0x40)),
                zone(Side::Right, 0, Rgb::new(0xFF, 0x00, 0x60)),
                zone(Side::Right, 1, Rgb::new(0x80, 0x00, 0x30)),
                zone(Side::Right, 2, Rgb::new(0x40, 0x00, 0x18)),
            ],
            buttons: [false; BUTTON_COUNT],
        }
    }
}

impl LightingProfile {
    /// Reject zone positions the device does not have.
    pub fn validate(&self) -> Result<()> {
        if let Some(bad) = self.zones.iter().find(|z| z.position >= ZONES_PER_SIDE) {
            return Err(Error::InvalidInput(format!(
                "profile '{}': {} zone position {} (allowed 0..={})",
                self.name,
                bad.side,
                bad.position,
                ZONES_PER_SIDE - 1
            )));
        }
        Ok(())
    }

    /// Write this profile's zones and buttons into `state`.
    ///
    /// Validates first; an invalid profile leaves `state` untouched.
    pub fn apply(&self, state: &mut ReportState) -> Result<()> {
        self.validate()?;
        for zone in &self.zones {
            state.set_lights(zone.side, zone.position, zone.color);
        }
        let bits = self.buttons.map(u8::from);
        state.set_buttons(&bits)
    }
}

/// Load a profile from a JSON file.
pub fn load_profile(path: &Path) -> Result<LightingProfile> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| Error::Profile(format!("read {}: {e}", path.display())))?;
    let profile: LightingProfile = serde_json::from_str(&text)
        .map_err(|e| Error::Profile(format!("parse {}: {e}", path.display())))?;
    profile.validate()?;
    debug!(name = %profile.name, path = %path.display(), "Loaded lighting profile");
    Ok(profile)
}

/// Save a profile as pretty-printed JSON.
pub fn save_profile(profile: &LightingProfile, path: &Path) -> Result<()> {
    profile.validate()?;
    let json = serde_json::to_string_pretty(profile)
        .map_err(|e| Error::Profile(format!("serialize: {e}")))?;
    std::fs::write(path, json)
        .map_err(|e| Error::Profile(format!("write {}: {e}", path.display())))?;
    debug!(name = %profile.name, path = %path.display(), "Saved lighting profile");
    Ok(())
}
