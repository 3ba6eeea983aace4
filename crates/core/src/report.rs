//! FaucetTwo LED output report: state model and wire encoding.
//!
//! The device takes a single 32-byte output report:
//!
//! | Offset | Field                                            | Size |
//! |--------|--------------------------------------------------|------|
//! | 0      | report ID                                        | 1    |
//! | 1      | top-left-left (r, g, b)                          | 3    |
//! | 4      | top-left                                         | 3    |
//! | 7      | top-right                                        | 3    |
//! | 10     | top-right-right                                  | 3    |
//! | 13     | left                                             | 3    |
//! | 16     | reserved (always zero)                           | 3    |
//! | 19     | right                                            | 3    |
//! | 22     | mode0, mode1, mode2                              | 3    |
//! | 25     | btn A, B, C, D, FX left, FX right, start (0 / 1) | 7    |
//!
//! Encoding is done field by field at these offsets; the in-memory layout of
//! [`ReportState`] is irrelevant to the wire format.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::error;

/// Report ID byte. The device uses unnumbered reports.
pub const REPORT_ID: u8 = 0x00;

/// Total report length (including report ID).
pub const REPORT_LEN: usize = 32;

/// Mode bytes written once at connect time.
pub const MODE_BYTES: [u8; 3] = [0, 1, 2];

/// Number of button / effect control bytes.
pub const BUTTON_COUNT: usize = 7;

/// Number of colorable zones per side.
pub const ZONES_PER_SIDE: u8 = 3;

/// Byte offsets of each field in the encoded report.
pub mod offsets {
    pub const REPORT_ID: usize = 0;
    pub const TOP_LEFT_LEFT: usize = 1;
    pub const TOP_LEFT: usize = 4;
    pub const TOP_RIGHT: usize = 7;
    pub const TOP_RIGHT_RIGHT: usize = 10;
    pub const LEFT: usize = 13;
    pub const RESERVED: usize = 16;
    pub const RIGHT: usize = 19;
    pub const MODES: usize = 22;
    pub const BUTTONS: usize = 25;
}

/// One RGB LED color.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    /// All channels off.
    pub const OFF: Rgb = Rgb::new(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    fn to_bytes(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }

    fn from_bytes(bytes: &[u8]) -> Self {
        Self::new(bytes[0], bytes[1], bytes[2])
    }
}

impl FromStr for Rgb {
    type Err = Error;

    /// Parse `#RRGGBB` or `RRGGBB`.
    fn from_str(s: &str) -> Result<Self> {
        let hex = s.strip_prefix('#').unwrap_or(s);
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(Error::InvalidInput(format!(
                "color '{s}' is not in #RRGGBB form"
            )));
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16)
                .map_err(|e| Error::InvalidInput(format!("color '{s}': {e}")))
        };
        Ok(Self::new(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }
}

impl std::fmt::Display for Rgb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Controller side a zone belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    /// Parse a side from a CLI-friendly string (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "left" | "l" => Some(Self::Left),
            "right" | "r" => Some(Self::Right),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Button / effect controls, in wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Button {
    A,
    B,
    C,
    D,
    FxLeft,
    FxRight,
    Start,
}

impl Button {
    /// All controls in wire order.
    pub const ALL: [Button; BUTTON_COUNT] = [
        Button::A,
        Button::B,
        Button::C,
        Button::D,
        Button::FxLeft,
        Button::FxRight,
        Button::Start,
    ];

    fn index(self) -> usize {
        self as usize
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::A => "BT-A",
            Self::B => "BT-B",
            Self::C => "BT-C",
            Self::D => "BT-D",
            Self::FxLeft => "FX-L",
            Self::FxRight => "FX-R",
            Self::Start => "Start",
        }
    }
}

/// The next report to send to the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportState {
    report_id: u8,
    top_left_left: Rgb,
    top_left: Rgb,
    top_right: Rgb,
    top_right_right: Rgb,
    left: Rgb,
    reserved: Rgb,
    right: Rgb,
    modes: [u8; 3],
    buttons: [u8; BUTTON_COUNT],
}

impl Default for ReportState {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportState {
    /// All-zero state with the fixed report ID. Mode bytes stay zero until
    /// [`ReportState::init_modes`].
    pub fn new() -> Self {
        Self {
            report_id: REPORT_ID,
            top_left_left: Rgb::OFF,
            top_left: Rgb::OFF,
            top_right: Rgb::OFF,
            top_right_right: Rgb::OFF,
            left: Rgb::OFF,
            reserved: Rgb::OFF,
            right: Rgb::OFF,
            modes: [0; 3],
            buttons: [0; BUTTON_COUNT],
        }
    }

    /// Set the mode bytes to [`MODE_BYTES`]. Called once a device is opened.
    pub fn init_modes(&mut self) {
        self.modes = MODE_BYTES;
    }

    fn zone_mut(&mut self, side: Side, position: u8) -> Option<&mut Rgb> {
        match (side, position) {
            (Side::Left, 0) => Some(&mut self.left),
            (Side::Left, 1) => Some(&mut self.top_left),
            (Side::Left, 2) => Some(&mut self.top_left_left),
            (Side::Right, 0) => Some(&mut self.right),
            (Side::Right, 1) => Some(&mut self.top_right),
            (Side::Right, 2) => Some(&mut self.top_right_right),
            _ => None,
        }
    }

    /// Color of one zone, or `None` for a position outside 0..=2.
    ///
    /// Position 0 is the side's main light, 1 the inner top light and 2 the
    /// outer top light.
    pub fn zone(&self, side: Side, position: u8) -> Option<Rgb> {
        match (side, position) {
            (Side::Left, 0) => Some(self.left),
            (Side::Left, 1) => Some(self.top_left),
            (Side::Left, 2) => Some(self.top_left_left),
            (Side::Right, 0) => Some(self.right),
            (Side::Right, 1) => Some(self.top_right),
            (Side::Right, 2) => Some(self.top_right_right),
            _ => None,
        }
    }

    /// Overwrite one zone color.
    ///
    /// Positions outside 0..=2 are ignored; returns whether a zone was written.
    pub fn set_lights(&mut self, side: Side, position: u8, color: Rgb) -> bool {
        match self.zone_mut(side, position) {
            Some(slot) => {
                *slot = color;
                true
            }
            None => false,
        }
    }

    /// Byte-level form of [`ReportState::set_lights`]: `left == 1` selects the
    /// left side, any other value the right side.
    pub fn set_lights_raw(&mut self, left: u8, position: u8, color: Rgb) -> bool {
        let side = if left == 1 { Side::Left } else { Side::Right };
        self.set_lights(side, position, color)
    }

    /// Overwrite all seven control bytes from the low bit of each element.
    ///
    /// Needs at least [`BUTTON_COUNT`] elements; extra elements are ignored.
    /// A shorter slice leaves the state untouched.
    pub fn set_buttons(&mut self, bits: &[u8]) -> Result<()> {
        if bits.len() < BUTTON_COUNT {
            error!(
                len = bits.len(),
                required = BUTTON_COUNT,
                "Button bitfield too short"
            );
            return Err(Error::InvalidInput(format!(
                "button bitfield has {} elements, needs at least {}",
                bits.len(),
                BUTTON_COUNT
            )));
        }
        for (dst, &src) in self.buttons.iter_mut().zip(bits) {
            *dst = src & 1;
        }
        Ok(())
    }

    /// Whether a control is currently lit.
    pub fn button(&self, button: Button) -> bool {
        self.buttons[button.index()] != 0
    }

    /// Raw control bytes in wire order.
    pub fn buttons(&self) -> [u8; BUTTON_COUNT] {
        self.buttons
    }

    pub fn modes(&self) -> [u8; 3] {
        self.modes
    }

    pub fn reserved(&self) -> Rgb {
        self.reserved
    }

    pub fn report_id(&self) -> u8 {
        self.report_id
    }

    /// Encode into the 32-byte wire report.
    pub fn encode(&self) -> [u8; REPORT_LEN] {
        let mut buf = [0u8; REPORT_LEN];
        buf[offsets::REPORT_ID] = self.report_id;
        put_rgb(&mut buf, offsets::TOP_LEFT_LEFT, self.top_left_left);
        put_rgb(&mut buf, offsets::TOP_LEFT, self.top_left);
        put_rgb(&mut buf, offsets::TOP_RIGHT, self.top_right);
        put_rgb(&mut buf, offsets::TOP_RIGHT_RIGHT, self.top_right_right);
        put_rgb(&mut buf, offsets::LEFT, self.left);
        put_rgb(&mut buf, offsets::RESERVED, self.reserved);
        put_rgb(&mut buf, offsets::RIGHT, self.right);
        buf[offsets::MODES..offsets::MODES + 3].copy_from_slice(&self.modes);
        buf[offsets::BUTTONS..offsets::BUTTONS + BUTTON_COUNT].copy_from_slice(&self.buttons);
        buf
    }

    /// Decode a captured report back into a state.
    ///
    /// Rejects reports of the wrong length, with a foreign report ID, with a
    /// non-zero reserved slot, or with control bytes other than 0 / 1.
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() != REPORT_LEN {
            return Err(Error::InvalidInput(format!(
                "report is {} bytes, expected {}",
                data.len(),
                REPORT_LEN
            )));
        }
        if data[offsets::REPORT_ID] != REPORT_ID {
            return Err(Error::InvalidInput(format!(
                "unknown report ID: 0x{:02X}",
                data[offsets::REPORT_ID]
            )));
        }

        let rgb_at = |offset: usize| Rgb::from_bytes(&data[offset..offset + 3]);
        if rgb_at(offsets::RESERVED) != Rgb::OFF {
            return Err(Error::InvalidInput(
                "reserved zone bytes must be zero".into(),
            ));
        }

        let mut buttons = [0u8; BUTTON_COUNT];
        buttons.copy_from_slice(&data[offsets::BUTTONS..offsets::BUTTONS + BUTTON_COUNT]);
        if let Some(bad) = buttons.iter().find(|&&b| b > 1) {
            return Err(Error::InvalidInput(format!(
                "control byte 0x{bad:02X} is not 0 or 1"
            )));
        }

        let mut modes = [0u8; 3];
        modes.copy_from_slice(&data[offsets::MODES..offsets::MODES + 3]);

        Ok(Self {
            report_id: REPORT_ID,
            top_left_left: rgb_at(offsets::TOP_LEFT_LEFT),
            top_left: rgb_at(offsets::TOP_LEFT),
            top_right: rgb_at(offsets::TOP_RIGHT),
            top_right_right: rgb_at(offsets::TOP_RIGHT_RIGHT),
            left: rgb_at(offsets::LEFT),
            reserved: Rgb::OFF,
            right: rgb_at(offsets::RIGHT),
            modes,
            buttons,
        })
    }
}

fn put_rgb(buf: &mut [u8; REPORT_LEN], offset: usize, color: Rgb) {
    buf[offset..offset + 3].copy_from_slice(&color.to_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_zones() -> [(Side, u8); 6] {
        [
            (Side::Left, 0),
            (Side::Left, 1),
            (Side::Left, 2),
            (Side::Right, 0),
            (Side::Right, 1),
            (Side::Right, 2),
        ]
    }

    #[test]
    fn new_state_encodes_to_zeroes() {
        let state = ReportState::new();
        assert_eq!(state.encode(), [0u8; REPORT_LEN]);
        assert_eq!(state.report_id(), REPORT_ID);
    }

    #[test]
    fn encode_is_deterministic() {
        let mut state = ReportState::new();
        state.init_modes();
        state.set_lights(Side::Right, 2, Rgb::new(0xDE, 0xAD, 0xBE));
        state.set_buttons(&[1, 1, 0, 0, 1, 0, 1]).unwrap();
        assert_eq!(state.encode(), state.encode());
        assert_eq!(state.encode(), state.clone().encode());
    }

    #[test]
    fn fields_land_at_documented_offsets() {
        let mut state = ReportState::new();
        state.init_modes();
        state.set_lights(Side::Left, 2, Rgb::new(1, 2, 3)); // top-left-left
        state.set_lights(Side::Left, 1, Rgb::new(4, 5, 6)); // top-left
        state.set_lights(Side::Right, 1, Rgb::new(7, 8, 9)); // top-right
        state.set_lights(Side::Right, 2, Rgb::new(10, 11, 12)); // top-right-right
        state.set_lights(Side::Left, 0, Rgb::new(13, 14, 15)); // left
        state.set_lights(Side::Right, 0, Rgb::new(19, 20, 21)); // right
        state.set_buttons(&[1, 0, 1, 1, 0, 1, 0]).unwrap();

        let expected: [u8; REPORT_LEN] = [
            0x00, // report ID
            1, 2, 3, // top-left-left
            4, 5, 6, // top-left
            7, 8, 9, // top-right
            10, 11, 12, // top-right-right
            13, 14, 15, // left
            0, 0, 0, // reserved
            19, 20, 21, // right
            0, 1, 2, // modes
            1, 0, 1, 1, 0, 1, 0, // buttons
        ];
        assert_eq!(state.encode(), expected);
    }

    #[test]
    fn set_lights_touches_only_one_zone() {
        for (side, pos) in all_zones() {
            let mut state = ReportState::new();
            let color = Rgb::new(10, 20, 30);
            assert!(state.set_lights(side, pos, color));
            for (other_side, other_pos) in all_zones() {
                let expected = if (other_side, other_pos) == (side, pos) {
                    color
                } else {
                    Rgb::OFF
                };
                assert_eq!(state.zone(other_side, other_pos), Some(expected));
            }
            assert_eq!(state.reserved(), Rgb::OFF);
        }
    }

    #[test]
    fn set_lights_raw_left_flag() {
        let mut state = ReportState::new();
        state.set_lights_raw(1, 0, Rgb::new(10, 20, 30));
        assert_eq!(state.zone(Side::Left, 0), Some(Rgb::new(10, 20, 30)));

        // Anything other than 1 means right.
        state.set_lights_raw(0, 0, Rgb::new(1, 1, 1));
        state.set_lights_raw(7, 1, Rgb::new(2, 2, 2));
        assert_eq!(state.zone(Side::Right, 0), Some(Rgb::new(1, 1, 1)));
        assert_eq!(state.zone(Side::Right, 1), Some(Rgb::new(2, 2, 2)));
        assert_eq!(state.zone(Side::Left, 0), Some(Rgb::new(10, 20, 30)));
    }

    #[test]
    fn set_lights_ignores_unknown_position() {
        let mut state = ReportState::new();
        state.set_lights(Side::Left, 1, Rgb::new(9, 9, 9));
        let before = state.clone();

        assert!(!state.set_lights_raw(0, 5, Rgb::new(0xFF, 0xFF, 0xFF)));
        assert!(!state.set_lights(Side::Left, 3, Rgb::new(0xFF, 0xFF, 0xFF)));
        assert_eq!(state, before);
        assert_eq!(state.zone(Side::Right, 5), None);
    }

    #[test]
    fn reserved_stays_zero() {
        let mut state = ReportState::new();
        for pos in 0..=u8::MAX {
            state.set_lights(Side::Left, pos, Rgb::new(0xFF, 0xFF, 0xFF));
            state.set_lights(Side::Right, pos, Rgb::new(0xFF, 0xFF, 0xFF));
        }
        assert_eq!(state.reserved(), Rgb::OFF);
        assert_eq!(
            &state.encode()[offsets::RESERVED..offsets::RESERVED + 3],
            &[0, 0, 0]
        );
    }

    #[test]
    fn set_buttons_keeps_low_bit() {
        let mut state = ReportState::new();
        state.set_buttons(&[1, 0, 3, 2, 5, 4, 1]).unwrap();
        assert_eq!(state.buttons(), [1, 0, 1, 0, 1, 0, 1]);
        assert!(state.button(Button::A));
        assert!(!state.button(Button::B));
        assert!(state.button(Button::Start));
    }

    #[test]
    fn single_bit_lights_matching_button() {
        for (i, button) in Button::ALL.iter().enumerate() {
            let mut bits = [0u8; BUTTON_COUNT];
            bits[i] = 1;
            let mut state = ReportState::new();
            state.set_buttons(&bits).unwrap();
            for other in Button::ALL {
                assert_eq!(state.button(other), other == *button);
            }
            assert_eq!(state.encode()[offsets::BUTTONS + i], 1);
        }
    }

    #[test]
    fn button_labels_distinct() {
        let labels: std::collections::HashSet<_> =
            Button::ALL.iter().map(Button::label).collect();
        assert_eq!(labels.len(), BUTTON_COUNT);
        assert!(labels.iter().all(|l| !l.is_empty()));
    }

    #[test]
    fn set_buttons_ignores_extra_elements() {
        let mut state = ReportState::new();
        state.set_buttons(&[1, 1, 1, 1, 1, 1, 1, 0, 0]).unwrap();
        assert_eq!(state.buttons(), [1; BUTTON_COUNT]);
    }

    #[test]
    fn set_buttons_rejects_short_input() {
        let mut state = ReportState::new();
        state.set_buttons(&[1, 0, 1, 0, 1, 0, 1]).unwrap();

        let err = state.set_buttons(&[0, 0, 0]).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert!(state.set_buttons(&[]).is_err());
        assert_eq!(state.buttons(), [1, 0, 1, 0, 1, 0, 1]);
    }

    #[test]
    fn modes_start_zero_until_initialized() {
        let mut state = ReportState::new();
        assert_eq!(state.modes(), [0, 0, 0]);
        state.init_modes();
        assert_eq!(state.modes(), MODE_BYTES);
        assert_eq!(
            &state.encode()[offsets::MODES..offsets::MODES + 3],
            &MODE_BYTES
        );
    }

    #[test]
    fn decode_matches_captured_report() {
        let mut captured = [0u8; REPORT_LEN];
        captured[offsets::LEFT..offsets::LEFT + 3].copy_from_slice(&[0xFF, 0x00, 0x80]);
        captured[offsets::MODES..offsets::MODES + 3].copy_from_slice(&MODE_BYTES);
        captured[offsets::BUTTONS + 6] = 1;

        let decoded = ReportState::decode(&captured).unwrap();
        assert_eq!(decoded.zone(Side::Left, 0), Some(Rgb::new(0xFF, 0x00, 0x80)));
        assert!(decoded.button(Button::Start));
        assert_eq!(decoded.encode(), captured);
    }

    #[test]
    fn decode_rejects_bad_reports() {
        assert!(ReportState::decode(&[0u8; 31]).is_err());
        assert!(ReportState::decode(&[0u8; 33]).is_err());

        let mut foreign_id = [0u8; REPORT_LEN];
        foreign_id[0] = 0x01;
        assert!(ReportState::decode(&foreign_id).is_err());

        let mut reserved = [0u8; REPORT_LEN];
        reserved[offsets::RESERVED + 1] = 1;
        assert!(ReportState::decode(&reserved).is_err());

        let mut button = [0u8; REPORT_LEN];
        button[offsets::BUTTONS] = 2;
        assert!(ReportState::decode(&button).is_err());
    }

    #[test]
    fn rgb_parses_hex() {
        assert_eq!("#0a141e".parse::<Rgb>().unwrap(), Rgb::new(10, 20, 30));
        assert_eq!("FF8000".parse::<Rgb>().unwrap(), Rgb::new(0xFF, 0x80, 0x00));
        assert!("#12345".parse::<Rgb>().is_err());
        assert!("zzzzzz".parse::<Rgb>().is_err());
        assert!("#ééé".parse::<Rgb>().is_err());
        assert_eq!(Rgb::new(10, 20, 30).to_string(), "#0a141e");
    }

    #[test]
    fn side_from_name_accepts_variants() {
        assert_eq!(Side::from_name("LEFT"), Some(Side::Left));
        assert_eq!(Side::from_name("r"), Some(Side::Right));
        assert_eq!(Side::from_name("middle"), None);
    }
}
