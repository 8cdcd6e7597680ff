//! Gamepad mapping database.
//!
//! Mappings use the SDL_GameControllerDB text format, one device per line:
//!
//! ```text
//! 030000005e0400008e02000014010000,Xbox 360 Controller,a:b0,b:b1,leftx:a0,dpup:h0.1,platform:Linux,
//! ```
//!
//! The first field is the device GUID and the second a human-readable name.
//! The rest are `output:input` pairs, where the input is a raw axis (`aN`),
//! button (`bN`) or hat bit (`hN.B`). Axis inputs may be restricted to their
//! positive or negative half with a `+` or `-` prefix and inverted with a `~`
//! suffix.

use crate::{
    input::ButtonState,
    joystick::{GamepadAxis, GamepadButton, GamepadState},
    platform::{JoystickDescriptor, JoystickInput},
};

/// Lines this long or longer are skipped.
const MAX_LINE: usize = 1024;
/// Names this long or longer reject the line.
const MAX_NAME: usize = 128;

/// Mappings shipped with the library. Lines for other platforms are skipped
/// when the database is loaded.
const DEFAULT_MAPPINGS: &str = "\
78696e70757401000000000000000000,XInput Gamepad,a:b0,b:b1,x:b2,y:b3,leftshoulder:b4,rightshoulder:b5,back:b6,start:b7,leftstick:b8,rightstick:b9,leftx:a0,lefty:a1,rightx:a2,righty:a3,lefttrigger:a4,righttrigger:a5,dpup:h0.1,dpright:h0.2,dpdown:h0.4,dpleft:h0.8,platform:Windows,
030000005e0400008e02000014010000,Microsoft X-Box 360 pad,a:b0,b:b1,back:b6,dpdown:h0.4,dpleft:h0.8,dpright:h0.2,dpup:h0.1,guide:b8,leftshoulder:b4,leftstick:b9,lefttrigger:a2,leftx:a0,lefty:a1,rightshoulder:b5,rightstick:b10,righttrigger:a5,rightx:a3,righty:a4,start:b7,x:b2,y:b3,platform:Linux,
030000005e040000ea02000001030000,Xbox One Wireless Controller,a:b0,b:b1,back:b6,dpdown:h0.4,dpleft:h0.8,dpright:h0.2,dpup:h0.1,guide:b8,leftshoulder:b4,leftstick:b9,lefttrigger:a2,leftx:a0,lefty:a1,rightshoulder:b5,rightstick:b10,righttrigger:a5,rightx:a3,righty:a4,start:b7,x:b2,y:b3,platform:Linux,
030000004c050000cc09000000010000,PS4 Controller,a:b1,b:b2,back:b8,dpdown:h0.4,dpleft:h0.8,dpright:h0.2,dpup:h0.1,guide:b12,leftshoulder:b4,leftstick:b10,lefttrigger:a3,leftx:a0,lefty:a1,rightshoulder:b5,rightstick:b11,righttrigger:a4,rightx:a2,righty:a5,start:b9,x:b0,y:b3,platform:Mac OS X,
";

/// Where a canonical control reads its value from.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub(crate) enum Element {
    #[default]
    Unmapped,
    Axis {
        index: usize,
        scale: f32,
        offset: f32,
    },
    Button(usize),
    HatBit {
        hat: usize,
        bit: u8,
    },
}

impl Element {
    fn parse(input: &str) -> Option<Self> {
        let (min, max, rest) = match input.as_bytes().first()? {
            b'+' => (0.0, 1.0, &input[1..]),
            b'-' => (-1.0, 0.0, &input[1..]),
            _ => (-1.0, 1.0, input),
        };

        let kind = rest.chars().next()?;
        let body = &rest[kind.len_utf8()..];

        match kind {
            'a' => {
                let (digits, inverted) = match body.strip_suffix('~') {
                    Some(digits) => (digits, true),
                    None => (body, false),
                };

                let index = digits.parse().ok()?;
                let mut scale = 2.0 / (max - min);
                let mut offset = -(max + min);
                if inverted {
                    scale = -scale;
                    offset = -offset;
                }

                Some(Self::Axis {
                    index,
                    scale,
                    offset,
                })
            }
            'b' => Some(Self::Button(body.parse().ok()?)),
            'h' => {
                let (hat, bit) = body.split_once('.')?;
                Some(Self::HatBit {
                    hat: hat.parse().ok()?,
                    bit: bit.parse().ok()?,
                })
            }
            _ => None,
        }
    }

    /// Checks the element against the raw controls a device actually has.
    fn check(&self, descriptor: &JoystickDescriptor) -> Result<(), String> {
        match *self {
            Self::Unmapped => Ok(()),
            Self::Axis { index, .. } if index >= descriptor.axis_count => {
                Err(format!("invalid axis {index}"))
            }
            Self::Button(index) if index >= descriptor.button_count => {
                Err(format!("invalid button {index}"))
            }
            Self::HatBit { hat, .. } if hat >= descriptor.hat_count => {
                Err(format!("invalid hat {hat}"))
            }
            _ => Ok(()),
        }
    }

    fn pressed(&self, input: &JoystickInput) -> bool {
        match *self {
            Self::Unmapped => false,
            Self::Axis {
                index,
                scale,
                offset,
            } => {
                let value = input.axes.get(index).map_or(0.0, |v| v * scale + offset);
                // Half-axis and inverted elements count as pressed on the side
                // of zero they map towards.
                if offset < 0.0 || (offset == 0.0 && scale > 0.0) {
                    value >= 0.0
                } else {
                    value <= 0.0
                }
            }
            Self::Button(index) => input.buttons.get(index).copied().unwrap_or(false),
            Self::HatBit { hat, bit } => input
                .hats
                .get(hat)
                .map_or(false, |h| h.bits() & bit != 0),
        }
    }

    fn value(&self, input: &JoystickInput) -> f32 {
        match *self {
            Self::Unmapped => 0.0,
            Self::Axis {
                index,
                scale,
                offset,
            } => input
                .axes
                .get(index)
                .map_or(0.0, |v| (v * scale + offset).clamp(-1.0, 1.0)),
            Self::Button(index) => match input.buttons.get(index) {
                Some(true) => 1.0,
                Some(false) => -1.0,
                None => 0.0,
            },
            Self::HatBit { .. } => {
                if self.pressed(input) {
                    1.0
                } else {
                    -1.0
                }
            }
        }
    }
}

/// Projects one device's raw controls onto the canonical gamepad layout.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Mapping {
    /// Lower case.
    pub guid: String,
    pub name: String,
    buttons: [Element; GamepadButton::COUNT],
    axes: [Element; GamepadAxis::COUNT],
}

enum Output {
    Button(GamepadButton),
    Axis(GamepadAxis),
}

fn output(field: &str) -> Option<Output> {
    use GamepadAxis as A;
    use GamepadButton as B;

    Some(match field {
        "a" => Output::Button(B::A),
        "b" => Output::Button(B::B),
        "x" => Output::Button(B::X),
        "y" => Output::Button(B::Y),
        "back" => Output::Button(B::Back),
        "start" => Output::Button(B::Start),
        "guide" => Output::Button(B::Guide),
        "leftshoulder" => Output::Button(B::LeftBumper),
        "rightshoulder" => Output::Button(B::RightBumper),
        "leftstick" => Output::Button(B::LeftThumb),
        "rightstick" => Output::Button(B::RightThumb),
        "dpup" => Output::Button(B::DpadUp),
        "dpright" => Output::Button(B::DpadRight),
        "dpdown" => Output::Button(B::DpadDown),
        "dpleft" => Output::Button(B::DpadLeft),
        "lefttrigger" => Output::Axis(A::LeftTrigger),
        "righttrigger" => Output::Axis(A::RightTrigger),
        "leftx" => Output::Axis(A::LeftX),
        "lefty" => Output::Axis(A::LeftY),
        "rightx" => Output::Axis(A::RightX),
        "righty" => Output::Axis(A::RightY),
        _ => return None,
    })
}

impl Mapping {
    /// Parses one database line. `None` means the line is skipped, either
    /// because it is malformed or because it targets another platform.
    pub fn parse(line: &str, platform: &str) -> Option<Self> {
        let mut fields = line.split(',');

        let guid = fields.next()?;
        if guid.len() != 32 || !guid.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }

        let name = fields.next()?;
        if name.len() >= MAX_NAME {
            return None;
        }

        let mut mapping = Self {
            guid: guid.to_ascii_lowercase(),
            name: name.to_owned(),
            buttons: Default::default(),
            axes: Default::default(),
        };

        for field in fields {
            let field = field.trim();
            if field.is_empty() {
                continue;
            }

            let (key, value) = field.split_once(':')?;

            if key == "platform" {
                if value != platform {
                    return None;
                }
                continue;
            }

            // Output modifiers are not supported.
            if key.starts_with('+') || key.starts_with('-') {
                return None;
            }

            let Some(output) = output(key) else {
                continue;
            };

            let Some(element) = Element::parse(value) else {
                continue;
            };

            match output {
                Output::Button(button) => mapping.buttons[button as usize] = element,
                Output::Axis(axis) => mapping.axes[axis as usize] = element,
            }
        }

        Some(mapping)
    }

    /// Checks every element against the device's raw control counts.
    pub fn check(&self, descriptor: &JoystickDescriptor) -> Result<(), String> {
        self.buttons
            .iter()
            .chain(&self.axes)
            .try_for_each(|element| element.check(descriptor))
    }

    pub fn project(&self, input: &JoystickInput) -> GamepadState {
        let mut state = GamepadState::default();

        for (out, element) in state.buttons.iter_mut().zip(&self.buttons) {
            if element.pressed(input) {
                *out = ButtonState::Pressed;
            }
        }

        for (out, element) in state.axes.iter_mut().zip(&self.axes) {
            *out = element.value(input);
        }

        state
    }
}

/// Parses a database, skipping comments, blank lines, overlong lines and
/// lines that do not parse.
pub(crate) fn parse_database<'a>(
    text: &'a str,
    platform: &'a str,
) -> impl Iterator<Item = Mapping> + 'a {
    text.lines()
        .filter(|line| line.len() < MAX_LINE)
        .filter(|line| line.bytes().next().map_or(false, |b| b.is_ascii_hexdigit()))
        .filter_map(move |line| Mapping::parse(line, platform))
}

/// Adds mappings to a table, replacing existing entries with the same GUID in
/// place.
pub(crate) fn merge(table: &mut Vec<Mapping>, mappings: impl IntoIterator<Item = Mapping>) {
    for mapping in mappings {
        match table.iter_mut().find(|m| m.guid == mapping.guid) {
            Some(existing) => *existing = mapping,
            None => table.push(mapping),
        }
    }
}

/// The built-in table for a platform.
pub(crate) fn defaults(platform: &str) -> Vec<Mapping> {
    let mut table = Vec::new();
    merge(&mut table, parse_database(DEFAULT_MAPPINGS, platform));
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::joystick::Hat;

    const PAD: &str = "030000005e0400008e02000014010000,Test Pad,a:b0,b:b1,leftx:a0,lefty:-a1,righty:+a2~,lefttrigger:a3,dpup:h0.1,dpleft:h0.8,start:a4,";

    fn descriptor() -> JoystickDescriptor {
        JoystickDescriptor {
            name: "pad".to_owned(),
            guid: "030000005e0400008e02000014010000".to_owned(),
            axis_count: 5,
            button_count: 2,
            hat_count: 1,
        }
    }

    #[test]
    fn parses_elements() {
        let mapping = Mapping::parse(PAD, "Null").unwrap();

        assert_eq!(mapping.name, "Test Pad");
        assert_eq!(mapping.buttons[GamepadButton::A as usize], Element::Button(0));
        assert_eq!(
            mapping.buttons[GamepadButton::DpadLeft as usize],
            Element::HatBit { hat: 0, bit: 8 }
        );
        assert_eq!(
            mapping.axes[GamepadAxis::LeftX as usize],
            Element::Axis {
                index: 0,
                scale: 1.0,
                offset: 0.0
            }
        );
        assert_eq!(
            mapping.axes[GamepadAxis::LeftY as usize],
            Element::Axis {
                index: 1,
                scale: 2.0,
                offset: 1.0
            }
        );
        assert_eq!(
            mapping.axes[GamepadAxis::RightY as usize],
            Element::Axis {
                index: 2,
                scale: -2.0,
                offset: 1.0
            }
        );
        assert_eq!(mapping.axes[GamepadAxis::RightX as usize], Element::Unmapped);
        assert!(mapping.check(&descriptor()).is_ok());
    }

    #[test]
    fn rejects_malformed_lines() {
        // Short GUID.
        assert!(Mapping::parse("0300005e,Pad,a:b0,", "Null").is_none());
        // Output modifier.
        assert!(Mapping::parse(&PAD.replace("leftx:", "+leftx:"), "Null").is_none());
        // Another platform.
        assert!(Mapping::parse(&format!("{PAD}platform:Linux,"), "Null").is_none());
        assert!(Mapping::parse(&format!("{PAD}platform:Null,"), "Null").is_some());

        let long_name = format!("030000005e0400008e02000014010000,{},a:b0,", "n".repeat(128));
        assert!(Mapping::parse(&long_name, "Null").is_none());
    }

    #[test]
    fn non_ascii_elements_are_unmapped() {
        let mapping =
            Mapping::parse("030000005e0400008e02000014010000,Pad,a:é0,b:b1,x:+ß2,", "Null")
                .unwrap();

        assert_eq!(mapping.buttons[GamepadButton::A as usize], Element::Unmapped);
        assert_eq!(mapping.buttons[GamepadButton::X as usize], Element::Unmapped);
        assert_eq!(mapping.buttons[GamepadButton::B as usize], Element::Button(1));
    }

    #[test]
    fn database_skips_comments_and_long_lines() {
        let long = format!("{PAD}{}", "x:b0,".repeat(220));
        assert!(long.len() >= MAX_LINE);

        let text = format!("# comment\n\n{long}\n{}\n", PAD.replace("Test Pad", "Second"));
        let mappings: Vec<_> = parse_database(&text, "Null").collect();

        assert_eq!(mappings.len(), 1);
        assert_eq!(mappings[0].name, "Second");
    }

    #[test]
    fn same_guid_replaces() {
        let mut table = defaults("Linux");
        let before = table.len();
        assert!(table.iter().any(|m| m.name == "Microsoft X-Box 360 pad"));

        merge(&mut table, parse_database(PAD, "Linux"));

        assert_eq!(table.len(), before);
        assert!(table.iter().any(|m| m.name == "Test Pad"));
        assert!(defaults("Null").is_empty());
    }

    #[test]
    fn out_of_range_elements_are_detected() {
        let mapping = Mapping::parse(PAD, "Null").unwrap();
        let small = JoystickDescriptor {
            hat_count: 0,
            ..descriptor()
        };

        assert_eq!(mapping.check(&small), Err("invalid hat 0".to_owned()));
    }

    #[test]
    fn projects_raw_input() {
        let mapping = Mapping::parse(PAD, "Null").unwrap();
        let input = JoystickInput {
            axes: vec![0.5, -0.5, 0.25, -1.0, 0.2],
            buttons: vec![true, false],
            hats: vec![Hat::UP],
        };

        let state = mapping.project(&input);

        assert_eq!(state.button(GamepadButton::A), ButtonState::Pressed);
        assert_eq!(state.button(GamepadButton::B), ButtonState::Released);
        assert_eq!(state.button(GamepadButton::DpadUp), ButtonState::Pressed);
        assert_eq!(state.button(GamepadButton::DpadLeft), ButtonState::Released);
        // Unmapped controls read as released and centered.
        assert_eq!(state.button(GamepadButton::Guide), ButtonState::Released);
        assert_eq!(state.axis(GamepadAxis::RightX), 0.0);
        // A full axis used as a button is pressed from the center up.
        assert_eq!(state.button(GamepadButton::Start), ButtonState::Pressed);

        assert_eq!(state.axis(GamepadAxis::LeftX), 0.5);
        // -0.5 on the negative half maps to the middle of the full range.
        assert_eq!(state.axis(GamepadAxis::LeftY), 0.0);
        // 0.25 on the inverted positive half.
        assert_eq!(state.axis(GamepadAxis::RightY), 0.5);
        assert_eq!(state.axis(GamepadAxis::LeftTrigger), -1.0);
    }
}
