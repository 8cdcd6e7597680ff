//! Joysticks and gamepads.
//!
//! Joysticks occupy fixed slots. Raw state is read from the platform on
//! every query, so it is available without processing events; connection
//! callbacks, however, are only delivered from event processing. A joystick
//! whose GUID has an entry in the mapping table is also a gamepad, with its
//! raw controls projected onto the canonical layout of [`GamepadState`].

use std::any::Any;

use crate::{
    error::{raise, ErrorCode, Result},
    input::ButtonState,
    mapping,
    platform::{JoystickDescriptor, JoystickInput},
    Library,
};

/// Number of joystick slots.
pub const MAX_JOYSTICKS: usize = 16;

bitflags::bitflags! {
    /// Direction of a joystick hat. Diagonals have two bits set.
    pub struct Hat: u8 {
        const UP = 0x1;
        const RIGHT = 0x2;
        const DOWN = 0x4;
        const LEFT = 0x8;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JoystickEvent {
    Connected,
    Disconnected,
}

/// Buttons of the canonical gamepad layout, named after an Xbox controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GamepadButton {
    A,
    B,
    X,
    Y,
    LeftBumper,
    RightBumper,
    Back,
    Start,
    Guide,
    LeftThumb,
    RightThumb,
    DpadUp,
    DpadRight,
    DpadDown,
    DpadLeft,
}

impl GamepadButton {
    pub const COUNT: usize = 15;
}

/// Axes of the canonical gamepad layout. Triggers rest at -1.0.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GamepadAxis {
    LeftX,
    LeftY,
    RightX,
    RightY,
    LeftTrigger,
    RightTrigger,
}

impl GamepadAxis {
    pub const COUNT: usize = 6;
}

/// A snapshot of a gamepad. Controls the mapping does not provide read as
/// released and 0.0.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GamepadState {
    pub buttons: [ButtonState; GamepadButton::COUNT],
    /// In the range -1.0..=1.0.
    pub axes: [f32; GamepadAxis::COUNT],
}

impl Default for GamepadState {
    fn default() -> Self {
        Self {
            buttons: [ButtonState::Released; GamepadButton::COUNT],
            axes: [0.0; GamepadAxis::COUNT],
        }
    }
}

impl GamepadState {
    #[must_use]
    pub fn button(&self, button: GamepadButton) -> ButtonState {
        self.buttons[button as usize]
    }

    #[must_use]
    pub fn axis(&self, axis: GamepadAxis) -> f32 {
        self.axes[axis as usize]
    }
}

pub(crate) struct Joystick {
    descriptor: JoystickDescriptor,
    /// Cleared when a poll finds the device gone, ahead of the disconnect
    /// event.
    connected: bool,
    input: JoystickInput,
    /// Raw buttons followed by four buttons per hat, if enabled.
    buttons: Vec<ButtonState>,
    /// Index into the mapping table.
    mapping: Option<usize>,
    user_data: Option<Box<dyn Any>>,
}

impl Joystick {
    fn new(mut descriptor: JoystickDescriptor) -> Self {
        descriptor.guid.make_ascii_lowercase();

        let input = JoystickInput {
            axes: vec![0.0; descriptor.axis_count],
            buttons: vec![false; descriptor.button_count],
            hats: vec![Hat::empty(); descriptor.hat_count],
        };

        Self {
            descriptor,
            connected: true,
            input,
            buttons: Vec::new(),
            mapping: None,
            user_data: None,
        }
    }

    fn update_buttons(&mut self, hat_buttons: bool) {
        let state = |down: bool| {
            if down {
                ButtonState::Pressed
            } else {
                ButtonState::Released
            }
        };

        self.buttons.clear();
        self.buttons
            .extend(self.input.buttons.iter().map(|down| state(*down)));

        if hat_buttons {
            for hat in &self.input.hats {
                for direction in [Hat::UP, Hat::RIGHT, Hat::DOWN, Hat::LEFT] {
                    self.buttons.push(state(hat.contains(direction)));
                }
            }
        }
    }
}

fn check_slot(slot: usize) -> Result<()> {
    if slot >= MAX_JOYSTICKS {
        return Err(raise(
            ErrorCode::InvalidEnum,
            format!("invalid joystick slot {slot}"),
        ));
    }

    Ok(())
}

impl Library {
    /// Reads fresh state from the platform. Returns false if no joystick is
    /// connected in the slot.
    fn poll_joystick(&mut self, slot: usize) -> Result<bool> {
        check_slot(slot)?;
        self.require_init()?;

        let Some(joystick) = self.joysticks[slot].as_mut().filter(|j| j.connected) else {
            return Ok(false);
        };

        if !self.platform.poll_joystick(slot, &mut joystick.input) {
            joystick.connected = false;
            return Ok(false);
        }

        joystick.update_buttons(self.hints.joystick_hat_buttons);
        Ok(true)
    }

    fn connected_joystick(&self, slot: usize) -> Result<Option<&Joystick>> {
        check_slot(slot)?;
        self.require_init()?;
        Ok(self.joysticks[slot].as_ref().filter(|j| j.connected))
    }

    pub fn joystick_present(&mut self, slot: usize) -> Result<bool> {
        self.poll_joystick(slot)
    }

    /// Axis values in the range -1.0..=1.0. The slice stays valid until the
    /// library is next used.
    pub fn joystick_axes(&mut self, slot: usize) -> Result<Option<&[f32]>> {
        if !self.poll_joystick(slot)? {
            return Ok(None);
        }

        Ok(self.joysticks[slot].as_ref().map(|j| j.input.axes.as_slice()))
    }

    /// Button states, followed by four buttons per hat (up, right, down,
    /// left) unless the `JoystickHatButtons` init hint was disabled.
    pub fn joystick_buttons(&mut self, slot: usize) -> Result<Option<&[ButtonState]>> {
        if !self.poll_joystick(slot)? {
            return Ok(None);
        }

        Ok(self.joysticks[slot].as_ref().map(|j| j.buttons.as_slice()))
    }

    pub fn joystick_hats(&mut self, slot: usize) -> Result<Option<&[Hat]>> {
        if !self.poll_joystick(slot)? {
            return Ok(None);
        }

        Ok(self.joysticks[slot].as_ref().map(|j| j.input.hats.as_slice()))
    }

    pub fn joystick_name(&self, slot: usize) -> Result<Option<&str>> {
        Ok(self
            .connected_joystick(slot)?
            .map(|j| j.descriptor.name.as_str()))
    }

    /// The SDL-compatible GUID of the device, in lower case.
    pub fn joystick_guid(&self, slot: usize) -> Result<Option<&str>> {
        Ok(self
            .connected_joystick(slot)?
            .map(|j| j.descriptor.guid.as_str()))
    }

    pub fn joystick_user_data(&self, slot: usize) -> Result<Option<&dyn Any>> {
        Ok(self
            .connected_joystick(slot)?
            .and_then(|j| j.user_data.as_deref()))
    }

    /// Replaces the joystick's user data, returning the previous value. Does
    /// nothing if no joystick is connected in the slot.
    pub fn set_joystick_user_data(
        &mut self,
        slot: usize,
        data: Option<Box<dyn Any>>,
    ) -> Result<Option<Box<dyn Any>>> {
        check_slot(slot)?;
        self.require_init()?;

        Ok(match self.joysticks[slot].as_mut().filter(|j| j.connected) {
            Some(joystick) => std::mem::replace(&mut joystick.user_data, data),
            None => None,
        })
    }

    /// Whether the joystick has a gamepad mapping. Unmapped or absent
    /// joysticks are not gamepads; this is not an error.
    pub fn joystick_is_gamepad(&self, slot: usize) -> Result<bool> {
        Ok(self
            .connected_joystick(slot)?
            .map_or(false, |j| j.mapping.is_some()))
    }

    /// The name from the joystick's gamepad mapping.
    pub fn gamepad_name(&self, slot: usize) -> Result<Option<&str>> {
        let mapping = self
            .connected_joystick(slot)?
            .and_then(|j| j.mapping)
            .and_then(|index| self.mappings.get(index));

        Ok(mapping.map(|m| m.name.as_str()))
    }

    /// The joystick's state projected through its gamepad mapping, or `None`
    /// if it is absent or not a gamepad.
    pub fn gamepad_state(&mut self, slot: usize) -> Result<Option<GamepadState>> {
        if !self.poll_joystick(slot)? {
            return Ok(None);
        }

        let Some(joystick) = self.joysticks[slot].as_ref() else {
            return Ok(None);
        };

        let mapping = joystick.mapping.and_then(|index| self.mappings.get(index));
        Ok(mapping.map(|m| m.project(&joystick.input)))
    }

    /// Adds mappings in SDL_GameControllerDB format. Entries for a GUID that
    /// is already known replace the old entry. Connected joysticks pick up
    /// new mappings immediately.
    pub fn update_gamepad_mappings(&mut self, text: &str) -> Result<()> {
        self.require_init()?;

        let platform = self.platform.mapping_name().to_owned();
        mapping::merge(&mut self.mappings, mapping::parse_database(text, &platform));

        for slot in 0..MAX_JOYSTICKS {
            self.attach_mapping(slot);
        }

        Ok(())
    }

    /// Finds the mapping for the joystick in `slot`. A mapping that refers to
    /// controls the device does not have is reported and left unattached.
    fn attach_mapping(&mut self, slot: usize) {
        let Some(joystick) = self.joysticks[slot].as_mut() else {
            return;
        };

        joystick.mapping = None;

        let found = self
            .mappings
            .iter()
            .enumerate()
            .find(|(_, m)| m.guid == joystick.descriptor.guid);

        let Some((index, mapping)) = found else {
            return;
        };

        match mapping.check(&joystick.descriptor) {
            Ok(()) => joystick.mapping = Some(index),
            Err(reason) => {
                let _ = raise(
                    ErrorCode::InvalidValue,
                    format!(
                        "mapping \"{}\" does not fit joystick {slot}: {reason}",
                        mapping.name
                    ),
                );
            }
        }
    }

    /// Rebuilds the built-in mapping table.
    pub(crate) fn reset_mappings(&mut self) {
        self.mappings = mapping::defaults(self.platform.mapping_name());
    }

    /// Picks up joysticks that were connected before initialization.
    pub(crate) fn populate_joysticks(&mut self) {
        for slot in 0..MAX_JOYSTICKS {
            if let Some(descriptor) = self.platform.joystick(slot) {
                self.insert_joystick(slot, descriptor);
            }
        }
    }

    fn insert_joystick(&mut self, slot: usize, descriptor: JoystickDescriptor) {
        log::info!(
            "joystick {slot} connected: \"{}\" ({})",
            descriptor.name,
            descriptor.guid
        );

        let mut joystick = Joystick::new(descriptor);
        joystick.update_buttons(self.hints.joystick_hat_buttons);
        self.joysticks[slot] = Some(joystick);
        self.attach_mapping(slot);
    }

    pub(crate) fn joystick_connected(&mut self, slot: usize, descriptor: JoystickDescriptor) {
        if slot >= MAX_JOYSTICKS {
            log::warn!("ignoring joystick in slot {slot}");
            return;
        }

        self.insert_joystick(slot, descriptor);
        self.emit_joystick(slot, JoystickEvent::Connected);
    }

    pub(crate) fn joystick_disconnected(&mut self, slot: usize) {
        if slot >= MAX_JOYSTICKS || self.joysticks[slot].is_none() {
            return;
        }

        log::info!("joystick {slot} disconnected");
        // Still queryable, as absent, from inside the callback.
        if let Some(joystick) = self.joysticks[slot].as_mut() {
            joystick.connected = false;
        }

        self.emit_joystick(slot, JoystickEvent::Disconnected);
        self.joysticks[slot] = None;
    }

    pub(crate) fn clear_joysticks(&mut self) {
        self.joysticks = Default::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::{cell::RefCell, rc::Rc};

    use crate::{
        error::last_error,
        hints::InitHint,
        platform::null::{NullController, NullPlatform},
    };

    const GUID: &str = "030000005E0400008E02000014010000";

    fn descriptor() -> JoystickDescriptor {
        JoystickDescriptor {
            name: "Test Stick".to_owned(),
            guid: GUID.to_owned(),
            axis_count: 2,
            button_count: 3,
            hat_count: 1,
        }
    }

    fn library() -> (Library, NullController) {
        let (platform, controller) = NullPlatform::new();
        let mut lib = Library::new(platform);
        lib.init().unwrap();
        (lib, controller)
    }

    #[test]
    fn raw_state_without_event_processing() {
        let (platform, controller) = NullPlatform::new();
        controller.connect_joystick(2, descriptor());
        controller.set_joystick_input(
            2,
            JoystickInput {
                axes: vec![0.5, -1.0],
                buttons: vec![true, false, false],
                hats: vec![Hat::UP | Hat::RIGHT],
            },
        );

        let mut lib = Library::new(platform);
        lib.init().unwrap();

        assert!(lib.joystick_present(2).unwrap());
        assert!(!lib.joystick_present(3).unwrap());
        assert_eq!(lib.joystick_guid(2).unwrap(), Some(GUID.to_ascii_lowercase().as_str()));
        assert_eq!(lib.joystick_axes(2).unwrap(), Some(&[0.5, -1.0][..]));
        assert_eq!(lib.joystick_hats(2).unwrap(), Some(&[Hat::UP | Hat::RIGHT][..]));

        use ButtonState::{Pressed as P, Released as R};
        assert_eq!(
            lib.joystick_buttons(2).unwrap(),
            Some(&[P, R, R, P, P, R, R][..])
        );

        let err = lib.joystick_present(MAX_JOYSTICKS).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidEnum);
    }

    #[test]
    fn hat_buttons_can_be_disabled() {
        let (platform, controller) = NullPlatform::new();
        controller.connect_joystick(0, descriptor());

        let mut lib = Library::new(platform);
        lib.set_init_hint(InitHint::JoystickHatButtons(false));
        lib.init().unwrap();

        assert_eq!(lib.joystick_buttons(0).unwrap().map(<[_]>::len), Some(3));
    }

    #[test]
    fn hot_plug_callbacks() {
        let (mut lib, controller) = library();

        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        lib.set_joystick_callback(Some(Box::new(
            move |lib: &mut Library, slot: usize, event: JoystickEvent| {
                let present = lib.joystick_present(slot).unwrap();
                sink.borrow_mut().push((slot, event, present));
            },
        )))
        .unwrap();

        controller.connect_joystick(5, descriptor());
        // Raw state is there, but the callback waits for event processing.
        assert!(seen.borrow().is_empty());
        lib.poll_events().unwrap();

        controller.disconnect_joystick(5);
        // The platform notices on the next poll.
        assert!(!lib.joystick_present(5).unwrap());
        lib.poll_events().unwrap();

        assert_eq!(
            *seen.borrow(),
            vec![
                (5, JoystickEvent::Connected, true),
                (5, JoystickEvent::Disconnected, false),
            ]
        );
        assert_eq!(lib.joystick_name(5).unwrap(), None);
    }

    #[test]
    fn gamepad_mapping_lifecycle() {
        let (mut lib, controller) = library();
        controller.connect_joystick(0, descriptor());
        lib.poll_events().unwrap();

        // The built-in table has no entries for the null platform.
        assert!(!lib.joystick_is_gamepad(0).unwrap());
        assert_eq!(lib.gamepad_state(0).unwrap(), None);

        lib.update_gamepad_mappings(&format!(
            "# test mappings\n{GUID},Mapped Stick,a:b1,leftx:a0,dpright:h0.2,platform:Null,\n"
        ))
        .unwrap();

        assert!(lib.joystick_is_gamepad(0).unwrap());
        assert_eq!(lib.gamepad_name(0).unwrap(), Some("Mapped Stick"));

        controller.set_joystick_input(
            0,
            JoystickInput {
                axes: vec![-0.25, 0.0],
                buttons: vec![false, true, false],
                hats: vec![Hat::RIGHT],
            },
        );

        let state = lib.gamepad_state(0).unwrap().unwrap();
        assert_eq!(state.button(GamepadButton::A), ButtonState::Pressed);
        assert_eq!(state.button(GamepadButton::DpadRight), ButtonState::Pressed);
        assert_eq!(state.button(GamepadButton::B), ButtonState::Released);
        assert_eq!(state.axis(GamepadAxis::LeftX), -0.25);

        // Same GUID, new name.
        lib.update_gamepad_mappings(&format!("{GUID},Renamed,a:b0,\n"))
            .unwrap();
        assert_eq!(lib.gamepad_name(0).unwrap(), Some("Renamed"));

        // Terminate drops user mappings.
        lib.terminate();
        lib.init().unwrap();
        controller.connect_joystick(0, descriptor());
        lib.poll_events().unwrap();
        assert!(!lib.joystick_is_gamepad(0).unwrap());
    }

    #[test]
    fn mapping_beyond_device_is_rejected() {
        let (mut lib, controller) = library();
        controller.connect_joystick(1, descriptor());
        lib.poll_events().unwrap();
        last_error();

        lib.update_gamepad_mappings(&format!("{GUID},Too Big,a:b7,\n"))
            .unwrap();

        assert!(!lib.joystick_is_gamepad(1).unwrap());
        assert_eq!(last_error().map(|e| e.code()), Some(ErrorCode::InvalidValue));
    }

    #[test]
    fn user_data_follows_connection() {
        let (mut lib, controller) = library();

        assert!(lib.set_joystick_user_data(0, Some(Box::new(1u32))).unwrap().is_none());
        assert!(lib.joystick_user_data(0).unwrap().is_none());

        controller.connect_joystick(0, descriptor());
        lib.poll_events().unwrap();
        lib.set_joystick_user_data(0, Some(Box::new(7u32))).unwrap();

        let data = lib.joystick_user_data(0).unwrap().unwrap();
        assert_eq!(data.downcast_ref::<u32>(), Some(&7));
    }
}
