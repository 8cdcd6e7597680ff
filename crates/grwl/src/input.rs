//! Keyboard and mouse vocabulary, and the per-window input state that the
//! dispatcher keeps up to date.

use geometry::{Offset, Point, ScreenPx};
use smallvec::SmallVec;

use crate::{
    error::{raise, report, ErrorCode, Result},
    window::WindowId,
    Library,
};

/// Mouse buttons (e.g. left, right, middle, etc.)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    /// Additional buttons, numbered from 3. Buttons beyond
    /// [`MouseButton::COUNT`] are not tracked.
    Other(u8),
}

impl MouseButton {
    pub const COUNT: usize = 8;

    /// The zero-based index of the button: left is 0, right is 1, middle is 2.
    #[must_use]
    pub fn index(self) -> Option<usize> {
        let index = match self {
            Self::Left => 0,
            Self::Right => 1,
            Self::Middle => 2,
            Self::Other(n) if n >= 3 => n as usize,
            Self::Other(_) => return None,
        };

        (index < Self::COUNT).then_some(index)
    }

    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::Left),
            1 => Some(Self::Right),
            2 => Some(Self::Middle),
            #[allow(clippy::cast_possible_truncation)]
            n if n < Self::COUNT => Some(Self::Other(n as u8)),
            _ => None,
        }
    }
}

/// The state of a button or key (e.g. pressed, released, repeated)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ButtonState {
    Pressed,
    Released,
    /// The number of 'repeat' cycles a key has been held for. The frequency of
    /// these cycles is operating system dependent and may be changed by the
    /// user.
    Repeated(u16),
}

impl ButtonState {
    /// True for both presses and repeats.
    #[must_use]
    pub fn is_down(self) -> bool {
        !matches!(self, Self::Released)
    }
}

bitflags::bitflags! {
    /// Modifier keys held down when an input event was generated.
    pub struct Modifiers: u8 {
        const SHIFT = 0x01;
        const CONTROL = 0x02;
        const ALT = 0x04;
        const SUPER = 0x08;
        /// Only reported while the lock-key-mods input mode is enabled.
        const CAPS_LOCK = 0x10;
        /// Only reported while the lock-key-mods input mode is enabled.
        const NUM_LOCK = 0x20;
    }
}

/// How the cursor behaves over a window's content area.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CursorMode {
    Normal,
    /// Invisible over the content area, otherwise unrestricted.
    Hidden,
    /// Invisible and locked to the window. Reported positions are virtual and
    /// unbounded, suitable for camera controls.
    Disabled,
    /// Visible but confined to the content area.
    Captured,
}

macro_rules! keys {
    ($($(#[$meta:meta])* $name:ident,)*) => {
        /// A physical key, named after its position on a US keyboard. Key
        /// tokens do not depend on the active keyboard layout.
        #[repr(u8)]
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        pub enum Key {
            /// A key the platform could not identify. Such keys still reach the
            /// key callback, with their scancode, but have no queryable state.
            Unknown,
            $($(#[$meta])* $name,)*
        }

        impl Key {
            /// Every identifiable key, in index order.
            pub const ALL: &'static [Key] = &[$(Key::$name,)*];
        }
    };
}

keys! {
    Space,
    /// For the US standard keyboard, the 'single-quote/double-quote' key.
    Apostrophe,
    /// For any country/region, the ',<' key.
    Comma,
    /// For any country/region, the '-_' key.
    Minus,
    /// For any country/region, the '.>' key.
    Period,
    /// For the US standard keyboard, the '/?' key.
    Slash,
    Key0,
    Key1,
    Key2,
    Key3,
    Key4,
    Key5,
    Key6,
    Key7,
    Key8,
    Key9,
    /// For the US standard keyboard, the ';:' key.
    Semicolon,
    /// For any country/region, the '=+' key.
    Equals,
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
    I,
    J,
    K,
    L,
    M,
    N,
    O,
    P,
    Q,
    R,
    S,
    T,
    U,
    V,
    W,
    X,
    Y,
    Z,
    /// For the US standard keyboard, the '[{' key.
    LBracket,
    /// For the US standard keyboard, the '\\|' key.
    Backslash,
    /// For the US standard keyboard, the ']}' key.
    RBracket,
    /// For the US standard keyboard, the '`~' key.
    Grave,
    /// Non-US key #1.
    World1,
    /// Non-US key #2.
    World2,
    Escape,
    Enter,
    Tab,
    Backspace,
    Insert,
    Delete,
    Right,
    Left,
    Down,
    Up,
    PageUp,
    PageDown,
    Home,
    End,
    CapsLock,
    ScrollLock,
    NumLock,
    PrintScreen,
    Pause,
    F1,
    F2,
    F3,
    F4,
    F5,
    F6,
    F7,
    F8,
    F9,
    F10,
    F11,
    F12,
    F13,
    F14,
    F15,
    F16,
    F17,
    F18,
    F19,
    F20,
    F21,
    F22,
    F23,
    F24,
    F25,
    Keypad0,
    Keypad1,
    Keypad2,
    Keypad3,
    Keypad4,
    Keypad5,
    Keypad6,
    Keypad7,
    Keypad8,
    Keypad9,
    KeypadDecimal,
    KeypadDivide,
    KeypadMultiply,
    KeypadSubtract,
    KeypadAdd,
    KeypadEnter,
    KeypadEqual,
    LShift,
    LControl,
    LAlt,
    LSuper,
    RShift,
    RControl,
    RAlt,
    RSuper,
    Menu,
}

impl Key {
    pub const COUNT: usize = Self::ALL.len();

    /// Index into per-key state tables. `None` for [`Key::Unknown`].
    #[must_use]
    pub fn index(self) -> Option<usize> {
        (self as usize).checked_sub(1)
    }
}

/// A key or button's last reported state, with the sticky latch folded in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Latch {
    Released,
    Pressed,
    /// Released, but not yet observed as pressed by a state query.
    Sticky,
}

/// Drops control characters (C0 and C1) that some platforms deliver as text.
pub(crate) fn is_printable(codepoint: char) -> bool {
    let cp = u32::from(codepoint);
    !(cp < 32 || (cp > 126 && cp < 160))
}

/// Input state kept per window.
pub(crate) struct InputState {
    keys: [Latch; Key::COUNT],
    repeats: [u16; Key::COUNT],
    buttons: [Latch; MouseButton::COUNT],

    pub cursor_mode: CursorMode,
    pub sticky_keys: bool,
    pub sticky_buttons: bool,
    pub lock_key_mods: bool,
    pub raw_mouse_motion: bool,

    /// The last reported cursor position. Unbounded while the cursor is
    /// disabled.
    pub cursor: Point<f64, ScreenPx>,
    /// Where the cursor was when it was disabled, to put it back on release.
    pub restore_cursor: Point<f64, ScreenPx>,
    /// The last native position seen while disabled, used to turn native
    /// positions into deltas.
    pub native_anchor: Option<Point<f64, ScreenPx>>,

    /// Scroll accumulated since the last event processing call.
    pub scroll: Offset<f64, ScreenPx>,
    pub entered: bool,
}

impl Default for InputState {
    fn default() -> Self {
        Self {
            keys: [Latch::Released; Key::COUNT],
            repeats: [0; Key::COUNT],
            buttons: [Latch::Released; MouseButton::COUNT],
            cursor_mode: CursorMode::Normal,
            sticky_keys: false,
            sticky_buttons: false,
            lock_key_mods: false,
            raw_mouse_motion: false,
            cursor: Point::origin(),
            restore_cursor: Point::origin(),
            native_anchor: None,
            scroll: Offset::zero(),
            entered: false,
        }
    }
}

impl InputState {
    /// Folds a raw key transition into the state table.
    ///
    /// ## Returns
    ///
    /// The action to report to the key callback, or `None` if the event is a
    /// release of a key that was never reported as pressed.
    pub fn record_key(&mut self, key: Key, action: ButtonState) -> Option<ButtonState> {
        let Some(index) = key.index() else {
            return Some(action);
        };

        if action == ButtonState::Released {
            if self.keys[index] == Latch::Released {
                return None;
            }

            self.keys[index] = if self.sticky_keys {
                Latch::Sticky
            } else {
                Latch::Released
            };
            self.repeats[index] = 0;
            return Some(ButtonState::Released);
        }

        if self.keys[index] == Latch::Pressed {
            self.repeats[index] = self.repeats[index].saturating_add(1);
            Some(ButtonState::Repeated(self.repeats[index]))
        } else {
            self.keys[index] = Latch::Pressed;
            self.repeats[index] = 0;
            Some(ButtonState::Pressed)
        }
    }

    pub fn record_button(&mut self, index: usize, action: ButtonState) {
        self.buttons[index] = match action {
            ButtonState::Released if self.sticky_buttons => Latch::Sticky,
            ButtonState::Released => Latch::Released,
            _ => Latch::Pressed,
        };
    }

    /// Queries a key, consuming its sticky latch.
    pub fn key(&mut self, index: usize) -> ButtonState {
        Self::query(&mut self.keys[index])
    }

    /// Queries a mouse button, consuming its sticky latch.
    pub fn button(&mut self, index: usize) -> ButtonState {
        Self::query(&mut self.buttons[index])
    }

    fn query(latch: &mut Latch) -> ButtonState {
        match *latch {
            Latch::Pressed => ButtonState::Pressed,
            Latch::Released => ButtonState::Released,
            Latch::Sticky => {
                *latch = Latch::Released;
                ButtonState::Pressed
            }
        }
    }

    pub fn set_sticky_keys(&mut self, enabled: bool) {
        if !enabled {
            Self::release_latches(&mut self.keys);
        }
        self.sticky_keys = enabled;
    }

    pub fn set_sticky_buttons(&mut self, enabled: bool) {
        if !enabled {
            Self::release_latches(&mut self.buttons);
        }
        self.sticky_buttons = enabled;
    }

    fn release_latches(latches: &mut [Latch]) {
        for latch in latches.iter_mut().filter(|l| **l == Latch::Sticky) {
            *latch = Latch::Released;
        }
    }

    /// Snapshot of the keys whose last reported state is pressed.
    pub fn pressed_keys(&self) -> SmallVec<[Key; 8]> {
        Key::ALL
            .iter()
            .zip(self.keys.iter())
            .filter(|(_, latch)| **latch == Latch::Pressed)
            .map(|(key, _)| *key)
            .collect()
    }

    /// Snapshot of the mouse buttons whose last reported state is pressed.
    pub fn pressed_buttons(&self) -> SmallVec<[MouseButton; 4]> {
        self.buttons
            .iter()
            .enumerate()
            .filter(|(_, latch)| **latch == Latch::Pressed)
            .filter_map(|(index, _)| MouseButton::from_index(index))
            .collect()
    }

    /// Strips lock-key bits unless the window asked for them.
    pub fn filter_mods(&self, mods: Modifiers) -> Modifiers {
        if self.lock_key_mods {
            mods
        } else {
            mods - (Modifiers::CAPS_LOCK | Modifiers::NUM_LOCK)
        }
    }
}

impl Library {
    /// The last reported state of a key. With sticky keys enabled, a key
    /// released since the last query still reports
    /// [`ButtonState::Pressed`] once.
    pub fn key(&mut self, window: WindowId, key: Key) -> Result<ButtonState> {
        let Some(index) = key.index() else {
            return Err(raise(ErrorCode::InvalidEnum, "cannot query Key::Unknown"));
        };

        Ok(self.window_mut(window)?.input.key(index))
    }

    /// The last reported state of a mouse button, with the same sticky
    /// behavior as [`Library::key`].
    pub fn mouse_button(&mut self, window: WindowId, button: MouseButton) -> Result<ButtonState> {
        let Some(index) = button.index() else {
            return Err(raise(
                ErrorCode::InvalidEnum,
                format!("invalid mouse button {button:?}"),
            ));
        };

        Ok(self.window_mut(window)?.input.button(index))
    }

    /// The cursor position relative to the content area. While the cursor is
    /// disabled this is the unbounded virtual position.
    pub fn cursor_pos(&self, window: WindowId) -> Result<Point<f64, ScreenPx>> {
        let state = self.window(window)?;

        if state.input.cursor_mode == CursorMode::Disabled {
            Ok(state.input.cursor)
        } else {
            Ok(self.platform.cursor_pos(window))
        }
    }

    pub fn set_cursor_pos(&mut self, window: WindowId, position: Point<f64, ScreenPx>) -> Result<()> {
        if !position.x.is_finite() || !position.y.is_finite() {
            return Err(raise(
                ErrorCode::InvalidValue,
                format!("invalid cursor position {position:?}"),
            ));
        }

        let state = self.window_mut(window)?;
        if state.input.cursor_mode == CursorMode::Disabled {
            state.input.cursor = position;
        } else {
            self.platform.set_cursor_pos(window, position);
        }

        Ok(())
    }

    pub fn cursor_mode(&self, window: WindowId) -> Result<CursorMode> {
        Ok(self.window(window)?.input.cursor_mode)
    }

    /// Changes how the cursor behaves over the window. Disabling the cursor
    /// hides it and switches to unbounded virtual motion; leaving disabled
    /// mode puts the cursor back where it was.
    pub fn set_cursor_mode(&mut self, window: WindowId, mode: CursorMode) -> Result<()> {
        let state = self.window(window)?;
        let previous = state.input.cursor_mode;
        if previous == mode {
            return Ok(());
        }

        let cursor = state.input.cursor;
        let restore = state.input.restore_cursor;

        if mode == CursorMode::Disabled {
            let size = self.platform.window_size(window);
            let center = Point::new(f64::from(size.width) / 2.0, f64::from(size.height) / 2.0);
            self.platform.set_cursor_mode(window, mode);
            self.platform.set_cursor_pos(window, center);

            let input = &mut self.window_mut(window)?.input;
            input.restore_cursor = cursor;
            input.native_anchor = Some(center);
        } else {
            self.platform.set_cursor_mode(window, mode);

            if previous == CursorMode::Disabled {
                self.platform.set_cursor_pos(window, restore);
                let input = &mut self.window_mut(window)?.input;
                input.native_anchor = None;
                input.cursor = restore;
            }
        }

        self.window_mut(window)?.input.cursor_mode = mode;
        log::debug!("cursor mode of {window:?} is now {mode:?}");
        Ok(())
    }

    pub fn sticky_keys(&self, window: WindowId) -> Result<bool> {
        Ok(self.window(window)?.input.sticky_keys)
    }

    /// Enables or disables sticky keys. Disabling forgets presses that have
    /// not been queried yet.
    pub fn set_sticky_keys(&mut self, window: WindowId, enabled: bool) -> Result<()> {
        self.window_mut(window)?.input.set_sticky_keys(enabled);
        Ok(())
    }

    pub fn sticky_mouse_buttons(&self, window: WindowId) -> Result<bool> {
        Ok(self.window(window)?.input.sticky_buttons)
    }

    pub fn set_sticky_mouse_buttons(&mut self, window: WindowId, enabled: bool) -> Result<()> {
        self.window_mut(window)?.input.set_sticky_buttons(enabled);
        Ok(())
    }

    pub fn lock_key_mods(&self, window: WindowId) -> Result<bool> {
        Ok(self.window(window)?.input.lock_key_mods)
    }

    /// Whether key and mouse button events report caps lock and num lock.
    pub fn set_lock_key_mods(&mut self, window: WindowId, enabled: bool) -> Result<()> {
        self.window_mut(window)?.input.lock_key_mods = enabled;
        Ok(())
    }

    pub fn raw_mouse_motion_supported(&self) -> Result<bool> {
        self.require_init()?;
        Ok(self.platform.raw_mouse_motion_supported())
    }

    pub fn raw_mouse_motion(&self, window: WindowId) -> Result<bool> {
        Ok(self.window(window)?.input.raw_mouse_motion)
    }

    /// Uses unaccelerated motion while the cursor is disabled.
    pub fn set_raw_mouse_motion(&mut self, window: WindowId, enabled: bool) -> Result<()> {
        self.window(window)?;

        if !self.platform.raw_mouse_motion_supported() {
            return Err(raise(
                ErrorCode::PlatformError,
                "raw mouse motion is not supported on this system",
            ));
        }

        let input = &mut self.window_mut(window)?.input;
        if input.raw_mouse_motion == enabled {
            return Ok(());
        }

        input.raw_mouse_motion = enabled;
        self.platform.set_raw_mouse_motion(window, enabled);
        Ok(())
    }

    /// Scroll accumulated during the last event processing call.
    pub fn scroll_offset(&self, window: WindowId) -> Result<Offset<f64, ScreenPx>> {
        Ok(self.window(window)?.input.scroll)
    }

    /// The layout-dependent name of a printable key, or of `scancode` if
    /// `key` is [`Key::Unknown`]. Non-printable keys have no name.
    pub fn key_name(&self, key: Key, scancode: i32) -> Result<Option<String>> {
        self.require_init()?;

        let scancode = if key == Key::Unknown {
            scancode
        } else {
            match self.platform.key_scancode(key) {
                Some(scancode) => scancode,
                None => return Ok(None),
            }
        };

        Ok(self
            .platform
            .key_name(key, scancode)
            .filter(|name| name.chars().all(is_printable)))
    }

    /// The platform scancode of a key, if the keyboard has it.
    pub fn key_scancode(&self, key: Key) -> Result<Option<i32>> {
        self.require_init()?;

        if key == Key::Unknown {
            return Err(raise(ErrorCode::InvalidEnum, "Key::Unknown has no scancode"));
        }

        Ok(self.platform.key_scancode(key))
    }

    pub fn set_clipboard_string(&mut self, text: &str) -> Result<()> {
        self.require_init()?;
        self.platform.set_clipboard_string(text).map_err(report)
    }

    /// The clipboard contents. Fails with [`ErrorCode::FormatUnavailable`] if
    /// the clipboard is empty or holds something other than text.
    pub fn clipboard_string(&mut self) -> Result<String> {
        self.require_init()?;

        let text = self.platform.clipboard_string().map_err(report)?;
        if text.is_empty() {
            return Err(raise(
                ErrorCode::FormatUnavailable,
                "the clipboard does not contain text",
            ));
        }

        Ok(text)
    }
}
