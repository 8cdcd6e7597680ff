//! Initialization and window-creation hints.

use geometry::{Point, ScreenPx};

use crate::{
    context::{ClientApi, ContextConfig},
    platform::PlatformKind,
    window::{WindowFlags, WindowId},
};

/// Which backend `init` is allowed to bring up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlatformSelection {
    /// Accept whichever backend the library was constructed with.
    Any,
    /// Fail initialization with `PlatformUnavailable` unless the backend is of
    /// the given kind.
    Only(PlatformKind),
}

/// Hints consulted once by `init`. Changing them afterwards has no effect
/// until the library has been terminated and initialized again.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InitHints {
    pub platform: PlatformSelection,

    /// Whether joystick hats are also exposed as buttons, four per hat, after
    /// the regular buttons. Defaults to `true`.
    pub joystick_hat_buttons: bool,
}

impl Default for InitHints {
    fn default() -> Self {
        Self {
            platform: PlatformSelection::Any,
            joystick_hat_buttons: true,
        }
    }
}

/// A single initialization hint, see [`crate::Library::set_init_hint`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InitHint {
    Platform(PlatformSelection),
    JoystickHatButtons(bool),
}

impl InitHints {
    pub(crate) fn apply(&mut self, hint: InitHint) {
        match hint {
            InitHint::Platform(selection) => self.platform = selection,
            InitHint::JoystickHatButtons(value) => self.joystick_hat_buttons = value,
        }
    }
}

/// Requested properties of the default framebuffer. `None` means "don't
/// care".
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FramebufferConfig {
    pub red_bits: Option<u8>,
    pub green_bits: Option<u8>,
    pub blue_bits: Option<u8>,
    pub alpha_bits: Option<u8>,
    pub depth_bits: Option<u8>,
    pub stencil_bits: Option<u8>,
    pub samples: Option<u8>,
    pub stereo: bool,
    pub srgb: bool,
    pub double_buffer: bool,
}

impl Default for FramebufferConfig {
    fn default() -> Self {
        Self {
            red_bits: Some(8),
            green_bits: Some(8),
            blue_bits: Some(8),
            alpha_bits: Some(8),
            depth_bits: Some(24),
            stencil_bits: Some(8),
            samples: None,
            stereo: false,
            srgb: false,
            double_buffer: true,
        }
    }
}

/// Everything `create_window` needs besides the size, title and monitor.
#[derive(Clone, Debug)]
pub struct WindowHints {
    pub flags: WindowFlags,

    /// Initial position of the content area. Ignored for fullscreen windows.
    /// `None` lets the window system decide.
    pub position: Option<Point<i32, ScreenPx>>,

    /// Desired refresh rate for fullscreen windows. `None` picks the highest
    /// available rate.
    pub refresh_rate: Option<u32>,

    pub framebuffer: FramebufferConfig,
    pub context: ContextConfig,

    /// Window whose context shares objects with the new window's context.
    pub share: Option<WindowId>,
}

impl Default for WindowHints {
    fn default() -> Self {
        Self {
            flags: WindowFlags::default(),
            position: None,
            refresh_rate: None,
            framebuffer: FramebufferConfig::default(),
            context: ContextConfig::default(),
            share: None,
        }
    }
}

impl WindowHints {
    /// Default hints for a window without a rendering context.
    #[must_use]
    pub fn no_api() -> Self {
        Self {
            context: ContextConfig {
                client_api: ClientApi::NoApi,
                ..ContextConfig::default()
            },
            ..Self::default()
        }
    }
}
