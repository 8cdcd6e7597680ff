//! Platform-independent windowing, input and context management.
//!
//! A [`Library`] wraps one [`Platform`] backend and tracks everything the
//! application creates through it: windows with their input state and
//! callbacks, monitors and their video modes, cursors, rendering contexts,
//! and joysticks with their gamepad mappings. Backends only translate native
//! notifications into [`PlatformEvent`]s; every rule about how those events
//! change state and which callbacks run lives here, so all backends behave
//! the same.
//!
//! ```no_run
//! use geometry::Extent;
//! use grwl::{platform::null::NullPlatform, Library, WindowHints};
//!
//! let (platform, _controller) = NullPlatform::new();
//! let mut lib = Library::new(platform);
//! lib.init()?;
//!
//! let window = lib.create_window(Extent::new(640, 480), "grwl", None, &WindowHints::no_api())?;
//! while !lib.window_should_close(window)? {
//!     lib.wait_events()?;
//! }
//! # Ok::<(), grwl::Error>(())
//! ```

pub mod callbacks;
pub mod context;
pub mod cursor;
pub mod error;
mod event;
pub mod hints;
pub mod image;
pub mod input;
pub mod joystick;
mod library;
mod mapping;
pub mod monitor;
pub mod platform;
mod time;
pub mod window;

pub use callbacks::{KeyEvent, MouseButtonEvent};
pub use context::{ClientApi, Context, ContextConfig, OpenGlProfile};
pub use cursor::{CursorId, CursorShape};
pub use error::{last_error, set_error_callback, Error, ErrorCallback, ErrorCode, Result};
pub use hints::{FramebufferConfig, InitHint, PlatformSelection, WindowHints};
pub use image::Image;
pub use input::{ButtonState, CursorMode, Key, Modifiers, MouseButton};
pub use joystick::{GamepadAxis, GamepadButton, GamepadState, Hat, JoystickEvent, MAX_JOYSTICKS};
pub use library::Library;
pub use monitor::{GammaRamp, MonitorEvent, MonitorId, VideoMode};
pub use platform::{Platform, PlatformEvent, PlatformKind, Waker};
pub use time::{Timer, MAX_TIME};
pub use window::{CloseFlag, WindowAttrib, WindowFlags, WindowId};
