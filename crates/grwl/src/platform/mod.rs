//! The window-system collaborator.
//!
//! A [`Platform`] owns every native object (windows, cursors, monitors,
//! contexts, joysticks) and translates native notifications into
//! [`PlatformEvent`]s. It holds no policy: close flags, input latching, mode
//! transitions and callbacks all live in the core, which tells the platform
//! what to do through this trait.
//!
//! Platforms hand back unreported [`Error`]s; the core reports them once they
//! cross the public API.

pub mod null;

use std::{ffi::c_void, path::PathBuf, sync::Arc, time::Duration};

use geometry::{Extent, Offset, Point, Px, Rect, ScreenPx};
use raw_window_handle::{RawDisplayHandle, RawWindowHandle};

use crate::{
    context::ContextConfig,
    cursor::{CursorId, CursorShape},
    error::{Error, ErrorCode, Result},
    hints::FramebufferConfig,
    image::Image,
    input::{ButtonState, CursorMode, Key, Modifiers, MouseButton},
    joystick::Hat,
    monitor::{GammaRamp, VideoMode},
    window::{FrameSize, WindowFlags, WindowId},
};

/// Identifies a backend implementation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PlatformKind {
    /// The headless backend. Always available.
    Null,
    Win32,
    Cocoa,
    X11,
    Wayland,
}

/// A platform-assigned monitor token. Tokens are stable for as long as the
/// monitor stays connected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NativeMonitor(pub u64);

/// Static properties of a connected monitor, reported on enumeration and
/// hot-plug.
#[derive(Clone, Debug, PartialEq)]
pub struct MonitorDescriptor {
    pub native: NativeMonitor,
    pub name: String,
    /// Physical size of the display area, in millimeters.
    pub physical_size: Extent<i32, Millimeters>,
    pub primary: bool,
}

/// Unit of [`MonitorDescriptor::physical_size`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Millimeters;

/// Static properties of a connected joystick, reported on enumeration and
/// hot-plug.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JoystickDescriptor {
    pub name: String,
    /// SDL-compatible 32 character hexadecimal GUID.
    pub guid: String,
    pub axis_count: usize,
    pub button_count: usize,
    pub hat_count: usize,
}

/// Raw joystick input, sized by the core from the joystick's descriptor.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct JoystickInput {
    pub axes: Vec<f32>,
    pub buttons: Vec<bool>,
    pub hats: Vec<Hat>,
}

/// What the platform needs to create a native window.
#[derive(Clone, Debug)]
pub struct NativeWindowConfig<'a> {
    pub title: &'a str,
    pub size: Extent<i32, ScreenPx>,
    pub position: Option<Point<i32, ScreenPx>>,
    pub flags: WindowFlags,
    /// Set for fullscreen windows; the core has already switched the monitor
    /// to the chosen video mode.
    pub monitor: Option<NativeMonitor>,
    pub framebuffer: &'a FramebufferConfig,
}

/// Wakes a thread blocked in [`Platform::wait_events`]. Safe to call from any
/// thread.
#[derive(Clone)]
pub struct Waker(Arc<dyn Fn() + Send + Sync>);

impl Waker {
    pub fn new(wake: impl Fn() + Send + Sync + 'static) -> Self {
        Self(Arc::new(wake))
    }

    pub fn wake(&self) {
        (self.0)();
    }
}

impl std::fmt::Debug for Waker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Waker")
    }
}

/// A raw window-system notification.
#[derive(Clone, Debug, PartialEq)]
pub enum PlatformEvent {
    /// Posted to wake the event loop. Carries no information.
    Empty,
    Key {
        window: WindowId,
        key: Key,
        scancode: i32,
        /// `Repeated` is accepted but the core computes the repeat count.
        action: ButtonState,
        mods: Modifiers,
    },
    Char {
        window: WindowId,
        codepoint: char,
        mods: Modifiers,
        /// False when the platform produced the character while a shortcut
        /// modifier combination was held. Such characters are not text.
        plain: bool,
    },
    MouseButton {
        window: WindowId,
        button: MouseButton,
        action: ButtonState,
        mods: Modifiers,
    },
    /// Absolute cursor position relative to the content area.
    CursorPos {
        window: WindowId,
        position: Point<f64, ScreenPx>,
    },
    /// Unaccelerated relative motion. Only consumed while the cursor is
    /// disabled and raw motion is enabled.
    CursorMotion {
        window: WindowId,
        delta: Offset<f64, ScreenPx>,
    },
    CursorEnter {
        window: WindowId,
        entered: bool,
    },
    Scroll {
        window: WindowId,
        offset: Offset<f64, ScreenPx>,
    },
    Moved {
        window: WindowId,
        position: Point<i32, ScreenPx>,
    },
    Resized {
        window: WindowId,
        size: Extent<i32, ScreenPx>,
    },
    FramebufferResized {
        window: WindowId,
        size: Extent<i32, Px>,
    },
    CloseRequested {
        window: WindowId,
    },
    Refresh {
        window: WindowId,
    },
    Focus {
        window: WindowId,
        focused: bool,
    },
    Iconify {
        window: WindowId,
        iconified: bool,
    },
    Maximize {
        window: WindowId,
        maximized: bool,
    },
    ContentScale {
        window: WindowId,
        scale: (f32, f32),
    },
    Drop {
        window: WindowId,
        paths: Vec<PathBuf>,
    },
    MonitorConnected(MonitorDescriptor),
    MonitorDisconnected(NativeMonitor),
    JoystickConnected {
        slot: usize,
        descriptor: JoystickDescriptor,
    },
    JoystickDisconnected {
        slot: usize,
    },
    KeyboardLayoutChanged,
}

/// Live window state that the core does not mirror.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NativeWindowState {
    pub focused: bool,
    pub iconified: bool,
    pub maximized: bool,
    pub visible: bool,
    /// Whether the cursor is over the content area.
    pub hovered: bool,
}

/// Address of a client API function, null if unavailable.
pub type ProcAddress = *const c_void;

/// A native rendering context.
///
/// Contexts are driven from whatever thread the application renders on, so
/// unlike [`Platform`] they must be thread-safe. The core guarantees that a
/// context is only made current on one thread at a time.
pub trait NativeContext: Send + Sync {
    fn make_current(&self) -> Result<()>;

    fn make_non_current(&self) -> Result<()>;

    fn swap_buffers(&self) -> Result<()>;

    fn swap_interval(&self, interval: i32) -> Result<()>;

    fn extension_supported(&self, extension: &str) -> bool;

    fn proc_address(&self, name: &str) -> ProcAddress;
}

fn unavailable<T>(what: &str) -> Result<T> {
    Err(Error::new(
        ErrorCode::FeatureUnavailable,
        format!("{what} is not supported by this platform"),
    ))
}

/// Window-system backend. Selected once, when the [`crate::Library`] is
/// constructed, and driven from the main thread only.
///
/// Operations the platform cannot perform default to reporting
/// [`ErrorCode::FeatureUnavailable`] or doing nothing.
#[allow(unused_variables)]
pub trait Platform {
    fn kind(&self) -> PlatformKind;

    /// Value matched against the `platform:` field of gamepad mappings.
    fn mapping_name(&self) -> &str;

    fn init(&mut self) -> Result<()>;

    /// Releases all remaining native objects. Called after the core has
    /// destroyed every window and cursor.
    fn terminate(&mut self);

    fn waker(&self) -> Waker;

    /// Appends already-queued events to `events` without blocking.
    fn poll_events(&mut self, events: &mut Vec<PlatformEvent>);

    /// Blocks until at least one event is queued or the timeout elapses, then
    /// behaves as [`Platform::poll_events`]. `None` waits indefinitely.
    fn wait_events(&mut self, timeout: Option<Duration>, events: &mut Vec<PlatformEvent>);

    // Monitors

    fn monitors(&mut self) -> Vec<MonitorDescriptor>;

    fn monitor_position(&self, monitor: NativeMonitor) -> Point<i32, ScreenPx>;

    fn monitor_workarea(&self, monitor: NativeMonitor) -> Rect<i32, ScreenPx>;

    fn monitor_content_scale(&self, monitor: NativeMonitor) -> (f32, f32) {
        (1.0, 1.0)
    }

    /// Supported video modes in any order; the core sorts them.
    fn video_modes(&mut self, monitor: NativeMonitor) -> Vec<VideoMode>;

    fn current_video_mode(&self, monitor: NativeMonitor) -> Option<VideoMode>;

    fn set_video_mode(&mut self, monitor: NativeMonitor, mode: &VideoMode) -> Result<()> {
        unavailable("Video mode switching")
    }

    fn restore_video_mode(&mut self, monitor: NativeMonitor) {}

    fn gamma_ramp(&self, monitor: NativeMonitor) -> Result<GammaRamp> {
        unavailable("Gamma ramp access")
    }

    fn set_gamma_ramp(&mut self, monitor: NativeMonitor, ramp: &GammaRamp) -> Result<()> {
        unavailable("Gamma ramp access")
    }

    // Windows

    /// Checks that a window with the given context and framebuffer could be
    /// created, without creating anything.
    fn check_context_support(
        &self,
        context: &ContextConfig,
        framebuffer: &FramebufferConfig,
    ) -> Result<()>;

    fn create_window(&mut self, window: WindowId, config: &NativeWindowConfig) -> Result<()>;

    fn destroy_window(&mut self, window: WindowId);

    fn set_window_title(&mut self, window: WindowId, title: &str);

    /// An empty slice reverts to the default icon.
    fn set_window_icon(&mut self, window: WindowId, images: &[Image]) -> Result<()> {
        unavailable("Window icons")
    }

    fn window_pos(&self, window: WindowId) -> Point<i32, ScreenPx>;

    fn set_window_pos(&mut self, window: WindowId, position: Point<i32, ScreenPx>) {}

    fn window_size(&self, window: WindowId) -> Extent<i32, ScreenPx>;

    fn set_window_size(&mut self, window: WindowId, size: Extent<i32, ScreenPx>);

    fn set_window_size_limits(
        &mut self,
        window: WindowId,
        min: Option<Extent<i32, ScreenPx>>,
        max: Option<Extent<i32, ScreenPx>>,
    ) {
    }

    fn set_window_aspect_ratio(&mut self, window: WindowId, ratio: Option<(i32, i32)>) {}

    fn framebuffer_size(&self, window: WindowId) -> Extent<i32, Px>;

    fn window_frame_size(&self, window: WindowId) -> FrameSize {
        FrameSize::default()
    }

    fn window_content_scale(&self, window: WindowId) -> (f32, f32) {
        (1.0, 1.0)
    }

    fn window_state(&self, window: WindowId) -> NativeWindowState;

    fn iconify_window(&mut self, window: WindowId);

    fn restore_window(&mut self, window: WindowId);

    fn maximize_window(&mut self, window: WindowId);

    fn show_window(&mut self, window: WindowId);

    fn hide_window(&mut self, window: WindowId);

    fn focus_window(&mut self, window: WindowId);

    fn request_window_attention(&mut self, window: WindowId) {}

    /// Moves the window onto a monitor (fullscreen) or off of it (windowed).
    /// The core has already switched the video mode when entering fullscreen.
    fn set_window_monitor(
        &mut self,
        window: WindowId,
        monitor: Option<NativeMonitor>,
        position: Point<i32, ScreenPx>,
        size: Extent<i32, ScreenPx>,
    );

    /// Applies one of the decoration-related flags. Only called with
    /// `DECORATED`, `RESIZABLE`, `FLOATING` or `MOUSE_PASSTHROUGH`.
    fn set_window_flag(&mut self, window: WindowId, flag: WindowFlags, value: bool) {}

    fn window_opacity(&self, window: WindowId) -> f32 {
        1.0
    }

    fn set_window_opacity(&mut self, window: WindowId, opacity: f32) -> Result<()> {
        unavailable("Window opacity")
    }

    fn window_handle(&self, window: WindowId) -> Result<RawWindowHandle> {
        unavailable("Raw window handles")
    }

    fn display_handle(&self) -> Result<RawDisplayHandle> {
        unavailable("Raw display handles")
    }

    // Input

    fn set_cursor_mode(&mut self, window: WindowId, mode: CursorMode) {}

    fn cursor_pos(&self, window: WindowId) -> Point<f64, ScreenPx>;

    fn set_cursor_pos(&mut self, window: WindowId, position: Point<f64, ScreenPx>) {}

    fn raw_mouse_motion_supported(&self) -> bool {
        false
    }

    fn set_raw_mouse_motion(&mut self, window: WindowId, enabled: bool) {}

    fn create_standard_cursor(&mut self, cursor: CursorId, shape: CursorShape) -> Result<()> {
        Err(Error::new(
            ErrorCode::CursorUnavailable,
            format!("standard cursor {shape:?} is not available"),
        ))
    }

    fn create_cursor(&mut self, cursor: CursorId, image: &Image, hotspot: Point<i32, Px>) -> Result<()> {
        unavailable("Custom cursors")
    }

    fn destroy_cursor(&mut self, cursor: CursorId) {}

    /// `None` reverts the window to the default arrow cursor.
    fn set_window_cursor(&mut self, window: WindowId, cursor: Option<CursorId>) {}

    /// The layout-dependent name of a printable key.
    fn key_name(&self, key: Key, scancode: i32) -> Option<String> {
        None
    }

    fn key_scancode(&self, key: Key) -> Option<i32> {
        None
    }

    fn set_clipboard_string(&mut self, text: &str) -> Result<()> {
        unavailable("Clipboard access")
    }

    fn clipboard_string(&mut self) -> Result<String> {
        unavailable("Clipboard access")
    }

    // Contexts

    fn create_context(
        &mut self,
        window: WindowId,
        config: &ContextConfig,
        framebuffer: &FramebufferConfig,
        share: Option<&Arc<dyn NativeContext>>,
    ) -> Result<Arc<dyn NativeContext>> {
        Err(Error::new(
            ErrorCode::ApiUnavailable,
            "this platform does not create rendering contexts",
        ))
    }

    /// Creates an off-screen context sharing objects with the window's.
    fn create_user_context(
        &mut self,
        window: WindowId,
        share: &Arc<dyn NativeContext>,
    ) -> Result<Arc<dyn NativeContext>> {
        Err(Error::new(
            ErrorCode::FeatureUnavailable,
            "user contexts are not supported by this platform",
        ))
    }

    // Joysticks

    /// Describes the joystick in `slot`, if one is present.
    fn joystick(&mut self, slot: usize) -> Option<JoystickDescriptor> {
        None
    }

    /// Reads the current state of the joystick into `input`. Returns false if
    /// the device has gone away.
    fn poll_joystick(&mut self, slot: usize, input: &mut JoystickInput) -> bool {
        false
    }
}
