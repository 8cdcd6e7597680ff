//! The window state machine.
//!
//! A window is either windowed or fullscreen on a monitor; iconified and
//! maximized are transient states on top of that. Attributes always report
//! the last value set, even while the current mode ignores them, and take
//! effect on the next transition where they apply.

use std::{
    any::Any,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use geometry::{Extent, Point, Px, ScreenPx};
use raw_window_handle::{RawDisplayHandle, RawWindowHandle};
use structures::Handle;

use crate::{
    context::{ClientApi, Context, ContextConfig, ContextTarget},
    cursor::CursorId,
    error::{raise, report, ErrorCode, Result},
    hints::WindowHints,
    image::Image,
    input::InputState,
    monitor::{MonitorId, VideoModeRequest},
    platform::NativeWindowConfig,
    Library,
};

pub type WindowId = Handle<Window>;

bitflags::bitflags! {
    pub struct WindowFlags: u32 {
        const RESIZABLE = 0x1;
        const VISIBLE = 0x2;
        const DECORATED = 0x4;
        /// Give the window input focus when it is created.
        const FOCUSED = 0x8;
        /// Iconify a fullscreen window when it loses focus.
        const AUTO_ICONIFY = 0x10;
        /// Keep the window above other windows.
        const FLOATING = 0x20;
        const MAXIMIZED = 0x40;
        /// Center the cursor on fullscreen windows when they are created.
        const CENTER_CURSOR = 0x80;
        const TRANSPARENT_FRAMEBUFFER = 0x100;
        /// Give the window input focus whenever it is shown.
        const FOCUS_ON_SHOW = 0x200;
        /// Let mouse input pass through to whatever is below the window.
        const MOUSE_PASSTHROUGH = 0x400;
        /// Resize the window to follow the monitor's content scale.
        const SCALE_TO_MONITOR = 0x800;
    }
}

impl Default for WindowFlags {
    fn default() -> Self {
        WindowFlags::RESIZABLE
            | WindowFlags::VISIBLE
            | WindowFlags::DECORATED
            | WindowFlags::FOCUSED
            | WindowFlags::AUTO_ICONIFY
            | WindowFlags::CENTER_CURSOR
            | WindowFlags::FOCUS_ON_SHOW
    }
}

/// Queryable window attributes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WindowAttrib {
    Focused,
    Iconified,
    Maximized,
    /// The cursor is over the content area.
    Hovered,
    Visible,
    Resizable,
    Decorated,
    AutoIconify,
    Floating,
    TransparentFramebuffer,
    FocusOnShow,
    MousePassthrough,
}

impl WindowAttrib {
    /// The flag backing a settable attribute.
    fn settable_flag(self) -> Option<WindowFlags> {
        match self {
            Self::Resizable => Some(WindowFlags::RESIZABLE),
            Self::Decorated => Some(WindowFlags::DECORATED),
            Self::AutoIconify => Some(WindowFlags::AUTO_ICONIFY),
            Self::Floating => Some(WindowFlags::FLOATING),
            Self::FocusOnShow => Some(WindowFlags::FOCUS_ON_SHOW),
            Self::MousePassthrough => Some(WindowFlags::MOUSE_PASSTHROUGH),
            _ => None,
        }
    }
}

/// Size of the window frame around the content area, in screen coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameSize {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

/// A handle to a window's close flag that may be read and written from any
/// thread. Writes are not synchronized with event processing.
#[derive(Clone, Debug, Default)]
pub struct CloseFlag(Arc<AtomicBool>);

impl CloseFlag {
    #[must_use]
    pub fn get(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    pub fn set(&self, value: bool) {
        self.0.store(value, Ordering::Relaxed);
    }
}

pub struct Window {
    pub(crate) flags: WindowFlags,
    title: String,
    /// Set while the window is fullscreen.
    pub(crate) monitor: Option<MonitorId>,
    /// The mode to use while fullscreen.
    video_mode: VideoModeRequest,
    /// Tracked so that fullscreen video modes are swapped exactly once per
    /// iconify/restore.
    iconified: bool,
    min_size: Option<Extent<i32, ScreenPx>>,
    max_size: Option<Extent<i32, ScreenPx>>,
    aspect_ratio: Option<(i32, i32)>,
    pub(crate) close: CloseFlag,
    pub(crate) cursor: Option<CursorId>,
    pub(crate) input: InputState,
    pub(crate) context: Option<Context>,
    context_config: ContextConfig,
    pub(crate) user_contexts: Vec<Context>,
    user_data: Option<Box<dyn Any>>,
}

fn check_size(size: Extent<i32, ScreenPx>) -> Result<()> {
    if size.width <= 0 || size.height <= 0 {
        return Err(raise(
            ErrorCode::InvalidValue,
            format!("invalid window size {}x{}", size.width, size.height),
        ));
    }

    Ok(())
}

impl Library {
    pub(crate) fn window(&self, window: WindowId) -> Result<&Window> {
        self.require_init()?;
        self.windows.get(window).ok_or_else(|| {
            raise(
                ErrorCode::InvalidValue,
                format!("{window:?} is not a live window"),
            )
        })
    }

    pub(crate) fn window_mut(&mut self, window: WindowId) -> Result<&mut Window> {
        self.require_init()?;
        self.windows.get_mut(window).ok_or_else(|| {
            raise(
                ErrorCode::InvalidValue,
                format!("{window:?} is not a live window"),
            )
        })
    }

    /// Creates a window, and its context unless the hints ask for
    /// [`ClientApi::NoApi`]. Passing a monitor creates a fullscreen window.
    ///
    /// Hints and platform support are checked before any native object is
    /// created; on failure nothing is left behind.
    pub fn create_window(
        &mut self,
        size: Extent<i32, ScreenPx>,
        title: &str,
        monitor: Option<MonitorId>,
        hints: &WindowHints,
    ) -> Result<WindowId> {
        self.require_init()?;
        check_size(size)?;
        hints.context.validate()?;

        let has_context = hints.context.client_api != ClientApi::NoApi;
        let share = match hints.share {
            Some(share) => Some(self.window_context(share)?),
            None => None,
        };

        let native_monitor = match monitor {
            Some(monitor) => Some(self.native_monitor(monitor)?),
            None => None,
        };

        if has_context {
            self.platform
                .check_context_support(&hints.context, &hints.framebuffer)
                .map_err(report)?;
        }

        let video_mode = VideoModeRequest {
            size,
            red_bits: hints.framebuffer.red_bits,
            green_bits: hints.framebuffer.green_bits,
            blue_bits: hints.framebuffer.blue_bits,
            refresh_rate: hints.refresh_rate,
        };

        let id = self.windows.insert(Window {
            flags: hints.flags,
            title: title.to_owned(),
            monitor,
            video_mode,
            iconified: false,
            min_size: None,
            max_size: None,
            aspect_ratio: None,
            close: CloseFlag::default(),
            cursor: None,
            input: InputState::default(),
            context: None,
            context_config: hints.context.clone(),
            user_contexts: Vec::new(),
            user_data: None,
        });

        if let Some(monitor) = monitor {
            if let Err(e) = self.acquire_monitor(id, monitor, &video_mode) {
                self.windows.remove(id);
                return Err(e);
            }
        }

        let config = NativeWindowConfig {
            title,
            size,
            position: hints.position,
            flags: hints.flags,
            monitor: native_monitor,
            framebuffer: &hints.framebuffer,
        };

        if let Err(e) = self.platform.create_window(id, &config) {
            self.abandon_window(id, monitor);
            return Err(report(e));
        }

        if has_context {
            let native = self.platform.create_context(
                id,
                &hints.context,
                &hints.framebuffer,
                share.as_ref().map(Context::native),
            );

            match native {
                Ok(native) => {
                    let context = Context::new(native, ContextTarget::Window(id));
                    if let Some(window) = self.windows.get_mut(id) {
                        window.context = Some(context);
                    }
                }
                Err(e) => {
                    self.platform.destroy_window(id);
                    self.abandon_window(id, monitor);
                    return Err(report(e));
                }
            }
        }

        if monitor.is_some() && hints.flags.contains(WindowFlags::CENTER_CURSOR) {
            let center = Point::new(f64::from(size.width) / 2.0, f64::from(size.height) / 2.0);
            self.platform.set_cursor_pos(id, center);
        }

        let cursor = self.platform.cursor_pos(id);
        if let Some(window) = self.windows.get_mut(id) {
            window.input.cursor = cursor;
        }

        log::debug!(
            "created {} window {id:?} \"{title}\" ({}x{})",
            if monitor.is_some() { "fullscreen" } else { "windowed" },
            size.width,
            size.height
        );

        Ok(id)
    }

    fn abandon_window(&mut self, window: WindowId, monitor: Option<MonitorId>) {
        if let Some(monitor) = monitor {
            self.release_monitor(window, monitor);
        }

        self.windows.remove(window);
    }

    /// Destroys a window and its context. No callbacks fire for the window
    /// from this point on. If the window's context is current on the calling
    /// thread it is detached first.
    pub fn destroy_window(&mut self, window: WindowId) -> Result<()> {
        self.window(window)?;
        self.callbacks.windows.remove(&window);

        let Some(state) = self.windows.remove(window) else {
            return Ok(());
        };

        for context in state.context.iter().chain(&state.user_contexts) {
            crate::context::release(context);
            context.mark_destroyed();
        }

        if let Some(monitor) = state.monitor {
            self.release_monitor(window, monitor);
        }

        self.platform.destroy_window(window);
        log::debug!("destroyed window {window:?}");
        Ok(())
    }

    pub(crate) fn destroy_all_windows(&mut self) {
        for window in self.windows.handles() {
            if let Err(e) = self.destroy_window(window) {
                log::warn!("failed to destroy {window:?}: {e}");
            }
        }
    }

    pub fn window_should_close(&self, window: WindowId) -> Result<bool> {
        Ok(self.window(window)?.close.get())
    }

    /// Sets the close flag. This never destroys the window and never invokes
    /// the close callback.
    pub fn set_window_should_close(&mut self, window: WindowId, value: bool) -> Result<()> {
        self.window(window)?.close.set(value);
        Ok(())
    }

    /// A handle to the window's close flag for use from other threads.
    pub fn close_flag(&self, window: WindowId) -> Result<CloseFlag> {
        Ok(self.window(window)?.close.clone())
    }

    pub fn window_title(&self, window: WindowId) -> Result<&str> {
        Ok(&self.window(window)?.title)
    }

    pub fn set_window_title(&mut self, window: WindowId, title: &str) -> Result<()> {
        self.window_mut(window)?.title = title.to_owned();
        self.platform.set_window_title(window, title);
        Ok(())
    }

    /// Sets the window icon, letting the platform pick the best size. An
    /// empty slice reverts to the default icon.
    pub fn set_window_icon(&mut self, window: WindowId, images: &[Image]) -> Result<()> {
        self.window(window)?;
        self.platform
            .set_window_icon(window, images)
            .map_err(report)
    }

    pub fn window_pos(&self, window: WindowId) -> Result<Point<i32, ScreenPx>> {
        self.window(window)?;
        Ok(self.platform.window_pos(window))
    }

    /// Moves the content area. Ignored for fullscreen windows.
    pub fn set_window_pos(&mut self, window: WindowId, position: Point<i32, ScreenPx>) -> Result<()> {
        if self.window(window)?.monitor.is_none() {
            self.platform.set_window_pos(window, position);
        }

        Ok(())
    }

    pub fn window_size(&self, window: WindowId) -> Result<Extent<i32, ScreenPx>> {
        self.window(window)?;
        Ok(self.platform.window_size(window))
    }

    /// Resizes the content area. For fullscreen windows this picks a new video
    /// mode instead.
    pub fn set_window_size(&mut self, window: WindowId, size: Extent<i32, ScreenPx>) -> Result<()> {
        check_size(size)?;

        let state = self.window_mut(window)?;
        state.video_mode.size = size;
        let request = state.video_mode;

        if let Some(monitor) = state.monitor {
            self.acquire_monitor(window, monitor, &request)?;
        }

        self.platform.set_window_size(window, size);
        Ok(())
    }

    /// Limits the content area size of windowed, resizable windows. `None`
    /// removes a limit.
    pub fn set_window_size_limits(
        &mut self,
        window: WindowId,
        min: Option<Extent<i32, ScreenPx>>,
        max: Option<Extent<i32, ScreenPx>>,
    ) -> Result<()> {
        let negative = |size: Option<Extent<i32, ScreenPx>>| {
            size.map_or(false, |s| s.width < 0 || s.height < 0)
        };

        if negative(min) || negative(max) {
            return Err(raise(ErrorCode::InvalidValue, "invalid window size limit"));
        }

        if let (Some(min), Some(max)) = (min, max) {
            if max.width < min.width || max.height < min.height {
                return Err(raise(
                    ErrorCode::InvalidValue,
                    "maximum window size is smaller than the minimum",
                ));
            }
        }

        let state = self.window_mut(window)?;
        state.min_size = min;
        state.max_size = max;

        if state.monitor.is_none() && state.flags.contains(WindowFlags::RESIZABLE) {
            self.platform.set_window_size_limits(window, min, max);
        }

        Ok(())
    }

    /// Locks the content area to an aspect ratio while the user resizes the
    /// window. `None` removes the lock.
    pub fn set_window_aspect_ratio(
        &mut self,
        window: WindowId,
        ratio: Option<(i32, i32)>,
    ) -> Result<()> {
        if let Some((numerator, denominator)) = ratio {
            if numerator <= 0 || denominator <= 0 {
                return Err(raise(
                    ErrorCode::InvalidValue,
                    format!("invalid window aspect ratio {numerator}:{denominator}"),
                ));
            }
        }

        let state = self.window_mut(window)?;
        state.aspect_ratio = ratio;

        if state.monitor.is_none() && state.flags.contains(WindowFlags::RESIZABLE) {
            self.platform.set_window_aspect_ratio(window, ratio);
        }

        Ok(())
    }

    pub fn framebuffer_size(&self, window: WindowId) -> Result<Extent<i32, Px>> {
        self.window(window)?;
        Ok(self.platform.framebuffer_size(window))
    }

    pub fn window_frame_size(&self, window: WindowId) -> Result<FrameSize> {
        self.window(window)?;
        Ok(self.platform.window_frame_size(window))
    }

    /// Ratio between the current DPI and the platform's default DPI.
    pub fn window_content_scale(&self, window: WindowId) -> Result<(f32, f32)> {
        self.window(window)?;
        Ok(self.platform.window_content_scale(window))
    }

    pub fn window_opacity(&self, window: WindowId) -> Result<f32> {
        self.window(window)?;
        Ok(self.platform.window_opacity(window))
    }

    /// Sets the opacity of the whole window, frame included.
    pub fn set_window_opacity(&mut self, window: WindowId, opacity: f32) -> Result<()> {
        if !(0.0..=1.0).contains(&opacity) {
            return Err(raise(
                ErrorCode::InvalidValue,
                format!("invalid window opacity {opacity}"),
            ));
        }

        self.window(window)?;
        self.platform
            .set_window_opacity(window, opacity)
            .map_err(report)
    }

    /// Iconifies the window. A fullscreen window gives its monitor back the
    /// original video mode until it is restored.
    pub fn iconify_window(&mut self, window: WindowId) -> Result<()> {
        self.window(window)?;
        self.note_iconified(window, true);
        self.platform.iconify_window(window);
        Ok(())
    }

    /// Restores an iconified or maximized window. A fullscreen window gets its
    /// video mode back.
    pub fn restore_window(&mut self, window: WindowId) -> Result<()> {
        self.window(window)?;
        self.note_iconified(window, false);
        self.platform.restore_window(window);
        Ok(())
    }

    /// Swaps the fullscreen video mode out or back in on an iconify state
    /// change.
    pub(crate) fn note_iconified(&mut self, window: WindowId, iconified: bool) {
        let Some(state) = self.windows.get_mut(window) else {
            return;
        };

        if state.iconified == iconified {
            return;
        }

        state.iconified = iconified;
        let request = state.video_mode;
        let Some(monitor) = state.monitor else {
            return;
        };

        if iconified {
            if let Ok(native) = self.native_monitor(monitor) {
                self.platform.restore_video_mode(native);
            }
        } else if let Err(e) = self.acquire_monitor(window, monitor, &request) {
            log::warn!("failed to restore the video mode of {window:?}: {e}");
        }
    }

    /// Maximizes the window. Does nothing while fullscreen.
    pub fn maximize_window(&mut self, window: WindowId) -> Result<()> {
        if self.window(window)?.monitor.is_none() {
            self.platform.maximize_window(window);
        }

        Ok(())
    }

    /// Shows a hidden window, focusing it if focus-on-show is set. Does
    /// nothing while fullscreen.
    pub fn show_window(&mut self, window: WindowId) -> Result<()> {
        let state = self.window(window)?;
        if state.monitor.is_some() {
            return Ok(());
        }

        let focus = state.flags.contains(WindowFlags::FOCUS_ON_SHOW);
        self.platform.show_window(window);
        if focus {
            self.platform.focus_window(window);
        }

        Ok(())
    }

    /// Hides the window. Does nothing while fullscreen.
    pub fn hide_window(&mut self, window: WindowId) -> Result<()> {
        if self.window(window)?.monitor.is_none() {
            self.platform.hide_window(window);
        }

        Ok(())
    }

    pub fn focus_window(&mut self, window: WindowId) -> Result<()> {
        self.window(window)?;
        self.platform.focus_window(window);
        Ok(())
    }

    pub fn request_window_attention(&mut self, window: WindowId) -> Result<()> {
        self.window(window)?;
        self.platform.request_window_attention(window);
        Ok(())
    }

    /// The monitor the window is fullscreen on, `None` if windowed.
    pub fn window_monitor(&self, window: WindowId) -> Result<Option<MonitorId>> {
        Ok(self.window(window)?.monitor)
    }

    /// Moves the window between windowed and fullscreen modes.
    ///
    /// With a monitor, the window becomes fullscreen on it using the video
    /// mode closest to `size` and `refresh_rate`; `position` is ignored.
    /// Without one, the window becomes windowed at `position` and `size`, and
    /// gets back its decorations, floating state, resizability and size
    /// limits.
    pub fn set_window_monitor(
        &mut self,
        window: WindowId,
        monitor: Option<MonitorId>,
        position: Point<i32, ScreenPx>,
        size: Extent<i32, ScreenPx>,
        refresh_rate: Option<u32>,
    ) -> Result<()> {
        check_size(size)?;

        let state = self.window(window)?;
        let previous = state.monitor;
        let mut request = state.video_mode;
        request.size = size;
        request.refresh_rate = refresh_rate;

        let Some(monitor) = monitor else {
            self.window_mut(window)?.video_mode = request;
            self.leave_fullscreen(window, position, size);
            return Ok(());
        };

        let native = self.native_monitor(monitor)?;

        if let Some(previous) = previous.filter(|p| *p != monitor) {
            self.release_monitor(window, previous);
        }

        self.acquire_monitor(window, monitor, &request)?;
        let state = self.window_mut(window)?;
        state.video_mode = request;
        state.monitor = Some(monitor);
        self.platform
            .set_window_monitor(window, Some(native), position, size);

        log::debug!("{window:?} is now fullscreen on {monitor:?}");
        Ok(())
    }

    /// Makes the window windowed and re-applies its windowed-mode attributes.
    pub(crate) fn leave_fullscreen(
        &mut self,
        window: WindowId,
        position: Point<i32, ScreenPx>,
        size: Extent<i32, ScreenPx>,
    ) {
        let Some(state) = self.windows.get_mut(window) else {
            return;
        };

        let previous = state.monitor.take();
        let flags = state.flags;
        let (min, max, ratio) = (state.min_size, state.max_size, state.aspect_ratio);

        if let Some(monitor) = previous {
            self.release_monitor(window, monitor);
            log::debug!("{window:?} is now windowed");
        }

        self.platform.set_window_monitor(window, None, position, size);

        for flag in [
            WindowFlags::DECORATED,
            WindowFlags::RESIZABLE,
            WindowFlags::FLOATING,
        ] {
            self.platform
                .set_window_flag(window, flag, flags.contains(flag));
        }

        if flags.contains(WindowFlags::RESIZABLE) {
            self.platform.set_window_size_limits(window, min, max);
            self.platform.set_window_aspect_ratio(window, ratio);
        }
    }

    pub fn window_attrib(&self, window: WindowId, attrib: WindowAttrib) -> Result<bool> {
        let flags = self.window(window)?.flags;
        let live = || self.platform.window_state(window);

        Ok(match attrib {
            WindowAttrib::Focused => live().focused,
            WindowAttrib::Iconified => live().iconified,
            WindowAttrib::Maximized => live().maximized,
            WindowAttrib::Hovered => live().hovered,
            WindowAttrib::Visible => live().visible,
            WindowAttrib::Resizable => flags.contains(WindowFlags::RESIZABLE),
            WindowAttrib::Decorated => flags.contains(WindowFlags::DECORATED),
            WindowAttrib::AutoIconify => flags.contains(WindowFlags::AUTO_ICONIFY),
            WindowAttrib::Floating => flags.contains(WindowFlags::FLOATING),
            WindowAttrib::TransparentFramebuffer => {
                flags.contains(WindowFlags::TRANSPARENT_FRAMEBUFFER)
            }
            WindowAttrib::FocusOnShow => flags.contains(WindowFlags::FOCUS_ON_SHOW),
            WindowAttrib::MousePassthrough => flags.contains(WindowFlags::MOUSE_PASSTHROUGH),
        })
    }

    /// Sets one of the decorated, resizable, floating, auto-iconify,
    /// focus-on-show or mouse-passthrough attributes. Others fail with
    /// [`ErrorCode::InvalidEnum`].
    ///
    /// The value is always recorded. Decorated, resizable and floating only
    /// reach the platform while the window is windowed.
    pub fn set_window_attrib(
        &mut self,
        window: WindowId,
        attrib: WindowAttrib,
        value: bool,
    ) -> Result<()> {
        let Some(flag) = attrib.settable_flag() else {
            return Err(raise(
                ErrorCode::InvalidEnum,
                format!("window attribute {attrib:?} cannot be set"),
            ));
        };

        let state = self.window_mut(window)?;
        if state.flags.contains(flag) == value {
            return Ok(());
        }

        state.flags.set(flag, value);
        let windowed = state.monitor.is_none();

        let applies = if flag == WindowFlags::MOUSE_PASSTHROUGH {
            true
        } else {
            windowed
                && (WindowFlags::DECORATED | WindowFlags::RESIZABLE | WindowFlags::FLOATING)
                    .contains(flag)
        };

        if applies {
            self.platform.set_window_flag(window, flag, value);
        }

        Ok(())
    }

    /// The context configuration the window was created with.
    pub fn window_context_config(&self, window: WindowId) -> Result<&ContextConfig> {
        Ok(&self.window(window)?.context_config)
    }

    pub fn window_user_data(&self, window: WindowId) -> Result<Option<&dyn Any>> {
        Ok(self.window(window)?.user_data.as_deref())
    }

    /// Replaces the window's user data, returning the previous value.
    pub fn set_window_user_data(
        &mut self,
        window: WindowId,
        data: Option<Box<dyn Any>>,
    ) -> Result<Option<Box<dyn Any>>> {
        Ok(std::mem::replace(&mut self.window_mut(window)?.user_data, data))
    }

    /// The native window handle, for creating Vulkan or WebGPU surfaces.
    pub fn window_handle(&self, window: WindowId) -> Result<RawWindowHandle> {
        self.window(window)?;
        self.platform.window_handle(window).map_err(report)
    }

    pub fn display_handle(&self) -> Result<RawDisplayHandle> {
        self.require_init()?;
        self.platform.display_handle().map_err(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::{cell::RefCell, rc::Rc};

    use crate::{
        platform::null::{NullController, NullPlatform},
        PlatformEvent,
    };

    fn library() -> (Library, NullController) {
        let (platform, controller) = NullPlatform::new();
        let mut lib = Library::new(platform);
        lib.init().unwrap();
        (lib, controller)
    }

    fn windowed(lib: &mut Library) -> WindowId {
        lib.create_window(Extent::new(640, 480), "test", None, &WindowHints::no_api())
            .unwrap()
    }

    #[test]
    fn windowed_windows_have_no_monitor() {
        let (mut lib, _) = library();
        let window = windowed(&mut lib);

        assert_eq!(lib.window_monitor(window).unwrap(), None);

        // Auto-iconify only matters for fullscreen windows, but still reads
        // back.
        lib.set_window_attrib(window, WindowAttrib::AutoIconify, false)
            .unwrap();
        assert!(!lib.window_attrib(window, WindowAttrib::AutoIconify).unwrap());
        lib.set_window_attrib(window, WindowAttrib::AutoIconify, true)
            .unwrap();
        assert!(lib.window_attrib(window, WindowAttrib::AutoIconify).unwrap());

        let err = lib
            .set_window_attrib(window, WindowAttrib::Focused, true)
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidEnum);
    }

    #[test]
    fn invalid_creation_leaves_nothing_behind() {
        let (mut lib, controller) = library();

        let err = lib
            .create_window(Extent::new(0, 10), "bad", None, &WindowHints::no_api())
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidValue);

        let mut hints = WindowHints::default();
        hints.context.version = (3, 4);
        let err = lib
            .create_window(Extent::new(10, 10), "bad", None, &hints)
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidValue);

        controller.set_context_support(false);
        let err = lib
            .create_window(Extent::new(10, 10), "bad", None, &WindowHints::default())
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ApiUnavailable);

        assert_eq!(controller.window_count(), 0);
        assert!(lib.windows.is_empty());
    }

    #[test]
    fn should_close_does_not_close() {
        let (mut lib, controller) = library();
        let window = windowed(&mut lib);

        let closed = Rc::new(RefCell::new(0));
        let sink = closed.clone();
        lib.set_window_close_callback(
            window,
            Some(Box::new(move |_: &mut Library, _: WindowId, _: ()| {
                *sink.borrow_mut() += 1;
            })),
        )
        .unwrap();

        lib.set_window_should_close(window, true).unwrap();
        lib.poll_events().unwrap();

        assert_eq!(*closed.borrow(), 0);
        assert!(lib.window_should_close(window).unwrap());
        assert_eq!(lib.window_title(window).unwrap(), "test");
        assert_eq!(controller.window_count(), 1);

        // Only an explicit destroy removes the window.
        lib.destroy_window(window).unwrap();
        assert_eq!(controller.window_count(), 0);
        let err = lib.window_should_close(window).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidValue);
    }

    #[test]
    fn close_request_sets_flag_before_callback() {
        let (mut lib, controller) = library();
        let window = windowed(&mut lib);
        let flag = lib.close_flag(window).unwrap();

        lib.set_window_close_callback(
            window,
            Some(Box::new(|lib: &mut Library, window: WindowId, _: ()| {
                assert!(lib.window_should_close(window).unwrap());
                // Veto.
                lib.set_window_should_close(window, false).unwrap();
            })),
        )
        .unwrap();

        controller.send(PlatformEvent::CloseRequested { window });
        lib.poll_events().unwrap();
        assert!(!flag.get());

        std::thread::spawn(move || flag.set(true)).join().unwrap();
        assert!(lib.window_should_close(window).unwrap());
    }

    #[test]
    fn fullscreen_round_trip_restores_windowed_attributes() {
        let (mut lib, controller) = library();
        let monitor = lib.primary_monitor().unwrap().unwrap();
        let window = windowed(&mut lib);

        lib.set_window_size_limits(window, Some(Extent::new(100, 100)), None)
            .unwrap();
        lib.set_window_monitor(window, Some(monitor), Point::origin(), Extent::new(1280, 720), None)
            .unwrap();
        assert_eq!(lib.window_monitor(window).unwrap(), Some(monitor));
        assert_eq!(controller.current_mode(0).map(|m| m.width), Some(1280));

        // Recorded, but not applied while fullscreen.
        lib.set_window_attrib(window, WindowAttrib::Decorated, false)
            .unwrap();
        assert!(controller.window_flags(window).contains(WindowFlags::DECORATED));

        // Fullscreen windows ignore maximize and hide.
        lib.maximize_window(window).unwrap();
        lib.hide_window(window).unwrap();
        assert!(!lib.window_attrib(window, WindowAttrib::Maximized).unwrap());
        assert!(lib.window_attrib(window, WindowAttrib::Visible).unwrap());

        lib.set_window_monitor(window, None, Point::new(10, 10), Extent::new(640, 480), None)
            .unwrap();
        assert_eq!(lib.window_monitor(window).unwrap(), None);
        assert!(!controller.window_flags(window).contains(WindowFlags::DECORATED));
        assert_eq!(
            controller.size_limits(window),
            (Some(Extent::new(100, 100)), None)
        );
        assert_eq!(controller.current_mode(0).map(|m| m.width), Some(1920));
    }

    #[test]
    fn iconify_swaps_fullscreen_video_mode() {
        let (mut lib, controller) = library();
        let monitor = lib.primary_monitor().unwrap().unwrap();
        let window = lib
            .create_window(Extent::new(1280, 720), "fs", Some(monitor), &WindowHints::no_api())
            .unwrap();

        assert_eq!(controller.current_mode(0).map(|m| m.width), Some(1280));

        lib.iconify_window(window).unwrap();
        assert_eq!(controller.current_mode(0).map(|m| m.width), Some(1920));

        // The platform echoes the state change; the mode is not swapped twice.
        lib.poll_events().unwrap();
        assert_eq!(controller.current_mode(0).map(|m| m.width), Some(1920));

        lib.restore_window(window).unwrap();
        assert_eq!(controller.current_mode(0).map(|m| m.width), Some(1280));

        lib.destroy_window(window).unwrap();
        assert_eq!(controller.current_mode(0).map(|m| m.width), Some(1920));
    }

    #[test]
    fn rejected_monitor_leaves_video_mode_alone() {
        use crate::platform::null::NullMonitor;

        let (mut lib, controller) = library();
        let primary = lib.primary_monitor().unwrap().unwrap();

        let side = controller.connect_monitor(NullMonitor::new("Side", false));
        lib.poll_events().unwrap();
        let stale = lib.monitors().unwrap()[1];
        controller.disconnect_monitor(side);
        lib.poll_events().unwrap();

        let window = lib
            .create_window(Extent::new(1280, 720), "fs", Some(primary), &WindowHints::no_api())
            .unwrap();

        let err = lib
            .set_window_monitor(window, Some(stale), Point::origin(), Extent::new(640, 480), None)
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidValue);
        assert_eq!(lib.window_monitor(window).unwrap(), Some(primary));

        // Restore re-applies the mode from before the rejected call.
        lib.iconify_window(window).unwrap();
        lib.restore_window(window).unwrap();
        assert_eq!(controller.current_mode(0).map(|m| m.width), Some(1280));
    }

    #[test]
    fn geometry_validation() {
        let (mut lib, _) = library();
        let window = windowed(&mut lib);

        let err = lib
            .set_window_size_limits(window, Some(Extent::new(200, 200)), Some(Extent::new(100, 300)))
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidValue);

        let err = lib.set_window_aspect_ratio(window, Some((16, 0))).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidValue);

        let err = lib.set_window_opacity(window, 1.5).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidValue);
        lib.set_window_opacity(window, 0.5).unwrap();
        assert!((lib.window_opacity(window).unwrap() - 0.5).abs() < f32::EPSILON);

        lib.set_window_size(window, Extent::new(800, 600)).unwrap();
        assert_eq!(lib.window_size(window).unwrap(), Extent::new(800, 600));
        assert_eq!(lib.framebuffer_size(window).unwrap(), Extent::new(800, 600));

        lib.set_window_title(window, "renamed").unwrap();
        assert_eq!(lib.window_title(window).unwrap(), "renamed");
    }

    #[test]
    fn user_data_round_trip() {
        let (mut lib, _) = library();
        let window = windowed(&mut lib);

        assert!(lib
            .set_window_user_data(window, Some(Box::new(String::from("hello"))))
            .unwrap()
            .is_none());

        let data = lib.window_user_data(window).unwrap().unwrap();
        assert_eq!(data.downcast_ref::<String>().map(String::as_str), Some("hello"));
    }
}
