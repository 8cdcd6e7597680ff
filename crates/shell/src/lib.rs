//! A desktop [`Platform`] built on winit.
//!
//! The winit event loop is pumped with `run_return` from inside
//! [`Platform::poll_events`] and [`Platform::wait_events`], so applications
//! keep the familiar poll-or-wait loop instead of handing control to winit.
//!
//! This backend creates no rendering contexts. Create windows with
//! [`grwl::ClientApi::NoApi`] and build Vulkan or WebGPU surfaces from
//! [`grwl::Library::window_handle`] instead.
//!
//! Features winit does not expose (gamma ramps, clipboard, key names,
//! joysticks, custom cursor images) report
//! [`grwl::ErrorCode::FeatureUnavailable`] or do nothing.

mod keys;
mod video;

use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use geometry::{Extent, Offset, Point, Px, Rect, ScreenPx};
use grwl::{
    context::ContextConfig,
    platform::{MonitorDescriptor, NativeMonitor, NativeWindowConfig, NativeWindowState},
    window::FrameSize,
    ClientApi, CursorId, CursorMode, CursorShape, Error, ErrorCode, FramebufferConfig, Image,
    Platform, PlatformEvent, PlatformKind, Result, VideoMode, Waker, WindowFlags, WindowId,
};
use parking_lot::Mutex;
use raw_window_handle::{
    HasRawDisplayHandle, HasRawWindowHandle, RawDisplayHandle, RawWindowHandle,
};
use winit::{
    dpi::{LogicalPosition, LogicalSize, PhysicalPosition, PhysicalSize},
    event::{DeviceEvent, ElementState, Event, ModifiersState, MouseScrollDelta, WindowEvent},
    event_loop::{EventLoop, EventLoopProxy},
    monitor::MonitorHandle,
    platform::run_return::EventLoopExtRunReturn,
    window::{CursorGrabMode, CursorIcon, Fullscreen, Icon, UserAttentionType, WindowBuilder},
};

/// Pixel scroll deltas are divided by this to approximate wheel lines.
const PIXELS_PER_LINE: f64 = 20.0;

struct NativeWindow {
    window: winit::window::Window,
    monitor: Option<NativeMonitor>,
    cursor_mode: CursorMode,
    cursor_pos: Point<f64, ScreenPx>,
    raw_motion: bool,
    focused: bool,
    iconified: bool,
    visible: bool,
    hovered: bool,
}

impl NativeWindow {
    fn scale(&self) -> f64 {
        self.window.scale_factor()
    }
}

/// Windows and the keyboard state shared with the event loop closure.
#[derive(Default)]
struct Windows {
    windows: HashMap<WindowId, NativeWindow>,
    ids: HashMap<winit::window::WindowId, WindowId>,
    modifiers: ModifiersState,
}

impl Windows {
    /// Translates one winit event, appending the result to `events`.
    fn translate(&mut self, event: Event<()>, events: &mut Vec<PlatformEvent>) {
        match event {
            Event::UserEvent(()) => events.push(PlatformEvent::Empty),
            Event::RedrawRequested(native) => {
                if let Some(&window) = self.ids.get(&native) {
                    events.push(PlatformEvent::Refresh { window });
                }
            }
            Event::DeviceEvent {
                event: DeviceEvent::MouseMotion { delta: (dx, dy) },
                ..
            } => {
                for (&window, state) in &self.windows {
                    if state.raw_motion && state.focused && state.cursor_mode == CursorMode::Disabled {
                        events.push(PlatformEvent::CursorMotion {
                            window,
                            delta: Offset::new(dx, dy),
                        });
                    }
                }
            }
            Event::WindowEvent { window_id, event } => {
                let Some(&window) = self.ids.get(&window_id) else {
                    return;
                };

                self.translate_window_event(window, event, events);
            }
            _ => {}
        }
    }

    fn translate_window_event(
        &mut self,
        window: WindowId,
        event: WindowEvent,
        events: &mut Vec<PlatformEvent>,
    ) {
        let mods = keys::translate_mods(self.modifiers);
        let Some(state) = self.windows.get_mut(&window) else {
            return;
        };
        let scale = state.scale();

        match event {
            WindowEvent::Resized(size) => {
                // Minimized windows report a zero size on some systems.
                if size.width == 0 || size.height == 0 {
                    return;
                }

                events.push(PlatformEvent::Resized {
                    window,
                    size: to_screen_size(size, scale),
                });
                events.push(PlatformEvent::FramebufferResized {
                    window,
                    size: to_framebuffer_size(size),
                });
            }
            WindowEvent::Moved(position) => {
                events.push(PlatformEvent::Moved {
                    window,
                    position: to_screen_point(position, scale),
                });
            }
            WindowEvent::CloseRequested => events.push(PlatformEvent::CloseRequested { window }),
            WindowEvent::DroppedFile(path) => events.push(PlatformEvent::Drop {
                window,
                paths: vec![path],
            }),
            WindowEvent::Focused(focused) => {
                state.focused = focused;
                events.push(PlatformEvent::Focus { window, focused });
            }
            WindowEvent::ModifiersChanged(modifiers) => self.modifiers = modifiers,
            WindowEvent::KeyboardInput { input, .. } => {
                #[allow(clippy::cast_possible_wrap)]
                let scancode = input.scancode as i32;

                events.push(PlatformEvent::Key {
                    window,
                    key: keys::translate_key(input.virtual_keycode),
                    scancode,
                    action: match input.state {
                        ElementState::Pressed => grwl::ButtonState::Pressed,
                        ElementState::Released => grwl::ButtonState::Released,
                    },
                    mods,
                });
            }
            WindowEvent::ReceivedCharacter(codepoint) => events.push(PlatformEvent::Char {
                window,
                codepoint,
                mods,
                plain: keys::is_plain_text(self.modifiers),
            }),
            WindowEvent::CursorMoved { position, .. } => {
                let position = position.to_logical::<f64>(scale);
                let position = Point::new(position.x, position.y);
                state.cursor_pos = position;
                events.push(PlatformEvent::CursorPos { window, position });
            }
            WindowEvent::CursorEntered { .. } => {
                state.hovered = true;
                events.push(PlatformEvent::CursorEnter {
                    window,
                    entered: true,
                });
            }
            WindowEvent::CursorLeft { .. } => {
                state.hovered = false;
                events.push(PlatformEvent::CursorEnter {
                    window,
                    entered: false,
                });
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let offset = match delta {
                    MouseScrollDelta::LineDelta(x, y) => Offset::new(f64::from(x), f64::from(y)),
                    MouseScrollDelta::PixelDelta(pixels) => {
                        let pixels = pixels.to_logical::<f64>(scale);
                        Offset::new(pixels.x / PIXELS_PER_LINE, pixels.y / PIXELS_PER_LINE)
                    }
                };
                events.push(PlatformEvent::Scroll { window, offset });
            }
            WindowEvent::MouseInput { state: action, button, .. } => {
                let Some(button) = keys::translate_button(button) else {
                    return;
                };

                events.push(PlatformEvent::MouseButton {
                    window,
                    button,
                    action: match action {
                        ElementState::Pressed => grwl::ButtonState::Pressed,
                        ElementState::Released => grwl::ButtonState::Released,
                    },
                    mods,
                });
            }
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                #[allow(clippy::cast_possible_truncation)]
                let scale = scale_factor as f32;
                events.push(PlatformEvent::ContentScale {
                    window,
                    scale: (scale, scale),
                });
            }
            _ => {}
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
fn to_screen_size(size: PhysicalSize<u32>, scale: f64) -> Extent<i32, ScreenPx> {
    let size = size.to_logical::<f64>(scale);
    Extent::new(size.width.round() as i32, size.height.round() as i32)
}

fn to_framebuffer_size(size: PhysicalSize<u32>) -> Extent<i32, Px> {
    Extent::new(
        i32::try_from(size.width).unwrap_or(i32::MAX),
        i32::try_from(size.height).unwrap_or(i32::MAX),
    )
}

#[allow(clippy::cast_possible_truncation)]
fn to_screen_point(position: PhysicalPosition<i32>, scale: f64) -> Point<i32, ScreenPx> {
    let position = position.to_logical::<f64>(scale);
    Point::new(position.x.round() as i32, position.y.round() as i32)
}

fn logical_size(size: Extent<i32, ScreenPx>) -> LogicalSize<i32> {
    LogicalSize::new(size.width, size.height)
}

fn logical_position(position: Point<i32, ScreenPx>) -> LogicalPosition<i32> {
    LogicalPosition::new(position.x, position.y)
}

fn cursor_icon(shape: CursorShape) -> CursorIcon {
    match shape {
        CursorShape::Arrow => CursorIcon::Default,
        CursorShape::IBeam => CursorIcon::Text,
        CursorShape::Crosshair => CursorIcon::Crosshair,
        CursorShape::PointingHand => CursorIcon::Hand,
        CursorShape::ResizeEw => CursorIcon::EwResize,
        CursorShape::ResizeNs => CursorIcon::NsResize,
        CursorShape::ResizeNwse => CursorIcon::NwseResize,
        CursorShape::ResizeNesw => CursorIcon::NeswResize,
        CursorShape::ResizeAll => CursorIcon::Move,
        CursorShape::NotAllowed => CursorIcon::NotAllowed,
    }
}

fn platform_error(what: &str, error: impl std::fmt::Display) -> Error {
    Error::new(ErrorCode::PlatformError, format!("{what}: {error}"))
}

/// How long a pump may block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Pump {
    Poll,
    Wait(Option<Instant>),
}

impl Pump {
    /// Events left over from an earlier pump satisfy a wait on their own.
    fn with_queued(self, queued: bool) -> Self {
        if queued {
            Self::Poll
        } else {
            self
        }
    }
}

/// The winit backend. See the crate documentation.
pub struct ShellPlatform {
    event_loop: EventLoop<()>,
    proxy: Arc<Mutex<EventLoopProxy<()>>>,
    kind: PlatformKind,
    initialized: bool,

    windows: Windows,
    monitors: Vec<(NativeMonitor, MonitorHandle)>,
    next_monitor: u64,
    /// Modes set by the core, applied to fullscreen windows.
    video_modes: HashMap<NativeMonitor, winit::monitor::VideoMode>,
    cursors: HashMap<CursorId, CursorIcon>,

    /// Events synthesized by platform calls, delivered on the next pump.
    pending: Vec<PlatformEvent>,
}

impl ShellPlatform {
    /// Creates the winit event loop.
    ///
    /// # Panics
    ///
    /// If called off the main thread on platforms that require it, or if an
    /// event loop was already created in this process.
    #[must_use]
    pub fn new() -> Self {
        let event_loop = EventLoop::new();
        let proxy = Arc::new(Mutex::new(event_loop.create_proxy()));

        let kind = match event_loop.raw_display_handle() {
            RawDisplayHandle::Windows(_) => PlatformKind::Win32,
            RawDisplayHandle::AppKit(_) => PlatformKind::Cocoa,
            RawDisplayHandle::Wayland(_) => PlatformKind::Wayland,
            _ => PlatformKind::X11,
        };

        Self {
            event_loop,
            proxy,
            kind,
            initialized: false,
            windows: Windows::default(),
            monitors: Vec::new(),
            next_monitor: 0,
            video_modes: HashMap::new(),
            cursors: HashMap::new(),
            pending: Vec::new(),
        }
    }

    fn window(&self, window: WindowId) -> Option<&NativeWindow> {
        self.windows.windows.get(&window)
    }

    fn window_mut(&mut self, window: WindowId) -> Option<&mut NativeWindow> {
        self.windows.windows.get_mut(&window)
    }

    fn monitor_handle(&self, monitor: NativeMonitor) -> Option<&MonitorHandle> {
        self.monitors
            .iter()
            .find(|(native, _)| *native == monitor)
            .map(|(_, handle)| handle)
    }

    fn fullscreen(&self, monitor: NativeMonitor) -> Option<Fullscreen> {
        let handle = self.monitor_handle(monitor)?;

        Some(match self.video_modes.get(&monitor) {
            Some(mode) => Fullscreen::Exclusive(mode.clone()),
            None => Fullscreen::Borderless(Some(handle.clone())),
        })
    }

    fn describe(&self, native: NativeMonitor, handle: &MonitorHandle) -> MonitorDescriptor {
        let primary = self.event_loop.primary_monitor();
        let size = handle.size();

        // winit does not report physical dimensions; assume 96 dpi.
        #[allow(clippy::cast_possible_truncation)]
        let millimeters = |pixels: u32| (f64::from(pixels) * 25.4 / 96.0) as i32;

        MonitorDescriptor {
            native,
            name: handle.name().unwrap_or_else(|| "Unknown".to_owned()),
            physical_size: Extent::new(millimeters(size.width), millimeters(size.height)),
            primary: primary.as_ref() == Some(handle),
        }
    }

    /// Reconciles the known monitors with the connected ones. Returns the
    /// newly connected and the disconnected monitors.
    fn sync_monitors(&mut self) -> (Vec<MonitorDescriptor>, Vec<NativeMonitor>) {
        let connected: Vec<MonitorHandle> = self.event_loop.available_monitors().collect();

        let mut removed = Vec::new();
        self.monitors.retain(|(native, handle)| {
            let keep = connected.contains(handle);
            if !keep {
                removed.push(*native);
            }
            keep
        });

        for native in &removed {
            self.video_modes.remove(native);
        }

        let mut added = Vec::new();
        for handle in connected {
            if self.monitors.iter().any(|(_, known)| *known == handle) {
                continue;
            }

            self.next_monitor += 1;
            let native = NativeMonitor(self.next_monitor);
            added.push(self.describe(native, &handle));
            self.monitors.push((native, handle));
        }

        (added, removed)
    }

    fn pump(&mut self, mode: Pump, events: &mut Vec<PlatformEvent>) {
        let mode = mode.with_queued(!self.pending.is_empty());
        events.append(&mut self.pending);
        let start = events.len();

        let Self {
            event_loop, windows, ..
        } = self;

        event_loop.run_return(|event, _, control_flow| match event {
            Event::MainEventsCleared => {
                let done = match mode {
                    Pump::Poll => true,
                    Pump::Wait(deadline) => {
                        events.len() > start
                            || deadline.map_or(false, |deadline| Instant::now() >= deadline)
                    }
                };

                match mode {
                    _ if done => control_flow.set_exit(),
                    Pump::Wait(Some(deadline)) => control_flow.set_wait_until(deadline),
                    _ => control_flow.set_wait(),
                }
            }
            event => windows.translate(event, events),
        });

        // winit has no hot-plug notification, so look for changes each pump.
        if self.initialized {
            let (added, removed) = self.sync_monitors();
            events.extend(removed.into_iter().map(PlatformEvent::MonitorDisconnected));
            events.extend(added.into_iter().map(PlatformEvent::MonitorConnected));
        }
    }
}

impl Default for ShellPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl Platform for ShellPlatform {
    fn kind(&self) -> PlatformKind {
        self.kind
    }

    fn mapping_name(&self) -> &str {
        if cfg!(target_os = "windows") {
            "Windows"
        } else if cfg!(target_os = "macos") {
            "Mac OS X"
        } else {
            "Linux"
        }
    }

    fn init(&mut self) -> Result<()> {
        self.sync_monitors();
        self.initialized = true;
        log::debug!("winit backend up on {:?}", self.kind);
        Ok(())
    }

    fn terminate(&mut self) {
        self.windows = Windows::default();
        self.cursors.clear();
        self.video_modes.clear();
        self.pending.clear();
        self.initialized = false;
    }

    fn waker(&self) -> Waker {
        let proxy = self.proxy.clone();
        Waker::new(move || {
            // Fails only once the event loop is gone.
            let _ = proxy.lock().send_event(());
        })
    }

    fn poll_events(&mut self, events: &mut Vec<PlatformEvent>) {
        self.pump(Pump::Poll, events);
    }

    fn wait_events(&mut self, timeout: Option<Duration>, events: &mut Vec<PlatformEvent>) {
        let deadline = timeout.map(|timeout| Instant::now() + timeout);
        self.pump(Pump::Wait(deadline), events);
    }

    fn monitors(&mut self) -> Vec<MonitorDescriptor> {
        self.sync_monitors();
        self.monitors
            .iter()
            .map(|(native, handle)| self.describe(*native, handle))
            .collect()
    }

    fn monitor_position(&self, monitor: NativeMonitor) -> Point<i32, ScreenPx> {
        self.monitor_handle(monitor).map_or(Point::origin(), |handle| {
            to_screen_point(handle.position(), handle.scale_factor())
        })
    }

    fn monitor_workarea(&self, monitor: NativeMonitor) -> Rect<i32, ScreenPx> {
        let Some(handle) = self.monitor_handle(monitor) else {
            return Rect::new(Point::origin(), Extent::zero());
        };

        let scale = handle.scale_factor();
        Rect::new(
            to_screen_point(handle.position(), scale),
            to_screen_size(handle.size(), scale),
        )
    }

    #[allow(clippy::cast_possible_truncation)]
    fn monitor_content_scale(&self, monitor: NativeMonitor) -> (f32, f32) {
        self.monitor_handle(monitor).map_or((1.0, 1.0), |handle| {
            let scale = handle.scale_factor() as f32;
            (scale, scale)
        })
    }

    fn video_modes(&mut self, monitor: NativeMonitor) -> Vec<VideoMode> {
        self.monitor_handle(monitor)
            .map(|handle| handle.video_modes().map(|m| video::from_winit(&m)).collect())
            .unwrap_or_default()
    }

    fn current_video_mode(&self, monitor: NativeMonitor) -> Option<VideoMode> {
        if let Some(mode) = self.video_modes.get(&monitor) {
            return Some(video::from_winit(mode));
        }

        self.monitor_handle(monitor).map(video::desktop_mode)
    }

    fn set_video_mode(&mut self, monitor: NativeMonitor, mode: &VideoMode) -> Result<()> {
        let handle = self
            .monitor_handle(monitor)
            .ok_or_else(|| Error::new(ErrorCode::PlatformError, "monitor is disconnected"))?;

        let native = video::find_winit(handle, mode).ok_or_else(|| {
            Error::new(
                ErrorCode::PlatformError,
                format!("the monitor does not support {mode:?}"),
            )
        })?;

        log::debug!("switching {monitor:?} to {mode:?}");
        self.video_modes.insert(monitor, native);
        Ok(())
    }

    fn restore_video_mode(&mut self, monitor: NativeMonitor) {
        if self.video_modes.remove(&monitor).is_none() {
            return;
        }

        let fullscreen = self.fullscreen(monitor);
        for state in self.windows.windows.values() {
            if state.monitor == Some(monitor) {
                state.window.set_fullscreen(fullscreen.clone());
            }
        }
    }

    fn check_context_support(
        &self,
        context: &ContextConfig,
        _framebuffer: &FramebufferConfig,
    ) -> Result<()> {
        if context.client_api == ClientApi::NoApi {
            Ok(())
        } else {
            Err(Error::new(
                ErrorCode::ApiUnavailable,
                "the winit backend creates no rendering contexts; use ClientApi::NoApi",
            ))
        }
    }

    fn create_window(&mut self, window: WindowId, config: &NativeWindowConfig) -> Result<()> {
        let flags = config.flags;

        let mut builder = WindowBuilder::new()
            .with_title(config.title)
            .with_inner_size(logical_size(config.size))
            .with_visible(flags.contains(WindowFlags::VISIBLE))
            .with_resizable(flags.contains(WindowFlags::RESIZABLE))
            .with_decorations(flags.contains(WindowFlags::DECORATED))
            .with_transparent(flags.contains(WindowFlags::TRANSPARENT_FRAMEBUFFER))
            .with_always_on_top(flags.contains(WindowFlags::FLOATING))
            .with_maximized(flags.contains(WindowFlags::MAXIMIZED));

        if let Some(position) = config.position {
            builder = builder.with_position(logical_position(position));
        }

        if let Some(monitor) = config.monitor {
            builder = builder.with_fullscreen(self.fullscreen(monitor));
        }

        let native = builder
            .build(&self.event_loop)
            .map_err(|e| platform_error("failed to create window", e))?;

        if flags.contains(WindowFlags::MOUSE_PASSTHROUGH) {
            if let Err(e) = native.set_cursor_hittest(false) {
                log::warn!("mouse passthrough unavailable: {e}");
            }
        }

        let visible = flags.contains(WindowFlags::VISIBLE);
        if visible && flags.contains(WindowFlags::FOCUSED) {
            native.focus_window();
        }

        self.windows.ids.insert(native.id(), window);
        self.windows.windows.insert(
            window,
            NativeWindow {
                window: native,
                monitor: config.monitor,
                cursor_mode: CursorMode::Normal,
                cursor_pos: Point::origin(),
                raw_motion: false,
                focused: false,
                iconified: false,
                visible,
                hovered: false,
            },
        );

        Ok(())
    }

    fn destroy_window(&mut self, window: WindowId) {
        if let Some(state) = self.windows.windows.remove(&window) {
            self.windows.ids.remove(&state.window.id());
        }
    }

    fn set_window_title(&mut self, window: WindowId, title: &str) {
        if let Some(state) = self.window(window) {
            state.window.set_title(title);
        }
    }

    fn set_window_icon(&mut self, window: WindowId, images: &[Image]) -> Result<()> {
        let Some(state) = self.window(window) else {
            return Ok(());
        };

        // winit takes a single icon; the largest scales down best.
        let icon = match images.iter().max_by_key(|i| u64::from(i.width()) * u64::from(i.height())) {
            Some(image) => Some(
                Icon::from_rgba(image.pixels().to_vec(), image.width(), image.height())
                    .map_err(|e| Error::new(ErrorCode::InvalidValue, format!("invalid icon: {e}")))?,
            ),
            None => None,
        };

        state.window.set_window_icon(icon);
        Ok(())
    }

    fn window_pos(&self, window: WindowId) -> Point<i32, ScreenPx> {
        self.window(window)
            .and_then(|state| {
                let position = state.window.inner_position().ok()?;
                Some(to_screen_point(position, state.scale()))
            })
            .unwrap_or_else(Point::origin)
    }

    fn set_window_pos(&mut self, window: WindowId, position: Point<i32, ScreenPx>) {
        let Some(state) = self.window(window) else {
            return;
        };

        // winit positions the outer frame; offset by the frame's top-left.
        let frame = self.window_frame_size(window);
        state.window.set_outer_position(LogicalPosition::new(
            position.x - frame.left,
            position.y - frame.top,
        ));
    }

    fn window_size(&self, window: WindowId) -> Extent<i32, ScreenPx> {
        self.window(window).map_or(Extent::zero(), |state| {
            to_screen_size(state.window.inner_size(), state.scale())
        })
    }

    fn set_window_size(&mut self, window: WindowId, size: Extent<i32, ScreenPx>) {
        if let Some(state) = self.window(window) {
            state.window.set_inner_size(logical_size(size));
        }
    }

    fn set_window_size_limits(
        &mut self,
        window: WindowId,
        min: Option<Extent<i32, ScreenPx>>,
        max: Option<Extent<i32, ScreenPx>>,
    ) {
        if let Some(state) = self.window(window) {
            state.window.set_min_inner_size(min.map(logical_size));
            state.window.set_max_inner_size(max.map(logical_size));
        }
    }

    fn framebuffer_size(&self, window: WindowId) -> Extent<i32, Px> {
        self.window(window).map_or(Extent::zero(), |state| {
            to_framebuffer_size(state.window.inner_size())
        })
    }

    fn window_frame_size(&self, window: WindowId) -> FrameSize {
        let Some(state) = self.window(window) else {
            return FrameSize::default();
        };

        let scale = state.scale();
        let (Ok(outer), Ok(inner)) = (state.window.outer_position(), state.window.inner_position())
        else {
            return FrameSize::default();
        };

        let outer = to_screen_point(outer, scale);
        let inner = to_screen_point(inner, scale);
        let outer_size = to_screen_size(state.window.outer_size(), scale);
        let inner_size = to_screen_size(state.window.inner_size(), scale);

        let left = inner.x - outer.x;
        let top = inner.y - outer.y;
        FrameSize {
            left,
            top,
            right: outer_size.width - inner_size.width - left,
            bottom: outer_size.height - inner_size.height - top,
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn window_content_scale(&self, window: WindowId) -> (f32, f32) {
        self.window(window).map_or((1.0, 1.0), |state| {
            let scale = state.scale() as f32;
            (scale, scale)
        })
    }

    fn window_state(&self, window: WindowId) -> NativeWindowState {
        self.window(window)
            .map(|state| NativeWindowState {
                focused: state.focused,
                iconified: state.iconified,
                maximized: state.window.is_maximized(),
                visible: state.visible,
                hovered: state.hovered,
            })
            .unwrap_or_default()
    }

    fn iconify_window(&mut self, window: WindowId) {
        let Some(state) = self.windows.windows.get_mut(&window) else {
            return;
        };

        state.window.set_minimized(true);
        if !std::mem::replace(&mut state.iconified, true) {
            self.pending.push(PlatformEvent::Iconify {
                window,
                iconified: true,
            });
        }
    }

    fn restore_window(&mut self, window: WindowId) {
        let Some(state) = self.windows.windows.get_mut(&window) else {
            return;
        };

        if std::mem::replace(&mut state.iconified, false) {
            state.window.set_minimized(false);
            self.pending.push(PlatformEvent::Iconify {
                window,
                iconified: false,
            });
        } else if state.window.is_maximized() {
            state.window.set_maximized(false);
            self.pending.push(PlatformEvent::Maximize {
                window,
                maximized: false,
            });
        }
    }

    fn maximize_window(&mut self, window: WindowId) {
        let Some(state) = self.windows.windows.get(&window) else {
            return;
        };

        if !state.window.is_maximized() {
            state.window.set_maximized(true);
            self.pending.push(PlatformEvent::Maximize {
                window,
                maximized: true,
            });
        }
    }

    fn show_window(&mut self, window: WindowId) {
        if let Some(state) = self.window_mut(window) {
            state.window.set_visible(true);
            state.visible = true;
        }
    }

    fn hide_window(&mut self, window: WindowId) {
        if let Some(state) = self.window_mut(window) {
            state.window.set_visible(false);
            state.visible = false;
        }
    }

    fn focus_window(&mut self, window: WindowId) {
        if let Some(state) = self.window(window) {
            state.window.focus_window();
        }
    }

    fn request_window_attention(&mut self, window: WindowId) {
        if let Some(state) = self.window(window) {
            state
                .window
                .request_user_attention(Some(UserAttentionType::Informational));
        }
    }

    fn set_window_monitor(
        &mut self,
        window: WindowId,
        monitor: Option<NativeMonitor>,
        position: Point<i32, ScreenPx>,
        size: Extent<i32, ScreenPx>,
    ) {
        let fullscreen = monitor.and_then(|monitor| self.fullscreen(monitor));
        let Some(state) = self.window_mut(window) else {
            return;
        };

        state.monitor = monitor;
        state.window.set_fullscreen(fullscreen);

        if monitor.is_none() {
            state.window.set_inner_size(logical_size(size));
            state.window.set_outer_position(logical_position(position));
        }
    }

    fn set_window_flag(&mut self, window: WindowId, flag: WindowFlags, value: bool) {
        let Some(state) = self.window(window) else {
            return;
        };

        if flag == WindowFlags::DECORATED {
            state.window.set_decorations(value);
        } else if flag == WindowFlags::RESIZABLE {
            state.window.set_resizable(value);
        } else if flag == WindowFlags::FLOATING {
            state.window.set_always_on_top(value);
        } else if flag == WindowFlags::MOUSE_PASSTHROUGH {
            if let Err(e) = state.window.set_cursor_hittest(!value) {
                log::warn!("mouse passthrough unavailable: {e}");
            }
        }
    }

    fn window_handle(&self, window: WindowId) -> Result<RawWindowHandle> {
        self.window(window)
            .map(|state| state.window.raw_window_handle())
            .ok_or_else(|| Error::new(ErrorCode::PlatformError, "the window is gone"))
    }

    fn display_handle(&self) -> Result<RawDisplayHandle> {
        Ok(self.event_loop.raw_display_handle())
    }

    fn set_cursor_mode(&mut self, window: WindowId, mode: CursorMode) {
        let Some(state) = self.window_mut(window) else {
            return;
        };

        state.cursor_mode = mode;

        let (grab, fallback, visible) = match mode {
            CursorMode::Normal => (CursorGrabMode::None, CursorGrabMode::None, true),
            CursorMode::Hidden => (CursorGrabMode::None, CursorGrabMode::None, false),
            CursorMode::Disabled => (CursorGrabMode::Locked, CursorGrabMode::Confined, false),
            CursorMode::Captured => (CursorGrabMode::Confined, CursorGrabMode::Locked, true),
        };

        let grabbed = state
            .window
            .set_cursor_grab(grab)
            .or_else(|_| state.window.set_cursor_grab(fallback));
        if let Err(e) = grabbed {
            log::warn!("cursor grab for {mode:?} failed: {e}");
        }

        state.window.set_cursor_visible(visible);
    }

    fn cursor_pos(&self, window: WindowId) -> Point<f64, ScreenPx> {
        self.window(window)
            .map_or(Point::origin(), |state| state.cursor_pos)
    }

    fn set_cursor_pos(&mut self, window: WindowId, position: Point<f64, ScreenPx>) {
        let Some(state) = self.window_mut(window) else {
            return;
        };

        let target = LogicalPosition::new(position.x, position.y);
        match state.window.set_cursor_position(target) {
            Ok(()) => state.cursor_pos = position,
            Err(e) => log::warn!("failed to move the cursor: {e}"),
        }
    }

    fn raw_mouse_motion_supported(&self) -> bool {
        true
    }

    fn set_raw_mouse_motion(&mut self, window: WindowId, enabled: bool) {
        if let Some(state) = self.window_mut(window) {
            state.raw_motion = enabled;
        }
    }

    fn create_standard_cursor(&mut self, cursor: CursorId, shape: CursorShape) -> Result<()> {
        self.cursors.insert(cursor, cursor_icon(shape));
        Ok(())
    }

    fn destroy_cursor(&mut self, cursor: CursorId) {
        self.cursors.remove(&cursor);
    }

    fn set_window_cursor(&mut self, window: WindowId, cursor: Option<CursorId>) {
        let icon = cursor
            .and_then(|cursor| self.cursors.get(&cursor).copied())
            .unwrap_or_default();

        if let Some(state) = self.window(window) {
            state.window.set_cursor_icon(icon);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queued_events_end_a_wait() {
        let deadline = Instant::now() + Duration::from_secs(5);

        assert_eq!(Pump::Wait(None).with_queued(true), Pump::Poll);
        assert_eq!(Pump::Wait(Some(deadline)).with_queued(true), Pump::Poll);
        assert_eq!(Pump::Wait(Some(deadline)).with_queued(false), Pump::Wait(Some(deadline)));
        assert_eq!(Pump::Poll.with_queued(false), Pump::Poll);
    }
}
