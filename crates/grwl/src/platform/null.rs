//! A headless platform.
//!
//! [`NullPlatform`] keeps every native object in memory and never talks to a
//! window system, which makes it suitable for tests and for servers that link
//! the library without a display. The [`NullController`] returned alongside
//! it plays the part of the user and the window system: it injects events,
//! plugs in monitors and joysticks, toggles capabilities, and inspects what
//! the core asked the platform to do.

use std::{
    collections::{HashMap, HashSet},
    ptr,
    sync::Arc,
    time::Duration,
};

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use geometry::{Extent, Point, Px, Rect, ScreenPx};
use parking_lot::Mutex;

use super::{
    JoystickDescriptor, JoystickInput, MonitorDescriptor, NativeContext, NativeMonitor,
    NativeWindowConfig, NativeWindowState, Platform, PlatformEvent, PlatformKind, ProcAddress,
    Waker,
};
use crate::{
    context::{ClientApi, ContextConfig},
    cursor::{CursorId, CursorShape},
    error::{Error, ErrorCode, Result},
    hints::FramebufferConfig,
    image::Image,
    input::{CursorMode, Key},
    joystick::MAX_JOYSTICKS,
    monitor::{GammaRamp, VideoMode},
    window::{FrameSize, WindowFlags, WindowId},
};

const ALL_SHAPES: [CursorShape; 10] = [
    CursorShape::Arrow,
    CursorShape::IBeam,
    CursorShape::Crosshair,
    CursorShape::PointingHand,
    CursorShape::ResizeEw,
    CursorShape::ResizeNs,
    CursorShape::ResizeNwse,
    CursorShape::ResizeNesw,
    CursorShape::ResizeAll,
    CursorShape::NotAllowed,
];

/// Scancodes are key indices offset like X11 keycodes.
const SCANCODE_BASE: i32 = 8;

/// A simulated monitor.
#[derive(Clone, Debug)]
pub struct NullMonitor {
    pub name: String,
    pub primary: bool,
    pub position: Point<i32, ScreenPx>,
    pub modes: Vec<VideoMode>,
    /// The mode the monitor starts in, and returns to on restore.
    pub desktop_mode: VideoMode,
    pub content_scale: (f32, f32),
    pub gamma: GammaRamp,
}

impl NullMonitor {
    /// A 1920x1080 monitor with a handful of common modes and a linear gamma
    /// ramp.
    #[must_use]
    pub fn new(name: &str, primary: bool) -> Self {
        let mode = |width, height, refresh_rate| VideoMode {
            width,
            height,
            red_bits: 8,
            green_bits: 8,
            blue_bits: 8,
            refresh_rate,
        };

        let desktop_mode = mode(1920, 1080, 60);

        Self {
            name: name.to_owned(),
            primary,
            position: Point::origin(),
            modes: vec![
                mode(640, 480, 60),
                mode(1280, 720, 60),
                mode(1280, 720, 120),
                desktop_mode,
            ],
            desktop_mode,
            content_scale: (1.0, 1.0),
            gamma: GammaRamp::from_exponent(256, 1.0),
        }
    }
}

struct MonitorEntry {
    native: NativeMonitor,
    monitor: NullMonitor,
    current: VideoMode,
}

struct WindowEntry {
    title: String,
    position: Point<i32, ScreenPx>,
    size: Extent<i32, ScreenPx>,
    flags: WindowFlags,
    monitor: Option<NativeMonitor>,
    state: NativeWindowState,
    min_size: Option<Extent<i32, ScreenPx>>,
    max_size: Option<Extent<i32, ScreenPx>>,
    aspect_ratio: Option<(i32, i32)>,
    opacity: f32,
    cursor: Option<CursorId>,
    cursor_mode: CursorMode,
    cursor_pos: Point<f64, ScreenPx>,
    icon_count: usize,
}

struct State {
    initialized: bool,
    init_count: usize,
    terminate_count: usize,
    fail_next_init: bool,
    fail_next_make_current: bool,

    monitors: Vec<MonitorEntry>,
    next_monitor: u64,
    windows: HashMap<WindowId, WindowEntry>,
    cursors: HashSet<CursorId>,
    standard_shapes: Vec<CursorShape>,
    joysticks: HashMap<usize, (JoystickDescriptor, JoystickInput)>,

    context_support: bool,
    raw_motion_supported: bool,
    clipboard: String,
}

impl State {
    fn window(&mut self, window: WindowId) -> Option<&mut WindowEntry> {
        self.windows.get_mut(&window)
    }

    fn monitor(&self, native: NativeMonitor) -> Option<&MonitorEntry> {
        self.monitors.iter().find(|m| m.native == native)
    }

    fn monitor_mut(&mut self, native: NativeMonitor) -> Option<&mut MonitorEntry> {
        self.monitors.iter_mut().find(|m| m.native == native)
    }

    fn add_monitor(&mut self, monitor: NullMonitor) -> NativeMonitor {
        self.next_monitor += 1;
        let native = NativeMonitor(self.next_monitor);

        if monitor.primary {
            for entry in &mut self.monitors {
                entry.monitor.primary = false;
            }
        }

        self.monitors.push(MonitorEntry {
            native,
            current: monitor.desktop_mode,
            monitor,
        });
        native
    }
}

fn descriptor(entry: &MonitorEntry) -> MonitorDescriptor {
    MonitorDescriptor {
        native: entry.native,
        name: entry.monitor.name.clone(),
        physical_size: Extent::new(527, 296),
        primary: entry.monitor.primary,
    }
}

/// The headless platform. See the module documentation.
pub struct NullPlatform {
    state: Arc<Mutex<State>>,
    sender: Sender<PlatformEvent>,
    receiver: Receiver<PlatformEvent>,
}

impl NullPlatform {
    /// Creates the platform with one primary monitor named "Null Monitor".
    #[must_use]
    pub fn new() -> (Self, NullController) {
        let (sender, receiver) = channel::unbounded();

        let mut state = State {
            initialized: false,
            init_count: 0,
            terminate_count: 0,
            fail_next_init: false,
            fail_next_make_current: false,
            monitors: Vec::new(),
            next_monitor: 0,
            windows: HashMap::new(),
            cursors: HashSet::new(),
            standard_shapes: ALL_SHAPES.to_vec(),
            joysticks: HashMap::new(),
            context_support: true,
            raw_motion_supported: false,
            clipboard: String::new(),
        };
        state.add_monitor(NullMonitor::new("Null Monitor", true));

        let state = Arc::new(Mutex::new(state));

        let controller = NullController {
            state: state.clone(),
            sender: sender.clone(),
        };

        (
            Self {
                state,
                sender,
                receiver,
            },
            controller,
        )
    }

    fn with_window<R>(&self, window: WindowId, f: impl FnOnce(&mut WindowEntry) -> R) -> Option<R> {
        self.state.lock().window(window).map(f)
    }

    fn send(&self, event: PlatformEvent) {
        // The receiver lives as long as `self`.
        let _ = self.sender.send(event);
    }
}

impl Platform for NullPlatform {
    fn kind(&self) -> PlatformKind {
        PlatformKind::Null
    }

    fn mapping_name(&self) -> &str {
        "Null"
    }

    fn init(&mut self) -> Result<()> {
        let mut state = self.state.lock();
        if std::mem::take(&mut state.fail_next_init) {
            return Err(Error::new(
                ErrorCode::PlatformError,
                "simulated initialization failure",
            ));
        }

        state.initialized = true;
        state.init_count += 1;

        // Anything queued while down describes state that enumeration picks
        // up anyway.
        drop(state);
        while self.receiver.try_recv().is_ok() {}
        Ok(())
    }

    fn terminate(&mut self) {
        let mut state = self.state.lock();
        state.initialized = false;
        state.terminate_count += 1;
        state.windows.clear();
        state.cursors.clear();
    }

    fn waker(&self) -> Waker {
        let sender = self.sender.clone();
        Waker::new(move || {
            let _ = sender.send(PlatformEvent::Empty);
        })
    }

    fn poll_events(&mut self, events: &mut Vec<PlatformEvent>) {
        // Only what was queued before the call, so callbacks that queue more
        // events cannot keep the loop going forever.
        let pending = self.receiver.len();
        events.extend(self.receiver.try_iter().take(pending));
    }

    fn wait_events(&mut self, timeout: Option<Duration>, events: &mut Vec<PlatformEvent>) {
        let first = match timeout {
            Some(timeout) => match self.receiver.recv_timeout(timeout) {
                Ok(event) => event,
                Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => return,
            },
            None => match self.receiver.recv() {
                Ok(event) => event,
                Err(_) => return,
            },
        };

        events.push(first);
        self.poll_events(events);
    }

    fn monitors(&mut self) -> Vec<MonitorDescriptor> {
        self.state.lock().monitors.iter().map(descriptor).collect()
    }

    fn monitor_position(&self, monitor: NativeMonitor) -> Point<i32, ScreenPx> {
        self.state
            .lock()
            .monitor(monitor)
            .map_or(Point::origin(), |m| m.monitor.position)
    }

    fn monitor_workarea(&self, monitor: NativeMonitor) -> Rect<i32, ScreenPx> {
        let state = self.state.lock();
        let Some(entry) = state.monitor(monitor) else {
            return Rect::new(Point::origin(), Extent::zero());
        };

        Rect::new(
            entry.monitor.position,
            Extent::new(entry.current.width, entry.current.height),
        )
    }

    fn monitor_content_scale(&self, monitor: NativeMonitor) -> (f32, f32) {
        self.state
            .lock()
            .monitor(monitor)
            .map_or((1.0, 1.0), |m| m.monitor.content_scale)
    }

    fn video_modes(&mut self, monitor: NativeMonitor) -> Vec<VideoMode> {
        self.state
            .lock()
            .monitor(monitor)
            .map(|m| m.monitor.modes.clone())
            .unwrap_or_default()
    }

    fn current_video_mode(&self, monitor: NativeMonitor) -> Option<VideoMode> {
        self.state.lock().monitor(monitor).map(|m| m.current)
    }

    fn set_video_mode(&mut self, monitor: NativeMonitor, mode: &VideoMode) -> Result<()> {
        let mut state = self.state.lock();
        let entry = state.monitor_mut(monitor).ok_or_else(|| {
            Error::new(ErrorCode::PlatformError, "monitor is disconnected")
        })?;

        if !entry.monitor.modes.contains(mode) {
            return Err(Error::new(
                ErrorCode::PlatformError,
                format!("unsupported video mode {mode:?}"),
            ));
        }

        entry.current = *mode;
        Ok(())
    }

    fn restore_video_mode(&mut self, monitor: NativeMonitor) {
        if let Some(entry) = self.state.lock().monitor_mut(monitor) {
            entry.current = entry.monitor.desktop_mode;
        }
    }

    fn gamma_ramp(&self, monitor: NativeMonitor) -> Result<GammaRamp> {
        self.state
            .lock()
            .monitor(monitor)
            .map(|m| m.monitor.gamma.clone())
            .ok_or_else(|| Error::new(ErrorCode::PlatformError, "monitor is disconnected"))
    }

    fn set_gamma_ramp(&mut self, monitor: NativeMonitor, ramp: &GammaRamp) -> Result<()> {
        let mut state = self.state.lock();
        let entry = state.monitor_mut(monitor).ok_or_else(|| {
            Error::new(ErrorCode::PlatformError, "monitor is disconnected")
        })?;

        entry.monitor.gamma = ramp.clone();
        Ok(())
    }

    fn check_context_support(
        &self,
        context: &ContextConfig,
        _framebuffer: &FramebufferConfig,
    ) -> Result<()> {
        if context.client_api != ClientApi::NoApi && !self.state.lock().context_support {
            return Err(Error::new(
                ErrorCode::ApiUnavailable,
                format!("{:?} is disabled on this null platform", context.client_api),
            ));
        }

        Ok(())
    }

    fn create_window(&mut self, window: WindowId, config: &NativeWindowConfig) -> Result<()> {
        let mut state = self.state.lock();

        let position = match config.monitor {
            Some(monitor) => state
                .monitor(monitor)
                .map_or(Point::origin(), |m| m.monitor.position),
            None => config.position.unwrap_or_else(Point::origin),
        };

        let visible = config.flags.contains(WindowFlags::VISIBLE);
        let focused = visible && config.flags.contains(WindowFlags::FOCUSED);

        state.windows.insert(
            window,
            WindowEntry {
                title: config.title.to_owned(),
                position,
                size: config.size,
                flags: config.flags,
                monitor: config.monitor,
                state: NativeWindowState {
                    focused: false,
                    iconified: false,
                    maximized: config.flags.contains(WindowFlags::MAXIMIZED),
                    visible,
                    hovered: false,
                },
                min_size: None,
                max_size: None,
                aspect_ratio: None,
                opacity: 1.0,
                cursor: None,
                cursor_mode: CursorMode::Normal,
                cursor_pos: Point::origin(),
                icon_count: 0,
            },
        );
        drop(state);

        if focused {
            self.focus_window(window);
        }

        Ok(())
    }

    fn destroy_window(&mut self, window: WindowId) {
        self.state.lock().windows.remove(&window);
    }

    fn set_window_title(&mut self, window: WindowId, title: &str) {
        self.with_window(window, |w| w.title = title.to_owned());
    }

    fn set_window_icon(&mut self, window: WindowId, images: &[Image]) -> Result<()> {
        self.with_window(window, |w| w.icon_count = images.len());
        Ok(())
    }

    fn window_pos(&self, window: WindowId) -> Point<i32, ScreenPx> {
        self.with_window(window, |w| w.position)
            .unwrap_or_else(Point::origin)
    }

    fn set_window_pos(&mut self, window: WindowId, position: Point<i32, ScreenPx>) {
        self.with_window(window, |w| w.position = position);
    }

    fn window_size(&self, window: WindowId) -> Extent<i32, ScreenPx> {
        self.with_window(window, |w| w.size)
            .unwrap_or_else(Extent::zero)
    }

    fn set_window_size(&mut self, window: WindowId, size: Extent<i32, ScreenPx>) {
        self.with_window(window, |w| w.size = size);
    }

    fn set_window_size_limits(
        &mut self,
        window: WindowId,
        min: Option<Extent<i32, ScreenPx>>,
        max: Option<Extent<i32, ScreenPx>>,
    ) {
        self.with_window(window, |w| {
            w.min_size = min;
            w.max_size = max;
        });
    }

    fn set_window_aspect_ratio(&mut self, window: WindowId, ratio: Option<(i32, i32)>) {
        self.with_window(window, |w| w.aspect_ratio = ratio);
    }

    fn framebuffer_size(&self, window: WindowId) -> Extent<i32, Px> {
        geometry::to_framebuffer(self.window_size(window), (1.0, 1.0))
    }

    fn window_frame_size(&self, window: WindowId) -> FrameSize {
        let decorated = self
            .with_window(window, |w| {
                w.monitor.is_none() && w.flags.contains(WindowFlags::DECORATED)
            })
            .unwrap_or(false);

        if decorated {
            FrameSize {
                left: 1,
                top: 24,
                right: 1,
                bottom: 1,
            }
        } else {
            FrameSize::default()
        }
    }

    fn window_state(&self, window: WindowId) -> NativeWindowState {
        self.with_window(window, |w| w.state)
            .unwrap_or_default()
    }

    fn iconify_window(&mut self, window: WindowId) {
        let changed = self
            .with_window(window, |w| !std::mem::replace(&mut w.state.iconified, true))
            .unwrap_or(false);

        if changed {
            self.send(PlatformEvent::Iconify {
                window,
                iconified: true,
            });
        }
    }

    fn restore_window(&mut self, window: WindowId) {
        let changed = self
            .with_window(window, |w| {
                w.state.maximized = false;
                std::mem::replace(&mut w.state.iconified, false)
            })
            .unwrap_or(false);

        if changed {
            self.send(PlatformEvent::Iconify {
                window,
                iconified: false,
            });
        }
    }

    fn maximize_window(&mut self, window: WindowId) {
        let changed = self
            .with_window(window, |w| !std::mem::replace(&mut w.state.maximized, true))
            .unwrap_or(false);

        if changed {
            self.send(PlatformEvent::Maximize {
                window,
                maximized: true,
            });
        }
    }

    fn show_window(&mut self, window: WindowId) {
        self.with_window(window, |w| w.state.visible = true);
    }

    fn hide_window(&mut self, window: WindowId) {
        self.with_window(window, |w| {
            w.state.visible = false;
            w.state.focused = false;
        });
    }

    fn focus_window(&mut self, window: WindowId) {
        let mut state = self.state.lock();

        let mut lost = Vec::new();
        for (id, entry) in &mut state.windows {
            if *id != window && std::mem::replace(&mut entry.state.focused, false) {
                lost.push(*id);
            }
        }

        let gained = state
            .window(window)
            .map_or(false, |w| !std::mem::replace(&mut w.state.focused, true));
        drop(state);

        for id in lost {
            self.send(PlatformEvent::Focus {
                window: id,
                focused: false,
            });
        }

        if gained {
            self.send(PlatformEvent::Focus {
                window,
                focused: true,
            });
        }
    }

    fn set_window_monitor(
        &mut self,
        window: WindowId,
        monitor: Option<NativeMonitor>,
        position: Point<i32, ScreenPx>,
        size: Extent<i32, ScreenPx>,
    ) {
        let mut state = self.state.lock();
        let position = match monitor {
            Some(native) => state
                .monitor(native)
                .map_or(Point::origin(), |m| m.monitor.position),
            None => position,
        };

        if let Some(entry) = state.window(window) {
            entry.monitor = monitor;
            entry.position = position;
            entry.size = size;
        }
    }

    fn set_window_flag(&mut self, window: WindowId, flag: WindowFlags, value: bool) {
        self.with_window(window, |w| w.flags.set(flag, value));
    }

    fn window_opacity(&self, window: WindowId) -> f32 {
        self.with_window(window, |w| w.opacity).unwrap_or(1.0)
    }

    fn set_window_opacity(&mut self, window: WindowId, opacity: f32) -> Result<()> {
        self.with_window(window, |w| w.opacity = opacity);
        Ok(())
    }

    fn set_cursor_mode(&mut self, window: WindowId, mode: CursorMode) {
        self.with_window(window, |w| w.cursor_mode = mode);
    }

    fn cursor_pos(&self, window: WindowId) -> Point<f64, ScreenPx> {
        self.with_window(window, |w| w.cursor_pos)
            .unwrap_or_else(Point::origin)
    }

    fn set_cursor_pos(&mut self, window: WindowId, position: Point<f64, ScreenPx>) {
        self.with_window(window, |w| w.cursor_pos = position);
    }

    fn raw_mouse_motion_supported(&self) -> bool {
        self.state.lock().raw_motion_supported
    }

    fn create_standard_cursor(&mut self, cursor: CursorId, shape: CursorShape) -> Result<()> {
        let mut state = self.state.lock();
        if !state.standard_shapes.contains(&shape) {
            return Err(Error::new(
                ErrorCode::CursorUnavailable,
                format!("standard cursor {shape:?} is not available"),
            ));
        }

        state.cursors.insert(cursor);
        Ok(())
    }

    fn create_cursor(&mut self, cursor: CursorId, _image: &Image, _hotspot: Point<i32, Px>) -> Result<()> {
        self.state.lock().cursors.insert(cursor);
        Ok(())
    }

    fn destroy_cursor(&mut self, cursor: CursorId) {
        let mut state = self.state.lock();
        state.cursors.remove(&cursor);
        for window in state.windows.values_mut() {
            if window.cursor == Some(cursor) {
                window.cursor = None;
            }
        }
    }

    fn set_window_cursor(&mut self, window: WindowId, cursor: Option<CursorId>) {
        self.with_window(window, |w| w.cursor = cursor);
    }

    fn key_name(&self, _key: Key, scancode: i32) -> Option<String> {
        let index = usize::try_from(scancode - SCANCODE_BASE).ok()?;
        let name = match *Key::ALL.get(index)? {
            Key::Apostrophe => "'",
            Key::Comma => ",",
            Key::Minus | Key::KeypadSubtract => "-",
            Key::Period | Key::KeypadDecimal => ".",
            Key::Slash | Key::KeypadDivide => "/",
            Key::Semicolon => ";",
            Key::Equals | Key::KeypadEqual => "=",
            Key::LBracket => "[",
            Key::Backslash => "\\",
            Key::RBracket => "]",
            Key::Grave => "`",
            Key::KeypadMultiply => "*",
            Key::KeypadAdd => "+",
            key => return printable_name(key).map(str::to_owned),
        };

        Some(name.to_owned())
    }

    fn key_scancode(&self, key: Key) -> Option<i32> {
        let index = i32::try_from(key.index()?).ok()?;
        Some(index + SCANCODE_BASE)
    }

    fn set_clipboard_string(&mut self, text: &str) -> Result<()> {
        self.state.lock().clipboard = text.to_owned();
        Ok(())
    }

    fn clipboard_string(&mut self) -> Result<String> {
        Ok(self.state.lock().clipboard.clone())
    }

    fn create_context(
        &mut self,
        _window: WindowId,
        config: &ContextConfig,
        framebuffer: &FramebufferConfig,
        _share: Option<&Arc<dyn NativeContext>>,
    ) -> Result<Arc<dyn NativeContext>> {
        self.check_context_support(config, framebuffer)?;
        Ok(Arc::new(NullContext {
            state: self.state.clone(),
        }))
    }

    fn create_user_context(
        &mut self,
        _window: WindowId,
        _share: &Arc<dyn NativeContext>,
    ) -> Result<Arc<dyn NativeContext>> {
        Ok(Arc::new(NullContext {
            state: self.state.clone(),
        }))
    }

    fn joystick(&mut self, slot: usize) -> Option<JoystickDescriptor> {
        self.state
            .lock()
            .joysticks
            .get(&slot)
            .map(|(descriptor, _)| descriptor.clone())
    }

    fn poll_joystick(&mut self, slot: usize, input: &mut JoystickInput) -> bool {
        let state = self.state.lock();
        let Some((_, current)) = state.joysticks.get(&slot) else {
            return false;
        };

        input.clone_from(current);
        true
    }
}

/// Names of letter and digit keys.
fn printable_name(key: Key) -> Option<&'static str> {
    const LETTERS: &str = "abcdefghijklmnopqrstuvwxyz";
    const DIGITS: &str = "0123456789";

    let index = key.index()?;
    let offset = |first: Key| index.checked_sub(first.index()?);

    if let Some(i) = offset(Key::A).filter(|i| *i < 26) {
        return LETTERS.get(i..=i);
    }

    if let Some(i) = offset(Key::Key0).filter(|i| *i < 10) {
        return DIGITS.get(i..=i);
    }

    if let Some(i) = offset(Key::Keypad0).filter(|i| *i < 10) {
        return DIGITS.get(i..=i);
    }

    None
}

/// A context that accepts every operation and supports one extension,
/// `GL_ARB_null`.
struct NullContext {
    state: Arc<Mutex<State>>,
}

impl NativeContext for NullContext {
    fn make_current(&self) -> Result<()> {
        if std::mem::take(&mut self.state.lock().fail_next_make_current) {
            return Err(Error::new(
                ErrorCode::PlatformError,
                "context switch refused by the null platform",
            ));
        }

        Ok(())
    }

    fn make_non_current(&self) -> Result<()> {
        Ok(())
    }

    fn swap_buffers(&self) -> Result<()> {
        Ok(())
    }

    fn swap_interval(&self, _interval: i32) -> Result<()> {
        Ok(())
    }

    fn extension_supported(&self, extension: &str) -> bool {
        extension == "GL_ARB_null"
    }

    fn proc_address(&self, _name: &str) -> ProcAddress {
        ptr::null()
    }
}

/// Drives a [`NullPlatform`] from the outside. Cheap to clone and usable from
/// any thread.
#[derive(Clone)]
pub struct NullController {
    state: Arc<Mutex<State>>,
    sender: Sender<PlatformEvent>,
}

impl NullController {
    /// Queues an event for the next event processing call.
    pub fn send(&self, event: PlatformEvent) {
        let _ = self.sender.send(event);
    }

    /// Makes the next `init` fail with [`ErrorCode::PlatformError`].
    pub fn fail_next_init(&self) {
        self.state.lock().fail_next_init = true;
    }

    /// Makes the next native context switch fail with
    /// [`ErrorCode::PlatformError`].
    pub fn fail_next_make_current(&self) {
        self.state.lock().fail_next_make_current = true;
    }

    #[must_use]
    pub fn init_count(&self) -> usize {
        self.state.lock().init_count
    }

    #[must_use]
    pub fn terminate_count(&self) -> usize {
        self.state.lock().terminate_count
    }

    /// Plugs in a monitor. While the platform is initialized this also queues
    /// a connection event.
    pub fn connect_monitor(&self, monitor: NullMonitor) -> NativeMonitor {
        let mut state = self.state.lock();
        let native = state.add_monitor(monitor);

        if state.initialized {
            let event = state.monitor(native).map(descriptor);
            drop(state);
            if let Some(descriptor) = event {
                self.send(PlatformEvent::MonitorConnected(descriptor));
            }
        }

        native
    }

    pub fn disconnect_monitor(&self, native: NativeMonitor) {
        let mut state = self.state.lock();
        state.monitors.retain(|m| m.native != native);

        if state.initialized {
            drop(state);
            self.send(PlatformEvent::MonitorDisconnected(native));
        }
    }

    /// The gamma ramp of the monitor at `index`, in connection order.
    #[must_use]
    pub fn monitor_gamma(&self, index: usize) -> Option<GammaRamp> {
        self.state
            .lock()
            .monitors
            .get(index)
            .map(|m| m.monitor.gamma.clone())
    }

    /// The current video mode of the monitor at `index`, in connection order.
    #[must_use]
    pub fn current_mode(&self, index: usize) -> Option<VideoMode> {
        self.state.lock().monitors.get(index).map(|m| m.current)
    }

    #[must_use]
    pub fn window_count(&self) -> usize {
        self.state.lock().windows.len()
    }

    /// The flags as last applied by the core. Empty if the window does not
    /// exist.
    #[must_use]
    pub fn window_flags(&self, window: WindowId) -> WindowFlags {
        self.state
            .lock()
            .window(window)
            .map_or(WindowFlags::empty(), |w| w.flags)
    }

    #[must_use]
    pub fn size_limits(
        &self,
        window: WindowId,
    ) -> (Option<Extent<i32, ScreenPx>>, Option<Extent<i32, ScreenPx>>) {
        self.state
            .lock()
            .window(window)
            .map_or((None, None), |w| (w.min_size, w.max_size))
    }

    #[must_use]
    pub fn window_title(&self, window: WindowId) -> Option<String> {
        self.state.lock().window(window).map(|w| w.title.clone())
    }

    #[must_use]
    pub fn window_icon_count(&self, window: WindowId) -> usize {
        self.state.lock().window(window).map_or(0, |w| w.icon_count)
    }

    #[must_use]
    pub fn aspect_ratio(&self, window: WindowId) -> Option<(i32, i32)> {
        self.state.lock().window(window).and_then(|w| w.aspect_ratio)
    }

    /// The cursor mode as last applied by the core.
    #[must_use]
    pub fn cursor_mode(&self, window: WindowId) -> Option<CursorMode> {
        self.state.lock().window(window).map(|w| w.cursor_mode)
    }

    #[must_use]
    pub fn window_cursor(&self, window: WindowId) -> Option<CursorId> {
        self.state.lock().window(window).and_then(|w| w.cursor)
    }

    /// The native cursor position, which differs from the reported one while
    /// the cursor is disabled.
    #[must_use]
    pub fn cursor_pos(&self, window: WindowId) -> Point<f64, ScreenPx> {
        self.state
            .lock()
            .window(window)
            .map_or(Point::origin(), |w| w.cursor_pos)
    }

    /// Restricts which standard cursor shapes can be created.
    pub fn set_standard_cursors(&self, shapes: &[CursorShape]) {
        self.state.lock().standard_shapes = shapes.to_vec();
    }

    /// Whether windows with a rendering context can be created.
    pub fn set_context_support(&self, supported: bool) {
        self.state.lock().context_support = supported;
    }

    pub fn set_raw_motion_supported(&self, supported: bool) {
        self.state.lock().raw_motion_supported = supported;
    }

    /// Plugs a joystick into `slot`, replacing any joystick already there.
    /// Its controls start out centered and released.
    pub fn connect_joystick(&self, slot: usize, descriptor: JoystickDescriptor) {
        assert!(slot < MAX_JOYSTICKS, "invalid joystick slot {slot}");

        let input = JoystickInput {
            axes: vec![0.0; descriptor.axis_count],
            buttons: vec![false; descriptor.button_count],
            hats: vec![crate::joystick::Hat::empty(); descriptor.hat_count],
        };

        let mut state = self.state.lock();
        state.joysticks.insert(slot, (descriptor.clone(), input));

        if state.initialized {
            drop(state);
            self.send(PlatformEvent::JoystickConnected { slot, descriptor });
        }
    }

    pub fn disconnect_joystick(&self, slot: usize) {
        let mut state = self.state.lock();
        if state.joysticks.remove(&slot).is_some() && state.initialized {
            drop(state);
            self.send(PlatformEvent::JoystickDisconnected { slot });
        }
    }

    /// Replaces the raw state of the joystick in `slot`.
    pub fn set_joystick_input(&self, slot: usize, input: JoystickInput) {
        if let Some((_, current)) = self.state.lock().joysticks.get_mut(&slot) {
            *current = input;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::{hints::WindowHints, window::WindowAttrib, Library};

    #[test]
    fn poll_only_drains_what_was_queued() {
        let (mut platform, controller) = NullPlatform::new();
        platform.init().unwrap();

        controller.send(PlatformEvent::Empty);
        controller.send(PlatformEvent::KeyboardLayoutChanged);

        let mut events = Vec::new();
        platform.poll_events(&mut events);
        assert_eq!(events.len(), 2);

        events.clear();
        platform.poll_events(&mut events);
        assert!(events.is_empty());
    }

    #[test]
    fn key_names_follow_scancodes() {
        let (platform, _) = NullPlatform::new();

        let scancode = platform.key_scancode(Key::Q).unwrap();
        assert_eq!(platform.key_name(Key::Unknown, scancode).as_deref(), Some("q"));

        let scancode = platform.key_scancode(Key::Keypad7).unwrap();
        assert_eq!(platform.key_name(Key::Unknown, scancode).as_deref(), Some("7"));

        let scancode = platform.key_scancode(Key::F1).unwrap();
        assert_eq!(platform.key_name(Key::Unknown, scancode), None);
        assert_eq!(platform.key_scancode(Key::Unknown), None);
    }

    #[test]
    fn focus_moves_between_windows() {
        let (platform, controller) = NullPlatform::new();
        let mut lib = Library::new(platform);
        lib.init().unwrap();

        let hints = WindowHints::no_api();
        let a = lib.create_window(Extent::new(10, 10), "a", None, &hints).unwrap();
        let b = lib.create_window(Extent::new(10, 10), "b", None, &hints).unwrap();
        lib.poll_events().unwrap();
        assert!(lib.window_attrib(b, WindowAttrib::Focused).unwrap());

        lib.focus_window(a).unwrap();
        assert!(lib.window_attrib(a, WindowAttrib::Focused).unwrap());
        assert!(!lib.window_attrib(b, WindowAttrib::Focused).unwrap());

        // Hot-plugged monitors only announce themselves while initialized.
        lib.terminate();
        let native = controller.connect_monitor(NullMonitor::new("Side", false));
        lib.init().unwrap();
        assert_eq!(lib.monitors().unwrap().len(), 2);

        controller.disconnect_monitor(native);
        lib.poll_events().unwrap();
        assert_eq!(lib.monitors().unwrap().len(), 1);
    }
}
