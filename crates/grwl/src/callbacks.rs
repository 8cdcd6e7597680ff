//! Typed callback registry.
//!
//! There is one slot per event kind. Window slots are keyed by window and
//! dropped when the window is destroyed. Every setter returns the callback it
//! replaced so callers can chain or restore handlers.
//!
//! Callbacks receive the library mutably and may call back into it, including
//! replacing their own slot or destroying their window. A callback replaced
//! while it runs is handed back as a forwarder to the same closure, so
//! chaining works from inside callbacks too. A callback is never re-entered;
//! nested dispatch to a running callback is dropped.

use std::{cell::RefCell, collections::HashMap, path::PathBuf, rc::Rc};

use geometry::{Extent, Offset, Point, Px, ScreenPx};

use crate::{
    error::Result,
    input::{ButtonState, Key, Modifiers, MouseButton},
    joystick::JoystickEvent,
    monitor::{MonitorEvent, MonitorId},
    window::WindowId,
    Library,
};

pub type WindowCallback<E> = Box<dyn FnMut(&mut Library, WindowId, E)>;
pub type MonitorCallback = Box<dyn FnMut(&mut Library, MonitorId, MonitorEvent)>;
pub type JoystickCallback = Box<dyn FnMut(&mut Library, usize, JoystickEvent)>;
pub type KeyboardLayoutCallback = Box<dyn FnMut(&mut Library)>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: Key,
    /// Platform-specific, layout-independent key code.
    pub scancode: i32,
    pub action: ButtonState,
    pub mods: Modifiers,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MouseButtonEvent {
    pub button: MouseButton,
    pub action: ButtonState,
    pub mods: Modifiers,
}

/// A callback that can stand in for a shared one.
pub(crate) trait Forward: Sized + 'static {
    fn forward(shared: Rc<RefCell<Self>>) -> Self;
}

impl<A: 'static, B: 'static> Forward for Box<dyn FnMut(&mut Library, A, B)> {
    fn forward(shared: Rc<RefCell<Self>>) -> Self {
        Box::new(move |lib: &mut Library, a: A, b: B| {
            if let Ok(mut callback) = shared.try_borrow_mut() {
                (*callback)(lib, a, b);
            }
        })
    }
}

impl Forward for KeyboardLayoutCallback {
    fn forward(shared: Rc<RefCell<Self>>) -> Self {
        Box::new(move |lib: &mut Library| {
            if let Ok(mut callback) = shared.try_borrow_mut() {
                (*callback)(lib);
            }
        })
    }
}

pub(crate) struct Slot<F> {
    /// Shared with the dispatcher while the callback runs.
    callback: Option<Rc<RefCell<F>>>,
}

impl<F> Default for Slot<F> {
    fn default() -> Self {
        Self { callback: None }
    }
}

impl<F: Forward> Slot<F> {
    pub fn replace(&mut self, callback: Option<F>) -> Option<F> {
        let previous = std::mem::replace(
            &mut self.callback,
            callback.map(|callback| Rc::new(RefCell::new(callback))),
        )?;

        Some(match Rc::try_unwrap(previous) {
            Ok(callback) => callback.into_inner(),
            Err(running) => F::forward(running),
        })
    }
}

impl<F> Slot<F> {
    fn get(&self) -> Option<Rc<RefCell<F>>> {
        self.callback.clone()
    }
}

#[derive(Default)]
pub(crate) struct WindowCallbacks {
    pub pos: Slot<WindowCallback<Point<i32, ScreenPx>>>,
    pub size: Slot<WindowCallback<Extent<i32, ScreenPx>>>,
    pub close: Slot<WindowCallback<()>>,
    pub refresh: Slot<WindowCallback<()>>,
    pub focus: Slot<WindowCallback<bool>>,
    pub iconify: Slot<WindowCallback<bool>>,
    pub maximize: Slot<WindowCallback<bool>>,
    pub framebuffer_size: Slot<WindowCallback<Extent<i32, Px>>>,
    pub content_scale: Slot<WindowCallback<(f32, f32)>>,
    pub key: Slot<WindowCallback<KeyEvent>>,
    pub char: Slot<WindowCallback<char>>,
    pub mouse_button: Slot<WindowCallback<MouseButtonEvent>>,
    pub cursor_pos: Slot<WindowCallback<Point<f64, ScreenPx>>>,
    pub cursor_enter: Slot<WindowCallback<bool>>,
    pub scroll: Slot<WindowCallback<Offset<f64, ScreenPx>>>,
    pub drop: Slot<WindowCallback<Vec<PathBuf>>>,
}

#[derive(Default)]
pub(crate) struct CallbackRegistry {
    pub windows: HashMap<WindowId, WindowCallbacks>,
    pub monitor: Slot<MonitorCallback>,
    pub joystick: Slot<JoystickCallback>,
    pub keyboard_layout: Slot<KeyboardLayoutCallback>,
}

impl CallbackRegistry {
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

type Select<E> = fn(&mut WindowCallbacks) -> &mut Slot<WindowCallback<E>>;

impl Library {
    /// Invokes a window callback, if one is set.
    pub(crate) fn emit<E>(&mut self, window: WindowId, select: Select<E>, event: E) {
        let Some(shared) = self
            .callbacks
            .windows
            .get_mut(&window)
            .and_then(|slots| select(slots).get())
        else {
            return;
        };

        // The local handle keeps the closure alive if it destroys its window.
        if let Ok(mut callback) = shared.try_borrow_mut() {
            (*callback)(self, window, event);
        } else {
            log::trace!("skipped re-entrant callback for {window:?}");
        };
    }

    pub(crate) fn emit_monitor(&mut self, monitor: MonitorId, event: MonitorEvent) {
        if let Some(shared) = self.callbacks.monitor.get() {
            if let Ok(mut callback) = shared.try_borrow_mut() {
                (*callback)(self, monitor, event);
            }
        }
    }

    pub(crate) fn emit_joystick(&mut self, slot: usize, event: JoystickEvent) {
        if let Some(shared) = self.callbacks.joystick.get() {
            if let Ok(mut callback) = shared.try_borrow_mut() {
                (*callback)(self, slot, event);
            }
        }
    }

    pub(crate) fn emit_keyboard_layout(&mut self) {
        if let Some(shared) = self.callbacks.keyboard_layout.get() {
            if let Ok(mut callback) = shared.try_borrow_mut() {
                (*callback)(self);
            }
        }
    }

    fn window_callbacks(&mut self, window: WindowId) -> Result<&mut WindowCallbacks> {
        self.window(window)?;
        Ok(self.callbacks.windows.entry(window).or_default())
    }

    /// Sets the joystick connection callback and returns the previous one.
    pub fn set_joystick_callback(
        &mut self,
        callback: Option<JoystickCallback>,
    ) -> Result<Option<JoystickCallback>> {
        self.require_init()?;
        Ok(self.callbacks.joystick.replace(callback))
    }

    /// Sets the callback for keyboard layout changes and returns the previous
    /// one. Key names may change when the layout does.
    pub fn set_keyboard_layout_callback(
        &mut self,
        callback: Option<KeyboardLayoutCallback>,
    ) -> Result<Option<KeyboardLayoutCallback>> {
        self.require_init()?;
        Ok(self.callbacks.keyboard_layout.replace(callback))
    }
}

macro_rules! window_callback_setters {
    ($($(#[$meta:meta])* $setter:ident => $field:ident: $event:ty,)*) => {
        impl Library {
            $(
                $(#[$meta])*
                ///
                /// Returns the previous callback.
                pub fn $setter(
                    &mut self,
                    window: WindowId,
                    callback: Option<WindowCallback<$event>>,
                ) -> Result<Option<WindowCallback<$event>>> {
                    Ok(self.window_callbacks(window)?.$field.replace(callback))
                }
            )*
        }
    };
}

window_callback_setters! {
    /// Called when the window is moved, with the new position of the content
    /// area.
    set_window_pos_callback => pos: Point<i32, ScreenPx>,
    /// Called when the content area is resized, in screen coordinates.
    set_window_size_callback => size: Extent<i32, ScreenPx>,
    /// Called when the user asks to close the window. The close flag is
    /// already set; the callback may clear it.
    set_window_close_callback => close: (),
    /// Called when the content area needs to be redrawn.
    set_window_refresh_callback => refresh: (),
    set_window_focus_callback => focus: bool,
    set_window_iconify_callback => iconify: bool,
    set_window_maximize_callback => maximize: bool,
    /// Called when the framebuffer is resized, in pixels.
    set_framebuffer_size_callback => framebuffer_size: Extent<i32, Px>,
    set_window_content_scale_callback => content_scale: (f32, f32),
    /// Called for physical key presses, repeats and releases.
    set_key_callback => key: KeyEvent,
    /// Called with text input, after keyboard layout and input method
    /// processing.
    set_char_callback => char: char,
    set_mouse_button_callback => mouse_button: MouseButtonEvent,
    /// Called when the cursor moves, with its position relative to the
    /// content area.
    set_cursor_pos_callback => cursor_pos: Point<f64, ScreenPx>,
    set_cursor_enter_callback => cursor_enter: bool,
    set_scroll_callback => scroll: Offset<f64, ScreenPx>,
    /// Called when paths are dropped on the window.
    set_drop_callback => drop: Vec<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::{cell::RefCell, rc::Rc};

    use crate::platform::null::NullPlatform;

    fn counter(count: &Rc<RefCell<u32>>, step: u32) -> KeyboardLayoutCallback {
        let count = count.clone();
        Box::new(move |_: &mut Library| *count.borrow_mut() += step)
    }

    #[test]
    fn slot_returns_previous() {
        let (platform, _controller) = NullPlatform::new();
        let mut lib = Library::new(platform);
        let count = Rc::new(RefCell::new(0));

        let mut slot: Slot<KeyboardLayoutCallback> = Slot::default();
        assert!(slot.replace(Some(counter(&count, 1))).is_none());
        let mut previous = slot.replace(Some(counter(&count, 10))).unwrap();

        previous(&mut lib);
        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn running_callback_is_handed_back() {
        let (platform, _controller) = NullPlatform::new();
        let mut lib = Library::new(platform);
        let count = Rc::new(RefCell::new(0));

        let mut slot: Slot<KeyboardLayoutCallback> = Slot::default();
        slot.replace(Some(counter(&count, 1)));

        // Held the way the dispatcher holds it during a call.
        let running = slot.get().unwrap();
        let mut previous = slot.replace(None).unwrap();
        assert!(slot.get().is_none());
        drop(running);

        previous(&mut lib);
        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn window_callbacks_can_replace_themselves() {
        use geometry::Extent;

        use crate::{hints::WindowHints, platform::null::NullPlatform, PlatformEvent};

        let (platform, controller) = NullPlatform::new();
        let mut lib = Library::new(platform);
        lib.init().unwrap();
        let window = lib
            .create_window(Extent::new(64, 64), "cb", None, &WindowHints::no_api())
            .unwrap();

        let calls = Rc::new(RefCell::new(Vec::new()));
        let sink = calls.clone();
        lib.set_window_refresh_callback(
            window,
            Some(Box::new(move |lib: &mut Library, window: WindowId, _: ()| {
                sink.borrow_mut().push("first");
                let sink = sink.clone();
                lib.set_window_refresh_callback(
                    window,
                    Some(Box::new(move |_: &mut Library, _: WindowId, _: ()| {
                        sink.borrow_mut().push("second");
                    })),
                )
                .unwrap();
            })),
        )
        .unwrap();

        controller.send(PlatformEvent::Refresh { window });
        controller.send(PlatformEvent::Refresh { window });
        lib.poll_events().unwrap();

        assert_eq!(*calls.borrow(), vec!["first", "second"]);
    }

    #[test]
    fn callbacks_can_wrap_themselves() {
        use std::cell::Cell;

        use geometry::Extent;

        use crate::{hints::WindowHints, PlatformEvent};

        let (platform, controller) = NullPlatform::new();
        let mut lib = Library::new(platform);
        lib.init().unwrap();
        let window = lib
            .create_window(Extent::new(64, 64), "cb", None, &WindowHints::no_api())
            .unwrap();

        let calls = Rc::new(RefCell::new(Vec::new()));
        let wrapped = Rc::new(Cell::new(false));
        let sink = calls.clone();
        lib.set_window_refresh_callback(
            window,
            Some(Box::new(move |lib: &mut Library, window: WindowId, _: ()| {
                sink.borrow_mut().push("inner");
                if wrapped.replace(true) {
                    return;
                }

                let mut inner = lib
                    .set_window_refresh_callback(window, None)
                    .unwrap()
                    .expect("running callback is returned");
                let sink = sink.clone();
                lib.set_window_refresh_callback(
                    window,
                    Some(Box::new(move |lib: &mut Library, window: WindowId, _: ()| {
                        sink.borrow_mut().push("outer");
                        inner(lib, window, ());
                    })),
                )
                .unwrap();
            })),
        )
        .unwrap();

        controller.send(PlatformEvent::Refresh { window });
        controller.send(PlatformEvent::Refresh { window });
        lib.poll_events().unwrap();

        assert_eq!(*calls.borrow(), vec!["inner", "outer", "inner"]);
    }
}
