//! Event processing.
//!
//! Callbacks only ever fire from inside [`Library::poll_events`] and the wait
//! variants, on the calling thread. Each raw event first updates the owning
//! window's input state and only then reaches the callback, so callbacks see
//! state that already reflects the event.

use std::time::Duration;

use geometry::{Point, Rect, ScreenPx};

use crate::{
    callbacks::{KeyEvent, MouseButtonEvent},
    error::{raise, ErrorCode, Result},
    input::{is_printable, ButtonState, CursorMode, Modifiers},
    platform::{PlatformEvent, Waker},
    window::{WindowFlags, WindowId},
    Library,
};

impl Library {
    /// Processes the events that are already queued, then returns. Never
    /// blocks.
    pub fn poll_events(&mut self) -> Result<()> {
        self.require_init()?;

        let mut events = std::mem::take(&mut self.events);
        self.platform.poll_events(&mut events);
        self.process(&mut events);
        self.events = events;
        Ok(())
    }

    /// Blocks until at least one event is queued, then processes the queue.
    pub fn wait_events(&mut self) -> Result<()> {
        self.require_init()?;
        self.wait(None)
    }

    /// Like [`Library::wait_events`], but gives up after `timeout` seconds.
    /// The timeout must be finite and non-negative.
    pub fn wait_events_timeout(&mut self, timeout: f64) -> Result<()> {
        self.require_init()?;

        if !timeout.is_finite() || timeout < 0.0 {
            return Err(raise(
                ErrorCode::InvalidValue,
                format!("invalid time {timeout}"),
            ));
        }

        self.wait(Some(Duration::from_secs_f64(timeout)))
    }

    fn wait(&mut self, timeout: Option<Duration>) -> Result<()> {
        let mut events = std::mem::take(&mut self.events);
        self.platform.wait_events(timeout, &mut events);
        self.process(&mut events);
        self.events = events;
        Ok(())
    }

    /// Wakes a thread blocked in one of the wait functions.
    pub fn post_empty_event(&self) -> Result<()> {
        self.require_init()?;
        self.platform.waker().wake();
        Ok(())
    }

    /// A handle that posts empty events from any thread.
    pub fn event_waker(&self) -> Result<Waker> {
        self.require_init()?;
        Ok(self.platform.waker())
    }

    fn process(&mut self, events: &mut Vec<PlatformEvent>) {
        for window in self.windows.iter_mut().map(|(_, w)| w) {
            window.input.scroll = geometry::Offset::zero();
        }

        for event in events.drain(..) {
            log::trace!("{event:?}");
            self.dispatch(event);
        }
    }

    pub(crate) fn dispatch(&mut self, event: PlatformEvent) {
        match event {
            PlatformEvent::Empty => {}
            PlatformEvent::Key {
                window,
                key,
                scancode,
                action,
                mods,
            } => self.input_key(window, key, scancode, action, mods),
            PlatformEvent::Char {
                window,
                codepoint,
                mods: _,
                plain,
            } => {
                if plain && is_printable(codepoint) && self.windows.contains(window) {
                    self.emit(window, |c| &mut c.char, codepoint);
                }
            }
            PlatformEvent::MouseButton {
                window,
                button,
                action,
                mods,
            } => {
                let Some(index) = button.index() else {
                    return;
                };
                let Some(state) = self.windows.get_mut(window) else {
                    return;
                };

                let action = match action {
                    ButtonState::Released => ButtonState::Released,
                    _ => ButtonState::Pressed,
                };

                state.input.record_button(index, action);
                let mods = state.input.filter_mods(mods);
                self.emit(
                    window,
                    |c| &mut c.mouse_button,
                    MouseButtonEvent {
                        button,
                        action,
                        mods,
                    },
                );
            }
            PlatformEvent::CursorPos { window, position } => self.input_cursor_pos(window, position),
            PlatformEvent::CursorMotion { window, delta } => {
                let Some(state) = self.windows.get(window) else {
                    return;
                };

                if state.input.cursor_mode == CursorMode::Disabled && state.input.raw_mouse_motion {
                    let position = state.input.cursor + delta;
                    self.report_cursor_pos(window, position);
                }
            }
            PlatformEvent::CursorEnter { window, entered } => {
                let Some(state) = self.windows.get_mut(window) else {
                    return;
                };

                state.input.entered = entered;
                self.emit(window, |c| &mut c.cursor_enter, entered);
            }
            PlatformEvent::Scroll { window, offset } => {
                let Some(state) = self.windows.get_mut(window) else {
                    return;
                };

                state.input.scroll += offset;
                self.emit(window, |c| &mut c.scroll, offset);
            }
            PlatformEvent::Moved { window, position } => {
                self.emit(window, |c| &mut c.pos, position);
            }
            PlatformEvent::Resized { window, size } => {
                self.emit(window, |c| &mut c.size, size);
            }
            PlatformEvent::FramebufferResized { window, size } => {
                self.emit(window, |c| &mut c.framebuffer_size, size);
            }
            PlatformEvent::CloseRequested { window } => {
                let Some(state) = self.windows.get(window) else {
                    return;
                };

                state.close.set(true);
                self.emit(window, |c| &mut c.close, ());
            }
            PlatformEvent::Refresh { window } => {
                self.emit(window, |c| &mut c.refresh, ());
            }
            PlatformEvent::Focus { window, focused } => self.input_focus(window, focused),
            PlatformEvent::Iconify { window, iconified } => {
                self.note_iconified(window, iconified);
                self.emit(window, |c| &mut c.iconify, iconified);
            }
            PlatformEvent::Maximize { window, maximized } => {
                self.emit(window, |c| &mut c.maximize, maximized);
            }
            PlatformEvent::ContentScale { window, scale } => {
                self.emit(window, |c| &mut c.content_scale, scale);
            }
            PlatformEvent::Drop { window, paths } => {
                self.emit(window, |c| &mut c.drop, paths);
            }
            PlatformEvent::MonitorConnected(descriptor) => self.monitor_connected(descriptor),
            PlatformEvent::MonitorDisconnected(native) => self.monitor_disconnected(native),
            PlatformEvent::JoystickConnected { slot, descriptor } => {
                self.joystick_connected(slot, descriptor);
            }
            PlatformEvent::JoystickDisconnected { slot } => self.joystick_disconnected(slot),
            PlatformEvent::KeyboardLayoutChanged => self.emit_keyboard_layout(),
        }
    }

    fn input_key(
        &mut self,
        window: WindowId,
        key: crate::input::Key,
        scancode: i32,
        action: ButtonState,
        mods: Modifiers,
    ) {
        let Some(state) = self.windows.get_mut(window) else {
            return;
        };

        let Some(action) = state.input.record_key(key, action) else {
            return;
        };

        let mods = state.input.filter_mods(mods);
        self.emit(
            window,
            |c| &mut c.key,
            KeyEvent {
                key,
                scancode,
                action,
                mods,
            },
        );
    }

    fn input_cursor_pos(&mut self, window: WindowId, position: Point<f64, ScreenPx>) {
        let Some(state) = self.windows.get_mut(window) else {
            return;
        };

        let position = match state.input.cursor_mode {
            CursorMode::Disabled => {
                if state.input.raw_mouse_motion {
                    // Raw motion arrives separately.
                    return;
                }

                let anchor = state.input.native_anchor.replace(position);
                let delta = anchor.map_or(geometry::Offset::zero(), |anchor| position - anchor);
                state.input.cursor + delta
            }
            CursorMode::Captured => {
                let size = self.platform.window_size(window).to_f64();
                Rect::new(Point::origin(), size).clamp(position)
            }
            CursorMode::Normal | CursorMode::Hidden => position,
        };

        self.report_cursor_pos(window, position);
    }

    fn report_cursor_pos(&mut self, window: WindowId, position: Point<f64, ScreenPx>) {
        let Some(state) = self.windows.get_mut(window) else {
            return;
        };

        if state.input.cursor == position {
            return;
        }

        state.input.cursor = position;
        self.emit(window, |c| &mut c.cursor_pos, position);
    }

    /// Delivers a focus change. On focus loss, every key and then every mouse
    /// button still held is released, after the focus callback has run.
    fn input_focus(&mut self, window: WindowId, focused: bool) {
        if !self.windows.contains(window) {
            return;
        }

        self.emit(window, |c| &mut c.focus, focused);

        if focused {
            return;
        }

        let Some(state) = self.windows.get(window) else {
            return;
        };

        let keys = state.input.pressed_keys();
        let buttons = state.input.pressed_buttons();
        let auto_iconify = state.monitor.is_some() && state.flags.contains(WindowFlags::AUTO_ICONIFY);

        for key in keys {
            if !self.windows.contains(window) {
                return;
            }

            let scancode = self.platform.key_scancode(key).unwrap_or(0);
            self.input_key(window, key, scancode, ButtonState::Released, Modifiers::empty());
        }

        for button in buttons {
            self.dispatch(PlatformEvent::MouseButton {
                window,
                button,
                action: ButtonState::Released,
                mods: Modifiers::empty(),
            });
        }

        if auto_iconify && self.windows.contains(window) {
            if let Err(e) = self.iconify_window(window) {
                log::warn!("failed to auto-iconify {window:?}: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::{cell::RefCell, rc::Rc, time::Instant};

    use geometry::{Extent, Offset};

    use crate::{
        hints::WindowHints,
        input::{Key, MouseButton},
        platform::null::{NullController, NullPlatform},
    };

    #[derive(Debug, PartialEq)]
    enum Seen {
        Focus(bool),
        Key(Key, ButtonState),
        Button(MouseButton, ButtonState),
        Char(char),
        Cursor(f64, f64),
    }

    fn library() -> (Library, NullController, WindowId, Rc<RefCell<Vec<Seen>>>) {
        let (platform, controller) = NullPlatform::new();
        let mut lib = Library::new(platform);
        lib.init().unwrap();

        let window = lib
            .create_window(Extent::new(200, 100), "events", None, &WindowHints::no_api())
            .unwrap();
        lib.poll_events().unwrap();

        let seen = Rc::new(RefCell::new(Vec::new()));

        let sink = seen.clone();
        lib.set_window_focus_callback(
            window,
            Some(Box::new(move |_: &mut Library, _: WindowId, focused: bool| {
                sink.borrow_mut().push(Seen::Focus(focused));
            })),
        )
        .unwrap();

        let sink = seen.clone();
        lib.set_key_callback(
            window,
            Some(Box::new(move |lib: &mut Library, window: WindowId, event: KeyEvent| {
                // State is updated before the callback runs.
                let state = lib.key(window, event.key).unwrap();
                assert_eq!(state.is_down(), event.action.is_down());
                sink.borrow_mut().push(Seen::Key(event.key, event.action));
            })),
        )
        .unwrap();

        let sink = seen.clone();
        lib.set_mouse_button_callback(
            window,
            Some(Box::new(
                move |_: &mut Library, _: WindowId, event: MouseButtonEvent| {
                    sink.borrow_mut().push(Seen::Button(event.button, event.action));
                },
            )),
        )
        .unwrap();

        let sink = seen.clone();
        lib.set_char_callback(
            window,
            Some(Box::new(move |_: &mut Library, _: WindowId, c: char| {
                sink.borrow_mut().push(Seen::Char(c));
            })),
        )
        .unwrap();

        let sink = seen.clone();
        lib.set_cursor_pos_callback(
            window,
            Some(Box::new(
                move |_: &mut Library, _: WindowId, p: Point<f64, ScreenPx>| {
                    sink.borrow_mut().push(Seen::Cursor(p.x, p.y));
                },
            )),
        )
        .unwrap();

        (lib, controller, window, seen)
    }

    fn key(window: WindowId, key: Key, action: ButtonState) -> PlatformEvent {
        PlatformEvent::Key {
            window,
            key,
            scancode: 0,
            action,
            mods: Modifiers::empty(),
        }
    }

    #[test]
    fn focus_loss_releases_held_input_after_focus_callback() {
        let (mut lib, controller, window, seen) = library();

        controller.send(key(window, Key::K, ButtonState::Pressed));
        controller.send(key(window, Key::LShift, ButtonState::Pressed));
        controller.send(PlatformEvent::MouseButton {
            window,
            button: MouseButton::Left,
            action: ButtonState::Pressed,
            mods: Modifiers::empty(),
        });
        controller.send(PlatformEvent::Focus {
            window,
            focused: false,
        });
        lib.poll_events().unwrap();

        assert_eq!(
            *seen.borrow(),
            vec![
                Seen::Key(Key::K, ButtonState::Pressed),
                Seen::Key(Key::LShift, ButtonState::Pressed),
                Seen::Button(MouseButton::Left, ButtonState::Pressed),
                Seen::Focus(false),
                Seen::Key(Key::K, ButtonState::Released),
                Seen::Key(Key::LShift, ButtonState::Released),
                Seen::Button(MouseButton::Left, ButtonState::Released),
            ]
        );

        assert_eq!(lib.key(window, Key::K).unwrap(), ButtonState::Released);
        assert_eq!(
            lib.mouse_button(window, MouseButton::Left).unwrap(),
            ButtonState::Released
        );
    }

    #[test]
    fn sticky_key_press_is_observed_once() {
        let (mut lib, controller, window, _) = library();
        lib.set_sticky_keys(window, true).unwrap();

        controller.send(key(window, Key::K, ButtonState::Pressed));
        controller.send(key(window, Key::K, ButtonState::Released));
        lib.poll_events().unwrap();

        assert_eq!(lib.key(window, Key::K).unwrap(), ButtonState::Pressed);
        assert_eq!(lib.key(window, Key::K).unwrap(), ButtonState::Released);
    }

    #[test]
    fn repeats_and_spurious_releases() {
        let (mut lib, controller, window, seen) = library();

        controller.send(key(window, Key::A, ButtonState::Released));
        controller.send(key(window, Key::A, ButtonState::Pressed));
        controller.send(key(window, Key::A, ButtonState::Pressed));
        controller.send(key(window, Key::A, ButtonState::Released));
        lib.poll_events().unwrap();

        assert_eq!(
            *seen.borrow(),
            vec![
                Seen::Key(Key::A, ButtonState::Pressed),
                Seen::Key(Key::A, ButtonState::Repeated(1)),
                Seen::Key(Key::A, ButtonState::Released),
            ]
        );
    }

    #[test]
    fn text_is_filtered() {
        let (mut lib, controller, window, seen) = library();

        for (codepoint, plain) in [('a', true), ('\u{7f}', true), ('c', false), ('é', true)] {
            controller.send(PlatformEvent::Char {
                window,
                codepoint,
                mods: Modifiers::empty(),
                plain,
            });
        }
        lib.poll_events().unwrap();

        assert_eq!(*seen.borrow(), vec![Seen::Char('a'), Seen::Char('é')]);
    }

    #[test]
    fn lock_mods_are_only_reported_on_request() {
        let (mut lib, controller, window, _) = library();

        let mods = Rc::new(RefCell::new(Vec::new()));
        let sink = mods.clone();
        lib.set_key_callback(
            window,
            Some(Box::new(move |_: &mut Library, _: WindowId, event: KeyEvent| {
                sink.borrow_mut().push(event.mods);
            })),
        )
        .unwrap();

        let event = |action| PlatformEvent::Key {
            window,
            key: Key::Q,
            scancode: 24,
            action,
            mods: Modifiers::CONTROL | Modifiers::CAPS_LOCK,
        };

        controller.send(event(ButtonState::Pressed));
        controller.send(event(ButtonState::Released));
        lib.poll_events().unwrap();

        lib.set_lock_key_mods(window, true).unwrap();
        controller.send(event(ButtonState::Pressed));
        lib.poll_events().unwrap();

        assert_eq!(
            *mods.borrow(),
            vec![
                Modifiers::CONTROL,
                Modifiers::CONTROL,
                Modifiers::CONTROL | Modifiers::CAPS_LOCK,
            ]
        );
    }

    #[test]
    fn disabled_cursor_reports_virtual_positions() {
        let (mut lib, controller, window, seen) = library();

        controller.send(PlatformEvent::CursorPos {
            window,
            position: Point::new(50.0, 40.0),
        });
        lib.poll_events().unwrap();

        lib.set_cursor_mode(window, CursorMode::Disabled).unwrap();
        // The platform centers the cursor; motion is relative to the center.
        assert_eq!(controller.cursor_pos(window), Point::new(100.0, 50.0));

        for position in [Point::new(90.0, 50.0), Point::new(-500.0, 50.0)] {
            controller.send(PlatformEvent::CursorPos { window, position });
        }
        lib.poll_events().unwrap();

        assert_eq!(
            lib.cursor_pos(window).unwrap(),
            Point::new(50.0 - 10.0 - 590.0, 40.0)
        );

        lib.set_cursor_mode(window, CursorMode::Normal).unwrap();
        assert_eq!(controller.cursor_pos(window), Point::new(50.0, 40.0));

        assert_eq!(
            *seen.borrow(),
            vec![
                Seen::Cursor(50.0, 40.0),
                Seen::Cursor(40.0, 40.0),
                Seen::Cursor(-550.0, 40.0),
            ]
        );
    }

    #[test]
    fn raw_motion_drives_disabled_cursor() {
        let (mut lib, controller, window, seen) = library();

        let err = lib.set_raw_mouse_motion(window, true).unwrap_err();
        assert_eq!(err.code(), ErrorCode::PlatformError);

        controller.set_raw_motion_supported(true);
        lib.set_raw_mouse_motion(window, true).unwrap();
        lib.set_cursor_mode(window, CursorMode::Disabled).unwrap();
        let start = lib.cursor_pos(window).unwrap();

        controller.send(PlatformEvent::CursorPos {
            window,
            position: Point::new(0.0, 0.0),
        });
        controller.send(PlatformEvent::CursorMotion {
            window,
            delta: Offset::new(3.0, -4.0),
        });
        lib.poll_events().unwrap();

        let expected = start + Offset::new(3.0, -4.0);
        assert_eq!(lib.cursor_pos(window).unwrap(), expected);
        assert_eq!(*seen.borrow(), vec![Seen::Cursor(expected.x, expected.y)]);
    }

    #[test]
    fn captured_cursor_is_clamped() {
        let (mut lib, controller, window, seen) = library();
        lib.set_cursor_mode(window, CursorMode::Captured).unwrap();

        controller.send(PlatformEvent::CursorPos {
            window,
            position: Point::new(250.0, -3.0),
        });
        lib.poll_events().unwrap();

        assert_eq!(*seen.borrow(), vec![Seen::Cursor(200.0, 0.0)]);
    }

    #[test]
    fn scroll_accumulates_per_pass() {
        let (mut lib, controller, window, _) = library();

        for dy in [1.0, 2.5] {
            controller.send(PlatformEvent::Scroll {
                window,
                offset: Offset::new(0.0, dy),
            });
        }
        lib.poll_events().unwrap();
        assert_eq!(lib.scroll_offset(window).unwrap(), Offset::new(0.0, 3.5));

        lib.poll_events().unwrap();
        assert_eq!(lib.scroll_offset(window).unwrap(), Offset::zero());
    }

    #[test]
    fn callbacks_stop_after_destroy() {
        let (mut lib, controller, window, seen) = library();

        lib.set_window_focus_callback(
            window,
            Some(Box::new(|lib: &mut Library, window: WindowId, _: bool| {
                lib.destroy_window(window).unwrap();
            })),
        )
        .unwrap();

        controller.send(key(window, Key::Z, ButtonState::Pressed));
        controller.send(PlatformEvent::Focus {
            window,
            focused: false,
        });
        controller.send(key(window, Key::Y, ButtonState::Pressed));
        lib.poll_events().unwrap();

        assert_eq!(*seen.borrow(), vec![Seen::Key(Key::Z, ButtonState::Pressed)]);
    }

    #[test]
    fn wait_respects_timeout_and_wakeups() {
        let (mut lib, _, _, _) = library();

        let err = lib.wait_events_timeout(-1.0).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidValue);
        let err = lib.wait_events_timeout(f64::INFINITY).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidValue);

        let start = Instant::now();
        lib.wait_events_timeout(0.05).unwrap();
        assert!(start.elapsed() >= Duration::from_millis(50));

        let waker = lib.event_waker().unwrap();
        let poster = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            waker.wake();
        });

        let start = Instant::now();
        lib.wait_events_timeout(10.0).unwrap();
        assert!(start.elapsed() < Duration::from_secs(10));
        poster.join().unwrap();
    }
}
