//! Feeds window input to an immediate-mode GUI.
//!
//! [`GuiBridge`] hooks a window's mouse button, scroll and text callbacks and
//! collects what arrives between frames. Each frame, [`GuiBridge::new_frame`]
//! folds that together with the window's live state into a [`GuiInput`]
//! snapshot in the shape immediate-mode GUIs expect.

mod click;

pub use click::{ClickTracker, DOUBLE_CLICK_MAX, DOUBLE_CLICK_MIN};

use std::{cell::RefCell, collections::HashMap, path::PathBuf, rc::Rc};

use geometry::{Extent, Offset, Point, ScreenPx};
use grwl::{
    ButtonState, CursorId, CursorMode, CursorShape, Key, Library, Modifiers, MouseButton,
    MouseButtonEvent, Result, WindowAttrib, WindowId,
};

/// Buttons reported to the GUI: left, right, middle and two extra.
pub const BUTTONS: usize = 5;

/// Used as the first frame's delta time.
const DEFAULT_DELTA: f32 = 1.0 / 60.0;

/// Input for one GUI frame.
#[derive(Clone, Debug, PartialEq)]
pub struct GuiInput {
    pub display_size: Extent<f32, ScreenPx>,
    /// Framebuffer pixels per screen coordinate.
    pub framebuffer_scale: (f32, f32),
    /// Seconds since the previous frame.
    pub delta_time: f32,
    /// `None` while the window is unfocused.
    pub cursor: Option<Point<f32, ScreenPx>>,
    /// Held now, or pressed at any point since the previous frame.
    pub buttons: [bool; BUTTONS],
    pub double_clicked: [bool; BUTTONS],
    pub wheel: Offset<f32, ScreenPx>,
    pub mods: Modifiers,
    pub focused: bool,
    pub text: String,
    pub dropped: Vec<PathBuf>,
}

struct Pending {
    clicks: ClickTracker,
    pressed: [bool; BUTTONS],
    double_clicked: [bool; BUTTONS],
    wheel: Offset<f64, ScreenPx>,
    text: String,
    dropped: Vec<PathBuf>,
}

impl Default for Pending {
    fn default() -> Self {
        Self {
            clicks: ClickTracker::new(),
            pressed: [false; BUTTONS],
            double_clicked: [false; BUTTONS],
            wheel: Offset::zero(),
            text: String::new(),
            dropped: Vec::new(),
        }
    }
}

/// Connects one window to a GUI.
pub struct GuiBridge {
    window: WindowId,
    pending: Rc<RefCell<Pending>>,
    last_frame: Option<f64>,
    cursors: HashMap<CursorShape, CursorId>,
    cursor_shape: Option<CursorShape>,
}

impl GuiBridge {
    /// Installs the bridge's callbacks on `window`. Callbacks already set on
    /// the window keep running after the bridge's own.
    pub fn attach(lib: &mut Library, window: WindowId) -> Result<Self> {
        let pending = Rc::new(RefCell::new(Pending::default()));

        let sink = pending.clone();
        let mut previous = lib.set_mouse_button_callback(window, None)?;
        lib.set_mouse_button_callback(
            window,
            Some(Box::new(move |lib: &mut Library, window: WindowId, event: MouseButtonEvent| {
                if event.action == ButtonState::Pressed {
                    let time = lib.time().unwrap_or_default();
                    let mut pending = sink.borrow_mut();

                    if let Some(index) = event.button.index().filter(|i| *i < BUTTONS) {
                        pending.pressed[index] = true;
                        if pending.clicks.press(event.button, time) {
                            pending.double_clicked[index] = true;
                        }
                    }
                }

                if let Some(previous) = &mut previous {
                    previous(lib, window, event);
                }
            })),
        )?;

        let sink = pending.clone();
        let mut previous = lib.set_scroll_callback(window, None)?;
        lib.set_scroll_callback(
            window,
            Some(Box::new(move |lib: &mut Library, window: WindowId, offset: Offset<f64, ScreenPx>| {
                sink.borrow_mut().wheel += offset;

                if let Some(previous) = &mut previous {
                    previous(lib, window, offset);
                }
            })),
        )?;

        let sink = pending.clone();
        let mut previous = lib.set_char_callback(window, None)?;
        lib.set_char_callback(
            window,
            Some(Box::new(move |lib: &mut Library, window: WindowId, c: char| {
                sink.borrow_mut().text.push(c);

                if let Some(previous) = &mut previous {
                    previous(lib, window, c);
                }
            })),
        )?;

        let sink = pending.clone();
        let mut previous = lib.set_drop_callback(window, None)?;
        lib.set_drop_callback(
            window,
            Some(Box::new(move |lib: &mut Library, window: WindowId, paths: Vec<PathBuf>| {
                sink.borrow_mut().dropped.extend(paths.iter().cloned());

                if let Some(previous) = &mut previous {
                    previous(lib, window, paths);
                }
            })),
        )?;

        log::debug!("GUI bridge attached to {window:?}");

        Ok(Self {
            window,
            pending,
            last_frame: None,
            cursors: HashMap::new(),
            cursor_shape: Some(CursorShape::Arrow),
        })
    }

    #[must_use]
    pub fn window(&self) -> WindowId {
        self.window
    }

    /// Collects input for the next GUI frame. Call once per frame, after
    /// processing events.
    pub fn new_frame(&mut self, lib: &mut Library) -> Result<GuiInput> {
        let window = self.window;

        let now = lib.time()?;
        #[allow(clippy::cast_possible_truncation)]
        let delta_time = match self.last_frame.replace(now) {
            Some(last) if now > last => (now - last) as f32,
            _ => DEFAULT_DELTA,
        };

        let size = lib.window_size(window)?;
        let framebuffer = lib.framebuffer_size(window)?;
        #[allow(clippy::cast_precision_loss)]
        let framebuffer_scale = if size.width > 0 && size.height > 0 {
            (
                framebuffer.width as f32 / size.width as f32,
                framebuffer.height as f32 / size.height as f32,
            )
        } else {
            (1.0, 1.0)
        };

        let focused = lib.window_attrib(window, WindowAttrib::Focused)?;
        #[allow(clippy::cast_possible_truncation)]
        let cursor = if focused {
            let position = lib.cursor_pos(window)?;
            Some(Point::new(position.x as f32, position.y as f32))
        } else {
            None
        };

        let mut pending = std::mem::take(&mut *self.pending.borrow_mut());
        // The click history outlives the frame.
        self.pending.borrow_mut().clicks = std::mem::take(&mut pending.clicks);

        let mut buttons = pending.pressed;
        for (index, held) in buttons.iter_mut().enumerate() {
            if let Some(button) = MouseButton::from_index(index) {
                *held |= lib.mouse_button(window, button)?.is_down();
            }
        }

        let mut mods = Modifiers::empty();
        for (keys, modifier) in [
            ([Key::LShift, Key::RShift], Modifiers::SHIFT),
            ([Key::LControl, Key::RControl], Modifiers::CONTROL),
            ([Key::LAlt, Key::RAlt], Modifiers::ALT),
            ([Key::LSuper, Key::RSuper], Modifiers::SUPER),
        ] {
            for key in keys {
                if lib.key(window, key)?.is_down() {
                    mods |= modifier;
                }
            }
        }

        #[allow(clippy::cast_possible_truncation)]
        let wheel = Offset::new(pending.wheel.x as f32, pending.wheel.y as f32);

        #[allow(clippy::cast_precision_loss)]
        let display_size = Extent::new(size.width as f32, size.height as f32);

        Ok(GuiInput {
            display_size,
            framebuffer_scale,
            delta_time,
            cursor,
            buttons,
            double_clicked: pending.double_clicked,
            wheel,
            mods,
            focused,
            text: pending.text,
            dropped: pending.dropped,
        })
    }

    /// Shows the cursor the GUI asked for, or hides it for `None`. Shapes the
    /// platform cannot provide fall back to the default arrow.
    pub fn set_cursor_shape(&mut self, lib: &mut Library, shape: Option<CursorShape>) -> Result<()> {
        if shape == self.cursor_shape {
            return Ok(());
        }

        let window = self.window;
        let Some(shape) = shape else {
            self.cursor_shape = None;
            return lib.set_cursor_mode(window, CursorMode::Hidden);
        };

        let cursor = match self.cursors.get(&shape) {
            Some(cursor) => Some(*cursor),
            None => match lib.create_standard_cursor(shape) {
                Ok(cursor) => {
                    self.cursors.insert(shape, cursor);
                    Some(cursor)
                }
                Err(e) => {
                    log::debug!("falling back to the arrow cursor: {e}");
                    None
                }
            },
        };

        lib.set_window_cursor(window, cursor)?;
        if self.cursor_shape.is_none() {
            lib.set_cursor_mode(window, CursorMode::Normal)?;
        }

        self.cursor_shape = Some(shape);
        Ok(())
    }

    /// Removes the bridge's callbacks and destroys the cursors it created.
    pub fn detach(self, lib: &mut Library) -> Result<()> {
        let window = self.window;
        lib.set_mouse_button_callback(window, None)?;
        lib.set_scroll_callback(window, None)?;
        lib.set_char_callback(window, None)?;
        lib.set_drop_callback(window, None)?;

        for cursor in self.cursors.into_values() {
            lib.destroy_cursor(cursor)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use grwl::{platform::null::{NullController, NullPlatform}, PlatformEvent, WindowHints};

    fn setup() -> (Library, NullController, WindowId, GuiBridge) {
        let (platform, controller) = NullPlatform::new();
        let mut lib = Library::new(platform);
        lib.init().unwrap();

        let window = lib
            .create_window(Extent::new(200, 100), "gui", None, &WindowHints::no_api())
            .unwrap();
        let bridge = GuiBridge::attach(&mut lib, window).unwrap();
        (lib, controller, window, bridge)
    }

    fn click(lib: &mut Library, controller: &NullController, window: WindowId, time: f64) {
        lib.set_time(time).unwrap();
        for action in [ButtonState::Pressed, ButtonState::Released] {
            controller.send(PlatformEvent::MouseButton {
                window,
                button: MouseButton::Left,
                action,
                mods: Modifiers::empty(),
            });
        }
        lib.poll_events().unwrap();
    }

    #[test]
    fn double_clicks_are_classified() {
        let (mut lib, controller, window, mut bridge) = setup();

        click(&mut lib, &controller, window, 0.0);
        click(&mut lib, &controller, window, 0.1);
        let frame = bridge.new_frame(&mut lib).unwrap();
        assert!(frame.double_clicked[0]);

        // Too slow.
        click(&mut lib, &controller, window, 1.0);
        click(&mut lib, &controller, window, 1.25);
        let frame = bridge.new_frame(&mut lib).unwrap();
        assert!(!frame.double_clicked[0]);
    }

    #[test]
    fn short_clicks_are_not_lost() {
        let (mut lib, controller, window, mut bridge) = setup();

        click(&mut lib, &controller, window, 0.0);
        let frame = bridge.new_frame(&mut lib).unwrap();
        assert!(frame.buttons[0]);

        let frame = bridge.new_frame(&mut lib).unwrap();
        assert!(!frame.buttons[0]);
    }

    #[test]
    fn frame_collects_text_and_wheel() {
        let (mut lib, controller, window, bridge) = setup();

        let previous = Rc::new(RefCell::new(0));
        let counter = previous.clone();
        bridge.detach(&mut lib).unwrap();
        lib.set_char_callback(
            window,
            Some(Box::new(move |_: &mut Library, _: WindowId, _: char| {
                *counter.borrow_mut() += 1;
            })),
        )
        .unwrap();
        let mut bridge = GuiBridge::attach(&mut lib, window).unwrap();

        for codepoint in ['h', 'i'] {
            controller.send(PlatformEvent::Char {
                window,
                codepoint,
                mods: Modifiers::empty(),
                plain: true,
            });
        }
        for _ in 0..2 {
            controller.send(PlatformEvent::Scroll {
                window,
                offset: Offset::new(0.0, 1.5),
            });
        }
        lib.poll_events().unwrap();

        let frame = bridge.new_frame(&mut lib).unwrap();
        assert_eq!(frame.text, "hi");
        assert_eq!(frame.wheel, Offset::new(0.0, 3.0));
        assert_eq!(frame.display_size, Extent::new(200.0, 100.0));
        assert_eq!(frame.framebuffer_scale, (1.0, 1.0));
        assert!(frame.focused);
        assert!(frame.cursor.is_some());

        // Chained callbacks still run.
        assert_eq!(*previous.borrow(), 2);

        let frame = bridge.new_frame(&mut lib).unwrap();
        assert!(frame.text.is_empty());
        assert_eq!(frame.wheel, Offset::zero());
    }

    #[test]
    fn unavailable_cursor_shapes_fall_back() {
        let (mut lib, controller, window, mut bridge) = setup();
        controller.set_standard_cursors(&[CursorShape::Arrow]);

        bridge
            .set_cursor_shape(&mut lib, Some(CursorShape::IBeam))
            .unwrap();
        assert_eq!(controller.window_cursor(window), None);

        bridge.set_cursor_shape(&mut lib, None).unwrap();
        assert_eq!(lib.cursor_mode(window).unwrap(), CursorMode::Hidden);

        bridge
            .set_cursor_shape(&mut lib, Some(CursorShape::Arrow))
            .unwrap();
        assert_eq!(lib.cursor_mode(window).unwrap(), CursorMode::Normal);
        assert!(controller.window_cursor(window).is_some());
    }
}
