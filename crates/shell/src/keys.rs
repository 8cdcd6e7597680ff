use grwl::{Key, Modifiers, MouseButton};
use winit::event::{ModifiersState, VirtualKeyCode};

/// Translates a winit key code. Keys without a counterpart are
/// [`Key::Unknown`] and are reported by scancode only.
pub(crate) fn translate_key(key: Option<VirtualKeyCode>) -> Key {
    key.map_or(Key::Unknown, |key| {
        KEY_MAP.get(key as usize).copied().unwrap_or(Key::Unknown)
    })
}

/// Lock key state is not reported by winit, so lock bits are never set.
pub(crate) fn translate_mods(state: ModifiersState) -> Modifiers {
    let mut mods = Modifiers::empty();
    mods.set(Modifiers::SHIFT, state.shift());
    mods.set(Modifiers::CONTROL, state.ctrl());
    mods.set(Modifiers::ALT, state.alt());
    mods.set(Modifiers::SUPER, state.logo());
    mods
}

/// Buttons numbered past `u8::MAX` are dropped.
pub(crate) fn translate_button(button: winit::event::MouseButton) -> Option<MouseButton> {
    Some(match button {
        winit::event::MouseButton::Left => MouseButton::Left,
        winit::event::MouseButton::Right => MouseButton::Right,
        winit::event::MouseButton::Middle => MouseButton::Middle,
        winit::event::MouseButton::Other(other) => MouseButton::Other(u8::try_from(other).ok()?),
    })
}

/// Whether a character typed with these modifiers is text rather than part
/// of a shortcut. Control with Alt is AltGr on Windows keyboards.
pub(crate) fn is_plain_text(state: ModifiersState) -> bool {
    !state.logo() && !(state.ctrl() && !state.alt())
}

const KEY_MAP: [Key; 163] = {
    let mut table = [Key::Unknown; 163];

    table[VirtualKeyCode::Key1 as usize] = Key::Key1;
    table[VirtualKeyCode::Key2 as usize] = Key::Key2;
    table[VirtualKeyCode::Key3 as usize] = Key::Key3;
    table[VirtualKeyCode::Key4 as usize] = Key::Key4;
    table[VirtualKeyCode::Key5 as usize] = Key::Key5;
    table[VirtualKeyCode::Key6 as usize] = Key::Key6;
    table[VirtualKeyCode::Key7 as usize] = Key::Key7;
    table[VirtualKeyCode::Key8 as usize] = Key::Key8;
    table[VirtualKeyCode::Key9 as usize] = Key::Key9;
    table[VirtualKeyCode::Key0 as usize] = Key::Key0;

    table[VirtualKeyCode::A as usize] = Key::A;
    table[VirtualKeyCode::B as usize] = Key::B;
    table[VirtualKeyCode::C as usize] = Key::C;
    table[VirtualKeyCode::D as usize] = Key::D;
    table[VirtualKeyCode::E as usize] = Key::E;
    table[VirtualKeyCode::F as usize] = Key::F;
    table[VirtualKeyCode::G as usize] = Key::G;
    table[VirtualKeyCode::H as usize] = Key::H;
    table[VirtualKeyCode::I as usize] = Key::I;
    table[VirtualKeyCode::J as usize] = Key::J;
    table[VirtualKeyCode::K as usize] = Key::K;
    table[VirtualKeyCode::L as usize] = Key::L;
    table[VirtualKeyCode::M as usize] = Key::M;
    table[VirtualKeyCode::N as usize] = Key::N;
    table[VirtualKeyCode::O as usize] = Key::O;
    table[VirtualKeyCode::P as usize] = Key::P;
    table[VirtualKeyCode::Q as usize] = Key::Q;
    table[VirtualKeyCode::R as usize] = Key::R;
    table[VirtualKeyCode::S as usize] = Key::S;
    table[VirtualKeyCode::T as usize] = Key::T;
    table[VirtualKeyCode::U as usize] = Key::U;
    table[VirtualKeyCode::V as usize] = Key::V;
    table[VirtualKeyCode::W as usize] = Key::W;
    table[VirtualKeyCode::X as usize] = Key::X;
    table[VirtualKeyCode::Y as usize] = Key::Y;
    table[VirtualKeyCode::Z as usize] = Key::Z;

    table[VirtualKeyCode::Numpad1 as usize] = Key::Keypad1;
    table[VirtualKeyCode::Numpad2 as usize] = Key::Keypad2;
    table[VirtualKeyCode::Numpad3 as usize] = Key::Keypad3;
    table[VirtualKeyCode::Numpad4 as usize] = Key::Keypad4;
    table[VirtualKeyCode::Numpad5 as usize] = Key::Keypad5;
    table[VirtualKeyCode::Numpad6 as usize] = Key::Keypad6;
    table[VirtualKeyCode::Numpad7 as usize] = Key::Keypad7;
    table[VirtualKeyCode::Numpad8 as usize] = Key::Keypad8;
    table[VirtualKeyCode::Numpad9 as usize] = Key::Keypad9;
    table[VirtualKeyCode::Numpad0 as usize] = Key::Keypad0;
    table[VirtualKeyCode::NumpadAdd as usize] = Key::KeypadAdd;
    table[VirtualKeyCode::NumpadSubtract as usize] = Key::KeypadSubtract;
    table[VirtualKeyCode::NumpadMultiply as usize] = Key::KeypadMultiply;
    table[VirtualKeyCode::NumpadDivide as usize] = Key::KeypadDivide;
    table[VirtualKeyCode::NumpadDecimal as usize] = Key::KeypadDecimal;
    table[VirtualKeyCode::NumpadEnter as usize] = Key::KeypadEnter;
    table[VirtualKeyCode::NumpadEquals as usize] = Key::KeypadEqual;

    table[VirtualKeyCode::Equals as usize] = Key::Equals;
    table[VirtualKeyCode::Comma as usize] = Key::Comma;
    table[VirtualKeyCode::Minus as usize] = Key::Minus;
    table[VirtualKeyCode::Period as usize] = Key::Period;

    table[VirtualKeyCode::Semicolon as usize] = Key::Semicolon;
    table[VirtualKeyCode::Slash as usize] = Key::Slash;
    table[VirtualKeyCode::Grave as usize] = Key::Grave;
    table[VirtualKeyCode::LBracket as usize] = Key::LBracket;
    table[VirtualKeyCode::Backslash as usize] = Key::Backslash;
    table[VirtualKeyCode::RBracket as usize] = Key::RBracket;
    table[VirtualKeyCode::Apostrophe as usize] = Key::Apostrophe;
    table[VirtualKeyCode::OEM102 as usize] = Key::World2;

    table[VirtualKeyCode::Tab as usize] = Key::Tab;
    table[VirtualKeyCode::Space as usize] = Key::Space;

    table[VirtualKeyCode::Insert as usize] = Key::Insert;
    table[VirtualKeyCode::Delete as usize] = Key::Delete;

    table[VirtualKeyCode::Back as usize] = Key::Backspace;
    table[VirtualKeyCode::Return as usize] = Key::Enter;
    table[VirtualKeyCode::LShift as usize] = Key::LShift;
    table[VirtualKeyCode::RShift as usize] = Key::RShift;
    table[VirtualKeyCode::LControl as usize] = Key::LControl;
    table[VirtualKeyCode::RControl as usize] = Key::RControl;
    table[VirtualKeyCode::LAlt as usize] = Key::LAlt;
    table[VirtualKeyCode::RAlt as usize] = Key::RAlt;
    table[VirtualKeyCode::Pause as usize] = Key::Pause;
    table[VirtualKeyCode::Capital as usize] = Key::CapsLock;
    table[VirtualKeyCode::Escape as usize] = Key::Escape;
    table[VirtualKeyCode::Apps as usize] = Key::Menu;

    table[VirtualKeyCode::PageUp as usize] = Key::PageUp;
    table[VirtualKeyCode::PageDown as usize] = Key::PageDown;
    table[VirtualKeyCode::Home as usize] = Key::Home;
    table[VirtualKeyCode::End as usize] = Key::End;
    table[VirtualKeyCode::Left as usize] = Key::Left;
    table[VirtualKeyCode::Right as usize] = Key::Right;
    table[VirtualKeyCode::Up as usize] = Key::Up;
    table[VirtualKeyCode::Down as usize] = Key::Down;

    table[VirtualKeyCode::Scroll as usize] = Key::ScrollLock;
    table[VirtualKeyCode::Numlock as usize] = Key::NumLock;
    table[VirtualKeyCode::Snapshot as usize] = Key::PrintScreen;

    table[VirtualKeyCode::F1 as usize] = Key::F1;
    table[VirtualKeyCode::F2 as usize] = Key::F2;
    table[VirtualKeyCode::F3 as usize] = Key::F3;
    table[VirtualKeyCode::F4 as usize] = Key::F4;
    table[VirtualKeyCode::F5 as usize] = Key::F5;
    table[VirtualKeyCode::F6 as usize] = Key::F6;
    table[VirtualKeyCode::F7 as usize] = Key::F7;
    table[VirtualKeyCode::F8 as usize] = Key::F8;
    table[VirtualKeyCode::F9 as usize] = Key::F9;
    table[VirtualKeyCode::F10 as usize] = Key::F10;
    table[VirtualKeyCode::F11 as usize] = Key::F11;
    table[VirtualKeyCode::F12 as usize] = Key::F12;
    table[VirtualKeyCode::F13 as usize] = Key::F13;
    table[VirtualKeyCode::F14 as usize] = Key::F14;
    table[VirtualKeyCode::F15 as usize] = Key::F15;
    table[VirtualKeyCode::F16 as usize] = Key::F16;
    table[VirtualKeyCode::F17 as usize] = Key::F17;
    table[VirtualKeyCode::F18 as usize] = Key::F18;
    table[VirtualKeyCode::F19 as usize] = Key::F19;
    table[VirtualKeyCode::F20 as usize] = Key::F20;
    table[VirtualKeyCode::F21 as usize] = Key::F21;
    table[VirtualKeyCode::F22 as usize] = Key::F22;
    table[VirtualKeyCode::F23 as usize] = Key::F23;
    table[VirtualKeyCode::F24 as usize] = Key::F24;

    table[VirtualKeyCode::LWin as usize] = Key::LSuper;
    table[VirtualKeyCode::RWin as usize] = Key::RSuper;

    table
};
