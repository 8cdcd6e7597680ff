use geometry::{Extent, Point};
use grwl::{ButtonState, CursorMode, Key, KeyEvent, Library, MouseButtonEvent, WindowHints, WindowId};
use shell::ShellPlatform;

fn main() -> grwl::Result<()> {
    env_logger::init();

    grwl::set_error_callback(Some(std::sync::Arc::new(|error: &grwl::Error| {
        log::error!("{error}");
    })));

    let mut lib = Library::new(ShellPlatform::new());
    lib.init()?;

    let window = lib.create_window(Extent::new(1280, 720), "Sandbox", None, &WindowHints::no_api())?;

    lib.set_key_callback(window, Some(Box::new(on_key)))?;

    let mut click_count = 0_u64;
    lib.set_mouse_button_callback(
        window,
        Some(Box::new(move |lib: &mut Library, window: WindowId, event: MouseButtonEvent| {
            if event.button == grwl::MouseButton::Left && event.action == ButtonState::Released {
                click_count += 1;
                let _ = lib.set_window_title(window, &format!("Sandbox-{click_count}"));
            }
        })),
    )?;

    lib.set_drop_callback(
        window,
        Some(Box::new(|_: &mut Library, _: WindowId, paths: Vec<std::path::PathBuf>| {
            for path in paths {
                println!("dropped {}", path.display());
            }
        })),
    )?;

    while !lib.window_should_close(window)? {
        lib.wait_events()?;
    }

    lib.terminate();
    Ok(())
}

fn on_key(lib: &mut Library, window: WindowId, event: KeyEvent) {
    if let ButtonState::Repeated(count) = event.action {
        println!("Key {:?} repeated {} times", event.key, count);
        return;
    }

    if event.action != ButtonState::Pressed {
        return;
    }

    let result = match event.key {
        Key::Escape => lib.set_window_should_close(window, true),
        Key::C => {
            let mode = match lib.cursor_mode(window) {
                Ok(CursorMode::Disabled) => CursorMode::Normal,
                _ => CursorMode::Disabled,
            };
            lib.set_cursor_mode(window, mode)
        }
        Key::F => toggle_fullscreen(lib, window),
        _ => Ok(()),
    };

    if let Err(e) = result {
        println!("{:?} failed: {e}", event.key);
    }
}

fn toggle_fullscreen(lib: &mut Library, window: WindowId) -> grwl::Result<()> {
    if lib.window_monitor(window)?.is_some() {
        return lib.set_window_monitor(window, None, Point::new(100, 100), Extent::new(1280, 720), None);
    }

    let Some(monitor) = lib.primary_monitor()? else {
        return Ok(());
    };

    let mode = lib.video_mode(monitor)?;
    lib.set_window_monitor(
        window,
        Some(monitor),
        Point::origin(),
        Extent::new(mode.width, mode.height),
        Some(mode.refresh_rate),
    )
}
