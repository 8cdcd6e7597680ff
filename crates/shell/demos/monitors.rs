use grwl::Library;
use shell::ShellPlatform;

fn main() -> grwl::Result<()> {
    env_logger::init();

    let mut lib = Library::new(ShellPlatform::new());
    lib.init()?;

    println!("platform: {:?}", lib.platform());

    let primary = lib.primary_monitor()?;
    for monitor in lib.monitors()?.to_vec() {
        let name = lib.monitor_name(monitor)?.to_owned();
        let position = lib.monitor_pos(monitor)?;
        let size = lib.monitor_physical_size(monitor)?;
        let (scale_x, scale_y) = lib.monitor_content_scale(monitor)?;

        println!(
            "{}{name} at ({}, {}), {}x{} mm, scale {scale_x}x{scale_y}",
            if primary == Some(monitor) { "* " } else { "  " },
            position.x,
            position.y,
            size.width,
            size.height,
        );

        if let Ok(current) = lib.video_mode(monitor) {
            println!("    current: {}x{} @ {} Hz", current.width, current.height, current.refresh_rate);
        }

        for mode in lib.video_modes(monitor)? {
            println!(
                "    {}x{} {}:{}:{} @ {} Hz",
                mode.width, mode.height, mode.red_bits, mode.green_bits, mode.blue_bits, mode.refresh_rate
            );
        }
    }

    lib.terminate();
    Ok(())
}
