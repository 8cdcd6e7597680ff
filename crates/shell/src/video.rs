use grwl::VideoMode;
use winit::monitor::MonitorHandle;

/// Splits a pixel depth into per-channel bits, giving green the larger share
/// of any remainder. Alpha is not part of a video mode.
pub(crate) fn split_bits(bits_per_pixel: u16) -> (u8, u8, u8) {
    let bits = if bits_per_pixel == 32 { 24 } else { bits_per_pixel.min(24) };

    #[allow(clippy::cast_possible_truncation)]
    let channel = (bits / 3) as u8;
    let (mut red, mut green, blue) = (channel, channel, channel);

    match bits % 3 {
        1 => green += 1,
        2 => {
            green += 1;
            red += 1;
        }
        _ => {}
    }

    (red, green, blue)
}

/// Rounds millihertz to the nearest hertz.
pub(crate) fn refresh_rate(millihertz: u32) -> u32 {
    (millihertz + 500) / 1000
}

pub(crate) fn from_winit(mode: &winit::monitor::VideoMode) -> VideoMode {
    let size = mode.size();
    let (red_bits, green_bits, blue_bits) = split_bits(mode.bit_depth());

    VideoMode {
        width: i32::try_from(size.width).unwrap_or(i32::MAX),
        height: i32::try_from(size.height).unwrap_or(i32::MAX),
        red_bits,
        green_bits,
        blue_bits,
        refresh_rate: refresh_rate(mode.refresh_rate_millihertz()),
    }
}

/// The native mode matching `mode`, if the monitor supports it.
pub(crate) fn find_winit(monitor: &MonitorHandle, mode: &VideoMode) -> Option<winit::monitor::VideoMode> {
    monitor.video_modes().find(|m| from_winit(m) == *mode)
}

/// The desktop mode. winit does not expose it directly, so this is the
/// monitor's current resolution at its reported refresh rate.
pub(crate) fn desktop_mode(monitor: &MonitorHandle) -> VideoMode {
    let size = monitor.size();
    let refresh = monitor.refresh_rate_millihertz().map_or(0, refresh_rate);

    let bits = monitor
        .video_modes()
        .filter(|m| m.size() == size)
        .map(|m| m.bit_depth())
        .max()
        .unwrap_or(24);
    let (red_bits, green_bits, blue_bits) = split_bits(bits);

    VideoMode {
        width: i32::try_from(size.width).unwrap_or(i32::MAX),
        height: i32::try_from(size.height).unwrap_or(i32::MAX),
        red_bits,
        green_bits,
        blue_bits,
        refresh_rate: refresh,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bits_split_like_desktop_formats() {
        assert_eq!(split_bits(32), (8, 8, 8));
        assert_eq!(split_bits(24), (8, 8, 8));
        assert_eq!(split_bits(16), (5, 6, 5));
        assert_eq!(split_bits(15), (5, 5, 5));
        assert_eq!(split_bits(8), (3, 3, 2));
    }

    #[test]
    fn refresh_rates_round() {
        assert_eq!(refresh_rate(59_940), 60);
        assert_eq!(refresh_rate(143_856), 144);
        assert_eq!(refresh_rate(0), 0);
    }
}
