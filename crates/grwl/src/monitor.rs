//! Monitor registry.
//!
//! Monitors are enumerated at `init` and kept up to date by hot-plug events.
//! The primary monitor is always first. Video modes and gamma ramps are cached
//! per monitor; the slices handed out borrow the library, so they cannot
//! outlive the next call that refreshes them.

use std::any::Any;

use geometry::{Extent, Point, Rect, ScreenPx};
use structures::{GenerationalPool, Handle};

use crate::{
    callbacks::MonitorCallback,
    error::{raise, report, ErrorCode, Result},
    platform::{Millimeters, MonitorDescriptor, NativeMonitor},
    window::WindowId,
    Library,
};

pub type MonitorId = Handle<Monitor>;

/// A display mode supported natively by a monitor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct VideoMode {
    pub width: i32,
    pub height: i32,
    pub red_bits: u8,
    pub green_bits: u8,
    pub blue_bits: u8,
    pub refresh_rate: u32,
}

impl VideoMode {
    /// Modes are ordered by color depth, then area, then width, then refresh
    /// rate. Modes with equal keys keep their relative order.
    #[must_use]
    pub fn sort_key(&self) -> (u32, i64, i32, u32) {
        (
            self.bits_per_pixel(),
            i64::from(self.width) * i64::from(self.height),
            self.width,
            self.refresh_rate,
        )
    }

    #[must_use]
    pub fn bits_per_pixel(&self) -> u32 {
        u32::from(self.red_bits) + u32::from(self.green_bits) + u32::from(self.blue_bits)
    }
}

/// Sorts modes by [`VideoMode::sort_key`]. Duplicates are kept.
pub fn sort_video_modes(modes: &mut [VideoMode]) {
    modes.sort_by_key(VideoMode::sort_key);
}

/// The video mode a fullscreen window would like. `None` fields don't
/// matter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VideoModeRequest {
    pub size: Extent<i32, ScreenPx>,
    pub red_bits: Option<u8>,
    pub green_bits: Option<u8>,
    pub blue_bits: Option<u8>,
    /// `None` picks the highest available rate.
    pub refresh_rate: Option<u32>,
}

/// Picks the mode closest to the request, comparing color depth first, then
/// size, then refresh rate.
#[must_use]
pub fn choose_video_mode(modes: &[VideoMode], request: &VideoModeRequest) -> Option<VideoMode> {
    let channel_diff = |have: u8, want: Option<u8>| {
        want.map_or(0, |want| (i32::from(have) - i32::from(want)).unsigned_abs())
    };

    let score = |mode: &VideoMode| {
        let color = channel_diff(mode.red_bits, request.red_bits)
            + channel_diff(mode.green_bits, request.green_bits)
            + channel_diff(mode.blue_bits, request.blue_bits);

        let dw = i64::from(mode.width) - i64::from(request.size.width);
        let dh = i64::from(mode.height) - i64::from(request.size.height);
        let size = dw * dw + dh * dh;

        let rate = match request.refresh_rate {
            Some(want) => mode.refresh_rate.abs_diff(want),
            None => u32::MAX - mode.refresh_rate,
        };

        (color, size, rate)
    };

    // `min_by_key` keeps the first of equal elements.
    modes.iter().copied().min_by_key(score)
}

/// A monitor gamma ramp, one entry per channel level.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GammaRamp {
    pub red: Vec<u16>,
    pub green: Vec<u16>,
    pub blue: Vec<u16>,
}

impl GammaRamp {
    /// Builds a ramp of the given size from a gamma exponent. An exponent of
    /// 1.0 produces the identity ramp.
    #[must_use]
    pub fn from_exponent(size: usize, gamma: f32) -> Self {
        let channel: Vec<u16> = (0..size)
            .map(|i| {
                let mut value = i as f64 / (size.max(2) - 1) as f64;
                value = value.powf(1.0 / f64::from(gamma)) * 65535.0 + 0.5;
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let level = value.min(65535.0) as u16;
                level
            })
            .collect();

        Self {
            red: channel.clone(),
            green: channel.clone(),
            blue: channel,
        }
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.red.len()
    }

    fn validate(&self) -> Result<()> {
        if self.red.is_empty() {
            return Err(raise(ErrorCode::InvalidValue, "invalid gamma ramp size 0"));
        }

        if self.green.len() != self.red.len() || self.blue.len() != self.red.len() {
            return Err(raise(
                ErrorCode::InvalidValue,
                "gamma ramp channels must be the same size",
            ));
        }

        Ok(())
    }
}

/// Whether a monitor was connected or disconnected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MonitorEvent {
    Connected,
    Disconnected,
}

pub struct Monitor {
    pub(crate) native: NativeMonitor,
    name: String,
    physical_size: Extent<i32, Millimeters>,
    modes: Vec<VideoMode>,
    ramp: Option<GammaRamp>,
    /// The ramp in effect before the first change, restored on terminate.
    original_ramp: Option<GammaRamp>,
    /// The fullscreen window occupying this monitor.
    pub(crate) window: Option<WindowId>,
    user_data: Option<Box<dyn Any>>,
}

#[derive(Default)]
pub(crate) struct MonitorRegistry {
    pool: GenerationalPool<Monitor>,
    /// Connected monitors, primary first.
    order: Vec<MonitorId>,
}

impl MonitorRegistry {
    pub fn get(&self, id: MonitorId) -> Option<&Monitor> {
        self.pool.get(id)
    }

    pub fn get_mut(&mut self, id: MonitorId) -> Option<&mut Monitor> {
        self.pool.get_mut(id)
    }

    pub fn find(&self, native: NativeMonitor) -> Option<MonitorId> {
        self.order
            .iter()
            .copied()
            .find(|id| self.pool.get(*id).map(|m| m.native) == Some(native))
    }

    pub fn insert(&mut self, descriptor: MonitorDescriptor) -> MonitorId {
        let primary = descriptor.primary;
        let id = self.pool.insert(Monitor {
            native: descriptor.native,
            name: descriptor.name,
            physical_size: descriptor.physical_size,
            modes: Vec::new(),
            ramp: None,
            original_ramp: None,
            window: None,
            user_data: None,
        });

        if primary {
            self.order.insert(0, id);
        } else {
            self.order.push(id);
        }

        id
    }

    /// Unlists the monitor while keeping its entry, so its user data stays
    /// readable until [`Self::remove`].
    pub fn detach(&mut self, id: MonitorId) {
        self.order.retain(|m| *m != id);
    }

    pub fn remove(&mut self, id: MonitorId) -> Option<Monitor> {
        self.detach(id);
        self.pool.remove(id)
    }

    pub fn ids(&self) -> &[MonitorId] {
        &self.order
    }

    pub fn clear(&mut self) -> Vec<Monitor> {
        self.order
            .drain(..)
            .filter_map(|id| self.pool.remove(id))
            .collect()
    }
}

impl Library {
    pub(crate) fn monitor(&self, monitor: MonitorId) -> Result<&Monitor> {
        self.require_init()?;
        self.monitors.get(monitor).ok_or_else(|| {
            raise(
                ErrorCode::InvalidValue,
                format!("{monitor:?} is not a connected monitor"),
            )
        })
    }

    fn monitor_mut(&mut self, monitor: MonitorId) -> Result<&mut Monitor> {
        self.require_init()?;
        self.monitors.get_mut(monitor).ok_or_else(|| {
            raise(
                ErrorCode::InvalidValue,
                format!("{monitor:?} is not a connected monitor"),
            )
        })
    }

    /// Connected monitors, primary first.
    pub fn monitors(&self) -> Result<&[MonitorId]> {
        self.require_init()?;
        Ok(self.monitors.ids())
    }

    pub fn primary_monitor(&self) -> Result<Option<MonitorId>> {
        self.require_init()?;
        Ok(self.monitors.ids().first().copied())
    }

    pub fn monitor_pos(&self, monitor: MonitorId) -> Result<Point<i32, ScreenPx>> {
        let native = self.monitor(monitor)?.native;
        Ok(self.platform.monitor_position(native))
    }

    /// The area of the monitor not occupied by task bars, docks and the like.
    pub fn monitor_workarea(&self, monitor: MonitorId) -> Result<Rect<i32, ScreenPx>> {
        let native = self.monitor(monitor)?.native;
        Ok(self.platform.monitor_workarea(native))
    }

    pub fn monitor_physical_size(&self, monitor: MonitorId) -> Result<Extent<i32, Millimeters>> {
        Ok(self.monitor(monitor)?.physical_size)
    }

    pub fn monitor_content_scale(&self, monitor: MonitorId) -> Result<(f32, f32)> {
        let native = self.monitor(monitor)?.native;
        Ok(self.platform.monitor_content_scale(native))
    }

    pub fn monitor_name(&self, monitor: MonitorId) -> Result<&str> {
        Ok(&self.monitor(monitor)?.name)
    }

    /// The monitor's supported video modes, sorted by
    /// [`VideoMode::sort_key`].
    pub fn video_modes(&mut self, monitor: MonitorId) -> Result<&[VideoMode]> {
        self.refresh_video_modes(monitor)?;
        Ok(&self.monitor(monitor)?.modes)
    }

    pub(crate) fn refresh_video_modes(&mut self, monitor: MonitorId) -> Result<()> {
        let native = self.monitor(monitor)?.native;
        let mut modes = self.platform.video_modes(native);
        if modes.is_empty() {
            return Err(raise(
                ErrorCode::PlatformError,
                "failed to query video modes",
            ));
        }

        sort_video_modes(&mut modes);
        self.monitor_mut(monitor)?.modes = modes;
        Ok(())
    }

    /// The monitor's current video mode.
    pub fn video_mode(&self, monitor: MonitorId) -> Result<VideoMode> {
        let native = self.monitor(monitor)?.native;
        self.platform.current_video_mode(native).ok_or_else(|| {
            raise(
                ErrorCode::PlatformError,
                "failed to query the current video mode",
            )
        })
    }

    /// Generates a gamma ramp from an exponent and applies it. An exponent of
    /// 1.0 restores the default appearance.
    pub fn set_gamma(&mut self, monitor: MonitorId, gamma: f32) -> Result<()> {
        if !gamma.is_finite() || gamma <= 0.0 {
            return Err(raise(
                ErrorCode::InvalidValue,
                format!("invalid gamma value {gamma}"),
            ));
        }

        let size = self.gamma_ramp(monitor)?.size();
        if size == 0 {
            return Err(raise(ErrorCode::PlatformError, "monitor has no gamma ramp"));
        }

        self.set_gamma_ramp(monitor, &GammaRamp::from_exponent(size, gamma))
    }

    /// The monitor's current gamma ramp.
    pub fn gamma_ramp(&mut self, monitor: MonitorId) -> Result<&GammaRamp> {
        let native = self.monitor(monitor)?.native;
        let ramp = self.platform.gamma_ramp(native).map_err(report)?;

        let entry = self.monitor_mut(monitor)?;
        Ok(entry.ramp.insert(ramp))
    }

    /// Applies a gamma ramp. The ramp in effect before the first change is
    /// saved and restored on terminate.
    pub fn set_gamma_ramp(&mut self, monitor: MonitorId, ramp: &GammaRamp) -> Result<()> {
        ramp.validate()?;

        let native = self.monitor(monitor)?.native;
        if self.monitor(monitor)?.original_ramp.is_none() {
            let original = self.platform.gamma_ramp(native).map_err(report)?;
            self.monitor_mut(monitor)?.original_ramp = Some(original);
        }

        self.platform.set_gamma_ramp(native, ramp).map_err(report)
    }

    pub fn monitor_user_data(&self, monitor: MonitorId) -> Result<Option<&dyn Any>> {
        Ok(self.monitor(monitor)?.user_data.as_deref())
    }

    /// Replaces the monitor's user data, returning the previous value. Remains
    /// callable from the disconnect callback.
    pub fn set_monitor_user_data(
        &mut self,
        monitor: MonitorId,
        data: Option<Box<dyn Any>>,
    ) -> Result<Option<Box<dyn Any>>> {
        let entry = self.monitor_mut(monitor)?;
        Ok(std::mem::replace(&mut entry.user_data, data))
    }

    /// Sets the monitor hot-plug callback and returns the previous one.
    pub fn set_monitor_callback(
        &mut self,
        callback: Option<MonitorCallback>,
    ) -> Result<Option<MonitorCallback>> {
        self.require_init()?;
        Ok(self.callbacks.monitor.replace(callback))
    }

    pub(crate) fn native_monitor(&self, monitor: MonitorId) -> Result<NativeMonitor> {
        Ok(self.monitor(monitor)?.native)
    }

    /// Switches the monitor to the mode closest to the request and records
    /// the window as its fullscreen occupant.
    pub(crate) fn acquire_monitor(
        &mut self,
        window: WindowId,
        monitor: MonitorId,
        request: &VideoModeRequest,
    ) -> Result<()> {
        self.refresh_video_modes(monitor)?;

        let entry = self.monitor(monitor)?;
        let native = entry.native;
        let mode = choose_video_mode(&entry.modes, request).ok_or_else(|| {
            raise(ErrorCode::PlatformError, "monitor has no usable video mode")
        })?;

        if self.platform.current_video_mode(native) != Some(mode) {
            self.platform.set_video_mode(native, &mode).map_err(report)?;
        }

        self.monitor_mut(monitor)?.window = Some(window);
        Ok(())
    }

    /// Gives the monitor back, restoring its original video mode, if the window
    /// is its fullscreen occupant.
    pub(crate) fn release_monitor(&mut self, window: WindowId, monitor: MonitorId) {
        let Some(entry) = self.monitors.get_mut(monitor) else {
            return;
        };

        if entry.window == Some(window) {
            entry.window = None;
            let native = entry.native;
            self.platform.restore_video_mode(native);
        }
    }

    pub(crate) fn populate_monitors(&mut self) {
        for descriptor in self.platform.monitors() {
            self.monitors.insert(descriptor);
        }
    }

    pub(crate) fn monitor_connected(&mut self, descriptor: MonitorDescriptor) {
        if self.monitors.find(descriptor.native).is_some() {
            return;
        }

        log::info!("monitor connected: {}", descriptor.name);
        let id = self.monitors.insert(descriptor);
        self.emit_monitor(id, MonitorEvent::Connected);
    }

    pub(crate) fn monitor_disconnected(&mut self, native: NativeMonitor) {
        let Some(id) = self.monitors.find(native) else {
            return;
        };

        if let Some(window) = self.monitors.get(id).and_then(|m| m.window) {
            // Windowed at the current size, before the monitor goes away.
            if let Ok(size) = self.window_size(window) {
                self.leave_fullscreen(window, Point::origin(), size);
            }
        }

        if let Some(monitor) = self.monitors.get(id) {
            log::info!("monitor disconnected: {}", monitor.name);
        }

        self.monitors.detach(id);
        self.emit_monitor(id, MonitorEvent::Disconnected);
        self.monitors.remove(id);
    }

    /// Puts back every gamma ramp that was changed through the library.
    pub(crate) fn restore_gamma_ramps(&mut self) {
        for monitor in self.monitors.clear() {
            if let Some(original) = monitor.original_ramp {
                if let Err(e) = self.platform.set_gamma_ramp(monitor.native, &original) {
                    log::warn!("failed to restore gamma ramp of {}: {e}", monitor.name);
                }
            }
        }
    }
}
