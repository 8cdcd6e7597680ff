//! Library lifecycle.
//!
//! A [`Library`] owns the platform backend and every registry built on top of
//! it. It starts uninitialized; [`Library::init`] brings the platform up and
//! [`Library::terminate`] tears everything down again, after which the library
//! may be initialized anew. Dropping an initialized library terminates it.

use structures::GenerationalPool;

use crate::{
    callbacks::CallbackRegistry,
    context,
    cursor::Cursor,
    error::{raise, report, ErrorCode, Result},
    hints::{InitHint, InitHints, PlatformSelection},
    joystick::{Joystick, MAX_JOYSTICKS},
    mapping::Mapping,
    monitor::MonitorRegistry,
    platform::{Platform, PlatformEvent, PlatformKind},
    time::Timer,
    window::Window,
};

pub struct Library {
    pub(crate) platform: Box<dyn Platform>,
    /// Hints for the next `init`.
    pending_hints: InitHints,
    /// Hints the current session was initialized with.
    pub(crate) hints: InitHints,
    initialized: bool,

    pub(crate) monitors: MonitorRegistry,
    pub(crate) windows: GenerationalPool<Window>,
    pub(crate) cursors: GenerationalPool<Cursor>,
    pub(crate) callbacks: CallbackRegistry,
    pub(crate) joysticks: [Option<Joystick>; MAX_JOYSTICKS],
    pub(crate) mappings: Vec<Mapping>,
    pub(crate) timer: Timer,

    /// Reused between event processing calls.
    pub(crate) events: Vec<PlatformEvent>,
}

impl Library {
    /// Wraps a platform backend. Nothing is initialized until
    /// [`Library::init`] is called.
    pub fn new(platform: impl Platform + 'static) -> Self {
        Self {
            platform: Box::new(platform),
            pending_hints: InitHints::default(),
            hints: InitHints::default(),
            initialized: false,
            monitors: MonitorRegistry::default(),
            windows: GenerationalPool::new(),
            cursors: GenerationalPool::new(),
            callbacks: CallbackRegistry::default(),
            joysticks: Default::default(),
            mappings: Vec::new(),
            timer: Timer::default(),
            events: Vec::new(),
        }
    }

    /// Sets a hint for the next call to [`Library::init`]. Hints set while
    /// initialized take effect after the library is terminated and
    /// initialized again.
    pub fn set_init_hint(&mut self, hint: InitHint) {
        self.pending_hints.apply(hint);
    }

    /// Initializes the library. Does nothing if it is already initialized.
    ///
    /// On failure everything that was brought up is torn down again before
    /// the error is returned.
    pub fn init(&mut self) -> Result<()> {
        if self.initialized {
            return Ok(());
        }

        let hints = self.pending_hints.clone();
        let kind = self.platform.kind();

        if let PlatformSelection::Only(wanted) = hints.platform {
            if wanted != kind {
                return Err(raise(
                    ErrorCode::PlatformUnavailable,
                    format!("requested the {wanted:?} platform, but only {kind:?} is available"),
                ));
            }
        }

        if let Err(e) = self.platform.init() {
            self.platform.terminate();
            return Err(report(e));
        }

        self.hints = hints;
        self.initialized = true;
        self.timer = Timer::default();
        self.reset_mappings();
        self.populate_monitors();
        self.populate_joysticks();

        log::info!("initialized on the {kind:?} platform");
        Ok(())
    }

    /// Destroys every window, cursor and context, restores gamma ramps and
    /// shuts the platform down. Does nothing if not initialized.
    ///
    /// No context may be current on another thread when this is called.
    pub fn terminate(&mut self) {
        if !self.initialized {
            return;
        }

        self.callbacks.clear();
        self.destroy_all_windows();
        self.destroy_all_cursors();
        self.restore_gamma_ramps();
        self.clear_joysticks();
        self.mappings.clear();

        if let Err(e) = context::make_current(None) {
            log::warn!("failed to detach the current context: {e}");
        }

        self.platform.terminate();
        self.events.clear();
        self.initialized = false;

        log::info!("terminated");
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// The platform the library was constructed with.
    #[must_use]
    pub fn platform(&self) -> PlatformKind {
        self.platform.kind()
    }

    pub(crate) fn require_init(&self) -> Result<()> {
        if self.initialized {
            Ok(())
        } else {
            Err(raise(
                ErrorCode::NotInitialized,
                "the library is not initialized",
            ))
        }
    }
}

impl Drop for Library {
    fn drop(&mut self) {
        self.terminate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use geometry::Extent;

    use crate::{
        error::last_error,
        hints::WindowHints,
        monitor::GammaRamp,
        platform::null::NullPlatform,
    };

    #[test]
    fn init_is_idempotent() {
        let (platform, controller) = NullPlatform::new();
        let mut lib = Library::new(platform);

        lib.init().unwrap();
        let monitors = lib.monitors().unwrap().to_vec();
        let window = lib
            .create_window(Extent::new(32, 32), "kept", None, &WindowHints::no_api())
            .unwrap();

        lib.init().unwrap();

        assert_eq!(controller.init_count(), 1);
        assert_eq!(lib.monitors().unwrap(), monitors.as_slice());
        assert_eq!(lib.window_title(window).unwrap(), "kept");
    }

    #[test]
    fn terminate_detaches_a_current_user_context() {
        let (platform, _controller) = NullPlatform::new();
        let mut lib = Library::new(platform);
        lib.init().unwrap();

        let window = lib
            .create_window(Extent::new(32, 32), "shared", None, &WindowHints::default())
            .unwrap();
        let user = lib.create_user_context(window).unwrap();
        context::make_user_context_current(Some(&user)).unwrap();

        lib.terminate();

        assert!(context::current().is_none());
        assert_eq!(user.make_current().unwrap_err().code(), ErrorCode::InvalidValue);
    }

    #[test]
    fn terminate_tears_everything_down() {
        let (platform, controller) = NullPlatform::new();
        let mut lib = Library::new(platform);
        lib.init().unwrap();

        let window = lib
            .create_window(Extent::new(32, 32), "gone", None, &WindowHints::default())
            .unwrap();
        lib.make_context_current(Some(window)).unwrap();

        let monitor = lib.primary_monitor().unwrap().unwrap();
        let original = lib.gamma_ramp(monitor).unwrap().clone();
        lib.set_gamma_ramp(monitor, &GammaRamp::from_exponent(original.size(), 2.2))
            .unwrap();

        lib.terminate();

        assert!(!lib.is_initialized());
        assert_eq!(controller.window_count(), 0);
        assert!(context::current().is_none());
        assert_eq!(controller.monitor_gamma(0), Some(original));

        let err = lib.window_title(window).unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotInitialized);

        // A fresh session does not resurrect old handles.
        lib.init().unwrap();
        let err = lib.window_title(window).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidValue);
    }

    #[test]
    fn failed_init_leaves_nothing_behind() {
        let (platform, controller) = NullPlatform::new();
        let mut lib = Library::new(platform);

        controller.fail_next_init();
        let err = lib.init().unwrap_err();
        assert_eq!(err.code(), ErrorCode::PlatformError);
        assert!(!lib.is_initialized());
        assert_eq!(controller.terminate_count(), 1);

        lib.set_init_hint(InitHint::Platform(PlatformSelection::Only(
            PlatformKind::Wayland,
        )));
        let err = lib.init().unwrap_err();
        assert_eq!(err.code(), ErrorCode::PlatformUnavailable);
        assert!(!lib.is_initialized());

        lib.set_init_hint(InitHint::Platform(PlatformSelection::Only(
            PlatformKind::Null,
        )));
        lib.init().unwrap();
    }

    #[test]
    fn uninitialized_calls_fail() {
        let (platform, _) = NullPlatform::new();
        let mut lib = Library::new(platform);
        let _ = last_error();

        let err = lib.poll_events().unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotInitialized);
        assert_eq!(last_error(), Some(err));

        // Terminating an uninitialized library is harmless.
        lib.terminate();
        assert!(lib.monitors().is_err());
    }
}
