//! Rendering context binding.
//!
//! Each thread has at most one current context, either a window's context or
//! a user context, and each context is current on at most one thread. The
//! per-thread slot is the only cross-thread state in the library; contexts
//! record their owning thread so a second thread cannot claim them.
//!
//! The free functions in this module act on the calling thread and may be
//! used from any thread. Creating and destroying contexts goes through the
//! [`Library`].

use std::{
    cell::RefCell,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, ThreadId},
};

use parking_lot::Mutex;

use crate::{
    error::{raise, report, ErrorCode, Result},
    platform::{NativeContext, ProcAddress},
    window::WindowId,
    Library,
};

/// The client API a window's context is created for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ClientApi {
    OpenGl,
    OpenGlEs,
    /// No context. Use this for Vulkan or WebGPU, where the surface is created
    /// by the caller from the window's raw handles.
    NoApi,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ContextCreationApi {
    Native,
    Egl,
    OsMesa,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpenGlProfile {
    Any,
    Core,
    Compat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Robustness {
    NoResetNotification,
    LoseContextOnReset,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReleaseBehavior {
    Any,
    Flush,
    None,
}

/// Requested context properties.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContextConfig {
    pub client_api: ClientApi,
    pub creation_api: ContextCreationApi,
    /// Minimum (major, minor) version.
    pub version: (u8, u8),
    pub forward_compat: bool,
    pub debug: bool,
    pub profile: OpenGlProfile,
    pub robustness: Option<Robustness>,
    pub release_behavior: ReleaseBehavior,
    pub no_error: bool,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            client_api: ClientApi::OpenGl,
            creation_api: ContextCreationApi::Native,
            version: (1, 0),
            forward_compat: false,
            debug: false,
            profile: OpenGlProfile::Any,
            robustness: None,
            release_behavior: ReleaseBehavior::Any,
            no_error: false,
        }
    }
}

impl ContextConfig {
    /// Rejects combinations that no implementation could satisfy.
    pub fn validate(&self) -> Result<()> {
        let (major, minor) = self.version;

        match self.client_api {
            ClientApi::NoApi => return Ok(()),
            ClientApi::OpenGl => {
                let valid = match major {
                    1 => minor <= 5,
                    2 => minor <= 1,
                    3 => minor <= 3,
                    4 => true,
                    _ => false,
                };

                if !valid {
                    return Err(raise(
                        ErrorCode::InvalidValue,
                        format!("invalid OpenGL version {major}.{minor}"),
                    ));
                }

                if self.profile != OpenGlProfile::Any && (major, minor) < (3, 2) {
                    return Err(raise(
                        ErrorCode::InvalidValue,
                        "context profiles are only defined for OpenGL version 3.2 and above",
                    ));
                }

                if self.forward_compat && major < 3 {
                    return Err(raise(
                        ErrorCode::InvalidValue,
                        "forward-compatibility is only defined for OpenGL version 3.0 and above",
                    ));
                }
            }
            ClientApi::OpenGlEs => {
                let valid = match major {
                    1 => minor <= 1,
                    2 => minor == 0,
                    3 => true,
                    _ => false,
                };

                if !valid {
                    return Err(raise(
                        ErrorCode::InvalidValue,
                        format!("invalid OpenGL ES version {major}.{minor}"),
                    ));
                }
            }
        }

        Ok(())
    }
}

/// Which surface a context draws to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContextTarget {
    /// The context created together with the window.
    Window(WindowId),
    /// An off-screen context sharing objects with the window's context.
    User(WindowId),
}

struct ContextInner {
    native: Arc<dyn NativeContext>,
    target: ContextTarget,
    owner: Mutex<Option<ThreadId>>,
    destroyed: AtomicBool,
}

/// A handle to a rendering context. Handles are cheap to clone and may be
/// sent to other threads.
#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

impl PartialEq for Context {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Context {}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("target", &self.inner.target)
            .field("owner", &*self.inner.owner.lock())
            .finish()
    }
}

impl Context {
    pub(crate) fn new(native: Arc<dyn NativeContext>, target: ContextTarget) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                native,
                target,
                owner: Mutex::new(None),
                destroyed: AtomicBool::new(false),
            }),
        }
    }

    #[must_use]
    pub fn target(&self) -> ContextTarget {
        self.inner.target
    }

    #[must_use]
    pub fn is_user_context(&self) -> bool {
        matches!(self.inner.target, ContextTarget::User(_))
    }

    pub(crate) fn native(&self) -> &Arc<dyn NativeContext> {
        &self.inner.native
    }

    /// Makes this context current on the calling thread, detaching whatever
    /// was current before.
    pub fn make_current(&self) -> Result<()> {
        make_current(Some(self))
    }

    fn check_alive(&self) -> Result<()> {
        if self.inner.destroyed.load(Ordering::Acquire) {
            return Err(raise(
                ErrorCode::InvalidValue,
                format!("{:?} has been destroyed", self.inner.target),
            ));
        }

        Ok(())
    }

    pub(crate) fn mark_destroyed(&self) {
        self.inner.destroyed.store(true, Ordering::Release);
    }
}

thread_local! {
    static CURRENT: RefCell<Option<Context>> = RefCell::new(None);
}

/// Makes a context current on the calling thread, or detaches the current
/// context if `None`.
///
/// Fails with [`ErrorCode::PlatformError`] if the context is current on
/// another thread; in that case nothing changes on either thread.
pub fn make_current(context: Option<&Context>) -> Result<()> {
    let previous = current();

    if let Some(context) = context {
        context.check_alive()?;

        if previous.as_ref() == Some(context) {
            return Ok(());
        }

        let me = thread::current().id();
        {
            let mut owner = context.inner.owner.lock();
            if matches!(*owner, Some(thread) if thread != me) {
                drop(owner);
                return Err(raise(
                    ErrorCode::PlatformError,
                    format!(
                        "{:?} is current on another thread",
                        context.inner.target
                    ),
                ));
            }
            *owner = Some(me);
        }

        if let Err(e) = context.inner.native.make_current() {
            *context.inner.owner.lock() = None;
            return Err(report(e));
        }

        // The native switch already unbound the previous context.
        if let Some(previous) = previous {
            *previous.inner.owner.lock() = None;
        }

        CURRENT.with(|slot| *slot.borrow_mut() = Some(context.clone()));
    } else {
        detach(previous);
    }

    Ok(())
}

/// Like [`make_current`], but only accepts user contexts.
pub fn make_user_context_current(context: Option<&Context>) -> Result<()> {
    if let Some(context) = context {
        if !context.is_user_context() {
            return Err(raise(
                ErrorCode::InvalidValue,
                "not a user context",
            ));
        }
    }

    make_current(context)
}

fn detach(previous: Option<Context>) {
    let Some(previous) = previous else {
        return;
    };

    CURRENT.with(|slot| *slot.borrow_mut() = None);
    *previous.inner.owner.lock() = None;

    if let Err(e) = previous.inner.native.make_non_current() {
        log::warn!("failed to detach {:?}: {e}", previous.inner.target);
    }
}

/// Detaches the context if it is current on the calling thread.
pub(crate) fn release(context: &Context) {
    let previous = current();
    if previous.as_ref() == Some(context) {
        detach(previous);
    }
}

/// The context current on the calling thread.
#[must_use]
pub fn current() -> Option<Context> {
    CURRENT.with(|slot| slot.borrow().clone())
}

/// The window whose context is current on the calling thread.
#[must_use]
pub fn current_window() -> Option<WindowId> {
    match current()?.target() {
        ContextTarget::Window(window) => Some(window),
        ContextTarget::User(_) => None,
    }
}

/// The user context current on the calling thread.
#[must_use]
pub fn current_user_context() -> Option<Context> {
    current().filter(Context::is_user_context)
}

fn require_current() -> Result<Context> {
    let context = current().ok_or_else(|| {
        raise(
            ErrorCode::NoCurrentContext,
            "no context is current on this thread",
        )
    })?;

    context.check_alive()?;
    Ok(context)
}

/// Sets the swap interval of the current context.
pub fn swap_interval(interval: i32) -> Result<()> {
    require_current()?
        .inner
        .native
        .swap_interval(interval)
        .map_err(report)
}

/// Whether the current context supports the named API extension.
pub fn extension_supported(extension: &str) -> Result<bool> {
    let context = require_current()?;

    if extension.is_empty() {
        return Err(raise(
            ErrorCode::InvalidValue,
            "extension name cannot be an empty string",
        ));
    }

    Ok(context.inner.native.extension_supported(extension))
}

/// The address of a client API function for the current context.
pub fn proc_address(name: &str) -> Result<ProcAddress> {
    Ok(require_current()?.inner.native.proc_address(name))
}

impl Library {
    /// The window's context. Fails with [`ErrorCode::NoWindowContext`] for
    /// windows created with [`ClientApi::NoApi`].
    pub fn window_context(&self, window: WindowId) -> Result<Context> {
        self.window(window)?.context.clone().ok_or_else(|| {
            raise(
                ErrorCode::NoWindowContext,
                format!("{window:?} has no context"),
            )
        })
    }

    /// Makes the window's context current on the calling thread, or detaches
    /// the current context if `None`.
    pub fn make_context_current(&self, window: Option<WindowId>) -> Result<()> {
        match window {
            Some(window) => make_current(Some(&self.window_context(window)?)),
            None => make_current(None),
        }
    }

    pub fn swap_buffers(&self, window: WindowId) -> Result<()> {
        self.window_context(window)?
            .inner
            .native
            .swap_buffers()
            .map_err(report)
    }

    /// Creates an off-screen context that shares objects with the window's
    /// context and with every other user context of that window.
    pub fn create_user_context(&mut self, window: WindowId) -> Result<Context> {
        let shared = self.window_context(window)?;

        let native = self
            .platform
            .create_user_context(window, shared.native())
            .map_err(report)?;

        let context = Context::new(native, ContextTarget::User(window));
        self.window_mut(window)?.user_contexts.push(context.clone());
        Ok(context)
    }

    /// Destroys a user context. It is detached first if current on the calling
    /// thread; destroying one that is current on another thread is a caller
    /// error.
    pub fn destroy_user_context(&mut self, context: &Context) -> Result<()> {
        let ContextTarget::User(window) = context.target() else {
            return Err(raise(ErrorCode::InvalidValue, "not a user context"));
        };

        context.check_alive()?;
        release(context);
        context.mark_destroyed();

        if let Ok(window) = self.window_mut(window) {
            window.user_contexts.retain(|c| c != context);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::{mpsc, Barrier};

    use geometry::Extent;

    use crate::{hints::WindowHints, platform::null::NullPlatform};

    fn library() -> Library {
        let (platform, _) = NullPlatform::new();
        let mut lib = Library::new(platform);
        lib.init().unwrap();
        lib
    }

    #[test]
    fn version_validation() {
        let mut config = ContextConfig::default();
        assert!(config.validate().is_ok());

        config.version = (3, 4);
        assert_eq!(config.validate().unwrap_err().code(), ErrorCode::InvalidValue);

        config.version = (3, 1);
        config.profile = OpenGlProfile::Core;
        assert!(config.validate().is_err());

        config.version = (3, 2);
        assert!(config.validate().is_ok());

        config.version = (2, 1);
        config.profile = OpenGlProfile::Any;
        config.forward_compat = true;
        assert!(config.validate().is_err());

        config = ContextConfig {
            client_api: ClientApi::OpenGlEs,
            version: (2, 1),
            ..ContextConfig::default()
        };
        assert!(config.validate().is_err());

        config.version = (3, 2);
        assert!(config.validate().is_ok());

        config.client_api = ClientApi::NoApi;
        config.version = (9, 9);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn switching_contexts_detaches_the_previous_one() {
        let mut lib = library();
        let hints = WindowHints::default();
        let a = lib.create_window(Extent::new(64, 64), "a", None, &hints).unwrap();
        let b = lib.create_window(Extent::new(64, 64), "b", None, &hints).unwrap();

        lib.make_context_current(Some(a)).unwrap();
        assert_eq!(current_window(), Some(a));

        let user = lib.create_user_context(b).unwrap();
        make_user_context_current(Some(&user)).unwrap();
        assert_eq!(current_window(), None);
        assert_eq!(current_user_context(), Some(user.clone()));

        lib.make_context_current(Some(b)).unwrap();
        assert_eq!(current_window(), Some(b));
        assert_eq!(current_user_context(), None);

        lib.destroy_user_context(&user).unwrap();
        assert_eq!(user.make_current().unwrap_err().code(), ErrorCode::InvalidValue);

        lib.make_context_current(None).unwrap();
        assert_eq!(current(), None);
    }

    #[test]
    fn failed_switch_keeps_the_previous_context() {
        let (platform, controller) = NullPlatform::new();
        let mut lib = Library::new(platform);
        lib.init().unwrap();
        let hints = WindowHints::default();
        let a = lib.create_window(Extent::new(64, 64), "a", None, &hints).unwrap();
        let b = lib.create_window(Extent::new(64, 64), "b", None, &hints).unwrap();

        lib.make_context_current(Some(a)).unwrap();

        controller.fail_next_make_current();
        let err = lib.make_context_current(Some(b)).unwrap_err();
        assert_eq!(err.code(), ErrorCode::PlatformError);
        assert_eq!(current_window(), Some(a));

        // b was not left claimed by this thread.
        lib.make_context_current(Some(b)).unwrap();
        assert_eq!(current_window(), Some(b));

        lib.make_context_current(None).unwrap();
    }

    #[test]
    fn current_context_is_required() {
        let _ = make_current(None);

        let err = swap_interval(1).unwrap_err();
        assert_eq!(err.code(), ErrorCode::NoCurrentContext);
        let err = extension_supported("GL_ARB_debug_output").unwrap_err();
        assert_eq!(err.code(), ErrorCode::NoCurrentContext);
    }

    #[test]
    fn no_api_windows_have_no_context() {
        let mut lib = library();
        let window = lib
            .create_window(Extent::new(64, 64), "vk", None, &WindowHints::no_api())
            .unwrap();

        let err = lib.make_context_current(Some(window)).unwrap_err();
        assert_eq!(err.code(), ErrorCode::NoWindowContext);
        let err = lib.create_user_context(window).unwrap_err();
        assert_eq!(err.code(), ErrorCode::NoWindowContext);
        let err = lib.swap_buffers(window).unwrap_err();
        assert_eq!(err.code(), ErrorCode::NoWindowContext);
    }

    #[test]
    fn context_cannot_be_current_on_two_threads() {
        let mut lib = library();
        let window = lib
            .create_window(Extent::new(64, 64), "gl", None, &WindowHints::default())
            .unwrap();
        let context = lib.window_context(window).unwrap();

        let barrier = Arc::new(Barrier::new(2));
        let (tx, rx) = mpsc::channel();

        let thread_a = {
            let context = context.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                context.make_current().unwrap();
                barrier.wait();
                // Thread B tries to steal the context here.
                barrier.wait();
                tx.send(current_window()).unwrap();
                make_current(None).unwrap();
            })
        };

        barrier.wait();
        let err = context.make_current().unwrap_err();
        assert_eq!(err.code(), ErrorCode::PlatformError);
        assert_eq!(current(), None);
        barrier.wait();

        assert_eq!(rx.recv().unwrap(), Some(window));
        thread_a.join().unwrap();

        // Once released, any thread may claim it.
        context.make_current().unwrap();
        assert_eq!(current_window(), Some(window));
        make_current(None).unwrap();
    }

    #[test]
    fn destroying_a_window_detaches_its_context() {
        let mut lib = library();
        let window = lib
            .create_window(Extent::new(64, 64), "gl", None, &WindowHints::default())
            .unwrap();

        lib.make_context_current(Some(window)).unwrap();
        swap_interval(1).unwrap();
        assert!(extension_supported("GL_ARB_null").unwrap());

        let context = lib.window_context(window).unwrap();
        lib.destroy_window(window).unwrap();

        assert_eq!(current(), None);
        assert_eq!(context.make_current().unwrap_err().code(), ErrorCode::InvalidValue);
    }
}
