//! The error channel.
//!
//! Every error raised by the library is recorded in a slot local to the thread
//! that raised it and passed to the process-wide error callback on that same
//! thread. The slot holds only the most recent error and is cleared by
//! [`last_error`].

use std::{cell::RefCell, fmt, sync::Arc};

use parking_lot::RwLock;

/// The closed set of error conditions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// A function that requires the library to be initialized was called
    /// before `init` or after `terminate`.
    NotInitialized,
    /// A function that operates on the current context was called on a thread
    /// with no current context.
    NoCurrentContext,
    /// An enumerant that is not valid for the function was passed in.
    InvalidEnum,
    /// A value that is out of range or refers to a destroyed object was passed
    /// in.
    InvalidValue,
    OutOfMemory,
    /// The requested client API is not supported by the platform.
    ApiUnavailable,
    /// The requested client API version is not supported by the platform.
    VersionUnavailable,
    /// A platform-specific error that does not fit any other code.
    PlatformError,
    /// The requested pixel format or clipboard format is not available.
    FormatUnavailable,
    /// A context operation was attempted on a window created without one.
    NoWindowContext,
    /// The requested standard cursor shape is not available.
    CursorUnavailable,
    /// The requested feature is not provided by the platform.
    FeatureUnavailable,
    /// The requested feature is not implemented for the platform.
    FeatureUnimplemented,
    /// The requested platform is not available in this build or environment.
    PlatformUnavailable,
}

impl ErrorCode {
    /// Returns true for errors caused by the caller breaking an API contract.
    /// These are never worth retrying. All other codes describe the
    /// environment and may be handled with a fallback.
    #[must_use]
    pub fn is_programmer_error(self) -> bool {
        matches!(
            self,
            Self::NotInitialized
                | Self::NoCurrentContext
                | Self::InvalidEnum
                | Self::InvalidValue
                | Self::NoWindowContext
        )
    }

    fn name(self) -> &'static str {
        match self {
            Self::NotInitialized => "not initialized",
            Self::NoCurrentContext => "no current context",
            Self::InvalidEnum => "invalid enum",
            Self::InvalidValue => "invalid value",
            Self::OutOfMemory => "out of memory",
            Self::ApiUnavailable => "API unavailable",
            Self::VersionUnavailable => "version unavailable",
            Self::PlatformError => "platform error",
            Self::FormatUnavailable => "format unavailable",
            Self::NoWindowContext => "no window context",
            Self::CursorUnavailable => "cursor unavailable",
            Self::FeatureUnavailable => "feature unavailable",
            Self::FeatureUnimplemented => "feature unimplemented",
            Self::PlatformUnavailable => "platform unavailable",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An error code paired with a human-readable description.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{code}: {description}")]
pub struct Error {
    code: ErrorCode,
    description: String,
}

impl Error {
    /// Creates an error without reporting it. Backends use this to hand
    /// failures to the core, which reports them once they cross the public
    /// API.
    #[must_use]
    pub fn new(code: ErrorCode, description: impl Into<String>) -> Self {
        Self {
            code,
            description: description.into(),
        }
    }

    #[must_use]
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Callback invoked synchronously, on the thread where the error occurred,
/// for every reported error.
pub type ErrorCallback = Arc<dyn Fn(&Error) + Send + Sync>;

thread_local! {
    static LAST_ERROR: RefCell<Option<Error>> = RefCell::new(None);
}

static ERROR_CALLBACK: RwLock<Option<ErrorCallback>> = parking_lot::const_rwlock(None);

/// Returns and clears the last error reported on the calling thread.
///
/// May be called from any thread, and before initialization.
pub fn last_error() -> Option<Error> {
    LAST_ERROR.with(|slot| slot.borrow_mut().take())
}

/// Sets the error callback and returns the previous one. The callback is kept
/// across `terminate`/`init` cycles.
pub fn set_error_callback(callback: Option<ErrorCallback>) -> Option<ErrorCallback> {
    std::mem::replace(&mut *ERROR_CALLBACK.write(), callback)
}

/// Records the error in the calling thread's slot, invokes the error callback
/// and hands the error back for propagation.
pub(crate) fn report(error: Error) -> Error {
    if error.code.is_programmer_error() {
        log::error!("{error}");
    } else {
        log::debug!("{error}");
    }

    LAST_ERROR.with(|slot| *slot.borrow_mut() = Some(error.clone()));

    // Clone out of the lock so the callback may replace itself.
    let callback = ERROR_CALLBACK.read().clone();
    if let Some(callback) = callback {
        callback(&error);
    }

    error
}

/// Creates and reports an error in one step.
pub(crate) fn raise(code: ErrorCode, description: impl Into<String>) -> Error {
    report(Error::new(code, description))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::thread;

    #[test]
    fn last_error_is_cleared_on_read() {
        let _ = last_error();
        let _ = raise(ErrorCode::InvalidEnum, "bad key");

        let error = last_error().unwrap();
        assert_eq!(error.code(), ErrorCode::InvalidEnum);
        assert_eq!(error.description(), "bad key");
        assert_eq!(last_error(), None);
    }

    #[test]
    fn last_error_is_thread_local() {
        let _ = last_error();
        let _ = raise(ErrorCode::PlatformError, "main");

        let seen = thread::spawn(last_error).join().unwrap();
        assert_eq!(seen, None);
        assert_eq!(last_error().map(|e| e.code()), Some(ErrorCode::PlatformError));
    }

    #[test]
    fn callback_returns_previous() {
        use std::sync::Mutex;

        let me = thread::current().id();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();

        let previous = set_error_callback(Some(Arc::new(move |e: &Error| {
            // Other tests run concurrently; only record this thread's errors.
            if thread::current().id() == me {
                sink.lock().unwrap().push(e.code());
            }
        })));

        let _ = raise(ErrorCode::FormatUnavailable, "no text");
        let ours = set_error_callback(previous);

        assert!(ours.is_some());
        assert_eq!(*seen.lock().unwrap(), vec![ErrorCode::FormatUnavailable]);
    }

    #[test]
    fn classification() {
        assert!(ErrorCode::InvalidValue.is_programmer_error());
        assert!(ErrorCode::NotInitialized.is_programmer_error());
        assert!(!ErrorCode::VersionUnavailable.is_programmer_error());
        assert!(!ErrorCode::FeatureUnimplemented.is_programmer_error());
        assert_eq!(
            Error::new(ErrorCode::ApiUnavailable, "no GL").to_string(),
            "API unavailable: no GL"
        );
    }
}
