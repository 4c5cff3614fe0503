//! Error types for the Cave engine
//!
//! Recoverable failures (backend object creation, file reads, shader
//! compilation) are returned as [`Error`]. Programmer errors such as a double
//! `begin_render_pass` are not errors in this sense: they go through
//! [`engine_assert!`](crate::engine_assert) and abort the operation.

use std::fmt;

/// Result type for Cave engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Cave engine errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Backend-specific error (software device, native API call, etc.)
    BackendError(String),

    /// Invalid resource (texture, buffer, shader, etc.)
    InvalidResource(String),

    /// Initialization failed (engine, renderer, rendering context)
    InitializationFailed(String),

    /// A subsystem was initialized twice
    AlreadyInitialized(String),

    /// A file could not be opened or read
    FileReadFailed(String),

    /// A shader stage was rejected by the backend
    ShaderCompilationFailed(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            Error::AlreadyInitialized(msg) => write!(f, "Already initialized: {}", msg),
            Error::FileReadFailed(msg) => write!(f, "File read failed: {}", msg),
            Error::ShaderCompilationFailed(msg) => write!(f, "Shader compilation failed: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

// ===== ERROR MACROS =====

/// Log an ERROR message and return early with the given error variant
///
/// # Example
///
/// ```no_run
/// # use cave_engine::engine_bail;
/// # fn load() -> cave_engine::cave::Result<()> {
/// engine_bail!("cave::Shader", FileReadFailed, "cannot open '{}'", "quad.vs.hlsl");
/// # }
/// ```
#[macro_export]
macro_rules! engine_bail {
    ($source:expr, $variant:ident, $($arg:tt)*) => {{
        let message = format!($($arg)*);
        $crate::engine_error!($source, "{}", message);
        return Err($crate::cave::Error::$variant(message));
    }};
}

/// Check a precondition; on failure log at ERROR severity and panic
///
/// Used for violations that leave the renderer in an undefined state
/// (double begin, out-of-range attachment index, mismatched attachment counts).
///
/// # Example
///
/// ```no_run
/// # use cave_engine::engine_assert;
/// let index = 0usize;
/// let count = 1usize;
/// engine_assert!(index < count, "cave::Framebuffer", "attachment index {} out of range", index);
/// ```
#[macro_export]
macro_rules! engine_assert {
    ($cond:expr, $source:expr, $($arg:tt)*) => {
        if !($cond) {
            $crate::engine_fatal!($source, $($arg)*);
        }
    };
}

/// Log an ERROR message and panic
#[macro_export]
macro_rules! engine_fatal {
    ($source:expr, $($arg:tt)*) => {{
        let message = format!($($arg)*);
        $crate::engine_error!($source, "Fatal: {}", message);
        panic!("[{}] {}", $source, message)
    }};
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
