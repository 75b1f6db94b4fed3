//! `anyhow`-style context on typed results.

use super::types::CtxError;

/// Extension trait for attaching context to `Result<T, CtxError>`.
///
/// # Example
///
/// ```rust
/// use ctxkit_core::error::{CtxError, CtxResultExt};
///
/// fn load() -> Result<(), CtxError> {
///     let result: Result<(), CtxError> = Err(CtxError::internal("lock poisoned"));
///     result.context("Failed to load the tool registry")?;
///     Ok(())
/// }
///
/// assert!(load().unwrap_err().to_string().starts_with("Failed to load"));
/// ```
pub trait CtxResultExt<T> {
    /// Add context to an error.
    fn context<C: Into<String>>(self, context: C) -> Result<T, CtxError>;

    /// Add context lazily, evaluated only on error.
    fn with_context<C, F>(self, f: F) -> Result<T, CtxError>
    where
        C: Into<String>,
        F: FnOnce() -> C;
}

impl<T> CtxResultExt<T> for Result<T, CtxError> {
    fn context<C: Into<String>>(self, context: C) -> Self {
        self.map_err(|e| CtxError::WithContext {
            context: context.into(),
            source: Box::new(e),
        })
    }

    fn with_context<C, F>(self, f: F) -> Self
    where
        C: Into<String>,
        F: FnOnce() -> C,
    {
        self.map_err(|e| CtxError::WithContext {
            context: f().into(),
            source: Box::new(e),
        })
    }
}
