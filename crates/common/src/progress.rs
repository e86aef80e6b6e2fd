//! Generic progress callback trait.

/// Receives progress updates of type `T`.
///
/// Any `Fn(&T) -> bool` closure is a callback, so most callers never
/// implement this trait by hand.
pub trait ProgressCallback<T>: Send + Sync {
    /// Called with progress updates.
    ///
    /// # Returns
    /// - `true` to continue the operation
    /// - `false` to cancel the operation
    fn on_progress(&self, progress: &T) -> bool;
}

impl<T, F> ProgressCallback<T> for F
where
    F: Fn(&T) -> bool + Send + Sync,
{
    fn on_progress(&self, progress: &T) -> bool {
        self(progress)
    }
}

/// A callback that ignores every update and never cancels.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpProgress;

impl<T> ProgressCallback<T> for NoOpProgress {
    fn on_progress(&self, _progress: &T) -> bool {
        true
    }
}
