//! Local notification seam.
//!
//! The tracker never depends on a notification being delivered: the in-app
//! countdown is derived from the wall clock. Implementations may fail freely.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::NotifyError;

/// Identifier reused for the fasting-complete notification. Scheduling again
/// with the same id replaces the pending one.
pub const FASTING_COMPLETE_ID: &str = "fasting_complete";

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Ask the platform for permission to show notifications.
    async fn request_permission(&self) -> bool;

    /// Show a notification once `fire_after` has passed, replacing any
    /// pending notification with the same `id`.
    async fn schedule_one_shot(
        &self,
        id: &str,
        fire_after: Duration,
        title: &str,
        body: &str,
    ) -> Result<(), NotifyError>;

    /// Drop a pending notification. Unknown ids are not an error.
    async fn cancel(&self, id: &str) -> Result<(), NotifyError>;
}

/// Notifier for environments without notifications. Permission is always
/// denied, so nothing is ever scheduled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn request_permission(&self) -> bool {
        false
    }

    async fn schedule_one_shot(
        &self,
        _id: &str,
        _fire_after: Duration,
        _title: &str,
        _body: &str,
    ) -> Result<(), NotifyError> {
        Ok(())
    }

    async fn cancel(&self, _id: &str) -> Result<(), NotifyError> {
        Ok(())
    }
}
