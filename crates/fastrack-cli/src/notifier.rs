//! Desktop notifications via notify-rust.
//!
//! Pending notifications live as sleeping tasks in this process, so they
//! only fire while the process is still running (`fast watch`).

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use fastrack_core::{Notifier, NotifyError};
use notify_rust::Notification;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

#[derive(Default)]
pub struct DesktopNotifier {
    pending: Mutex<HashMap<String, JoinHandle<()>>>,
}

impl DesktopNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for every pending notification to be shown.
    pub async fn settle(&self) {
        let handles: Vec<JoinHandle<()>> = {
            let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
            pending.drain().map(|(_, handle)| handle).collect()
        };
        for handle in handles {
            let _ = handle.await;
        }
    }
}

fn show(title: &str, body: &str) {
    let mut notification = Notification::new();
    notification.summary(title).body(body).appname("Fastrack");

    #[cfg(target_os = "macos")]
    {
        notification.sound_name("default");
    }

    match notification.show() {
        Ok(_) => debug!("Notification sent: {} - {}", title, body),
        Err(e) => warn!("Failed to send notification: {}", e),
    }
}

#[async_trait]
impl Notifier for DesktopNotifier {
    async fn request_permission(&self) -> bool {
        // Desktop notification servers don't gate senders.
        true
    }

    async fn schedule_one_shot(
        &self,
        id: &str,
        fire_after: Duration,
        title: &str,
        body: &str,
    ) -> Result<(), NotifyError> {
        let title = title.to_string();
        let body = body.to_string();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(fire_after).await;
            if let Err(e) = tokio::task::spawn_blocking(move || show(&title, &body)).await {
                warn!("Notification task failed: {}", e);
            }
        });

        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = pending.insert(id.to_string(), handle) {
            previous.abort();
        }
        Ok(())
    }

    async fn cancel(&self, id: &str) -> Result<(), NotifyError> {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(handle) = pending.remove(id) {
            handle.abort();
        }
        Ok(())
    }
}
