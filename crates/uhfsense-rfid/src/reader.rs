//! Shared, exclusive access to the reader device.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{Mutex, MutexGuard};
use tracing::warn;
use uhfsense_hardware::ReaderDevice;

/// Handle to the reader, shared by the scanner, the access controller and the
/// shutdown path.
///
/// Every SDK call goes through [`lock`](ReaderHandle::lock), so no two device
/// calls are ever in flight at once. A scan window holds the guard from
/// start to stop, which keeps tag access out of open windows.
#[derive(Debug)]
pub struct ReaderHandle<R> {
    inner: Arc<Mutex<R>>,

    /// Set while inventory is open on the device.
    window_open: Arc<AtomicBool>,
}

impl<R> ReaderHandle<R> {
    pub fn new(reader: R) -> Self {
        Self {
            inner: Arc::new(Mutex::new(reader)),
            window_open: Arc::new(AtomicBool::new(false)),
        }
    }

    pub(crate) fn mark_window_open(&self) {
        self.window_open.store(true, Ordering::Release);
    }

    pub(crate) fn mark_window_closed(&self) {
        self.window_open.store(false, Ordering::Release);
    }
}

impl<R: ReaderDevice> ReaderHandle<R> {
    /// Wait for exclusive use of the reader.
    ///
    /// A window whose scan was dropped before it could stop inventory is
    /// stopped here, before the guard is handed out.
    pub async fn lock(&self) -> MutexGuard<'_, R> {
        let mut device = self.inner.lock().await;
        if self.window_open.load(Ordering::Acquire) {
            warn!("Stopping inventory left open by an abandoned scan window");
            if let Err(e) = device.stop_inventory().await {
                warn!("Stopping abandoned inventory failed: {}", e);
            }
            self.mark_window_closed();
        }
        device
    }
}

impl<R> Clone for ReaderHandle<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            window_open: Arc::clone(&self.window_open),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uhfsense_core::InventoryMode;
    use uhfsense_hardware::mock::MockReader;

    #[tokio::test]
    async fn test_lock_stops_abandoned_window_once() {
        let (mut reader, handle) = MockReader::new();
        reader.initialize("COM4").await.unwrap();
        let shared = ReaderHandle::new(reader);

        shared
            .lock()
            .await
            .start_inventory(InventoryMode::default())
            .await
            .unwrap();
        shared.mark_window_open();

        drop(shared.clone().lock().await);
        assert!(!handle.is_inventory_active());
        assert_eq!(handle.counts().stop_inventory, 1);

        drop(shared.lock().await);
        assert_eq!(handle.counts().stop_inventory, 1);
    }

    #[tokio::test]
    async fn test_lock_without_open_window_touches_nothing() {
        let (reader, handle) = MockReader::new();
        let shared = ReaderHandle::new(reader);

        drop(shared.lock().await);
        assert_eq!(handle.counts().stop_inventory, 0);
    }
}
