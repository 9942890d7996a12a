//! Room state snapshot shared between monitoring and authorization.
//!
//! A single writer publishes immutable `RoomState` values; any number of
//! readers load the latest one without taking a lock.

use std::sync::Arc;

use domain::{DomainError, RoomState};
use tokio::sync::watch;
use tracing::{debug, warn};

/// Create a writer/reader pair seeded with `initial`
pub fn channel(initial: RoomState) -> (SnapshotWriter, SnapshotReader) {
    let (tx, rx) = watch::channel(Arc::new(initial));
    (SnapshotWriter { tx }, SnapshotReader { rx })
}

/// The only handle allowed to replace the published state
pub struct SnapshotWriter {
    tx: watch::Sender<Arc<RoomState>>,
}

impl SnapshotWriter {
    /// Publish `next` as the current snapshot.
    ///
    /// Rejects states whose timestamp or version would move backwards.
    pub fn publish(&self, next: RoomState) -> Result<(), DomainError> {
        let current = self.tx.borrow().clone();
        if !current.precedes(&next) || next.version() < current.version() {
            warn!(
                current_version = current.version(),
                next_version = next.version(),
                "Snapshot rejected: state would move backwards"
            );
            return Err(DomainError::StateRegression {
                current: current.version(),
                next: next.version(),
            });
        }

        debug!(version = next.version(), stale = next.is_stale(), "Snapshot published");
        self.tx.send_replace(Arc::new(next));
        Ok(())
    }

    /// The state readers currently see
    pub fn load(&self) -> Arc<RoomState> {
        self.tx.borrow().clone()
    }

    pub fn reader(&self) -> SnapshotReader {
        SnapshotReader {
            rx: self.tx.subscribe(),
        }
    }
}

/// Cheap, cloneable read handle
#[derive(Clone)]
pub struct SnapshotReader {
    rx: watch::Receiver<Arc<RoomState>>,
}

impl SnapshotReader {
    /// The latest published state
    pub fn load(&self) -> Arc<RoomState> {
        self.rx.borrow().clone()
    }

    /// Wait until a newer snapshot is published
    pub async fn changed(&mut self) -> Result<Arc<RoomState>, DomainError> {
        self.rx
            .changed()
            .await
            .map_err(|_| DomainError::QueueClosed)?;
        Ok(self.rx.borrow_and_update().clone())
    }
}
