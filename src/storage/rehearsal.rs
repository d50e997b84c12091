//! Rehearsal queue: read real history, keep new attempts in memory.
//!
//! Used for dry runs, so gating sees the real history while the run leaves
//! nothing behind.

use jiff::Timestamp;

use crate::model::{AttemptHandle, AttemptStatus, QueueAttempt};

use super::{QueueStore, Result, StorageError};

/// Wraps a store; writes go to memory and are dropped with the wrapper.
pub struct Rehearsal<'a, Q> {
    inner: &'a mut Q,
    staged: Vec<QueueAttempt>,
}

impl<'a, Q: QueueStore> Rehearsal<'a, Q> {
    pub fn new(inner: &'a mut Q) -> Self {
        Self {
            inner,
            staged: Vec::new(),
        }
    }

    /// Attempts recorded during the rehearsal.
    pub fn staged(&self) -> &[QueueAttempt] {
        &self.staged
    }

    fn staged_mut(&mut self, handle: AttemptHandle) -> Result<&mut QueueAttempt> {
        self.staged
            .iter_mut()
            .find(|a| a.id == handle.0)
            .ok_or(StorageError::AttemptNotFound(handle))
    }
}

impl<Q: QueueStore> QueueStore for Rehearsal<'_, Q> {
    fn create(&mut self, reference: &str) -> Result<AttemptHandle> {
        // Negative ids never collide with stored rows.
        let id = -i64::try_from(self.staged.len() + 1).unwrap_or(i64::MAX);
        self.staged.push(QueueAttempt {
            id,
            reference: reference.to_string(),
            status: AttemptStatus::InProgress,
            created_at: Timestamp::now(),
            message: None,
        });
        Ok(AttemptHandle(id))
    }

    fn finalize(
        &mut self,
        handle: AttemptHandle,
        status: AttemptStatus,
        message: &str,
    ) -> Result<()> {
        let attempt = self.staged_mut(handle)?;
        if attempt.status != AttemptStatus::InProgress {
            return Err(StorageError::AlreadyFinalized(handle));
        }
        attempt.status = status;
        attempt.message = Some(message.to_string());
        Ok(())
    }

    fn history(&mut self, reference: &str) -> Result<Vec<QueueAttempt>> {
        let mut history = self.inner.history(reference)?;
        history.extend(
            self.staged
                .iter()
                .filter(|a| a.reference == reference)
                .cloned(),
        );
        Ok(history)
    }
}
