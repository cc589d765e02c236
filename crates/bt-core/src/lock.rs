use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::blackboard::Blackboard;

/// Reader/writer wrapper for sharing one blackboard across threads.
///
/// Nothing in the engine takes this lock. A host that inspects the blackboard from another
/// thread holds [`SharedBlackboard::write`] for the duration of a tick and readers use
/// [`SharedBlackboard::read`].
#[derive(Debug, Clone)]
pub struct SharedBlackboard {
    inner: Arc<RwLock<Blackboard>>,
}

impl SharedBlackboard {
    pub fn new(blackboard: Blackboard) -> Self {
        Self {
            inner: Arc::new(RwLock::new(blackboard)),
        }
    }

    pub fn read(&self) -> RwLockReadGuard<'_, Blackboard> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, Blackboard> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `f` under the read lock.
    pub fn with_read<R>(&self, f: impl FnOnce(&Blackboard) -> R) -> R {
        f(&self.read())
    }

    /// Runs `f` under the write lock.
    pub fn with_write<R>(&self, f: impl FnOnce(&mut Blackboard) -> R) -> R {
        f(&mut self.write())
    }

    /// Unwraps the blackboard when this is the last handle.
    pub fn try_into_inner(self) -> Result<Blackboard, Self> {
        match Arc::try_unwrap(self.inner) {
            Ok(lock) => Ok(lock.into_inner().unwrap_or_else(PoisonError::into_inner)),
            Err(inner) => Err(Self { inner }),
        }
    }
}
