use crate::logging;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    Read,
    Write,
}

impl fmt::Display for LockMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockMode::Read => write!(f, "read"),
            LockMode::Write => write!(f, "write"),
        }
    }
}

/// The lock could not be acquired in time, most likely a deadlock or a
/// badly overloaded cache layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockTimeoutError {
    name: String,
    mode: LockMode,
    timeout: Duration,
}

impl LockTimeoutError {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mode(&self) -> LockMode {
        self.mode
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl fmt::Display for LockTimeoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Failed to acquire the {} lock on {} in {} ms, possible deadlock",
            self.mode,
            self.name,
            self.timeout.as_millis()
        )
    }
}

impl std::error::Error for LockTimeoutError {}

/// A read/write lock whose acquisitions give up after a fixed timeout.
pub struct TimeoutReadWriteLock<T = ()> {
    name: String,
    timeout: Duration,
    lock: RwLock<T>,
}

impl TimeoutReadWriteLock<()> {
    pub fn new<S: Into<String>>(name: S, timeout: Duration) -> Self {
        TimeoutReadWriteLock::with_value(name, timeout, ())
    }
}

impl<T> TimeoutReadWriteLock<T> {
    pub fn with_value<S: Into<String>>(name: S, timeout: Duration, value: T) -> Self {
        TimeoutReadWriteLock {
            name: name.into(),
            timeout,
            lock: RwLock::new(value),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn timed_out(&self, mode: LockMode) -> LockTimeoutError {
        let err = LockTimeoutError {
            name: self.name.clone(),
            mode,
            timeout: self.timeout,
        };
        logging::error!("[TimeoutReadWriteLock] {}", err);
        err
    }

    pub fn acquire_read_lock(&self) -> Result<RwLockReadGuard<'_, T>, LockTimeoutError> {
        self.lock
            .try_read_for(self.timeout)
            .ok_or_else(|| self.timed_out(LockMode::Read))
    }

    pub fn acquire_write_lock(&self) -> Result<RwLockWriteGuard<'_, T>, LockTimeoutError> {
        self.lock
            .try_write_for(self.timeout)
            .ok_or_else(|| self.timed_out(LockMode::Write))
    }

    /// Trades a write lock for a read lock, without any window where a writer
    /// could take the lock in between.
    pub fn downgrade_to_read_lock<'a>(
        &'a self,
        guard: RwLockWriteGuard<'a, T>,
    ) -> RwLockReadGuard<'a, T> {
        RwLockWriteGuard::downgrade(guard)
    }

    pub fn into_inner(self) -> T {
        self.lock.into_inner()
    }
}

impl<T> fmt::Debug for TimeoutReadWriteLock<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimeoutReadWriteLock")
            .field("name", &self.name)
            .field("timeout", &self.timeout)
            .finish()
    }
}
