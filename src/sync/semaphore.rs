//! Bounded counting semaphore
//!
//! 有界计数信号量
//!
//! The count lives behind the platform mutex and parked threads sleep on the
//! platform condition variable, both taken from [`crate::shim`]. Every post
//! is applied to the count before a waiter is notified, so a post is never
//! lost: it either wakes one waiter or stays in the count.
//!
//! 计数位于平台互斥锁之后，阻塞的线程在平台条件变量上休眠，两者都来自
//! [`crate::shim`]。每次 post 都先更新计数再通知等待者，因此 post 不会丢失：
//! 要么唤醒一个等待者，要么保留在计数中。

use super::SyncError;
use crate::shim::sync::{Condvar, Mutex, MutexGuard};

/// Counting semaphore with a fixed maximum
///
/// 具有固定最大值的计数信号量
///
/// # Examples
///
/// ```
/// use smallbbq::sync::{Semaphore, SyncError};
///
/// let sem = Semaphore::new(1, 2).unwrap();
/// sem.post().unwrap();
/// assert_eq!(sem.value(), 2);
/// assert_eq!(sem.post(), Err(SyncError::Overflow { max: 2 }));
///
/// sem.wait().unwrap();
/// assert_eq!(sem.try_wait(), Ok(true));
/// assert_eq!(sem.try_wait(), Ok(false));
/// ```
pub struct Semaphore {
    /// Available permits
    ///
    /// 可用许可数
    count: Mutex<usize>,

    /// Signalled once per post
    ///
    /// 每次 post 通知一次
    available: Condvar,

    /// Upper bound of `count`
    ///
    /// `count` 的上限
    max: usize,
}

impl Semaphore {
    /// Create a semaphore holding `initial` permits, never more than `max`
    ///
    /// 创建持有 `initial` 个许可的信号量，许可数永远不超过 `max`
    ///
    /// # Errors
    /// Returns `SyncError::InvalidCount` if `max` is zero or `initial > max`
    ///
    /// # 错误
    /// 如果 `max` 为零或 `initial > max`，返回 `SyncError::InvalidCount`
    pub fn new(initial: usize, max: usize) -> Result<Self, SyncError> {
        if max == 0 || initial > max {
            return Err(SyncError::InvalidCount { initial, max });
        }
        Ok(Self::with_bounds(initial, max))
    }

    /// A semaphore with one permit out of one, as used by [`super::Mutex`]
    #[inline]
    pub(crate) fn binary() -> Self {
        Self::with_bounds(1, 1)
    }

    #[inline]
    fn with_bounds(initial: usize, max: usize) -> Self {
        Self {
            count: Mutex::new(initial),
            available: Condvar::new(),
            max,
        }
    }

    #[inline]
    fn count(&self) -> Result<MutexGuard<'_, usize>, SyncError> {
        self.count.lock().map_err(|_| SyncError::Poisoned)
    }

    /// Block until a permit is available, then take it
    ///
    /// 阻塞直到有可用许可，然后获取它
    pub fn wait(&self) -> Result<(), SyncError> {
        let mut count = self.count()?;
        while *count == 0 {
            // Spurious wakeups are fine; the loop re-checks the count
            count = self
                .available
                .wait(count)
                .map_err(|_| SyncError::Poisoned)?;
        }
        *count -= 1;
        Ok(())
    }

    /// Take a permit if one is available, without blocking
    ///
    /// 若有可用许可则获取，不阻塞
    ///
    /// Returns `Ok(true)` if a permit was taken.
    ///
    /// 获取到许可时返回 `Ok(true)`。
    pub fn try_wait(&self) -> Result<bool, SyncError> {
        let mut count = self.count()?;
        if *count == 0 {
            return Ok(false);
        }
        *count -= 1;
        Ok(true)
    }

    /// Release one permit and wake at most one waiter
    ///
    /// 释放一个许可并最多唤醒一个等待者
    ///
    /// # Errors
    /// Returns `SyncError::Overflow` if the count is already at its maximum;
    /// the count is left unchanged.
    ///
    /// # 错误
    /// 如果计数已达最大值，返回 `SyncError::Overflow`，计数保持不变。
    pub fn post(&self) -> Result<(), SyncError> {
        let mut count = self.count()?;
        if *count == self.max {
            return Err(SyncError::Overflow { max: self.max });
        }
        *count += 1;
        self.available.notify_one();
        Ok(())
    }

    /// Current number of permits
    ///
    /// 当前的许可数
    ///
    /// Advisory only: the value may be stale by the time it is read. Use it
    /// for diagnostics, never for synchronization decisions.
    ///
    /// 仅供参考：读取时该值可能已经过期。只用于诊断，不要用于同步决策。
    pub fn value(&self) -> usize {
        match self.count.lock() {
            Ok(count) => *count,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// Maximum number of permits
    ///
    /// 最大许可数
    #[inline]
    pub fn max(&self) -> usize {
        self.max
    }
}

impl std::fmt::Debug for Semaphore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Semaphore")
            .field("value", &self.value())
            .field("max", &self.max)
            .finish()
    }
}
