//! Mutual exclusion built on a binary semaphore
//!
//! 基于二元信号量的互斥锁
//!
//! `lock` is a semaphore `wait`, unlock is a `post` issued when the guard is
//! dropped. The lock is not reentrant: locking twice from one thread without
//! releasing the first guard deadlocks that thread.
//!
//! `lock` 即信号量的 `wait`，解锁即 guard 被 drop 时发出的 `post`。该锁不可重入：
//! 同一线程在未释放第一个 guard 的情况下再次加锁会导致自身死锁。

use super::{Semaphore, SyncError};
use std::cell::UnsafeCell;
use std::fmt;
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};

/// Semaphore-backed mutex guarding a value
///
/// 由信号量支撑、保护一个值的互斥锁
///
/// # Examples
///
/// ```
/// use smallbbq::sync::Mutex;
///
/// let mutex = Mutex::new(Vec::new());
/// mutex.lock().unwrap().push(1);
///
/// let guard = mutex.lock().unwrap();
/// assert_eq!(*guard, vec![1]);
/// assert!(mutex.try_lock().unwrap().is_none());
/// ```
pub struct Mutex<T: ?Sized> {
    lock: Semaphore,
    data: UnsafeCell<T>,
}

// Access to `data` is serialized by `lock`.
unsafe impl<T: ?Sized + Send> Send for Mutex<T> {}
unsafe impl<T: ?Sized + Send> Sync for Mutex<T> {}

/// RAII guard; the mutex is unlocked when it is dropped
///
/// RAII guard；被 drop 时解锁互斥锁
#[must_use = "if unused the Mutex will immediately unlock"]
pub struct MutexGuard<'a, T: ?Sized> {
    mutex: &'a Mutex<T>,
    _marker: PhantomData<&'a mut T>,
}

impl<T> Mutex<T> {
    /// Create an unlocked mutex
    ///
    /// 创建未加锁的互斥锁
    pub fn new(value: T) -> Self {
        Self {
            lock: Semaphore::binary(),
            data: UnsafeCell::new(value),
        }
    }

    /// Consume the mutex and return the guarded value
    ///
    /// 消费互斥锁并返回被保护的值
    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }
}

impl<T: ?Sized> Mutex<T> {
    /// Block until the mutex is acquired
    ///
    /// 阻塞直到获得互斥锁
    pub fn lock(&self) -> Result<MutexGuard<'_, T>, SyncError> {
        self.lock.wait()?;
        Ok(self.guard())
    }

    /// Acquire the mutex if it is free, without blocking
    ///
    /// 若互斥锁空闲则获取，不阻塞
    pub fn try_lock(&self) -> Result<Option<MutexGuard<'_, T>>, SyncError> {
        Ok(self.lock.try_wait()?.then(|| self.guard()))
    }

    /// Mutable access without locking; the borrow proves exclusivity
    ///
    /// 无需加锁的可变访问；可变借用即证明独占
    pub fn get_mut(&mut self) -> &mut T {
        self.data.get_mut()
    }

    #[inline]
    fn guard(&self) -> MutexGuard<'_, T> {
        MutexGuard {
            mutex: self,
            _marker: PhantomData,
        }
    }
}

impl<T: ?Sized> MutexGuard<'_, T> {
    /// Release the mutex explicitly
    ///
    /// 显式释放互斥锁
    #[inline]
    pub fn unlock(guard: Self) {
        drop(guard);
    }
}

impl<T: ?Sized> Deref for MutexGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: the guard holds the only permit of the mutex
        unsafe { &*self.mutex.data.get() }
    }
}

impl<T: ?Sized> DerefMut for MutexGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: the guard holds the only permit of the mutex
        unsafe { &mut *self.mutex.data.get() }
    }
}

impl<T: ?Sized> Drop for MutexGuard<'_, T> {
    fn drop(&mut self) {
        if let Err(err) = self.mutex.lock.post() {
            tracing::error!(%err, "failed to release mutex");
        }
    }
}

impl<T: ?Sized + fmt::Debug> fmt::Debug for MutexGuard<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}

impl<T: ?Sized> fmt::Debug for Mutex<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mutex")
            .field("locked", &(self.lock.value() == 0))
            .finish_non_exhaustive()
    }
}

impl<T: Default> Default for Mutex<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}
