//! Hand-rolled synchronization primitives
//!
//! 手工实现的同步原语
//!
//! Everything here is layered on a single counting [`Semaphore`]:
//!
//! 这里的所有原语都构建在单一的计数 [`Semaphore`] 之上：
//!
//! - [`Mutex`] is a semaphore with one permit guarding a value
//! - [`CyclicBarrier`] is a mutex-protected arrival counter plus entry and exit turnstiles
//!
//! - [`Mutex`] 是带一个许可、保护一个值的信号量
//! - [`CyclicBarrier`] 是受互斥锁保护的到达计数器加上入口与出口两个旋转门

mod barrier;
mod mutex;
mod semaphore;

pub use barrier::{BarrierWaitResult, CyclicBarrier};
pub use mutex::{Mutex, MutexGuard};
pub use semaphore::Semaphore;

use thiserror::Error;

/// Synchronization primitive error
///
/// 同步原语错误
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SyncError {
    /// Initial count above the maximum, or a zero maximum
    ///
    /// 初始计数超过最大值，或最大值为零
    #[error("invalid semaphore bounds: initial {initial}, max {max}")]
    InvalidCount { initial: usize, max: usize },

    /// A barrier was created for zero parties
    ///
    /// 屏障的参与方数量为零
    #[error("a barrier needs at least one party")]
    NoParties,

    /// A post would push the count past its maximum
    ///
    /// post 会使计数超过最大值
    #[error("semaphore already holds its maximum of {max} permits")]
    Overflow { max: usize },

    /// The platform lock was poisoned by a panicking thread
    ///
    /// 平台锁被 panic 的线程毒化
    #[error("synchronization primitive poisoned by a panicking thread")]
    Poisoned,
}
