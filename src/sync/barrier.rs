//! Reusable rendezvous point for a fixed number of threads
//!
//! 固定数量线程的可复用汇合点
//!
//! A cycle has two phases sharing one counter under a [`Mutex`]. On entry the
//! counter climbs to `parties`; the arrival that reaches it posts the entry
//! turnstile once per party, itself included. On exit the counter falls back
//! to zero and the last one out posts the exit turnstile the same way. A
//! party that races ahead into the next cycle waits at the entry turnstile,
//! whose permits were all consumed before anyone could leave the exit phase.
//!
//! 一个周期分为两个阶段，共用 [`Mutex`] 保护下的一个计数器。进入阶段计数器增加到
//! `parties`，达到该值的到达者为每个参与方（包括自身）post 一次入口旋转门。退出
//! 阶段计数器回落到零，最后离开者以同样方式 post 出口旋转门。抢先进入下一周期的
//! 参与方会在入口旋转门等待，而入口的许可在任何人离开退出阶段之前就已全部被消耗。

use super::{Mutex, Semaphore, SyncError};

/// Cyclic barrier releasing `parties` threads together
///
/// 同时释放 `parties` 个线程的循环屏障
///
/// # Examples
///
/// ```
/// use smallbbq::sync::CyclicBarrier;
/// use std::sync::Arc;
/// use std::thread;
///
/// let barrier = Arc::new(CyclicBarrier::new(3).unwrap());
/// let handles: Vec<_> = (0..3)
///     .map(|_| {
///         let barrier = Arc::clone(&barrier);
///         thread::spawn(move || barrier.wait().unwrap().is_leader())
///     })
///     .collect();
///
/// let leaders = handles
///     .into_iter()
///     .map(|h| h.join().unwrap())
///     .filter(|&leader| leader)
///     .count();
/// assert_eq!(leaders, 1);
/// ```
#[derive(Debug)]
pub struct CyclicBarrier {
    parties: usize,
    arrived: Mutex<usize>,
    entry: Semaphore,
    exit: Semaphore,
}

/// Outcome of [`CyclicBarrier::wait`]
///
/// [`CyclicBarrier::wait`] 的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BarrierWaitResult {
    leader: bool,
}

impl BarrierWaitResult {
    /// True for exactly one party per cycle: the arrival that released it
    ///
    /// 每个周期恰有一个参与方为 true：释放该周期的到达者
    #[inline]
    pub fn is_leader(&self) -> bool {
        self.leader
    }
}

impl CyclicBarrier {
    /// Create a barrier for `parties` threads
    ///
    /// 为 `parties` 个线程创建屏障
    ///
    /// # Errors
    /// Returns `SyncError::NoParties` if `parties` is zero
    ///
    /// # 错误
    /// 如果 `parties` 为零，返回 `SyncError::NoParties`
    pub fn new(parties: usize) -> Result<Self, SyncError> {
        if parties == 0 {
            return Err(SyncError::NoParties);
        }
        Ok(Self {
            parties,
            arrived: Mutex::new(0),
            entry: Semaphore::new(0, parties)?,
            exit: Semaphore::new(0, parties)?,
        })
    }

    /// Number of parties per cycle
    ///
    /// 每个周期的参与方数量
    #[inline]
    pub fn parties(&self) -> usize {
        self.parties
    }

    /// Block until `parties` threads have called `wait` in this cycle
    ///
    /// 阻塞直到本周期内有 `parties` 个线程调用了 `wait`
    ///
    /// A barrier of one party never blocks.
    ///
    /// 只有一个参与方的屏障永远不会阻塞。
    pub fn wait(&self) -> Result<BarrierWaitResult, SyncError> {
        let leader = self.pass(&self.entry, |arrived| {
            *arrived += 1;
            *arrived == self.parties
        })?;
        self.pass(&self.exit, |arrived| {
            *arrived -= 1;
            *arrived == 0
        })?;
        Ok(BarrierWaitResult { leader })
    }

    /// Step the counter; the step that completes the phase opens `turnstile`
    fn pass<F>(&self, turnstile: &Semaphore, step: F) -> Result<bool, SyncError>
    where
        F: FnOnce(&mut usize) -> bool,
    {
        let completes = {
            let mut arrived = self.arrived.lock()?;
            let completes = step(&mut *arrived);
            if completes {
                for _ in 0..self.parties {
                    turnstile.post()?;
                }
            }
            completes
        };

        turnstile.wait()?;
        Ok(completes)
    }
}
