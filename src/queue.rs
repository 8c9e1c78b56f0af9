//! Closeable blocking bounded queue
//!
//! 可关闭的阻塞有界队列
//!
//! The queue composes one [`RingBuffer`] behind a semaphore [`Mutex`], two
//! counting semaphores (`free_slots` and `occupied_slots`), two waiter
//! counters, a closed flag, and the drain gates installed by `close`.
//!
//! 队列由以下部分组成：受信号量 [`Mutex`] 保护的 [`RingBuffer`]、两个计数信号量
//! （`free_slots` 与 `occupied_slots`）、两个等待者计数器、关闭标志，以及由
//! `close` 安装的排空闸门。
//!
//! ## Close protocol
//!
//! 关闭协议
//!
//! Waiter counters and the closed flag are only written under the mutex, so
//! `close` sees an exact snapshot of the threads parked in `put` and `take`.
//! For each side with parked threads it installs a drain gate, a
//! [`CyclicBarrier`] sized for those threads plus itself. It then posts a
//! single permit to the producer side if producers are parked, and always one
//! to the consumer side, where late consumers may outnumber the items left. A released producer returns its permit; a consumer that wakes to an
//! empty ring posts one back. Either way the wake-up travels down the whole
//! line of parked threads, and no semaphore ever holds more than one permit
//! beyond its capacity. Every thread that was parked at close time arrives at
//! its gate, and so does `close`, which therefore returns only once all of them
//! have left their blocking call.
//!
//! 等待者计数器与关闭标志只在持有互斥锁时写入，因此 `close` 能得到 `put` 与
//! `take` 中阻塞线程的精确快照。对每一侧有阻塞线程的情况，它安装一个排空闸门
//! （大小为这些线程数加一的 [`CyclicBarrier`]），然后只 post 一个许可。被释放的
//! 生产者归还其许可；醒来发现环形缓冲区为空的消费者也 post 回一个许可。唤醒因此
//! 沿着所有阻塞线程依次传递，任何信号量的许可数都不会超过容量加一。关闭时处于
//! 阻塞状态的每个线程都会到达其闸门，`close` 也会到达，因此 `close` 只在它们全部
//! 离开阻塞调用后才返回。

use crate::ring::{PopError, PushError, RingBuffer};
use crate::shim::atomic::{AtomicBool, AtomicUsize, Ordering};
use crate::shim::sync::Arc;
use crate::sync::{CyclicBarrier, Mutex, MutexGuard, Semaphore, SyncError};
use std::fmt;
use std::num::NonZero;
use std::ops::ControlFlow;
use thiserror::Error;
use tracing::{debug, trace};

/// Queue creation error
///
/// 队列创建错误
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum QueueError {
    /// Zero capacity
    ///
    /// 容量为零
    #[error("invalid argument: capacity must be at least 1")]
    InvalidArgument,

    /// The slot storage could not be allocated
    ///
    /// 无法分配槽位存储
    #[error("failed to allocate queue storage")]
    AllocationFailure,

    /// A synchronization primitive could not be set up
    ///
    /// 无法建立同步原语
    #[error("synchronization failure: {0}")]
    Sync(#[from] SyncError),
}

/// Error returned by [`BlockingBoundedQueue::put`] and [`BlockingBoundedQueue::try_put`]
///
/// [`BlockingBoundedQueue::put`] 与 [`BlockingBoundedQueue::try_put`] 返回的错误
#[derive(Clone, PartialEq, Eq, Error)]
pub enum PutError<T> {
    /// The queue is closed; the item was not inserted
    ///
    /// 队列已关闭，元素未被插入
    #[error("queue is closed")]
    Closed(T),

    /// No free slot (`try_put` only)
    ///
    /// 没有空闲槽位（仅 `try_put`）
    #[error("queue is full")]
    Full(T),

    /// A synchronization primitive failed; the queue should be abandoned
    ///
    /// 同步原语失败，应放弃该队列
    #[error("synchronization failure: {0}")]
    Sync(#[from] SyncError),
}

impl<T> PutError<T> {
    /// Recover the rejected item, if the error still owns it
    ///
    /// 若错误仍持有被拒绝的元素，则取回它
    pub fn into_inner(self) -> Option<T> {
        match self {
            PutError::Closed(item) | PutError::Full(item) => Some(item),
            PutError::Sync(_) => None,
        }
    }

    /// Check if the error is the closed signal
    ///
    /// 检查错误是否为关闭信号
    #[inline]
    pub fn is_closed(&self) -> bool {
        matches!(self, PutError::Closed(_))
    }
}

impl<T> fmt::Debug for PutError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PutError::Closed(_) => f.write_str("Closed(..)"),
            PutError::Full(_) => f.write_str("Full(..)"),
            PutError::Sync(err) => f.debug_tuple("Sync").field(err).finish(),
        }
    }
}

/// Error returned by [`BlockingBoundedQueue::take`] and [`BlockingBoundedQueue::try_take`]
///
/// [`BlockingBoundedQueue::take`] 与 [`BlockingBoundedQueue::try_take`] 返回的错误
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TakeError {
    /// The queue is closed and no items remain
    ///
    /// 队列已关闭且没有剩余元素
    #[error("queue is closed")]
    Closed,

    /// No item available (`try_take` only)
    ///
    /// 没有可用元素（仅 `try_take`）
    #[error("queue is empty")]
    Empty,

    /// A synchronization primitive failed; the queue should be abandoned
    ///
    /// 同步原语失败，应放弃该队列
    #[error("synchronization failure: {0}")]
    Sync(#[from] SyncError),
}

/// Lifecycle state of a queue
///
/// 队列的生命周期状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueState {
    /// Accepting and yielding items
    ///
    /// 正常接收与产出元素
    Open,

    /// Closed, but items remain buffered or threads are still leaving
    ///
    /// 已关闭，但仍有缓冲元素或线程尚未离开
    Closing,

    /// Closed, empty, nobody parked
    ///
    /// 已关闭、为空且无阻塞线程
    Closed,
}

/// State guarded by the queue mutex
struct Shared<T> {
    ring: RingBuffer<T>,
    enq_drain: Option<Arc<CyclicBarrier>>,
    deq_drain: Option<Arc<CyclicBarrier>>,
}

/// Closeable, bounded, blocking multi-producer multi-consumer queue
///
/// 可关闭、有界、阻塞的多生产者多消费者队列
///
/// Item order is FIFO. Fairness among blocked threads is whatever the
/// platform condition variable provides and is not guaranteed to be FIFO.
///
/// 元素顺序为 FIFO。阻塞线程之间的公平性取决于平台条件变量，不保证 FIFO。
///
/// # Examples
///
/// ```
/// use smallbbq::{BlockingBoundedQueue, TakeError};
/// use std::sync::Arc;
/// use std::thread;
///
/// let queue = Arc::new(BlockingBoundedQueue::new(4).unwrap());
///
/// let consumer = {
///     let queue = Arc::clone(&queue);
///     thread::spawn(move || {
///         let mut sum = 0;
///         loop {
///             match queue.take() {
///                 Ok(v) => sum += v,
///                 Err(TakeError::Closed) => break sum,
///                 Err(err) => panic!("{err}"),
///             }
///         }
///     })
/// };
///
/// for i in 1..=100 {
///     queue.put(i).unwrap();
/// }
/// queue.close().unwrap();
///
/// assert_eq!(consumer.join().unwrap(), 5050);
/// ```
pub struct BlockingBoundedQueue<T> {
    shared: Mutex<Shared<T>>,
    free_slots: Semaphore,
    occupied_slots: Semaphore,
    enq_waiters: AtomicUsize,
    deq_waiters: AtomicUsize,
    closed: AtomicBool,
    len: AtomicUsize,
    capacity: usize,
}

impl<T> BlockingBoundedQueue<T> {
    /// Create an open queue holding at most `capacity` items
    ///
    /// 创建最多容纳 `capacity` 个元素的开放队列
    ///
    /// # Errors
    /// - `QueueError::InvalidArgument` if `capacity` is zero
    /// - `QueueError::AllocationFailure` if the slots cannot be allocated
    ///
    /// # 错误
    /// - 如果 `capacity` 为零，返回 `QueueError::InvalidArgument`
    /// - 如果无法分配槽位，返回 `QueueError::AllocationFailure`
    pub fn new(capacity: usize) -> Result<Self, QueueError> {
        let slots = NonZero::new(capacity).ok_or(QueueError::InvalidArgument)?;
        let ring = RingBuffer::try_new(slots).map_err(|_| QueueError::AllocationFailure)?;

        // Headroom for the single permit `close` injects
        let max_permits = capacity
            .checked_add(1)
            .ok_or(QueueError::AllocationFailure)?;

        let queue = Self {
            shared: Mutex::new(Shared {
                ring,
                enq_drain: None,
                deq_drain: None,
            }),
            free_slots: Semaphore::new(capacity, max_permits)?,
            occupied_slots: Semaphore::new(0, max_permits)?,
            enq_waiters: AtomicUsize::new(0),
            deq_waiters: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
            len: AtomicUsize::new(0),
            capacity,
        };

        trace!(capacity, "created blocking bounded queue");
        Ok(queue)
    }

    /// Insert an item, blocking while the queue is full
    ///
    /// 插入一个元素，队列满时阻塞
    ///
    /// # Errors
    /// Returns `PutError::Closed` with the item if the queue is closed before
    /// or while waiting for a free slot.
    ///
    /// # 错误
    /// 如果队列在等待空闲槽位之前或期间被关闭，返回携带该元素的 `PutError::Closed`。
    pub fn put(&self, item: T) -> Result<(), PutError<T>> {
        {
            let _shared = self.shared.lock()?;
            if self.closed.load(Ordering::Acquire) {
                return Err(PutError::Closed(item));
            }
            self.enq_waiters.fetch_add(1, Ordering::AcqRel);
        }

        let acquired = self.free_slots.wait();
        let shared = self.resume(&self.enq_waiters)?;

        if self.closed.load(Ordering::Acquire) {
            let drain = shared.enq_drain.clone();
            drop(shared);

            // Return the permit; it wakes the next parked producer
            let handed_on = acquired.and_then(|()| self.free_slots.post());
            leave(drain)?;
            handed_on?;

            trace!("producer released by close");
            return Err(PutError::Closed(item));
        }

        acquired?;
        self.enqueue(shared, item)
    }

    /// Insert an item if a slot is free, without blocking
    ///
    /// 若有空闲槽位则插入元素，不阻塞
    ///
    /// # Errors
    /// - `PutError::Full` if no slot is free
    /// - `PutError::Closed` if the queue is closed
    ///
    /// # 错误
    /// - 没有空闲槽位时返回 `PutError::Full`
    /// - 队列已关闭时返回 `PutError::Closed`
    pub fn try_put(&self, item: T) -> Result<(), PutError<T>> {
        if self.closed.load(Ordering::Acquire) {
            return Err(PutError::Closed(item));
        }
        if !self.free_slots.try_wait()? {
            return Err(PutError::Full(item));
        }

        let shared = self.shared.lock()?;
        if self.closed.load(Ordering::Acquire) {
            drop(shared);
            self.free_slots.post()?;
            return Err(PutError::Closed(item));
        }

        self.enqueue(shared, item)
    }

    /// Remove the oldest item, blocking while the queue is empty
    ///
    /// 移除最旧的元素，队列空时阻塞
    ///
    /// Items buffered before `close` are still returned. Once the queue is
    /// closed and empty, every call returns `TakeError::Closed`.
    ///
    /// 关闭前已缓冲的元素仍会被返回。队列关闭且为空后，每次调用都返回
    /// `TakeError::Closed`。
    pub fn take(&self) -> Result<T, TakeError> {
        let registered_open = {
            let shared = self.shared.lock()?;
            let closed = self.closed.load(Ordering::Acquire);
            if closed && shared.ring.is_empty() {
                return Err(TakeError::Closed);
            }
            self.deq_waiters.fetch_add(1, Ordering::AcqRel);
            !closed
        };

        let acquired = self.occupied_slots.wait();
        let mut shared = self.resume(&self.deq_waiters)?;

        // Only consumers parked before close are counted by its drain gate
        let drain = if registered_open && self.closed.load(Ordering::Acquire) {
            shared.deq_drain.clone()
        } else {
            None
        };

        let outcome = match acquired {
            Ok(()) => self.dequeue(&mut shared),
            Err(err) => Err(TakeError::Sync(err)),
        };
        drop(shared);

        let signalled = self.signal_taken(&outcome);
        leave(drain)?;
        signalled?;

        if matches!(outcome, Err(TakeError::Closed)) {
            trace!("consumer released by close");
        }
        outcome
    }

    /// Remove the oldest item if one is available, without blocking
    ///
    /// 若有可用元素则移除最旧的元素，不阻塞
    ///
    /// # Errors
    /// - `TakeError::Empty` if nothing is buffered
    /// - `TakeError::Closed` if the queue is closed and empty
    ///
    /// # 错误
    /// - 没有缓冲元素时返回 `TakeError::Empty`
    /// - 队列已关闭且为空时返回 `TakeError::Closed`
    pub fn try_take(&self) -> Result<T, TakeError> {
        if !self.occupied_slots.try_wait()? {
            if self.closed.load(Ordering::Acquire) && self.len.load(Ordering::Acquire) == 0 {
                return Err(TakeError::Closed);
            }
            return Err(TakeError::Empty);
        }

        let outcome = {
            let mut shared = self.shared.lock()?;
            self.dequeue(&mut shared)
        };
        self.signal_taken(&outcome)?;
        outcome
    }

    /// Close the queue and release every parked thread
    ///
    /// 关闭队列并释放所有阻塞线程
    ///
    /// Returns once every thread that was blocked in `put` or `take` at close
    /// time has observed the closure and left its blocking call. Buffered
    /// items stay available to `take`. Calling `close` again is a no-op.
    ///
    /// 在关闭时阻塞于 `put` 或 `take` 的每个线程都观察到关闭并离开阻塞调用后返回。
    /// 已缓冲的元素仍可通过 `take` 获取。再次调用 `close` 不做任何事。
    pub fn close(&self) -> Result<(), SyncError> {
        let (enq_drain, deq_drain) = {
            let mut shared = self.shared.lock()?;
            if self.closed.swap(true, Ordering::AcqRel) {
                debug!("queue already closed");
                return Ok(());
            }

            let producers = self.enq_waiters.load(Ordering::Acquire);
            let consumers = self.deq_waiters.load(Ordering::Acquire);
            debug!(producers, consumers, "closing queue");

            shared.enq_drain = drain_gate(producers)?;
            shared.deq_drain = drain_gate(consumers)?;
            (shared.enq_drain.clone(), shared.deq_drain.clone())
        };

        // One permit per side; released threads pass it along. Consumers may
        // still register after close while items remain, so the consumer side
        // always gets its permit.
        if enq_drain.is_some() {
            self.free_slots.post()?;
        }
        self.occupied_slots.post()?;

        leave(enq_drain)?;
        leave(deq_drain)?;

        debug!("queue closed, parked threads drained");
        Ok(())
    }

    /// Close the queue, then hand every buffered item to `on_drop`
    ///
    /// 关闭队列，然后将每个缓冲元素交给 `on_drop`
    ///
    /// Items are passed in FIFO order, outside the queue mutex. Subsequent
    /// `take` calls return `TakeError::Closed`.
    ///
    /// 元素按 FIFO 顺序、在队列互斥锁之外传递。之后的 `take` 调用返回
    /// `TakeError::Closed`。
    pub fn close_with<F>(&self, on_drop: F) -> Result<(), SyncError>
    where
        F: FnMut(T),
    {
        self.close()?;

        let remaining: Vec<T> = {
            let mut shared = self.shared.lock()?;
            let items = shared.ring.drain().collect();
            self.len.store(0, Ordering::Release);
            items
        };

        remaining.into_iter().for_each(on_drop);
        Ok(())
    }

    /// Consume the queue, handing every buffered item to `on_drop`
    ///
    /// 消费队列，将每个缓冲元素交给 `on_drop`
    ///
    /// Taking `self` by value means no thread can still be blocked inside the
    /// queue.
    ///
    /// 按值获取 `self` 意味着不可能还有线程阻塞在队列中。
    pub fn destroy<F>(self, on_drop: F)
    where
        F: FnMut(T),
    {
        self.shared.into_inner().ring.destroy(on_drop);
    }

    /// Visit the buffered items in FIFO order while holding the queue mutex
    ///
    /// 持有队列互斥锁时按 FIFO 顺序访问缓冲元素
    ///
    /// The visitor must not call back into this queue.
    ///
    /// 访问者不得回调本队列。
    pub fn for_each<F>(&self, visitor: F) -> Result<usize, SyncError>
    where
        F: FnMut(&T) -> ControlFlow<()>,
    {
        Ok(self.shared.lock()?.ring.for_each(visitor))
    }

    /// Number of buffered items (advisory snapshot)
    ///
    /// 缓冲元素的数量（仅供参考的快照）
    #[inline]
    pub fn size(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    /// Check if no items are buffered (advisory snapshot)
    ///
    /// 检查是否没有缓冲元素（仅供参考的快照）
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Threads currently registered in `put`
    ///
    /// 当前登记在 `put` 中的线程数
    #[inline]
    pub fn enq_waiters(&self) -> usize {
        self.enq_waiters.load(Ordering::Acquire)
    }

    /// Threads currently registered in `take`
    ///
    /// 当前登记在 `take` 中的线程数
    #[inline]
    pub fn deq_waiters(&self) -> usize {
        self.deq_waiters.load(Ordering::Acquire)
    }

    /// Current lifecycle state (advisory snapshot)
    ///
    /// 当前生命周期状态（仅供参考的快照）
    pub fn state(&self) -> QueueState {
        if !self.is_closed() {
            return QueueState::Open;
        }
        if self.size() > 0 || self.enq_waiters() > 0 || self.deq_waiters() > 0 {
            QueueState::Closing
        } else {
            QueueState::Closed
        }
    }

    /// Relock after a semaphore wait and deregister the waiter
    fn resume(&self, waiters: &AtomicUsize) -> Result<MutexGuard<'_, Shared<T>>, SyncError> {
        let shared = self.shared.lock();
        waiters.fetch_sub(1, Ordering::AcqRel);
        shared
    }

    fn enqueue(&self, mut shared: MutexGuard<'_, Shared<T>>, item: T) -> Result<(), PutError<T>> {
        if let Err(PushError::Overflow(item)) = shared.ring.push(item) {
            // Permits and slots disagree; give the permit back
            drop(shared);
            self.free_slots.post()?;
            return Err(PutError::Full(item));
        }
        self.len.store(shared.ring.len(), Ordering::Release);
        drop(shared);

        self.occupied_slots.post()?;
        Ok(())
    }

    /// An empty ring after acquiring a permit means `close` issued the permit
    fn dequeue(&self, shared: &mut Shared<T>) -> Result<T, TakeError> {
        match shared.ring.pop() {
            Ok(item) => {
                self.len.store(shared.ring.len(), Ordering::Release);
                Ok(item)
            }
            Err(PopError::Underflow) => Err(TakeError::Closed),
        }
    }

    fn signal_taken(&self, outcome: &Result<T, TakeError>) -> Result<(), SyncError> {
        match outcome {
            Ok(_) => self.free_slots.post(),
            // Pass the close permit to the next parked consumer
            Err(TakeError::Closed) => self.occupied_slots.post(),
            Err(_) => Ok(()),
        }
    }
}

fn drain_gate(waiters: usize) -> Result<Option<Arc<CyclicBarrier>>, SyncError> {
    if waiters == 0 {
        return Ok(None);
    }
    Ok(Some(Arc::new(CyclicBarrier::new(waiters + 1)?)))
}

fn leave(drain: Option<Arc<CyclicBarrier>>) -> Result<(), SyncError> {
    if let Some(gate) = drain {
        gate.wait()?;
    }
    Ok(())
}

impl<T> fmt::Debug for BlockingBoundedQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockingBoundedQueue")
            .field("capacity", &self.capacity)
            .field("size", &self.size())
            .field("enq_waiters", &self.enq_waiters())
            .field("deq_waiters", &self.deq_waiters())
            .field("state", &self.state())
            .finish()
    }
}
