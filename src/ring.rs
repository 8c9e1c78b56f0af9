//! Fixed-capacity FIFO ring buffer
//!
//! 固定容量的 FIFO 环形缓冲区
//!
//! This is the storage layer of the blocking queue. It is deliberately not
//! thread-safe: every mutation takes `&mut self`, and the queue only touches it
//! while holding its mutex.
//!
//! 这是阻塞队列的存储层。它本身不是线程安全的：所有修改操作都需要 `&mut self`，
//! 队列只在持有互斥锁时访问它。
//!
//! - Capacity is fixed at creation and never rounded or resized
//! - `head` and `tail` are always kept modulo `capacity`
//! - A popped slot is reset to `None`, so no stale value is retained
//!
//! - 容量在创建时固定，不会取整也不会调整
//! - `head` 和 `tail` 始终对 `capacity` 取模
//! - 弹出后的槽位被重置为 `None`，不保留过期的值

use std::collections::TryReserveError;
use std::fmt;
use std::iter::FusedIterator;
use std::num::NonZero;
use std::ops::ControlFlow;
use thiserror::Error;

/// Ring buffer error for push operations
///
/// push 操作的环形缓冲区错误
#[derive(Clone, Copy, PartialEq, Eq, Error)]
pub enum PushError<T> {
    /// Buffer is full, the rejected value is handed back
    ///
    /// 缓冲区已满，被拒绝的值会被返还
    #[error("ring buffer is full")]
    Overflow(T),
}

impl<T> PushError<T> {
    /// Recover the value that could not be pushed
    ///
    /// 取回未能推送的值
    #[inline]
    pub fn into_inner(self) -> T {
        match self {
            PushError::Overflow(value) => value,
        }
    }
}

// Manual impl so that `T` does not need to be `Debug`.
impl<T> fmt::Debug for PushError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PushError::Overflow(_) => f.write_str("Overflow(..)"),
        }
    }
}

/// Ring buffer error for pop operations
///
/// pop 操作的环形缓冲区错误
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PopError {
    /// Buffer is empty
    ///
    /// 缓冲区为空
    #[error("ring buffer is empty")]
    Underflow,
}

/// Fixed-capacity circular FIFO buffer
///
/// 固定容量的循环 FIFO 缓冲区
///
/// # Examples
///
/// ```
/// use smallbbq::ring::{PushError, RingBuffer};
/// use std::num::NonZero;
///
/// let mut buf = RingBuffer::new(NonZero::new(2).unwrap());
/// buf.push(10).unwrap();
/// buf.push(20).unwrap();
/// assert!(matches!(buf.push(30), Err(PushError::Overflow(30))));
///
/// assert_eq!(buf.pop(), Ok(10));
/// assert_eq!(buf.peek(), Some(&20));
/// ```
pub struct RingBuffer<T> {
    /// Slot storage, `None` marks an empty slot
    ///
    /// 槽位存储，`None` 表示空槽位
    slots: Box<[Option<T>]>,

    /// Index of the next slot to read
    ///
    /// 下一个读取槽位的索引
    head: usize,

    /// Index of the next slot to write
    ///
    /// 下一个写入槽位的索引
    tail: usize,

    /// Number of occupied slots
    ///
    /// 已占用的槽位数量
    len: usize,
}

impl<T> RingBuffer<T> {
    /// Create a new ring buffer with the specified capacity
    ///
    /// 创建指定容量的新环形缓冲区
    ///
    /// Allocation failure aborts, as with every std collection. Use
    /// [`RingBuffer::try_new`] to observe it instead.
    ///
    /// 与所有 std 集合一样，分配失败会终止进程。如需处理分配失败，请使用
    /// [`RingBuffer::try_new`]。
    pub fn new(capacity: NonZero<usize>) -> Self {
        let mut slots = Vec::with_capacity(capacity.get());
        slots.resize_with(capacity.get(), || None);
        Self::from_slots(slots.into_boxed_slice())
    }

    /// Create a new ring buffer, reporting allocation failure
    ///
    /// 创建新的环形缓冲区，并报告分配失败
    pub fn try_new(capacity: NonZero<usize>) -> Result<Self, TryReserveError> {
        let mut slots = Vec::new();
        slots.try_reserve_exact(capacity.get())?;
        slots.resize_with(capacity.get(), || None);
        Ok(Self::from_slots(slots.into_boxed_slice()))
    }

    #[inline]
    fn from_slots(slots: Box<[Option<T>]>) -> Self {
        Self {
            slots,
            head: 0,
            tail: 0,
            len: 0,
        }
    }

    /// Get the capacity of the buffer
    ///
    /// 获取缓冲区容量
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Get the number of elements currently in the buffer
    ///
    /// 获取缓冲区中当前的元素数量
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if the buffer is empty
    ///
    /// 检查缓冲区是否为空
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Check if the buffer is full
    ///
    /// 检查缓冲区是否已满
    #[inline]
    pub fn is_full(&self) -> bool {
        self.len == self.capacity()
    }

    /// Get the number of free slots in the buffer
    ///
    /// 获取缓冲区中的空闲槽位数量
    #[inline]
    pub fn free_slots(&self) -> usize {
        self.capacity() - self.len
    }

    /// Push a value at the tail of the buffer
    ///
    /// 向缓冲区尾部推送一个值
    ///
    /// # Errors
    /// Returns `PushError::Overflow` with the value if the buffer is full
    ///
    /// # 错误
    /// 如果缓冲区满则返回携带该值的 `PushError::Overflow`
    #[inline]
    pub fn push(&mut self, value: T) -> Result<(), PushError<T>> {
        if self.is_full() {
            return Err(PushError::Overflow(value));
        }

        let slot = &mut self.slots[self.tail];
        debug_assert!(slot.is_none());
        *slot = Some(value);

        self.tail = (self.tail + 1) % self.capacity();
        self.len += 1;

        Ok(())
    }

    /// Pop the value at the head of the buffer
    ///
    /// 从缓冲区头部弹出一个值
    ///
    /// # Errors
    /// Returns `PopError::Underflow` if the buffer is empty
    ///
    /// # 错误
    /// 如果缓冲区空则返回 `PopError::Underflow`
    #[inline]
    pub fn pop(&mut self) -> Result<T, PopError> {
        if self.is_empty() {
            return Err(PopError::Underflow);
        }

        // Taking the value leaves `None` behind in the slot
        // 取出值后槽位中留下 `None`
        let value = self.slots[self.head].take().ok_or(PopError::Underflow)?;

        self.head = (self.head + 1) % self.capacity();
        self.len -= 1;

        Ok(value)
    }

    /// View the value at the head without removing it
    ///
    /// 查看头部的值但不移除它
    #[inline]
    pub fn peek(&self) -> Option<&T> {
        if self.is_empty() {
            return None;
        }
        self.slots[self.head].as_ref()
    }

    /// Visit the buffered values in FIFO order
    ///
    /// 按 FIFO 顺序访问缓冲区中的值
    ///
    /// The visitor returns `ControlFlow::Break(())` to stop early. The return
    /// value counts every value handed to the visitor, including the one that
    /// stopped the iteration.
    ///
    /// 访问者返回 `ControlFlow::Break(())` 可提前终止。返回值为交给访问者的值的
    /// 数量，包括终止迭代的那个值。
    ///
    /// # Examples
    ///
    /// ```
    /// use smallbbq::ring::RingBuffer;
    /// use std::num::NonZero;
    /// use std::ops::ControlFlow;
    ///
    /// let mut buf = RingBuffer::new(NonZero::new(4).unwrap());
    /// for i in 1..=4 {
    ///     buf.push(i).unwrap();
    /// }
    ///
    /// let mut seen = Vec::new();
    /// let visited = buf.for_each(|&v| {
    ///     seen.push(v);
    ///     if v == 2 { ControlFlow::Break(()) } else { ControlFlow::Continue(()) }
    /// });
    /// assert_eq!(visited, 2);
    /// assert_eq!(seen, vec![1, 2]);
    /// ```
    pub fn for_each<F>(&self, mut visitor: F) -> usize
    where
        F: FnMut(&T) -> ControlFlow<()>,
    {
        let mut visited = 0;
        for value in self.iter() {
            visited += 1;
            if visitor(value).is_break() {
                break;
            }
        }
        visited
    }

    /// Iterate over the buffered values in FIFO order
    ///
    /// 按 FIFO 顺序迭代缓冲区中的值
    #[inline]
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            ring: self,
            offset: 0,
        }
    }

    /// Create a draining iterator that pops values until the buffer is empty
    ///
    /// 创建消费迭代器，持续弹出值直到缓冲区为空
    #[inline]
    pub fn drain(&mut self) -> Drain<'_, T> {
        Drain { ring: self }
    }

    /// Remove and drop all values
    ///
    /// 移除并 drop 所有值
    pub fn clear(&mut self) {
        while self.pop().is_ok() {
            // Values are dropped automatically
        }
    }

    /// Tear the buffer down, handing every remaining value to `on_drop`
    ///
    /// 销毁缓冲区，并将剩余的每个值交给 `on_drop`
    ///
    /// Values are visited from head to head + len - 1, wrapping, before the
    /// storage is released.
    ///
    /// 在释放存储之前，按从 head 到 head + len - 1（环绕）的顺序访问值。
    pub fn destroy<F>(mut self, on_drop: F)
    where
        F: FnMut(T),
    {
        self.drain().for_each(on_drop);
    }
}

impl<T> fmt::Debug for RingBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RingBuffer")
            .field("capacity", &self.capacity())
            .field("len", &self.len)
            .field("head", &self.head)
            .field("tail", &self.tail)
            .finish()
    }
}

/// Borrowing FIFO iterator over a ring buffer
///
/// 环形缓冲区的借用 FIFO 迭代器
pub struct Iter<'a, T> {
    ring: &'a RingBuffer<T>,
    offset: usize,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        if self.offset >= self.ring.len {
            return None;
        }
        let index = (self.ring.head + self.offset) % self.ring.capacity();
        self.offset += 1;
        self.ring.slots[index].as_ref()
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.ring.len - self.offset;
        (remaining, Some(remaining))
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}
impl<T> FusedIterator for Iter<'_, T> {}

/// Draining iterator for the ring buffer
///
/// 环形缓冲区的消费迭代器
///
/// Values not consumed by the iterator stay in the buffer.
///
/// 迭代器未消费的值保留在缓冲区中。
pub struct Drain<'a, T> {
    ring: &'a mut RingBuffer<T>,
}

impl<T> Iterator for Drain<'_, T> {
    type Item = T;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.ring.pop().ok()
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.ring.len();
        (len, Some(len))
    }
}

impl<T> ExactSizeIterator for Drain<'_, T> {}
impl<T> FusedIterator for Drain<'_, T> {}
