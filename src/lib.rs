//! # Closeable Blocking Bounded Queue
//!
//! 可关闭的阻塞有界队列
//!
//! `smallbbq` is a fixed-capacity multi-producer multi-consumer queue built from
//! first principles: a ring buffer plus a small synchronization layer
//! (counting semaphore, semaphore-backed mutex, cyclic barrier).
//!
//! `smallbbq` 是一个从底层构建的固定容量多生产者多消费者队列：一个环形缓冲区，
//! 加上一个小型同步层（计数信号量、基于信号量的互斥锁、循环屏障）。
//!
//! ## Features
//!
//! 特性
//!
//! - **Backpressure** - `put` blocks while the queue is full, `take` blocks while it is empty
//! - **Close** - Wakes every blocked thread exactly once and drains them before returning
//! - **No lost items** - Items buffered before close stay available to `take`
//! - **Owned values** - Items are moved in and out; rejected items are handed back
//! - **Model checked** - All primitives switch to loom under the `loom` feature
//!
//! - **背压** - 队列满时 `put` 阻塞，队列空时 `take` 阻塞
//! - **关闭** - 恰好唤醒每个阻塞线程一次，并在返回前将它们全部排空
//! - **不丢失元素** - 关闭前已缓冲的元素仍可通过 `take` 获取
//! - **所有权值** - 元素按值移入移出；被拒绝的元素会被返还
//! - **模型检查** - 启用 `loom` 特性时所有原语切换为 loom 实现
//!
//! ## Quick Start
//!
//! 快速开始
//!
//! ```rust
//! use smallbbq::{BlockingBoundedQueue, PutError, TakeError};
//!
//! let queue = BlockingBoundedQueue::new(2).unwrap();
//! queue.put("a").unwrap();
//! queue.put("b").unwrap();
//!
//! // Buffered items survive close
//! // 已缓冲的元素在关闭后仍然保留
//! queue.close().unwrap();
//! assert!(matches!(queue.put("c"), Err(PutError::Closed("c"))));
//!
//! assert_eq!(queue.take(), Ok("a"));
//! assert_eq!(queue.take(), Ok("b"));
//! assert_eq!(queue.take(), Err(TakeError::Closed));
//! ```
//!
//! ## Releasing Blocked Threads
//!
//! 释放阻塞线程
//!
//! ```rust
//! use smallbbq::BlockingBoundedQueue;
//! use std::sync::Arc;
//! use std::thread;
//!
//! let queue = Arc::new(BlockingBoundedQueue::new(1).unwrap());
//! queue.put(0).unwrap();
//!
//! // These producers block: the queue is full
//! // 这些生产者会阻塞：队列已满
//! let producers: Vec<_> = (1..=3)
//!     .map(|i| {
//!         let queue = Arc::clone(&queue);
//!         thread::spawn(move || queue.put(i))
//!     })
//!     .collect();
//!
//! queue.close().unwrap();
//! for producer in producers {
//!     assert!(producer.join().unwrap().unwrap_err().is_closed());
//! }
//! ```
//!
//! ## API Overview
//!
//! API 概览
//!
//! - `put(item)` / `take()` - Blocking insert and remove
//! - `try_put(item)` / `try_take()` - Non-blocking variants
//! - `close()` - Idempotent close that drains parked threads
//! - `close_with(f)` - Close, then hand remaining items to `f`
//! - `destroy(f)` - Consume the queue, handing remaining items to `f`
//! - `size()` / `is_empty()` / `state()` - Advisory snapshots
//!
//! - `put(item)` / `take()` - 阻塞式插入与移除
//! - `try_put(item)` / `try_take()` - 非阻塞版本
//! - `close()` - 幂等关闭，并排空阻塞线程
//! - `close_with(f)` - 关闭后将剩余元素交给 `f`
//! - `destroy(f)` - 消费队列，将剩余元素交给 `f`
//! - `size()` / `is_empty()` / `state()` - 仅供参考的快照
//!
//! ## Notes
//!
//! 注意事项
//!
//! - Item order is FIFO; wake order among blocked threads is best-effort
//! - Capacity is fixed at creation and is not rounded
//! - The crate logs through `tracing` and never installs a subscriber
//!
//! - 元素顺序为 FIFO；阻塞线程之间的唤醒顺序为尽力而为
//! - 容量在创建时固定，不会取整
//! - 本库通过 `tracing` 记录日志，从不安装订阅者

pub mod queue;
pub mod ring;
pub mod sync;
mod shim;

pub use queue::{BlockingBoundedQueue, PutError, QueueError, QueueState, TakeError};
pub use sync::SyncError;

#[cfg(all(test, not(feature = "loom")))]
mod tests;
