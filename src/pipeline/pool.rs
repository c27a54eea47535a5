//! Bounded frame pool: the free and ready queues
//!
//! A fixed set of preallocated frame slots circulates between two bounded
//! FIFO channels. Moving the `Box` moves ownership, so a slot can never be
//! referenced from two queues at once; `try_send` on a full channel is a
//! bookkeeping violation and surfaces as `CacheOverflow`.

use std::time::Duration;

use crossbeam::channel::{Receiver, RecvTimeoutError, Sender, TrySendError, bounded};
use log::error;

use crate::error::{Error, Result};
use crate::pipeline::frame::{ImageSpec, VideoFrame};

/// Hard ceiling on the number of pool slots
pub const MAX_CACHE_FRAMES: usize = 1024;

/// One bounded FIFO of frame slots
#[derive(Clone)]
pub(crate) struct FrameQueue {
  tx: Sender<Box<VideoFrame>>,
  rx: Receiver<Box<VideoFrame>>,
}

impl FrameQueue {
  pub(crate) fn new(capacity: usize) -> Self {
    let (tx, rx) = bounded(capacity);
    Self { tx, rx }
  }

  /// Hand a slot to this queue
  pub(crate) fn put(&self, frame: Box<VideoFrame>) -> Result<()> {
    match self.tx.try_send(frame) {
      Ok(()) => Ok(()),
      Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
        error!("Frame queue refused a slot, the queue is illegally occupied");
        Err(Error::CacheOverflow)
      }
    }
  }

  /// Take a slot, waiting up to `timeout`
  pub(crate) fn get_timeout(&self, timeout: Duration) -> Result<Box<VideoFrame>> {
    match self.rx.recv_timeout(timeout) {
      Ok(frame) => Ok(frame),
      Err(RecvTimeoutError::Timeout) => Err(Error::Timeout),
      Err(RecvTimeoutError::Disconnected) => Err(Error::NotInit),
    }
  }

  /// Take a slot without waiting
  pub(crate) fn get_nonblocking(&self) -> Result<Box<VideoFrame>> {
    self.rx.try_recv().map_err(|_| Error::Timeout)
  }

  /// Take a slot, waiting forever
  pub(crate) fn get_blocking(&self) -> Result<Box<VideoFrame>> {
    self.rx.recv().map_err(|_| Error::NotInit)
  }
}

/// The decoder's slot pool: a free queue and a ready queue of equal bound
pub(crate) struct FramePool {
  pub(crate) free: FrameQueue,
  pub(crate) ready: FrameQueue,
  capacity: usize,
}

impl FramePool {
  /// Allocate `cache_count` slots (clamped into 1..=1024), each
  /// preallocated with `img` when conversion is enabled, and park them all
  /// on the free queue
  pub(crate) fn alloc(img: Option<&ImageSpec>, cache_count: u16) -> Result<Self> {
    let capacity = (cache_count as usize).clamp(1, MAX_CACHE_FRAMES);

    let pool = Self {
      free: FrameQueue::new(capacity),
      ready: FrameQueue::new(capacity),
      capacity,
    };

    for _ in 0..capacity {
      let frame = VideoFrame::alloc(img)?;
      pool.free.put(frame)?;
    }

    Ok(pool)
  }

  /// The slot count the pool was built with
  #[inline]
  pub(crate) fn capacity(&self) -> usize {
    self.capacity
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  // Pool allocation without image memory touches only the frame skeletons,
  // so the bookkeeping is testable without decoding anything.

  #[test]
  fn test_pool_capacity_clamping() {
    let pool = FramePool::alloc(None, 0).unwrap();
    assert_eq!(pool.capacity(), 1);

    let pool = FramePool::alloc(None, 4).unwrap();
    assert_eq!(pool.capacity(), 4);
  }

  #[test]
  fn test_slot_conservation() {
    let pool = FramePool::alloc(None, 2).unwrap();

    // Both slots start free
    let a = pool.free.get_nonblocking().unwrap();
    let b = pool.free.get_nonblocking().unwrap();
    assert!(pool.free.get_nonblocking().is_err());

    // Publish one, recycle one
    pool.ready.put(a).unwrap();
    pool.free.put(b).unwrap();

    let a = pool.ready.get_nonblocking().unwrap();
    pool.free.put(a).unwrap();

    // All slots accounted for on the free queue again
    assert!(pool.free.get_nonblocking().is_ok());
    assert!(pool.free.get_nonblocking().is_ok());
    assert!(pool.free.get_nonblocking().is_err());
  }

  #[test]
  fn test_queue_timeout() {
    let q = FrameQueue::new(1);
    let err = q.get_timeout(Duration::from_millis(1)).unwrap_err();
    assert_eq!(err, Error::Timeout);
    assert_eq!(q.get_nonblocking().unwrap_err(), Error::Timeout);
  }
}
