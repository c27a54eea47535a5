//! The decode and encode pipeline cores
//!
//! Each handle owns at most one background worker: the decoder's producer
//! turns packets into ready frames, the encoder's consumer turns packets out
//! of the encoder into muxed bytes. The types here are the shared worker
//! plumbing; the cores live in `decoder` / `encoder`.

pub mod decoder;
pub mod encoder;
pub mod frame;
pub(crate) mod pool;

use std::sync::atomic::AtomicBool;
use std::sync::{Condvar, Mutex};

/// Worker-thread lifecycle flags
///
/// Plain booleans are not enough here: the foreground and the worker race on
/// these, so they carry acquire/release semantics.
#[derive(Default)]
pub(crate) struct WorkerFlags {
  /// The worker's main loop is alive
  pub(crate) is_running: AtomicBool,
  /// Cooperative shutdown request
  pub(crate) exit_flag: AtomicBool,
  /// A worker thread was spawned and must eventually be joined
  pub(crate) create_flag: AtomicBool,
}

/// A condvar with its guard mutex and a wake token
///
/// The token absorbs the signal-before-wait race: a waker that fires before
/// the sleeper arrives still gets observed.
#[derive(Default)]
pub(crate) struct WakeSync {
  pub(crate) mutex: Mutex<bool>,
  pub(crate) cond: Condvar,
}

impl WakeSync {
  /// Set the token and wake every sleeper
  pub(crate) fn notify_all(&self) {
    if let Ok(mut woken) = self.mutex.lock() {
      *woken = true;
    }
    self.cond.notify_all();
  }
}
