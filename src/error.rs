//! The pipeline's fixed error taxonomy
//!
//! Backend failures are logged where they happen (with the failing function
//! name and FFmpeg's error string) and then mapped into this closed set; the
//! raw backend codes never cross the public surface.

/// Errors surfaced by the decode/encode pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Error {
  /// A bounded wait expired before a result became available
  #[error("operation timed out")]
  Timeout,

  /// A required input was absent
  #[error("required pointer is null")]
  NullPointer,

  /// Argument validation failed
  #[error("invalid arguments")]
  Args,

  /// A handle invariant was violated at the call site
  #[error("invalid function entry")]
  Entry,

  /// The handle was initialized twice
  #[error("repeated initialization")]
  InitRepeated,

  /// The handle was used before configuration (or after its worker exited)
  #[error("not initialized")]
  NotInit,

  /// The allocator failed
  #[error("memory allocation failed")]
  MemoryAlloc,

  /// A bounded queue refused a slot
  #[error("cache overflow")]
  CacheOverflow,

  /// A backend allocation failed
  #[error("resource allocation failed")]
  ResourceAlloc,

  /// Cleanup failed
  #[error("resource release failed")]
  ResourceFree,

  /// File open failure
  #[error("failed to open file")]
  FileOpen,

  /// File write failure
  #[error("failed to write file")]
  FileWrite,

  /// File read failure
  #[error("failed to read file")]
  FileRead,

  /// The decoder exhausted the current url
  #[error("stream read to the end")]
  StreamEnd,

  /// The encoder flush did not complete
  #[error("stream flush failed")]
  StreamFlush,
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_error_display() {
    assert_eq!(Error::Timeout.to_string(), "operation timed out");
    assert_eq!(Error::StreamEnd.to_string(), "stream read to the end");
    assert_eq!(Error::NotInit.to_string(), "not initialized");
  }

  #[test]
  fn test_error_is_copy_eq() {
    let e = Error::CacheOverflow;
    let f = e;
    assert_eq!(e, f);
    assert_ne!(Error::Args, Error::Entry);
  }
}
