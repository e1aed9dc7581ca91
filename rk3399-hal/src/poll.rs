//! # Busy polling of hardware status
//!
//! Most DRAM status bits are guaranteed by the hardware to assert in bounded time, so they are
//! polled without a software timeout. The few handshakes which may hang are polled with a
//! [Deadline].
use core::task::Poll;

use crate::time::{Duration, Instant, Monotonic};

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("polling timed out after {timeout_us} us")]
pub struct TimeoutError {
    pub timeout_us: u64,
}

/// Point in time after which a poll loop gives up.
pub struct Deadline<'clock> {
    clock: &'clock mut dyn Monotonic,
    expires_at: Instant,
    timeout: Duration,
}

impl<'clock> Deadline<'clock> {
    pub fn after(clock: &'clock mut dyn Monotonic, timeout: Duration) -> Self {
        let expires_at = clock.now() + timeout;
        Self {
            clock,
            expires_at,
            timeout,
        }
    }

    #[inline]
    pub fn expired(&mut self) -> bool {
        self.clock.now() >= self.expires_at
    }

    #[inline]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Calls `poll` until it returns [Poll::Ready].
///
/// The closure is always called at least once. With a [Deadline], the loop returns a
/// [TimeoutError] once the deadline has expired after an unsuccessful poll. Without one, the
/// loop never times out.
pub fn poll_until<T>(
    mut deadline: Option<Deadline<'_>>,
    mut poll: impl FnMut() -> Poll<T>,
) -> Result<T, TimeoutError> {
    loop {
        if let Poll::Ready(value) = poll() {
            return Ok(value);
        }
        if let Some(deadline) = deadline.as_mut() {
            if deadline.expired() {
                return Err(TimeoutError {
                    timeout_us: deadline.timeout().to_micros(),
                });
            }
        }
        core::hint::spin_loop();
    }
}

/// Unbounded variant of [poll_until].
pub fn poll_forever<T>(poll: impl FnMut() -> Poll<T>) -> T {
    match poll_until(None, poll) {
        Ok(value) => value,
        Err(_) => unreachable!("polling without deadline can not time out"),
    }
}

/// Waits until `condition` returns `true` or the optional deadline expires.
pub fn wait_until(
    deadline: Option<Deadline<'_>>,
    mut condition: impl FnMut() -> bool,
) -> Result<(), TimeoutError> {
    poll_until(deadline, || {
        if condition() {
            Poll::Ready(())
        } else {
            Poll::Pending
        }
    })
}

/// Waits until `condition` returns `true`, without timeout.
pub fn wait_forever(mut condition: impl FnMut() -> bool) {
    poll_forever(|| {
        if condition() {
            Poll::Ready(())
        } else {
            Poll::Pending
        }
    })
}
