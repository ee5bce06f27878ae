//! A `block_on` for the embassy-time mock driver: every time the future is
//! pending, virtual time is advanced by one millisecond, so timer-heavy
//! protocol flows run instantly and deterministically.

use std::future::Future;
use std::task::{Context, Poll};

use embassy_time::{Duration, MockDriver};

// Virtual-time budget per test, in milliseconds
const MAX_TICKS: u64 = 1_000_000;

pub fn test_block_on<F: Future>(fut: F) -> F::Output {
    let mut fut = std::pin::pin!(fut);
    let waker = futures::task::noop_waker();
    let mut cx = Context::from_waker(&waker);
    for _ in 0..MAX_TICKS {
        match fut.as_mut().poll(&mut cx) {
            Poll::Ready(output) => return output,
            Poll::Pending => MockDriver::get().advance(Duration::from_millis(1)),
        }
    }
    panic!("test did not finish within {} ms of mock time", MAX_TICKS);
}
