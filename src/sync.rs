//! Spin lock for state shared between the shell and the mounted volumes.
//!
//! Everything runs in one cooperative context, so the lock is never contended
//! in practice. Re-locking from the same context would spin forever, which is
//! why the adapter never holds it across event dispatch.

use core::sync::atomic::{AtomicBool, Ordering};

use lock_api::{GuardSend, RawMutex};

pub struct RawSpin {
    lock: AtomicBool,
}

unsafe impl RawMutex for RawSpin {
    type GuardMarker = GuardSend;
    #[allow(clippy::declare_interior_mutable_const)]
    const INIT: Self = Self {
        lock: AtomicBool::new(false),
    };

    fn lock(&self) {
        while self
            .lock
            .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            while self.lock.load(Ordering::Relaxed) {
                core::hint::spin_loop();
            }
        }
    }

    fn try_lock(&self) -> bool {
        self.lock
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    unsafe fn unlock(&self) {
        self.lock.store(false, Ordering::Release);
    }
}

pub type Mutex<T> = lock_api::Mutex<RawSpin, T>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_lock_fails_while_held() {
        let m = Mutex::new(5u32);
        let guard = m.lock();
        assert!(m.try_lock().is_none());
        drop(guard);
        let mut guard = m.try_lock().unwrap();
        *guard += 1;
        drop(guard);
        assert_eq!(*m.lock(), 6);
    }
}
