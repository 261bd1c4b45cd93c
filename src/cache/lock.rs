use std::sync::{Mutex, MutexGuard};

use tracing::warn;

/// Acquire `lock`, taking the inner value back if a previous holder panicked.
///
/// Cached bytes are disposable, so a poisoned map is still served.
pub(crate) fn lock_entries<'a, T>(
    lock: &'a Mutex<T>,
    target: &'static str,
    op: &'static str,
) -> MutexGuard<'a, T> {
    lock.lock().unwrap_or_else(|poisoned| {
        warn!(
            op,
            target_module = target,
            result = "poisoned_recovered",
            "recovered from poisoned cache lock"
        );
        poisoned.into_inner()
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn poisoned_lock_still_yields_entries() {
        let lock = Arc::new(Mutex::new(vec![1u8]));
        let poisoner = lock.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.lock().expect("first lock");
            panic!("poison the lock");
        })
        .join();

        assert!(lock.is_poisoned());
        assert_eq!(*lock_entries(&lock, "test", "read"), vec![1u8]);
    }
}
