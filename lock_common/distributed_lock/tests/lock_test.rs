use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

use distributed_lock::{DistributedLock, DistributedLockError, LockContext, LockStore, MemoryStore};
use mockall::mock;

mock! {
    pub Store {}
    impl LockStore for Store {
        fn try_set(&self, key: &str, token: &str, ttl_millis: u64) -> distributed_lock::Result<bool>;
        fn compare_and_delete(&self, key: &str, expected: &str) -> distributed_lock::Result<u64>;
    }
}

fn shared_lock() -> Arc<DistributedLock<MemoryStore>> {
    Arc::new(DistributedLock::new(MemoryStore::new()))
}

#[test]
fn test_only_one_of_many_concurrent_callers_wins() {
    let lock = shared_lock();
    let callers = 16;
    let barrier = Arc::new(Barrier::new(callers));

    let handles: Vec<_> = (0..callers)
        .map(|_| {
            let lock = Arc::clone(&lock);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let mut ctx = LockContext::new();
                barrier.wait();
                let won = lock.acquire(&mut ctx, "inventory", 10_000, 0, 0);
                (won, ctx)
            })
        })
        .collect();

    let mut results: Vec<(bool, LockContext)> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(results.iter().filter(|(won, _)| *won).count(), 1);

    let (_, winner) = results.iter_mut().find(|(won, _)| *won).unwrap();
    assert!(lock.release(winner, "inventory"));
    assert!(lock.store().is_empty());
}

#[test]
fn test_critical_sections_never_overlap() {
    let lock = shared_lock();
    let inside = Arc::new(AtomicUsize::new(0));
    let entered = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let lock = Arc::clone(&lock);
            let inside = Arc::clone(&inside);
            let entered = Arc::clone(&entered);
            thread::spawn(move || {
                let mut ctx = LockContext::new();
                for _ in 0..5 {
                    assert!(lock.acquire(&mut ctx, "counter", 10_000, 1_000, 1));
                    assert_eq!(inside.fetch_add(1, Ordering::SeqCst), 0);
                    thread::sleep(Duration::from_millis(1));
                    inside.fetch_sub(1, Ordering::SeqCst);
                    entered.fetch_add(1, Ordering::SeqCst);
                    assert!(lock.release(&mut ctx, "counter"));
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(entered.load(Ordering::SeqCst), 40);
}

#[test]
fn test_non_holder_release_leaves_record_intact() {
    let lock = shared_lock();
    let mut holder = LockContext::new();
    let mut intruder = LockContext::new();

    assert!(lock.acquire(&mut holder, "k", 10_000, 0, 0));
    let token = holder.current("k").cloned().unwrap();

    assert!(!lock.release(&mut intruder, "k"));
    assert_eq!(lock.store().get("k").as_deref(), Some(token.as_str()));

    assert!(lock.release(&mut holder, "k"));
    assert!(lock.store().get("k").is_none());
}

#[test]
fn test_other_caller_acquires_immediately_after_release() {
    let lock = shared_lock();
    let mut first = LockContext::new();
    let mut second = LockContext::new();

    assert!(lock.acquire(&mut first, "k", 10_000, 0, 0));
    assert!(!lock.acquire(&mut second, "k", 10_000, 0, 0));
    assert!(lock.release(&mut first, "k"));
    assert!(lock.acquire(&mut second, "k", 10_000, 0, 0));
    assert!(lock.release(&mut second, "k"));
}

#[test]
fn test_expired_lock_can_be_taken_and_old_holder_cannot_delete_it() {
    let lock = shared_lock();
    let mut stale = LockContext::new();
    let mut fresh = LockContext::new();

    assert!(lock.acquire(&mut stale, "k", 50, 0, 0));
    thread::sleep(Duration::from_millis(100));

    assert!(lock.acquire(&mut fresh, "k", 10_000, 0, 0));
    assert!(!lock.release(&mut stale, "k"));
    assert_eq!(
        lock.store().get("k").as_deref(),
        fresh.current("k").map(|t| t.as_str())
    );
    assert!(lock.release(&mut fresh, "k"));
}

#[test]
fn test_forced_expiry_frees_the_key() {
    let lock = shared_lock();
    let mut crashed = LockContext::new();
    let mut next = LockContext::new();

    assert!(lock.acquire(&mut crashed, "k", 60_000, 0, 0));
    lock.store().expire("k");
    assert!(lock.acquire(&mut next, "k", 60_000, 0, 0));
    assert!(lock.release(&mut next, "k"));
    crashed.clear("k");
}

#[test]
fn test_held_key_fails_after_exact_retry_count() {
    let mut store = MockStore::new();
    store
        .expect_try_set()
        .withf(|key, _, ttl| key == "busy" && *ttl == 1000)
        .times(4)
        .returning(|_, _, _| Ok(false));
    let lock = DistributedLock::new(store);
    let mut ctx = LockContext::new();

    let start = Instant::now();
    assert!(!lock.acquire(&mut ctx, "busy", 1000, 3, 50));
    let elapsed = start.elapsed();

    assert!(elapsed >= Duration::from_millis(150));
    assert!(elapsed < Duration::from_millis(1000));
    assert!(ctx.current("busy").is_none());
}

#[test]
fn test_every_attempt_uses_a_fresh_token() {
    let seen = Arc::new(recorder::Tokens::default());
    let recorder = Arc::clone(&seen);
    let mut store = MockStore::new();
    store.expect_try_set().times(3).returning(move |_, token, _| {
        recorder.push(token.to_string());
        Ok(false)
    });
    let lock = DistributedLock::new(store);
    let mut ctx = LockContext::new();

    assert!(!lock.acquire(&mut ctx, "k", 1000, 2, 0));
    let tokens = seen.all();
    assert_eq!(tokens.len(), 3);
    assert_ne!(tokens[0], tokens[1]);
    assert_ne!(tokens[1], tokens[2]);
    assert_ne!(tokens[0], tokens[2]);
}

#[test]
fn test_store_failure_during_acquire_is_retried() {
    let mut store = MockStore::new();
    let mut calls = 0;
    store.expect_try_set().times(2).returning(move |_, _, _| {
        calls += 1;
        if calls == 1 {
            Err(DistributedLockError::StoreUnavailable("connection refused".to_string()))
        } else {
            Ok(true)
        }
    });
    store.expect_compare_and_delete().times(1).returning(|_, _| Ok(1));
    let lock = DistributedLock::new(store);
    let mut ctx = LockContext::new();

    assert!(lock.acquire(&mut ctx, "k", 1000, 1, 0));
    assert!(lock.release(&mut ctx, "k"));
}

#[test]
fn test_store_failure_during_release_returns_false_and_clears_binding() {
    let mut store = MockStore::new();
    store.expect_try_set().times(1).returning(|_, _, _| Ok(true));
    store
        .expect_compare_and_delete()
        .times(1)
        .returning(|_, _| Err(DistributedLockError::StoreUnavailable("timeout".to_string())));
    let lock = DistributedLock::new(store);
    let mut ctx = LockContext::new();

    assert!(lock.acquire(&mut ctx, "k", 1000, 0, 0));
    assert!(!lock.release(&mut ctx, "k"));
    assert!(ctx.current("k").is_none());
}

#[test]
fn test_release_without_token_sends_impossible_value() {
    let mut store = MockStore::new();
    store
        .expect_compare_and_delete()
        .withf(|key, expected| key == "k" && expected.is_empty())
        .times(1)
        .returning(|_, _| Ok(0));
    let lock = DistributedLock::new(store);
    let mut ctx = LockContext::new();

    assert!(!lock.release(&mut ctx, "k"));
}

#[test]
fn test_cross_task_release_always_fails() {
    let lock = shared_lock();
    let acquired = Arc::new(Barrier::new(2));
    let crossed = Arc::new(Barrier::new(2));

    let spawn_task = |own: &'static str, other: &'static str| {
        let lock = Arc::clone(&lock);
        let acquired = Arc::clone(&acquired);
        let crossed = Arc::clone(&crossed);
        thread::spawn(move || {
            let mut ctx = LockContext::new();
            assert!(lock.acquire(&mut ctx, own, 10_000, 0, 0));
            acquired.wait();
            let cross_released = lock.release(&mut ctx, other);
            crossed.wait();
            let own_released = lock.release(&mut ctx, own);
            (cross_released, own_released)
        })
    };

    let a = spawn_task("k1", "k2");
    let b = spawn_task("k2", "k1");
    assert_eq!(a.join().unwrap(), (false, true));
    assert_eq!(b.join().unwrap(), (false, true));
    assert!(lock.store().is_empty());
}

#[test]
fn test_lock_instances_sharing_a_store_exclude_each_other() {
    let store = Arc::new(MemoryStore::new());
    let first: DistributedLock<Arc<MemoryStore>> = DistributedLock::new(Arc::clone(&store));
    let second: DistributedLock<Arc<MemoryStore>> = DistributedLock::new(Arc::clone(&store));
    let mut a = LockContext::new();
    let mut b = LockContext::new();

    assert!(first.acquire(&mut a, "shared", 10_000, 0, 0));
    assert!(!second.acquire(&mut b, "shared", 10_000, 1, 1));
    assert_eq!(store.get("shared").as_deref(), a.current("shared").map(|t| t.as_str()));

    assert!(!second.release(&mut b, "shared"));
    assert!(first.release(&mut a, "shared"));
    assert!(second.acquire(&mut b, "shared", 10_000, 0, 0));
    assert!(second.release(&mut b, "shared"));
    assert!(store.is_empty());
}

#[test]
fn test_second_release_returns_false() {
    let lock = shared_lock();
    let mut ctx = LockContext::new();

    assert!(lock.acquire(&mut ctx, "k", 10_000, 0, 0));
    assert!(lock.release(&mut ctx, "k"));
    assert!(!lock.release(&mut ctx, "k"));
}

#[test]
fn test_interrupt_aborts_retry_loop() {
    let lock = shared_lock();
    let mut holder = LockContext::new();
    assert!(lock.acquire(&mut holder, "k", 60_000, 0, 0));

    let mut waiter = LockContext::new();
    let interrupter = waiter.interrupter();
    let waiting = {
        let lock = Arc::clone(&lock);
        thread::spawn(move || {
            let start = Instant::now();
            let acquired = lock.acquire_default(&mut waiter, "k");
            (acquired, start.elapsed())
        })
    };

    thread::sleep(Duration::from_millis(100));
    interrupter.interrupt();
    let (acquired, elapsed) = waiting.join().unwrap();

    assert!(!acquired);
    assert!(elapsed < Duration::from_secs(5));
    assert!(lock.release(&mut holder, "k"));
}

#[test]
fn test_convenience_forms_use_defaults() {
    let mut store = MockStore::new();
    store
        .expect_try_set()
        .withf(|_, _, ttl| *ttl == distributed_lock::DEFAULT_EXPIRE_MILLIS)
        .times(2)
        .returning(|_, _, _| Ok(false));
    store
        .expect_try_set()
        .withf(|_, _, ttl| *ttl == 750)
        .times(1)
        .returning(|_, _, _| Ok(false));
    let lock = DistributedLock::new(store);
    let mut ctx = LockContext::new();

    assert!(!lock.acquire_with_retries_and_sleep(&mut ctx, "k", 1, 1));
    assert!(!lock.acquire_with_expire_and_retries(&mut ctx, "k", 750, 0));
}

/// Small thread-safe recorder for tokens seen by the mock
mod recorder {
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct Tokens(Mutex<Vec<String>>);

    impl Tokens {
        pub fn push(&self, token: String) {
            self.0.lock().unwrap().push(token);
        }

        pub fn all(&self) -> Vec<String> {
            self.0.lock().unwrap().clone()
        }
    }
}
