//! Bootstrap barrier concurrency tests
//!
//! Many waiters, one writer, and the shutdown paths around them.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};
use umbra_net::{
    BootstrapBarrier, BootstrapOutcome, BootstrapState, Error, FnStep, InterruptSignal,
    PrepareDirectories, TorBootstrap, TorPaths,
};

const WAITERS: usize = 16;

#[test]
fn test_all_waiters_released_after_signal() {
    let barrier = Arc::new(BootstrapBarrier::new());
    let released = Arc::new(AtomicUsize::new(0));
    let started = Arc::new(Barrier::new(WAITERS + 1));

    let handles: Vec<_> = (0..WAITERS)
        .map(|_| {
            let barrier = Arc::clone(&barrier);
            let released = Arc::clone(&released);
            let started = Arc::clone(&started);
            thread::spawn(move || {
                started.wait();
                barrier.wait_ready();
                released.fetch_add(1, Ordering::SeqCst);
            })
        })
        .collect();

    started.wait();
    thread::sleep(Duration::from_millis(50));
    // Nobody gets through before the writer signals
    assert_eq!(released.load(Ordering::SeqCst), 0);
    assert!(!barrier.is_ready());

    let writer = {
        let barrier = Arc::clone(&barrier);
        thread::spawn(move || barrier.signal_ready())
    };
    assert!(writer.join().unwrap());

    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(released.load(Ordering::SeqCst), WAITERS);
}

#[test]
fn test_second_signal_is_noop() {
    let barrier = Arc::new(BootstrapBarrier::new());
    assert!(barrier.signal_ready());

    let late: Vec<_> = (0..4)
        .map(|_| {
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || barrier.wait_ready_timeout(Duration::from_secs(5)))
        })
        .collect();
    for handle in late {
        assert!(handle.join().unwrap());
    }

    assert!(!barrier.signal_ready());
    assert_eq!(barrier.state(), BootstrapState::Ready);
}

#[test]
fn test_waiters_released_by_bootstrap_thread() {
    let dir = tempfile::tempdir().unwrap();
    let barrier = Arc::new(BootstrapBarrier::new());
    let interrupt = InterruptSignal::new();

    let waiters: Vec<_> = (0..WAITERS)
        .map(|_| {
            let barrier = Arc::clone(&barrier);
            let interrupt = interrupt.clone();
            thread::spawn(move || barrier.wait_ready_interruptible(&interrupt, Duration::from_millis(20)))
        })
        .collect();

    let handle = TorBootstrap::new(Arc::clone(&barrier), interrupt.clone())
        .step(PrepareDirectories::new(TorPaths::new(dir.path())))
        .step(FnStep::new("slow_handshake", |_: &InterruptSignal| {
            thread::sleep(Duration::from_millis(60));
            Ok(())
        }))
        .spawn()
        .unwrap();

    assert_eq!(handle.join().unwrap(), BootstrapOutcome::Ready);
    for waiter in waiters {
        assert!(waiter.join().unwrap().is_ok());
    }
}

#[test]
fn test_abandoned_bootstrap_does_not_hang_interruptible_waiters() {
    let barrier = Arc::new(BootstrapBarrier::new());
    let interrupt = InterruptSignal::new();

    let waiters: Vec<_> = (0..4)
        .map(|_| {
            let barrier = Arc::clone(&barrier);
            let interrupt = interrupt.clone();
            thread::spawn(move || barrier.wait_ready_interruptible(&interrupt, Duration::from_millis(10)))
        })
        .collect();

    let handle = TorBootstrap::new(Arc::clone(&barrier), interrupt.clone())
        .step(FnStep::new("control_connect", |interrupt: &InterruptSignal| {
            while !interrupt.is_interrupted() {
                thread::sleep(Duration::from_millis(5));
            }
            Err(Error::Interrupted)
        }))
        .spawn()
        .unwrap();

    thread::sleep(Duration::from_millis(30));
    interrupt.interrupt();

    assert_eq!(
        handle.join().unwrap(),
        BootstrapOutcome::Abandoned {
            step: "control_connect".to_string()
        }
    );
    assert!(!barrier.is_ready());
    for waiter in waiters {
        // Either the shutdown or the exiting writer releases them first
        assert!(matches!(
            waiter.join().unwrap(),
            Err(Error::Interrupted) | Err(Error::BootstrapAbandoned)
        ));
    }
}

#[test]
fn test_failed_bootstrap_releases_interruptible_waiters() {
    let barrier = Arc::new(BootstrapBarrier::new());
    // Never raised: only the failing writer may end the wait
    let interrupt = InterruptSignal::new();

    let waiters: Vec<_> = (0..4)
        .map(|_| {
            let barrier = Arc::clone(&barrier);
            let interrupt = interrupt.clone();
            thread::spawn(move || barrier.wait_ready_interruptible(&interrupt, Duration::from_millis(50)))
        })
        .collect();

    let handle = TorBootstrap::new(Arc::clone(&barrier), interrupt.clone())
        .step(FnStep::new("control", |_: &InterruptSignal| {
            thread::sleep(Duration::from_millis(20));
            Err(Error::Tor("control port refused authentication".to_string()))
        }))
        .spawn()
        .unwrap();

    assert!(matches!(
        handle.join().unwrap(),
        BootstrapOutcome::Failed { ref step, .. } if step == "control"
    ));

    let deadline = Instant::now() + Duration::from_secs(5);
    for waiter in waiters {
        while !waiter.is_finished() {
            assert!(Instant::now() < deadline, "waiter still blocked after writer failed");
            thread::sleep(Duration::from_millis(5));
        }
        assert!(matches!(waiter.join().unwrap(), Err(Error::BootstrapAbandoned)));
    }
    assert!(!barrier.is_ready());
    assert!(!interrupt.is_interrupted());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_async_listeners_released() {
    let barrier = Arc::new(BootstrapBarrier::new());
    let interrupt = InterruptSignal::new();

    let tasks: Vec<_> = (0..WAITERS)
        .map(|_| {
            let barrier = Arc::clone(&barrier);
            let interrupt = interrupt.clone();
            tokio::spawn(async move { barrier.ready_or_interrupted(&interrupt).await })
        })
        .collect();

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(tasks.iter().all(|t| !t.is_finished()));

    let writer = {
        let barrier = Arc::clone(&barrier);
        std::thread::spawn(move || barrier.signal_ready())
    };
    assert!(writer.join().unwrap());

    for task in tasks {
        let result = tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("listener should be released")
            .unwrap();
        assert!(result.is_ok());
    }
}
