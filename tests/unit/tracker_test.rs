use futures::FutureExt;
use proptest::prelude::*;
use reactive_list_bench::tracker::{CompletionRegistry, PendingCompletion, QuiescenceTracker};
use reactive_list_bench::UpdateError;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tokio::task::LocalSet;
use tokio_test::{assert_err, assert_ok};

/// A completion that, once it has yielded, registers `depth` more levels
/// behind it before resolving.
fn chained(registry: CompletionRegistry, depth: usize, done: Rc<RefCell<Vec<usize>>>) -> PendingCompletion {
    async move {
        tokio::task::yield_now().await;
        if depth > 0 {
            registry.register(chained(registry.clone(), depth - 1, done.clone()));
        }
        done.borrow_mut().push(depth);
        Ok(())
    }
    .boxed_local()
}

/// A completion that registers `fanouts[level]` children, each of which
/// continues one level deeper.
fn fanned(registry: CompletionRegistry, fanouts: Rc<Vec<usize>>, level: usize, done: Rc<Cell<usize>>) -> PendingCompletion {
    async move {
        tokio::task::yield_now().await;
        if let Some(&fanout) = fanouts.get(level) {
            for _ in 0..fanout {
                registry.register(fanned(registry.clone(), fanouts.clone(), level + 1, done.clone()));
            }
        }
        done.set(done.get() + 1);
        Ok(())
    }
    .boxed_local()
}

#[tokio::test]
async fn test_settle_waits_for_transitive_registrations() {
    let registry = CompletionRegistry::new();
    let tracker = QuiescenceTracker::new(registry.clone());
    let done = Rc::new(RefCell::new(Vec::new()));
    registry.register(chained(registry.clone(), 4, done.clone()));

    let report = tracker.settle().await.unwrap();

    assert_eq!(*done.borrow(), vec![4, 3, 2, 1, 0]);
    assert_eq!(report.rounds, 5);
    assert_eq!(report.completions, 5);
    assert!(registry.is_empty());
}

#[tokio::test]
async fn test_settle_awaits_a_round_concurrently() {
    let registry = CompletionRegistry::new();
    let tracker = QuiescenceTracker::new(registry.clone());
    let done = Rc::new(RefCell::new(Vec::new()));
    for _ in 0..3 {
        registry.register(chained(registry.clone(), 0, done.clone()));
    }

    let report = tracker.settle().await.unwrap();

    assert_eq!(done.borrow().len(), 3);
    assert_eq!(report.rounds, 1);
    assert_eq!(report.completions, 3);
}

#[tokio::test]
async fn test_settle_picks_up_work_scheduled_before_the_call() {
    LocalSet::new()
        .run_until(async {
            let registry = CompletionRegistry::new();
            let tracker = QuiescenceTracker::new(registry.clone());
            let resolved = Rc::new(Cell::new(false));

            // Registers only once the local task gets a turn, after settle
            // has already found the registry empty.
            let late = registry.clone();
            let flag = resolved.clone();
            tokio::task::spawn_local(async move {
                late.register(
                    async move {
                        flag.set(true);
                        Ok(())
                    }
                    .boxed_local(),
                );
            });

            let report = assert_ok!(tracker.settle().await);
            assert!(resolved.get());
            assert_eq!(report.completions, 1);
        })
        .await;
}

#[tokio::test]
async fn test_settle_returns_the_first_failure() {
    let registry = CompletionRegistry::new();
    let tracker = QuiescenceTracker::new(registry.clone());
    registry.register(async { Ok(()) }.boxed_local());
    registry.register(
        async {
            Err(UpdateError::Render {
                tag: "x-item".to_string(),
                reason: "boom".to_string(),
            })
        }
        .boxed_local(),
    );

    let err = assert_err!(tracker.settle().await);
    assert!(matches!(err, UpdateError::Render { ref reason, .. } if reason == "boom"));
}

proptest! {
    #[test]
    fn test_no_completion_is_lost(fanouts in proptest::collection::vec(0usize..4, 0..6)) {
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let expected: usize = fanouts
            .iter()
            .scan(1usize, |width, fanout| {
                *width *= fanout;
                Some(*width)
            })
            .sum::<usize>()
            + 1;

        let (settled, completions) = runtime.block_on(async {
            let registry = CompletionRegistry::new();
            let tracker = QuiescenceTracker::new(registry.clone());
            let done = Rc::new(Cell::new(0));
            registry.register(fanned(registry.clone(), Rc::new(fanouts.clone()), 0, done.clone()));
            let report = tracker.settle().await.unwrap();
            (done.get(), report.completions)
        });

        prop_assert_eq!(settled, expected);
        prop_assert_eq!(completions, expected);
    }
}
