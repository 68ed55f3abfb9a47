//! End-to-end behaviour of a running container

use std::time::Duration;

use tokio_stream::StreamExt;
use uni_dispatch::prelude::*;
use uni_dispatch::testing::StateRecorder;

const WAIT: Duration = Duration::from_secs(5);

#[derive(Action, Clone, Debug, PartialEq)]
enum PageAction {
    UpdatePageNum(i32),
    SideEffectNum(i32),
    TestSend,
    TestNum(i32),
    Unhandled,
    Boom,
}

#[derive(Clone, Debug, Default, PartialEq)]
struct PageState {
    page_num: i32,
    side_effect_num: i32,
    test_num: i32,
}

impl PageState {
    fn new(page_num: i32, side_effect_num: i32, test_num: i32) -> Self {
        Self {
            page_num,
            side_effect_num,
            test_num,
        }
    }
}

fn reduce(state: &PageState, action: &PageAction) -> PageState {
    match action {
        PageAction::UpdatePageNum(n) => PageState {
            page_num: *n,
            ..state.clone()
        },
        PageAction::SideEffectNum(n) => PageState {
            side_effect_num: *n,
            ..state.clone()
        },
        PageAction::TestNum(n) => PageState {
            test_num: *n,
            ..state.clone()
        },
        _ => state.clone(),
    }
}

fn page_to_side_effect() -> impl SideEffect<PageAction> {
    effect::filter_map(|action| match action {
        PageAction::UpdatePageNum(n) => Some(PageAction::SideEffectNum(n + 3)),
        _ => None,
    })
}

#[tokio::test]
async fn test_side_effect_triggers_side_effect() {
    let container = Container::builder(PageState::default())
        .with_reducer(reduce)
        .add_side_effect(page_to_side_effect())
        .add_side_effect(effect::filter_map(|action| match action {
            PageAction::SideEffectNum(n) => Some(PageAction::TestNum(n + 3)),
            _ => None,
        }))
        .start()
        .unwrap();
    let recorder = StateRecorder::record(container.observe());

    container.dispatch(PageAction::UpdatePageNum(10)).unwrap();

    let history = recorder.wait_len(4, WAIT).await;
    assert_eq!(
        history,
        vec![
            PageState::new(0, 0, 0),
            PageState::new(10, 0, 0),
            PageState::new(10, 13, 0),
            PageState::new(10, 13, 16),
        ]
    );
    container.dispose().await.unwrap();
}

#[tokio::test]
async fn test_independent_effects_each_derive_their_own_action() {
    let container = Container::builder(PageState::default())
        .with_reducer(reduce)
        .add_side_effect(page_to_side_effect())
        .add_side_effect(effect::filter_map(|action| match action {
            PageAction::TestSend => Some(PageAction::TestNum(1)),
            _ => None,
        }))
        .start()
        .unwrap();
    let recorder = StateRecorder::record(container.observe());

    container.dispatch(PageAction::UpdatePageNum(10)).unwrap();
    container.dispatch(PageAction::UpdatePageNum(5)).unwrap();
    container.dispatch(PageAction::TestSend).unwrap();

    // Three dispatches plus three derived actions, each publishing once.
    // Derived actions queue behind the host's, so only per-effect order holds.
    let history = recorder.wait_len(7, WAIT).await;
    assert_eq!(history.len(), 7);
    assert_eq!(history[1], PageState::new(10, 0, 0));
    assert_eq!(history.last(), Some(&PageState::new(5, 8, 1)));

    let mut side_effect_nums: Vec<_> = history.iter().map(|s| s.side_effect_num).collect();
    side_effect_nums.dedup();
    assert_eq!(side_effect_nums, vec![0, 13, 8]);

    let mut test_nums: Vec<_> = history.iter().map(|s| s.test_num).collect();
    test_nums.dedup();
    assert_eq!(test_nums, vec![0, 1]);
    container.dispose().await.unwrap();
}

#[tokio::test]
async fn test_awaited_dispatches_give_full_history() {
    let container = Container::builder(PageState::default())
        .with_reducer(reduce)
        .add_side_effect(page_to_side_effect())
        .add_side_effect(effect::filter_map(|action| match action {
            PageAction::TestSend => Some(PageAction::TestNum(1)),
            _ => None,
        }))
        .start()
        .unwrap();
    let recorder = StateRecorder::record(container.observe());

    container.dispatch(PageAction::UpdatePageNum(10)).unwrap();
    recorder
        .wait_for(WAIT, |history| {
            history.last() == Some(&PageState::new(10, 13, 0))
        })
        .await
        .unwrap();

    container.dispatch(PageAction::UpdatePageNum(5)).unwrap();
    recorder
        .wait_for(WAIT, |history| {
            history.last() == Some(&PageState::new(5, 8, 0))
        })
        .await
        .unwrap();

    container.dispatch(PageAction::TestSend).unwrap();
    let history = recorder.wait_len(7, WAIT).await;
    assert_eq!(
        history,
        vec![
            PageState::new(0, 0, 0),
            PageState::new(10, 0, 0),
            PageState::new(10, 13, 0),
            PageState::new(5, 13, 0),
            PageState::new(5, 8, 0),
            PageState::new(5, 8, 0),
            PageState::new(5, 8, 1),
        ]
    );
    container.dispose().await.unwrap();
}

#[tokio::test]
async fn test_high_volume_dispatch_keeps_order() {
    let container = Container::builder(PageState::default())
        .with_reducer(reduce)
        .start()
        .unwrap();
    let recorder = StateRecorder::record(container.observe());

    for i in 0..=10_000 {
        container.dispatch(PageAction::UpdatePageNum(i)).unwrap();
    }

    let history = recorder.wait_len(10_002, WAIT).await;
    let expected: Vec<_> = (0..=10_000).map(|i| PageState::new(i, 0, 0)).collect();
    assert_eq!(history[0], PageState::default());
    assert_eq!(&history[1..], expected.as_slice());
    container.dispose().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_dispatches_are_serialized() {
    let container = Container::builder(0u32)
        .with_reducer(|count: &u32, action: &PageAction| match action {
            PageAction::TestSend => count + 1,
            _ => *count,
        })
        .start()
        .unwrap();
    let recorder = StateRecorder::record(container.observe());

    let mut senders = Vec::new();
    for _ in 0..4 {
        let dispatcher = container.dispatcher();
        senders.push(tokio::spawn(async move {
            for _ in 0..250 {
                dispatcher.dispatch(PageAction::TestSend).unwrap();
                tokio::task::yield_now().await;
            }
        }));
    }
    for sender in senders {
        sender.await.unwrap();
    }

    let history = recorder.wait_len(1_001, WAIT).await;
    assert_eq!(history, (0..=1_000).collect::<Vec<u32>>());
    container.dispose().await.unwrap();
}

#[tokio::test]
async fn test_late_observer_gets_latest_state_first() {
    let container = Container::builder(PageState::default())
        .with_reducer(reduce)
        .start()
        .unwrap();
    let recorder = StateRecorder::record(container.observe());

    for i in 1..=3 {
        container.dispatch(PageAction::UpdatePageNum(i)).unwrap();
    }
    recorder.wait_len(4, WAIT).await;

    let mut late = container.observe();
    assert_eq!(late.recv().await, Some(PageState::new(3, 0, 0)));

    container.dispatch(PageAction::TestNum(9)).unwrap();
    assert_eq!(late.recv().await, Some(PageState::new(3, 0, 9)));
    container.dispose().await.unwrap();
}

#[tokio::test]
async fn test_action_bus_does_not_replay() {
    let container = Container::builder(PageState::default())
        .with_reducer(reduce)
        .start()
        .unwrap();
    let recorder = StateRecorder::record(container.observe());

    container.dispatch(PageAction::UpdatePageNum(1)).unwrap();
    recorder.wait_len(2, WAIT).await;

    let mut actions = container.actions();
    container.dispatch(PageAction::TestSend).unwrap();

    let first = tokio::time::timeout(WAIT, actions.next()).await.unwrap();
    assert_eq!(first, Some(PageAction::TestSend));
    container.dispose().await.unwrap();
}

#[tokio::test]
async fn test_unhandled_action_leaves_state_equal() {
    let container = Container::builder(PageState::new(4, 2, 0))
        .with_reducer(reduce)
        .start()
        .unwrap();
    let recorder = StateRecorder::record(container.observe());

    container.dispatch(PageAction::Unhandled).unwrap();

    let history = recorder.wait_len(2, WAIT).await;
    assert_eq!(history[0], history[1]);
    assert_eq!(container.state(), PageState::new(4, 2, 0));
    container.dispose().await.unwrap();
}

#[tokio::test]
async fn test_panicking_effect_does_not_stop_the_others() {
    let container = Container::builder(PageState::default())
        .with_reducer(reduce)
        .add_side_effect(effect::filter_map(|action| match action {
            PageAction::Boom => panic!("effect failure"),
            _ => None,
        }))
        .add_side_effect(page_to_side_effect())
        .start()
        .unwrap();
    let recorder = StateRecorder::record(container.observe());

    container.dispatch(PageAction::Boom).unwrap();
    container.dispatch(PageAction::UpdatePageNum(1)).unwrap();

    let history = recorder
        .wait_for(WAIT, |history| {
            history.last() == Some(&PageState::new(1, 4, 0))
        })
        .await
        .unwrap();
    assert_eq!(history.len(), 4);
    assert_eq!(container.status(), ContainerStatus::Running);
    container.dispose().await.unwrap();
}

#[tokio::test]
async fn test_panicking_operator_selector_does_not_stop_the_others() {
    let container = Container::builder(PageState::default())
        .with_reducer(reduce)
        .add_side_effect(|actions: ActionStream<PageAction>| {
            effect::switch_latest(actions, |action| match action {
                PageAction::Boom => panic!("selector failure"),
                PageAction::UpdatePageNum(n) => Some(async move { PageAction::TestNum(n) }),
                _ => None,
            })
        })
        .add_side_effect(page_to_side_effect())
        .start()
        .unwrap();
    let recorder = StateRecorder::record(container.observe());

    container.dispatch(PageAction::Boom).unwrap();
    container.dispatch(PageAction::UpdatePageNum(1)).unwrap();

    recorder
        .wait_for(WAIT, |history| {
            history.last() == Some(&PageState::new(1, 4, 0))
        })
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    // The failed effect is gone; the other one keeps deriving actions.
    assert!(recorder.history().iter().all(|state| state.test_num == 0));
    assert_eq!(container.status(), ContainerStatus::Running);
    container.dispose().await.unwrap();
}

#[tokio::test]
async fn test_async_effect_switches_to_latest_request() {
    let container = Container::builder(PageState::default())
        .with_reducer(reduce)
        .add_side_effect(|actions: ActionStream<PageAction>| {
            effect::switch_latest(actions, |action| match action {
                PageAction::UpdatePageNum(n) => Some(async move {
                    let delay = if n == 1 { 200 } else { 10 };
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                    PageAction::SideEffectNum(n * 100)
                }),
                _ => None,
            })
        })
        .start()
        .unwrap();
    let recorder = StateRecorder::record(container.observe());

    container.dispatch(PageAction::UpdatePageNum(1)).unwrap();
    container.dispatch(PageAction::UpdatePageNum(2)).unwrap();

    recorder
        .wait_for(WAIT, |history| {
            history.last() == Some(&PageState::new(2, 200, 0))
        })
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;

    let history = recorder.history();
    assert!(!history.iter().any(|state| state.side_effect_num == 100));
    container.dispose().await.unwrap();
}

#[tokio::test]
async fn test_dispose_rejects_further_dispatches() {
    let container = Container::builder(PageState::default())
        .with_reducer(reduce)
        .add_side_effect(page_to_side_effect())
        .start()
        .unwrap();
    let dispatcher = container.dispatcher();
    let mut states = container.observe();

    container.dispose().await.unwrap();

    assert_eq!(states.recv().await, Some(PageState::default()));
    assert_eq!(states.recv().await, None);
    assert_eq!(
        dispatcher.dispatch(PageAction::UpdatePageNum(1)),
        Err(Error::Disposed)
    );
}

#[tokio::test]
async fn test_reducer_panic_stops_the_container() {
    let container = Container::builder(PageState::default())
        .with_reducer(|state: &PageState, action: &PageAction| match action {
            PageAction::Boom => panic!("reducer failure"),
            other => reduce(state, other),
        })
        .start()
        .unwrap();

    container.dispatch(PageAction::UpdatePageNum(7)).unwrap();
    container.dispatch(PageAction::Boom).unwrap();
    tokio::time::timeout(WAIT, container.stopped()).await.unwrap();

    assert_eq!(container.status(), ContainerStatus::Failed);
    assert_eq!(container.state(), PageState::new(7, 0, 0));
    assert_eq!(
        container.dispatch(PageAction::TestSend),
        Err(Error::Disposed)
    );

    let err = container.dispose().await.unwrap_err();
    assert!(!err.is_misuse());
    assert!(err.to_string().contains("Boom"));
}

#[tokio::test]
async fn test_configured_label_and_timeout_are_kept() {
    let config =
        ContainerConfig::labeled("pages").with_shutdown_timeout(Duration::from_millis(50));
    let container = Container::builder(PageState::default())
        .with_reducer(reduce)
        .with_config(config.clone())
        .with_middleware(LoggingMiddleware::verbose())
        .start()
        .unwrap();

    assert_eq!(container.config(), &config);
    container.dispose().await.unwrap();
}
