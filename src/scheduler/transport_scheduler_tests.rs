//! Tests for the timer and connection slot.

use std::time::Duration;

use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::time::Instant;
use url::Url;

use super::{Armed, BackoffPolicy, Generation, Mode, ModeKind, Outcome, TransportScheduler, Wakeup};
use crate::test_fixtures::{FixedJitter, MockConnector, settle};
use crate::transport::{ConnectionError, ConnectionEvent};

const fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

fn polling(interval: Duration) -> Mode {
    Mode::Polling {
        interval,
        backoff: BackoffPolicy::new(interval, interval * 3, interval * 6),
    }
}

fn monitoring() -> Mode {
    Mode::Monitoring {
        url: Url::parse("wss://rules.example.com/live").unwrap(),
        backoff: BackoffPolicy::new(ms(2_000), ms(12_000), ms(30_000)),
    }
}

fn scheduler(
    jitter: Duration,
) -> (
    TransportScheduler<MockConnector>,
    MockConnector,
    UnboundedReceiver<Wakeup>,
) {
    let connector = MockConnector::new();
    let (tx, rx) = mpsc::unbounded_channel();
    let scheduler = TransportScheduler::new(connector.clone(), Generation::new(), tx)
        .with_jitter(FixedJitter(jitter));
    (scheduler, connector, rx)
}

async fn next_timer(rx: &mut UnboundedReceiver<Wakeup>) -> u64 {
    match rx.recv().await {
        Some(Wakeup::TimerFired { generation }) => generation,
        other => panic!("expected timer, got {other:?}"),
    }
}

async fn next_connection(rx: &mut UnboundedReceiver<Wakeup>) -> (u64, ConnectionEvent) {
    match rx.recv().await {
        Some(Wakeup::Connection { generation, event }) => (generation, event),
        other => panic!("expected connection event, got {other:?}"),
    }
}

async fn assert_quiet(rx: &mut UnboundedReceiver<Wakeup>) {
    let waited = tokio::time::timeout(Duration::from_secs(3_600), rx.recv()).await;
    assert!(waited.is_err(), "unexpected wakeup: {waited:?}");
}

mod generation {
    use super::*;

    #[test]
    fn advance_invalidates_previous_value() {
        let generation = Generation::new();
        let before = generation.current();

        let after = generation.advance();

        assert_eq!(after, before + 1);
        assert!(!generation.is_current(before));
        assert!(generation.is_current(after));
    }

    #[test]
    fn clones_share_the_counter() {
        let generation = Generation::new();
        let handle = generation.clone();

        handle.advance();

        assert_eq!(generation.current(), 1);
    }
}

mod polling {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn enter_arms_timer_for_interval() {
        let (mut scheduler, _connector, mut rx) = scheduler(ms(5_000));
        let start = Instant::now();

        assert_eq!(scheduler.enter(polling(ms(1_000))), Armed::Timer(ms(1_000)));
        assert!(scheduler.is_armed());

        let generation = next_timer(&mut rx).await;
        assert!(start.elapsed() >= ms(1_000));
        assert!(scheduler.on_timer_fired(generation));
        assert!(!scheduler.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn arm_while_scheduled_is_overlapped() {
        let (mut scheduler, _connector, mut rx) = scheduler(ms(5_000));
        scheduler.enter(polling(ms(1_000)));

        assert_eq!(scheduler.arm(Outcome::Success), Armed::Overlapped);
        assert_eq!(scheduler.arm(Outcome::Failure), Armed::Overlapped);
        assert_eq!(scheduler.backoff().retry_count(), 0);

        let generation = next_timer(&mut rx).await;
        assert!(scheduler.on_timer_fired(generation));
        assert_quiet(&mut rx).await;
    }

    #[tokio::test(start_paused = true)]
    async fn failures_follow_backoff_then_success_resets() {
        let (mut scheduler, _connector, mut rx) = scheduler(ms(2_500));
        scheduler.enter(polling(ms(1_000)));
        let generation = next_timer(&mut rx).await;
        scheduler.on_timer_fired(generation);

        assert_eq!(scheduler.arm(Outcome::Failure), Armed::Timer(ms(2_500)));
        let generation = next_timer(&mut rx).await;
        scheduler.on_timer_fired(generation);

        assert_eq!(scheduler.arm(Outcome::Failure), Armed::Timer(ms(1_000)));
        let generation = next_timer(&mut rx).await;
        scheduler.on_timer_fired(generation);

        assert_eq!(scheduler.arm(Outcome::Failure), Armed::Timer(ms(2_000)));
        assert_eq!(scheduler.backoff().retry_count(), 3);
        let generation = next_timer(&mut rx).await;
        scheduler.on_timer_fired(generation);

        assert_eq!(scheduler.arm(Outcome::Success), Armed::Timer(ms(1_000)));
        assert!(!scheduler.backoff().is_retrying());
    }

    #[tokio::test(start_paused = true)]
    async fn sub_second_retry_arms_nothing() {
        let (mut scheduler, _connector, mut rx) = scheduler(ms(400));
        scheduler.enter(Mode::Polling {
            interval: ms(1_000),
            backoff: BackoffPolicy::new(ms(300), ms(600), ms(900)),
        });
        let generation = next_timer(&mut rx).await;
        scheduler.on_timer_fired(generation);

        assert_eq!(scheduler.arm(Outcome::Failure), Armed::BelowFloor(ms(400)));
        assert!(!scheduler.is_armed());
        assert_quiet(&mut rx).await;
    }

    #[tokio::test(start_paused = true)]
    async fn stop_cancels_pending_timer() {
        let (mut scheduler, _connector, mut rx) = scheduler(ms(5_000));
        scheduler.enter(polling(ms(1_000)));

        scheduler.stop();

        assert_eq!(scheduler.mode(), &Mode::Idle);
        assert!(!scheduler.is_armed());
        assert_quiet(&mut rx).await;
    }

    #[tokio::test(start_paused = true)]
    async fn stale_timer_is_discarded() {
        let (mut scheduler, _connector, mut rx) = scheduler(ms(5_000));
        let generation = scheduler.generation().clone();
        scheduler.enter(polling(ms(1_000)));

        let fired = next_timer(&mut rx).await;
        generation.advance();

        assert!(!scheduler.on_timer_fired(fired));
    }

    #[tokio::test(start_paused = true)]
    async fn arm_in_idle_mode_is_inactive() {
        let (mut scheduler, _connector, mut rx) = scheduler(ms(5_000));

        assert_eq!(scheduler.arm(Outcome::Failure), Armed::Inactive);
        assert_eq!(scheduler.backoff().retry_count(), 0);
        assert_quiet(&mut rx).await;
    }
}

mod monitoring {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn enter_opens_one_connection() {
        let (mut scheduler, connector, _rx) = scheduler(ms(5_000));

        assert_eq!(scheduler.enter(monitoring()), Armed::Connection);
        assert!(scheduler.is_connected());
        assert_eq!(connector.opened(), 1);
        assert_eq!(
            connector.urls()[0].as_str(),
            "wss://rules.example.com/live"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn open_and_message_cause_no_action() {
        let (mut scheduler, connector, mut rx) = scheduler(ms(5_000));
        scheduler.enter(monitoring());

        connector.emit(ConnectionEvent::Opened);
        connector.emit(ConnectionEvent::Message);

        let (generation, event) = next_connection(&mut rx).await;
        assert!(scheduler.on_connection_event(generation, event).is_none());
        let (generation, event) = next_connection(&mut rx).await;
        assert!(scheduler.on_connection_event(generation, event).is_none());
        assert!(scheduler.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn close_releases_slot_and_retries_with_jitter() {
        let (mut scheduler, connector, mut rx) = scheduler(ms(7_000));
        scheduler.enter(monitoring());

        connector.close("going away");
        let (generation, event) = next_connection(&mut rx).await;
        let reason = scheduler.on_connection_event(generation, event);

        assert!(matches!(reason, Some(ConnectionError::Closed { .. })));
        assert!(!scheduler.is_armed());
        assert_eq!(scheduler.arm(Outcome::Failure), Armed::Timer(ms(7_000)));

        settle().await;
        assert_eq!(connector.live(), 0);
        assert_eq!(connector.opened(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn no_second_connection_before_close_is_confirmed() {
        let (mut scheduler, connector, mut rx) = scheduler(ms(3_000));
        scheduler.enter(monitoring());

        assert_eq!(scheduler.arm(Outcome::Success), Armed::Overlapped);
        assert_eq!(connector.opened(), 1);

        connector.close("restart");
        let (generation, event) = next_connection(&mut rx).await;
        scheduler.on_connection_event(generation, event);
        scheduler.arm(Outcome::Failure);

        let generation = next_timer(&mut rx).await;
        assert!(scheduler.on_timer_fired(generation));
        assert_eq!(scheduler.arm(Outcome::Success), Armed::Connection);

        settle().await;
        assert_eq!(connector.opened(), 2);
        assert_eq!(connector.max_live(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stream_end_without_close_counts_as_close() {
        let (mut scheduler, connector, mut rx) = scheduler(ms(5_000));
        scheduler.enter(monitoring());

        connector.hang_up();
        let (generation, event) = next_connection(&mut rx).await;

        let reason = scheduler.on_connection_event(generation, event);
        assert_eq!(reason.unwrap().to_string(), "Connection closed: stream ended");
    }

    #[tokio::test(start_paused = true)]
    async fn stop_closes_connection() {
        let (mut scheduler, connector, _rx) = scheduler(ms(5_000));
        scheduler.enter(monitoring());

        assert!(scheduler.stop_if(ModeKind::Monitoring));
        settle().await;

        assert_eq!(connector.live(), 0);
        assert_eq!(scheduler.mode().kind(), ModeKind::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn close_from_stale_connection_is_discarded() {
        let (mut scheduler, connector, mut rx) = scheduler(ms(5_000));
        scheduler.enter(monitoring());
        let stale = scheduler.generation().current();
        scheduler.generation().advance();

        connector.close("late");
        let (generation, event) = next_connection(&mut rx).await;

        assert_eq!(generation, stale);
        assert!(scheduler.on_connection_event(generation, event).is_none());
        assert!(scheduler.is_connected());
    }
}

mod switching {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn entering_polling_closes_connection() {
        let (mut scheduler, connector, _rx) = scheduler(ms(5_000));
        scheduler.enter(monitoring());

        assert_eq!(scheduler.enter(polling(ms(2_000))), Armed::Timer(ms(2_000)));
        settle().await;

        assert_eq!(connector.live(), 0);
        assert_eq!(scheduler.mode().kind(), ModeKind::Polling);
    }

    #[tokio::test(start_paused = true)]
    async fn entering_a_mode_clears_backoff() {
        let (mut scheduler, _connector, mut rx) = scheduler(ms(5_000));
        scheduler.enter(polling(ms(1_000)));
        let generation = next_timer(&mut rx).await;
        scheduler.on_timer_fired(generation);
        scheduler.arm(Outcome::Failure);

        scheduler.enter(polling(ms(1_000)));

        assert_eq!(scheduler.backoff().retry_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_if_other_mode_keeps_running() {
        let (mut scheduler, _connector, _rx) = scheduler(ms(5_000));
        scheduler.enter(polling(ms(1_000)));

        assert!(!scheduler.stop_if(ModeKind::Monitoring));
        assert!(!scheduler.stop_if(ModeKind::Idle));
        assert_eq!(scheduler.mode().kind(), ModeKind::Polling);
        assert!(scheduler.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_advances_generation() {
        let (mut scheduler, _connector, _rx) = scheduler(ms(5_000));
        let before = scheduler.generation().current();

        scheduler.stop();

        assert!(!scheduler.generation().is_current(before));
    }
}
