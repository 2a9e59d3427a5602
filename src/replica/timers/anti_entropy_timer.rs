use crate::actor;
use crate::replica::timers::time::{Clock, RealClock};
use rand::Rng;
use std::ops::RangeInclusive;
use tokio::sync::oneshot;
use tokio::time::Duration;

/// AntiEntropyTimerHandle drives the background anti-entropy exchange. Each wait is drawn
/// uniformly from the interval range, so replicas started together drift apart.
pub(crate) struct AntiEntropyTimerHandle {
    _stop: oneshot::Sender<()>,
}

struct AntiEntropyTimerTask<C: Clock> {
    interval: RangeInclusive<Duration>,
    actor_client: actor::WeakActorClient,
    clock: C,
    stopped: oneshot::Receiver<()>,
}

impl AntiEntropyTimerHandle {
    pub(crate) fn spawn_timer_task(
        min_interval: Duration,
        max_interval: Duration,
        actor_client: actor::WeakActorClient,
    ) -> Self {
        let (task, handle) = AntiEntropyTimerTask::new(min_interval, max_interval, actor_client, RealClock);
        tokio::task::spawn(task.run());

        handle
    }
}

impl<C: Clock + Send + Sync + 'static> AntiEntropyTimerTask<C> {
    fn new(
        min_interval: Duration,
        max_interval: Duration,
        actor_client: actor::WeakActorClient,
        clock: C,
    ) -> (Self, AntiEntropyTimerHandle) {
        let (stop, stopped) = oneshot::channel();

        let task = AntiEntropyTimerTask {
            interval: RangeInclusive::new(min_interval, max_interval),
            actor_client,
            clock,
            stopped,
        };
        let handle = AntiEntropyTimerHandle { _stop: stop };

        (task, handle)
    }

    fn random_wait(&self) -> Duration {
        rand::thread_rng().gen_range(self.interval.clone())
    }

    async fn run(mut self) {
        loop {
            let wait = self.random_wait();
            tokio::select! {
                _ = self.clock.sleep(wait) => {}
                _ = &mut self.stopped => return,
            }

            if self.actor_client.anti_entropy_timer().await.is_err() {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::ActorClient;
    use crate::replica::timers::test_utils::TestUtilActor;
    use crate::replica::timers::time;

    #[tokio::test]
    async fn anti_entropy_timer_lifecycle() {
        // -- setup --
        let interval = Duration::from_millis(100);
        let (strong_actor_client, rx) = ActorClient::new(10);
        let mut actor = TestUtilActor::new(rx);
        let (mock_clock, mut mock_clock_controller) = time::mocked_clock();

        // We are not testing jitter, so make min/max the same.
        let (timer_task, timer_handle) =
            AntiEntropyTimerTask::new(interval, interval, strong_actor_client.weak(), mock_clock);
        let task_join_handle = tokio::task::spawn(timer_task.run());

        // -- execute & verify --
        actor.assert_no_event().await;
        for _ in 0..3 {
            mock_clock_controller.advance(interval);
            actor.assert_anti_entropy_event().await;
            actor.assert_no_event().await;
        }

        drop(timer_handle);
        mock_clock_controller.advance(interval);
        task_join_handle.await.unwrap();
        actor.assert_no_event().await;
    }

    #[tokio::test]
    async fn anti_entropy_wait_is_within_range() {
        let (strong_actor_client, _rx) = ActorClient::new(10);
        let (mock_clock, _mock_clock_controller) = time::mocked_clock();
        let min = Duration::from_millis(10_000);
        let max = Duration::from_millis(15_000);

        let (timer_task, _timer_handle) = AntiEntropyTimerTask::new(min, max, strong_actor_client.weak(), mock_clock);

        for _ in 0..1000 {
            let wait = timer_task.random_wait();
            assert!(wait >= min && wait <= max, "{:?} out of range", wait);
        }
    }
}
