use crate::actor;
use crate::replica::timers::time::{Clock, RealClock};
use crate::replica::RumorTimerTick;
use tokio::sync::oneshot;
use tokio::time::Duration;

/// RumorTimerHandle keeps one rumor's periodic resend timer alive. Drop it to stop the timer.
pub(crate) struct RumorTimerHandle {
    _stop: oneshot::Sender<()>,
}

struct RumorTimerTask<C: Clock> {
    period: Duration,
    actor_client: actor::WeakActorClient,
    tick: RumorTimerTick,
    clock: C,
    // Resolves once the handle is dropped.
    stopped: oneshot::Receiver<()>,
}

impl RumorTimerHandle {
    pub(crate) fn spawn_timer_task(
        period: Duration,
        actor_client: actor::WeakActorClient,
        tick: RumorTimerTick,
    ) -> Self {
        let (task, handle) = RumorTimerTask::new(period, actor_client, tick, RealClock);
        tokio::task::spawn(task.run());

        handle
    }
}

impl<C: Clock + Send + Sync + 'static> RumorTimerTask<C> {
    fn new(
        period: Duration,
        actor_client: actor::WeakActorClient,
        tick: RumorTimerTick,
        clock: C,
    ) -> (Self, RumorTimerHandle) {
        let (stop, stopped) = oneshot::channel();

        let task = RumorTimerTask {
            period,
            actor_client,
            tick,
            clock,
            stopped,
        };
        let handle = RumorTimerHandle { _stop: stop };

        (task, handle)
    }

    async fn run(mut self) {
        // The rumor was already sent once when the session started, so wait a full period first.
        loop {
            tokio::select! {
                _ = self.clock.sleep(self.period) => {}
                _ = &mut self.stopped => return,
            }

            if self.actor_client.rumor_timeout(self.tick.clone()).await.is_err() {
                return;
            }
        }
    }
}
