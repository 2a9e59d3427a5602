use crate::actor;
use crate::replica::timers::time::{Clock, RealClock};
use crate::replica::QuorumTimerTick;
use tokio::sync::oneshot;
use tokio::time::Duration;

/// QuorumTimerHandle closes a quorum read's collection window once `timeout` elapses.
pub(crate) struct QuorumTimerHandle {
    _stop: oneshot::Sender<()>,
}

struct QuorumTimerTask<C: Clock> {
    timeout: Duration,
    actor_client: actor::WeakActorClient,
    tick: QuorumTimerTick,
    clock: C,
    stopped: oneshot::Receiver<()>,
}

impl QuorumTimerHandle {
    pub(crate) fn spawn_timer_task(
        timeout: Duration,
        actor_client: actor::WeakActorClient,
        tick: QuorumTimerTick,
    ) -> Self {
        let (task, handle) = QuorumTimerTask::new(timeout, actor_client, tick, RealClock);
        tokio::task::spawn(task.run());

        handle
    }
}

impl<C: Clock + Send + Sync + 'static> QuorumTimerTask<C> {
    fn new(
        timeout: Duration,
        actor_client: actor::WeakActorClient,
        tick: QuorumTimerTick,
        clock: C,
    ) -> (Self, QuorumTimerHandle) {
        let (stop, stopped) = oneshot::channel();

        let task = QuorumTimerTask {
            timeout,
            actor_client,
            tick,
            clock,
            stopped,
        };
        let handle = QuorumTimerHandle { _stop: stop };

        (task, handle)
    }

    async fn run(mut self) {
        tokio::select! {
            _ = self.clock.sleep(self.timeout) => {}
            _ = &mut self.stopped => return,
        }

        let _ = self.actor_client.quorum_timeout(self.tick).await;
    }
}
