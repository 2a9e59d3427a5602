use crate::actor::Event;
use crate::replica::{QuorumTimerTick, RumorTimerTick};
use std::time::Duration;
use tokio::sync::mpsc;

/// TestUtilActor stands in for the replica actor, so timer tests can assert on what a timer
/// posted.
pub(super) struct TestUtilActor {
    rx: mpsc::Receiver<Event>,
    quiet_period: Duration,
}

impl TestUtilActor {
    pub(super) fn new(rx: mpsc::Receiver<Event>) -> Self {
        TestUtilActor {
            rx,
            quiet_period: Duration::from_millis(10),
        }
    }

    pub(super) async fn assert_rumor_timeout_event(&mut self, expected: RumorTimerTick) {
        match self.recv().await {
            Event::RumorTimeout(tick) => assert_eq!(tick, expected),
            other => panic!("Unexpected event {:?}", other),
        }
    }

    pub(super) async fn assert_quorum_timeout_event(&mut self, expected: QuorumTimerTick) {
        match self.recv().await {
            Event::QuorumTimeout(tick) => assert_eq!(tick, expected),
            other => panic!("Unexpected event {:?}", other),
        }
    }

    pub(super) async fn assert_anti_entropy_event(&mut self) {
        match self.recv().await {
            Event::AntiEntropyTimer => {}
            other => panic!("Unexpected event {:?}", other),
        }
    }

    pub(super) async fn assert_no_event(&mut self) {
        if let Ok(event) = tokio::time::timeout(self.quiet_period, self.rx.recv()).await {
            panic!("Expected no event, got {:?}", event);
        }
    }

    async fn recv(&mut self) -> Event {
        tokio::time::timeout(Duration::from_secs(5), self.rx.recv())
            .await
            .expect("Unexpected timeout")
            .expect("Expected value")
    }
}
