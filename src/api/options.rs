use crate::replica::ReplicaOptions;
use crate::transport::RetryPolicy;
use std::convert::TryFrom;
use tokio::time::Duration;

/// Tunables for a gossip replica. Anything left as `None` gets a default.
#[derive(Clone, Default)]
pub struct GossipOptions {
    /// How long a rumor waits for an ack before pushing again. Default 2s.
    pub rumor_timeout: Option<Duration>,
    /// Once a peer says it already had the rumor, stop spreading with probability 1/N. Default 2.
    pub rumor_stop_denominator: Option<u32>,
    /// Anti-entropy runs every [min, max], picked uniformly at random per run. Default 10s-15s.
    pub anti_entropy_min_interval: Option<Duration>,
    pub anti_entropy_max_interval: Option<Duration>,
    /// How long a quorum read collects responses before deciding. Default 1s.
    pub quorum_timeout: Option<Duration>,
    pub send_retry_initial_backoff: Option<Duration>,
    pub send_retry_max_backoff: Option<Duration>,
    /// Total send attempts per datagram, including the first one.
    pub send_max_attempts: Option<u32>,
}

pub(super) struct GossipOptionsValidated {
    pub rumor_timeout: Duration,
    pub rumor_stop_denominator: u32,
    pub anti_entropy_min_interval: Duration,
    pub anti_entropy_max_interval: Duration,
    pub quorum_timeout: Duration,
    pub send_retry_initial_backoff: Duration,
    pub send_retry_max_backoff: Duration,
    pub send_max_attempts: u32,
}

impl GossipOptionsValidated {
    fn validate(&self) -> Result<(), &'static str> {
        if self.rumor_timeout == Duration::from_secs(0) {
            return Err("Rumor timeout must be non-zero");
        }
        if self.rumor_stop_denominator == 0 {
            return Err("Rumor stop denominator must be at least 1");
        }
        if self.anti_entropy_min_interval == Duration::from_secs(0) {
            return Err("Anti-entropy interval must be non-zero");
        }
        if self.anti_entropy_min_interval > self.anti_entropy_max_interval {
            return Err("Anti-entropy minimum interval must not exceed the maximum interval");
        }
        if self.quorum_timeout == Duration::from_secs(0) {
            return Err("Quorum timeout must be non-zero");
        }
        if self.send_retry_initial_backoff > self.send_retry_max_backoff {
            return Err("Initial send backoff must not exceed the maximum backoff");
        }
        if self.send_max_attempts == 0 {
            return Err("Sends need at least one attempt");
        }

        Ok(())
    }

    pub(super) fn replica_options(&self) -> ReplicaOptions {
        ReplicaOptions {
            rumor_timeout: self.rumor_timeout,
            rumor_stop_denominator: self.rumor_stop_denominator,
            anti_entropy_min_interval: self.anti_entropy_min_interval,
            anti_entropy_max_interval: self.anti_entropy_max_interval,
            quorum_timeout: self.quorum_timeout,
        }
    }

    pub(super) fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            initial_backoff: self.send_retry_initial_backoff,
            max_backoff: self.send_retry_max_backoff,
            max_attempts: self.send_max_attempts,
        }
    }
}

impl TryFrom<GossipOptions> for GossipOptionsValidated {
    type Error = &'static str;

    fn try_from(options: GossipOptions) -> Result<Self, Self::Error> {
        let values = GossipOptionsValidated {
            rumor_timeout: options.rumor_timeout.unwrap_or(Duration::from_secs(2)),
            rumor_stop_denominator: options.rumor_stop_denominator.unwrap_or(2),
            anti_entropy_min_interval: options
                .anti_entropy_min_interval
                .unwrap_or(Duration::from_secs(10)),
            anti_entropy_max_interval: options
                .anti_entropy_max_interval
                .unwrap_or(Duration::from_secs(15)),
            quorum_timeout: options.quorum_timeout.unwrap_or(Duration::from_secs(1)),
            send_retry_initial_backoff: options
                .send_retry_initial_backoff
                .unwrap_or(Duration::from_millis(100)),
            send_retry_max_backoff: options.send_retry_max_backoff.unwrap_or(Duration::from_secs(2)),
            send_max_attempts: options.send_max_attempts.unwrap_or(5),
        };

        values.validate()?;
        Ok(values)
    }
}
