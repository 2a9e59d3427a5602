use crate::replica::Version;
use crate::wire::AckMessage;
use rand::Rng;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum RumorState {
    Active,
    Terminated,
}

/// What the replica should do after a rumor's timer fires.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum RumorDecision {
    /// Push the rumor to another random neighbor and wait for the next tick.
    Resend,
    /// Stop spreading this rumor.
    Terminate,
}

/// RumorSession is the rumor-mongering state machine for one (key, version).
///
/// The session is pure state. The replica owns the timer that drives `on_timeout()` and does the
/// actual sending.
///
/// Termination rule: keep pushing while peers stay silent or tell us they learned something new.
/// Once a peer tells us it already knew, stop with probability `1 / stop_denominator`.
pub(crate) struct RumorSession {
    id: u64,
    key: String,
    version: Version,
    value: String,
    last_ack: Option<AckMessage>,
    state: RumorState,
}

impl RumorSession {
    pub(crate) fn start(id: u64, key: String, version: Version, value: String) -> Self {
        RumorSession {
            id,
            key,
            version,
            value,
            last_ack: None,
            state: RumorState::Active,
        }
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn key(&self) -> &str {
        &self.key
    }

    pub(crate) fn version(&self) -> Version {
        self.version
    }

    pub(crate) fn value(&self) -> &str {
        &self.value
    }

    #[cfg(test)]
    pub(crate) fn state(&self) -> RumorState {
        self.state
    }

    /// Remembers the ack for the next timeout. Acks for some other (key, version) are ignored.
    ///
    /// Returns true if the ack was recorded.
    pub(crate) fn on_ack(&mut self, ack: AckMessage) -> bool {
        if !self.matches(&ack) {
            return false;
        }
        self.last_ack.replace(ack);
        true
    }

    pub(crate) fn on_timeout<R: Rng>(&mut self, rng: &mut R, stop_denominator: u32) -> RumorDecision {
        if self.state == RumorState::Terminated {
            return RumorDecision::Terminate;
        }

        // Each ack only counts for the round it arrived in.
        let keep_spreading = match self.last_ack.take() {
            None => true,
            Some(ack) => ack.accepted && self.matches(&ack),
        };

        if keep_spreading || !rng.gen_ratio(1, stop_denominator) {
            RumorDecision::Resend
        } else {
            self.state = RumorState::Terminated;
            RumorDecision::Terminate
        }
    }

    fn matches(&self, ack: &AckMessage) -> bool {
        ack.key == self.key && ack.version == self.version
    }
}
