use crate::replica::Version;
use std::collections::HashSet;
use std::net::SocketAddr;

/// One (value, version) a replica reported for the key being read.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct QuorumVote {
    pub(crate) value: String,
    pub(crate) version: Version,
}

impl QuorumVote {
    pub(crate) fn new(value: impl Into<String>, version: Version) -> Self {
        QuorumVote {
            value: value.into(),
            version,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct QuorumDecision {
    pub(crate) value: String,
    pub(crate) version: Version,
    /// How many responses backed the winning value.
    pub(crate) votes: usize,
}

/// QuorumCoordinator gathers responses for one outstanding read. It does not know about time; the
/// replica calls `decide()` when the read's timer fires.
pub(crate) struct QuorumCoordinator {
    id: u64,
    key: String,
    local_version: Version,
    // Arrival order matters for tie breaking.
    responses: Vec<QuorumVote>,
    responders: HashSet<SocketAddr>,
}

impl QuorumCoordinator {
    pub(crate) fn new(id: u64, key: String, local_version: Version) -> Self {
        QuorumCoordinator {
            id,
            key,
            local_version,
            responses: Vec::new(),
            responders: HashSet::new(),
        }
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn key(&self) -> &str {
        &self.key
    }

    /// Version known locally when the read began. Sent in the quorum call so peers holding older
    /// versions stay quiet.
    pub(crate) fn local_version(&self) -> Version {
        self.local_version
    }

    pub(crate) fn num_responses(&self) -> usize {
        self.responses.len()
    }

    /// Our own copy counts as one implicit response.
    pub(crate) fn record_local(&mut self, vote: QuorumVote) {
        self.responses.push(vote);
    }

    /// Returns false if this peer already responded, in which case the response is not counted.
    pub(crate) fn record_response(&mut self, from: SocketAddr, vote: QuorumVote) -> bool {
        if !self.responders.insert(from) {
            return false;
        }
        self.responses.push(vote);
        true
    }

    pub(crate) fn decide(&self) -> Option<QuorumDecision> {
        decide(&self.responses)
    }
}

/// Majority at the maximum version. Among responses carrying the highest version, the value with
/// the most responses wins; ties go to whichever value arrived first. No responses, no decision.
pub(crate) fn decide(responses: &[QuorumVote]) -> Option<QuorumDecision> {
    let max_version = responses.iter().map(|vote| vote.version).max()?;

    // (value, count), in order of first arrival.
    let mut tally: Vec<(&str, usize)> = Vec::new();
    for vote in responses.iter().filter(|vote| vote.version == max_version) {
        match tally.iter_mut().find(|(value, _)| *value == vote.value) {
            Some((_, count)) => *count += 1,
            None => tally.push((vote.value.as_str(), 1)),
        }
    }

    // Strictly-greater comparison keeps the earliest value on ties.
    let mut winner: Option<(&str, usize)> = None;
    for (value, count) in tally {
        match winner {
            Some((_, best)) if count <= best => {}
            _ => winner = Some((value, count)),
        }
    }

    winner.map(|(value, votes)| QuorumDecision {
        value: value.to_string(),
        version: max_version,
        votes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vote(value: &str, version: u64) -> QuorumVote {
        QuorumVote::new(value, Version::new(version))
    }

    fn addr(port: u16) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    #[test]
    fn majority_at_max_version_wins() {
        let responses = vec![vote("a", 3), vote("a", 3), vote("b", 3), vote("x", 1)];

        let decision = decide(&responses).unwrap();
        assert_eq!(
            decision,
            QuorumDecision {
                value: "a".into(),
                version: Version::new(3),
                votes: 2,
            }
        );
    }

    #[test]
    fn higher_version_beats_larger_count() {
        let responses = vec![vote("old", 1), vote("old", 1), vote("old", 1), vote("new", 2)];

        let decision = decide(&responses).unwrap();
        assert_eq!(decision.value, "new");
        assert_eq!(decision.votes, 1);
    }

    #[test]
    fn tie_goes_to_first_arrival() {
        let responses = vec![vote("b", 4), vote("a", 4), vote("a", 4), vote("b", 4)];
        assert_eq!(decide(&responses).unwrap().value, "b");

        let responses = vec![vote("a", 4), vote("b", 4)];
        assert_eq!(decide(&responses).unwrap().value, "a");
    }

    #[test]
    fn no_responses_no_decision() {
        assert_eq!(decide(&[]), None);
    }

    #[test]
    fn coordinator_counts_each_peer_once() {
        let mut coordinator = QuorumCoordinator::new(1, "k".into(), Version::new(2));
        coordinator.record_local(vote("mine", 2));

        assert!(coordinator.record_response(addr(1), vote("theirs", 2)));
        assert!(!coordinator.record_response(addr(1), vote("theirs", 2)));
        assert!(coordinator.record_response(addr(2), vote("theirs", 2)));
        assert_eq!(coordinator.num_responses(), 3);

        let decision = coordinator.decide().unwrap();
        assert_eq!(decision.value, "theirs");
        assert_eq!(decision.votes, 2);
    }

    #[test]
    fn coordinator_without_local_copy() {
        let mut coordinator = QuorumCoordinator::new(1, "k".into(), Version::unseen());
        assert_eq!(coordinator.decide(), None);

        coordinator.record_response(addr(9), vote("v", 1));
        assert_eq!(coordinator.decide().unwrap().value, "v");
    }
}
