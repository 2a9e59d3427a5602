mod anti_entropy_timer;
mod quorum_timer;
mod rumor_timer;
mod time;

#[cfg(test)]
mod test_utils;

pub(crate) use anti_entropy_timer::AntiEntropyTimerHandle;
pub(crate) use quorum_timer::QuorumTimerHandle;
pub(crate) use rumor_timer::RumorTimerHandle;
