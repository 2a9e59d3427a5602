mod listener;
mod outbox;
mod shutdown;

pub(crate) use listener::Listener;
pub(crate) use outbox::channel as outbox_channel;
#[cfg(test)]
pub(crate) use outbox::OutboundDatagram;
pub(crate) use outbox::Outbox;
pub(crate) use outbox::OutboxTask;
pub(crate) use outbox::RetryPolicy;
pub(crate) use shutdown::shutdown_signal;
pub(crate) use shutdown::ListenerShutdownHandle;
pub(crate) use shutdown::ListenerShutdownSignal;
