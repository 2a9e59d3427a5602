use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::oneshot;

/// The listener stops once the handle is dropped. The replica owns the handle, so the listener
/// lives exactly as long as the replica does.
pub(crate) fn shutdown_signal() -> (ListenerShutdownHandle, ListenerShutdownSignal) {
    let (tx, rx) = oneshot::channel();

    (ListenerShutdownHandle { _tx: tx }, ListenerShutdownSignal { rx })
}

pub(crate) struct ListenerShutdownHandle {
    _tx: oneshot::Sender<()>,
}

pub(crate) struct ListenerShutdownSignal {
    rx: oneshot::Receiver<()>,
}

impl Future for ListenerShutdownSignal {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        // Nothing is ever sent. Ready means the handle dropped.
        Pin::new(&mut self.rx).poll(cx).map(|_| ())
    }
}
