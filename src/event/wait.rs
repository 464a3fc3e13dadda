use std::{sync::Arc, task::Poll, pin::Pin};
use futures::{task::AtomicWaker, Future, future::FusedFuture};
use super::{EventStatus, Event};
use crate::core::*;

/// A future that resolves when it's underlying [`Event`] completes
#[cfg_attr(docsrs, doc(cfg(feature = "futures")))]
pub struct EventWait<E: Event> {
    event: Option<E>,
    waker: Arc<AtomicWaker>
}

impl<E: Event + Unpin> EventWait<E> {
    /// Creates a new [`EventWait`] from an [`Event`]
    pub fn new (event: E) -> Result<Self> {
        let waker = Arc::new(AtomicWaker::new());
        let callback = waker.clone();
        event.as_raw().on_complete(move |_| callback.wake())?;

        // commands stay queued until their queue is flushed
        if let Some(queue) = event.as_raw().command_queue()? {
            queue.flush()?;
        }

        Ok(Self { event: Some(event), waker })
    }

    /// Returns the underlying [`Event`], or `None` if the future already resolved.
    #[inline(always)]
    pub fn into_inner (self) -> Option<E> {
        self.event
    }
}

impl<E: Event + Unpin> Future for EventWait<E> {
    type Output = Result<E::Output>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut std::task::Context<'_>) -> Poll<Self::Output> {
        self.waker.register(cx.waker());

        let status = match self.event {
            Some(ref event) => event.status(),
            None => panic!("`EventWait` polled after completion")
        };

        let result = match status {
            Ok(EventStatus::Complete) => self.event.take().map(|event| Ok(event.consume())),
            Ok(EventStatus::Error(code)) => {
                self.event = None;
                Some(Err(Error::from_code(code, Operation::Execution)))
            },
            Err(e) => {
                self.event = None;
                Some(Err(e))
            },
            _ => None
        };

        match result {
            Some(result) => Poll::Ready(result),
            None => Poll::Pending
        }
    }
}

impl<E: Event + Unpin> FusedFuture for EventWait<E> {
    #[inline(always)]
    fn is_terminated(&self) -> bool {
        self.event.is_none()
    }
}
