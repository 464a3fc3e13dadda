use std::{sync::Arc, rc::Rc};
use crate::core::{RawCommandQueue, Result};

flat_mod!(raw, flags, single);

/// An object that manages a [`RawContext`] together with the command queues that operate on it.
pub trait Context {
    /// Returns a reference to the underlying [`RawContext`]
    fn as_raw (&self) -> &RawContext;
    /// Returns a slice with all of the [`Context`]'s command queues
    fn queues (&self) -> &[RawCommandQueue];
    /// Returns the next [`RawCommandQueue`], as per context implementation
    fn next_queue (&self) -> &RawCommandQueue;

    /// Flushes all the [`RawCommandQueue`]s in the context.
    #[inline(always)]
    fn flush_all (&self) -> Result<()> {
        for queue in self.queues() {
            queue.flush()?
        }
        Ok(())
    }

    /// Finishes all the [`RawCommandQueue`]s in the context.
    #[inline(always)]
    fn finish_all (&self) -> Result<()> {
        for queue in self.queues() {
            queue.finish()?
        }
        Ok(())
    }
}

impl<T: Context> Context for &'_ T {
    #[inline(always)]
    fn as_raw (&self) -> &RawContext {
        T::as_raw(self)
    }

    #[inline(always)]
    fn queues (&self) -> &[RawCommandQueue] {
        T::queues(self)
    }

    #[inline(always)]
    fn next_queue (&self) -> &RawCommandQueue {
        T::next_queue(self)
    }
}

impl<T: Context> Context for Rc<T> {
    #[inline(always)]
    fn as_raw (&self) -> &RawContext {
        T::as_raw(self)
    }

    #[inline(always)]
    fn queues (&self) -> &[RawCommandQueue] {
        T::queues(self)
    }

    #[inline(always)]
    fn next_queue (&self) -> &RawCommandQueue {
        T::next_queue(self)
    }
}

impl<T: Context> Context for Arc<T> {
    #[inline(always)]
    fn as_raw (&self) -> &RawContext {
        T::as_raw(self)
    }

    #[inline(always)]
    fn queues (&self) -> &[RawCommandQueue] {
        T::queues(self)
    }

    #[inline(always)]
    fn next_queue (&self) -> &RawCommandQueue {
        T::next_queue(self)
    }
}
