use std::sync::atomic::{AtomicUsize, Ordering};
use crate::core::*;
use super::{Context, RawContext, ContextProperties};

/// A simple context with one command queue per device, handed out in round-robin order
#[derive(Debug)]
pub struct SimpleContext {
    ctx: RawContext,
    queues: Vec<RawCommandQueue>,
    next: AtomicUsize,
}

impl SimpleContext {
    pub fn new (devices: &[RawDevice], ctx_props: ContextProperties, props: QueueProperties) -> Result<Self> {
        let ctx = RawContext::new(ctx_props, devices)?;
        Self::with_context(ctx, props)
    }

    /// Creates a context over the devices of the given type of the global backend.
    #[inline(always)]
    pub fn from_type (ty: DeviceType, props: QueueProperties) -> Result<Self> {
        Self::from_type_in(global_backend(), ty, props)
    }

    pub fn from_type_in (backend: &SharedBackend, ty: DeviceType, props: QueueProperties) -> Result<Self> {
        let ctx = RawContext::from_type_in(backend, ContextProperties::default(), ty)?;
        Self::with_context(ctx, props)
    }

    /// Creates one queue for every device of `ctx`.
    pub fn with_context (ctx: RawContext, props: QueueProperties) -> Result<Self> {
        let queues = ctx.devices()?
            .iter()
            .map(|device| RawCommandQueue::new(&ctx, device, props))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { ctx, queues, next: AtomicUsize::new(0) })
    }
}

impl Context for SimpleContext {
    #[inline(always)]
    fn as_raw (&self) -> &RawContext {
        &self.ctx
    }

    #[inline(always)]
    fn queues (&self) -> &[RawCommandQueue] {
        &self.queues
    }

    #[inline]
    fn next_queue (&self) -> &RawCommandQueue {
        let idx = self.next.fetch_add(1, Ordering::Relaxed);
        &self.queues[idx % self.queues.len()]
    }
}
