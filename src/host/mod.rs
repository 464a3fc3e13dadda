use std::{fmt::Debug, sync::Arc, thread::JoinHandle};
use crate::{context::RawContext, core::*};
use self::{registry::{KernelObj, Object, Registry}, scheduler::Shared};

flat_mod!(config, kernel);

mod backend;
mod command;
mod registry;
mod scheduler;

/// Software backend running every command on a pool of host threads.
///
/// Each backend owns one platform whose devices are described by its [`HostConfig`]. Buffers live
/// in host memory and kernels are Rust closures (see [`HostKernel`]). Commands are recorded on
/// their queue and handed to the worker pool once flushed and once their dependencies are done.
pub struct HostBackend {
    shared: Arc<Shared>,
    config: HostConfig,
    workers: Vec<JoinHandle<()>>,
}

impl HostBackend {
    pub fn new (config: HostConfig) -> Arc<Self> {
        let (sender, receiver) = crossbeam::channel::unbounded();
        let shared = Arc::new(Shared::new(Registry::new(&config), sender));

        let workers = (0..config.workers.get())
            .filter_map(|i| {
                let shared = shared.clone();
                let receiver = receiver.clone();
                let spawn = std::thread::Builder::new()
                    .name(format!("flare-host-{i}"))
                    .spawn(move || shared.work(receiver));

                match spawn {
                    Ok(x) => Some(x),
                    Err(e) => {
                        tracing::error!("failed to spawn host worker {i}: {e}");
                        None
                    }
                }
            })
            .collect::<Vec<_>>();

        if workers.is_empty() {
            tracing::error!("host backend has no workers, commands will never run");
        }

        tracing::debug!(workers = workers.len(), devices = config.devices.len(), "host backend started");
        Arc::new(Self { shared, config, workers })
    }

    #[inline(always)]
    pub fn config (&self) -> &HostConfig {
        &self.config
    }

    /// Creates a kernel object on `ctx`, which must belong to this backend.
    pub fn create_kernel (&self, ctx: &RawContext, kernel: HostKernel) -> Result<RawKernel> {
        const OP: Operation = Operation::CreateKernel;

        if Arc::as_ptr(ctx.backend()) as *const () != self as *const Self as *const () {
            return Err(Error::new(ErrorCode::InvalidContext, OP, "context belongs to another backend"))
        }

        let id = tri!(OP, self.insert_kernel(ctx.handle(), kernel));
        unsafe { Ok(RawKernel::from_raw(id, ctx.backend().clone())) }
    }

    fn insert_kernel (&self, context: Handle, kernel: HostKernel) -> NativeResult<Handle> {
        let HostKernel { name, num_args, devices, f } = kernel;
        if name.is_empty() {
            return Err(codes::CL_INVALID_KERNEL_NAME)
        }

        let mut reg = self.shared.lock();
        let available = &reg.context(context)?.devices;
        let devices = match devices {
            Some(devices) if devices.iter().all(|x| available.contains(x)) => devices,
            Some(_) => return Err(codes::CL_INVALID_DEVICE),
            None => available.clone()
        };

        reg.retain(ObjectKind::Context, context)?;
        Ok(reg.insert(Object::Kernel(KernelObj {
            context,
            name,
            num_args,
            devices,
            f,
            args: vec![None; num_args as usize]
        }), 1))
    }
}

impl Drop for HostBackend {
    fn drop(&mut self) {
        // workers may be the ones dropping the backend, so they aren't joined
        self.shared.shutdown(self.workers.len());
    }
}

impl Debug for HostBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostBackend")
            .field("config", &self.config)
            .field("workers", &self.workers.len())
            .finish_non_exhaustive()
    }
}
