use std::{fmt::Debug, sync::{Arc, RwLockWriteGuard}};
use bytemuck::Pod;
use crate::core::{Handle, RawDevice};
use super::{command::Span, registry::{bytes, bytes_mut}};

/// Body of a host kernel, invoked once per work-item
pub type KernelFn = dyn Fn(&WorkItem, &mut KernelArgs<'_>) + Send + Sync;

/// A kernel for the host backend: a Rust closure run for every work-item of a launch.
///
/// Work-items of a work-group run one after the other on a single worker thread, so there are no
/// barriers. Local memory is zeroed at the start of every work-group. A panicking kernel terminates
/// its command with `CL_OUT_OF_RESOURCES`.
#[derive(Clone)]
pub struct HostKernel {
    pub(super) name: String,
    pub(super) num_args: u32,
    pub(super) devices: Option<Vec<Handle>>,
    pub(super) f: Arc<KernelFn>,
}

impl HostKernel {
    pub fn new (name: impl Into<String>, num_args: u32, f: impl 'static + Fn(&WorkItem, &mut KernelArgs<'_>) + Send + Sync) -> Self {
        Self {
            name: name.into(),
            num_args,
            devices: None,
            f: Arc::new(f)
        }
    }

    /// Restricts the devices the kernel is built for. By default, it's built for every device of
    /// the context it's created on.
    #[inline]
    pub fn built_for (self, devices: &[RawDevice]) -> Self {
        Self { devices: Some(devices.iter().map(RawDevice::handle).collect()), ..self }
    }

    #[inline(always)]
    pub fn name (&self) -> &str {
        &self.name
    }

    #[inline(always)]
    pub fn num_args (&self) -> u32 {
        self.num_args
    }
}

impl Debug for HostKernel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostKernel")
            .field("name", &self.name)
            .field("num_args", &self.num_args)
            .field("devices", &self.devices)
            .finish_non_exhaustive()
    }
}

/// Argument value as set on the kernel object
#[derive(Debug, Clone)]
pub(super) enum ArgValue {
    Mem (Handle),
    Bytes (Vec<u8>),
    Local (usize),
}

/// Argument value captured at enqueue time
#[derive(Debug, Clone)]
pub(super) enum LaunchArg {
    Mem (Span, usize),
    Bytes (Vec<u8>),
    Local (usize),
}

pub(super) struct KernelLaunch {
    pub f: Arc<KernelFn>,
    pub work_dim: u32,
    pub offset: [usize; 3],
    pub global: [usize; 3],
    pub local: [usize; 3],
    pub args: Vec<LaunchArg>,
}

impl KernelLaunch {
    pub fn execute (&self) {
        let mut storages = self.args.iter()
            .filter_map(|x| match x {
                LaunchArg::Mem(span, _) => Some(&span.storage),
                _ => None
            })
            .collect::<Vec<_>>();

        storages.sort_unstable_by_key(|x| x.id);
        storages.dedup_by_key(|x| x.id);

        let guards = storages.into_iter().map(|x| (x.id, x.write())).collect::<Vec<_>>();
        let locals = self.args.iter()
            .map(|x| match x {
                LaunchArg::Local(size) => vec![0u64; (size + 7) / 8],
                _ => Vec::new()
            })
            .collect::<Vec<_>>();

        let mut args = KernelArgs { guards, args: &self.args, locals };
        let groups: [usize; 3] = core::array::from_fn(|i| self.global[i] / self.local[i]);

        for gz in 0..groups[2] {
            for gy in 0..groups[1] {
                for gx in 0..groups[0] {
                    args.locals.iter_mut().for_each(|x| x.fill(0));
                    let group_id = [gx, gy, gz];

                    for lz in 0..self.local[2] {
                        for ly in 0..self.local[1] {
                            for lx in 0..self.local[0] {
                                let local_id = [lx, ly, lz];
                                let item = WorkItem {
                                    work_dim: self.work_dim,
                                    global_id: core::array::from_fn(|i| self.offset[i] + group_id[i] * self.local[i] + local_id[i]),
                                    local_id,
                                    group_id,
                                    global_size: self.global,
                                    local_size: self.local,
                                    offset: self.offset
                                };

                                (self.f)(&item, &mut args);
                            }
                        }
                    }
                }
            }
        }
    }
}

/// Arguments of a running kernel.
///
/// # Panics
/// Every accessor panics if the argument at `idx` isn't of the requested kind, or if its contents
/// can't be viewed as `T`. The panic fails the command.
pub struct KernelArgs<'a> {
    guards: Vec<(usize, RwLockWriteGuard<'a, Vec<u64>>)>,
    args: &'a [LaunchArg],
    locals: Vec<Vec<u64>>,
}

impl<'a> KernelArgs<'a> {
    #[inline(always)]
    pub fn len (&self) -> usize {
        self.args.len()
    }

    #[inline(always)]
    pub fn is_empty (&self) -> bool {
        self.args.is_empty()
    }

    /// Contents of the memory object bound at `idx`
    pub fn buffer<T: Pod> (&self, idx: u32) -> &[T] {
        let (span, len) = self.mem(idx);
        let guard = self.guard(span.storage.id);
        bytemuck::cast_slice(&bytes(&self.guards[guard].1)[span.offset..span.offset + len])
    }

    /// Mutable contents of the memory object bound at `idx`
    pub fn buffer_mut<T: Pod> (&mut self, idx: u32) -> &mut [T] {
        let (span, len) = self.mem(idx);
        let (offset, guard) = (span.offset, self.guard(span.storage.id));
        bytemuck::cast_slice_mut(&mut bytes_mut(&mut self.guards[guard].1)[offset..offset + len])
    }

    /// Value bound at `idx`
    pub fn scalar<T: Pod> (&self, idx: u32) -> T {
        match &self.args[idx as usize] {
            LaunchArg::Bytes(v) => bytemuck::pod_read_unaligned(v),
            other => panic!("argument {idx} isn't a scalar: {other:?}")
        }
    }

    /// Local memory bound at `idx`, shared by the work-items of one work-group
    pub fn local_mut<T: Pod> (&mut self, idx: u32) -> &mut [T] {
        let size = match &self.args[idx as usize] {
            LaunchArg::Local(size) => *size,
            other => panic!("argument {idx} isn't local memory: {other:?}")
        };

        bytemuck::cast_slice_mut(&mut bytes_mut(&mut self.locals[idx as usize])[..size])
    }

    #[inline]
    fn mem (&self, idx: u32) -> (&'a Span, usize) {
        let args: &'a [LaunchArg] = self.args;
        match &args[idx as usize] {
            LaunchArg::Mem(span, len) => (span, *len),
            other => panic!("argument {idx} isn't a memory object: {other:?}")
        }
    }

    #[inline]
    fn guard (&self, id: usize) -> usize {
        match self.guards.binary_search_by_key(&id, |(x, _)| *x) {
            Ok(idx) => idx,
            Err(_) => unreachable!("every bound storage is locked")
        }
    }
}

/// Identity of the current work-item. Queries past the launch's work dimension return `0` for ids
/// and `1` for sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WorkItem {
    work_dim: u32,
    global_id: [usize; 3],
    local_id: [usize; 3],
    group_id: [usize; 3],
    global_size: [usize; 3],
    local_size: [usize; 3],
    offset: [usize; 3],
}

impl WorkItem {
    #[inline(always)]
    pub fn work_dim (&self) -> u32 {
        self.work_dim
    }

    #[inline(always)]
    pub fn global_id (&self, dim: usize) -> usize {
        self.global_id.get(dim).copied().unwrap_or(0)
    }

    #[inline(always)]
    pub fn local_id (&self, dim: usize) -> usize {
        self.local_id.get(dim).copied().unwrap_or(0)
    }

    #[inline(always)]
    pub fn group_id (&self, dim: usize) -> usize {
        self.group_id.get(dim).copied().unwrap_or(0)
    }

    #[inline(always)]
    pub fn global_size (&self, dim: usize) -> usize {
        self.global_size.get(dim).copied().unwrap_or(1)
    }

    #[inline(always)]
    pub fn local_size (&self, dim: usize) -> usize {
        self.local_size.get(dim).copied().unwrap_or(1)
    }

    #[inline(always)]
    pub fn num_groups (&self, dim: usize) -> usize {
        self.global_size(dim) / self.local_size(dim)
    }

    #[inline(always)]
    pub fn global_offset (&self, dim: usize) -> usize {
        self.offset.get(dim).copied().unwrap_or(0)
    }

    /// Flattened global id, ignoring the offset
    #[inline]
    pub fn global_linear_id (&self) -> usize {
        let id: [usize; 3] = core::array::from_fn(|i| self.global_id[i] - self.offset[i]);
        (id[2] * self.global_size[1] + id[1]) * self.global_size[0] + id[0]
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use super::*;
    use crate::host::registry::Storage;

    #[test]
    fn every_work_item_runs_once() {
        let storage = Arc::new(Storage::zeroed(1, 6 * 4).unwrap());
        let f = |item: &WorkItem, args: &mut KernelArgs<'_>| {
            let scale = args.scalar::<u32>(1);
            let id = item.global_linear_id();
            args.buffer_mut::<u32>(0)[id] += (item.group_id(0) as u32 + 1) * scale;
        };

        let launch = KernelLaunch {
            f: Arc::new(f),
            work_dim: 2,
            offset: [0; 3],
            global: [3, 2, 1],
            local: [3, 1, 1],
            args: vec![
                LaunchArg::Mem(Span { storage: storage.clone(), offset: 0 }, 24),
                LaunchArg::Bytes(10u32.to_ne_bytes().to_vec())
            ]
        };

        launch.execute();
        let words = storage.read();
        let result: &[u32] = bytemuck::cast_slice(&bytes(&words)[..24]);
        assert_eq!(result, &[10; 6]);
    }

    #[test]
    fn local_memory_resets_per_group() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = seen.clone();

        let f = move |item: &WorkItem, args: &mut KernelArgs<'_>| {
            let local = args.local_mut::<u32>(0);
            local[0] += 1;
            if item.local_id(0) + 1 == item.local_size(0) {
                log.lock().unwrap().push(local[0]);
            }
        };

        let launch = KernelLaunch {
            f: Arc::new(f),
            work_dim: 1,
            offset: [0; 3],
            global: [8, 1, 1],
            local: [4, 1, 1],
            args: vec![LaunchArg::Local(4)]
        };

        launch.execute();
        assert_eq!(*seen.lock().unwrap(), vec![4, 4]);
    }
}
