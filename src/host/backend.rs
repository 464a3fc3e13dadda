use std::sync::Arc;
use crate::{buffer::{rows_overlap, BufferRect, MemAccess, MemFlags, RectCopy}, context::ContextProperties, core::{*, codes::*}};
use super::{HostBackend, HostDeviceConfig, command::{Command, SendPtr, Span}, kernel::{ArgValue, KernelLaunch, LaunchArg}, registry::*};

/// Queue a command is validated against
struct Target {
    context: Handle,
    device: Handle,
    align: usize,
}

impl Target {
    fn resolve (reg: &Registry, queue: Handle, wait: &[Handle]) -> NativeResult<Self> {
        let q = reg.queue(queue)?;
        for event in wait {
            let event = reg.event(*event).map_err(|_| CL_INVALID_EVENT_WAIT_LIST)?;
            if event.context != q.context {
                return Err(CL_INVALID_CONTEXT)
            }
        }

        let device = reg.device(q.device)?;
        Ok(Self { context: q.context, device: q.device, align: device.cfg.base_addr_align })
    }

    /// Resolves a memory object to its storage, returning its size too.
    fn span (&self, reg: &Registry, mem: Handle) -> NativeResult<(Span, usize)> {
        let m = reg.mem(mem)?;
        if m.context != self.context {
            return Err(CL_INVALID_CONTEXT)
        }
        if m.parent.is_some() && m.offset % self.align != 0 {
            return Err(CL_MISALIGNED_SUB_BUFFER_OFFSET)
        }

        Ok((Span { storage: m.storage.clone(), offset: m.offset }, m.size))
    }
}

#[inline]
fn check_range (offset: usize, size: usize, len: usize) -> NativeResult<()> {
    match offset.checked_add(size) {
        Some(end) if size > 0 && end <= len => Ok(()),
        _ => Err(CL_INVALID_VALUE)
    }
}

#[inline]
fn at (span: Span, offset: usize) -> Span {
    Span { offset: span.offset + offset, ..span }
}

/// Devices of `candidates` matching `ty`, in order
fn select_devices (reg: &Registry, candidates: &[Handle], ty: DeviceType) -> NativeResult<Vec<Handle>> {
    if ty.is_empty() {
        return Err(CL_INVALID_DEVICE_TYPE)
    }

    let rest = ty & !DeviceType::DEFAULT;
    let devices = candidates.iter()
        .enumerate()
        .filter(|(i, x)| {
            ty == DeviceType::ALL
                || (*i == 0 && ty.contains(DeviceType::DEFAULT))
                || reg.device(**x).map_or(false, |x| x.cfg.ty.intersects(rest))
        })
        .map(|(_, x)| *x)
        .collect::<Vec<_>>();

    match devices.is_empty() {
        true => Err(CL_DEVICE_NOT_FOUND),
        false => Ok(devices)
    }
}

/// Largest work-group that divides the global size within the device limits, filling the first
/// dimension first.
fn default_local (global: &[usize; 3], dims: usize, cfg: &HostDeviceConfig) -> [usize; 3] {
    let mut local = [1; 3];
    let mut budget = cfg.max_work_group_size.max(1);

    for i in 0..dims {
        let cap = budget.min(cfg.max_work_item_sizes[i]).min(global[i]).max(1);
        let size = (1..=cap).rev().find(|x| global[i] % x == 0).unwrap_or(1);
        local[i] = size;
        budget /= size;
    }

    local
}

impl HostBackend {
    fn enqueue_with (&self, queue: Handle, command_type: u32, blocking: bool, wait: &[Handle], f: impl FnOnce(&Registry, &Target) -> NativeResult<(Command, Vec<(ObjectKind, Handle)>)>) -> NativeResult<Handle> {
        let event = {
            let mut reg = self.shared.lock();
            let target = Target::resolve(&reg, queue, wait)?;
            let (command, held) = f(&reg, &target)?;
            self.shared.enqueue(&mut reg, queue, command_type, wait, command, held)?
        };

        self.shared.complete_blocking(event, blocking)
    }

    fn kernel_command (reg: &Registry, target: &Target, kernel: Handle, work_dim: u32, offset: Option<&[usize]>, global: &[usize], local: Option<&[usize]>) -> NativeResult<(Command, Vec<(ObjectKind, Handle)>)> {
        let k = reg.kernel(kernel)?;
        if k.context != target.context {
            return Err(CL_INVALID_CONTEXT)
        }

        let dims = work_dim as usize;
        if !(1..=3).contains(&dims) || global.len() != dims || offset.map_or(false, |x| x.len() != dims) || local.map_or(false, |x| x.len() != dims) {
            return Err(CL_INVALID_WORK_DIMENSION)
        }

        if !k.devices.contains(&target.device) {
            return Err(CL_INVALID_PROGRAM_EXECUTABLE)
        }

        let args = k.args.iter().cloned().collect::<Option<Vec<_>>>().ok_or(CL_INVALID_KERNEL_ARGS)?;
        let cfg = &reg.device(target.device)?.cfg;

        let mut global_size = [1; 3];
        let mut global_offset = [0; 3];
        for i in 0..dims {
            if global[i] == 0 {
                return Err(CL_INVALID_GLOBAL_WORK_SIZE)
            }

            global_size[i] = global[i];
            global_offset[i] = offset.map_or(0, |x| x[i]);
            global_size[i].checked_add(global_offset[i]).ok_or(CL_INVALID_GLOBAL_OFFSET)?;
        }

        let local_size = match local {
            Some(local) => {
                let mut local_size = [1; 3];
                for i in 0..dims {
                    if local[i] == 0 || global_size[i] % local[i] != 0 {
                        return Err(CL_INVALID_WORK_GROUP_SIZE)
                    }
                    if local[i] > cfg.max_work_item_sizes[i] {
                        return Err(CL_INVALID_WORK_ITEM_SIZE)
                    }
                    local_size[i] = local[i];
                }

                match local_size.iter().try_fold(1usize, |acc, x| acc.checked_mul(*x)) {
                    Some(x) if x <= cfg.max_work_group_size => local_size,
                    _ => return Err(CL_INVALID_WORK_GROUP_SIZE)
                }
            },
            None => default_local(&global_size, dims, cfg)
        };

        let mut held = vec![(ObjectKind::Kernel, kernel)];
        let args = args.into_iter()
            .map(|arg| match arg {
                ArgValue::Mem(mem) => {
                    let (span, len) = target.span(reg, mem)?;
                    held.push((ObjectKind::MemObject, mem));
                    Ok(LaunchArg::Mem(span, len))
                },
                ArgValue::Bytes(x) => Ok(LaunchArg::Bytes(x)),
                ArgValue::Local(x) => Ok(LaunchArg::Local(x))
            })
            .collect::<NativeResult<Vec<_>>>()?;

        let launch = KernelLaunch {
            f: k.f.clone(),
            work_dim,
            offset: global_offset,
            global: global_size,
            local: local_size,
            args
        };

        Ok((Command::Kernel(launch), held))
    }
}

impl Backend for HostBackend {
    #[inline(always)]
    fn name (&self) -> &str {
        "host"
    }

    fn platforms (&self) -> NativeResult<Vec<Handle>> {
        Ok(vec![self.shared.lock().platform])
    }

    fn devices (&self, platform: Handle, ty: DeviceType) -> NativeResult<Vec<Handle>> {
        let reg = self.shared.lock();
        let candidates = &reg.platform(platform)?.devices;
        select_devices(&reg, candidates, ty)
    }

    fn create_context (&self, props: &ContextProperties, devices: &[Handle]) -> NativeResult<Handle> {
        if devices.is_empty() {
            return Err(CL_INVALID_VALUE)
        }

        let mut reg = self.shared.lock();
        let platform = props.platform.unwrap_or(reg.platform);
        reg.platform(platform)?;

        let mut list = Vec::with_capacity(devices.len());
        for handle in devices {
            let device = reg.device(*handle)?;
            if device.platform != platform {
                return Err(CL_INVALID_DEVICE)
            }
            if !device.cfg.available {
                return Err(CL_DEVICE_NOT_AVAILABLE)
            }
            if !list.contains(handle) {
                list.push(*handle);
            }
        }

        Ok(reg.insert(Object::Context(ContextObj { devices: list }), 1))
    }

    fn create_context_from_type (&self, props: &ContextProperties, ty: DeviceType) -> NativeResult<Handle> {
        let mut reg = self.shared.lock();
        let platform = props.platform.unwrap_or(reg.platform);
        let candidates = &reg.platform(platform)?.devices;

        let devices = select_devices(&reg, candidates, ty)?
            .into_iter()
            .filter(|x| reg.device(*x).map_or(false, |x| x.cfg.available))
            .collect::<Vec<_>>();

        if devices.is_empty() {
            return Err(CL_DEVICE_NOT_AVAILABLE)
        }

        Ok(reg.insert(Object::Context(ContextObj { devices }), 1))
    }

    fn create_command_queue (&self, context: Handle, device: Handle, props: QueueProperties) -> NativeResult<Handle> {
        let mut reg = self.shared.lock();
        let supported = reg.device(device)?.queue_properties();
        if !reg.context(context)?.devices.contains(&device) {
            return Err(CL_INVALID_DEVICE)
        }
        if !supported.contains(props) {
            return Err(CL_INVALID_QUEUE_PROPERTIES)
        }

        reg.retain(ObjectKind::Context, context)?;
        Ok(reg.insert(Object::Queue(QueueObj {
            context,
            device,
            props,
            unflushed: Vec::new(),
            outstanding: Default::default(),
            last: None
        }), 1))
    }

    fn create_buffer (&self, context: Handle, flags: MemFlags, size: usize, init: Option<&[u8]>) -> NativeResult<Handle> {
        let mut reg = self.shared.lock();
        let devices = reg.context(context)?.devices.clone();

        if flags.host.is_use() {
            return Err(CL_INVALID_VALUE)
        }

        let bytes = size as u64;
        for device in &devices {
            if size == 0 || bytes > reg.device(*device)?.cfg.max_mem_alloc_size {
                return Err(CL_INVALID_BUFFER_SIZE)
            }
        }

        match (flags.host.is_copy(), init) {
            (true, Some(x)) if x.len() == size => {},
            (false, None) => {},
            _ => return Err(CL_INVALID_HOST_PTR)
        }

        for device in &devices {
            let device = reg.device(*device)?;
            if device.allocated.saturating_add(bytes) > device.cfg.global_mem_size {
                return Err(CL_MEM_OBJECT_ALLOCATION_FAILURE)
            }
        }

        let id = reg.storage_id();
        let storage = match init {
            Some(init) => Storage::with_contents(id, init)?,
            None => Storage::zeroed(id, size)?
        };

        for device in &devices {
            reg.device_mut(*device)?.allocated += bytes;
        }

        reg.retain(ObjectKind::Context, context)?;
        Ok(reg.insert(Object::Mem(MemObj {
            context,
            flags,
            size,
            offset: 0,
            parent: None,
            storage: Arc::new(storage),
            destructors: Vec::new(),
            charged: devices
        }), 1))
    }

    fn create_sub_buffer (&self, buffer: Handle, access: MemAccess, origin: usize, size: usize) -> NativeResult<Handle> {
        let mut reg = self.shared.lock();
        let parent = reg.mem(buffer)?;

        if parent.parent.is_some() {
            return Err(CL_INVALID_MEM_OBJECT)
        }
        if size == 0 {
            return Err(CL_INVALID_BUFFER_SIZE)
        }
        check_range(origin, size, parent.size)?;
        if !access.is_subset_of(parent.flags.access) {
            return Err(CL_INVALID_VALUE)
        }

        let context = parent.context;
        let flags = MemFlags::new(access, parent.flags.host);
        let storage = parent.storage.clone();

        let aligned = reg.context(context)?.devices.iter()
            .any(|x| reg.device(*x).map_or(false, |x| origin % x.cfg.base_addr_align == 0));

        if !aligned {
            return Err(CL_MISALIGNED_SUB_BUFFER_OFFSET)
        }

        reg.retain(ObjectKind::MemObject, buffer)?;
        reg.retain(ObjectKind::Context, context)?;
        Ok(reg.insert(Object::Mem(MemObj {
            context,
            flags,
            size,
            offset: origin,
            parent: Some(buffer),
            storage,
            destructors: Vec::new(),
            charged: Vec::new()
        }), 1))
    }

    #[inline]
    fn retain (&self, kind: ObjectKind, handle: Handle) -> NativeResult<()> {
        self.shared.lock().retain(kind, handle)
    }

    #[inline]
    fn release (&self, kind: ObjectKind, handle: Handle) -> NativeResult<()> {
        self.shared.release(kind, handle)
    }

    #[inline]
    fn get_info (&self, kind: ObjectKind, handle: Handle, param: InfoParam) -> NativeResult<InfoValue> {
        self.shared.lock().info(kind, handle, param)
    }

    fn set_kernel_arg (&self, kernel: Handle, idx: u32, arg: KernelArg<'_>) -> NativeResult<()> {
        let mut reg = self.shared.lock();
        let k = reg.kernel(kernel)?;
        if idx >= k.num_args {
            return Err(CL_INVALID_ARG_INDEX)
        }

        let value = match arg {
            KernelArg::Mem(mem) => match reg.mem(mem) {
                Ok(m) if m.context == k.context => ArgValue::Mem(mem),
                _ => return Err(CL_INVALID_MEM_OBJECT)
            },
            KernelArg::Bytes(x) if x.is_empty() => return Err(CL_INVALID_ARG_SIZE),
            KernelArg::Bytes(x) => ArgValue::Bytes(x.to_vec()),
            KernelArg::Local(0) => return Err(CL_INVALID_ARG_SIZE),
            KernelArg::Local(x) => ArgValue::Local(x)
        };

        reg.kernel_mut(kernel)?.args[idx as usize] = Some(value);
        Ok(())
    }

    unsafe fn enqueue_read_buffer (&self, queue: Handle, buffer: Handle, blocking: bool, offset: usize, size: usize, dst: *mut u8, wait: &[Handle]) -> NativeResult<Handle> {
        self.enqueue_with(queue, CL_COMMAND_READ_BUFFER, blocking, wait, |reg, target| {
            let (src, len) = target.span(reg, buffer)?;
            check_range(offset, size, len)?;
            if dst.is_null() {
                return Err(CL_INVALID_VALUE)
            }

            let command = Command::Read { src: at(src, offset), len: size, dst: SendPtr(dst) };
            Ok((command, vec![(ObjectKind::MemObject, buffer)]))
        })
    }

    unsafe fn enqueue_write_buffer (&self, queue: Handle, buffer: Handle, blocking: bool, offset: usize, size: usize, src: *const u8, wait: &[Handle]) -> NativeResult<Handle> {
        self.enqueue_with(queue, CL_COMMAND_WRITE_BUFFER, blocking, wait, |reg, target| {
            let (dst, len) = target.span(reg, buffer)?;
            check_range(offset, size, len)?;
            if src.is_null() {
                return Err(CL_INVALID_VALUE)
            }

            let command = Command::Write { dst: at(dst, offset), len: size, src: SendPtr(src as *mut u8) };
            Ok((command, vec![(ObjectKind::MemObject, buffer)]))
        })
    }

    fn enqueue_copy_buffer (&self, queue: Handle, src: Handle, dst: Handle, src_offset: usize, dst_offset: usize, size: usize, wait: &[Handle]) -> NativeResult<Handle> {
        self.enqueue_with(queue, CL_COMMAND_COPY_BUFFER, false, wait, |reg, target| {
            let (from, from_len) = target.span(reg, src)?;
            let (to, to_len) = target.span(reg, dst)?;
            check_range(src_offset, size, from_len)?;
            check_range(dst_offset, size, to_len)?;

            let (from, to) = (at(from, src_offset), at(to, dst_offset));
            if Arc::ptr_eq(&from.storage, &to.storage) && from.offset < to.offset + size && to.offset < from.offset + size {
                return Err(CL_MEM_COPY_OVERLAP)
            }

            let command = Command::Copy { src: from, dst: to, len: size };
            Ok((command, vec![(ObjectKind::MemObject, src), (ObjectKind::MemObject, dst)]))
        })
    }

    unsafe fn enqueue_read_buffer_rect (&self, queue: Handle, buffer: Handle, blocking: bool, rect: &BufferRect, dst: *mut u8, wait: &[Handle]) -> NativeResult<Handle> {
        self.enqueue_with(queue, CL_COMMAND_READ_BUFFER_RECT, blocking, wait, |reg, target| {
            let (src, len) = target.span(reg, buffer)?;
            let (layout, host) = (rect.buffer_layout()?, rect.host_layout()?);
            if layout.end() > len || dst.is_null() {
                return Err(CL_INVALID_VALUE)
            }

            let command = Command::ReadRect { src, buffer: layout, host, dst: SendPtr(dst) };
            Ok((command, vec![(ObjectKind::MemObject, buffer)]))
        })
    }

    unsafe fn enqueue_write_buffer_rect (&self, queue: Handle, buffer: Handle, blocking: bool, rect: &BufferRect, src: *const u8, wait: &[Handle]) -> NativeResult<Handle> {
        self.enqueue_with(queue, CL_COMMAND_WRITE_BUFFER_RECT, blocking, wait, |reg, target| {
            let (dst, len) = target.span(reg, buffer)?;
            let (layout, host) = (rect.buffer_layout()?, rect.host_layout()?);
            if layout.end() > len || src.is_null() {
                return Err(CL_INVALID_VALUE)
            }

            let command = Command::WriteRect { dst, buffer: layout, host, src: SendPtr(src as *mut u8) };
            Ok((command, vec![(ObjectKind::MemObject, buffer)]))
        })
    }

    fn enqueue_copy_buffer_rect (&self, queue: Handle, src: Handle, dst: Handle, rect: &RectCopy, wait: &[Handle]) -> NativeResult<Handle> {
        self.enqueue_with(queue, CL_COMMAND_COPY_BUFFER_RECT, false, wait, |reg, target| {
            let (from, from_len) = target.span(reg, src)?;
            let (to, to_len) = target.span(reg, dst)?;
            let (src_layout, dst_layout) = (rect.src_layout()?, rect.dst_layout()?);

            if src_layout.end() > from_len || dst_layout.end() > to_len {
                return Err(CL_INVALID_VALUE)
            }
            if Arc::ptr_eq(&from.storage, &to.storage) && rows_overlap(from.offset, &src_layout, to.offset, &dst_layout) {
                return Err(CL_MEM_COPY_OVERLAP)
            }

            let command = Command::CopyRect { src: from, dst: to, src_layout, dst_layout };
            Ok((command, vec![(ObjectKind::MemObject, src), (ObjectKind::MemObject, dst)]))
        })
    }

    fn enqueue_nd_range_kernel (&self, queue: Handle, kernel: Handle, work_dim: u32, offset: Option<&[usize]>, global: &[usize], local: Option<&[usize]>, wait: &[Handle]) -> NativeResult<Handle> {
        self.enqueue_with(queue, CL_COMMAND_NDRANGE_KERNEL, false, wait, |reg, target| {
            Self::kernel_command(reg, target, kernel, work_dim, offset, global, local)
        })
    }

    fn enqueue_marker (&self, queue: Handle, wait: &[Handle]) -> NativeResult<Handle> {
        self.enqueue_with(queue, CL_COMMAND_MARKER, false, wait, |_, _| Ok((Command::Marker, Vec::new())))
    }

    #[inline]
    fn flush (&self, queue: Handle) -> NativeResult<()> {
        self.shared.flush(queue)
    }

    #[inline]
    fn finish (&self, queue: Handle) -> NativeResult<()> {
        self.shared.finish(queue)
    }

    #[inline]
    fn wait_for_events (&self, events: &[Handle]) -> NativeResult<()> {
        self.shared.wait(events)
    }

    fn set_event_callback (&self, event: Handle, callback: Option<EventCallback>) -> NativeResult<()> {
        match callback {
            Some(f) => self.shared.on_complete(event, f),
            None => Err(CL_INVALID_VALUE)
        }
    }

    fn set_destructor_callback (&self, mem: Handle, callback: Option<DestructorCallback>) -> NativeResult<()> {
        let f = callback.ok_or(CL_INVALID_VALUE)?;
        self.shared.lock().mem_mut(mem)?.destructors.push(f);
        Ok(())
    }
}
