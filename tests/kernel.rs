use std::sync::Arc;
use flare::{core::codes::CL_OUT_OF_RESOURCES, prelude::*};
use rand::{thread_rng, Rng};

fn setup () -> Result<(Arc<HostBackend>, RawContext, RawCommandQueue)> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();

    let host = HostBackend::new(HostConfig::default());
    let backend: SharedBackend = host.clone();

    let ctx = RawContext::from_type_in(&backend, ContextProperties::default(), DeviceType::ALL)?;
    let device = ctx.devices()?.remove(0);
    let queue = RawCommandQueue::with_modes(&ctx, &device, false, false)?;
    Ok((host, ctx, queue))
}

fn add (host: &HostBackend, ctx: &RawContext) -> Result<RawKernel> {
    host.create_kernel(ctx, HostKernel::new("add", 3, |item, args| {
        let id = item.global_id(0);
        let value = args.buffer::<f32>(0)[id] + args.buffer::<f32>(1)[id];
        args.buffer_mut::<f32>(2)[id] = value;
    }))
}

#[test]
fn vector_add() -> Result<()> {
    let (host, ctx, queue) = setup()?;
    let mut rng = thread_rng();

    let lhs = (0..1000).map(|_| rng.gen::<f32>()).collect::<Vec<_>>();
    let rhs = (0..1000).map(|_| rng.gen::<f32>()).collect::<Vec<_>>();

    let a = RawBuffer::new(&ctx, 4000, MemAccess::READ_ONLY.into(), None)?;
    let b = RawBuffer::new(&ctx, 4000, MemAccess::READ_ONLY.into(), None)?;
    let c = RawBuffer::new(&ctx, 4000, MemAccess::WRITE_ONLY.into(), None)?;

    let mut kernel = add(&host, &ctx)?;
    assert_eq!(kernel.name()?, "add");
    assert_eq!(kernel.num_args()?, 3);
    assert_eq!(kernel.context()?, ctx);

    kernel.set_mem_arg(0, &a)?;
    kernel.set_mem_arg(1, &b)?;
    kernel.set_mem_arg(2, &c)?;

    let write_a = a.write(&queue, 0, lhs.clone(), None)?;
    let write_b = b.write(&queue, 0, rhs.clone(), None)?;
    let launch = queue.enqueue_kernel(&kernel, &NdRange::new([1000]), [write_a.as_raw(), write_b.as_raw()])?;
    assert_eq!(launch.command_type()?, CommandType::NdRangeKernel);

    let result = c.read_blocking::<f32>(&queue, .., &launch)?;
    let expected = lhs.iter().zip(&rhs).map(|(x, y)| x + y).collect::<Vec<_>>();
    assert_eq!(result, expected);
    Ok(())
}

#[test]
fn scalar_arguments_and_offsets() -> Result<()> {
    let (host, ctx, queue) = setup()?;
    let buffer = RawBuffer::new(&ctx, 16 * 4, MemAccess::READ_WRITE.into(), None)?;

    let mut kernel = host.create_kernel(&ctx, HostKernel::new("fill", 2, |item, args| {
        let value = args.scalar::<u32>(1);
        let idx = item.global_id(1) * item.global_size(0) + item.global_id(0);
        args.buffer_mut::<u32>(0)[idx] = value + item.work_dim();
    }))?;

    kernel.set_mem_arg(0, &buffer)?;
    kernel.set_arg(1, &40u32)?;

    // bottom half of a 4x4 grid
    let range = NdRange::new([4, 2]).with_offset([0, 2]).with_local([2, 2]);
    queue.enqueue_kernel(&kernel, &range, None)?.wait()?;

    let contents = buffer.read_blocking::<u32>(&queue, .., None)?;
    assert_eq!(&contents[..8], &[0; 8]);
    assert_eq!(&contents[8..], &[42; 8]);
    Ok(())
}

#[test]
fn local_memory_is_shared_within_a_group() -> Result<()> {
    let (host, ctx, queue) = setup()?;
    let sums = RawBuffer::new(&ctx, 4 * 4, MemAccess::WRITE_ONLY.into(), None)?;

    let mut kernel = host.create_kernel(&ctx, HostKernel::new("group_sum", 2, |item, args| {
        let local = args.local_mut::<u32>(1);
        local[0] += item.global_id(0) as u32;
        let sum = local[0];

        if item.local_id(0) + 1 == item.local_size(0) {
            args.buffer_mut::<u32>(0)[item.group_id(0)] = sum;
        }
    }))?;

    kernel.set_mem_arg(0, &sums)?;
    kernel.set_local_arg(1, 4)?;
    queue.enqueue_kernel(&kernel, &NdRange::new([16]).with_local([4]), None)?.wait()?;

    assert_eq!(sums.read_blocking::<u32>(&queue, .., None)?, vec![6, 22, 38, 54]);
    Ok(())
}

#[test]
fn panicking_kernel_fails_its_command() -> Result<()> {
    let (host, ctx, queue) = setup()?;
    let buffer = RawBuffer::new(&ctx, 16, MemAccess::READ_WRITE.into(), None)?;

    let mut kernel = host.create_kernel(&ctx, HostKernel::new("out_of_bounds", 1, |item, args| {
        args.buffer_mut::<u32>(0)[item.global_id(0)] = 1;
    }))?;
    kernel.set_mem_arg(0, &buffer)?;

    let failed = queue.enqueue_kernel(&kernel, &NdRange::new([8]), None)?;
    let dependent = queue.enqueue_marker(&failed)?;
    let unrelated = buffer.write(&queue, 0, vec![5u32; 4], None)?;

    let err = failed.wait_by_ref().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ResourceExhaustion);
    assert_eq!(failed.status()?, EventStatus::Error(CL_OUT_OF_RESOURCES));

    let err = dependent.wait_by_ref().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DependencyFailure);

    let err = RawEvent::wait_all([&failed, &dependent]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DependencyFailure);

    // in-order succession alone doesn't propagate the failure
    assert_eq!(unrelated.wait()?, vec![5; 4]);

    let err = queue.enqueue_marker(&dependent).and_then(|x| x.wait()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DependencyFailure);
    Ok(())
}

#[test]
fn failed_blocking_dependency_is_reported() -> Result<()> {
    let (host, ctx, queue) = setup()?;
    let buffer = RawBuffer::new(&ctx, 16, MemAccess::READ_WRITE.into(), None)?;

    let kernel = host.create_kernel(&ctx, HostKernel::new("abort", 0, |_, _| panic!("abort")))?;
    let failed = queue.enqueue_kernel(&kernel, &NdRange::new([1]), None)?;

    let err = buffer.read_blocking::<u32>(&queue, .., &failed).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DependencyFailure);
    assert_eq!(err.operation(), Operation::EnqueueReadBuffer);
    Ok(())
}

#[test]
fn invalid_launches() -> Result<()> {
    let (host, ctx, queue) = setup()?;
    let buffer = RawBuffer::new(&ctx, 4000, MemAccess::READ_WRITE.into(), None)?;
    let mut kernel = add(&host, &ctx)?;

    kernel.set_mem_arg(0, &buffer)?;
    let err = queue.enqueue_kernel(&kernel, &NdRange::new([1000]), None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidValue);
    assert_eq!(err.code(), Some(ErrorCode::InvalidKernelArgs));

    kernel.set_mem_arg(1, &buffer)?;
    kernel.set_mem_arg(2, &buffer)?;

    let err = queue.enqueue_kernel(&kernel, &NdRange::new([1000]).with_local([3]), None).unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::InvalidWorkGroupSize));

    let err = queue.enqueue_kernel(&kernel, &NdRange::new([0]), None).unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::InvalidGlobalWorkSize));

    let err = queue.enqueue_kernel(&kernel, &NdRange::new([1, 1, 1, 1]), None).unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::InvalidWorkDimension));

    let err = queue.enqueue_nd_range_kernel(&kernel, None, &[1000], Some(&[10, 1][..]), None).unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::InvalidWorkDimension));

    let limit = ctx.devices()?[0].max_work_group_size()?.get();
    let err = queue.enqueue_kernel(&kernel, &NdRange::new([2 * limit]).with_local([2 * limit]), None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidValue);
    Ok(())
}

#[test]
fn invalid_arguments() -> Result<()> {
    let (host, ctx, _queue) = setup()?;
    let mut kernel = add(&host, &ctx)?;

    let err = kernel.set_arg(3, &1u32).unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::InvalidArgIndex));

    let err = kernel.set_local_arg(0, 0).unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::InvalidArgSize));

    let (_other_host, other_ctx, _) = setup()?;
    let foreign = RawBuffer::new(&other_ctx, 16, MemFlags::default(), None)?;
    let err = kernel.set_mem_arg(0, &foreign).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidHandle);

    let err = host.create_kernel(&other_ctx, HostKernel::new("add", 3, |_, _| {})).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidHandle);

    let err = host.create_kernel(&ctx, HostKernel::new("", 0, |_, _| {})).unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::InvalidKernelName));
    Ok(())
}

#[test]
fn kernels_run_only_on_the_devices_they_were_built_for() -> Result<()> {
    let config = HostConfig::default().with_device(HostDeviceConfig::new("second", DeviceType::CPU));
    let host = HostBackend::new(config);
    let backend: SharedBackend = host.clone();

    let ctx = RawContext::from_type_in(&backend, ContextProperties::default(), DeviceType::CPU)?;
    let devices = ctx.devices()?;
    assert_eq!(devices.len(), 2);

    let kernel = host.create_kernel(&ctx, HostKernel::new("noop", 0, |_, _| {}).built_for(&devices[..1]))?;
    let first = RawCommandQueue::new(&ctx, &devices[0], QueueProperties::default())?;
    let second = RawCommandQueue::new(&ctx, &devices[1], QueueProperties::default())?;

    first.enqueue_kernel(&kernel, &NdRange::new([4]), None)?.wait()?;
    let err = second.enqueue_kernel(&kernel, &NdRange::new([4]), None).unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::InvalidProgramExecutable));
    Ok(())
}
