use flare::prelude::*;

fn two_devices () -> SharedBackend {
    let config = HostConfig::default()
        .with_platform("Test Platform", "tests")
        .with_device(HostDeviceConfig::new("Test GPU", DeviceType::GPU).with_out_of_order(false));

    HostBackend::new(config)
}

#[test]
fn platform_and_devices() -> Result<()> {
    let backend = two_devices();
    assert_eq!(backend.name(), "host");

    let platform = RawPlatform::first_in(&backend)?;
    assert_eq!(platform.name()?, "Test Platform");
    assert_eq!(platform.vendor()?, "tests");
    assert!(platform.version()?.starts_with("OpenCL"));

    let devices = RawDevice::all_in(&backend)?;
    assert_eq!(devices.len(), 2);
    assert_eq!(platform.devices(DeviceType::GPU)?, &devices[1..]);
    assert_eq!(platform.devices(DeviceType::DEFAULT)?, &devices[..1]);

    let gpu = &devices[1];
    assert_eq!(gpu.name()?, "Test GPU");
    assert_eq!(gpu.ty()?, DeviceType::GPU);
    assert_eq!(gpu.platform()?, platform);
    assert!(gpu.available()?);
    assert_eq!(gpu.mem_base_addr_align()?, 128 * 8);
    assert_eq!(gpu.max_work_item_sizes()?.len(), 3);
    assert!(gpu.max_compute_units()? >= 1);
    assert!(!gpu.queue_properties()?.out_of_order());
    assert!(gpu.queue_properties()?.profiling());
    Ok(())
}

#[test]
fn contexts_from_type() -> Result<()> {
    let backend = two_devices();

    let ctx = RawContext::from_type_in(&backend, ContextProperties::default(), DeviceType::GPU)?;
    assert_eq!(ctx.num_devices()?, 1);
    assert_eq!(ctx.devices()?[0].ty()?, DeviceType::GPU);

    let all = RawContext::from_type_in(&backend, ContextProperties::default(), DeviceType::ALL)?;
    assert_eq!(all.num_devices()?, 2);

    let err = RawContext::from_type_in(&backend, ContextProperties::default(), DeviceType::ACCELERATOR).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unavailable);
    assert_eq!(err.code(), Some(ErrorCode::DeviceNotFound));

    let err = RawContext::from_type_in(&backend, ContextProperties::default(), DeviceType::empty()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidValue);
    Ok(())
}

#[test]
fn contexts_from_devices() -> Result<()> {
    let backend = two_devices();
    let devices = RawDevice::all_in(&backend)?;
    let platform = RawPlatform::first_in(&backend)?;

    let ctx = RawContext::new(ContextProperties::new(Some(&platform)), &[devices[1].clone(), devices[1].clone()])?;
    assert_eq!(ctx.devices()?, &devices[1..]);

    let err = RawContext::new(ContextProperties::default(), &[]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidValue);

    // devices of another backend
    let other = RawDevice::all_in(&two_devices())?;
    let err = RawContext::new(ContextProperties::default(), &[devices[0].clone(), other[0].clone()]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidHandle);
    Ok(())
}

#[test]
fn unavailable_devices_are_skipped() -> Result<()> {
    let config = HostConfig::default()
        .with_device(HostDeviceConfig::new("offline", DeviceType::CPU).with_available(false));
    let backend: SharedBackend = HostBackend::new(config);

    let ctx = RawContext::from_type_in(&backend, ContextProperties::default(), DeviceType::CPU)?;
    assert_eq!(ctx.num_devices()?, 1);

    let offline = RawDevice::all_in(&backend)?.remove(1);
    assert!(!offline.available()?);
    let err = RawContext::new(ContextProperties::default(), &[offline]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unavailable);
    Ok(())
}

#[test]
fn queues_are_bound_to_their_context() -> Result<()> {
    let backend = two_devices();
    let ctx = RawContext::from_type_in(&backend, ContextProperties::default(), DeviceType::CPU)?;
    let devices = RawDevice::all_in(&backend)?;

    let queue = RawCommandQueue::new(&ctx, &devices[0], QueueProperties::new(true, true))?;
    assert_eq!(queue.device()?, devices[0]);
    assert_eq!(queue.context()?, ctx);
    assert_eq!(queue.properties()?, QueueProperties::new(true, true));

    let err = RawCommandQueue::new(&ctx, &devices[1], QueueProperties::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ContextMismatch);

    let gpu = RawContext::from_type_in(&backend, ContextProperties::default(), DeviceType::GPU)?;
    let err = RawCommandQueue::with_modes(&gpu, &devices[1], true, false).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidValue);
    assert_eq!(err.code(), Some(ErrorCode::InvalidQueueProperties));
    Ok(())
}

#[test]
fn memory_limits_are_enforced() -> Result<()> {
    let config = HostConfig::default();
    let config = HostConfig {
        devices: vec![HostDeviceConfig::default().with_memory(1024, 512)],
        ..config
    };
    let backend: SharedBackend = HostBackend::new(config);
    let ctx = RawContext::from_type_in(&backend, ContextProperties::default(), DeviceType::ALL)?;

    let first = RawBuffer::new(&ctx, 512, MemFlags::default(), None)?;
    let second = RawBuffer::new(&ctx, 512, MemFlags::default(), None)?;

    let err = RawBuffer::new(&ctx, 256, MemFlags::default(), None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AllocationFailure);

    // freed memory can be reused
    drop(first);
    let third = RawBuffer::new(&ctx, 256, MemFlags::default(), None)?;
    drop((second, third));
    Ok(())
}

#[test]
fn simple_context_round_robin() -> Result<()> {
    let backend = two_devices();
    let ctx = SimpleContext::from_type_in(&backend, DeviceType::ALL, QueueProperties::default())?;
    assert_eq!(ctx.queues().len(), 2);

    let first = ctx.next_queue().device()?;
    let second = ctx.next_queue().device()?;
    assert_ne!(first, second);
    assert_eq!(ctx.next_queue().device()?, first);

    for queue in ctx.queues() {
        queue.enqueue_marker(None)?;
    }
    ctx.finish_all()?;
    Ok(())
}
