use std::{sync::{mpsc, Arc, Mutex}, time::Duration};
use flare::{core::codes::*, prelude::*};

fn setup () -> Result<(SharedBackend, RawContext, RawCommandQueue)> {
    let backend: SharedBackend = HostBackend::new(HostConfig::default());
    let ctx = RawContext::from_type_in(&backend, ContextProperties::default(), DeviceType::ALL)?;
    let device = ctx.devices()?.remove(0);
    let queue = RawCommandQueue::with_modes(&ctx, &device, false, false)?;
    Ok((backend, ctx, queue))
}

#[test]
fn clones_share_the_reference_count() -> Result<()> {
    let (_backend, ctx, _queue) = setup()?;
    let buffer = RawBuffer::new(&ctx, 64, MemFlags::default(), None)?;
    assert_eq!(buffer.reference_count()?, 1);

    let other = buffer.clone();
    assert_eq!(other, buffer);
    assert_eq!(buffer.reference_count()?, 2);

    drop(other);
    assert_eq!(buffer.reference_count()?, 1);

    // the buffer holds its context
    let before = ctx.reference_count()?;
    let second = RawBuffer::new(&ctx, 64, MemFlags::default(), None)?;
    assert_eq!(ctx.reference_count()?, before + 1);
    second.release()?;
    assert_eq!(ctx.reference_count()?, before);
    Ok(())
}

#[test]
fn released_handles_are_invalid() -> Result<()> {
    let (backend, ctx, _queue) = setup()?;
    let buffer = RawBuffer::new(&ctx, 64, MemFlags::default(), None)?;
    let (handle, _) = buffer.into_memobject().into_raw();

    assert_eq!(backend.release(ObjectKind::MemObject, handle), Ok(()));
    assert_eq!(backend.release(ObjectKind::MemObject, handle), Err(CL_INVALID_MEM_OBJECT));
    assert_eq!(backend.retain(ObjectKind::MemObject, handle), Err(CL_INVALID_MEM_OBJECT));

    let err = Error::from_code(CL_INVALID_MEM_OBJECT, Operation::Release);
    assert_eq!(err.kind(), ErrorKind::InvalidHandle);

    // handles aren't reused, so a new buffer never aliases the old one
    let next = RawBuffer::new(&ctx, 64, MemFlags::default(), None)?;
    assert_ne!(next.handle(), handle);
    Ok(())
}

#[test]
fn handles_of_the_wrong_kind_are_invalid() -> Result<()> {
    let (backend, ctx, queue) = setup()?;
    assert_eq!(backend.retain(ObjectKind::MemObject, ctx.handle()), Err(CL_INVALID_MEM_OBJECT));
    assert_eq!(backend.release(ObjectKind::Event, queue.handle()), Err(CL_INVALID_EVENT));
    assert_eq!(backend.get_info(ObjectKind::Kernel, queue.handle(), InfoParam::ReferenceCount), Err(CL_INVALID_KERNEL));
    Ok(())
}

#[test]
fn destructors_run_in_reverse_order() -> Result<()> {
    let (_backend, ctx, _queue) = setup()?;
    let buffer = RawBuffer::new(&ctx, 64, MemFlags::default(), None)?;
    let order = Arc::new(Mutex::new(Vec::new()));

    for i in 0..3 {
        let order = order.clone();
        buffer.on_destruct(move || order.lock().unwrap().push(i))?;
    }

    let clone = buffer.clone();
    drop(buffer);
    assert!(order.lock().unwrap().is_empty());

    drop(clone);
    assert_eq!(*order.lock().unwrap(), vec![2, 1, 0]);
    Ok(())
}

#[test]
fn sub_buffers_keep_their_parent() -> Result<()> {
    let (_backend, ctx, queue) = setup()?;
    let parent = RawBuffer::from_slice(&ctx, &[7u8; 512], MemAccess::READ_WRITE)?;
    let (tx, rx) = mpsc::channel();
    parent.on_destruct(move || tx.send(()).unwrap())?;

    let sub = parent.create_sub_buffer(MemAccess::READ_ONLY, 128..256)?;
    drop(parent);
    assert!(rx.try_recv().is_err());
    assert_eq!(sub.read_blocking::<u8>(&queue, .., None)?, vec![7; 128]);

    drop(sub);
    assert!(rx.try_recv().is_ok());
    Ok(())
}

#[test]
fn commands_keep_their_objects_alive() -> Result<()> {
    let (_backend, ctx, queue) = setup()?;
    let buffer = RawBuffer::new(&ctx, 64, MemFlags::default(), None)?;
    let (tx, rx) = mpsc::channel();
    buffer.on_destruct(move || tx.send(()).unwrap())?;

    let write = buffer.write(&queue, 0, vec![1u32; 16], None)?;
    drop(buffer);
    assert!(rx.try_recv().is_err());

    assert_eq!(write.wait()?, vec![1; 16]);
    assert!(rx.recv_timeout(Duration::from_secs(5)).is_ok());
    Ok(())
}

#[test]
fn events_outlive_their_queue() -> Result<()> {
    let (_backend, ctx, queue) = setup()?;
    let marker = queue.enqueue_marker(None)?;

    // releasing the queue flushes it
    queue.release()?;
    marker.wait_by_ref()?;

    assert_eq!(marker.status()?, EventStatus::Complete);
    assert_eq!(marker.command_queue()?, None);
    assert_eq!(marker.context()?, ctx);
    Ok(())
}

#[test]
fn queues_hold_their_context() -> Result<()> {
    let (_backend, ctx, queue) = setup()?;
    let before = ctx.reference_count()?;
    let other = RawCommandQueue::new(&ctx, &queue.device()?, QueueProperties::default())?;
    assert_eq!(ctx.reference_count()?, before + 1);

    assert_eq!(other.context()?, ctx);
    drop(other);
    assert_eq!(ctx.reference_count()?, before);
    Ok(())
}

#[test]
fn callbacks_may_release_the_last_reference() -> Result<()> {
    let (_backend, ctx, queue) = setup()?;
    let buffer = RawBuffer::new(&ctx, 16, MemFlags::default(), None)?;
    let (tx, rx) = mpsc::channel();

    let marker = queue.enqueue_marker(None)?;
    let owned = marker.clone();

    marker.on_complete(move |status| {
        drop(buffer);
        drop(owned);
        tx.send(status).unwrap();
    })?;

    drop(marker);
    queue.flush()?;
    assert_eq!(rx.recv_timeout(Duration::from_secs(5)).ok(), Some(EventStatus::Complete));
    Ok(())
}
