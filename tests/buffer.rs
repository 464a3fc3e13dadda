use flare::prelude::*;
use rand::{thread_rng, Rng};

fn setup () -> Result<(RawContext, RawCommandQueue)> {
    let backend: SharedBackend = HostBackend::new(HostConfig::default());
    let ctx = RawContext::from_type_in(&backend, ContextProperties::default(), DeviceType::ALL)?;
    let device = ctx.devices()?.remove(0);
    let queue = RawCommandQueue::with_modes(&ctx, &device, false, false)?;
    Ok((ctx, queue))
}

#[test]
fn linear_round_trip() -> Result<()> {
    let (ctx, queue) = setup()?;
    let mut rng = thread_rng();

    let values = (0..1024).map(|_| rng.gen::<f32>()).collect::<Vec<_>>();
    let buffer = RawBuffer::from_slice(&ctx, &values, MemAccess::READ_WRITE)?;
    assert_eq!(buffer.size()?, 1024 * 4);
    assert_eq!(buffer.read_blocking::<f32>(&queue, .., None)?, values);

    let patch = (0..100).map(|_| rng.gen::<f32>()).collect::<Vec<_>>();
    buffer.write_blocking(&queue, 200, &patch, None)?;

    let mut expected = values.clone();
    expected[200..300].copy_from_slice(&patch);
    assert_eq!(buffer.read_blocking::<f32>(&queue, .., None)?, expected);
    assert_eq!(buffer.read_blocking::<f32>(&queue, 250..=260, None)?, &expected[250..=260]);
    Ok(())
}

#[test]
fn typed_events_hand_back_their_vectors() -> Result<()> {
    let (ctx, queue) = setup()?;
    let buffer = RawBuffer::new(&ctx, 8 * 4, MemAccess::READ_WRITE.into(), None)?;

    let write = buffer.write(&queue, 2, vec![1i32, 2, 3], None)?;
    assert_eq!(write.command_type()?, CommandType::WriteBuffer);
    let read = buffer.read::<i32>(&queue, .., write.as_raw())?;
    assert_eq!(read.command_type()?, CommandType::ReadBuffer);

    assert_eq!(read.wait()?, vec![0, 0, 1, 2, 3, 0, 0, 0]);
    assert_eq!(write.wait()?, vec![1, 2, 3]);
    Ok(())
}

#[test]
fn out_of_range_transfers_are_rejected_whole() -> Result<()> {
    let (ctx, queue) = setup()?;
    let buffer = RawBuffer::from_slice(&ctx, &[1u32, 2, 3, 4, 5, 6, 7, 8], MemAccess::READ_WRITE)?;

    let err = buffer.write_blocking(&queue, 6, &[9u32, 9, 9, 9], None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidValue);
    assert_eq!(err.operation(), Operation::EnqueueWriteBuffer);
    assert_eq!(buffer.read_blocking::<u32>(&queue, .., None)?, vec![1, 2, 3, 4, 5, 6, 7, 8]);

    let err = buffer.read_blocking::<u32>(&queue, 4..9, None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidValue);

    let mut dst = [0u32; 2];
    let err = buffer.read_into_blocking(&queue, usize::MAX / 2, &mut dst, None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidValue);
    Ok(())
}

#[test]
fn copies_between_and_within_buffers() -> Result<()> {
    let (ctx, queue) = setup()?;
    let src = RawBuffer::from_slice(&ctx, &(0..32u8).collect::<Vec<_>>(), MemAccess::READ_ONLY)?;
    let dst = RawBuffer::new(&ctx, 32, MemAccess::READ_WRITE.into(), None)?;

    dst.copy_from(&queue, 8, &src, 0..16, None)?.wait()?;
    let contents = dst.read_blocking::<u8>(&queue, .., None)?;
    assert_eq!(&contents[..8], &[0; 8]);
    assert_eq!(&contents[8..24], &(0..16).collect::<Vec<u8>>()[..]);

    // disjoint ranges of the same buffer are fine
    dst.copy_from(&queue, 0, &dst, 24..32, None)?.wait()?;

    let err = dst.copy_from(&queue, 4, &dst, 0..8, None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidValue);
    assert_eq!(err.code(), Some(ErrorCode::MemCopyOverlap));
    Ok(())
}

#[test]
fn rect_copy_matches_row_copies() -> Result<()> {
    let (ctx, queue) = setup()?;
    let mut rng = thread_rng();

    // 8 rows of 16 bytes, copying a 5x3 block into a buffer with 8-byte rows
    let contents = (0..128).map(|_| rng.gen::<u8>()).collect::<Vec<_>>();
    let src = RawBuffer::from_slice(&ctx, &contents, MemAccess::READ_WRITE)?;
    let by_rect = RawBuffer::new(&ctx, 64, MemAccess::READ_WRITE.into(), None)?;
    let by_rows = RawBuffer::new(&ctx, 64, MemAccess::READ_WRITE.into(), None)?;

    let rect = RectCopy::new([5, 3, 1])
        .with_src_origin([2, 4, 0])
        .with_src_pitch(16, 0)
        .with_dst_origin([1, 2, 0])
        .with_dst_pitch(8, 0);

    queue.enqueue_copy_buffer_rect(&src, &by_rect, &rect, None)?.wait()?;

    for row in 0..3 {
        let from = (4 + row) * 16 + 2;
        by_rows.copy_from(&queue, (2 + row) * 8 + 1, &src, from..from + 5, None)?;
    }
    queue.finish()?;

    let expected = by_rows.read_blocking::<u8>(&queue, .., None)?;
    assert_eq!(by_rect.read_blocking::<u8>(&queue, .., None)?, expected);
    assert_eq!(&expected[17..22], &contents[66..71]);
    Ok(())
}

#[test]
fn rect_transfers_with_the_host() -> Result<()> {
    let (ctx, queue) = setup()?;
    let buffer = RawBuffer::new(&ctx, 4 * 4 * 4, MemAccess::READ_WRITE.into(), None)?;

    // 2x2 block of u32 at column 1, row 1 of a 4x4 matrix
    let rect = BufferRect::new([8, 2, 1])
        .with_buffer_origin([4, 1, 0])
        .with_buffer_pitch(16, 0);

    buffer.write_rect_blocking(&queue, &rect, &[1u32, 2, 3, 4], None)?;
    assert_eq!(buffer.read_blocking::<u32>(&queue, .., None)?, vec![
        0, 0, 0, 0,
        0, 1, 2, 0,
        0, 3, 4, 0,
        0, 0, 0, 0
    ]);

    let mut block = [0u32; 4];
    buffer.read_rect_blocking(&queue, &rect, &mut block, None)?;
    assert_eq!(block, [1, 2, 3, 4]);

    // host side reaching past the slice
    let wide = rect.with_host_pitch(12, 0);
    let err = buffer.read_rect_blocking(&queue, &wide, &mut block, None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidValue);
    Ok(())
}

#[test]
fn overlapping_rect_copy_is_rejected() -> Result<()> {
    let (ctx, queue) = setup()?;
    let buffer = RawBuffer::new(&ctx, 64, MemAccess::READ_WRITE.into(), None)?;

    let overlapping = RectCopy::new([4, 2, 1])
        .with_src_pitch(8, 0)
        .with_dst_origin([2, 0, 0])
        .with_dst_pitch(8, 0);

    let err = queue.enqueue_copy_buffer_rect(&buffer, &buffer, &overlapping, None).unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::MemCopyOverlap));

    // the rows of each side interleave without touching
    let interleaved = RectCopy::new([8, 2, 1])
        .with_src_pitch(16, 0)
        .with_dst_origin([8, 0, 0])
        .with_dst_pitch(16, 0);

    queue.enqueue_copy_buffer_rect(&buffer, &buffer, &interleaved, None)?.wait()?;
    Ok(())
}

#[test]
fn sub_buffers_view_their_parent() -> Result<()> {
    let (ctx, queue) = setup()?;
    let align = ctx.devices()?[0].mem_base_addr_align()? as usize / 8;
    let parent = RawBuffer::new(&ctx, 4 * align, MemAccess::READ_WRITE.into(), None)?;

    let sub = parent.create_sub_buffer(MemAccess::READ_WRITE, align..2 * align)?;
    assert_eq!(sub.size()?, align);
    assert_eq!(sub.offset()?, align);
    assert_eq!(sub.associated_memobject()?.map(|x| x.handle()), Some(parent.handle()));

    sub.write_blocking(&queue, 0, &vec![0xABu8; align], None)?;
    let contents = parent.read_blocking::<u8>(&queue, .., None)?;
    assert!(contents[..align].iter().all(|x| *x == 0));
    assert!(contents[align..2 * align].iter().all(|x| *x == 0xAB));
    assert!(contents[2 * align..].iter().all(|x| *x == 0));
    Ok(())
}

#[test]
fn invalid_sub_buffers() -> Result<()> {
    let (ctx, _queue) = setup()?;
    let align = ctx.devices()?[0].mem_base_addr_align()? as usize / 8;
    let parent = RawBuffer::new(&ctx, 4 * align, MemAccess::READ_ONLY.into(), None)?;

    let err = parent.create_sub_buffer(MemAccess::READ_ONLY, 1..align).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidValue);
    assert_eq!(err.code(), Some(ErrorCode::MisalignedSubBufferOffset));

    let err = parent.create_sub_buffer(MemAccess::READ_WRITE, ..align).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidValue);

    let err = parent.create_sub_buffer(MemAccess::READ_ONLY, 0..5 * align).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidValue);

    let sub = parent.create_sub_buffer(MemAccess::READ_ONLY, ..align)?;
    let err = sub.create_sub_buffer(MemAccess::READ_ONLY, ..).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidHandle);
    Ok(())
}

#[test]
fn invalid_buffers() -> Result<()> {
    let (ctx, _queue) = setup()?;

    let err = RawBuffer::new(&ctx, 0, MemFlags::default(), None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidValue);

    let err = RawBuffer::new(&ctx, 8, MemFlags::copy(MemAccess::READ_WRITE), Some(&[0u8; 4][..])).unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::InvalidHostPtr));

    let limit = ctx.devices()?[0].max_mem_alloc_size()? as usize;
    let err = RawBuffer::new(&ctx, limit + 1, MemFlags::default(), None).unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::InvalidBufferSize));
    Ok(())
}

#[test]
fn unaligned_device_configs_are_rounded_up() -> Result<()> {
    let device = HostDeviceConfig { base_addr_align: 0, ..Default::default() };
    let backend: SharedBackend = HostBackend::new(HostConfig { devices: vec![device], ..HostConfig::default() });
    let ctx = RawContext::from_type_in(&backend, ContextProperties::default(), DeviceType::ALL)?;
    let queue = RawCommandQueue::with_modes(&ctx, &ctx.devices()?[0], false, false)?;
    assert_eq!(ctx.devices()?[0].mem_base_addr_align()?, 8);

    let parent = RawBuffer::from_slice(&ctx, &(0..32u8).collect::<Vec<_>>(), MemAccess::READ_WRITE)?;
    let sub = parent.create_sub_buffer(MemAccess::READ_WRITE, 3..16)?;
    assert_eq!(sub.read_blocking::<u8>(&queue, .., None)?, (3..16).collect::<Vec<u8>>());

    let device = HostDeviceConfig { base_addr_align: 48, ..Default::default() };
    let backend: SharedBackend = HostBackend::new(HostConfig { devices: vec![device], ..HostConfig::default() });
    let ctx = RawContext::from_type_in(&backend, ContextProperties::default(), DeviceType::ALL)?;
    assert_eq!(ctx.devices()?[0].mem_base_addr_align()?, 64 * 8);

    let parent = RawBuffer::new(&ctx, 256, MemAccess::READ_WRITE.into(), None)?;
    let err = parent.create_sub_buffer(MemAccess::READ_WRITE, 48..96).unwrap_err();
    assert_eq!(err.code(), Some(ErrorCode::MisalignedSubBufferOffset));
    parent.create_sub_buffer(MemAccess::READ_WRITE, 64..128)?;
    Ok(())
}
