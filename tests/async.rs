#![cfg(feature = "futures")]

use std::{num::NonZeroUsize, sync::Arc};
use flare::prelude::*;
use tokio::sync::Notify;

fn setup () -> Result<(Arc<HostBackend>, RawContext, RawCommandQueue)> {
    let host = HostBackend::new(HostConfig::default().with_workers(NonZeroUsize::new(2).unwrap()));
    let backend: SharedBackend = host.clone();

    let ctx = RawContext::from_type_in(&backend, ContextProperties::default(), DeviceType::ALL)?;
    let device = ctx.devices()?.remove(0);
    let queue = RawCommandQueue::with_modes(&ctx, &device, false, false)?;
    Ok((host, ctx, queue))
}

#[tokio::test]
async fn read_resolves_without_blocking() -> Result<()> {
    let (_host, ctx, queue) = setup()?;
    let buffer = RawBuffer::from_slice(&ctx, &[1u32, 2, 3, 4, 5], MemAccess::READ_WRITE)?;

    // waiting flushes the queue, so nothing else is needed for the read to run
    let read = buffer.read::<u32>(&queue, 1.., None)?.wait_async()?;
    assert_eq!(read.await?, vec![2, 3, 4, 5]);
    Ok(())
}

#[tokio::test]
async fn futures_resolve_as_commands_complete() -> Result<()> {
    let (host, ctx, queue) = setup()?;
    let started = Arc::new(Notify::new());
    let release = Arc::new(std::sync::Barrier::new(2));

    let (kernel_started, kernel_release) = (started.clone(), release.clone());
    let kernel = host.create_kernel(&ctx, HostKernel::new("wait", 0, move |_, _| {
        kernel_started.notify_one();
        kernel_release.wait();
    }))?;

    let launch = queue.enqueue_kernel(&kernel, &NdRange::new([1]), None)?;
    let mut fut = launch.wait_async()?;

    started.notified().await;
    tokio::select! {
        biased;
        _ = &mut fut => panic!("kernel completed while still blocked"),
        _ = tokio::task::yield_now() => {}
    }

    tokio::task::spawn_blocking(move || release.wait()).await.unwrap();
    fut.await?;
    Ok(())
}

#[tokio::test]
async fn failures_surface_through_the_future() -> Result<()> {
    let (host, ctx, queue) = setup()?;
    let kernel = host.create_kernel(&ctx, HostKernel::new("abort", 0, |_, _| panic!("abort")))?;

    let failed = queue.enqueue_kernel(&kernel, &NdRange::new([1]), None)?;
    let marker = queue.enqueue_marker(&failed)?;

    let err = marker.wait_async()?.await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DependencyFailure);

    let err = failed.wait_async()?.await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ResourceExhaustion);
    Ok(())
}
