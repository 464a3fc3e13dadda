use once_cell::sync::Lazy;
use super::SharedBackend;

static GLOBAL_BACKEND: Lazy<SharedBackend> = Lazy::new(|| {
    cfg_if::cfg_if! {
        if #[cfg(feature = "opencl")] {
            let backend: SharedBackend = crate::opencl::OpenClBackend::new();
        } else {
            let backend: SharedBackend = crate::host::HostBackend::new(crate::host::HostConfig::from_env());
        }
    }

    tracing::debug!(backend = backend.name(), "initialized global backend");
    backend
});

/// Process-wide default backend, used by every constructor without an `_in` suffix.
///
/// With the `opencl` feature this is the native OpenCL driver, otherwise a host backend configured
/// through [`HostConfig::from_env`](crate::host::HostConfig::from_env).
#[inline(always)]
pub fn global_backend () -> &'static SharedBackend {
    &GLOBAL_BACKEND
}
