use bytemuck::Pod;
use crate::{context::RawContext, memobj::RawMemObject};
use super::*;

raw_object! {
    /// Owned reference to a kernel object.
    ///
    /// Kernels are built by their backend: see [`HostKernel`](crate::host::HostKernel) for the host
    /// backend, and `OpenClBackend::build_kernel` for the OpenCL one.
    pub struct RawKernel => Kernel
}

impl RawKernel {
    /// Sets the argument at `idx` to a copy of `v`.
    #[inline]
    pub fn set_arg<T: Pod> (&mut self, idx: u32, v: &T) -> Result<()> {
        self.set_raw_arg(idx, KernelArg::Bytes(bytemuck::bytes_of(v)))
    }

    /// Sets the argument at `idx` to a memory object, which must belong to the kernel's context.
    #[inline]
    pub fn set_mem_arg (&mut self, idx: u32, mem: &RawMemObject) -> Result<()> {
        self.check_backend(mem.backend(), ErrorCode::InvalidMemObject, Operation::SetKernelArg)?;
        self.set_raw_arg(idx, KernelArg::Mem(mem.handle()))
    }

    /// Allocates `size` bytes of local memory for the argument at `idx`.
    #[inline]
    pub fn set_local_arg (&mut self, idx: u32, size: usize) -> Result<()> {
        self.set_raw_arg(idx, KernelArg::Local(size))
    }

    #[inline(always)]
    pub fn set_raw_arg (&mut self, idx: u32, arg: KernelArg<'_>) -> Result<()> {
        tri!(Operation::SetKernelArg, self.backend().set_kernel_arg(self.handle(), idx, arg));
        Ok(())
    }

    /// Return the kernel function name.
    #[inline(always)]
    pub fn name (&self) -> Result<String> {
        self.info_as(InfoParam::KernelFunctionName)
    }

    /// Return the number of arguments to _kernel_.
    #[inline(always)]
    pub fn num_args (&self) -> Result<u32> {
        self.info_as(InfoParam::KernelNumArgs)
    }

    /// Return the context associated with _kernel_.
    #[inline]
    pub fn context (&self) -> Result<RawContext> {
        let id = self.info_as::<Handle>(InfoParam::Context)?;
        RawContext::retained(id, self.backend().clone())
    }
}
