use crate::{buffer::MemFlags, context::RawContext, core::*};
use super::MemObjectType;

raw_object! {
    /// Owned reference to a memory object
    pub struct RawMemObject => MemObject
}

impl RawMemObject {
    /// Returns the memory object's type
    #[inline]
    pub fn ty (&self) -> Result<MemObjectType> {
        let ty = self.info_as::<u32>(InfoParam::MemType)?;
        MemObjectType::try_from(ty).map_err(|_| Error::new(ErrorCode::InvalidValue, Operation::GetInfo, format!("unknown memory object type {ty:#x}")))
    }

    /// Return memory object from which memobj is created, or `None` if it isn't a sub-buffer.
    #[inline]
    pub fn associated_memobject (&self) -> Result<Option<RawMemObject>> {
        match self.info_as::<Option<Handle>>(InfoParam::MemAssociatedMemObject)? {
            Some(id) => RawMemObject::retained(id, self.backend().clone()).map(Some),
            None => Ok(None)
        }
    }

    /// Return the flags argument value specified when memobj is created.
    #[inline(always)]
    pub fn flags (&self) -> Result<MemFlags> {
        let flags = self.info_as::<u64>(InfoParam::MemFlags)?;
        Ok(MemFlags::from_bits(flags))
    }

    /// Return actual size of the data store associated with memobj in bytes.
    #[inline(always)]
    pub fn size (&self) -> Result<usize> {
        self.info_as(InfoParam::MemSize)
    }

    /// Return context specified when memory object is created.
    #[inline]
    pub fn context (&self) -> Result<RawContext> {
        let id = self.info_as::<Handle>(InfoParam::Context)?;
        RawContext::retained(id, self.backend().clone())
    }

    /// Return offset if memobj is a sub-buffer object created using [create_sub_buffer](crate::buffer::RawBuffer::create_sub_buffer). Returns 0 if memobj is not a subbuffer object.
    #[inline(always)]
    pub fn offset (&self) -> Result<usize> {
        self.info_as(InfoParam::MemOffset)
    }
}

impl RawMemObject {
    /// Adds a callback to be executed right before the memory object's storage is freed.
    /// Callbacks run in the reverse order of their registration.
    #[inline(always)]
    pub fn on_destruct (&self, f: impl 'static + FnOnce() + Send) -> Result<()> {
        let f = Box::new(f) as Box<_>;
        self.on_destruct_boxed(f)
    }

    #[inline(always)]
    pub fn on_destruct_boxed (&self, f: Box<dyn FnOnce() + Send>) -> Result<()> {
        let callback: DestructorCallback = Box::new(move |_| f());
        tri!(Operation::SetDestructorCallback, self.backend().set_destructor_callback(self.handle(), Some(callback)));
        Ok(())
    }
}
