use std::{fmt::Debug, mem::ManuallyDrop};
use super::*;

/// A native handle together with the obligation to release it once.
///
/// Cloning retains the handle, moving transfers the obligation without any backend call and dropping
/// releases it. A failed release on drop is logged, since there's no caller left to report it to.
pub struct RawObject {
    handle: Handle,
    kind: ObjectKind,
    backend: SharedBackend,
}

impl RawObject {
    /// Takes ownership of one reference to `handle`.
    ///
    /// # Safety
    /// The caller must own a reference to `handle`, of the given kind, issued by `backend`.
    #[inline(always)]
    pub unsafe fn from_raw (handle: Handle, kind: ObjectKind, backend: SharedBackend) -> Self {
        Self { handle, kind, backend }
    }

    /// Retains `handle` and wraps the new reference.
    pub fn retained (handle: Handle, kind: ObjectKind, backend: SharedBackend) -> Result<Self> {
        tri!(Operation::Retain, backend.retain(kind, handle));
        unsafe { Ok(Self::from_raw(handle, kind, backend)) }
    }

    #[inline(always)]
    pub fn handle (&self) -> Handle {
        self.handle
    }

    #[inline(always)]
    pub fn kind (&self) -> ObjectKind {
        self.kind
    }

    #[inline(always)]
    pub fn backend (&self) -> &SharedBackend {
        &self.backend
    }

    /// Gives up ownership without releasing, returning the raw parts.
    #[inline]
    pub fn into_raw (self) -> (Handle, ObjectKind, SharedBackend) {
        let this = ManuallyDrop::new(self);
        // SAFETY: `this` is never dropped, so the backend reference is moved out exactly once.
        let backend = unsafe { core::ptr::read(&this.backend) };
        (this.handle, this.kind, backend)
    }

    /// Retains the handle, returning a new owner of it.
    #[inline]
    pub fn try_clone (&self) -> Result<Self> {
        Self::retained(self.handle, self.kind, self.backend.clone())
    }

    /// Increments the native reference count without creating a new owner.
    ///
    /// # Safety
    /// Every extra reference must eventually be released, for example through [`RawObject::from_raw`].
    #[inline(always)]
    pub unsafe fn retain (&self) -> Result<()> {
        tri!(Operation::Retain, self.backend.retain(self.kind, self.handle));
        Ok(())
    }

    /// Releases this reference, reporting the result.
    #[inline]
    pub fn release (self) -> Result<()> {
        let (handle, kind, backend) = self.into_raw();
        tri!(Operation::Release, backend.release(kind, handle));
        Ok(())
    }

    #[inline]
    pub fn info (&self, param: InfoParam) -> Result<InfoValue> {
        Ok(tri!(Operation::GetInfo, self.backend.get_info(self.kind, self.handle, param)))
    }

    /// Queries `param` and converts it into `T`.
    pub fn info_as<T: FromInfo> (&self, param: InfoParam) -> Result<T> {
        let value = self.info(param)?;
        T::from_info(value).ok_or_else(|| Error::new(
            ErrorCode::InvalidValue,
            Operation::GetInfo,
            format!("unexpected value kind for {param:?}")
        ))
    }

    /// Reference count of the object. The value is immediately stale, and only meant for debugging.
    #[inline(always)]
    pub fn reference_count (&self) -> Result<u32> {
        self.info_as(InfoParam::ReferenceCount)
    }

    /// Fails with `code` interpreted for `op` if `other` belongs to a different backend.
    #[inline]
    pub(crate) fn check_backend (&self, other: &SharedBackend, code: ErrorCode, op: Operation) -> Result<()> {
        if same_backend(&self.backend, other) {
            return Ok(())
        }

        Err(Error::new(code, op, "objects belong to different backends"))
    }
}

impl Clone for RawObject {
    #[inline]
    fn clone(&self) -> Self {
        match self.try_clone() {
            Ok(this) => this,
            Err(e) => panic!("{e}")
        }
    }
}

impl Drop for RawObject {
    #[inline]
    fn drop(&mut self) {
        if let Err(code) = self.backend.release(self.kind, self.handle) {
            let e = Error::from_code(code, Operation::Release);
            tracing::warn!(kind = ?self.kind, handle = self.handle.as_usize(), "implicit release failed: {e}");
        }
    }
}

impl PartialEq for RawObject {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.handle == other.handle && same_backend(&self.backend, &other.backend)
    }
}

impl Eq for RawObject {}

impl std::hash::Hash for RawObject {
    #[inline]
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.handle.hash(state)
    }
}

impl Debug for RawObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawObject")
            .field("kind", &self.kind)
            .field("handle", &self.handle.as_usize())
            .field("backend", &self.backend.name())
            .finish()
    }
}

/// Declares a typed owner of a reference-counted handle.
macro_rules! raw_object {
    ($(#[$meta:meta])* $vis:vis struct $name:ident => $kind:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        #[repr(transparent)]
        $vis struct $name ($crate::core::RawObject);

        impl $name {
            /// Takes ownership of one reference to `handle`.
            ///
            /// # Safety
            /// The caller must own a reference to `handle`, of the right kind, issued by `backend`.
            #[inline(always)]
            pub unsafe fn from_raw (handle: $crate::core::Handle, backend: $crate::core::SharedBackend) -> Self {
                Self($crate::core::RawObject::from_raw(handle, $crate::core::ObjectKind::$kind, backend))
            }

            /// Retains `handle` and wraps the new reference.
            #[inline(always)]
            pub fn retained (handle: $crate::core::Handle, backend: $crate::core::SharedBackend) -> $crate::core::Result<Self> {
                $crate::core::RawObject::retained(handle, $crate::core::ObjectKind::$kind, backend).map(Self)
            }

            #[allow(dead_code)]
            #[inline(always)]
            pub(crate) fn from_object (inner: $crate::core::RawObject) -> Self {
                debug_assert_eq!(inner.kind(), $crate::core::ObjectKind::$kind);
                Self(inner)
            }

            /// Gives up ownership without releasing.
            #[inline(always)]
            pub fn into_raw (self) -> ($crate::core::Handle, $crate::core::SharedBackend) {
                let (handle, _, backend) = self.0.into_raw();
                (handle, backend)
            }

            #[inline(always)]
            pub fn try_clone (&self) -> $crate::core::Result<Self> {
                self.0.try_clone().map(Self)
            }

            /// Releases this reference, reporting the result.
            #[inline(always)]
            pub fn release (self) -> $crate::core::Result<()> {
                self.0.release()
            }

            #[inline(always)]
            pub fn as_object (&self) -> &$crate::core::RawObject {
                &self.0
            }
        }

        impl ::core::ops::Deref for $name {
            type Target = $crate::core::RawObject;

            #[inline(always)]
            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl AsRef<$crate::core::RawObject> for $name {
            #[inline(always)]
            fn as_ref(&self) -> &$crate::core::RawObject {
                &self.0
            }
        }

        impl AsRef<$name> for $name {
            #[inline(always)]
            fn as_ref(&self) -> &$name {
                self
            }
        }
    };
}

pub(crate) use raw_object;
