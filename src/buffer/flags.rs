pub const MEM_READ_WRITE: u64 = 1 << 0;
pub const MEM_WRITE_ONLY: u64 = 1 << 1;
pub const MEM_READ_ONLY: u64 = 1 << 2;
pub const MEM_USE_HOST_PTR: u64 = 1 << 3;
pub const MEM_ALLOC_HOST_PTR: u64 = 1 << 4;
pub const MEM_COPY_HOST_PTR: u64 = 1 << 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MemFlags {
    pub access: MemAccess,
    pub host: HostPtr
}

impl MemFlags {
    #[inline(always)]
    pub const fn new (access: MemAccess, host: HostPtr) -> Self {
        Self { access, host }
    }

    /// Flags of a buffer initialized with a copy of host data
    #[inline(always)]
    pub const fn copy (access: MemAccess) -> Self {
        Self::new(access, HostPtr::COPY)
    }

    #[inline(always)]
    pub const fn from_bits (bits: u64) -> Self {
        let access = MemAccess::from_bits(bits);
        let host = HostPtr::from_bits(bits);
        Self::new(access, host)
    }

    #[inline(always)]
    pub const fn to_bits (self) -> u64 {
        self.access.to_bits() | self.host.to_bits()
    }
}

impl From<MemAccess> for MemFlags {
    #[inline(always)]
    fn from(access: MemAccess) -> Self {
        Self::new(access, HostPtr::default())
    }
}

impl From<u64> for MemFlags {
    #[inline(always)]
    fn from (bits: u64) -> Self {
        Self::from_bits(bits)
    }
}

impl From<MemFlags> for u64 {
    #[inline(always)]
    fn from (flags: MemFlags) -> Self {
        flags.to_bits()
    }
}

/// Kernel-side access to a memory object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemAccess {
    pub read: bool,
    pub write: bool
}

impl MemAccess {
    /// This flag specifies that the memory object will be read and written by a kernel. This is the default.
    pub const READ_WRITE : Self = Self::new(true, true);
    /// This flag specifies that the memory object is a read-only memory object when used inside a kernel.
    pub const READ_ONLY : Self = Self::new(true, false);
    /// This flags specifies that the memory object will be written but not read by a kernel.
    pub const WRITE_ONLY : Self = Self::new(false, true);

    #[inline(always)]
    pub const fn new (read: bool, write: bool) -> Self {
        Self {
            read,
            write
        }
    }

    /// Returns `true` if every access allowed by `self` is also allowed by `parent`.
    #[inline(always)]
    pub const fn is_subset_of (self, parent: Self) -> bool {
        (!self.read || parent.read) && (!self.write || parent.write)
    }

    /// Access flags with no access bit set default to [`MemAccess::READ_WRITE`]
    #[inline]
    pub const fn from_bits (flags: u64) -> Self {
        const READ_MASK : u64 = MEM_READ_WRITE | MEM_READ_ONLY;
        const WRITE_MASK : u64 = MEM_READ_WRITE | MEM_WRITE_ONLY;

        if flags & (READ_MASK | WRITE_MASK) == 0 {
            return Self::READ_WRITE
        }

        let read = (flags & READ_MASK) != 0;
        let write = (flags & WRITE_MASK) != 0;

        Self::new(read, write)
    }

    #[inline(always)]
    pub const fn to_bits (self) -> u64 {
        match (self.read, self.write) {
            (true, true) => MEM_READ_WRITE,
            (true, false) => MEM_READ_ONLY,
            (false, true) => MEM_WRITE_ONLY,
            (false, false) => 0
        }
    }
}

impl Default for MemAccess {
    #[inline(always)]
    fn default() -> Self {
        Self::READ_WRITE
    }
}

/// How a memory object relates to host memory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostPtr {
    Use,
    Other (bool, bool)
}

impl HostPtr {
    /// The memory object uses the host memory it was created with as its storage.
    pub const USE : Self = Self::Use;
    /// The memory object is allocated from host accessible memory.
    pub const ALLOC : Self = Self::new(true, false);
    /// The memory object is initialized with a copy of the host memory it was created with.
    pub const COPY : Self = Self::new(false, true);
    /// ```ALLOC``` and ```COPY``` combined
    pub const ALLOC_COPY : Self = Self::new(true, true);

    #[inline(always)]
    pub const fn new (alloc: bool, copy: bool) -> Self {
        Self::Other(alloc, copy)
    }

    #[inline(always)]
    pub const fn is_use (&self) -> bool {
        matches!(self, Self::Use)
    }

    #[inline(always)]
    pub const fn is_alloc (&self) -> bool {
        matches!(self, Self::Other(true, _))
    }

    #[inline(always)]
    pub const fn is_copy (&self) -> bool {
        matches!(self, Self::Other(_, true))
    }

    #[inline(always)]
    pub const fn from_bits (flags: u64) -> Self {
        if flags & MEM_USE_HOST_PTR != 0 { return Self::USE; }

        let alloc = flags & MEM_ALLOC_HOST_PTR != 0;
        let copy = flags & MEM_COPY_HOST_PTR != 0;

        Self::new(alloc, copy)
    }

    #[inline(always)]
    pub const fn to_bits (self) -> u64 {
        match self {
            Self::Use => MEM_USE_HOST_PTR,
            Self::Other (alloc, copy) => {
                let mut bits = 0;
                if alloc { bits |= MEM_ALLOC_HOST_PTR }
                if copy { bits |= MEM_COPY_HOST_PTR }
                bits
            }
        }
    }
}

impl Default for HostPtr {
    #[inline(always)]
    fn default() -> Self {
        Self::Other(false, false)
    }
}
