use crate::core::{Handle, RawPlatform};

/// Native value of the platform property key
pub const CONTEXT_PLATFORM: isize = 0x1084;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub struct ContextProperties {
    /// Platform the context is created on. Defaults to the backend's first platform.
    pub platform: Option<Handle>,
}

impl ContextProperties {
    #[inline(always)]
    pub fn new (platform: Option<&RawPlatform>) -> Self {
        Self { platform: platform.map(RawPlatform::handle) }
    }

    #[inline(always)]
    pub const fn const_new (platform: Option<Handle>) -> Self {
        Self { platform }
    }

    /// Zero-terminated native property list, or `None` if no property is set.
    #[inline(always)]
    pub fn to_bits (&self) -> Option<[isize; 3]> {
        self.platform.map(|platform| [CONTEXT_PLATFORM, platform.as_usize() as isize, 0])
    }

    #[inline]
    pub fn from_bits (bits: &[isize]) -> Self {
        let platform = bits.chunks_exact(2)
            .take_while(|pair| pair[0] != 0)
            .find(|pair| pair[0] == CONTEXT_PLATFORM)
            .and_then(|pair| Handle::new(pair[1] as usize));

        Self { platform }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn native_property_list() {
        assert_eq!(ContextProperties::default().to_bits(), None);

        let platform = Handle::new(0x40);
        let props = ContextProperties::const_new(platform);
        let bits = props.to_bits();
        assert_eq!(bits, Some([CONTEXT_PLATFORM, 0x40, 0]));
        assert_eq!(bits.map(|x| ContextProperties::from_bits(&x)), Some(props));
    }
}
