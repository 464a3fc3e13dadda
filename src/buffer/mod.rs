flat_mod!(raw, rect);

pub mod flags;
pub mod events;

pub use flags::{HostPtr, MemAccess, MemFlags};
