flat_mod!(error, backend, object, global, platform, queue, kernel);

pub mod device;
pub use device::{DeviceType, RawDevice};

/// Native result, status and command-type codes, in OpenCL numbering.
pub mod codes;
