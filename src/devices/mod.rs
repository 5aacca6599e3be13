//! Device model: endpoint descriptors, normalized status, device handles
//! and the family registry

pub mod endpoint;
pub mod handle;
pub mod registry;
pub mod status;

pub use endpoint::{EndpointDescriptor, EndpointKind, ResponseShape, ValueBounds};
pub use handle::{DeviceHandle, PreparedCall};
pub use registry::{DeviceFamily, DeviceRegistry};
pub use status::{DeviceStatus, Temperature, ValveReading};
