pub mod config;
pub mod errors;
pub mod infrastructure;
pub mod logging;

// Re-export commonly used items for convenience
pub use config::HolderConfig;
pub use errors::{BoxError, ContainerError, Result};
pub use infrastructure::container::{
    AliasNames, CloseHandler, CloseMode, Container, ContainerSpec, ContainerSpecBuilder,
    ContainerStats, Factory, ScopedContainer, Slot, SlotDescriptor, Value,
};
