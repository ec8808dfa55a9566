//! 基础设施层
//!
//! 目前只有值容器：槽位声明、命名空间树、根存储与资源清理。

pub mod container;

pub use container::{
    AliasNames, CloseHandler, CloseMode, Container, ContainerSpec, ContainerStats, Factory,
    ScopedContainer, Slot, Value,
};
