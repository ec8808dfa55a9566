//! 分层、惰性求值的值容器
//!
//! - 槽位：具名的惰性值（工厂 + 缓存/只读/别名/清理回调）
//! - 节点：命名空间树上的一个节点，根持有共享存储
//! - 清理：按登记逆序（LIFO）同步或异步排空

pub mod factory;
pub mod lifecycle;
pub mod node;
mod proxy;
pub mod slot;
pub mod spec;
pub mod store;

pub use factory::{CloseHandler, Factory, Value};
pub use lifecycle::{CloseMode, ScopedContainer};
pub use node::Container;
pub use slot::{Slot, SlotDescriptor};
pub use spec::{ContainerSpec, ContainerSpecBuilder};
pub use store::{AliasNames, ContainerStats};
