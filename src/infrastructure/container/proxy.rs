//! 单次访问的槽位代理

use std::sync::Arc;

use super::factory::{CloseHandler, Factory, Value};
use super::node::Container;
use super::store::{CloseEntry, RootStore};

/// 把一个槽位描述绑定到某个实例的限定名与根存储上，用完即弃
pub(crate) struct SlotProxy<'a> {
    pub(crate) factory: &'a Factory,
    store: &'a RootStore,
    name: String,
}

impl<'a> SlotProxy<'a> {
    pub(crate) fn new(instance: &'a Container, slot_name: &str, factory: &'a Factory) -> Self {
        Self {
            factory,
            store: instance.store(),
            name: instance.qualify(slot_name),
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn store(&self) -> &'a RootStore {
        self.store
    }

    pub(crate) fn get(&self) -> Option<Value> {
        self.store.get(&self.name)
    }

    pub(crate) fn has(&self) -> bool {
        self.store.has(&self.name)
    }

    pub(crate) fn save(&self, value: Value) {
        self.store.save(&self.name, value);
    }

    pub(crate) fn add_close_handler(&self, handler: &CloseHandler, resource: &Value) {
        self.store.push_close(CloseEntry {
            name: self.name.clone(),
            handler: handler.clone(),
            resource: Arc::clone(resource),
        });
    }
}
