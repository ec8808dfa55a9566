//! 槽位声明与解析
//!
//! 一个槽位 = 工厂 + 缓存/只读标志 + 可选别名 + 可选清理回调。
//! 描述本身不可变，挂在 [`ContainerSpec`](super::spec::ContainerSpec) 上，
//! 由同一规格的所有实例共享。

use std::sync::Arc;

use super::factory::{CloseHandler, Factory, Value};
use super::node::Container;
use super::proxy::SlotProxy;
use super::store::AliasBinding;
use crate::errors::{ContainerError, Result};

/// 槽位声明构建器
///
/// ```
/// use holder::{CloseHandler, Factory, Slot};
///
/// let slot = Slot::new("pool", Factory::value(8_usize))
///     .alias("pool_size")
///     .on_close(CloseHandler::sync(|_, _, _| Ok(())));
/// assert_eq!(slot.name(), "pool");
/// ```
#[derive(Debug, Clone)]
pub struct Slot {
    descriptor: SlotDescriptor,
}

impl Slot {
    /// 默认：缓存、可写一次、无别名
    pub fn new(name: impl Into<String>, factory: Factory) -> Self {
        Self {
            descriptor: SlotDescriptor {
                name: name.into(),
                factory,
                cache: true,
                readonly: false,
                alias: None,
                close_handler: None,
            },
        }
    }

    /// 每次解析都重新调用工厂
    pub fn no_cache(mut self) -> Self {
        self.descriptor.cache = false;
        self
    }

    pub fn readonly(mut self) -> Self {
        self.descriptor.readonly = true;
        self
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.descriptor.alias = Some(alias.into());
        self
    }

    pub fn on_close(mut self, handler: CloseHandler) -> Self {
        self.descriptor.close_handler = Some(handler);
        self
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub(crate) fn into_descriptor(self) -> Arc<SlotDescriptor> {
        Arc::new(self.descriptor)
    }
}

#[derive(Debug, Clone)]
pub struct SlotDescriptor {
    name: String,
    factory: Factory,
    cache: bool,
    readonly: bool,
    alias: Option<String>,
    close_handler: Option<CloseHandler>,
}

impl SlotDescriptor {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn factory(&self) -> &Factory {
        &self.factory
    }

    pub fn is_cached(&self) -> bool {
        self.cache
    }

    pub fn is_readonly(&self) -> bool {
        self.readonly
    }

    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    pub fn close_handler(&self) -> Option<&CloseHandler> {
        self.close_handler.as_ref()
    }

    fn bind<'a>(&'a self, instance: &'a Container) -> SlotProxy<'a> {
        SlotProxy::new(instance, &self.name, &self.factory)
    }

    fn cached(&self, proxy: &SlotProxy<'_>) -> Option<Value> {
        let hit = proxy.get();
        proxy.store().record_resolution(hit.is_some());
        if hit.is_some() {
            tracing::trace!(slot = proxy.name(), "cache hit");
        }
        hit
    }

    /// 同步解析；未缓存的异步槽位返回 `AsyncFactory`
    pub(crate) fn resolve(&self, instance: &Container) -> Result<Value> {
        let proxy = self.bind(instance);
        if let Some(value) = self.cached(&proxy) {
            return Ok(value);
        }

        let value = match proxy.factory {
            Factory::Sync(factory) => {
                let root = instance.root()?;
                tracing::debug!(slot = proxy.name(), "invoking factory");
                proxy.store().record_factory_call();
                factory(instance, &root).map_err(ContainerError::Callback)?
            }
            Factory::Async(_) => {
                return Err(ContainerError::AsyncFactory(proxy.name().to_string()));
            }
        };
        Ok(self.finish(&proxy, value))
    }

    /// 异步解析，两种工厂都接受；只在用户工厂内部挂起
    pub(crate) async fn resolve_async(&self, instance: &Container) -> Result<Value> {
        let proxy = self.bind(instance);
        if let Some(value) = self.cached(&proxy) {
            return Ok(value);
        }

        let root = instance.root()?;
        tracing::debug!(slot = proxy.name(), async_factory = proxy.factory.is_async(), "invoking factory");
        proxy.store().record_factory_call();
        let value = match proxy.factory {
            Factory::Sync(factory) => factory(instance, &root),
            Factory::Async(factory) => factory(instance.clone(), root).await,
        }
        .map_err(ContainerError::Callback)?;

        // 只有工厂成功完成才会走到这里：取消或失败都不会留下缓存/清理记录
        Ok(self.finish(&proxy, value))
    }

    fn finish(&self, proxy: &SlotProxy<'_>, value: Value) -> Value {
        if let Some(handler) = &self.close_handler {
            proxy.add_close_handler(handler, &value);
        }
        if self.cache {
            proxy.save(Arc::clone(&value));
        }
        value
    }

    pub(crate) fn assign(&self, instance: &Container, value: Value) -> Result<()> {
        let proxy = self.bind(instance);
        if self.readonly {
            return Err(ContainerError::ReadOnly(proxy.name().to_string()));
        }
        proxy.store().save_once(proxy.name(), value)?;
        tracing::debug!(slot = proxy.name(), "value assigned");
        Ok(())
    }

    pub(crate) fn delete(&self, instance: &Container) -> Result<()> {
        Err(ContainerError::Immutable(instance.qualify(&self.name)))
    }

    pub(crate) fn is_set(&self, instance: &Container) -> bool {
        self.bind(instance).has()
    }

    pub(crate) fn bind_alias(self: &Arc<Self>, instance: &Container) {
        if let Some(alias) = &self.alias {
            tracing::trace!(alias = alias.as_str(), slot = %instance.qualify(&self.name), "binding alias");
            instance
                .store()
                .bind_alias(alias, AliasBinding::new(instance, Arc::clone(self)));
        }
    }
}
