//! 工厂与清理回调
//!
//! 同步/异步由声明方显式选择，不在调用时推断。

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures_util::future::{BoxFuture, FutureExt};

use super::node::Container;
use crate::errors::BoxError;

/// 类型擦除的槽位值
pub type Value = Arc<dyn Any + Send + Sync>;

type SyncFactoryFn = dyn Fn(&Container, &Container) -> Result<Value, BoxError> + Send + Sync;
type AsyncFactoryFn =
    dyn Fn(Container, Container) -> BoxFuture<'static, Result<Value, BoxError>> + Send + Sync;
type SyncCloseFn = dyn Fn(&Container, &Container, &Value) -> Result<(), BoxError> + Send + Sync;
type AsyncCloseFn =
    dyn Fn(Container, Container, Value) -> BoxFuture<'static, Result<(), BoxError>> + Send + Sync;

/// 槽位工厂，参数固定为 `(实例, 根)`
#[derive(Clone)]
pub enum Factory {
    Sync(Arc<SyncFactoryFn>),
    Async(Arc<AsyncFactoryFn>),
}

impl Factory {
    /// 同步工厂
    pub fn sync<T, F>(factory: F) -> Self
    where
        F: Fn(&Container, &Container) -> Result<T, BoxError> + Send + Sync + 'static,
        T: Any + Send + Sync,
    {
        Factory::Sync(Arc::new(move |instance, root| {
            factory(instance, root).map(|v| Arc::new(v) as Value)
        }))
    }

    /// 异步工厂，在用户自身的挂起点让出
    pub fn from_async<T, F, Fut>(factory: F) -> Self
    where
        F: Fn(Container, Container) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, BoxError>> + Send + 'static,
        T: Any + Send + Sync,
    {
        Factory::Async(Arc::new(move |instance, root| {
            factory(instance, root)
                .map(|r| r.map(|v| Arc::new(v) as Value))
                .boxed()
        }))
    }

    /// 每次都产出给定值的克隆
    pub fn value<T>(value: T) -> Self
    where
        T: Any + Clone + Send + Sync,
    {
        Factory::sync(move |_, _| Ok(value.clone()))
    }

    pub fn is_async(&self) -> bool {
        matches!(self, Factory::Async(_))
    }
}

impl fmt::Debug for Factory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Factory::Sync(_) => f.write_str("Factory::Sync"),
            Factory::Async(_) => f.write_str("Factory::Async"),
        }
    }
}

/// 资源清理回调，参数为 `(所属实例, 根, 资源)`
#[derive(Clone)]
pub enum CloseHandler {
    Sync(Arc<SyncCloseFn>),
    Async(Arc<AsyncCloseFn>),
}

impl CloseHandler {
    pub fn sync<F>(handler: F) -> Self
    where
        F: Fn(&Container, &Container, &Value) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        CloseHandler::Sync(Arc::new(handler))
    }

    pub fn from_async<F, Fut>(handler: F) -> Self
    where
        F: Fn(Container, Container, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        CloseHandler::Async(Arc::new(move |owner, root, resource| {
            handler(owner, root, resource).boxed()
        }))
    }

    pub fn is_async(&self) -> bool {
        matches!(self, CloseHandler::Async(_))
    }
}

impl fmt::Debug for CloseHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloseHandler::Sync(_) => f.write_str("CloseHandler::Sync"),
            CloseHandler::Async(_) => f.write_str("CloseHandler::Async"),
        }
    }
}
