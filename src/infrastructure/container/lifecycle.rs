//! 资源清理：按登记的逆序（LIFO）排空清理日志，以及作用域使用
//!
//! 排空是消费式的：已执行（或执行失败）的记录从日志中移除，不会重放。

use std::future::Future;
use std::ops::Deref;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::future::FutureExt;
use serde::{Deserialize, Serialize};

use super::factory::CloseHandler;
use super::node::Container;
use super::spec::ContainerSpec;
use super::store::CloseEntry;
use crate::errors::{ContainerError, Result};
use crate::logging::OperationTimer;

/// 清理回调出错时的处理方式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseMode {
    /// 第一个错误即中止，剩余（更早登记的）回调不执行，仍留在日志中
    #[default]
    FailFast,
    /// 执行全部回调，汇总错误为 `CloseFailed`
    Exhaustive,
}

fn conclude(mut failures: Vec<ContainerError>) -> Result<()> {
    match failures.len() {
        0 => Ok(()),
        1 => Err(failures.remove(0)),
        _ => Err(ContainerError::CloseFailed(failures)),
    }
}

impl Container {
    pub fn close(&self) -> Result<()> {
        self.close_with(CloseMode::FailFast)
    }

    pub async fn close_async(&self) -> Result<()> {
        self.close_async_with(CloseMode::FailFast).await
    }

    /// 同步排空；遇到异步回调时记为 `AsyncHandler` 并把该记录放回日志
    ///
    /// `FailFast` 在第一条异步回调处停下；`Exhaustive` 跳过它继续排空，
    /// 最后按原登记顺序放回所有被跳过的记录，留给 `close_async`。
    pub fn close_with(&self, mode: CloseMode) -> Result<()> {
        let root = self.root()?;
        let timer = OperationTimer::new("container.close").with_metadata("spec", root.spec().name());
        let mut failures = Vec::new();
        let mut skipped = Vec::new();

        while let Some(entry) = root.store().pop_close() {
            let handler = match &entry.handler {
                CloseHandler::Sync(handler) => Some(Arc::clone(handler)),
                CloseHandler::Async(_) => None,
            };
            let Some(handler) = handler else {
                failures.push(ContainerError::AsyncHandler(entry.name.clone()));
                skipped.push(entry);
                match mode {
                    CloseMode::FailFast => break,
                    CloseMode::Exhaustive => continue,
                }
            };
            let outcome = root.handler_owner(&entry).and_then(|owner| {
                handler(&owner, &root, &entry.resource).map_err(ContainerError::Callback)
            });
            match outcome {
                Ok(()) => root.store().record_handler_run(),
                Err(err) => match mode {
                    CloseMode::FailFast => return Err(err),
                    CloseMode::Exhaustive => failures.push(err),
                },
            }
        }

        root.restore_close(skipped);
        timer.finish();
        conclude(failures)
    }

    pub async fn close_async_with(&self, mode: CloseMode) -> Result<()> {
        let root = self.root()?;
        let timer = OperationTimer::new("container.close_async").with_metadata("spec", root.spec().name());
        let mut failures = Vec::new();

        while let Some(entry) = root.store().pop_close() {
            let outcome = match root.handler_owner(&entry) {
                Ok(owner) => {
                    let ran = match &entry.handler {
                        CloseHandler::Sync(handler) => handler(&owner, &root, &entry.resource),
                        CloseHandler::Async(handler) => {
                            handler(owner, root.clone(), Arc::clone(&entry.resource)).await
                        }
                    };
                    ran.map_err(ContainerError::Callback)
                }
                Err(err) => Err(err),
            };
            match outcome {
                Ok(()) => root.store().record_handler_run(),
                Err(err) => match mode {
                    CloseMode::FailFast => return Err(err),
                    CloseMode::Exhaustive => failures.push(err),
                },
            }
        }

        timer.finish();
        conclude(failures)
    }

    // 弹出顺序与登记相反，逆序放回以恢复原顺序
    fn restore_close(&self, skipped: Vec<CloseEntry>) {
        for entry in skipped.into_iter().rev() {
            self.store().push_close(entry);
        }
    }

    fn handler_owner(&self, entry: &CloseEntry) -> Result<Container> {
        let owner = self.owner_of(&entry.name)?;
        tracing::debug!(slot = entry.name.as_str(), async_handler = entry.handler.is_async(), "running close handler");
        Ok(owner)
    }

    /// 建树 → 使用 → 保证清理（正常返回、返回错误、panic 三种退出都会清理）
    ///
    /// 主体出错时以主体的错误为准，清理错误只记日志。
    pub fn scoped<R, E, F>(spec: &Arc<ContainerSpec>, body: F) -> std::result::Result<R, E>
    where
        F: FnOnce(&Container) -> std::result::Result<R, E>,
        E: From<ContainerError>,
    {
        let guard = ScopedContainer::new(spec);
        let root: &Container = &guard;
        match body(root) {
            Ok(value) => {
                guard.close()?;
                Ok(value)
            }
            Err(err) => {
                if let Err(close_err) = guard.close() {
                    tracing::warn!(error = %close_err, "close after failed scope body also failed");
                }
                Err(err)
            }
        }
    }

    pub async fn scoped_async<R, E, F, Fut>(spec: &Arc<ContainerSpec>, body: F) -> std::result::Result<R, E>
    where
        F: FnOnce(Container) -> Fut,
        Fut: Future<Output = std::result::Result<R, E>>,
        E: From<ContainerError>,
    {
        let container = Container::new(spec);
        let outcome = AssertUnwindSafe(body(container.clone())).catch_unwind().await;
        let closed = container.close_async().await;

        match outcome {
            Ok(Ok(value)) => {
                closed?;
                Ok(value)
            }
            Ok(Err(err)) => {
                if let Err(close_err) = closed {
                    tracing::warn!(error = %close_err, "close after failed scope body also failed");
                }
                Err(err)
            }
            Err(panic) => {
                if let Err(close_err) = closed {
                    tracing::warn!(error = %close_err, "close after panicking scope body also failed");
                }
                std::panic::resume_unwind(panic)
            }
        }
    }
}

/// 离开作用域时自动同步清理的根容器
///
/// 显式 [`close`](ScopedContainer::close) 可以拿到清理结果；
/// 仅靠 `Drop` 时错误只能记日志。
///
/// 清理是同步的：登记了异步清理回调的树在这里只会得到一条 warn 日志，
/// 异步资源留在日志里不会被关闭。需要异步清理时改用
/// [`Container::scoped_async`]，或在丢弃前自行 `close_async`。
pub struct ScopedContainer {
    container: Container,
    mode: CloseMode,
    closed: bool,
}

impl ScopedContainer {
    pub fn new(spec: &Arc<ContainerSpec>) -> Self {
        Self::with_mode(spec, CloseMode::FailFast)
    }

    pub fn with_mode(spec: &Arc<ContainerSpec>, mode: CloseMode) -> Self {
        Self {
            container: Container::new(spec),
            mode,
            closed: false,
        }
    }

    pub fn close(mut self) -> Result<()> {
        self.closed = true;
        self.container.close_with(self.mode)
    }
}

impl Deref for ScopedContainer {
    type Target = Container;

    fn deref(&self) -> &Container {
        &self.container
    }
}

impl Drop for ScopedContainer {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if let Err(err) = self.container.close_with(self.mode) {
            tracing::warn!(error = %err, "close on drop failed");
        }
    }
}
