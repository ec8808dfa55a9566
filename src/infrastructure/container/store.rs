//! 根存储：值缓存、别名注册表、清理日志
//!
//! 只由根持有；非根节点经由根访问。所有临界区都很短，不跨越 await。

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Bound;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use regex::RegexSet;

use super::factory::{CloseHandler, Value};
use super::node::{Container, Node};
use super::slot::SlotDescriptor;
use crate::errors::{ContainerError, Result};

/// 清理日志中的一条记录
#[derive(Clone)]
pub(crate) struct CloseEntry {
    pub(crate) name: String,
    pub(crate) handler: CloseHandler,
    pub(crate) resource: Value,
}

/// 别名对应的惰性取值器：每次调用都重新走一遍槽位解析
#[derive(Clone)]
pub(crate) struct AliasBinding {
    node: Weak<Node>,
    slot: Arc<SlotDescriptor>,
}

impl AliasBinding {
    pub(crate) fn new(container: &Container, slot: Arc<SlotDescriptor>) -> Self {
        Self {
            node: container.downgrade(),
            slot,
        }
    }

    fn instance(&self, alias: &str) -> Result<Container> {
        self.node
            .upgrade()
            .map(Container::from_node)
            .ok_or_else(|| ContainerError::Detached(alias.to_string()))
    }

    pub(crate) fn get(&self, alias: &str) -> Result<Value> {
        let instance = self.instance(alias)?;
        self.slot.resolve(&instance)
    }

    pub(crate) async fn get_async(&self, alias: &str) -> Result<Value> {
        let instance = self.instance(alias)?;
        self.slot.resolve_async(&instance).await
    }
}

pub(crate) type AliasRegistry = Arc<RwLock<BTreeMap<String, AliasBinding>>>;

/// 内部统计（原子计数器）
#[derive(Default)]
struct InnerStats {
    resolutions: AtomicUsize,
    cache_hits: AtomicUsize,
    factory_calls: AtomicUsize,
    handlers_run: AtomicUsize,
}

/// 容器统计信息
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContainerStats {
    pub resolutions: usize,
    pub cache_hits: usize,
    pub factory_calls: usize,
    /// 成功完成的清理回调数；失败的不计入
    pub handlers_run: usize,
}

impl ContainerStats {
    /// 缓存命中率（小数形式）
    pub fn hit_rate(&self) -> f64 {
        if self.resolutions == 0 {
            0.0
        } else {
            self.cache_hits as f64 / self.resolutions as f64
        }
    }
}

pub(crate) struct RootStore {
    values: DashMap<String, Value>,
    aliases: AliasRegistry,
    close_log: Mutex<Vec<CloseEntry>>,
    stats: InnerStats,
}

impl RootStore {
    pub(crate) fn new() -> Self {
        Self::with_aliases(Arc::new(RwLock::new(BTreeMap::new())))
    }

    fn with_aliases(aliases: AliasRegistry) -> Self {
        Self {
            values: DashMap::new(),
            aliases,
            close_log: Mutex::new(Vec::new()),
            stats: InnerStats::default(),
        }
    }

    // ---- value cache ----

    pub(crate) fn get(&self, name: &str) -> Option<Value> {
        self.values.get(name).map(|v| Arc::clone(v.value()))
    }

    pub(crate) fn has(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// 覆盖写入；并发首次解析时以最后一次写入为准
    pub(crate) fn save(&self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    /// 原子的“未设置才写入”
    pub(crate) fn save_once(&self, name: &str, value: Value) -> Result<()> {
        match self.values.entry(name.to_string()) {
            Entry::Occupied(_) => Err(ContainerError::AlreadySet(name.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(value);
                Ok(())
            }
        }
    }

    pub(crate) fn cached_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.values.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    // ---- close log ----

    pub(crate) fn push_close(&self, entry: CloseEntry) {
        self.close_log.lock().push(entry);
    }

    pub(crate) fn pop_close(&self) -> Option<CloseEntry> {
        self.close_log.lock().pop()
    }

    pub(crate) fn pending_close(&self) -> usize {
        self.close_log.lock().len()
    }

    // ---- aliases ----

    pub(crate) fn bind_alias(&self, alias: &str, binding: AliasBinding) {
        if self
            .aliases
            .write()
            .insert(alias.to_string(), binding)
            .is_some()
        {
            tracing::debug!(alias, "alias rebound to a later slot");
        }
    }

    pub(crate) fn alias(&self, alias: &str) -> Result<AliasBinding> {
        self.aliases
            .read()
            .get(alias)
            .cloned()
            .ok_or_else(|| ContainerError::UnknownAlias(alias.to_string()))
    }

    pub(crate) fn alias_names(&self) -> AliasNames {
        AliasNames {
            registry: Arc::clone(&self.aliases),
            cursor: None,
        }
    }

    pub(crate) fn shares_aliases_with(&self, other: &RootStore) -> bool {
        Arc::ptr_eq(&self.aliases, &other.aliases)
    }

    /// 按限定名过滤复制缓存与清理日志；别名注册表按引用共享
    pub(crate) fn filtered(&self, patterns: &RegexSet) -> RootStore {
        let copy = RootStore::with_aliases(Arc::clone(&self.aliases));
        for entry in self.values.iter() {
            if patterns.is_match(entry.key()) {
                copy.values
                    .insert(entry.key().clone(), Arc::clone(entry.value()));
            }
        }
        let kept: Vec<CloseEntry> = self
            .close_log
            .lock()
            .iter()
            .filter(|e| patterns.is_match(&e.name))
            .cloned()
            .collect();
        *copy.close_log.lock() = kept;
        copy
    }

    // ---- stats ----

    pub(crate) fn record_resolution(&self, hit: bool) {
        self.stats.resolutions.fetch_add(1, Ordering::Relaxed);
        if hit {
            self.stats.cache_hits.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_factory_call(&self) {
        self.stats.factory_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_handler_run(&self) {
        self.stats.handlers_run.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn stats(&self) -> ContainerStats {
        ContainerStats {
            resolutions: self.stats.resolutions.load(Ordering::Relaxed),
            cache_hits: self.stats.cache_hits.load(Ordering::Relaxed),
            factory_calls: self.stats.factory_calls.load(Ordering::Relaxed),
            handlers_run: self.stats.handlers_run.load(Ordering::Relaxed),
        }
    }
}

/// 当前已注册别名的惰性迭代器
///
/// 每一步都重新读取注册表，取严格大于上一个名字的下一个键，
/// 因此有限且有序；克隆一份即可从头重来。
#[derive(Clone)]
pub struct AliasNames {
    registry: AliasRegistry,
    cursor: Option<String>,
}

impl Iterator for AliasNames {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let registry = self.registry.read();
        let next = match &self.cursor {
            None => registry.keys().next().cloned(),
            Some(last) => registry
                .range::<str, _>((Bound::Excluded(last.as_str()), Bound::Unbounded))
                .next()
                .map(|(name, _)| name.clone()),
        };
        drop(registry);
        if next.is_some() {
            self.cursor = next.clone();
        }
        next
    }
}

impl fmt::Debug for AliasNames {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AliasNames")
            .field("cursor", &self.cursor)
            .finish()
    }
}
