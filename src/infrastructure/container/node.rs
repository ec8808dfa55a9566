//! 容器树节点
//!
//! 父 → 子是唯一的拥有关系（`Arc`）；子 → 父、节点 → 根都是 `Weak`，
//! 只用于名字解析。根存储由整棵树共享。

use std::any::Any;
use std::fmt;
use std::sync::{Arc, Weak};

use regex::{Regex, RegexSet};

use super::factory::Value;
use super::slot::SlotDescriptor;
use super::spec::ContainerSpec;
use super::store::{AliasNames, ContainerStats, RootStore};
use crate::errors::{ContainerError, Result};

pub(crate) struct Node {
    spec: Arc<ContainerSpec>,
    qualified_name: String,
    parent: Weak<Node>,
    root: Weak<Node>,
    store: Arc<RootStore>,
    children: Vec<(String, Container)>,
    // 副本的根持有源树：共享的别名注册表只弱引用源树节点
    source: Option<Container>,
}

/// 容器节点句柄，克隆开销为一次引用计数
#[derive(Clone)]
pub struct Container {
    node: Arc<Node>,
}

fn join_name(parent: &str, local: &str) -> String {
    if parent.is_empty() {
        local.to_string()
    } else {
        format!("{parent}.{local}")
    }
}

fn build_node(
    spec: &Arc<ContainerSpec>,
    qualified_name: String,
    parent: Weak<Node>,
    root: Option<Weak<Node>>,
    store: &Arc<RootStore>,
    source: Option<Container>,
) -> Arc<Node> {
    Arc::new_cyclic(|me| {
        let root = root.unwrap_or_else(|| me.clone());
        let children = spec
            .children()
            .map(|(local, child_spec)| {
                let node = build_node(
                    child_spec,
                    join_name(&qualified_name, local),
                    me.clone(),
                    Some(root.clone()),
                    store,
                    None,
                );
                (local.to_string(), Container { node })
            })
            .collect();
        Node {
            spec: Arc::clone(spec),
            qualified_name,
            parent,
            root,
            store: Arc::clone(store),
            children,
            source,
        }
    })
}

fn downcast<T: Any + Send + Sync>(name: &str, value: Value) -> Result<Arc<T>> {
    value
        .downcast::<T>()
        .map_err(|_| ContainerError::TypeCastFailed {
            name: name.to_string(),
            expected: std::any::type_name::<T>(),
        })
}

impl Container {
    /// 实例化一棵新树：递归建子节点，再为每个槽位绑定别名
    pub fn new(spec: &Arc<ContainerSpec>) -> Container {
        let store = Arc::new(RootStore::new());
        let root = Container::from_node(build_node(spec, String::new(), Weak::new(), None, &store, None));
        root.bind_aliases();
        tracing::debug!(spec = spec.name(), "container tree built");
        root
    }

    pub(crate) fn from_node(node: Arc<Node>) -> Self {
        Self { node }
    }

    pub(crate) fn downgrade(&self) -> Weak<Node> {
        Arc::downgrade(&self.node)
    }

    pub(crate) fn store(&self) -> &RootStore {
        &self.node.store
    }

    // 子节点先绑定，父节点后绑定；同名别名以后绑定者为准
    fn bind_aliases(&self) {
        for (_, child) in &self.node.children {
            child.bind_aliases();
        }
        for slot in self.node.spec.slots() {
            slot.bind_alias(self);
        }
    }

    // ---- tree ----

    pub fn spec(&self) -> &Arc<ContainerSpec> {
        &self.node.spec
    }

    /// 点分限定名；根为空串
    pub fn qualified_name(&self) -> &str {
        &self.node.qualified_name
    }

    /// 槽位在本节点下的限定名
    pub fn qualify(&self, slot: &str) -> String {
        join_name(&self.node.qualified_name, slot)
    }

    pub fn is_root(&self) -> bool {
        self.node.parent.upgrade().is_none() && self.node.qualified_name.is_empty()
    }

    pub fn parent(&self) -> Option<Container> {
        self.node.parent.upgrade().map(Container::from_node)
    }

    pub fn root(&self) -> Result<Container> {
        self.node
            .root
            .upgrade()
            .map(Container::from_node)
            .ok_or_else(|| ContainerError::Detached(self.display_name().to_string()))
    }

    pub fn child(&self, name: &str) -> Option<Container> {
        self.node
            .children
            .iter()
            .find(|(local, _)| local == name)
            .map(|(_, child)| child.clone())
    }

    pub fn children(&self) -> impl Iterator<Item = (&str, &Container)> {
        self.node
            .children
            .iter()
            .map(|(local, child)| (local.as_str(), child))
    }

    /// 沿点分路径向下找到子孙节点；空路径即自身
    pub fn node(&self, path: &str) -> Result<Container> {
        if path.is_empty() {
            return Ok(self.clone());
        }
        let mut current = self.clone();
        for segment in path.split('.') {
            current = current
                .child(segment)
                .ok_or_else(|| ContainerError::UnknownPath(self.qualify(path)))?;
        }
        Ok(current)
    }

    pub fn slot_names(&self) -> impl Iterator<Item = &str> {
        self.node.spec.slots().iter().map(|s| s.name())
    }

    fn display_name(&self) -> &str {
        if self.node.qualified_name.is_empty() {
            self.node.spec.name()
        } else {
            &self.node.qualified_name
        }
    }

    /// `path` 形如 `"slot"` 或 `"child.grandchild.slot"`
    fn locate(&self, path: &str) -> Result<(Container, Arc<SlotDescriptor>)> {
        let (owner, slot) = match path.rsplit_once('.') {
            Some((prefix, slot)) => (self.node(prefix)?, slot),
            None => (self.clone(), path),
        };
        let descriptor = owner.node.spec.slot(slot).cloned().ok_or_else(|| {
            ContainerError::UnknownSlot {
                container: owner.display_name().to_string(),
                slot: slot.to_string(),
            }
        })?;
        Ok((owner, descriptor))
    }

    /// 由限定名找到槽位的所属节点（走过除最后一段外的所有段）
    pub(crate) fn owner_of(&self, qualified_name: &str) -> Result<Container> {
        match qualified_name.rsplit_once('.') {
            Some((prefix, _)) => self.node(prefix),
            None => Ok(self.clone()),
        }
    }

    // ---- slots ----

    pub fn resolve(&self, path: &str) -> Result<Value> {
        let (owner, slot) = self.locate(path)?;
        slot.resolve(&owner)
    }

    pub async fn resolve_async(&self, path: &str) -> Result<Value> {
        let (owner, slot) = self.locate(path)?;
        slot.resolve_async(&owner).await
    }

    pub fn resolve_as<T: Any + Send + Sync>(&self, path: &str) -> Result<Arc<T>> {
        downcast(path, self.resolve(path)?)
    }

    pub async fn resolve_as_async<T: Any + Send + Sync>(&self, path: &str) -> Result<Arc<T>> {
        downcast(path, self.resolve_async(path).await?)
    }

    /// 显式写入，绕过工厂
    pub fn assign<T: Any + Send + Sync>(&self, path: &str, value: T) -> Result<()> {
        self.assign_value(path, Arc::new(value))
    }

    pub fn assign_value(&self, path: &str, value: Value) -> Result<()> {
        let (owner, slot) = self.locate(path)?;
        slot.assign(&owner, value)
    }

    /// 槽位值不可删除
    pub fn delete(&self, path: &str) -> Result<()> {
        let (owner, slot) = self.locate(path)?;
        slot.delete(&owner)
    }

    pub fn is_set(&self, path: &str) -> Result<bool> {
        let (owner, slot) = self.locate(path)?;
        Ok(slot.is_set(&owner))
    }

    // ---- flat namespace ----

    pub fn lookup(&self, alias: &str) -> Result<Value> {
        self.store().alias(alias)?.get(alias)
    }

    pub async fn lookup_async(&self, alias: &str) -> Result<Value> {
        let binding = self.store().alias(alias)?;
        binding.get_async(alias).await
    }

    pub fn lookup_as<T: Any + Send + Sync>(&self, alias: &str) -> Result<Arc<T>> {
        downcast(alias, self.lookup(alias)?)
    }

    pub async fn lookup_as_async<T: Any + Send + Sync>(&self, alias: &str) -> Result<Arc<T>> {
        downcast(alias, self.lookup_async(alias).await?)
    }

    pub fn alias_names(&self) -> AliasNames {
        self.store().alias_names()
    }

    // ---- root storage ----

    /// 复制出一个独立的新根
    ///
    /// 新根的值缓存与清理日志只保留限定名完整匹配任一正则的条目；
    /// 别名注册表与源树共享同一个对象，不重新绑定。副本存活期间源树也不会被释放。
    pub fn copy<I, S>(&self, patterns: I) -> Result<Container>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let root = self.root()?;
        let mut anchored = Vec::new();
        for pattern in patterns {
            let pattern = pattern.as_ref();
            let full = format!("^(?:{pattern})$");
            Regex::new(&full).map_err(|source| ContainerError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            })?;
            anchored.push(full);
        }
        let set = RegexSet::new(&anchored).map_err(|source| ContainerError::InvalidPattern {
            pattern: anchored.join("|"),
            source,
        })?;

        let store = Arc::new(root.store().filtered(&set));
        let copy = Container::from_node(build_node(
            root.spec(),
            String::new(),
            Weak::new(),
            None,
            &store,
            Some(root.clone()),
        ));
        tracing::debug!(
            patterns = anchored.len(),
            cached = store.cached_names().len(),
            pending_close = store.pending_close(),
            "container copied"
        );
        Ok(copy)
    }

    /// 当前缓存中的限定名（排序后）
    pub fn cached_names(&self) -> Vec<String> {
        self.store().cached_names()
    }

    pub fn pending_close_handlers(&self) -> usize {
        self.store().pending_close()
    }

    pub fn stats(&self) -> ContainerStats {
        self.store().stats()
    }

    pub fn shares_aliases_with(&self, other: &Container) -> bool {
        self.store().shares_aliases_with(other.store())
    }

    /// 副本的源树根；非副本为 `None`
    pub fn copied_from(&self) -> Option<Container> {
        self.root().ok()?.node.source.clone()
    }

    pub fn same_node(&self, other: &Container) -> bool {
        Arc::ptr_eq(&self.node, &other.node)
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("spec", &self.node.spec.name())
            .field("qualified_name", &self.node.qualified_name)
            .field("children", &self.node.children.len())
            .finish()
    }
}
