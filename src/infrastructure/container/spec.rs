//! 容器类型定义（显式构建器）
//!
//! 规格在定义期收集槽位与嵌套容器类型；实例化时据此建出子树并绑定别名。

use std::collections::HashSet;
use std::sync::Arc;

use super::node::Container;
use super::slot::{Slot, SlotDescriptor};
use crate::errors::{ContainerError, Result};

/// 一个容器类型：具名槽位 + 具名嵌套容器类型
#[derive(Debug)]
pub struct ContainerSpec {
    name: String,
    slots: Vec<Arc<SlotDescriptor>>,
    children: Vec<(String, Arc<ContainerSpec>)>,
}

impl ContainerSpec {
    pub fn builder(name: impl Into<String>) -> ContainerSpecBuilder {
        ContainerSpecBuilder {
            name: name.into(),
            slots: Vec::new(),
            children: Vec::new(),
        }
    }

    /// 类型名，仅用于诊断
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn slots(&self) -> &[Arc<SlotDescriptor>] {
        &self.slots
    }

    pub fn slot(&self, name: &str) -> Option<&Arc<SlotDescriptor>> {
        self.slots.iter().find(|s| s.name() == name)
    }

    pub fn children(&self) -> impl Iterator<Item = (&str, &Arc<ContainerSpec>)> {
        self.children.iter().map(|(name, spec)| (name.as_str(), spec))
    }

    /// 建出一棵新树，返回其根
    pub fn instantiate(self: &Arc<Self>) -> Container {
        Container::new(self)
    }
}

pub struct ContainerSpecBuilder {
    name: String,
    slots: Vec<Slot>,
    children: Vec<(String, Arc<ContainerSpec>)>,
}

impl ContainerSpecBuilder {
    pub fn slot(mut self, slot: Slot) -> Self {
        self.slots.push(slot);
        self
    }

    /// 声明嵌套容器类型，`name` 成为子节点的局部名
    pub fn child(mut self, name: impl Into<String>, spec: Arc<ContainerSpec>) -> Self {
        self.children.push((name.into(), spec));
        self
    }

    pub fn build(self) -> Result<Arc<ContainerSpec>> {
        let mut seen = HashSet::new();
        let members = self
            .slots
            .iter()
            .map(|s| s.name())
            .chain(self.children.iter().map(|(name, _)| name.as_str()));
        for member in members {
            check_name(&self.name, member)?;
            if !seen.insert(member) {
                return Err(ContainerError::DuplicateMember {
                    container: self.name.clone(),
                    name: member.to_string(),
                });
            }
        }

        let slots = self
            .slots
            .into_iter()
            .map(Slot::into_descriptor)
            .collect::<Vec<_>>();
        for slot in &slots {
            if slot.alias().is_some_and(str::is_empty) {
                return Err(ContainerError::InvalidName {
                    container: self.name.clone(),
                    name: slot.name().to_string(),
                    reason: "alias must not be empty",
                });
            }
        }

        Ok(Arc::new(ContainerSpec {
            name: self.name,
            slots,
            children: self.children,
        }))
    }
}

fn check_name(container: &str, name: &str) -> Result<()> {
    let reason = if name.is_empty() {
        "name must not be empty"
    } else if name.contains('.') {
        "name must not contain '.'"
    } else {
        return Ok(());
    };
    Err(ContainerError::InvalidName {
        container: container.to_string(),
        name: name.to_string(),
        reason,
    })
}
