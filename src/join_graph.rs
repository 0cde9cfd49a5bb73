//! 连接图：一次查询中出现的模型（按出现次序编号），以及它们之间的父子关系。
//!
//! 节点按前序深度优先顺序加入，下标 0 是根。同一模型第 k 次出现的
//! appearance 为 k（从 0 开始）。

use crate::condition::{CollectionPreloadSpec, JoinSpec, Node};
use crate::error::{Error, Result};
use crate::model::{ModelMeta, ModelType, RelationMeta};
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
pub struct JoinNode {
    pub model: &'static ModelMeta,
    pub appearance: usize,
    pub parent: Option<usize>,
    /// 从父节点到达本节点使用的关联；根为 `None`。
    pub relation: Option<&'static RelationMeta>,
    pub alias: String,
    pub conditions: Vec<Node>,
    pub preload: bool,
    /// 子树中含有过滤条件。
    pub filters: bool,
    /// 以 LEFT JOIN 连接。
    pub left: bool,
}

impl JoinNode {
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// 需要额外查询物化的集合预加载。
#[derive(Debug, Clone)]
pub struct CollectionPreload {
    /// 拥有该集合的节点。
    pub owner: usize,
    pub relation: &'static RelationMeta,
    pub conditions: Vec<Node>,
}

#[derive(Debug, Clone)]
pub struct JoinGraph {
    nodes: Vec<JoinNode>,
    appearances: BTreeMap<ModelType, Vec<usize>>,
    collection_preloads: Vec<CollectionPreload>,
    join_prefix: String,
}

impl JoinGraph {
    /// 查询主图：根别名为表名。
    pub fn build(root: &'static ModelMeta, conditions: &[Node]) -> Result<Self> {
        Self::build_with(root, root.table.to_owned(), String::new(), conditions)
    }

    /// 集合子查询的图：别名都带上 `alias__` 前缀，避免与外层冲突。
    pub fn build_scoped(root: &'static ModelMeta, alias: String, conditions: &[Node]) -> Result<Self> {
        let prefix = format!("{alias}__");
        Self::build_with(root, alias, prefix, conditions)
    }

    fn build_with(
        root: &'static ModelMeta,
        root_alias: String,
        join_prefix: String,
        conditions: &[Node],
    ) -> Result<Self> {
        let mut graph = Self {
            nodes: Vec::new(),
            appearances: BTreeMap::new(),
            collection_preloads: Vec::new(),
            join_prefix,
        };
        graph.push(root, None, None, root_alias, conditions.to_vec(), false);
        graph.walk(0, conditions)?;
        graph.finish();
        Ok(graph)
    }

    fn push(
        &mut self,
        model: &'static ModelMeta,
        parent: Option<usize>,
        relation: Option<&'static RelationMeta>,
        alias: String,
        conditions: Vec<Node>,
        preload: bool,
    ) -> usize {
        let idx = self.nodes.len();
        let same_model = self.appearances.entry(model.model_type).or_default();
        let appearance = same_model.len();
        same_model.push(idx);
        self.nodes.push(JoinNode {
            model,
            appearance,
            parent,
            relation,
            alias,
            conditions,
            preload,
            filters: false,
            left: false,
        });
        idx
    }

    fn join_alias(&self, model: &ModelMeta) -> String {
        let appearance = self
            .appearances
            .get(&model.model_type)
            .map_or(0, Vec::len);
        let mut alias = format!("{}{}_{}", self.join_prefix, model.table, appearance);
        while self.nodes.iter().any(|n| n.alias == alias) {
            alias.push('_');
        }
        alias
    }

    /// 第一遍：只处理 Join / Preload / CollectionPreload，建立完整的图。
    fn walk(&mut self, current: usize, conditions: &[Node]) -> Result<()> {
        for node in conditions {
            match node {
                Node::Join(JoinSpec {
                    relation,
                    conditions,
                    preload,
                }) => {
                    let target = relation.target();
                    let alias = self.join_alias(target);
                    let idx = self.push(
                        target,
                        Some(current),
                        Some(relation),
                        alias,
                        conditions.clone(),
                        *preload,
                    );
                    self.walk(idx, conditions)?;
                }
                Node::Preload(_) => {
                    if current != 0 {
                        self.nodes[current].preload = true;
                    }
                }
                Node::CollectionPreload(spec) => {
                    check_only_preloads(spec)?;
                    self.collection_preloads.push(CollectionPreload {
                        owner: current,
                        relation: spec.relation,
                        conditions: spec.conditions.clone(),
                    });
                }
                Node::Invalid(invalid) => return Err(invalid.clone().into()),
                _ => {}
            }
        }
        Ok(())
    }

    fn finish(&mut self) {
        // 前序：子节点下标总是大于父节点，倒序即可自底向上汇总。
        for idx in (0..self.nodes.len()).rev() {
            let own_filters = self.nodes[idx].conditions.iter().any(Node::is_filter);
            if own_filters {
                self.nodes[idx].filters = true;
            }
            if let Some(parent) = self.nodes[idx].parent {
                if self.nodes[idx].filters {
                    self.nodes[parent].filters = true;
                }
                if self.nodes[idx].preload && parent != 0 {
                    self.nodes[parent].preload = true;
                }
            }
        }

        let owners: Vec<usize> = self.collection_preloads.iter().map(|c| c.owner).collect();
        for owner in owners {
            let mut cursor = Some(owner);
            while let Some(idx) = cursor.filter(|&i| i != 0) {
                self.nodes[idx].preload = true;
                cursor = self.nodes[idx].parent;
            }
        }

        for node in self.nodes.iter_mut().skip(1) {
            let optional = node.relation.is_some_and(|r| r.optional);
            node.left = !node.filters && (optional || node.preload);
        }
    }

    pub fn root(&self) -> &JoinNode {
        &self.nodes[0]
    }

    pub fn node(&self, idx: usize) -> &JoinNode {
        &self.nodes[idx]
    }

    pub fn nodes(&self) -> &[JoinNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// 除根以外的节点，按前序排列。
    pub fn joins(&self) -> impl Iterator<Item = (usize, &JoinNode)> {
        self.nodes.iter().enumerate().skip(1)
    }

    pub fn children(&self, idx: usize) -> impl Iterator<Item = (usize, &JoinNode)> {
        self.joins().filter(move |(_, n)| n.parent == Some(idx))
    }

    /// 某模型的全部出现（下标按 appearance 排列）。
    pub fn appearances_of(&self, model: ModelType) -> &[usize] {
        self.appearances.get(&model).map_or(&[], Vec::as_slice)
    }

    pub fn collection_preloads(&self) -> &[CollectionPreload] {
        &self.collection_preloads
    }

    /// 结果中是否需要物化关联。
    pub fn has_preloads(&self) -> bool {
        !self.collection_preloads.is_empty() || self.joins().any(|(_, n)| n.preload)
    }

    /// `ancestor` 是否在根到 `idx` 的路径上（含自身）。
    pub fn is_ancestor_or_self(&self, ancestor: usize, idx: usize) -> bool {
        let mut cursor = Some(idx);
        while let Some(i) = cursor {
            if i == ancestor {
                return true;
            }
            cursor = self.nodes[i].parent;
        }
        false
    }

    /// 位于 `from` 的条件能否引用 `target`：根可以看到整个图，
    /// 嵌套在连接里的条件只能看到自己的路径和子树。
    pub fn is_visible(&self, from: usize, target: usize) -> bool {
        from == 0 || self.is_ancestor_or_self(target, from) || self.is_ancestor_or_self(from, target)
    }

    /// 从根到 `idx` 经过的关联名。
    pub fn relation_path(&self, idx: usize) -> Vec<&'static str> {
        let mut path = Vec::new();
        let mut cursor = idx;
        while let Some(parent) = self.nodes[cursor].parent {
            if let Some(relation) = self.nodes[cursor].relation {
                path.push(relation.name);
            }
            cursor = parent;
        }
        path.reverse();
        path
    }
}

/// 集合预加载内只能出现预加载，任意深度。
fn check_only_preloads(spec: &CollectionPreloadSpec) -> Result<()> {
    let fail = || Error::OnlyPreloadsAllowed {
        model: spec.owner.model_type,
        relation: spec.relation.name,
    };
    fn walk(conditions: &[Node], fail: &dyn Fn() -> Error) -> Result<bool> {
        let mut makes_preload = false;
        for node in conditions {
            match node {
                Node::Join(join) => {
                    let nested = walk(&join.conditions, fail)?;
                    if !join.preload && !nested {
                        return Err(fail());
                    }
                    makes_preload = true;
                }
                Node::CollectionPreload(inner) => {
                    check_only_preloads(inner)?;
                    makes_preload = true;
                }
                Node::Preload(_) => makes_preload = true,
                Node::Invalid(invalid) => return Err(invalid.clone().into()),
                _ => return Err(fail()),
            }
        }
        Ok(makes_preload)
    }
    walk(&spec.conditions, &fail).map(|_| ())
}
