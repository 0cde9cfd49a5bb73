//! 连接与 appearance 校验。
//!
//! 第一遍（`JoinGraph::build`）只根据 Join 建图；第二遍在完整的图上检查其余
//! 每一处字段引用：过滤条件、动态操作数、函数参数、预加载、集合子条件。
//! 排序、分组、赋值等由编译器在同一个 `Scope` 上解析。

use crate::condition::{CollectionPreloadSpec, CollectionSpec, Node, WhereNode};
use crate::error::{Error, Result};
use crate::field::FieldRef;
use crate::join_graph::JoinGraph;
use crate::model::ModelMeta;
use crate::operand::Operand;

/// 校验条件树并返回连接图；任何错误都发生在生成 SQL 之前。
pub fn validate(root: &'static ModelMeta, conditions: &[Node]) -> Result<JoinGraph> {
    let graph = JoinGraph::build(root, conditions)?;
    Checker::new(&Scope::root(&graph)).check_graph()?;
    Ok(graph)
}

/// 字段解析的作用域：一张连接图上的某个节点，集合子查询还能看到外层作用域。
#[derive(Debug, Clone, Copy)]
pub(crate) struct Scope<'g> {
    pub graph: &'g JoinGraph,
    pub current: usize,
    pub outer: Option<&'g Scope<'g>>,
}

impl<'g> Scope<'g> {
    pub fn root(graph: &'g JoinGraph) -> Self {
        Self {
            graph,
            current: 0,
            outer: None,
        }
    }

    pub fn nested(graph: &'g JoinGraph, outer: &'g Scope<'g>) -> Self {
        Self {
            graph,
            current: 0,
            outer: Some(outer),
        }
    }

    pub fn at(&self, current: usize) -> Self {
        Self { current, ..*self }
    }

    pub fn alias(&self) -> &'g str {
        &self.graph.node(self.current).alias
    }

    pub fn model(&self) -> &'static ModelMeta {
        self.graph.node(self.current).model
    }

    /// 条件自身的字段：未指定 appearance 且模型相同时就是当前节点。
    pub fn resolve_own(&self, field: &FieldRef, context: &str) -> Result<&'g str> {
        if field.appearance.is_none() && field.model == self.model() {
            check_column(field)?;
            return Ok(self.alias());
        }
        self.resolve(field, context)
    }

    /// 解析字段引用所在节点的别名。
    pub fn resolve(&self, field: &FieldRef, context: &str) -> Result<&'g str> {
        let model = field.model.model_type;
        let nodes = self.graph.appearances_of(model);
        if nodes.is_empty() {
            return match self.outer {
                Some(outer) => outer.resolve(field, context),
                None => Err(Error::FieldModelNotConcerned {
                    model,
                    context: context.to_owned(),
                }),
            };
        }

        let idx = match field.appearance {
            None if nodes.len() > 1 => {
                return Err(Error::AppearanceMustBeSelected {
                    model,
                    context: context.to_owned(),
                });
            }
            None => nodes[0],
            Some(k) => *nodes.get(k).ok_or_else(|| Error::AppearanceOutOfRange {
                model,
                appearance: k,
                joined: nodes.len(),
                context: context.to_owned(),
            })?,
        };

        if !self.graph.is_visible(self.current, idx) {
            return Err(Error::FieldModelNotConcerned {
                model,
                context: context.to_owned(),
            });
        }
        check_column(field)?;
        Ok(&self.graph.node(idx).alias)
    }
}

fn check_column(field: &FieldRef) -> Result<()> {
    match field.model.column(field.column) {
        Some(_) => Ok(()),
        None => Err(Error::UnknownColumn {
            model: field.model.model_type,
            column: field.column,
        }),
    }
}

pub(crate) fn where_context(node: &WhereNode) -> String {
    format!(
        "operator: {}; model: {}, field: {}",
        node.operator.name(),
        node.field.model.model_type,
        node.field.column
    )
}

pub(crate) fn method_context(method: &str, field: &FieldRef) -> String {
    format!(
        "method: {method}; model: {}, field: {}",
        field.model.model_type, field.column
    )
}

/// 第二遍。Join 的下标按前序计数与第一遍对齐。
struct Checker<'s, 'g> {
    scope: &'s Scope<'g>,
    next_join: usize,
}

impl<'s, 'g> Checker<'s, 'g> {
    fn new(scope: &'s Scope<'g>) -> Self {
        Self {
            scope,
            next_join: 1,
        }
    }

    fn check_graph(mut self) -> Result<()> {
        let conditions = &self.scope.graph.root().conditions;
        self.check_list(0, conditions)
    }

    fn check_list(&mut self, current: usize, conditions: &[Node]) -> Result<()> {
        for node in conditions {
            match node {
                Node::Join(join) => {
                    let idx = self.next_join;
                    self.next_join += 1;
                    self.check_list(idx, &join.conditions)?;
                }
                Node::CollectionPreload(spec) => check_collection_preload(spec)?,
                _ => check_filter(&self.scope.at(current), node)?,
            }
        }
        Ok(())
    }
}

/// 检查一个过滤节点（含 Preload 声明）。
fn check_filter(scope: &Scope<'_>, node: &Node) -> Result<()> {
    match node {
        Node::Where(where_node) => check_where(scope, where_node),
        Node::Connector(_, children) => children.iter().try_for_each(|c| check_filter(scope, c)),
        Node::Collection(spec) => check_collection(scope, spec),
        Node::Preload(fields) => {
            for field in fields {
                if field.model != scope.model() {
                    return Err(Error::FieldModelNotConcerned {
                        model: field.model.model_type,
                        context: method_context("Preload", field),
                    });
                }
                check_column(field)?;
            }
            Ok(())
        }
        Node::Invalid(invalid) => Err(invalid.clone().into()),
        Node::Unsafe { .. } | Node::Join(_) | Node::CollectionPreload(_) => Ok(()),
    }
}

fn check_where(scope: &Scope<'_>, node: &WhereNode) -> Result<()> {
    let context = where_context(node);
    let arity = node.operator.arity();
    if !arity.accepts(node.operands.len()) {
        return Err(Error::InvalidOperands {
            operator: node.operator.name(),
            expected: arity.describe(),
            got: node.operands.len(),
        });
    }
    scope.resolve_own(&node.field, &context)?;
    check_functions(scope, &node.field, &context)?;
    for operand in &node.operands {
        check_operand(scope, operand, &context)?;
    }
    Ok(())
}

pub(crate) fn check_operand(scope: &Scope<'_>, operand: &Operand, context: &str) -> Result<()> {
    if let Some(field) = operand.field() {
        scope.resolve(field, context)?;
        check_functions(scope, field, context)?;
    }
    Ok(())
}

pub(crate) fn check_functions(scope: &Scope<'_>, field: &FieldRef, context: &str) -> Result<()> {
    for applied in &field.functions {
        if let Some(arg) = &applied.arg {
            check_operand(scope, arg, context)?;
        }
    }
    Ok(())
}

/// 集合条件是一棵以关联模型为根的独立子树，并能看到外层作用域。
fn check_collection(scope: &Scope<'_>, spec: &CollectionSpec) -> Result<()> {
    let alias = format!("{}__{}", scope.alias(), spec.relation.name);
    let graph = JoinGraph::build_scoped(spec.relation.target(), alias, &spec.conditions)?;
    let inner = Scope::nested(&graph, scope);
    Checker::new(&inner).check_graph()
}

fn check_collection_preload(spec: &CollectionPreloadSpec) -> Result<()> {
    let graph = JoinGraph::build(spec.relation.target(), &spec.conditions)?;
    Checker::new(&Scope::root(&graph)).check_graph()
}
