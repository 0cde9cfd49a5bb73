//! WHERE 子句：把校验过的条件树降级成带 `$n` 引用的 SQL 片段。
//!
//! 片段按条件在树中出现的先后（前序）追加，参数顺序因此与文本顺序一致。

use crate::args::Args;
use crate::condition::{CollectionKind, CollectionSpec, ConnectorKind, Node, WhereNode};
use crate::error::{Error, Result};
use crate::field::FieldRef;
use crate::flavor::Flavor;
use crate::join_graph::{JoinGraph, JoinNode};
use crate::modifiers::{Arg, escape};
use crate::operand::Operand;
use crate::operator::Operator;
use crate::string_builder::StringBuilder;
use crate::validator::{Scope, where_context};

/// 以 AND 连接的谓词列表。
#[derive(Debug, Clone, Default)]
pub(crate) struct WhereClause {
    exprs: Vec<String>,
}

impl WhereClause {
    pub fn add_where_expr(&mut self, expr: impl Into<String>) {
        let expr = expr.into();
        if !expr.is_empty() {
            self.exprs.push(expr);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.exprs.is_empty()
    }

    pub fn exprs(&self) -> &[String] {
        &self.exprs
    }

    /// `a AND b AND c`
    pub fn build(&self) -> String {
        let mut buf = StringBuilder::new();
        buf.write_strings(&self.exprs, " AND ");
        buf.into_string()
    }
}

/// 降级器：共享同一个 `Args`，保证所有子句的 `$n` 编号不冲突。
#[derive(Debug)]
pub(crate) struct Lowerer<'a> {
    pub flavor: Flavor,
    pub args: &'a mut Args,
    /// 关闭软删除过滤。
    pub unscoped: bool,
}

impl<'a> Lowerer<'a> {
    pub fn new(flavor: Flavor, args: &'a mut Args, unscoped: bool) -> Self {
        Self {
            flavor,
            args,
            unscoped,
        }
    }

    pub fn qualify(&self, alias: &str, column: &str) -> String {
        self.flavor.qualify(alias, column)
    }

    /// `"table"` 或 `"table" AS "alias"`。
    pub fn table_ref(&self, node: &JoinNode) -> String {
        let table = self.flavor.quote(node.model.table);
        if node.alias == node.model.table {
            table
        } else {
            format!("{table} AS {}", self.flavor.quote(&node.alias))
        }
    }

    /// 软删除谓词：`"alias"."deleted_at" IS NULL`。
    /// 节点自身的条件已经涉及该列时省略。
    pub fn soft_delete(&self, node: &JoinNode) -> Option<String> {
        if self.unscoped || node.conditions.iter().any(|c| c.affects_soft_delete(node.model)) {
            return None;
        }
        node.model
            .soft_delete_column
            .map(|column| format!("{} IS NULL", self.qualify(&node.alias, column)))
    }

    /// 连接谓词：外键相等，加上被连接模型的软删除谓词。
    pub fn join_on(&self, graph: &JoinGraph, node: &JoinNode) -> Vec<String> {
        let mut on = Vec::new();
        if let (Some(parent), Some(relation)) = (node.parent, node.relation) {
            let parent = graph.node(parent);
            on.push(format!(
                "{} = {}",
                self.qualify(&node.alias, relation.foreign_column),
                self.qualify(&parent.alias, relation.local_column)
            ));
        }
        on.extend(self.soft_delete(node));
        on
    }

    /// 每个非根节点一条 `[LEFT|INNER] JOIN ... ON ...`，按前序排列。
    pub fn joins(&self, graph: &JoinGraph) -> Vec<String> {
        graph
            .joins()
            .map(|(_, node)| {
                let kind = if node.left { "LEFT JOIN" } else { "INNER JOIN" };
                format!(
                    "{kind} {} ON {}",
                    self.table_ref(node),
                    self.join_on(graph, node).join(" AND ")
                )
            })
            .collect()
    }

    /// 根的软删除谓词以及整张图上的全部过滤条件。
    pub fn graph_predicates(&mut self, scope: &Scope<'_>, wc: &mut WhereClause) -> Result<()> {
        if let Some(pred) = self.soft_delete(scope.graph.root()) {
            wc.add_where_expr(pred);
        }
        let mut next_join = 1;
        let conditions = &scope.graph.root().conditions;
        self.predicates(scope, 0, conditions, &mut next_join, wc)
    }

    fn predicates(
        &mut self,
        scope: &Scope<'_>,
        current: usize,
        conditions: &[Node],
        next_join: &mut usize,
        wc: &mut WhereClause,
    ) -> Result<()> {
        for node in conditions {
            match node {
                Node::Join(join) => {
                    let idx = *next_join;
                    *next_join += 1;
                    self.predicates(scope, idx, &join.conditions, next_join, wc)?;
                }
                _ => {
                    if let Some(expr) = self.condition(&scope.at(current), node)? {
                        wc.add_where_expr(expr);
                    }
                }
            }
        }
        Ok(())
    }

    /// 单个过滤节点；非过滤节点返回 `None`。
    pub fn condition(&mut self, scope: &Scope<'_>, node: &Node) -> Result<Option<String>> {
        let sql = match node {
            Node::Where(where_node) => self.where_node(scope, where_node)?,
            Node::Connector(kind, children) => {
                let mut parts = Vec::with_capacity(children.len());
                for child in children {
                    parts.extend(self.condition(scope, child)?);
                }
                if parts.is_empty() {
                    return Ok(None);
                }
                match kind {
                    ConnectorKind::Xor if !self.flavor.capabilities().logical_xor => {
                        return Err(Error::unsupported(self.flavor, "Xor"));
                    }
                    ConnectorKind::Xor if parts.len() == 1 => parts.remove(0),
                    ConnectorKind::Xor => format!("({})", parts.join(" XOR ")),
                    ConnectorKind::And if parts.len() == 1 => parts.remove(0),
                    ConnectorKind::And => format!("({})", parts.join(" AND ")),
                    ConnectorKind::Or if parts.len() == 1 => parts.remove(0),
                    ConnectorKind::Or => format!("({})", parts.join(" OR ")),
                    ConnectorKind::Not => format!("NOT ({})", parts.join(" AND ")),
                }
            }
            Node::Collection(spec) => self.collection(scope, spec)?,
            Node::Unsafe { template, args } => self.raw(scope.alias(), template, args),
            Node::Invalid(invalid) => return Err(invalid.clone().into()),
            Node::Join(_) | Node::Preload(_) | Node::CollectionPreload(_) => return Ok(None),
        };
        Ok(Some(sql))
    }

    fn where_node(&mut self, scope: &Scope<'_>, node: &WhereNode) -> Result<String> {
        let context = where_context(node);

        if matches!(node.operator, Operator::In | Operator::NotIn)
            && node.operands.first().is_some_and(is_empty_list)
        {
            let constant = if node.operator == Operator::In {
                "1 = 0"
            } else {
                "1 = 1"
            };
            return Ok(constant.to_owned());
        }

        let alias = scope.resolve_own(&node.field, &context)?;
        let lhs = self.apply_functions(scope, alias, &node.field, &context)?;

        let mut operands = Vec::with_capacity(node.operands.len());
        for operand in &node.operands {
            let sql = self.operand(scope, operand, &context)?;
            if matches!(node.operator, Operator::In | Operator::NotIn) && !sql.starts_with('(') {
                operands.push(format!("({sql})"));
            } else {
                operands.push(sql);
            }
        }
        node.operator.render(self.flavor, &lhs, &operands)
    }

    /// 字段表达式：限定列名再依次套上函数。
    pub fn field(&mut self, scope: &Scope<'_>, field: &FieldRef, context: &str) -> Result<String> {
        let alias = scope.resolve(field, context)?;
        self.apply_functions(scope, alias, field, context)
    }

    fn apply_functions(
        &mut self,
        scope: &Scope<'_>,
        alias: &str,
        field: &FieldRef,
        context: &str,
    ) -> Result<String> {
        let mut sql = self.qualify(alias, field.column);
        for applied in &field.functions {
            let arg = match &applied.arg {
                Some(operand) => self.operand(scope, operand, context)?,
                None => String::new(),
            };
            sql = applied.function.render(self.flavor, &sql, &arg)?;
        }
        Ok(sql)
    }

    pub fn operand(&mut self, scope: &Scope<'_>, operand: &Operand, context: &str) -> Result<String> {
        let sql = match operand {
            Operand::Literal(arg @ Arg::List(_)) => format!("({})", self.args.add(arg.clone())),
            Operand::Literal(arg) => self.args.add(arg.clone()),
            Operand::List(items) => format!("({})", self.args.add(Arg::List(items.clone()))),
            Operand::Dynamic(field) => self.field(scope, field, context)?,
            Operand::RawUnsafe { template, args } => self.raw(scope.alias(), template, args),
        };
        Ok(sql)
    }

    /// 原始模板：`%s` 换成当前表别名，`?` 依次绑定参数，多出的 `?` 原样保留。
    pub fn raw(&mut self, alias: &str, template: &str, args: &[Arg]) -> String {
        let quoted = self.flavor.quote(alias);
        let mut buf = StringBuilder::new();
        let mut args = args.iter();
        let mut chars = template.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '%' if chars.peek() == Some(&'s') => {
                    chars.next();
                    buf.write_str(&quoted);
                }
                '?' => match args.next() {
                    Some(arg) => buf.write_str(&self.args.add(arg.clone())),
                    None => buf.write_char('?'),
                },
                '$' => buf.write_str(&escape("$")),
                c => buf.write_char(c),
            }
        }
        buf.into_string()
    }

    /// `[NOT] EXISTS (SELECT 1 FROM related ... WHERE related.fk = owner.key AND ...)`。
    fn collection(&mut self, scope: &Scope<'_>, spec: &CollectionSpec) -> Result<String> {
        let alias = format!("{}__{}", scope.alias(), spec.relation.name);
        let graph = JoinGraph::build_scoped(spec.relation.target(), alias, &spec.conditions)?;
        let inner = Scope::nested(&graph, scope);
        let root = graph.root();

        let mut wc = WhereClause::default();
        wc.add_where_expr(format!(
            "{} = {}",
            self.qualify(&root.alias, spec.relation.foreign_column),
            self.qualify(scope.alias(), spec.relation.local_column)
        ));

        let mut filters = WhereClause::default();
        self.graph_predicates(&inner, &mut filters)?;
        // 软删除谓词不属于 ALL 的取反部分。
        let soft_delete = self.soft_delete(root);
        let (kept, negated): (Vec<String>, Vec<String>) = filters
            .exprs()
            .iter()
            .cloned()
            .partition(|e| soft_delete.as_deref() == Some(e.as_str()));
        for expr in kept {
            wc.add_where_expr(expr);
        }
        match spec.kind {
            CollectionKind::All if negated.is_empty() => return Ok("1 = 1".to_owned()),
            CollectionKind::All => wc.add_where_expr(format!("NOT ({})", negated.join(" AND "))),
            CollectionKind::Any | CollectionKind::None => {
                for expr in negated {
                    wc.add_where_expr(expr);
                }
            }
        }

        let mut buf = StringBuilder::new();
        buf.write_str("SELECT 1 FROM ");
        buf.write_str(&self.table_ref(root));
        for join in self.joins(&graph) {
            buf.write_leading(&join);
        }
        buf.write_leading("WHERE ");
        buf.write_str(&wc.build());

        let keyword = match spec.kind {
            CollectionKind::Any => "EXISTS",
            CollectionKind::None | CollectionKind::All => "NOT EXISTS",
        };
        Ok(format!("{keyword} ({})", buf.into_string()))
    }
}

fn is_empty_list(operand: &Operand) -> bool {
    match operand {
        Operand::List(items) | Operand::Literal(Arg::List(items)) => items.is_empty(),
        _ => false,
    }
}
