//! 操作数：字面量、另一个字段（动态）、原始 SQL 模板或值列表。

use crate::field::{Field, FieldRef};
use crate::model::Model;
use crate::modifiers::Arg;

#[derive(Debug, Clone)]
pub enum Operand {
    Literal(Arg),
    Dynamic(FieldRef),
    /// `%s` 替换为当前表别名，`?` 依次绑定 `args`。不做类型检查。
    RawUnsafe { template: String, args: Vec<Arg> },
    List(Vec<Arg>),
}

impl Operand {
    pub fn literal(value: impl Into<Arg>) -> Self {
        Self::Literal(value.into())
    }

    pub fn dynamic<M: Model, T>(field: &Field<M, T>) -> Self {
        Self::Dynamic(field.field_ref().clone())
    }

    pub fn raw(template: impl Into<String>, args: Vec<Arg>) -> Self {
        Self::RawUnsafe {
            template: template.into(),
            args,
        }
    }

    pub(crate) fn field(&self) -> Option<&FieldRef> {
        match self {
            Self::Dynamic(f) => Some(f),
            _ => None,
        }
    }
}

impl From<Arg> for Operand {
    fn from(v: Arg) -> Self {
        Self::Literal(v)
    }
}

impl From<FieldRef> for Operand {
    fn from(v: FieldRef) -> Self {
        Self::Dynamic(v)
    }
}

impl<M: Model, T> From<Field<M, T>> for Operand {
    fn from(v: Field<M, T>) -> Self {
        Self::Dynamic(v.into())
    }
}
