//! 字段句柄：`Field<M, T>` 是模型 `M` 上类型为 `T` 的列，`FieldRef` 是擦除类型后的形式。

use crate::aggregate::FieldAggregation;
use crate::cond::{DynamicFieldIs, FieldIs, UnsafeFieldIs};
use crate::condition::FieldSet;
use crate::model::{Model, ModelMeta};
use crate::modifiers::Arg;
use crate::operand::Operand;
use crate::operator::Function;
use crate::value::SqlValue;
use std::marker::PhantomData;
use time::OffsetDateTime;

/// 叠加在字段上的函数及其参数。
#[derive(Debug, Clone)]
pub struct AppliedFunction {
    pub function: Function,
    pub arg: Option<Operand>,
}

/// 擦除类型的字段引用：(模型, 列) 加上可选的 appearance 与函数链。
#[derive(Debug, Clone)]
pub struct FieldRef {
    pub model: &'static ModelMeta,
    pub column: &'static str,
    pub appearance: Option<usize>,
    pub functions: Vec<AppliedFunction>,
}

impl FieldRef {
    pub fn new(model: &'static ModelMeta, column: &'static str) -> Self {
        Self {
            model,
            column,
            appearance: None,
            functions: Vec::new(),
        }
    }
}

/// 类型族：只有同族类型之间才允许字段与字段比较。
pub mod family {
    #[derive(Debug)]
    pub struct Numeric;
    #[derive(Debug)]
    pub struct Text;
    #[derive(Debug)]
    pub struct Boolean;
    #[derive(Debug)]
    pub struct Binary;
    #[derive(Debug)]
    pub struct Temporal;
}

pub trait FieldType: Into<SqlValue> + Clone + 'static {
    type Family;
}

macro_rules! field_types {
    ($family:ty => $($t:ty),*) => {
        $(impl FieldType for $t {
            type Family = $family;
        })*
    };
}

field_types!(family::Numeric => i8, i16, i32, i64, u8, u16, u32, u64, f32, f64);
field_types!(family::Text => String);
field_types!(family::Boolean => bool);
field_types!(family::Binary => Vec<u8>);
field_types!(family::Temporal => OffsetDateTime);

fn typed_literal<T: FieldType>(v: T) -> Operand {
    Operand::Literal(Arg::Value(v.into()))
}

pub struct Field<M, T> {
    inner: FieldRef,
    _marker: PhantomData<fn() -> (M, T)>,
}

impl<M, T> Clone for Field<M, T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            _marker: PhantomData,
        }
    }
}

impl<M, T> std::fmt::Debug for Field<M, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Field").field(&self.inner).finish()
    }
}

impl<M: Model, T> From<Field<M, T>> for FieldRef {
    fn from(v: Field<M, T>) -> Self {
        v.inner
    }
}

impl<M: Model, T> From<&Field<M, T>> for FieldRef {
    fn from(v: &Field<M, T>) -> Self {
        v.inner.clone()
    }
}

impl<M: Model, T> Field<M, T> {
    pub fn new(column: &'static str) -> Self {
        Self {
            inner: FieldRef::new(M::meta(), column),
            _marker: PhantomData,
        }
    }

    pub fn field_ref(&self) -> &FieldRef {
        &self.inner
    }

    pub fn column(&self) -> &'static str {
        self.inner.column
    }

    /// 模型在查询中出现多次时，选择第 `n` 次出现（从 0 开始）。
    pub fn appearance(mut self, n: usize) -> Self {
        self.inner.appearance = Some(n);
        self
    }

    pub fn is(&self) -> FieldIs<M, T> {
        FieldIs::new(self.inner.clone())
    }

    /// 与其他字段比较。
    pub fn is_dynamic(&self) -> DynamicFieldIs<M, T> {
        DynamicFieldIs::new(self.inner.clone())
    }

    /// 不做类型检查的比较。
    pub fn is_unsafe(&self) -> UnsafeFieldIs<M> {
        UnsafeFieldIs::new(self.inner.clone())
    }

    pub fn set(&self) -> FieldSet<M, T> {
        FieldSet::new(self.inner.clone())
    }

    pub fn aggregate(&self) -> FieldAggregation<T> {
        FieldAggregation::new(self.inner.clone())
    }

    fn apply(mut self, function: Function, arg: Option<Operand>) -> Self {
        self.inner.functions.push(AppliedFunction { function, arg });
        self
    }
}

impl<M: Model, T: FieldType<Family = family::Numeric>> Field<M, T> {
    pub fn plus(self, v: impl Into<T>) -> Self {
        self.apply(Function::Plus, Some(typed_literal::<T>(v.into())))
    }

    pub fn minus(self, v: impl Into<T>) -> Self {
        self.apply(Function::Minus, Some(typed_literal::<T>(v.into())))
    }

    pub fn times(self, v: impl Into<T>) -> Self {
        self.apply(Function::Times, Some(typed_literal::<T>(v.into())))
    }

    pub fn divided(self, v: impl Into<T>) -> Self {
        self.apply(Function::Divided, Some(typed_literal::<T>(v.into())))
    }

    pub fn modulo(self, v: impl Into<T>) -> Self {
        self.apply(Function::Modulo, Some(typed_literal::<T>(v.into())))
    }

    pub fn power(self, v: impl Into<T>) -> Self {
        self.apply(Function::Power, Some(typed_literal::<T>(v.into())))
    }

    pub fn square_root(self) -> Self {
        self.apply(Function::SquareRoot, None)
    }

    pub fn absolute(self) -> Self {
        self.apply(Function::Absolute, None)
    }

    pub fn bit_and(self, v: impl Into<T>) -> Self {
        self.apply(Function::BitAnd, Some(typed_literal::<T>(v.into())))
    }

    pub fn bit_or(self, v: impl Into<T>) -> Self {
        self.apply(Function::BitOr, Some(typed_literal::<T>(v.into())))
    }

    pub fn bit_xor(self, v: impl Into<T>) -> Self {
        self.apply(Function::BitXor, Some(typed_literal::<T>(v.into())))
    }

    pub fn bit_not(self) -> Self {
        self.apply(Function::BitNot, None)
    }

    pub fn shift_left(self, bits: i64) -> Self {
        self.apply(Function::ShiftLeft, Some(Operand::literal(bits)))
    }

    pub fn shift_right(self, bits: i64) -> Self {
        self.apply(Function::ShiftRight, Some(Operand::literal(bits)))
    }

    /// 与另一个数值字段相加。
    pub fn plus_dynamic<N: Model, U: FieldType<Family = family::Numeric>>(
        self,
        other: &Field<N, U>,
    ) -> Self {
        self.apply(Function::Plus, Some(Operand::dynamic(other)))
    }

    pub fn minus_dynamic<N: Model, U: FieldType<Family = family::Numeric>>(
        self,
        other: &Field<N, U>,
    ) -> Self {
        self.apply(Function::Minus, Some(Operand::dynamic(other)))
    }

    pub fn times_dynamic<N: Model, U: FieldType<Family = family::Numeric>>(
        self,
        other: &Field<N, U>,
    ) -> Self {
        self.apply(Function::Times, Some(Operand::dynamic(other)))
    }
}

impl<M: Model> Field<M, String> {
    pub fn concat(self, v: impl Into<String>) -> Self {
        self.apply(Function::Concat, Some(typed_literal::<String>(v.into())))
    }

    pub fn concat_dynamic<N: Model>(self, other: &Field<N, String>) -> Self {
        self.apply(Function::Concat, Some(Operand::dynamic(other)))
    }
}
