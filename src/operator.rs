//! 比较运算符与字段函数：封闭枚举，按方言渲染或拒绝。

use crate::error::{Error, Result};
use crate::flavor::Flavor;

/// 操作数个数约束。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Zero,
    One,
    Two,
    /// 一个模式，外加可选的 ESCAPE 字符。
    Pattern,
    List,
}

impl Arity {
    pub(crate) fn accepts(self, n: usize) -> bool {
        match self {
            Self::Zero => n == 0,
            Self::One | Self::List => n == 1,
            Self::Two => n == 2,
            Self::Pattern => n == 1 || n == 2,
        }
    }

    pub(crate) fn describe(self) -> &'static str {
        match self {
            Self::Zero => "no operand",
            Self::One => "one operand",
            Self::Two => "two operands",
            Self::Pattern => "a pattern and an optional escape",
            Self::List => "one list operand",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    NotEq,
    Lt,
    LtOrEq,
    Gt,
    GtOrEq,
    Between,
    NotBetween,
    IsNull,
    IsNotNull,
    IsDistinct,
    IsNotDistinct,
    Like,
    NotLike,
    In,
    NotIn,
    /// PostgreSQL
    ILike,
    /// PostgreSQL
    SimilarTo,
    /// PostgreSQL `~`
    PosixMatch,
    /// PostgreSQL `~*`
    PosixIMatch,
    /// SQLite
    Glob,
    /// MySQL
    Regexp,
}

impl Operator {
    pub fn name(self) -> &'static str {
        match self {
            Self::Eq => "Eq",
            Self::NotEq => "NotEq",
            Self::Lt => "Lt",
            Self::LtOrEq => "LtOrEq",
            Self::Gt => "Gt",
            Self::GtOrEq => "GtOrEq",
            Self::Between => "Between",
            Self::NotBetween => "NotBetween",
            Self::IsNull => "Null",
            Self::IsNotNull => "NotNull",
            Self::IsDistinct => "Distinct",
            Self::IsNotDistinct => "NotDistinct",
            Self::Like => "Like",
            Self::NotLike => "NotLike",
            Self::In => "In",
            Self::NotIn => "NotIn",
            Self::ILike => "ILike",
            Self::SimilarTo => "SimilarTo",
            Self::PosixMatch => "PosixMatch",
            Self::PosixIMatch => "PosixIMatch",
            Self::Glob => "Glob",
            Self::Regexp => "Regexp",
        }
    }

    pub fn arity(self) -> Arity {
        match self {
            Self::IsNull | Self::IsNotNull => Arity::Zero,
            Self::Between | Self::NotBetween => Arity::Two,
            Self::Like | Self::NotLike => Arity::Pattern,
            Self::In | Self::NotIn => Arity::List,
            _ => Arity::One,
        }
    }

    /// 渲染 `lhs <op> operands`；列表操作数应已带括号。
    pub(crate) fn render(self, flavor: Flavor, lhs: &str, operands: &[String]) -> Result<String> {
        let caps = flavor.capabilities();
        let first = operands.first().map(String::as_str).unwrap_or_default();
        let binary = |op: &str| format!("{lhs} {op} {first}");

        let sql = match self {
            Self::Eq => binary("="),
            Self::NotEq => binary("<>"),
            Self::Lt => binary("<"),
            Self::LtOrEq => binary("<="),
            Self::Gt => binary(">"),
            Self::GtOrEq => binary(">="),
            Self::Between | Self::NotBetween => {
                let second = operands.get(1).map(String::as_str).unwrap_or_default();
                let keyword = if self == Self::Between {
                    "BETWEEN"
                } else {
                    "NOT BETWEEN"
                };
                format!("{lhs} {keyword} {first} AND {second}")
            }
            Self::IsNull => format!("{lhs} IS NULL"),
            Self::IsNotNull => format!("{lhs} IS NOT NULL"),
            Self::IsDistinct if caps.distinct_from => binary("IS DISTINCT FROM"),
            Self::IsDistinct => format!("NOT {lhs} <=> {first}"),
            Self::IsNotDistinct if caps.distinct_from => binary("IS NOT DISTINCT FROM"),
            Self::IsNotDistinct => binary("<=>"),
            Self::Like | Self::NotLike => {
                let keyword = if self == Self::Like { "LIKE" } else { "NOT LIKE" };
                match operands.get(1) {
                    Some(escape) => format!("{lhs} {keyword} {first} ESCAPE {escape}"),
                    None => binary(keyword),
                }
            }
            Self::In => binary("IN"),
            Self::NotIn => binary("NOT IN"),
            Self::ILike | Self::SimilarTo | Self::PosixMatch | Self::PosixIMatch => {
                if flavor != Flavor::PostgreSQL {
                    return Err(Error::unsupported(flavor, self.name()));
                }
                binary(match self {
                    Self::ILike => "ILIKE",
                    Self::SimilarTo => "SIMILAR TO",
                    Self::PosixMatch => "~",
                    _ => "~*",
                })
            }
            Self::Glob if flavor == Flavor::SQLite => binary("GLOB"),
            Self::Regexp if flavor == Flavor::MySQL => binary("REGEXP"),
            Self::Glob | Self::Regexp => return Err(Error::unsupported(flavor, self.name())),
        };
        Ok(sql)
    }
}

/// 作用在字段上的函数（可链式叠加）。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Plus,
    Minus,
    Times,
    Divided,
    Modulo,
    Power,
    SquareRoot,
    Absolute,
    BitAnd,
    BitOr,
    BitXor,
    BitNot,
    ShiftLeft,
    ShiftRight,
    Concat,
}

impl Function {
    pub fn name(self) -> &'static str {
        match self {
            Self::Plus => "Plus",
            Self::Minus => "Minus",
            Self::Times => "Times",
            Self::Divided => "Divided",
            Self::Modulo => "Modulo",
            Self::Power => "Power",
            Self::SquareRoot => "SquareRoot",
            Self::Absolute => "Absolute",
            Self::BitAnd => "BitAnd",
            Self::BitOr => "BitOr",
            Self::BitXor => "BitXor",
            Self::BitNot => "BitNot",
            Self::ShiftLeft => "ShiftLeft",
            Self::ShiftRight => "ShiftRight",
            Self::Concat => "Concat",
        }
    }

    pub(crate) fn render(self, flavor: Flavor, inner: &str, arg: &str) -> Result<String> {
        let infix = |op: &str| format!("({inner} {op} {arg})");
        let postgres = flavor == Flavor::PostgreSQL;

        let sql = match self {
            Self::Plus => infix("+"),
            Self::Minus => infix("-"),
            Self::Times => infix("*"),
            Self::Divided => infix("/"),
            Self::Modulo => infix("%"),
            Self::Power if postgres => infix("^"),
            Self::Power => format!("POWER({inner}, {arg})"),
            Self::SquareRoot if postgres => format!("|/ {inner}"),
            Self::SquareRoot => format!("SQRT({inner})"),
            Self::Absolute if postgres => format!("@ {inner}"),
            Self::Absolute => format!("ABS({inner})"),
            Self::BitAnd => infix("&"),
            Self::BitOr => infix("|"),
            Self::BitXor if !flavor.capabilities().bit_xor => {
                return Err(Error::unsupported(flavor, self.name()));
            }
            Self::BitXor if postgres => infix("#"),
            Self::BitXor => infix("^"),
            Self::BitNot => format!("~{inner}"),
            Self::ShiftLeft => infix("<<"),
            Self::ShiftRight => infix(">>"),
            Self::Concat if postgres || flavor == Flavor::SQLite => infix("||"),
            Self::Concat => format!("CONCAT({inner}, {arg})"),
        };
        Ok(sql)
    }
}
