//! Args：收集参数并把含 `$n` 引用的 SQL 编译成方言占位符。
//!
//! 各子句可以按任意顺序生成并各自调用 `add`，最终参数顺序只由 `$n`
//! 在文本中出现的先后决定；同一个 `$n` 出现两次会绑定两次。

use crate::error::Result;
use crate::flavor::Flavor;
use crate::modifiers::Arg;
use crate::string_builder::StringBuilder;
use crate::value::SqlValue;

/// Args 存储 SQL 相关参数。
#[derive(Debug, Clone, Default)]
pub struct Args {
    arg_values: Vec<Arg>,
}

impl Args {
    /// Add：追加一个参数并返回内部占位符（`$0/$1/...`）。
    pub fn add(&mut self, arg: impl Into<Arg>) -> String {
        let idx = self.arg_values.len();
        self.arg_values.push(arg.into());
        format!("${idx}")
    }

    pub fn len(&self) -> usize {
        self.arg_values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arg_values.is_empty()
    }

    /// CompileWithFlavor：编译 format，并用 `flavor` 输出最终占位符。
    ///
    /// `$$` 输出字面量 `$`。
    pub fn compile_with_flavor(&self, format: &str, flavor: Flavor) -> Result<(String, Vec<SqlValue>)> {
        let mut ctx = CompileContext {
            buf: StringBuilder::new(),
            flavor,
            values: Vec::new(),
        };

        let mut rest = format;
        while let Some(pos) = rest.find('$') {
            if pos > 0 {
                ctx.buf.write_str(&rest[..pos]);
            }
            rest = &rest[pos + 1..];

            if rest.is_empty() {
                ctx.buf.write_char('$');
                break;
            }

            match rest.as_bytes()[0] {
                b'$' => {
                    ctx.buf.write_char('$');
                    rest = &rest[1..];
                }
                b'0'..=b'9' => {
                    let end = rest
                        .as_bytes()
                        .iter()
                        .position(|b| !b.is_ascii_digit())
                        .unwrap_or(rest.len());
                    let pointer: usize = rest[..end].parse().unwrap_or(usize::MAX);
                    rest = &rest[end..];
                    match self.arg_values.get(pointer) {
                        Some(arg) => ctx.write_value(arg)?,
                        None => {
                            ctx.buf.write_str("/* INVALID ARG $");
                            ctx.buf.write_str(&pointer.to_string());
                            ctx.buf.write_str(" */");
                        }
                    }
                }
                _ => ctx.buf.write_char('$'),
            }
        }

        if !rest.is_empty() {
            ctx.buf.write_str(rest);
        }

        Ok((ctx.buf.into_string(), ctx.values))
    }
}

#[derive(Debug)]
struct CompileContext {
    buf: StringBuilder,
    flavor: Flavor,
    values: Vec<SqlValue>,
}

impl CompileContext {
    fn write_value(&mut self, arg: &Arg) -> Result<()> {
        match arg {
            Arg::List(args) => {
                for (i, a) in args.iter().enumerate() {
                    if i > 0 {
                        self.buf.write_str(", ");
                    }
                    self.write_value(a)?;
                }
            }
            Arg::Valuer(v) => {
                let value = v.value()?;
                self.write_placeholder_and_push(value);
            }
            Arg::Value(v) => self.write_placeholder_and_push(v.clone()),
        }
        Ok(())
    }

    fn write_placeholder_and_push(&mut self, value: SqlValue) {
        self.values.push(value);
        let placeholder = self.flavor.placeholder(self.values.len());
        self.buf.write_str(&placeholder);
    }
}
