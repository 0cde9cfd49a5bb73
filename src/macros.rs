//! 宏集合：不定长条件与字段参数，省去手写 `vec![...into()]`。

#[doc(hidden)]
#[macro_export]
macro_rules! __collect_into {
    ($target:ty;) => {
        Vec::<$target>::new()
    };
    ($target:ty; $($value:expr),+ $(,)?) => {{
        let mut values = Vec::<$target>::new();
        $(
            values.push(<$target>::from($value));
        )*
        values
    }};
}

/// 把 where/join 条件混在一起收集成 `Vec<Condition<M>>`。
///
/// ```ignore
/// db.query(conditions![product::int().is().eq(1), product::seller().preload()]).find()?;
/// ```
#[macro_export]
macro_rules! conditions {
    ($($value:expr),* $(,)?) => {
        $crate::__collect_into!($crate::Condition<_>; $($value),*)
    };
}

/// 把不同类型的字段收集成 `Vec<FieldRef>`（分组、冲突列、预加载字段）。
#[macro_export]
macro_rules! fields {
    ($($value:expr),* $(,)?) => {
        $crate::__collect_into!($crate::FieldRef; $($value),*)
    };
}
