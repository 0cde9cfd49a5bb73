#[cfg(test)]
mod tests {
    use crate::aggregate::count_all;
    use crate::compiler::{
        Direction, OrderSpec, QueryShape, SelectAggregation, SelectList, SelectShape, Statement,
        compile,
    };
    use crate::condition::{
        Condition, always_true, and, into_nodes, not, or, unsafe_condition, xor,
    };
    use crate::error::{Error, Result};
    use crate::field::FieldRef;
    use crate::flavor::Flavor;
    use crate::model::Model;
    use crate::modifiers::Arg;
    use crate::test_support::*;
    use crate::validator::validate;
    use crate::value::SqlValue;
    use crate::{conditions, fields};
    use pretty_assertions::assert_eq;

    const PRODUCT_COLS_PG: &str = "\"products\".\"id\", \"products\".\"int\", \"products\".\"string\", \"products\".\"float\", \"products\".\"bool\", \"products\".\"updated_at\"";
    const SALE_COLS_PG: &str =
        "\"sales\".\"id\", \"sales\".\"code\", \"sales\".\"product_id\", \"sales\".\"seller_id\"";

    fn select_with<M: Model>(
        flavor: Flavor,
        conditions: Vec<Condition<M>>,
        shape: SelectShape,
    ) -> Result<Statement> {
        let graph = validate(M::meta(), &into_nodes(conditions))?;
        compile(&graph, &QueryShape::Select(shape), flavor)
    }

    fn select<M: Model>(flavor: Flavor, conditions: Vec<Condition<M>>) -> Statement {
        select_with(flavor, conditions, SelectShape::entities()).unwrap()
    }

    fn ordered(field: impl Into<FieldRef>, direction: Direction) -> OrderSpec {
        OrderSpec {
            field: field.into(),
            direction,
        }
    }

    #[test]
    fn select_simple_where() {
        let stmt = select(Flavor::PostgreSQL, conditions![product::int().is().eq(1)]);
        assert_eq!(
            stmt.sql,
            format!("SELECT {PRODUCT_COLS_PG} FROM \"products\" WHERE \"products\".\"int\" = $1")
        );
        assert_eq!(stmt.args, vec![SqlValue::I64(1)]);
    }

    #[test]
    fn select_placeholders_per_flavor() {
        let cases = vec![
            (Flavor::MySQL, "`products`.`int` = ? AND `products`.`string` = ?"),
            (Flavor::PostgreSQL, "\"products\".\"int\" = $1 AND \"products\".\"string\" = $2"),
            (Flavor::SQLite, "\"products\".\"int\" = ? AND \"products\".\"string\" = ?"),
            (Flavor::SQLServer, "\"products\".\"int\" = @p1 AND \"products\".\"string\" = @p2"),
        ];
        for (flavor, expected) in cases {
            let stmt = select(
                flavor,
                conditions![product::int().is().eq(1), product::string().is().eq("a")],
            );
            assert!(stmt.sql.ends_with(&format!("WHERE {expected}")), "{flavor}: {}", stmt.sql);
            assert_eq!(stmt.args, vec![SqlValue::I64(1), SqlValue::from("a")]);
        }
    }

    #[test]
    fn select_inner_join_with_filter() {
        let stmt = select(
            Flavor::MySQL,
            conditions![sale::seller().join(conditions![seller::name().is().eq("a")])],
        );
        assert_eq!(
            stmt.sql,
            "SELECT `sales`.`id`, `sales`.`code`, `sales`.`product_id`, `sales`.`seller_id` FROM `sales` INNER JOIN `sellers` AS `sellers_0` ON `sellers_0`.`id` = `sales`.`seller_id` WHERE `sellers_0`.`name` = ?"
        );
    }

    #[test]
    fn select_preload_adds_aliased_columns() {
        let stmt = select(Flavor::PostgreSQL, conditions![sale::seller().preload()]);
        assert_eq!(
            stmt.sql,
            format!(
                "SELECT {SALE_COLS_PG}, \"sellers_0\".\"id\" AS \"sellers_0__id\", \"sellers_0\".\"name\" AS \"sellers_0__name\", \"sellers_0\".\"company_id\" AS \"sellers_0__company_id\" FROM \"sales\" LEFT JOIN \"sellers\" AS \"sellers_0\" ON \"sellers_0\".\"id\" = \"sales\".\"seller_id\""
            )
        );
        assert!(stmt.args.is_empty());
    }

    #[test]
    fn select_nested_preload_through_soft_deleted_model() {
        let stmt = select(
            Flavor::SQLite,
            conditions![sale::seller().join(conditions![seller::company().preload()])],
        );
        assert_eq!(
            stmt.sql,
            format!(
                "SELECT {SALE_COLS_PG}, \"sellers_0\".\"id\" AS \"sellers_0__id\", \"sellers_0\".\"name\" AS \"sellers_0__name\", \"sellers_0\".\"company_id\" AS \"sellers_0__company_id\", \"companies_0\".\"id\" AS \"companies_0__id\", \"companies_0\".\"name\" AS \"companies_0__name\", \"companies_0\".\"deleted_at\" AS \"companies_0__deleted_at\" FROM \"sales\" LEFT JOIN \"sellers\" AS \"sellers_0\" ON \"sellers_0\".\"id\" = \"sales\".\"seller_id\" LEFT JOIN \"companies\" AS \"companies_0\" ON \"companies_0\".\"id\" = \"sellers_0\".\"company_id\" AND \"companies_0\".\"deleted_at\" IS NULL"
            )
        );
    }

    #[test]
    fn select_soft_delete_and_unscoped() {
        let stmt = select::<Company>(Flavor::PostgreSQL, vec![]);
        assert_eq!(
            stmt.sql,
            "SELECT \"companies\".\"id\", \"companies\".\"name\", \"companies\".\"deleted_at\" FROM \"companies\" WHERE \"companies\".\"deleted_at\" IS NULL"
        );

        let shape = SelectShape {
            unscoped: true,
            ..SelectShape::entities()
        };
        let stmt = select_with::<Company>(Flavor::PostgreSQL, vec![], shape).unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT \"companies\".\"id\", \"companies\".\"name\", \"companies\".\"deleted_at\" FROM \"companies\""
        );
    }

    #[test]
    fn select_condition_on_deleted_at_drops_soft_delete_filter() {
        let stmt = select(
            Flavor::PostgreSQL,
            conditions![company::deleted_at().is().not_null()],
        );
        assert_eq!(
            stmt.sql,
            "SELECT \"companies\".\"id\", \"companies\".\"name\", \"companies\".\"deleted_at\" FROM \"companies\" WHERE \"companies\".\"deleted_at\" IS NOT NULL"
        );

        let stmt = select(
            Flavor::PostgreSQL,
            conditions![or(vec![
                company::deleted_at().is().null(),
                company::name().is().eq("a"),
            ])],
        );
        assert!(
            stmt.sql.ends_with(
                "FROM \"companies\" WHERE (\"companies\".\"deleted_at\" IS NULL OR \"companies\".\"name\" = $1)"
            ),
            "{}",
            stmt.sql
        );

        let stmt = select(
            Flavor::MySQL,
            conditions![sale::seller().join(conditions![seller::company().join(conditions![
                company::deleted_at().is().not_null()
            ])])],
        );
        assert_eq!(
            stmt.sql,
            "SELECT `sales`.`id`, `sales`.`code`, `sales`.`product_id`, `sales`.`seller_id` FROM `sales` INNER JOIN `sellers` AS `sellers_0` ON `sellers_0`.`id` = `sales`.`seller_id` INNER JOIN `companies` AS `companies_0` ON `companies_0`.`id` = `sellers_0`.`company_id` WHERE `companies_0`.`deleted_at` IS NOT NULL"
        );
    }

    #[test]
    fn select_xor_only_on_mysql() {
        let conditions = || {
            conditions![xor(vec![
                product::int().is().eq(1),
                product::string().is().eq("a"),
            ])]
        };
        let stmt = select(Flavor::MySQL, conditions());
        assert!(
            stmt.sql
                .ends_with("WHERE (`products`.`int` = ? XOR `products`.`string` = ?)"),
            "{}",
            stmt.sql
        );
        assert_eq!(stmt.args, vec![SqlValue::I64(1), SqlValue::from("a")]);

        for flavor in [Flavor::PostgreSQL, Flavor::SQLite, Flavor::SQLServer] {
            let err = select_with(flavor, conditions(), SelectShape::entities()).unwrap_err();
            assert!(
                matches!(err, Error::UnsupportedByDatabase { method: "Xor", .. }),
                "{flavor}"
            );
        }

        let err = select_with::<Product>(
            Flavor::MySQL,
            conditions![xor::<Product>(vec![])],
            SelectShape::entities(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::EmptyConditions { context: "Xor" }));
    }

    #[test]
    fn select_always_true() {
        let stmt = select(Flavor::SQLite, conditions![always_true::<Product>()]);
        assert_eq!(stmt.sql, format!("SELECT {PRODUCT_COLS_PG} FROM \"products\" WHERE 1 = 1"));
        assert!(stmt.args.is_empty());
    }

    #[test]
    fn select_connectors() {
        let stmt = select(
            Flavor::PostgreSQL,
            conditions![
                or(vec![product::int().is().eq(1), product::int().is().eq(2)]),
                not(vec![product::bool().is().true_()]),
                and(vec![product::string().is().not_null()]),
            ],
        );
        assert_eq!(
            stmt.sql,
            format!(
                "SELECT {PRODUCT_COLS_PG} FROM \"products\" WHERE (\"products\".\"int\" = $1 OR \"products\".\"int\" = $2) AND NOT (\"products\".\"bool\" = $3) AND \"products\".\"string\" IS NOT NULL"
            )
        );
        assert_eq!(
            stmt.args,
            vec![SqlValue::I64(1), SqlValue::I64(2), SqlValue::Bool(true)]
        );
    }

    #[test]
    fn select_empty_not_is_rejected() {
        let err = select_with::<Product>(
            Flavor::MySQL,
            conditions![not::<Product>(vec![])],
            SelectShape::entities(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::EmptyConditions { context: "Not" }));
    }

    #[test]
    fn select_order_limit_offset() {
        let shape = SelectShape {
            orders: vec![ordered(product::id(), Direction::Descending)],
            limit: Some(10),
            offset: Some(20),
            ..SelectShape::entities()
        };
        let stmt =
            select_with(Flavor::PostgreSQL, conditions![product::int().is().gt(1)], shape).unwrap();
        assert_eq!(
            stmt.sql,
            format!(
                "SELECT {PRODUCT_COLS_PG} FROM \"products\" WHERE \"products\".\"int\" > $1 ORDER BY \"products\".\"id\" DESC LIMIT $2 OFFSET $3"
            )
        );
        assert_eq!(
            stmt.args,
            vec![SqlValue::I64(1), SqlValue::U64(10), SqlValue::U64(20)]
        );
    }

    #[test]
    fn select_limit_offset_per_flavor() {
        let shape = |limit, offset| SelectShape {
            limit,
            offset,
            ..SelectShape::entities()
        };

        let stmt = select_with::<Product>(Flavor::SQLServer, vec![], shape(Some(10), Some(20))).unwrap();
        assert!(
            stmt.sql
                .ends_with("FROM \"products\" ORDER BY 1 OFFSET @p1 ROWS FETCH NEXT @p2 ROWS ONLY"),
            "{}",
            stmt.sql
        );
        assert_eq!(stmt.args, vec![SqlValue::U64(20), SqlValue::U64(10)]);

        let stmt = select_with::<Product>(Flavor::SQLServer, vec![], shape(Some(10), None)).unwrap();
        assert!(stmt.sql.ends_with("ORDER BY 1 OFFSET 0 ROWS FETCH NEXT @p1 ROWS ONLY"));

        let stmt = select_with::<Product>(Flavor::SQLite, vec![], shape(None, Some(5))).unwrap();
        assert!(stmt.sql.ends_with("FROM \"products\" LIMIT -1 OFFSET ?"));

        let stmt = select_with::<Product>(Flavor::MySQL, vec![], shape(None, Some(5))).unwrap();
        assert!(stmt.sql.ends_with("FROM `products` LIMIT 18446744073709551615 OFFSET ?"));

        let stmt = select_with::<Product>(Flavor::MySQL, vec![], shape(Some(3), None)).unwrap();
        assert!(stmt.sql.ends_with("FROM `products` LIMIT ?"));
        assert_eq!(stmt.args, vec![SqlValue::U64(3)]);
    }

    #[test]
    fn select_sqlserver_keeps_explicit_order() {
        let shape = SelectShape {
            orders: vec![ordered(product::int(), Direction::Ascending)],
            limit: Some(1),
            ..SelectShape::entities()
        };
        let stmt = select_with::<Product>(Flavor::SQLServer, vec![], shape).unwrap();
        assert!(stmt.sql.ends_with(
            "FROM \"products\" ORDER BY \"products\".\"int\" ASC OFFSET 0 ROWS FETCH NEXT @p1 ROWS ONLY"
        ));
    }

    #[test]
    fn select_order_by_unjoined_model_fails() {
        let shape = SelectShape {
            orders: vec![ordered(seller::name(), Direction::Ascending)],
            ..SelectShape::entities()
        };
        let err = select_with::<Product>(Flavor::MySQL, vec![], shape).unwrap_err();
        assert_eq!(
            err.to_string(),
            "field's model is not concerned by the query (not joined); not concerned model: models.Seller; method: Ascending; model: models.Seller, field: name"
        );
    }

    #[test]
    fn select_order_by_joined_appearance() {
        let shape = SelectShape {
            orders: vec![ordered(parent_parent_name().appearance(1), Direction::Descending)],
            ..SelectShape::entities()
        };
        let stmt = select_with(
            Flavor::PostgreSQL,
            conditions![
                child_parent1().join(conditions![parent1_parent_parent().join(vec![])]),
                child_parent2().join(conditions![parent2_parent_parent().join(vec![])]),
            ],
            shape,
        )
        .unwrap();
        assert!(stmt.sql.ends_with("ORDER BY \"parent_parents_1\".\"name\" DESC"));
    }

    #[test]
    fn select_order_by_repeated_model_needs_appearance() {
        let diamond = || {
            conditions![
                child_parent1().join(conditions![parent1_parent_parent().join(vec![])]),
                child_parent2().join(conditions![parent2_parent_parent().join(vec![])]),
            ]
        };
        let shape = SelectShape {
            orders: vec![ordered(parent_parent_name(), Direction::Ascending)],
            ..SelectShape::entities()
        };
        let err = select_with(Flavor::PostgreSQL, diamond(), shape).unwrap_err();
        assert!(matches!(err, Error::AppearanceMustBeSelected { .. }));

        let shape = SelectShape {
            orders: vec![ordered(parent_parent_name().appearance(0), Direction::Ascending)],
            ..SelectShape::entities()
        };
        let first = select_with(Flavor::PostgreSQL, diamond(), shape.clone()).unwrap();
        let second = select_with(Flavor::PostgreSQL, diamond(), shape).unwrap();
        assert_eq!(first, second);
        assert!(first.sql.ends_with("ORDER BY \"parent_parents_0\".\"name\" ASC"));
    }

    #[test]
    fn select_field_functions() {
        let stmt = select(
            Flavor::PostgreSQL,
            conditions![product::int().plus(1).is().gt(5)],
        );
        assert!(stmt.sql.ends_with("WHERE (\"products\".\"int\" + $1) > $2"));
        assert_eq!(stmt.args, vec![SqlValue::I64(1), SqlValue::I64(5)]);

        let stmt = select(
            Flavor::MySQL,
            conditions![product::string().concat("x").is().eq("ax")],
        );
        assert!(stmt.sql.ends_with("WHERE CONCAT(`products`.`string`, ?) = ?"));

        let stmt = select(
            Flavor::PostgreSQL,
            conditions![product::float().absolute().is().lt(2.5)],
        );
        assert!(stmt.sql.ends_with("WHERE @ \"products\".\"float\" < $1"));
    }

    #[test]
    fn select_dialect_specific_operators() {
        let err = select_with(
            Flavor::MySQL,
            conditions![product::string().is().ilike("a%")],
            SelectShape::entities(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            Error::UnsupportedByDatabase {
                flavor: Flavor::MySQL,
                method: "ILike"
            }
        ));

        let stmt = select(
            Flavor::PostgreSQL,
            conditions![product::string().is().ilike("a%")],
        );
        assert!(stmt.sql.ends_with("WHERE \"products\".\"string\" ILIKE $1"));

        let stmt = select(Flavor::MySQL, conditions![product::int().is().distinct(3)]);
        assert!(stmt.sql.ends_with("WHERE NOT `products`.`int` <=> ?"));

        let stmt = select(Flavor::SQLite, conditions![product::int().is().not_distinct(3)]);
        assert!(stmt.sql.ends_with("WHERE \"products\".\"int\" IS NOT DISTINCT FROM ?"));
    }

    #[test]
    fn select_like_with_escape() {
        let stmt = select(
            Flavor::PostgreSQL,
            conditions![product::string().is().like("10!%").escape('!')],
        );
        assert!(
            stmt.sql
                .ends_with("WHERE \"products\".\"string\" LIKE $1 ESCAPE $2"),
            "{}",
            stmt.sql
        );
    }

    #[test]
    fn select_dynamic_between_joined_models() {
        let stmt = select(
            Flavor::PostgreSQL,
            conditions![
                sale::product().join(conditions![product::int().is_dynamic().eq(&sale::id())])
            ],
        );
        assert_eq!(
            stmt.sql,
            format!(
                "SELECT {SALE_COLS_PG} FROM \"sales\" INNER JOIN \"products\" AS \"products_0\" ON \"products_0\".\"id\" = \"sales\".\"product_id\" WHERE \"products_0\".\"int\" = \"sales\".\"id\""
            )
        );
    }

    #[test]
    fn select_collection_any_with_outer_reference() {
        let stmt = select(
            Flavor::PostgreSQL,
            conditions![company::sellers().any(vec![
                seller::name().is_dynamic().eq(&company::name())
            ])],
        );
        assert_eq!(
            stmt.sql,
            "SELECT \"companies\".\"id\", \"companies\".\"name\", \"companies\".\"deleted_at\" FROM \"companies\" WHERE \"companies\".\"deleted_at\" IS NULL AND EXISTS (SELECT 1 FROM \"sellers\" AS \"companies__sellers\" WHERE \"companies__sellers\".\"company_id\" = \"companies\".\"id\" AND \"companies__sellers\".\"name\" = \"companies\".\"name\")"
        );
    }

    #[test]
    fn select_unsafe_condition() {
        let stmt = select(
            Flavor::PostgreSQL,
            conditions![
                product::int().is().eq(1),
                unsafe_condition::<Product>("%s.int = ? + 1", vec![Arg::from(3_i64)]),
            ],
        );
        assert!(
            stmt.sql
                .ends_with("WHERE \"products\".\"int\" = $1 AND \"products\".int = $2 + 1")
        );
        assert_eq!(stmt.args, vec![SqlValue::I64(1), SqlValue::I64(3)]);
    }

    #[test]
    fn select_count() {
        let shape = SelectShape {
            list: SelectList::Count,
            ..SelectShape::entities()
        };
        let stmt =
            select_with(Flavor::SQLServer, conditions![product::int().is().gt(1)], shape).unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT COUNT(*) FROM \"products\" WHERE \"products\".\"int\" > @p1"
        );
    }

    #[test]
    fn select_group_by_with_having() {
        let shape = SelectShape {
            list: SelectList::Grouped {
                group_by: fields![product::int()],
                selects: vec![SelectAggregation {
                    aggregation: product::float().aggregate().sum(),
                    alias: "total".to_owned(),
                }],
                having: vec![count_all().gt(1_i64)],
            },
            ..SelectShape::entities()
        };
        let stmt = select_with(Flavor::MySQL, conditions![product::bool().is().true_()], shape)
            .unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT `products`.`int`, SUM(`products`.`float`) AS `total` FROM `products` WHERE `products`.`bool` = ? GROUP BY `products`.`int` HAVING COUNT(*) > ?"
        );
        assert_eq!(stmt.args, vec![SqlValue::Bool(true), SqlValue::I64(1)]);
    }

    #[test]
    fn select_bit_aggregates_are_dialect_checked() {
        let shape = SelectShape {
            list: SelectList::Grouped {
                group_by: fields![product::bool()],
                selects: vec![SelectAggregation {
                    aggregation: product::int().aggregate().and(),
                    alias: "bits".to_owned(),
                }],
                having: vec![],
            },
            ..SelectShape::entities()
        };
        let err = select_with::<Product>(Flavor::SQLite, vec![], shape).unwrap_err();
        assert!(err.is_unsupported());
    }
}
