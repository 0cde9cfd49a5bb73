#[cfg(test)]
mod tests {
    use crate::aggregate::count_all;
    use crate::error::Error;
    use crate::flavor::Flavor;
    use crate::row::{Loaded, Row};
    use crate::test_support::*;
    use crate::value::SqlValue;
    use crate::{conditions, fields};
    use pretty_assertions::assert_eq;

    const PRODUCT_COLS: &str = "\"products\".\"id\", \"products\".\"int\", \"products\".\"string\", \"products\".\"float\", \"products\".\"bool\", \"products\".\"updated_at\"";
    const COMPANY_SELECT: &str = "SELECT \"companies\".\"id\", \"companies\".\"name\", \"companies\".\"deleted_at\" FROM \"companies\"";

    fn product_row(id: i64, int: i64) -> Row {
        row(vec![
            ("id", SqlValue::I64(id)),
            ("int", SqlValue::I64(int)),
            ("string", SqlValue::from(format!("product {id}"))),
            ("float", SqlValue::F64(0.0)),
            ("bool", SqlValue::Bool(false)),
            ("updated_at", SqlValue::DateTime(ts(0))),
        ])
    }

    fn company_row(id: i64, name: &'static str) -> Row {
        row(vec![
            ("id", SqlValue::I64(id)),
            ("name", SqlValue::from(name)),
            ("deleted_at", SqlValue::Null),
        ])
    }

    fn seller_row(id: i64, name: &'static str, company_id: i64) -> Row {
        row(vec![
            ("id", SqlValue::I64(id)),
            ("name", SqlValue::from(name)),
            ("company_id", SqlValue::I64(company_id)),
        ])
    }

    fn sale_row(id: i64, seller: Option<(i64, &'static str)>) -> Row {
        let (seller_id, seller_name) = match seller {
            Some((id, name)) => (SqlValue::I64(id), SqlValue::from(name)),
            None => (SqlValue::Null, SqlValue::Null),
        };
        row(vec![
            ("id", SqlValue::I64(id)),
            ("code", SqlValue::from(format!("s{id}"))),
            ("product_id", SqlValue::I64(1)),
            ("seller_id", seller_id.clone()),
            ("sellers_0__id", seller_id),
            ("sellers_0__name", seller_name),
            ("sellers_0__company_id", SqlValue::Null),
        ])
    }

    #[test]
    fn find_fills_preloaded_relations() {
        let db = db(Flavor::PostgreSQL);
        db.executor()
            .push_rows(vec![sale_row(1, Some((2, "bob"))), sale_row(2, None)]);

        let sales = db.query(conditions![sale::seller().preload()]).find().unwrap();

        assert_eq!(sales.len(), 2);
        let seller = sales[0].seller.get().unwrap().unwrap();
        assert_eq!(seller.id, 2);
        assert_eq!(seller.name, "bob");
        assert!(!seller.company.is_loaded());
        assert_eq!(sales[1].seller.get().unwrap(), None);
        assert!(matches!(
            sales[0].product.get(),
            Err(Error::RelationNotLoaded)
        ));
    }

    #[test]
    fn find_deduplicates_root_rows() {
        let db = db(Flavor::MySQL);
        db.executor()
            .push_rows(vec![product_row(1, 10), product_row(1, 10), product_row(2, 20)]);

        let products = db.query::<Product>(vec![]).find().unwrap();
        let ids: Vec<i64> = products.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn collection_preload_runs_a_second_query() {
        let db = db(Flavor::PostgreSQL);
        db.executor()
            .push_rows(vec![company_row(1, "acme"), company_row(2, "empty")]);
        db.executor()
            .push_rows(vec![seller_row(10, "a", 1), seller_row(11, "b", 1)]);

        let companies = db
            .query(conditions![company::sellers().preload(vec![])])
            .find()
            .unwrap();

        assert_eq!(
            db.executor().sqls(),
            vec![
                format!("{COMPANY_SELECT} WHERE \"companies\".\"deleted_at\" IS NULL"),
                "SELECT \"sellers\".\"id\", \"sellers\".\"name\", \"sellers\".\"company_id\" FROM \"sellers\" WHERE \"sellers\".\"company_id\" IN ($1, $2)".to_owned(),
            ]
        );
        assert_eq!(
            db.executor().args(1),
            vec![SqlValue::I64(1), SqlValue::I64(2)]
        );

        let names: Vec<&str> = companies[0]
            .sellers
            .get()
            .unwrap()
            .iter()
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(companies[1].sellers.get().unwrap(), &[] as &[Seller]);
    }

    #[test]
    fn collection_preload_without_owners_skips_the_query() {
        let db = db(Flavor::SQLite);
        let companies = db
            .query(conditions![company::sellers().preload(vec![])])
            .find()
            .unwrap();
        assert!(companies.is_empty());
        assert_eq!(db.executor().sqls().len(), 1);
    }

    #[test]
    fn collection_preload_below_a_join() {
        let db = db(Flavor::PostgreSQL);
        db.executor().push_rows(vec![row(vec![
            ("id", SqlValue::I64(1)),
            ("name", SqlValue::from("bob")),
            ("company_id", SqlValue::I64(5)),
            ("companies_0__id", SqlValue::I64(5)),
            ("companies_0__name", SqlValue::from("acme")),
            ("companies_0__deleted_at", SqlValue::Null),
        ])]);
        db.executor()
            .push_rows(vec![seller_row(1, "bob", 5), seller_row(2, "eve", 5)]);

        let sellers = db
            .query(conditions![seller::company().join(conditions![
                company::sellers().preload(vec![])
            ])])
            .find()
            .unwrap();

        let sqls = db.executor().sqls();
        assert_eq!(
            sqls[0],
            "SELECT \"sellers\".\"id\", \"sellers\".\"name\", \"sellers\".\"company_id\", \"companies_0\".\"id\" AS \"companies_0__id\", \"companies_0\".\"name\" AS \"companies_0__name\", \"companies_0\".\"deleted_at\" AS \"companies_0__deleted_at\" FROM \"sellers\" LEFT JOIN \"companies\" AS \"companies_0\" ON \"companies_0\".\"id\" = \"sellers\".\"company_id\" AND \"companies_0\".\"deleted_at\" IS NULL"
        );
        assert!(sqls[1].ends_with("WHERE \"sellers\".\"company_id\" IN ($1)"));
        assert_eq!(db.executor().args(1), vec![SqlValue::I64(5)]);

        let company = sellers[0].company.get().unwrap().unwrap();
        assert_eq!(company.name, "acme");
        assert_eq!(company.sellers.get().unwrap().len(), 2);
    }

    #[test]
    fn collection_preload_with_nested_preload() {
        let db = db(Flavor::PostgreSQL);
        db.executor().push_rows(vec![company_row(1, "acme")]);
        db.executor().push_rows(vec![row(vec![
            ("id", SqlValue::I64(10)),
            ("name", SqlValue::from("a")),
            ("company_id", SqlValue::I64(1)),
            ("companies_0__id", SqlValue::I64(1)),
            ("companies_0__name", SqlValue::from("acme")),
            ("companies_0__deleted_at", SqlValue::Null),
        ])]);

        let companies = db
            .query(conditions![company::sellers().preload(conditions![
                seller::company().preload()
            ])])
            .find()
            .unwrap();

        let sqls = db.executor().sqls();
        assert!(sqls[1].contains("LEFT JOIN \"companies\" AS \"companies_0\""));
        assert!(sqls[1].ends_with("WHERE \"sellers\".\"company_id\" IN ($1)"));
        let sellers = companies[0].sellers.get().unwrap();
        assert_eq!(
            sellers[0].company.get().unwrap().map(|c| c.name.as_str()),
            Some("acme")
        );
    }

    #[test]
    fn find_one_requires_exactly_one() {
        let db = db(Flavor::SQLite);
        let err = db
            .query(conditions![product::int().is().eq(1)])
            .find_one()
            .unwrap_err();
        assert!(err.is_not_found());

        db.executor()
            .push_rows(vec![product_row(1, 1), product_row(2, 1)]);
        let err = db
            .query(conditions![product::int().is().eq(1)])
            .find_one()
            .unwrap_err();
        assert!(matches!(err, Error::MoreThanOneObjectFound));

        db.executor().push_rows(vec![product_row(3, 1)]);
        let product = db
            .query(conditions![product::int().is().eq(1)])
            .find_one()
            .unwrap();
        assert_eq!(product.id, 3);
    }

    #[test]
    fn first_last_and_take() {
        let db = db(Flavor::PostgreSQL);
        db.executor().push_rows(vec![product_row(1, 1)]);
        db.executor().push_rows(vec![product_row(9, 1)]);
        db.executor().push_rows(vec![product_row(4, 1)]);

        assert_eq!(db.query::<Product>(vec![]).first().unwrap().id, 1);
        assert_eq!(db.query::<Product>(vec![]).last().unwrap().id, 9);
        assert_eq!(db.query::<Product>(vec![]).take().unwrap().id, 4);

        assert_eq!(
            db.executor().sqls(),
            vec![
                format!("SELECT {PRODUCT_COLS} FROM \"products\" ORDER BY \"products\".\"id\" ASC LIMIT $1"),
                format!("SELECT {PRODUCT_COLS} FROM \"products\" ORDER BY \"products\".\"id\" DESC LIMIT $1"),
                format!("SELECT {PRODUCT_COLS} FROM \"products\" LIMIT $1"),
            ]
        );
        assert_eq!(db.executor().args(0), vec![SqlValue::U64(1)]);

        let err = db.query::<Product>(vec![]).first().unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn negative_limit_and_offset_are_ignored() {
        let db = db(Flavor::MySQL);
        db.query::<Product>(vec![]).limit(-1).offset(-1).find().unwrap();
        assert!(!db.executor().sqls()[0].contains("LIMIT"));
    }

    #[test]
    fn count_reads_the_single_value() {
        let db = db(Flavor::MySQL);
        db.executor()
            .push_rows(vec![row(vec![("COUNT(*)", SqlValue::I64(3))])]);
        let count = db
            .query(conditions![product::int().is().gt(1)])
            .ascending(product::id())
            .limit(10)
            .count()
            .unwrap();
        assert_eq!(count, 3);
        assert_eq!(
            db.executor().sqls(),
            vec!["SELECT COUNT(*) FROM `products` WHERE `products`.`int` > ?"]
        );

        let err = db.query::<Product>(vec![]).count().unwrap_err();
        assert!(matches!(err, Error::Decode { .. }));
    }

    #[test]
    fn unscoped_query_includes_soft_deleted() {
        let db = db(Flavor::PostgreSQL);
        db.executor().push_rows(vec![row(vec![
            ("id", SqlValue::I64(1)),
            ("name", SqlValue::from("gone")),
            ("deleted_at", SqlValue::DateTime(ts(50))),
        ])]);
        let companies = db.query::<Company>(vec![]).unscoped().find().unwrap();
        assert_eq!(db.executor().sqls(), vec![COMPANY_SELECT.to_owned()]);
        assert_eq!(companies[0].deleted_at, Some(ts(50)));
        assert!(!companies[0].sellers.is_loaded());
    }

    #[test]
    fn invalid_query_sends_nothing() {
        let db = db(Flavor::PostgreSQL);
        let err = db
            .query(conditions![product::int().is_dynamic().eq(&sale::id())])
            .find()
            .unwrap_err();
        assert!(err.is_validation());

        let err = db
            .query(conditions![product::string().is().ilike("a%")])
            .ascending(seller::name())
            .find()
            .unwrap_err();
        assert!(matches!(err, Error::FieldModelNotConcerned { .. }));
        assert!(db.executor().sqls().is_empty());
    }

    #[test]
    fn missing_column_is_a_decode_error() {
        let db = db(Flavor::PostgreSQL);
        db.executor()
            .push_rows(vec![row(vec![("id", SqlValue::I64(1))])]);
        let err = db.query::<Product>(vec![]).find().unwrap_err();
        assert_eq!(
            err.to_string(),
            "decode error on column 'int': column not selected"
        );
    }

    #[test]
    fn find_records_exposes_loaded_relations() {
        let db = db(Flavor::PostgreSQL);
        db.executor().push_rows(vec![sale_row(1, None)]);
        let records = db
            .query(conditions![sale::seller().preload()])
            .find_records()
            .unwrap();
        assert!(records[0].is_loaded("seller"));
        assert!(matches!(records[0].loaded("seller"), Some(Loaded::One(None))));
        assert!(!records[0].is_loaded("product"));
    }

    #[test]
    fn grouped_query_returns_rows() {
        let db = db(Flavor::MySQL);
        db.executor().push_rows(vec![row(vec![
            ("int", SqlValue::I64(1)),
            ("total", SqlValue::F64(2.5)),
        ])]);

        let rows = db
            .query(conditions![product::bool().is().true_()])
            .group_by(fields![product::int()])
            .select(product::float().aggregate().sum(), "total")
            .having(count_all().gt(1_i64))
            .descending(product::int())
            .limit(5)
            .find_rows()
            .unwrap();

        assert_eq!(
            db.executor().sqls(),
            vec![
                "SELECT `products`.`int`, SUM(`products`.`float`) AS `total` FROM `products` WHERE `products`.`bool` = ? GROUP BY `products`.`int` HAVING COUNT(*) > ? ORDER BY `products`.`int` DESC LIMIT ?"
            ]
        );
        assert_eq!(rows[0].try_get::<f64>("total").unwrap(), 2.5);
    }
}
