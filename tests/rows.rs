//! Row access, adapters, counting, and ordering through a real SQLite file.

use rowshape::queries::builder::SqlRequest;
use rowshape::{
    column, fetch, fetch_all, fetch_one, open_db, CompiledQuery, Database, DatabaseValue, DbError,
    Row, RowAdapter, SelectQuery, SqliteDatabase,
};
use rstest::{fixture, rstest};
use tempfile::TempDir;

struct Fixture {
    db: SqliteDatabase,
    _dir: TempDir,
}

#[fixture]
fn items() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let db = open_db(&dir.path().join("items.sqlite")).unwrap();
    db.execute_batch(
        "CREATE TABLE items (id INTEGER PRIMARY KEY, name TEXT, price REAL, tag TEXT);
         INSERT INTO items (name, price, tag) VALUES
             ('apple', 1.5, 'fruit'), ('pear', 2.0, 'fruit'),
             ('leek', 0.5, 'vegetable'), ('salt', NULL, NULL);
         CREATE TABLE codes (code TEXT PRIMARY KEY, label TEXT) WITHOUT ROWID;
         CREATE TABLE shadow (_rowid_ INTEGER, name TEXT);
         CREATE VIEW fruits AS SELECT * FROM items WHERE tag = 'fruit';",
    )
    .unwrap();
    Fixture { db, _dir: dir }
}

#[rstest]
fn test_copy_survives_later_steps(items: Fixture) {
    let query = SelectQuery::table("items").order([column("id").asc()]);
    let mut sequence = fetch(&items.db, &query).unwrap();
    let mut cursor = sequence.iter().unwrap();

    let first = cursor.next().unwrap().unwrap();
    let kept = first.copy();
    assert_eq!(kept, first);

    let second = cursor.next().unwrap().unwrap();
    assert_eq!(second.get_named::<String>("name"), "pear");
    assert_eq!(kept.get_named::<String>("name"), "apple");
    assert_eq!(kept.get::<i64>(0), 1);
}

#[rstest]
#[case("name")]
#[case("NAME")]
#[case("Name")]
fn test_lookup_ignores_case(items: Fixture, #[case] name: &str) {
    let query = SelectQuery::table("items").filter(column("id").eq(1));
    let row = fetch_one(&items.db, &query).unwrap().unwrap();
    assert_eq!(row.get_named::<String>(name), "apple");
    assert!(row.has_column(name));
}

#[rstest]
fn test_duplicate_columns_resolve_leftmost(items: Fixture) {
    let request = SqlRequest::new("SELECT 1 AS a, 2 AS A, 3 AS b");
    let row = fetch_one(&items.db, &request).unwrap().unwrap();
    assert_eq!(row.get_named::<i64>("a"), 1);
    assert_eq!(row.index_of_column("A"), Some(0));
    assert_eq!(row.get::<i64>(1), 2);
}

#[rstest]
fn test_null_and_conversion_errors(items: Fixture) {
    let query = SelectQuery::table("items").filter(column("name").eq("salt"));
    let row = fetch_one(&items.db, &query).unwrap().unwrap();
    assert_eq!(row.get_named_opt::<f64>("price"), None);
    assert!(matches!(
        row.try_get_named::<i64>("name"),
        Err(DbError::Conversion { .. })
    ));
    assert!(matches!(row.try_get::<i64>(9), Err(DbError::Range { .. })));
}

#[rstest]
fn test_null_comparison_matches_missing_values(items: Fixture) {
    let query = SelectQuery::table("items").filter(column("tag").eq(DatabaseValue::Null));
    let rows = fetch_all(&items.db, &query).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get_named::<String>("name"), "salt");
}

#[rstest]
fn test_count_queries(items: Fixture) {
    let all = SelectQuery::table("items");
    assert_eq!(all.fetch_count(&items.db).unwrap(), 4);

    let tags = SelectQuery::table("items").select([column("tag")]).distinct();
    assert_eq!(
        CompiledQuery::from_builder(&tags.count_query(), &items.db)
            .unwrap()
            .sql,
        "SELECT COUNT(DISTINCT \"tag\") FROM \"items\""
    );
    // COUNT(DISTINCT x) ignores NULL.
    assert_eq!(tags.fetch_count(&items.db).unwrap(), 2);

    let limited = SelectQuery::table("items").limit(3, Some(2));
    assert_eq!(limited.fetch_count(&items.db).unwrap(), 2);

    let grouped = SelectQuery::table("items")
        .select([column("tag")])
        .group([column("tag")]);
    assert_eq!(grouped.fetch_count(&items.db).unwrap(), 3);
}

#[rstest]
fn test_reversed_without_order_uses_row_id(items: Fixture) {
    let query = SelectQuery::table("items").reversed();
    let rows = fetch_all(&items.db, &query).unwrap();
    let names: Vec<String> = rows.iter().map(|row| row.get_named("name")).collect();
    assert_eq!(names, vec!["salt", "leek", "pear", "apple"]);
}

#[rstest]
fn test_reversed_explicit_order(items: Fixture) {
    let query = SelectQuery::table("items")
        .order([column("price").desc(), column("id").asc()])
        .reversed();
    let compiled = CompiledQuery::from_builder(&query, &items.db).unwrap();
    assert!(compiled.sql.ends_with("ORDER BY \"price\" ASC, \"id\" DESC"));
}

#[rstest]
#[case("codes")]
#[case("shadow")]
#[case("fruits")]
fn test_reversal_rejected_without_usable_row_id(items: Fixture, #[case] table: &str) {
    let query = SelectQuery::table(table).reversed();
    let err = fetch_all(&items.db, &query).unwrap_err();
    assert!(matches!(err, DbError::UnsupportedReversal { .. }));
}

#[rstest]
fn test_reversal_rejected_on_subquery(items: Fixture) {
    let query = SelectQuery::from_query(SelectQuery::table("items"), Some("sub")).reversed();
    let err = CompiledQuery::from_builder(&query, &items.db).unwrap_err();
    assert!(matches!(err, DbError::UnsupportedReversal { .. }));
}

#[rstest]
fn test_mapping_adapter_renames_columns(items: Fixture) {
    let request = SqlRequest::new("SELECT id, name, price FROM items WHERE id = ?")
        .arguments([2i64])
        .with_adapter(RowAdapter::mapping([("label", "name"), ("cost", "PRICE")]));
    let row = fetch_one(&items.db, &request).unwrap().unwrap();
    assert_eq!(row.len(), 2);
    assert_eq!(row.column_names(), vec!["label", "cost"]);
    assert_eq!(row.get_named::<String>("label"), "pear");
    assert_eq!(row.get::<f64>(1), 2.0);
    assert!(!row.has_column("id"));
}

#[rstest]
fn test_mapping_to_missing_column_is_schema_mismatch(items: Fixture) {
    let request = SqlRequest::new("SELECT id, name FROM items")
        .with_adapter(RowAdapter::mapping([("label", "title")]));
    let err = fetch(&items.db, &request).err().unwrap();
    assert!(matches!(err, DbError::SchemaMismatch { .. }));
    assert!(err.to_string().contains("title"));
}

#[rstest]
fn test_adapter_with_variants(items: Fixture) {
    let request = SqlRequest::new("SELECT id, name, price, tag FROM items WHERE id = 3")
        .with_adapter(RowAdapter::with_variants(
            RowAdapter::range(0..2),
            [("details", RowAdapter::suffix(2))],
        ));
    let row = fetch_one(&items.db, &request).unwrap().unwrap();
    assert_eq!(row.column_names(), vec!["id", "name"]);
    let details = row.variant("details").unwrap();
    assert_eq!(details.column_names(), vec!["price", "tag"]);
    assert_eq!(details.get_named::<String>("tag"), "vegetable");
}

#[test]
fn test_literal_rows_compare_with_fetched_rows() {
    let db = rowshape::open_mem_db().unwrap();
    let fetched = fetch_one(&db, &SqlRequest::new("SELECT 1 AS id, 'Arthur' AS name"))
        .unwrap()
        .unwrap();
    let literal = Row::from_pairs([
        ("id", DatabaseValue::from(1i64)),
        ("name", DatabaseValue::from("Arthur")),
    ]);
    assert_eq!(fetched, literal);
    assert_eq!(literal.to_string(), "<Row id:1 name:\"Arthur\">");
}
