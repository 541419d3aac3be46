//! End-to-end association fetching against an in-memory SQLite database.

use rowshape::queries::builder::Expression;
use rowshape::{
    fetch, fetch_all, open_mem_db, Association, CompiledQuery, Database, SelectQuery,
    SqliteDatabase,
};

fn parents_db() -> SqliteDatabase {
    let db = open_mem_db().unwrap();
    db.execute_batch(
        "CREATE TABLE parents (id INTEGER PRIMARY KEY, name TEXT);
         CREATE TABLE children (id INTEGER PRIMARY KEY, parentID INTEGER, name TEXT);
         INSERT INTO parents (id, name) VALUES (1, 'parent1'), (2, 'parent2');
         INSERT INTO children (id, parentID, name) VALUES (100, 1, 'child1');",
    )
    .unwrap();
    db
}

fn persons_db() -> SqliteDatabase {
    let db = open_mem_db().unwrap();
    db.execute_batch(
        "CREATE TABLE persons (id INTEGER PRIMARY KEY, name TEXT, friendID INTEGER);
         INSERT INTO persons (id, name, friendID) VALUES
             (1, 'Arthur', NULL), (2, 'Barbara', 1), (3, 'Craig', 2);",
    )
    .unwrap();
    db
}

fn child() -> Association {
    Association::has_one("child", "children", [("id", "parentID")])
}

fn friend() -> Association {
    Association::has_one("friend", "persons", [("id", "friendID")])
}

fn ordered_by_id(query: SelectQuery) -> SelectQuery {
    let root = query.source().unwrap();
    query.order([Expression::qualified(root, "id").asc()])
}

#[test]
fn test_has_one_yields_a_variant_per_row() {
    let db = parents_db();
    let query = ordered_by_id(SelectQuery::table("parents").include(child()));
    let rows = fetch_all(&db, &query).unwrap();
    assert_eq!(rows.len(), 2);

    let first = &rows[0];
    assert_eq!(first.get_named::<String>("name"), "parent1");
    let first_child = first.variant("child").unwrap();
    assert_eq!(first_child.len(), 3);
    assert_eq!(first_child.get_named::<i64>("id"), 100);
    assert_eq!(first_child.get_named::<i64>("parentID"), 1);
    assert_eq!(first_child.get_named::<String>("name"), "child1");

    let second = &rows[1];
    assert_eq!(second.get_named::<String>("name"), "parent2");
    let missing_child = second.variant("child").unwrap();
    assert_eq!(missing_child.len(), 3);
    assert!(missing_child.database_values().all(|value| value.is_null()));
}

#[test]
fn test_variant_span_counts_generated_columns() {
    let db = open_mem_db().unwrap();
    db.execute_batch(
        "CREATE TABLE parents (id INTEGER PRIMARY KEY, name TEXT, upper TEXT GENERATED ALWAYS AS (upper(name)));
         CREATE TABLE children (id INTEGER PRIMARY KEY, parentID INTEGER, name TEXT);
         INSERT INTO parents (id, name) VALUES (1, 'p');
         INSERT INTO children (id, parentID, name) VALUES (100, 1, 'child1');",
    )
    .unwrap();
    let rows = fetch_all(&db, &SelectQuery::table("parents").include(child())).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].column_names(), vec!["id", "name", "upper", "id", "parentID", "name"]);

    let child = rows[0].variant("child").unwrap();
    assert_eq!(child.column_names(), vec!["id", "parentID", "name"]);
    assert_eq!(child.get_named::<i64>("id"), 100);
    assert_eq!(child.get_named::<String>("name"), "child1");
}

#[test]
fn test_main_row_keeps_every_column() {
    let db = parents_db();
    let query = ordered_by_id(SelectQuery::table("parents").include(child()));
    let rows = fetch_all(&db, &query).unwrap();
    assert_eq!(
        rows[0].column_names(),
        vec!["id", "name", "id", "parentID", "name"]
    );
    // Leftmost column wins for duplicate names.
    assert_eq!(rows[0].get_named::<i64>("id"), 1);
    assert_eq!(rows[0].variant_names(), vec!["child"]);
}

#[test]
fn test_belongs_to_from_the_child_side() {
    let db = parents_db();
    let parent = Association::belongs_to("parent", "parents", [("parentID", "id")]);
    let query = SelectQuery::table("children").include(parent);
    let rows = fetch_all(&db, &query).unwrap();
    assert_eq!(rows.len(), 1);
    let parent = rows[0].variant("parent").unwrap();
    assert_eq!(parent.get_named::<String>("name"), "parent1");
}

#[test]
fn test_recursive_self_join() {
    let db = persons_db();
    let query = ordered_by_id(SelectQuery::table("persons").include(friend().include(friend())));
    let rows = fetch_all(&db, &query).unwrap();
    assert_eq!(rows.len(), 3);

    let arthur = &rows[0];
    assert_eq!(arthur.get_named::<String>("name"), "Arthur");
    let barbara = arthur.variant("friend").unwrap();
    assert_eq!(barbara.get_named::<i64>("id"), 2);
    assert_eq!(barbara.get_named::<String>("name"), "Barbara");
    let craig = barbara.variant("friend").unwrap();
    assert_eq!(craig.get_named::<i64>("id"), 3);
    assert_eq!(craig.get_named::<String>("name"), "Craig");
    assert!(craig.variant("friend").is_none());

    let craig_row = &rows[2];
    let nobody = craig_row.variant("friend").unwrap();
    assert_eq!(nobody.get_named_opt::<i64>("id"), None);
}

#[test]
fn test_variants_survive_the_cursor_through_copy() {
    let db = persons_db();
    let query = ordered_by_id(SelectQuery::table("persons").include(friend()));
    let mut sequence = fetch(&db, &query).unwrap();
    let mut cursor = sequence.iter().unwrap();

    let first = cursor.next().unwrap().unwrap();
    assert!(first.is_live());
    let kept = first.copy();
    assert_eq!(kept, first);

    while cursor.next().unwrap().is_some() {}
    assert!(!kept.is_live());
    assert_eq!(kept.get_named::<String>("name"), "Arthur");
    assert_eq!(
        kept.variant("friend").unwrap().get_named::<String>("name"),
        "Barbara"
    );
}

#[test]
fn test_sibling_and_nested_self_joins_are_numbered() {
    let db = open_mem_db().unwrap();
    db.execute_batch(
        "CREATE TABLE persons (
             id INTEGER PRIMARY KEY, name TEXT,
             birthCountryIsoCode TEXT, citizenshipIsoCode TEXT);
         CREATE TABLE countries (isoCode TEXT PRIMARY KEY, name TEXT, leaderID INTEGER);
         INSERT INTO countries (isoCode, name, leaderID) VALUES ('FR', 'France', 2), ('US', 'United States', 1);
         INSERT INTO persons (id, name, birthCountryIsoCode, citizenshipIsoCode) VALUES
             (1, 'Arthur', 'FR', 'US'), (2, 'Barbara', 'US', 'US'), (3, 'Craig', NULL, NULL);",
    )
    .unwrap();

    let birth_country =
        Association::has_one("birthCountry", "countries", [("birthCountryIsoCode", "isoCode")])
            .include(Association::has_one("leader", "persons", [("leaderID", "id")]));
    let citizenship =
        Association::has_one("citizenship", "countries", [("citizenshipIsoCode", "isoCode")]);
    let query = SelectQuery::table("persons")
        .include(birth_country)
        .include(citizenship);

    let compiled = CompiledQuery::from_builder(&query, &db).unwrap();
    assert_eq!(
        compiled.sql,
        "SELECT \"persons0\".*, \"countries0\".*, \"persons1\".*, \"countries1\".* \
         FROM \"persons\" \"persons0\" \
         LEFT JOIN \"countries\" \"countries0\" ON \"countries0\".\"isoCode\" = \"persons0\".\"birthCountryIsoCode\" \
         LEFT JOIN \"persons\" \"persons1\" ON \"persons1\".\"id\" = \"countries0\".\"leaderID\" \
         LEFT JOIN \"countries\" \"countries1\" ON \"countries1\".\"isoCode\" = \"persons0\".\"citizenshipIsoCode\""
    );

    let rows = fetch_all(&db, &ordered_by_id(query)).unwrap();
    assert_eq!(rows.len(), 3);

    let arthur = &rows[0];
    assert_eq!(arthur.len(), 14);
    let mut names = arthur.variant_names();
    names.sort_unstable();
    assert_eq!(names, vec!["birthCountry", "citizenship"]);

    let france = arthur.variant("birthCountry").unwrap();
    assert_eq!(france.len(), 3);
    assert_eq!(france.get_named::<String>("name"), "France");
    let leader = france.variant("leader").unwrap();
    assert_eq!(leader.get_named::<String>("name"), "Barbara");
    assert_eq!(
        arthur.variant("citizenship").unwrap().get_named::<String>("isoCode"),
        "US"
    );

    let craig = &rows[2];
    let stateless = craig.variant("birthCountry").unwrap();
    assert!(stateless.database_values().all(|value| value.is_null()));
    assert!(stateless.variant("leader").unwrap().get_named_opt::<String>("name").is_none());
}

#[test]
fn test_lowering_is_deterministic() {
    let db = persons_db();
    let query = SelectQuery::table("persons")
        .include(friend().include(friend()))
        .filter(rowshape::column("name").ne("Zed"));
    let first = CompiledQuery::from_builder(&query, &db).unwrap();
    let second = CompiledQuery::from_builder(&query, &db).unwrap();
    assert_eq!(first, second);

    let rebuilt = SelectQuery::table("persons")
        .include(friend().include(friend()))
        .filter(rowshape::column("name").ne("Zed"));
    assert_eq!(CompiledQuery::from_builder(&rebuilt, &db).unwrap(), first);
}

#[test]
fn test_include_without_source_is_ignored() {
    let db = persons_db();
    let query = SelectQuery::new()
        .select([rowshape::literal("1")])
        .include(friend());
    let rows = fetch_all(&db, &query).unwrap();
    assert_eq!(rows.len(), 1);
    assert!(rows[0].variant("friend").is_none());
}
