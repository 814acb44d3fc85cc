use super::*;
use crate::plan::{InsertPlan, UidLookup, UpdatePlan};
use crudgen_schema::node::MessageId;
use std::collections::BTreeSet;

fn column(name: &str, ty: ColumnType, nullable: bool) -> Column {
    Column {
        name: name.to_string(),
        path: name.to_string(),
        field: name.to_string(),
        ty,
        primary: false,
        nullable,
    }
}

fn user_plan() -> TablePlan {
    TablePlan {
        message: MessageId(0),
        message_name: "User".to_string(),
        table: "user".to_string(),
        columns: vec![
            column("id", ColumnType::Scalar(ScalarType::Uint64), false),
            column("name", ColumnType::Scalar(ScalarType::String), false),
            column("age", ColumnType::Scalar(ScalarType::Uint32), true),
        ],
        key: vec!["id".to_string()],
        uid_lookups: vec![UidLookup {
            group: "handle".to_string(),
            columns: vec!["name".to_string()],
            paths: vec!["name".to_string()],
            key_scalar: Some(ScalarType::String),
        }],
        enums: Vec::new(),
        junctions: Vec::new(),
        insert: InsertPlan {
            columns: vec![0, 1, 2],
        },
        update: UpdatePlan {
            key: vec![0],
            set: vec![1, 2],
        },
        operations: Operation::all().into_iter().collect(),
        backends: BTreeSet::new(),
        mask_field: None,
    }
}

#[test]
fn output_parses_as_a_rust_file() {
    let tokens = generate(&user_plan());
    assert!(syn::parse2::<syn::File>(tokens).is_ok());
}

#[test]
fn statements_use_dollar_placeholders() {
    let text = generate(&user_plan()).to_string();

    assert!(text.contains("pub struct UserPostgresRepository"));
    assert!(text.contains(
        r#""INSERT INTO \"user\" (\"id\", \"name\", \"age\") VALUES ($1, $2, $3)""#
    ));
    assert!(text.contains("client : :: postgres :: Client"));
}

#[test]
fn unsigned_columns_bind_and_decode_through_signed_widths() {
    let text = generate(&user_plan()).to_string();

    assert!(text.contains("record . id as i64"));
    assert!(text.contains("record . age . map (| v | v as i32)"));
    assert!(text.contains("row . try_get :: < _ , i64 > (0usize) ? as u64"));
    assert!(
        text.contains("row . try_get :: < _ , :: std :: option :: Option < i32 > > (2usize) ? . map (| v | v as u32)")
    );
}

#[test]
fn filters_lower_with_the_postgres_dialect() {
    let text = generate(&user_plan()).to_string();

    assert!(text.contains(":: crudgen :: core :: lower :: Dialect :: Postgres"));
    assert!(text.contains("Value :: Uint (v) => :: std :: boxed :: Box :: new (v as i64)"));
}

#[test]
fn without_a_mask_field_records_always_batch() {
    let text = generate(&user_plan()).to_string();

    // mask() is None for every record, so the masked arm still compiles
    // but the record struct carries no mask storage
    assert!(!text.contains("pub mask :"));
    assert!(text.contains(":: std :: option :: Option :: None => { tx . execute (Self :: INSERT"));
}

#[test]
fn masked_arms_box_their_parameter_values() {
    let mut plan = user_plan();
    plan.mask_field = Some("mask".to_string());
    let text = generate(&plan).to_string();

    // cast binds are owned values; a reference to a statement-local cast
    // would not live until the execute call
    assert!(text.contains("params . push (:: std :: boxed :: Box :: new (record . id as i64))"));
    assert!(
        text.contains("params . push (:: std :: boxed :: Box :: new (record . age . map (| v | v as i32)))")
    );
    assert!(!text.contains("params . push (& ("));
    assert!(!text.contains("params . push (& record"));
    assert!(text.contains("tx . execute (& sql , refs . as_slice ())"));
}

#[test]
fn uid_lookups_query_with_a_typed_key() {
    let text = generate(&user_plan()).to_string();

    assert!(text.contains("pub fn read_by_handle (& mut self , value : & str)"));
    assert!(text.contains(r#"WHERE \"name\" = $1"#));
}

#[test]
fn ddl_is_the_postgres_dialect_rendering() {
    let text = ddl(&user_plan());

    assert!(text.contains("\"id\" BIGINT NOT NULL"));
    assert!(text.contains("\"age\" INTEGER"));
}
