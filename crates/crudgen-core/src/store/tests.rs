use super::*;

///
/// Item
///
/// Hand-rolled stand-in for a generated message: primary key `id`, data
/// fields `data` and `count`, optional field mask.
///

#[derive(Clone, Debug, Default, PartialEq)]
struct Item {
    id: String,
    data: String,
    count: i64,
    mask: Option<FieldMask>,
}

impl Item {
    fn new(id: &str, data: &str, count: i64) -> Self {
        Self {
            id: id.into(),
            data: data.into(),
            count,
            mask: None,
        }
    }

    fn masked(mut self, paths: &[&str]) -> Self {
        self.mask = Some(FieldMask::new(paths.iter().copied()));
        self
    }
}

impl Record for Item {
    fn value_of(&self, field: &str) -> Option<Value> {
        match field {
            "id" => Some(Value::Text(self.id.clone())),
            "data" => Some(Value::Text(self.data.clone())),
            "count" => Some(Value::Int(self.count)),
            _ => None,
        }
    }

    fn copy_field(&mut self, from: &Self, field: &str) -> bool {
        match field {
            "id" => self.id = from.id.clone(),
            "data" => self.data = from.data.clone(),
            "count" => self.count = from.count,
            _ => return false,
        }
        true
    }

    fn mask(&self) -> Option<&FieldMask> {
        self.mask.as_ref()
    }
}

fn table() -> MemTable<Item> {
    MemTable::new(TableSpec::new("item", ["id", "data", "count"], ["id"]))
}

fn stored_without_masks(table: &MemTable<Item>) -> Vec<Item> {
    let mut rows = table.read(None).unwrap();
    for row in &mut rows {
        row.mask = None;
    }
    rows
}

#[test]
fn create_then_read_round_trips() {
    let mut t = table();
    let records = vec![Item::new("1", "a", 1), Item::new("2", "b", 2)];

    let stored = t.create(&records).unwrap();
    assert_eq!(stored, records);
    assert_eq!(t.read(None).unwrap(), records);
}

#[test]
fn duplicate_key_rolls_back_whole_batch() {
    let mut t = table();
    t.create(&[Item::new("1", "first", 1)]).unwrap();

    let err = t
        .create(&[Item::new("9", "fresh", 9), Item::new("1", "second", 2)])
        .unwrap_err();
    assert!(matches!(err, StoreError::DuplicateKey { .. }));

    // neither record of the failed batch landed, first insert survives
    assert_eq!(t.read(None).unwrap(), vec![Item::new("1", "first", 1)]);
}

#[test]
fn duplicate_key_within_one_batch_fails() {
    let mut t = table();

    let err = t
        .create(&[Item::new("1", "a", 1), Item::new("1", "b", 2)])
        .unwrap_err();
    assert!(matches!(err, StoreError::DuplicateKey { .. }));
    assert!(t.is_empty());
}

#[test]
fn masked_create_only_persists_selected_fields() {
    let mut t = table();
    let record = Item::new("1", "a", 7).masked(&["id", "data"]);

    t.create(&[record]).unwrap();

    let rows = stored_without_masks(&t);
    // count was outside the mask, so the stored row carries the default
    assert_eq!(rows, vec![Item::new("1", "a", 0)]);
}

#[test]
fn update_respects_field_mask_isolation() {
    let mut t = table();
    t.create(&[Item::new("1", "a", 1)]).unwrap();

    let patch = Item::new("1", "changed", 99).masked(&["data"]);
    t.update(&[patch]).unwrap();

    let rows = stored_without_masks(&t);
    // data changed, count is byte-for-byte untouched
    assert_eq!(rows, vec![Item::new("1", "changed", 1)]);
}

#[test]
fn update_with_empty_mask_selection_is_a_noop() {
    let mut t = table();
    t.create(&[Item::new("1", "a", 1)]).unwrap();

    let patch = Item::new("1", "changed", 99).masked(&["no_such_field"]);
    t.update(&[patch]).unwrap();

    assert_eq!(stored_without_masks(&t), vec![Item::new("1", "a", 1)]);
}

#[test]
fn update_never_implicitly_inserts() {
    let mut t = table();
    t.create(&[Item::new("1", "a", 1)]).unwrap();

    let updated = t.update(&[Item::new("404", "ghost", 0)]).unwrap();
    assert!(updated.is_empty());
    assert_eq!(stored_without_masks(&t), vec![Item::new("1", "a", 1)]);
}

#[test]
fn update_without_mask_rewrites_all_non_key_fields() {
    let mut t = table();
    t.create(&[Item::new("1", "a", 1)]).unwrap();

    t.update(&[Item::new("1", "b", 2)]).unwrap();
    assert_eq!(stored_without_masks(&t), vec![Item::new("1", "b", 2)]);
}

#[test]
fn delete_by_predicate_removes_matching_rows() {
    let mut t = table();
    t.create(&[Item::new("1", "a", 1), Item::new("2", "b", 2)])
        .unwrap();

    let removed = t
        .delete(Some(&Expr::field_eq("id", "1")))
        .unwrap();
    assert_eq!(removed, 1);
    assert_eq!(t.read(None).unwrap(), vec![Item::new("2", "b", 2)]);
}

#[test]
fn delete_without_predicate_clears_table() {
    let mut t = table();
    t.create(&[Item::new("1", "a", 1), Item::new("2", "b", 2)])
        .unwrap();

    assert_eq!(t.delete(None).unwrap(), 2);
    assert!(t.is_empty());
}

#[test]
fn read_filters_by_predicate() {
    let mut t = table();
    t.create(&[
        Item::new("1", "a", 1),
        Item::new("2", "b", 2),
        Item::new("3", "a", 3),
    ])
    .unwrap();

    let rows = t.read(Some(&Expr::field_eq("data", "a"))).unwrap();
    assert_eq!(rows, vec![Item::new("1", "a", 1), Item::new("3", "a", 3)]);
}

#[test]
fn missing_key_value_is_an_error() {
    #[derive(Clone, Debug, Default)]
    struct NoKey;

    impl Record for NoKey {
        fn value_of(&self, _field: &str) -> Option<Value> {
            None
        }
        fn copy_field(&mut self, _from: &Self, _field: &str) -> bool {
            false
        }
        fn mask(&self) -> Option<&FieldMask> {
            None
        }
    }

    let mut t: MemTable<NoKey> = MemTable::new(TableSpec::new("nokey", ["id"], ["id"]));
    let err = t.create(&[NoKey]).unwrap_err();
    assert!(matches!(err, StoreError::MissingKeyValue { .. }));
}

#[test]
fn update_without_unique_identifier_is_a_modeling_error() {
    let mut t: MemTable<Item> =
        MemTable::new(TableSpec::new("item", ["id", "data"], Vec::<String>::new()));
    let err = t.update(&[Item::new("1", "a", 1)]).unwrap_err();
    assert!(matches!(err, StoreError::NoUniqueIdentifier { .. }));
}

#[test]
fn update_without_non_key_fields_is_a_modeling_error() {
    let mut t: MemTable<Item> = MemTable::new(TableSpec::new("item", ["id"], ["id"]));
    let err = t.update(&[Item::new("1", "a", 1)]).unwrap_err();
    assert!(matches!(err, StoreError::NothingToUpdate { .. }));
}

#[test]
fn create_without_fields_is_a_modeling_error() {
    let mut t: MemTable<Item> = MemTable::new(TableSpec::new(
        "item",
        Vec::<String>::new(),
        Vec::<String>::new(),
    ));
    let err = t.create(&[Item::new("1", "a", 1)]).unwrap_err();
    assert!(matches!(err, StoreError::NothingToPersist { .. }));
}

#[test]
fn keyed_delete_leaves_other_rows_readable() {
    // Create two, delete one by key equality, read back the survivor.
    let mut t = table();
    t.create(&[Item::new("1", "a", 0), Item::new("2", "b", 0)])
        .unwrap();
    t.delete(Some(&Expr::equal(Expr::ident("id"), Expr::scalar("1"))))
        .unwrap();

    assert_eq!(t.read(None).unwrap(), vec![Item::new("2", "b", 0)]);
}
