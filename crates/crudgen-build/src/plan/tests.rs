use super::*;
use crudgen_schema::{
    analyze::analyze,
    descriptor::{
        CrudOptions, EnumDescriptor, EnumVariantDescriptor, FieldDescriptor, FieldOptions,
        FileDescriptor, MessageDescriptor, RelationOptions, TypeDescriptor,
    },
    node::FileId,
    types::{Cardinality, RelationKind},
};

fn field(name: &str, ty: TypeDescriptor, options: FieldOptions) -> FieldDescriptor {
    FieldDescriptor {
        name: name.to_string(),
        cardinality: Cardinality::One,
        ty,
        options,
    }
}

fn scalar(name: &str, ty: ScalarType) -> FieldDescriptor {
    field(name, TypeDescriptor::Scalar(ty), FieldOptions::default())
}

fn relation(name: &str, target: &str, kind: RelationKind) -> FieldDescriptor {
    field(
        name,
        TypeDescriptor::Named(target.to_string()),
        FieldOptions {
            relation: Some(RelationOptions { kind, target: None }),
            ..Default::default()
        },
    )
}

fn crud_with_pk(pk: &[&str]) -> CrudOptions {
    CrudOptions {
        primary_key: pk.iter().map(ToString::to_string).collect(),
        ..Default::default()
    }
}

fn file(messages: Vec<MessageDescriptor>, enums: Vec<EnumDescriptor>) -> FileDescriptor {
    FileDescriptor {
        name: "app.schema".to_string(),
        messages,
        enums,
        ..Default::default()
    }
}

fn plan_for(file: FileDescriptor, message: &str) -> Result<TablePlan, PlanError> {
    let registry = Registry::load(&[file]).unwrap();
    let ids: Vec<FileId> = registry.files().map(|(id, _)| id).collect();
    let analysis = analyze(&registry, &ids).unwrap();
    let id = registry.lookup_message("", message).unwrap();
    let model = analysis.model(id).unwrap();

    TablePlan::build(&registry, &analysis, model)
}

fn user_message() -> MessageDescriptor {
    MessageDescriptor {
        name: "User".to_string(),
        fields: vec![
            scalar("id", ScalarType::Uint64),
            scalar("name", ScalarType::String),
            FieldDescriptor {
                cardinality: Cardinality::Opt,
                ..scalar("age", ScalarType::Int32)
            },
            field(
                "created_at",
                TypeDescriptor::Scalar(ScalarType::Int64),
                FieldOptions {
                    timestamp: true,
                    ..Default::default()
                },
            ),
        ],
        crud: Some(crud_with_pk(&["id"])),
        ..Default::default()
    }
}

#[test]
fn scalar_message_plans_columns_key_and_update() {
    let plan = plan_for(file(vec![user_message()], vec![]), "User").unwrap();

    assert_eq!(plan.table, "user");
    assert_eq!(plan.key, vec!["id".to_string()]);

    let names: Vec<&str> = plan.columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, ["id", "name", "age", "created_at"]);

    assert!(plan.columns[0].primary);
    assert!(plan.columns[2].nullable);
    assert_eq!(plan.columns[3].ty, ColumnType::Timestamp);

    // insert covers everything, update rewrites everything but the key
    assert_eq!(plan.insert.columns, vec![0, 1, 2, 3]);
    assert_eq!(plan.update.key, vec![0]);
    assert_eq!(plan.update.set, vec![1, 2, 3]);
}

#[test]
fn ignored_fields_produce_no_columns() {
    let mut message = user_message();
    message.fields.push(field(
        "scratch",
        TypeDescriptor::Scalar(ScalarType::String),
        FieldOptions {
            ignore: true,
            ..Default::default()
        },
    ));

    let plan = plan_for(file(vec![message], vec![]), "User").unwrap();
    assert!(plan.columns.iter().all(|c| c.name != "scratch"));
}

#[test]
fn enum_fields_store_ordinals_with_a_lookup_table() {
    let status = EnumDescriptor {
        name: "Status".to_string(),
        variants: vec![
            EnumVariantDescriptor {
                name: "ACTIVE".to_string(),
                number: 0,
            },
            EnumVariantDescriptor {
                name: "SUSPENDED".to_string(),
                number: 1,
            },
        ],
    };
    let mut message = user_message();
    message.fields.push(field(
        "status",
        TypeDescriptor::Named("Status".to_string()),
        FieldOptions::default(),
    ));

    let plan = plan_for(file(vec![message], vec![status]), "User").unwrap();

    let column = plan.columns.iter().find(|c| c.name == "status").unwrap();
    assert_eq!(
        column.ty,
        ColumnType::Enum {
            lookup_table: "status_lookup".to_string()
        }
    );
    assert_eq!(plan.enums.len(), 1);
    assert_eq!(plan.enums[0].rows[1], (1, "SUSPENDED".to_string()));
}

#[test]
fn inlined_messages_flatten_into_prefixed_columns() {
    let address = MessageDescriptor {
        name: "Address".to_string(),
        fields: vec![scalar("city", ScalarType::String)],
        ..Default::default()
    };
    let profile = MessageDescriptor {
        name: "Profile".to_string(),
        fields: vec![
            scalar("bio", ScalarType::String),
            field(
                "address",
                TypeDescriptor::Named("Address".to_string()),
                FieldOptions {
                    inline: true,
                    ..Default::default()
                },
            ),
        ],
        ..Default::default()
    };
    let mut message = user_message();
    message.fields.push(field(
        "profile",
        TypeDescriptor::Named("Profile".to_string()),
        FieldOptions {
            inline: true,
            ..Default::default()
        },
    ));

    let plan = plan_for(file(vec![message, profile, address], vec![]), "User").unwrap();

    let bio = plan.columns.iter().find(|c| c.name == "profile_bio").unwrap();
    assert_eq!(bio.path, "profile.bio");
    assert_eq!(bio.field, "profile");

    let city = plan
        .columns
        .iter()
        .find(|c| c.name == "profile_address_city")
        .unwrap();
    assert_eq!(city.path, "profile.address.city");
    assert_eq!(city.field, "profile");
}

#[test]
fn inline_cycles_are_rejected() {
    let a = MessageDescriptor {
        name: "Alpha".to_string(),
        fields: vec![
            scalar("id", ScalarType::Uint64),
            field(
                "beta",
                TypeDescriptor::Named("Beta".to_string()),
                FieldOptions {
                    inline: true,
                    ..Default::default()
                },
            ),
        ],
        crud: Some(crud_with_pk(&["id"])),
        ..Default::default()
    };
    let b = MessageDescriptor {
        name: "Beta".to_string(),
        fields: vec![field(
            "alpha",
            TypeDescriptor::Named("Alpha".to_string()),
            FieldOptions {
                inline: true,
                ..Default::default()
            },
        )],
        ..Default::default()
    };

    let err = plan_for(file(vec![a, b], vec![]), "Alpha").unwrap_err();
    assert!(matches!(err, PlanError::InlineCycle { .. }));
}

#[test]
fn many_to_one_column_takes_the_target_key_type() {
    let post = MessageDescriptor {
        name: "Post".to_string(),
        fields: vec![
            scalar("id", ScalarType::Uint64),
            relation("author", "User", RelationKind::ManyToOne),
        ],
        crud: Some(crud_with_pk(&["id"])),
        ..Default::default()
    };

    let plan = plan_for(file(vec![post, user_message()], vec![]), "Post").unwrap();

    let author = plan.columns.iter().find(|c| c.field == "author").unwrap();
    assert_eq!(author.name, "author_id");
    assert_eq!(author.path, "author");
    assert_eq!(author.ty, ColumnType::Scalar(ScalarType::Uint64));
}

#[test]
fn one_to_many_stores_nothing_locally() {
    let mut user = user_message();
    user.fields
        .push(relation("posts", "Post", RelationKind::OneToMany));
    let post = MessageDescriptor {
        name: "Post".to_string(),
        fields: vec![scalar("id", ScalarType::Uint64)],
        crud: Some(crud_with_pk(&["id"])),
        ..Default::default()
    };

    let plan = plan_for(file(vec![user, post], vec![]), "User").unwrap();
    assert!(plan.columns.iter().all(|c| c.field != "posts"));
    assert!(plan.junctions.is_empty());
}

#[test]
fn many_to_many_plans_a_junction_table() {
    let mut user = user_message();
    user.fields
        .push(relation("tags", "Tag", RelationKind::ManyToMany));
    let tag = MessageDescriptor {
        name: "Tag".to_string(),
        fields: vec![scalar("id", ScalarType::Uint32)],
        crud: Some(crud_with_pk(&["id"])),
        ..Default::default()
    };

    let plan = plan_for(file(vec![user, tag], vec![]), "User").unwrap();

    assert!(plan.columns.iter().all(|c| c.field != "tags"));
    assert_eq!(plan.junctions.len(), 1);

    let junction = &plan.junctions[0];
    assert_eq!(junction.table, "user_tag");
    assert_eq!(junction.left_column, "user_id");
    assert_eq!(junction.left_ty, ColumnType::Scalar(ScalarType::Uint64));
    assert_eq!(junction.right_column, "tag_id");
    assert_eq!(junction.right_ty, ColumnType::Scalar(ScalarType::Uint32));
}

#[test]
fn relation_to_unpersisted_target_is_rejected() {
    let post = MessageDescriptor {
        name: "Post".to_string(),
        fields: vec![
            scalar("id", ScalarType::Uint64),
            relation("author", "User", RelationKind::ManyToOne),
        ],
        crud: Some(crud_with_pk(&["id"])),
        ..Default::default()
    };
    let user = MessageDescriptor {
        name: "User".to_string(),
        fields: vec![scalar("id", ScalarType::Uint64)],
        ..Default::default()
    };

    let err = plan_for(file(vec![post, user], vec![]), "Post").unwrap_err();
    assert!(matches!(err, PlanError::TargetNotPersisted { .. }));
}

#[test]
fn relation_to_composite_key_is_rejected() {
    let pair = MessageDescriptor {
        name: "Pair".to_string(),
        fields: vec![
            scalar("left", ScalarType::Uint64),
            scalar("right", ScalarType::Uint64),
        ],
        crud: Some(crud_with_pk(&["left", "right"])),
        ..Default::default()
    };
    let post = MessageDescriptor {
        name: "Post".to_string(),
        fields: vec![
            scalar("id", ScalarType::Uint64),
            relation("pair", "Pair", RelationKind::ManyToOne),
        ],
        crud: Some(crud_with_pk(&["id"])),
        ..Default::default()
    };

    let err = plan_for(file(vec![post, pair], vec![]), "Post").unwrap_err();
    match err {
        PlanError::CompositeForeignKey { key_fields, .. } => assert_eq!(key_fields, 2),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn column_map_indexes_columns_by_field_path() {
    let profile = MessageDescriptor {
        name: "Profile".to_string(),
        fields: vec![scalar("bio", ScalarType::String)],
        ..Default::default()
    };
    let mut message = user_message();
    message.fields.push(field(
        "profile",
        TypeDescriptor::Named("Profile".to_string()),
        FieldOptions {
            inline: true,
            ..Default::default()
        },
    ));

    let plan = plan_for(file(vec![message, profile], vec![]), "User").unwrap();
    let map = plan.column_map();

    assert_eq!(map.table(), "user");
    assert_eq!(map.column("name"), Some("name"));
    assert_eq!(map.column("profile.bio"), Some("profile_bio"));
    assert_eq!(map.column("profile"), None);
}

#[test]
fn masks_select_columns_by_covered_path() {
    let profile = MessageDescriptor {
        name: "Profile".to_string(),
        fields: vec![
            scalar("bio", ScalarType::String),
            scalar("city", ScalarType::String),
        ],
        ..Default::default()
    };
    let mut message = user_message();
    message.fields.push(field(
        "profile",
        TypeDescriptor::Named("Profile".to_string()),
        FieldOptions {
            inline: true,
            ..Default::default()
        },
    ));

    let plan = plan_for(file(vec![message, profile], vec![]), "User").unwrap();

    let named: Vec<&str> = plan
        .masked_columns(&FieldMask::new(["name", "profile.bio"]))
        .into_iter()
        .map(|i| plan.columns[i].name.as_str())
        .collect();
    assert_eq!(named, ["name", "profile_bio"]);

    // a parent path covers every flattened descendant
    let nested: Vec<&str> = plan
        .masked_columns(&FieldMask::new(["profile"]))
        .into_iter()
        .map(|i| plan.columns[i].name.as_str())
        .collect();
    assert_eq!(nested, ["profile_bio", "profile_city"]);

    // unknown paths select nothing at run time
    assert!(plan.masked_columns(&FieldMask::new(["nope"])).is_empty());

    // the key never appears in a masked update set
    let set: Vec<usize> = plan.masked_update_set(&FieldMask::new(["id", "name"]));
    assert_eq!(set, vec![1]);
}

#[test]
fn static_mask_paths_are_validated_strictly() {
    let plan = plan_for(file(vec![user_message()], vec![]), "User").unwrap();

    assert!(plan.validate_mask_paths(["name", "age"]).is_ok());

    let err = plan.validate_mask_paths(["name", "nope"]).unwrap_err();
    assert!(matches!(err, PlanError::UnknownMaskPath { ref path, .. } if path == "nope"));
}

#[test]
fn key_only_message_cannot_declare_update() {
    // a bare annotation defaults to all four operations, but every column
    // belongs to the key, so there is nothing an update could rewrite
    let marker = MessageDescriptor {
        name: "Marker".to_string(),
        fields: vec![scalar("id", ScalarType::Uint64)],
        crud: Some(crud_with_pk(&["id"])),
        ..Default::default()
    };

    let err = plan_for(file(vec![marker.clone()], vec![]), "Marker").unwrap_err();
    assert!(matches!(err, PlanError::NothingToUpdate { .. }));

    // dropping update from the operation set makes the message plannable
    let mut allowed = marker;
    allowed.crud.as_mut().unwrap().operations =
        [Operation::Create, Operation::Read, Operation::Delete]
            .into_iter()
            .collect();

    let plan = plan_for(file(vec![allowed], vec![]), "Marker").unwrap();
    assert!(plan.update.set.is_empty());
    assert!(!plan.operations.contains(&Operation::Update));
}

#[test]
fn message_without_storable_columns_cannot_declare_create() {
    let ghost = MessageDescriptor {
        name: "Ghost".to_string(),
        fields: vec![field(
            "scratch",
            TypeDescriptor::Scalar(ScalarType::String),
            FieldOptions {
                ignore: true,
                ..Default::default()
            },
        )],
        crud: Some(CrudOptions::default()),
        ..Default::default()
    };

    let err = plan_for(file(vec![ghost], vec![]), "Ghost").unwrap_err();
    assert!(matches!(err, PlanError::NothingToPersist { .. }));
}

#[test]
fn uid_lookups_lead_with_the_primary_group() {
    let mut message = user_message();
    message.fields.push(scalar("email", ScalarType::String));
    let crud = message.crud.as_mut().unwrap();
    crud.uid_groups
        .insert("email".to_string(), vec!["email".to_string()]);

    let plan = plan_for(file(vec![message], vec![]), "User").unwrap();

    assert_eq!(plan.uid_lookups.len(), 2);
    assert_eq!(plan.uid_lookups[0].group, PRIMARY_UID_GROUP);
    assert_eq!(plan.uid_lookups[0].key_scalar, Some(ScalarType::Uint64));
    assert_eq!(plan.uid_lookups[1].group, "email");
    assert_eq!(plan.uid_lookups[1].columns, vec!["email".to_string()]);
    assert_eq!(plan.uid_lookups[1].key_scalar, Some(ScalarType::String));
}
