//! Field registry merge and inherited type-level settings.

use crate::common::fixtures::{Kennel, student, student_b};
use valley::{Property, PropertyKind, Record, SchemaType, ValidationError, Value, ValleyError};

#[test]
fn test_ancestor_fields_are_inherited() {
    let kennel = Kennel::new();
    for schema in [&kennel.breed, &kennel.dog, &kennel.troop] {
        assert!(schema.registry().contains("name"), "{schema:?} lost name");
    }
    let names: Vec<&str> = kennel.troop.registry().names().collect();
    assert_eq!(names, vec!["dogs", "primary_breed", "name"]);
}

#[test]
fn test_grandchild_sees_every_ancestor() {
    let base = student();
    let child = student_b(&base);
    let grandchild = SchemaType::builder("Graduate")
        .extends(&child)
        .field("thesis", Property::string())
        .build()
        .unwrap();

    for name in base.registry().names() {
        assert!(grandchild.registry().contains(name));
    }
    assert_eq!(grandchild.registry().len(), base.registry().len() + 1);
}

#[test]
fn test_redeclared_field_overrides_ancestor() {
    let base = student();
    let child = SchemaType::builder("Toddler")
        .extends(&base)
        .field("age", Property::integer().min_value(1).max_value(3))
        .build()
        .unwrap();

    let mut record = Record::new(&child, crate::common::fixtures::frank_args());
    record.validate().unwrap();
    assert_errors!(record, {"age" => "age must not be greater than 3."});

    // the base keeps its own descriptor
    let mut original = crate::common::fixtures::frank(&base);
    original.validate().unwrap();
    assert!(original.is_valid());
}

#[test]
fn test_multiple_bases_merge_in_order() {
    let named = SchemaType::builder("Named")
        .field("name", Property::string())
        .build()
        .unwrap();
    let counted = SchemaType::builder("Counted")
        .field("name", Property::integer())
        .field("count", Property::integer())
        .build()
        .unwrap();
    let both = SchemaType::builder("Both")
        .extends(&named)
        .extends(&counted)
        .build()
        .unwrap();

    let names: Vec<&str> = both.registry().names().collect();
    assert_eq!(names, vec!["name", "count"]);
    assert_eq!(both.field("name").unwrap().kind(), &PropertyKind::String);
}

#[test]
fn test_collect_mode_is_inherited_and_overridable() {
    let kennel = Kennel::new();
    assert!(kennel.name_schema.collects_errors());
    assert!(kennel.dog.collects_errors());

    let base = student();
    assert!(base.collects_errors());
    assert!(!student_b(&base).collects_errors());

    let plain = SchemaType::builder("Plain").build().unwrap();
    assert!(!plain.collects_errors());
}

#[test]
fn test_subtype_satisfies_foreign_field() {
    let kennel = Kennel::new();
    let show_breed = SchemaType::builder("ShowBreed")
        .qualifier("kennel")
        .extends(&kennel.breed)
        .field("champion", Property::boolean())
        .build()
        .unwrap();
    assert!(show_breed.is_a("kennel.Breed"));
    assert!(show_breed.is_a("kennel.NameSchema"));
    assert!(!kennel.breed.is_a("kennel.ShowBreed"));

    let champion = Record::new(&show_breed, [("name", "Spaniel")]);
    let mut dog = kennel.dog_named("Rex", champion);
    dog.validate().unwrap();
    assert!(dog.is_valid());
}

#[test]
fn test_self_referencing_schema() {
    let person = SchemaType::builder("Person")
        .qualifier("family")
        .collect_errors(true)
        .field("name", Property::string().required(true))
        .field("parent", Property::foreign("family.Person"))
        .build()
        .unwrap();
    let parent = Record::new(&person, [("name", "Ada")]);
    let mut child = Record::new(
        &person,
        [("name", Value::from("Byron")), ("parent", Value::from(parent))],
    );
    child.validate().unwrap();
    assert!(child.is_valid());

    child.set("parent", "Ada");
    child.validate().unwrap();
    assert_errors!(child, {"parent" => "parent must be an instance of Person."});
}

#[test]
fn test_hooks_are_inherited() {
    let base = SchemaType::builder("Account")
        .collect_errors(true)
        .field("username", Property::string().required(true))
        .field("password", Property::string().required(true))
        .hook("password", |record, value| {
            if record.get("username").ok().as_ref() == Some(value) {
                Err(ValidationError::custom(
                    "password",
                    "password must differ from username.",
                ))
            } else {
                Ok(())
            }
        })
        .build()
        .unwrap();
    let admin = SchemaType::builder("Admin")
        .extends(&base)
        .field("level", Property::integer())
        .build()
        .unwrap();

    let mut record = Record::new(
        &admin,
        [("username", Value::from("root")), ("password", Value::from("root"))],
    );
    record.validate().unwrap();
    assert_errors!(record, {"password" => "password must differ from username."});
}

#[test]
fn test_type_attributes_and_builtins() {
    let base = SchemaType::builder("Document")
        .attribute("collection", "documents")
        .builtin_attr("_id")
        .field("title", Property::string())
        .build()
        .unwrap();
    let memo = SchemaType::builder("Memo")
        .extends(&base)
        .attribute("collection", "memos")
        .build()
        .unwrap();

    let record = Record::new(
        &memo,
        [("title", Value::from("Lunch")), ("_id", Value::from(42))],
    );
    assert_eq!(record.get("collection").unwrap(), Value::from("memos"));
    assert_eq!(record.get("_id").unwrap(), Value::from(42));
    assert_eq!(
        Record::new(&base, [("title", "x")]).get("collection").unwrap(),
        Value::from("documents")
    );
    assert!(matches!(
        record.get("author"),
        Err(ValleyError::AttributeNotFound { .. })
    ));
}

#[test]
fn test_field_attribute_collision_is_rejected() {
    let err = SchemaType::builder("Clash")
        .field("title", Property::string())
        .attribute("title", "oops")
        .build()
        .unwrap_err();
    assert!(matches!(err, ValleyError::Configuration { .. }));
}
