//! Property-based tests for validation and codec invariants.
//!
//! These tests generate arbitrary names, ages and record graphs and check
//! that length/range boundaries, defaults and the codec round trip hold for
//! all of them.

use crate::common::fixtures::{Kennel, student};
use proptest::prelude::*;
use valley::{JsonDecoder, JsonEncoder, Property, Record, SchemaType, Value};

fn name_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z][A-Za-z ]{0,29}"
}

prop_compose! {
    fn troop_strategy()
        (troop_name in "[A-Za-z]{1,12}",
         dogs in prop::collection::vec(("[A-Za-z]{1,12}", "[A-Za-z ]{1,20}"), 0..5),
         primary in proptest::option::of("[A-Za-z]{1,12}"))
        -> (String, Vec<(String, String)>, Option<String>) {
        (troop_name, dogs, primary)
    }
}

proptest! {
    #[test]
    fn test_name_length_boundaries(name in name_strategy()) {
        let schema = student();
        let mut record = crate::common::fixtures::frank(&schema);
        record.set("name", name.clone());
        record.validate().unwrap();

        let len = name.chars().count();
        let expected = if len < 5 {
            Some("name must not be shorter than 5 characters.")
        } else if len > 20 {
            Some("name must not be longer than 20 characters.")
        } else {
            None
        };
        prop_assert_eq!(record.errors().get("name").map(String::as_str), expected);
        prop_assert_eq!(record.is_valid(), expected.is_none());
    }

    #[test]
    fn test_age_range(age in -50i64..100) {
        let schema = student();
        let mut record = crate::common::fixtures::frank(&schema);
        record.set("age", age);
        record.validate().unwrap();
        prop_assert_eq!(record.is_valid(), (5..=18).contains(&age));
    }

    #[test]
    fn test_numeric_strings_match_integers(age in 5i64..=18) {
        let schema = student();
        let mut as_int = crate::common::fixtures::frank(&schema);
        as_int.set("age", age);
        let mut as_text = crate::common::fixtures::frank(&schema);
        as_text.set("age", age.to_string());

        as_int.validate().unwrap();
        as_text.validate().unwrap();
        prop_assert!(as_text.is_valid());
        prop_assert_eq!(as_int.cleaned_data(), as_text.cleaned_data());
    }

    #[test]
    fn test_defaults_read_back(default in any::<i64>(), label in "[a-z]{0,10}") {
        let schema = SchemaType::builder("Counter")
            .field("count", Property::integer().default(default))
            .field("label", Property::string().default(label.clone()))
            .field("note", Property::string())
            .build()
            .unwrap();
        let record = Record::new(&schema, Vec::<(String, Value)>::new());
        prop_assert_eq!(record.get("count").unwrap(), Value::Integer(default));
        prop_assert_eq!(record.get("label").unwrap(), Value::from(label));
        prop_assert_eq!(record.get("note").unwrap(), Value::Null);
    }

    #[test]
    fn test_troop_round_trip((troop_name, dogs, primary) in troop_strategy()) {
        let kennel = Kennel::new();
        let types = kennel.types();
        let dogs: Vec<Record> = dogs
            .iter()
            .map(|(dog, breed)| kennel.dog_named(dog, kennel.breed_named(breed)))
            .collect();
        let troop = Record::new(
            &kennel.troop,
            [
                ("name", Value::from(troop_name)),
                ("dogs", Value::from(dogs)),
                ("primary_breed", Value::from(primary.map(|b| kennel.breed_named(&b)))),
            ],
        );

        let encoder = JsonEncoder::default();
        let text = encoder.encode_str(&Value::from(troop.clone())).unwrap();
        let decoded = JsonDecoder::new(&types).decode_str(&text).unwrap();

        prop_assert_eq!(decoded.as_record(), Some(&troop));
        prop_assert_eq!(encoder.encode_str(&decoded).unwrap(), text);
    }
}
