//! Tagged JSON encoding and decoding of record graphs.

use crate::common::fixtures::{Kennel, frank, student};
use crate::common::init_logging;
use serde_json::json;
use valley::{
    CodecConfig, JsonDecoder, JsonEncoder, Resolved, StorageStrategy, TypeRegistry, Value,
    ValleyError,
};

#[test]
fn test_troop_encodes_nested_tagged_objects() {
    let kennel = Kennel::new();
    let json = JsonEncoder::default().encode_record(&kennel.durham()).unwrap();
    assert_eq!(
        json,
        json!({
            "_type": "kennel.Troop",
            "name": "Durham",
            "primary_breed": {"_type": "kennel.Breed", "name": "Cocker Spaniel"},
            "dogs": [
                {
                    "_type": "kennel.Dog",
                    "name": "Bruno",
                    "breed": {"_type": "kennel.Breed", "name": "Cocker Spaniel"},
                },
                {
                    "_type": "kennel.Dog",
                    "name": "Blitz",
                    "breed": {"_type": "kennel.Breed", "name": "Cockapoo"},
                },
            ],
        })
    );
}

#[test]
fn test_troop_round_trip_rebuilds_concrete_types() {
    init_logging();
    let kennel = Kennel::new();
    let types = kennel.types();
    let original = kennel.durham();

    let text = JsonEncoder::default()
        .encode_str(&Value::from(original.clone()))
        .unwrap();
    let decoded = JsonDecoder::new(&types).decode_record_str(&text).unwrap();

    assert_eq!(decoded, original);
    assert_eq!(decoded.schema().name(), "Troop");
    let dogs = decoded.get("dogs").unwrap();
    let dogs = dogs.as_list().unwrap();
    assert_eq!(dogs.len(), 2);
    for dog in dogs {
        let dog = dog.as_record().expect("dogs decode as records");
        assert_eq!(dog.schema().qualified_name(), "kennel.Dog");
        let breed = dog.get("breed").unwrap();
        assert_eq!(breed.as_record().unwrap().schema().name(), "Breed");
    }
}

#[test]
fn test_decoded_graph_validates() {
    let kennel = Kennel::new();
    let types = kennel.types();
    let text = JsonEncoder::default()
        .encode_str(&Value::from(kennel.durham()))
        .unwrap();
    let mut decoded = JsonDecoder::new(&types).decode_record_str(&text).unwrap();
    decoded.validate().unwrap();
    assert!(decoded.is_valid());
}

#[test]
fn test_encoding_is_idempotent() {
    let kennel = Kennel::new();
    let types = kennel.types();
    let encoder = JsonEncoder::default();

    let first = encoder.encode_str(&Value::from(kennel.durham())).unwrap();
    let decoded = JsonDecoder::new(&types).decode_str(&first).unwrap();
    let second = encoder.encode_str(&decoded).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_student_scalars_round_trip() {
    let schema = student();
    let types = TypeRegistry::new().with(&schema);
    let original = frank(&schema);

    let json = JsonEncoder::default().encode_record(&original).unwrap();
    assert_eq!(json["date"], "2017-01-10");
    assert_eq!(json["datetime"], "2017-01-10T12:00:00Z");
    assert_eq!(json["gpa"], 3.0);
    assert_eq!(json["active"], false);
    assert_eq!(json["_type"], "school.Student");

    let decoded = JsonDecoder::new(&types)
        .decode_record_str(&json.to_string())
        .unwrap();
    assert_eq!(decoded, original);
}

#[test]
fn test_decoded_integer_name_is_rejected() {
    let kennel = Kennel::new();
    let types = kennel.types();
    let mut dog = JsonDecoder::new(&types)
        .decode_record_str(r#"{"_type": "kennel.Dog", "name": 42}"#)
        .unwrap();
    assert_eq!(dog.get("name").unwrap(), Value::Integer(42));
    for _ in 0..2 {
        dog.validate().unwrap();
        assert!(!dog.is_valid());
        assert_errors!(dog, {
            "breed" => "breed is required and cannot be empty.",
            "name" => "name must be a string.",
        });
    }
}

#[test]
fn test_missing_fields_fall_back_to_defaults() {
    let kennel = Kennel::new();
    let types = kennel.types();
    let mut dog = JsonDecoder::new(&types)
        .decode_record_str(r#"{"_type": "kennel.Dog", "name": "Stray"}"#)
        .unwrap();
    assert_eq!(dog.get("breed").unwrap(), Value::Null);

    dog.validate().unwrap();
    assert_errors!(dog, {"breed" => "breed is required and cannot be empty."});
}

#[test]
fn test_unknown_type_tag() {
    let kennel = Kennel::new();
    let types = kennel.types();
    let err = JsonDecoder::new(&types)
        .decode_str(r#"{"dogs": [{"_type": "kennel.Wolf", "name": "Grey"}]}"#)
        .unwrap_err();
    assert!(matches!(err, ValleyError::TypeResolution { .. }));
}

#[test]
fn test_malformed_json() {
    let types = TypeRegistry::new();
    let err = JsonDecoder::new(&types).decode_str("{not json").unwrap_err();
    assert!(matches!(err, ValleyError::Json(_)));
}

#[test]
fn test_custom_type_key() {
    let kennel = Kennel::new();
    let types = kennel.types();
    let config: CodecConfig = serde_json::from_value(json!({"type_key": "@type"})).unwrap();

    let encoder = JsonEncoder::new(config.clone());
    let text = encoder.encode_str(&Value::from(kennel.bruno())).unwrap();
    assert!(text.contains(r#""@type":"kennel.Dog""#));
    assert!(!text.contains("_type"));

    let decoded = JsonDecoder::with_config(&types, config)
        .decode_record_str(&text)
        .unwrap();
    assert_eq!(decoded, kennel.bruno());
}

#[test]
fn test_untagged_encoding_for_known_receiver() {
    let kennel = Kennel::new();
    let types = kennel.types();
    let text = JsonEncoder::untagged()
        .encode_str(&Value::from(kennel.breed_named("Pug")))
        .unwrap();
    assert_eq!(text, r#"{"name":"Pug"}"#);

    let breed = JsonDecoder::with_config(&types, CodecConfig::untagged())
        .decode_as(&kennel.breed, &text)
        .unwrap();
    assert_eq!(breed, kennel.breed_named("Pug"));
}

#[test]
fn test_flat_text_storage_in_codec() {
    let schema = valley::SchemaType::builder("Profile")
        .field("tags", valley::Property::list())
        .build()
        .unwrap();
    let types = TypeRegistry::new().with(&schema);
    let config = CodecConfig::default().with_storage(StorageStrategy::FlatText);
    let record = valley::Record::new(&schema, [("tags", vec!["a", "b"])]);

    let text = JsonEncoder::new(config.clone())
        .encode_str(&Value::from(record.clone()))
        .unwrap();
    assert!(text.contains(r#""tags":"[\"a\",\"b\"]""#));

    // construction parses the flat text back into a list
    let decoded = JsonDecoder::with_config(&types, config)
        .decode_record_str(&text)
        .unwrap();
    assert_eq!(decoded, record);
}

#[test]
fn test_dynamic_lookup() {
    let kennel = Kennel::new();
    let types = kennel.types();
    assert_eq!(types.len(), 4);
    match types.resolve("kennel.Troop.dogs").unwrap() {
        Resolved::Property(property) => {
            assert!(property.validate(&Value::from("x"), "dogs").is_err());
        }
        other => panic!("Expected a property, got {other:?}"),
    }
    assert!(matches!(
        types.resolve("kennel.Breed").unwrap(),
        Resolved::Schema(_)
    ));
}
