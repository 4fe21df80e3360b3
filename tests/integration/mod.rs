//! Integration tests across the schema, record and codec modules.

pub mod codec_round_trip;
pub mod property_tests;
