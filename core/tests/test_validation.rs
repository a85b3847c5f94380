mod common;

use cropadvisor_core::validation::{parse_number, validate_field};
use cropadvisor_core::{validate, SoilField};

#[test]
fn valid_form_builds_sample() {
    let sample = validate(&common::valid_form()).expect("valid form");
    assert_eq!(sample, common::sample());
}

#[test]
fn out_of_range_names_only_that_field() {
    let mut form = common::valid_form();
    form.n = "301".into();
    let err = validate(&form).unwrap_err();
    assert_eq!(err.fields().len(), 1);
    assert!(err.message_for(SoilField::N).unwrap().contains("between"));
    assert!(err.message_for(SoilField::P).is_none());
}

#[test]
fn bounds_are_inclusive() {
    for (field, ok, bad) in [
        (SoilField::P, "300", "300.01"),
        (SoilField::Temperature, "-10", "-10.5"),
        (SoilField::Temperature, "60", "61"),
        (SoilField::Humidity, "0", "-1"),
        (SoilField::Ph, "14", "14.1"),
        (SoilField::Rainfall, "4000", "4001"),
    ] {
        assert!(validate_field(field, ok).is_ok(), "{:?} {}", field, ok);
        assert!(validate_field(field, bad).is_err(), "{:?} {}", field, bad);
    }
}

#[test]
fn at_most_two_decimal_places() {
    assert!(parse_number(SoilField::Temperature, "12.345").is_err());
    assert_eq!(parse_number(SoilField::Temperature, "12.34"), Ok(12.34));
    assert_eq!(parse_number(SoilField::Temperature, "12"), Ok(12.0));
}

#[test]
fn empty_and_non_numeric_messages() {
    let mut form = common::valid_form();
    form.humidity = "   ".into();
    form.ph = "abc".into();
    form.location = String::new();
    let err = validate(&form).unwrap_err();
    assert!(err.message_for(SoilField::Humidity).unwrap().contains("required"));
    assert!(err.message_for(SoilField::Ph).unwrap().contains("number"));
    assert!(err.message_for(SoilField::Location).unwrap().contains("required"));
    assert_eq!(err.fields().len(), 3);
}

#[test]
fn location_length_is_capped() {
    assert!(validate_field(SoilField::Location, &"a".repeat(100)).is_ok());
    assert!(validate_field(SoilField::Location, &"a".repeat(101)).is_err());
}
