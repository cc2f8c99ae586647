//! Tests for the safety flag set.

use safety_oracle::{ParseSafetyError, Safety, SafetyFlags};

#[test]
fn union_is_commutative_and_idempotent() {
    let a = Safety::MemSafe | Safety::TimeSafe;
    let b = SafetyFlags::from(Safety::CPUSafe);
    assert_eq!(a | b, b | a);
    assert_eq!(a | a, a);
}

#[test]
fn containment_is_subset() {
    let required = Safety::MemSafe | Safety::CPUSafe;
    let declared: SafetyFlags = Safety::ALL.into_iter().collect();
    assert!(declared.contains(required));
    assert!(!required.contains(declared));
    assert_eq!(declared, SafetyFlags::ALL);
}

#[test]
fn iteration_in_declaration_order() {
    let flags = Safety::IOSafe | Safety::MemSafe | Safety::TimeSafe;
    let order: Vec<Safety> = flags.iter().collect();
    assert_eq!(order, vec![Safety::MemSafe, Safety::TimeSafe, Safety::IOSafe]);
}

#[test]
fn insert_in_place() {
    let mut flags = SafetyFlags::empty();
    assert!(flags.is_empty());
    flags.insert(Safety::IOSafe);
    assert!(flags.has(Safety::IOSafe));
    assert_eq!(flags.to_string(), "IOSafe");
}

#[test]
fn parse_names() {
    assert_eq!(Safety::from_name("timesafe"), Ok(Safety::TimeSafe));
    assert_eq!(
        Safety::from_name("FastSafe"),
        Err(ParseSafetyError::UnknownFlag("FastSafe".to_string()))
    );
    let all = SafetyFlags::from_names(["MemSafe", "CPUSafe", "TimeSafe", "IOSafe"]).unwrap();
    assert_eq!(all, SafetyFlags::ALL);
}

#[test]
fn serde_round_trip() {
    let flags = Safety::MemSafe | Safety::IOSafe;
    let json = serde_json::to_string(&Safety::CPUSafe).unwrap();
    assert_eq!(json, "\"CPUSafe\"");
    let back: SafetyFlags = serde_json::from_str(&serde_json::to_string(&flags).unwrap()).unwrap();
    assert_eq!(back, flags);
}
