//! Fuzz target for identifier quoting and constraint naming.
//!
//! This fuzzer tests that:
//! 1. Quoted identifiers always round-trip their closing brackets
//! 2. Generated foreign key names never exceed the identifier limit

#![no_main]

use libfuzzer_sys::fuzz_target;
use tighten::opportunity::sql::{foreign_key_name, quote_identifier, MAX_IDENTIFIER_LENGTH};

fuzz_target!(|data: &[u8]| {
    let input = String::from_utf8_lossy(data);
    let mut parts = input.splitn(3, '\u{0}');
    let table = parts.next().unwrap_or_default();
    let column = parts.next().unwrap_or_default();
    let target = parts.next().unwrap_or_default();

    let quoted = quote_identifier(table);
    assert!(quoted.starts_with('[') && quoted.ends_with(']'));
    let inner = &quoted[1..quoted.len() - 1];
    assert_eq!(inner.replace("]]", "]"), table);

    let name = foreign_key_name(table, column, target);
    assert!(name.chars().count() <= MAX_IDENTIFIER_LENGTH);
    assert!(name.starts_with("FK_"));
});
