#![no_main]

//! Fuzz target for descriptor parsing.
//!
//! Arbitrary input must either be rejected or serialize to a fixpoint.

use libfuzzer_sys::fuzz_target;
use pomfold_edit::Document;

fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(doc) = Document::parse(s) else {
        return;
    };

    let first = doc.serialize();
    let reparsed = Document::parse(&first).expect("serializer output must parse");
    assert_eq!(reparsed.serialize(), first);
});
