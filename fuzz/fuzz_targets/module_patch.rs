#![no_main]

//! Fuzz target for patch rules against a module list.
//!
//! The first line is read as a JSON rule list, the rest as module entries.
//! Applying the rules must never panic and must leave a parseable descriptor.

use camino::Utf8Path;
use libfuzzer_sys::fuzz_target;
use pomfold_domain::PatchApplier;
use pomfold_edit::{Document, Element};
use pomfold_types::rule::PatchRule;

fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };
    let (rules_line, entries) = s.split_once('\n').unwrap_or((s, ""));
    let Ok(rules) = serde_json::from_str::<Vec<PatchRule>>(rules_line) else {
        return;
    };
    let Ok(applier) = PatchApplier::new(rules) else {
        return;
    };

    let mut project = Element::new("project");
    let modules = project.ensure_section("modules");
    for entry in entries.lines() {
        modules.append_child("module", entry);
    }
    let mut doc = Document::new(project);

    applier
        .apply_rules(&mut doc, Utf8Path::new("pom.xml"))
        .expect("modules section is present");
    Document::parse(&doc.serialize()).expect("patched descriptor must parse");
});
