// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Fuzz target for filter parsing and evaluation.
// Run with: cargo +nightly fuzz run fuzz_filter_parse
//
// Any JSON value must either parse into a filter or be rejected with an
// error, and a parsed filter must evaluate against a document without
// panicking.

#![no_main]

use jdb_store::{Document, Filter};
use libfuzzer_sys::fuzz_target;
use serde_json::{json, Value};

fuzz_target!(|data: &[u8]| {
    if data.len() > 4096 {
        return;
    }
    let Ok(raw) = serde_json::from_slice::<Value>(data) else {
        return;
    };

    let sample: Document = serde_json::from_value(json!({
        "_id": "fuzz",
        "name": "Alice",
        "age": 30,
        "score": 1.5,
        "tags": ["a", "b"],
        "meta": {"nested": null}
    }))
    .unwrap();

    for strict in [false, true] {
        if let Ok(filter) = Filter::parse_with(&raw, strict) {
            let _ = filter.matches(&sample);
        }
    }
});
