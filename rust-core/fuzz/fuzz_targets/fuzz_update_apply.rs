// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Fuzz target for update parsing and application.
// Run with: cargo +nightly fuzz run fuzz_update_apply
//
// Applying any accepted update must leave `_id` and `_created` untouched.

#![no_main]

use jdb_store::{Document, Update};
use libfuzzer_sys::fuzz_target;
use serde_json::{json, Value};

fuzz_target!(|data: &[u8]| {
    if data.len() > 4096 {
        return;
    }
    let Ok(raw) = serde_json::from_slice::<Value>(data) else {
        return;
    };
    let Ok(update) = Update::parse(&raw) else {
        return;
    };

    let mut document: Document = serde_json::from_value(json!({
        "_id": "fuzz",
        "_created": 1,
        "_updated": 1,
        "count": 9007199254740993u64,
        "list": [1, "x", null]
    }))
    .unwrap();
    update.apply(&mut document);

    assert_eq!(document.id(), "fuzz");
    assert_eq!(document.created(), Some(1));
});
