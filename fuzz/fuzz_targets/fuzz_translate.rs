// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Fuzz target for the tokenizer and named-parameter translator.
// Run with: cargo +nightly fuzz run fuzz_translate

#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        if input.len() <= 4096 {
            let tokens = namedsql_lexer::tokenize(input);
            let rebuilt: String = tokens.iter().map(|t| t.text).collect();
            assert_eq!(rebuilt, input);

            if let Ok(stmt) = namedsql_core::translate(input) {
                assert!(stmt.parameter_names().is_empty()
                    || stmt.parameter_names().len() == stmt.parameter_count());
                let _ = stmt.couchbase();
            }
        }
    }
});
