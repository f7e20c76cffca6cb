// SPDX-License-Identifier: AGPL-3.0-or-later
//! Fuzz target for request path decoding and normalization

#![no_main]

use hfs_core::path::ResourcePath;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(path) = ResourcePath::from_url_path(input) {
        for segment in &path.segments {
            assert!(!segment.is_empty());
            assert!(segment != "." && segment != "..");
            assert!(!segment.contains(['/', '\\', '\0']));
        }

        // The printed form parses back to the same path
        let printed = path.to_path_string();
        assert!(printed.starts_with('/'));
        if let Ok(reparsed) = ResourcePath::new(&printed) {
            assert_eq!(reparsed, path);
        }

        let _ = path.name();
        if let Some(parent) = path.parent() {
            assert_eq!(parent.segments.len() + 1, path.segments.len());
        }

        if let Some((_, tail)) = input.split_once('/') {
            let _ = path.join(tail);
        }
    }
});
