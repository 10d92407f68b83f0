use serde_json::Value;

/// Keys the links hash must carry. Extra keys are ignored.
pub const RECOGNIZED_LINK_KEYS: [&str; 2] = ["funder", "sample_plan"];

/// Validates a candidate `links` value against the object-links schema.
/// Returns the ordered list of human-readable messages; an empty list means
/// the value is valid. Never panics on malformed input.
#[must_use]
pub fn validate_links(value: &Value) -> Vec<String> {
    let Some(map) = value.as_object() else {
        // Nothing else is checkable against a non-mapping value.
        return vec!["A hash is expected for links".to_string()];
    };

    let mut errors = Vec::new();
    for key in RECOGNIZED_LINK_KEYS {
        if !map.contains_key(key) {
            errors.push(format!("A key {key} is expected for links hash"));
        }
    }
    for key in RECOGNIZED_LINK_KEYS {
        if let Some(entries) = map.get(key)
            && !is_object_link_list(entries)
        {
            // One message per offending key, not per offending entry.
            errors.push(format!(
                "The key {key} does not have a valid set of object links"
            ));
        }
    }
    errors
}

fn is_object_link_list(value: &Value) -> bool {
    let Some(entries) = value.as_array() else {
        return false;
    };
    entries.iter().all(|entry| {
        entry
            .as_object()
            .is_some_and(|record| record.contains_key("link") && record.contains_key("text"))
    })
}
