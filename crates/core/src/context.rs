//! Flattening slide text into the context string handed to the model.

use crate::{Error, Result, SlideContentMap};
use serde_json::Value;
use std::collections::BTreeMap;

/// Why an entry was left out of the context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The key is not a positive integer page number.
    InvalidPageNumber,
    /// The value is not a string.
    NonTextContent,
    /// Another key already named the same page, e.g. `"01"` after `"1"`.
    DuplicatePageNumber,
}

/// A map entry that was rejected while building the context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEntry {
    /// The key as it appeared in the input.
    pub key: String,
    pub reason: SkipReason,
}

/// The assembled context plus diagnostics for any skipped entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextBuild {
    pub context: String,
    pub skipped: Vec<SkippedEntry>,
}

/// Render a single page section.
fn push_page(context: &mut String, page_number: u32, text: &str) {
    context.push_str("### Page-");
    context.push_str(&page_number.to_string());
    context.push('\n');
    context.push_str(text.trim());
    context.push_str("\n\n");
}

fn finish(context: String, skipped: Vec<SkippedEntry>) -> Result<ContextBuild> {
    for entry in &skipped {
        log::debug!("Skipping invalid content for Page-{} ({:?})", entry.key, entry.reason);
    }
    if context.trim().is_empty() {
        return Err(Error::NoValidContent);
    }
    Ok(ContextBuild { context, skipped })
}

/// Build the context string from a typed slide map.
///
/// Pages are emitted in ascending order as `### Page-<n>` followed by the
/// trimmed page text and a blank line.
pub fn build_context(pages: &SlideContentMap) -> Result<ContextBuild> {
    if pages.is_empty() {
        return Err(Error::InvalidInput(
            "slide content must be a non-empty mapping".to_string(),
        ));
    }

    let mut context = String::new();
    let mut skipped = Vec::new();
    for (page_number, text) in pages.iter() {
        if page_number == 0 {
            skipped.push(SkippedEntry {
                key: page_number.to_string(),
                reason: SkipReason::InvalidPageNumber,
            });
            continue;
        }
        push_page(&mut context, page_number, text);
    }

    finish(context, skipped)
}

/// Build the context string from loosely-typed JSON.
///
/// The value must be a non-empty object. Keys that do not parse as positive
/// integers, values that are not strings, and keys naming a page that was
/// already seen are skipped and reported.
pub fn build_context_from_value(value: &Value) -> Result<ContextBuild> {
    let object = match value {
        Value::Object(map) if !map.is_empty() => map,
        _ => {
            return Err(Error::InvalidInput(
                "slide content must be a non-empty mapping".to_string(),
            ))
        }
    };

    let mut valid: BTreeMap<u32, &str> = BTreeMap::new();
    let mut skipped = Vec::new();
    for (key, entry) in object {
        let page_number = key.trim().parse::<u32>().ok().filter(|n| *n > 0);
        match (page_number, entry.as_str()) {
            (Some(n), Some(_)) if valid.contains_key(&n) => skipped.push(SkippedEntry {
                key: key.clone(),
                reason: SkipReason::DuplicatePageNumber,
            }),
            (Some(n), Some(text)) => {
                valid.insert(n, text);
            }
            (None, _) => skipped.push(SkippedEntry {
                key: key.clone(),
                reason: SkipReason::InvalidPageNumber,
            }),
            (Some(_), None) => skipped.push(SkippedEntry {
                key: key.clone(),
                reason: SkipReason::NonTextContent,
            }),
        }
    }
    let mut context = String::new();
    for (page_number, text) in valid {
        push_page(&mut context, page_number, text);
    }

    finish(context, skipped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn header_numbers(context: &str) -> Vec<u32> {
        context
            .lines()
            .filter_map(|l| l.strip_prefix("### Page-"))
            .map(|n| n.parse().unwrap())
            .collect()
    }

    #[test]
    fn test_formats_pages() {
        let pages: SlideContentMap = vec![
            (1, "\nHello".to_string()),
            (2, "\nWorld  ".to_string()),
        ]
        .into_iter()
        .collect();
        let built = build_context(&pages).unwrap();
        assert_eq!(built.context, "### Page-1\nHello\n\n### Page-2\nWorld\n\n");
        assert!(built.skipped.is_empty());
    }

    #[test]
    fn test_orders_pages_regardless_of_insertion_order() {
        let mut pages = SlideContentMap::new();
        for n in [7, 3, 11, 1, 5] {
            pages.append(n, &format!("slide {n}"));
        }
        let built = build_context(&pages).unwrap();
        assert_eq!(header_numbers(&built.context), vec![1, 3, 5, 7, 11]);
    }

    #[test]
    fn test_json_keys_sorted_numerically() {
        let value = json!({ "10": "ten", "2": "two", "1": "one" });
        let built = build_context_from_value(&value).unwrap();
        assert_eq!(header_numbers(&built.context), vec![1, 2, 10]);
    }

    #[test]
    fn test_empty_map_is_invalid_input() {
        let err = build_context(&SlideContentMap::new()).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));

        let err = build_context_from_value(&json!({})).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_non_mapping_is_invalid_input() {
        for value in [json!(["a", "b"]), json!("text"), json!(3), Value::Null] {
            let err = build_context_from_value(&value).unwrap_err();
            assert!(matches!(err, Error::InvalidInput(_)));
        }
    }

    #[test]
    fn test_all_values_non_string_is_no_valid_content() {
        let value = json!({ "1": 42, "2": ["list"], "3": null });
        let err = build_context_from_value(&value).unwrap_err();
        assert!(matches!(err, Error::NoValidContent));
    }

    #[test]
    fn test_all_keys_non_integer_is_no_valid_content() {
        let value = json!({ "intro": "Hello", "1.5": "World", "-2": "Nope" });
        let err = build_context_from_value(&value).unwrap_err();
        assert!(matches!(err, Error::NoValidContent));
    }

    #[test]
    fn test_skips_are_reported() {
        let value = json!({ "1": "Keep", "two": "Drop", "3": false });
        let built = build_context_from_value(&value).unwrap();
        assert_eq!(built.context, "### Page-1\nKeep\n\n");
        assert_eq!(built.skipped.len(), 2);
        assert!(built.skipped.contains(&SkippedEntry {
            key: "two".to_string(),
            reason: SkipReason::InvalidPageNumber,
        }));
        assert!(built.skipped.contains(&SkippedEntry {
            key: "3".to_string(),
            reason: SkipReason::NonTextContent,
        }));
    }

    #[test]
    fn test_keys_naming_the_same_page_emit_one_header() {
        let value = json!({ "1": "a", "01": "b", "2": "c" });
        let built = build_context_from_value(&value).unwrap();
        assert_eq!(header_numbers(&built.context), vec![1, 2]);
        assert_eq!(built.context.matches("### Page-1\n").count(), 1);
        assert_eq!(built.skipped.len(), 1);
        assert_eq!(built.skipped[0].reason, SkipReason::DuplicatePageNumber);
    }
}
