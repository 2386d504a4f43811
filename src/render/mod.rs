//! Tool result rendering
//!
//! Turns an arbitrary JSON tool result into a [`DisplayNode`] tree. The
//! function is total: every JSON value renders, strings that fail to parse
//! render verbatim, and nesting beyond [`MAX_RENDER_DEPTH`] is cut off with
//! [`DisplayNode::Truncated`].

pub mod text;

use serde::Serialize;
use serde_json::Value;

/// Deepest nesting level rendered before truncating
pub const MAX_RENDER_DEPTH: usize = 64;

/// A labeled block inside a mapping
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    pub label: String,
    pub value: DisplayNode,
}

/// Human-readable display tree
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum DisplayNode {
    /// A string, number or boolean printed as-is
    Literal(String),
    /// A scalar list element
    Bullet(String),
    /// null / absent
    Empty,
    /// An empty sequence
    EmptyList,
    /// One block per sequence element
    Items(Vec<DisplayNode>),
    /// One labeled block per mapping key, in insertion order
    Fields(Vec<Field>),
    /// Nesting exceeded [`MAX_RENDER_DEPTH`]
    Truncated,
}

/// Render a raw tool result
pub fn render(value: &Value) -> DisplayNode {
    let chosen = unwrap_tool_result(value);
    render_value(&chosen, 0)
}

/// Pick the payload worth displaying out of a raw tool result
///
/// Precedence: a string is JSON-decoded when possible; otherwise a non-null
/// `structuredContent` wins; otherwise `content[0].text` is JSON-decoded
/// (falling back to the text itself); otherwise the value is used unchanged.
pub fn unwrap_tool_result(value: &Value) -> Value {
    if let Value::String(s) = value {
        return decode_or_verbatim(s);
    }

    if let Some(structured) = value.get("structuredContent").filter(|v| !v.is_null()) {
        return structured.clone();
    }

    if let Some(text) = value
        .get("content")
        .and_then(|c| c.get(0))
        .and_then(|first| first.get("text"))
        .and_then(Value::as_str)
    {
        return decode_or_verbatim(text);
    }

    value.clone()
}

fn decode_or_verbatim(s: &str) -> Value {
    serde_json::from_str(s).unwrap_or_else(|_| Value::String(s.to_string()))
}

/// Literal form of a scalar
fn literal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn render_value(value: &Value, depth: usize) -> DisplayNode {
    if depth > MAX_RENDER_DEPTH {
        return DisplayNode::Truncated;
    }

    match value {
        Value::Null => DisplayNode::Empty,
        Value::String(_) | Value::Number(_) | Value::Bool(_) => DisplayNode::Literal(literal(value)),
        Value::Array(items) if items.is_empty() => DisplayNode::EmptyList,
        Value::Array(items) => DisplayNode::Items(
            items
                .iter()
                .map(|item| render_item(item, depth + 1))
                .collect(),
        ),
        Value::Object(map) => DisplayNode::Fields(
            map.iter()
                .map(|(key, v)| Field {
                    label: key.clone(),
                    value: render_value(v, depth + 1),
                })
                .collect(),
        ),
    }
}

fn render_item(item: &Value, depth: usize) -> DisplayNode {
    match item {
        Value::String(_) | Value::Number(_) | Value::Bool(_) => DisplayNode::Bullet(literal(item)),
        other => render_value(other, depth),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn field(label: &str, value: DisplayNode) -> Field {
        Field {
            label: label.to_string(),
            value,
        }
    }

    #[test]
    fn test_primitives_render_literally() {
        assert_eq!(render(&json!(42)), DisplayNode::Literal("42".into()));
        assert_eq!(render(&json!(2.5)), DisplayNode::Literal("2.5".into()));
        assert_eq!(render(&json!(true)), DisplayNode::Literal("true".into()));
        assert_eq!(render(&json!(false)), DisplayNode::Literal("false".into()));
        assert_eq!(render(&Value::Null), DisplayNode::Empty);
    }

    #[test]
    fn test_unparseable_string_renders_verbatim() {
        assert_eq!(
            render(&json!("not json")),
            DisplayNode::Literal("not json".into())
        );
    }

    #[test]
    fn test_json_string_renders_parsed_structure() {
        let raw = json!("[{\"concept_id\":\"C1\",\"title\":\"SST\"}]");
        assert_eq!(
            render(&raw),
            DisplayNode::Items(vec![DisplayNode::Fields(vec![
                field("concept_id", DisplayNode::Literal("C1".into())),
                field("title", DisplayNode::Literal("SST".into())),
            ])])
        );
    }

    #[test]
    fn test_quoted_json_string_decodes_once() {
        // "\"hello\"" decodes to the string hello
        assert_eq!(
            render(&json!("\"hello\"")),
            DisplayNode::Literal("hello".into())
        );
    }

    #[test]
    fn test_empty_sequence_marker() {
        assert_eq!(render(&json!([])), DisplayNode::EmptyList);
        assert_eq!(render(&json!("[]")), DisplayNode::EmptyList);
    }

    #[test]
    fn test_empty_mapping_has_no_special_case() {
        assert_eq!(render(&json!({})), DisplayNode::Fields(vec![]));
        assert_eq!(
            render(&json!({"a": {}})),
            DisplayNode::Fields(vec![field("a", DisplayNode::Fields(vec![]))])
        );
    }

    #[test]
    fn test_structured_content_wins_over_text() {
        let result = json!({
            "content": [{"type": "text", "text": "[1,2]"}],
            "structuredContent": {"result": ["a"]}
        });
        assert_eq!(
            render(&result),
            DisplayNode::Fields(vec![field(
                "result",
                DisplayNode::Items(vec![DisplayNode::Bullet("a".into())])
            )])
        );
    }

    #[test]
    fn test_null_structured_content_falls_through() {
        let result = json!({
            "content": [{"type": "text", "text": "[1]"}],
            "structuredContent": null
        });
        assert_eq!(
            render(&result),
            DisplayNode::Items(vec![DisplayNode::Bullet("1".into())])
        );
    }

    #[test]
    fn test_content_text_decoded() {
        let result = json!({
            "content": [{"type": "text", "text": "{\"count\": 0}"}],
            "isError": false
        });
        assert_eq!(
            render(&result),
            DisplayNode::Fields(vec![field("count", DisplayNode::Literal("0".into()))])
        );
    }

    #[test]
    fn test_content_text_verbatim_on_decode_failure() {
        let result = json!({
            "content": [{"type": "text", "text": "Failed to search CMR collections: timeout"}],
            "isError": true
        });
        assert_eq!(
            render(&result),
            DisplayNode::Literal("Failed to search CMR collections: timeout".into())
        );
    }

    #[test]
    fn test_plain_object_used_unchanged() {
        let value = json!({"content": [], "note": null});
        assert_eq!(
            render(&value),
            DisplayNode::Fields(vec![
                field("content", DisplayNode::EmptyList),
                field("note", DisplayNode::Empty),
            ])
        );
    }

    #[test]
    fn test_mapping_preserves_insertion_order() {
        let value: Value = serde_json::from_str(r#"{"zeta": 1, "alpha": 2, "mid": 3}"#).unwrap();
        let DisplayNode::Fields(fields) = render(&value) else {
            panic!("expected fields");
        };
        let labels: Vec<&str> = fields.iter().map(|f| f.label.as_str()).collect();
        assert_eq!(labels, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_sequence_elements() {
        let value = json!(["x", 1, null, [true], {"k": [1]}]);
        assert_eq!(
            render(&value),
            DisplayNode::Items(vec![
                DisplayNode::Bullet("x".into()),
                DisplayNode::Bullet("1".into()),
                DisplayNode::Empty,
                DisplayNode::Items(vec![DisplayNode::Bullet("true".into())]),
                DisplayNode::Fields(vec![field(
                    "k",
                    DisplayNode::Items(vec![DisplayNode::Bullet("1".into())])
                )]),
            ])
        );
    }

    #[test]
    fn test_deep_nesting_is_truncated() {
        let mut value = json!("leaf");
        for _ in 0..(MAX_RENDER_DEPTH + 10) {
            value = json!({ "n": value });
        }

        let mut node = render(&value);
        let mut depth = 0;
        loop {
            match node {
                DisplayNode::Fields(mut fields) => {
                    node = fields.remove(0).value;
                    depth += 1;
                }
                DisplayNode::Truncated => break,
                other => panic!("unexpected node {:?}", other),
            }
        }
        assert_eq!(depth, MAX_RENDER_DEPTH + 1);
    }

    fn arb_json() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(|n| json!(n)),
            ".*".prop_map(Value::String),
        ];
        leaf.prop_recursive(6, 64, 8, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..8).prop_map(Value::Array),
                prop::collection::vec(("[a-z]{1,6}", inner), 0..8)
                    .prop_map(|kv| Value::Object(kv.into_iter().collect())),
            ]
        })
    }

    proptest! {
        #[test]
        fn prop_render_is_total(value in arb_json()) {
            let node = render(&value);
            let _ = text::layout(&node);
        }

        #[test]
        fn prop_integers_render_literally(n in any::<i64>()) {
            prop_assert_eq!(render(&json!(n)), DisplayNode::Literal(n.to_string()));
        }

        #[test]
        fn prop_encoded_value_renders_like_value(value in arb_json()) {
            // Strings are excluded: the encoded form of a string decodes back
            // into a string, which is then not decoded a second time.
            prop_assume!(!value.is_string());
            prop_assume!(value.get("structuredContent").is_none());
            prop_assume!(value.get("content").is_none());
            let encoded = Value::String(value.to_string());
            prop_assert_eq!(render(&encoded), render_value(&value, 0));
        }
    }
}
