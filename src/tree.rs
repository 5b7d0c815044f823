use serde_json::Value;

// How far each nesting level shifts its lines to the right, in columns.
pub const INDENT_WIDTH: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    // A container key, displayed bold.
    Label,
    // A scalar's literal JSON text.
    Literal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeLine {
    pub depth: usize,
    pub kind: LineKind,
    pub text: String,
}

/// Flattens an arbitrary JSON value into display lines, one label line per
/// container key followed by its value one level deeper. Objects iterate in
/// insertion order; arrays enumerate their indices as keys. Pure, so every
/// redraw can just call it again on the latest value.
pub fn render(value: &Value) -> Vec<TreeLine> {
    let mut lines = Vec::new();
    render_into(value, 0, &mut lines);
    lines
}

fn render_into(value: &Value, depth: usize, lines: &mut Vec<TreeLine>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                lines.push(TreeLine {
                    depth,
                    kind: LineKind::Label,
                    text: format!("{key}:"),
                });
                render_into(child, depth + 1, lines);
            }
        }
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                lines.push(TreeLine {
                    depth,
                    kind: LineKind::Label,
                    text: format!("{index}:"),
                });
                render_into(child, depth + 1, lines);
            }
        }
        // Null, booleans, numbers and strings keep their JSON spelling,
        // quotes included.
        scalar => lines.push(TreeLine {
            depth,
            kind: LineKind::Literal,
            text: scalar.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn line(depth: usize, kind: LineKind, text: &str) -> TreeLine {
        TreeLine {
            depth,
            kind,
            text: text.to_string(),
        }
    }

    #[test]
    fn scalar_is_one_line_at_depth_zero() {
        assert_eq!(
            render(&json!(42)),
            vec![line(0, LineKind::Literal, "42")]
        );
    }

    #[test]
    fn strings_stay_quoted() {
        assert_eq!(
            render(&json!("hi")),
            vec![line(0, LineKind::Literal, "\"hi\"")]
        );
    }

    #[test]
    fn null_and_bools_render_literally() {
        assert_eq!(render(&json!(null)), vec![line(0, LineKind::Literal, "null")]);
        assert_eq!(render(&json!(true)), vec![line(0, LineKind::Literal, "true")]);
    }

    #[test]
    fn nested_object_indents_per_level() {
        let value = json!({"a": 1, "b": {"c": 2}});
        assert_eq!(
            render(&value),
            vec![
                line(0, LineKind::Label, "a:"),
                line(1, LineKind::Literal, "1"),
                line(0, LineKind::Label, "b:"),
                line(1, LineKind::Label, "c:"),
                line(2, LineKind::Literal, "2"),
            ]
        );
    }

    #[test]
    fn object_keys_keep_insertion_order() {
        let value: Value = serde_json::from_str(r#"{"z": 1, "a": 2, "m": 3}"#).unwrap();
        let rendered = render(&value);
        let labels: Vec<&str> = rendered
            .iter()
            .filter(|l| l.kind == LineKind::Label)
            .map(|l| l.text.as_str())
            .collect();
        assert_eq!(labels, vec!["z:", "a:", "m:"]);
    }

    #[test]
    fn arrays_enumerate_indices() {
        let value = json!(["x", {"k": false}]);
        assert_eq!(
            render(&value),
            vec![
                line(0, LineKind::Label, "0:"),
                line(1, LineKind::Literal, "\"x\""),
                line(0, LineKind::Label, "1:"),
                line(1, LineKind::Label, "k:"),
                line(2, LineKind::Literal, "false"),
            ]
        );
    }

    #[test]
    fn empty_containers_render_nothing() {
        assert!(render(&json!({})).is_empty());
        assert!(render(&json!([])).is_empty());
    }

    #[test]
    fn rendering_is_idempotent() {
        let value = json!({"a": [1, 2, {"b": null}], "c": "s"});
        assert_eq!(render(&value), render(&value));
    }
}
