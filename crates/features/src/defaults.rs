//! Default value resolution
//!
//! Default trees may embed `${...}` markers. A string that is exactly one
//! marker is replaced by the evaluated value (keeping its type); a string
//! with markers among other text is interpolated, each marker replaced by
//! the string form of its value.

use crate::error::{Error, Result};
use crate::expr::evaluate_value;
use crate::value::{Mapping, Value};

/// Resolve every `${...}` marker in a defaults tree against `ctx`.
///
/// Structure is preserved; the first failure aborts with the offending path.
pub fn evaluate_defaults(defaults: &Mapping, ctx: &Value) -> Result<Mapping> {
    defaults
        .iter()
        .map(|(key, value)| Ok((key.clone(), resolve_at(value, ctx, key)?)))
        .collect()
}

/// Resolve markers in an arbitrary value.
pub fn resolve_value(value: &Value, ctx: &Value) -> Result<Value> {
    resolve_at(value, ctx, "")
}

fn resolve_at(value: &Value, ctx: &Value, path: &str) -> Result<Value> {
    match value {
        Value::String(s) => resolve_string(s, ctx).map_err(|e| e.at_path(path)),
        Value::Mapping(map) => map
            .iter()
            .map(|(key, child)| {
                let child_path = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{path}.{key}")
                };
                Ok((key.clone(), resolve_at(child, ctx, &child_path)?))
            })
            .collect::<Result<Mapping>>()
            .map(Value::Mapping),
        Value::Sequence(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| resolve_at(item, ctx, &format!("{path}[{i}]")))
            .collect::<Result<Vec<_>>>()
            .map(Value::Sequence),
        scalar => Ok(scalar.clone()),
    }
}

fn resolve_string(s: &str, ctx: &Value) -> Result<Value> {
    if !s.contains("${") {
        return Ok(Value::String(s.to_string()));
    }

    if s.starts_with("${") && find_closing(s, 2) == Some(s.len() - 1) {
        return evaluate_value(&s[2..s.len() - 1], ctx);
    }

    interpolate(s, ctx).map(Value::String)
}

/// Replace each `${expr}` in `template` with the string form of its value.
///
/// Markers are resolved left to right; nil renders as the empty string.
pub fn interpolate(template: &str, ctx: &Value) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut cursor = 0;

    while let Some(found) = template[cursor..].find("${") {
        let open = cursor + found;
        out.push_str(&template[cursor..open]);

        let close = find_closing(template, open + 2).ok_or_else(|| Error::Compile {
            expr: template.to_string(),
            position: open,
            message: "unterminated '${'".to_string(),
        })?;

        let value = evaluate_value(&template[open + 2..close], ctx)?;
        out.push_str(&value.to_plain_string());
        cursor = close + 1;
    }

    out.push_str(&template[cursor..]);
    Ok(out)
}

/// Byte index of the `}` closing a marker whose body starts at `start`.
///
/// Nested braces and quoted strings inside the body are skipped.
fn find_closing(s: &str, start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (offset, c) in s[start..].char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }

        match c {
            '\'' | '"' => quote = Some(c),
            '{' => depth += 1,
            '}' if depth == 0 => return Some(start + offset),
            '}' => depth -= 1,
            _ => {}
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(src: &str) -> Value {
        serde_yaml::from_str(src).unwrap()
    }

    fn mapping(src: &str) -> Mapping {
        yaml(src).as_mapping().cloned().unwrap()
    }

    #[test]
    fn test_whole_expression_keeps_type() {
        let ctx = yaml("cluster: {workers: 2}\nprovider: aws");
        let defaults = mapping(
            r#"
workers: "${cluster.workers + 1}"
is_cloud: "${provider != 'local'}"
zones: "${['a', 'b']}"
"#,
        );
        let resolved = evaluate_defaults(&defaults, &ctx).unwrap();
        assert_eq!(resolved["workers"], Value::Int(3));
        assert_eq!(resolved["is_cloud"], Value::Bool(true));
        assert_eq!(
            resolved["zones"],
            Value::Sequence(vec!["a".into(), "b".into()])
        );
    }

    #[test]
    fn test_interpolation_left_to_right() {
        let ctx = yaml("name: demo\ndomain: test\nport: 8080");
        let defaults = mapping(r#"url: "https://${name}.${domain}:${port}/""#);
        let resolved = evaluate_defaults(&defaults, &ctx).unwrap();
        assert_eq!(resolved["url"], Value::from("https://demo.test:8080/"));
    }

    #[test]
    fn test_interpolated_nil_is_empty() {
        let defaults = mapping(r#"label: "prefix-${missing}-suffix""#);
        let resolved = evaluate_defaults(&defaults, &Value::mapping()).unwrap();
        assert_eq!(resolved["label"], Value::from("prefix--suffix"));
    }

    #[test]
    fn test_two_markers_are_not_one_expression() {
        // Starts with ${ and ends with } but the first marker closes early
        let ctx = yaml("a: x\nb: y");
        let defaults = mapping(r#"pair: "${a}-${b}""#);
        let resolved = evaluate_defaults(&defaults, &ctx).unwrap();
        assert_eq!(resolved["pair"], Value::from("x-y"));
    }

    #[test]
    fn test_plain_values_pass_through() {
        let defaults = mapping("name: plain\ncount: 4\nflags: [true, 'x']\nnested: {deep: ok}");
        let resolved = evaluate_defaults(&defaults, &Value::Null).unwrap();
        assert_eq!(Value::Mapping(resolved), Value::Mapping(defaults));
    }

    #[test]
    fn test_recurses_into_structure() {
        let ctx = yaml("env: prod");
        let defaults = mapping(r#"nodes: [{name: "${env}-0"}, {name: "${env}-1"}]"#);
        let resolved = evaluate_defaults(&defaults, &ctx).unwrap();
        assert_eq!(
            Value::Mapping(resolved),
            yaml("nodes: [{name: prod-0}, {name: prod-1}]")
        );
    }

    #[test]
    fn test_error_carries_path() {
        let defaults = mapping(r#"cluster: {nodes: [{name: ok}, {name: "${1 +}"}]}"#);
        let err = evaluate_defaults(&defaults, &Value::Null).unwrap_err();
        match err {
            Error::Default { path, source } => {
                assert_eq!(path, "cluster.nodes[1].name");
                assert!(matches!(*source, Error::Compile { .. }));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_unterminated_marker() {
        let defaults = mapping(r#"bad: "value ${oops""#);
        let err = evaluate_defaults(&defaults, &Value::Null).unwrap_err();
        assert!(err.is_compile_error());
    }

    #[test]
    fn test_idempotent_once_resolved() {
        let ctx = yaml("name: demo\nsize: 3");
        let defaults = mapping(r#"{a: "${name}", b: "n-${size}", c: [plain]}"#);
        let once = evaluate_defaults(&defaults, &ctx).unwrap();
        let twice = evaluate_defaults(&once, &ctx).unwrap();
        assert_eq!(Value::Mapping(once), Value::Mapping(twice));
    }

    #[test]
    fn test_braces_inside_quotes() {
        let ctx = yaml("name: x");
        let resolved = interpolate("v=${name + '}'}", &ctx).unwrap();
        assert_eq!(resolved, "v=x}");
    }
}
