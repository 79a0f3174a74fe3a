//! Command-line rendering for terraform sub-commands
//!
//! Variables are passed as `-var name=value` with the value written as an
//! HCL literal. Top-level strings go through bare; anything nested is quoted.

use serde_json::Value;

use super::options::TerraformOptions;

/// Sub-commands that accept `-var`
const COMMANDS_WITH_VARS: &[&str] = &["apply", "console", "destroy", "import", "plan", "refresh"];

/// Build the full argument list for `args[0]` (the sub-command)
pub fn format_args(options: &TerraformOptions, args: &[&str]) -> Vec<String> {
    let mut formatted: Vec<String> = args.iter().map(|a| a.to_string()).collect();

    if options.no_color && !formatted.iter().any(|a| a == "-no-color") {
        formatted.push("-no-color".to_string());
    }

    let accepts_vars = args
        .first()
        .map(|command| COMMANDS_WITH_VARS.contains(command))
        .unwrap_or(false);

    if accepts_vars {
        for (name, value) in &options.vars {
            formatted.push("-var".to_string());
            formatted.push(format!("{}={}", name, to_hcl_string(value, false)));
        }
    }

    formatted
}

/// Render a JSON value as an HCL literal
pub fn to_hcl_string(value: &Value, nested: bool) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) if nested => quote(s),
        Value::String(s) => s.clone(),
        Value::Array(items) => {
            let items: Vec<String> = items.iter().map(|v| to_hcl_string(v, true)).collect();
            format!("[{}]", items.join(", "))
        }
        Value::Object(map) => {
            let entries: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("{} = {}", quote(k), to_hcl_string(v, true)))
                .collect();
            format!("{{{}}}", entries.join(", "))
        }
    }
}

fn quote(s: &str) -> String {
    // JSON string escaping is a subset of what HCL accepts
    serde_json::to_string(s).unwrap_or_else(|_| format!("\"{}\"", s))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_hcl_scalars() {
        assert_eq!(to_hcl_string(&json!("plain"), false), "plain");
        assert_eq!(to_hcl_string(&json!("plain"), true), "\"plain\"");
        assert_eq!(to_hcl_string(&json!(42), false), "42");
        assert_eq!(to_hcl_string(&json!(true), false), "true");
        assert_eq!(to_hcl_string(&Value::Null, false), "null");
    }

    #[test]
    fn test_hcl_nested_string_is_escaped() {
        assert_eq!(
            to_hcl_string(&json!(["a\"b"]), false),
            r#"["a\"b"]"#
        );
    }
}
