//! `bpctl eval` - evaluate an expression against the context's values

use anyhow::{Context as AnyhowContext, Result};
use features::{Value, evaluate_value};

use crate::Context;

pub fn run(ctx: &Context, expression: &str) -> Result<()> {
    let orchestrator = super::load(ctx, true)?;
    let value = evaluate(expression, orchestrator.values())?;
    println!("{value}");
    Ok(())
}

/// Scalars print plainly; sequences and mappings print as YAML
fn evaluate(expression: &str, values: &Value) -> Result<String> {
    let value = evaluate_value(expression, values)
        .with_context(|| format!("Failed to evaluate '{expression}'"))?;
    match value {
        Value::Sequence(_) | Value::Mapping(_) => Ok(serde_yaml::to_string(&value)
            .context("Failed to format result")?
            .trim_end()
            .to_string()),
        _ => Ok(value.to_plain_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values() -> Value {
        serde_yaml::from_str("vm: {driver: colima, cpus: 4}\nzones: [a, b]\n").unwrap()
    }

    #[test]
    fn test_scalar_results() {
        assert_eq!(evaluate("vm.driver == 'colima'", &values()).unwrap(), "true");
        assert_eq!(evaluate("vm.cpus", &values()).unwrap(), "4");
        assert_eq!(evaluate("vm.address ?? 'none'", &values()).unwrap(), "none");
    }

    #[test]
    fn test_structured_result() {
        assert_eq!(evaluate("zones", &values()).unwrap(), "- a\n- b");
    }

    #[test]
    fn test_invalid_expression() {
        let err = evaluate("vm.driver ==", &values()).unwrap_err();
        assert!(err.to_string().contains("Failed to evaluate"));
    }
}
