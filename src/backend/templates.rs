use anyhow::{Context, Result};
use declarative::TemplateEngine;
use features::Value;

/// Parses platform templates as YAML.
///
/// `${...}` markers are kept as text; the orchestrator resolves them once
/// the context's defaults are known.
pub struct YamlTemplateEngine;

impl TemplateEngine for YamlTemplateEngine {
    fn render(&self, name: &str, template: &str, _vars: &Value) -> Result<Value> {
        let value: Value = serde_yaml::from_str(template)
            .with_context(|| format!("Template '{name}' is not valid YAML"))?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use declarative::PlatformTemplates;

    #[test]
    fn test_renders_builtin_templates() {
        let templates = PlatformTemplates::builtin();
        for name in templates.names() {
            let template = templates.select(name);
            let doc = YamlTemplateEngine
                .render(&template.name, &template.text, &Value::mapping())
                .unwrap();
            assert!(doc.get("blueprint").is_some(), "{name}");
        }
    }

    #[test]
    fn test_markers_are_left_alone() {
        let doc = YamlTemplateEngine
            .render("t", "endpoint: \"${vm.address ?? '127.0.0.1'}\"", &Value::Null)
            .unwrap();
        assert_eq!(
            doc.get("endpoint").and_then(Value::as_str),
            Some("${vm.address ?? '127.0.0.1'}")
        );
    }

    #[test]
    fn test_invalid_yaml() {
        let err = YamlTemplateEngine
            .render("broken", "blueprint: [", &Value::Null)
            .unwrap_err();
        assert!(err.to_string().contains("Template 'broken'"));
    }
}
