//! Template rendering.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use regex::Regex;
use tracing::debug;

use cloudstrap_config::DeploymentConfig;

use crate::error::{TemplateError, TemplateResult};

/// Built-in network + instance + load balancer definition.
pub const DEFAULT_TEMPLATE: &str = include_str!("../templates/main.tf.tmpl");

/// Renders infrastructure definitions from deployment parameters.
pub struct TemplateRenderer {
    variable_pattern: Regex,
    template: String,
}

impl Default for TemplateRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateRenderer {
    /// Create a renderer for the built-in template.
    pub fn new() -> Self {
        Self::with_template(DEFAULT_TEMPLATE)
    }

    /// Create a renderer for a custom template text.
    pub fn with_template(template: impl Into<String>) -> Self {
        Self {
            // Match {{ variable_name }} with optional inner whitespace
            variable_pattern: Regex::new(r"\{\{\s*([a-zA-Z_][a-zA-Z0-9_]*)\s*\}\}")
                .expect("placeholder pattern is a valid regex"),
            template: template.into(),
        }
    }

    /// Load a custom template from disk.
    pub fn from_file(path: &Path) -> TemplateResult<Self> {
        if !path.is_file() {
            return Err(TemplateError::NotFound(path.to_path_buf()));
        }
        Ok(Self::with_template(fs::read_to_string(path)?))
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// Placeholder values derived from a deployment configuration.
    pub fn variables(config: &DeploymentConfig) -> BTreeMap<String, String> {
        [
            ("region", config.region()),
            ("ami", config.ami().image_id.as_str()),
            ("instance_type", config.instance_type()),
            ("availability_zone", config.availability_zone()),
            (
                "secondary_availability_zone",
                config.secondary_availability_zone(),
            ),
            ("load_balancer_name", config.load_balancer_name()),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    /// Render the template for `config`.
    pub fn render(&self, config: &DeploymentConfig) -> TemplateResult<String> {
        self.render_content(&self.template, &Self::variables(config))
    }

    /// Replace every placeholder in `content`. Fails if a placeholder has no
    /// value or if stray `{{` / `}}` markers survive substitution.
    pub fn render_content(
        &self,
        content: &str,
        variables: &BTreeMap<String, String>,
    ) -> TemplateResult<String> {
        let mut unresolved = Vec::new();

        let rendered = self
            .variable_pattern
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                match variables.get(var_name) {
                    Some(value) => value.clone(),
                    None => {
                        if !unresolved.iter().any(|u| u == var_name) {
                            unresolved.push(var_name.to_string());
                        }
                        caps[0].to_string()
                    }
                }
            })
            .into_owned();

        if !unresolved.is_empty() {
            return Err(TemplateError::UnresolvedPlaceholders(unresolved));
        }

        if let Some(pos) = rendered.find("{{").or_else(|| rendered.find("}}")) {
            let end = (pos + 40).min(rendered.len());
            let snippet = rendered
                .get(pos..end)
                .unwrap_or(&rendered[pos..])
                .lines()
                .next()
                .unwrap_or_default()
                .to_string();
            return Err(TemplateError::MalformedPlaceholder(snippet));
        }

        for name in variables.keys() {
            if !content.contains(name.as_str()) {
                debug!("Template does not use variable {}", name);
            }
        }

        Ok(rendered)
    }
}
