//! Bootstrap script rendering for the server `user_data`.
//!
//! The template is a plain shell script holding one marker line. Rendering
//! swaps that line for one `echo "export K='V'" >> <env-file>` per config
//! entry, so sourcing the env file yields every value verbatim. The result is
//! sent base64 encoded (standard alphabet, padded).

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use openstack_core::{Error, Result};
use std::collections::BTreeMap;

/// Marker line replaced by the config exports.
pub const DEFAULT_MARKER: &str = "#@DEPLOY_CONFIG@";

/// File the exports are appended to.
pub const DEFAULT_ENV_FILE: &str = "/etc/deploy.env";

const DEFAULT_TEMPLATE: &str = include_str!("../templates/bootstrap.sh");

/// Script template plus the marker and env file it is rendered with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapScript {
    template: String,
    marker: String,
    env_file: String,
}

impl Default for BootstrapScript {
    fn default() -> Self {
        Self::new(DEFAULT_TEMPLATE)
    }
}

impl BootstrapScript {
    /// Use a custom template with the default marker and env file.
    #[must_use]
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            marker: DEFAULT_MARKER.to_string(),
            env_file: DEFAULT_ENV_FILE.to_string(),
        }
    }

    /// Override the marker line.
    #[must_use]
    pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
        self.marker = marker.into();
        self
    }

    /// Override the env file the exports are appended to.
    #[must_use]
    pub fn with_env_file(mut self, env_file: impl Into<String>) -> Self {
        self.env_file = env_file.into();
        self
    }

    /// Template text.
    #[must_use]
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Render the script with one export line per entry, in key order.
    ///
    /// # Errors
    ///
    /// `Validation` when the template has no marker line, a key is not a
    /// valid shell variable name or a value holds a backslash.
    pub fn render(&self, config: &BTreeMap<String, String>) -> Result<String> {
        let exports = config
            .iter()
            .map(|(key, value)| self.export_line(key, value))
            .collect::<Result<Vec<_>>>()?
            .join("\n");

        let mut found = false;
        let lines: Vec<&str> = self
            .template
            .lines()
            .map(|line| {
                if line.trim() == self.marker {
                    found = true;
                    exports.as_str()
                } else {
                    line
                }
            })
            .collect();

        if !found {
            return Err(Error::Validation(format!(
                "bootstrap template has no `{}` line",
                self.marker
            )));
        }

        let mut script = lines.join("\n");
        if self.template.ends_with('\n') {
            script.push('\n');
        }
        Ok(script)
    }

    /// Render and base64 encode, ready for `user_data`.
    ///
    /// # Errors
    ///
    /// Same as [`BootstrapScript::render`].
    pub fn encode(&self, config: &BTreeMap<String, String>) -> Result<String> {
        Ok(STANDARD.encode(self.render(config)?))
    }

    fn export_line(&self, key: &str, value: &str) -> Result<String> {
        if !is_shell_name(key) {
            return Err(Error::Validation(format!(
                "`{key}` is not a valid environment variable name"
            )));
        }
        // Some `echo` builtins expand backslash escapes.
        if value.contains('\\') {
            return Err(Error::Validation(format!(
                "value of `{key}` must not contain a backslash"
            )));
        }
        Ok(format!(
            "echo \"export {key}={}\" >> {}",
            escape_double_quoted(&single_quoted(value)),
            self.env_file
        ))
    }
}

fn is_shell_name(key: &str) -> bool {
    let mut chars = key.chars();
    matches!(chars.next(), Some(c) if c == '_' || c.is_ascii_alphabetic())
        && chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

// `'` closes the quote, emits a double-quoted `'` and reopens.
fn single_quoted(value: &str) -> String {
    format!("'{}'", value.replace('\'', r#"'"'"'"#))
}

// Inside double quotes only these four keep a special meaning.
fn escape_double_quoted(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '"' | '\\' | '$' | '`') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
