//! Variable substitution engine
//!
//! Shell-style interpolation of `workspaceMount` and `workspaceFolder` values.
//!
//! ## Supported Variables
//!
//! - `${localWorkspaceFolder}` - Absolute project directory on the host
//! - `${localWorkspaceFolderBasename}` - Final component of that directory
//! - string-valued entries of the config's `settings` map, by key
//!
//! ## Syntax
//!
//! - `${name}` and `$name`
//! - `${name:-default}` - default when the variable is unset or empty
//! - `${name-default}` - default when the variable is unset
//! - `$$` - a literal `$`
//!
//! A reference to an unset variable without a default fails the whole
//! substitution with [`ConfigError::UnresolvedVariable`].

use crate::config::DevContainerConfig;
use crate::errors::{CodeupError, ConfigError, Result};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, instrument};

/// Matches `$$`, `${name}`, `${name:-default}`, `${name-default}` and `$name`
static VARIABLE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\$(?:(\$)|\{([A-Za-z_][A-Za-z0-9_.]*)(?:(:?-)([^}]*))?\}|([A-Za-z_][A-Za-z0-9_]*))",
    )
    .expect("Variable substitution regex should be valid")
});

/// Name of the project directory variable
pub const LOCAL_WORKSPACE_FOLDER: &str = "localWorkspaceFolder";

/// Name of the project directory basename variable
pub const LOCAL_WORKSPACE_FOLDER_BASENAME: &str = "localWorkspaceFolderBasename";

/// Substitution context containing values for variable resolution
#[derive(Debug, Clone, Default)]
pub struct SubstitutionContext {
    /// Absolute project directory on the host
    pub local_workspace_folder: String,
    /// Final component of `local_workspace_folder`
    pub local_workspace_folder_basename: String,
    /// Additional variables; the two built-ins take precedence over these
    pub extra_vars: HashMap<String, String>,
}

impl SubstitutionContext {
    /// Create a context for a project directory
    pub fn new(local_workspace_folder: &Path) -> Self {
        let basename = local_workspace_folder
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        Self {
            local_workspace_folder: local_workspace_folder.to_string_lossy().to_string(),
            local_workspace_folder_basename: basename,
            extra_vars: HashMap::new(),
        }
    }

    /// Create the context for a loaded configuration.
    ///
    /// String-valued `settings` entries become interpolation variables.
    pub fn from_config(config: &DevContainerConfig) -> Self {
        Self::new(config.local_workspace_folder()).with_settings_vars(&config.settings)
    }

    /// Add extra variables
    pub fn with_vars(mut self, vars: HashMap<String, String>) -> Self {
        self.extra_vars.extend(vars);
        self
    }

    /// Add every string-valued settings entry as a variable
    pub fn with_settings_vars(mut self, settings: &serde_json::Map<String, serde_json::Value>) -> Self {
        for (key, value) in settings {
            if let Some(s) = value.as_str() {
                self.extra_vars.insert(key.clone(), s.to_string());
            }
        }
        self
    }

    /// Look up a variable value
    pub fn lookup(&self, name: &str) -> Option<&str> {
        match name {
            LOCAL_WORKSPACE_FOLDER => Some(&self.local_workspace_folder),
            LOCAL_WORKSPACE_FOLDER_BASENAME => Some(&self.local_workspace_folder_basename),
            other => self.extra_vars.get(other).map(String::as_str),
        }
    }
}

/// Report of variable substitutions performed
#[derive(Debug, Clone, Default)]
pub struct SubstitutionReport {
    /// Map of variable names to their resolved values
    pub replacements: HashMap<String, String>,
    /// Variables that fell back to their inline default
    pub defaults_used: Vec<String>,
}

impl SubstitutionReport {
    /// Create a new empty substitution report
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if any substitutions were performed
    pub fn has_substitutions(&self) -> bool {
        !self.replacements.is_empty() || !self.defaults_used.is_empty()
    }
}

/// Variable substitution engine
pub struct VariableSubstitution;

impl VariableSubstitution {
    /// Substitute every variable reference in `input`.
    ///
    /// ## Example
    ///
    /// ```rust
    /// use codeup_core::variable::{SubstitutionContext, SubstitutionReport, VariableSubstitution};
    /// use std::path::Path;
    ///
    /// # fn example() -> anyhow::Result<()> {
    /// let context = SubstitutionContext::new(Path::new("/home/me/proj"));
    /// let mut report = SubstitutionReport::new();
    /// let result = VariableSubstitution::substitute_string(
    ///     "/workspace/${localWorkspaceFolderBasename}",
    ///     &context,
    ///     &mut report,
    /// )?;
    /// assert_eq!(result, "/workspace/proj");
    /// # Ok(())
    /// # }
    /// ```
    #[instrument(skip_all, fields(input_length = input.len()))]
    pub fn substitute_string(
        input: &str,
        context: &SubstitutionContext,
        report: &mut SubstitutionReport,
    ) -> Result<String> {
        let mut unresolved: Vec<String> = Vec::new();

        let result = VARIABLE_PATTERN.replace_all(input, |caps: &Captures| {
            if caps.get(1).is_some() {
                return "$".to_string();
            }

            let name = caps
                .get(2)
                .or_else(|| caps.get(5))
                .map(|m| m.as_str())
                .unwrap_or_default();
            let value = context.lookup(name);

            match (caps.get(3).map(|m| m.as_str()), value) {
                (Some(":-"), Some(v)) if v.is_empty() => {
                    Self::use_default(name, &caps, report)
                }
                (_, Some(v)) => {
                    debug!("Resolved variable '{}' to: {}", name, v);
                    report.replacements.insert(name.to_string(), v.to_string());
                    v.to_string()
                }
                (Some(_), None) => Self::use_default(name, &caps, report),
                (None, None) => {
                    if !unresolved.iter().any(|u| u == name) {
                        unresolved.push(name.to_string());
                    }
                    caps[0].to_string()
                }
            }
        });

        if !unresolved.is_empty() {
            return Err(CodeupError::Config(ConfigError::UnresolvedVariable {
                input: input.to_string(),
                variables: unresolved,
            }));
        }

        Ok(result.into_owned())
    }

    /// Substitute without keeping a report
    pub fn substitute(input: &str, context: &SubstitutionContext) -> Result<String> {
        let mut report = SubstitutionReport::new();
        Self::substitute_string(input, context, &mut report)
    }

    fn use_default(name: &str, caps: &Captures, report: &mut SubstitutionReport) -> String {
        let default = caps.get(4).map(|m| m.as_str()).unwrap_or_default();
        debug!("Variable '{}' unset, using default '{}'", name, default);
        report.defaults_used.push(name.to_string());
        default.to_string()
    }
}
