//! Named check registry.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::checks::context::CheckContext;
use crate::checks::BUILTIN_CHECKS;
use crate::core::AssumptionResult;
use crate::error::{DiagnosticError, Result};
use crate::solvers::ModelType;

/// A registered check.
pub type CheckFn = Arc<dyn Fn(&CheckContext<'_>) -> Result<AssumptionResult> + Send + Sync>;

/// One registry entry.
#[derive(Clone)]
pub struct CheckEntry {
    name: String,
    model_types: Vec<ModelType>,
    description: String,
    check: CheckFn,
}

impl CheckEntry {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn model_types(&self) -> &[ModelType] {
        &self.model_types
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Whether the check applies to `model_type`.
    pub fn supports(&self, model_type: ModelType) -> bool {
        self.model_types.contains(&model_type)
    }

    /// Run the check; the returned record must carry the registered name.
    pub fn run(&self, ctx: &CheckContext<'_>) -> Result<AssumptionResult> {
        let result = (self.check)(ctx)?;
        if result.name() != self.name {
            return Err(DiagnosticError::MisnamedResult {
                check: self.name.clone(),
                returned: result.name().to_string(),
            });
        }
        Ok(result)
    }
}

impl fmt::Debug for CheckEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CheckEntry")
            .field("name", &self.name)
            .field("model_types", &self.model_types)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// Checks keyed by name, kept in registration order.
///
/// # Example
///
/// ```rust,ignore
/// use regcheck::checks::CheckRegistry;
/// use regcheck::solvers::ModelType;
///
/// let mut registry = CheckRegistry::with_builtin_checks();
/// registry.register("always_pass", &[ModelType::Linear], "demo", |ctx| {
///     Ok(AssumptionResult::builder("always_pass").passed(true).build())
/// })?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct CheckRegistry {
    entries: Vec<CheckEntry>,
    index: HashMap<String, usize>,
}

impl CheckRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the six built-in checks.
    pub fn with_builtin_checks() -> Self {
        let mut registry = Self::new();
        for builtin in &BUILTIN_CHECKS {
            registry.insert(
                builtin.name.to_string(),
                builtin.model_types,
                builtin.description.to_string(),
                Arc::new(builtin.check),
            );
        }
        registry
    }

    /// Add a check under `name`.
    ///
    /// Returns [`DiagnosticError::DuplicateCheck`] if the name is taken.
    pub fn register<F>(
        &mut self,
        name: impl Into<String>,
        model_types: &[ModelType],
        description: impl Into<String>,
        check: F,
    ) -> Result<()>
    where
        F: Fn(&CheckContext<'_>) -> Result<AssumptionResult> + Send + Sync + 'static,
    {
        let name = name.into();
        if self.index.contains_key(&name) {
            return Err(DiagnosticError::DuplicateCheck(name));
        }

        self.insert(name, model_types, description.into(), Arc::new(check));
        Ok(())
    }

    fn insert(
        &mut self,
        name: String,
        model_types: &[ModelType],
        description: String,
        check: CheckFn,
    ) {
        debug!(check = %name, ?model_types, "registered check");
        self.index.insert(name.clone(), self.entries.len());
        self.entries.push(CheckEntry {
            name,
            model_types: model_types.to_vec(),
            description,
            check,
        });
    }

    /// Look up a check by name.
    pub fn get(&self, name: &str) -> Result<&CheckEntry> {
        self.index
            .get(name)
            .map(|&i| &self.entries[i])
            .ok_or_else(|| DiagnosticError::UnknownCheck(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Registered names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(CheckEntry::name).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CheckEntry> {
        self.entries.iter()
    }

    /// Entries that apply to `model_type`, in registration order.
    pub fn all_for_model_type(&self, model_type: ModelType) -> Vec<&CheckEntry> {
        self.entries
            .iter()
            .filter(|entry| entry.supports(model_type))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
