//! Resolves the credential fields an end user must supply for an
//! (application, scheme) pair.
//!
//! Resolution order:
//! 1. The registry confirms the pair is registered and yields scheme defaults
//! 2. An application override, if present, replaces the defaults entirely
//!
//! The returned order is the declaration order and never changes between
//! calls, so callers may index into it positionally.

use crate::error::ConnectError;
use crate::scheme::{AuthScheme, FieldSpec, SchemeRegistry};
use std::collections::HashMap;
use std::sync::Arc;

/// Field resolver backed by the shared scheme registry.
pub struct ParameterResolver {
    registry: Arc<SchemeRegistry>,
    overrides: HashMap<(String, AuthScheme), Vec<FieldSpec>>,
}

impl ParameterResolver {
    /// Creates a resolver with every override declared in the registry.
    pub fn new(registry: Arc<SchemeRegistry>) -> Self {
        let overrides = registry
            .applications()
            .into_iter()
            .flat_map(|spec| {
                let application = spec.name.to_lowercase();
                spec.field_overrides
                    .iter()
                    .map(move |(scheme, fields)| ((application.clone(), *scheme), fields.clone()))
            })
            .collect();

        Self {
            registry,
            overrides,
        }
    }

    /// Adds (or replaces) an override for one pair.
    pub fn with_override(
        mut self,
        application: &str,
        scheme: AuthScheme,
        fields: Vec<FieldSpec>,
    ) -> Self {
        self.overrides
            .insert((application.to_lowercase(), scheme), fields);
        self
    }

    pub fn registry(&self) -> &Arc<SchemeRegistry> {
        &self.registry
    }

    /// Required user-supplied fields for the pair.
    pub fn resolve(
        &self,
        application: &str,
        scheme: AuthScheme,
    ) -> Result<Vec<FieldSpec>, ConnectError> {
        let defaults = self.registry.required_fields(application, scheme)?;

        match self.overrides.get(&(application.to_lowercase(), scheme)) {
            Some(fields) => Ok(fields.clone()),
            None => Ok(defaults),
        }
    }
}
