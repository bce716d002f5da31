use std::fmt;

use tracing::debug;

use super::Environment;
use crate::interface::Category;
use crate::value::{ConfigValue, ObjectView, ValueError};

/// A descriptor field that can be overridden from the environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Endpoint,
    Type,
}

impl Field {
    /// Key of the field inside an interface descriptor.
    pub fn descriptor_key(self) -> &'static str {
        match self {
            Field::Endpoint => "EndPoint",
            Field::Type => "Type",
        }
    }

    fn env_suffix(self) -> &'static str {
        match self {
            Field::Endpoint => "ENDPOINT",
            Field::Type => "TYPE",
        }
    }
}

/// One environment layer that can override a descriptor field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverrideSource {
    /// `<CATEGORY>_<Name>_<FIELD>`, scoped to one descriptor.
    PerName { category: Category, name: String },
    /// `<CATEGORY>_<FIELD>`, applying to every descriptor of a category.
    Category(Category),
}

impl OverrideSource {
    pub fn variable(&self, field: Field) -> String {
        match self {
            OverrideSource::PerName { category, name } => {
                format!("{}_{}_{}", category.env_tag(), name, field.env_suffix())
            }
            OverrideSource::Category(category) => {
                format!("{}_{}", category.env_tag(), field.env_suffix())
            }
        }
    }
}

/// The outcome of resolving a field through an [`OverrideChain`].
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved<'a> {
    Env { variable: String, value: String },
    Descriptor(ConfigValue<'a>),
}

impl<'a> Resolved<'a> {
    /// The resolved value if it is textual.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Resolved::Env { value, .. } => Some(value),
            Resolved::Descriptor(value) => value.as_str(),
        }
    }
}

impl fmt::Display for Resolved<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolved::Env { value, .. } => f.write_str(value),
            Resolved::Descriptor(value) => write!(f, "{value}"),
        }
    }
}

/// Ordered environment layers consulted before a descriptor's own value.
///
/// The first layer set to a non-empty value wins; the descriptor is the final
/// fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverrideChain {
    sources: Vec<OverrideSource>,
}

impl OverrideChain {
    /// Per-name override, then category-wide override.
    pub fn for_descriptor(category: Category, name: &str) -> Self {
        Self {
            sources: vec![
                OverrideSource::PerName {
                    category,
                    name: name.to_string(),
                },
                OverrideSource::Category(category),
            ],
        }
    }

    pub fn sources(&self) -> &[OverrideSource] {
        &self.sources
    }

    pub fn resolve<'a>(
        &self,
        field: Field,
        env: &Environment,
        descriptor: ObjectView<'a>,
    ) -> Result<Resolved<'a>, ValueError> {
        for source in &self.sources {
            let variable = source.variable(field);
            if let Some(value) = env.get_non_empty(&variable) {
                debug!(variable = %variable, "descriptor field overridden from environment");
                return Ok(Resolved::Env {
                    variable,
                    value: value.to_string(),
                });
            }
        }

        descriptor
            .get(field.descriptor_key())
            .map(Resolved::Descriptor)
    }
}
