// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Metascene-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Metascene and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Visual formulas ("geometry").
//!
//! A formula is authored per meta concept and computes an instance's [`Visual`] from its
//! attribute values. Each formula carries the set of attribute ids it reads, computed when the
//! formula is authored, so change propagation is an exact set lookup rather than a text search.

mod template;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

use memchr::memmem;
use regex::Regex;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use uuid::Uuid;

use crate::model::{Attribute, AttributeId, AttributeValue, CustomVariable, Transform, Visual};

pub use template::TemplateEvaluator;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "FormulaRepr", into = "FormulaRepr")]
pub struct Formula {
    source: String,
    dependencies: Option<BTreeSet<AttributeId>>,
}

impl Formula {
    /// A formula whose dependencies have not been declared.
    ///
    /// Change checks fall back to searching the source for attribute names and ids.
    pub fn undeclared(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            dependencies: None,
        }
    }

    /// Authors a formula against the attributes it may read.
    pub fn author<'a>(
        source: impl Into<String>,
        attributes: impl IntoIterator<Item = &'a Attribute>,
    ) -> Self {
        let source = source.into();
        let dependencies = declared_dependencies(&source, attributes);
        Self {
            source,
            dependencies: Some(dependencies),
        }
    }

    pub fn author_if_undeclared(&mut self, attributes: &[Attribute]) {
        if self.dependencies.is_none() {
            self.dependencies = Some(declared_dependencies(&self.source, attributes));
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn is_empty(&self) -> bool {
        self.source.trim().is_empty()
    }

    pub fn dependencies(&self) -> Option<&BTreeSet<AttributeId>> {
        self.dependencies.as_ref()
    }

    /// Whether a change of `attribute` can alter this formula's result.
    pub fn reads(&self, attribute: &Attribute) -> bool {
        match &self.dependencies {
            Some(declared) => declared.contains(&attribute.uuid),
            None => {
                let haystack = self.source.as_bytes();
                let id = attribute.uuid.to_string();
                (!attribute.name.is_empty()
                    && memmem::find(haystack, attribute.name.as_bytes()).is_some())
                    || memmem::find(haystack, id.as_bytes()).is_some()
            }
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum FormulaRepr {
    Source(String),
    Declared {
        source: String,
        dependencies: BTreeSet<AttributeId>,
    },
}

impl From<FormulaRepr> for Formula {
    fn from(repr: FormulaRepr) -> Self {
        match repr {
            FormulaRepr::Source(source) => Self::undeclared(source),
            FormulaRepr::Declared {
                source,
                dependencies,
            } => Self {
                source,
                dependencies: Some(dependencies),
            },
        }
    }
}

impl From<Formula> for FormulaRepr {
    fn from(formula: Formula) -> Self {
        match formula.dependencies {
            None => Self::Source(formula.source),
            Some(dependencies) => Self::Declared {
                source: formula.source,
                dependencies,
            },
        }
    }
}

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{([^{}]+)\}").expect("placeholder regex"))
}

fn attr_read_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\battr:(\S+)").expect("attr regex"))
}

fn uuid_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}")
            .expect("uuid regex")
    })
}

/// Attribute ids referenced by `{Name}` placeholders, `attr:<key>` reads or literal id in
/// `source`.
fn declared_dependencies<'a>(
    source: &str,
    attributes: impl IntoIterator<Item = &'a Attribute>,
) -> BTreeSet<AttributeId> {
    let placeholders = placeholder_regex()
        .captures_iter(source)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .chain(
            attr_read_regex()
                .captures_iter(source)
                .filter_map(|caps| caps.get(1))
                .map(|m| m.as_str()),
        )
        .collect::<BTreeSet<_>>();
    let literal_ids = uuid_regex()
        .find_iter(source)
        .filter_map(|m| Uuid::parse_str(m.as_str()).ok())
        .collect::<BTreeSet<_>>();

    attributes
        .into_iter()
        .filter(|attr| {
            placeholders.contains(attr.name.as_str())
                || placeholders.contains(attr.uuid.to_string().as_str())
                || literal_ids.contains(attr.uuid.as_uuid())
        })
        .map(|attr| attr.uuid)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormulaError {
    #[error("malformed formula at line {line}: {reason}")]
    Malformed { line: usize, reason: String },
    #[error("unknown draw command {command:?} at line {line}")]
    UnknownCommand { line: usize, command: String },
    #[error("formula reads unknown attribute {name:?}")]
    UnknownAttribute { name: String },
    #[error("formula evaluation failed: {0}")]
    Evaluation(String),
}

/// The expression helper handed to a formula: attribute values of the instance being
/// rendered plus its custom visual variables.
#[derive(Debug, Clone, Default)]
pub struct EvalScope {
    instance_id: Uuid,
    instance_name: String,
    transform: Transform,
    attributes: BTreeMap<SmolStr, AttributeValue>,
    variables: BTreeMap<SmolStr, CustomVariable>,
}

impl EvalScope {
    pub fn new(instance_id: Uuid, instance_name: impl Into<String>, transform: Transform) -> Self {
        Self {
            instance_id,
            instance_name: instance_name.into(),
            transform,
            attributes: BTreeMap::new(),
            variables: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<SmolStr>, value: AttributeValue) -> Self {
        self.attributes.insert(name.into(), value);
        self
    }

    pub fn with_variables(mut self, variables: BTreeMap<SmolStr, CustomVariable>) -> Self {
        self.variables = variables;
        self
    }

    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    pub fn instance_name(&self) -> &str {
        &self.instance_name
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }

    pub fn variable(&self, name: &str) -> Option<&AttributeValue> {
        self.variables.get(name).map(|var| &var.value)
    }

    /// Assigns a derived custom variable; a user-locked variable keeps its value.
    pub fn set_variable(&mut self, name: impl Into<SmolStr>, value: AttributeValue) -> bool {
        let name = name.into();
        match self.variables.get_mut(&name) {
            Some(existing) if existing.user_locked => false,
            Some(existing) => {
                existing.value = value;
                true
            }
            None => {
                self.variables.insert(name, CustomVariable::derived(value));
                true
            }
        }
    }

    pub fn into_variables(self) -> BTreeMap<SmolStr, CustomVariable> {
        self.variables
    }
}

/// Turns a formula plus an [`EvalScope`] into a [`Visual`].
pub trait FormulaEvaluator {
    fn evaluate(&self, formula: &Formula, scope: &mut EvalScope) -> Result<Visual, FormulaError>;
}

impl<F> FormulaEvaluator for F
where
    F: Fn(&Formula, &mut EvalScope) -> Result<Visual, FormulaError>,
{
    fn evaluate(&self, formula: &Formula, scope: &mut EvalScope) -> Result<Visual, FormulaError> {
        self(formula, scope)
    }
}

#[cfg(test)]
mod tests {
    use super::Formula;
    use crate::model::fixtures::station_meta;
    use crate::model::MetaModelRegistry;

    #[test]
    fn authored_formula_declares_placeholder_dependencies() {
        let (meta, ids) = station_meta();
        let station = meta.meta_class(&ids.station).expect("station");
        let source = "box color={Color}\ntext content={Name}";
        let formula = Formula::author(source, &station.attributes);

        let deps = formula.dependencies().expect("declared");
        assert!(deps.contains(&ids.station_color));
        assert!(deps.contains(&ids.station_name));
        assert!(!deps.contains(&ids.station_capacity));
    }

    #[test]
    fn attr_reads_are_declared_by_name_or_id() {
        let (meta, ids) = station_meta();
        let station = meta.meta_class(&ids.station).expect("station");
        let by_name = Formula::author("text content=attr:Capacity", &station.attributes);
        let capacity = meta.meta_attribute(&ids.station_capacity).expect("capacity");
        assert!(by_name.reads(capacity));

        let source = format!("text content=attr:{}", ids.station_color);
        let by_id = Formula::author(source, &station.attributes);
        let deps = by_id.dependencies().expect("declared");
        assert_eq!(deps.len(), 1);
        assert!(deps.contains(&ids.station_color));
    }

    #[test]
    fn declared_set_is_exact_for_names_that_are_substrings() {
        let (meta, ids) = station_meta();
        let station = meta.meta_class(&ids.station).expect("station");
        // "Name" occurs inside "Nameplate" but only the placeholder counts.
        let formula = Formula::author("text content=Nameplate", &station.attributes);
        let name = meta.meta_attribute(&ids.station_name).expect("name");
        assert!(!formula.reads(name));

        let legacy = Formula::undeclared("text content=Nameplate");
        assert!(legacy.reads(name), "textual fallback matches substrings");
    }

    #[test]
    fn literal_attribute_id_counts_as_dependency() {
        let (meta, ids) = station_meta();
        let station = meta.meta_class(&ids.station).expect("station");
        let source = format!("text content=attr:{}", ids.station_capacity);
        let formula = Formula::author(source, &station.attributes);
        let capacity = meta.meta_attribute(&ids.station_capacity).expect("capacity");
        assert!(formula.reads(capacity));
    }

    #[test]
    fn plain_string_deserializes_as_undeclared() {
        let formula: Formula = serde_json::from_str("\"box\"").expect("formula");
        assert_eq!(formula.source(), "box");
        assert!(formula.dependencies().is_none());
        let json = serde_json::to_string(&formula).expect("serialize");
        assert_eq!(json, "\"box\"");
    }
}
