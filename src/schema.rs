//! Declarative parameter schemas and the validation routine shared by every relayed endpoint
//!
//! A schema is a slice of [`ParamRule`]s. Validation checks presence, type and allowed values for
//! each declared rule, collects every failure, and returns only the declared parameters in
//! declaration order.
use serde::Serialize;
use std::collections::BTreeMap;

/// The expected type of a parameter value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    String,
    Integer,
}

/// Where a validated parameter ends up in the upstream request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Location {
    Path,
    Query,
}

/// A single rule in an endpoint's parameter schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ParamRule {
    pub name: &'static str,
    pub location: Location,
    pub required: bool,
    pub kind: ParamKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed: Option<&'static [&'static str]>,
}

impl ParamRule {
    /// A required string placeholder in the path template.
    pub const fn path(name: &'static str) -> Self {
        Self {
            name,
            location: Location::Path,
            required: true,
            kind: ParamKind::String,
            allowed: None,
        }
    }

    /// An optional string query parameter.
    pub const fn query(name: &'static str) -> Self {
        Self {
            name,
            location: Location::Query,
            required: false,
            kind: ParamKind::String,
            allowed: None,
        }
    }

    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub const fn integer(mut self) -> Self {
        self.kind = ParamKind::Integer;
        self
    }

    pub const fn one_of(mut self, allowed: &'static [&'static str]) -> Self {
        self.allowed = Some(allowed);
        self
    }
}

/// Parameters that passed validation, in schema declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidatedParams {
    values: Vec<(&'static ParamRule, String)>,
}

impl ValidatedParams {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(rule, _)| rule.name == name)
            .map(|(_, value)| value.as_str())
    }

    /// Present parameters destined for the given location, in declaration order.
    pub fn at(&self, location: Location) -> impl Iterator<Item = (&'static str, &str)> {
        self.values
            .iter()
            .filter(move |(rule, _)| rule.location == location)
            .map(|(rule, value)| (rule.name, value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Every failing field with the reasons it failed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{} parameter(s) failed validation", .fields.len())]
pub struct ValidationError {
    pub fields: BTreeMap<String, Vec<String>>,
}

impl ValidationError {
    pub(crate) fn push(&mut self, field: &str, reason: String) {
        self.fields.entry(field.to_owned()).or_default().push(reason);
    }

    pub fn reasons(&self, field: &str) -> Option<&[String]> {
        self.fields.get(field).map(Vec::as_slice)
    }
}

/// Validates `params` against `schema`.
///
/// The first occurrence of a name wins, empty values count as absent, and names not declared in
/// the schema are dropped.
pub fn validate(
    schema: &'static [ParamRule],
    params: &[(String, String)],
) -> Result<ValidatedParams, ValidationError> {
    let mut errors = ValidationError::default();
    let mut values = Vec::with_capacity(schema.len());

    for rule in schema {
        let value = params
            .iter()
            .find(|(name, _)| name == rule.name)
            .map(|(_, value)| value.trim())
            .filter(|value| !value.is_empty());

        let Some(value) = value else {
            if rule.required {
                errors.push(rule.name, format!("The {} field is required.", rule.name));
            }
            continue;
        };

        let mut ok = true;
        if rule.kind == ParamKind::Integer && value.parse::<i64>().is_err() {
            errors.push(
                rule.name,
                format!("The {} field must be an integer.", rule.name),
            );
            ok = false;
        }
        if let Some(allowed) = rule.allowed
            && !allowed.contains(&value)
        {
            errors.push(rule.name, format!("The selected {} is invalid.", rule.name));
            ok = false;
        }
        // "." and ".." would be resolved away as path segments upstream.
        if rule.location == Location::Path && matches!(value, "." | "..") {
            errors.push(rule.name, format!("The selected {} is invalid.", rule.name));
            ok = false;
        }
        if ok {
            values.push((rule, value.to_owned()));
        }
    }

    if errors.fields.is_empty() {
        Ok(ValidatedParams { values })
    } else {
        Err(errors)
    }
}
