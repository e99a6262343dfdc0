//! Request validation.
//!
//! Every check appends to a [`ValidationErrors`] list instead of returning on
//! the first problem, so a caller sees all field violations at once. A missing
//! payload is the one exception: it yields the single entry
//! `request: is required` and nothing else is checked.

use serde::Serialize;
use std::fmt;

use crate::model::{ClusterSpec, CreateTemplateRequest, TemplateKind, UpdateTemplateRequest, VmSpec};

pub const CPU_MIN: i32 = 1;
pub const CPU_MAX: i32 = 32;
pub const MEMORY_MIN: i32 = 512;
pub const MEMORY_MAX: i32 = 65536;
pub const NODE_COUNT_MIN: i32 = 1;
pub const NODE_COUNT_MAX: i32 = 100;

/// A single violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Ordered collection of violations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// The short-circuit result for an absent request or payload.
    pub fn missing_request() -> Self {
        let mut errors = Self::new();
        errors.add("request", "is required");
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.to_string(),
            message: message.into(),
        });
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.errors.iter()
    }

    /// True if some entry matches `field` and `message` exactly.
    pub fn contains(&self, field: &str, message: &str) -> bool {
        self.errors
            .iter()
            .any(|e| e.field == field && e.message == message)
    }

    pub fn into_vec(self) -> Vec<FieldError> {
        self.errors
    }

    /// `Ok(())` when empty, otherwise `Err(self)`.
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.has_errors() { Err(self) } else { Ok(()) }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}", err)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

// === Field checks ===

pub fn validate_required(field: &str, value: &str, errors: &mut ValidationErrors) {
    if value.is_empty() {
        errors.add(field, "is required");
    }
}

pub fn validate_min_int(field: &str, value: i32, min: i32, errors: &mut ValidationErrors) {
    if value < min {
        errors.add(field, format!("must be at least {}", min));
    }
}

pub fn validate_max_int(field: &str, value: i32, max: i32, errors: &mut ValidationErrors) {
    if value > max {
        errors.add(field, format!("must be at most {}", max));
    }
}

pub fn validate_one_of(field: &str, value: &str, allowed: &[&str], errors: &mut ValidationErrors) {
    if !allowed.contains(&value) {
        errors.add(field, format!("must be one of: {}", allowed.join(", ")));
    }
}

/// Last check of a request: hands back `value` when it is present and no
/// earlier check failed.
fn validate_specified<T>(
    field: &str,
    value: Option<T>,
    mut errors: ValidationErrors,
) -> Result<T, ValidationErrors> {
    match value {
        Some(value) => errors.into_result().map(|()| value),
        None => {
            errors.add(field, "must be specified");
            Err(errors)
        }
    }
}

// === Templates ===

/// A valid create request yields its kind.
pub fn validate_create_template(
    req: Option<&CreateTemplateRequest>,
) -> Result<TemplateKind, ValidationErrors> {
    let Some(req) = req else {
        return Err(ValidationErrors::missing_request());
    };
    let mut errors = ValidationErrors::new();
    validate_required("name", &req.name, &mut errors);
    validate_required("raw_body", &req.raw_body, &mut errors);
    validate_specified("kind", req.kind, errors)
}

/// A valid update request yields its kind.
pub fn validate_update_template(
    req: Option<&UpdateTemplateRequest>,
) -> Result<TemplateKind, ValidationErrors> {
    let Some(req) = req else {
        return Err(ValidationErrors::missing_request());
    };
    let mut errors = ValidationErrors::new();
    validate_required("id", &req.id, &mut errors);
    validate_required("name", &req.name, &mut errors);
    validate_required("raw_body", &req.raw_body, &mut errors);
    validate_specified("kind", req.kind, errors)
}

/// Kind filter for template listing. Empty means no filter.
pub fn validate_list_templates(kind: Option<&str>) -> Result<Option<TemplateKind>, ValidationErrors> {
    let Some(kind) = kind.filter(|k| !k.is_empty()) else {
        return Ok(None);
    };
    let allowed: Vec<&str> = TemplateKind::ALL.iter().map(|k| k.as_str()).collect();
    let mut errors = ValidationErrors::new();
    validate_one_of("kind", kind, &allowed, &mut errors);
    errors.into_result()?;
    Ok(TemplateKind::ALL.into_iter().find(|k| k.as_str() == kind))
}

// === Lookups by ID (get / delete for every kind) ===

pub fn validate_id(id: Option<&str>) -> ValidationErrors {
    let Some(id) = id else {
        return ValidationErrors::missing_request();
    };
    let mut errors = ValidationErrors::new();
    validate_required("id", id, &mut errors);
    errors
}

// === Virtual machines ===

fn validate_vm_spec(spec: &VmSpec, errors: &mut ValidationErrors) {
    validate_required("name", &spec.name, errors);
    validate_min_int("cpu", spec.cpu_cores, CPU_MIN, errors);
    validate_max_int("cpu", spec.cpu_cores, CPU_MAX, errors);
    validate_min_int("memory", spec.memory_mb, MEMORY_MIN, errors);
    validate_max_int("memory", spec.memory_mb, MEMORY_MAX, errors);
    validate_required("os", &spec.os, errors);
    validate_required("template_id", &spec.template_id, errors);
}

pub fn validate_create_vm(spec: Option<&VmSpec>) -> ValidationErrors {
    let Some(spec) = spec else {
        return ValidationErrors::missing_request();
    };
    let mut errors = ValidationErrors::new();
    validate_vm_spec(spec, &mut errors);
    errors
}

pub fn validate_update_vm(id: &str, spec: Option<&VmSpec>) -> ValidationErrors {
    let Some(spec) = spec else {
        return ValidationErrors::missing_request();
    };
    let mut errors = ValidationErrors::new();
    validate_required("id", id, &mut errors);
    validate_vm_spec(spec, &mut errors);
    errors
}

// === Kubernetes clusters ===

fn validate_cluster_spec(spec: &ClusterSpec, errors: &mut ValidationErrors) {
    validate_required("name", &spec.name, errors);
    validate_required("region", &spec.region, errors);
    validate_min_int("node_count", spec.node_count, NODE_COUNT_MIN, errors);
    validate_max_int("node_count", spec.node_count, NODE_COUNT_MAX, errors);
    validate_required("version", &spec.version, errors);
    validate_required("template_id", &spec.template_id, errors);
}

pub fn validate_create_cluster(spec: Option<&ClusterSpec>) -> ValidationErrors {
    let Some(spec) = spec else {
        return ValidationErrors::missing_request();
    };
    let mut errors = ValidationErrors::new();
    validate_cluster_spec(spec, &mut errors);
    errors
}

pub fn validate_update_cluster(id: &str, spec: Option<&ClusterSpec>) -> ValidationErrors {
    let Some(spec) = spec else {
        return ValidationErrors::missing_request();
    };
    let mut errors = ValidationErrors::new();
    validate_required("id", id, &mut errors);
    validate_cluster_spec(spec, &mut errors);
    errors
}
