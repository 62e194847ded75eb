//! Extraction of declared references from a kustomization document.
//!
//! Fields are read in the order the document declares them, and entries keep
//! their position inside each field:
//!
//! | Field                                   | Entry                             | Type      |
//! |-----------------------------------------|-----------------------------------|-----------|
//! | `bases`                                 | string                            | Base      |
//! | `resources`                             | string                            | Resource  |
//! | `components`                            | string                            | Component |
//! | `patches`                               | mapping with `path`               | Patch     |
//! | `patchesStrategicMerge`                 | string file path                  | Patch     |
//! | `patchesJson6902`                       | mapping with `path`               | Patch     |
//! | `configMapGenerator`, `secretGenerator` | `files`, `envs`, `env`            | Generator |
//! | `generators`                            | string                            | Generator |
//!
//! Other fields are ignored. Inline patches carry no file reference and are
//! skipped. Anything else of the wrong shape is reported instead of being
//! dropped.

use crate::core::ReferenceType;
use crate::graph::DeclaredReference;
use serde_yaml::{Mapping, Value};

/// Extracts every declared reference in document order.
///
/// Returns a human readable reason when a field has the wrong shape.
pub fn extract_references(document: &Mapping) -> Result<Vec<DeclaredReference>, String> {
    let mut references = Vec::new();

    for (key, value) in document {
        let Some(field) = key.as_str() else {
            continue;
        };
        match field {
            "bases" => push_strings(&mut references, value, field, ReferenceType::Base)?,
            "resources" => push_strings(&mut references, value, field, ReferenceType::Resource)?,
            "components" => push_strings(&mut references, value, field, ReferenceType::Component)?,
            "generators" => push_strings(&mut references, value, field, ReferenceType::Generator)?,
            "patches" | "patchesJson6902" => {
                for (i, entry) in as_list(value, field)?.iter().enumerate() {
                    if let Some(path) = patch_path(entry, field, i)? {
                        references.push(DeclaredReference::new(path, ReferenceType::Patch));
                    }
                }
            }
            "patchesStrategicMerge" => {
                for (i, entry) in as_list(value, field)?.iter().enumerate() {
                    let raw = string_entry(entry, field, i)?;
                    if raw.contains('\n') {
                        tracing::warn!("Skipping inline patch at patchesStrategicMerge[{i}]");
                        continue;
                    }
                    references.push(DeclaredReference::new(raw, ReferenceType::Patch));
                }
            }
            "configMapGenerator" | "secretGenerator" => {
                for (i, entry) in as_list(value, field)?.iter().enumerate() {
                    let Some(generator) = entry.as_mapping() else {
                        return Err(format!("{field}[{i}] must be a mapping"));
                    };
                    for raw in generator_inputs(generator, field, i)? {
                        references.push(DeclaredReference::new(raw, ReferenceType::Generator));
                    }
                }
            }
            _ => {}
        }
    }

    Ok(references)
}

fn push_strings(
    references: &mut Vec<DeclaredReference>,
    value: &Value,
    field: &str,
    reference_type: ReferenceType,
) -> Result<(), String> {
    for (i, entry) in as_list(value, field)?.iter().enumerate() {
        references.push(DeclaredReference::new(string_entry(entry, field, i)?, reference_type));
    }
    Ok(())
}

/// A field's value as a list; null is empty.
fn as_list<'a>(value: &'a Value, field: &str) -> Result<&'a [Value], String> {
    match value {
        Value::Null => Ok(&[]),
        Value::Sequence(entries) => Ok(entries),
        _ => Err(format!("'{field}' must be a list")),
    }
}

/// Returns the list stored under `field`; absent and null fields are empty.
fn list_field<'a>(document: &'a Mapping, field: &str) -> Result<&'a [Value], String> {
    match document.get(field) {
        Some(value) => as_list(value, field),
        None => Ok(&[]),
    }
}

fn string_entry(entry: &Value, field: &str, i: usize) -> Result<String, String> {
    entry
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| format!("{field}[{i}] must be a string"))
}

/// `path` of a `patches`/`patchesJson6902` entry; `None` for inline patches.
fn patch_path(entry: &Value, field: &str, i: usize) -> Result<Option<String>, String> {
    let Some(patch) = entry.as_mapping() else {
        return Err(format!("{field}[{i}] must be a mapping"));
    };
    match patch.get("path") {
        Some(Value::String(path)) => Ok(Some(path.clone())),
        Some(_) => Err(format!("{field}[{i}].path must be a string")),
        None if patch.contains_key("patch") => {
            tracing::debug!("Skipping inline patch at {field}[{i}]");
            Ok(None)
        }
        None => Err(format!("{field}[{i}] needs either 'path' or 'patch'")),
    }
}

/// Input files of one generator: `files` (`key=path` or `path`), `envs`, `env`.
fn generator_inputs(generator: &Mapping, field: &str, i: usize) -> Result<Vec<String>, String> {
    let mut inputs = Vec::new();

    for (j, file) in list_field(generator, "files")?.iter().enumerate() {
        let raw = string_entry(file, &format!("{field}[{i}].files"), j)?;
        let path = raw.split_once('=').map_or(raw.as_str(), |(_, path)| path);
        inputs.push(path.trim().to_string());
    }

    for (j, env) in list_field(generator, "envs")?.iter().enumerate() {
        inputs.push(string_entry(env, &format!("{field}[{i}].envs"), j)?);
    }

    match generator.get("env") {
        None | Some(Value::Null) => {}
        Some(Value::String(env)) => inputs.push(env.clone()),
        Some(_) => return Err(format!("{field}[{i}].env must be a string")),
    }

    Ok(inputs)
}
