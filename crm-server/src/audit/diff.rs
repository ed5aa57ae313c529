//! Audit detail builders
//!
//! Snapshot and field-level diff payloads for audit entries, computed from
//! the serialized form of the record so new model fields are picked up
//! automatically.

use serde::Serialize;
use serde_json::{Value, json};
use std::collections::HashSet;

/// Field change record
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct FieldChange {
    pub field: String,
    pub from: Value,
    pub to: Value,
}

/// Fields excluded from audit payloads per resource type.
///
/// `id` is always redundant (the entry carries `resource_id`);
/// `email_normalized` is derived and would only duplicate `email` changes.
fn excluded_fields(resource_type: &str) -> &'static [&'static str] {
    match resource_type {
        "client" => &["id", "email_normalized"],
        _ => &["id"],
    }
}

fn filter_fields(value: &mut Value, exclude: &[&str]) {
    if let Value::Object(obj) = value {
        for field in exclude {
            obj.remove(*field);
        }
    }
}

/// Recursively diff two JSON values, pushing leaf-level changes.
fn diff_json_recursive(from: &Value, to: &Value, path: &str, changes: &mut Vec<FieldChange>) {
    match (from, to) {
        (Value::Object(from_obj), Value::Object(to_obj)) => {
            let mut all_keys: HashSet<&String> = from_obj.keys().collect();
            all_keys.extend(to_obj.keys());

            for key in all_keys {
                let field_path = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", path, key)
                };

                match (from_obj.get(key), to_obj.get(key)) {
                    (Some(f), Some(t)) => diff_json_recursive(f, t, &field_path, changes),
                    (Some(f), None) => changes.push(FieldChange {
                        field: field_path,
                        from: f.clone(),
                        to: Value::Null,
                    }),
                    (None, Some(t)) => changes.push(FieldChange {
                        field: field_path,
                        from: Value::Null,
                        to: t.clone(),
                    }),
                    (None, None) => unreachable!(),
                }
            }
        }
        (f, t) => {
            if f != t {
                changes.push(FieldChange {
                    field: path.to_string(),
                    from: f.clone(),
                    to: t.clone(),
                });
            }
        }
    }
}

/// Create the audit details for a CREATE operation (filtered snapshot).
pub fn create_snapshot<T: Serialize>(value: &T, resource_type: &str) -> Value {
    match serde_json::to_value(value) {
        Ok(mut json) => {
            filter_fields(&mut json, excluded_fields(resource_type));
            json
        }
        Err(e) => {
            tracing::error!("Failed to serialize audit snapshot: {:?}", e);
            json!({"error": "serialization_failed"})
        }
    }
}

/// Create the audit details for an UPDATE operation (field diff).
///
/// Output shape: `{"changes": [{"field": "phone", "from": "...", "to": "..."}]}`
pub fn create_diff<T: Serialize>(from: &T, to: &T, resource_type: &str) -> Value {
    let exclude = excluded_fields(resource_type);

    let from_json = match serde_json::to_value(from) {
        Ok(mut v) => {
            filter_fields(&mut v, exclude);
            v
        }
        Err(e) => {
            tracing::error!("Failed to serialize 'from' for diff: {:?}", e);
            return json!({"error": "serialization_failed"});
        }
    };

    let to_json = match serde_json::to_value(to) {
        Ok(mut v) => {
            filter_fields(&mut v, exclude);
            v
        }
        Err(e) => {
            tracing::error!("Failed to serialize 'to' for diff: {:?}", e);
            return json!({"error": "serialization_failed"});
        }
    };

    let mut changes = Vec::new();
    diff_json_recursive(&from_json, &to_json, "", &mut changes);

    if changes.is_empty() {
        json!({"changes": [], "note": "no_changes_detected"})
    } else {
        json!({"changes": changes})
    }
}

/// Create the audit details for a DELETE operation (identifier only).
pub fn create_delete_details(name: &str) -> Value {
    json!({"name": name})
}
