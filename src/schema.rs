use crate::model::{FieldType, Form, FormField};
use serde_json::Value;

/// Checks a submission payload against the form's field schema before any
/// store mutation. Returns the first violation as a message for the caller's
/// `validation_failed` response. Keys that no longer match a form field are
/// left alone: orphaned values survive a form edit, and rejecting them would
/// lock schools out of their own drafts.
pub fn validate_submission_data(
    form: &Form,
    data: &serde_json::Map<String, Value>,
) -> Result<(), String> {
    for field in &form.fields {
        let Some(value) = data.get(&field.id) else {
            continue;
        };
        if value.is_null() {
            // A cleared value (e.g. a removed file) is stored as null.
            continue;
        }
        validate_field_value(field, value)?;
    }
    Ok(())
}

fn validate_field_value(field: &FormField, value: &Value) -> Result<(), String> {
    match field.field_type {
        FieldType::Text | FieldType::Textarea | FieldType::Date | FieldType::Dropdown => {
            if !value.is_string() {
                return Err(format!("field '{}' expects a string", field.label));
            }
        }
        FieldType::Number => {
            // Numbers travel as strings, the way the form inputs produce
            // them. An empty string is an untouched input.
            let Some(s) = value.as_str() else {
                return Err(format!("field '{}' expects a number as a string", field.label));
            };
            if !s.is_empty() && s.trim().parse::<f64>().is_err() {
                return Err(format!("field '{}' is not a number: {}", field.label, s));
            }
        }
        FieldType::Boolean => {
            if !value.is_boolean() {
                return Err(format!("field '{}' expects true/false", field.label));
            }
        }
        FieldType::MultiSelect => {
            let Some(items) = value.as_array() else {
                return Err(format!("field '{}' expects a list of options", field.label));
            };
            if !items.iter().all(Value::is_string) {
                return Err(format!("field '{}' expects string options", field.label));
            }
            // Selections come from the field's option list, nowhere else.
            if let Some(options) = &field.options {
                for item in items {
                    let picked = item.as_str().unwrap_or_default();
                    if !options.iter().any(|o| o == picked) {
                        return Err(format!(
                            "field '{}' has no option '{}'",
                            field.label, picked
                        ));
                    }
                }
            }
        }
        FieldType::File => {
            let Some(s) = value.as_str() else {
                return Err(format!("field '{}' expects an inline file", field.label));
            };
            if !s.starts_with("data:") {
                return Err(format!("field '{}' expects a data: URI", field.label));
            }
        }
        FieldType::Table => validate_table_value(field, value)?,
    }
    Ok(())
}

fn validate_table_value(field: &FormField, value: &Value) -> Result<(), String> {
    let Some(rows) = value.as_array() else {
        return Err(format!("field '{}' expects table rows", field.label));
    };
    if rows.is_empty() {
        // Free tables keep a floor of one row; fixed tables are never empty
        // either, so an empty array is always a caller error.
        return Err(format!("field '{}' must keep at least one row", field.label));
    }
    if let Some(labels) = field.fixed_rows() {
        if rows.len() != labels.len() {
            return Err(format!(
                "field '{}' has {} fixed rows, got {}",
                field.label,
                labels.len(),
                rows.len()
            ));
        }
    }
    let columns: Vec<&FormField> = field.sub_fields.iter().flatten().collect();
    for (idx, row) in rows.iter().enumerate() {
        let Some(cells) = row.as_object() else {
            return Err(format!("field '{}' row {} is not an object", field.label, idx + 1));
        };
        for col in &columns {
            if let Some(cell) = cells.get(&col.id) {
                if !cell.is_string() {
                    return Err(format!(
                        "field '{}' row {} column '{}' expects text",
                        field.label,
                        idx + 1,
                        col.label
                    ));
                }
            }
        }
    }
    Ok(())
}

/// Prepares stored submission data for editing. Every TABLE field is
/// reconciled in place: fixed-row tables end up with exactly one row per
/// label (padding with empty rows, truncating extras), free tables get a
/// single empty row when nothing was stored yet.
pub fn reconcile_tables(form: &Form, data: &mut serde_json::Map<String, Value>) {
    for field in &form.fields {
        if field.field_type != FieldType::Table {
            continue;
        }
        let rows = match data.get(&field.id).and_then(Value::as_array) {
            Some(rows) => rows.clone(),
            None => Vec::new(),
        };
        let reconciled = match field.fixed_rows() {
            Some(labels) => (0..labels.len())
                .map(|i| rows.get(i).cloned().unwrap_or_else(empty_row))
                .collect::<Vec<_>>(),
            None => {
                if rows.is_empty() {
                    vec![empty_row()]
                } else {
                    rows
                }
            }
        };
        data.insert(field.id.clone(), Value::Array(reconciled));
    }
}

fn empty_row() -> Value {
    Value::Object(serde_json::Map::new())
}
