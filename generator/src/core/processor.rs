//! Turning parsed backend output into emitted items

use serde_json::{Map, Value};

/// Key under which the caller's pass-through object is attached
pub const SAVE_DATA_KEY: &str = "saveData";

/// Reply shape after parsing: one element arrays are collapsed to the element
pub fn unwrap_singleton(value: Value) -> Value {
    match value {
        Value::Array(mut items) if items.len() == 1 => items.remove(0),
        other => other,
    }
}

/// Items carried by a parsed reply
///
/// An array yields its elements, `null` yields nothing, anything else is a
/// single item.
pub fn flatten_items(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        Value::Null => Vec::new(),
        other => vec![other],
    }
}

/// Attach `save_data` to an item; `None` when the item is not an object
pub fn merge_save_data(item: Value, save_data: &Map<String, Value>) -> Option<Value> {
    match item {
        Value::Object(mut fields) => {
            fields.insert(SAVE_DATA_KEY.to_string(), Value::Object(save_data.clone()));
            Some(Value::Object(fields))
        }
        _ => None,
    }
}
