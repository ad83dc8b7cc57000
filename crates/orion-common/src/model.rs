use serde_json::Value;

/// A node or edge is a JSON object: an open-ended map from property name to
/// value. `spec.md` §3 only requires a handful of fields to be present; the
/// rest is caller-defined, so we keep the representation as close to the
/// wire format (`serde_json::Map`) as possible rather than introducing a
/// bespoke struct that would need to special-case every parser's extra
/// fields.
pub type Entity = serde_json::Map<String, Value>;

/// Read a required string property, as `spec.md`'s node/edge schemas expect.
pub fn get_str<'a>(entity: &'a Entity, key: &str) -> Option<&'a str> {
    entity.get(key).and_then(Value::as_str)
}

/// Read a list-valued property as a slice, treating a missing key as empty
/// rather than an error, matching the original's tolerant property access.
pub fn get_list<'a>(entity: &'a Entity, key: &str) -> &'a [Value] {
    entity
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// True if `entity[key]` is present and "truthy" in the Python sense this
/// pipeline was ported from: not null, not an empty string, and not an empty
/// list. Used by the entity-merge function to decide whether a right-hand
/// value should be combined in at all.
pub fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        _ => true,
    }
}
