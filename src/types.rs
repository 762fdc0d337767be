//! Registry of primitive property descriptors.
//!
//! Most component types in this crate are ordinary Rust structs (see [`crate::component`]):
//! their "schema" is just `Default + Clone`, checked by the compiler. This module exists for
//! the other case the specification calls out — components assembled at runtime from a field
//! map, the way a scripting or editor integration would declare them without a compiled Rust
//! type. A [`PropType`] is the per-field vtable (`default`, `clone`, `copy`) that backs a
//! [`Schema`], and [`SchemaComponent`] is the dynamic, schema-validated component built from it.

use fxhash::FxHashMap;
use std::fmt;

/// The value a schema-driven field can hold. Backed by `serde_json::Value` so hosts can
/// round-trip schema components through JSON without a separate representation.
pub type PropertyValue = serde_json::Value;

/// A named vtable of `default` / `clone` / `copy` for one primitive kind of field value.
///
/// `clone` and `copy` are identical for JSON values (both are structural copies), but are kept
/// as distinct function pointers to mirror the source runtime's `{type, default, clone, copy}`
/// descriptor shape and to leave room for reference-counted or pooled property types later.
pub struct PropType {
    pub name: &'static str,
    default_fn: fn() -> PropertyValue,
    clone_fn: fn(&PropertyValue) -> PropertyValue,
    copy_fn: fn(&PropertyValue, &mut PropertyValue),
}

impl PropType {
    pub fn default_value(&self) -> PropertyValue { (self.default_fn)() }

    pub fn clone_value(&self, value: &PropertyValue) -> PropertyValue { (self.clone_fn)(value) }

    pub fn copy_value(&self, src: &PropertyValue, dst: &mut PropertyValue) {
        (self.copy_fn)(src, dst)
    }
}

impl fmt::Debug for PropType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropType").field("name", &self.name).finish()
    }
}

fn structural_clone(value: &PropertyValue) -> PropertyValue { value.clone() }
fn structural_copy(src: &PropertyValue, dst: &mut PropertyValue) { *dst = src.clone(); }

/// Builds a new [`PropType`] from a name and a default-value constructor.
///
/// `clone`/`copy` are always the structural JSON copy; the factory exists to match the source
/// runtime's `createType(name, default, clone, copy)` surface for hosts that only ever vary the
/// default.
pub const fn create_type(name: &'static str, default_fn: fn() -> PropertyValue) -> PropType {
    PropType { name, default_fn, clone_fn: structural_clone, copy_fn: structural_copy }
}

/// `{name: "Number", default: 0}`.
pub const NUMBER: PropType = create_type("Number", || PropertyValue::from(0_f64));
/// `{name: "Boolean", default: false}`.
pub const BOOLEAN: PropType = create_type("Boolean", || PropertyValue::from(false));
/// `{name: "String", default: ""}`.
pub const STRING: PropType = create_type("String", || PropertyValue::from(""));
/// `{name: "Object", default: {}}`.
pub const OBJECT: PropType =
    create_type("Object", || PropertyValue::Object(serde_json::Map::new()));
/// `{name: "Array", default: []}`.
pub const ARRAY: PropType = create_type("Array", || PropertyValue::Array(Vec::new()));
/// `{name: "JSON", default: null}`.
pub const JSON: PropType = create_type("JSON", || PropertyValue::Null);

/// One field of a [`Schema`]: its property type plus the concrete default for this field.
pub struct SchemaField {
    pub prop_type: &'static PropType,
    pub default: PropertyValue,
}

impl SchemaField {
    pub fn new(prop_type: &'static PropType) -> Self {
        Self { prop_type, default: prop_type.default_value() }
    }

    pub fn with_default(prop_type: &'static PropType, default: PropertyValue) -> Self {
        Self { prop_type, default }
    }
}

/// A mapping from field name to its [`SchemaField`] descriptor.
///
/// Registration fails (see [`Schema::validate`]) only in the degenerate case of an empty
/// schema; every other shape is valid because `SchemaField` can only be built from a real
/// `PropType`, which always carries a default, clone and copy.
#[derive(Default)]
pub struct Schema {
    fields: FxHashMap<String, SchemaField>,
    order: Vec<String>,
}

impl Schema {
    pub fn new() -> Self { Self::default() }

    pub fn field(mut self, name: impl Into<String>, prop_type: &'static PropType) -> Self {
        let name = name.into();
        self.order.push(name.clone());
        self.fields.insert(name, SchemaField::new(prop_type));
        self
    }

    pub fn field_with_default(
        mut self,
        name: impl Into<String>,
        prop_type: &'static PropType,
        default: PropertyValue,
    ) -> Self {
        let name = name.into();
        self.order.push(name.clone());
        self.fields.insert(name, SchemaField::with_default(prop_type, default));
        self
    }

    pub fn validate(&self) -> crate::error::EcsResult<()> {
        if self.fields.is_empty() {
            return Err(crate::error::EcsError::SchemaInvalid(crate::error::ComponentLabel(
                "<schema component>",
            )));
        }
        Ok(())
    }

    pub fn defaults(&self) -> FxHashMap<String, PropertyValue> {
        self.order
            .iter()
            .map(|name| (name.clone(), self.fields[name].default.clone()))
            .collect()
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> { self.order.iter().map(String::as_str) }
}

/// A component assembled at runtime from a [`Schema`] rather than a compiled Rust type.
///
/// `schema` is reference-counted rather than owned outright so every instance of a given
/// schema-driven component type shares one `Schema` without re-validating or re-cloning it per
/// entity. `#[derive(Default)]` works here because `Rc<Schema>: Default` delegates to
/// `Schema::default`, an empty schema — real instances are always built via [`SchemaComponent::new`],
/// which installs the caller's (already-validated) schema and its field defaults.
#[derive(Clone, Default)]
pub struct SchemaComponent {
    schema: std::rc::Rc<Schema>,
    values: FxHashMap<String, PropertyValue>,
}

impl SchemaComponent {
    /// Builds an instance from `schema`, seeded with its field defaults. Fails if `schema` is
    /// empty (see [`Schema::validate`]).
    pub fn new(schema: std::rc::Rc<Schema>) -> crate::error::EcsResult<Self> {
        schema.validate()?;
        let values = schema.defaults();
        Ok(Self { schema, values })
    }

    pub fn get(&self, field: &str) -> Option<&PropertyValue> { self.values.get(field) }

    /// Sets `field` to `value`, routed through the field's `PropType::copy_value` so the stored
    /// value is always a structural copy, never an alias into the caller's value.
    pub fn set(&mut self, field: &str, value: &PropertyValue) {
        let Some(schema_field) = self.schema.fields.get(field) else { return };
        let slot = self.values.entry(field.to_string()).or_insert_with(|| schema_field.prop_type.default_value());
        schema_field.prop_type.copy_value(value, slot);
    }

    pub fn schema(&self) -> &Schema { &self.schema }

    pub fn field_names(&self) -> impl Iterator<Item = &str> { self.schema.field_names() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_prop_types() {
        let schema =
            Schema::new().field("hp", &NUMBER).field("alive", &BOOLEAN).field("name", &STRING);
        let defaults = schema.defaults();
        assert_eq!(defaults["hp"], PropertyValue::from(0_f64));
        assert_eq!(defaults["alive"], PropertyValue::from(false));
        assert_eq!(defaults["name"], PropertyValue::from(""));
    }

    #[test]
    fn empty_schema_is_invalid() {
        assert!(Schema::new().validate().is_err());
    }

    #[test]
    fn create_type_wires_default_and_copy() {
        let t = create_type("Custom", || PropertyValue::from(42_f64));
        let mut dst = PropertyValue::Null;
        t.copy_value(&t.default_value(), &mut dst);
        assert_eq!(dst, PropertyValue::from(42_f64));
    }

    #[test]
    fn schema_component_seeds_defaults_and_accepts_writes() {
        let schema = std::rc::Rc::new(Schema::new().field("hp", &NUMBER).field("tag", &STRING));
        let mut instance = SchemaComponent::new(schema).unwrap();
        assert_eq!(instance.get("hp"), Some(&PropertyValue::from(0_f64)));

        instance.set("hp", &PropertyValue::from(7_f64));
        assert_eq!(instance.get("hp"), Some(&PropertyValue::from(7_f64)));
        // unknown fields are silently ignored, matching a schema that does not declare them
        instance.set("missing", &PropertyValue::from(1_f64));
        assert_eq!(instance.get("missing"), None);
    }

    #[test]
    fn schema_component_rejects_empty_schema() {
        assert!(SchemaComponent::new(std::rc::Rc::new(Schema::new())).is_err());
    }
}
