//! OpenAPI 3.0 document types.
//!
//! Only the parts of the format the generator emits are modelled. Every type
//! deserializes as well, so tests and clients can read a served document
//! back into the same structs.
//!
//! <https://spec.openapis.org/oas/v3.0.3>

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use veritas_core::{Shape, ShapeKind};

/// Prefix of every component schema reference.
pub const COMPONENT_SCHEMA_PREFIX: &str = "#/components/schemas/";

/// OpenAPI document root object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenApi {
    /// Format version, `3.0.0` unless overridden.
    pub openapi: String,
    /// API metadata.
    pub info: Info,
    /// Server base URLs.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub servers: Vec<Server>,
    /// Operations grouped by path template.
    #[serde(default)]
    pub paths: IndexMap<String, PathItem>,
    /// Named component schemas.
    #[serde(default)]
    pub components: Components,
}

impl OpenApi {
    /// Returns the operation for a path and lowercase method name.
    #[must_use]
    pub fn operation(&self, path: &str, method: &str) -> Option<&Operation> {
        self.paths.get(path)?.get(method)
    }

    /// Returns a component schema by name.
    #[must_use]
    pub fn component(&self, name: &str) -> Option<&Schema> {
        self.components.schemas.get(name)
    }
}

/// API metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Info {
    /// API title.
    pub title: String,
    /// API version.
    pub version: String,
    /// API description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Contact information.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<Contact>,
    /// License information.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<License>,
}

/// Contact information.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Contact {
    /// Contact name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Contact URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Contact email.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// License information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct License {
    /// License name.
    pub name: String,
    /// License URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// A server base URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Server {
    /// Server URL, absolute or relative to the document.
    pub url: String,
    /// Server description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Server {
    /// Creates a server entry without a description.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            description: None,
        }
    }
}

/// Operations on one path, keyed by lowercase method name.
pub type PathItem = IndexMap<String, Operation>;

/// A documented operation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Operation {
    /// Unique operation identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[serde(rename = "operationId")]
    pub operation_id: Option<String>,
    /// Short summary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Full description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Tags for grouping.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Whether deprecated.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub deprecated: bool,
    /// Path and query parameters.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
    /// Request body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[serde(rename = "requestBody")]
    pub request_body: Option<RequestBody>,
    /// Responses keyed by status code.
    pub responses: IndexMap<String, Response>,
}

impl Operation {
    /// Returns the parameter with `name` in `location`.
    #[must_use]
    pub fn parameter(&self, name: &str, location: ParameterIn) -> Option<&Parameter> {
        self.parameters
            .iter()
            .find(|p| p.name == name && p.location == location)
    }
}

/// Parameter location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterIn {
    /// Query string parameter.
    Query,
    /// URL path parameter.
    Path,
}

/// An operation parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    /// Parameter name.
    pub name: String,
    /// Parameter location.
    #[serde(rename = "in")]
    pub location: ParameterIn,
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether required. Always `true` for path parameters.
    #[serde(default)]
    pub required: bool,
    /// Parameter schema.
    pub schema: Schema,
}

/// Request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestBody {
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether required.
    #[serde(default)]
    pub required: bool,
    /// Content by media type.
    pub content: IndexMap<String, MediaType>,
}

/// Media type content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaType {
    /// Schema for this media type.
    pub schema: Schema,
}

/// Response definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Description (required by the format).
    pub description: String,
    /// Response content by media type.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub content: IndexMap<String, MediaType>,
}

/// Reusable components.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Components {
    /// Named schemas.
    #[serde(default)]
    pub schemas: IndexMap<String, Schema>,
}

/// JSON Schema type keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaType {
    /// String type.
    String,
    /// Number type.
    Number,
    /// Integer type.
    Integer,
    /// Boolean type.
    Boolean,
    /// Array type.
    Array,
    /// Object type.
    Object,
}

/// OpenAPI 3.0 schema object.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Schema {
    /// Schema type. Absent for references and unconstrained values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[serde(rename = "type")]
    pub schema_type: Option<SchemaType>,
    /// Format hint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Reference to a component schema.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[serde(rename = "$ref")]
    pub reference: Option<String>,
    /// Object properties.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub properties: IndexMap<String, Schema>,
    /// Required property names.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    /// Array item schema.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Schema>>,
    /// Inclusive lower bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    /// Inclusive upper bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    /// Minimum string length.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[serde(rename = "minLength")]
    pub min_length: Option<u64>,
    /// Maximum string length.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[serde(rename = "maxLength")]
    pub max_length: Option<u64>,
    /// Regular expression for strings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// Minimum array length.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[serde(rename = "minItems")]
    pub min_items: Option<u64>,
    /// Maximum array length.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[serde(rename = "maxItems")]
    pub max_items: Option<u64>,
    /// Example value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,
    /// Whether `null` is accepted.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub nullable: bool,
}

impl Schema {
    /// A reference to the component schema `name`.
    pub fn reference(name: impl AsRef<str>) -> Self {
        Self {
            reference: Some(format!("{COMPONENT_SCHEMA_PREFIX}{}", name.as_ref())),
            ..Default::default()
        }
    }

    /// A plain string schema.
    #[must_use]
    pub fn string() -> Self {
        Self {
            schema_type: Some(SchemaType::String),
            ..Default::default()
        }
    }

    /// Returns the component name this schema refers to, if it is a reference.
    #[must_use]
    pub fn referenced_name(&self) -> Option<&str> {
        self.reference
            .as_deref()?
            .strip_prefix(COMPONENT_SCHEMA_PREFIX)
    }
}

impl From<&Shape> for Schema {
    fn from(shape: &Shape) -> Self {
        let mut schema = Self {
            description: shape.description().map(str::to_string),
            example: shape.example().cloned(),
            nullable: shape.is_nullable(),
            ..Default::default()
        };

        match shape.kind() {
            ShapeKind::String(rules) => {
                schema.schema_type = Some(SchemaType::String);
                schema.min_length = rules.min_length.map(|n| n as u64);
                schema.max_length = rules.max_length.map(|n| n as u64);
                schema.pattern = rules.pattern.as_ref().map(|p| p.as_str().to_string());
                schema.format.clone_from(&rules.format);
            }
            ShapeKind::Integer(rules) | ShapeKind::Number(rules) => {
                schema.schema_type = Some(if matches!(shape.kind(), ShapeKind::Integer(_)) {
                    SchemaType::Integer
                } else {
                    SchemaType::Number
                });
                schema.minimum = rules.minimum;
                schema.maximum = rules.maximum;
            }
            ShapeKind::Boolean => schema.schema_type = Some(SchemaType::Boolean),
            ShapeKind::Array {
                items,
                min_items,
                max_items,
            } => {
                schema.schema_type = Some(SchemaType::Array);
                schema.items = Some(Box::new(Self::from(items.as_ref())));
                schema.min_items = min_items.map(|n| n as u64);
                schema.max_items = max_items.map(|n| n as u64);
            }
            ShapeKind::Object { properties } => {
                schema.schema_type = Some(SchemaType::Object);
                for (name, field) in properties {
                    if !field.is_optional() {
                        schema.required.push(name.clone());
                    }
                    schema.properties.insert(name.clone(), Self::from(field));
                }
            }
            ShapeKind::Any => {}
            // 3.0 has no null type; an untyped nullable schema is the closest.
            ShapeKind::Null => schema.nullable = true,
        }

        schema
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_reference_round_trips_name() {
        let schema = Schema::reference("PostWithSchemaBody");
        assert_eq!(
            schema.reference.as_deref(),
            Some("#/components/schemas/PostWithSchemaBody")
        );
        assert_eq!(schema.referenced_name(), Some("PostWithSchemaBody"));
        assert_eq!(Schema::string().referenced_name(), None);
    }

    #[test]
    fn test_object_shape_lists_required_fields() {
        let shape = Shape::object([
            ("test", Shape::string()),
            ("page", Shape::integer().minimum(1.0).optional()),
        ]);
        let schema = Schema::from(&shape);

        assert_eq!(schema.schema_type, Some(SchemaType::Object));
        assert_eq!(schema.required, vec!["test".to_string()]);
        assert_eq!(schema.properties["page"].minimum, Some(1.0));
        assert_eq!(
            schema.properties["page"].schema_type,
            Some(SchemaType::Integer)
        );
    }

    #[test]
    fn test_string_rules_are_documented() {
        let shape = Shape::string()
            .min_length(2)
            .max_length(8)
            .format("email")
            .pattern("^[a-z]+$")
            .unwrap()
            .with_description("lowercase handle");
        let value = serde_json::to_value(Schema::from(&shape)).unwrap();

        assert_eq!(
            value,
            json!({
                "type": "string",
                "format": "email",
                "description": "lowercase handle",
                "minLength": 2,
                "maxLength": 8,
                "pattern": "^[a-z]+$"
            })
        );
    }

    #[test]
    fn test_array_and_nullable() {
        let shape = Shape::array(Shape::boolean()).max_items(3).nullable();
        let schema = Schema::from(&shape);
        assert!(schema.nullable);
        assert_eq!(schema.max_items, Some(3));
        assert_eq!(
            schema.items.as_deref().and_then(|s| s.schema_type),
            Some(SchemaType::Boolean)
        );
    }

    #[test]
    fn test_any_is_untyped() {
        let value = serde_json::to_value(Schema::from(&Shape::any())).unwrap();
        assert_eq!(value, json!({}));
    }

    #[test]
    fn test_document_deserializes() {
        let doc: OpenApi = serde_json::from_value(json!({
            "openapi": "3.0.0",
            "info": {"title": "My API", "version": "1.0.0"},
            "paths": {
                "/with-schema": {
                    "get": {
                        "parameters": [{
                            "name": "test",
                            "in": "query",
                            "required": true,
                            "schema": {"type": "string"}
                        }],
                        "responses": {"200": {"description": "Successful response"}}
                    }
                }
            }
        }))
        .unwrap();

        let op = doc.operation("/with-schema", "get").unwrap();
        assert!(op.parameter("test", ParameterIn::Query).unwrap().required);
        assert!(doc.components.schemas.is_empty());
    }
}
