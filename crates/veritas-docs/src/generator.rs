//! OpenAPI document generation.
//!
//! [`DocumentGenerator`] turns a [`DocumentRegistry`] into an [`OpenApi`]
//! value. Generation never mutates the registry and produces the same
//! document for the same registry contents.

use http::Method;
use indexmap::IndexMap;
use veritas_core::{Describe, SchemaRef, ShapeKind};

use crate::document::{
    Components, Contact, Info, License, MediaType, OpenApi, Operation, Parameter, ParameterIn,
    RequestBody, Response, Schema, Server,
};
use crate::error::DocsResult;
use crate::registry::{DocumentRegistry, OperationRecord};

/// Media type used for every body and response.
pub const JSON_MEDIA_TYPE: &str = "application/json";

const DEFAULT_RESPONSE_STATUS: &str = "200";
const DEFAULT_RESPONSE_DESCRIPTION: &str = "Successful response";

/// Builds OpenAPI documents from a registry.
///
/// # Example
///
/// ```
/// use veritas_docs::{DocumentGenerator, DocumentRegistry};
///
/// let doc = DocumentGenerator::new()
///     .title("Orders API")
///     .version("2.1.0")
///     .generate(&DocumentRegistry::new());
///
/// assert_eq!(doc.openapi, "3.0.0");
/// assert_eq!(doc.info.title, "Orders API");
/// assert_eq!(doc.servers[0].url, "v1");
/// ```
#[derive(Debug, Clone)]
pub struct DocumentGenerator {
    openapi_version: String,
    title: String,
    version: String,
    description: Option<String>,
    servers: Option<Vec<Server>>,
    contact: Option<Contact>,
    license: Option<License>,
}

impl Default for DocumentGenerator {
    fn default() -> Self {
        Self {
            openapi_version: "3.0.0".to_string(),
            title: "My API".to_string(),
            version: "1.0.0".to_string(),
            description: Some("This is the API".to_string()),
            servers: None,
            contact: None,
            license: None,
        }
    }
}

impl DocumentGenerator {
    /// Creates a generator with the default document metadata.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the `openapi` version field.
    #[must_use]
    pub fn openapi_version(mut self, version: impl Into<String>) -> Self {
        self.openapi_version = version.into();
        self
    }

    /// Sets the API title.
    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Sets the API version.
    #[must_use]
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Sets the API description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Adds a server. The first call replaces the default `v1` server.
    #[must_use]
    pub fn server(mut self, url: impl Into<String>, description: Option<String>) -> Self {
        self.servers.get_or_insert_with(Vec::new).push(Server {
            url: url.into(),
            description,
        });
        self
    }

    /// Sets contact information.
    #[must_use]
    pub fn contact(mut self, contact: Contact) -> Self {
        self.contact = Some(contact);
        self
    }

    /// Sets license information.
    #[must_use]
    pub fn license(mut self, name: impl Into<String>, url: Option<String>) -> Self {
        self.license = Some(License {
            name: name.into(),
            url,
        });
        self
    }

    /// Generates a document from the registry's current contents.
    #[must_use]
    pub fn generate(&self, registry: &DocumentRegistry) -> OpenApi {
        let snapshot = registry.snapshot();

        let mut components = Components::default();
        for (name, schema) in &snapshot.schemas {
            if let Some(shape) = schema.describe() {
                components.schemas.insert(name.clone(), Schema::from(&shape));
            }
        }

        let mut paths: IndexMap<String, IndexMap<String, Operation>> = IndexMap::new();
        for record in &snapshot.operations {
            paths
                .entry(document_path(&record.path))
                .or_default()
                .insert(method_key(&record.method), build_operation(record));
        }

        OpenApi {
            openapi: self.openapi_version.clone(),
            info: Info {
                title: self.title.clone(),
                version: self.version.clone(),
                description: self.description.clone(),
                contact: self.contact.clone(),
                license: self.license.clone(),
            },
            servers: self
                .servers
                .clone()
                .unwrap_or_else(|| vec![Server::new("v1")]),
            paths,
            components,
        }
    }

    /// Generates the document as compact JSON.
    pub fn generate_json(&self, registry: &DocumentRegistry) -> DocsResult<String> {
        Ok(serde_json::to_string(&self.generate(registry))?)
    }

    /// Generates the document as pretty-printed JSON.
    pub fn generate_json_pretty(&self, registry: &DocumentRegistry) -> DocsResult<String> {
        Ok(serde_json::to_string_pretty(&self.generate(registry))?)
    }
}

fn build_operation(record: &OperationRecord) -> Operation {
    let template_params = extract_path_parameters(&record.path);
    let mut parameters = Vec::new();
    if let Some(params) = &record.request.params {
        expand_parameters(params, ParameterIn::Path, &mut parameters);
        parameters.retain(|p| {
            let in_template = template_params.contains(&p.name);
            if !in_template {
                tracing::debug!(
                    path = %record.path,
                    parameter = %p.name,
                    "params field not in path template left undocumented"
                );
            }
            in_template
        });
    }
    // Template parameters the params schema does not declare are still
    // required by the path itself.
    for name in template_params {
        if !parameters
            .iter()
            .any(|p| p.location == ParameterIn::Path && p.name == name)
        {
            parameters.push(Parameter {
                name,
                location: ParameterIn::Path,
                description: None,
                required: true,
                schema: Schema::string(),
            });
        }
    }
    if let Some(query) = &record.request.query {
        expand_parameters(query, ParameterIn::Query, &mut parameters);
    }

    let request_body = record.request.body.as_ref().map(|body| RequestBody {
        description: body.description.clone(),
        required: body.required,
        content: json_content(&body.schema),
    });

    let mut responses: IndexMap<String, Response> = record
        .responses
        .iter()
        .map(|(status, descriptor)| {
            let response = Response {
                description: descriptor.description.clone(),
                content: descriptor
                    .schema
                    .as_deref()
                    .map(json_content)
                    .unwrap_or_default(),
            };
            (status.clone(), response)
        })
        .collect();
    if responses.is_empty() {
        responses.insert(
            DEFAULT_RESPONSE_STATUS.to_string(),
            Response {
                description: DEFAULT_RESPONSE_DESCRIPTION.to_string(),
                content: IndexMap::new(),
            },
        );
    }

    Operation {
        operation_id: record.operation_id.clone(),
        summary: record.summary.clone(),
        description: record.description.clone(),
        tags: record.tags.clone(),
        deprecated: record.deprecated,
        parameters,
        request_body,
        responses,
    }
}

fn json_content(schema_name: &str) -> IndexMap<String, MediaType> {
    let mut content = IndexMap::new();
    content.insert(
        JSON_MEDIA_TYPE.to_string(),
        MediaType {
            schema: Schema::reference(schema_name),
        },
    );
    content
}

fn expand_parameters(schema: &SchemaRef, location: ParameterIn, out: &mut Vec<Parameter>) {
    let Some(shape) = schema.describe() else {
        return;
    };
    let ShapeKind::Object { properties } = shape.kind() else {
        tracing::debug!(
            location = ?location,
            kind = shape.kind().name(),
            "non-object parameter schema left undocumented"
        );
        return;
    };

    for (name, field) in properties {
        out.push(Parameter {
            name: name.clone(),
            location,
            description: field.description().map(str::to_string),
            required: location == ParameterIn::Path || !field.is_optional(),
            schema: Schema::from(field),
        });
    }
}

/// Returns the parameter names in a route template, in order.
///
/// Both `{name}` and trailing `*name` segments count.
///
/// ```
/// use veritas_docs::extract_path_parameters;
///
/// assert_eq!(
///     extract_path_parameters("/orgs/{org}/files/*path"),
///     vec!["org".to_string(), "path".to_string()]
/// );
/// ```
#[must_use]
pub fn extract_path_parameters(path: &str) -> Vec<String> {
    path.split('/')
        .filter_map(|segment| {
            segment
                .strip_prefix('{')
                .and_then(|s| s.strip_suffix('}'))
                .or_else(|| segment.strip_prefix('*'))
        })
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

// Wildcard segments are written `{name}` in documents.
fn document_path(path: &str) -> String {
    path.split('/')
        .map(|segment| match segment.strip_prefix('*') {
            Some(name) if !name.is_empty() => format!("{{{name}}}"),
            _ => segment.to_string(),
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn method_key(method: &Method) -> String {
    method.as_str().to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::registry::{BodyDescriptor, RequestDescriptor, ResponseDescriptor, SchemaKind};
    use serde_json::json;
    use veritas_core::{Passthrough, Shape};

    fn test_shape() -> SchemaRef {
        Arc::new(Shape::object([("test", Shape::string())]))
    }

    #[test]
    fn test_defaults() {
        let doc = DocumentGenerator::new().generate(&DocumentRegistry::new());
        assert_eq!(doc.openapi, "3.0.0");
        assert_eq!(doc.info.title, "My API");
        assert_eq!(doc.info.version, "1.0.0");
        assert_eq!(doc.info.description.as_deref(), Some("This is the API"));
        assert_eq!(doc.servers, vec![Server::new("v1")]);
        assert!(doc.paths.is_empty());
    }

    #[test]
    fn test_custom_servers_replace_default() {
        let doc = DocumentGenerator::new()
            .server("https://api.example.com", Some("production".into()))
            .server("http://localhost:3000", None)
            .generate(&DocumentRegistry::new());
        let urls: Vec<&str> = doc.servers.iter().map(|s| s.url.as_str()).collect();
        assert_eq!(urls, ["https://api.example.com", "http://localhost:3000"]);
    }

    #[test]
    fn test_post_body_and_response_reference_components() {
        let registry = DocumentRegistry::new();
        let body = registry
            .register_keyed("/post-with-schema", SchemaKind::Body, test_shape())
            .unwrap();
        let response = registry
            .register_keyed("/post-with-schema", SchemaKind::Response(200), test_shape())
            .unwrap();

        let mut responses = IndexMap::new();
        responses.insert(
            "200".to_string(),
            ResponseDescriptor::new("Successful response").with_schema(response),
        );
        registry
            .register_path(
                Method::POST,
                "/post-with-schema",
                RequestDescriptor {
                    body: Some(BodyDescriptor::new(body)),
                    ..Default::default()
                },
                responses,
            )
            .unwrap();

        let doc = serde_json::to_value(DocumentGenerator::new().generate(&registry)).unwrap();
        let op = &doc["paths"]["/post-with-schema"]["post"];
        assert_eq!(
            op["requestBody"]["content"]["application/json"]["schema"]["$ref"],
            "#/components/schemas/PostWithSchemaBody"
        );
        assert_eq!(
            op["responses"]["200"]["content"]["application/json"]["schema"]["$ref"],
            "#/components/schemas/PostWithSchemaResponse200"
        );
        assert_eq!(
            doc["components"]["schemas"]["PostWithSchemaBody"],
            json!({"type": "object", "properties": {"test": {"type": "string"}}, "required": ["test"]})
        );
    }

    #[test]
    fn test_query_expands_into_parameters() {
        let registry = DocumentRegistry::new();
        registry
            .register_path(
                Method::GET,
                "/with-schema",
                RequestDescriptor {
                    query: Some(Arc::new(Shape::object([
                        ("test", Shape::string()),
                        ("page", Shape::integer().optional().with_description("page number")),
                    ]))),
                    ..Default::default()
                },
                IndexMap::new(),
            )
            .unwrap();

        let doc = DocumentGenerator::new().generate(&registry);
        let op = doc.operation("/with-schema", "get").unwrap();
        let test = op.parameter("test", ParameterIn::Query).unwrap();
        assert!(test.required);
        let page = op.parameter("page", ParameterIn::Query).unwrap();
        assert!(!page.required);
        assert_eq!(page.description.as_deref(), Some("page number"));
        assert_eq!(op.responses["200"].description, "Successful response");
    }

    #[test]
    fn test_undeclared_path_parameters_are_strings() {
        let registry = DocumentRegistry::new();
        registry
            .register_path(
                Method::GET,
                "/orgs/{org}/users/{id}",
                RequestDescriptor {
                    params: Some(Arc::new(Shape::object([(
                        "id",
                        Shape::integer().coerce(),
                    )]))),
                    ..Default::default()
                },
                IndexMap::new(),
            )
            .unwrap();

        let doc = DocumentGenerator::new().generate(&registry);
        let op = doc.operation("/orgs/{org}/users/{id}", "get").unwrap();
        let names: Vec<&str> = op.parameters.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["id", "org"]);
        assert!(op.parameters.iter().all(|p| p.required));
        assert_eq!(
            op.parameter("org", ParameterIn::Path).unwrap().schema,
            Schema::string()
        );
    }

    #[test]
    fn test_params_fields_outside_template_are_skipped() {
        let registry = DocumentRegistry::new();
        registry
            .register_path(
                Method::GET,
                "/users/{id}",
                RequestDescriptor {
                    params: Some(Arc::new(Shape::object([
                        ("id", Shape::string()),
                        ("tenant", Shape::string()),
                    ]))),
                    ..Default::default()
                },
                IndexMap::new(),
            )
            .unwrap();

        let doc = DocumentGenerator::new().generate(&registry);
        let op = doc.operation("/users/{id}", "get").unwrap();
        let names: Vec<&str> = op.parameters.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["id"]);
        assert!(op.parameter("tenant", ParameterIn::Path).is_none());
    }

    #[test]
    fn test_passthrough_is_not_documented() {
        let registry = DocumentRegistry::new();
        registry
            .register_schema("Opaque", Arc::new(Passthrough))
            .unwrap();
        registry
            .register_path(
                Method::GET,
                "/without-schema",
                RequestDescriptor {
                    query: Some(Arc::new(Passthrough)),
                    ..Default::default()
                },
                IndexMap::new(),
            )
            .unwrap();

        let doc = DocumentGenerator::new().generate(&registry);
        assert!(doc.component("Opaque").is_none());
        assert!(doc
            .operation("/without-schema", "get")
            .unwrap()
            .parameters
            .is_empty());
    }

    #[test]
    fn test_wildcard_written_as_template() {
        assert_eq!(document_path("/files/*path"), "/files/{path}");
        assert_eq!(document_path("/"), "/");
        assert_eq!(extract_path_parameters("/"), Vec::<String>::new());
    }

    #[test]
    fn test_generation_is_deterministic() {
        let registry = DocumentRegistry::new();
        registry
            .register_keyed("/with-schema", SchemaKind::Query, test_shape())
            .unwrap();
        for method in [Method::GET, Method::DELETE, Method::PATCH] {
            registry
                .register_path(method, "/with-schema", RequestDescriptor::default(), IndexMap::new())
                .unwrap();
        }

        let generator = DocumentGenerator::new();
        let first = generator.generate_json(&registry).unwrap();
        let second = generator.generate_json(&registry).unwrap();
        assert_eq!(first, second);

        let doc = generator.generate(&registry);
        let methods: Vec<&String> = doc.paths["/with-schema"].keys().collect();
        assert_eq!(methods, ["get", "delete", "patch"]);
    }

    #[test]
    fn test_pretty_json_parses_back() {
        let registry = DocumentRegistry::new();
        let generator = DocumentGenerator::new().license("MIT", None);
        let pretty = generator.generate_json_pretty(&registry).unwrap();
        let parsed: OpenApi = serde_json::from_str(&pretty).unwrap();
        assert_eq!(parsed, generator.generate(&registry));
    }
}
