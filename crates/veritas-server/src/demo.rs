//! Routes served by the `veritas-demo` binary.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use veritas::prelude::*;
use veritas::RegisterError;
use veritas_config::{DatabaseConfig, DocsConfig, VeritasConfig};

/// Storage connection details injected into every request.
///
/// Stands in for a database client: handlers reach it through
/// [`TypedContext::capability`]. The password is never exposed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StorageHandle {
    /// Database host.
    pub host: String,
    /// Database user.
    pub user: String,
    /// Database name.
    pub database: String,
}

impl From<&DatabaseConfig> for StorageHandle {
    fn from(config: &DatabaseConfig) -> Self {
        Self {
            host: config.host.clone(),
            user: config.user.clone(),
            database: config.database.clone(),
        }
    }
}

/// Query and body accepted by the schema-validated demo routes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestPayload {
    /// Echoed back by the handler.
    pub test: String,
}

fn test_shape() -> Shape {
    Shape::object([("test", Shape::string())])
}

/// Builds the document generator described by the `[docs]` section.
pub fn document_generator(docs: &DocsConfig) -> DocumentGenerator {
    DocumentGenerator::new()
        .title(docs.title.clone())
        .version(docs.version.clone())
        .description(docs.description.clone())
        .server(docs.server_url.clone(), None)
}

/// Builds the demo application.
///
/// The storage handle is only injected when a `[database]` section is
/// configured; without it `/access-db` answers 500.
pub fn build_app(config: &VeritasConfig) -> Result<App, RegisterError> {
    let mut app = App::new();

    if let Some(database) = &config.database {
        app.decorate(std::sync::Arc::new(StorageHandle::from(database)));
    }

    app.get("/", |_ctx: TypedContext| async { ApiResult::Ok("Veritas") }, RouteSpec::new())?;

    app.get(
        "/without-schema",
        |_ctx: TypedContext| async { ApiResult::Ok("Veritas") },
        RouteSpec::new(),
    )?;

    app.get(
        "/with-schema",
        |ctx: TypedContext<Value, TestPayload, Value>| async move { ApiResult::Ok(ctx.query.test) },
        RouteSpec::new().query(test_shape().typed::<TestPayload>()),
    )?;

    app.get(
        "/access-db",
        |ctx: TypedContext| async move {
            let storage = ctx.capability::<StorageHandle>()?;
            ApiResult::Ok(Json(StorageHandle::clone(&storage)))
        },
        RouteSpec::new(),
    )?;

    app.post(
        "/post-with-schema",
        |ctx: TypedContext<Value, Value, TestPayload>| async move {
            ApiResult::Ok(Json(TestPayload {
                test: ctx.body.test,
            }))
        },
        RouteSpec::new()
            .body(test_shape().typed::<TestPayload>())
            .response(200, "Echoes the submitted value", test_shape())
            .summary("Echo a validated body"),
    )?;

    if config.docs.enabled {
        app.serve_docs(&config.docs.path, document_generator(&config.docs))?;
    }

    Ok(app)
}
