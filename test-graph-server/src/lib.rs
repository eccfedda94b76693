// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! An HTTP server that answers the token endpoint and the handful of Graph
//! calls `entra-sync` makes, backed by an [`InMemoryDirectory`].

use std::net::SocketAddr;
use std::sync::Arc;

use dropshot::ApiDescription;
use dropshot::Body;
use dropshot::ConfigDropshot;
use dropshot::HttpError;
use dropshot::HttpServer;
use dropshot::Path;
use dropshot::Query;
use dropshot::RequestContext;
use dropshot::ServerBuilder;
use dropshot::TypedBody;
use dropshot::endpoint;
use http::Response;
use http::StatusCode;
use schemars::JsonSchema;
use serde::Deserialize;
use slog::Drain;
use slog::Logger;
use slog::o;

use entra_sync::Error;
use entra_sync::GraphFault;
use entra_sync::InMemoryDirectory;

mod graph;
mod login;

pub struct ServerContext {
    pub directory: InMemoryDirectory,
}

/// A terminal logger at `level`, for the server binary and tests.
pub fn create_logger(level: slog::Level) -> Logger {
    let decorator = slog_term::TermDecorator::new().build();
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();
    let drain = slog::LevelFilter::new(drain, level).fuse();

    Logger::root(drain, o!("component" => "test-graph-server"))
}

/// Starts serving `directory`. With no `bind_address`, an ephemeral port
/// on localhost is used; see `HttpServer::local_addr`.
pub fn create_http_server(
    log: Logger,
    bind_address: Option<SocketAddr>,
    directory: InMemoryDirectory,
) -> anyhow::Result<HttpServer<Arc<ServerContext>>> {
    let mut api = ApiDescription::new();

    api.register(login::issue_token)
        .map_err(|e| anyhow::anyhow!("{e}"))?;
    api.register(graph::list_service_principals)
        .map_err(|e| anyhow::anyhow!("{e}"))?;
    api.register(graph::list_synchronization_jobs)
        .map_err(|e| anyhow::anyhow!("{e}"))?;
    api.register(graph::start_synchronization_job)
        .map_err(|e| anyhow::anyhow!("{e}"))?;

    let mut config = ConfigDropshot::default();
    if let Some(bind_address) = bind_address {
        config.bind_address = bind_address;
    }

    let context = Arc::new(ServerContext { directory });

    let server = ServerBuilder::new(api, context, log).config(config).start()?;

    Ok(server)
}

fn json_response(
    status: StatusCode,
    body: serde_json::Value,
) -> Result<Response<Body>, http::Error> {
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(body.to_string().into())
}
