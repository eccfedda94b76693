// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::net::SocketAddr;

use clap::Parser;
use entra_sync::InMemoryDirectory;
use entra_sync_test_graph_server::create_http_server;
use entra_sync_test_graph_server::create_logger;
use slog::info;

#[derive(Debug, Parser)]
#[clap(about = "Token endpoint and Graph API stand-in for entra-sync")]
struct Args {
    // Note that port "4567" is arbitrarily chosen.
    #[clap(long, default_value = "127.0.0.1:4567")]
    bind_addr: SocketAddr,

    #[clap(long, default_value = "contoso")]
    tenant_id: String,

    #[clap(long, default_value = "entra-sync")]
    client_id: String,

    #[clap(long, env = "TEST_GRAPH_CLIENT_SECRET")]
    client_secret: String,

    /// Display name of the seeded service principal
    #[clap(long, default_value = "AWS Single Sign-On")]
    display_name: String,

    /// Template of the seeded synchronization job
    #[clap(long, default_value = "aWSSingleSignOn")]
    template_id: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let opt: Args = Args::try_parse()?;
    let log = create_logger(slog::Level::Info);

    let directory = InMemoryDirectory::new();
    directory.register_application(
        &opt.tenant_id,
        &opt.client_id,
        &opt.client_secret,
    );

    let service_principal = directory.add_service_principal(&opt.display_name);
    let job = directory
        .add_synchronization_job(&service_principal.id, &opt.template_id);

    info!(log, "seeded directory";
        "tenant_id" => &opt.tenant_id,
        "client_id" => &opt.client_id,
        "service_principal_id" => &service_principal.id,
        "job_id" => &job.id
    );

    let http_server = create_http_server(log, Some(opt.bind_addr), directory)?;
    if let Err(s) = http_server.await {
        anyhow::bail!("Error from start(): {}", s);
    }

    Ok(())
}
