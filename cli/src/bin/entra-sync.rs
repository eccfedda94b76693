// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use anyhow::Context;
use clap::Parser;
use entra_sync::DEFAULT_GRAPH_URL;
use entra_sync::DEFAULT_LOGIN_URL;
use entra_sync::DEFAULT_SCOPE;
use entra_sync::Endpoints;
use entra_sync::GraphConnector;
use entra_sync::Orchestrator;
use entra_sync_cli::TerminalPrompter;
use entra_sync_cli::create_logger;
use entra_sync_cli::ensure_interactive;
use entra_sync_cli::prompt_config;
use reqwest::Url;
use slog::o;

#[derive(Debug, Parser)]
#[clap(
    about = "Start a service principal's provisioning job now instead of \
    waiting for its next scheduled run",
    after_long_help = "Endpoint overrides, for pointing the tool at a test \
    server:\n  \
    ENTRA_SYNC_LOGIN_URL  (--login-url)  token endpoint base URL\n  \
    ENTRA_SYNC_GRAPH_URL  (--graph-url)  Graph API base URL\n  \
    ENTRA_SYNC_SCOPE      (--scope)      scope requested for the token"
)]
struct Args {
    /// Log every step
    #[clap(short, long)]
    verbose: bool,

    /// Base URL of the token endpoint; the tenant id is appended
    #[clap(
        long,
        env = "ENTRA_SYNC_LOGIN_URL",
        default_value = DEFAULT_LOGIN_URL,
        hide = true
    )]
    login_url: Url,

    /// Base URL of the Graph API, including its version
    #[clap(
        long,
        env = "ENTRA_SYNC_GRAPH_URL",
        default_value = DEFAULT_GRAPH_URL,
        hide = true
    )]
    graph_url: Url,

    /// Scope requested with the client credentials grant
    #[clap(
        long,
        env = "ENTRA_SYNC_SCOPE",
        default_value = DEFAULT_SCOPE,
        hide = true
    )]
    scope: String,
}

fn main() -> anyhow::Result<()> {
    let opt = Args::parse();
    let log = create_logger(opt.verbose);

    ensure_interactive()?;

    let endpoints = Endpoints::new(opt.login_url, opt.graph_url, opt.scope)?;

    println!("--- Provisioning Sync ---");

    let config = prompt_config(&mut TerminalPrompter)?;

    let connector =
        GraphConnector::new(log.new(o!("component" => "graph")), endpoints)?;

    let report = Orchestrator::new(log, connector)
        .run(config)
        .context("synchronization job was not started")?;

    println!("{}", report.outcome);

    Ok(())
}
