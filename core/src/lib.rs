// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use secrecy::ExposeSecret;
use secrecy::SecretString;
use serde::Deserialize;
use serde::Serialize;
use slog::Logger;
use slog::debug;
use slog::info;
use slog::warn;

mod config;
mod error;
mod graph;
mod graph_connector;
mod in_memory_directory;
mod orchestrator;

pub use config::*;
pub use error::*;
pub use graph::*;
pub use graph_connector::*;
pub use in_memory_directory::*;
pub use orchestrator::*;
