// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::*;

/// Everything that can end a run.
///
/// Apart from an ambiguous display name, which is only logged, every
/// variant is fatal. None of them carry the client secret.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A local capability the run depends on is not available
    #[error("missing prerequisite: {0}")]
    Prerequisite(String),

    /// A required input was empty or only whitespace
    #[error("{0} must not be blank")]
    MissingInput(&'static str),

    /// Acquiring an access token failed
    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("service principal with display name '{0}' not found")]
    ServicePrincipalNotFound(String),

    #[error("no synchronization job found for service principal '{0}'")]
    SynchronizationJobNotFound(String),

    /// Graph rejected a request
    #[error("Graph API error ({status}): {code} - {message}")]
    Graph { status: u16, code: String, message: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Graph answered with something that could not be understood
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("{0} cannot be used as a base URL")]
    InvalidEndpoint(String),
}

/// The OData error envelope returned by Graph.
#[derive(Deserialize, Serialize, Debug)]
pub struct ODataError {
    pub error: ODataErrorBody,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ODataErrorBody {
    pub code: String,
    pub message: String,
}

/// A Graph failure that the in-memory directory can be told to produce.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphFault {
    pub status: u16,
    pub code: String,
    pub message: String,
}

impl GraphFault {
    pub fn new(status: u16, code: &str, message: &str) -> Self {
        Self { status, code: code.to_string(), message: message.to_string() }
    }

    pub fn unauthorized(message: &str) -> Self {
        Self::new(401, "InvalidAuthenticationToken", message)
    }

    pub fn not_found(message: String) -> Self {
        Self {
            status: 404,
            code: "Request_ResourceNotFound".to_string(),
            message,
        }
    }

    pub fn to_odata(&self) -> ODataError {
        ODataError {
            error: ODataErrorBody {
                code: self.code.clone(),
                message: self.message.clone(),
            },
        }
    }
}

impl From<GraphFault> for Error {
    fn from(fault: GraphFault) -> Error {
        let GraphFault { status, code, message } = fault;
        Error::Graph { status, code, message }
    }
}
