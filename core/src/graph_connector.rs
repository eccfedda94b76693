// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::*;

use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use reqwest::StatusCode;
use reqwest::Url;
use reqwest::blocking::Client;
use reqwest::blocking::Response;
use serde::de::DeserializeOwned;

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
    token_type: String,
}

/// The error body of the token endpoint (RFC 6749, section 5.2)
#[derive(Deserialize)]
struct TokenErrorResponse {
    error: String,
    error_description: Option<String>,
}

/// Authenticates with the client credentials flow and hands out Graph
/// sessions.
pub struct GraphConnector {
    log: Logger,
    client: Client,
    endpoints: Endpoints,
}

impl GraphConnector {
    pub fn new(log: Logger, endpoints: Endpoints) -> Result<Self, Error> {
        let client = Client::builder().build().map_err(|e| {
            Error::Prerequisite(format!("cannot build HTTP client: {e}"))
        })?;

        Ok(Self { log, client, endpoints })
    }

    fn token_url(&self, tenant_id: &str) -> Result<Url, Error> {
        extend_url(
            &self.endpoints.login_url,
            &[tenant_id, "oauth2", "v2.0", "token"],
        )
    }
}

impl Connector for GraphConnector {
    type Session = GraphSession;

    fn authenticate(
        &self,
        credentials: &Credentials,
    ) -> Result<GraphSession, Error> {
        let url = self.token_url(credentials.tenant_id())?;

        debug!(self.log, "requesting access token";
            "token_url" => %url,
            "client_id" => credentials.client_id(),
            "scope" => &self.endpoints.scope
        );

        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", credentials.client_id()),
            ("client_secret", credentials.client_secret().expose_secret()),
            ("scope", self.endpoints.scope.as_str()),
        ];

        // The URL is safe to report; the form body is not.
        let result = self.client.post(url).form(&params).send().map_err(|e| {
            Error::Authentication(format!(
                "token request failed: {}",
                e.without_url()
            ))
        })?;

        let status = result.status();
        let body = result.text().map_err(|e| {
            Error::Authentication(format!("reading token response: {e}"))
        })?;

        if !status.is_success() {
            let detail = match serde_json::from_str::<TokenErrorResponse>(&body)
            {
                Ok(TokenErrorResponse {
                    error,
                    error_description: Some(description),
                }) => format!("{error}: {description}"),

                Ok(TokenErrorResponse { error, error_description: None }) => {
                    error
                }

                Err(_) => format!("token endpoint returned {status}"),
            };

            return Err(Error::Authentication(detail));
        }

        let token: TokenResponse =
            serde_json::from_str(&body).map_err(|e| {
                Error::Authentication(format!(
                    "token response did not parse: {e}"
                ))
            })?;

        if !token.token_type.eq_ignore_ascii_case("bearer") {
            return Err(Error::Authentication(format!(
                "unsupported token type {}",
                token.token_type
            )));
        }

        let expires_at = token_expiry(Utc::now(), token.expires_in)?;

        debug!(self.log, "acquired access token";
            "expires_at" => %expires_at.format("%Y-%m-%d %H:%M:%S UTC")
        );

        Ok(GraphSession {
            log: self.log.clone(),
            client: self.client.clone(),
            graph_url: self.endpoints.graph_url.clone(),
            token: SecretString::from(token.access_token),
            expires_at,
        })
    }
}

/// A bearer token plus the Graph base URL it is good for.
pub struct GraphSession {
    log: Logger,
    client: Client,
    graph_url: Url,
    token: SecretString,
    expires_at: DateTime<Utc>,
}

impl GraphSession {
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    fn url(&self, segments: &[&str]) -> Result<Url, Error> {
        extend_url(&self.graph_url, segments)
    }

    fn get_collection<T>(
        &self,
        request: reqwest::blocking::RequestBuilder,
    ) -> Result<Vec<T>, Error>
    where
        T: DeserializeOwned,
    {
        let result = request.bearer_auth(self.token.expose_secret()).send()?;
        let collection: ODataCollection<T> = check_response(result)?
            .json()
            .map_err(|e| Error::InvalidResponse(format!("{e}")))?;

        Ok(collection.value)
    }
}

impl Session for GraphSession {
    fn list_service_principals(
        &self,
        display_name: &str,
    ) -> Result<Vec<ServicePrincipal>, Error> {
        let url = self.url(&["servicePrincipals"])?;
        let filter = display_name_filter(display_name);

        debug!(self.log, "listing service principals"; "filter" => &filter);

        // Advanced queries on servicePrincipals need $count and eventual
        // consistency.
        let request = self
            .client
            .get(url)
            .header("ConsistencyLevel", "eventual")
            .query(&[
                ("$filter", filter.as_str()),
                ("$count", "true"),
                ("$select", "id,displayName"),
            ]);

        self.get_collection(request)
    }

    fn list_synchronization_jobs(
        &self,
        service_principal_id: &str,
    ) -> Result<Vec<SynchronizationJob>, Error> {
        let url = self.url(&[
            "servicePrincipals",
            service_principal_id,
            "synchronization",
            "jobs",
        ])?;

        debug!(self.log, "listing synchronization jobs";
            "service_principal_id" => service_principal_id
        );

        let jobs: Vec<SynchronizationJob> =
            self.get_collection(self.client.get(url))?;

        Ok(jobs
            .into_iter()
            .map(|job| SynchronizationJob {
                service_principal_id: service_principal_id.to_string(),
                ..job
            })
            .collect())
    }

    fn start_synchronization_job(
        &self,
        service_principal_id: &str,
        job_id: &str,
    ) -> Result<StartOutcome, Error> {
        let url = self.url(&[
            "servicePrincipals",
            service_principal_id,
            "synchronization",
            "jobs",
            job_id,
            "start",
        ])?;

        debug!(self.log, "starting synchronization job";
            "service_principal_id" => service_principal_id,
            "job_id" => job_id
        );

        let result = self
            .client
            .post(url)
            .bearer_auth(self.token.expose_secret())
            .header(reqwest::header::CONTENT_LENGTH, 0)
            .send()?;

        let body = check_response(result)?.text()?;

        Ok(StartOutcome::from_body(body))
    }

    fn close(self) {
        // Client credential tokens can't be revoked; dropping the session
        // zeroes the token.
        debug!(self.log, "closing Graph session");
    }
}

/// When a token issued at `now` stops being valid. `expires_in` comes from
/// the token endpoint, so out of range values are an error.
fn token_expiry(
    now: DateTime<Utc>,
    expires_in: i64,
) -> Result<DateTime<Utc>, Error> {
    Duration::try_seconds(expires_in)
        .and_then(|lifetime| now.checked_add_signed(lifetime))
        .ok_or_else(|| {
            Error::Authentication("token expiry out of range".to_string())
        })
}

/// Appends path segments to `base`, percent-encoding each of them.
fn extend_url(base: &Url, segments: &[&str]) -> Result<Url, Error> {
    let mut url = base.clone();

    url.path_segments_mut()
        .map_err(|_| Error::InvalidEndpoint(base.to_string()))?
        .pop_if_empty()
        .extend(segments);

    Ok(url)
}

/// Passes 2xx responses through and turns everything else into
/// `Error::Graph`.
fn check_response(result: Response) -> Result<Response, Error> {
    let status = result.status();

    if status.is_success() {
        return Ok(result);
    }

    let body = result.text()?;

    Err(graph_error(status, body))
}

fn graph_error(status: StatusCode, body: String) -> Error {
    match serde_json::from_str::<ODataError>(&body) {
        Ok(ODataError { error: ODataErrorBody { code, message } }) => {
            Error::Graph { status: status.as_u16(), code, message }
        }

        Err(_) => Error::Graph {
            status: status.as_u16(),
            code: status.canonical_reason().unwrap_or("Unknown").to_string(),
            message: body,
        },
    }
}
