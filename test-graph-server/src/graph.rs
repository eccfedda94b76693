// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::*;

fn fault_response(fault: GraphFault) -> Result<Response<Body>, http::Error> {
    json_response(
        StatusCode::from_u16(fault.status)
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        serde_json::json!(fault.to_odata()),
    )
}

/// Checks the bearer token of a Graph request.
fn authorize(
    rqctx: &RequestContext<Arc<ServerContext>>,
) -> Result<(), GraphFault> {
    let token = rqctx
        .request
        .headers()
        .get(http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| {
            GraphFault::unauthorized(
                "Access token is empty or missing from the request.",
            )
        })?;

    rqctx.context().directory.check_token(token)
}

/// Pulls the display name out of `displayName eq '<name>'`, undoing the
/// doubled single quotes of OData string literals.
pub fn parse_display_name_filter(filter: &str) -> Option<String> {
    let literal = filter
        .trim()
        .strip_prefix("displayName eq '")?
        .strip_suffix('\'')?;

    // Every remaining quote has to be part of an escaped pair
    if literal.replace("''", "").contains('\'') {
        return None;
    }

    Some(literal.replace("''", "'"))
}

#[derive(Deserialize, JsonSchema)]
pub struct ListQueryParams {
    #[serde(rename = "$filter")]
    filter: Option<String>,

    #[serde(rename = "$count")]
    count: Option<bool>,

    #[serde(rename = "$select")]
    #[allow(dead_code)]
    select: Option<String>,
}

#[endpoint {
    method = GET,
    path = "/v1.0/servicePrincipals"
}]
pub async fn list_service_principals(
    rqctx: RequestContext<Arc<ServerContext>>,
    query_params: Query<ListQueryParams>,
) -> Result<Response<Body>, HttpError> {
    let apictx = rqctx.context();
    let query_params = query_params.into_inner();

    if let Err(fault) = authorize(&rqctx) {
        return fault_response(fault).map_err(HttpError::from);
    }

    let eventual = rqctx
        .request
        .headers()
        .get("ConsistencyLevel")
        .is_some_and(|value| value == "eventual");

    // Graph rejects $count on directory objects without this header.
    if query_params.count == Some(true) && !eventual {
        return fault_response(GraphFault::new(
            400,
            "Request_UnsupportedQuery",
            "$count requires the ConsistencyLevel header set to eventual.",
        ))
        .map_err(HttpError::from);
    }

    let Some(display_name) =
        query_params.filter.as_deref().and_then(parse_display_name_filter)
    else {
        return fault_response(GraphFault::new(
            400,
            "Request_UnsupportedQuery",
            "Only displayName eq filters are supported.",
        ))
        .map_err(HttpError::from);
    };

    let service_principals =
        apictx.directory.service_principals_named(&display_name);

    json_response(
        StatusCode::OK,
        serde_json::json!({
            "@odata.count": service_principals.len(),
            "value": service_principals,
        }),
    )
    .map_err(HttpError::from)
}

#[derive(Deserialize, JsonSchema)]
pub struct JobsPathParam {
    service_principal_id: String,
}

#[endpoint {
    method = GET,
    path = "/v1.0/servicePrincipals/{service_principal_id}/synchronization/jobs"
}]
pub async fn list_synchronization_jobs(
    rqctx: RequestContext<Arc<ServerContext>>,
    path_param: Path<JobsPathParam>,
) -> Result<Response<Body>, HttpError> {
    let apictx = rqctx.context();
    let path_param = path_param.into_inner();

    if let Err(fault) = authorize(&rqctx) {
        return fault_response(fault).map_err(HttpError::from);
    }

    let result = match apictx
        .directory
        .synchronization_jobs(&path_param.service_principal_id)
    {
        Ok(jobs) => json_response(
            StatusCode::OK,
            serde_json::json!({ "value": jobs }),
        ),
        Err(fault) => fault_response(fault),
    };

    result.map_err(HttpError::from)
}

#[derive(Deserialize, JsonSchema)]
pub struct StartJobPathParam {
    service_principal_id: String,
    job_id: String,
}

#[endpoint {
    method = POST,
    path = "/v1.0/servicePrincipals/{service_principal_id}/synchronization/jobs/{job_id}/start"
}]
pub async fn start_synchronization_job(
    rqctx: RequestContext<Arc<ServerContext>>,
    path_param: Path<StartJobPathParam>,
) -> Result<Response<Body>, HttpError> {
    let apictx = rqctx.context();
    let path_param = path_param.into_inner();

    if let Err(fault) = authorize(&rqctx) {
        return fault_response(fault).map_err(HttpError::from);
    }

    let result = match apictx
        .directory
        .start_job(&path_param.service_principal_id, &path_param.job_id)
    {
        Ok(body) if body.is_empty() => Response::builder()
            .status(StatusCode::NO_CONTENT)
            .body(Body::empty()),

        Ok(body) => Response::builder()
            .status(StatusCode::OK)
            .header("Content-Type", "application/json")
            .body(body.into()),

        Err(fault) => fault_response(fault),
    };

    result.map_err(HttpError::from)
}
