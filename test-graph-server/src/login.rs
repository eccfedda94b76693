// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::*;

#[derive(Deserialize, JsonSchema)]
pub struct TokenPathParam {
    tenant_id: String,
}

#[derive(Deserialize, JsonSchema)]
pub struct TokenRequest {
    grant_type: String,
    client_id: String,
    client_secret: String,
    scope: String,
}

fn token_error(
    status: StatusCode,
    error: &str,
    description: String,
) -> Result<Response<Body>, http::Error> {
    json_response(
        status,
        serde_json::json!({
            "error": error,
            "error_description": description,
        }),
    )
}

#[endpoint {
    method = POST,
    path = "/login/{tenant_id}/oauth2/v2.0/token",
    content_type = "application/x-www-form-urlencoded",
}]
pub async fn issue_token(
    rqctx: RequestContext<Arc<ServerContext>>,
    path_param: Path<TokenPathParam>,
    body: TypedBody<TokenRequest>,
) -> Result<Response<Body>, HttpError> {
    let apictx = rqctx.context();
    let path_param = path_param.into_inner();
    let request = body.into_inner();

    if request.grant_type != "client_credentials" {
        return token_error(
            StatusCode::BAD_REQUEST,
            "unsupported_grant_type",
            format!("grant type {} is not supported", request.grant_type),
        )
        .map_err(HttpError::from);
    }

    if !request.scope.ends_with("/.default") {
        return token_error(
            StatusCode::BAD_REQUEST,
            "invalid_scope",
            format!(
                "the provided value for scope {} is not valid, client \
                credential flows must have a scope value with /.default",
                request.scope
            ),
        )
        .map_err(HttpError::from);
    }

    let result = match apictx.directory.issue_token(
        &path_param.tenant_id,
        &request.client_id,
        &request.client_secret,
    ) {
        Ok(token) => json_response(
            StatusCode::OK,
            serde_json::json!({
                "token_type": "Bearer",
                "expires_in": 3599,
                "ext_expires_in": 3599,
                "access_token": token,
            }),
        ),

        Err(Error::Authentication(description)) => token_error(
            StatusCode::UNAUTHORIZED,
            "invalid_client",
            description,
        ),

        Err(error) => token_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "server_error",
            error.to_string(),
        ),
    };

    result.map_err(HttpError::from)
}
