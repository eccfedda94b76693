// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::*;

use reqwest::Url;

pub const DEFAULT_LOGIN_URL: &str = "https://login.microsoftonline.com";
pub const DEFAULT_GRAPH_URL: &str = "https://graph.microsoft.com/v1.0";
pub const DEFAULT_SCOPE: &str = "https://graph.microsoft.com/.default";

fn require(field: &'static str, value: String) -> Result<String, Error> {
    let value = value.trim().to_string();

    if value.is_empty() {
        return Err(Error::MissingInput(field));
    }

    Ok(value)
}

/// Like `require`, but hands back the value exactly as given.
fn require_verbatim(
    field: &'static str,
    value: String,
) -> Result<String, Error> {
    if value.trim().is_empty() {
        return Err(Error::MissingInput(field));
    }

    Ok(value)
}

/// An application's client secret. Zeroed on drop and redacted in `Debug`.
#[derive(Debug)]
pub struct ClientSecret(SecretString);

impl ClientSecret {
    pub fn new(secret: String) -> Result<Self, Error> {
        // Only the blank check trims; the stored secret is kept as entered.
        if secret.trim().is_empty() {
            return Err(Error::MissingInput("client secret"));
        }

        Ok(Self(SecretString::from(secret)))
    }

    pub fn expose_secret(&self) -> &str {
        self.0.expose_secret()
    }
}

/// The application identity used for the client credentials flow.
#[derive(Debug)]
pub struct Credentials {
    tenant_id: String,
    client_id: String,
    client_secret: ClientSecret,
}

impl Credentials {
    pub fn new(
        tenant_id: String,
        client_id: String,
        client_secret: ClientSecret,
    ) -> Result<Self, Error> {
        Ok(Self {
            tenant_id: require("tenant id", tenant_id)?,
            client_id: require("application id", client_id)?,
            client_secret,
        })
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn client_secret(&self) -> &ClientSecret {
        &self.client_secret
    }
}

/// Everything a single run needs, built once at startup.
#[derive(Debug)]
pub struct Config {
    pub credentials: Credentials,
    pub display_name: String,
}

impl Config {
    pub fn new(
        credentials: Credentials,
        display_name: String,
    ) -> Result<Self, Error> {
        Ok(Self {
            credentials,
            // Matched exactly, so surrounding whitespace is significant
            display_name: require_verbatim("display name", display_name)?,
        })
    }
}

/// Where to authenticate and which Graph API version to talk to.
#[derive(Clone, Debug)]
pub struct Endpoints {
    pub login_url: Url,
    pub graph_url: Url,
    pub scope: String,
}

impl Endpoints {
    pub fn new(
        login_url: Url,
        graph_url: Url,
        scope: String,
    ) -> Result<Self, Error> {
        for url in [&login_url, &graph_url] {
            if url.cannot_be_a_base() {
                return Err(Error::InvalidEndpoint(url.to_string()));
            }
        }

        Ok(Self { login_url, graph_url, scope: require("scope", scope)? })
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            login_url: Url::parse(DEFAULT_LOGIN_URL)
                .expect("default login url parses"),
            graph_url: Url::parse(DEFAULT_GRAPH_URL)
                .expect("default graph url parses"),
            scope: DEFAULT_SCOPE.to_string(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn secret() -> ClientSecret {
        ClientSecret::new("s3cr3t~value".to_string()).unwrap()
    }

    #[test]
    fn test_blank_inputs_are_rejected() {
        assert!(matches!(
            ClientSecret::new("   ".to_string()),
            Err(Error::MissingInput("client secret")),
        ));

        assert!(matches!(
            Credentials::new(String::new(), "app".to_string(), secret()),
            Err(Error::MissingInput("tenant id")),
        ));

        assert!(matches!(
            Credentials::new("tenant".to_string(), "\t".to_string(), secret()),
            Err(Error::MissingInput("application id")),
        ));

        let credentials =
            Credentials::new("tenant".to_string(), "app".to_string(), secret())
                .unwrap();

        assert!(matches!(
            Config::new(credentials, " \n".to_string()),
            Err(Error::MissingInput("display name")),
        ));
    }

    #[test]
    fn test_identifiers_are_trimmed_display_name_is_not() {
        let credentials = Credentials::new(
            " tenant ".to_string(),
            "app\n".to_string(),
            secret(),
        )
        .unwrap();

        assert_eq!(credentials.tenant_id(), "tenant");
        assert_eq!(credentials.client_id(), "app");

        let config =
            Config::new(credentials, " AWS Single Sign-On ".to_string())
                .unwrap();
        assert_eq!(config.display_name, " AWS Single Sign-On ");
    }

    #[test]
    fn test_secret_is_not_in_debug_output() {
        let credentials =
            Credentials::new("tenant".to_string(), "app".to_string(), secret())
                .unwrap();
        let config = Config::new(credentials, "AWS".to_string()).unwrap();

        let debug = format!("{config:?}");
        assert!(!debug.contains("s3cr3t~value"));
        assert!(debug.contains("tenant"));

        assert_eq!(
            config.credentials.client_secret().expose_secret(),
            "s3cr3t~value"
        );
    }

    #[test]
    fn test_endpoints() {
        let endpoints = Endpoints::default();
        assert_eq!(
            endpoints.graph_url.as_str(),
            "https://graph.microsoft.com/v1.0"
        );

        let result = Endpoints::new(
            Url::parse("mailto:admin@example.com").unwrap(),
            Url::parse(DEFAULT_GRAPH_URL).unwrap(),
            DEFAULT_SCOPE.to_string(),
        );
        assert!(matches!(result, Err(Error::InvalidEndpoint(_))));
    }
}
