// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::*;

/// Establishes authenticated sessions against an identity provider.
pub trait Connector {
    type Session: Session;

    fn authenticate(
        &self,
        credentials: &Credentials,
    ) -> Result<Self::Session, Error>;
}

/// The directory operations a run needs, scoped to one authenticated
/// session.
pub trait Session {
    /// Service principals whose display name equals `display_name`, in the
    /// order the provider returns them.
    fn list_service_principals(
        &self,
        display_name: &str,
    ) -> Result<Vec<ServicePrincipal>, Error>;

    fn list_synchronization_jobs(
        &self,
        service_principal_id: &str,
    ) -> Result<Vec<SynchronizationJob>, Error>;

    fn start_synchronization_job(
        &self,
        service_principal_id: &str,
        job_id: &str,
    ) -> Result<StartOutcome, Error>;

    /// Releases the session. Consuming `self` means this happens at most
    /// once.
    fn close(self);
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServicePrincipal {
    pub id: String,
    pub display_name: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SynchronizationJob {
    pub id: String,

    // Graph doesn't return the owner in the job body; the session fills it
    // in from the request path.
    #[serde(skip)]
    pub service_principal_id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
}

/// What the provider said when asked to start a job.
#[derive(Clone, Debug, PartialEq)]
pub enum StartOutcome {
    /// The expected empty (204) response
    Started,

    /// A non-empty response body, kept verbatim
    Responded(String),
}

impl StartOutcome {
    pub fn from_body(body: String) -> Self {
        if body.trim().is_empty() {
            StartOutcome::Started
        } else {
            StartOutcome::Responded(body)
        }
    }
}

impl std::fmt::Display for StartOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            StartOutcome::Started => {
                write!(
                    f,
                    "Request to start synchronization job sent successfully."
                )
            }

            StartOutcome::Responded(body) => {
                write!(f, "{body}")
            }
        }
    }
}

/// The `value` wrapper Graph puts around collections.
#[derive(Deserialize, Serialize, Debug)]
pub struct ODataCollection<T> {
    pub value: Vec<T>,
}

/// Renders `displayName eq '<name>'`, doubling single quotes as OData
/// string literals require.
pub fn display_name_filter(display_name: &str) -> String {
    format!("displayName eq '{}'", display_name.replace('\'', "''"))
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_display_name_filter() {
        assert_eq!(
            display_name_filter("AWS Single Sign-On"),
            "displayName eq 'AWS Single Sign-On'"
        );

        assert_eq!(
            display_name_filter("O'Brien's App"),
            "displayName eq 'O''Brien''s App'"
        );
    }

    #[test]
    fn test_start_outcome_from_body() {
        assert_eq!(StartOutcome::from_body(String::new()), StartOutcome::Started);
        assert_eq!(
            StartOutcome::from_body(" \r\n".to_string()),
            StartOutcome::Started
        );

        let body = r#"{"status":"queued"}"#.to_string();
        let outcome = StartOutcome::from_body(body.clone());
        assert_eq!(outcome, StartOutcome::Responded(body.clone()));
        assert_eq!(outcome.to_string(), body);

        assert_eq!(
            StartOutcome::Started.to_string(),
            "Request to start synchronization job sent successfully."
        );
    }

    #[test]
    fn test_parse_synchronization_jobs() {
        let json = json!({
          "@odata.context": "https://graph.microsoft.com/v1.0/$metadata#servicePrincipals('4f1c')/synchronization/jobs",
          "value": [
            {
              "id": "aWSSingleSignOn.7d8e3a1b2c4f",
              "templateId": "aWSSingleSignOn",
              "schedule": {
                "interval": "PT40M",
                "state": "Active"
              },
              "status": {
                "code": "Active"
              }
            }
          ]
        });

        let jobs: ODataCollection<SynchronizationJob> =
            serde_json::from_value(json).unwrap();

        assert_eq!(jobs.value.len(), 1);
        assert_eq!(jobs.value[0].id, "aWSSingleSignOn.7d8e3a1b2c4f");
        assert_eq!(jobs.value[0].template_id.as_deref(), Some("aWSSingleSignOn"));
        assert!(jobs.value[0].service_principal_id.is_empty());
    }

    #[test]
    fn test_parse_service_principals() {
        let json = json!({
          "@odata.count": 1,
          "value": [
            {
              "id": "4f1c8a7e-0d3b-4b65-9b1e-2a9c1f0e6d21",
              "displayName": "AWS Single Sign-On"
            }
          ]
        });

        let principals: ODataCollection<ServicePrincipal> =
            serde_json::from_value(json).unwrap();

        assert_eq!(
            principals.value,
            vec![ServicePrincipal {
                id: "4f1c8a7e-0d3b-4b65-9b1e-2a9c1f0e6d21".to_string(),
                display_name: "AWS Single Sign-On".to_string(),
            }]
        );
    }
}
