// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::*;

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::Mutex;
use uuid::Uuid;

#[derive(Clone, Debug)]
struct Application {
    tenant_id: String,
    client_id: String,
    client_secret: String,
}

/// How a job answers a start request.
#[derive(Clone, Debug, Default)]
enum StartBehavior {
    #[default]
    NoContent,
    Body(String),
    Fault(GraphFault),
}

#[derive(Clone, Debug)]
struct StoredJob {
    job: SynchronizationJob,
    on_start: StartBehavior,
}

#[derive(Clone, Debug, Default)]
pub struct InMemoryDirectoryState {
    applications: Vec<Application>,

    // Kept in insertion order, which is the order listings return.
    service_principals: Vec<ServicePrincipal>,

    jobs: BTreeMap<String, Vec<StoredJob>>,
    tokens: BTreeSet<String>,
    tokens_issued: usize,
    principal_queries: Vec<String>,
    job_queries: Vec<String>,
    start_calls: Vec<(String, String)>,
    sessions_closed: usize,
}

impl InMemoryDirectoryState {
    /// Every token handed out, including revoked ones
    pub fn tokens_issued(&self) -> usize {
        self.tokens_issued
    }

    /// Tokens that have not been revoked by closing their session
    pub fn live_tokens(&self) -> usize {
        self.tokens.len()
    }

    /// Display names that service principals were queried by
    pub fn principal_queries(&self) -> &[String] {
        &self.principal_queries
    }

    /// Service principal ids that jobs were listed for
    pub fn job_queries(&self) -> &[String] {
        &self.job_queries
    }

    /// (service principal id, job id) of every start request
    pub fn start_calls(&self) -> &[(String, String)] {
        &self.start_calls
    }

    pub fn sessions_closed(&self) -> usize {
        self.sessions_closed
    }
}

/// A non-optimized directory for use with tests and the test Graph server.
///
/// Lookups behave like Graph does for the calls this crate makes,
/// including the case-insensitive `displayName eq` filter.
#[derive(Clone, Default)]
pub struct InMemoryDirectory {
    state: Arc<Mutex<InMemoryDirectoryState>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> InMemoryDirectoryState {
        self.state.lock().unwrap().clone()
    }

    pub fn register_application(
        &self,
        tenant_id: &str,
        client_id: &str,
        client_secret: &str,
    ) {
        let mut state = self.state.lock().unwrap();
        state.applications.push(Application {
            tenant_id: tenant_id.to_string(),
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
        });
    }

    pub fn add_service_principal(
        &self,
        display_name: &str,
    ) -> ServicePrincipal {
        let service_principal = ServicePrincipal {
            id: Uuid::new_v4().to_string(),
            display_name: display_name.to_string(),
        };

        let mut state = self.state.lock().unwrap();
        state.service_principals.push(service_principal.clone());

        service_principal
    }

    pub fn add_synchronization_job(
        &self,
        service_principal_id: &str,
        template_id: &str,
    ) -> SynchronizationJob {
        let job = SynchronizationJob {
            id: format!("{template_id}.{}", Uuid::new_v4().simple()),
            service_principal_id: service_principal_id.to_string(),
            template_id: Some(template_id.to_string()),
        };

        let mut state = self.state.lock().unwrap();
        state
            .jobs
            .entry(service_principal_id.to_string())
            .or_default()
            .push(StoredJob { job: job.clone(), on_start: StartBehavior::default() });

        job
    }

    /// Makes start requests for `job_id` answer with `body` instead of 204.
    pub fn respond_on_start(&self, job_id: &str, body: &str) {
        self.set_start_behavior(job_id, StartBehavior::Body(body.to_string()));
    }

    /// Makes start requests for `job_id` fail with `fault`.
    pub fn fail_on_start(&self, job_id: &str, fault: GraphFault) {
        self.set_start_behavior(job_id, StartBehavior::Fault(fault));
    }

    fn set_start_behavior(&self, job_id: &str, behavior: StartBehavior) {
        let mut state = self.state.lock().unwrap();

        for stored in state.jobs.values_mut().flatten() {
            if stored.job.id == job_id {
                stored.on_start = behavior.clone();
            }
        }
    }

    /// Issues a bearer token if the credentials match a registered
    /// application.
    pub fn issue_token(
        &self,
        tenant_id: &str,
        client_id: &str,
        client_secret: &str,
    ) -> Result<String, Error> {
        let mut state = self.state.lock().unwrap();

        let Some(application) = state
            .applications
            .iter()
            .find(|a| a.tenant_id == tenant_id && a.client_id == client_id)
        else {
            return Err(Error::Authentication(format!(
                "application {client_id} not found in tenant {tenant_id}"
            )));
        };

        if application.client_secret != client_secret {
            return Err(Error::Authentication(format!(
                "invalid client secret provided for application {client_id}"
            )));
        }

        let token = Uuid::new_v4().to_string();
        state.tokens.insert(token.clone());
        state.tokens_issued += 1;

        Ok(token)
    }

    pub fn check_token(&self, token: &str) -> Result<(), GraphFault> {
        if self.state.lock().unwrap().tokens.contains(token) {
            Ok(())
        } else {
            Err(GraphFault::unauthorized("Access token validation failure."))
        }
    }

    pub fn service_principals_named(
        &self,
        display_name: &str,
    ) -> Vec<ServicePrincipal> {
        let mut state = self.state.lock().unwrap();
        state.principal_queries.push(display_name.to_string());

        let wanted = display_name.to_lowercase();

        state
            .service_principals
            .iter()
            .filter(|sp| sp.display_name.to_lowercase() == wanted)
            .cloned()
            .collect()
    }

    pub fn synchronization_jobs(
        &self,
        service_principal_id: &str,
    ) -> Result<Vec<SynchronizationJob>, GraphFault> {
        let mut state = self.state.lock().unwrap();
        state.job_queries.push(service_principal_id.to_string());

        let exists =
            state.service_principals.iter().any(|sp| sp.id == service_principal_id);

        if !exists {
            return Err(GraphFault::not_found(format!(
                "Resource '{service_principal_id}' does not exist or one of \
                its queried reference-property objects are not present."
            )));
        }

        Ok(state
            .jobs
            .get(service_principal_id)
            .map(|jobs| jobs.iter().map(|s| s.job.clone()).collect())
            .unwrap_or_default())
    }

    /// Records a start request and returns the body to answer with.
    pub fn start_job(
        &self,
        service_principal_id: &str,
        job_id: &str,
    ) -> Result<String, GraphFault> {
        let mut state = self.state.lock().unwrap();
        state
            .start_calls
            .push((service_principal_id.to_string(), job_id.to_string()));

        let stored = state
            .jobs
            .get(service_principal_id)
            .and_then(|jobs| jobs.iter().find(|s| s.job.id == job_id))
            .ok_or_else(|| {
                GraphFault::not_found(format!(
                    "Synchronization job {job_id} not found"
                ))
            })?;

        match &stored.on_start {
            StartBehavior::NoContent => Ok(String::new()),
            StartBehavior::Body(body) => Ok(body.clone()),
            StartBehavior::Fault(fault) => Err(fault.clone()),
        }
    }
}

impl Connector for InMemoryDirectory {
    type Session = InMemorySession;

    fn authenticate(
        &self,
        credentials: &Credentials,
    ) -> Result<InMemorySession, Error> {
        let token = self.issue_token(
            credentials.tenant_id(),
            credentials.client_id(),
            credentials.client_secret().expose_secret(),
        )?;

        Ok(InMemorySession { directory: self.clone(), token })
    }
}

pub struct InMemorySession {
    directory: InMemoryDirectory,
    token: String,
}

impl Session for InMemorySession {
    fn list_service_principals(
        &self,
        display_name: &str,
    ) -> Result<Vec<ServicePrincipal>, Error> {
        self.directory.check_token(&self.token)?;
        Ok(self.directory.service_principals_named(display_name))
    }

    fn list_synchronization_jobs(
        &self,
        service_principal_id: &str,
    ) -> Result<Vec<SynchronizationJob>, Error> {
        self.directory.check_token(&self.token)?;
        Ok(self.directory.synchronization_jobs(service_principal_id)?)
    }

    fn start_synchronization_job(
        &self,
        service_principal_id: &str,
        job_id: &str,
    ) -> Result<StartOutcome, Error> {
        self.directory.check_token(&self.token)?;
        let body = self.directory.start_job(service_principal_id, job_id)?;
        Ok(StartOutcome::from_body(body))
    }

    fn close(self) {
        let mut state = self.directory.state.lock().unwrap();
        state.tokens.remove(&self.token);
        state.sessions_closed += 1;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_issue_token() {
        let directory = InMemoryDirectory::new();
        directory.register_application("contoso", "app", "secret");

        assert!(directory.issue_token("contoso", "app", "secret").is_ok());

        assert!(matches!(
            directory.issue_token("contoso", "app", "wrong"),
            Err(Error::Authentication(detail))
                if !detail.contains("wrong")
        ));

        assert!(matches!(
            directory.issue_token("fabrikam", "app", "secret"),
            Err(Error::Authentication(_))
        ));

        let state = directory.state();
        assert_eq!(state.tokens_issued(), 1);
        assert_eq!(state.live_tokens(), 1);
    }

    #[test]
    fn test_display_name_lookup_is_case_insensitive() {
        let directory = InMemoryDirectory::new();
        let first = directory.add_service_principal("AWS Single Sign-On");
        directory.add_service_principal("Salesforce");
        let second = directory.add_service_principal("aws single sign-on");

        assert_eq!(
            directory.service_principals_named("AWS Single Sign-On"),
            vec![first, second]
        );
        assert!(directory.service_principals_named("AWS").is_empty());
    }

    #[test]
    fn test_jobs_for_unknown_service_principal() {
        let directory = InMemoryDirectory::new();
        let fault = directory.synchronization_jobs("missing").unwrap_err();
        assert_eq!(fault.status, 404);
    }

    #[test]
    fn test_start_behavior() {
        let directory = InMemoryDirectory::new();
        let sp = directory.add_service_principal("AWS Single Sign-On");
        let quiet = directory.add_synchronization_job(&sp.id, "aWSSingleSignOn");
        let chatty = directory.add_synchronization_job(&sp.id, "aWSSingleSignOn");
        let broken = directory.add_synchronization_job(&sp.id, "scim");

        directory.respond_on_start(&chatty.id, "accepted");
        directory.fail_on_start(
            &broken.id,
            GraphFault::new(409, "Conflict", "Job is quarantined."),
        );

        assert_eq!(directory.start_job(&sp.id, &quiet.id).unwrap(), "");
        assert_eq!(directory.start_job(&sp.id, &chatty.id).unwrap(), "accepted");
        assert_eq!(
            directory.start_job(&sp.id, &broken.id).unwrap_err().code,
            "Conflict"
        );
        assert_eq!(
            directory.start_job("other", &quiet.id).unwrap_err().status,
            404
        );

        assert_eq!(directory.state().start_calls().len(), 4);
    }

    #[test]
    fn test_closed_session_token_is_revoked() {
        let directory = InMemoryDirectory::new();
        directory.register_application("contoso", "app", "secret");

        let credentials = Credentials::new(
            "contoso".to_string(),
            "app".to_string(),
            ClientSecret::new("secret".to_string()).unwrap(),
        )
        .unwrap();

        let session = directory.authenticate(&credentials).unwrap();
        let token = session.token.clone();
        session.close();

        assert!(directory.check_token(&token).is_err());

        let state = directory.state();
        assert_eq!(state.sessions_closed(), 1);
        assert_eq!(state.tokens_issued(), 1);
        assert_eq!(state.live_tokens(), 0);
    }
}
