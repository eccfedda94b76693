// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::*;

/// The service principal a display name resolved to, and how many
/// principals carried that exact name.
#[derive(Clone, Debug, PartialEq)]
pub struct Resolution {
    pub service_principal: ServicePrincipal,
    pub candidates: usize,
}

/// What a completed run did.
#[derive(Clone, Debug, PartialEq)]
pub struct RunReport {
    pub service_principal: ServicePrincipal,
    pub candidates: usize,
    pub job: SynchronizationJob,
    pub outcome: StartOutcome,
}

/// Resolves a display name to a single service principal.
///
/// Matching is case-sensitive. When more than one principal carries the
/// name, the first one in provider order wins. That order is not guaranteed
/// to be stable between calls.
pub fn resolve_service_principal<S: Session>(
    log: &Logger,
    session: &S,
    display_name: &str,
) -> Result<Resolution, Error> {
    debug!(log, "searching for service principal";
        "display_name" => display_name
    );

    let mut matches = session.list_service_principals(display_name)?;
    matches.retain(|sp| sp.display_name == display_name);

    let candidates = matches.len();
    if candidates > 1 {
        warn!(log, "multiple service principals found, using the first";
            "display_name" => display_name,
            "count" => candidates
        );
    }

    let service_principal = matches.into_iter().next().ok_or_else(|| {
        Error::ServicePrincipalNotFound(display_name.to_string())
    })?;

    info!(log, "found service principal";
        "service_principal_id" => &service_principal.id
    );

    Ok(Resolution { service_principal, candidates })
}

/// Picks the first synchronization job of a service principal. Templates are
/// not inspected.
pub fn resolve_synchronization_job<S: Session>(
    log: &Logger,
    session: &S,
    service_principal_id: &str,
) -> Result<SynchronizationJob, Error> {
    debug!(log, "searching for synchronization jobs";
        "service_principal_id" => service_principal_id
    );

    let job = session
        .list_synchronization_jobs(service_principal_id)?
        .into_iter()
        .next()
        .ok_or_else(|| {
            Error::SynchronizationJobNotFound(service_principal_id.to_string())
        })?;

    info!(log, "found synchronization job";
        "job_id" => &job.id,
        "template_id" => job.template_id.as_deref().unwrap_or("unknown")
    );

    Ok(job)
}

pub fn trigger_synchronization_job<S: Session>(
    log: &Logger,
    session: &S,
    service_principal_id: &str,
    job_id: &str,
) -> Result<StartOutcome, Error> {
    debug!(log, "sending request to start synchronization job";
        "job_id" => job_id
    );

    let outcome =
        session.start_synchronization_job(service_principal_id, job_id)?;

    match &outcome {
        StartOutcome::Started => info!(log, "{outcome}"),

        StartOutcome::Responded(body) => {
            info!(log, "start request answered with a body";
                "bytes" => body.len()
            )
        }
    }

    Ok(outcome)
}

/// Runs authenticate, resolve principal, resolve job, trigger, in that
/// order, stopping at the first error.
pub struct Orchestrator<C: Connector> {
    log: Logger,
    connector: C,
}

impl<C: Connector> Orchestrator<C> {
    pub fn new(log: Logger, connector: C) -> Self {
        Self { log, connector }
    }

    /// The session, once established, is closed exactly once whether or not
    /// the later steps succeed.
    pub fn run(&self, config: Config) -> Result<RunReport, Error> {
        let Config { credentials, display_name } = config;

        debug!(self.log, "authenticating";
            "tenant_id" => credentials.tenant_id(),
            "client_id" => credentials.client_id()
        );

        let session = self.connector.authenticate(&credentials)?;

        // The secret isn't needed past this point.
        drop(credentials);

        let result = self.run_session(&session, &display_name);

        debug!(self.log, "closing session");
        session.close();

        result
    }

    fn run_session(
        &self,
        session: &C::Session,
        display_name: &str,
    ) -> Result<RunReport, Error> {
        let Resolution { service_principal, candidates } =
            resolve_service_principal(&self.log, session, display_name)?;

        let job = resolve_synchronization_job(
            &self.log,
            session,
            &service_principal.id,
        )?;

        let outcome = trigger_synchronization_job(
            &self.log,
            session,
            &service_principal.id,
            &job.id,
        )?;

        Ok(RunReport { service_principal, candidates, job, outcome })
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;
    use std::sync::Mutex;

    use slog::Drain;
    use slog::Level;
    use slog::o;

    use super::*;

    const TENANT: &str = "5b0c9a44-1c54-4d7e-8d43-2f8f0a7e1c11";
    const CLIENT: &str = "0d2a4c8e-9f51-4a7b-b2c3-6e1d7f9a3b55";
    const SECRET: &str = "Qx8~abc.def_ghi";
    const AWS: &str = "AWS Single Sign-On";

    /// Keeps the level and message of every record
    #[derive(Clone, Default)]
    struct CapturingDrain {
        records: Arc<Mutex<Vec<(Level, String)>>>,
    }

    impl Drain for CapturingDrain {
        type Ok = ();
        type Err = slog::Never;

        fn log(
            &self,
            record: &slog::Record,
            _values: &slog::OwnedKVList,
        ) -> Result<(), slog::Never> {
            self.records
                .lock()
                .unwrap()
                .push((record.level(), record.msg().to_string()));
            Ok(())
        }
    }

    impl CapturingDrain {
        fn at(&self, level: Level) -> Vec<String> {
            self.records
                .lock()
                .unwrap()
                .iter()
                .filter(|(l, _)| *l == level)
                .map(|(_, msg)| msg.clone())
                .collect()
        }
    }

    fn setup()
    -> (InMemoryDirectory, CapturingDrain, Orchestrator<InMemoryDirectory>) {
        let directory = InMemoryDirectory::new();
        directory.register_application(TENANT, CLIENT, SECRET);

        let drain = CapturingDrain::default();
        let log = Logger::root(drain.clone(), o!());

        let orchestrator = Orchestrator::new(log, directory.clone());

        (directory, drain, orchestrator)
    }

    fn config(secret: &str, display_name: &str) -> Config {
        let credentials = Credentials::new(
            TENANT.to_string(),
            CLIENT.to_string(),
            ClientSecret::new(secret.to_string()).unwrap(),
        )
        .unwrap();

        Config::new(credentials, display_name.to_string()).unwrap()
    }

    #[test]
    fn test_single_match_triggers_first_job() {
        let (directory, drain, orchestrator) = setup();
        let sp = directory.add_service_principal(AWS);
        let job = directory.add_synchronization_job(&sp.id, "aWSSingleSignOn");
        directory.add_synchronization_job(&sp.id, "aWSSingleSignOn");

        let report = orchestrator.run(config(SECRET, AWS)).unwrap();

        assert_eq!(report.service_principal, sp);
        assert_eq!(report.candidates, 1);
        assert_eq!(report.job, job);
        assert_eq!(report.outcome, StartOutcome::Started);
        assert_eq!(
            report.outcome.to_string(),
            "Request to start synchronization job sent successfully."
        );

        let state = directory.state();
        assert_eq!(state.start_calls(), &[(sp.id.clone(), job.id.clone())]);
        assert_eq!(state.sessions_closed(), 1);
        assert!(drain.at(Level::Warning).is_empty());
    }

    #[test]
    fn test_no_match_stops_before_job_lookup() {
        let (directory, _drain, orchestrator) = setup();
        directory.add_service_principal("Salesforce");

        let error = orchestrator.run(config(SECRET, AWS)).unwrap_err();

        assert!(matches!(
            &error,
            Error::ServicePrincipalNotFound(name) if name == AWS
        ));

        let state = directory.state();
        assert_eq!(state.principal_queries(), &[AWS.to_string()]);
        assert!(state.job_queries().is_empty());
        assert!(state.start_calls().is_empty());
        assert_eq!(state.sessions_closed(), 1);
    }

    #[test]
    fn test_multiple_matches_warn_and_use_the_first() {
        let (directory, drain, orchestrator) = setup();
        let first = directory.add_service_principal(AWS);
        let second = directory.add_service_principal(AWS);
        let job = directory.add_synchronization_job(&first.id, "aWSSingleSignOn");
        directory.add_synchronization_job(&second.id, "aWSSingleSignOn");

        let report = orchestrator.run(config(SECRET, AWS)).unwrap();

        assert_eq!(report.service_principal, first);
        assert_eq!(report.candidates, 2);
        assert_eq!(directory.state().start_calls(), &[(first.id, job.id)]);
        assert_eq!(
            drain.at(Level::Warning),
            vec!["multiple service principals found, using the first"]
        );
    }

    #[test]
    fn test_matching_is_case_sensitive() {
        let (directory, drain, orchestrator) = setup();
        // The provider's filter is case-insensitive and returns both.
        directory.add_service_principal("aws single sign-on");
        let exact = directory.add_service_principal(AWS);
        directory.add_synchronization_job(&exact.id, "aWSSingleSignOn");

        let report = orchestrator.run(config(SECRET, AWS)).unwrap();

        assert_eq!(report.service_principal, exact);
        assert_eq!(report.candidates, 1);
        assert!(drain.at(Level::Warning).is_empty());

        let error =
            orchestrator.run(config(SECRET, "AWS SINGLE SIGN-ON")).unwrap_err();
        assert!(matches!(error, Error::ServicePrincipalNotFound(_)));
    }

    #[test]
    fn test_no_jobs_never_triggers() {
        let (directory, _drain, orchestrator) = setup();
        let sp = directory.add_service_principal(AWS);

        let error = orchestrator.run(config(SECRET, AWS)).unwrap_err();

        assert!(matches!(
            &error,
            Error::SynchronizationJobNotFound(id) if *id == sp.id
        ));

        let state = directory.state();
        assert_eq!(state.job_queries(), &[sp.id]);
        assert!(state.start_calls().is_empty());
        assert_eq!(state.sessions_closed(), 1);
    }

    #[test]
    fn test_non_empty_start_response_is_surfaced() {
        let (directory, _drain, orchestrator) = setup();
        let sp = directory.add_service_principal(AWS);
        let job = directory.add_synchronization_job(&sp.id, "aWSSingleSignOn");
        directory.respond_on_start(&job.id, r#"{"status":"queued"}"#);

        let report = orchestrator.run(config(SECRET, AWS)).unwrap();

        assert_eq!(report.outcome.to_string(), r#"{"status":"queued"}"#);
        assert_eq!(directory.state().sessions_closed(), 1);
    }

    #[test]
    fn test_trigger_failure_still_closes_session() {
        let (directory, drain, orchestrator) = setup();
        let sp = directory.add_service_principal(AWS);
        let job = directory.add_synchronization_job(&sp.id, "aWSSingleSignOn");
        directory.fail_on_start(
            &job.id,
            GraphFault::new(
                403,
                "Authorization_RequestDenied",
                "Insufficient privileges to complete the operation.",
            ),
        );

        let error = orchestrator.run(config(SECRET, AWS)).unwrap_err();

        assert_eq!(
            error.to_string(),
            "Graph API error (403): Authorization_RequestDenied - \
            Insufficient privileges to complete the operation."
        );

        let state = directory.state();
        assert_eq!(state.start_calls().len(), 1);
        assert_eq!(state.sessions_closed(), 1);
        assert_eq!(state.live_tokens(), 0);

        // Reporting the failure is left to the caller.
        assert!(drain.at(Level::Error).is_empty());
    }

    #[test]
    fn test_authentication_failure_stops_the_run() {
        let (directory, drain, orchestrator) = setup();
        let sp = directory.add_service_principal(AWS);
        directory.add_synchronization_job(&sp.id, "aWSSingleSignOn");

        let error = orchestrator.run(config("not-the-secret", AWS)).unwrap_err();

        assert!(matches!(error, Error::Authentication(_)));
        assert!(!error.to_string().contains("not-the-secret"));

        let state = directory.state();
        assert_eq!(state.tokens_issued(), 0);
        assert!(state.principal_queries().is_empty());
        assert_eq!(state.sessions_closed(), 0);
        assert!(drain.at(Level::Error).is_empty());
    }

    #[test]
    fn test_secret_never_logged() {
        let (directory, drain, orchestrator) = setup();
        let sp = directory.add_service_principal(AWS);
        directory.add_synchronization_job(&sp.id, "aWSSingleSignOn");

        orchestrator.run(config(SECRET, AWS)).unwrap();

        let records = drain.records.lock().unwrap();
        assert!(!records.is_empty());
        assert!(records.iter().all(|(_, msg)| !msg.contains(SECRET)));
    }
}
