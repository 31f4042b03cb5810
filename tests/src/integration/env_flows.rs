//! # Environment Flows
//!
//! The environment snapshot from loading to handler code, and the logging
//! bootstrap around a dispatch.
//!
//! ## Properties Tested:
//!
//! 1. **Loading**: settings file, then environment variables, database keys
//!    routed by prefix
//! 2. **Visibility**: handlers read the snapshot of their own session
//! 3. **Capture**: a session keeps the snapshot current at its creation

#[cfg(test)]
mod tests {
    use crate::fixtures::{MemoryBackends, Pong};
    use ground_mediator::{
        FromProxy, HandlerTable, Mediate, Mediator, MediatorProxy, NotificationHandler,
        RequestHandler,
    };
    use ground_telemetry::{dispatch_span, init_tracing, TelemetryConfig};
    use ground_types::{
        DatabaseSettings, DispatchError, EnvLoader, GlobalEnv, HandlerError, HandlerResult,
        Request,
    };
    use parking_lot::Mutex;
    use std::collections::BTreeMap;
    use std::io::Write;
    use std::sync::Arc;
    use tracing::Instrument;

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    struct ConnectionString;

    impl Request for ConnectionString {
        type Output = String;
    }

    /// Renders the database settings visible to its session.
    struct ConnectionStringHandler {
        proxy: MediatorProxy,
    }

    impl FromProxy for ConnectionStringHandler {
        fn from_proxy(proxy: MediatorProxy) -> HandlerResult<Self> {
            Ok(Self { proxy })
        }
    }

    #[async_trait::async_trait]
    impl RequestHandler<ConnectionString> for ConnectionStringHandler {
        async fn handle(&self, _request: &ConnectionString) -> HandlerResult<String> {
            let settings =
                DatabaseSettings::from_env(self.proxy.env()).map_err(anyhow::Error::from)?;
            let tenant = self.proxy.env().config("Tenant:Name").unwrap_or("default");
            Ok(format!(
                "{}@{}:{}/{} ({tenant})",
                settings.username, settings.address, settings.port, settings.keyspace
            ))
        }
    }

    fn settings_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    // =============================================================================
    // LOADING AND VISIBILITY
    // =============================================================================

    #[tokio::test]
    async fn test_handler_reads_loaded_settings() {
        let file = settings_file(
            r#"{
                "Tenant": { "Name": "north" },
                "NPSQL_ADDRESS": "db.internal",
                "NPSQL_PORT": 5432
            }"#,
        );
        let env = EnvLoader::new()
            .with_settings_file(file.path())
            .load_from(vec![
                ("NPSQL_PORT", "6432"),
                ("NPSQL_USERNAME", "ground"),
                ("NPSQL_PASSWORD", "hunter2"),
                ("NPSQL_KEYSPACE", "ledger"),
            ])
            .unwrap();

        let backends = MemoryBackends::new();
        let mediator = Mediator::with_env(backends.builders.clone(), Arc::new(env));
        mediator.overwrite_requests(
            HandlerTable::new().request::<ConnectionString, ConnectionStringHandler>(),
        );

        let rendered = mediator.request_first(&ConnectionString).await.unwrap();

        // Environment variables win over the settings file
        assert_eq!(rendered, "ground@db.internal:6432/ledger (north)");
        assert_eq!(mediator.env().database_entries().len(), 5);
    }

    #[tokio::test]
    async fn test_missing_database_key_is_handler_error() {
        let mut database = BTreeMap::new();
        database.insert("NPSQL_ADDRESS".to_string(), "db.internal".to_string());
        let env = GlobalEnv::new(BTreeMap::new(), database);

        let backends = MemoryBackends::new();
        let mediator = Mediator::with_env(backends.builders.clone(), Arc::new(env));
        mediator.overwrite_requests(
            HandlerTable::new().request::<ConnectionString, ConnectionStringHandler>(),
        );

        match mediator.request_first(&ConnectionString).await {
            Err(DispatchError::Handler {
                source: HandlerError::Other(err),
                ..
            }) => assert!(err.to_string().contains("NPSQL_PORT")),
            other => panic!("expected missing key, got {other:?}"),
        }
    }

    // =============================================================================
    // SNAPSHOT CAPTURE
    // =============================================================================

    struct StageProbe;

    #[async_trait::async_trait]
    impl NotificationHandler<Pong> for StageProbe {
        async fn handle(&self, _notification: &Pong) -> HandlerResult<()> {
            Ok(())
        }
    }

    fn stage_env(stage: &str) -> GlobalEnv {
        let mut config = BTreeMap::new();
        config.insert("Stage".to_string(), stage.to_string());
        GlobalEnv::new(config, BTreeMap::new())
    }

    /// The only test in this crate that touches the process-wide snapshot.
    #[tokio::test]
    async fn test_sessions_capture_global_snapshot_at_creation() {
        let stages: Arc<Mutex<Vec<String>>> = Arc::default();
        GlobalEnv::set_global(stage_env("blue"));

        let backends = MemoryBackends::new();
        let mediator = Mediator::new(backends.builders.clone());
        let recorder = stages.clone();
        mediator.overwrite_notifications(HandlerTable::new().notification_with::<Pong>(
            "stage-probe",
            move |proxy| {
                let stage = proxy.env().config("Stage").unwrap_or("unset").to_string();
                recorder.lock().push(stage);
                Ok(Box::new(StageProbe))
            },
        ));

        mediator.notify_first(Pong("before")).unwrap();
        GlobalEnv::set_global(stage_env("green"));
        mediator.notify_first(Pong("after")).unwrap();

        assert_eq!(mediator.env().config("Stage"), Some("blue"));
        assert_eq!(*stages.lock(), vec!["blue", "green"]);

        mediator.dispose().await;
        GlobalEnv::set_global(GlobalEnv::empty());
    }

    // =============================================================================
    // LOGGING BOOTSTRAP
    // =============================================================================

    /// The only test in this crate that installs the global subscriber.
    #[tokio::test]
    async fn test_dispatch_inside_session_span() {
        let config = TelemetryConfig {
            log_level: "ground_mediator=debug".to_string(),
            console_output: false,
            ..TelemetryConfig::default()
        };
        let guard = init_tracing(&config).unwrap();
        assert!(init_tracing(&config).is_err());

        let backends = MemoryBackends::new();
        let mediator = Mediator::with_env(backends.builders.clone(), Arc::new(GlobalEnv::empty()));
        mediator.overwrite_requests(
            HandlerTable::new().request::<crate::fixtures::Ping, crate::fixtures::EchoHandler>(),
        );

        let span = dispatch_span!("checkout", mediator.session_id(), order_id = 42);
        let echoed = mediator
            .request_first(&crate::fixtures::Ping("traced".to_string()))
            .instrument(span)
            .await;

        assert_eq!(echoed.unwrap(), "traced");
        assert_eq!(guard.service_name(), "ground");
    }
}
