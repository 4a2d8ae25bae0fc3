//! # Removal Flows
//!
//! `SYSTEM_DELETE` end to end against the runtime's adapters.
//!
//! ## Remote branch (no local plugin registered)
//!
//! ```text
//! publish _stop → admin.<name>.<version>
//!   └─ poll every second until all instances STOPPED or the timeout
//!        └─ delete queues (forced when an instance is still up) → delete record
//! ```
//!
//! ## Local branch
//!
//! Every registered plugin is killed and unregistered; nothing is published.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use garden_runtime::adapters::InMemorySystemStore;
    use garden_runtime::{GardenConfig, GardenRuntime};
    use gd_01_systems::{
        MessageQueue, RouteKind, RoutePayload, RouteRequest, RouteResponse, SystemError,
    };
    use gd_02_local_plugins::PluginLaunchSpec;
    use shared_bus::{EventFilter, EventKind};
    use shared_types::{Instance, InstanceStatus, QueueInfo, System, SystemId};
    use tokio::time::{timeout, Instant};

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    fn runtime(shutdown_timeout_secs: u64) -> GardenRuntime {
        GardenRuntime::new(GardenConfig {
            shutdown_timeout_secs,
            ..GardenConfig::default()
        })
        .expect("runtime")
    }

    fn instance(name: &str, status: InstanceStatus) -> Instance {
        Instance::new(name).with_status(status).with_queues(QueueInfo::new(
            format!("echo.1-0-0.{name}"),
            format!("admin.echo.1-0-0.{name}"),
        ))
    }

    /// Register a system and declare its queues on the bus.
    async fn seed(runtime: &GardenRuntime, instances: Vec<Instance>) -> SystemId {
        let container = runtime.container();
        for instance in &instances {
            for queue in [
                instance.queue_info.request_queue(),
                instance.queue_info.admin_queue(),
            ]
            .into_iter()
            .flatten()
            {
                container.queue.declare(queue);
            }
        }

        let system = System::new("echo", "1.0.0")
            .with_max_instances(instances.len() as u32)
            .with_instances(instances);
        let response = runtime
            .router()
            .route(RouteRequest::new(RouteKind::Create).with_payload(RoutePayload::System(system)))
            .await
            .expect("create");
        match response {
            RouteResponse::System(system) => system.id.expect("id"),
            other => panic!("unexpected response {other:?}"),
        }
    }

    async fn delete(runtime: &GardenRuntime, id: &SystemId) -> Result<RouteResponse, SystemError> {
        runtime
            .router()
            .route(RouteRequest::new(RouteKind::Delete).with_id(id.clone()))
            .await
    }

    // =============================================================================
    // REMOTE BRANCH
    // =============================================================================

    #[tokio::test(start_paused = true)]
    async fn test_stopped_system_is_removed_without_waiting() {
        let runtime = runtime(10);
        let id = seed(&runtime, vec![instance("default", InstanceStatus::Stopped)]).await;
        let mut sub = runtime
            .container()
            .event_bus
            .subscribe(EventFilter::kinds(vec![EventKind::SystemRemoved]));

        let start = Instant::now();
        let removed = delete(&runtime, &id).await.unwrap();

        assert_eq!(start.elapsed(), Duration::ZERO);
        let RouteResponse::System(removed) = removed else {
            panic!("expected the removed system");
        };
        assert_eq!(removed.id, Some(id.clone()));

        let container = runtime.container();
        assert!(container.store.is_empty());
        let published = container.queue.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].routing_key, "admin.echo.1-0-0");
        assert!(published[0].message.is_stop());
        assert_eq!(
            container.queue.deleted(),
            vec![
                ("echo.1-0-0.default".to_string(), false),
                ("admin.echo.1-0-0.default".to_string(), false),
            ]
        );

        let event = timeout(Duration::from_secs(1), sub.recv()).await.unwrap().unwrap();
        assert!(!event.error);
        assert_eq!(event.payload.unwrap()["name"], "echo");

        runtime.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stuck_instance_forces_cleanup_after_timeout() {
        let runtime = runtime(3);
        let id = seed(
            &runtime,
            vec![
                instance("a", InstanceStatus::Stopped),
                instance("b", InstanceStatus::Running),
            ],
        )
        .await;

        let start = Instant::now();
        delete(&runtime, &id).await.unwrap();

        assert_eq!(start.elapsed(), Duration::from_secs(3));
        let container = runtime.container();
        assert!(container.store.is_empty());
        assert_eq!(
            container.queue.deleted(),
            vec![
                ("echo.1-0-0.a".to_string(), false),
                ("admin.echo.1-0-0.a".to_string(), false),
                ("echo.1-0-0.b".to_string(), true),
                ("admin.echo.1-0-0.b".to_string(), true),
            ]
        );

        runtime.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_ends_when_instances_report_stopped() {
        let runtime = runtime(10);
        let id = seed(&runtime, vec![instance("default", InstanceStatus::Running)]).await;

        // The plugin confirms its shutdown between the first and second poll.
        let store: Arc<InMemorySystemStore> = runtime.container().store.clone();
        let reporter = tokio::spawn({
            let id = id.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(1500)).await;
                store
                    .set_instance_status(&id, "default", InstanceStatus::Stopped)
                    .unwrap();
            }
        });

        let start = Instant::now();
        delete(&runtime, &id).await.unwrap();
        reporter.await.unwrap();

        assert_eq!(start.elapsed(), Duration::from_secs(2));
        assert_eq!(
            runtime.container().queue.deleted(),
            vec![
                ("echo.1-0-0.default".to_string(), false),
                ("admin.echo.1-0-0.default".to_string(), false),
            ]
        );

        runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_missing_queue_does_not_block_removal() {
        let runtime = runtime(0);
        let id = seed(&runtime, vec![instance("default", InstanceStatus::Stopped)]).await;
        // someone else already tore the request queue down
        runtime
            .container()
            .queue
            .delete_queue("echo.1-0-0.default", false)
            .await
            .unwrap();

        delete(&runtime, &id).await.unwrap();

        let container = runtime.container();
        assert!(container.store.is_empty());
        assert_eq!(
            container.queue.deleted(),
            vec![
                ("echo.1-0-0.default".to_string(), false),
                ("admin.echo.1-0-0.default".to_string(), false),
            ]
        );

        runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_undeclared_queues_are_skipped() {
        let runtime = runtime(0);
        let system = System::new("remote", "1.0.0")
            .with_instances(vec![instance("default", InstanceStatus::Stopped)]);
        let created = runtime
            .router()
            .route(RouteRequest::new(RouteKind::Create).with_payload(RoutePayload::System(system)))
            .await
            .unwrap();
        let RouteResponse::System(created) = created else {
            panic!("expected a system");
        };

        delete(&runtime, &created.id.unwrap()).await.unwrap();

        let container = runtime.container();
        assert!(container.store.is_empty());
        assert!(container.queue.deleted().is_empty());

        runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_unknown_system_publishes_error_event() {
        let runtime = runtime(10);
        let mut sub = runtime.container().event_bus.subscribe(EventFilter::errors());

        let err = delete(&runtime, &SystemId::from("ghost")).await.unwrap_err();

        assert_eq!(err, SystemError::NotFound(SystemId::from("ghost")));
        let event = timeout(Duration::from_secs(1), sub.recv()).await.unwrap().unwrap();
        assert_eq!(event.name, EventKind::SystemRemoved);
        assert_eq!(event.error_message, Some(err.to_string()));
        assert!(runtime.container().queue.published().is_empty());

        runtime.shutdown().await;
    }

    // =============================================================================
    // LOCAL BRANCH
    // =============================================================================

    #[cfg(unix)]
    #[tokio::test]
    async fn test_local_plugin_is_killed_and_unregistered() {
        let runtime = runtime(10);
        let id = seed(&runtime, vec![instance("default", InstanceStatus::Running)]).await;
        let container = runtime.container();
        container.plugins.register(
            PluginLaunchSpec::new("echo", "1.0.0", "default", vec!["sleep".into(), "30".into()])
                .with_cwd(std::env::temp_dir()),
        );
        let runner = container.plugins.launch("echo[default]-1.0.0").unwrap();
        runner.wait_started().await;

        delete(&runtime, &id).await.unwrap();

        assert!(!runner.is_running());
        assert!(container.plugins.spec("echo[default]-1.0.0").is_none());
        assert!(container.queue.published().is_empty());
        assert!(container.store.is_empty());
        // the instance never reported STOPPED, so its queues go down forcibly
        assert!(container.queue.deleted().iter().all(|(_, forced)| *forced));

        runtime.shutdown().await;
    }
}
