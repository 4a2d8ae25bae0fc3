//! # System Lifecycle Flows
//!
//! Router → SystemRegistry → store, with every mutation observed on the
//! event bus:
//!
//! 1. **Create**: defaults applied, `SYSTEM_CREATED` carries the stored System
//! 2. **Patch**: operations committed in order, `SYSTEM_UPDATED` follows
//! 3. **Failure**: the caller sees the error, the event carries its message

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use garden_runtime::{GardenConfig, GardenRuntime};
    use gd_01_systems::{
        Operation, RouteKind, RoutePayload, RouteRequest, RouteResponse, SystemError,
    };
    use serde_json::json;
    use shared_bus::{Event, EventFilter, EventKind, Subscription};
    use shared_types::{Command, Instance, PatchOperation, SearchParams, System};
    use tokio::time::timeout;

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    fn runtime() -> GardenRuntime {
        GardenRuntime::new(GardenConfig {
            garden_name: "parent".into(),
            ..GardenConfig::default()
        })
        .expect("runtime")
    }

    async fn next_event(sub: &mut Subscription) -> Event {
        timeout(Duration::from_secs(1), sub.recv())
            .await
            .expect("Should receive within timeout")
            .expect("Should have event")
    }

    async fn create(runtime: &GardenRuntime, system: System) -> System {
        let request =
            RouteRequest::new(RouteKind::Create).with_payload(RoutePayload::System(system));
        match runtime.router().route(request).await.expect("create") {
            RouteResponse::System(system) => system,
            other => panic!("unexpected response {other:?}"),
        }
    }

    // =============================================================================
    // CREATE
    // =============================================================================

    #[tokio::test]
    async fn test_create_publishes_stored_system() {
        let runtime = runtime();
        let mut sub = runtime
            .container()
            .event_bus
            .subscribe(EventFilter::kinds(vec![EventKind::SystemCreated]));

        let created = create(&runtime, System::new("echo", "1.0.0")).await;

        assert_eq!(created.max_instances, Some(1));
        assert_eq!(created.instances, vec![Instance::new("default")]);

        let event = next_event(&mut sub).await;
        assert_eq!(event.garden.as_deref(), Some("parent"));
        assert!(event.timestamp.is_some());
        assert!(!event.error);
        assert_eq!(event.payload_type.as_deref(), Some("System"));
        assert_eq!(event.payload.unwrap()["id"], json!(created.id.unwrap().0));

        runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_duplicate_create_publishes_error_event() {
        let runtime = runtime();
        let mut sub = runtime.container().event_bus.subscribe(EventFilter::errors());
        create(&runtime, System::new("echo", "1.0.0")).await;

        let err = runtime
            .router()
            .route(
                RouteRequest::new(RouteKind::Create)
                    .with_payload(RoutePayload::System(System::new("echo", "1.0.0"))),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, SystemError::Validation(_)));
        let event = next_event(&mut sub).await;
        assert_eq!(event.name, EventKind::SystemCreated);
        assert_eq!(event.error_message, Some(err.to_string()));

        runtime.shutdown().await;
    }

    // =============================================================================
    // READ
    // =============================================================================

    #[tokio::test]
    async fn test_read_by_id_and_by_criteria() {
        let runtime = runtime();
        let echo = create(&runtime, System::new("echo", "1.0.0")).await;
        create(&runtime, System::new("echo", "2.0.0")).await;
        create(&runtime, System::new("complex", "1.0.0")).await;

        let by_id = runtime
            .router()
            .route(RouteRequest::new(RouteKind::Read).with_id(echo.id.clone().unwrap()))
            .await
            .unwrap();
        assert_eq!(by_id, RouteResponse::System(echo));

        let mut operation = Operation::new("SYSTEM_READ", vec![]);
        operation.kwargs.insert("filter_params".into(), json!({"name": "echo"}));
        operation.kwargs.insert("order_by".into(), json!("-version"));
        let response = runtime.router().route_operation(operation).await.unwrap();
        let RouteResponse::Systems(found) = response else {
            panic!("expected a list");
        };
        let versions: Vec<_> = found.iter().map(|s| s.version.as_str()).collect();
        assert_eq!(versions, vec!["2.0.0", "1.0.0"]);

        let all = runtime
            .router()
            .route(RouteRequest::new(RouteKind::Read).with_params(SearchParams::default()))
            .await
            .unwrap();
        assert!(matches!(all, RouteResponse::Systems(ref systems) if systems.len() == 3));

        runtime.shutdown().await;
    }

    // =============================================================================
    // PATCH
    // =============================================================================

    #[tokio::test]
    async fn test_patch_applies_operations_in_order() {
        let runtime = runtime();
        let mut sub = runtime
            .container()
            .event_bus
            .subscribe(EventFilter::kinds(vec![EventKind::SystemUpdated]));
        let created = create(
            &runtime,
            System::new("echo", "1.0.0-dev")
                .with_max_instances(2)
                .with_instances(vec![Instance::new("a")]),
        )
        .await;
        let id = created.id.clone().unwrap();

        let patched = runtime
            .router()
            .route(RouteRequest::new(RouteKind::Update).with_id(id.clone()).with_payload(
                RoutePayload::Operations(vec![
                    PatchOperation::replace("/description", json!("first")),
                    PatchOperation::replace("/description", json!("second")),
                    PatchOperation::add("/instance", json!({"name": "b"})),
                    PatchOperation::update("/metadata", json!({"team": "garden"})),
                    PatchOperation::replace("/commands", json!([{"name": "say"}])),
                ]),
            ))
            .await
            .unwrap();

        let RouteResponse::System(patched) = patched else {
            panic!("expected a system");
        };
        assert_eq!(patched.description, "second");
        assert_eq!(patched.instances.len(), 2);
        assert_eq!(patched.metadata["team"], "garden");
        assert_eq!(patched.commands, vec![Command::new("say")]);

        let event = next_event(&mut sub).await;
        assert!(!event.error);
        assert_eq!(event.payload.unwrap()["description"], "second");

        runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_failed_patch_keeps_earlier_operations() {
        let runtime = runtime();
        let mut sub = runtime
            .container()
            .event_bus
            .subscribe(EventFilter::kinds(vec![EventKind::SystemUpdated]));
        let created = create(&runtime, System::new("echo", "1.0.0")).await;
        let id = created.id.clone().unwrap();

        let err = runtime
            .router()
            .route(RouteRequest::new(RouteKind::Update).with_id(id.clone()).with_payload(
                RoutePayload::Operations(vec![
                    PatchOperation::replace("/description", json!("kept")),
                    PatchOperation::add("/instance", json!({"name": "second"})),
                ]),
            ))
            .await
            .unwrap_err();

        assert!(matches!(err, SystemError::Validation(_)));
        let event = next_event(&mut sub).await;
        assert!(event.error);
        assert!(event.payload.is_none());

        let stored = runtime
            .router()
            .route(RouteRequest::new(RouteKind::Read).with_id(id))
            .await
            .unwrap();
        let RouteResponse::System(stored) = stored else {
            panic!("expected a system");
        };
        assert_eq!(stored.description, "kept");
        assert_eq!(stored.instances.len(), 1);

        runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_command_conflict_on_release_version() {
        let runtime = runtime();
        let created = create(
            &runtime,
            System::new("echo", "1.0.0").with_commands(vec![Command::new("say")]),
        )
        .await;

        let err = runtime
            .router()
            .route(
                RouteRequest::new(RouteKind::Update)
                    .with_id(created.id.clone().unwrap())
                    .with_payload(RoutePayload::Operations(vec![PatchOperation::replace(
                        "/commands",
                        json!([{"name": "shout"}]),
                    )])),
            )
            .await
            .unwrap_err();

        assert_eq!(
            err,
            SystemError::Validation(
                "System echo-1.0.0 already exists with different commands".into()
            )
        );

        runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_missing_id_is_a_routing_error() {
        let runtime = runtime();

        let err = runtime
            .router()
            .route(RouteRequest::new(RouteKind::Delete))
            .await
            .unwrap_err();

        assert!(matches!(err, SystemError::RoutingRequest(_)));
        runtime.shutdown().await;
    }
}
