//! # Local Plugin Flows
//!
//! Plugin processes supervised by the runtime and driven through patch
//! operations:
//!
//! 1. **Startup**: specs from `plugin.local.specs` are launched by `start`
//! 2. **Reload**: a `reload` patch restarts the system's processes
//! 3. **Rescan**: a `rescan` patch without an id starts anything not running
//! 4. **Shutdown**: every process is stopped

#[cfg(all(test, unix))]
mod tests {
    use std::io::Write;
    use std::sync::Arc;

    use garden_runtime::{GardenConfig, GardenRuntime};
    use gd_01_systems::{Operation, RouteResponse, SystemError};
    use gd_02_local_plugins::PluginLaunchSpec;
    use serde_json::json;

    fn sleeper(instance: &str) -> PluginLaunchSpec {
        PluginLaunchSpec::new("echo", "1.0.0", instance, vec!["sleep".into(), "30".into()])
            .with_cwd(std::env::temp_dir())
    }

    fn specs_file(specs: &[PluginLaunchSpec]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(serde_json::to_string(specs).unwrap().as_bytes())
            .unwrap();
        file
    }

    #[tokio::test]
    async fn test_start_launches_configured_plugins() {
        let file = specs_file(&[sleeper("a"), sleeper("b")]);
        let runtime = GardenRuntime::new(GardenConfig {
            plugin_specs: Some(file.path().to_path_buf()),
            ..GardenConfig::default()
        })
        .unwrap();

        runtime.start();

        let plugins = runtime.container().plugins.clone();
        for name in ["echo[a]-1.0.0", "echo[b]-1.0.0"] {
            plugins.runner(name).unwrap().wait_started().await;
        }
        assert_eq!(plugins.running_plugins().len(), 2);

        runtime.shutdown().await;
        assert!(plugins.running_plugins().is_empty());
    }

    #[tokio::test]
    async fn test_reload_patch_restarts_processes() {
        let runtime = GardenRuntime::new(GardenConfig::default()).unwrap();
        let plugins = runtime.container().plugins.clone();
        plugins.register(sleeper("default"));
        let first = plugins.launch("echo[default]-1.0.0").unwrap();
        first.wait_started().await;

        let created = runtime
            .router()
            .route_operation(Operation::new(
                "SYSTEM_CREATE",
                vec![json!({"name": "echo", "version": "1.0.0"})],
            ))
            .await
            .unwrap();
        let RouteResponse::System(created) = created else {
            panic!("expected a system");
        };

        runtime
            .router()
            .route_operation(Operation::new(
                "SYSTEM_UPDATE",
                vec![json!(created.id.unwrap()), json!([{"operation": "reload"}])],
            ))
            .await
            .unwrap();

        assert!(!first.is_running());
        let second = plugins.runner("echo[default]-1.0.0").unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        second.wait_started().await;
        assert!(second.is_running());

        runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_reload_of_remote_system_is_a_plugin_error() {
        let runtime = GardenRuntime::new(GardenConfig::default()).unwrap();
        let created = runtime
            .router()
            .route_operation(Operation::new(
                "SYSTEM_CREATE",
                vec![json!({"name": "remote", "version": "1.0.0"})],
            ))
            .await
            .unwrap();
        let RouteResponse::System(created) = created else {
            panic!("expected a system");
        };

        let err = runtime
            .router()
            .route_operation(Operation::new(
                "SYSTEM_UPDATE",
                vec![json!(created.id.unwrap()), json!([{"operation": "reload"}])],
            ))
            .await
            .unwrap_err();

        assert!(matches!(err, SystemError::Plugin(_)));
        assert!(!err.is_client_error());
        runtime.shutdown().await;
    }

    #[tokio::test]
    async fn test_rescan_starts_registered_plugins() {
        let runtime = GardenRuntime::new(GardenConfig::default()).unwrap();
        let plugins = runtime.container().plugins.clone();
        plugins.register(sleeper("default"));

        let response = runtime
            .router()
            .route_operation(Operation::new(
                "SYSTEM_UPDATE",
                vec![json!(null), json!([{"operation": "rescan"}])],
            ))
            .await
            .unwrap();

        assert_eq!(response, RouteResponse::Empty);
        let runner = plugins.runner("echo[default]-1.0.0").unwrap();
        runner.wait_started().await;
        assert!(runner.is_running());

        runtime.shutdown().await;
        assert!(!runner.is_running());
    }
}
