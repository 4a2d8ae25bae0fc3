//! Message-bus routing keys.

/// Routing key addressing a system's queues, e.g. `admin.echo.1-0-0`.
///
/// Dots in the version would add key segments, so they become dashes.
#[must_use]
pub fn routing_key(name: &str, version: &str, is_admin: bool) -> String {
    let version = version.replace('.', "-");
    if is_admin {
        format!("admin.{name}.{version}")
    } else {
        format!("{name}.{version}")
    }
}
