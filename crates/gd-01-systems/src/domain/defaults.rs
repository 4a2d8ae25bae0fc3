//! Default-instance rule applied when a System is created.

use shared_types::{Instance, System};

use crate::error::{SystemError, SystemResult};

/// Name of the instance synthesized for systems created without any.
pub const DEFAULT_INSTANCE_NAME: &str = "default";

/// Fix `instances` and `max_instances` on a System about to be created.
///
/// - No instances and a limit of unset or 1: one `"default"` instance, limit 1.
/// - No instances and a limit above 1: rejected.
/// - Instances supplied and no limit: limit becomes the instance count.
///
/// Supplied instances with an explicit limit are accepted as-is.
pub fn apply_create_defaults(mut system: System) -> SystemResult<System> {
    if system.instances.is_empty() {
        match system.max_instances {
            None | Some(1) => {
                system.instances = vec![Instance::new(DEFAULT_INSTANCE_NAME)];
                system.max_instances = Some(1);
            }
            Some(_) => {
                return Err(SystemError::Validation(format!(
                    "Could not create system {}: Systems with max_instances > 1 must also \
                     define their instances",
                    system.label()
                )));
            }
        }
    } else if system.max_instances.map_or(true, |max| max == 0) {
        system.max_instances = Some(system.instances.len() as u32);
    }

    Ok(system)
}
