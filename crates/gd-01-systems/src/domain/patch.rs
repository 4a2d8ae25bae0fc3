//! Rules behind the patch state machine.
//!
//! Field replacement goes through a fixed table of typed setters; any path
//! missing from the table is unsupported.

use serde_json::{Map, Value};
use shared_types::{Command, System};

use crate::error::{SystemError, SystemResult};

/// Setter for a replaceable text field.
pub type ReplaceSetter = fn(&mut System, String);

const REPLACEABLE_FIELDS: &[(&str, ReplaceSetter)] = &[
    ("/description", set_description),
    ("/icon_name", set_icon_name),
    ("/display_name", set_display_name),
];

fn set_description(system: &mut System, value: String) {
    system.description = value;
}

fn set_icon_name(system: &mut System, value: String) {
    system.icon_name = value;
}

fn set_display_name(system: &mut System, value: String) {
    system.display_name = value;
}

/// Look up the setter for a `replace` path.
#[must_use]
pub fn replace_setter(path: &str) -> Option<ReplaceSetter> {
    REPLACEABLE_FIELDS
        .iter()
        .find(|(field, _)| *field == path)
        .map(|(_, setter)| *setter)
}

/// Text operand of a field `replace`. `null` becomes an empty string so the
/// store never sees a field deletion.
pub fn text_value(path: &str, value: Value) -> SystemResult<String> {
    match value {
        Value::Null => Ok(String::new()),
        Value::String(text) => Ok(text),
        other => Err(SystemError::Validation(format!(
            "Value for '{path}' must be a string, got {other}"
        ))),
    }
}

/// Reject replacing the command set of a released version.
///
/// Only `dev` versions, or systems without commands yet, may change their
/// command set. Replacing with an identical set is always allowed.
pub fn check_command_replacement(system: &System, commands: &[Command]) -> SystemResult<()> {
    if !system.commands.is_empty()
        && !system.is_dev_version()
        && system.has_different_commands(commands)
    {
        return Err(SystemError::Validation(format!(
            "System {} already exists with different commands",
            system.label()
        )));
    }
    Ok(())
}

/// Reject adding an instance once the limit is reached.
pub fn check_instance_limit(system: &System, instance_name: &str) -> SystemResult<()> {
    let limit = system.max_instances.unwrap_or(1) as usize;
    if system.instances.len() >= limit {
        return Err(SystemError::Validation(format!(
            "Unable to add instance {instance_name} as it would exceed the system instance \
             limit ({limit})"
        )));
    }
    Ok(())
}

/// Merge `update` into `metadata`. New keys are added, existing keys are
/// overwritten, keys absent from `update` are kept.
pub fn merge_metadata(metadata: &mut Map<String, Value>, update: Value) -> SystemResult<()> {
    match update {
        Value::Object(entries) => {
            for (key, value) in entries {
                metadata.insert(key, value);
            }
            Ok(())
        }
        other => Err(SystemError::Validation(format!(
            "Metadata update must be a mapping, got {other}"
        ))),
    }
}
