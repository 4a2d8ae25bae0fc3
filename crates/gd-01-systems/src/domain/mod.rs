//! # Domain Layer
//!
//! Pure rules over `System` values. Nothing here touches storage, the
//! message bus or plugin processes.

pub mod defaults;
pub mod patch;
pub mod routing;

pub use defaults::{apply_create_defaults, DEFAULT_INSTANCE_NAME};
pub use patch::{
    check_command_replacement, check_instance_limit, merge_metadata, replace_setter,
    text_value, ReplaceSetter,
};
pub use routing::routing_key;
