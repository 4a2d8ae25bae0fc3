//! # Router
//!
//! Validating dispatcher from route requests to the [`SystemApi`].
//!
//! | Kind | Needs | id present | id absent |
//! |------|-------|------------|-----------|
//! | CREATE | System payload | `create` | `create` |
//! | READ | - | `get_one` | `search` |
//! | UPDATE | patch payload | `patch` | `rescan` |
//! | DELETE | id | `remove` | - |
//!
//! A missing requirement is a `RoutingRequest` error. The router has no
//! side effects of its own.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use shared_types::{PatchOperation, SearchParams, System, SystemId};
use tracing::debug;

use crate::error::{SystemError, SystemResult};
use crate::ports::inbound::SystemApi;

/// Entity prefix of system operations in the envelope.
pub const SYSTEM_ENTITY: &str = "SYSTEM";

/// Route kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RouteKind {
    Create,
    Read,
    Update,
    Delete,
}

impl RouteKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Read => "READ",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for RouteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RouteKind {
    type Err = SystemError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREATE" => Ok(Self::Create),
            "READ" => Ok(Self::Read),
            "UPDATE" => Ok(Self::Update),
            "DELETE" => Ok(Self::Delete),
            other => Err(SystemError::RoutingRequest(format!(
                "{other} Route for Systems does not exist"
            ))),
        }
    }
}

/// Object carried by a request.
#[derive(Debug, Clone, PartialEq)]
pub enum RoutePayload {
    System(System),
    Operations(Vec<PatchOperation>),
}

/// A dispatch request.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteRequest {
    pub kind: RouteKind,
    pub id: Option<SystemId>,
    pub payload: Option<RoutePayload>,
    pub params: SearchParams,
}

impl RouteRequest {
    /// Request with no id, payload or criteria.
    #[must_use]
    pub fn new(kind: RouteKind) -> Self {
        Self {
            kind,
            id: None,
            payload: None,
            params: SearchParams::default(),
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<SystemId>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn with_payload(mut self, payload: RoutePayload) -> Self {
        self.payload = Some(payload);
        self
    }

    #[must_use]
    pub fn with_params(mut self, params: SearchParams) -> Self {
        self.params = params;
        self
    }
}

/// Result of a dispatch.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RouteResponse {
    System(System),
    Systems(Vec<System>),
    Empty,
}

// =============================================================================
// OPERATION ENVELOPE
// =============================================================================

/// Operation as handed over by the boundary layer, e.g.
/// `{"operation_type": "SYSTEM_UPDATE", "args": ["<id>", [<patch>...]]}`.
///
/// | Type | args |
/// |------|------|
/// | `SYSTEM_CREATE` | `[system]` |
/// | `SYSTEM_READ` | `[id?]`, search criteria in `kwargs` |
/// | `SYSTEM_UPDATE` | `[id or null, [patch...]]` |
/// | `SYSTEM_DELETE` | `[id]` |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub operation_type: String,
    #[serde(default)]
    pub args: Vec<Value>,
    #[serde(default)]
    pub kwargs: Map<String, Value>,
}

impl Operation {
    pub fn new(operation_type: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            operation_type: operation_type.into(),
            args,
            kwargs: Map::new(),
        }
    }

    /// Decode into a route request. Missing arguments are left unset so
    /// the router reports them.
    pub fn into_request(self) -> SystemResult<RouteRequest> {
        let kind = self.route_kind()?;
        let mut args = self.args.into_iter();
        let mut request = RouteRequest::new(kind);

        match kind {
            RouteKind::Create => {
                request.payload =
                    decode_arg::<System>(args.next(), "System")?.map(RoutePayload::System);
            }
            RouteKind::Read => {
                request.id = decode_arg::<SystemId>(args.next(), "id")?;
                request.params = serde_json::from_value(Value::Object(self.kwargs)).map_err(|e| {
                    SystemError::RoutingRequest(format!("Invalid search criteria: {e}"))
                })?;
            }
            RouteKind::Update => {
                request.id = decode_arg::<SystemId>(args.next(), "id")?;
                request.payload = decode_arg::<Vec<PatchOperation>>(args.next(), "patch")?
                    .map(RoutePayload::Operations);
            }
            RouteKind::Delete => {
                request.id = decode_arg::<SystemId>(args.next(), "id")?;
            }
        }

        Ok(request)
    }

    fn route_kind(&self) -> SystemResult<RouteKind> {
        match self.operation_type.split_once('_') {
            Some((SYSTEM_ENTITY, verb)) => verb.parse(),
            _ => Err(SystemError::RoutingRequest(format!(
                "Unsupported operation type {}",
                self.operation_type
            ))),
        }
    }
}

fn decode_arg<T: serde::de::DeserializeOwned>(
    arg: Option<Value>,
    what: &str,
) -> SystemResult<Option<T>> {
    match arg {
        None | Some(Value::Null) => Ok(None),
        Some(value) => serde_json::from_value(value)
            .map(Some)
            .map_err(|e| SystemError::RoutingRequest(format!("Invalid {what} argument: {e}"))),
    }
}

// =============================================================================
// ROUTER
// =============================================================================

/// Single entry point for system operations.
pub struct Router {
    systems: Arc<dyn SystemApi>,
}

impl Router {
    pub fn new(systems: Arc<dyn SystemApi>) -> Self {
        Self { systems }
    }

    /// Validate a request and dispatch it.
    pub async fn route(&self, request: RouteRequest) -> SystemResult<RouteResponse> {
        debug!(kind = %request.kind, id = ?request.id, "Routing system request");

        match request.kind {
            RouteKind::Create => match request.payload {
                Some(RoutePayload::System(system)) => {
                    Ok(RouteResponse::System(self.systems.create(system).await?))
                }
                Some(RoutePayload::Operations(_)) => Err(SystemError::RoutingRequest(
                    "CREATE request for Systems requires a System".into(),
                )),
                None => Err(SystemError::RoutingRequest(
                    "An Object is required to route CREATE request for Systems".into(),
                )),
            },
            RouteKind::Read => match request.id {
                Some(id) => Ok(RouteResponse::System(self.systems.get_one(&id).await?)),
                None => Ok(RouteResponse::Systems(
                    self.systems.search(request.params).await?,
                )),
            },
            RouteKind::Update => {
                let operations = match request.payload {
                    Some(RoutePayload::Operations(operations)) => operations,
                    Some(RoutePayload::System(_)) => {
                        return Err(SystemError::RoutingRequest(
                            "UPDATE request for Systems requires patch operations".into(),
                        ))
                    }
                    None => {
                        return Err(SystemError::RoutingRequest(
                            "An Object is required to route UPDATE request for Systems".into(),
                        ))
                    }
                };
                match request.id {
                    Some(id) => Ok(RouteResponse::System(
                        self.systems.patch(&id, operations).await?,
                    )),
                    None => {
                        self.systems.rescan(operations).await?;
                        Ok(RouteResponse::Empty)
                    }
                }
            }
            RouteKind::Delete => match request.id {
                Some(id) => Ok(RouteResponse::System(self.systems.remove(&id).await?)),
                None => Err(SystemError::RoutingRequest(
                    "An Identifier is required to route DELETE request for Systems".into(),
                )),
            },
        }
    }

    /// Decode an envelope and dispatch it.
    pub async fn route_operation(&self, operation: Operation) -> SystemResult<RouteResponse> {
        self.route(operation.into_request()?).await
    }
}
