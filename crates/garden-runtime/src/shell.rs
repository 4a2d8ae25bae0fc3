//! # Operation Shell
//!
//! Serves operations as JSON lines: one `Operation` per input line, one
//! reply per output line.
//!
//! ```text
//! → {"operation_type": "SYSTEM_READ", "args": []}
//! ← {"result": [...]}
//! → {"operation_type": "SYSTEM_DELETE", "args": ["missing"]}
//! ← {"error": {"kind": "NotFoundError", "message": "System not found: missing"}}
//! ```

use gd_01_systems::{Operation, RouteResponse, Router, SystemError};
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

/// Name of an error as reported to shell clients.
#[must_use]
pub fn error_kind(err: &SystemError) -> &'static str {
    match err {
        SystemError::RoutingRequest(_) => "RoutingRequestError",
        SystemError::Validation(_) => "ValidationError",
        SystemError::NotFound(_) => "NotFoundError",
        SystemError::Storage(_) => "StorageError",
        SystemError::Queue(_) => "QueueError",
        SystemError::Plugin(_) => "PluginError",
    }
}

fn reply(result: Result<RouteResponse, SystemError>) -> Value {
    match result {
        Ok(response) => json!({ "result": response }),
        Err(err) => json!({
            "error": {
                "kind": error_kind(&err),
                "message": err.to_string(),
            }
        }),
    }
}

/// Handle one input line.
pub async fn handle_line(router: &Router, line: &str) -> Value {
    let result = match serde_json::from_str::<Operation>(line) {
        Ok(operation) => {
            debug!(operation = %operation.operation_type, "Operation received");
            router.route_operation(operation).await
        }
        Err(e) => Err(SystemError::RoutingRequest(format!("Malformed operation: {e}"))),
    };

    if let Err(err) = &result {
        if !err.is_client_error() {
            warn!(error = %err, "Operation failed");
        }
    }
    reply(result)
}

/// Serve operations until the input ends. Returns the number handled.
pub async fn run_shell<R, W>(router: &Router, input: R, mut output: W) -> std::io::Result<usize>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    let mut handled = 0;

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let reply = handle_line(router, &line).await;
        output.write_all(reply.to_string().as_bytes()).await?;
        output.write_all(b"\n").await?;
        output.flush().await?;
        handled += 1;
    }

    Ok(handled)
}
