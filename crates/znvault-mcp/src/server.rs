//! MCP server over stdio.
//!
//! Newline-delimited JSON-RPC 2.0 messages on stdin, one response per line on
//! stdout. Stdout carries protocol frames only; diagnostics go through
//! `tracing` to stderr.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info, warn};
use znvault_client::SecretBackend;

use crate::tools::{SecretTools, tool_definitions};

pub const PROTOCOL_VERSION: &str = "2024-11-05";
pub const SERVER_NAME: &str = "znvault";

const PARSE_ERROR: i64 = -32700;
const INVALID_REQUEST: i64 = -32600;
const METHOD_NOT_FOUND: i64 = -32601;

// ── JSON-RPC 2.0 types ──────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct JsonRpcRequest {
    #[allow(dead_code)]
    jsonrpc: String,
    id: Option<Value>,
    method: String,
    params: Option<Value>,
}

#[derive(Debug, Serialize)]
struct JsonRpcResponse {
    jsonrpc: &'static str,
    id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
}

#[derive(Debug, Serialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

fn rpc_ok(id: Value, result: Value) -> JsonRpcResponse {
    JsonRpcResponse {
        jsonrpc: "2.0",
        id,
        result: Some(result),
        error: None,
    }
}

fn rpc_err(id: Value, code: i64, message: String) -> JsonRpcResponse {
    JsonRpcResponse {
        jsonrpc: "2.0",
        id,
        result: None,
        error: Some(JsonRpcError { code, message }),
    }
}

// ── Dispatch ─────────────────────────────────────────────────────────

async fn handle_request<B: SecretBackend>(
    tools: &SecretTools<B>,
    req: JsonRpcRequest,
) -> Result<Option<JsonRpcResponse>> {
    let id = req.id.clone().unwrap_or(Value::Null);

    let response = match req.method.as_str() {
        "initialize" => rpc_ok(
            id,
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": { "tools": {} },
                "serverInfo": {
                    "name": SERVER_NAME,
                    "version": env!("CARGO_PKG_VERSION")
                }
            }),
        ),

        // Sent by the client after the handshake; no reply.
        "notifications/initialized" => return Ok(None),

        "ping" => rpc_ok(id, json!({})),

        "tools/list" => rpc_ok(id, json!({ "tools": tool_definitions() })),

        "tools/call" => {
            let params = req.params.unwrap_or(Value::Null);
            let name = params.get("name").and_then(Value::as_str).unwrap_or("");
            let arguments = params.get("arguments").cloned().unwrap_or(json!({}));

            let output = tools.call(name, &arguments).await;
            let result =
                serde_json::to_value(&output).context("failed to serialize tool output")?;
            rpc_ok(id, result)
        }

        _ => {
            // Notifications (no id) are ignored.
            if req.id.is_none() {
                debug!(method = %req.method, "ignoring unknown notification");
                return Ok(None);
            }
            rpc_err(
                id,
                METHOD_NOT_FOUND,
                format!("method not found: {}", req.method),
            )
        }
    };

    Ok(Some(response))
}

/// Handle one line of input and return the response line, if any.
///
/// Blank lines and notifications produce no response. A line that is not
/// JSON yields a `-32700` error; JSON that is not a request yields `-32600`.
///
/// # Errors
///
/// Returns `Err` only if a response cannot be serialized.
pub async fn handle_line<B: SecretBackend>(
    tools: &SecretTools<B>,
    line: &str,
) -> Result<Option<String>> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let response = match serde_json::from_str::<Value>(trimmed) {
        Err(e) => {
            warn!(error = %e, "unparsable request line");
            Some(rpc_err(Value::Null, PARSE_ERROR, format!("parse error: {e}")))
        }
        Ok(value) => {
            let id = value.get("id").cloned().unwrap_or(Value::Null);
            match serde_json::from_value::<JsonRpcRequest>(value) {
                Ok(req) => {
                    debug!(method = %req.method, "request received");
                    handle_request(tools, req).await?
                }
                Err(e) => Some(rpc_err(
                    id,
                    INVALID_REQUEST,
                    format!("invalid request: {e}"),
                )),
            }
        }
    };

    response
        .map(|resp| serde_json::to_string(&resp).context("failed to serialize response"))
        .transpose()
}

fn write_frame(frame: &str) -> Result<()> {
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{frame}").context("failed to write to stdout")?;
    stdout.flush().context("failed to flush stdout")
}

/// Handle every line from `lines`, sending response frames to `frames`.
///
/// Each request runs as its own task, so a slow backend call does not hold
/// up `ping` or other tool calls. Responses are sent as they complete and may
/// arrive out of request order; clients match them by `id`. Returns once
/// `lines` is closed and every in-flight request has finished.
pub async fn serve<B: SecretBackend>(
    tools: Arc<SecretTools<B>>,
    mut lines: mpsc::Receiver<String>,
    frames: mpsc::Sender<String>,
) {
    let mut in_flight = JoinSet::new();

    while let Some(line) = lines.recv().await {
        let tools = Arc::clone(&tools);
        let frames = frames.clone();
        in_flight.spawn(async move {
            match handle_line(&*tools, &line).await {
                Ok(Some(frame)) => {
                    if frames.send(frame).await.is_err() {
                        debug!("output closed, dropping response");
                    }
                }
                Ok(None) => {}
                Err(e) => error!(error = %e, "failed to build response"),
            }
        });

        while let Some(done) = in_flight.try_join_next() {
            log_join(done);
        }
    }

    while let Some(done) = in_flight.join_next().await {
        log_join(done);
    }
}

fn log_join(result: std::result::Result<(), JoinError>) {
    if let Err(e) = result {
        error!(error = %e, "request task failed");
    }
}

/// Run the MCP server on stdin/stdout until stdin closes.
///
/// # Errors
///
/// Returns `Err` if stdout I/O fails.
pub async fn run<B: SecretBackend>(tools: SecretTools<B>) -> Result<()> {
    info!("mcp server started, reading from stdin");

    // Stdin is read on a blocking thread so backend calls can proceed.
    let (line_tx, line_rx) = mpsc::channel::<String>(32);
    tokio::task::spawn_blocking(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            match line {
                Ok(line) => {
                    if line_tx.blocking_send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!(error = %e, "failed to read stdin");
                    break;
                }
            }
        }
    });

    // A single writer keeps each frame on its own line.
    let (frame_tx, mut frame_rx) = mpsc::channel::<String>(32);
    let writer = tokio::task::spawn_blocking(move || -> Result<()> {
        while let Some(frame) = frame_rx.blocking_recv() {
            write_frame(&frame)?;
        }
        Ok(())
    });

    serve(Arc::new(tools), line_rx, frame_tx).await;
    writer.await.context("stdout writer task failed")??;

    info!("stdin closed, shutting down");
    Ok(())
}
