//! C9 — one task per connection. Frames are handled strictly in order:
//! parse → rate-check → authenticate (first frame only) → bind a client
//! session → security validation → schema validation → dispatch → respond.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::ws::{Message, WebSocket};
use bsrv_core::{CoreError, LogEvent, LogEventType};
use bsrv_protocol::{Command, ErrorCode, ErrorResponse, Response, ResponseBody, SuccessResponse};
use bsrv_security::SecurityViolation;
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::sync::{mpsc, watch};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::state::{ServerState, now_secs};

struct ClientSession {
    client_id: String,
    browser_session_id: String,
    #[allow(dead_code)]
    created_at: f64,
    last_activity: f64,
    command_count: u64,
}

/// Runs the full lifetime of one WebSocket connection: admission, the
/// message loop, and teardown. Never panics; every failure path is
/// logged and answered with a structured error frame.
pub async fn handle_connection(
    socket: WebSocket,
    state: Arc<ServerState>,
    client_addr: String,
    mut shutdown: watch::Receiver<bool>,
) {
    if !state.try_acquire_connection_slot() {
        warn!(client = %client_addr, "connection cap reached, rejecting");
        let (mut ws_tx, _) = socket.split();
        let _ = ws_tx.send(Message::Close(None)).await;
        return;
    }

    info!(client = %client_addr, "connection accepted");

    let (tx, rx) = mpsc::unbounded_channel::<Message>();
    let mut rx_stream = UnboundedReceiverStream::new(rx);
    let (mut ws_tx, mut ws_rx) = socket.split();

    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx_stream.next().await {
            if ws_tx.send(msg).await.is_err() {
                break;
            }
        }
    });

    let mut session: Option<ClientSession> = None;

    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            next = ws_rx.next() => {
                match next {
                    Some(Ok(Message::Text(text))) => {
                        if process_message(&state, &tx, &mut session, &client_addr, &text).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        warn!(client = %client_addr, error = %err, "websocket error");
                        break;
                    }
                }
            }
        }
    }

    if let Some(session) = session.take() {
        state.manager.close_session(&session.browser_session_id, now_secs()).await;
    }

    send_task.abort();
    state.release_connection_slot();
    info!(client = %client_addr, "connection closed");
}

/// Returns `Err(())` only when the outbound channel is gone (the send
/// task died), signalling the caller to tear the connection down.
async fn process_message(
    state: &Arc<ServerState>,
    tx: &mpsc::UnboundedSender<Message>,
    session: &mut Option<ClientSession>,
    client_addr: &str,
    raw: &str,
) -> Result<(), ()> {
    let now = now_secs();

    let parsed: Value = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(err) => {
            return send(
                tx,
                Response::Error(
                    ErrorResponse::new(None, format!("malformed frame: {err}"), ErrorCode::InvalidCommand, now)
                        .with_error_type("parsing"),
                ),
            );
        }
    };
    let frame_id = parsed.get("id").and_then(Value::as_str).map(str::to_owned);

    let rate_key = session.as_ref().map(|s| s.client_id.clone()).unwrap_or_else(|| client_addr.to_string());
    if !state.rate_limiter.lock().await.admit(&rate_key, now) {
        state.logger.log_event(LogEvent::new(now, LogEventType::RateLimitExceeded, rate_key, "rate limit exceeded", false));
        return send(
            tx,
            Response::Error(
                ErrorResponse::new(frame_id, "rate limit exceeded", ErrorCode::UnknownError, now)
                    .with_error_type("rate_limit"),
            ),
        );
    }

    let already_bound = session.is_some();

    if session.is_none() {
        if state.authenticator.is_enabled() {
            let provided = parsed.get("api_key").and_then(Value::as_str).unwrap_or("");
            if !state.authenticator.authenticate(provided) {
                let _ = send(
                    tx,
                    Response::Error(
                        ErrorResponse::new(frame_id, "authentication failed", ErrorCode::InvalidParams, now)
                            .with_error_type("auth"),
                    ),
                );
                return Err(());
            }
        }

        let client_id = Uuid::new_v4().to_string();
        let browser_session_id = match state.manager.create_session(now, client_id.clone(), Default::default()).await {
            Ok(id) => id,
            Err(err) => {
                return send(tx, error_response(frame_id, &err, now));
            }
        };
        state.logger.log_event(
            LogEvent::new(now, LogEventType::SessionStart, client_id.clone(), "session started", true)
                .with_client_addr(client_addr.to_string()),
        );
        *session = Some(ClientSession {
            client_id,
            browser_session_id,
            created_at: now,
            last_activity: now,
            command_count: 0,
        });
    }

    let client_session = session.as_mut().expect("session bound above");

    let mut command: Command = match serde_json::from_value(parsed) {
        Ok(command) => command,
        Err(err) => {
            return send(
                tx,
                Response::Error(
                    ErrorResponse::new(frame_id, format!("invalid command: {err}"), ErrorCode::InvalidCommand, now)
                        .with_error_type("parsing"),
                ),
            );
        }
    };

    let command_id = command.header().id.clone();
    state.logger.log_event(
        LogEvent::new(now, LogEventType::CommandReceived, client_session.client_id.clone(), "command received", true)
            .with_command_id(command_id.clone()),
    );

    if let Err(violation) = state.security.validate_command(&command) {
        return respond_security_violation(state, tx, client_session, &command_id, violation, now);
    }

    // A frame naming a session_id that does not belong to this connection
    // is rejected outright rather than silently rebound to this
    // connection's own session — otherwise cross-connection frames would
    // always execute against the wrong browser session.
    if already_bound && command.header().session_id != client_session.client_id {
        state.logger.log_event(
            LogEvent::new(now, LogEventType::CommandFailed, client_session.client_id.clone(), "session not found", false)
                .with_command_id(command_id.clone())
                .with_error_code(ErrorCode::SessionNotFound),
        );
        return send(
            tx,
            Response::Error(
                ErrorResponse::new(Some(command_id), "session not found", ErrorCode::SessionNotFound, now)
                    .with_error_type("session"),
            ),
        );
    }

    if let Err(validation) = command.validate() {
        state.logger.log_event(
            LogEvent::new(now, LogEventType::CommandFailed, client_session.client_id.clone(), validation.to_string(), false)
                .with_command_id(command_id.clone())
                .with_error_code(ErrorCode::InvalidParams),
        );
        return send(
            tx,
            Response::Error(
                ErrorResponse::new(Some(command_id), validation.to_string(), ErrorCode::InvalidParams, now)
                    .with_error_type("validation"),
            ),
        );
    }

    client_session.last_activity = now;
    client_session.command_count += 1;
    command.header_mut().session_id = client_session.browser_session_id.clone();

    let start = Instant::now();
    let dispatch_result = dispatch(state, &client_session.browser_session_id, &command, now).await;
    let execution_time_ms = start.elapsed().as_millis() as u64;
    let response_now = now_secs();

    match dispatch_result {
        Ok(body) => {
            state.logger.log_event(
                LogEvent::new(response_now, LogEventType::CommandExecuted, client_session.client_id.clone(), "command executed", true)
                    .with_command_id(command_id.clone())
                    .with_execution_time_ms(execution_time_ms),
            );
            send(
                tx,
                Response::Success(
                    SuccessResponse::new(command_id, response_now, body).with_execution_time_ms(execution_time_ms),
                ),
            )
        }
        Err(err) => {
            // An unclassified driver fault (`UnknownError`) gets its own
            // `error` event in addition to `command_failed`, so an
            // operator scanning the audit log can tell "the command
            // failed for a known domain reason" apart from "something
            // unexpected happened."
            let event_type =
                if err.error_code() == ErrorCode::UnknownError { LogEventType::Error } else { LogEventType::CommandFailed };
            state.logger.log_event(
                LogEvent::new(response_now, event_type, client_session.client_id.clone(), err.to_string(), false)
                    .with_command_id(command_id.clone())
                    .with_error_code(err.error_code()),
            );
            send(tx, error_response(Some(command_id), &err, response_now))
        }
    }
}

async fn dispatch(
    state: &ServerState,
    browser_session_id: &str,
    command: &Command,
    now: f64,
) -> Result<ResponseBody, CoreError> {
    match command {
        Command::Navigate(c) => state.manager.execute_navigate(browser_session_id, c, now).await.map(ResponseBody::Navigate),
        Command::Click(c) => state.manager.execute_click(browser_session_id, c, now).await.map(ResponseBody::Click),
        Command::Fill(c) => state.manager.execute_fill(browser_session_id, c, now).await.map(ResponseBody::Fill),
        Command::Extract(c) => state.manager.execute_extract(browser_session_id, c, now).await.map(ResponseBody::Extract),
        Command::Wait(c) => state.manager.execute_wait(browser_session_id, c, now).await.map(ResponseBody::Wait),
    }
}

fn respond_security_violation(
    state: &ServerState,
    tx: &mpsc::UnboundedSender<Message>,
    client_session: &ClientSession,
    command_id: &str,
    violation: SecurityViolation,
    now: f64,
) -> Result<(), ()> {
    debug!(client = %client_session.client_id, command_id, error = %violation, "security validation rejected command");
    state.logger.log_event(
        LogEvent::new(now, LogEventType::SecurityViolation, client_session.client_id.clone(), violation.to_string(), false)
            .with_command_id(command_id.to_string())
            .with_error_code(ErrorCode::InvalidParams),
    );
    send(
        tx,
        Response::Error(
            ErrorResponse::new(Some(command_id.to_string()), violation.to_string(), ErrorCode::InvalidParams, now)
                .with_error_type("security"),
        ),
    )
}

fn error_response(id: Option<String>, err: &CoreError, timestamp: f64) -> Response {
    let mut response = ErrorResponse::new(id, err.to_string(), err.error_code(), timestamp);
    if let Some(details) = err.details() {
        response = response.with_details(details);
    }
    Response::Error(response)
}

fn send(tx: &mpsc::UnboundedSender<Message>, response: Response) -> Result<(), ()> {
    let text = serde_json::to_string(&response).unwrap_or_else(|_| {
        r#"{"success":false,"error":"failed to serialize response","error_code":"UNKNOWN_ERROR","error_type":"unknown","timestamp":0}"#.to_string()
    });
    tx.send(Message::Text(text.into())).map_err(|_| ())
}
