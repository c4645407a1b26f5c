//! Stdio transport.
//!
//! Messages are newline-delimited JSON by default. A client that opens with a
//! `Content-Length` header gets header-framed responses instead. Each inbound
//! message runs as its own task so a slow tool call never blocks `ping` or a
//! `notifications/cancelled` for it.

use std::collections::HashMap;
use std::io;

use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::AbortHandle;

use crate::{McpServer, RpcError, SessionContext, error_response};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Framing {
    Lines,
    ContentLength,
}

#[derive(Debug)]
struct Inbound {
    framing: Framing,
    payload: Result<Value, String>,
}

/// Serves MCP over the process's stdin and stdout until stdin closes.
pub async fn serve_stdio(server: McpServer, ctx: SessionContext) -> io::Result<()> {
    serve(
        server,
        ctx,
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
    )
    .await
}

/// Serves MCP over an arbitrary byte stream pair. Returns once input is
/// exhausted and every in-flight request has answered or been cancelled.
pub async fn serve<R, W>(
    server: McpServer,
    ctx: SessionContext,
    reader: R,
    mut writer: W,
) -> io::Result<()>
where
    R: AsyncBufRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin,
{
    let (in_tx, mut in_rx) = mpsc::channel::<Inbound>(64);
    tokio::spawn(read_loop(reader, in_tx));

    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Vec<Value>>();
    let mut out_tx = Some(out_tx);
    let mut in_flight: HashMap<String, AbortHandle> = HashMap::new();
    let mut framing = Framing::Lines;

    tracing::info!(event = "mcp.stdio.started", "serving MCP on stdio");

    loop {
        tokio::select! {
            inbound = in_rx.recv(), if out_tx.is_some() => {
                let Some(inbound) = inbound else {
                    // Input closed. Remaining tasks hold the only senders now.
                    out_tx = None;
                    continue;
                };
                framing = inbound.framing;
                let message = match inbound.payload {
                    Ok(message) => message,
                    Err(reason) => {
                        let response = error_response(Value::Null, RpcError::parse_error(reason));
                        write_message(&mut writer, framing, &response).await?;
                        continue;
                    }
                };

                if let Some(key) = cancelled_request(&message) {
                    if let Some(handle) = in_flight.remove(&key) {
                        handle.abort();
                        tracing::info!(event = "mcp.request.cancelled", request_id = %key, "request cancelled");
                    }
                    continue;
                }

                let Some(tx) = out_tx.clone() else { continue };
                let key = request_key(&message);
                let server = server.clone();
                let ctx = ctx.clone();
                let task = tokio::spawn(async move {
                    let responses = server.handle_incoming_message(&ctx, message).await;
                    if !responses.is_empty() {
                        let _ = tx.send(responses);
                    }
                });

                in_flight.retain(|_, handle| !handle.is_finished());
                if let Some(key) = key {
                    in_flight.insert(key, task.abort_handle());
                }
            }
            responses = out_rx.recv() => {
                let Some(responses) = responses else { break };
                for response in &responses {
                    write_message(&mut writer, framing, response).await?;
                }
            }
        }
    }

    tracing::info!(event = "mcp.stdio.closed", "stdin closed");
    Ok(())
}

async fn read_loop<R>(mut reader: R, tx: mpsc::Sender<Inbound>)
where
    R: AsyncBufRead + Unpin,
{
    loop {
        match read_message(&mut reader).await {
            Ok(Some(inbound)) => {
                if tx.send(inbound).await.is_err() {
                    return;
                }
            }
            Ok(None) => return,
            Err(e) => {
                tracing::warn!(event = "mcp.stdio.read_failed", error = %e, "failed to read MCP message");
                return;
            }
        }
    }
}

/// Largest `Content-Length` body accepted; bigger bodies are discarded unread.
const MAX_FRAME_BYTES: usize = 4 * 1024 * 1024;

enum Header {
    NotAHeader,
    Length(usize),
    Invalid(String),
}

/// Reads the next message. Blank lines between messages are skipped. A
/// malformed line or frame comes back as an `Err` payload so the caller can
/// answer it and keep reading.
async fn read_message<R>(reader: &mut R) -> io::Result<Option<Inbound>>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = Vec::new();
    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line).await? == 0 {
            return Ok(None);
        }
        let trimmed = line.trim_ascii();
        if trimmed.is_empty() {
            continue;
        }
        return match content_length(trimmed) {
            Header::NotAHeader => Ok(Some(Inbound {
                framing: Framing::Lines,
                payload: serde_json::from_slice(trimmed).map_err(|e| format!("Parse error: {e}")),
            })),
            Header::Length(length) => read_framed_body(reader, length).await,
            Header::Invalid(reason) => {
                if !skip_headers(reader).await? {
                    return Ok(None);
                }
                Ok(Some(Inbound {
                    framing: Framing::ContentLength,
                    payload: Err(reason),
                }))
            }
        };
    }
}

fn content_length(line: &[u8]) -> Header {
    let Some(colon) = line.iter().position(|&b| b == b':') else {
        return Header::NotAHeader;
    };
    let (name, value) = (&line[..colon], &line[colon + 1..]);
    if !name.trim_ascii().eq_ignore_ascii_case(b"content-length") {
        return Header::NotAHeader;
    }
    std::str::from_utf8(value.trim_ascii())
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .map_or_else(
            || Header::Invalid("Parse error: invalid Content-Length header".to_string()),
            Header::Length,
        )
}

/// Consumes header lines through the blank separator. False on EOF.
async fn skip_headers<R>(reader: &mut R) -> io::Result<bool>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = Vec::new();
    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line).await? == 0 {
            return Ok(false);
        }
        if line.trim_ascii().is_empty() {
            return Ok(true);
        }
    }
}

async fn read_framed_body<R>(reader: &mut R, length: usize) -> io::Result<Option<Inbound>>
where
    R: AsyncBufRead + Unpin,
{
    if !skip_headers(reader).await? {
        return Ok(None);
    }

    if length > MAX_FRAME_BYTES {
        tokio::io::copy(&mut (&mut *reader).take(length as u64), &mut tokio::io::sink()).await?;
        return Ok(Some(Inbound {
            framing: Framing::ContentLength,
            payload: Err(format!(
                "Parse error: message of {length} bytes exceeds the {MAX_FRAME_BYTES} byte limit"
            )),
        }));
    }

    let mut body = vec![0_u8; length];
    reader.read_exact(&mut body).await?;
    Ok(Some(Inbound {
        framing: Framing::ContentLength,
        payload: serde_json::from_slice(&body).map_err(|e| format!("Parse error: {e}")),
    }))
}

async fn write_message<W>(writer: &mut W, framing: Framing, value: &Value) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let body = serde_json::to_vec(value).map_err(|e| {
        io::Error::new(io::ErrorKind::InvalidData, format!("Failed to serialize JSON: {e}"))
    })?;
    match framing {
        Framing::Lines => {
            writer.write_all(&body).await?;
            writer.write_all(b"\n").await?;
        }
        Framing::ContentLength => {
            let header = format!(
                "Content-Length: {}\r\nContent-Type: application/json\r\n\r\n",
                body.len()
            );
            writer.write_all(header.as_bytes()).await?;
            writer.write_all(&body).await?;
        }
    }
    writer.flush().await
}

/// Key under which a request's task is tracked: its id, serialized.
fn request_key(message: &Value) -> Option<String> {
    let obj = message.as_object()?;
    obj.get("method")?;
    obj.get("id").and_then(|id| serde_json::to_string(id).ok())
}

fn cancelled_request(message: &Value) -> Option<String> {
    if message.get("method").and_then(Value::as_str) != Some("notifications/cancelled") {
        return None;
    }
    message
        .get("params")
        .and_then(|params| params.get("requestId"))
        .and_then(|id| serde_json::to_string(id).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ToolCategoryEnablement;
    use crate::test_support::{FakeLogchef, context_for, envelope};
    use axum::Router;
    use axum::routing::get;
    use serde_json::json;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, duplex};

    async fn exchange(ctx: SessionContext, input: &[u8]) -> String {
        let server = McpServer::new(&ToolCategoryEnablement::default());
        let (mut client_in, server_in) = duplex(64 * 1024);
        let (server_out, mut client_out) = duplex(64 * 1024);

        let serving = tokio::spawn(serve(server, ctx, BufReader::new(server_in), server_out));
        client_in.write_all(input).await.unwrap();
        drop(client_in);

        let mut output = String::new();
        tokio::time::timeout(Duration::from_secs(3), client_out.read_to_string(&mut output))
            .await
            .expect("stdio loop did not finish")
            .unwrap();
        serving.await.unwrap().unwrap();
        output
    }

    /// Splits one header-framed response off the front of `output`.
    fn framed_and_rest(output: &str) -> (Value, &str) {
        let (header, rest) = output.split_once("\r\n\r\n").unwrap();
        let length: usize = header
            .lines()
            .find_map(|line| line.strip_prefix("Content-Length: "))
            .unwrap()
            .parse()
            .unwrap();
        let (body, rest) = rest.split_at(length);
        (serde_json::from_str(body).unwrap(), rest)
    }

    fn lines(output: &str) -> Vec<Value> {
        output
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn line_delimited_requests_get_line_delimited_responses() {
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#,
            "\n\n",
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            "\n"
        );
        let output = exchange(SessionContext::default(), input.as_bytes()).await;
        assert_eq!(
            lines(&output),
            vec![json!({ "jsonrpc": "2.0", "id": 1, "result": {} })]
        );
    }

    #[tokio::test]
    async fn malformed_line_gets_parse_error_and_loop_continues() {
        let input = "not json\n{\"jsonrpc\":\"2.0\",\"id\":2,\"method\":\"ping\"}\n";
        let output = exchange(SessionContext::default(), input.as_bytes()).await;
        let responses = lines(&output);
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["id"], Value::Null);
        assert_eq!(responses[0]["error"]["code"], -32700);
        assert_eq!(responses[1]["id"], 2);
    }

    #[tokio::test]
    async fn invalid_utf8_line_gets_parse_error_and_loop_continues() {
        let mut input = b"{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"ping\",\"x\":\"\xff\"}\n".to_vec();
        input.extend_from_slice(b"{\"jsonrpc\":\"2.0\",\"id\":2,\"method\":\"ping\"}\n");
        let output = exchange(SessionContext::default(), &input).await;
        let responses = lines(&output);
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["error"]["code"], -32700);
        assert_eq!(responses[1]["id"], 2);
    }

    #[tokio::test]
    async fn bad_content_length_gets_parse_error_and_loop_continues() {
        let input = "Content-Length: abc\r\n\r\n{\"jsonrpc\":\"2.0\",\"id\":2,\"method\":\"ping\"}\n";
        let output = exchange(SessionContext::default(), input.as_bytes()).await;

        let (error, rest) = framed_and_rest(&output);
        assert_eq!(error["id"], Value::Null);
        assert_eq!(error["error"]["code"], -32700);
        assert_eq!(lines(rest)[0]["id"], 2);
    }

    #[tokio::test]
    async fn oversized_frame_is_refused_without_buffering() {
        let declared = MAX_FRAME_BYTES + 1;
        let mut input = format!("Content-Length: {declared}\r\n\r\n").into_bytes();
        input.resize(input.len() + declared, b' ');
        input.extend_from_slice(b"{\"jsonrpc\":\"2.0\",\"id\":3,\"method\":\"ping\"}\n");
        let output = exchange(SessionContext::default(), &input).await;

        let (error, rest) = framed_and_rest(&output);
        assert_eq!(error["error"]["code"], -32700);
        assert!(error["error"]["message"].as_str().unwrap().contains("exceeds"));
        assert_eq!(lines(rest)[0]["id"], 3);
    }

    #[tokio::test]
    async fn content_length_framing_is_mirrored() {
        let body = r#"{"jsonrpc":"2.0","id":"a","method":"ping"}"#;
        let input = format!("Content-Length: {}\r\n\r\n{body}", body.len());
        let output = exchange(SessionContext::default(), input.as_bytes()).await;

        let expected = r#"{"id":"a","jsonrpc":"2.0","result":{}}"#;
        let (header, payload) = output.split_once("\r\n\r\n").unwrap();
        assert!(header.starts_with("Content-Length: "));
        let payload: Value = serde_json::from_str(payload).unwrap();
        assert_eq!(payload, serde_json::from_str::<Value>(expected).unwrap());
    }

    #[tokio::test]
    async fn cancelled_request_never_answers_while_others_do() {
        let router = Router::new().route(
            "/api/v1/me/teams",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                envelope(json!([]))
            }),
        );
        let fake = FakeLogchef::serve(router).await;

        let input = [
            json!({ "jsonrpc": "2.0", "id": 7, "method": "tools/call", "params": { "name": "get_teams" } }),
            json!({ "jsonrpc": "2.0", "method": "notifications/cancelled", "params": { "requestId": 7 } }),
            json!({ "jsonrpc": "2.0", "id": 8, "method": "ping" }),
        ]
        .iter()
        .map(|message| format!("{message}\n"))
        .collect::<String>();

        let output = exchange(context_for(&fake), input.as_bytes()).await;
        let responses = lines(&output);
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0]["id"], 8);
    }

    #[test]
    fn request_keys_follow_the_id_shape() {
        let by_number = json!({ "jsonrpc": "2.0", "id": 3, "method": "ping" });
        let by_string = json!({ "jsonrpc": "2.0", "id": "3", "method": "ping" });
        assert_eq!(request_key(&by_number), Some("3".to_string()));
        assert_eq!(request_key(&by_string), Some("\"3\"".to_string()));

        let cancel = json!({ "method": "notifications/cancelled", "params": { "requestId": "3" } });
        assert_eq!(cancelled_request(&cancel), request_key(&by_string));
        assert_eq!(cancelled_request(&by_number), None);
    }
}
