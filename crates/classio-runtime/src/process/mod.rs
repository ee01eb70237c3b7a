//! Process isolate: each invocation runs the bundle source in a fresh child
//! process under an interpreter.
//!
//! The child sees a cleared environment (only `PATH` and `CLASSIO_TENANT`),
//! reads the request from stdin and answers on stdout using the
//! [`protocol`]. Children are spawned with `kill_on_drop`, so aborting an
//! invocation kills the process. The staged source file is removed when the
//! last handle to the loaded handler is dropped.

pub mod protocol;

use std::io::Write;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;

use async_trait::async_trait;
use classio_core::{
    Bundle, DEFAULT_INTERPRETER, DEFAULT_MAX_BODY_BYTES, DirectHandler, HandlerError, HandlerKind,
    Isolate, IsolateError, MiddlewareHandler, Next, NormalizedRequest, NormalizedResponse,
    ResponseSink, RuntimeKind, TenantHandler, TenantId,
};
use tempfile::NamedTempFile;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use self::protocol::{SinkOp, is_protocol_line, parse_direct_reply};

/// Environment variable carrying the tenant id into the child.
pub const TENANT_ENV: &str = "CLASSIO_TENANT";

/// Largest stdout a direct tenant process may produce.
pub const MAX_REPLY_BYTES: usize = DEFAULT_MAX_BODY_BYTES;

/// Isolate backend that runs bundle sources as child processes.
#[derive(Debug, Clone)]
pub struct ProcessIsolate {
    interpreter: String,
}

impl Default for ProcessIsolate {
    fn default() -> Self {
        Self::new(DEFAULT_INTERPRETER)
    }
}

impl ProcessIsolate {
    /// Use `interpreter` for bundles that do not name one.
    pub fn new(interpreter: impl Into<String>) -> Self {
        Self {
            interpreter: interpreter.into(),
        }
    }

    pub fn interpreter(&self) -> &str {
        &self.interpreter
    }
}

#[async_trait]
impl Isolate for ProcessIsolate {
    async fn load(&self, tenant: &TenantId, bundle: &Bundle) -> Result<TenantHandler, IsolateError> {
        if bundle.manifest.runtime != RuntimeKind::Process {
            return Err(IsolateError::NotInvocable(format!(
                "{} bundles cannot run as a process",
                bundle.manifest.runtime
            )));
        }
        if bundle.source.trim().is_empty() {
            return Err(IsolateError::NoHandler("bundle has no source".to_string()));
        }

        let script = stage_source(&bundle.source)?;
        let program = Arc::new(Program {
            tenant: tenant.clone(),
            interpreter: bundle
                .manifest
                .interpreter
                .clone()
                .unwrap_or_else(|| self.interpreter.clone()),
            script,
        });

        debug!(
            tenant = %tenant,
            interpreter = %program.interpreter,
            script = %program.script.path().display(),
            "staged process bundle"
        );

        Ok(match bundle.manifest.kind {
            HandlerKind::Direct => TenantHandler::Direct(Arc::new(ProcessDirect(program))),
            HandlerKind::Middleware => {
                TenantHandler::Middleware(Arc::new(ProcessMiddleware(program)))
            }
        })
    }
}

fn stage_source(source: &str) -> Result<NamedTempFile, IsolateError> {
    let mut file = tempfile::Builder::new()
        .prefix("classio-")
        .tempfile()
        .map_err(|e| IsolateError::Load(format!("failed to stage bundle: {e}")))?;
    file.write_all(source.as_bytes())
        .and_then(|()| file.flush())
        .map_err(|e| IsolateError::Load(format!("failed to stage bundle: {e}")))?;
    Ok(file)
}

/// A staged bundle plus everything needed to start it.
struct Program {
    tenant: TenantId,
    interpreter: String,
    script: NamedTempFile,
}

impl Program {
    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.interpreter);
        cmd.arg(self.script.path())
            .env_clear()
            .env(TENANT_ENV, self.tenant.as_str())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(path) = std::env::var_os("PATH") {
            cmd.env("PATH", path);
        }
        cmd
    }

    /// Start the child and hand it the request on stdin.
    fn spawn(&self, request: &NormalizedRequest) -> Result<Child, HandlerError> {
        let mut line = serde_json::to_vec(request)
            .map_err(|e| HandlerError::failed(format!("failed to encode request: {e}")))?;
        line.push(b'\n');

        let mut child = self.command().spawn().map_err(|e| {
            warn!(tenant = %self.tenant, interpreter = %self.interpreter, error = %e, "failed to spawn tenant process");
            HandlerError::failed(format!("failed to start {}: {e}", self.interpreter))
        })?;

        // Written from its own task so a child that prints before reading
        // cannot deadlock against a full stdin pipe.
        if let Some(mut stdin) = child.stdin.take() {
            tokio::spawn(async move {
                let _ = stdin.write_all(&line).await;
                let _ = stdin.shutdown().await;
            });
        }

        Ok(child)
    }

    /// Log stderr lines and keep the last non-empty one.
    fn drain_stderr(&self, child: &mut Child) -> Option<JoinHandle<Option<String>>> {
        let stderr = child.stderr.take()?;
        let tenant = self.tenant.clone();
        Some(tokio::spawn(async move {
            let mut last = None;
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(text)) = lines.next_line().await {
                debug!(tenant = %tenant, "stderr: {}", text);
                if !text.trim().is_empty() {
                    last = Some(text);
                }
            }
            last
        }))
    }

    fn exit_error(status: ExitStatus, last_stderr: Option<String>) -> HandlerError {
        HandlerError::failed(last_stderr.unwrap_or_else(|| format!("process exited with {status}")))
    }
}

async fn last_line(task: Option<JoinHandle<Option<String>>>) -> Option<String> {
    match task {
        Some(task) => task.await.ok().flatten(),
        None => None,
    }
}

/// Read a direct reply, failing once it grows past `limit` bytes.
async fn read_reply<R: AsyncRead + Unpin>(
    reader: Option<R>,
    limit: usize,
) -> Result<String, HandlerError> {
    let Some(reader) = reader else {
        return Ok(String::new());
    };

    let mut out = Vec::new();
    let cap = u64::try_from(limit).unwrap_or(u64::MAX).saturating_add(1);
    reader
        .take(cap)
        .read_to_end(&mut out)
        .await
        .map_err(|e| HandlerError::failed(format!("failed to read handler output: {e}")))?;

    if out.len() > limit {
        return Err(HandlerError::failed(format!(
            "handler output exceeds {limit} bytes"
        )));
    }
    String::from_utf8(out).map_err(|_| HandlerError::MalformedResponse)
}

struct ProcessDirect(Arc<Program>);

#[async_trait]
impl DirectHandler for ProcessDirect {
    async fn call(&self, request: NormalizedRequest) -> Result<NormalizedResponse, HandlerError> {
        let program = &self.0;
        let mut child = program.spawn(&request)?;
        let stderr = program.drain_stderr(&mut child);

        let stdout = read_reply(child.stdout.take(), MAX_REPLY_BYTES).await?;
        let status = child
            .wait()
            .await
            .map_err(|e| HandlerError::failed(format!("failed to wait for handler: {e}")))?;
        let last_stderr = last_line(stderr).await;

        if !status.success() {
            return Err(Program::exit_error(status, last_stderr));
        }

        for line in stdout.lines().filter(|line| !is_protocol_line(line.trim())) {
            if !line.trim().is_empty() {
                debug!(tenant = %program.tenant, "stdout: {}", line);
            }
        }

        parse_direct_reply(&stdout)
    }
}

struct ProcessMiddleware(Arc<Program>);

#[async_trait]
impl MiddlewareHandler for ProcessMiddleware {
    async fn handle(
        &self,
        request: NormalizedRequest,
        response: ResponseSink,
        next: Next,
    ) -> Result<(), HandlerError> {
        let program = &self.0;
        let mut child = program.spawn(&request)?;
        let stderr = program.drain_stderr(&mut child);

        if let Some(stdout) = child.stdout.take() {
            let mut lines = BufReader::new(stdout).lines();
            while let Some(line) = lines
                .next_line()
                .await
                .map_err(|e| HandlerError::failed(format!("failed to read handler output: {e}")))?
            {
                let line = line.trim();
                let op = if is_protocol_line(line) {
                    SinkOp::from_line(line)?
                } else {
                    None
                };
                match op {
                    Some(op) => op.apply(&response, &next),
                    None if !line.is_empty() => {
                        debug!(tenant = %program.tenant, "stdout: {}", line);
                    }
                    None => {}
                }
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|e| HandlerError::failed(format!("failed to wait for handler: {e}")))?;
        let last_stderr = last_line(stderr).await;

        if !status.success() && !response.is_ended() {
            return Err(Program::exit_error(status, last_stderr));
        }
        Ok(())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::time::Duration;

    use classio_core::{GatewayError, invoke_direct, invoke_middleware};

    use super::*;

    const DEADLINE: Duration = Duration::from_secs(5);

    async fn load(code: &str) -> TenantHandler {
        let bundle = Bundle::parse(code).unwrap();
        ProcessIsolate::default()
            .load(&TenantId::new("acme"), &bundle)
            .await
            .unwrap()
    }

    async fn direct(code: &str) -> Result<NormalizedResponse, GatewayError> {
        let TenantHandler::Direct(handler) = load(code).await else {
            panic!("expected direct handler");
        };
        invoke_direct(handler, NormalizedRequest::default(), DEADLINE).await
    }

    async fn middleware(code: &str, deadline: Duration) -> Result<NormalizedResponse, GatewayError> {
        let TenantHandler::Middleware(handler) = load(code).await else {
            panic!("expected middleware handler");
        };
        invoke_middleware(handler, NormalizedRequest::default(), deadline).await
    }

    #[tokio::test]
    async fn direct_script_echoes_request() {
        let response = direct(
            "#!classio kind=direct\n\
             read -r request\n\
             echo 'console noise'\n\
             printf '{\"status\":201,\"body\":%s}\\n' \"$request\"\n",
        )
        .await
        .unwrap();

        assert_eq!(response.status, 201);
        let echoed: serde_json::Value = serde_json::from_slice(&response.body).unwrap();
        assert_eq!(echoed["method"], "GET");
        assert_eq!(echoed["path"], "/");
    }

    #[tokio::test]
    async fn environment_is_cleared() {
        let response = direct(
            "#!classio kind=direct\n\
             printf '{\"body\":\"%s|%s\"}' \"$CLASSIO_TENANT\" \"$HOME\"\n",
        )
        .await
        .unwrap();
        assert_eq!(response.body_text(), "acme|");
    }

    #[tokio::test]
    async fn non_zero_exit_reports_last_stderr_line() {
        let err = direct("#!classio kind=direct\necho 'warming up' >&2\necho 'db down' >&2\nexit 3\n")
            .await
            .unwrap_err();
        assert_eq!(err, GatewayError::execution("db down"));
    }

    #[tokio::test]
    async fn garbage_output_is_not_a_response() {
        let err = direct("#!classio kind=direct\necho 'hello'\n").await.unwrap_err();
        assert_eq!(err.to_string(), "Handler must return a Response");
    }

    #[tokio::test]
    async fn middleware_script_streams_ops() {
        let response = middleware(
            "#!classio kind=middleware\n\
             echo 'booting'\n\
             echo '{\"op\":\"status\",\"code\":202}'\n\
             echo '{\"op\":\"type\",\"value\":\"text\"}'\n\
             echo '{\"op\":\"write\",\"chunk\":\"Hel\"}'\n\
             echo '{\"op\":\"end\",\"chunk\":\"lo\"}'\n",
            DEADLINE,
        )
        .await
        .unwrap();

        assert_eq!(response.status, 202);
        assert_eq!(response.body_text(), "Hello");
        assert_eq!(response.headers.get("content-type"), Some("text/plain; charset=utf-8"));
    }

    #[tokio::test]
    async fn structured_log_lines_are_not_ops() {
        let response = middleware(
            "#!classio kind=middleware\n\
             echo '{\"level\":\"info\",\"msg\":\"handling\"}'\n\
             echo '{\"op\":\"send\",\"body\":\"logged\"}'\n",
            DEADLINE,
        )
        .await
        .unwrap();
        assert_eq!(response.body_text(), "logged");
    }

    #[tokio::test]
    async fn oversized_reply_is_rejected() {
        let reply = read_reply(Some(&b"0123456789"[..]), 4).await.unwrap_err();
        assert_eq!(reply, HandlerError::failed("handler output exceeds 4 bytes"));

        let exact = read_reply(Some(&b"0123"[..]), 4).await.unwrap();
        assert_eq!(exact, "0123");
    }

    #[tokio::test]
    async fn middleware_completes_before_process_exits() {
        let response = middleware(
            "#!classio kind=middleware\necho '{\"op\":\"send\",\"body\":\"early\"}'\nsleep 30\n",
            DEADLINE,
        )
        .await
        .unwrap();
        assert_eq!(response.body_text(), "early");
    }

    #[tokio::test]
    async fn middleware_failure_before_completion() {
        let err = middleware("#!classio kind=middleware\necho 'boom' >&2\nexit 1\n", DEADLINE)
            .await
            .unwrap_err();
        assert_eq!(err, GatewayError::execution("boom"));
    }

    #[tokio::test]
    async fn hung_middleware_times_out() {
        let err = middleware("#!classio kind=middleware\nsleep 30\n", Duration::from_millis(200))
            .await
            .unwrap_err();
        assert_eq!(err, GatewayError::Timeout);
    }

    #[tokio::test]
    async fn rejects_native_bundles() {
        let bundle = Bundle::parse("#!classio kind=direct runtime=native entry=x").unwrap();
        let err = ProcessIsolate::default()
            .load(&TenantId::new("acme"), &bundle)
            .await
            .unwrap_err();
        assert!(matches!(err, IsolateError::NotInvocable(_)));
    }
}
