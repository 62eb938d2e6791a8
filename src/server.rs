use crate::config::Config;
use crate::error::FetchError;
use crate::mcp::wrap_output;
use crate::prompt::build_summary_request;
use crate::service::{ActivityService, RepoCache};
use crate::tools::*;
use crate::types::DateRange;
use crate::window::WindowRequest;
use log::{debug, info, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

// Minimal JSON-RPC 2.0 types
#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum Id {
    Str(String),
    Num(i64),
    Null,
}

#[derive(Debug, Serialize, Deserialize)]
struct Request {
    jsonrpc: String,
    method: String,
    #[serde(default)]
    params: Value,
    id: Option<Id>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Response {
    jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<RpcError>,
    id: Option<Id>,
}

#[derive(Debug, Serialize, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

fn rpc_error(id: Option<Id>, code: i64, message: &str, data: Option<Value>) -> Response {
    Response { jsonrpc: "2.0".into(), result: None, error: Some(RpcError { code, message: message.into(), data }), id }
}

fn rpc_ok(id: Option<Id>, result: Value) -> Response {
    Response { jsonrpc: "2.0".into(), result: Some(result), error: None, id }
}

/// Serve newline-delimited JSON-RPC requests from stdin until EOF.
pub async fn run_stdio_server() -> anyhow::Result<()> {
    info!("Starting repo2resume stdio server; protocol={}", PROTOCOL_VERSION);
    let mut server = Server::new(Arc::new(RepoCache::new()));
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut out = tokio::io::stdout();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let resp = match serde_json::from_str::<Request>(&line) {
            Ok(req) => {
                debug!("Received method={}", req.method);
                server.dispatch(req).await
            }
            Err(e) => rpc_error(None, -32700, &format!("Parse error: {}", e), None),
        };
        let payload = serde_json::to_string(&resp)?;
        out.write_all(payload.as_bytes()).await?;
        out.write_all(b"\n").await?;
        out.flush().await?;
    }
    Ok(())
}

enum Unavailable {
    Config(String),
    Fetch(FetchError),
}

struct Server {
    cache: Arc<RepoCache>,
    service: Option<ActivityService>,
    enable_ping: bool,
}

impl Server {
    fn new(cache: Arc<RepoCache>) -> Self {
        let enable_ping = std::env::var("REPO2RESUME_ENABLE_PING")
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);
        Self { cache, service: None, enable_ping }
    }

    // Connect on first use and keep the service (and its cache) for later calls.
    async fn service(&mut self) -> Result<&ActivityService, Unavailable> {
        if self.service.is_none() {
            let cfg = Config::from_env().map_err(Unavailable::Config)?;
            let svc = ActivityService::connect(cfg, Arc::clone(&self.cache))
                .await
                .map_err(Unavailable::Fetch)?;
            self.service = Some(svc);
        }
        self.service
            .as_ref()
            .ok_or_else(|| Unavailable::Config("service not initialised".into()))
    }

    async fn dispatch(&mut self, req: Request) -> Response {
        match req.method.as_str() {
            "initialize" => handle_initialize(req.id),
            "tools/list" => rpc_ok(req.id, serde_json::json!({ "tools": tool_descriptors(self.enable_ping) })),
            "tools/call" => self.handle_tools_call(req.id, req.params).await,
            "ping" => handle_ping(req.id, req.params),
            other => rpc_error(req.id, -32601, &format!("Method not found: {}", other), None),
        }
    }

    async fn handle_tools_call(&mut self, id: Option<Id>, params: Value) -> Response {
        let parsed: Result<ToolCallParams, _> = serde_json::from_value(params);
        let Ok(call) = parsed else {
            return rpc_error(id, -32602, "Invalid params", None);
        };
        match call.name.as_str() {
            "ping" if self.enable_ping => {
                let input: PingInput = serde_json::from_value(call.arguments).unwrap_or(PingInput { message: None });
                let message = input.message.unwrap_or_else(|| "pong".to_string());
                rpc_ok(id, wrap_output(&PingOutput { message }))
            }
            "list_repositories" => self.handle_list_repositories(id).await,
            "list_pull_requests" => self.handle_list_pull_requests(id, call.arguments).await,
            "list_commits" => self.handle_list_commits(id, call.arguments).await,
            "build_summary_prompt" => self.handle_build_summary(id, call.arguments).await,
            _ => rpc_error(id, -32601, &format!("Tool not found: {}", call.name), None),
        }
    }

    async fn handle_list_repositories(&mut self, id: Option<Id>) -> Response {
        let result = match self.service().await {
            Ok(svc) => svc.list_repositories().await,
            Err(Unavailable::Config(e)) => return rpc_error(id, -32603, &e, None),
            Err(Unavailable::Fetch(e)) => Err(e),
        };
        let out = match result {
            Ok(items) => ListRepositoriesOutput { items: Some(items), error: None },
            Err(e) => {
                warn!("list_repositories failed: {}", e);
                ListRepositoriesOutput { items: None, error: Some(e.to_info()) }
            }
        };
        rpc_ok(id, wrap_output(&out))
    }

    async fn handle_list_pull_requests(&mut self, id: Option<Id>, params: Value) -> Response {
        let input: ListPullRequestsInput = match parse_args(params) { Ok(v) => v, Err(e) => return rpc_error(id, -32602, &e, None) };
        let range = match DateRange::parse(input.start_date.as_deref(), input.end_date.as_deref()) { Ok(r) => r, Err(e) => return rpc_error(id, -32602, &e, None) };
        let request = WindowRequest::new(input.page.unwrap_or(0), input.per_page.unwrap_or(30));
        let result = match self.service().await {
            Ok(svc) => svc.list_pull_requests_window(&input.repo, &range, request).await,
            Err(Unavailable::Config(e)) => return rpc_error(id, -32603, &e, None),
            Err(Unavailable::Fetch(e)) => Err(e),
        };
        let out = match result {
            Ok(window) => ListPullRequestsOutput {
                items: Some(window.items),
                page: request.page,
                per_page: request.per_page,
                has_more: window.has_more,
                error: None,
            },
            Err(e) => {
                warn!("list_pull_requests failed: {}", e);
                ListPullRequestsOutput { items: None, page: request.page, per_page: request.per_page, has_more: false, error: Some(e.to_info()) }
            }
        };
        rpc_ok(id, wrap_output(&out))
    }

    async fn handle_list_commits(&mut self, id: Option<Id>, params: Value) -> Response {
        let input: ListCommitsInput = match parse_args(params) { Ok(v) => v, Err(e) => return rpc_error(id, -32602, &e, None) };
        let range = match DateRange::parse(input.start_date.as_deref(), input.end_date.as_deref()) { Ok(r) => r, Err(e) => return rpc_error(id, -32602, &e, None) };
        let result = match self.service().await {
            Ok(svc) => svc.list_commits(&input.repo, &range).await,
            Err(Unavailable::Config(e)) => return rpc_error(id, -32603, &e, None),
            Err(Unavailable::Fetch(e)) => Err(e),
        };
        let out = match result {
            Ok(items) => ListCommitsOutput { items: Some(items), error: None },
            Err(e) => {
                warn!("list_commits failed: {}", e);
                ListCommitsOutput { items: None, error: Some(e.to_info()) }
            }
        };
        rpc_ok(id, wrap_output(&out))
    }

    async fn handle_build_summary(&mut self, id: Option<Id>, params: Value) -> Response {
        let input: BuildSummaryInput = match parse_args(params) { Ok(v) => v, Err(e) => return rpc_error(id, -32602, &e, None) };
        let range = match DateRange::parse(input.start_date.as_deref(), input.end_date.as_deref()) { Ok(r) => r, Err(e) => return rpc_error(id, -32602, &e, None) };
        let prioritized = input.prioritized_pr_numbers.unwrap_or_default();
        let svc = match self.service().await {
            Ok(svc) => svc,
            Err(Unavailable::Config(e)) => return rpc_error(id, -32603, &e, None),
            Err(Unavailable::Fetch(e)) => return rpc_ok(id, wrap_output(&summary_error(&input.repo, e))),
        };
        // Independent fetches; run them side by side.
        let fetched = futures::try_join!(
            svc.list_commits(&input.repo, &range),
            svc.list_pull_requests(&input.repo, &range),
        );
        let out = match fetched {
            Ok((commits, prs)) => {
                let request = build_summary_request(&svc.config().summary_model, &input.repo, &commits, &prs, &prioritized);
                BuildSummaryOutput {
                    request: Some(request),
                    repo_name: input.repo,
                    commits_analyzed: commits.len(),
                    prs_analyzed: prs.len(),
                    error: None,
                }
            }
            Err(e) => {
                warn!("build_summary_prompt failed: {}", e);
                summary_error(&input.repo, e)
            }
        };
        rpc_ok(id, wrap_output(&out))
    }
}

fn summary_error(repo: &str, e: FetchError) -> BuildSummaryOutput {
    BuildSummaryOutput {
        request: None,
        repo_name: repo.to_string(),
        commits_analyzed: 0,
        prs_analyzed: 0,
        error: Some(e.to_info()),
    }
}

fn parse_args<T: DeserializeOwned>(params: Value) -> Result<T, String> {
    serde_json::from_value(params).map_err(|e| format!("Invalid params: {}", e))
}

fn handle_initialize(id: Option<Id>) -> Response {
    rpc_ok(
        id,
        serde_json::json!({
            "protocolVersion": PROTOCOL_VERSION,
            "server": {
                "name": "repo2resume",
                "version": env!("CARGO_PKG_VERSION"),
            }
        }),
    )
}

fn handle_ping(id: Option<Id>, params: Value) -> Response {
    let input: PingInput = match serde_json::from_value(params) {
        Ok(v) => v,
        Err(_) => PingInput { message: None },
    };
    let message = input.message.unwrap_or_else(|| "pong".to_string());
    rpc_ok(id, serde_json::json!({ "message": message }))
}

#[derive(Deserialize)]
struct ToolCallParams {
    name: String,
    #[serde(default)]
    arguments: Value,
}
