use serde::{Deserialize, Serialize};

use crate::error::ErrorInfo;
use crate::prompt::SummaryRequest;
use crate::types::{Commit, PullRequest, Repository};

pub const PROTOCOL_VERSION: &str = "2024-11-01";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: serde_json::Value,
}

fn date_props() -> serde_json::Value {
    serde_json::json!({
        "type": "string",
        "description": "RFC 3339 timestamp or YYYY-MM-DD; UTC when no offset is given"
    })
}

pub fn tool_descriptors(enable_ping: bool) -> Vec<ToolDescriptor> {
    let mut tools = Vec::new();
    if enable_ping {
        tools.push(ToolDescriptor {
            name: "ping".into(),
            description: "Health check; echoes a message.".into(),
            input_schema: serde_json::json!({
                "type": "object",
                "additionalProperties": false,
                "properties": {
                    "message": {"type": "string"}
                }
            }),
        });
    }

    tools.push(ToolDescriptor {
        name: "list_repositories".into(),
        description: "List repositories the authenticated user owns, collaborates on, or reaches through an organization".into(),
        input_schema: serde_json::json!({
            "type": "object",
            "additionalProperties": false,
            "properties": {}
        }),
    });

    tools.push(ToolDescriptor {
        name: "list_pull_requests".into(),
        description: "One page of the authenticated user's pull requests in a repository, newest first".into(),
        input_schema: serde_json::json!({
            "type": "object",
            "additionalProperties": false,
            "properties": {
                "repo": {"type": "string", "description": "owner/name"},
                "page": {"type": "integer", "minimum": 0},
                "per_page": {"type": "integer", "minimum": 1, "maximum": 100},
                "start_date": date_props(),
                "end_date": date_props()
            },
            "required": ["repo"]
        }),
    });

    tools.push(ToolDescriptor {
        name: "list_commits".into(),
        description: "All commits the authenticated user authored in a repository".into(),
        input_schema: serde_json::json!({
            "type": "object",
            "additionalProperties": false,
            "properties": {
                "repo": {"type": "string", "description": "owner/name"},
                "start_date": date_props(),
                "end_date": date_props()
            },
            "required": ["repo"]
        }),
    });

    tools.push(ToolDescriptor {
        name: "build_summary_prompt".into(),
        description: "Fetch commits and pull requests and assemble a resume-summary chat request".into(),
        input_schema: serde_json::json!({
            "type": "object",
            "additionalProperties": false,
            "properties": {
                "repo": {"type": "string", "description": "owner/name"},
                "start_date": date_props(),
                "end_date": date_props(),
                "prioritized_pr_numbers": {"type": "array", "items": {"type": "integer"}}
            },
            "required": ["repo"]
        }),
    });

    tools
}

#[derive(Debug, Deserialize)]
pub struct PingInput {
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PingOutput {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ListRepositoriesOutput {
    pub items: Option<Vec<Repository>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
}

#[derive(Debug, Deserialize)]
pub struct ListPullRequestsInput {
    pub repo: String,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ListPullRequestsOutput {
    pub items: Option<Vec<PullRequest>>,
    pub page: u32,
    pub per_page: u32,
    pub has_more: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
}

#[derive(Debug, Deserialize)]
pub struct ListCommitsInput {
    pub repo: String,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ListCommitsOutput {
    pub items: Option<Vec<Commit>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
}

#[derive(Debug, Deserialize)]
pub struct BuildSummaryInput {
    pub repo: String,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub prioritized_pr_numbers: Option<Vec<u64>>,
}

#[derive(Debug, Serialize)]
pub struct BuildSummaryOutput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request: Option<SummaryRequest>,
    pub repo_name: String,
    pub commits_analyzed: usize,
    pub prs_analyzed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
}
