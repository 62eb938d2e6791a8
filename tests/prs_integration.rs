use httpmock::{Method::GET, MockServer};
use assert_cmd::Command;

fn run_lines(reqs: &[serde_json::Value], envs: &[(&str, &str)]) -> anyhow::Result<Vec<serde_json::Value>> {
    let mut cmd = Command::cargo_bin("repo2resume")?;
    cmd.env_remove("GH_TOKEN");
    for (k, v) in envs {
        cmd.env(k, v);
    }
    let mut input = String::new();
    for req in reqs {
        input.push_str(&serde_json::to_string(req)?);
        input.push('\n');
    }
    let assert = cmd
        .arg("--log-level")
        .arg("warn")
        .write_stdin(input)
        .assert()
        .success();
    let output = String::from_utf8(assert.get_output().stdout.clone())?;
    output
        .lines()
        .map(|l| serde_json::from_str(l).map_err(anyhow::Error::from))
        .collect()
}

fn envs(server: &MockServer) -> Vec<(&'static str, String)> {
    vec![
        ("GITHUB_API_URL", server.base_url()),
        ("GITHUB_TOKEN", "ghp_integration".to_string()),
        ("GITHUB_HTTP_MAX_RETRIES", "0".to_string()),
    ]
}

fn call(id: i64, name: &str, arguments: serde_json::Value) -> serde_json::Value {
    serde_json::json!({
        "jsonrpc": "2.0", "method": "tools/call", "id": id,
        "params": {"name": name, "arguments": arguments}
    })
}

fn mock_session(server: &MockServer) {
    server.mock(|when, then| {
        when.method(GET).path("/user");
        then.status(200).json_body(serde_json::json!({"login": "alice"}));
    });
    server.mock(|when, then| {
        when.method(GET).path("/rate_limit");
        then.status(200).json_body(serde_json::json!({
            "rate": {"limit": 5000, "remaining": 4999, "reset": 0, "used": 1}
        }));
    });
}

fn pr(number: u64, author: &str, day: u32) -> serde_json::Value {
    serde_json::json!({
        "number": number,
        "title": format!("Change {number}"),
        "body": "Details",
        "state": "open",
        "labels": [],
        "created_at": format!("2025-01-{day:02}T10:00:00Z"),
        "merged_at": null,
        "user": {"login": author}
    })
}

#[test]
fn list_pull_requests_window_over_stdio() -> anyhow::Result<()> {
    let server = MockServer::start();
    mock_session(&server);
    server.mock(|when, then| {
        when.method(GET).path("/repos/o/r");
        then.status(200).json_body(serde_json::json!({"full_name": "o/r"}));
    });
    server.mock(|when, then| {
        when.method(GET).path("/repos/o/r/pulls").query_param("page", "1");
        then.status(200).json_body(serde_json::json!([
            pr(4, "alice", 20),
            pr(3, "bob", 19),
            pr(2, "alice", 18),
            pr(1, "alice", 17)
        ]));
    });
    let page2 = server.mock(|when, then| {
        when.method(GET).path("/repos/o/r/pulls").query_param("page", "2");
        then.status(200).json_body(serde_json::json!([]));
    });

    let env = envs(&server);
    let env: Vec<(&str, &str)> = env.iter().map(|(k, v)| (*k, v.as_str())).collect();
    let out = run_lines(
        &[call(1, "list_pull_requests", serde_json::json!({"repo": "o/r", "page": 0, "per_page": 2}))],
        &env,
    )?;
    let result = &out[0]["result"];
    assert!(result.get("isError").is_none());
    let sc = &result["structuredContent"];
    let numbers: Vec<u64> = sc["items"]
        .as_array()
        .map(|items| items.iter().filter_map(|i| i["number"].as_u64()).collect())
        .unwrap_or_default();
    assert_eq!(numbers, vec![4, 2]);
    assert_eq!(sc["has_more"], true);
    assert_eq!(sc["page"], 0);
    assert_eq!(sc["per_page"], 2);
    // The lookahead was satisfied from page 1.
    page2.assert_hits(0);
    Ok(())
}

#[test]
fn unknown_repository_is_an_error_envelope() -> anyhow::Result<()> {
    let server = MockServer::start();
    mock_session(&server);
    server.mock(|when, then| {
        when.method(GET).path("/repos/o/gone");
        then.status(404).json_body(serde_json::json!({"message": "Not Found"}));
    });

    let env = envs(&server);
    let env: Vec<(&str, &str)> = env.iter().map(|(k, v)| (*k, v.as_str())).collect();
    let out = run_lines(&[call(7, "list_commits", serde_json::json!({"repo": "o/gone"}))], &env)?;
    let result = &out[0]["result"];
    assert_eq!(result["isError"], true);
    assert_eq!(result["structuredContent"]["error"]["code"], "not_found");
    assert_eq!(result["structuredContent"]["error"]["retriable"], false);
    assert!(result["content"][0]["text"].as_str().unwrap_or("").contains("o/gone"));
    Ok(())
}

#[test]
fn repositories_are_fetched_once_per_session() -> anyhow::Result<()> {
    let server = MockServer::start();
    mock_session(&server);
    let repos = server.mock(|when, then| {
        when.method(GET).path("/user/repos").query_param("page", "1");
        then.status(200).json_body(serde_json::json!([
            {"name": "r", "full_name": "o/r", "fork": false, "private": false, "html_url": "https://github.com/o/r"}
        ]));
    });
    server.mock(|when, then| {
        when.method(GET).path("/user/repos").query_param("page", "2");
        then.status(200).json_body(serde_json::json!([]));
    });

    let env = envs(&server);
    let env: Vec<(&str, &str)> = env.iter().map(|(k, v)| (*k, v.as_str())).collect();
    let out = run_lines(
        &[
            call(1, "list_repositories", serde_json::json!({})),
            call(2, "list_repositories", serde_json::json!({})),
        ],
        &env,
    )?;
    assert_eq!(out.len(), 2);
    for resp in &out {
        assert_eq!(resp["result"]["structuredContent"]["items"][0]["full_name"], "o/r");
    }
    repos.assert_hits(1);
    Ok(())
}

#[test]
fn summary_prompt_lists_priority_prs_first() -> anyhow::Result<()> {
    let server = MockServer::start();
    mock_session(&server);
    server.mock(|when, then| {
        when.method(GET).path("/repos/o/r");
        then.status(200).json_body(serde_json::json!({"full_name": "o/r"}));
    });
    server.mock(|when, then| {
        when.method(GET).path("/repos/o/r/commits").query_param("page", "1");
        then.status(200).json_body(serde_json::json!([
            {"sha": "abc", "commit": {"message": "Add retry loop", "author": {"name": "Alice", "date": "2025-01-18T00:00:00Z"}}}
        ]));
    });
    server.mock(|when, then| {
        when.method(GET).path("/repos/o/r/commits").query_param("page", "2");
        then.status(200).json_body(serde_json::json!([]));
    });
    server.mock(|when, then| {
        when.method(GET).path("/repos/o/r/pulls").query_param("page", "1");
        then.status(200).json_body(serde_json::json!([pr(9, "alice", 20), pr(8, "alice", 19)]));
    });
    server.mock(|when, then| {
        when.method(GET).path("/repos/o/r/pulls").query_param("page", "2");
        then.status(200).json_body(serde_json::json!([]));
    });

    let env = envs(&server);
    let env: Vec<(&str, &str)> = env.iter().map(|(k, v)| (*k, v.as_str())).collect();
    let out = run_lines(
        &[call(
            3,
            "build_summary_prompt",
            serde_json::json!({"repo": "o/r", "prioritized_pr_numbers": [8]}),
        )],
        &env,
    )?;
    let sc = &out[0]["result"]["structuredContent"];
    assert_eq!(sc["commits_analyzed"], 1);
    assert_eq!(sc["prs_analyzed"], 2);
    let messages = sc["request"]["messages"].as_array().cloned().unwrap_or_default();
    let user_prompt = messages
        .iter()
        .find(|m| m["role"] == "user")
        .and_then(|m| m["content"].as_str())
        .unwrap_or("")
        .to_string();
    let priority_at = user_prompt.find("#8").unwrap_or(usize::MAX);
    let regular_at = user_prompt.find("#9").unwrap_or(0);
    assert!(priority_at < regular_at, "prompt was: {user_prompt}");
    assert!(user_prompt.contains("Add retry loop"));
    Ok(())
}
