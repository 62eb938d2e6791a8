//! Formats fetched activity into a bounded chat-completion request.

use std::collections::HashSet;
use std::fmt::Write as _;

use serde::Serialize;

use crate::types::{Commit, PullRequest};

pub const MAX_COMMITS: usize = 100;
pub const MAX_REGULAR_PRS: usize = 50;
pub const BODY_PREVIEW_CHARS: usize = 200;

const SYSTEM_PROMPT: &str = "You are a professional resume writer who creates compelling, \
achievement-focused summaries of technical work.";

const INSTRUCTIONS: &str = "Generate a professional resume-ready summary using bullet points. \
Focus on the MOST SIGNIFICANT contributions:

**PRIORITIZATION RULES:**
1. **PRIORITY PULL REQUESTS marked above MUST be featured prominently** - dedicate at least one bullet point per priority PR
2. Highlight the largest/most complex pull requests first (after priority PRs)
3. Focus on technically challenging problems solved
4. Emphasize advanced technologies, frameworks, and architectural decisions
5. Group related smaller changes into meaningful accomplishments

**FORMAT:**
- Use bullet points (one per major accomplishment)
- Each bullet should be 3-4 sentences (detailed but concise)
- Write in first person (\"Developed...\", \"Implemented...\", \"Architected...\")
- Start with action verbs (Developed, Implemented, Architected, Optimized, Refactored, Built, Designed, etc.)
- Include specific technical details, technologies used, and the problem solved

**CONTENT FOCUS:**
- Major features and their technical complexity
- Complex bugs and the sophisticated solutions used
- Performance optimizations and their measurable impact
- Architecture improvements and design patterns
- Advanced technologies, frameworks, libraries, and tools used
- Scale and scope (if dealing with large datasets, high traffic, etc.)

**AVOID:**
- Trivial changes (typo fixes, minor formatting)
- Vague statements without technical detail
- Preambles or meta-commentary
- Grouping unrelated items together

Start directly with the bullet points. No introduction needed.";

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

/// Request body for a chat-completion endpoint.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SummaryRequest {
    pub model: String,
    pub temperature: f32,
    pub messages: Vec<ChatMessage>,
}

pub fn build_summary_request(
    model: &str,
    repo_name: &str,
    commits: &[Commit],
    pull_requests: &[PullRequest],
    prioritized: &[u64],
) -> SummaryRequest {
    SummaryRequest {
        model: model.to_string(),
        temperature: 1.0,
        messages: vec![
            ChatMessage {
                role: "system",
                content: SYSTEM_PROMPT.to_string(),
            },
            ChatMessage {
                role: "user",
                content: build_prompt(repo_name, commits, pull_requests, prioritized),
            },
        ],
    }
}

/// The user prompt. Priority PRs are listed first and in full; the rest are
/// truncated and capped, as are commits.
pub fn build_prompt(
    repo_name: &str,
    commits: &[Commit],
    pull_requests: &[PullRequest],
    prioritized: &[u64],
) -> String {
    let wanted: HashSet<u64> = prioritized.iter().copied().collect();
    let (priority, regular): (Vec<&PullRequest>, Vec<&PullRequest>) =
        pull_requests.iter().partition(|pr| wanted.contains(&pr.number));

    let mut out = String::new();
    let _ = writeln!(
        out,
        "You are a professional resume writer analyzing GitHub contributions for a repository.\n"
    );
    let _ = writeln!(out, "Repository: {repo_name}\n");
    let _ = writeln!(out, "Commits ({} total):", commits.len());
    for c in commits.iter().take(MAX_COMMITS) {
        let _ = writeln!(out, "- {} (by {})", c.message, c.author);
    }

    let _ = writeln!(out, "\nPull Requests ({} total):", pull_requests.len());
    if !priority.is_empty() {
        let _ = writeln!(out, "\n**PRIORITY PULL REQUESTS** (MUST highlight these):");
        for pr in &priority {
            let _ = writeln!(out, "{}", pr_heading(pr));
            let _ = writeln!(
                out,
                "  Description: {}",
                pr.body.as_deref().unwrap_or("No description")
            );
        }
        let _ = writeln!(out, "\nOther Pull Requests:");
    }
    for pr in regular.iter().take(MAX_REGULAR_PRS) {
        let _ = writeln!(out, "{}", pr_heading(pr));
        let preview = match pr.body.as_deref() {
            Some(body) if !body.is_empty() => preview(body),
            _ => "No description".to_string(),
        };
        let _ = writeln!(out, "  {preview}...");
    }

    out.push('\n');
    out.push_str(INSTRUCTIONS);
    out
}

fn pr_heading(pr: &PullRequest) -> String {
    let labels = if pr.labels.is_empty() {
        "None".to_string()
    } else {
        pr.labels.join(", ")
    };
    format!("- #{}: {} [{}] (Labels: {})", pr.number, pr.title, pr.state, labels)
}

fn preview(body: &str) -> String {
    body.chars().take(BODY_PREVIEW_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn pr(number: u64, body: Option<&str>, labels: &[&str]) -> PullRequest {
        PullRequest {
            number,
            title: format!("Change {number}"),
            body: body.map(str::to_string),
            state: "closed".into(),
            labels: labels.iter().map(|l| l.to_string()).collect(),
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            merged_at: None,
        }
    }

    fn commit(i: usize) -> Commit {
        Commit {
            sha: format!("{i:040}"),
            message: format!("commit {i}"),
            author: "Octo".into(),
            date: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn priority_prs_come_first_and_in_full() {
        let long = "x".repeat(500);
        let prs = vec![pr(1, Some("short"), &[]), pr(2, Some(&long), &["perf", "db"])];
        let prompt = build_prompt("o/r", &[], &prs, &[2]);
        let priority_at = prompt.find("#2: Change 2").unwrap();
        let other_at = prompt.find("#1: Change 1").unwrap();
        assert!(priority_at < other_at);
        assert!(prompt.contains(&long));
        assert!(prompt.contains("(Labels: perf, db)"));
        assert!(prompt.contains("Other Pull Requests:"));
    }

    #[test]
    fn regular_bodies_are_truncated() {
        let long = "é".repeat(500);
        let prompt = build_prompt("o/r", &[], &[pr(1, Some(&long), &[])], &[]);
        assert!(prompt.contains(&format!("  {}...", "é".repeat(BODY_PREVIEW_CHARS))));
        assert!(!prompt.contains(&"é".repeat(BODY_PREVIEW_CHARS + 1)));
        assert!(prompt.contains("(Labels: None)"));
        assert!(!prompt.contains("PRIORITY PULL REQUESTS"));
    }

    #[test]
    fn commits_are_capped_but_counted() {
        let commits: Vec<_> = (0..150).map(commit).collect();
        let prompt = build_prompt("o/r", &commits, &[], &[]);
        assert!(prompt.contains("Commits (150 total):"));
        assert!(prompt.contains("- commit 99 (by Octo)"));
        assert!(!prompt.contains("- commit 100 (by Octo)"));
    }

    #[test]
    fn request_has_system_and_user_messages() {
        let req = build_summary_request("gpt-4o-mini", "o/r", &[], &[pr(3, None, &[])], &[]);
        assert_eq!(req.messages.len(), 2);
        assert_eq!(req.messages[0].role, "system");
        assert!(req.messages[1].content.contains("#3: Change 3 [closed]"));
        assert!(req.messages[1].content.contains("No description..."));
    }

    #[test]
    fn instructions_cover_focus_and_avoid_rules() {
        let prompt = build_prompt("o/r", &[], &[], &[]);
        for section in ["**PRIORITIZATION RULES:**", "**FORMAT:**", "**CONTENT FOCUS:**", "**AVOID:**"] {
            assert!(prompt.contains(section), "missing {section}");
        }
        assert!(prompt.contains("Optimized, Refactored, Built, Designed"));
        assert!(prompt.contains("- Performance optimizations and their measurable impact"));
        assert!(prompt.contains("- Grouping unrelated items together"));
        assert!(prompt.trim_end().ends_with("No introduction needed."));
    }
}
