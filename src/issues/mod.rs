//! Tracking issues for positive verdicts.
//!
//! Verdict fields come from the classifier and commit metadata comes from the
//! monitored repository, so none of it is trusted. Inline text is escaped so
//! it cannot inject markdown or ping users, and long text is placed in fenced
//! blocks that its content cannot close.

use anyhow::Result;
use tracing::info;

use patchwatch_common::{CommitRecord, IssueDraft, RepositoryHost, RepositoryIdentity, Verdict};

use crate::config::IssueSettings;
use crate::util::one_line;

const MAX_TITLE_CHARS: usize = 200;
const MAX_TITLE_KIND_CHARS: usize = 80;

pub struct IssueEmitter {
    target: RepositoryIdentity,
    labels: Vec<String>,
}

impl IssueEmitter {
    pub fn new(target: RepositoryIdentity, labels: Vec<String>) -> Self {
        Self { target, labels }
    }

    pub fn from_settings(settings: &IssueSettings) -> Self {
        Self::new(settings.target.clone(), settings.labels.clone())
    }

    pub fn target(&self) -> &RepositoryIdentity {
        &self.target
    }

    pub fn render(
        &self,
        repo: &RepositoryIdentity,
        commit: &CommitRecord,
        verdict: &Verdict,
    ) -> IssueDraft {
        IssueDraft {
            title: render_title(repo, commit, verdict),
            body: render_body(repo, commit, verdict),
            labels: self.labels.clone(),
        }
    }

    /// Create the issue on the target repository and return its URL.
    pub async fn emit(&self, host: &dyn RepositoryHost, draft: &IssueDraft) -> Result<String> {
        let url = host.create_issue(&self.target, draft).await?;
        info!(target = %self.target, url = %url, "Created tracking issue");
        Ok(url)
    }
}

fn render_title(repo: &RepositoryIdentity, commit: &CommitRecord, verdict: &Verdict) -> String {
    let severity = verdict
        .severity
        .map(|s| s.to_string())
        .unwrap_or_else(|| "unrated".to_string());
    let kind: String = verdict
        .vulnerability_type
        .as_deref()
        .unwrap_or("vulnerability")
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();
    let title = format!(
        "[security] {} {} in {}@{}",
        severity,
        one_line(&kind, MAX_TITLE_KIND_CHARS),
        repo,
        commit.short_sha()
    );
    one_line(&title, MAX_TITLE_CHARS)
}

fn render_body(repo: &RepositoryIdentity, commit: &CommitRecord, verdict: &Verdict) -> String {
    let mut body = String::new();
    body.push_str("## Possible silent security fix\n\n");

    body.push_str(&format!("- **Repository:** `{}`\n", repo));
    body.push_str(&format!(
        "- **Commit:** [{}]({})\n",
        commit.short_sha(),
        commit.url
    ));
    body.push_str(&format!("- **Author:** {}\n", escape_inline(&commit.author)));
    body.push_str(&format!(
        "- **Subject:** {}\n",
        escape_inline(&one_line(commit.subject(), 200))
    ));
    if let Some(pr) = &commit.pull_request {
        body.push_str(&format!(
            "- **Pull request:** [#{}]({}) {}\n",
            pr.number,
            pr.url,
            escape_inline(&one_line(&pr.title, 200))
        ));
    }
    if let Some(severity) = verdict.severity {
        body.push_str(&format!("- **Severity:** {}\n", severity));
    }
    for (label, value) in [
        ("Type", &verdict.vulnerability_type),
        ("CWE", &verdict.cwe_id),
        ("Attack vector", &verdict.attack_vector),
        ("Affected component", &verdict.affected_component),
    ] {
        if let Some(value) = value {
            body.push_str(&format!("- **{}:** {}\n", label, escape_inline(value)));
        }
    }

    for (heading, value) in [
        ("Description", &verdict.description),
        ("Evidence", &verdict.evidence),
        ("Proof of concept", &verdict.proof_of_concept),
    ] {
        if let Some(value) = value {
            body.push_str(&format!("\n### {}\n\n{}\n", heading, fenced(value)));
        }
    }

    body.push_str(
        "\n---\n_Automated classification. The finding has not been verified; triage before acting._\n",
    );
    body
}

/// Escape markdown metacharacters and neutralize `@` mentions.
pub fn escape_inline(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' | '`' | '*' | '_' | '{' | '}' | '[' | ']' | '(' | ')' | '<' | '>' | '#' | '+'
            | '|' | '!' | '~' => {
                out.push('\\');
                out.push(c);
            }
            // A zero-width joiner after `@` keeps the text readable but stops
            // GitHub from resolving a mention.
            '@' => out.push_str("@\u{200D}"),
            '\n' | '\r' => out.push(' '),
            c if c.is_control() => {}
            c => out.push(c),
        }
    }
    out
}

/// Wrap `text` in a fence longer than any backtick run it contains.
pub fn fenced(text: &str) -> String {
    let mut longest = 0usize;
    let mut run = 0usize;
    for c in text.chars() {
        if c == '`' {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 0;
        }
    }
    let fence = "`".repeat(longest.max(2) + 1);
    format!("{fence}text\n{}\n{fence}", text.trim_end())
}
