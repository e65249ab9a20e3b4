//! Changed files of one commit, classified by what they wire into the application.

use super::error::{internal_error, invalid_request};
use crate::tools::context_doc::ContextDocBuilder;
use crate::tools::dispatch::{ScoutService, ToolOutcome, ToolOutput};
use crate::tools::schemas::analyze_diff::{AnalyzeDiffRequest, AnalyzeDiffResult, ChangedFile};
use scout_protocol::ErrorEnvelope;
use std::path::Path;
use tokio::process::Command;

const DEFAULT_COMMIT: &str = "HEAD";
const MAX_REV_LEN: usize = 128;

fn validate_rev(rev: Option<&str>) -> Result<&str, ErrorEnvelope> {
    let rev = match rev.map(str::trim) {
        Some(rev) if !rev.is_empty() => rev,
        _ => return Ok(DEFAULT_COMMIT),
    };
    let safe = rev.len() <= MAX_REV_LEN
        && !rev.starts_with('-')
        && rev.chars().all(|c| {
            c.is_ascii_alphanumeric() || matches!(c, '~' | '^' | '.' | '_' | '/' | '-' | '@')
        });
    if safe {
        Ok(rev)
    } else {
        Err(invalid_request(format!("Not a valid commit reference: `{rev}`")))
    }
}

async fn name_status(root: &Path, rev: &str) -> Result<String, ErrorEnvelope> {
    let output = Command::new("git")
        .arg("-C")
        .arg(root)
        .args(["diff-tree", "--no-commit-id", "--name-status", "-r", "--root", rev])
        .output()
        .await
        .map_err(|err| {
            internal_error(format!("failed to run git ({err})"))
                .with_hint("analyze_diff needs git on PATH")
        })?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(invalid_request(format!(
            "git diff-tree {rev} failed: {}",
            stderr.trim()
        ))
        .with_hint("Check that SCOUT_ROOT is a git checkout and the commit exists."));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// `M\tpath` and `R100\told\tnew` lines. Renames report the new path.
fn parse_name_status(output: &str) -> Vec<(String, String)> {
    output
        .lines()
        .filter_map(|line| {
            let mut fields = line.split('\t');
            let status = fields.next()?.trim();
            let path = fields.last()?.trim();
            let letter = status.chars().next()?;
            (!path.is_empty()).then(|| (letter.to_string(), path.to_string()))
        })
        .collect()
}

fn classify_change(status: &str, path: &str) -> ChangedFile {
    let normalized = path.replace('\\', "/");
    let file = normalized.rsplit('/').next().unwrap_or(&normalized);
    let (kind, risk) = match file {
        "di.xml" => (
            "di_config",
            Some("DI wiring: plugins and preferences change every consumer of the target type"),
        ),
        "events.xml" => (
            "event_config",
            Some("observer wiring: check every dispatch of the event"),
        ),
        "db_schema.xml" => (
            "db_schema",
            Some("schema change: requires setup:upgrade and may rewrite large tables"),
        ),
        "webapi.xml" => ("api_config", Some("public REST contract: check client compatibility")),
        "routes.xml" => (
            "route_config",
            Some("front name change: existing URLs may stop resolving"),
        ),
        "crontab.xml" => ("cron_config", Some("scheduled job change: runs unattended")),
        "schema.graphqls" => (
            "graphql_schema",
            Some("public GraphQL contract: check client queries"),
        ),
        "module.xml" => ("module_config", Some("module sequence or version change")),
        _ if normalized.contains("/Plugin/") => (
            "plugin",
            Some("interceptor: alters the intercepted method for every caller"),
        ),
        _ if normalized.contains("/Observer/") => ("observer", None),
        _ if normalized.contains("/Controller/") => ("controller", None),
        _ if normalized.contains("/Api/") => (
            "service_contract",
            Some("service contract: public interface, keep it backwards compatible"),
        ),
        _ if normalized.contains("/Setup/") => {
            ("setup", Some("data/schema patch: runs once per install"))
        }
        _ if file.ends_with(".phtml") => ("template", None),
        _ if normalized.contains("/layout/") && file.ends_with(".xml") => ("layout", None),
        _ if normalized.contains("/etc/") && file.ends_with(".xml") => ("config", None),
        _ if file.ends_with(".php") => ("php", None),
        _ => ("other", None),
    };
    let risk = match (status, risk) {
        (_, Some(risk)) => Some(risk.to_string()),
        ("D", None) => Some("removed: check remaining references".to_string()),
        _ => None,
    };
    ChangedFile {
        status: status.to_string(),
        path: path.to_string(),
        kind: kind.to_string(),
        risk,
    }
}

pub(in crate::tools::dispatch) async fn analyze_diff(
    service: &ScoutService,
    request: AnalyzeDiffRequest,
) -> ToolOutcome {
    let rev = validate_rev(request.commit_hash.as_deref())?;
    let output = name_status(&service.state().source_root, rev).await?;
    let files: Vec<ChangedFile> = parse_name_status(&output)
        .iter()
        .map(|(status, path)| classify_change(status, path))
        .collect();

    let mut doc = ContextDocBuilder::new();
    let risky = files.iter().filter(|f| f.risk.is_some()).count();
    doc.push_answer(&format!(
        "{rev}: {} changed file(s), {risky} with risk notes",
        files.len()
    ));
    for file in &files {
        doc.push_line(&format!("R: {} {} [{}]", file.status, file.path, file.kind));
        if let Some(risk) = file.risk.as_deref() {
            doc.push_note(risk);
        }
    }

    let result_paths = files.iter().map(|f| f.path.clone()).collect();
    let payload = AnalyzeDiffResult {
        commit: rev.to_string(),
        files,
    };
    let structured = serde_json::to_value(&payload)
        .map_err(|err| internal_error(format!("failed to serialize diff ({err})")))?;
    Ok(ToolOutput {
        doc,
        structured,
        result_paths,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn rejects_option_like_and_odd_revisions() {
        assert_eq!(validate_rev(None).unwrap(), "HEAD");
        assert_eq!(validate_rev(Some(" ")).unwrap(), "HEAD");
        assert_eq!(validate_rev(Some("a1b2c3d")).unwrap(), "a1b2c3d");
        assert_eq!(validate_rev(Some("HEAD~2")).unwrap(), "HEAD~2");
        assert!(validate_rev(Some("--output=/tmp/x")).is_err());
        assert!(validate_rev(Some("HEAD; rm -rf /")).is_err());
    }

    #[test]
    fn parses_renames_and_plain_changes() {
        let parsed = parse_name_status("M\tapp/etc/di.xml\nR087\told/A.php\tnew/A.php\n\n");
        assert_eq!(
            parsed,
            vec![
                ("M".to_string(), "app/etc/di.xml".to_string()),
                ("R".to_string(), "new/A.php".to_string()),
            ]
        );
    }

    #[test]
    fn classifies_wiring_files_with_risk() {
        let di = classify_change("M", "app/code/V/M/etc/di.xml");
        assert_eq!(di.kind, "di_config");
        assert!(di.risk.is_some());

        let plugin = classify_change("A", "app/code/V/M/Plugin/Quote.php");
        assert_eq!(plugin.kind, "plugin");

        let template = classify_change("M", "app/code/V/M/view/frontend/templates/x.phtml");
        assert_eq!(template.kind, "template");
        assert_eq!(template.risk, None);

        let removed = classify_change("D", "app/code/V/M/Helper/Data.php");
        assert_eq!(removed.kind, "php");
        assert_eq!(removed.risk.as_deref(), Some("removed: check remaining references"));
    }
}
