//! Rendering helpers (markdown) for build results.

use srcplan_domain::OutcomeLedger;
use srcplan_types::outcome::{BuildFailure, BuildResult, DocsResult, TestsResult};
use tracing::debug;

pub fn render_results_md(ledger: &OutcomeLedger) -> String {
    let summary = ledger.summary();
    let mut out = String::new();
    out.push_str("# srcplan results\n\n");
    out.push_str(&format!(
        "- Packages: {}\n- Succeeded: {} (installed {})\n- Failed: {}\n",
        summary.total,
        summary.succeeded,
        summary.installed,
        summary.failed()
    ));
    if summary.docs_failed > 0 {
        out.push_str(&format!("- Docs failed: {}\n", summary.docs_failed));
    }
    for (stage, count) in &summary.failed_by_stage {
        out.push_str(&format!("  - {}: {}\n", stage, count));
    }
    out.push('\n');

    out.push_str("## Packages\n\n");
    if ledger.is_empty() {
        out.push_str("_No results._\n");
        return out;
    }

    out.push_str("| Package | Outcome | Docs | Tests | Cause |\n");
    out.push_str("|---|---|---|---|---|\n");
    for (pkg, result) in ledger.iter() {
        out.push_str(&format!(
            "| `{}` | {} | {} | {} | {} |\n",
            pkg,
            outcome_label(result),
            result.as_ref().map(|s| docs_label(s.docs)).unwrap_or("-"),
            result.as_ref().map(|s| tests_label(s.tests)).unwrap_or("-"),
            cell(&cause_text(result)),
        ));
    }

    debug!(rows = ledger.len(), "rendered results table");
    out
}

fn outcome_label(result: &BuildResult) -> &'static str {
    match result {
        Ok(success) if success.installed.is_some() => "installed",
        Ok(_) => "built",
        Err(BuildFailure::PlanningFailed) => "planning failed",
        Err(BuildFailure::DependentFailed(_)) => "skipped",
        Err(BuildFailure::DownloadFailed(_)) => "download failed",
        Err(BuildFailure::UnpackFailed(_)) => "unpack failed",
        Err(BuildFailure::ConfigureFailed(_)) => "configure failed",
        Err(BuildFailure::BuildFailed(_)) => "build failed",
        Err(BuildFailure::TestsFailed(_)) => "tests failed",
        Err(BuildFailure::InstallFailed(_)) => "install failed",
    }
}

fn docs_label(d: DocsResult) -> &'static str {
    match d {
        DocsResult::NotTried => "not tried",
        DocsResult::Failed => "failed",
        DocsResult::Ok => "ok",
    }
}

fn tests_label(t: TestsResult) -> &'static str {
    match t {
        TestsResult::NotTried => "not tried",
        TestsResult::Ok => "ok",
    }
}

fn cause_text(result: &BuildResult) -> String {
    match result {
        Ok(_) => "-".to_string(),
        Err(BuildFailure::DependentFailed(dep)) => format!("dependency `{}` failed", dep),
        Err(failure) => failure
            .cause()
            .map(|c| c.render())
            .unwrap_or_else(|| "-".to_string()),
    }
}

/// Keeps arbitrary text inside a single table cell.
fn cell(text: &str) -> String {
    text.replace('|', "\\|").replace(['\r', '\n'], " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use srcplan_types::configured::InstalledPackageInfo;
    use srcplan_types::identity::{InstalledComponentId, PackageId};
    use srcplan_types::outcome::{BuildSuccess, CauseKind, FailureCause};

    fn pid(s: &str) -> PackageId {
        s.parse().unwrap()
    }

    #[test]
    fn empty_ledger_says_so() {
        let md = render_results_md(&OutcomeLedger::new());
        assert!(md.contains("- Packages: 0\n"));
        assert!(md.contains("_No results._"));
    }

    #[test]
    fn one_row_per_package_in_id_order() {
        let mut ledger = OutcomeLedger::new();
        ledger
            .record(
                pid("base-4.0"),
                Ok(BuildSuccess::new(
                    DocsResult::Failed,
                    TestsResult::Ok,
                    Some(InstalledPackageInfo {
                        id: InstalledComponentId::new("base-4.0-inplace").unwrap(),
                        source_id: pid("base-4.0"),
                        depends: vec![],
                    }),
                )),
            )
            .unwrap();
        let mut cause = FailureCause::new(CauseKind::Process, "setup build | exit 1");
        cause.chain.push("linker error".to_string());
        ledger
            .record(pid("app-1.0"), Err(BuildFailure::BuildFailed(cause)))
            .unwrap();
        ledger
            .record(pid("cli-0.2"), Err(BuildFailure::DependentFailed(pid("app-1.0"))))
            .unwrap();

        let md = render_results_md(&ledger);
        let rows: Vec<&str> = md.lines().filter(|l| l.starts_with("| `")).collect();
        assert_eq!(
            rows,
            vec![
                "| `app-1.0` | build failed | - | - | setup build \\| exit 1: linker error |",
                "| `base-4.0` | installed | failed | ok | - |",
                "| `cli-0.2` | skipped | - | - | dependency `app-1.0` failed |",
            ]
        );
        assert!(md.contains("- Failed: 2\n"));
        assert!(md.contains("- Docs failed: 1\n"));
        assert!(md.contains("  - build: 1\n"));
        assert!(md.contains("  - dependencies: 1\n"));
    }
}
