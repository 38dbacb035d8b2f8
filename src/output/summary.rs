use std::fmt::Write;

use comfy_table::Cell;
use indexmap::IndexMap;

use crate::report::{
    DeploymentRecord, LeadTimeReport, COMMIT_TO_PROD, PR_FIRST_COMMIT_TO_PROD, PR_MERGED_TO_PROD,
};

use super::styling::{banded, bright, bright_yellow, cyan, dim, Band};
use super::tables::{create_table, format_hours, header, lead_time_cell};

const SLOWEST_SHOWN: usize = 5;

/// Distribution of one metric across all records, in hours.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSummary {
    pub key: String,
    pub samples: usize,
    pub p50: f64,
    pub p95: f64,
    pub p99: f64,
}

/// Nearest-rank style percentiles over sorted values, index `len * p / 100`
/// clamped to the last element.
fn percentiles(values: &[f64]) -> (f64, f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0, 0.0);
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let last = sorted.len() - 1;
    let at = |p: usize| sorted[(sorted.len() * p / 100).min(last)];

    (at(50), at(95), at(99))
}

/// Aggregates every metric key, in the order keys first appear.
pub fn summarize(records: &[DeploymentRecord]) -> Vec<MetricSummary> {
    let mut samples: IndexMap<&str, Vec<f64>> = IndexMap::new();
    for record in records {
        for (key, lead_time) in &record.metrics {
            samples.entry(key.as_str()).or_default().push(lead_time.hours);
        }
    }

    samples
        .into_iter()
        .map(|(key, hours)| {
            let (p50, p95, p99) = percentiles(&hours);
            MetricSummary {
                key: key.to_string(),
                samples: hours.len(),
                p50,
                p95,
                p99,
            }
        })
        .collect()
}

fn metric_label(key: &str) -> &str {
    match key {
        COMMIT_TO_PROD => "Commit → Production",
        PR_MERGED_TO_PROD => "PR merged → Production",
        PR_FIRST_COMMIT_TO_PROD => "PR first commit → Production",
        other => other,
    }
}

/// Prints a human-readable lead-time summary to stderr.
///
/// Lead times are coloured green up to a day, yellow up to a week and red
/// beyond.
pub fn print_summary(report: &LeadTimeReport) {
    eprintln!("{}", render_summary(report));
}

fn add_section_header(output: &mut String, emoji: &str, title: &str) {
    let _ = writeln!(output, "{} {}", bright(emoji), bright(title).underlined());
}

fn render_summary(report: &LeadTimeReport) -> String {
    let mut output = String::new();
    let skipped_total: usize = report.skipped.values().sum();

    add_section_header(&mut output, "📊", "Overview");
    let _ = writeln!(
        output,
        "  {} {}\n  {} {}\n  {} {}\n  {} {}\n  {} {}\n  {} {}\n",
        dim("Project:"),
        cyan(&report.project),
        dim("Release definition:"),
        cyan(&report.release_definition),
        dim("Deployments inspected:"),
        bright_yellow(report.total_environments),
        dim("Artifacts measured:"),
        bright_yellow(report.total_records),
        dim("Skipped:"),
        bright_yellow(skipped_total),
        dim("Collected:"),
        dim(report.collected_at.format("%Y-%m-%d %H:%M UTC"))
    );

    if report.records.is_empty() {
        let _ = writeln!(output, "{}", bright_yellow("No deployments measured."));
    } else {
        render_lead_times(&mut output, &report.records);
        render_slowest(&mut output, &report.records);
    }

    if !report.skipped.is_empty() {
        add_section_header(&mut output, "⏭️", "Skipped");
        let mut table = create_table();
        table.set_header(header(&["Reason", "Count"]));
        for (reason, count) in &report.skipped {
            table.add_row(vec![Cell::new(reason), Cell::new(count)]);
        }
        let _ = writeln!(output, "{table}\n");
    }

    output
}

fn render_lead_times(output: &mut String, records: &[DeploymentRecord]) {
    let summaries = summarize(records);

    if let Some(median) = summaries
        .iter()
        .find(|summary| summary.key == COMMIT_TO_PROD)
        .map(|summary| summary.p50)
    {
        let _ = writeln!(
            output,
            "  {} {}\n",
            dim("Median commit to production:"),
            banded(format_hours(median), Band::of_hours(median))
        );
    }

    add_section_header(output, "⏱️", "Lead Time");
    let mut table = create_table();
    table.set_header(header(&["Metric", "Samples", "P50", "P95", "P99"]));
    for summary in &summaries {
        table.add_row(vec![
            Cell::new(metric_label(&summary.key)),
            Cell::new(summary.samples),
            lead_time_cell(summary.p50),
            lead_time_cell(summary.p95),
            lead_time_cell(summary.p99),
        ]);
    }
    let _ = writeln!(output, "{table}\n");
}

fn render_slowest(output: &mut String, records: &[DeploymentRecord]) {
    let mut measured: Vec<(&DeploymentRecord, f64)> = records
        .iter()
        .filter_map(|record| {
            record
                .metrics
                .get(COMMIT_TO_PROD)
                .map(|lead_time| (record, lead_time.hours))
        })
        .collect();
    measured.sort_by(|a, b| b.1.total_cmp(&a.1));

    add_section_header(
        output,
        "🐌",
        &format!("Top {SLOWEST_SHOWN} Slowest Deployments"),
    );
    let mut table = create_table();
    table.set_header(header(&[
        "#",
        "Release",
        "Environment",
        "Repository",
        "Commit → Prod",
        "Link",
    ]));
    for (idx, (record, hours)) in measured.iter().take(SLOWEST_SHOWN).enumerate() {
        table.add_row(vec![
            Cell::new(idx + 1),
            Cell::new(&record.release.name),
            Cell::new(&record.environment.name),
            Cell::new(&record.repository.name),
            lead_time_cell(*hours),
            Cell::new(&record.release.url),
        ]);
    }
    let _ = writeln!(output, "{table}\n");
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::metrics::LeadTime;
    use crate::providers::EnvironmentStatus;
    use crate::report::{
        ArtifactInfo, BranchInfo, EnvironmentInfo, ProjectInfo, ReleaseInfo, RepositoryInfo,
    };

    fn lead_time(hours: f64) -> LeadTime {
        #[allow(clippy::cast_possible_truncation)]
        let seconds = (hours * 3600.0) as i64;
        LeadTime {
            seconds,
            minutes: hours * 60.0,
            hours,
        }
    }

    fn record(release: &str, metrics: &[(&str, f64)]) -> DeploymentRecord {
        DeploymentRecord {
            collected_at: Utc::now(),
            project: ProjectInfo {
                id: "p-1".to_string(),
                name: "One".to_string(),
            },
            release: ReleaseInfo {
                id: 1,
                name: release.to_string(),
                status: "active".to_string(),
                created_on: None,
                modified_on: None,
                url: format!("https://dev.azure.com/contoso/One/_releaseProgress?release={release}"),
            },
            environment: EnvironmentInfo {
                id: 10,
                name: "PRD".to_string(),
                status: EnvironmentStatus::Succeeded,
                started_at: "2021-01-01T00:00:00Z".to_string(),
                deployed_at: "2021-01-01T01:00:00Z".to_string(),
                definition_environment_id: None,
            },
            repository: RepositoryInfo {
                id: "repo-id".to_string(),
                name: "app".to_string(),
            },
            branch: BranchInfo {
                id: "refs/heads/main".to_string(),
                name: "refs/heads/main".to_string(),
            },
            artifact: ArtifactInfo {
                alias: "_app".to_string(),
                definition_id: "3".to_string(),
                definition_name: "app-ci".to_string(),
                build_id: 4,
                build_url: String::new(),
                commit_id: "c1".to_string(),
                commit_date: "2021-01-01T00:00:00Z".to_string(),
            },
            pull_request: None,
            metrics: metrics
                .iter()
                .map(|(key, hours)| ((*key).to_string(), lead_time(*hours)))
                .collect(),
        }
    }

    fn report(records: Vec<DeploymentRecord>) -> LeadTimeReport {
        LeadTimeReport {
            provider: "Azure DevOps".to_string(),
            project: "One".to_string(),
            release_definition: "App-CD".to_string(),
            collected_at: Utc::now(),
            total_environments: records.len(),
            total_records: records.len(),
            skipped: IndexMap::new(),
            records,
        }
    }

    #[test]
    fn test_percentiles_empty() {
        assert_eq!(percentiles(&[]), (0.0, 0.0, 0.0));
    }

    #[test]
    fn test_percentiles_single_value() {
        assert_eq!(percentiles(&[3.5]), (3.5, 3.5, 3.5));
    }

    #[test]
    fn test_percentiles_unsorted_input() {
        let values: Vec<f64> = (1..=20).rev().map(f64::from).collect();
        assert_eq!(percentiles(&values), (11.0, 20.0, 20.0));
    }

    #[test]
    fn test_summarize_keeps_first_seen_key_order() {
        let records = vec![
            record("Release-1", &[(COMMIT_TO_PROD, 1.0)]),
            record(
                "Release-2",
                &[
                    (COMMIT_TO_PROD, 3.0),
                    (PR_MERGED_TO_PROD, 0.5),
                    (PR_FIRST_COMMIT_TO_PROD, 48.0),
                ],
            ),
        ];

        let summaries = summarize(&records);

        let keys: Vec<_> = summaries.iter().map(|s| s.key.as_str()).collect();
        assert_eq!(
            keys,
            vec![COMMIT_TO_PROD, PR_MERGED_TO_PROD, PR_FIRST_COMMIT_TO_PROD]
        );
        assert_eq!(summaries[0].samples, 2);
        assert_eq!(summaries[0].p50, 3.0);
        assert_eq!(summaries[1].samples, 1);
    }

    #[test]
    fn test_render_summary_without_records() {
        let mut report = report(vec![]);
        let _ = report.skipped.insert("no_pull_request".to_string(), 3);

        let output = render_summary(&report);

        assert!(output.contains("One"));
        assert!(output.contains("App-CD"));
        assert!(output.contains("No deployments measured"));
        assert!(output.contains("no_pull_request"));
        assert!(!output.contains("Lead Time"));
    }

    #[test]
    fn test_skipped_total_covers_release_and_artifact_skips() {
        let mut report = report(vec![]);
        let _ = report
            .skipped
            .insert("release_artifacts_unavailable".to_string(), 2);
        let _ = report.skipped.insert("no_pull_request".to_string(), 3);

        let output = render_summary(&report);

        assert!(!output.contains("Artifacts skipped"));
        let line = output
            .lines()
            .find(|line| line.contains("Skipped:"))
            .unwrap();
        assert!(line.contains('5'));
    }

    #[test]
    fn test_render_summary_with_records() {
        let report = report(vec![
            record("Release-1", &[(COMMIT_TO_PROD, 2.0), (PR_FIRST_COMMIT_TO_PROD, 30.0)]),
            record("Release-2", &[(COMMIT_TO_PROD, 200.0)]),
        ]);

        let output = render_summary(&report);

        assert!(output.contains("Lead Time"));
        assert!(output.contains("Commit → Production"));
        assert!(output.contains("PR first commit → Production"));
        assert!(output.contains("200.0h"));
        assert!(output.contains("Slowest Deployments"));
        assert!(output.contains("Release-2"));
        assert!(!output.contains("Reason"));
    }

    #[test]
    fn test_slowest_table_is_capped() {
        let records: Vec<_> = (0..8)
            .map(|i| record(&format!("R{i}"), &[(COMMIT_TO_PROD, f64::from(i))]))
            .collect();

        let mut output = String::new();
        render_slowest(&mut output, &records);

        assert!(output.contains("R7"));
        assert!(output.contains("R3"));
        assert!(!output.contains("R2"));
    }
}
