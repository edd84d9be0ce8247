use std::fmt::Write;

use parrot_compare::ranker::{compare_links, percentage};
use parrot_compare::Ranked;
use parrot_core::{BranchComparison, FileOverlap, OutputFormat, ParrotError, RepoCoordinates};
use serde::Serialize;

/// Ranked results for one repository.
pub struct Section<'a> {
    pub coords: RepoCoordinates,
    pub ranked: &'a Ranked,
}

/// A cross-author comparison above the alert threshold.
pub struct Alarm<'a> {
    pub coords: RepoCoordinates,
    pub comparison: &'a BranchComparison,
}

/// Everything a command prints.
#[derive(Default)]
pub struct Report<'a> {
    pub sections: Vec<Section<'a>>,
    /// `None` for commands that do not raise alarms.
    pub alarms: Option<Vec<Alarm<'a>>>,
}

/// Rendering settings shared by all formats.
pub struct RenderOptions<'a> {
    pub host: &'a str,
    pub baseline: &'a str,
    /// Most similar comparisons shown per repository, `0` for all.
    pub top: usize,
    pub use_color: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ComparisonOutput<'a> {
    base: &'a str,
    comparison: &'a str,
    total_overlap: u64,
    total_additions: u64,
    ratio: f64,
    similarity: String,
    is_solo: bool,
    links: [String; 2],
    files: &'a [FileOverlap],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RepoOutput<'a> {
    repo: String,
    total: usize,
    comparisons: Vec<ComparisonOutput<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReportOutput<'a> {
    baseline: &'a str,
    repos: Vec<RepoOutput<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    alarms: Option<Vec<AlarmOutput<'a>>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AlarmOutput<'a> {
    repo: String,
    #[serde(flatten)]
    comparison: ComparisonOutput<'a>,
}

/// Render `report` in `format`.
pub fn render(
    report: &Report<'_>,
    opts: &RenderOptions<'_>,
    format: OutputFormat,
) -> Result<String, ParrotError> {
    match format {
        OutputFormat::Text => Ok(format_text(report, opts)),
        OutputFormat::Markdown => Ok(format_markdown(report, opts)),
        OutputFormat::Json => format_json(report, opts),
    }
}

/// Human-readable report, most similar pairs last.
pub fn format_text(report: &Report<'_>, opts: &RenderOptions<'_>) -> String {
    let mut out = String::new();
    let multi = report.sections.len() > 1 || report.alarms.is_some();

    for section in &report.sections {
        if multi {
            let _ = writeln!(out, "{}", heading(&section.coords.to_string(), opts.use_color));
        }
        if section.ranked.is_empty() {
            let _ = writeln!(out, "  no comparable branches\n");
            continue;
        }
        for c in section.ranked.top(opts.top) {
            write_text_entry(&mut out, &section.coords, c, opts);
        }
        out.push('\n');
    }

    if let Some(alarms) = &report.alarms {
        let _ = writeln!(out, "{}", heading("Alarms", opts.use_color));
        if alarms.is_empty() {
            let _ = writeln!(out, "  none");
        }
        for alarm in alarms {
            let _ = write!(out, "  [{}] ", alarm.coords.repo);
            write_text_entry(&mut out, &alarm.coords, alarm.comparison, opts);
        }
    }

    out
}

fn write_text_entry(
    out: &mut String,
    coords: &RepoCoordinates,
    c: &BranchComparison,
    opts: &RenderOptions<'_>,
) {
    let line = format!(
        "{} <-> {}: {}/{} :: {}",
        c.base.name,
        c.comparison.name,
        c.total_overlap,
        c.total_additions,
        percentage(c.ratio)
    );
    let solo = if c.is_solo { " (same author)" } else { "" };
    let _ = writeln!(out, "{}{solo}", paint(c.ratio, &line, opts.use_color));
    for link in compare_links(opts.host, coords, opts.baseline, c) {
        let _ = writeln!(out, "    {link}");
    }
}

/// GitHub-flavored Markdown tables, most similar pairs first.
pub fn format_markdown(report: &Report<'_>, opts: &RenderOptions<'_>) -> String {
    let mut out = String::new();
    out.push_str("# Branch overlap\n\n");

    for section in &report.sections {
        let _ = writeln!(out, "## `{}`\n", section.coords);
        if section.ranked.is_empty() {
            out.push_str("_No comparable branches._\n\n");
            continue;
        }
        out.push_str("| Base | Comparison | Overlap | Similarity | Diffs |\n");
        out.push_str("|------|------------|---------|------------|-------|\n");
        for c in section.ranked.top(opts.top).iter().rev() {
            write_markdown_row(&mut out, &section.coords, c, opts);
        }
        out.push('\n');
    }

    if let Some(alarms) = &report.alarms {
        out.push_str("## Alarms\n\n");
        if alarms.is_empty() {
            out.push_str("_None._\n");
        } else {
            out.push_str("| Base | Comparison | Overlap | Similarity | Diffs |\n");
            out.push_str("|------|------------|---------|------------|-------|\n");
            for alarm in alarms {
                write_markdown_row(&mut out, &alarm.coords, alarm.comparison, opts);
            }
        }
    }

    out
}

fn write_markdown_row(
    out: &mut String,
    coords: &RepoCoordinates,
    c: &BranchComparison,
    opts: &RenderOptions<'_>,
) {
    let [base_link, other_link] = compare_links(opts.host, coords, opts.baseline, c);
    let solo = if c.is_solo { " (same author)" } else { "" };
    let _ = writeln!(
        out,
        "| `{}` | `{}`{solo} | {}/{} | {} | [base]({base_link}) [comparison]({other_link}) |",
        c.base.name,
        c.comparison.name,
        c.total_overlap,
        c.total_additions,
        percentage(c.ratio),
    );
}

/// Machine-readable JSON with camelCase keys, most similar pairs first.
///
/// # Errors
///
/// Returns [`ParrotError::Serialization`] if serialization fails.
pub fn format_json(report: &Report<'_>, opts: &RenderOptions<'_>) -> Result<String, ParrotError> {
    let repos = report
        .sections
        .iter()
        .map(|s| RepoOutput {
            repo: s.coords.to_string(),
            total: s.ranked.len(),
            comparisons: s
                .ranked
                .top(opts.top)
                .iter()
                .rev()
                .map(|c| comparison_output(&s.coords, c, opts))
                .collect(),
        })
        .collect();

    let alarms = report.alarms.as_ref().map(|alarms| {
        alarms
            .iter()
            .map(|a| AlarmOutput {
                repo: a.coords.to_string(),
                comparison: comparison_output(&a.coords, a.comparison, opts),
            })
            .collect()
    });

    let output = ReportOutput {
        baseline: opts.baseline,
        repos,
        alarms,
    };
    serde_json::to_string_pretty(&output).map_err(ParrotError::from)
}

fn comparison_output<'a>(
    coords: &RepoCoordinates,
    c: &'a BranchComparison,
    opts: &RenderOptions<'_>,
) -> ComparisonOutput<'a> {
    ComparisonOutput {
        base: &c.base.name,
        comparison: &c.comparison.name,
        total_overlap: c.total_overlap,
        total_additions: c.total_additions,
        ratio: c.ratio,
        similarity: percentage(c.ratio),
        is_solo: c.is_solo,
        links: compare_links(opts.host, coords, opts.baseline, c),
        files: &c.files,
    }
}

fn heading(text: &str, use_color: bool) -> String {
    if use_color {
        format!("\x1b[1m{text}\x1b[0m")
    } else {
        text.to_string()
    }
}

/// Colour a line by how similar the pair is.
fn paint(ratio: f64, text: &str, use_color: bool) -> String {
    if !use_color {
        return text.to_string();
    }
    let code = if ratio > 0.8 {
        "\x1b[1m\x1b[31m"
    } else if ratio > 0.55 {
        "\x1b[31m"
    } else if ratio > 0.4 {
        "\x1b[33m"
    } else if ratio > 0.3 {
        "\x1b[32m"
    } else {
        "\x1b[2m"
    };
    format!("{code}{text}\x1b[0m")
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parrot_compare::rank;
    use parrot_core::BranchDiff;

    use super::*;

    fn comparison(base: &str, other: &str, overlap: u64, additions: u64, is_solo: bool) -> BranchComparison {
        BranchComparison {
            base: Arc::new(BranchDiff::new(base)),
            comparison: Arc::new(BranchDiff::new(other)),
            total_overlap: overlap,
            total_additions: additions,
            ratio: overlap as f64 / additions as f64,
            is_solo,
            files: vec![FileOverlap {
                filename: "file.ts".into(),
                overlap,
                additions,
            }],
        }
    }

    fn opts(top: usize) -> RenderOptions<'static> {
        RenderOptions {
            host: "github.com",
            baseline: "main",
            top,
            use_color: false,
        }
    }

    fn sample() -> Ranked {
        rank(vec![
            comparison("alice", "bob", 2, 3, false),
            comparison("alice", "carol", 1, 10, false),
            comparison("alice", "alice-2", 9, 10, true),
        ])
    }

    fn single(ranked: &Ranked) -> Report<'_> {
        Report {
            sections: vec![Section {
                coords: RepoCoordinates::new("cohort", "todo"),
                ranked,
            }],
            alarms: None,
        }
    }

    #[test]
    fn text_lists_top_with_links() {
        let ranked = sample();
        let text = format_text(&single(&ranked), &opts(2));
        assert!(text.contains("alice <-> bob: 2/3 :: 66.7%"));
        assert!(text.contains("alice <-> alice-2: 9/10 :: 90.0% (same author)"));
        assert!(!text.contains("carol"));
        assert!(text.contains("    https://github.com/cohort/todo/compare/main...bob"));
        assert!(!text.contains("\x1b["));
    }

    #[test]
    fn text_colors_by_ratio() {
        assert!(paint(0.9, "x", true).starts_with("\x1b[1m\x1b[31m"));
        assert!(paint(0.6, "x", true).starts_with("\x1b[31m"));
        assert!(paint(0.45, "x", true).starts_with("\x1b[33m"));
        assert!(paint(0.35, "x", true).starts_with("\x1b[32m"));
        assert!(paint(0.1, "x", true).starts_with("\x1b[2m"));
        assert_eq!(paint(0.9, "x", false), "x");
    }

    #[test]
    fn markdown_has_table_most_similar_first() {
        let ranked = sample();
        let md = format_markdown(&single(&ranked), &opts(0));
        assert!(md.contains("## `cohort/todo`"));
        let first = md.find("alice-2").unwrap();
        let last = md.find("`carol`").unwrap();
        assert!(first < last);
    }

    #[test]
    fn json_is_camel_case_and_descending() {
        let ranked = sample();
        let json = format_json(&single(&ranked), &opts(0)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let repo = &value["repos"][0];
        assert_eq!(repo["repo"], "cohort/todo");
        assert_eq!(repo["total"], 3);
        assert_eq!(repo["comparisons"][0]["comparison"], "alice-2");
        assert_eq!(repo["comparisons"][0]["isSolo"], true);
        assert_eq!(repo["comparisons"][2]["totalOverlap"], 1);
        assert!(value.get("alarms").is_none());
    }

    #[test]
    fn alarms_section_rendered() {
        let ranked = sample();
        let copy = comparison("bob", "carol", 19, 20, false);
        let mut report = single(&ranked);
        report.alarms = Some(vec![Alarm {
            coords: RepoCoordinates::new("cohort", "todo"),
            comparison: &copy,
        }]);

        let text = format_text(&report, &opts(5));
        assert!(text.contains("Alarms"));
        assert!(text.contains("[todo] bob <-> carol: 19/20 :: 95.0%"));

        let json = format_json(&report, &opts(5)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["alarms"][0]["repo"], "cohort/todo");
        assert_eq!(value["alarms"][0]["similarity"], "95.0%");
    }

    #[test]
    fn empty_section_says_so() {
        let ranked = Ranked::default();
        let text = format_text(&single(&ranked), &opts(5));
        assert!(text.contains("no comparable branches"));
    }
}
