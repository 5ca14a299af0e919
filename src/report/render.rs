//! Console rendering of a report run: a label per step followed by the
//! payload, one JSON document per line, the way the source dataset's shell
//! session printed them.

use std::fmt::Write as _;

use super::{Payload, ReportRun};

pub fn render_text(run: &ReportRun) -> String {
    let mut out = String::new();

    for result in &run.results {
        let _ = writeln!(out, "--- {} ({}) ---", result.name, result.kind.as_str());
        match &result.payload {
            Payload::Documents(posts) => {
                if posts.is_empty() {
                    let _ = writeln!(out, "(no documents)");
                }
                for post in posts {
                    let _ = writeln!(out, "{}", json_line(post));
                }
            }
            Payload::InsertedId(id) => {
                let _ = writeln!(out, "inserted_id: {id}");
            }
            Payload::Updated(summary) => {
                let _ = writeln!(
                    out,
                    "matched: {}, modified: {}",
                    summary.matched, summary.modified
                );
            }
            Payload::Deleted { deleted } => {
                let _ = writeln!(out, "deleted: {deleted}");
            }
            Payload::Groups(rows) => {
                if rows.is_empty() {
                    let _ = writeln!(out, "(no groups)");
                }
                for row in rows {
                    let _ = writeln!(out, "{}", json_line(row));
                }
            }
        }
        let _ = writeln!(out);
    }

    for failure in &run.failures {
        let _ = writeln!(out, "!!! {failure}");
    }
    if let Some(failure) = &run.aborted {
        let _ = writeln!(out, "!!! aborted: {failure}");
    }

    out
}

pub fn render_json(run: &ReportRun) -> String {
    serde_json::to_string_pretty(run).unwrap_or_default()
}

fn json_line<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_default()
}
