use std::fmt::Write;

use crate::utils::time::format_hours;

use super::aggregate::TaskSummary;

/// Renders the aggregate summary as CSV with a `task,days,hours,seconds`
/// header. Task names are always quoted, inner quotes doubled per RFC 4180.
/// Pure function over the summary, callers decide where the bytes go.
pub fn aggregate_csv(summaries: &[TaskSummary]) -> String {
    let mut out = String::from("task,days,hours,seconds\n");
    for summary in summaries {
        writeln!(
            out,
            "\"{}\",{},{},{}",
            summary.name.replace('"', "\"\""),
            summary.days(),
            format_hours(summary.total_seconds),
            summary.total_seconds,
        )
        .expect("writing to a string can't fail");
    }
    out
}
