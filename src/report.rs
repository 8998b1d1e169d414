//! Termination report (spec §6): a human-readable summary of retired
//! instructions and every predictor's accuracy, grouped by family.

use std::fmt::Write as _;

use crate::engine::Stat;
use crate::predictors::{Accuracy, TABLE_SIZES};

fn format_accuracy(label: &str, accuracy: &Accuracy, out: &mut String) {
    match accuracy.percent() {
        Some(percent) => {
            let _ = writeln!(
                out,
                "  {label:<16} {:>8} branches  {:>7} mispredicted  {percent:6.2}%",
                accuracy.total, accuracy.mispredicted
            );
        }
        None => {
            let _ = writeln!(out, "  {label:<16} no branches retired");
        }
    }
}

/// Render the full termination report as spec §6 describes: retired
/// instruction count, then Never-Taken, BTFNT, Bimodal and gShare, each
/// broken out by table size.
pub fn render(stat: &Stat) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "retired instructions: {}", stat.retired);
    let _ = writeln!(out, "branch prediction accuracy:");

    format_accuracy("never-taken", &stat.predictors.never_taken, &mut out);
    format_accuracy("btfnt", &stat.predictors.btfnt, &mut out);

    let _ = writeln!(out, "  bimodal:");
    for (size, accuracy) in TABLE_SIZES.iter().zip(stat.predictors.bimodal.iter()) {
        format_accuracy(&format!("{size}-entry"), accuracy, &mut out);
    }

    let _ = writeln!(out, "  gshare:");
    for (size, accuracy) in TABLE_SIZES.iter().zip(stat.predictors.gshare.iter()) {
        format_accuracy(&format!("{size}-entry"), accuracy, &mut out);
    }

    out
}
