//! Text rendering of evaluation results.
//!
//! Everything here writes already computed values; nothing is recomputed.

use crate::core::error::Result;
use crate::core::types::ClassId;
use crate::cross_validation::AggregateReport;
use crate::metrics::ConfusionMatrix;

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::io::Write;

const SHADES: [char; 5] = [' ', '░', '▒', '▓', '█'];

/// Write the scalar metrics, the per-label F1 lines and a confusion matrix
/// heatmap to `out`.
pub fn print_results<W: Write>(
    out: &mut W,
    accuracy: f64,
    f1_macro: f64,
    f1_by_label: &BTreeMap<ClassId, f64>,
    confusion_matrix: &ConfusionMatrix,
) -> Result<()> {
    writeln!(out, "Accuracy: {:.3}", accuracy)?;
    writeln!(out, "F1 Macro: {:.3}", f1_macro)?;
    writeln!(out, "F1 scores:")?;
    for (label, f1) in f1_by_label {
        writeln!(out, "\tLabel {}: {:.3}", label, f1)?;
    }
    writeln!(out)?;
    out.write_all(render_heatmap(confusion_matrix).as_bytes())?;
    Ok(())
}

/// Annotated text heatmap, rows are actual classes and columns predicted ones.
pub fn render_heatmap(confusion_matrix: &ConfusionMatrix) -> String {
    let labels = confusion_matrix.classes().labels();
    let matrix = confusion_matrix.matrix();
    let max = matrix.iter().copied().fold(0.0_f64, f64::max);

    let cell = |v: f64| {
        if confusion_matrix.is_normalized() {
            format!("{:.2}", v)
        } else {
            format!("{}", v)
        }
    };
    let label_width = labels
        .iter()
        .map(|l| l.to_string().len())
        .max()
        .unwrap_or(1)
        .max("Actual".len());
    let cell_width = matrix
        .iter()
        .map(|&v| cell(v).len())
        .chain(labels.iter().map(|l| l.to_string().len()))
        .max()
        .unwrap_or(1)
        + 2;

    let mut text = String::new();
    let _ = writeln!(text, "Confusion Matrix");
    let _ = writeln!(text, "{:>w$} Prediction", "", w = label_width);
    let _ = write!(text, "{:<w$}", "Actual", w = label_width);
    for label in labels {
        let _ = write!(text, " {:>w$}", label, w = cell_width);
    }
    let _ = writeln!(text);

    for (i, label) in labels.iter().enumerate() {
        let _ = write!(text, "{:<w$}", label, w = label_width);
        for j in 0..labels.len() {
            let v = matrix[[i, j]];
            let _ = write!(text, " {}{:>w$}", shade(v, max), cell(v), w = cell_width - 1);
        }
        let _ = writeln!(text);
    }
    text
}

fn shade(value: f64, max: f64) -> char {
    if max <= 0.0 || value <= 0.0 {
        return SHADES[0];
    }
    let level = ((value / max) * (SHADES.len() - 1) as f64).ceil() as usize;
    SHADES[level.min(SHADES.len() - 1)]
}

impl AggregateReport {
    /// Multi-line report: the scalar metrics, the heatmap and, after a
    /// threshold sweep, the best threshold per class.
    pub fn summary(&self) -> String {
        let mut buffer = Vec::new();
        // writing into a Vec cannot fail
        let _ = print_results(
            &mut buffer,
            self.accuracy,
            self.f1_macro,
            &self.f1_by_label,
            &self.confusion_matrix,
        );
        let mut text = String::from_utf8_lossy(&buffer).into_owned();

        let best = self.best_thresholds();
        if !best.is_empty() {
            let _ = writeln!(text, "\nBest thresholds:");
            for (label, choice) in best {
                let _ = writeln!(
                    text,
                    "\tLabel {}: t = {:.2} (F1 {:.3})",
                    label, choice.threshold, choice.f1
                );
            }
        }
        let _ = writeln!(
            text,
            "\nConfiguration {} over {} folds",
            self.best_index,
            self.num_folds()
        );
        if !self.skipped_folds.is_empty() {
            let _ = writeln!(text, "Skipped empty folds: {:?}", self.skipped_folds);
        }
        text
    }

    /// Pretty-printed JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
