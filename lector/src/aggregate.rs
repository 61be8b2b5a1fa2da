//! Reduction of raw engine output into the response payload's text and
//! confidence fields.

use crate::models::RecognitionLine;

/// Join line texts with newlines (input order preserved) and average the
/// present confidences, scaled to 0-100 and rounded to one decimal.
///
/// Lines without a confidence contribute text but are excluded from the
/// mean. An empty input yields `("", 0.0)`, as does an input where no line
/// carries a confidence.
pub fn aggregate(lines: &[RecognitionLine]) -> (String, f32) {
    let text = lines
        .iter()
        .map(|line| line.text.as_str())
        .collect::<Vec<_>>()
        .join("\n");

    let confidences: Vec<f32> = lines.iter().filter_map(|line| line.confidence).collect();
    if confidences.is_empty() {
        return (text, 0.0);
    }

    let mean = confidences.iter().sum::<f32>() / confidences.len() as f32;
    let percent = (mean * 100.0 * 10.0).round() / 10.0;

    (text, percent)
}
