//! Report generation for analysis runs.

use serde::Serialize;

use crate::alignment::AlignmentBand;
use crate::history::prompt_hash;
use crate::scoring::{Dimension, Score, ScoreSet};
use crate::session::{Analysis, Session};

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub prompt_hash: Option<String>,
    pub evaluation_count: usize,
    pub overall: f64,
    pub band: AlignmentBand,
    pub dimensions: Vec<ReportDimension>,
    pub best: Dimension,
    pub worst: Dimension,
    pub misaligned: Vec<ReportReview>,
    pub history_entry: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportDimension {
    pub dimension: Dimension,
    pub alignment: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportReview {
    pub review_id: String,
    pub text: String,
    pub stars: u8,
    pub overall: f64,
    pub human: ScoreSet,
    /// Absent when the session hides machine scores.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub machine: Option<ScoreSet>,
}

pub fn build_report(analysis: &Analysis, session: &Session) -> AnalysisReport {
    let aggregate = &analysis.aggregate;
    let prompt = session.prompt();

    let misaligned = analysis
        .misaligned
        .iter()
        .filter_map(|id| session.store().get(id))
        .map(|evaluation| ReportReview {
            review_id: evaluation.id().to_string(),
            text: evaluation.review().text.clone(),
            stars: evaluation.review().stars,
            overall: evaluation.overall(),
            human: *evaluation.human(),
            machine: (!session.hide_machine_scores()).then(|| *evaluation.machine()),
        })
        .collect();

    AnalysisReport {
        prompt_hash: (!prompt.trim().is_empty()).then(|| prompt_hash(prompt)),
        evaluation_count: aggregate.evaluation_count,
        overall: aggregate.overall,
        band: analysis.band(),
        dimensions: aggregate
            .per_dimension
            .iter()
            .map(|(dimension, alignment)| ReportDimension {
                dimension,
                alignment,
            })
            .collect(),
        best: aggregate.best,
        worst: aggregate.worst,
        misaligned,
        history_entry: analysis.recorded.map(|id| id.to_string()),
    }
}

pub fn render_report_markdown(report: &AnalysisReport) -> String {
    let mut out = String::new();
    out.push_str("# Alignment Report\n\n");
    if report.evaluation_count == 0 {
        out.push_str("No evaluations yet. Load reviews and score them first.\n");
        return out;
    }

    out.push_str(&format!("- Evaluations: {}\n", report.evaluation_count));
    out.push_str(&format!(
        "- Overall alignment: {:.1}% ({})\n",
        report.overall * 100.0,
        report.band.as_str()
    ));
    out.push_str(&format!("- Best dimension: {}\n", report.best.label()));
    out.push_str(&format!("- Worst dimension: {}\n", report.worst.label()));
    if let Some(hash) = &report.prompt_hash {
        out.push_str(&format!("- Prompt hash: `{}`\n", &hash[..12.min(hash.len())]));
    }
    if let Some(entry) = &report.history_entry {
        out.push_str(&format!("- History entry: {entry}\n"));
    }
    out.push_str(&format!("\n{}\n", report.band.summary()));

    out.push_str("\n## Dimensions\n\n");
    out.push_str("| Dimension | Alignment | Band |\n|---|---|---|\n");
    for d in &report.dimensions {
        out.push_str(&format!(
            "| {} | {:.1}% | {} |\n",
            d.dimension.label(),
            d.alignment * 100.0,
            AlignmentBand::from_value(d.alignment).as_str()
        ));
    }

    if !report.misaligned.is_empty() {
        out.push_str("\n## Most Misaligned Reviews\n\n");
        for review in &report.misaligned {
            out.push_str(&format!(
                "### {} ({} stars, {:.1}% aligned)\n\n> {}\n\n",
                review.review_id,
                review.stars,
                review.overall * 100.0,
                review.text.replace('\n', "\n> ")
            ));
            out.push_str(&format!("- Human: {}\n", score_line(&review.human)));
            if let Some(machine) = &review.machine {
                out.push_str(&format!("- LLM: {}\n", score_line(machine)));
            }
            out.push('\n');
        }
    }

    out
}

pub fn render_analysis_markdown(analysis: &Analysis, session: &Session) -> String {
    render_report_markdown(&build_report(analysis, session))
}

fn score_line(scores: &ScoreSet) -> String {
    scores
        .iter()
        .map(|(d, s): (Dimension, Score)| format!("{} {s}", d.as_str()))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::Review;

    fn session_with_gap() -> Session {
        let mut session = Session::new();
        session
            .load_reviews(vec![
                Review::new("ok", "Works", 4),
                Review::new("off", "Pretty but slow", 2),
            ])
            .unwrap();
        session.set_prompt("Rate it.").unwrap();
        session
            .set_human_score("off", Dimension::Efficiency, -3)
            .unwrap();
        session
    }

    #[test]
    fn markdown_includes_band_table_and_outliers() {
        let mut session = session_with_gap();
        let analysis = session.analyze();
        let markdown = render_analysis_markdown(&analysis, &session);

        assert!(markdown.contains("# Alignment Report"));
        assert!(markdown.contains("| Efficiency |"));
        assert!(markdown.contains("Worst dimension: Efficiency"));
        assert!(markdown.contains("### off"));
        assert!(markdown.contains("- LLM: "));
        assert!(markdown.contains("Excellent alignment"));
    }

    #[test]
    fn hidden_machine_scores_are_left_out() {
        let mut session = session_with_gap();
        session.toggle_hide_machine_scores();
        let analysis = session.analyze();
        let report = build_report(&analysis, &session);
        assert!(report.misaligned.iter().all(|r| r.machine.is_none()));
        assert!(!render_report_markdown(&report).contains("- LLM: "));
    }

    #[test]
    fn empty_session_renders_placeholder() {
        let mut session = Session::new();
        let analysis = session.analyze();
        let markdown = render_analysis_markdown(&analysis, &session);
        assert!(markdown.contains("No evaluations yet"));
    }
}
