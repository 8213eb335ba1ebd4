//! Pure answer-key grading. No I/O: callers load the exam's questions and
//! submitted answers, this module turns them into a scored outcome.

use std::collections::HashMap;

use crate::db::types::QuestionResult;

/// One exam question reduced to what grading needs: its point value and the
/// full set of labels flagged correct, in exam order.
#[derive(Debug, Clone)]
pub(crate) struct AnswerKeyQuestion {
    pub(crate) id: String,
    pub(crate) points: f64,
    pub(crate) correct_options: Vec<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct SubmittedAnswer {
    pub(crate) question_id: String,
    pub(crate) selected_option: String,
}

#[derive(Debug, Clone)]
pub(crate) struct GradingOutcome {
    pub(crate) correct_answers: i32,
    pub(crate) earned_points: f64,
    pub(crate) total_points: f64,
    /// Percentage in [0, 100], unrounded. 0 for a zero-point exam.
    pub(crate) score: f64,
    /// One record per exam question, in exam order. Questions without a
    /// submission appear with selected_option = None and zero points.
    pub(crate) detailed_result: Vec<QuestionResult>,
}

/// Grades a submission against the exam's answer key.
///
/// A selection is correct when its label is a member of the question's full
/// correct-label set (exact, case-sensitive). Answers referencing question
/// ids outside the exam are ignored; if a question id is submitted twice,
/// the first selection wins.
pub(crate) fn grade(
    questions: &[AnswerKeyQuestion],
    answers: &[SubmittedAnswer],
) -> GradingOutcome {
    let mut selected: HashMap<&str, &str> = HashMap::with_capacity(answers.len());
    for answer in answers {
        selected
            .entry(answer.question_id.as_str())
            .or_insert(answer.selected_option.as_str());
    }

    let mut correct_answers = 0;
    let mut earned_points = 0.0;
    let mut total_points = 0.0;
    let mut detailed_result = Vec::with_capacity(questions.len());

    for question in questions {
        total_points += question.points;

        let selection = selected.get(question.id.as_str()).copied();
        let is_correct = selection
            .map(|label| question.correct_options.iter().any(|correct| correct == label))
            .unwrap_or(false);
        let points_awarded = if is_correct { question.points } else { 0.0 };

        if is_correct {
            correct_answers += 1;
            earned_points += points_awarded;
        }

        detailed_result.push(QuestionResult {
            question_id: question.id.clone(),
            selected_option: selection.map(str::to_string),
            correct_options: question.correct_options.clone(),
            is_correct,
            points_awarded,
        });
    }

    let score = if total_points > 0.0 { (earned_points / total_points) * 100.0 } else { 0.0 };

    GradingOutcome { correct_answers, earned_points, total_points, score, detailed_result }
}
