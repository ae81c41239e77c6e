//! Heuristic answer scorer
//!
//! Scores a free-text answer by keyword overlap with the model answer:
//! - keywords are model-answer tokens longer than 3 characters
//! - a keyword matches if it appears anywhere in the lowercased answer
//! - `marks = round(total * (ratio + 0.2))`, clamped, minus 1 when `ratio < 0.2`
//!
//! Feedback wording depends on the mark tier and on whether the exam type is
//! a formal (strict) one; `WB` papers get a Bengali phrase in front.
//!
//! The function is deterministic, which the response cache relies on.

use crate::models::{Board, ScoringInput, ScoringResult};

/// Characters removed from the model answer before tokenizing.
pub const STRIPPED_PUNCTUATION: &[char] = &[
    '.', ',', '/', '#', '!', '$', '%', '^', '&', '*', ';', ':', '{', '}', '=', '-', '_', '`', '~',
    '(', ')',
];

/// Exam types marked in the examiner (strict) tone. Compared case-insensitively.
pub const STRICT_EXAM_TYPES: &[&str] = &[
    "Annual Exam",
    "First Terminal",
    "Second Terminal",
    "Third Terminal",
];

/// Tokens must be longer than this to count as keywords.
const MIN_KEYWORD_LEN: usize = 3;

/// Answers longer than this earn the no-keyword fallback ratio.
const FALLBACK_MIN_ANSWER_LEN: usize = 10;
const FALLBACK_RATIO: f64 = 0.5;

const LENIENCY_BONUS: f64 = 0.2;
const RELEVANCE_PENALTY_BELOW: f64 = 0.2;

const EXCELLENT_THRESHOLD: f64 = 0.8;
const PARTIAL_THRESHOLD: f64 = 0.5;

pub const NO_ANSWER_FEEDBACK: &str = "No answer provided.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackTier {
    Excellent,
    Partial,
    NeedsImprovement,
}

impl FeedbackTier {
    fn from_fraction(fraction: f64) -> Self {
        if fraction >= EXCELLENT_THRESHOLD {
            FeedbackTier::Excellent
        } else if fraction >= PARTIAL_THRESHOLD {
            FeedbackTier::Partial
        } else {
            FeedbackTier::NeedsImprovement
        }
    }

    fn english(&self, strict: bool) -> &'static str {
        match (self, strict) {
            (FeedbackTier::Excellent, true) => "Correct and precise answer.",
            (FeedbackTier::Excellent, false) => "Excellent work! Concept is clear. Keep it up.",
            (FeedbackTier::Partial, true) => "Incomplete answer. Lacks specific details and logic.",
            (FeedbackTier::Partial, false) => {
                "Good attempt, but the explanation could be more detailed. Focus on key points."
            }
            (FeedbackTier::NeedsImprovement, true) => "Incorrect answer. Irrelevant to the topic.",
            (FeedbackTier::NeedsImprovement, false) => {
                "Needs attention. Please review the basic concepts."
            }
        }
    }

    fn bengali(&self) -> &'static str {
        match self {
            FeedbackTier::Excellent => "খুব ভালো হয়েছে!",
            FeedbackTier::Partial => "উত্তর অসম্পূর্ণ, আরও বিস্তারিত লেখো।",
            FeedbackTier::NeedsImprovement => "আরও মনোযোগ দিতে হবে।",
        }
    }
}

pub fn is_strict_exam(exam_type: &str) -> bool {
    let exam_type = exam_type.trim();
    STRICT_EXAM_TYPES
        .iter()
        .any(|t| t.eq_ignore_ascii_case(exam_type))
}

/// Lowercased model-answer tokens longer than three characters, in order.
/// Repeated words are kept, so they weigh more in the ratio.
pub fn extract_keywords(model_answer: &str) -> Vec<String> {
    let cleaned: String = model_answer
        .to_lowercase()
        .chars()
        .filter(|c| !STRIPPED_PUNCTUATION.contains(c))
        .collect();

    cleaned
        .split_whitespace()
        .filter(|token| token.chars().count() > MIN_KEYWORD_LEN)
        .map(str::to_string)
        .collect()
}

fn match_ratio(student_answer: &str, keywords: &[String]) -> f64 {
    if keywords.is_empty() {
        return if student_answer.chars().count() > FALLBACK_MIN_ANSWER_LEN {
            FALLBACK_RATIO
        } else {
            0.0
        };
    }

    let answer = student_answer.to_lowercase();
    let matched = keywords.iter().filter(|k| answer.contains(k.as_str())).count();
    matched as f64 / keywords.len() as f64
}

fn suggested_marks(total_marks: u32, ratio: f64) -> u32 {
    let raw = (f64::from(total_marks) * (ratio + LENIENCY_BONUS)).round();
    let mut marks = raw.clamp(0.0, f64::from(total_marks)) as u32;
    if ratio < RELEVANCE_PENALTY_BELOW {
        marks = marks.saturating_sub(1);
    }
    marks
}

/// Score one answer. Total over all inputs; an empty answer short-circuits
/// to zero marks.
pub fn score(input: &ScoringInput) -> ScoringResult {
    if input.student_answer.trim().is_empty() {
        return ScoringResult {
            suggested_marks: 0,
            feedback: NO_ANSWER_FEEDBACK.to_string(),
        };
    }

    let keywords = extract_keywords(&input.model_answer);
    let ratio = match_ratio(&input.student_answer, &keywords);
    let marks = suggested_marks(input.total_marks, ratio);

    // a zero-mark paper has no meaningful fraction; treat it as the lowest tier
    let fraction = if input.total_marks == 0 {
        0.0
    } else {
        f64::from(marks) / f64::from(input.total_marks)
    };
    let tier = FeedbackTier::from_fraction(fraction);
    let strict = is_strict_exam(&input.exam_type);

    let english = tier.english(strict);
    let feedback = match input.board {
        Board::Wb => format!("{} {}", tier.bengali(), english),
        Board::Cbse | Board::Custom => english.to_string(),
    };

    tracing::debug!(
        keywords = keywords.len(),
        ratio,
        marks,
        total = input.total_marks,
        strict,
        "Scored answer"
    );

    ScoringResult {
        suggested_marks: marks,
        feedback,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(student: &str, model: &str, total: u32, exam_type: &str, board: Board) -> ScoringInput {
        ScoringInput {
            student_answer: student.to_string(),
            model_answer: model.to_string(),
            total_marks: total,
            exam_type: exam_type.to_string(),
            board,
        }
    }

    fn has_bengali(s: &str) -> bool {
        s.chars().any(|c| ('\u{0980}'..='\u{09FF}').contains(&c))
    }

    #[test]
    fn test_empty_answer_scores_zero() {
        for answer in ["", "   ", "\n\t"] {
            let r = score(&input(answer, "any model", 10, "Class Test", Board::Cbse));
            assert_eq!(r.suggested_marks, 0);
            assert!(r.feedback.to_lowercase().contains("no answer"));
        }
    }

    #[test]
    fn test_extract_keywords_strips_punctuation_and_short_tokens() {
        let kw = extract_keywords("Photosynthesis: plants (green) use sun-light, and CO2!");
        assert_eq!(kw, vec!["photosynthesis", "plants", "green", "sunlight"]);
    }

    #[test]
    fn test_full_match_hits_top_band() {
        let model = "Photosynthesis converts sunlight into chemical energy";
        let student = "photosynthesis converts SUNLIGHT into chemical energy in leaves";
        let r = score(&input(student, model, 10, "Class Test", Board::Cbse));
        // ratio 1.0 + 0.2 bonus clamps to full marks
        assert_eq!(r.suggested_marks, 10);
        assert!((8..=10).contains(&r.suggested_marks));
        assert_eq!(r.feedback, "Excellent work! Concept is clear. Keep it up.");
    }

    #[test]
    fn test_partial_match_rounding() {
        // keywords: gravity, pulls, objects, toward, earth -> 2 of 5 match
        let model = "Gravity pulls objects toward earth";
        let r = score(&input("gravity pulls", model, 10, "", Board::Custom));
        // round(10 * 0.6) = 6
        assert_eq!(r.suggested_marks, 6);
        assert!(r.feedback.starts_with("Good attempt"));
    }

    #[test]
    fn test_relevance_penalty_applies_below_threshold() {
        // 0 of 5 keywords -> round(10 * 0.2) = 2, minus 1
        let model = "Gravity pulls objects toward earth";
        let r = score(&input("I do not know this", model, 10, "", Board::Cbse));
        assert_eq!(r.suggested_marks, 1);
        assert_eq!(r.feedback, "Needs attention. Please review the basic concepts.");
    }

    #[test]
    fn test_penalty_never_goes_below_zero() {
        // round(1 * 0.2) = 0, penalty floors at 0
        let r = score(&input("wrong", "Mitochondria powerhouse", 1, "", Board::Cbse));
        assert_eq!(r.suggested_marks, 0);
    }

    #[test]
    fn test_no_keyword_fallback_uses_answer_length() {
        // model has no token longer than 3 chars
        let long = score(&input("a fairly long answer", "is it so", 10, "", Board::Cbse));
        // 0.5 + 0.2 -> 7
        assert_eq!(long.suggested_marks, 7);

        let short = score(&input("short", "is it so", 10, "", Board::Cbse));
        // 0 + 0.2 -> 2, penalty -> 1
        assert_eq!(short.suggested_marks, 1);
    }

    #[test]
    fn test_strict_tone_for_formal_exams() {
        assert!(is_strict_exam("Annual Exam"));
        assert!(is_strict_exam("  first terminal "));
        assert!(!is_strict_exam("Class Test"));
        assert!(!is_strict_exam("Unit Test"));

        let model = "Gravity pulls objects toward earth";
        let r = score(&input("gravity pulls objects toward earth", model, 5, "Annual Exam", Board::Cbse));
        assert_eq!(r.feedback, "Correct and precise answer.");
    }

    #[test]
    fn test_wb_board_prefixes_bengali() {
        let model = "Gravity pulls objects toward earth";
        let wb = score(&input("gravity pulls", model, 10, "Class Test", Board::Wb));
        let cbse = score(&input("gravity pulls", model, 10, "Class Test", Board::Cbse));
        let custom = score(&input("gravity pulls", model, 10, "Class Test", Board::Custom));

        assert!(has_bengali(&wb.feedback));
        assert!(wb.feedback.ends_with(&cbse.feedback));
        assert!(!has_bengali(&cbse.feedback));
        assert!(!has_bengali(&custom.feedback));
        assert_eq!(wb.suggested_marks, cbse.suggested_marks);
    }

    #[test]
    fn test_zero_total_marks() {
        let r = score(&input("some answer text", "Gravity pulls", 0, "", Board::Wb));
        assert_eq!(r.suggested_marks, 0);
        assert!(has_bengali(&r.feedback));
    }

    #[test]
    fn test_marks_always_within_bounds() {
        let models = ["", "is it", "Gravity pulls objects toward earth", "energy energy energy"];
        let answers = ["x", "energy", "gravity pulls objects", "a long answer with no overlap at all"];
        for total in [0u32, 1, 2, 3, 7, 10, 100] {
            for model in models {
                for answer in answers {
                    let r = score(&input(answer, model, total, "Annual Exam", Board::Wb));
                    assert!(r.suggested_marks <= total, "{} > {}", r.suggested_marks, total);
                }
            }
        }
    }

    #[test]
    fn test_score_is_deterministic() {
        let i = input("plants need sunlight", "Plants need sunlight and water", 4, "First Terminal", Board::Wb);
        assert_eq!(score(&i), score(&i));
    }
}
