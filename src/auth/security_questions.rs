/// The only questions a user may pick for password recovery.
pub const SECURITY_QUESTIONS: &[&str] = &[
    "What was the name of your first pet?",
    "What city were you born in?",
    "What is your mother's maiden name?",
    "What was the name of your elementary school?",
    "What was the make of your first car?",
    "What is the name of the street you grew up on?",
];

/// Returns the canonical question text when `question` is one of the fixed set.
pub fn canonical(question: &str) -> Option<&'static str> {
    let question = question.trim();
    SECURITY_QUESTIONS.iter().copied().find(|q| *q == question)
}

/// Answers compare case- and whitespace-insensitively.
pub fn normalize_answer(answer: &str) -> String {
    answer
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
