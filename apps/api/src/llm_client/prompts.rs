// Cross-cutting prompt fragments shared by every LLM call.

/// Keeps the numeric answer where the score parser looks for it.
pub const SCORE_FIRST_INSTRUCTION: &str = "\
    Always start your answer with the integer score alone on the first line. \
    Do NOT write any other number before the score.";
