// Prompt constants and prompt-building utilities for the analysis pipeline.

/// System prompt applied to every analysis call.
pub const ANALYSIS_SYSTEM: &str = "You are a careful, professional document analyst. \
    Give specific, actionable feedback grounded in the content you are shown. \
    Structure your answer with markdown headings and bullet points. \
    Do NOT invent details that are not present in the input.";

/// Default instruction used when the caller uploads a file without
/// supplying their own. Resume review is the primary use case.
pub const RESUME_FEEDBACK_INSTRUCTION: &str = "Review this document as if it were a resume \
    or professional profile. Assess its structure, clarity, and impact. \
    Point out weak or vague phrasing, missing quantification, and formatting issues, \
    and suggest concrete improvements for each.";

/// Builds the instruction for a file analysis: the caller's `instruction`
/// field if present, otherwise the default, with any free-form `prompt`
/// appended as extra context.
pub fn compose_instruction(instruction: Option<&str>, extra_context: Option<&str>) -> String {
    let base = instruction
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(RESUME_FEEDBACK_INSTRUCTION);

    match extra_context.map(str::trim).filter(|s| !s.is_empty()) {
        Some(context) => format!("{base}\n\nAdditional context from the user:\n{context}"),
        None => base.to_string(),
    }
}

/// Embeds a text document inline in the prompt. Used for text-like uploads
/// that are decoded server-side instead of being sent as inline binary data.
pub fn compose_document_prompt(instruction: &str, document_text: &str) -> String {
    format!("{instruction}\n\nDocument content:\n---\n{document_text}\n---")
}
