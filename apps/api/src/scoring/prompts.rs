// Prompt constants for resume-to-job matching.

/// System prompt for match scoring: enforces JSON-only output.
pub const MATCH_SYSTEM: &str = "You are an expert hiring assistant. \
    Compare a candidate resume with a job description and score the match. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Match prompt template. Replace `{job_description}` and `{resume_text}` before sending.
pub const MATCH_PROMPT_TEMPLATE: &str = r#"Analyze the resume against the job description and provide a detailed match analysis.

JOB DESCRIPTION:
{job_description}

RESUME TEXT:
{resume_text}

SCORING RUBRIC:
- Core required skills have HIGH weight (40-50% of score)
- Nice-to-have skills have MEDIUM weight (20-30% of score)
- Experience alignment matters (20-30% of score)
- Missing critical skills MUST reduce score significantly
- Be CONSERVATIVE and REALISTIC in scoring

Return ONLY valid JSON in this EXACT format (no markdown, no prose, no additional text):
{
  "match_percentage": <number between 0 and 100>,
  "matched_skills": [<array of matched skill strings>],
  "missing_skills": [<array of missing critical skill strings>],
  "bonus_skills": [<array of bonus/nice-to-have skills found>],
  "reasoning": "<2-3 sentence explanation of the match>"
}

JSON:"#;

/// Builds the match prompt. The job description placeholder precedes the resume
/// in the template, so substituting the resume first and then only the first
/// `{job_description}` keeps placeholder-looking text inside a resume intact.
pub fn build_match_prompt(resume_text: &str, job_description: &str) -> String {
    MATCH_PROMPT_TEMPLATE
        .replace("{resume_text}", resume_text)
        .replacen("{job_description}", job_description, 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_embeds_both_texts_and_rubric() {
        let prompt = build_match_prompt("Rust, Tokio, 6 years", "Senior Rust engineer");
        assert!(prompt.contains("JOB DESCRIPTION:\nSenior Rust engineer"));
        assert!(prompt.contains("RESUME TEXT:\nRust, Tokio, 6 years"));
        assert!(prompt.contains("40-50%"));
        assert!(prompt.contains("CONSERVATIVE"));
        assert!(!prompt.contains("{resume_text}"));
        assert!(!prompt.contains("{job_description}"));
    }

    #[test]
    fn test_placeholder_text_inside_resume_is_preserved() {
        let prompt = build_match_prompt("I like {job_description} tokens", "Backend role");
        assert!(prompt.contains("JOB DESCRIPTION:\nBackend role"));
        assert!(prompt.contains("I like {job_description} tokens"));
    }

    #[test]
    fn test_prompt_is_deterministic() {
        assert_eq!(
            build_match_prompt("resume", "job"),
            build_match_prompt("resume", "job")
        );
    }
}
