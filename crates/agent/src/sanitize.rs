/// Strip a single markdown code fence (optionally tagged `json`) wrapped
/// around model output, returning text suitable for strict JSON parsing.
///
/// Inner content is never altered, only the outermost fence and surrounding
/// whitespace are removed; unfenced input passes through unchanged, so the
/// function is idempotent. Parsing the result is the caller's problem.
pub fn strip_code_fence(raw: &str) -> &str {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```json") {
        text = rest;
    } else if let Some(rest) = text.strip_prefix("```") {
        text = rest;
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest;
    }
    text.trim()
}

#[cfg(test)]
mod tests {
    use super::strip_code_fence;

    #[test]
    fn removes_json_tagged_fence() {
        let wrapped = "```json\n{\"status\": \"intake_complete\"}\n```";
        assert_eq!(strip_code_fence(wrapped), "{\"status\": \"intake_complete\"}");
    }

    #[test]
    fn removes_untagged_fence() {
        let wrapped = "```\n{\"a\": 1}\n```";
        assert_eq!(strip_code_fence(wrapped), "{\"a\": 1}");
    }

    #[test]
    fn leaves_unfenced_text_unchanged() {
        assert_eq!(strip_code_fence("{\"a\": 1}"), "{\"a\": 1}");
    }

    #[test]
    fn is_idempotent_under_double_application() {
        let wrapped = "```json\n{\"a\": 1}\n```";
        let once = strip_code_fence(wrapped);
        assert_eq!(strip_code_fence(once), once);
    }

    #[test]
    fn preserves_inner_backtick_runs() {
        let wrapped = "```json\n{\"note\": \"use ``` sparingly\"}\n```";
        assert_eq!(strip_code_fence(wrapped), "{\"note\": \"use ``` sparingly\"}");
    }

    #[test]
    fn trims_plain_whitespace() {
        assert_eq!(strip_code_fence("  {\"a\": 1}  \n"), "{\"a\": 1}");
    }
}
