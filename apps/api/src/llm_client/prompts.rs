// Shared prompt constants and prompt-building utilities.
// Each feature module that needs LLM calls defines its own prompts.rs alongside it.
// This file contains cross-cutting prompt fragments.

/// System instruction that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You are a precise, structured assistant. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON value. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Forces feedback to address the candidate directly.
pub const SECOND_PERSON_INSTRUCTION: &str = "\
    IMPORTANT: Write all feedback in SECOND PERSON. Address the candidate as \"You\"; \
    never write \"the candidate\", \"he\" or \"she\". \
    Example: \"You did a great job explaining...\" instead of \"The candidate did a great job...\"";

/// Substitutes an empty context field with a readable placeholder.
pub fn or_placeholder<'a>(value: &'a str, placeholder: &'a str) -> &'a str {
    if value.trim().is_empty() {
        placeholder
    } else {
        value
    }
}

/// Fills `{name}` placeholders in one pass over `template`.
///
/// Substituted values are never rescanned, so braces inside user text reach
/// the model unchanged. Braces that do not name a known placeholder (the JSON
/// examples in templates) are copied through as-is.
pub fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let value = after.find('}').and_then(|close| {
            let name = &after[..close];
            values
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (*value, close))
        });
        match value {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_template_substitutes_known_names() {
        let filled = fill_template("Role: {job_title} at {company}", &[("company", "Acme"), ("job_title", "SRE")]);
        assert_eq!(filled, "Role: SRE at Acme");
    }

    #[test]
    fn test_fill_template_does_not_rescan_values() {
        let filled = fill_template(
            "CV: {cv_text}\nRole: {job_title} at {company}",
            &[
                ("cv_text", "Built templating: {company} and {job_title} tokens"),
                ("job_title", "SRE"),
                ("company", "Acme"),
            ],
        );
        assert_eq!(
            filled,
            "CV: Built templating: {company} and {job_title} tokens\nRole: SRE at Acme"
        );
    }

    #[test]
    fn test_fill_template_keeps_unknown_braces() {
        let filled = fill_template(r#"{ "score": 85 } {missing} {name"#, &[("name", "x")]);
        assert_eq!(filled, r#"{ "score": 85 } {missing} {name"#);
    }

    #[test]
    fn test_or_placeholder() {
        assert_eq!(or_placeholder("  ", "No CV provided"), "No CV provided");
        assert_eq!(or_placeholder("Rust dev", "No CV provided"), "Rust dev");
    }
}
