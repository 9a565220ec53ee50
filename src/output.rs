use crate::suggestions::{dedent_to_match, CodeSuggestion};

pub const NO_SUGGESTIONS: &str = "No suggestions found to improve this PR.";

/// Render suggestions one by one, GitHub `suggestion`-block style.
pub fn render_inline(suggestions: &[CodeSuggestion]) -> String {
    if suggestions.is_empty() {
        return NO_SUGGESTIONS.to_string();
    }

    let mut out = String::new();
    for s in suggestions {
        out.push_str(&format!(
            "{} {}\n",
            s.relevant_file.trim(),
            range_str(s.relevant_lines_start, s.relevant_lines_end)
        ));
        out.push_str(&format!(
            "**Suggestion:** {} [{}]\n",
            s.suggestion_content.trim(),
            normalize_label(&s.label)
        ));
        // Models often strip leading whitespace; re-align the replacement
        // with the first line it replaces.
        let improved = dedent_to_match(
            s.existing_code.lines().next().unwrap_or(""),
            &s.improved_code,
        );
        out.push_str("```suggestion\n");
        out.push_str(improved.trim_end());
        out.push_str("\n```\n\n");
    }
    out.trim_end().to_string()
}

/// Render the summarized digest: suggestions grouped by label, each with its
/// one-sentence summary and a diff between existing and improved code.
pub fn render_summarized(suggestions: &[CodeSuggestion]) -> String {
    let mut out = String::from("## PR Code Suggestions\n\n");

    if suggestions.is_empty() {
        out.push_str(NO_SUGGESTIONS);
        return out;
    }

    // Group by label, preserving first-seen label order.
    let mut labels: Vec<String> = Vec::new();
    for s in suggestions {
        let label = normalize_label(&s.label);
        if !labels.contains(&label) {
            labels.push(label);
        }
    }

    for label in &labels {
        out.push_str(&format!("### {label}\n\n"));
        for s in suggestions
            .iter()
            .filter(|s| normalize_label(&s.label) == *label)
        {
            let headline = s
                .one_sentence_summary
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| s.suggestion_content.trim());
            out.push_str(&format!(
                "- **{}**\n  {} {}\n",
                headline,
                s.relevant_file.trim(),
                range_str(s.relevant_lines_start, s.relevant_lines_end)
            ));
            if headline != s.suggestion_content.trim() {
                out.push_str(&format!("  {}\n", s.suggestion_content.trim()));
            }
            out.push_str("  ```diff\n");
            for line in snippet_diff(&s.existing_code, &s.improved_code).lines() {
                out.push_str("  ");
                out.push_str(line);
                out.push('\n');
            }
            out.push_str("  ```\n\n");
        }
    }

    out.trim_end().to_string()
}

/// `[12]` for a single line, `[12-14]` for a range.
fn range_str(start: u32, end: u32) -> String {
    if start == end {
        format!("[{start}]")
    } else {
        format!("[{start}-{end}]")
    }
}

/// Labels sometimes come back wrapped in stray quotes.
fn normalize_label(label: &str) -> String {
    label.trim().trim_matches('\'').trim_matches('"').to_string()
}

/// Line diff between the existing and improved snippets: shared prefix and
/// suffix lines as context, the differing middle as -/+ runs.
fn snippet_diff(existing: &str, improved: &str) -> String {
    let old: Vec<&str> = existing.trim_end().lines().collect();
    let new: Vec<&str> = improved.trim_end().lines().collect();

    let mut prefix = 0;
    while prefix < old.len() && prefix < new.len() && old[prefix] == new[prefix] {
        prefix += 1;
    }
    let mut suffix = 0;
    while suffix < old.len() - prefix
        && suffix < new.len() - prefix
        && old[old.len() - 1 - suffix] == new[new.len() - 1 - suffix]
    {
        suffix += 1;
    }

    let mut out = String::new();
    for line in &old[..prefix] {
        out.push_str(&format!(" {line}\n"));
    }
    for line in &old[prefix..old.len() - suffix] {
        out.push_str(&format!("-{line}\n"));
    }
    for line in &new[prefix..new.len() - suffix] {
        out.push_str(&format!("+{line}\n"));
    }
    for line in &old[old.len() - suffix..] {
        out.push_str(&format!(" {line}\n"));
    }
    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn suggestion(label: &str, summary: Option<&str>) -> CodeSuggestion {
        CodeSuggestion {
            relevant_file: "src/client.rs".into(),
            suggestion_content: "Propagate the error instead of unwrapping".into(),
            existing_code: "let body = resp.text().unwrap();".into(),
            improved_code: "let body = resp.text()?;".into(),
            one_sentence_summary: summary.map(Into::into),
            relevant_lines_start: 42,
            relevant_lines_end: 42,
            label: label.into(),
        }
    }

    #[test]
    fn inline_rendering_includes_location_and_suggestion_block() {
        let out = render_inline(&[suggestion("bug", None)]);
        assert!(out.contains("src/client.rs [42]"));
        assert!(out.contains("**Suggestion:** Propagate the error instead of unwrapping [bug]"));
        assert!(out.contains("```suggestion\nlet body = resp.text()?;\n```"));
    }

    #[test]
    fn inline_rendering_reindents_improved_code() {
        let mut s = suggestion("bug", None);
        s.existing_code = "        let body = resp.text().unwrap();".into();
        s.improved_code = "let body = resp.text()?;".into();

        let out = render_inline(&[s]);
        assert!(out.contains("```suggestion\n        let body = resp.text()?;\n```"));
    }

    #[test]
    fn inline_rendering_of_empty_set() {
        assert_eq!(render_inline(&[]), NO_SUGGESTIONS);
    }

    #[test]
    fn summarized_rendering_groups_by_label() {
        let mut second = suggestion("'bug'", Some("Avoid panicking on HTTP errors"));
        second.relevant_lines_end = 44;
        let third = suggestion("performance", None);

        let out = render_summarized(&[suggestion("bug", None), second, third]);
        assert!(out.starts_with("## PR Code Suggestions"));
        // Quoted and unquoted 'bug' labels collapse into one group.
        assert_eq!(out.matches("### bug").count(), 1);
        assert!(out.contains("### performance"));
        assert!(out.contains("**Avoid panicking on HTTP errors**"));
        assert!(out.contains("src/client.rs [42-44]"));
        assert!(out.contains("-let body = resp.text().unwrap();"));
        assert!(out.contains("+let body = resp.text()?;"));
    }

    #[test]
    fn summarized_rendering_of_empty_set() {
        let out = render_summarized(&[]);
        assert!(out.contains(NO_SUGGESTIONS));
    }

    #[test]
    fn snippet_diff_keeps_shared_context() {
        let existing = "fn run() {\n    work().unwrap();\n}";
        let improved = "fn run() {\n    work()?;\n}";
        let diff = snippet_diff(existing, improved);
        assert_eq!(
            diff,
            " fn run() {\n-    work().unwrap();\n+    work()?;\n }"
        );
    }
}
