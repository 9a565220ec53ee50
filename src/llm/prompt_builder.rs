use crate::llm::prompts;
use crate::suggestions::CodeSuggestion;

pub struct PromptPair {
    pub system: String,
    pub user: String,
}

/// Everything the code-suggestions prompt is rendered from.
#[derive(Debug, Clone, Default)]
pub struct PromptVars {
    pub title: String,
    pub branch: Option<String>,
    pub description: Option<String>,
    pub language: Option<String>,
    pub diff: String,
    pub num_code_suggestions: u32,
    pub summarize_mode: bool,
    pub extra_instructions: Option<String>,
    pub commit_messages: Option<String>,
}

/// Render the system + user prompts for the code-suggestions call.
pub fn code_suggestions_prompt(vars: &PromptVars) -> PromptPair {
    let mut system = String::new();

    system.push_str(prompts::SUGGESTIONS_ROLE);
    system.push_str("\n\n");
    system.push_str(prompts::DIFF_FORMAT);
    system.push_str("\n\n");
    system.push_str(&format!(
        "Provide up to {} code suggestions. Try to provide diverse and insightful suggestions.\n",
        vars.num_code_suggestions
    ));
    system.push_str(prompts::SUGGESTIONS_GUIDELINES);
    system.push('\n');

    if let Some(extra) = non_empty(vars.extra_instructions.as_deref()) {
        system.push_str("\nExtra instructions from the user:\n======\n");
        system.push_str(extra);
        system.push_str("\n======\n");
    }

    system.push('\n');
    system.push_str(&schema_block(vars.summarize_mode));
    system.push('\n');
    system.push_str(&example_block(vars.summarize_mode));
    system.push('\n');
    system.push_str(prompts::YAML_OUTPUT_RULES);

    let mut user = String::new();
    user.push_str("PR Info:\n\n");
    user.push_str(&format!("Title: '{}'\n", vars.title));
    if let Some(branch) = non_empty(vars.branch.as_deref()) {
        user.push_str(&format!("Branch: '{branch}'\n"));
    }
    if let Some(language) = non_empty(vars.language.as_deref()) {
        user.push_str(&format!("Main PR language: '{language}'\n"));
    }
    if let Some(description) = non_empty(vars.description.as_deref()) {
        user.push_str("\nDescription:\n======\n");
        user.push_str(description);
        user.push_str("\n======\n");
    }
    if let Some(messages) = non_empty(vars.commit_messages.as_deref()) {
        user.push_str("\nCommit messages:\n======\n");
        user.push_str(messages);
        user.push_str("\n======\n");
    }
    user.push_str("\nThe PR Diff:\n======\n");
    user.push_str(vars.diff.trim_end());
    user.push_str("\n======\n\nResponse (should be a valid YAML, and nothing else):\n");

    PromptPair { system, user }
}

/// Render the system + user prompts for the ranking pass.
pub fn sort_suggestions_prompt(suggestions: &[CodeSuggestion]) -> PromptPair {
    let mut user = String::new();
    for (i, s) in suggestions.iter().enumerate() {
        user.push_str(&format!(
            "suggestion {num}: {content} (file: {file}, lines {start}-{end}, label: {label})\n\n",
            num = i + 1,
            content = s.suggestion_content.trim(),
            file = s.relevant_file.trim(),
            start = s.relevant_lines_start,
            end = s.relevant_lines_end,
            label = s.label.trim(),
        ));
    }

    PromptPair {
        system: prompts::SORT_SUGGESTIONS_ROLE.to_owned(),
        user,
    }
}

fn schema_block(summarize_mode: bool) -> String {
    let mut out = String::from(
        "Each code suggestion must contain the following fields:\n\
         - relevant_file: the full path of the relevant file\n\
         - suggestion_content: an actionable suggestion for meaningfully improving the new code\n\
         - existing_code: a contiguous code snippet from a '__new hunk__' section, correctly indented, without line numbers\n\
         - relevant_lines_start: the line number in the '__new hunk__' where the suggestion starts (inclusive), matching the existing_code snippet\n\
         - relevant_lines_end: the line number in the '__new hunk__' where the suggestion ends (inclusive)\n\
         - improved_code: a replacement snippet for the relevant lines, complete and correctly indented, without line numbers\n",
    );
    if summarize_mode {
        out.push_str(
            "- one_sentence_summary: a short summary of the suggested action, six words or fewer\n",
        );
    }
    out.push_str(
        "- label: a single short label describing the suggestion type, for example 'security', 'bug', 'performance', 'enhancement', or 'best practice'. Other labels are also allowed.\n\
         \nThe output is a YAML object with a single top-level 'code_suggestions' key holding a list of such records.\n",
    );
    out
}

fn example_block(summarize_mode: bool) -> String {
    let mut out = String::from(
        r#"Example output:
```yaml
code_suggestions:
- relevant_file: |-
    src/file1.rs
  suggestion_content: |-
    ...
  existing_code: |-
    ...
  relevant_lines_start: 12
  relevant_lines_end: 13
  improved_code: |-
    ...
"#,
    );
    if summarize_mode {
        out.push_str("  one_sentence_summary: |-\n    ...\n");
    }
    out.push_str("  label: |-\n    ...\n```\n");
    out
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_vars() -> PromptVars {
        PromptVars {
            title: "Add request retries".into(),
            branch: Some("feature/retries".into()),
            description: None,
            language: None,
            diff: "## src/client.rs\n\n@@ -1,1 +1,2 @@\n__new hunk__\n1  fn a() {}\n2 +fn b() {}".into(),
            num_code_suggestions: 4,
            summarize_mode: false,
            extra_instructions: None,
            commit_messages: None,
        }
    }

    #[test]
    fn one_sentence_summary_only_in_summarize_mode() {
        let mut vars = base_vars();

        let plain = code_suggestions_prompt(&vars);
        assert!(!plain.system.contains("one_sentence_summary"));

        vars.summarize_mode = true;
        let summarized = code_suggestions_prompt(&vars);
        // Field appears in both the schema description and the example.
        assert_eq!(summarized.system.matches("one_sentence_summary").count(), 2);
    }

    #[test]
    fn extra_instructions_embedded_verbatim_or_omitted() {
        let mut vars = base_vars();

        let without = code_suggestions_prompt(&vars);
        assert!(!without.system.contains("Extra instructions from the user"));

        vars.extra_instructions = Some("   ".into());
        let blank = code_suggestions_prompt(&vars);
        assert!(!blank.system.contains("Extra instructions from the user"));

        vars.extra_instructions = Some("Focus on error handling only.".into());
        let with = code_suggestions_prompt(&vars);
        assert!(with.system.contains(
            "Extra instructions from the user:\n======\nFocus on error handling only.\n======"
        ));
    }

    #[test]
    fn language_line_only_when_present() {
        let mut vars = base_vars();

        let without = code_suggestions_prompt(&vars);
        assert!(!without.user.contains("Main PR language"));

        vars.language = Some("Rust".into());
        let with = code_suggestions_prompt(&vars);
        assert!(with.user.contains("Main PR language: 'Rust'\n"));
    }

    #[test]
    fn title_and_diff_embedded_untruncated() {
        let mut vars = base_vars();
        vars.diff = format!("{}\n{}", vars.diff, "x".repeat(50_000));

        let pair = code_suggestions_prompt(&vars);
        assert!(pair.user.contains("Title: 'Add request retries'\n"));
        assert!(pair.user.contains(&vars.diff));
    }

    #[test]
    fn description_block_only_when_present() {
        let mut vars = base_vars();

        let without = code_suggestions_prompt(&vars);
        assert!(!without.user.contains("Description:"));

        vars.description = Some("Retries failed requests with backoff.".into());
        let with = code_suggestions_prompt(&vars);
        assert!(with.user.contains(
            "Description:\n======\nRetries failed requests with backoff.\n======"
        ));
    }

    #[test]
    fn commit_messages_block_only_when_present() {
        let mut vars = base_vars();

        let without = code_suggestions_prompt(&vars);
        assert!(!without.user.contains("Commit messages:"));

        vars.commit_messages = Some("fix retries\nadd backoff".into());
        let with = code_suggestions_prompt(&vars);
        assert!(with.user.contains("Commit messages:\n======\nfix retries\nadd backoff\n======"));
    }

    #[test]
    fn suggestion_count_rendered_into_system_prompt() {
        let mut vars = base_vars();
        vars.num_code_suggestions = 7;
        let pair = code_suggestions_prompt(&vars);
        assert!(pair.system.contains("Provide up to 7 code suggestions."));
    }

    #[test]
    fn sort_prompt_numbers_suggestions_from_one() {
        let suggestions = vec![
            CodeSuggestion {
                relevant_file: "src/a.rs".into(),
                suggestion_content: "Handle the error".into(),
                existing_code: "let x = f().unwrap();".into(),
                improved_code: "let x = f()?;".into(),
                one_sentence_summary: None,
                relevant_lines_start: 3,
                relevant_lines_end: 3,
                label: "bug".into(),
            },
            CodeSuggestion {
                relevant_file: "src/b.rs".into(),
                suggestion_content: "Avoid the clone".into(),
                existing_code: "x.clone()".into(),
                improved_code: "&x".into(),
                one_sentence_summary: None,
                relevant_lines_start: 9,
                relevant_lines_end: 10,
                label: "performance".into(),
            },
        ];

        let pair = sort_suggestions_prompt(&suggestions);
        assert!(pair.user.contains("suggestion 1: Handle the error"));
        assert!(pair.user.contains("suggestion 2: Avoid the clone"));
        assert!(pair.user.contains("lines 9-10"));
        assert!(pair.system.contains("Sort Order"));
    }
}
