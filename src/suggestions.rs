use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

/// One structured code suggestion from the model.
///
/// `label` is free text on purpose; the model may invent categories beyond the
/// examples given in the prompt.
#[derive(Debug, Clone, Deserialize)]
pub struct CodeSuggestion {
    pub relevant_file: String,
    pub suggestion_content: String,
    pub existing_code: String,
    pub improved_code: String,
    #[serde(default)]
    pub one_sentence_summary: Option<String>,
    pub relevant_lines_start: u32,
    pub relevant_lines_end: u32,
    pub label: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct SuggestionSet {
    pub code_suggestions: Vec<CodeSuggestion>,
}

/// String fields the fallback pass rewrites into block scalars when the model
/// emits them inline (embedded colons otherwise break the YAML).
const BLOCK_SCALAR_KEYS: &[&str] = &[
    "relevant_file",
    "suggestion_content",
    "existing_code",
    "improved_code",
    "one_sentence_summary",
    "label",
];

/// Parse the model response into a `SuggestionSet`.
///
/// Accepts the document bare or wrapped in a markdown code fence, as either a
/// mapping with a `code_suggestions` key or a bare list of suggestions. If the
/// first parse fails, retries once with inline string values rewritten as
/// block scalars.
pub fn parse_response(response: &str) -> Result<SuggestionSet> {
    let text = strip_code_fence(response);

    if let Some(set) = parse_document(text) {
        return Ok(set);
    }

    let fixed = fix_inline_scalars(text);
    parse_document(&fixed)
        .ok_or_else(|| anyhow!("model response is not a valid code_suggestions YAML document"))
}

fn parse_document(text: &str) -> Option<SuggestionSet> {
    if let Ok(set) = serde_yaml::from_str::<SuggestionSet>(text) {
        return Some(set);
    }
    // Some models answer with the bare list.
    if let Ok(list) = serde_yaml::from_str::<Vec<CodeSuggestion>>(text) {
        return Some(SuggestionSet { code_suggestions: list });
    }
    None
}

/// Strip a surrounding ``` / ```yaml fence if present.
fn strip_code_fence(response: &str) -> &str {
    let trimmed = response.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("yaml").unwrap_or(rest);
    let rest = rest.strip_prefix('\n').unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim_end()
}

/// Rewrite `key: inline value` into `key: |-` + indented value for the known
/// string keys, so values containing colons survive the YAML parser.
fn fix_inline_scalars(text: &str) -> String {
    let mut out = String::with_capacity(text.len());

    for line in text.lines() {
        let rewritten = BLOCK_SCALAR_KEYS.iter().find_map(|key| {
            let stripped = line.trim_start();
            // The first key of each record rides on the list-item dash.
            let (dash, rest) = match stripped.strip_prefix("- ") {
                Some(rest) => ("- ", rest),
                None => ("", stripped),
            };
            let value = rest.strip_prefix(key)?.strip_prefix(':')?.trim();
            if value.is_empty() || value.starts_with('|') || value.starts_with('>') {
                return None;
            }
            let indent = &line[..line.len() - stripped.len()];
            let inner = format!("{indent}{}", " ".repeat(dash.len()));
            Some(format!("{indent}{dash}{key}: |-\n{inner}  {value}"))
        });

        match rewritten {
            Some(fixed) => out.push_str(&fixed),
            None => out.push_str(line),
        }
        out.push('\n');
    }

    out
}

/// Drop suggestions that are malformed or make no change.
pub fn validate(set: SuggestionSet) -> Vec<CodeSuggestion> {
    set.code_suggestions
        .into_iter()
        .enumerate()
        .filter(|(i, s)| {
            if s.existing_code.trim() == s.improved_code.trim() {
                log::debug!("skipping suggestion {}: existing code equals improved code", i + 1);
                return false;
            }
            if s.relevant_lines_start == 0 || s.relevant_lines_start > s.relevant_lines_end {
                log::debug!(
                    "skipping suggestion {}: invalid line range {}-{}",
                    i + 1,
                    s.relevant_lines_start,
                    s.relevant_lines_end
                );
                return false;
            }
            true
        })
        .map(|(_, s)| s)
        .collect()
}

/// Re-indent an improved snippet to match the indentation of the original
/// line it replaces. Models often strip the leading whitespace.
pub fn dedent_to_match(original_line: &str, snippet: &str) -> String {
    let first = match snippet.lines().next() {
        Some(l) => l,
        None => return snippet.to_string(),
    };

    let original_spaces = original_line.len() - original_line.trim_start().len();
    let snippet_spaces = first.len() - first.trim_start().len();
    if original_spaces <= snippet_spaces {
        return snippet.to_string();
    }

    let pad = " ".repeat(original_spaces - snippet_spaces);
    snippet
        .lines()
        .map(|l| {
            if l.trim().is_empty() {
                l.to_string()
            } else {
                format!("{pad}{l}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Debug, Deserialize)]
struct SortOrder {
    #[serde(rename = "Sort Order")]
    sort_order: Vec<SortEntry>,
}

#[derive(Debug, Deserialize)]
struct SortEntry {
    #[serde(rename = "suggestion number")]
    suggestion_number: usize,
    #[serde(rename = "importance order")]
    importance_order: usize,
}

/// Reorder suggestions according to the ranking response.
///
/// Both lists in the response are 1-based. Any inconsistency (bad numbers,
/// wrong length, unparseable YAML) keeps the original order.
pub fn apply_sort_order(
    suggestions: Vec<CodeSuggestion>,
    response: &str,
) -> Vec<CodeSuggestion> {
    match try_apply_sort_order(&suggestions, response) {
        Ok(sorted) => sorted,
        Err(e) => {
            log::info!("could not sort suggestions, keeping model order: {e}");
            suggestions
        }
    }
}

fn try_apply_sort_order(
    suggestions: &[CodeSuggestion],
    response: &str,
) -> Result<Vec<CodeSuggestion>> {
    let order: SortOrder = serde_yaml::from_str(strip_code_fence(response))
        .context("failed to parse sort-order response")?;

    let mut sorted: Vec<Option<CodeSuggestion>> = vec![None; suggestions.len()];
    for entry in &order.sort_order {
        let from = entry
            .suggestion_number
            .checked_sub(1)
            .filter(|i| *i < suggestions.len())
            .ok_or_else(|| anyhow!("suggestion number {} out of range", entry.suggestion_number))?;
        let to = entry
            .importance_order
            .checked_sub(1)
            .filter(|i| *i < suggestions.len())
            .ok_or_else(|| anyhow!("importance order {} out of range", entry.importance_order))?;
        sorted[to] = Some(suggestions[from].clone());
    }

    sorted
        .into_iter()
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| anyhow!("sort order does not cover every suggestion"))
}

/// Clip a ranked list to `ceil(max_len * factor)` entries, where `max_len`
/// also accounts for the configured per-call suggestion counts.
pub fn clip_ranked(
    mut suggestions: Vec<CodeSuggestion>,
    num_code_suggestions: u32,
    num_per_chunk: u32,
    factor: f32,
) -> Vec<CodeSuggestion> {
    if (factor - 1.0).abs() < f32::EPSILON {
        return suggestions;
    }
    let max_len = suggestions
        .len()
        .max(num_code_suggestions as usize)
        .max(num_per_chunk as usize);
    let new_len = (0.5 + max_len as f32 * factor) as usize;
    if new_len < suggestions.len() {
        suggestions.truncate(new_len);
    }
    suggestions
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(file: &str, start: u32, end: u32) -> CodeSuggestion {
        CodeSuggestion {
            relevant_file: file.into(),
            suggestion_content: "do better".into(),
            existing_code: "old".into(),
            improved_code: "new".into(),
            one_sentence_summary: None,
            relevant_lines_start: start,
            relevant_lines_end: end,
            label: "bug".into(),
        }
    }

    const FENCED_RESPONSE: &str = "```yaml
code_suggestions:
- relevant_file: |-
    src/client.rs
  suggestion_content: |-
    Propagate the error instead of unwrapping
  existing_code: |-
    let body = resp.text().unwrap();
  improved_code: |-
    let body = resp.text()?;
  relevant_lines_start: 42
  relevant_lines_end: 42
  label: |-
    bug
```";

    #[test]
    fn parses_fenced_yaml_response() {
        let set = parse_response(FENCED_RESPONSE).unwrap();
        assert_eq!(set.code_suggestions.len(), 1);
        let s = &set.code_suggestions[0];
        assert_eq!(s.relevant_file, "src/client.rs");
        assert_eq!(s.relevant_lines_start, 42);
        assert_eq!(s.label, "bug");
        assert!(s.one_sentence_summary.is_none());
    }

    #[test]
    fn parses_bare_sequence_response() {
        let response = "\
- relevant_file: |-
    src/a.rs
  suggestion_content: |-
    x
  existing_code: |-
    a
  improved_code: |-
    b
  relevant_lines_start: 1
  relevant_lines_end: 2
  label: |-
    style
";
        let set = parse_response(response).unwrap();
        assert_eq!(set.code_suggestions.len(), 1);
        assert_eq!(set.code_suggestions[0].label, "style");
    }

    #[test]
    fn fallback_fixes_inline_values_with_colons() {
        let response = "\
code_suggestions:
- relevant_file: src/a.rs
  suggestion_content: use HashMap: it is faster here
  existing_code: let x = 1;
  improved_code: let x = 2;
  relevant_lines_start: 1
  relevant_lines_end: 1
  label: performance
";
        let set = parse_response(response).unwrap();
        assert_eq!(set.code_suggestions.len(), 1);
        assert_eq!(
            set.code_suggestions[0].suggestion_content,
            "use HashMap: it is faster here"
        );
    }

    #[test]
    fn fallback_fixes_inline_value_on_the_list_item_line() {
        let response = "\
code_suggestions:
- relevant_file: src/a.rs: generated
  suggestion_content: tidy up
  existing_code: let x = 1;
  improved_code: let x = 2;
  relevant_lines_start: 1
  relevant_lines_end: 1
  label: style
";
        let set = parse_response(response).unwrap();
        assert_eq!(set.code_suggestions.len(), 1);
        assert_eq!(set.code_suggestions[0].relevant_file, "src/a.rs: generated");
    }

    #[test]
    fn rejects_garbage_response() {
        assert!(parse_response("I'm sorry, I can't help with that.").is_err());
    }

    #[test]
    fn validate_drops_noop_and_bad_ranges() {
        let mut noop = sample("a.rs", 1, 1);
        noop.improved_code = noop.existing_code.clone();
        let bad_range = sample("b.rs", 5, 3);
        let zero_start = sample("c.rs", 0, 2);
        let good = sample("d.rs", 2, 4);

        let kept = validate(SuggestionSet {
            code_suggestions: vec![noop, bad_range, zero_start, good],
        });
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].relevant_file, "d.rs");
    }

    #[test]
    fn dedent_matches_original_indentation() {
        let snippet = "if ok {\n    run();\n}";
        let adjusted = dedent_to_match("        if ok {", snippet);
        assert_eq!(adjusted, "        if ok {\n            run();\n        }");

        // Already deeper than the original: left untouched.
        let unchanged = dedent_to_match("if ok {", "    if ok {");
        assert_eq!(unchanged, "    if ok {");
    }

    #[test]
    fn sort_order_reorders_suggestions() {
        let suggestions = vec![sample("first.rs", 1, 1), sample("second.rs", 2, 2)];
        let response = "\
Sort Order:
- suggestion number: 2
  importance order: 1
- suggestion number: 1
  importance order: 2
";
        let sorted = apply_sort_order(suggestions, response);
        assert_eq!(sorted[0].relevant_file, "second.rs");
        assert_eq!(sorted[1].relevant_file, "first.rs");
    }

    #[test]
    fn bad_sort_order_keeps_original_order() {
        let suggestions = vec![sample("first.rs", 1, 1), sample("second.rs", 2, 2)];
        let sorted = apply_sort_order(suggestions, "not yaml at all: [");
        assert_eq!(sorted[0].relevant_file, "first.rs");

        let suggestions = vec![sample("first.rs", 1, 1)];
        let out_of_range = "Sort Order:\n- suggestion number: 9\n  importance order: 1\n";
        let sorted = apply_sort_order(suggestions, out_of_range);
        assert_eq!(sorted[0].relevant_file, "first.rs");
    }

    #[test]
    fn clip_keeps_everything_at_factor_one() {
        let suggestions = vec![sample("a.rs", 1, 1), sample("b.rs", 1, 1)];
        assert_eq!(clip_ranked(suggestions, 4, 8, 1.0).len(), 2);
    }

    #[test]
    fn clip_truncates_long_ranked_lists() {
        let suggestions: Vec<_> = (0..20).map(|_| sample("a.rs", 1, 1)).collect();
        // max_len = 20, 20 * 0.5 + 0.5 -> 10
        assert_eq!(clip_ranked(suggestions, 4, 8, 0.5).len(), 10);
    }
}
