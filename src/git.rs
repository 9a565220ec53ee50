use anyhow::{anyhow, Context, Result};
use std::collections::BTreeMap;
use std::process::Command as GitCommand;

/// One file's slice of a unified diff.
#[derive(Debug, Clone)]
pub struct FilePatch {
    pub path: String,
    /// The raw patch body for this file (hunk headers and +/-/context lines).
    pub patch: String,
}

/// Run a git command and capture stdout as String.
pub fn git_output(args: &[&str]) -> Result<String> {
    let output = GitCommand::new("git")
        .args(args)
        .output()
        .with_context(|| format!("failed to run git {:?}", args))?;

    if !output.status.success() {
        return Err(anyhow!(
            "git {:?} exited with status {:?}",
            args,
            output.status.code()
        ));
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

/// Get the current branch name.
pub fn current_branch() -> Result<String> {
    let name = git_output(&["rev-parse", "--abbrev-ref", "HEAD"])?
        .trim()
        .to_string();
    Ok(name)
}

/// Get the full staged diff.
pub fn staged_diff() -> Result<String> {
    let diff = git_output(&["diff", "--cached"])?;
    Ok(diff)
}

/// Get the diff for the commit range base...from (merge-base to tip).
pub fn range_diff(base: &str, from: &str) -> Result<String> {
    let range = format!("{base}...{from}");
    let diff = git_output(&["diff", &range])?;
    Ok(diff)
}

/// Subject line of the most recent commit on `from`, used as the PR title.
pub fn head_commit_subject(from: &str) -> Result<String> {
    let subject = git_output(&["log", "-1", "--pretty=format:%s", from])?
        .trim()
        .to_string();
    Ok(subject)
}

/// Body of the most recent commit on `from`, used as the PR description.
pub fn head_commit_body(from: &str) -> Result<String> {
    let body = git_output(&["log", "-1", "--pretty=format:%b", from])?
        .trim()
        .to_string();
    Ok(body)
}

/// Commit subjects for base..from, oldest first, one per line.
pub fn commit_messages(base: &str, from: &str) -> Result<String> {
    let range = format!("{base}..{from}");
    let log = git_output(&["log", "--reverse", "--pretty=format:%s", &range])?;
    Ok(log.trim().to_string())
}

/// Split a raw unified diff into per-file patches.
///
/// Recognizes `diff --git a/... b/...` boundaries and takes the path from the
/// `+++ b/...` line (falling back to the `---` side for deleted files).
pub fn split_into_file_patches(diff: &str) -> Vec<FilePatch> {
    let mut patches = Vec::new();
    let mut path: Option<String> = None;
    let mut body = String::new();

    let flush = |path: &mut Option<String>, body: &mut String, patches: &mut Vec<FilePatch>| {
        if let Some(p) = path.take() {
            if !body.trim().is_empty() {
                patches.push(FilePatch {
                    path: p,
                    patch: std::mem::take(body).trim_end().to_string(),
                });
            } else {
                body.clear();
            }
        }
    };

    for line in diff.lines() {
        if line.starts_with("diff --git ") {
            flush(&mut path, &mut body, &mut patches);
            path = Some(String::new());
            continue;
        }
        if line.starts_with("+++ b/") {
            if let Some(p) = path.as_mut() {
                *p = line.trim_start_matches("+++ b/").to_string();
            }
            continue;
        }
        if line.starts_with("--- a/") {
            if let Some(p) = path.as_mut() {
                if p.is_empty() {
                    *p = line.trim_start_matches("--- a/").to_string();
                }
            }
            continue;
        }
        if line.starts_with("index ")
            || line.starts_with("new file mode")
            || line.starts_with("deleted file mode")
            || line.starts_with("similarity index")
            || line.starts_with("rename from")
            || line.starts_with("rename to")
            || line.starts_with("old mode")
            || line.starts_with("new mode")
            || line == "+++ /dev/null"
            || line == "--- /dev/null"
        {
            continue;
        }
        if path.is_some() {
            body.push_str(line);
            body.push('\n');
        }
    }
    flush(&mut path, &mut body, &mut patches);

    patches
}

/// Rewrite one file patch into the `__new hunk__` / `__old hunk__` layout.
///
/// New-side lines (context and additions) keep their diff prefix and gain an
/// absolute line number in the post-image file. Old-side lines (context and
/// removals) are listed without numbers. The `__old hunk__` section is only
/// emitted when the hunk actually removed something.
pub fn annotate_hunks(patch: &FilePatch) -> String {
    let mut out = format!("## {}\n", patch.path);

    let mut new_section: Vec<String> = Vec::new();
    let mut old_section: Vec<String> = Vec::new();
    let mut header = String::new();
    let mut new_line_no: u32 = 0;
    let mut has_removals = false;
    let mut in_hunk = false;

    let mut flush = |out: &mut String,
                     header: &mut String,
                     new_section: &mut Vec<String>,
                     old_section: &mut Vec<String>,
                     has_removals: &mut bool| {
        if header.is_empty() {
            return;
        }
        out.push('\n');
        out.push_str(header);
        out.push('\n');
        out.push_str("__new hunk__\n");
        for l in new_section.iter() {
            out.push_str(l);
            out.push('\n');
        }
        if *has_removals {
            out.push_str("__old hunk__\n");
            for l in old_section.iter() {
                out.push_str(l);
                out.push('\n');
            }
        }
        header.clear();
        new_section.clear();
        old_section.clear();
        *has_removals = false;
    };

    for line in patch.patch.lines() {
        if line.starts_with("@@") {
            flush(
                &mut out,
                &mut header,
                &mut new_section,
                &mut old_section,
                &mut has_removals,
            );
            header = line.to_string();
            new_line_no = parse_new_start(line).unwrap_or(1);
            in_hunk = true;
            continue;
        }
        if !in_hunk {
            continue;
        }
        match line.chars().next() {
            Some('+') => {
                new_section.push(format!("{new_line_no} {line}"));
                new_line_no += 1;
            }
            Some('-') => {
                old_section.push(line.to_string());
                has_removals = true;
            }
            Some('\\') => {} // "\ No newline at end of file"
            _ => {
                new_section.push(format!("{new_line_no} {line}"));
                new_line_no += 1;
                old_section.push(line.to_string());
            }
        }
    }
    flush(
        &mut out,
        &mut header,
        &mut new_section,
        &mut old_section,
        &mut has_removals,
    );

    out.trim_end().to_string()
}

/// Parse the post-image start line out of a `@@ -a,b +c,d @@` header.
fn parse_new_start(header: &str) -> Option<u32> {
    let plus = header.split_whitespace().find(|tok| tok.starts_with('+'))?;
    let start = plus.trim_start_matches('+').split(',').next()?;
    start.parse().ok()
}

/// Guess the dominant language of the change set from file extensions.
pub fn main_language(patches: &[FilePatch]) -> Option<String> {
    let mut counts: BTreeMap<&'static str, usize> = BTreeMap::new();

    for patch in patches {
        let ext = patch.path.rsplit('.').next().unwrap_or_default();
        let lang = match ext {
            "rs" => "Rust",
            "py" => "Python",
            "js" | "jsx" | "mjs" => "JavaScript",
            "ts" | "tsx" => "TypeScript",
            "go" => "Go",
            "java" => "Java",
            "kt" | "kts" => "Kotlin",
            "rb" => "Ruby",
            "php" => "PHP",
            "c" | "h" => "C",
            "cpp" | "cc" | "cxx" | "hpp" => "C++",
            "cs" => "C#",
            "swift" => "Swift",
            "sh" | "bash" => "Shell",
            _ => continue,
        };
        *counts.entry(lang).or_default() += 1;
    }

    counts
        .into_iter()
        .max_by_key(|(_, n)| *n)
        .map(|(lang, _)| lang.to_string())
}
