use anyhow::Result;
use std::io::BufRead;

/// Collect a streaming response line-by-line into one String.
///
/// Chunks are not echoed: stdout is reserved for the rendered suggestion
/// report, and raw YAML fragments are useless to watch anyway.
pub fn read_stream_to_string<R, F>(reader: R, mut parse_line: F) -> Result<String>
where
    R: BufRead,
    F: FnMut(&str) -> Result<Option<String>>,
{
    let mut out = String::new();

    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(chunk) = parse_line(line)? {
            out.push_str(&chunk);
        }
    }

    log::trace!("collected {} streamed bytes", out.len());
    Ok(out)
}
