//! Unified-diff parsing and application.
//!
//! A deliberately small engine covering the subset of the unified format
//! that instrumentation patches use: `---`/`+++` headers, `@@` hunk ranges,
//! context/remove/add lines, and `\ No newline at end of file` markers.
//! Application is strict about hunk context; a mismatch at the declared
//! position falls back to searching forward for a matching position before
//! failing.

use thiserror::Error;

/// Errors from parsing or applying a unified diff.
#[derive(Debug, Error)]
pub enum DiffError {
    #[error("malformed patch at line {line}: {reason}")]
    Malformed { line: usize, reason: String },

    #[error("hunk {hunk} does not match the target content")]
    ContextMismatch { hunk: usize },
}

/// One line inside a hunk body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchLine {
    Context(String),
    Remove(String),
    Add(String),
}

/// A single `@@` hunk. Starts are 1-based line numbers as written in the
/// hunk header; a zero length marks a pure insertion/deletion range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hunk {
    pub old_start: usize,
    pub old_len: usize,
    pub new_start: usize,
    pub new_len: usize,
    pub lines: Vec<PatchLine>,
}

impl Hunk {
    /// The pre-image line sequence this hunk expects (context + removals).
    fn old_lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().filter_map(|l| match l {
            PatchLine::Context(s) | PatchLine::Remove(s) => Some(s.as_str()),
            PatchLine::Add(_) => None,
        })
    }

    /// Number of pre-image lines consumed by this hunk.
    fn old_count(&self) -> usize {
        self.old_lines().count()
    }

    /// 0-based position in the pre-image where this hunk claims to start.
    fn declared_position(&self) -> usize {
        // An empty old range addresses the line *after* which to insert.
        if self.old_len == 0 {
            self.old_start
        } else {
            self.old_start.saturating_sub(1)
        }
    }

    /// Whether the pre-image matches this hunk at `pos`.
    fn matches_at(&self, input: &[&str], pos: usize) -> bool {
        let mut idx = pos;
        for expected in self.old_lines() {
            match input.get(idx) {
                Some(actual) if *actual == expected => idx += 1,
                _ => return false,
            }
        }
        true
    }
}

/// A parsed unified diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Patch {
    pub hunks: Vec<Hunk>,
}

impl Patch {
    /// Parse a unified diff. File headers and `diff`/`index` preamble lines
    /// are skipped; hunk bodies are validated against their declared ranges.
    pub fn parse(text: &str) -> Result<Self, DiffError> {
        let mut hunks = Vec::new();
        let mut lines = text.lines().enumerate().peekable();

        while let Some((line_no, line)) = lines.next() {
            if !line.starts_with("@@") {
                continue;
            }

            let (old_start, old_len, new_start, new_len) = parse_hunk_header(line, line_no + 1)?;
            let mut body = Vec::new();
            let mut old_seen = 0usize;
            let mut new_seen = 0usize;

            while old_seen < old_len || new_seen < new_len {
                let (body_no, raw) = lines.next().ok_or(DiffError::Malformed {
                    line: line_no + 1,
                    reason: "hunk body shorter than declared range".to_string(),
                })?;

                if let Some(rest) = raw.strip_prefix('+') {
                    new_seen += 1;
                    body.push(PatchLine::Add(rest.to_string()));
                } else if let Some(rest) = raw.strip_prefix('-') {
                    old_seen += 1;
                    body.push(PatchLine::Remove(rest.to_string()));
                } else if raw.starts_with('\\') {
                    // "\ No newline at end of file" markers carry no content.
                    continue;
                } else if let Some(rest) = raw.strip_prefix(' ') {
                    old_seen += 1;
                    new_seen += 1;
                    body.push(PatchLine::Context(rest.to_string()));
                } else if raw.is_empty() {
                    // Some producers emit empty context lines without the
                    // leading space.
                    old_seen += 1;
                    new_seen += 1;
                    body.push(PatchLine::Context(String::new()));
                } else {
                    return Err(DiffError::Malformed {
                        line: body_no + 1,
                        reason: format!("unexpected hunk line prefix: {raw:?}"),
                    });
                }
            }

            // Swallow a trailing no-newline marker belonging to this hunk.
            if let Some((_, peeked)) = lines.peek() {
                if peeked.starts_with('\\') {
                    lines.next();
                }
            }

            hunks.push(Hunk {
                old_start,
                old_len,
                new_start,
                new_len,
                lines: body,
            });
        }

        if hunks.is_empty() {
            return Err(DiffError::Malformed {
                line: 1,
                reason: "no hunks found".to_string(),
            });
        }

        Ok(Patch { hunks })
    }

    /// The reverse patch: applying it undoes this patch.
    pub fn invert(&self) -> Patch {
        Patch {
            hunks: self
                .hunks
                .iter()
                .map(|h| Hunk {
                    old_start: h.new_start,
                    old_len: h.new_len,
                    new_start: h.old_start,
                    new_len: h.old_len,
                    lines: h
                        .lines
                        .iter()
                        .map(|l| match l {
                            PatchLine::Context(s) => PatchLine::Context(s.clone()),
                            PatchLine::Remove(s) => PatchLine::Add(s.clone()),
                            PatchLine::Add(s) => PatchLine::Remove(s.clone()),
                        })
                        .collect(),
                })
                .collect(),
        }
    }

    /// Apply the patch to `input`, returning the patched content.
    ///
    /// The whole result is computed in memory; nothing is written here, so a
    /// context mismatch leaves callers free to keep the original untouched.
    pub fn apply(&self, input: &str) -> Result<String, DiffError> {
        let had_trailing_newline = input.ends_with('\n') || input.is_empty();
        let input_lines: Vec<&str> = input.lines().collect();

        let mut output: Vec<String> = Vec::new();
        let mut cursor = 0usize;

        for (hunk_no, hunk) in self.hunks.iter().enumerate() {
            let declared = hunk.declared_position();
            let pos = if declared >= cursor
                && declared <= input_lines.len()
                && hunk.matches_at(&input_lines, declared)
            {
                declared
            } else {
                find_match(hunk, &input_lines, cursor)
                    .ok_or(DiffError::ContextMismatch { hunk: hunk_no + 1 })?
            };

            output.extend(input_lines[cursor..pos].iter().map(|s| s.to_string()));
            cursor = pos;

            for line in &hunk.lines {
                match line {
                    PatchLine::Context(s) => {
                        output.push(s.clone());
                        cursor += 1;
                    }
                    PatchLine::Remove(_) => cursor += 1,
                    PatchLine::Add(s) => output.push(s.clone()),
                }
            }
        }

        output.extend(input_lines[cursor..].iter().map(|s| s.to_string()));

        let mut result = output.join("\n");
        if had_trailing_newline && !result.is_empty() {
            result.push('\n');
        }
        Ok(result)
    }
}

/// Scan forward from `from` for the first position where the hunk matches.
fn find_match(hunk: &Hunk, input: &[&str], from: usize) -> Option<usize> {
    let needed = hunk.old_count();
    if needed == 0 {
        return None;
    }
    (from..input.len().saturating_sub(needed - 1)).find(|&pos| hunk.matches_at(input, pos))
}

/// Parse `@@ -a[,b] +c[,d] @@`.
fn parse_hunk_header(line: &str, line_no: usize) -> Result<(usize, usize, usize, usize), DiffError> {
    let malformed = |reason: &str| DiffError::Malformed {
        line: line_no,
        reason: reason.to_string(),
    };

    let inner = line
        .trim_start_matches('@')
        .trim_end_matches(|c| c != '@')
        .trim_matches('@')
        .trim();

    let mut parts = inner.split_whitespace();
    let old = parts
        .next()
        .and_then(|p| p.strip_prefix('-'))
        .ok_or_else(|| malformed("missing old range"))?;
    let new = parts
        .next()
        .and_then(|p| p.strip_prefix('+'))
        .ok_or_else(|| malformed("missing new range"))?;

    let parse_range = |range: &str| -> Result<(usize, usize), DiffError> {
        match range.split_once(',') {
            Some((start, len)) => Ok((
                start.parse().map_err(|_| malformed("bad range start"))?,
                len.parse().map_err(|_| malformed("bad range length"))?,
            )),
            None => Ok((range.parse().map_err(|_| malformed("bad range start"))?, 1)),
        }
    };

    let (old_start, old_len) = parse_range(old)?;
    let (new_start, new_len) = parse_range(new)?;
    Ok((old_start, old_len, new_start, new_len))
}
