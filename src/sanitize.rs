//! Cleans raw model output into a presentable chat reply.
//!
//! Small instruct models leak chat-turn structure into their completions:
//! extra `User:`/`Assistant:` turns, instruction-tuning section headers,
//! scraped forum metadata. Everything here is a pure string transform so the
//! same pass can sit behind every provider.

/// Markers that end the reply. Text at and after the earliest occurrence of
/// any of these is discarded.
pub const STOP_SEQS: &[&str] = &[
    "\nUser:",
    "\nAssistant:",
    "\n###",
    "\nInstruction:",
    "\nResponse:",
    "Customer:",
    "Associate:",
];

/// Lines starting with any of these (after trimming) are dropped wholesale.
const BAD_PREFIXES: &[&str] = &[
    "### Instruction:",
    "### Response:",
    "Instruction:",
    "Response:",
    "User:",
    "Assistant:",
    "Customer:",
    "Associate:",
    "Submitted by:",
    "Date Posted:",
];

/// Strip model artifacts from raw generated text.
///
/// 1. Truncate at the earliest stop marker.
/// 2. Drop blank lines and boilerplate-prefixed lines.
/// 3. Collapse adjacent duplicate lines (non-adjacent repeats survive).
/// 4. Rejoin and trim.
///
/// Empty input passes through unchanged. Deterministic, no side effects.
pub fn clean(raw: &str) -> String {
    if raw.is_empty() {
        return raw.to_string();
    }

    let mut cut = raw.len();
    for stop in STOP_SEQS {
        if let Some(i) = raw.find(stop) {
            cut = cut.min(i);
        }
    }
    let truncated = &raw[..cut];

    let mut kept: Vec<&str> = Vec::new();
    for line in truncated.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if BAD_PREFIXES.iter().any(|p| trimmed.starts_with(p)) {
            continue;
        }
        // Adjacent-duplicate collapse only — a repeated bullet further down
        // may be legitimate content.
        if kept.last() == Some(&line) {
            continue;
        }
        kept.push(line);
    }

    kept.join("\n").trim().to_string()
}
