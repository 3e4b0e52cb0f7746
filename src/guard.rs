//! Meal-suggestion sanity guard.
//!
//! A single hard-coded policy for one topic: when a food-related prompt gets
//! a reply that still carries generation artifacts after sanitizing, serve a
//! canned meal answer instead. This is a deliberate substitution, not an
//! error path — the caller never sees the derailed text.

/// Markers that only show up when generation went off the rails: leaked
/// dialogue roles, forum-post metadata, filesystem paths, instruction-tuning
/// section headers.
const BAD_MARKERS: &[&str] = &[
    "Customer:",
    "Associate:",
    "Submitted by:",
    "Date Posted:",
    "C:\\",
    "/usr/",
    "Instruction:",
    "###",
];

/// Prompt keywords that put a request in meal territory. Case-insensitive
/// substring match — "Dinner ideas?" and "what should I EAT" both count.
const FOOD_KEYWORDS: &[&str] = &[
    "hungry",
    "eat",
    "food",
    "meal",
    "dinner",
    "lunch",
    "breakfast",
];

/// Heuristic: does this reply look malformed or off-track?
///
/// Anything under 20 characters is too short to be a real answer. Artifact
/// markers and email-style `Re: [` reply headers mean the model regurgitated
/// scraped data instead of answering.
///
/// Length is counted in characters, not bytes — the system prompt asks for
/// emoji bullets, so multibyte replies are the norm here.
pub fn looks_derailed(text: &str) -> bool {
    if text.chars().count() < 20 {
        return true;
    }
    if BAD_MARKERS.iter().any(|m| text.contains(m)) {
        return true;
    }
    has_reply_header(text)
}

/// Does the prompt ask about food?
pub fn mentions_food(prompt: &str) -> bool {
    let lower = prompt.to_lowercase();
    FOOD_KEYWORDS.iter().any(|k| lower.contains(k))
}

/// Fixed meal answer: one clarifying question, then quick/budget/healthy.
pub fn meal_fallback() -> String {
    "Quick question: any dietary restrictions or cravings?\n\n\
     • ⚡ Quick: Scrambled eggs on toast with avocado + hot sauce.\n\
     • 💸 Budget: Beans & rice with sautéed frozen veggies and salsa.\n\
     • 🥗 Healthy: Greek yogurt bowl with berries, nuts, and honey."
        .to_string()
}

/// Case-insensitive match for `\bRe:\s*[` — the shape of a quoted email
/// subject line ("Re: [recipe request] ...").
fn has_reply_header(text: &str) -> bool {
    let lower = text.to_lowercase();
    let bytes = lower.as_bytes();
    let mut from = 0;
    while let Some(i) = lower[from..].find("re:") {
        let at = from + i;
        let boundary = at == 0 || {
            let prev = bytes[at - 1];
            !prev.is_ascii_alphanumeric() && prev != b'_'
        };
        if boundary && lower[at + 3..].trim_start().starts_with('[') {
            return true;
        }
        from = at + 3;
    }
    false
}
