//! Deterministic cleanup of generated text before it is stored.
//!
//! One pass:
//! 1. keep only the first emoji
//! 2. strip stock engagement-bait phrases
//! 3. keep only the first three hashtags
//! 4. collapse runs of blank lines and trim
//!
//! Passes repeat until the text stops changing, which makes [`Sanitizer::sanitize`]
//! idempotent. Every step only deletes characters, so the loop terminates.

use regex::{Captures, Regex};

const EMOJI_PATTERN: &str = concat!(
    "[",
    r"\x{1F600}-\x{1F64F}",
    r"\x{1F300}-\x{1F5FF}",
    r"\x{1F680}-\x{1F6FF}",
    r"\x{1F1E0}-\x{1F1FF}",
    r"\x{2702}-\x{27B0}",
    r"\x{1F900}-\x{1F9FF}",
    r"\x{1FA00}-\x{1FA6F}",
    r"\x{1FA70}-\x{1FAFF}",
    r"\x{2600}-\x{26FF}",
    "]"
);

const BANNED_PHRASES: [&str; 5] = [
    r"(?i)let that sink in\.?",
    r"(?i)read that again\.?",
    r"(?i)i'll say it louder for the people in the back\.?",
    r"(?i)agree\?",
    r"(?i)thoughts\?\s*$",
];

const HASHTAG_PATTERN: &str = r"#\w+";
const BLANK_RUN_PATTERN: &str = r"\n{3,}";

pub const MAX_EMOJI: usize = 1;
pub const MAX_HASHTAGS: usize = 3;

/// Post-processor for generated drafts
#[derive(Debug, Clone)]
pub struct Sanitizer {
    emoji: Regex,
    phrases: Vec<Regex>,
    hashtags: Regex,
    blank_runs: Regex,
}

impl Sanitizer {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            emoji: Regex::new(EMOJI_PATTERN)?,
            phrases: BANNED_PHRASES
                .iter()
                .map(|p| Regex::new(p))
                .collect::<Result<_, _>>()?,
            hashtags: Regex::new(HASHTAG_PATTERN)?,
            blank_runs: Regex::new(BLANK_RUN_PATTERN)?,
        })
    }

    /// Clean `text`; applying this to its own output changes nothing
    pub fn sanitize(&self, text: &str) -> String {
        let mut current = self.pass(text);
        loop {
            let next = self.pass(&current);
            if next == current {
                return current;
            }
            current = next;
        }
    }

    fn pass(&self, text: &str) -> String {
        let mut out = keep_first(&self.emoji, text, MAX_EMOJI);

        for phrase in &self.phrases {
            out = phrase.replace_all(&out, "").into_owned();
        }

        out = keep_first(&self.hashtags, &out, MAX_HASHTAGS);
        out = self.blank_runs.replace_all(&out, "\n\n").into_owned();
        out.trim().to_string()
    }
}

/// Remove every match of `re` after the first `keep`
fn keep_first(re: &Regex, text: &str, keep: usize) -> String {
    let mut seen = 0;
    re.replace_all(text, |caps: &Captures| {
        seen += 1;
        if seen <= keep {
            caps[0].to_string()
        } else {
            String::new()
        }
    })
    .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sanitize(text: &str) -> String {
        Sanitizer::new().unwrap().sanitize(text)
    }

    #[test]
    fn test_keeps_only_first_emoji() {
        assert_eq!(sanitize("Big news \u{1F680} for banks \u{1F4A5}\u{2705}"), "Big news \u{1F680} for banks");
    }

    #[test]
    fn test_strips_phrases_case_insensitively() {
        let out = sanitize("Payments just changed. Let That Sink In. Agree? Thoughts?");
        assert_eq!(out, "Payments just changed.");
    }

    #[test]
    fn test_thoughts_only_stripped_at_end() {
        let out = sanitize("Thoughts? on rails are welcome\n\nMore soon");
        assert!(out.starts_with("Thoughts?"));
    }

    #[test]
    fn test_keeps_first_three_hashtags() {
        let out = sanitize("Text #fintech #payments #ai #banking #defi");
        assert_eq!(out, "Text #fintech #payments #ai");
    }

    #[test]
    fn test_collapses_blank_runs() {
        assert_eq!(sanitize("\n\nOne\n\n\n\n\nTwo\n\n"), "One\n\nTwo");
    }

    #[test]
    fn test_is_idempotent() {
        let s = Sanitizer::new().unwrap();
        let inputs = [
            "Read that again. \u{1F4A1}\u{1F4A1}\n\n\n\n#a #b #c #d\nThoughts?",
            "agree?agree?? ok",
            "Plain text without anything to remove",
        ];

        for input in inputs {
            let once = s.sanitize(input);
            assert_eq!(s.sanitize(&once), once);
        }
    }
}
