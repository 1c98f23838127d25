//! Chat history normalization.
//!
//! Turns raw `(human, ai)` turns, which may carry HTML from the chat UI,
//! into plain-text chat messages.

use regex::Regex;
use studyqa_core::{AppError, AppResult};
use studyqa_llm::ChatMessage;

/// Strips markup from chat turns.
///
/// Regexes are compiled once; `normalize` itself does no I/O.
#[derive(Debug, Clone)]
pub struct HistoryNormalizer {
    comment: Regex,
    script: Regex,
    style: Regex,
    tag: Regex,
}

impl HistoryNormalizer {
    pub fn new() -> AppResult<Self> {
        Ok(Self {
            comment: compile(r"(?s)<!--.*?-->")?,
            script: compile(r"(?is)<script\b[^>]*>.*?</script\s*>")?,
            style: compile(r"(?is)<style\b[^>]*>.*?</style\s*>")?,
            tag: compile(r"<[/!?]?[A-Za-z][^>]*>")?,
        })
    }

    /// Flatten turns into alternating human/assistant messages.
    pub fn normalize(&self, chat_history: &[(String, String)]) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(chat_history.len() * 2);
        for (human, ai) in chat_history {
            messages.push(ChatMessage::human(self.to_plain_text(human)));
            messages.push(ChatMessage::assistant(self.to_plain_text(ai)));
        }
        messages
    }

    /// Text content of an HTML fragment.
    pub fn to_plain_text(&self, raw: &str) -> String {
        if !raw.contains('<') && !raw.contains('&') {
            return raw.to_string();
        }

        let text = self.comment.replace_all(raw, "");
        let text = self.script.replace_all(&text, "");
        let text = self.style.replace_all(&text, "");
        let text = self.tag.replace_all(&text, "");

        // entities last so decoded "<" is never taken for a tag
        htmlize::unescape(text).into_owned()
    }
}

fn compile(pattern: &str) -> AppResult<Regex> {
    Regex::new(pattern).map_err(|e| AppError::Other(format!("Invalid sanitizer pattern: {}", e)))
}

/// Render messages as a `Role: content` transcript, one message per line.
pub fn to_transcript(messages: &[ChatMessage]) -> String {
    messages
        .iter()
        .map(|m| format!("{}: {}", m.role.transcript_label(), m.content))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use studyqa_llm::ChatRole;

    fn turns(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(h, a)| (h.to_string(), a.to_string()))
            .collect()
    }

    #[test]
    fn test_strips_simple_markup() {
        let n = HistoryNormalizer::new().unwrap();
        assert_eq!(n.to_plain_text("<b>What is AFib?</b>"), "What is AFib?");
    }

    #[test]
    fn test_drops_script_style_and_comments() {
        let n = HistoryNormalizer::new().unwrap();
        let raw = "<p>Hi<!-- note --></p><script>alert('x')</script><STYLE>p{}</STYLE> there";
        assert_eq!(n.to_plain_text(raw), "Hi there");
    }

    #[test]
    fn test_decodes_entities_after_tag_removal() {
        let n = HistoryNormalizer::new().unwrap();
        assert_eq!(
            n.to_plain_text("a &lt;b&gt; &amp; &#39;c&#39; &#x41;&nbsp;d &unknown;"),
            "a <b> & 'c' A\u{a0}d &unknown;"
        );
    }

    #[test]
    fn test_decodes_rich_text_entities() {
        let n = HistoryNormalizer::new().unwrap();
        assert_eq!(
            n.to_plain_text("<p>It&rsquo;s CCAF &mdash; &copy; 2020 &amp more</p>"),
            "It\u{2019}s CCAF \u{2014} \u{a9} 2020 & more"
        );
    }

    #[test]
    fn test_bare_angle_bracket_kept() {
        let n = HistoryNormalizer::new().unwrap();
        assert_eq!(n.to_plain_text("p < 0.05"), "p < 0.05");
    }

    #[test]
    fn test_whitespace_preserved() {
        let n = HistoryNormalizer::new().unwrap();
        assert_eq!(n.to_plain_text("<p>one</p>\n<p>two  three</p>"), "one\ntwo  three");
    }

    #[test]
    fn test_normalize_alternates_roles() {
        let n = HistoryNormalizer::new().unwrap();
        let messages = n.normalize(&turns(&[("<i>hi</i>", "hello"), ("", "")]));

        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0], ChatMessage::human("hi"));
        assert_eq!(messages[1], ChatMessage::assistant("hello"));
        assert_eq!(messages[2].role, ChatRole::Human);
        assert_eq!(messages[3].content, "");
    }

    #[test]
    fn test_empty_history() {
        let n = HistoryNormalizer::new().unwrap();
        assert!(n.normalize(&[]).is_empty());
    }

    #[test]
    fn test_transcript() {
        let messages = vec![ChatMessage::human("hi"), ChatMessage::assistant("hello")];
        assert_eq!(to_transcript(&messages), "Human: hi\nAssistant: hello");
    }
}
