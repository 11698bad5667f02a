//! Decides whether a note's body carries indexable prose.

use std::sync::LazyLock;

use regex::Regex;

static FRONT_MATTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\A---\r?\n.*?\r?\n---").expect("front matter regex"));
static HTML_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("html comment regex"));
static PERCENT_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)%%.*?%%").expect("percent comment regex"));
static WIKI_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\[[^\]]*\]\]").expect("wiki link regex"));
static MARKDOWN_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[[^\]]*\]\([^)]*\)").expect("markdown link regex"));

/// Returns `true` when the note still contains alphanumeric content after
/// stripping front matter, comments, and bare link markup.
///
/// Notes that are pure scaffolding (a front matter block, a list of wiki
/// links) produce embeddings that match everything and nothing, so they are
/// skipped at ingestion.
#[must_use]
pub fn is_indexable(text: &str) -> bool {
    let stripped = FRONT_MATTER.replace(text, "");
    let stripped = HTML_COMMENT.replace_all(&stripped, "");
    let stripped = PERCENT_COMMENT.replace_all(&stripped, "");
    let stripped = WIKI_LINK.replace_all(&stripped, "");
    let stripped = MARKDOWN_LINK.replace_all(&stripped, "");
    stripped.chars().any(char::is_alphanumeric)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_prose_is_indexable() {
        assert!(is_indexable("Some actual note content about borrowing."));
    }

    #[test]
    fn empty_and_whitespace_are_not() {
        assert!(!is_indexable(""));
        assert!(!is_indexable("   \n\t "));
    }

    #[test]
    fn front_matter_only_is_not_indexable() {
        let text = "---\ntitle: Daily\ntags: [journal]\n---\n";
        assert!(!is_indexable(text));
    }

    #[test]
    fn front_matter_with_body_is_indexable() {
        let text = "---\ntitle: Daily\n---\nActual content here.";
        assert!(is_indexable(text));
    }

    #[test]
    fn wiki_links_only_are_not_indexable() {
        assert!(!is_indexable("[[Some Page]] [[Another Page]]\n"));
    }

    #[test]
    fn markdown_links_only_are_not_indexable() {
        assert!(!is_indexable("[label](https://example.com) [x](y)"));
    }

    #[test]
    fn html_and_percent_comments_stripped() {
        assert!(!is_indexable("<!-- todo: fill in --> %% private draft %%"));
        assert!(is_indexable("<!-- hidden --> visible text"));
    }

    #[test]
    fn punctuation_only_is_not_indexable() {
        assert!(!is_indexable("--- *** ###"));
    }

    #[test]
    fn front_matter_must_start_at_beginning() {
        // A horizontal rule mid-document is not front matter.
        let text = "intro\n---\nmore\n---\n";
        assert!(is_indexable(text));
    }
}
