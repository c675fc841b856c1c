//! Paragraph text normalisation.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html};

/// Known tags or entities mark a fragment as markup. Anything else is plain
/// text, where a bare `<` is just a character.
static MARKUP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)</?(?:p|br|b|i|u|em|strong|span|div|a|ul|ol|li|h[1-6]|code|pre|blockquote|section|article|table|thead|tbody|tr|td|th|hr)(?:\s[^<>]*)?/?>|&(?:#[0-9]{1,7}|#x[0-9a-f]{1,6}|[a-z][a-z0-9]{1,31});",
    )
    .expect("MARKUP_RE should compile")
});
static BREAK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>").expect("BREAK_RE should compile"));

/// Protection-page residue that sometimes overlaps the description selector.
static DENYLIST: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)\bray id\b",
        r"(?i)\bcloudflare ray\b",
        r"Your IP:",
        r"(?i)performance (?:&|&amp;) security by",
        r"(?i)checking if the site connection is secure",
        r"(?i)enable javascript and cookies to continue",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("denylist pattern should compile"))
    .collect()
});

pub fn looks_like_markup(fragment: &str) -> bool {
    MARKUP_RE.is_match(fragment)
}

/// Text content of a raw HTML fragment. Plain text passes through untouched.
pub fn strip_markup(fragment: &str) -> String {
    if !looks_like_markup(fragment) {
        return fragment.to_string();
    }
    let with_breaks = BREAK_RE.replace_all(fragment, "\n");
    Html::parse_fragment(&with_breaks)
        .root_element()
        .text()
        .collect::<String>()
        .replace('\u{a0}', " ")
}

/// Structural text of a DOM node.
pub fn node_text(node: &ElementRef<'_>) -> String {
    node.text().collect::<String>()
}

pub fn is_denylisted(paragraph: &str) -> bool {
    DENYLIST.iter().any(|re| re.is_match(paragraph))
}

/// Trim, drop blanks and challenge residue. Order and duplicates are kept.
pub fn clean_paragraphs<I, S>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    raw.into_iter()
        .map(|p| p.as_ref().trim().to_string())
        .filter(|p| !p.is_empty())
        .filter(|p| !is_denylisted(p))
        .collect()
}

/// Cleaning for raw HTML fragments: markup is removed before the usual pass.
pub fn clean_fragments<I, S>(fragments: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    clean_paragraphs(fragments.into_iter().map(|f| strip_markup(f.as_ref())))
}
