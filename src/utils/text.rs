//! Text sanitization for API-supplied strings.

use scraper::Html;
use url::Url;

/// Remove every HTML tag, keeping the text content.
///
/// `<script>` and `<style>` bodies are dropped along with their tags.
pub fn strip_html(input: &str) -> String {
    if !input.contains('<') {
        return input.to_string();
    }

    let fragment = Html::parse_fragment(input);
    let mut out = String::with_capacity(input.len());
    for node in fragment.root_element().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let inside_raw = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .is_some_and(|e| matches!(e.name(), "script" | "style"))
        });
        if !inside_raw {
            out.push_str(text);
        }
    }
    out
}

/// Single-line field: tags stripped, whitespace collapsed, trimmed.
pub fn sanitize_text(input: &str) -> String {
    strip_html(input)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Multi-line field: tags stripped, line breaks kept, each line tidied.
pub fn sanitize_textarea(input: &str) -> String {
    strip_html(input)
        .lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Keep a URL only when it parses as an absolute http(s) URL.
pub fn valid_url(input: &str) -> String {
    match Url::parse(input.trim()) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => url.to_string(),
        _ => String::new(),
    }
}

/// Length in Unicode scalar values.
pub fn char_len(input: &str) -> usize {
    input.chars().count()
}
