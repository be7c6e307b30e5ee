/// Extract `#hashtags` from notes text.
///
/// Rules:
/// - A tag starts with `#` at the start of the text or after whitespace/punctuation
///   that is not part of a word (so `issue#12` and URLs' `#fragment` are skipped).
/// - The body is letters, digits, `_`, `-` and `/`; it must contain a letter.
/// - Markdown headings (`# Title`) are not tags.
/// - Result is lowercased, deduplicated, first-seen order.
pub(crate) fn extract_hashtags(input: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        if chars[i] != '#' {
            i += 1;
            continue;
        }

        let boundary_before = i == 0 || {
            let prev = chars[i - 1];
            prev.is_whitespace() || matches!(prev, '(' | '[' | ',' | ';')
        };

        let start = i + 1;
        let mut end = start;
        while end < chars.len() && is_tag_char(chars[end]) {
            end += 1;
        }

        if boundary_before && end > start {
            let body: String = chars[start..end].iter().collect();
            let body = body.trim_end_matches(['-', '/']).to_lowercase();
            if body.chars().any(|c| c.is_alphabetic()) && !out.contains(&body) {
                out.push(body);
            }
        }

        i = end.max(i + 1);
    }

    out
}

fn is_tag_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '/')
}
