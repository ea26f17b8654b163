use std::collections::HashSet;

/// Loose address shape check: `local@domain.tld` with no whitespace and a
/// single `@`. The domain needs a `.` with at least one character on each
/// side of it.
pub fn is_valid_address(candidate: &str) -> bool {
    if candidate.chars().any(char::is_whitespace) {
        return false;
    }

    let Some((local, domain)) = candidate.split_once('@') else {
        return false;
    };

    if local.is_empty() || domain.contains('@') {
        return false;
    }

    domain
        .char_indices()
        .any(|(idx, ch)| ch == '.' && idx > 0 && idx + 1 < domain.len())
}

/// Splits a recipient field on commas or newlines, keeping each well-formed
/// address once, in first-seen order.
pub fn parse_recipients(raw: &str) -> Vec<String> {
    let mut seen = HashSet::new();

    raw.split([',', '\n'])
        .map(str::trim)
        .filter(|candidate| is_valid_address(candidate))
        .filter(|candidate| seen.insert(*candidate))
        .map(str::to_string)
        .collect()
}

pub fn sanitize_subject(subject: &str, max_chars: usize) -> String {
    let collapsed = subject.split_whitespace().collect::<Vec<_>>().join(" ");
    truncate_chars(&collapsed, max_chars).trim_end().to_string()
}

pub fn sanitize_body(body: &str, max_chars: usize) -> String {
    let normalized = body.replace("\r\n", "\n").replace('\r', "\n");
    truncate_chars(normalized.trim(), max_chars).to_string()
}

fn truncate_chars(value: &str, max_chars: usize) -> &str {
    match value.char_indices().nth(max_chars) {
        Some((idx, _)) => &value[..idx],
        None => value,
    }
}
