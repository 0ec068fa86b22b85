use sha2::Digest;
use std::path::Path;

pub fn display_path(path: &Path, base: Option<&Path>) -> String {
    if let Some(base) = base {
        if let Ok(relative) = path.strip_prefix(base) {
            return relative.display().to_string();
        }
    }
    path.display().to_string()
}

pub fn truncate_bytes(bytes: &[u8], max_bytes: usize) -> String {
    let text = String::from_utf8_lossy(bytes);
    truncate_string(&text, max_bytes)
}

pub fn truncate_string(text: &str, max_bytes: usize) -> String {
    if text.len() <= max_bytes {
        return text.to_string();
    }
    let mut truncated = String::new();
    for ch in text.chars() {
        if truncated.len() + ch.len_utf8() > max_bytes {
            break;
        }
        truncated.push(ch);
    }
    truncated
}

/// Keep at most `max_lines` lines and `max_bytes` bytes, marking truncation.
pub fn bounded_snippet(text: &str, max_lines: usize, max_bytes: usize) -> String {
    let marker = "\n[... output truncated ...]\n";
    if max_lines == 0 || max_bytes == 0 {
        return String::new();
    }
    let mut out = String::new();
    let mut truncated = false;

    for (line_idx, chunk) in text.split_inclusive('\n').enumerate() {
        if line_idx >= max_lines {
            truncated = true;
            break;
        }
        if out.len() + chunk.len() > max_bytes {
            let remaining = max_bytes.saturating_sub(out.len());
            out.push_str(&truncate_string(chunk, remaining));
            truncated = true;
            break;
        }
        out.push_str(chunk);
    }

    if truncated {
        if max_bytes <= marker.len() {
            return truncate_string(marker, max_bytes);
        }
        let available = max_bytes - marker.len();
        if out.len() > available {
            out = truncate_string(&out, available);
        }
        out.push_str(marker);
    }

    out
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = sha2::Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Lowercase, `_`-separated, alphanumeric-only name usable as a path segment.
pub fn sanitize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for ch in name.trim().chars() {
        match ch {
            ' ' | '-' | '_' => out.push('_'),
            ch if ch.is_ascii_alphanumeric() => out.push(ch.to_ascii_lowercase()),
            _ => {}
        }
    }
    out
}

/// Turn `snake_case_name` into `Snake Case Name` for headings.
pub fn title_case(name: &str) -> String {
    name.split(['_', ' '])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn format_command_line(program: &str, argv: &[String]) -> String {
    let mut parts = Vec::with_capacity(argv.len() + 1);
    parts.push(shell_quote(program));
    for arg in argv {
        parts.push(shell_quote(arg));
    }
    parts.join(" ")
}

pub fn shell_quote(arg: &str) -> String {
    if arg.is_empty() {
        return "''".to_string();
    }
    let safe = arg.chars().all(|ch| {
        matches!(
            ch,
            'a'..='z'
                | 'A'..='Z'
                | '0'..='9'
                | '_'
                | '-'
                | '.'
                | '/'
                | ':'
                | '@'
                | '+'
                | '='
        )
    });
    if safe {
        return arg.to_string();
    }
    let escaped = arg.replace('\'', "'\"'\"'");
    format!("'{escaped}'")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_name_drops_punctuation() {
        assert_eq!(sanitize_name("Data Types & Basics"), "data_types__basics");
        assert_eq!(sanitize_name("ch01-intro"), "ch01_intro");
    }

    #[test]
    fn title_case_splits_underscores() {
        assert_eq!(title_case("basic_addition"), "Basic Addition");
        assert_eq!(title_case("x"), "X");
    }

    #[test]
    fn shell_quote_wraps_unsafe_args() {
        assert_eq!(shell_quote("--pretty=2"), "--pretty=2");
        assert_eq!(shell_quote("a b"), "'a b'");
        assert_eq!(shell_quote("it's"), "'it'\"'\"'s'");
        assert_eq!(
            format_command_line("engine", &["script.json".to_string()]),
            "engine script.json"
        );
    }

    #[test]
    fn bounded_snippet_marks_truncation() {
        let text = "one\ntwo\nthree\n";
        assert_eq!(bounded_snippet(text, 10, 1024), text);
        let cut = bounded_snippet(text, 1, 1024);
        assert!(cut.starts_with("one\n"));
        assert!(cut.contains("output truncated"));
    }
}
