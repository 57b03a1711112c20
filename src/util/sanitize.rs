//! Unit name sanitizing.

use rand::distributions::Alphanumeric;
use rand::Rng;

/// Make a string usable as an EDL unit (directory) name.
///
/// Non-printable and non-ASCII characters are dropped, path separators become
/// underscores and colons are removed. If nothing is left, a random
/// four-character name is generated. Returns `None` for an empty input.
pub fn sanitize_name(name: &str) -> Option<String> {
    if name.is_empty() {
        return None;
    }

    let mut s = String::with_capacity(name.len());
    for c in name.chars() {
        if !is_printable(c) {
            continue;
        }
        match c {
            '/' | '\\' => s.push('_'),
            ':' => {}
            _ => s.push(c),
        }
    }

    if s.is_empty() {
        s = random_name(4);
    }
    Some(s)
}

/// Printable ASCII including whitespace.
#[inline]
fn is_printable(c: char) -> bool {
    c.is_ascii_graphic() || matches!(c, ' ' | '\t' | '\n' | '\r' | '\x0b' | '\x0c')
}

fn random_name(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .map(|b| (b as char).to_ascii_uppercase())
        .take(len)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_plain() {
        assert_eq!(sanitize_name("miniscope").as_deref(), Some("miniscope"));
        assert_eq!(sanitize_name("intan signals").as_deref(), Some("intan signals"));
    }

    #[test]
    fn test_sanitize_separators() {
        assert_eq!(sanitize_name("a/b\\c").as_deref(), Some("a_b_c"));
        assert_eq!(sanitize_name("C:data").as_deref(), Some("Cdata"));
    }

    #[test]
    fn test_sanitize_non_ascii() {
        assert_eq!(sanitize_name("mäuse").as_deref(), Some("muse"));
    }

    #[test]
    fn test_sanitize_empty() {
        assert_eq!(sanitize_name(""), None);

        let generated = sanitize_name("ööö").unwrap();
        assert_eq!(generated.len(), 4);
        assert!(generated.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    }
}
