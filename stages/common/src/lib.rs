//! Pure built-in transforms shared by the stage cdylib crates.
//!
//! Every function here has the shape the pipeline requires of a stage
//! transform: `fn(&str) -> Option<String>`, `None` signalling failure (see
//! spec §4.3 and §4.6). None of the data transforms below can actually fail;
//! `logger` and `typewriter` are observational identity transforms kept for
//! parity with the original plugin set.

/// ASCII-uppercases `a..z`; every other byte, including non-ASCII scalar
/// values, passes through unchanged.
pub fn uppercase(input: &str) -> Option<String> {
    Some(input.to_ascii_uppercase())
}

/// Reverses the string by Unicode scalar value (not by byte, so multi-byte
/// characters survive intact).
pub fn reverse(input: &str) -> Option<String> {
    Some(input.chars().rev().collect())
}

/// Inserts a single ASCII space between every pair of adjacent characters.
/// The empty string maps to itself.
pub fn expand(input: &str) -> Option<String> {
    let mut out = String::with_capacity(input.len() * 2);
    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        out.push(c);
        if chars.peek().is_some() {
            out.push(' ');
        }
    }
    Some(out)
}

/// Right-rotates the string by one character position (`"abc"` -> `"cab"`).
/// The empty string and single-character strings are returned unchanged.
pub fn rotate(input: &str) -> Option<String> {
    let mut chars: Vec<char> = input.chars().collect();
    if chars.len() > 1 {
        let last = chars.pop().expect("len > 1");
        chars.insert(0, last);
    }
    Some(chars.into_iter().collect())
}

/// Identity transform that logs its input at `info` level, tagged with the
/// given stage name.
pub fn logger(stage_name: &str, input: &str) -> Option<String> {
    log::info!("[{stage_name}] {input}");
    Some(input.to_string())
}

/// Identity transform that logs each character at `debug` level with a
/// delay between characters, then passes the string through unchanged.
///
/// `delay` is a constructor parameter rather than an environment variable
/// read inside this crate (see spec §7, "Configuration"): the cdylib that
/// wires this up to the ABI reads its own environment variable once, at
/// construction time, and bakes the resulting duration in here.
pub fn typewriter(stage_name: &str, delay: std::time::Duration, input: &str) -> Option<String> {
    for c in input.chars() {
        std::thread::sleep(delay);
        log::debug!("[{stage_name}] {c}");
    }
    Some(input.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uppercase_ascii_only() {
        assert_eq!(uppercase("Hello, World!").unwrap(), "HELLO, WORLD!");
    }

    #[test]
    fn uppercase_leaves_non_ascii_untouched() {
        assert_eq!(uppercase("café").unwrap(), "CAFé");
    }

    #[test]
    fn reverse_ascii() {
        assert_eq!(reverse("abc").unwrap(), "cba");
    }

    #[test]
    fn reverse_preserves_multi_byte_scalars() {
        assert_eq!(reverse("héllo").unwrap(), "olléh");
    }

    #[test]
    fn reverse_empty_string() {
        assert_eq!(reverse("").unwrap(), "");
    }

    #[test]
    fn expand_inserts_single_spaces() {
        assert_eq!(expand("abc").unwrap(), "a b c");
    }

    #[test]
    fn expand_empty_string_is_empty() {
        assert_eq!(expand("").unwrap(), "");
    }

    #[test]
    fn expand_single_character_is_unchanged() {
        assert_eq!(expand("a").unwrap(), "a");
    }

    #[test]
    fn rotate_moves_last_character_to_front() {
        assert_eq!(rotate("abc").unwrap(), "cab");
    }

    #[test]
    fn rotate_single_character_is_unchanged() {
        assert_eq!(rotate("a").unwrap(), "a");
    }

    #[test]
    fn rotate_empty_string_is_unchanged() {
        assert_eq!(rotate("").unwrap(), "");
    }

    #[test]
    fn logger_passes_input_through() {
        assert_eq!(logger("logger", "hello").unwrap(), "hello");
    }

    #[test]
    fn typewriter_passes_input_through_with_no_delay() {
        let out = typewriter("typewriter", std::time::Duration::ZERO, "hi").unwrap();
        assert_eq!(out, "hi");
    }
}
