/// Characters that are unsafe in a file name on at least one common filesystem
const UNSAFE_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Makes a single path segment safe to use as a file or directory name
///
/// Every unsafe character (`<>:"/\|?*` and control characters) becomes its own
/// `_`, so distinct names stay distinct. Surrounding whitespace is trimmed, and
/// an empty result becomes `_`.
///
/// # Examples
///
/// ```
/// use sumi_mirror::mirror::sanitize_segment;
///
/// assert_eq!(sanitize_segment("with/slash"), "with_slash");
/// assert_eq!(sanitize_segment("a:b"), "a_b");
/// assert_eq!(sanitize_segment("a::b"), "a__b");
/// assert_eq!(sanitize_segment("   spaced   "), "spaced");
/// assert_eq!(sanitize_segment(""), "_");
/// ```
pub fn sanitize_segment(segment: &str) -> String {
    let out: String = segment
        .chars()
        .map(|c| {
            if UNSAFE_CHARS.contains(&c) || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect();

    let trimmed = out.trim();
    if trimmed.is_empty() {
        "_".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_segment_unchanged() {
        assert_eq!(sanitize_segment("index.html"), "index.html");
        assert_eq!(sanitize_segment("a%20b"), "a%20b");
    }

    #[test]
    fn test_each_unsafe_char() {
        for c in UNSAFE_CHARS {
            let input = format!("a{}b", c);
            assert_eq!(sanitize_segment(&input), "a_b", "failed for {:?}", c);
        }
    }

    #[test]
    fn test_unsafe_run_replaced_per_char() {
        assert_eq!(sanitize_segment("a<>b"), "a__b");
        assert_eq!(sanitize_segment("<>:\"/\\|?*"), "_________");
        assert_ne!(sanitize_segment("a:b"), sanitize_segment("a::b"));
    }

    #[test]
    fn test_control_chars() {
        assert_eq!(sanitize_segment("a\tb\nc"), "a_b_c");
    }

    #[test]
    fn test_trim_and_empty() {
        assert_eq!(sanitize_segment("   spaced   "), "spaced");
        assert_eq!(sanitize_segment("   "), "_");
        assert_eq!(sanitize_segment(""), "_");
    }

    #[test]
    fn test_dot_segments_pass_through() {
        // containment is enforced by the mapper, not here
        assert_eq!(sanitize_segment(".."), "..");
    }
}
