//! Topic routing-key matching.

/// Returns true if the binding `pattern` matches `routing_key`.
///
/// Keys are dot-separated words. `*` matches exactly one word and `#`
/// matches zero or more words; a pattern without wildcards matches only
/// the identical key. This is how queues bind to the shared stream: the
/// invoice service binds `order.shipped` exactly, while a monitoring
/// queue could bind `order.#`.
pub fn matches(pattern: &str, routing_key: &str) -> bool {
    fn matches_segments(pattern: &[&str], key: &[&str]) -> bool {
        match pattern.split_first() {
            None => key.is_empty(),
            Some((&"#", rest)) => (0..=key.len()).any(|skip| matches_segments(rest, &key[skip..])),
            Some((&"*", rest)) => !key.is_empty() && matches_segments(rest, &key[1..]),
            Some((&word, rest)) => {
                key.first() == Some(&word) && matches_segments(rest, &key[1..])
            }
        }
    }

    let pattern: Vec<&str> = pattern.split('.').collect();
    let key: Vec<&str> = routing_key.split('.').collect();
    matches_segments(&pattern, &key)
}
