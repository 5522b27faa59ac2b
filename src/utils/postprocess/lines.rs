use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref LIST_MARKER_RE: Regex = Regex::new(r"^\s*(?:[-*•]|\d+[.)])(?:\s+|$)").unwrap();
}

/// Turn a model's list reply into items: one per non-empty line, list markers and surrounding quotes removed,
/// at most `max_items` kept.
pub fn parse_list(reply: &str, max_items: usize) -> Vec<String> {
    reply
        .lines()
        .map(|line| {
            let line = LIST_MARKER_RE.replace(line, "");
            line.trim().trim_matches(|c| c == '"' || c == '\'').trim().to_string()
        })
        .filter(|item| !item.is_empty())
        .take(max_items)
        .collect()
}

/// Number of whitespace separated words.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

#[cfg(test)]
mod test_lines {
    use super::{parse_list, word_count};

    #[test]
    fn test_parse_list() {
        let reply = "1. \"benefits of exercise\"\n\n- exercise and sleep\n* 'cardio vs strength'\n2) fourth\n";
        assert_eq!(vec!["benefits of exercise", "exercise and sleep", "cardio vs strength"], parse_list(reply, 3));
        assert!(parse_list("  \n\n", 3).is_empty());
        assert_eq!(vec!["2024 trends"], parse_list("2024 trends", 3));
        // a marker needs whitespace after it
        assert_eq!(vec!["3.5 million people affected by insomnia", "1.5 hours of exercise per week benefits"],
                   parse_list("3.5 million people affected by insomnia\n1.5 hours of exercise per week benefits", 3));
        assert_eq!(vec!["-5 degrees at night"], parse_list("-\n-5 degrees at night", 3));
    }

    #[test]
    fn test_word_count() {
        assert_eq!(0, word_count("   "));
        assert_eq!(4, word_count("one two\nthree\tfour"));
    }
}
