use crate::domain::posts::ContentSection;

pub const WORDS_PER_MINUTE: usize = 200;

/// Number of whitespace-delimited tokens in `text`.
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Estimated minutes needed to read `content`, rounded up.
pub fn estimate_reading_minutes(content: &[ContentSection]) -> u32 {
    let total: usize = content
        .iter()
        .map(|section| {
            count_words(&section.heading)
                + section
                    .body
                    .iter()
                    .map(|node| count_words(&node.text))
                    .sum::<usize>()
        })
        .sum();

    u32::try_from(total.div_ceil(WORDS_PER_MINUTE)).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::rich_text::RichTextNode;

    fn section(heading: &str, body: &[&str]) -> ContentSection {
        ContentSection {
            heading: heading.to_string(),
            body: body.iter().map(|text| RichTextNode::paragraph(*text)).collect(),
        }
    }

    fn words(count: usize) -> String {
        vec!["word"; count].join(" ")
    }

    #[test]
    fn empty_content_takes_zero_minutes() {
        assert_eq!(estimate_reading_minutes(&[]), 0);
    }

    #[test]
    fn content_without_tokens_takes_zero_minutes() {
        assert_eq!(estimate_reading_minutes(&[section("  ", &["", "\n\t"])]), 0);
    }

    #[test]
    fn heading_and_body_tokens_are_counted() {
        assert_eq!(estimate_reading_minutes(&[section("A B", &["C D E"])]), 1);
    }

    #[test]
    fn exact_multiple_does_not_round_up() {
        let content = vec![section("", &[&words(150)]), section("", &[&words(250)])];
        assert_eq!(estimate_reading_minutes(&content), 2);
    }

    #[test]
    fn any_remainder_rounds_up() {
        let content = vec![section("one", &[&words(400)])];
        assert_eq!(estimate_reading_minutes(&content), 3);
    }

    #[test]
    fn runs_of_whitespace_count_as_one_separator() {
        assert_eq!(count_words("  alpha \n\n beta\t\tgamma  "), 3);
    }

    #[test]
    fn tokens_in_adjacent_nodes_are_not_merged() {
        // Joined without a separator these would read as one word and one minute.
        let nodes = vec!["w"; 201];
        assert_eq!(estimate_reading_minutes(&[section("", &nodes)]), 2);
    }
}
