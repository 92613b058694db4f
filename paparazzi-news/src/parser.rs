//! Parser for generated news listings
//!
//! The generation API is asked for one "Person - Description" pair per line.
//! Real responses are messy: numbered lists, alternate separators, citation
//! markers, missing lines. This is a lossy best-effort parse, not a grammar;
//! anything unrecognizable is dropped silently.

use paparazzi_core::NewsDraft;
use regex::Regex;

/// Hard cap on records accepted per category per refresh cycle
pub const MAX_ITEMS_PER_CYCLE: usize = 15;

/// In-band token separating headline from long-form body within one line
pub const BODY_SEPARATOR: &str = "<SEP>";

/// Minimum word count for a headline before we synthesize one from the body
const MIN_HEADLINE_WORDS: usize = 6;

/// Word budget for a synthesized headline
const SYNTH_HEADLINE_WORDS: usize = 10;

/// Parse generated text into up to [`MAX_ITEMS_PER_CYCLE`] news drafts.
///
/// A line matches if it has the form `[ordinal.] name <sep> description`
/// where `<sep>` is one of `- – — : |`. Zero matches is a valid outcome:
/// the caller skips the category for this cycle.
pub fn parse_news_lines(text: &str) -> Vec<NewsDraft> {
    let line_re = Regex::new(r"^(?:\d+[.)]\s*)?(.+?)\s*[-–—:|]\s*(.+)$")
        .expect("news line regex is valid");

    let mut drafts = Vec::new();
    for line in text.lines() {
        if drafts.len() >= MAX_ITEMS_PER_CYCLE {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Some(caps) = line_re.captures(line) else {
            continue;
        };
        let person_name = caps[1].trim().to_string();
        let description = caps[2].trim();
        if person_name.is_empty() || description.is_empty() {
            continue;
        }

        let draft = match description.split_once(BODY_SEPARATOR) {
            Some((head, body)) => {
                let head = strip_citations(head);
                let body = strip_citations(body);
                if body.is_empty() {
                    if head.is_empty() {
                        continue;
                    }
                    NewsDraft::new(person_name, head)
                } else {
                    let headline = if word_count(&head) < MIN_HEADLINE_WORDS {
                        synthesize_headline(&body)
                    } else {
                        head
                    };
                    NewsDraft::new(person_name, headline).with_body(body)
                }
            }
            None => {
                let headline = strip_citations(description);
                if headline.is_empty() {
                    continue;
                }
                NewsDraft::new(person_name, headline)
            }
        };
        drafts.push(draft);
    }
    drafts
}

/// Truncate at the first `[` to drop inline citation markers some
/// generation APIs append (e.g. `... new film[1][2]`)
fn strip_citations(text: &str) -> String {
    match text.find('[') {
        Some(idx) => text[..idx].trim().to_string(),
        None => text.trim().to_string(),
    }
}

fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// A too-short headline gets replaced by the first ~10 words of the body
fn synthesize_headline(body: &str) -> String {
    let words: Vec<&str> = body.split_whitespace().collect();
    if words.len() <= SYNTH_HEADLINE_WORDS {
        return words.join(" ");
    }
    format!("{}...", words[..SYNTH_HEADLINE_WORDS].join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_dash_separated_lines() {
        let text = "Shah Rukh Khan - Announces new project\nDeepika Padukone - Wins award";
        let drafts = parse_news_lines(text);
        assert_eq!(drafts.len(), 2);
        assert_eq!(drafts[0].person_name, "Shah Rukh Khan");
        assert_eq!(drafts[0].news_text, "Announces new project");
        assert_eq!(drafts[1].news_text, "Wins award");
        assert_eq!(
            drafts[0].search_query,
            "Shah Rukh Khan Announces new project"
        );
    }

    #[test]
    fn test_accepts_ordinals_and_alternate_separators() {
        let text = "1. Taylor Swift – Drops surprise single\n\
                    2) Hina Khan: Returns to popular show\n\
                    Zendaya | Confirmed for sequel";
        let drafts = parse_news_lines(text);
        assert_eq!(drafts.len(), 3);
        assert_eq!(drafts[0].person_name, "Taylor Swift");
        assert_eq!(drafts[1].person_name, "Hina Khan");
        assert_eq!(drafts[2].news_text, "Confirmed for sequel");
    }

    #[test]
    fn test_drops_lines_without_separator() {
        let text = "Here are the latest updates\nNo separator in this line at all";
        assert!(parse_news_lines(text).is_empty());
    }

    #[test]
    fn test_caps_at_fifteen_records() {
        let text = (0..30)
            .map(|i| format!("Person {} - Did something notable today", i))
            .collect::<Vec<_>>()
            .join("\n");
        assert_eq!(parse_news_lines(&text).len(), MAX_ITEMS_PER_CYCLE);
    }

    #[test]
    fn test_body_separator_splits_headline_and_body() {
        let text = "Ranveer Singh - Signs three film deal with major studio<SEP>The actor \
                    confirmed a three picture agreement during a press event on Monday.";
        let drafts = parse_news_lines(text);
        assert_eq!(drafts.len(), 1);
        assert_eq!(
            drafts[0].news_text,
            "Signs three film deal with major studio"
        );
        assert!(drafts[0]
            .news_body
            .as_deref()
            .unwrap()
            .starts_with("The actor confirmed"));
    }

    #[test]
    fn test_short_headline_synthesized_from_body() {
        let text = "Emma Stone - Big news<SEP>Emma Stone has launched a production company \
                    focused on diverse storytelling with several projects already in development.";
        let drafts = parse_news_lines(text);
        assert_eq!(drafts.len(), 1);
        assert_eq!(
            drafts[0].news_text,
            "Emma Stone has launched a production company focused on diverse..."
        );
    }

    #[test]
    fn test_citation_brackets_truncated() {
        let text = "Leonardo DiCaprio - Signs for climate documentary[1][2]";
        let drafts = parse_news_lines(text);
        assert_eq!(drafts[0].news_text, "Signs for climate documentary");
    }

    #[test]
    fn test_empty_input_returns_empty() {
        assert!(parse_news_lines("").is_empty());
        assert!(parse_news_lines("\n\n\n").is_empty());
    }
}
