use std::collections::HashSet;

use ammonia::Builder;

/// Entities the serializer writes into text nodes. `&amp;` must be undone last.
const TEXT_ENTITIES: [(&str, &str); 4] = [
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&nbsp;", "\u{a0}"),
    ("&amp;", "&"),
];

/// Strip every HTML tag from model-generated text and return plain text.
///
/// Tags are dropped (`<script>`/`<style>` together with their content). The
/// cleaner escapes what is left, so the text-node entities are decoded again:
/// `R&D` and `2 < 3` come back as written.
pub fn strip_markup(input: &str) -> String {
    let cleaned = Builder::empty()
        .clean_content_tags(HashSet::from(["script", "style"]))
        .clean(input)
        .to_string();

    TEXT_ENTITIES
        .iter()
        .fold(cleaned, |text, (entity, raw)| text.replace(entity, raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_untouched() {
        assert_eq!(strip_markup("What is a prime number?"), "What is a prime number?");
    }

    #[test]
    fn tags_are_removed() {
        assert_eq!(strip_markup("<b>Bold</b> claim"), "Bold claim");
        assert_eq!(strip_markup("Hi<script>alert(1)</script>"), "Hi");
    }

    #[test]
    fn special_characters_survive_as_text() {
        assert_eq!(strip_markup("R&D"), "R&D");
        assert_eq!(strip_markup("Is 2 < 3 & 4 > 1?"), "Is 2 < 3 & 4 > 1?");
        assert_eq!(strip_markup("<i>AT&T</i> & friends"), "AT&T & friends");
    }

    #[test]
    fn escaped_entities_are_not_decoded_twice() {
        assert_eq!(strip_markup("&amp;lt;"), "&lt;");
    }
}
