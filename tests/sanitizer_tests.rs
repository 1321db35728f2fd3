use harvest::sanitizer::*;

#[cfg(test)]
mod character_filter_tests {
    use super::*;

    mod markup_strip_filter {
        use super::*;

        #[test]
        fn test_empty_string() {
            let filter = MarkupStripFilter;
            assert_eq!(filter.filter("".to_string()), "");
        }

        #[test]
        fn test_plain_text_unchanged() {
            let filter = MarkupStripFilter;
            assert_eq!(filter.filter("Hello World".to_string()), "Hello World");
        }

        #[test]
        fn test_inline_tags_with_entity_text() {
            assert_eq!(strip_markup("<b>Go</b> & <i>SQL</i>"), "Go & SQL");
        }

        #[test]
        fn test_nested_html() {
            let html = "<div><p>Hello <span>World</span></p></div>";
            assert_eq!(strip_markup(html), "Hello World");
        }

        #[test]
        fn test_tags_with_attributes() {
            let html = r#"<p class="skill" style="color:red">Docker</p><br/>"#;
            assert_eq!(strip_markup(html), "Docker");
        }

        #[test]
        fn test_uppercase_tags() {
            assert_eq!(strip_markup("<LI>Kubernetes</LI>"), "Kubernetes");
        }

        #[test]
        fn test_non_greedy_keeps_text_between_tags() {
            assert_eq!(strip_markup("<b>a</b> b <i>c</i>"), "a b c");
        }

        #[test]
        fn test_entities_are_not_decoded() {
            assert_eq!(strip_markup("<p>C&amp;C++</p>"), "C&amp;C++");
        }

        #[test]
        fn test_whitespace_is_preserved() {
            assert_eq!(strip_markup("<p> spaced </p>\n"), " spaced \n");
        }

        #[test]
        fn test_unclosed_angle_bracket_is_kept() {
            assert_eq!(strip_markup("a < b"), "a < b");
        }

        #[test]
        fn test_cyrillic_text() {
            assert_eq!(
                strip_markup("<ul><li>Досвід з Rust</li></ul>"),
                "Досвід з Rust"
            );
        }

        #[test]
        fn test_deterministic() {
            let html = "<p>Same <b>input</b></p>";
            assert_eq!(strip_markup(html), strip_markup(html));
        }
    }

    mod filter_chain {
        use super::*;

        struct Uppercase;

        impl CharacterFilter for Uppercase {
            fn filter(&self, text: String) -> String {
                text.to_uppercase()
            }
        }

        #[test]
        fn test_default_chain_strips_markup() {
            let chain = FilterChain::default();
            assert_eq!(chain.filter("<b>Rust</b>".to_string()), "Rust");
        }

        #[test]
        fn test_filters_run_in_order() {
            let chain = FilterChain::new(vec![Box::new(MarkupStripFilter), Box::new(Uppercase)]);
            assert_eq!(chain.filter("<i>go</i>".to_string()), "GO");
        }

        #[test]
        fn test_empty_chain_is_identity() {
            let chain = FilterChain::new(vec![]);
            assert_eq!(chain.filter("<b>x</b>".to_string()), "<b>x</b>");
        }
    }
}
