use pulldown_cmark::{Event, HeadingLevel, Parser, Tag, TagEnd};
use serde::{Deserialize, Serialize};

/// Deepest heading level that starts a new passage.
const MAX_SPLIT_LEVEL: HeadingLevel = HeadingLevel::H3;

/// Body text of one policy section together with its heading trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyPassage {
    pub headings: Vec<String>,
    pub body: String,
}

impl PolicyPassage {
    /// Heading trail on the first line, then the section body.
    pub fn render(&self) -> String {
        if self.headings.is_empty() {
            self.body.clone()
        } else {
            format!("{}\n{}", self.headings.join(" > "), self.body)
        }
    }
}

/// Segment a markdown document along its level 1 to 3 headings, ATX or
/// setext. Deeper headings stay in the body of the enclosing passage.
pub(crate) fn split_markdown(source: &str) -> Vec<PolicyPassage> {
    let mut passages = Vec::new();
    let mut trail: Vec<(HeadingLevel, String)> = Vec::new();
    let mut body = String::new();
    let mut heading: Option<(HeadingLevel, String)> = None;

    for event in Parser::new(source) {
        match event {
            Event::Start(Tag::Heading { level, .. }) if level <= MAX_SPLIT_LEVEL => {
                flush(&mut passages, &trail, &mut body);
                heading = Some((level, String::new()));
            }
            Event::End(TagEnd::Heading(level)) if level <= MAX_SPLIT_LEVEL => {
                if let Some((_, title)) = heading.take() {
                    trail.retain(|(existing, _)| *existing < level);
                    trail.push((level, title.trim().to_string()));
                }
            }
            Event::Start(Tag::Heading { level, .. }) => {
                end_line(&mut body);
                body.push_str(&"#".repeat(level as usize));
                body.push(' ');
            }
            Event::Start(Tag::Item) => {
                end_line(&mut body);
                body.push_str("- ");
            }
            Event::Start(Tag::CodeBlock(_)) => end_line(&mut body),
            Event::Text(text) | Event::Code(text) => match heading.as_mut() {
                Some((_, title)) => title.push_str(&text),
                None => body.push_str(&text),
            },
            Event::SoftBreak | Event::HardBreak => match heading.as_mut() {
                Some((_, title)) => title.push(' '),
                None => body.push('\n'),
            },
            Event::Html(html) | Event::InlineHtml(html) if heading.is_none() => {
                body.push_str(&html)
            }
            Event::End(
                TagEnd::Paragraph
                | TagEnd::Heading(_)
                | TagEnd::Item
                | TagEnd::CodeBlock
                | TagEnd::BlockQuote(_),
            ) => end_line(&mut body),
            _ => {}
        }
    }

    flush(&mut passages, &trail, &mut body);
    passages
}

fn end_line(body: &mut String) {
    if !body.is_empty() && !body.ends_with('\n') {
        body.push('\n');
    }
}

fn flush(passages: &mut Vec<PolicyPassage>, trail: &[(HeadingLevel, String)], body: &mut String) {
    let text = body.trim().to_string();
    body.clear();

    if text.is_empty() {
        return;
    }

    passages.push(PolicyPassage {
        headings: trail.iter().map(|(_, title)| title.clone()).collect(),
        body: text,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    const POLICY: &str = "# Settlement Policy\n\
Intro applies to every account.\n\
\n\
## Personal Loans\n\
### Job Loss\n\
Up to 50% discount when the borrower lost their job.\n\
### Medical Emergency\n\
Up to 45% discount.\n\
#### Evidence\n\
Hospital bills are required.\n\
## Credit Cards\n\
```text\n\
# not a heading\n\
```\n\
Balances below 50,000 get at most 10%.\n";

    #[test]
    fn passages_keep_their_enclosing_sections() {
        let passages = split_markdown(POLICY);
        let trails: Vec<Vec<&str>> = passages
            .iter()
            .map(|p| p.headings.iter().map(String::as_str).collect())
            .collect();

        assert_eq!(
            trails,
            vec![
                vec!["Settlement Policy"],
                vec!["Settlement Policy", "Personal Loans", "Job Loss"],
                vec!["Settlement Policy", "Personal Loans", "Medical Emergency"],
                vec!["Settlement Policy", "Credit Cards"],
            ]
        );
        assert!(passages[2].body.contains("#### Evidence"));
        assert!(passages[3].body.contains("# not a heading"));
        assert_eq!(
            passages[1].render(),
            "Settlement Policy > Personal Loans > Job Loss\n\
Up to 50% discount when the borrower lost their job."
        );
    }

    #[test]
    fn heading_without_body_produces_no_passage() {
        let passages = split_markdown("# Title\n## Empty\n## Filled\ntext\n");
        assert_eq!(passages.len(), 1);
        assert_eq!(passages[0].headings, vec!["Title", "Filled"]);
    }

    #[test]
    fn hashtags_without_space_are_body_text() {
        let passages = split_markdown("#hashtag line\nmore");
        assert_eq!(passages.len(), 1);
        assert!(passages[0].headings.is_empty());
        assert_eq!(passages[0].render(), "#hashtag line\nmore");
    }

    #[test]
    fn indented_code_is_body_and_setext_headings_split() {
        let source = "# Policy\nIntro\n\n    # indented code, not a heading\n\n\
Small Balance\n-------------\nBalances below 50,000 get at most 10%.\n";
        let passages = split_markdown(source);

        assert_eq!(passages.len(), 2);
        assert_eq!(passages[0].headings, vec!["Policy"]);
        assert_eq!(passages[0].body, "Intro\n# indented code, not a heading");
        assert_eq!(passages[1].headings, vec!["Policy", "Small Balance"]);
        assert_eq!(passages[1].body, "Balances below 50,000 get at most 10%.");
    }

    #[test]
    fn inline_markup_is_flattened_into_titles_and_bodies() {
        let passages = split_markdown("## Card `CC` *Rules*\n- **Standard**: 30%\n- Small: 10%\n");

        assert_eq!(passages.len(), 1);
        assert_eq!(passages[0].headings, vec!["Card CC Rules"]);
        assert_eq!(passages[0].body, "- Standard: 30%\n- Small: 10%");
    }
}
