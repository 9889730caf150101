//! Message rendering: link and event lines, and the list wrapper that turns
//! them into one message body.

use crate::OutboundResponse;
use crate::forge::{EventKind, RepoEvent};
use crate::resolver::ResolvedLink;

/// Body format for an outbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageStyle {
    Html,
    Plain,
}

/// Join lines into one message body.
///
/// A single line is returned as-is. Several lines become a `<ul>` in HTML or
/// `* `-bulleted lines in plain text. Lines must already be escaped for the
/// chosen style.
pub fn render(style: MessageStyle, lines: &[String]) -> String {
    match lines {
        [] => String::new(),
        [line] => line.clone(),
        lines => match style {
            MessageStyle::Html => {
                let items: String = lines
                    .iter()
                    .map(|line| format!("<li>{line}</li>"))
                    .collect();
                format!("<ul>{items}</ul>")
            }
            MessageStyle::Plain => lines
                .iter()
                .map(|line| format!("* {line}"))
                .collect::<Vec<_>>()
                .join("\n"),
        },
    }
}

/// Escape untrusted text for HTML: everything except alphanumerics and
/// spaces becomes a numeric character reference.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for character in text.chars() {
        if character.is_alphanumeric() || character == ' ' {
            escaped.push(character);
        } else {
            escaped.push_str(&format!("&#{};", u32::from(character)));
        }
    }
    escaped
}

/// Escape a URL for use inside a double-quoted attribute.
fn escape_attribute(url: &str) -> String {
    url.replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// One line describing a resolved issue or pull request.
pub fn format_link(style: MessageStyle, link: &ResolvedLink) -> String {
    let label = format!("{} #{}", link.kind.label(), link.number);
    match style {
        MessageStyle::Html => format!(
            "{} <a href=\"{}\">{}</a>: {}",
            link.glyph,
            escape_attribute(&link.url),
            label,
            escape_html(&link.title)
        ),
        MessageStyle::Plain => format!("{} {}: {} ({})", link.glyph, label, link.title, link.url),
    }
}

fn event_noun(kind: &EventKind) -> &str {
    match kind {
        EventKind::Issues => "issue",
        EventKind::PullRequest => "pull request",
        EventKind::IssueComment => "a comment on",
        EventKind::Other(name) => name,
    }
}

/// One line describing a repository event, e.g. `octocat opened issue #12: Title`.
pub fn format_event(style: MessageStyle, event: &RepoEvent) -> String {
    let action = event.action.as_deref().unwrap_or("updated");
    let noun = event_noun(&event.kind);
    let (actor, action, noun) = match style {
        MessageStyle::Html => (
            escape_html(&event.actor),
            escape_html(action),
            escape_html(noun),
        ),
        MessageStyle::Plain => (event.actor.clone(), action.to_string(), noun.to_string()),
    };

    let Some(subject) = &event.subject else {
        return format!("{actor} {action} {noun}");
    };

    let target = format!("{noun} #{}", subject.number);
    let mut line = match (style, &subject.html_url) {
        (MessageStyle::Html, Some(url)) => format!(
            "{actor} {action} <a href=\"{}\">{target}</a>",
            escape_attribute(url)
        ),
        _ => format!("{actor} {action} {target}"),
    };

    if !subject.title.is_empty() {
        let title = match style {
            MessageStyle::Html => escape_html(&subject.title),
            MessageStyle::Plain => subject.title.clone(),
        };
        line.push_str(&format!(": {title}"));
    }
    if let (MessageStyle::Plain, Some(url)) = (style, &subject.html_url) {
        line.push_str(&format!(" ({url})"));
    }
    line
}

/// Render lines in both styles into one outbound message. Returns `None`
/// when there is nothing to say.
pub fn render_response<T>(
    items: &[T],
    format: impl Fn(MessageStyle, &T) -> String,
) -> Option<OutboundResponse> {
    if items.is_empty() {
        return None;
    }
    let lines = |style| {
        items
            .iter()
            .map(|item| format(style, item))
            .collect::<Vec<_>>()
    };
    Some(OutboundResponse::Html {
        html: render(MessageStyle::Html, &lines(MessageStyle::Html)),
        fallback: render(MessageStyle::Plain, &lines(MessageStyle::Plain)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forge::IssueState;
    use crate::forge::testing::event;
    use crate::resolver::{LinkKind, StatusGlyph};

    fn link(number: u64, title: &str) -> ResolvedLink {
        ResolvedLink {
            kind: LinkKind::Issue,
            number,
            title: title.to_string(),
            url: format!("https://github.com/octo/widgets/issues/{number}"),
            state: IssueState::Open,
            glyph: StatusGlyph::Pending,
        }
    }

    #[test]
    fn single_line_renders_verbatim_in_both_styles() {
        let line = "<b>already</b> formatted * line".to_string();
        assert_eq!(render(MessageStyle::Html, &[line.clone()]), line);
        assert_eq!(render(MessageStyle::Plain, &[line.clone()]), line);
    }

    #[test]
    fn multiple_lines_render_as_lists() {
        let lines = vec!["one".to_string(), "two".to_string()];
        assert_eq!(
            render(MessageStyle::Html, &lines),
            "<ul><li>one</li><li>two</li></ul>"
        );
        assert_eq!(render(MessageStyle::Plain, &lines), "* one\n* two");
    }

    #[test]
    fn escapes_everything_but_alphanumerics_and_spaces() {
        assert_eq!(
            escape_html("a <b> & \"c\""),
            "a &#60;b&#62; &#38; &#34;c&#34;"
        );
        assert_eq!(escape_html("plain words 42"), "plain words 42");
    }

    #[test]
    fn html_link_escapes_title() {
        let line = format_link(MessageStyle::Html, &link(4521, "Crash on <input>"));
        assert_eq!(
            line,
            "⏳ <a href=\"https://github.com/octo/widgets/issues/4521\">Issue #4521</a>: Crash on &#60;input&#62;"
        );
    }

    #[test]
    fn plain_link_keeps_title_verbatim() {
        let line = format_link(MessageStyle::Plain, &link(4521, "Crash on <input>"));
        assert_eq!(
            line,
            "⏳ Issue #4521: Crash on <input> (https://github.com/octo/widgets/issues/4521)"
        );
    }

    #[test]
    fn html_event_escapes_actor_and_title() {
        let mut item = event("1", EventKind::PullRequest, "2024-05-01T12:00:00Z", 812);
        item.actor = "evil<script>".into();

        let line = format_event(MessageStyle::Html, &item);

        assert!(line.starts_with("evil&#60;script&#62; opened <a href="));
        assert!(line.contains(">pull request #812</a>: Item 812"));
    }

    #[test]
    fn html_event_escapes_feed_supplied_type_names() {
        let item = event(
            "1",
            EventKind::Other("Odd<b>Event".into()),
            "2024-05-01T12:00:00Z",
            900,
        );

        let line = format_event(MessageStyle::Html, &item);

        assert!(line.contains(">Odd&#60;b&#62;Event #900</a>"), "{line}");
        assert!(!line.contains("<b>"));
    }

    #[test]
    fn trimmed_subject_renders_without_title_or_link() {
        let mut item = event("1", EventKind::PullRequest, "2024-05-01T12:00:00Z", 813);
        if let Some(subject) = item.subject.as_mut() {
            subject.title.clear();
            subject.html_url = None;
        }

        assert_eq!(
            format_event(MessageStyle::Plain, &item),
            "octocat opened pull request #813"
        );
        assert_eq!(
            format_event(MessageStyle::Html, &item),
            "octocat opened pull request #813"
        );
    }

    #[test]
    fn event_without_subject_still_renders() {
        let mut item = event("1", EventKind::Issues, "2024-05-01T12:00:00Z", 1);
        item.subject = None;
        assert_eq!(format_event(MessageStyle::Plain, &item), "octocat opened issue");
    }

    #[test]
    fn render_response_skips_empty_input() {
        let links: Vec<ResolvedLink> = Vec::new();
        assert!(render_response(&links, format_link).is_none());
    }

    #[test]
    fn render_response_builds_both_bodies() {
        let links = vec![link(101, "first"), link(102, "second")];

        let response = render_response(&links, format_link).expect("response");

        let OutboundResponse::Html { html, fallback } = response else {
            panic!("expected an html response");
        };
        assert!(html.starts_with("<ul><li>"));
        assert_eq!(
            fallback,
            "* ⏳ Issue #101: first (https://github.com/octo/widgets/issues/101)\n* ⏳ Issue #102: second (https://github.com/octo/widgets/issues/102)"
        );
    }
}
