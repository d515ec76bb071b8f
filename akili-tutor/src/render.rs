/// Lesson rendering
///
/// Lessons are generated as Markdown and rendered to HTML once, at storage
/// time. Rendering goes through an allow-list: raw HTML blocks and inline
/// HTML are dropped, and link and image destinations must be relative or
/// use `http`, `https` or `mailto`.

use pulldown_cmark::{html, CowStr, Event, Options, Parser, Tag};

const ALLOWED_SCHEMES: &[&str] = &["http", "https", "mailto"];

/// Replacement destination for rejected links
const BLOCKED_DESTINATION: &str = "#";

/// Whether a link or image destination may be rendered
pub fn is_allowed_destination(url: &str) -> bool {
    let url = url.trim();

    // A scheme is whatever precedes the first ':' when no '/', '?' or '#' comes first.
    let scheme_end = url.find(|c| matches!(c, ':' | '/' | '?' | '#'));
    match scheme_end {
        Some(index) if url[index..].starts_with(':') => {
            let scheme = url[..index].to_ascii_lowercase();
            ALLOWED_SCHEMES.contains(&scheme.as_str())
        }
        _ => true,
    }
}

fn sanitize_destination(url: CowStr<'_>) -> CowStr<'_> {
    if is_allowed_destination(&url) {
        url
    } else {
        CowStr::Borrowed(BLOCKED_DESTINATION)
    }
}

/// Renders lesson Markdown to sanitized HTML
pub fn render_lesson(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);

    let events = Parser::new_ext(markdown, options).filter_map(|event| match event {
        Event::Html(_) | Event::InlineHtml(_) => None,
        Event::Start(Tag::Link {
            link_type,
            dest_url,
            title,
            id,
        }) => Some(Event::Start(Tag::Link {
            link_type,
            dest_url: sanitize_destination(dest_url),
            title,
            id,
        })),
        Event::Start(Tag::Image {
            link_type,
            dest_url,
            title,
            id,
        }) => Some(Event::Start(Tag::Image {
            link_type,
            dest_url: sanitize_destination(dest_url),
            title,
            id,
        })),
        other => Some(other),
    });

    let mut output = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut output, events);
    output
}
