//! Markdown rendering and attachment composition. Pure, no I/O.
//!
//! Raw HTML in a note is passed through unescaped. Anyone who can submit a
//! note can inject markup into the rendered page; the service assumes
//! trusted users.

use pulldown_cmark::{Options, Parser, html};

/// Route prefix under which attachments are served.
pub const ATTACHMENT_ROUTE: &str = "/img/";

/// Render raw note text to an HTML fragment. CommonMark plus the GitHub
/// extensions people type into notes: tables, strikethrough and task lists.
pub fn render_markdown(text: &str) -> String {
    let options =
        Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS;
    let parser = Parser::new_ext(text, options);
    let mut out = String::with_capacity(text.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

/// Link under which an attachment is served, with the name percent-encoded.
///
/// Parentheses are encoded too, so the link can never close the markdown
/// image destination early.
pub fn attachment_link(name: &str) -> String {
    format!("{}{}", ATTACHMENT_ROUTE, urlencoding::encode(name))
}

/// Append an inline image reference to `description`.
///
/// `link` must already be encoded.
pub fn compose_attachment_content(description: &str, link: &str) -> String {
    format!("{} ![]({})", description, link)
}
