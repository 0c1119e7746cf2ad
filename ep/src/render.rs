//! Markdown rendering
//!
//! Plans and replies are markdown. They are rendered to styled terminal text
//! for the REPL and to sanitized HTML for export.

use colored::Colorize;
use pulldown_cmark::{CowStr, Event, Options, Parser, Tag, html};
use tracing::debug;

fn parser_options() -> Options {
    Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS
}

/// Render markdown to an HTML fragment
///
/// Raw HTML in the input is escaped rather than passed through, unsafe link
/// schemes are neutralized, and single newlines become `<br />`.
pub fn to_html(markdown: &str) -> String {
    debug!(len = markdown.len(), "to_html: called");
    let events = Parser::new_ext(markdown, parser_options()).map(|event| match event {
        Event::Html(raw) => Event::Text(raw),
        Event::SoftBreak => Event::HardBreak,
        Event::Start(tag) => Event::Start(sanitize_tag(tag)),
        Event::End(tag) => Event::End(sanitize_tag(tag)),
        other => other,
    });

    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, events);
    out
}

/// Wrap an HTML fragment in a standalone document
pub fn html_document(title: &str, body: &str) -> String {
    let title = title.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;");
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n</head>\n<body>\n{}</body>\n</html>\n",
        title, body
    )
}

fn sanitize_tag(tag: Tag<'_>) -> Tag<'_> {
    match tag {
        Tag::Link(kind, url, title) => Tag::Link(kind, safe_url(url), title),
        Tag::Image(kind, url, title) => Tag::Image(kind, safe_url(url), title),
        other => other,
    }
}

fn safe_url(url: CowStr<'_>) -> CowStr<'_> {
    let scheme = url.trim_start().to_ascii_lowercase();
    if scheme.starts_with("javascript:") || scheme.starts_with("vbscript:") || scheme.starts_with("data:") {
        debug!("safe_url: neutralized unsafe link");
        CowStr::Borrowed("#")
    } else {
        url
    }
}

/// Render markdown as styled text for the terminal
pub fn to_terminal(markdown: &str) -> String {
    debug!(len = markdown.len(), "to_terminal: called");
    let mut writer = TerminalWriter::default();
    for event in Parser::new_ext(markdown, parser_options()) {
        writer.event(event);
    }
    writer.finish()
}

#[derive(Default)]
struct TerminalWriter {
    out: String,
    at_line_start: bool,
    heading: bool,
    strong: usize,
    emphasis: usize,
    strike: usize,
    quote: usize,
    code_block: bool,
    lists: Vec<Option<u64>>,
    link_url: Option<String>,
}

impl TerminalWriter {
    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) => {
                if self.code_block {
                    for line in text.lines() {
                        self.push(&format!("    {}", line.yellow()));
                        self.newline();
                    }
                } else {
                    let styled = self.style(&text);
                    self.push(&styled);
                }
            }
            Event::Code(code) => self.push(&code.yellow().to_string()),
            Event::Html(raw) => self.push(&raw.dimmed().to_string()),
            Event::SoftBreak => self.push(" "),
            Event::HardBreak => self.newline(),
            Event::Rule => {
                self.blank_line();
                self.push(&"─".repeat(40).dimmed().to_string());
                self.blank_line();
            }
            Event::TaskListMarker(done) => self.push(if done { "[x] " } else { "[ ] " }),
            Event::FootnoteReference(name) => self.push(&format!("[^{}]", name)),
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Heading(level, _, _) => {
                self.blank_line();
                self.heading = true;
                let marker = "#".repeat(level as usize);
                self.push(&format!("{} ", marker).cyan().bold().to_string());
            }
            Tag::BlockQuote => {
                self.blank_line();
                self.quote += 1;
            }
            Tag::CodeBlock(_) => {
                self.blank_line();
                self.code_block = true;
            }
            Tag::List(start) => {
                if self.lists.is_empty() {
                    self.blank_line();
                } else if !self.at_line_start {
                    self.newline();
                }
                self.lists.push(start);
            }
            Tag::Item => {
                if !self.at_line_start {
                    self.newline();
                }
                let indent = "  ".repeat(self.lists.len().saturating_sub(1));
                let bullet = match self.lists.last_mut() {
                    Some(Some(n)) => {
                        let bullet = format!("{}. ", n);
                        *n += 1;
                        bullet
                    }
                    _ => "• ".to_string(),
                };
                self.push(&format!("{}{}", indent, bullet));
            }
            Tag::Emphasis => self.emphasis += 1,
            Tag::Strong => self.strong += 1,
            Tag::Strikethrough => self.strike += 1,
            Tag::Link(_, url, _) => self.link_url = Some(url.to_string()),
            Tag::Table(_) => self.blank_line(),
            _ => {}
        }
    }

    fn end(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => {
                if self.lists.is_empty() {
                    self.blank_line();
                } else {
                    self.newline();
                }
            }
            Tag::Heading(..) => {
                self.heading = false;
                self.blank_line();
            }
            Tag::BlockQuote => {
                self.quote = self.quote.saturating_sub(1);
                self.blank_line();
            }
            Tag::CodeBlock(_) => {
                self.code_block = false;
                self.blank_line();
            }
            Tag::List(_) => {
                self.lists.pop();
                if self.lists.is_empty() {
                    self.blank_line();
                }
            }
            Tag::Item => {
                if !self.at_line_start {
                    self.newline();
                }
            }
            Tag::Emphasis => self.emphasis = self.emphasis.saturating_sub(1),
            Tag::Strong => self.strong = self.strong.saturating_sub(1),
            Tag::Strikethrough => self.strike = self.strike.saturating_sub(1),
            Tag::Link(..) => {
                if let Some(url) = self.link_url.take() {
                    self.push(&format!(" ({})", url).dimmed().to_string());
                }
            }
            Tag::TableCell => self.push(" │ "),
            Tag::TableHead | Tag::TableRow => self.newline(),
            Tag::Table(_) => self.blank_line(),
            _ => {}
        }
    }

    fn style(&self, text: &str) -> String {
        let mut styled = text.normal();
        if self.heading {
            styled = styled.cyan().bold();
        }
        if self.strong > 0 {
            styled = styled.bold();
        }
        if self.emphasis > 0 {
            styled = styled.italic();
        }
        if self.strike > 0 {
            styled = styled.strikethrough();
        }
        if self.quote > 0 {
            styled = styled.dimmed();
        }
        styled.to_string()
    }

    fn push(&mut self, s: &str) {
        if s.is_empty() {
            return;
        }
        if self.at_line_start && self.quote > 0 {
            self.out.push_str(&"│ ".repeat(self.quote).dimmed().to_string());
        }
        self.out.push_str(s);
        self.at_line_start = false;
    }

    fn newline(&mut self) {
        self.out.push('\n');
        self.at_line_start = true;
    }

    fn blank_line(&mut self) {
        if self.out.is_empty() {
            self.at_line_start = true;
            return;
        }
        while !self.out.ends_with("\n\n") {
            self.out.push('\n');
        }
        self.at_line_start = true;
    }

    fn finish(self) -> String {
        let mut out = self.out.trim_end().to_string();
        out.push('\n');
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_html_basic() {
        let html = to_html("# Title\n\nSome **bold** text");
        assert!(html.contains("<h1>Title</h1>"));
        assert!(html.contains("<strong>bold</strong>"));
    }

    #[test]
    fn test_to_html_escapes_raw_html() {
        let html = to_html("<script>alert(1)</script>\n\nok");
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_to_html_neutralizes_javascript_links() {
        let html = to_html("[click](javascript:alert(1)) and [docs](https://example.com)");
        assert!(!html.contains("javascript:"));
        assert!(html.contains("href=\"#\""));
        assert!(html.contains("href=\"https://example.com\""));
    }

    #[test]
    fn test_to_html_single_newline_breaks() {
        let html = to_html("line one\nline two");
        assert!(html.contains("<br />"));
    }

    #[test]
    fn test_to_html_tables() {
        let html = to_html("| Item | Cost |\n|---|---|\n| Pipettes | $40 |\n");
        assert!(html.contains("<table>"));
        assert!(html.contains("<td>Pipettes</td>"));
    }

    #[test]
    fn test_html_document_escapes_title() {
        let doc = html_document("A <b> plan", "<p>x</p>\n");
        assert!(doc.contains("<title>A &lt;b&gt; plan</title>"));
        assert!(doc.contains("<p>x</p>"));
    }

    #[test]
    fn test_to_terminal_keeps_text_and_structure() {
        let out = to_terminal("# Title\n\nIntro paragraph.\n\n1. Prepare samples\n2. Measure growth\n\n- soil\n- water\n");
        assert!(out.contains("Title"));
        assert!(out.contains("Intro paragraph."));
        assert!(out.contains("1. "));
        assert!(out.contains("Prepare samples"));
        assert!(out.contains("2. "));
        assert!(out.contains("• "));
        assert!(out.contains("water"));
        assert!(out.ends_with('\n'));
        assert!(!out.ends_with("\n\n"));
    }

    #[test]
    fn test_to_terminal_code_block_indented() {
        let out = to_terminal("```\nrun()\n```\n");
        assert!(out.contains("    "));
        assert!(out.contains("run()"));
    }

    #[test]
    fn test_to_terminal_link_shows_url() {
        let out = to_terminal("See [protocol](https://example.com/p).");
        assert!(out.contains("protocol"));
        assert!(out.contains("https://example.com/p"));
    }
}
