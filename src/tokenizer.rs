//! Lenient HTML tokenizer feeding start-tag / end-tag / text events to a `TokenSink`.
//!
//! - Tag names are ASCII-lowercased; the raw opening text (attributes included) is kept
//!   verbatim.
//! - Void elements and `<x/>` are reported through `empty_tag`.
//! - RAW-TEXT elements (script, style, textarea, xmp): everything up to the matching
//!   end tag is a single text event.
//! - Comments, declarations (`<!DOCTYPE>`, `<![CDATA[...]]>`) and `<?...>` are skipped.
//! - A '<' that does not open a tag is text. An unterminated tag, comment or declaration
//!   at end of input is dropped.
//! - Never fails on odd markup; only the sink can abort the scan.

use memchr::{memchr, memmem};

/// Receiver of tokenizer events, in document order.
pub trait TokenSink {
    type Error;

    fn start_tag(&mut self, tag: &StartTag<'_>) -> Result<(), Self::Error>;

    fn end_tag(&mut self, name: &str) -> Result<(), Self::Error>;

    fn text(&mut self, data: &str) -> Result<(), Self::Error>;

    /// A void element or a self-closing tag. Defaults to a start tag immediately
    /// followed by its end tag.
    fn empty_tag(&mut self, tag: &StartTag<'_>) -> Result<(), Self::Error> {
        self.start_tag(tag)?;
        self.end_tag(tag.name())
    }
}

/// A start tag as found in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartTag<'a> {
    name: String,
    raw: &'a str,
}

impl<'a> StartTag<'a> {
    /// Lowercased tag name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Exact opening-tag source text, attributes included.
    pub fn raw(&self) -> &'a str {
        self.raw
    }

    pub fn is_void(&self) -> bool {
        is_void(self.name.as_bytes())
    }
}

/* =============================== Core sets =============================== */

fn is_void(name: &[u8]) -> bool {
    matches_ignore_ascii_case(
        name,
        &[
            b"area", b"base", b"br", b"col", b"embed", b"hr", b"img", b"input", b"link", b"meta",
            b"param", b"source", b"track", b"wbr",
        ],
    )
}

fn is_raw_text(name: &[u8]) -> bool {
    matches_ignore_ascii_case(name, &[b"script", b"style", b"textarea", b"xmp"])
}

/* ============================ Utility predicates ========================= */

#[inline]
fn is_name_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'_' || b == b':'
}

#[inline]
fn is_ws(b: u8) -> bool {
    b == b' ' || b == b'\t' || b == b'\n' || b == b'\r' || b == b'\x0c'
}

fn matches_ignore_ascii_case(name: &[u8], set: &[&[u8]]) -> bool {
    set.iter().any(|&s| name.eq_ignore_ascii_case(s))
}

/* =============================== Tag parsing ============================= */

#[derive(Clone, Copy, Debug)]
struct TagInfo<'a> {
    name: &'a [u8],
    is_end: bool,
    self_closing: bool,
}

/// Find the '>' for a tag starting at `i` (s[i] == '<'). A quote only opens a value
/// right after '='; a value still open at end of input ends at its first '>'.
fn find_tag_end(s: &[u8], mut i: usize) -> Option<usize> {
    let n = s.len();
    i += 1;
    let mut quote: u8 = 0;
    let mut after_eq = false;
    let mut gt_in_quote = None;
    while i < n {
        let b = s[i];
        if quote != 0 {
            if b == quote {
                quote = 0;
                gt_in_quote = None;
            } else if b == b'>' && gt_in_quote.is_none() {
                gt_in_quote = Some(i);
            }
        } else if after_eq && (b == b'"' || b == b'\'') {
            quote = b;
            after_eq = false;
        } else if b == b'>' {
            return Some(i);
        } else if b == b'=' {
            after_eq = true;
        } else if !is_ws(b) {
            after_eq = false;
        }
        i += 1;
    }
    gt_in_quote
}

/// Extract tag name, end/self-closing flags from raw `<...>` bytes.
fn parse_tag_info(tag: &[u8]) -> TagInfo<'_> {
    let n = tag.len();
    let mut i = 1;

    let mut is_end = false;
    if i < n && tag[i] == b'/' {
        is_end = true;
        i += 1;
    }
    while i < n && is_ws(tag[i]) {
        i += 1;
    }
    let start = i;
    while i < n && is_name_char(tag[i]) {
        i += 1;
    }
    let name = &tag[start..i];

    // self-closing? check before '>'
    let mut j = n - 1;
    while j > 0 && is_ws(tag[j - 1]) {
        j -= 1;
    }
    let self_closing = !is_end && j >= 2 && tag[j - 1] == b'/';

    TagInfo {
        name,
        is_end,
        self_closing,
    }
}

/* ============================ Skipped markup ============================ */

/// Index just past the `-->` closing a comment that starts at `i`.
fn comment_end(s: &[u8], i: usize) -> Option<usize> {
    memmem::find(&s[i + 4..], b"-->").map(|p| i + 4 + p + 3)
}

/// Index just past the '>' closing a declaration or processing instruction.
fn declaration_end(s: &[u8], i: usize) -> Option<usize> {
    if s[i..].starts_with(b"<![CDATA[") {
        return memmem::find(&s[i..], b"]]>").map(|p| i + p + 3);
    }
    memchr(b'>', &s[i..]).map(|p| i + p + 1)
}

/* ============================ Raw-text content ========================== */

/// Locate the **matching** end tag `</name>` from `i`.
/// Returns (start_of_end_tag, index_after_end_tag).
fn find_raw_text_end(s: &[u8], i: usize, name: &[u8]) -> Option<(usize, usize)> {
    let n = s.len();
    let mut j = i;
    while j < n {
        let pos = memmem::find(&s[j..], b"</").map(|off| j + off)?;
        let name_start = pos + 2;
        let name_end = name_start + name.len();
        if name_end <= n
            && s[name_start..name_end].eq_ignore_ascii_case(name)
            && (name_end == n || !is_name_char(s[name_end]))
        {
            let end = find_tag_end(s, pos)?;
            return Some((pos, end + 1));
        }
        j = pos + 2;
    }
    None
}

/* ============================== Tokenize ================================ */

/// Scan `src` and dispatch every event to `sink`, stopping at the first sink error.
pub fn tokenize<S: TokenSink>(src: &str, sink: &mut S) -> Result<(), S::Error> {
    let s = src.as_bytes();
    let n = s.len();
    let mut i = 0usize;
    let mut text_start = 0usize;

    while i < n {
        let Some(lt) = memchr(b'<', &s[i..]).map(|off| i + off) else {
            break;
        };
        let next = s.get(lt + 1).copied().unwrap_or(0);

        // Comments and declarations are dropped
        if s[lt..].starts_with(b"<!--") || next == b'!' || next == b'?' {
            let end = if s[lt..].starts_with(b"<!--") {
                comment_end(s, lt)
            } else {
                declaration_end(s, lt)
            };
            let Some(end) = end else {
                return flush_text(src, text_start, lt, sink);
            };
            flush_text(src, text_start, lt, sink)?;
            i = end;
            text_start = end;
            continue;
        }

        let opens_tag = next.is_ascii_alphabetic()
            || (next == b'/' && s.get(lt + 2).is_some_and(|b| b.is_ascii_alphabetic()));
        if !opens_tag {
            // literal '<' stays in the text run
            i = lt + 1;
            continue;
        }

        let Some(j) = find_tag_end(s, lt) else {
            return flush_text(src, text_start, lt, sink);
        };
        flush_text(src, text_start, lt, sink)?;
        let raw = &src[lt..=j];
        let ti = parse_tag_info(raw.as_bytes());
        let name = String::from_utf8_lossy(ti.name).to_ascii_lowercase();
        i = j + 1;
        text_start = i;

        if ti.is_end {
            sink.end_tag(&name)?;
            continue;
        }

        let tag = StartTag { name, raw };
        if ti.self_closing || tag.is_void() {
            sink.empty_tag(&tag)?;
            continue;
        }
        sink.start_tag(&tag)?;

        if is_raw_text(ti.name) {
            match find_raw_text_end(s, i, ti.name) {
                Some((content_end, after)) => {
                    flush_text(src, i, content_end, sink)?;
                    sink.end_tag(tag.name())?;
                    i = after;
                    text_start = after;
                }
                None => {
                    // Unterminated: the rest of the input is its content
                    i = n;
                }
            }
        }
    }

    flush_text(src, text_start, n, sink)
}

fn flush_text<S: TokenSink>(
    src: &str,
    start: usize,
    end: usize,
    sink: &mut S,
) -> Result<(), S::Error> {
    if start < end {
        sink.text(&src[start..end])?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    #[derive(Debug, PartialEq, Eq)]
    enum Event {
        Start(String, String),
        End(String),
        Text(String),
        Empty(String, String),
    }

    #[derive(Default)]
    struct Recorder {
        events: Vec<Event>,
    }

    impl TokenSink for Recorder {
        type Error = Infallible;

        fn start_tag(&mut self, tag: &StartTag<'_>) -> Result<(), Infallible> {
            self.events
                .push(Event::Start(tag.name().to_string(), tag.raw().to_string()));
            Ok(())
        }

        fn end_tag(&mut self, name: &str) -> Result<(), Infallible> {
            self.events.push(Event::End(name.to_string()));
            Ok(())
        }

        fn text(&mut self, data: &str) -> Result<(), Infallible> {
            self.events.push(Event::Text(data.to_string()));
            Ok(())
        }

        fn empty_tag(&mut self, tag: &StartTag<'_>) -> Result<(), Infallible> {
            self.events
                .push(Event::Empty(tag.name().to_string(), tag.raw().to_string()));
            Ok(())
        }
    }

    fn events(src: &str) -> Vec<Event> {
        let mut rec = Recorder::default();
        tokenize(src, &mut rec).unwrap();
        rec.events
    }

    fn start(name: &str, raw: &str) -> Event {
        Event::Start(name.into(), raw.into())
    }

    fn text(data: &str) -> Event {
        Event::Text(data.into())
    }

    fn end(name: &str) -> Event {
        Event::End(name.into())
    }

    #[test]
    fn test_basic_events() {
        assert_eq!(
            events("<DIV class=\"a > b\">Hi <b>there</b></Div>"),
            vec![
                start("div", "<DIV class=\"a > b\">"),
                text("Hi "),
                start("b", "<b>"),
                text("there"),
                end("b"),
                end("div"),
            ]
        );
    }

    #[test]
    fn test_void_and_self_closing() {
        assert_eq!(
            events("a<br>b<img src=x />c<span/>"),
            vec![
                text("a"),
                Event::Empty("br".into(), "<br>".into()),
                text("b"),
                Event::Empty("img".into(), "<img src=x />".into()),
                text("c"),
                Event::Empty("span".into(), "<span/>".into()),
            ]
        );
    }

    #[test]
    fn test_comments_and_declarations_skipped() {
        assert_eq!(
            events("<!DOCTYPE html><!-- note -->x<?php y ?><![CDATA[z]]>w"),
            vec![text("x"), text("w")]
        );
    }

    #[test]
    fn test_literal_lt_is_text() {
        assert_eq!(events("1 < 2 </> 3"), vec![text("1 < 2 </> 3")]);
    }

    #[test]
    fn test_unterminated_markup_at_end_dropped() {
        assert_eq!(
            events("<p>ok</p><a href=\"x"),
            vec![start("p", "<p>"), text("ok"), end("p")]
        );
        assert_eq!(events("a<!-- open"), vec![text("a")]);
        assert_eq!(events("b</di"), vec![text("b")]);
        assert_eq!(events("c <"), vec![text("c <")]);
    }

    #[test]
    fn test_quote_inside_unquoted_value() {
        assert_eq!(
            events("<p class=x data-note=don't>hi</p><p>there</p>"),
            vec![
                start("p", "<p class=x data-note=don't>"),
                text("hi"),
                end("p"),
                start("p", "<p>"),
                text("there"),
                end("p"),
            ]
        );
    }

    #[test]
    fn test_quoted_value_after_spaced_equals() {
        assert_eq!(
            events("<a title = \"x > y\">z</a>"),
            vec![start("a", "<a title = \"x > y\">"), text("z"), end("a")]
        );
    }

    #[test]
    fn test_unterminated_quoted_value_ends_at_first_gt() {
        assert_eq!(
            events("<p title=\"a>b</p>"),
            vec![start("p", "<p title=\"a>"), text("b"), end("p")]
        );
    }

    #[test]
    fn test_raw_text_content() {
        assert_eq!(
            events("<script>if (a<b) { x = \"</p>\"; }</SCRIPT>after"),
            vec![
                start("script", "<script>"),
                text("if (a<b) { x = \"</p>\"; }"),
                end("script"),
                text("after"),
            ]
        );
    }

    #[test]
    fn test_unterminated_raw_text() {
        assert_eq!(
            events("<style>a{}"),
            vec![start("style", "<style>"), text("a{}")]
        );
    }

    #[test]
    fn test_character_references_verbatim() {
        assert_eq!(events("a &amp; b"), vec![text("a &amp; b")]);
    }

    #[test]
    fn test_default_empty_tag_dispatch() {
        struct Plain(Vec<String>);
        impl TokenSink for Plain {
            type Error = Infallible;
            fn start_tag(&mut self, tag: &StartTag<'_>) -> Result<(), Infallible> {
                self.0.push(format!("+{}", tag.name()));
                Ok(())
            }
            fn end_tag(&mut self, name: &str) -> Result<(), Infallible> {
                self.0.push(format!("-{name}"));
                Ok(())
            }
            fn text(&mut self, _: &str) -> Result<(), Infallible> {
                Ok(())
            }
        }
        let mut sink = Plain(Vec::new());
        tokenize("<hr/>", &mut sink).unwrap();
        assert_eq!(sink.0, ["+hr", "-hr"]);
    }

    #[test]
    fn test_sink_error_stops_scan() {
        struct Fail(usize);
        impl TokenSink for Fail {
            type Error = &'static str;
            fn start_tag(&mut self, _: &StartTag<'_>) -> Result<(), &'static str> {
                self.0 += 1;
                Err("stop")
            }
            fn end_tag(&mut self, _: &str) -> Result<(), &'static str> {
                self.0 += 1;
                Ok(())
            }
            fn text(&mut self, _: &str) -> Result<(), &'static str> {
                self.0 += 1;
                Ok(())
            }
        }
        let mut sink = Fail(0);
        assert_eq!(tokenize("<p>a</p><p>b</p>", &mut sink), Err("stop"));
        assert_eq!(sink.0, 1);
    }
}
