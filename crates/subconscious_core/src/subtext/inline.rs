//! Inline spans: wikilinks, emphasis, code and slashlinks.
//!
//! # Invariants
//! - Every span keeps its exact source markup; `markup()` round-trips.
//! - Scanning never fails: anything unrecognized is plain text.
//! - Each scanner step either commits a span or advances one char.
//! - Emphasis delimiters never sit inside a word: `snake_case` is text.

use super::tape::Tape;
use crate::model::slashlink::Slashlink;
use crate::model::slug::Slug;

/// Declares a span delimited by fixed opening and closing tags.
macro_rules! delimited_span {
    ($(#[$meta:meta])* $name:ident, $open:literal, $close:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub struct $name {
            markup: String,
        }

        impl $name {
            pub const OPEN: &'static str = $open;
            pub const CLOSE: &'static str = $close;

            /// Wraps `text` in delimiters; `None` for empty or multi-line text.
            pub fn new(text: &str) -> Option<Self> {
                if text.is_empty() || text.contains('\n') || text.contains(Self::CLOSE) {
                    return None;
                }
                Some(Self {
                    markup: format!("{}{}{}", Self::OPEN, text, Self::CLOSE),
                })
            }

            fn from_markup(markup: &str) -> Self {
                Self {
                    markup: markup.to_string(),
                }
            }

            /// Exact source, delimiters included.
            pub fn markup(&self) -> &str {
                &self.markup
            }

            /// Source up to, but excluding, the closing delimiter.
            pub fn markup_without_closing_tag(&self) -> &str {
                &self.markup[..self.markup.len() - Self::CLOSE.len()]
            }

            /// Text between the delimiters.
            pub fn text(&self) -> &str {
                &self.markup[Self::OPEN.len()..self.markup.len() - Self::CLOSE.len()]
            }
        }
    };
}

delimited_span!(
    /// `[[text]]` link to a note by title.
    Wikilink,
    "[[",
    "]]"
);
delimited_span!(
    /// `*text*`
    Bold,
    "*",
    "*"
);
delimited_span!(
    /// `_text_`
    Italic,
    "_",
    "_"
);
delimited_span!(
    /// `` `text` ``
    Code,
    "`",
    "`"
);

impl Wikilink {
    /// Slug a wikilink points at, derived from its text.
    pub fn to_slug(&self) -> Slug {
        Slug::format(self.text())
    }
}

/// Slashlink as it appeared in the document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SlashlinkSpan {
    markup: String,
    slashlink: Slashlink,
}

impl SlashlinkSpan {
    pub fn markup(&self) -> &str {
        &self.markup
    }

    /// Slashlinks have no closing tag; same as [`Self::markup`].
    pub fn markup_without_closing_tag(&self) -> &str {
        &self.markup
    }

    pub fn slashlink(&self) -> &Slashlink {
        &self.slashlink
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Inline {
    Text(String),
    Wikilink(Wikilink),
    Italic(Italic),
    Bold(Bold),
    Code(Code),
    Slashlink(SlashlinkSpan),
}

impl Inline {
    pub fn markup(&self) -> &str {
        match self {
            Self::Text(text) => text,
            Self::Wikilink(span) => span.markup(),
            Self::Italic(span) => span.markup(),
            Self::Bold(span) => span.markup(),
            Self::Code(span) => span.markup(),
            Self::Slashlink(span) => span.markup(),
        }
    }

    /// Reader-facing text with delimiters removed.
    pub fn plain_text(&self) -> &str {
        match self {
            Self::Text(text) => text,
            Self::Wikilink(span) => span.text(),
            Self::Italic(span) => span.text(),
            Self::Bold(span) => span.text(),
            Self::Code(span) => span.text(),
            Self::Slashlink(span) => span.markup(),
        }
    }
}

/// Scans one block of source into inline spans.
pub(crate) fn parse_inline(source: &str) -> Vec<Inline> {
    let mut tape = Tape::new(source);
    let mut inline = Vec::new();

    while !tape.is_exhausted() {
        tape.save();
        let mark = tape.position();
        match scan_span(&mut tape) {
            Some(span) => {
                let text = tape.cut_to(mark);
                if !text.is_empty() {
                    inline.push(Inline::Text(text.to_string()));
                }
                tape.cut();
                inline.push(span);
            }
            None => {
                tape.backtrack();
                tape.advance();
            }
        }
    }

    let rest = tape.cut();
    if !rest.is_empty() {
        inline.push(Inline::Text(rest.to_string()));
    }
    inline
}

fn scan_span(tape: &mut Tape<'_>) -> Option<Inline> {
    let mark = tape.position();
    let preceding = tape.peek_back();
    match tape.peek()? {
        '[' => scan_wikilink(tape).then(|| Inline::Wikilink(Wikilink::from_markup(tape.since(mark)))),
        '*' if emphasis_may_start(preceding) => scan_emphasis(tape, '*')
            .then(|| Inline::Bold(Bold::from_markup(tape.since(mark)))),
        '_' if emphasis_may_start(preceding) => scan_emphasis(tape, '_')
            .then(|| Inline::Italic(Italic::from_markup(tape.since(mark)))),
        '`' => scan_delimited(tape, '`').then(|| Inline::Code(Code::from_markup(tape.since(mark)))),
        '/' | '@' | 'd' if slashlink_may_start(preceding) => {
            let slashlink = scan_slashlink(tape)?;
            Some(Inline::Slashlink(SlashlinkSpan {
                markup: tape.since(mark).to_string(),
                slashlink,
            }))
        }
        _ => None,
    }
}

fn scan_wikilink(tape: &mut Tape<'_>) -> bool {
    if !tape.consume_match("[[") {
        return false;
    }
    // A `[[` further right is nearer to any closing `]]`.
    if tape.peek() == Some('[') {
        return false;
    }
    let interior = tape.position();
    while !tape.is_exhausted() {
        if tape.rest().starts_with("]]") {
            let non_empty = tape.position() > interior;
            tape.consume_match("]]");
            return non_empty;
        }
        if tape.rest().starts_with("[[") || tape.peek() == Some('\n') {
            return false;
        }
        tape.advance();
    }
    false
}

fn scan_delimited(tape: &mut Tape<'_>, delimiter: char) -> bool {
    if tape.consume() != Some(delimiter) {
        return false;
    }
    let interior = tape.position();
    while let Some(c) = tape.peek() {
        if c == '\n' {
            return false;
        }
        if c == delimiter {
            let non_empty = tape.position() > interior;
            tape.advance();
            return non_empty;
        }
        tape.advance();
    }
    false
}

fn emphasis_may_start(preceding: Option<char>) -> bool {
    !preceding.is_some_and(is_word_char)
}

fn scan_emphasis(tape: &mut Tape<'_>, delimiter: char) -> bool {
    scan_delimited(tape, delimiter) && !tape.peek().is_some_and(is_word_char)
}

fn slashlink_may_start(preceding: Option<char>) -> bool {
    match preceding {
        None => true,
        Some(c) => !(is_word_char(c) || matches!(c, '/' | ':' | '@' | '.' | '-')),
    }
}

fn scan_slashlink(tape: &mut Tape<'_>) -> Option<Slashlink> {
    let mark = tape.position();
    if tape.consume_match("@") {
        consume_path(tape, '.');
        if tape.position() == mark + 1 {
            return None;
        }
    } else if tape.rest().starts_with("did:") {
        tape.consume_while(|c| c.is_ascii_alphanumeric() || matches!(c, ':' | '.' | '_' | '%' | '-'));
    }

    if !tape.consume_match("/") {
        return None;
    }
    let slug_start = tape.position();
    consume_path(tape, '/');
    if tape.position() == slug_start {
        return None;
    }
    Slashlink::new(tape.since(mark))
}

/// Consumes `segment *(separator segment)`; a separator is only taken when a
/// segment follows it.
fn consume_path(tape: &mut Tape<'_>, separator: char) {
    loop {
        tape.consume_while(is_path_char);
        let continues = tape.peek() == Some(separator) && tape.peek_nth(1).is_some_and(is_path_char);
        if !continues {
            break;
        }
        tape.advance();
    }
}

fn is_path_char(c: char) -> bool {
    is_word_char(c) || c == '-'
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::{parse_inline, Bold, Code, Inline, Italic, Wikilink};

    fn markups(inline: &[Inline]) -> Vec<&str> {
        inline.iter().map(Inline::markup).collect()
    }

    fn rendered(inline: &[Inline]) -> String {
        inline.iter().map(Inline::markup).collect()
    }

    #[test]
    fn parses_each_span_kind() {
        let source = "a [[Wiki Link]] b *bold* c _it_ d `code` e /slash/link f @bob/x";
        let inline = parse_inline(source);
        assert_eq!(rendered(&inline), source);
        assert!(matches!(&inline[1], Inline::Wikilink(w) if w.text() == "Wiki Link"));
        assert!(matches!(&inline[3], Inline::Bold(b) if b.text() == "bold"));
        assert!(matches!(&inline[5], Inline::Italic(i) if i.text() == "it"));
        assert!(matches!(&inline[7], Inline::Code(c) if c.text() == "code"));
        assert!(matches!(&inline[9], Inline::Slashlink(s) if s.slashlink().to_string() == "/slash/link"));
        assert!(matches!(&inline[11], Inline::Slashlink(s) if s.slashlink().to_string() == "@bob/x"));
    }

    #[test]
    fn span_markup_round_trips() {
        for source in ["[[hello world]]", "*bold move*", "_italic_", "`let x = 1;`"] {
            let inline = parse_inline(source);
            assert_eq!(inline.len(), 1, "{source}");
            assert_eq!(inline[0].markup(), source);
        }
    }

    #[test]
    fn markup_without_closing_tag_drops_final_delimiter() {
        assert_eq!(
            Wikilink::new("x").unwrap().markup_without_closing_tag(),
            "[[x"
        );
        assert_eq!(Bold::new("x").unwrap().markup_without_closing_tag(), "*x");
        assert_eq!(Italic::new("x").unwrap().markup_without_closing_tag(), "_x");
        assert_eq!(Code::new("x").unwrap().markup_without_closing_tag(), "`x");
    }

    #[test]
    fn unterminated_wikilink_is_text() {
        let inline = parse_inline("see [[nowhere");
        assert_eq!(inline, vec![Inline::Text("see [[nowhere".to_string())]);
    }

    #[test]
    fn closing_brackets_pair_with_nearest_opening() {
        let inline = parse_inline("[[a [[b]]");
        assert_eq!(markups(&inline), vec!["[[a ", "[[b]]"]);

        let inline = parse_inline("[[[[c]]");
        assert_eq!(markups(&inline), vec!["[[", "[[c]]"]);

        let inline = parse_inline("[[[d]]");
        assert_eq!(markups(&inline), vec!["[", "[[d]]"]);
    }

    #[test]
    fn empty_or_unclosed_delimiters_are_text() {
        for source in ["[[]]", "**", "__", "``", "*open", "_open", "`open", "*a\nb*"] {
            let inline = parse_inline(source);
            assert!(
                inline.iter().all(|span| matches!(span, Inline::Text(_))),
                "{source:?} -> {inline:?}"
            );
            assert_eq!(rendered(&inline), source);
        }
    }

    #[test]
    fn links_may_touch_surrounding_text() {
        let inline = parse_inline("x[[y]]z (/foo), /bar.");
        assert_eq!(markups(&inline), vec!["x", "[[y]]", "z (", "/foo", "), ", "/bar", "."]);
    }

    #[test]
    fn slashes_inside_words_and_urls_are_text() {
        for source in ["and/or", "https://example.com/path", "a@b/c"] {
            let inline = parse_inline(source);
            assert_eq!(inline, vec![Inline::Text(source.to_string())], "{source}");
        }
    }

    #[test]
    fn petname_without_slug_is_text() {
        let inline = parse_inline("hi @alice and @bob.");
        assert_eq!(inline, vec![Inline::Text("hi @alice and @bob.".to_string())]);
    }

    #[test]
    fn did_slashlinks_are_recognized() {
        let inline = parse_inline("via did:key:z6Mk/notes now");
        assert_eq!(markups(&inline), vec!["via ", "did:key:z6Mk/notes", " now"]);
    }

    #[test]
    fn emphasis_inside_words_is_text() {
        for source in ["snake_case_name", "2*3*4", "_open_ended", "x*bold*"] {
            let inline = parse_inline(source);
            assert_eq!(inline, vec![Inline::Text(source.to_string())], "{source}");
        }

        let inline = parse_inline("(_aside_), *loud*!");
        assert_eq!(markups(&inline), vec!["(", "_aside_", "), ", "*loud*", "!"]);
    }

    #[test]
    fn hidden_slug_slashlink_is_not_italic() {
        let inline = parse_inline("/_profile_");
        assert!(matches!(&inline[..], [Inline::Slashlink(_)]));
    }

    #[test]
    fn wikilink_to_slug_formats_text() {
        let wikilink = Wikilink::new("The Whale").unwrap();
        assert_eq!(wikilink.to_slug().verbatim(), "the-whale");
    }

    #[test]
    fn constructors_reject_unrepresentable_text() {
        assert!(Wikilink::new("").is_none());
        assert!(Wikilink::new("a]]b").is_none());
        assert!(Bold::new("a*b").is_none());
        assert!(Code::new("line\nbreak").is_none());
    }
}
