use subconscious_core::subtext::Inline;
use subconscious_core::{parse_document, Memo, Slashlink, Subtext};

const NOTE: &str = "Content-Type: text/subtext\n\
Title: Loomings\n\
Created: 2023-02-01T10:00:00Z\n\
\n\
Call me *Ishmael*. See /whaling and @queequeg/harpoons.\n\
\n\
\n\
Some years ago, [[never mind how long]] precisely, `having little` money.\n\
_damp, drizzly November_ in my soul.";

#[test]
fn parses_headers_blocks_and_links() {
    let document = parse_document(NOTE);
    assert_eq!(document.headers().len(), 3);
    assert_eq!(document.headers().title(), Some("Loomings"));

    let body = document.body();
    assert_eq!(body.blocks().len(), 2);
    assert_eq!(
        body.slashlinks(),
        vec![
            &Slashlink::new("/whaling").unwrap(),
            &Slashlink::new("@queequeg/harpoons").unwrap()
        ]
    );
    assert_eq!(body.wikilinks().len(), 1);
    assert_eq!(body.wikilinks()[0].to_slug().verbatim(), "never-mind-how-long");
}

#[test]
fn document_renders_back_exactly() {
    for input in [
        NOTE,
        "",
        "\n\n\n",
        "No headers at all, just prose: with a colon.",
        "Title: Only headers\n",
        "Title: a\nBroken line\n\nmore",
        "*unclosed [[link `code\r\n\r\n_x_",
    ] {
        assert_eq!(parse_document(input).to_string(), input, "{input:?}");
    }
}

#[test]
fn block_markup_round_trips_span_by_span() {
    let body = Subtext::parse("a *b* _c_ `d` [[e]] /f @g/h\nsecond line\n\nnext");
    for block in body.blocks() {
        let rebuilt: String = block.inline().iter().map(Inline::markup).collect();
        assert_eq!(rebuilt, block.markup());
    }
    assert_eq!(body.blocks()[0].markup(), "a *b* _c_ `d` [[e]] /f @g/h\nsecond line");
    assert_eq!(body.blocks()[1].markup(), "next");
}

#[test]
fn malformed_markup_degrades_to_text() {
    let body = Subtext::parse("[[ *a _b `c [[d");
    let spans = body.inline().collect::<Vec<_>>();
    assert_eq!(spans.len(), 1);
    assert!(matches!(spans[0], Inline::Text(text) if text == "[[ *a _b `c [[d"));
}

#[test]
fn excerpt_skips_blank_blocks_and_collapses_whitespace() {
    let body = Subtext::parse("\n\n  The   *whale*\n  surfaced.  \n\nLater.");
    assert_eq!(body.excerpt(120), "The whale surfaced.");
    assert_eq!(body.excerpt(3), "The");
}

#[test]
fn memo_parse_reads_well_known_headers() {
    let fallback = chrono::DateTime::from_timestamp(0, 0).unwrap();
    let memo = Memo::parse(NOTE, fallback);
    assert_eq!(memo.title, "Loomings");
    assert_eq!(memo.created.to_rfc3339(), "2023-02-01T10:00:00+00:00");
    assert_eq!(memo.modified, fallback);
    assert!(memo.body.starts_with("Call me *Ishmael*."));
}

#[test]
fn memo_without_title_uses_excerpt() {
    let fallback = chrono::DateTime::from_timestamp(0, 0).unwrap();
    let memo = Memo::parse("It was the best of times.\n\nIt was the worst.", fallback);
    assert_eq!(memo.title, "It was the best of times.");
    assert_eq!(memo.created, fallback);

    let empty = Memo::parse("", fallback);
    assert_eq!(empty.title, "Untitled");
}

#[test]
fn memo_document_text_parses_back() {
    let now = chrono::DateTime::from_timestamp(1_700_000_000, 0).unwrap();
    let memo = Memo::new("Moby Dick", "Call me /ishmael.", now);
    let reparsed = Memo::parse(&memo.to_document_text(), now);
    assert_eq!(reparsed, memo);
}
