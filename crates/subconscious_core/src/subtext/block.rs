//! Subtext body: blank-line separated blocks of inline spans.

use super::inline::{parse_inline, Inline, Wikilink};
use super::tape::Tape;
use crate::model::slashlink::Slashlink;
use std::fmt::{Display, Formatter};

/// One paragraph-like run of non-blank lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    markup: String,
    inline: Vec<Inline>,
}

impl Block {
    fn parse(markup: &str) -> Self {
        Self {
            markup: markup.to_string(),
            inline: parse_inline(markup),
        }
    }

    pub fn markup(&self) -> &str {
        &self.markup
    }

    pub fn inline(&self) -> &[Inline] {
        &self.inline
    }

    pub fn plain_text(&self) -> String {
        self.inline.iter().map(Inline::plain_text).collect()
    }
}

/// Parsed body of a note. Renders back to its exact source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Subtext {
    source: String,
    blocks: Vec<Block>,
}

impl Subtext {
    pub fn parse(source: &str) -> Self {
        let mut tape = Tape::new(source);
        let mut blocks = Vec::new();
        let mut block_start: Option<usize> = None;
        let mut block_end = 0;

        while !tape.is_exhausted() {
            let line_start = tape.position();
            let line = tape.consume_line();
            if line.trim().is_empty() {
                if let Some(start) = block_start.take() {
                    blocks.push(Block::parse(&source[start..block_end]));
                }
            } else {
                block_start.get_or_insert(line_start);
                block_end = line_start + line.trim_end_matches(['\n', '\r']).len();
            }
        }
        if let Some(start) = block_start {
            blocks.push(Block::parse(&source[start..block_end]));
        }

        Self {
            source: source.to_string(),
            blocks,
        }
    }

    pub fn markup(&self) -> &str {
        &self.source
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn inline(&self) -> impl Iterator<Item = &Inline> {
        self.blocks.iter().flat_map(|block| block.inline.iter())
    }

    /// Plain text of every block, separated by blank lines.
    pub fn plain_text(&self) -> String {
        self.blocks
            .iter()
            .map(Block::plain_text)
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Whitespace-collapsed plain text of the first non-empty block,
    /// truncated to `max_chars`.
    pub fn excerpt(&self, max_chars: usize) -> String {
        self.blocks
            .iter()
            .map(|block| collapse_whitespace(&block.plain_text()))
            .find(|text| !text.is_empty())
            .map(|text| text.chars().take(max_chars).collect())
            .unwrap_or_default()
    }

    /// Outgoing slashlinks in document order.
    pub fn slashlinks(&self) -> Vec<&Slashlink> {
        self.inline()
            .filter_map(|span| match span {
                Inline::Slashlink(span) => Some(span.slashlink()),
                _ => None,
            })
            .collect()
    }

    pub fn wikilinks(&self) -> Vec<&Wikilink> {
        self.inline()
            .filter_map(|span| match span {
                Inline::Wikilink(span) => Some(span),
                _ => None,
            })
            .collect()
    }
}

impl Display for Subtext {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.source)
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
