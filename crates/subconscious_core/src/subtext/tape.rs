//! Cursor over an immutable source buffer.
//!
//! # Invariants
//! - `start <= current <= base.len()`; all offsets sit on char boundaries.
//! - `cut` only ever moves `start` forward.
//! - One save slot: `backtrack` returns to the most recent `save`.

#[derive(Debug, Clone)]
pub struct Tape<'a> {
    base: &'a str,
    start: usize,
    current: usize,
    saved: usize,
}

impl<'a> Tape<'a> {
    pub fn new(base: &'a str) -> Self {
        Self {
            base,
            start: 0,
            current: 0,
            saved: 0,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.current >= self.base.len()
    }

    pub fn position(&self) -> usize {
        self.current
    }

    /// Unread remainder of the buffer.
    pub fn rest(&self) -> &'a str {
        &self.base[self.current..]
    }

    /// Slice from `mark` up to the cursor.
    pub fn since(&self, mark: usize) -> &'a str {
        &self.base[mark.min(self.current)..self.current]
    }

    pub fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    /// Looks `offset` chars ahead of the cursor without moving.
    pub fn peek_nth(&self, offset: usize) -> Option<char> {
        self.rest().chars().nth(offset)
    }

    /// Char immediately before the cursor.
    pub fn peek_back(&self) -> Option<char> {
        self.base[..self.current].chars().next_back()
    }

    pub fn advance(&mut self) {
        if let Some(c) = self.peek() {
            self.current += c.len_utf8();
        }
    }

    pub fn consume(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.current += c.len_utf8();
        Some(c)
    }

    /// Consumes `expected` if the remainder starts with it.
    pub fn consume_match(&mut self, expected: &str) -> bool {
        if self.rest().starts_with(expected) {
            self.current += expected.len();
            true
        } else {
            false
        }
    }

    /// Advances while `predicate` holds; returns the consumed slice.
    pub fn consume_while(&mut self, predicate: impl Fn(char) -> bool) -> &'a str {
        let from = self.current;
        while let Some(c) = self.peek() {
            if !predicate(c) {
                break;
            }
            self.current += c.len_utf8();
        }
        &self.base[from..self.current]
    }

    /// Consumes through the next newline (inclusive) or to the end.
    pub fn consume_line(&mut self) -> &'a str {
        let from = self.current;
        match self.rest().find('\n') {
            Some(index) => self.current += index + 1,
            None => self.current = self.base.len(),
        }
        &self.base[from..self.current]
    }

    /// Emits everything since the last cut and moves the cut point to the
    /// cursor.
    pub fn cut(&mut self) -> &'a str {
        let slice = &self.base[self.start..self.current];
        self.start = self.current;
        slice
    }

    /// Emits `start..end` and moves the cut point to `end`.
    ///
    /// `end` is clamped into `start..=current`.
    pub fn cut_to(&mut self, end: usize) -> &'a str {
        let end = end.clamp(self.start, self.current);
        let slice = &self.base[self.start..end];
        self.start = end;
        slice
    }

    pub fn save(&mut self) {
        self.saved = self.current;
    }

    pub fn backtrack(&mut self) {
        self.current = self.saved.max(self.start);
    }
}
