//! Token buffer: the remaining CLI tokens of a single parse call.
//!
//! One buffer is created per `parse` and handed by `&mut` to every
//! extractor in turn, so each extractor sees exactly what the previous
//! one left behind. Consumption happens from the front (`pop_front`,
//! `take_all`), from anywhere in the buffer (`take_flag`, `take_named`)
//! or from a sentinel-delimited suffix (`take_after_sentinel`).

use std::collections::VecDeque;

/// Sentinel separating parsed tokens from pass-through tokens.
pub const SENTINEL: &str = "--";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenBuffer {
    tokens: VecDeque<String>,
}

impl TokenBuffer {
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tokens: tokens.into_iter().map(Into::into).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Peek at the first token without consuming it.
    pub fn front(&self) -> Option<&str> {
        self.tokens.front().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().map(String::as_str)
    }

    pub fn pop_front(&mut self) -> Option<String> {
        self.tokens.pop_front()
    }

    /// Drain every remaining token, preserving order.
    pub fn take_all(&mut self) -> Vec<String> {
        self.tokens.drain(..).collect()
    }

    /// Remove every token equal to one of `spellings`; returns how many
    /// were removed.
    pub fn take_flag(&mut self, spellings: &[String]) -> usize {
        let before = self.tokens.len();
        self.tokens.retain(|t| !spellings.iter().any(|s| s == t));
        before - self.tokens.len()
    }

    /// Remove every `<option> <value>` pair where `<option>` matches one
    /// of `spellings`, returning the values in match order.
    ///
    /// An option token in last position has no value and stays put.
    pub fn take_named(&mut self, spellings: &[String]) -> Vec<String> {
        let mut values = Vec::new();
        let mut idx = 0;
        while idx + 1 < self.tokens.len() {
            if spellings.iter().any(|s| *s == self.tokens[idx]) {
                self.tokens.remove(idx);
                if let Some(value) = self.tokens.remove(idx) {
                    values.push(value);
                }
            } else {
                idx += 1;
            }
        }
        values
    }

    /// Split off everything after the first [`SENTINEL`]. The sentinel
    /// itself is dropped. `None` when no sentinel is present.
    pub fn take_after_sentinel(&mut self) -> Option<Vec<String>> {
        let pos = self.tokens.iter().position(|t| t == SENTINEL)?;
        let mut suffix: Vec<String> = self.tokens.split_off(pos).into();
        suffix.remove(0);
        Some(suffix)
    }
}

impl<S: Into<String>> FromIterator<S> for TokenBuffer {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        TokenBuffer::new(iter)
    }
}
