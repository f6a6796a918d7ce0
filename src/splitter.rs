//! Fragment packing
//!
//! The [`Splitter`] drives the tokenizer over a message and packs the events into
//! fragments of at most `max_len` accounted characters. Tags left open at a cut are
//! closed at the end of the fragment and reopened, with their original attributes,
//! at the start of the next one. Content inside a tag outside the breakability
//! policy is collected whole and never cut.

use crate::config::SplitConfig;
use crate::error::{Result, SplitError};
use crate::tag_stack::{accounted_tag_len, TagStack};
use crate::tokenizer::{tokenize, StartTag, TokenSink};
use log::{debug, error, trace, warn};
use memchr::memrchr;
use std::io::{self, Write};
use std::mem;

/// Whether the innermost open context permits a cut
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FragmentState {
    #[default]
    Breakable,
    Unbreakable,
}

/// Text under construction with its accounted length
#[derive(Debug, Default)]
struct Buffer {
    text: String,
    len: usize,
    // nothing but reopened ancestors (and their end tags) since the last cut
    reopened_only: bool,
}

impl Buffer {
    fn push(&mut self, text: &str, len: usize) {
        self.text.push_str(text);
        self.len += len;
        self.reopened_only = false;
    }

    fn push_end_tag(&mut self, name: &str) {
        self.text.push_str("</");
        self.text.push_str(name);
        self.text.push('>');
    }

    fn append(&mut self, other: Buffer) {
        if !other.text.is_empty() {
            self.push(&other.text, other.len);
        }
    }

    fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Per-operation packing state. Created fresh for every `feed`.
struct Accumulator<'a, 'w> {
    config: &'a SplitConfig,
    diagnostics: Option<&'a mut (dyn Write + 'w)>,
    stack: TagStack,
    state: FragmentState,
    primary: Buffer,
    pending: Buffer,
    fragments: Vec<String>,
}

impl<'a, 'w> Accumulator<'a, 'w> {
    fn new(config: &'a SplitConfig, diagnostics: Option<&'a mut (dyn Write + 'w)>) -> Self {
        Self {
            config,
            diagnostics,
            stack: TagStack::new(),
            state: FragmentState::Breakable,
            primary: Buffer::default(),
            pending: Buffer::default(),
            fragments: Vec::new(),
        }
    }

    fn max_len(&self) -> usize {
        self.config.max_len
    }

    fn wrapping_allowed(&self) -> bool {
        self.stack.is_wrapping_allowed(&self.config.breakable_tags)
    }

    fn active(&mut self) -> &mut Buffer {
        match self.state {
            FragmentState::Breakable => &mut self.primary,
            FragmentState::Unbreakable => &mut self.pending,
        }
    }

    fn unsplittable(&self, len: usize) -> SplitError {
        let index = self.fragments.len() + 1;
        error!(
            "Unsplittable fragment #{index}: {len} chars, limit {}",
            self.max_len()
        );
        SplitError::UnsplittableFragment {
            index,
            len,
            max_len: self.max_len(),
        }
    }

    /// Merge the pending unbreakable content, or cut if it would overflow.
    fn dump(&mut self) -> Result<()> {
        if self.primary.len + self.pending.len < self.max_len() {
            let pending = mem::take(&mut self.pending);
            self.primary.append(pending);
            Ok(())
        } else {
            self.finalize()
        }
    }

    /// Close the current fragment, emit it, and seed the next one with the
    /// reopened ancestors followed by any pending content.
    fn finalize(&mut self) -> Result<()> {
        let closing = self.stack.closing_markup();
        let mut finished = mem::take(&mut self.primary);
        finished.text.push_str(&closing);

        if !finished.is_empty() && !finished.reopened_only {
            self.fragments.push(finished.text);
            let n = self.fragments.len();
            debug!("fragment #{n}: {} chars", finished.len);
            if let Some(out) = self.diagnostics.as_deref_mut() {
                writeln!(
                    out,
                    "-- fragment #{n}: {} chars --\n{}",
                    finished.len, self.fragments[n - 1]
                )?;
            }
        }

        let (preamble, len) = self.stack.reopening_markup();
        self.primary = Buffer {
            reopened_only: !preamble.is_empty(),
            text: preamble,
            len,
        };
        let pending = mem::take(&mut self.pending);
        self.primary.append(pending);

        if self.primary.len > self.max_len() {
            return Err(self.unsplittable(self.primary.len));
        }
        Ok(())
    }

    /// Close whatever the input left open, innermost first, then flush.
    fn finish(mut self) -> Result<Vec<String>> {
        while let Some(name) = self.stack.names().last().map(str::to_owned) {
            debug!("Closing <{name}> left open at end of input");
            self.end_tag(&name)?;
        }
        if !self.primary.is_empty() || !self.pending.is_empty() {
            self.finalize()?;
        }
        Ok(self.fragments)
    }
}

impl TokenSink for Accumulator<'_, '_> {
    type Error = SplitError;

    fn start_tag(&mut self, tag: &StartTag<'_>) -> Result<()> {
        let name = tag.name();
        let tag_len = accounted_tag_len(name, tag.raw());
        trace!("start <{name}> ({tag_len})");

        let allowed = self.config.breakable_tags.contains(name) && self.wrapping_allowed();
        if !allowed {
            self.stack.push(name, tag.raw());
            self.pending.push(tag.raw(), tag_len);
            self.state = FragmentState::Unbreakable;
            return Ok(());
        }

        self.state = FragmentState::Breakable;
        // An overflowing tag opens the next fragment instead
        if self.primary.len + tag_len > self.max_len() {
            self.finalize()?;
        }
        self.stack.push(name, tag.raw());
        self.primary.push(tag.raw(), tag_len);
        if self.primary.len > self.max_len() {
            return Err(self.unsplittable(self.primary.len));
        }
        Ok(())
    }

    fn end_tag(&mut self, name: &str) -> Result<()> {
        let Some(depth) = self.stack.position(name) else {
            warn!("Ignoring end tag </{name}> with no open element");
            return Ok(());
        };
        while self.stack.len() > depth {
            if let Some(open) = self.stack.pop() {
                self.active().push_end_tag(&open.name);
            }
        }

        if self.wrapping_allowed() {
            self.state = FragmentState::Breakable;
            self.dump()?;
        }
        Ok(())
    }

    fn text(&mut self, data: &str) -> Result<()> {
        if self.state == FragmentState::Unbreakable {
            self.pending.push(data, data.chars().count());
            return Ok(());
        }

        let mut data = data;
        let mut data_len = data.chars().count();
        let mut just_finalized = false;
        while self.primary.len + data_len > self.max_len() {
            let room = self.max_len().saturating_sub(self.primary.len);
            let cut = cut_index(data, room);
            if cut == 0 && just_finalized {
                return Err(self.unsplittable(self.primary.len + data_len));
            }
            let (head, tail) = data.split_at(cut);
            if !head.is_empty() {
                self.primary.push(head, head.chars().count());
            }
            self.finalize()?;
            just_finalized = true;
            data = tail;
            data_len = data.chars().count();
        }

        if !data.is_empty() {
            self.primary.push(data, data_len);
        }
        Ok(())
    }

    fn empty_tag(&mut self, tag: &StartTag<'_>) -> Result<()> {
        let len = tag.raw().chars().count();
        if self.state == FragmentState::Unbreakable {
            self.pending.push(tag.raw(), len);
            return Ok(());
        }
        if self.primary.len + len > self.max_len() {
            self.finalize()?;
            if self.primary.len + len > self.max_len() {
                return Err(self.unsplittable(self.primary.len + len));
            }
        }
        self.primary.push(tag.raw(), len);
        Ok(())
    }
}

/// Byte offset of the `room`-th char of `data`, moved back to the start of a
/// character reference the cut would otherwise split.
fn cut_index(data: &str, room: usize) -> usize {
    let cut = data.char_indices().nth(room).map_or(data.len(), |(i, _)| i);
    if let Some(amp) = memrchr(b'&', &data.as_bytes()[..cut]) {
        if let Some(ref_len) = char_ref_len(&data[amp..]) {
            if amp + ref_len > cut {
                return amp;
            }
        }
    }
    cut
}

/// Length of a `&name;` / `&#123;` reference at the start of `s`.
fn char_ref_len(s: &str) -> Option<usize> {
    let body = &s.as_bytes()[1..];
    let n = body
        .iter()
        .take_while(|b| b.is_ascii_alphanumeric() || **b == b'#')
        .count();
    (n > 0 && body.get(n) == Some(&b';')).then_some(n + 2)
}

/// Finalized fragments, in document order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fragments(Vec<String>);

impl Fragments {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.0.get(index).map(String::as_str)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<String> {
        self.0
    }
}

impl<'a> IntoIterator for &'a Fragments {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl IntoIterator for Fragments {
    type Item = String;
    type IntoIter = std::vec::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Splits HTML messages into well-formed fragments.
///
/// Every call to [`feed`](Splitter::feed) is an independent split operation: the
/// tag stack and buffers start empty and the previous fragments are replaced.
/// With `debug` enabled each finalized fragment is written to the diagnostics
/// sink (stdout unless [`with_diagnostics`](Splitter::with_diagnostics) is used).
pub struct Splitter<'w> {
    config: SplitConfig,
    diagnostics: Box<dyn Write + 'w>,
    fragments: Fragments,
}

impl Splitter<'static> {
    pub fn new(config: SplitConfig) -> Self {
        Self::with_diagnostics(config, io::stdout())
    }
}

impl<'w> Splitter<'w> {
    pub fn with_diagnostics<W: Write + 'w>(config: SplitConfig, diagnostics: W) -> Self {
        Self {
            config,
            diagnostics: Box::new(diagnostics),
            fragments: Fragments::default(),
        }
    }

    pub fn config(&self) -> &SplitConfig {
        &self.config
    }

    /// Split `source`. On error no fragments are kept.
    pub fn feed(&mut self, source: &str) -> Result<()> {
        self.fragments = Fragments::default();

        let diagnostics = if self.config.debug {
            Some(self.diagnostics.as_mut())
        } else {
            None
        };
        let mut acc = Accumulator::new(&self.config, diagnostics);
        tokenize(source, &mut acc)?;
        let fragments = acc.finish()?;

        if self.config.debug {
            self.diagnostics.flush()?;
        }
        debug!("split {} chars into {} fragment(s)", source.len(), fragments.len());
        self.fragments = Fragments(fragments);
        Ok(())
    }

    /// Fragments of the last successful `feed`.
    pub fn fragments(&self) -> &Fragments {
        &self.fragments
    }

    pub fn into_fragments(self) -> Fragments {
        self.fragments
    }
}

/// Split `source` into fragments of at most `max_len` accounted characters,
/// using the default breakable tags.
pub fn split_message(source: &str, max_len: usize) -> Result<Fragments> {
    let config = SplitConfig::builder().max_len(max_len).build()?;
    let mut splitter = Splitter::new(config);
    splitter.feed(source)?;
    Ok(splitter.into_fragments())
}
