//! Stack of currently-open tags

use crate::config::BreakabilityPolicy;

/// An open element: its lowercased name and the exact opening-tag source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenTag {
    pub name: String,
    pub opening: String,
}

impl OpenTag {
    /// Length reserved for this tag in a fragment: the opening text plus room for
    /// a matching `</name>`.
    pub fn accounted_len(&self) -> usize {
        accounted_tag_len(&self.name, &self.opening)
    }
}

/// `len(opening) + len(name) + 3`, an over-estimate that leaves room for the end tag.
pub fn accounted_tag_len(name: &str, opening: &str) -> usize {
    opening.chars().count() + name.chars().count() + 3
}

/// LIFO stack of open tags, used to close and reopen markup across a cut.
#[derive(Debug, Default)]
pub struct TagStack {
    entries: Vec<OpenTag>,
}

impl TagStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, opening: impl Into<String>) {
        self.entries.push(OpenTag {
            name: name.into(),
            opening: opening.into(),
        });
    }

    /// Remove the most recently pushed entry; `None` on an empty stack.
    pub fn pop(&mut self) -> Option<OpenTag> {
        self.entries.pop()
    }

    /// Index of the innermost open element called `name`.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().rposition(|t| t.name == name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// A cut is allowed iff every open tag belongs to the policy.
    pub fn is_wrapping_allowed(&self, policy: &BreakabilityPolicy) -> bool {
        policy.allows(self.names())
    }

    pub fn names(&self) -> impl DoubleEndedIterator<Item = &str> {
        self.entries.iter().map(|t| t.name.as_str())
    }

    /// End tags for every open element, innermost first.
    pub fn closing_markup(&self) -> String {
        let mut out = String::new();
        for name in self.names().rev() {
            out.push_str("</");
            out.push_str(name);
            out.push('>');
        }
        out
    }

    /// Original opening tags in document order, with their accounted length.
    pub fn reopening_markup(&self) -> (String, usize) {
        let mut out = String::new();
        let mut len = 0usize;
        for tag in &self.entries {
            out.push_str(&tag.opening);
            len += tag.accounted_len();
        }
        (out, len)
    }
}
