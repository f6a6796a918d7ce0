//! htmlsplit
//!
//! Splits an HTML message into an ordered sequence of fragments, each at most a
//! configured number of characters long and each independently well-formed: tags
//! open at a cut are closed at the end of the fragment and reopened, attributes
//! included, at the start of the next one.
//!
//! ```
//! let fragments = htmlsplit::split_message("<p>Hello</p><p>world</p>", 15).unwrap();
//! assert_eq!(fragments.as_slice(), ["<p>Hello</p>", "<p>world</p>"]);
//! ```

pub mod config;
pub mod error;
pub mod splitter;
pub mod tag_stack;
pub mod tokenizer;

pub use config::{BreakabilityPolicy, SplitConfig, SplitConfigBuilder};
pub use error::{Result, SplitError};
pub use splitter::{split_message, FragmentState, Fragments, Splitter};
