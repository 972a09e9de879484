mod completion;
mod core;
mod keys;
mod raw_mode;

pub use completion::complete;
pub use self::core::{LineEditor, ReadOutcome, AUTO_COMPLETE_MARKER};
