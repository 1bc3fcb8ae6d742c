//! The resumable converter stack.
//!
//! One [`ReadFrame`] or [`WriteFrame`] exists per in-progress nesting level.
//! Converters never recurse the host call stack across values that can
//! suspend; instead each resumable converter claims a frame with
//! [`ReadStack::enter`], records its progress in the frame's flags, and on
//! suspension the whole stack of frames survives so a later re-entry resumes
//! exactly where work stopped. Suspension is a boolean that propagates
//! outward; no unwinding, no errors as control flow.

mod driver;
pub(crate) mod read;
pub(crate) mod write;

pub use driver::{from_slice, from_slice_default, to_vec, to_vec_default, Deserializer, Serializer};

use std::any::Any;

use crate::{
    descriptor::PropertyRing,
    error::{Error, Result, StructuralError},
    path::{render_path, PathItem},
    reader::{JsonReader, TokenType},
    writer::JsonWriter,
};

/// Per-property / per-element progress markers, a small state machine that
/// lets a frame re-enter mid-step without redoing completed work.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Progress(u8);

impl Progress {
    pub(crate) const START: u8 = 1;
    pub(crate) const READ_NAME: u8 = 1 << 1;
    pub(crate) const NAME: u8 = 1 << 2;
    pub(crate) const READ_VALUE: u8 = 1 << 3;
    pub(crate) const VALUE: u8 = 1 << 4;

    pub(crate) fn has(self, flag: u8) -> bool {
        self.0 & flag != 0
    }

    pub(crate) fn set(&mut self, flag: u8) {
        self.0 |= flag;
    }

    /// Clears the per-property flags, keeping `START`.
    pub(crate) fn next_property(&mut self) {
        self.0 &= Self::START;
    }
}

/// What the property currently being read resolves to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) enum Pending {
    #[default]
    None,
    /// Index into the compiled property table.
    Member(usize),
    /// Unknown property captured by the extension member.
    Extension,
    /// Unknown property with no extension member; value is skipped.
    Skip,
}

/// One nesting level of an in-progress read.
#[derive(Default)]
pub(crate) struct ReadFrame {
    pub(crate) flags: Progress,
    /// Object under construction (object machines).
    pub(crate) object: Option<Box<dyn Any>>,
    /// Working element list (collection machines).
    pub(crate) items: Vec<Box<dyn Any>>,
    /// Working entry list (dictionary machines).
    pub(crate) entries: Vec<(String, Box<dyn Any>)>,
    /// Key scratch for dictionaries and key-value pairs.
    pub(crate) dict_key: Option<String>,
    pub(crate) pending: Pending,
    /// Wire name of the property being processed.
    pub(crate) pending_name: Option<String>,
    /// Element index (arrays) used for the diagnostics path.
    pub(crate) index: usize,
    pub(crate) name_ring: PropertyRing,
    pub(crate) is_array: bool,
}

impl ReadFrame {
    fn path_item(&self) -> Option<PathItem> {
        if self.is_array {
            Some(PathItem::Index(self.index))
        } else {
            self.pending_name.clone().map(PathItem::Key)
        }
    }
}

/// One nesting level of an in-progress write.
#[derive(Default)]
pub(crate) struct WriteFrame {
    pub(crate) flags: Progress,
    /// Member / element / entry cursor.
    pub(crate) index: usize,
    /// Element snapshot (collection machines).
    pub(crate) items: Vec<Box<dyn Any>>,
    /// Entry snapshot (dictionary and extension machines).
    pub(crate) entries: Vec<(String, Box<dyn Any>)>,
    /// The member value currently being written.
    pub(crate) current_value: Option<Box<dyn Any>>,
    pub(crate) pending_name: Option<String>,
    pub(crate) is_array: bool,
}

/// The ordered frame arena of one logical read.
///
/// `depth` marks the active frame; frames above it belong to a suspended
/// continuation and are re-claimed by [`enter`](Self::enter) on re-entry.
pub struct ReadStack {
    frames: Vec<ReadFrame>,
    depth: usize,
    max_depth: usize,
}

impl ReadStack {
    #[must_use]
    pub(crate) fn new(max_depth: usize) -> Self {
        Self {
            frames: Vec::new(),
            depth: 0,
            max_depth,
        }
    }

    /// Claims the frame for the next nesting level: a fresh one, or the
    /// frame a suspended continuation left behind.
    pub(crate) fn enter(&mut self) -> Result<()> {
        if self.depth == self.frames.len() {
            if self.frames.len() >= self.max_depth {
                return Err(Error::detached(StructuralError::DepthExceeded(self.max_depth)));
            }
            self.frames.push(ReadFrame::default());
        }
        self.depth += 1;
        Ok(())
    }

    /// Pops the current frame after its value completed.
    pub(crate) fn exit_complete(&mut self) {
        self.frames.truncate(self.depth.saturating_sub(1));
        self.depth = self.depth.saturating_sub(1);
    }

    /// Releases the current frame for later resumption.
    pub(crate) fn exit_suspend(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    pub(crate) fn current(&mut self) -> &mut ReadFrame {
        let idx = self.depth - 1;
        &mut self.frames[idx]
    }

    /// The JSON-Path-like location of the in-progress value, for errors.
    #[must_use]
    pub fn path(&self) -> String {
        let items: Vec<PathItem> = self
            .frames
            .iter()
            .take(self.depth.max(1).min(self.frames.len()))
            .filter_map(ReadFrame::path_item)
            .collect();
        render_path(items.iter())
    }
}

/// The ordered frame arena of one logical write.
pub struct WriteStack {
    frames: Vec<WriteFrame>,
    depth: usize,
    max_depth: usize,
    /// Pending-byte high-water mark; crossing it suspends the write so the
    /// caller can drain the sink.
    flush_threshold: u64,
}

impl WriteStack {
    #[must_use]
    pub(crate) fn new(max_depth: usize, flush_threshold: usize) -> Self {
        Self {
            frames: Vec::new(),
            depth: 0,
            max_depth,
            flush_threshold: flush_threshold as u64,
        }
    }

    pub(crate) fn enter(&mut self) -> Result<()> {
        if self.depth == self.frames.len() {
            if self.frames.len() >= self.max_depth {
                return Err(Error::detached(StructuralError::DepthExceeded(self.max_depth)));
            }
            self.frames.push(WriteFrame::default());
        }
        self.depth += 1;
        Ok(())
    }

    pub(crate) fn exit_complete(&mut self) {
        self.frames.truncate(self.depth.saturating_sub(1));
        self.depth = self.depth.saturating_sub(1);
    }

    pub(crate) fn exit_suspend(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    pub(crate) fn current(&mut self) -> &mut WriteFrame {
        let idx = self.depth - 1;
        &mut self.frames[idx]
    }

    /// True when enough output has accumulated that the machine should
    /// suspend at the next boundary.
    pub(crate) fn should_flush(&self, writer: &JsonWriter<'_>) -> bool {
        writer.bytes_pending() >= self.flush_threshold
    }

    /// Location of the in-progress value, for errors.
    #[must_use]
    pub fn path(&self) -> String {
        let items: Vec<PathItem> = self
            .frames
            .iter()
            .take(self.depth.max(1).min(self.frames.len()))
            .filter_map(|frame| {
                if frame.is_array {
                    Some(PathItem::Index(frame.index))
                } else {
                    frame.pending_name.clone().map(PathItem::Key)
                }
            })
            .collect();
        render_path(items.iter())
    }
}

/// Reads the next grammatical token, looping over surfaced comments.
pub(crate) fn read_significant(reader: &mut JsonReader<'_>) -> Result<bool> {
    loop {
        if !reader.read()? {
            return Ok(false);
        }
        if reader.token_type() != TokenType::Comment {
            return Ok(true);
        }
    }
}
