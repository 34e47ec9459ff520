//! Frame context: which embedded document the session is addressing.
//!
//! The context is a plain value (the path of frame locators from the
//! top-level document) rather than hidden session state. Frame-aware engine
//! operations hand back the context that was active before they switched,
//! and [`crate::WaitEngine::within_frame`] restores it on every exit path.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::locator::Locator;

/// Path of frames from the top-level document to the addressed document
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameContext {
    path: Vec<Locator>,
}

impl FrameContext {
    /// The top-level document (default content)
    #[must_use]
    pub const fn top() -> Self {
        Self { path: Vec::new() }
    }

    /// Build a context from an explicit frame path
    #[must_use]
    pub fn from_path(path: Vec<Locator>) -> Self {
        Self { path }
    }

    /// Whether this is the top-level document
    #[must_use]
    pub fn is_top(&self) -> bool {
        self.path.is_empty()
    }

    /// Nesting depth (0 for the top-level document)
    #[must_use]
    pub fn depth(&self) -> usize {
        self.path.len()
    }

    /// Frame locators from outermost to innermost
    #[must_use]
    pub fn path(&self) -> &[Locator] {
        &self.path
    }

    /// Context of a frame found inside this one
    #[must_use]
    pub fn child(&self, frame: Locator) -> Self {
        let mut path = self.path.clone();
        path.push(frame);
        Self { path }
    }

    /// Enclosing context, `None` at the top
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        let (_, outer) = self.path.split_last()?;
        Some(Self {
            path: outer.to_vec(),
        })
    }
}

impl fmt::Display for FrameContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("top")?;
        for frame in &self.path {
            write!(f, " > {frame}")?;
        }
        Ok(())
    }
}
