use std::fmt;
use std::hash::Hash;

use hearth_protocol::SharedStr;
use serde::{Deserialize, Serialize};

/// What the core needs from a frame identity: structural equality and
/// hashing, cheap clones for synthetic trees, and `Debug` for logs.
///
/// Implemented for every type that satisfies the bounds.
pub trait FrameIdentity: Clone + Eq + Hash + fmt::Debug {}

impl<T> FrameIdentity for T where T: Clone + Eq + Hash + fmt::Debug {}

/// A method frame, e.g. `java.util.Random.nextInt` or `StupidMain$A.foo`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MethodFrame {
    /// Declaring type; empty for free functions.
    pub type_name: SharedStr,
    pub method: SharedStr,
}

impl MethodFrame {
    pub fn new(type_name: impl Into<SharedStr>, method: impl Into<SharedStr>) -> Self {
        Self {
            type_name: type_name.into(),
            method: method.into(),
        }
    }

    /// Split a qualified name at its last `.`; a name without a dot is a
    /// method with no declaring type.
    pub fn parse(qualified: &str) -> Self {
        match qualified.rsplit_once('.') {
            Some((type_name, method)) => Self::new(type_name, method),
            None => Self::new("", qualified),
        }
    }
}

impl From<&str> for MethodFrame {
    fn from(qualified: &str) -> Self {
        Self::parse(qualified)
    }
}

impl fmt::Display for MethodFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.type_name.is_empty() {
            write!(f, "{}", self.method)
        } else {
            write!(f, "{}.{}", self.type_name, self.method)
        }
    }
}
