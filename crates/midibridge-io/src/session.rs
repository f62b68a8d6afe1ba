//! What a facade is currently bound to.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An available port, as listed by a facade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortInfo {
    /// Index to pass to `open_port`. Only valid until the port list changes.
    pub index: usize,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortBinding {
    Real { index: usize, name: String },
    Virtual { name: String },
}

impl PortBinding {
    pub fn name(&self) -> &str {
        match self {
            PortBinding::Real { name, .. } | PortBinding::Virtual { name } => name,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortSession {
    #[default]
    Unbound,
    Bound(PortBinding),
}

impl PortSession {
    pub fn is_bound(&self) -> bool {
        matches!(self, PortSession::Bound(_))
    }

    pub fn binding(&self) -> Option<&PortBinding> {
        match self {
            PortSession::Bound(binding) => Some(binding),
            PortSession::Unbound => None,
        }
    }
}

impl fmt::Display for PortSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortSession::Unbound => write!(f, "unbound"),
            PortSession::Bound(PortBinding::Real { index, name }) => {
                write!(f, "port {} ({})", index, name)
            }
            PortSession::Bound(PortBinding::Virtual { name }) => write!(f, "virtual '{}'", name),
        }
    }
}
