//! Rewrite errors

use hwproof_netlist::NetlistError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, RewriteError>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RewriteError {
    #[error("invalid selector `{selector}`: {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("selector `{selector}` matched no cells")]
    NoMatch { selector: String },

    /// The rewrite could match its own output
    #[error("rewrite of `{selector}` with `{template}` is not idempotent: {reason}")]
    NotIdempotent {
        selector: String,
        template: String,
        reason: String,
    },

    #[error("unknown replacement template `{0}`")]
    UnknownTemplate(String),

    #[error("cannot map parameter `{param}` of cell `{cell}`: {detail}")]
    InvalidParameter {
        cell: String,
        param: String,
        detail: String,
    },

    #[error("cell `{name}` already exists in module `{module}`")]
    NameCollision { module: String, name: String },

    #[error("ports of cell `{cell}` collide on `{port}` after renaming")]
    PortCollision { cell: String, port: String },

    #[error(transparent)]
    Schema(#[from] NetlistError),
}
