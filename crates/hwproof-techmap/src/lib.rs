//! Pattern rewriting for hwproof netlists
//!
//! Selected cells are replaced by the cell a [`ReplacementTemplate`]
//! describes. Rewriting never mutates its input: every call returns a new
//! [`Design`](hwproof_netlist::Design) under a fresh `techmap<N>` namespace so
//! the original stays inspectable.
//!
//! ```ignore
//! use hwproof_techmap::{rewrite, MatchPolicy, ReplacementTemplate, Selector};
//!
//! let selector = Selector::parse("top/t:$dlatch/w:clk")?;
//! let template = ReplacementTemplate::builtin("dlatch2dff")?;
//! let out = rewrite(&design, &selector, &template, MatchPolicy::RequireAny)?;
//! assert_eq!(out.design.cell_count("$dlatch"), 0);
//! ```

pub mod error;
pub mod rewrite;
pub mod selector;
pub mod template;

pub use error::{Result, RewriteError};
pub use rewrite::{
    count_matches, rewrite, select, MatchPolicy, Replacement, RewriteReport, Rewriter, Rewritten,
};
pub use selector::{ModuleScope, Predicate, Selector};
pub use template::{ParamRule, ReplacementTemplate, BUILTIN_TEMPLATES};
