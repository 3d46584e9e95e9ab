//! RTLIL text format support

pub mod lexer;
pub mod parser;
pub mod writer;

pub use parser::parse;
pub use writer::write_rtlil;
