//! Constants and signal specifications
//!
//! A [`SigSpec`] names the bits a cell port or module connection is attached
//! to: a whole wire, a slice of a wire, a constant, or a concatenation.

use crate::unescape;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Constant value used for parameters, attributes and constant drivers
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Const {
    /// Plain integer (`16`, `-1`)
    Int(i64),
    /// Sized bit string, MSB first (`4'10x1`)
    Bits(String),
    /// Quoted string
    Str(String),
}

impl Const {
    /// Single-bit constant
    pub fn bit(value: bool) -> Self {
        Const::Bits(if value { "1" } else { "0" }.to_string())
    }

    /// All-zero bit string of the given width
    pub fn zeros(width: usize) -> Self {
        Const::Bits("0".repeat(width))
    }

    /// Integer interpretation, if every bit is defined
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Const::Int(value) => Some(*value),
            Const::Bits(bits) if bits.len() <= 63 => {
                if bits.is_empty() {
                    return Some(0);
                }
                i64::from_str_radix(bits, 2).ok()
            }
            _ => None,
        }
    }

    /// Truthiness of a polarity-style constant
    pub fn as_bool(&self) -> Option<bool> {
        self.as_int().map(|value| value != 0)
    }

    /// Value equality across representations (`1` equals `1'1`)
    pub fn same_value(&self, other: &Const) -> bool {
        match (self.as_int(), other.as_int()) {
            (Some(a), Some(b)) => a == b,
            _ => self == other,
        }
    }

    /// Logical inversion of a one-bit polarity constant
    ///
    /// Returns `None` for values that are not a defined single bit.
    pub fn inverted(&self) -> Option<Const> {
        match self {
            Const::Int(0) => Some(Const::Int(1)),
            Const::Int(1) => Some(Const::Int(0)),
            Const::Bits(bits) if bits == "0" => Some(Const::bit(true)),
            Const::Bits(bits) if bits == "1" => Some(Const::bit(false)),
            _ => None,
        }
    }
}

impl fmt::Display for Const {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Const::Int(value) => write!(f, "{}", value),
            Const::Bits(bits) => write!(f, "{}'{}", bits.len(), bits),
            Const::Str(text) => {
                write!(f, "\"")?;
                for c in text.chars() {
                    match c {
                        '"' => write!(f, "\\\"")?,
                        '\\' => write!(f, "\\\\")?,
                        '\n' => write!(f, "\\n")?,
                        '\t' => write!(f, "\\t")?,
                        other => write!(f, "{}", other)?,
                    }
                }
                write!(f, "\"")
            }
        }
    }
}

impl FromStr for Const {
    type Err = String;

    /// Parses the literal forms accepted in selectors and configuration:
    /// integers, sized bit strings and quoted strings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(inner) = s.strip_prefix('"').and_then(|rest| rest.strip_suffix('"')) {
            return Ok(Const::Str(inner.to_string()));
        }
        if let Some((width, bits)) = s.split_once('\'') {
            let width: usize = width
                .parse()
                .map_err(|_| format!("invalid bit width in `{}`", s))?;
            if bits.len() != width {
                return Err(format!(
                    "bit string `{}` has {} bits, expected {}",
                    s,
                    bits.len(),
                    width
                ));
            }
            if !bits.chars().all(|c| matches!(c, '0' | '1' | 'x' | 'z' | 'm' | '-')) {
                return Err(format!("invalid bit value in `{}`", s));
            }
            return Ok(Const::Bits(bits.to_string()));
        }
        s.parse::<i64>()
            .map(Const::Int)
            .map_err(|_| format!("`{}` is not a constant", s))
    }
}

/// Signal specification attached to a port or connection
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SigSpec {
    /// A whole wire
    Wire(String),
    /// A slice `wire [msb:lsb]`, or a single bit when `msb == lsb`
    Slice { wire: String, msb: i64, lsb: i64 },
    /// Constant driver
    Const(Const),
    /// Concatenation, MSB chunk first
    Concat(Vec<SigSpec>),
}

impl SigSpec {
    pub fn wire(name: impl Into<String>) -> Self {
        SigSpec::Wire(crate::escape(&name.into()))
    }

    /// Wires referenced by this signal, in order of appearance
    pub fn wires(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_wires(&mut names);
        names
    }

    fn collect_wires<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            SigSpec::Wire(name) | SigSpec::Slice { wire: name, .. } => names.push(name),
            SigSpec::Const(_) => {}
            SigSpec::Concat(parts) => {
                for part in parts {
                    part.collect_wires(names);
                }
            }
        }
    }

    /// Whether any chunk of this signal comes from the named wire
    ///
    /// The name may be given with or without the leading `\`.
    pub fn references(&self, wire: &str) -> bool {
        let wanted = unescape(wire);
        self.wires().iter().any(|name| unescape(name) == wanted)
    }
}

impl fmt::Display for SigSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SigSpec::Wire(name) => write!(f, "{}", name),
            SigSpec::Slice { wire, msb, lsb } if msb == lsb => write!(f, "{} [{}]", wire, msb),
            SigSpec::Slice { wire, msb, lsb } => write!(f, "{} [{}:{}]", wire, msb, lsb),
            SigSpec::Const(value) => write!(f, "{}", value),
            SigSpec::Concat(parts) => {
                write!(f, "{{")?;
                for part in parts {
                    write!(f, " {}", part)?;
                }
                write!(f, " }}")
            }
        }
    }
}
