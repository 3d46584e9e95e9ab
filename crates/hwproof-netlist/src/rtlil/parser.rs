//! Line-oriented RTLIL parser
//!
//! Accepts the subset emitted after `proc`: modules, wires, cells and
//! connections. `process` and `memory` blocks are rejected.

use super::lexer::{tokenize_lines, Line, Token};
use crate::design::{Cell, Design, Module, Port, PortDirection, Wire};
use crate::error::{NetlistError, Result};
use crate::sigspec::{Const, SigSpec};
use indexmap::IndexMap;
use tracing::debug;

/// Parse RTLIL source into a design
pub fn parse(name: &str, source: &str) -> Result<Design> {
    let lines = tokenize_lines(source);
    let mut parser = Parser {
        lines: &lines,
        index: 0,
    };
    let design = parser.design(name)?;
    debug!(
        "Parsed design {} with {} module(s)",
        design.name,
        design.modules.len()
    );
    Ok(design)
}

struct Parser<'a> {
    lines: &'a [Line],
    index: usize,
}

/// Cursor over the tokens of one line
struct Cursor<'a> {
    line: usize,
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(line: &'a Line) -> Self {
        Self {
            line: line.number,
            tokens: &line.tokens,
            pos: 0,
        }
    }

    fn error(&self, message: impl Into<String>) -> NetlistError {
        NetlistError::parse(self.line, message)
    }

    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, wanted: Token) -> Result<()> {
        match self.next() {
            Some(token) if *token == wanted => Ok(()),
            Some(token) => Err(self.error(format!("expected `{}`, found `{}`", wanted, token))),
            None => Err(self.error(format!("expected `{}`", wanted))),
        }
    }

    fn id(&mut self) -> Result<String> {
        match self.next() {
            Some(Token::PublicId(id)) | Some(Token::AutoId(id)) => Ok(id.clone()),
            Some(token) => Err(self.error(format!("expected identifier, found `{}`", token))),
            None => Err(self.error("expected identifier")),
        }
    }

    fn int(&mut self) -> Result<i64> {
        match self.next() {
            Some(Token::Int(value)) => Ok(*value),
            Some(token) => Err(self.error(format!("expected integer, found `{}`", token))),
            None => Err(self.error("expected integer")),
        }
    }

    fn constant(&mut self) -> Result<Const> {
        match self.next() {
            Some(Token::Int(value)) => Ok(Const::Int(*value)),
            Some(Token::Bits(bits)) => Ok(Const::Bits(bits.clone())),
            Some(Token::Str(text)) => Ok(Const::Str(text.clone())),
            Some(token) => Err(self.error(format!("expected constant, found `{}`", token))),
            None => Err(self.error("expected constant")),
        }
    }

    fn sigspec(&mut self) -> Result<SigSpec> {
        let base = match self.next() {
            Some(Token::LBrace) => {
                let mut parts = Vec::new();
                loop {
                    match self.peek() {
                        Some(Token::RBrace) => {
                            self.pos += 1;
                            break;
                        }
                        Some(_) => parts.push(self.sigspec()?),
                        None => return Err(self.error("unterminated concatenation")),
                    }
                }
                return Ok(SigSpec::Concat(parts));
            }
            Some(Token::PublicId(id)) | Some(Token::AutoId(id)) => id.clone(),
            Some(Token::Int(value)) => return Ok(SigSpec::Const(Const::Int(*value))),
            Some(Token::Bits(bits)) => return Ok(SigSpec::Const(Const::Bits(bits.clone()))),
            Some(token) => {
                return Err(self.error(format!("expected signal, found `{}`", token)));
            }
            None => return Err(self.error("expected signal")),
        };

        if self.peek() != Some(&Token::LBracket) {
            return Ok(SigSpec::Wire(base));
        }
        self.pos += 1;
        let msb = self.int()?;
        let lsb = if self.peek() == Some(&Token::Colon) {
            self.pos += 1;
            self.int()?
        } else {
            msb
        };
        self.expect(Token::RBracket)?;
        Ok(SigSpec::Slice {
            wire: base,
            msb,
            lsb,
        })
    }

    fn finish(&self) -> Result<()> {
        match self.peek() {
            None => Ok(()),
            Some(token) => Err(self.error(format!("unexpected `{}` at end of statement", token))),
        }
    }
}

impl<'a> Parser<'a> {
    fn next_line(&mut self) -> Option<&'a Line> {
        let line = self.lines.get(self.index);
        self.index += 1;
        line
    }

    fn last_line_number(&self) -> usize {
        self.lines.last().map(|line| line.number).unwrap_or(1)
    }

    fn design(&mut self, name: &str) -> Result<Design> {
        let mut design = Design::new(name);
        let mut attributes = IndexMap::new();

        while let Some(line) = self.next_line() {
            let mut cursor = Cursor::new(line);
            match cursor.next() {
                Some(Token::Autoidx) => {
                    let value = cursor.int()?;
                    cursor.finish()?;
                    design.autoidx = Some(value.max(0) as u64);
                }
                Some(Token::Attribute) => {
                    let key = cursor.id()?;
                    let value = cursor.constant()?;
                    cursor.finish()?;
                    attributes.insert(key, value);
                }
                Some(Token::Module) => {
                    let module_name = cursor.id()?;
                    cursor.finish()?;
                    let mut module = self.module(module_name)?;
                    module.attributes = std::mem::take(&mut attributes);
                    design.add_module(module).map_err(|e| match e {
                        NetlistError::DuplicateModule(name) => cursor.error(format!(
                            "module `{}` is defined more than once",
                            name
                        )),
                        other => other,
                    })?;
                }
                Some(token) => {
                    return Err(cursor.error(format!("unexpected `{}` outside of a module", token)));
                }
                None => {}
            }
        }

        if !attributes.is_empty() {
            return Err(NetlistError::parse(
                self.last_line_number(),
                "attribute not followed by a module",
            ));
        }
        Ok(design)
    }

    fn module(&mut self, name: String) -> Result<Module> {
        let mut module = Module::new(name);
        let mut attributes = IndexMap::new();

        while let Some(line) = self.next_line() {
            let mut cursor = Cursor::new(line);
            match cursor.next() {
                Some(Token::End) => {
                    cursor.finish()?;
                    return Ok(module);
                }
                Some(Token::Attribute) => {
                    let key = cursor.id()?;
                    let value = cursor.constant()?;
                    cursor.finish()?;
                    attributes.insert(key, value);
                }
                Some(Token::Parameter) => {
                    let key = cursor.id()?;
                    let value = match cursor.peek() {
                        Some(_) => Some(cursor.constant()?),
                        None => None,
                    };
                    cursor.finish()?;
                    module.parameters.insert(key, value);
                }
                Some(Token::Wire) => {
                    let mut wire = self.wire(&mut cursor)?;
                    wire.attributes = std::mem::take(&mut attributes);
                    if module.wires.contains_key(&wire.name) {
                        return Err(cursor.error(format!("wire `{}` redeclared", wire.name)));
                    }
                    module.add_wire(wire);
                }
                Some(Token::Cell) => {
                    let kind = cursor.id()?;
                    let cell_name = cursor.id()?;
                    cursor.finish()?;
                    if module.cells.contains_key(&cell_name) {
                        return Err(cursor.error(format!("cell `{}` redeclared", cell_name)));
                    }
                    let mut cell = self.cell(kind, cell_name, line.number)?;
                    cell.attributes = std::mem::take(&mut attributes);
                    module.add_cell(cell);
                }
                Some(Token::Connect) => {
                    let lhs = cursor.sigspec()?;
                    let rhs = cursor.sigspec()?;
                    cursor.finish()?;
                    module.connections.push((lhs, rhs));
                }
                Some(Token::Process) => {
                    return Err(cursor.error(
                        "`process` blocks are not supported; lower them with `proc` before export",
                    ));
                }
                Some(Token::Memory) => {
                    return Err(cursor.error(
                        "`memory` declarations are not supported; map memories before export",
                    ));
                }
                Some(token) => {
                    return Err(cursor.error(format!("unexpected `{}` in module", token)));
                }
                None => {}
            }
        }

        Err(NetlistError::parse(
            self.last_line_number(),
            format!("module `{}` is missing `end`", module.name),
        ))
    }

    fn wire(&mut self, cursor: &mut Cursor<'_>) -> Result<Wire> {
        let mut width = 1;
        let mut offset = 0;
        let mut upto = false;
        let mut signed = false;
        let mut port = None;

        loop {
            match cursor.peek() {
                Some(Token::Width) => {
                    cursor.pos += 1;
                    let value = cursor.int()?;
                    if value <= 0 {
                        return Err(cursor.error(format!("invalid wire width {}", value)));
                    }
                    width = value as u32;
                }
                Some(Token::Offset) => {
                    cursor.pos += 1;
                    offset = cursor.int()?;
                }
                Some(Token::Upto) => {
                    cursor.pos += 1;
                    upto = true;
                }
                Some(Token::Signed) => {
                    cursor.pos += 1;
                    signed = true;
                }
                Some(Token::Input) | Some(Token::Output) | Some(Token::Inout) => {
                    let direction = match cursor.next() {
                        Some(Token::Input) => PortDirection::Input,
                        Some(Token::Output) => PortDirection::Output,
                        _ => PortDirection::Inout,
                    };
                    let id = cursor.int()?;
                    if id <= 0 {
                        return Err(cursor.error(format!("invalid port id {}", id)));
                    }
                    port = Some(Port {
                        id: id as u32,
                        direction,
                    });
                }
                _ => break,
            }
        }

        let name = cursor.id()?;
        cursor.finish()?;
        Ok(Wire {
            name,
            width,
            offset,
            upto,
            signed,
            port,
            attributes: IndexMap::new(),
        })
    }

    fn cell(&mut self, kind: String, name: String, start_line: usize) -> Result<Cell> {
        let mut cell = Cell::new(name, kind);

        while let Some(line) = self.next_line() {
            let mut cursor = Cursor::new(line);
            match cursor.next() {
                Some(Token::End) => {
                    cursor.finish()?;
                    return Ok(cell);
                }
                Some(Token::Parameter) => {
                    while matches!(cursor.peek(), Some(Token::Signed) | Some(Token::Real)) {
                        cursor.pos += 1;
                    }
                    let key = cursor.id()?;
                    let value = cursor.constant()?;
                    cursor.finish()?;
                    cell.parameters.insert(key, value);
                }
                Some(Token::Connect) => {
                    let port = cursor.id()?;
                    let signal = cursor.sigspec()?;
                    cursor.finish()?;
                    if cell.connections.insert(port.clone(), signal).is_some() {
                        return Err(cursor.error(format!("port `{}` connected twice", port)));
                    }
                }
                Some(token) => {
                    return Err(cursor.error(format!("unexpected `{}` in cell", token)));
                }
                None => {}
            }
        }

        Err(NetlistError::parse(
            start_line,
            format!("cell `{}` is missing `end`", cell.name),
        ))
    }
}
