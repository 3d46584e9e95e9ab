//! RTLIL lexer using Logos
//!
//! RTLIL is line oriented, so newlines are significant tokens.

use logos::Logos;
use std::fmt;

/// Token types for the RTLIL subset
#[derive(Logos, Debug, Clone, PartialEq)]
pub enum Token {
    #[token("autoidx")]
    Autoidx,
    #[token("attribute")]
    Attribute,
    #[token("module")]
    Module,
    #[token("parameter")]
    Parameter,
    #[token("signed")]
    Signed,
    #[token("real")]
    Real,
    #[token("wire")]
    Wire,
    #[token("width")]
    Width,
    #[token("offset")]
    Offset,
    #[token("upto")]
    Upto,
    #[token("input")]
    Input,
    #[token("output")]
    Output,
    #[token("inout")]
    Inout,
    #[token("cell")]
    Cell,
    #[token("connect")]
    Connect,
    #[token("end")]
    End,

    // Constructs that must be lowered before a design reaches the harness
    #[token("process")]
    Process,
    #[token("memory")]
    Memory,

    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(":")]
    Colon,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("\n")]
    Newline,

    /// Public identifier (`\clk`)
    #[regex(r"\\[^ \t\r\n]+", |lex| lex.slice().to_owned())]
    PublicId(String),

    /// Auto-generated identifier or primitive kind (`$dlatch`, `$procdff$12`)
    #[regex(r"\$[^ \t\r\n]+", |lex| lex.slice().to_owned())]
    AutoId(String),

    #[regex(r"-?[0-9]+", |lex| lex.slice().parse::<i64>().ok())]
    Int(i64),

    /// Sized bit constant, bits only (`4'10x1` → `10x1`)
    #[regex(r"[0-9]+'[01xzm\-]*", |lex| parse_bits(lex.slice()))]
    Bits(String),

    #[regex(r#""([^"\\]|\\.)*""#, |lex| parse_string(lex.slice()))]
    Str(String),

    /// Any other bare word; always a syntax error in the supported subset
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_owned())]
    Word(String),

    // Whitespace and comments
    #[regex(r"[ \t\r\f]+", logos::skip)]
    #[regex(r"#[^\n]*", logos::skip)]
    Error,
}

fn parse_bits(input: &str) -> Option<String> {
    let (width, bits) = input.split_once('\'')?;
    let width: usize = width.parse().ok()?;
    (bits.len() == width).then(|| bits.to_owned())
}

fn parse_string(input: &str) -> Option<String> {
    let without_quotes = &input[1..input.len() - 1];
    let mut result = String::new();
    let mut chars = without_quotes.chars();

    while let Some(ch) = chars.next() {
        match ch {
            '\\' => match chars.next() {
                Some('"') => result.push('"'),
                Some('\\') => result.push('\\'),
                Some('n') => result.push('\n'),
                Some('t') => result.push('\t'),
                Some(c) => {
                    result.push('\\');
                    result.push(c);
                }
                None => result.push('\\'),
            },
            c => result.push(c),
        }
    }

    Some(result)
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Autoidx => write!(f, "autoidx"),
            Token::Attribute => write!(f, "attribute"),
            Token::Module => write!(f, "module"),
            Token::Parameter => write!(f, "parameter"),
            Token::Signed => write!(f, "signed"),
            Token::Real => write!(f, "real"),
            Token::Wire => write!(f, "wire"),
            Token::Width => write!(f, "width"),
            Token::Offset => write!(f, "offset"),
            Token::Upto => write!(f, "upto"),
            Token::Input => write!(f, "input"),
            Token::Output => write!(f, "output"),
            Token::Inout => write!(f, "inout"),
            Token::Cell => write!(f, "cell"),
            Token::Connect => write!(f, "connect"),
            Token::End => write!(f, "end"),
            Token::Process => write!(f, "process"),
            Token::Memory => write!(f, "memory"),
            Token::LBracket => write!(f, "["),
            Token::RBracket => write!(f, "]"),
            Token::Colon => write!(f, ":"),
            Token::LBrace => write!(f, "{{"),
            Token::RBrace => write!(f, "}}"),
            Token::Newline => write!(f, "end of line"),
            Token::PublicId(id) | Token::AutoId(id) | Token::Word(id) => write!(f, "{}", id),
            Token::Int(value) => write!(f, "{}", value),
            Token::Bits(bits) => write!(f, "{}'{}", bits.len(), bits),
            Token::Str(text) => write!(f, "{:?}", text),
            Token::Error => write!(f, "invalid token"),
        }
    }
}

/// One source line worth of tokens
#[derive(Debug, Clone)]
pub struct Line {
    /// 1-based line number
    pub number: usize,
    pub tokens: Vec<Token>,
}

/// Split a source into non-empty token lines
///
/// Invalid input yields [`Token::Error`] in place; the parser reports it with
/// the line number.
pub fn tokenize_lines(source: &str) -> Vec<Line> {
    let mut lines = Vec::new();
    let mut current = Vec::new();
    let mut number = 1;
    let mut lexer = Token::lexer(source);

    while let Some(result) = lexer.next() {
        match result.unwrap_or(Token::Error) {
            Token::Newline => {
                if !current.is_empty() {
                    lines.push(Line {
                        number,
                        tokens: std::mem::take(&mut current),
                    });
                }
                number += 1;
            }
            token => current.push(token),
        }
    }
    if !current.is_empty() {
        lines.push(Line {
            number,
            tokens: current,
        });
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(source: &str) -> Vec<Token> {
        tokenize_lines(source)
            .into_iter()
            .flat_map(|line| line.tokens)
            .collect()
    }

    #[test]
    fn test_keywords_and_ids() {
        assert_eq!(
            tokens("cell $dlatch \\latch"),
            vec![
                Token::Cell,
                Token::AutoId("$dlatch".to_string()),
                Token::PublicId("\\latch".to_string()),
            ]
        );
    }

    #[test]
    fn test_constants() {
        assert_eq!(
            tokens("16 -1 4'10x1 \"a\\\"b\""),
            vec![
                Token::Int(16),
                Token::Int(-1),
                Token::Bits("10x1".to_string()),
                Token::Str("a\"b".to_string()),
            ]
        );
    }

    #[test]
    fn test_bit_width_mismatch_is_error() {
        assert_eq!(tokens("3'10"), vec![Token::Error]);
    }

    #[test]
    fn test_comments_and_line_numbers() {
        let lines = tokenize_lines("# header\n\nwire \\a # trailing\nend\n");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].number, 3);
        assert_eq!(lines[0].tokens, vec![Token::Wire, Token::PublicId("\\a".into())]);
        assert_eq!(lines[1].number, 4);
    }
}
