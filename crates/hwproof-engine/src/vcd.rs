//! Minimal value change dump reader for counterexample traces
//!
//! Only the parts a solver trace uses are read: `$scope`/`$upscope`,
//! `$var`, `$enddefinitions`, timestamps and scalar or vector changes.

use crate::error::{EngineError, EngineResult};
use crate::verdict::Trace;
use indexmap::IndexMap;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signal {
    /// Dotted path below the root scope
    pub name: String,
    pub width: usize,
}

/// Parsed dump: signals and the changes recorded at each timestamp
#[derive(Debug, Clone, Default)]
pub struct Vcd {
    pub signals: Vec<Signal>,
    /// Timestamp and `(signal index, value)` changes, in file order
    pub samples: Vec<(u64, Vec<(usize, String)>)>,
}

fn malformed(message: impl Into<String>) -> EngineError {
    EngineError::Protocol(format!("malformed VCD: {}", message.into()))
}

impl Vcd {
    pub fn parse(text: &str) -> EngineResult<Self> {
        let mut vcd = Vcd::default();
        let mut ids: HashMap<String, Vec<usize>> = HashMap::new();
        let mut scopes: Vec<String> = Vec::new();
        let mut words = text.split_whitespace();
        let mut in_definitions = true;

        while let Some(word) = words.next() {
            if in_definitions {
                match word {
                    "$scope" => {
                        let _kind = words.next();
                        let name = words.next().ok_or_else(|| malformed("unnamed scope"))?;
                        scopes.push(name.to_string());
                        skip_to_end(&mut words)?;
                    }
                    "$upscope" => {
                        scopes.pop();
                        skip_to_end(&mut words)?;
                    }
                    "$var" => {
                        let fields = collect_to_end(&mut words)?;
                        let [_kind, width, id, name, ..] = fields.as_slice() else {
                            return Err(malformed("short $var declaration"));
                        };
                        let width = width
                            .parse()
                            .map_err(|_| malformed(format!("bad width for {}", name)))?;
                        let mut path: Vec<&str> = scopes.iter().skip(1).map(String::as_str).collect();
                        path.push(name);
                        ids.entry(id.to_string()).or_default().push(vcd.signals.len());
                        vcd.signals.push(Signal {
                            name: path.join("."),
                            width,
                        });
                    }
                    "$enddefinitions" => {
                        skip_to_end(&mut words)?;
                        in_definitions = false;
                    }
                    _ if word.starts_with('$') => skip_to_end(&mut words)?,
                    _ => return Err(malformed(format!("unexpected `{}` in header", word))),
                }
                continue;
            }

            if let Some(time) = word.strip_prefix('#') {
                let time = time
                    .parse()
                    .map_err(|_| malformed(format!("bad timestamp `{}`", word)))?;
                vcd.samples.push((time, Vec::new()));
                continue;
            }
            if word.starts_with('$') {
                // $dumpvars / $end wrappers around initial values
                continue;
            }

            let (value, id) = match word.chars().next() {
                Some('b' | 'B' | 'r' | 'R') => {
                    let id = words
                        .next()
                        .ok_or_else(|| malformed(format!("vector change `{}` has no id", word)))?;
                    (word[1..].to_lowercase(), id)
                }
                Some('0' | '1' | 'x' | 'X' | 'z' | 'Z') => (word[..1].to_lowercase(), &word[1..]),
                _ => return Err(malformed(format!("unexpected `{}`", word))),
            };
            let targets = ids
                .get(id)
                .ok_or_else(|| malformed(format!("change for undeclared id `{}`", id)))?;
            let (_, changes) = vcd
                .samples
                .last_mut()
                .ok_or_else(|| malformed("value change before the first timestamp"))?;
            for &index in targets {
                changes.push((index, value.clone()));
            }
        }

        if in_definitions {
            return Err(malformed("missing $enddefinitions"));
        }
        Ok(vcd)
    }

    /// Sample the first `steps` timestamps, holding values between changes
    ///
    /// A dump with fewer timestamps than requested repeats its last state.
    pub fn trace(&self, steps: usize) -> Trace {
        let mut current: Vec<Option<String>> = vec![None; self.signals.len()];
        let mut rows = Vec::with_capacity(steps);

        for step in 0..steps {
            if let Some((_, changes)) = self.samples.get(step) {
                for (index, value) in changes {
                    current[*index] = Some(pad(value, self.signals[*index].width));
                }
            }
            let row: IndexMap<String, String> = self
                .signals
                .iter()
                .zip(&current)
                .filter_map(|(signal, value)| Some((signal.name.clone(), value.clone()?)))
                .collect();
            rows.push(row);
        }
        Trace::new(rows)
    }
}

/// Left-extend a truncated vector value to its declared width
fn pad(value: &str, width: usize) -> String {
    let is_bits = value.chars().all(|c| matches!(c, '0' | '1' | 'x' | 'z'));
    if value.len() >= width || !is_bits {
        return value.to_string();
    }
    let fill = match value.chars().next() {
        Some(c @ ('x' | 'z')) => c,
        _ => '0',
    };
    let mut padded: String = std::iter::repeat(fill).take(width - value.len()).collect();
    padded.push_str(value);
    padded
}

fn skip_to_end<'a>(words: &mut impl Iterator<Item = &'a str>) -> EngineResult<()> {
    collect_to_end(words).map(|_| ())
}

fn collect_to_end<'a>(words: &mut impl Iterator<Item = &'a str>) -> EngineResult<Vec<&'a str>> {
    let mut fields = Vec::new();
    for word in words.by_ref() {
        if word == "$end" {
            return Ok(fields);
        }
        fields.push(word);
    }
    Err(malformed("unterminated declaration"))
}
