//! Structural balancer
//!
//! Walks the script line by line tracking a running open/close balance for
//! each delimiter kind, drops orphaned closers and orphaned bare string
//! literals, and appends any closers still missing at end of file. The
//! counters deliberately ignore string-literal contents; this is a
//! line-oriented heuristic, not a grammar.

use tracing::warn;

use super::SourceText;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delimiter {
    Round,
    Square,
    Curly,
}

impl Delimiter {
    fn open(&self) -> char {
        match self {
            Delimiter::Round => '(',
            Delimiter::Square => '[',
            Delimiter::Curly => '{',
        }
    }

    fn close(&self) -> char {
        match self {
            Delimiter::Round => ')',
            Delimiter::Square => ']',
            Delimiter::Curly => '}',
        }
    }
}

const ALL: [Delimiter; 3] = [Delimiter::Round, Delimiter::Square, Delimiter::Curly];

/// Running balance over the lines retained so far. Only retained lines feed
/// the counters, so appended closers always re-balance the emitted text.
#[derive(Debug, Default, Clone, Copy)]
struct Balance {
    round: i32,
    square: i32,
    curly: i32,
}

impl Balance {
    fn get(&self, d: Delimiter) -> i32 {
        match d {
            Delimiter::Round => self.round,
            Delimiter::Square => self.square,
            Delimiter::Curly => self.curly,
        }
    }

    fn absorb(&mut self, line: &str) {
        for d in ALL {
            let delta = count(line, d.open()) - count(line, d.close());
            match d {
                Delimiter::Round => self.round += delta,
                Delimiter::Square => self.square += delta,
                Delimiter::Curly => self.curly += delta,
            }
        }
    }
}

fn count(line: &str, c: char) -> i32 {
    line.chars().filter(|&x| x == c).count() as i32
}

fn bare_closer(trimmed: &str) -> Option<Delimiter> {
    match trimmed {
        ")" => Some(Delimiter::Round),
        "]" => Some(Delimiter::Square),
        "}" => Some(Delimiter::Curly),
        _ => None,
    }
}

/// A line that is nothing but a double-quoted string, with no assignment, no
/// method call and no recognized text-constructor call. These are narration
/// fragments the generator leaked into the code body.
pub(crate) fn is_orphan_string(line: &str, text_constructors: &[String]) -> bool {
    let trimmed = line.trim();
    trimmed.len() >= 2
        && trimmed.starts_with('"')
        && trimmed.ends_with('"')
        && !line.contains('=')
        && !line.contains("self.")
        && !text_constructors.iter().any(|name| line.contains(name))
}

/// Balance the document. `text_constructors` is the whitelist of call names
/// that legitimise a string-bearing line (injectable, see `RepairConfig`).
pub fn balance(src: &SourceText, text_constructors: &[String]) -> SourceText {
    let mut out: Vec<String> = Vec::with_capacity(src.lines().len());
    let mut bal = Balance::default();

    for (i, line) in src.lines().iter().enumerate() {
        let trimmed = line.trim();

        // An orphaned closer is only noise once the document already has
        // more closers than openers. A standalone closer at balance 0 is
        // retained: at that point nothing marks it as structural debris.
        if let Some(d) = bare_closer(trimmed) {
            if bal.get(d) < 0 {
                warn!(line = i + 1, delimiter = %d.close(), "dropping orphaned closing delimiter");
                continue;
            }
        }

        if is_orphan_string(line, text_constructors) {
            warn!(line = i + 1, preview = %crate::util::truncate(trimmed, 50), "dropping orphaned string literal");
            continue;
        }

        bal.absorb(line);
        out.push(line.clone());
    }

    for d in ALL {
        let mut missing = bal.get(d);
        while missing > 0 {
            warn!(delimiter = %d.close(), "appending missing closing delimiter");
            out.push(d.close().to_string());
            missing -= 1;
        }
    }

    SourceText::from_lines(out)
}
