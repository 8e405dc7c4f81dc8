use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::materials::TransportEvent;

/// One pattern position: a literal transport event, a single-event
/// wildcard, or a Kleene repeat over the wildcard.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Symbol {
    Event(TransportEvent),
    /// `.` — exactly one event of any class.
    Any,
    /// `*` — zero or more events of any class.
    Repeat,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExprError {
    #[error("unrecognized symbol '{0}' in light path expression (expected E, D, S, L, '.' or '*')")]
    UnknownSymbol(char),
    #[error("empty light path expression")]
    Empty,
}

/// A parsed light-path expression. The textual form reads light-to-eye
/// (`"LDE"` = emitter, one diffuse bounce, camera), so the matcher consumes
/// symbols from the string's end while walking the tree from its Eye root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LightPathExpression {
    symbols: Vec<Symbol>,
}

impl FromStr for LightPathExpression {
    type Err = ExprError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ExprError::Empty);
        }

        let symbols = s
            .chars()
            .map(|c| match c {
                'E' => Ok(Symbol::Event(TransportEvent::Eye)),
                'D' => Ok(Symbol::Event(TransportEvent::Diffuse)),
                'S' => Ok(Symbol::Event(TransportEvent::Specular)),
                'L' => Ok(Symbol::Event(TransportEvent::Light)),
                '.' => Ok(Symbol::Any),
                '*' => Ok(Symbol::Repeat),
                other => Err(ExprError::UnknownSymbol(other)),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(LightPathExpression { symbols })
    }
}

impl fmt::Display for LightPathExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for symbol in &self.symbols {
            let c = match symbol {
                Symbol::Event(TransportEvent::Eye) => 'E',
                Symbol::Event(TransportEvent::Diffuse) => 'D',
                Symbol::Event(TransportEvent::Specular) => 'S',
                Symbol::Event(TransportEvent::Light) => 'L',
                Symbol::Any => '.',
                Symbol::Repeat => '*',
            };
            write!(f, "{c}")?;
        }
        Ok(())
    }
}

impl LightPathExpression {
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Whether the whole expression matches the whole event sequence.
    /// `events` is in eye-to-light order (the order a tree walk from the
    /// Eye root produces); the pattern is consumed back-to-front to meet
    /// it. Backtracks over `*` via the two branches "advance past the
    /// repeat" and "consume one event, stay on the repeat". Boolean: a
    /// sequence that matches under several alignments matches once.
    pub fn matches(&self, events: &[TransportEvent]) -> bool {
        match_at(&self.symbols, self.symbols.len(), events, 0)
    }
}

fn match_at(
    symbols: &[Symbol],
    pattern_end: usize,
    events: &[TransportEvent],
    offset: usize,
) -> bool {
    let pattern_finished = pattern_end == 0;
    let events_finished = offset == events.len();
    if pattern_finished || events_finished {
        // a trailing run of repeats still matches zero events
        return events_finished
            && symbols[..pattern_end].iter().all(|s| *s == Symbol::Repeat);
    }

    match symbols[pattern_end - 1] {
        Symbol::Any => match_at(symbols, pattern_end - 1, events, offset + 1),
        Symbol::Repeat => {
            match_at(symbols, pattern_end - 1, events, offset)
                || match_at(symbols, pattern_end, events, offset + 1)
        }
        Symbol::Event(event) => {
            event == events[offset] && match_at(symbols, pattern_end - 1, events, offset + 1)
        }
    }
}
