use std::collections::HashMap;

use crate::feed::LiveScore;
use crate::state::Pick;

/// What a pick maps to on the live board
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// Golfer whose line counts, the alternate when substituted
    pub golfer: String,
    pub line: Option<LiveScore>,
    /// The chosen golfer withdrew or never started and the alternate stood in
    pub substituted: bool,
}

impl Resolution {
    pub fn score(&self) -> Option<i32> {
        self.line.as_ref().map(|l| l.score)
    }

    pub fn position(&self) -> Option<u32> {
        self.line.as_ref().and_then(|l| l.position)
    }

    pub fn earnings(&self) -> f64 {
        self.line.as_ref().map(|l| l.earnings).unwrap_or(0.0)
    }
}

/// Map a pick onto the live board, falling back to the alternate
pub fn resolve(pick: &Pick, live: &HashMap<String, LiveScore>) -> Resolution {
    if let Some(line) = live.get(&pick.golfer) {
        return Resolution {
            golfer: pick.golfer.clone(),
            line: Some(line.clone()),
            substituted: false,
        };
    }

    if let Some(alternate) = pick.alternate.as_deref().filter(|a| !a.is_empty()) {
        if let Some(line) = live.get(alternate) {
            return Resolution {
                golfer: alternate.to_string(),
                line: Some(line.clone()),
                substituted: true,
            };
        }
    }

    Resolution {
        golfer: pick.golfer.clone(),
        line: None,
        substituted: false,
    }
}

/// Every golfer and alternate named by `picks`
pub fn picked_golfers<'a, I>(picks: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a Pick>,
{
    let mut names: Vec<String> = Vec::new();
    for pick in picks {
        for name in std::iter::once(&pick.golfer).chain(pick.alternate.iter()) {
            if !name.is_empty() && !names.contains(name) {
                names.push(name.clone());
            }
        }
    }
    names
}
