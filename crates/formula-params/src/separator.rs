use std::fmt;

/// Argument grouping level, ordered from the outermost to the innermost separator.
///
/// `None` is the synthetic level above the root of a parameter tree; the remaining levels are
/// the `;`, `,` and `:` separators of the parameter grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Separator {
    None,
    Semicolon,
    Comma,
    Colon,
}

/// Every level in descent order.
pub const LEVELS: [Separator; 4] = [
    Separator::None,
    Separator::Semicolon,
    Separator::Comma,
    Separator::Colon,
];

impl Separator {
    fn position(self) -> usize {
        match LEVELS.iter().position(|level| *level == self) {
            Some(pos) => pos,
            None => unreachable!("{self:?} missing from LEVELS"),
        }
    }

    /// The next finer level, or `None` below [`Separator::Colon`].
    pub fn next(self) -> Option<Separator> {
        LEVELS.get(self.position() + 1).copied()
    }

    /// Levels strictly finer than `self`, in descent order.
    pub fn deeper(self) -> impl Iterator<Item = Separator> {
        LEVELS.into_iter().skip(self.position() + 1)
    }

    /// `true` for the finest level; text under a colon is never split again.
    pub fn is_deepest(self) -> bool {
        self.next().is_none()
    }

    pub fn as_char(self) -> Option<char> {
        match self {
            Separator::None => None,
            Separator::Semicolon => Some(';'),
            Separator::Comma => Some(','),
            Separator::Colon => Some(':'),
        }
    }

    pub fn from_char(ch: char) -> Option<Separator> {
        LEVELS
            .into_iter()
            .find(|level| level.as_char() == Some(ch))
    }
}

/// Tag reported by [`crate::ParamNode::param_type`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamType {
    /// A leaf wrapping one expression.
    Normal,
    Separator(Separator),
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamType::Normal => f.write_str("normal"),
            ParamType::Separator(level) => match level.as_char() {
                Some(ch) => write!(f, "'{ch}'"),
                None => f.write_str("none"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_descend_in_order() {
        assert_eq!(Separator::None.next(), Some(Separator::Semicolon));
        assert_eq!(Separator::Semicolon.next(), Some(Separator::Comma));
        assert_eq!(Separator::Comma.next(), Some(Separator::Colon));
        assert_eq!(Separator::Colon.next(), None);
        assert!(Separator::Colon.is_deepest());
        assert!(!Separator::Comma.is_deepest());
        assert!(Separator::None < Separator::Semicolon);
        assert!(Separator::Comma < Separator::Colon);
    }

    #[test]
    fn deeper_matches_next_chain() {
        for level in LEVELS {
            let chained: Vec<_> = std::iter::successors(level.next(), |l| l.next()).collect();
            assert_eq!(level.deeper().collect::<Vec<_>>(), chained);
        }
        assert_eq!(Separator::Colon.deeper().count(), 0);
    }

    #[test]
    fn chars_round_trip() {
        for ch in [';', ',', ':'] {
            let level = Separator::from_char(ch).unwrap();
            assert_eq!(level.as_char(), Some(ch));
        }
        assert_eq!(Separator::from_char('.'), None);
        assert_eq!(Separator::None.as_char(), None);
    }
}
