//! A single bottle: an ordered stack of color units, bottom to top.
//!
//! This is the only place units physically move. Everything above it
//! (states, move generation, search) decides *which* pours to make.

use std::fmt;

use smallvec::SmallVec;

use crate::error::PuzzleError;
use crate::puzzle::{Color, Palette};

/// Maximum number of units a bottle can hold
pub const CAPACITY: usize = 4;

/// An ordered stack of colors, bottom first.
///
/// Equality, hashing and ordering look at contents only. Slot identity is
/// tracked by [`crate::state::BottleId`], never by the bottle value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Bottle {
    contents: SmallVec<[Color; CAPACITY]>,
}

impl Bottle {
    /// Build a bottle from bottom-to-top contents.
    pub fn new(contents: impl IntoIterator<Item = Color>) -> Result<Self, PuzzleError> {
        let contents: SmallVec<[Color; CAPACITY]> = contents.into_iter().collect();
        if contents.len() > CAPACITY {
            return Err(PuzzleError::Validation {
                index: None,
                len: contents.len(),
                capacity: CAPACITY,
            });
        }
        Ok(Self { contents })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> &[Color] {
        &self.contents
    }

    pub fn len(&self) -> usize {
        self.contents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.contents.len() == CAPACITY
    }

    pub fn top_color(&self) -> Option<Color> {
        self.contents.last().copied()
    }

    /// Number of contiguous units at the top sharing the top color
    pub fn top_run_length(&self) -> usize {
        let Some(top) = self.top_color() else {
            return 0;
        };
        self.contents
            .iter()
            .rev()
            .take_while(|&&color| color == top)
            .count()
    }

    pub fn is_single_color(&self) -> bool {
        self.top_run_length() == self.len()
    }

    /// Solved bottles are either empty or full of a single color.
    pub fn is_solved(&self) -> bool {
        self.is_empty() || (self.is_full() && self.is_single_color())
    }

    /// Whether `source` may be poured into `self`.
    ///
    /// Either side being empty is always allowed. Otherwise the top colors
    /// must match and the whole top run of `source` has to fit.
    pub fn can_combine(&self, source: &Bottle) -> bool {
        if self.is_empty() || source.is_empty() {
            return true;
        }
        self.top_color() == source.top_color()
            && self.len() + source.top_run_length() <= CAPACITY
    }

    /// Pour the top run of `source` onto `self`.
    pub fn combine(&mut self, source: &mut Bottle) -> Result<(), PuzzleError> {
        if !self.can_combine(source) {
            return Err(PuzzleError::invalid_move(format!(
                "cannot pour {} units into a bottle holding {}",
                source.top_run_length(),
                self.len()
            )));
        }

        let Some(color) = source.top_color() else {
            return Ok(());
        };
        let run = source.top_run_length();

        self.contents.extend(std::iter::repeat(color).take(run));
        source.contents.truncate(source.len() - run);
        Ok(())
    }

    /// Render as `<red,red,blue>` using palette names.
    pub fn fingerprint<'a>(&'a self, palette: &'a Palette) -> Fingerprint<'a> {
        Fingerprint {
            bottle: self,
            palette,
        }
    }
}

/// Display adapter returned by [`Bottle::fingerprint`]
#[derive(Debug, Clone, Copy)]
pub struct Fingerprint<'a> {
    bottle: &'a Bottle,
    palette: &'a Palette,
}

impl fmt::Display for Fingerprint<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<")?;
        for (i, color) in self.bottle.contents.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", self.palette.name(*color))?;
        }
        f.write_str(">")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Color = Color::new(0);
    const BLUE: Color = Color::new(1);

    fn bottle(colors: &[Color]) -> Bottle {
        Bottle::new(colors.iter().copied()).unwrap()
    }

    #[test]
    fn test_top_run_and_color() {
        let b = bottle(&[RED, RED, BLUE, BLUE]);
        assert_eq!(b.top_run_length(), 2);
        assert_eq!(b.top_color(), Some(BLUE));
        assert!(b.is_full());
        assert!(!b.is_single_color());

        let empty = Bottle::empty();
        assert_eq!(empty.top_run_length(), 0);
        assert_eq!(empty.top_color(), None);
        assert!(empty.is_single_color());
        assert!(empty.is_solved());
    }

    #[test]
    fn test_construction_over_capacity_rejected() {
        let err = Bottle::new([RED; 5]).unwrap_err();
        assert_eq!(
            err,
            PuzzleError::Validation {
                index: None,
                len: 5,
                capacity: CAPACITY
            }
        );
    }

    #[test]
    fn test_can_combine_rules() {
        let empty = Bottle::empty();
        let red = bottle(&[BLUE, RED]);
        let blue = bottle(&[RED, BLUE]);

        assert!(empty.can_combine(&red));
        assert!(red.can_combine(&empty));
        assert!(!red.can_combine(&blue));
        assert!(!blue.can_combine(&red));

        let two_red = bottle(&[RED, RED]);
        assert!(red.can_combine(&two_red));
        let three_red = bottle(&[BLUE, RED, RED, RED]);
        assert!(!red.can_combine(&three_red));
    }

    #[test]
    fn test_full_bottle_rejects_non_empty_sources() {
        let full = bottle(&[RED, RED, RED, RED]);
        assert!(!full.can_combine(&bottle(&[RED])));
        assert!(!full.can_combine(&bottle(&[BLUE])));
        assert!(full.can_combine(&Bottle::empty()));
    }

    #[test]
    fn test_combine_moves_whole_run() {
        let mut dest = Bottle::empty();
        let mut source = bottle(&[RED, RED, BLUE, BLUE]);
        dest.combine(&mut source).unwrap();

        assert_eq!(dest.contents(), &[BLUE, BLUE]);
        assert_eq!(source.contents(), &[RED, RED]);
    }

    #[test]
    fn test_combine_with_empty_source_is_noop() {
        let mut dest = bottle(&[RED]);
        let mut source = Bottle::empty();
        dest.combine(&mut source).unwrap();

        assert_eq!(dest.contents(), &[RED]);
        assert!(source.is_empty());
    }

    #[test]
    fn test_combine_illegal_pair_fails() {
        let mut dest = bottle(&[RED]);
        let mut source = bottle(&[BLUE]);
        let err = dest.combine(&mut source).unwrap_err();

        assert!(matches!(err, PuzzleError::InvalidMove { .. }));
        assert_eq!(dest.contents(), &[RED]);
        assert_eq!(source.contents(), &[BLUE]);
    }

    #[test]
    fn test_combine_full_run_into_empty() {
        let mut dest = Bottle::empty();
        let mut source = bottle(&[RED; CAPACITY]);
        dest.combine(&mut source).unwrap();

        assert!(dest.is_full());
        assert!(source.is_empty());
    }

    #[test]
    fn test_fingerprint_uses_palette_names() {
        let mut palette = Palette::new();
        let red = palette.intern("red").unwrap();
        let blue = palette.intern("blue").unwrap();

        let b = bottle(&[red, red, blue]);
        assert_eq!(b.fingerprint(&palette).to_string(), "<red,red,blue>");
        assert_eq!(Bottle::empty().fingerprint(&palette).to_string(), "<>");
        assert_eq!(bottle(&[Color::new(7)]).fingerprint(&palette).to_string(), "<#7>");
    }
}
