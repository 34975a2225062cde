//! Puzzle input types and color interning.
//!
//! These types deserialize directly from the JSON puzzle format read by
//! the CLI and turn it into the initial [`State`] for the solver.

use std::collections::BTreeSet;
use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::bottle::Bottle;
use crate::error::PuzzleError;
use crate::state::{Layout, State};

/// Opaque color token, compared only for equality.
///
/// Tokens are indices into the [`Palette`] that interned them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Color(u16);

impl Color {
    pub const fn new(id: u16) -> Self {
        Color(id)
    }

    pub fn id(self) -> u16 {
        self.0
    }
}

/// Maps color labels to tokens and back
#[derive(Debug, Clone, Default)]
pub struct Palette {
    names: Vec<String>,
    lookup: FxHashMap<String, Color>,
}

impl Palette {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the token for `name`, allocating one on first sight.
    pub fn intern(&mut self, name: &str) -> Result<Color, PuzzleError> {
        if let Some(&color) = self.lookup.get(name) {
            return Ok(color);
        }
        let id = u16::try_from(self.names.len()).map_err(|_| PuzzleError::TooManyColors {
            limit: usize::from(u16::MAX) + 1,
        })?;
        let color = Color(id);
        self.names.push(name.to_string());
        self.lookup.insert(name.to_string(), color);
        Ok(color)
    }

    pub fn get(&self, name: &str) -> Option<Color> {
        self.lookup.get(name).copied()
    }

    /// Label for a token; unknown tokens render as `#<id>`.
    pub fn name(&self, color: Color) -> ColorName<'_> {
        match self.names.get(color.0 as usize) {
            Some(name) => ColorName::Named(name),
            None => ColorName::Anonymous(color.0),
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Display helper returned by [`Palette::name`]
#[derive(Debug, Clone, Copy)]
pub enum ColorName<'a> {
    Named(&'a str),
    Anonymous(u16),
}

impl fmt::Display for ColorName<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColorName::Named(name) => f.write_str(name),
            ColorName::Anonymous(id) => write!(f, "#{id}"),
        }
    }
}

/// One bottle in the puzzle file.
///
/// Either a bare list of colors or an object with an optional label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BottleSpec {
    Contents(Vec<String>),
    Labeled {
        #[serde(default)]
        label: Option<String>,
        #[serde(default)]
        contents: Vec<String>,
    },
}

impl BottleSpec {
    pub fn label(&self) -> Option<&str> {
        match self {
            BottleSpec::Contents(_) => None,
            BottleSpec::Labeled { label, .. } => label.as_deref(),
        }
    }

    /// Colors bottom to top
    pub fn contents(&self) -> &[String] {
        match self {
            BottleSpec::Contents(contents) => contents,
            BottleSpec::Labeled { contents, .. } => contents,
        }
    }
}

/// The complete puzzle configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PuzzleConfig {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    pub bottles: Vec<BottleSpec>,
}

impl PuzzleConfig {
    /// Unlabeled puzzle from bottom-to-top color lists
    pub fn from_contents<I, B, S>(bottles: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: None,
            title: None,
            bottles: bottles
                .into_iter()
                .map(|b| BottleSpec::Contents(b.into_iter().map(Into::into).collect()))
                .collect(),
        }
    }

    /// Intern all colors and build the initial state.
    ///
    /// Colors are interned in label order, so a token depends only on its
    /// label and not on where it first appears. Slot `i` of the returned
    /// state is the `i`-th bottle of the input.
    pub fn build_state(&self) -> Result<State, PuzzleError> {
        let mut palette = Palette::new();
        let names: BTreeSet<&str> = self
            .bottles
            .iter()
            .flat_map(|spec| spec.contents().iter().map(String::as_str))
            .collect();
        for name in names {
            palette.intern(name)?;
        }

        let mut bottles = Vec::with_capacity(self.bottles.len());
        let mut labels = Vec::with_capacity(self.bottles.len());
        for (index, spec) in self.bottles.iter().enumerate() {
            let colors = spec
                .contents()
                .iter()
                .map(|name| palette.intern(name))
                .collect::<Result<Vec<Color>, _>>()?;
            let bottle = Bottle::new(colors).map_err(|err| err.at_bottle(index))?;
            bottles.push(bottle);
            labels.push(spec.label().map(str::to_string));
        }

        let layout = Rc::new(Layout::new(palette, labels));
        Ok(State::new(layout, bottles))
    }
}
