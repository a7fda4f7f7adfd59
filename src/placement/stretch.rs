//! Stretch descriptors
//!
//! A stretch string like `"pa"`, `"^xy2"` or `"pa1!"` says how a symbol may
//! be scaled into the cell:
//!
//! - `pa`  preserve the aspect ratio, one scale factor for both axes
//! - `x`   scale horizontally to the cell width
//! - `y`   scale vertically to the cell height
//! - `^`   use the full cell height instead of the icon height
//! - `1`   never exceed one cell, even in double width mode
//! - `2`   allow two cells in double width mode
//! - `!`   allow growing beyond the original size

use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Stretch {
    pub preserve_aspect: bool,
    pub scale_x: bool,
    pub scale_y: bool,
    pub full_height: bool,
    pub single_cell: bool,
    pub double_cell: bool,
    pub allow_growth: bool,
}

impl Stretch {
    /// Parse a stretch string, ignoring characters that carry no meaning
    pub fn parse(descriptor: &str) -> Self {
        Self {
            preserve_aspect: descriptor.contains("pa"),
            scale_x: descriptor.contains('x'),
            scale_y: descriptor.contains('y'),
            full_height: descriptor.contains('^'),
            single_cell: descriptor.contains('1'),
            double_cell: descriptor.contains('2'),
            allow_growth: descriptor.contains('!'),
        }
    }

    /// Whether anything at all is scaled
    pub fn scales(&self) -> bool {
        self.preserve_aspect || self.scale_x || self.scale_y
    }

    /// The same stretch restricted to one cell width
    pub fn without_double_width(self) -> Self {
        Self {
            double_cell: false,
            ..self
        }
    }
}

impl FromStr for Stretch {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl fmt::Display for Stretch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flags = [
            (self.full_height, "^"),
            (self.preserve_aspect, "pa"),
            (self.scale_x, "x"),
            (self.scale_y, "y"),
            (self.single_cell, "1"),
            (self.double_cell, "2"),
            (self.allow_growth, "!"),
        ];
        for (set, text) in flags {
            if set {
                f.write_str(text)?;
            }
        }
        Ok(())
    }
}
