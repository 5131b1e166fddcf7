use std::{fmt, str::FromStr};

use crate::PlotError;

/// File formats a figure can be rendered to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlotFormat {
    Png,
    Bmp,
    Jpg,
    Svg,
}

impl PlotFormat {
    /// File extension, without the dot
    pub fn extension(&self) -> &'static str {
        match self {
            PlotFormat::Png => "png",
            PlotFormat::Bmp => "bmp",
            PlotFormat::Jpg => "jpg",
            PlotFormat::Svg => "svg",
        }
    }

    /// Whether the bitmap backend renders this format
    #[inline(always)]
    pub fn is_bitmap(&self) -> bool {
        !matches!(self, PlotFormat::Svg)
    }
}

impl FromStr for PlotFormat {
    type Err = PlotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "png" => Ok(PlotFormat::Png),
            "bmp" => Ok(PlotFormat::Bmp),
            "jpg" | "jpeg" => Ok(PlotFormat::Jpg),
            "svg" => Ok(PlotFormat::Svg),
            _ => Err(PlotError::UnsupportedFormat(s.to_string())),
        }
    }
}

impl fmt::Display for PlotFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.extension())
    }
}
