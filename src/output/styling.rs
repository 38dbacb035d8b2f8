use std::fmt::Display;

use console::{style, StyledObject};

pub type Styled = StyledObject<String>;

fn styled(text: impl Display) -> Styled {
    style(text.to_string())
}

pub fn bright(text: impl Display) -> Styled {
    styled(text).bright()
}

pub fn bright_green(text: impl Display) -> Styled {
    bright(text).green()
}

pub fn bright_yellow(text: impl Display) -> Styled {
    bright(text).yellow()
}

pub fn bright_red(text: impl Display) -> Styled {
    bright(text).red()
}

pub fn cyan(text: impl Display) -> Styled {
    styled(text).cyan()
}

pub fn dim(text: impl Display) -> Styled {
    styled(text).dim()
}

pub fn magenta_bold(text: impl Display) -> Styled {
    styled(text).magenta().bold()
}

/// How a lead time compares to the usual delivery cadences.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Band {
    /// Within a day
    Daily,
    /// Within a week
    Weekly,
    Slower,
}

impl Band {
    pub fn of_hours(hours: f64) -> Self {
        if hours <= 24.0 {
            Self::Daily
        } else if hours <= 168.0 {
            Self::Weekly
        } else {
            Self::Slower
        }
    }
}

/// Styles `text` in the colour of `band`.
pub fn banded(text: impl Display, band: Band) -> Styled {
    match band {
        Band::Daily => bright_green(text),
        Band::Weekly => bright_yellow(text),
        Band::Slower => bright_red(text),
    }
}
