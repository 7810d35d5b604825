pub mod layout;
pub mod palette;
pub mod render;

use thiserror::Error;

pub use layout::{BarLayout, YScale};
pub use palette::Palette;
pub use render::{ChartOptions, render};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChartError {
    #[error("Invalid color `{0}`, expected #RRGGBB, #RGB or a basic color name")]
    InvalidColor(String),
    #[error("{colors} colors given for {stacks} stacks")]
    PaletteTooShort { colors: usize, stacks: usize },
    #[error("Unsupported y scale `{0}`, expected linear or log")]
    UnknownScale(String),
    #[error("Cannot draw a {0}, it is not a finite number")]
    NonFinite(String),
}
