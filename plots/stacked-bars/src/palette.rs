use std::sync::LazyLock;

use common::spec::parse_value_list;
use plotters::style::{BLACK, BLUE, CYAN, GREEN, MAGENTA, RED, RGBColor, WHITE, YELLOW};
use regex::Regex;

use crate::ChartError;

static HEX_COLOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("^#([0-9a-fA-F]{3}|[0-9a-fA-F]{6})$").expect("valid regex"));

const NAMED_COLORS: [(&str, RGBColor); 8] = [
    ("black", BLACK),
    ("white", WHITE),
    ("red", RED),
    ("green", GREEN),
    ("blue", BLUE),
    ("cyan", CYAN),
    ("magenta", MAGENTA),
    ("yellow", YELLOW),
];

/// One fill color per stack layer, bottom layer first
#[derive(Debug, Clone, PartialEq)]
pub struct Palette(Vec<RGBColor>);

impl Palette {
    /// Parses a comma separated list of `#RRGGBB` or `#RGB` codes and basic color names
    pub fn parse(arg: &str) -> Result<Self, ChartError> {
        parse_value_list(arg)
            .map_err(|_| ChartError::InvalidColor(arg.to_owned()))?
            .iter()
            .map(|code| parse_color(code))
            .collect::<Result<_, _>>()
            .map(Self)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The first `stacks` colors
    pub fn for_stacks(&self, stacks: usize) -> Result<&[RGBColor], ChartError> {
        self.0.get(..stacks).ok_or(ChartError::PaletteTooShort {
            colors: self.0.len(),
            stacks,
        })
    }
}

fn parse_color(code: &str) -> Result<RGBColor, ChartError> {
    let code = code.trim();
    let invalid = || ChartError::InvalidColor(code.to_owned());
    if let Some((_, color)) = NAMED_COLORS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(code))
    {
        return Ok(*color);
    }

    let caps = HEX_COLOR.captures(code).ok_or_else(invalid)?;
    let digits = &caps[1];
    // #RGB doubles every digit
    let width = digits.len() / 3;
    let channel = |i: usize| {
        let hex = &digits[i * width..(i + 1) * width];
        u8::from_str_radix(&hex.repeat(3 - width), 16).map_err(|_| invalid())
    };
    Ok(RGBColor(channel(0)?, channel(1)?, channel(2)?))
}
