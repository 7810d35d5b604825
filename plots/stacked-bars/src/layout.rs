//! Placement of grouped, stacked bars on a row of slots.
//!
//! Every bar of every group gets one slot, and an empty gap slot separates
//! consecutive groups, so `groups x bars` takes `(bars + 1) * groups - 1`
//! slots. Slot `k` is centred on x = `k`.

use core::fmt;
use std::str::FromStr;

use common::aggregate::ResultCube;

use crate::ChartError;

/// Fraction of the visible log10 span added above and below the data
pub const LOG_MARGIN: f64 = 0.3;
/// Linear charts leave room above the tallest bar for its label
pub const LINEAR_HEADROOM: f64 = 1.2;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum YScale {
    #[default]
    Linear,
    Log,
}

impl FromStr for YScale {
    type Err = ChartError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "linear" => Ok(YScale::Linear),
            "log" => Ok(YScale::Log),
            other => Err(ChartError::UnknownScale(other.to_owned())),
        }
    }
}

impl fmt::Display for YScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            YScale::Linear => write!(f, "linear"),
            YScale::Log => write!(f, "log"),
        }
    }
}

/// One stack layer spread over all slots, gap slots stay zero
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub label: String,
    pub heights: Vec<f64>,
    pub bottoms: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BarLayout {
    pub slots: usize,
    pub layers: Vec<Layer>,
    /// Height of every slot after the topmost layer
    pub totals: Vec<f64>,
    /// Tick label of every slot, empty for gaps
    pub x_labels: Vec<String>,
    /// Group labels with their centre as a fraction of the x axis, only set for multiple groups
    pub group_labels: Vec<(f64, String)>,
}

impl BarLayout {
    pub fn new(cube: &ResultCube) -> Self {
        let (groups, bars, stacks) = cube.shape();
        let slots = ((bars + 1) * groups).saturating_sub(1);

        let mut stack_heights = vec![vec![0.0; slots]; stacks];
        for ((group, bar, stack), value) in cube.cells() {
            stack_heights[stack][slot_of(bars, group, bar)] = value;
        }

        let mut layers = Vec::with_capacity(stacks);
        let mut bottom = vec![0.0; slots];
        for (label, heights) in cube.stacks.iter().zip(stack_heights) {
            let next = bottom.iter().zip(&heights).map(|(b, h)| b + h).collect();
            layers.push(Layer {
                label: label.clone(),
                heights,
                bottoms: std::mem::replace(&mut bottom, next),
            });
        }

        let mut x_labels = Vec::with_capacity(slots);
        for group in 0..groups {
            if group > 0 {
                x_labels.push(String::new());
            }
            x_labels.extend(cube.bars.iter().cloned());
        }

        let group_labels = if groups > 1 {
            cube.groups
                .iter()
                .enumerate()
                .map(|(i, label)| {
                    let centre = (bars as f64 / 2.0 + (i * (bars + 1)) as f64) / slots as f64;
                    (centre, label.clone())
                })
                .collect()
        } else {
            Vec::new()
        };

        Self {
            slots,
            layers,
            totals: bottom,
            x_labels,
            group_labels,
        }
    }

    /// Legend entries, only present when there is more than one layer
    pub fn legend(&self) -> Vec<&str> {
        if self.layers.len() > 1 {
            self.layers.iter().map(|l| l.label.as_str()).collect()
        } else {
            Vec::new()
        }
    }

    /// Value printed above each slot, empty for gaps and zero height bars
    pub fn total_labels(&self, scale: YScale) -> Vec<String> {
        self.totals
            .iter()
            .map(|&total| match scale {
                _ if total <= 0.0 => String::new(),
                YScale::Linear => format!("{total:.1}"),
                YScale::Log => format!("{total:.1e}"),
            })
            .collect()
    }

    pub fn max_total(&self) -> f64 {
        self.totals.iter().copied().fold(0.0, f64::max)
    }

    /// [`BarLayout::y_range`], failing when a bar total or a bound is not finite
    pub fn finite_y_range(&self, scale: YScale) -> Result<(f64, f64), ChartError> {
        if let Some(total) = self.totals.iter().find(|t| !t.is_finite()) {
            return Err(ChartError::NonFinite(format!("bar total {total}")));
        }
        match self.y_range(scale) {
            (lo, hi) if lo.is_finite() && hi.is_finite() => Ok((lo, hi)),
            (lo, hi) => Err(ChartError::NonFinite(format!("{scale} y range {lo}..{hi}"))),
        }
    }

    /// Visible y range
    pub fn y_range(&self, scale: YScale) -> (f64, f64) {
        match scale {
            YScale::Linear => {
                let max = self.max_total();
                if max > 0.0 {
                    (0.0, max * LINEAR_HEADROOM)
                } else {
                    (0.0, 1.0)
                }
            }
            YScale::Log => {
                let positive = self
                    .layers
                    .iter()
                    .flat_map(|l| l.bottoms.iter().chain(&self.totals))
                    .copied()
                    .filter(|v| *v > 0.0);
                let (min, max) = positive.fold((f64::INFINITY, 0.0f64), |(lo, hi), v| {
                    (lo.min(v), hi.max(v))
                });
                if !min.is_finite() {
                    return (1.0, 10.0);
                }
                let (lo, hi) = (min.log10(), max.log10());
                let span = if hi > lo { hi - lo } else { 1.0 };
                (
                    10f64.powf(lo - LOG_MARGIN * span),
                    10f64.powf(hi + LOG_MARGIN * span),
                )
            }
        }
    }
}

fn slot_of(bars: usize, group: usize, bar: usize) -> usize {
    group * (bars + 1) + bar
}

/// Pixel dimensions of the rendered chart, derived from its content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanvasSize {
    pub width: u32,
    pub height: u32,
    pub legend: u32,
    pub x_label_area: u32,
    pub group_area: u32,
}

pub const FONT_SIZE: u32 = 13;
pub const SLOT_WIDTH: u32 = 36;
pub const PLOT_HEIGHT: u32 = 420;
pub const Y_LABEL_AREA: u32 = 80;
pub const MARGIN: u32 = 10;

/// Rough width of `text` in pixels
pub fn text_width(text: &str, font_size: u32) -> u32 {
    (text.chars().count() as f64 * font_size as f64 * 0.6).ceil() as u32
}

impl CanvasSize {
    pub fn new(layout: &BarLayout) -> Self {
        let legend_entries = layout.legend();
        let legend = if legend_entries.is_empty() { 0 } else { 2 * FONT_SIZE + MARGIN };
        let legend_width = legend_entries
            .iter()
            .map(|l| legend_entry_width(l))
            .sum::<u32>();

        let x_label_area = layout
            .x_labels
            .iter()
            .map(|l| text_width(l, FONT_SIZE))
            .max()
            .unwrap_or(0)
            + 2 * MARGIN;

        let group_area = if layout.group_labels.is_empty() { 0 } else { 2 * FONT_SIZE + MARGIN };
        let group_width = layout
            .group_labels
            .iter()
            .map(|(_, l)| text_width(l, FONT_SIZE) + MARGIN)
            .sum::<u32>();

        let plot_width = (layout.slots as u32 * SLOT_WIDTH).max(group_width);
        let width = (Y_LABEL_AREA + plot_width + 2 * MARGIN).max(legend_width + 2 * MARGIN);
        Self {
            width,
            height: legend + PLOT_HEIGHT + x_label_area + group_area + 2 * MARGIN,
            legend,
            x_label_area,
            group_area,
        }
    }
}

/// Swatch, gap, label and spacing of one legend entry
pub fn legend_entry_width(label: &str) -> u32 {
    FONT_SIZE + 6 + text_width(label, FONT_SIZE) + 2 * MARGIN
}
