use std::{ops::Range, path::Path};

use common::aggregate::ResultCube;
use eyre::{Context, Result};
use plotters::{
    coord::{CoordTranslate, Shift},
    prelude::*,
    style::{
        FontDesc, FontFamily, FontStyle, FontTransform,
        text_anchor::{HPos, Pos, VPos},
    },
};
use tracing::{debug, info};

use crate::{
    layout::{
        BarLayout, CanvasSize, FONT_SIZE, MARGIN, Y_LABEL_AREA, YScale, legend_entry_width,
    },
    palette::Palette,
};

/// Share of a slot covered by its bar
const BAR_WIDTH: f64 = 0.95;
/// Pixels between a bar top and its total label
const LABEL_PADDING: i32 = 3;

type Area<'a> = DrawingArea<SVGBackend<'a>, Shift>;

#[derive(Debug, Clone, Copy)]
pub struct ChartOptions<'a> {
    /// Y axis description, ie. `s / op`
    pub unit: &'a str,
    pub scale: YScale,
    pub palette: &'a Palette,
}

fn font() -> FontDesc<'static> {
    FontDesc::new(FontFamily::SansSerif, FONT_SIZE as f64, FontStyle::Normal)
}

/// Renders `cube` as grouped, stacked bars into an SVG file at `output`
pub fn render(cube: &ResultCube, output: &Path, options: &ChartOptions<'_>) -> Result<()> {
    let colors = options.palette.for_stacks(cube.stacks.len())?;
    let layout = BarLayout::new(cube);
    let (y_lo, y_hi) = layout.finite_y_range(options.scale)?;
    let size = CanvasSize::new(&layout);
    debug!(
        "Rendering {} slots on a {}x{} canvas",
        layout.slots, size.width, size.height
    );

    let root = SVGBackend::new(output, (size.width, size.height)).into_drawing_area();
    root.fill(&WHITE)?;
    let (legend_area, body) = root.split_vertically(size.legend);
    let (plot_area, group_area) =
        body.split_vertically(size.height - size.legend - size.group_area);

    let x_range = -0.5..(layout.slots.max(1) as f64 - 0.5);
    let plot_x = match options.scale {
        YScale::Linear => {
            let mut chart = ChartBuilder::on(&plot_area)
                .margin(MARGIN)
                .x_label_area_size(size.x_label_area)
                .y_label_area_size(Y_LABEL_AREA)
                .build_cartesian_2d(x_range, y_lo..y_hi)?;
            chart
                .configure_mesh()
                .disable_x_mesh()
                .light_line_style(&TRANSPARENT)
                .x_label_formatter(&|_| String::new())
                .set_tick_mark_size(LabelAreaPosition::Bottom, 0)
                .y_desc(options.unit)
                .label_style(font())
                .draw()?;
            draw_bars(&mut chart, &root, &layout, colors, options.scale, y_lo)?;
            chart.plotting_area().get_pixel_range().0
        }
        YScale::Log => {
            let mut chart = ChartBuilder::on(&plot_area)
                .margin(MARGIN)
                .x_label_area_size(size.x_label_area)
                .y_label_area_size(Y_LABEL_AREA)
                .build_cartesian_2d(x_range, (y_lo..y_hi).log_scale())?;
            chart
                .configure_mesh()
                .disable_x_mesh()
                .light_line_style(&TRANSPARENT)
                .x_label_formatter(&|_| String::new())
                .y_label_formatter(&|v| format!("{v:.0e}"))
                .set_tick_mark_size(LabelAreaPosition::Bottom, 0)
                .y_desc(options.unit)
                .label_style(font())
                .draw()?;
            draw_bars(&mut chart, &root, &layout, colors, options.scale, y_lo)?;
            chart.plotting_area().get_pixel_range().0
        }
    };

    draw_group_labels(&group_area, &layout, plot_x)?;
    draw_legend(&legend_area, &layout.legend(), colors)?;

    root.present()
        .wrap_err_with(|| format!("Write {}", output.display()))?;
    info!("Chart written to {}", output.display());
    Ok(())
}

fn draw_bars<CT>(
    chart: &mut ChartContext<'_, SVGBackend<'_>, CT>,
    root: &Area<'_>,
    layout: &BarLayout,
    colors: &[RGBColor],
    scale: YScale,
    y_floor: f64,
) -> Result<()>
where
    CT: CoordTranslate<From = (f64, f64)>,
{
    let half = BAR_WIDTH / 2.0;
    for (layer, color) in layout.layers.iter().zip(colors) {
        chart.draw_series(
            layer
                .heights
                .iter()
                .zip(&layer.bottoms)
                .enumerate()
                .filter(|(_, (height, _))| **height != 0.0)
                .map(|(slot, (height, bottom))| {
                    let x = slot as f64;
                    // log axes cannot show the zero baseline
                    let (bottom, top) = (bottom.max(y_floor), (bottom + height).max(y_floor));
                    Rectangle::new([(x - half, bottom), (x + half, top)], color.filled())
                }),
        )?;
    }

    let coords = chart.as_coord_spec();

    let total_style = TextStyle::from(font())
        .transform(FontTransform::Rotate270)
        .pos(Pos::new(HPos::Left, VPos::Center));
    let totals = layout.total_labels(scale);
    for (slot, (label, total)) in totals.iter().zip(&layout.totals).enumerate() {
        if label.is_empty() {
            continue;
        }
        let (x, y) = coords.translate(&(slot as f64, *total));
        root.draw(&Text::new(
            label.as_str(),
            (x, y - LABEL_PADDING),
            total_style.clone(),
        ))?;
    }

    let tick_style = TextStyle::from(font())
        .transform(FontTransform::Rotate270)
        .pos(Pos::new(HPos::Right, VPos::Center));
    for (slot, label) in layout.x_labels.iter().enumerate() {
        if label.is_empty() {
            continue;
        }
        let (x, y) = coords.translate(&(slot as f64, y_floor));
        root.draw(&Text::new(
            label.as_str(),
            (x, y + MARGIN as i32 / 2),
            tick_style.clone(),
        ))?;
    }
    Ok(())
}

fn draw_group_labels(area: &Area<'_>, layout: &BarLayout, plot_x: Range<i32>) -> Result<()> {
    let style = TextStyle::from(font()).pos(Pos::new(HPos::Center, VPos::Center));
    let (_, height) = area.dim_in_pixel();
    let width = (plot_x.end - plot_x.start) as f64;
    for (fraction, label) in &layout.group_labels {
        let x = plot_x.start + (fraction * width).round() as i32;
        area.draw(&Text::new(
            label.as_str(),
            (x, height as i32 / 2),
            style.clone(),
        ))?;
    }
    Ok(())
}

fn draw_legend(area: &Area<'_>, labels: &[&str], colors: &[RGBColor]) -> Result<()> {
    if labels.is_empty() {
        return Ok(());
    }
    let style = TextStyle::from(font()).pos(Pos::new(HPos::Left, VPos::Center));
    let (width, height) = area.dim_in_pixel();
    let total = labels.iter().map(|l| legend_entry_width(l)).sum::<u32>();
    let swatch = FONT_SIZE as i32;
    let y = height as i32 / 2;
    let mut x = (width.saturating_sub(total) / 2) as i32;
    for (label, color) in labels.iter().zip(colors) {
        area.draw(&Rectangle::new(
            [(x, y - swatch / 2), (x + swatch, y + swatch / 2)],
            color.filled(),
        ))?;
        area.draw(&Text::new(*label, (x + swatch + 6, y), style.clone()))?;
        x += legend_entry_width(label) as i32;
    }
    Ok(())
}
