use std::path::PathBuf;

use clap::Args;
use common::{
    DEFAULT_COLORS,
    aggregate::{BarSet, aggregate},
    config::ChartConfig,
    loader::load_results,
    spec::{AxisSpec, FilterSpec, StackSpec, parse_stacks},
};
use eyre::{Context, Result, eyre};
use stacked_bars::{ChartOptions, Palette, YScale, render};
use tracing::debug;

/// Chart options, each one falls back to the config file and then to its default
#[derive(Debug, Default, Clone, Args)]
pub struct ChartArgs {
    /// Directory with JSON result files [default: ../results]
    #[arg(short, long)]
    pub input: Option<String>,
    /// Keep results whose value matches, `path=value`
    #[arg(short, long)]
    pub filter: Option<String>,
    /// Value source for groups, `path` or `path=v1,v2,...`
    #[arg(short, long)]
    pub groups: Option<String>,
    /// Value source for bars, `path` or `path=v1,v2,...`
    #[arg(short, long)]
    pub bars: Option<String>,
    /// Value sources for stacks, `path1=label1,path2=label2,...`
    #[arg(short, long)]
    pub stacks: Option<String>,
    /// Unit for the y axis [default: "s / op"]
    #[arg(short, long)]
    pub unit: Option<String>,
    /// Output SVG file [default: ./chart.svg]
    #[arg(short, long)]
    pub output: Option<String>,
    /// Scale of the y axis, linear or log [default: linear]
    #[arg(short, long)]
    pub yscale: Option<String>,
    /// Comma separated colors, one per stack, as #RRGGBB, #RGB or a basic name such as red
    #[arg(short, long)]
    pub colors: Option<String>,
    /// Fail unless every group has the same bars
    #[arg(long, default_value_t = false)]
    pub strict: bool,
}

#[derive(Debug, Clone)]
pub struct ChartSettings {
    pub input: PathBuf,
    pub filter: FilterSpec,
    pub groups: AxisSpec,
    pub bars: AxisSpec,
    pub stacks: Vec<StackSpec>,
    pub unit: String,
    pub output: PathBuf,
    pub scale: YScale,
    pub palette: Palette,
    pub bar_set: BarSet,
}

fn required(value: Option<String>, flag: &str) -> Result<String> {
    value.ok_or_else(|| eyre!("Missing --{flag}, pass it on the command line or in the config file"))
}

impl ChartSettings {
    pub fn resolve(args: ChartArgs, config: ChartConfig) -> Result<Self> {
        let filter = required(args.filter.or(config.filter), "filter")?;
        let groups = required(args.groups.or(config.groups), "groups")?;
        let bars = required(args.bars.or(config.bars), "bars")?;
        let stacks = required(args.stacks.or(config.stacks), "stacks")?;
        let scale = args
            .yscale
            .or(config.yscale)
            .map(|s| s.parse::<YScale>())
            .transpose()?
            .unwrap_or_default();
        let colors = args
            .colors
            .or(config.colors)
            .unwrap_or_else(|| DEFAULT_COLORS.to_owned());
        let bar_set = if args.strict || config.strict.unwrap_or(false) {
            BarSet::Uniform
        } else {
            BarSet::FirstGroup
        };

        Ok(Self {
            input: args
                .input
                .or(config.input)
                .unwrap_or_else(|| "../results".to_owned())
                .into(),
            filter: FilterSpec::parse(&filter).wrap_err("Parse --filter")?,
            groups: AxisSpec::parse(&groups).wrap_err("Parse --groups")?,
            bars: AxisSpec::parse(&bars).wrap_err("Parse --bars")?,
            stacks: parse_stacks(&stacks).wrap_err("Parse --stacks")?,
            unit: args
                .unit
                .or(config.unit)
                .unwrap_or_else(|| "s / op".to_owned()),
            output: args
                .output
                .or(config.output)
                .unwrap_or_else(|| "./chart.svg".to_owned())
                .into(),
            scale,
            palette: Palette::parse(&colors).wrap_err("Parse --colors")?,
            bar_set,
        })
    }
}

pub fn run(settings: &ChartSettings) -> Result<()> {
    let records = load_results(&settings.input)?;
    debug!(
        "Loaded {} results from {}",
        records.len(),
        settings.input.display()
    );

    let cube = aggregate(
        &records,
        &settings.filter,
        &settings.groups,
        &settings.bars,
        &settings.stacks,
        settings.bar_set,
    )
    .wrap_err("Aggregate results")?;

    render(
        &cube,
        &settings.output,
        &ChartOptions {
            unit: &settings.unit,
            scale: settings.scale,
            palette: &settings.palette,
        },
    )
}
