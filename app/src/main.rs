use std::path::PathBuf;

use clap::Parser;
use common::config::ChartConfig;
use eyre::Result;
use tracing::error;
use tracing_subscriber::{
    EnvFilter,
    fmt::{layer, time::ChronoLocal},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

mod chart;

const MODULES: &[&str] = &["common", "stacked_bars"];

/// Render benchmark results as a grouped, stacked bar chart
#[derive(Parser)]
#[command(version)]
struct Cli {
    #[command(flatten)]
    chart: chart::ChartArgs,
    /// YAML file with defaults for any chart option
    #[arg(long)]
    config: Option<PathBuf>,
    /// Extra tracing filter directives, ie. `common=debug`
    #[arg(short, long)]
    log: Vec<String>,
}

fn main() -> Result<()> {
    let log_level = std::env::var("RUST_LOG").unwrap_or("warn".to_owned());
    let args = Cli::parse();

    let mut env_filter = EnvFilter::new(format!("bench_chart={log_level}"));
    for log in &args.log {
        env_filter = env_filter.add_directive(log.parse()?);
    }
    for module in MODULES {
        if !args.log.iter().any(|x| x.starts_with(module)) {
            env_filter = env_filter.add_directive(format!("{module}={log_level}").parse()?);
        }
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            layer()
                .with_writer(std::io::stderr)
                .with_timer(ChronoLocal::new("%v %k:%M:%S %z".to_owned()))
                .compact(),
        )
        .init();

    let config = match &args.config {
        Some(path) => ChartConfig::load(path)?,
        None => ChartConfig::default(),
    };
    let settings = chart::ChartSettings::resolve(args.chart, config)?;
    if let Err(err) = chart::run(&settings) {
        error!("{err:#?}");
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn short_flags_map_to_options() {
        let cli = Cli::try_parse_from([
            "bench-chart",
            "-i",
            "results",
            "-f",
            "mode=thrpt",
            "-g",
            "benchmark",
            "-b",
            "params/query",
            "-s",
            "primaryMetric/score=Score",
            "-u",
            "ops / s",
            "-o",
            "out.svg",
            "-y",
            "log",
            "-c",
            "#000000",
            "-l",
            "common=debug",
            "--strict",
            "--config",
            "chart.yaml",
        ])
        .unwrap();

        let chart = &cli.chart;
        assert_eq!(chart.input.as_deref(), Some("results"));
        assert_eq!(chart.filter.as_deref(), Some("mode=thrpt"));
        assert_eq!(chart.groups.as_deref(), Some("benchmark"));
        assert_eq!(chart.bars.as_deref(), Some("params/query"));
        assert_eq!(chart.stacks.as_deref(), Some("primaryMetric/score=Score"));
        assert_eq!(chart.unit.as_deref(), Some("ops / s"));
        assert_eq!(chart.output.as_deref(), Some("out.svg"));
        assert_eq!(chart.yscale.as_deref(), Some("log"));
        assert_eq!(chart.colors.as_deref(), Some("#000000"));
        assert!(chart.strict);
        assert_eq!(cli.log, ["common=debug"]);
        assert_eq!(cli.config, Some(PathBuf::from("chart.yaml")));
    }

    #[test]
    fn options_are_optional_on_the_command_line() {
        let cli = Cli::try_parse_from(["bench-chart"]).unwrap();
        assert!(cli.chart.filter.is_none());
        assert!(!cli.chart.strict);
        assert!(cli.log.is_empty());
    }
}
