use anyhow::Context;
use clap::Parser;
use ccsim::{
    config::args::{Cli, Command, RunArgs, SweepArgs},
    export::ResultsDir,
    report, FlowReport, SimulationConfig,
};

fn run_flows(args: &RunArgs, config: &SimulationConfig) -> anyhow::Result<()> {
    let reports = args
        .algorithms()
        .into_iter()
        .map(|algorithm| Ok(config.flow_for(algorithm)?.run()?))
        .collect::<anyhow::Result<Vec<FlowReport>>>()?;
    report::runs_table(&reports).printstd();

    if let Some(output_dir) = &args.output_dir {
        let dir = ResultsDir::create(output_dir)
            .with_context(|| format!("preparing {}", output_dir.display()))?;
        dir.write_runs(&reports)?;
        dir.write_config(config)?;
    }
    Ok(())
}

fn run_sweep(args: &SweepArgs, config: &SimulationConfig) -> anyhow::Result<()> {
    let sweep = config.sweep()?;
    let abort = sweep.abort_handle();
    ctrlc::set_handler(move || abort.abort()).context("installing Ctrl-C handler")?;

    let result = sweep.run()?;
    report::sweep_table(&result).printstd();

    if let Some(output_dir) = &args.output_dir {
        let dir = ResultsDir::create(output_dir)
            .with_context(|| format!("preparing {}", output_dir.display()))?;
        dir.write_sweep(&result)?;
        dir.write_config(config)?;
    }
    if result.aborted {
        anyhow::bail!("sweep aborted after {} records", result.len());
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    ccsim::set_logger(cli.log_level);
    let config = cli.resolve().context("invalid configuration")?;
    match &cli.command {
        Command::Run(args) => run_flows(args, &config),
        Command::Sweep(args) => run_sweep(args, &config),
    }
}
