mod cli;
mod community;
mod config;
mod config_persistence;
mod enrichment;
mod festival_import;
mod graph;
mod pipeline;
mod report;
mod sentiment;

use clap::Parser;
use log::{error, info};

use cli::{AnalysisOptions, FestigraphArgs, FestigraphCommand};
use config::Config;
use graph::FestivalGraph;

fn analyze_and_report(
    mut graph: FestivalGraph,
    config: &Config,
    options: &AnalysisOptions,
) -> Result<(), String> {
    let scorer = pipeline::load_scorer(config)?;
    let seed = pipeline::resolve_seed(options.seed, config);
    let report = pipeline::analyze(&mut graph, &scorer, config, seed);
    print!("{}", report::render_report(&report));
    if let Some(path) = &options.report_json {
        report::write_report_json(&report, path)?;
        info!("Wrote JSON report to {}", path.display());
    }
    Ok(())
}

fn run_command(command: FestigraphCommand, config: &Config) -> Result<(), String> {
    match command {
        FestigraphCommand::Build(args) => {
            let graph = pipeline::build(&args.pairs)?;
            graph.save(&args.output)?;
            info!(
                "Wrote graph with {} vertices and {} links to {}",
                graph.node_count(),
                graph.links.len(),
                args.output.display()
            );
        }
        FestigraphCommand::Enrich(args) => {
            let graph = FestivalGraph::load(&args.graph)?;
            let (graph, summary) = pipeline::enrich(graph, config)?;
            graph.save(&args.output)?;
            info!(
                "Wrote enriched graph to {} ({}/{} artists resolved)",
                args.output.display(),
                summary.resolved(),
                summary.artists
            );
        }
        FestigraphCommand::Analyze(args) => {
            let graph = FestivalGraph::load(&args.graph)?;
            analyze_and_report(graph, config, &args.options)?;
        }
        FestigraphCommand::Run(args) => {
            let graph = pipeline::build(&args.pairs)?;
            let (graph, _) = pipeline::enrich(graph, config)?;
            graph.save(&args.output)?;
            info!("Wrote enriched graph to {}", args.output.display());
            analyze_and_report(graph, config, &args.options)?;
        }
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = FestigraphArgs::parse();

    let mut clog = colog::default_builder();
    let level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    clog.filter(None, level);
    clog.init();

    std::panic::set_hook(Box::new(|panic_info| {
        let current_thread = std::thread::current();
        let thread_name = current_thread.name().unwrap_or("unnamed");
        error!("panic in thread '{}': {}", thread_name, panic_info);
    }));

    let config = config_persistence::load_config(args.config.as_deref()).map_err(|err| {
        error!("{err}");
        err
    })?;

    run_command(args.command, &config).map_err(|err| {
        error!("{err}");
        err.into()
    })
}
