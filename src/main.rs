use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use kiln::config::Manifest;
use kiln::core::OutputPathResolver;
use kiln::exec::{plan as build_plan, ParallelExecutor, Scheduler};
use kiln::{klog, Error, Result};

/// Kiln - multi-module build task scheduler
#[derive(Parser, Debug)]
#[command(name = "kiln")]
#[command(version, about, long_about = None)]
#[command(after_help = "ENVIRONMENT:\n    KILN_DEBUG=1    Enable debug logging (alternative to --debug)")]
pub struct Cli {
    /// Enable debug logging (writes to ~/.kiln/kiln.log)
    #[arg(short = 'd', long)]
    pub debug: bool,

    /// Path to the build manifest
    #[arg(short = 'm', long, default_value = "kiln.toml")]
    pub manifest: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Compute and print the execution plan without running anything
    Plan {
        /// Tasks to plan, in request order
        #[arg(required = true)]
        tasks: Vec<String>,

        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },

    /// Plan and execute tasks
    Run {
        /// Tasks to run, in request order
        #[arg(required = true)]
        tasks: Vec<String>,

        /// Run independent units concurrently on this many workers
        #[arg(long, value_name = "WORKERS")]
        parallel: Option<usize>,
    },
}

/// Exit code for a failed invocation: planning and manifest errors get
/// a distinct code so callers can tell a bad build setup from a task
/// that ran and failed.
fn exit_code(err: &Error) -> u8 {
    match err {
        Error::DuplicateModule(_)
        | Error::UnknownDependency { .. }
        | Error::CyclicDependency { .. }
        | Error::InvalidModuleName(_)
        | Error::DuplicateTask(_)
        | Error::UnknownTask(_)
        | Error::UnsatisfiableOrdering { .. }
        | Error::Manifest(_)
        | Error::TomlParse(_) => 2,
        _ => 1,
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    kiln::log::init_with_debug(cli.debug);
    klog!("Kiln starting: {:?}", cli.command);

    match dispatch(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::from(exit_code(&e))
        }
    }
}

fn dispatch(cli: &Cli) -> Result<()> {
    let manifest = Manifest::load(&cli.manifest)?;
    let graph = manifest.build_graph()?;
    let registry = manifest.build_registry()?;
    let mut resolver = OutputPathResolver::new(manifest.build_root(&cli.manifest));

    match &cli.command {
        Command::Plan { tasks, json } => {
            let plan = build_plan(&graph, &registry, &mut resolver, tasks)?;
            if *json {
                println!("{}", serde_json::to_string_pretty(&plan)?);
            } else {
                for unit in plan.units() {
                    println!("{}", unit.label());
                }
            }
            Ok(())
        }
        Command::Run { tasks, parallel } => match parallel {
            Some(workers) => run_parallel(&graph, &registry, resolver, tasks, *workers),
            None => run_sequential(&graph, &registry, resolver, tasks),
        },
    }
}

fn run_sequential(
    graph: &kiln::ModuleGraph,
    registry: &kiln::TaskRegistry,
    resolver: OutputPathResolver,
    tasks: &[String],
) -> Result<()> {
    let mut scheduler = Scheduler::new(graph, registry, resolver);
    scheduler.build_plan(tasks)?;
    let report = scheduler.execute()?;
    println!("Completed {} unit(s)", report.completed.len());
    Ok(())
}

fn run_parallel(
    graph: &kiln::ModuleGraph,
    registry: &kiln::TaskRegistry,
    mut resolver: OutputPathResolver,
    tasks: &[String],
    workers: usize,
) -> Result<()> {
    let plan = build_plan(graph, registry, &mut resolver, tasks)?;
    let rt = tokio::runtime::Runtime::new()?;
    let report = rt.block_on(ParallelExecutor::new(workers).execute(&plan, registry))?;
    println!("Completed {} unit(s)", report.completed.len());
    Ok(())
}
