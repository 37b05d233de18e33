//! Konduit CLI - validate, inspect, and run pipeline documents

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use konduit_core::{Data, Pipeline, StepRegistry, SwitchRegistry};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "konduit")]
#[command(about = "Typed data pipelines for machine learning serving", long_about = None)]
struct Cli {
    /// Verbose output (show debug info)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet output (only errors)
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that a pipeline document parses and every runner can be built
    Validate {
        /// Pipeline file (.json, .yaml, .yml)
        pipeline: PathBuf,
    },

    /// Show the steps and wiring of a pipeline document
    Inspect {
        /// Pipeline file (.json, .yaml, .yml)
        pipeline: PathBuf,

        /// Print the document back out as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run a pipeline over a data document
    Run {
        /// Pipeline file (.json, .yaml, .yml)
        pipeline: PathBuf,

        /// Input data document (JSON); "-" reads stdin
        #[arg(short, long)]
        data: String,

        /// Output file for the result document; stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Pretty-print the result
        #[arg(long)]
        pretty: bool,
    },

    /// List the registered step and switch types
    Steps,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let (steps, switches) = konduit_steps::default_registries();

    match cli.command {
        Commands::Validate { pipeline } => validate(&pipeline, &steps, &switches),
        Commands::Inspect { pipeline, json } => inspect(&pipeline, json),
        Commands::Run {
            pipeline,
            data,
            output,
            pretty,
        } => run(&pipeline, &data, output.as_deref(), pretty, &steps, &switches),
        Commands::Steps => {
            list_registered(&steps, &switches);
            Ok(())
        }
    }
}

/// Load a pipeline document, picking the format from the file extension.
fn load_pipeline(path: &Path) -> Result<Pipeline> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("failed to read pipeline file {}", path.display()))?;
    Pipeline::from_bytes(&bytes, path.to_str())
        .with_context(|| format!("failed to parse pipeline file {}", path.display()))
}

fn validate(path: &Path, steps: &StepRegistry, switches: &SwitchRegistry) -> Result<()> {
    let pipeline = load_pipeline(path)?;
    pipeline
        .executor(steps, switches)
        .context("pipeline failed validation")?;
    println!("{}: ok", path.display());
    Ok(())
}

fn inspect(path: &Path, as_json: bool) -> Result<()> {
    let pipeline = load_pipeline(path)?;
    if as_json {
        println!("{}", pipeline.to_json()?);
        return Ok(());
    }
    match &pipeline {
        Pipeline::Sequence(sequence) => {
            println!("sequence pipeline, {} step(s):", sequence.steps.len());
            for (index, step) in sequence.steps.iter().enumerate() {
                println!("  {}. {}", index + 1, describe_step(step));
            }
        }
        Pipeline::Graph(graph) => {
            println!("graph pipeline, {} node(s):", graph.nodes.len());
            for (name, node) in &graph.nodes {
                println!("  {}: {}", name, describe_node(node));
            }
            println!("output: {}", graph.output);
        }
    }
    Ok(())
}

fn describe_step(step: &konduit_core::StepConfig) -> String {
    if step.inputs.is_empty() {
        step.step_type.clone()
    } else {
        let inputs: Vec<String> = step
            .inputs
            .iter()
            .map(|(key, value_type)| format!("{}: {}", key, value_type))
            .collect();
        format!("{} ({})", step.step_type, inputs.join(", "))
    }
}

fn describe_node(node: &konduit_core::GraphNode) -> String {
    use konduit_core::GraphNode;
    match node {
        GraphNode::Step { input, step } => {
            format!("step {} <- {}", describe_step(step), input)
        }
        GraphNode::Merge { inputs } => format!("merge <- {}", join_ports(inputs)),
        GraphNode::Switch { input, switch } => {
            format!("switch {} <- {}", switch.switch_type, input)
        }
        GraphNode::Any { inputs } => format!("any <- {}", join_ports(inputs)),
    }
}

fn join_ports(ports: &[konduit_core::PortRef]) -> String {
    ports
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

fn run(
    path: &Path,
    data: &str,
    output: Option<&Path>,
    pretty: bool,
    steps: &StepRegistry,
    switches: &SwitchRegistry,
) -> Result<()> {
    let pipeline = load_pipeline(path)?;
    let mut executor = pipeline
        .executor(steps, switches)
        .context("pipeline failed validation")?;

    let input_text = if data == "-" {
        std::io::read_to_string(std::io::stdin()).context("failed to read stdin")?
    } else {
        std::fs::read_to_string(data)
            .with_context(|| format!("failed to read data file {}", data))?
    };
    let input = Data::from_json(&input_text).context("failed to parse input data document")?;

    let result = executor.exec(input).context("pipeline execution failed")?;
    executor.close();

    let rendered = if pretty {
        result.to_json_pretty()?
    } else {
        result.to_json()?
    };
    match output {
        Some(path) => std::fs::write(path, rendered)
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => println!("{}", rendered),
    }
    Ok(())
}

fn list_registered(steps: &StepRegistry, switches: &SwitchRegistry) {
    println!("step types:");
    for name in steps.step_types() {
        println!("  {}", name);
    }
    println!("switch types:");
    let mut any = false;
    for name in switches.switch_types() {
        println!("  {}", name);
        any = true;
    }
    if !any {
        println!("  (none)");
    }
}
