mod interrupt;
mod logging;
mod options;
mod run;

use anyhow::{Context, Result};
use clap::{CommandFactory as _, Parser, Subcommand};
use interrupt::InterruptState;
use options::Options;
use pulumi_state_splitter_core::{
    split_stack, unsplit_stack, StackName, StateDir, StateFile, StoredState as _,
};
use std::process::exit;

fn main() {
    let args = Args::parse();
    handle_result(run_args(args));
}

fn run_args(args: Args) -> Result<i32> {
    let _logger = logging::set_up(logging::Options {
        verbose: args.options.verbose,
        color: args.options.use_color(),
    })?;
    let interrupt_state = interrupt::set_up_process_interrupt_handler()?;
    execute(&args, &interrupt_state)
}

fn execute(args: &Args, interrupt_state: &InterruptState) -> Result<i32> {
    match &args.command {
        Commands::Split(selection) => {
            let backend_dir = &args.options.backend_directory;
            let stacks = selection.stacks(|| StateFile::find(backend_dir))?;
            for_each_stack(interrupt_state, &stacks, "split", |stack| {
                split_stack(backend_dir, stack).map(drop)
            })?;
            Ok(0)
        }
        Commands::Unsplit(selection) => {
            let backend_dir = &args.options.backend_directory;
            let stacks = selection.stacks(|| StateDir::find(backend_dir))?;
            for_each_stack(interrupt_state, &stacks, "unsplit", |stack| {
                unsplit_stack(backend_dir, stack).map(drop)
            })?;
            Ok(0)
        }
        Commands::Run(subargs) => run::run(&args.options, interrupt_state, subargs),
        Commands::GenerateMan => {
            let cmd = Args::command();
            let man = clap_mangen::Man::new(cmd);
            let mut buffer: Vec<u8> = Default::default();
            man.render(&mut buffer)?;
            println!("{}", String::from_utf8(buffer)?);
            Ok(0)
        }
        Commands::GenerateMarkdown => {
            let opts = clap_markdown::MarkdownOptions::new().show_footer(false);
            let markdown: String = clap_markdown::help_markdown_custom::<Args>(&opts);
            println!("{}", markdown);
            Ok(0)
        }
        Commands::GenerateCompletion { shell } => {
            let mut cmd = Args::command();
            clap_complete::generate(
                *shell,
                &mut cmd,
                "pulumi-state-splitter",
                &mut std::io::stdout(),
            );
            Ok(0)
        }
    }
}

/// Converts stacks one at a time, stopping between stacks on Ctrl-C.
fn for_each_stack(
    interrupt_state: &InterruptState,
    stacks: &[StackName],
    verb: &str,
    f: impl Fn(&StackName) -> pulumi_state_splitter_core::Result<()>,
) -> Result<()> {
    if stacks.is_empty() {
        tracing::info!("no stacks to {}", verb);
    }
    for stack in stacks {
        interrupt_state.check_interrupted()?;
        f(stack).with_context(|| format!("could not {} stack {}", verb, stack))?;
    }
    Ok(())
}

fn handle_result(r: Result<i32>) {
    match r {
        Ok(0) => {}
        Ok(code) => exit(code),
        Err(e) => {
            eprintln!("pulumi-state-splitter error: {:?}", e);
            exit(1);
        }
    }
}

/// Which stacks to convert.
#[derive(clap::Args, Debug)]
#[group(required = true, multiple = false)]
struct Selection {
    /// Convert all stacks found in the backend directory
    #[arg(short, long)]
    all: bool,

    /// Stacks to convert, as `[organization/]project/stack`
    #[arg(value_name = "STACK")]
    stacks: Vec<StackName>,
}

impl Selection {
    fn stacks(
        &self,
        find: impl FnOnce() -> pulumi_state_splitter_core::Result<Vec<StackName>>,
    ) -> Result<Vec<StackName>> {
        if self.all {
            find().context("could not find stacks")
        } else {
            Ok(self.stacks.clone())
        }
    }
}

/// Split Pulumi stack states into one file per resource, and merge them back
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    options: Options,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Split single Pulumi stack state files into multiple files each
    Split(Selection),

    /// Merge split Pulumi stack states into a single state file each
    Unsplit(Selection),

    /// Run a command with stacks temporarily unsplit, e.g. `pulumi up`
    Run(run::Args),

    /// Generate markdown documentation for pulumi-state-splitter
    #[command(hide = true)]
    GenerateMarkdown,

    /// Generate a manpage for pulumi-state-splitter
    #[command(hide = true)]
    GenerateMan,

    /// Generate shell completion for pulumi-state-splitter
    #[command(hide = true)]
    GenerateCompletion {
        /// The shell to generate completion for
        #[arg(long)]
        shell: clap_complete::Shell,
    },
}
