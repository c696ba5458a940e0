use std::process::{Command, ExitStatus};

use anyhow::{Context, Result};
use pulumi_state_splitter_core::{with_unsplit, StackName, StackSelection};

use crate::{interrupt::InterruptState, options::Options};

#[derive(clap::Args, Debug)]
#[group(required = true, multiple = false)]
pub(crate) struct Selection {
    /// Unsplit all split stacks, and split all stacks afterwards
    #[arg(short, long)]
    all: bool,

    /// Stack to unsplit, as `[organization/]project/stack`; may be repeated
    #[arg(short, long = "stack", value_name = "STACK")]
    stacks: Vec<StackName>,
}

impl Selection {
    fn to_stack_selection(&self) -> StackSelection {
        if self.all {
            StackSelection::All
        } else {
            StackSelection::Named(self.stacks.clone())
        }
    }
}

#[derive(clap::Parser, Debug)]
pub(crate) struct Args {
    #[command(flatten)]
    selection: Selection,

    /// The command to run, and its arguments
    #[arg(
        required = true,
        num_args = 1..,
        trailing_var_arg = true,
        allow_hyphen_values = true,
        value_name = "COMMAND"
    )]
    command: Vec<String>,
}

/// Run the `run` command, returning the exit code of the command.
pub(crate) fn run(
    options: &Options,
    interrupt_state: &InterruptState,
    args: &Args,
) -> Result<i32> {
    let (program, program_args) = args
        .command
        .split_first()
        .context("no command to run")?;
    let status = with_unsplit(
        &options.backend_directory,
        args.selection.to_stack_selection(),
        |stacks| {
            tracing::info!(stacks = stacks.len(), "running {}", program);
            Command::new(program).args(program_args).status()
        },
    )
    .with_context(|| format!("could not run {}", program))?;
    if interrupt_state.is_interrupted() {
        tracing::warn!("{} was interrupted; stacks have been split again", program);
    }
    Ok(exit_code(status))
}

/// The exit code to report for a child process, following shell conventions
/// for processes killed by a signal.
fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt as _;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    1
}
