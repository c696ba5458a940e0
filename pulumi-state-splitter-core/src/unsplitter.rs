//! Temporarily merging split stacks, so that tools which only understand
//! Pulumi's own state files can work on them.

use std::path::{Path, PathBuf};

use crate::{
    error::{Error, Result},
    split::{split_stack, unsplit_stack},
    stack_name::StackName,
    state_dir::StateDir,
    state_file::StateFile,
    stored_state::StoredState,
};

/// Which stacks an [`Unsplitter`] operates on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackSelection {
    /// The same stacks are unsplit on entry and split on exit.
    Named(Vec<StackName>),
    /// All split stacks are unsplit on entry, and all unsplit stacks are split
    /// on exit. Stacks created in between are split as well.
    // TODO: confirm that sweeping up stacks created while unsplit is wanted;
    //       `AllAtEntry` exists in case it is not.
    All,
    /// All split stacks are unsplit on entry, and exactly those are split on exit.
    AllAtEntry,
}

/// Keeps stacks unsplit while it is alive.
///
/// Dropping the guard splits the stacks again, logging any failure. Use
/// [`Unsplitter::finish`] to observe the result instead.
#[derive(Debug)]
pub struct Unsplitter {
    backend_dir: PathBuf,
    selection: StackSelection,
    unsplit: Vec<StackName>,
    finished: bool,
}

impl Unsplitter {
    /// Unsplits the selected stacks.
    ///
    /// If one of them fails, the stacks that were already unsplit are split
    /// again before the error is returned.
    pub fn enter(backend_dir: &Path, selection: StackSelection) -> Result<Unsplitter> {
        let stacks = match &selection {
            StackSelection::Named(stacks) => stacks.clone(),
            StackSelection::All | StackSelection::AllAtEntry => StateDir::find(backend_dir)?,
        };
        let mut unsplit = Vec::with_capacity(stacks.len());
        for stack_name in stacks {
            if let Err(e) = unsplit_stack(backend_dir, &stack_name) {
                for done in &unsplit {
                    if let Err(e) = split_stack(backend_dir, done) {
                        tracing::error!(stack = %done, "could not split stack again: {}", e);
                    }
                }
                return Err(e);
            }
            unsplit.push(stack_name);
        }
        Ok(Unsplitter {
            backend_dir: backend_dir.to_path_buf(),
            selection,
            unsplit,
            finished: false,
        })
    }

    /// The stacks that were unsplit on entry.
    pub fn stacks(&self) -> &[StackName] {
        &self.unsplit
    }

    /// Splits the stacks again.
    ///
    /// Every stack is attempted; the first error is returned.
    pub fn finish(mut self) -> Result<()> {
        self.finished = true;
        self.split_again()
    }

    fn stacks_to_split(&self) -> Result<Vec<StackName>> {
        match &self.selection {
            StackSelection::Named(stacks) => Ok(stacks.clone()),
            StackSelection::All => StateFile::find(&self.backend_dir),
            StackSelection::AllAtEntry => Ok(self.unsplit.clone()),
        }
    }

    fn split_again(&self) -> Result<()> {
        let mut first_error = None;
        for stack_name in self.stacks_to_split()? {
            if let Err(e) = split_stack(&self.backend_dir, &stack_name) {
                tracing::error!(stack = %stack_name, "could not split stack: {}", e);
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            None => Ok(()),
            Some(e) => Err(e),
        }
    }
}

impl Drop for Unsplitter {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        if let Err(e) = self.split_again() {
            tracing::error!("splitting stacks after unsplit scope failed: {}", e);
        }
    }
}

/// Error of an operation run by [`with_unsplit`].
#[derive(Debug, thiserror::Error)]
pub enum ScopeError<E: std::error::Error + 'static> {
    #[error("could not unsplit stacks")]
    Enter(#[source] Error),
    #[error(transparent)]
    Operation(E),
    #[error("could not split stacks again")]
    Exit(#[source] Error),
    #[error("{operation}; additionally, splitting stacks again failed: {exit}")]
    OperationAndExit {
        operation: E,
        #[source]
        exit: Error,
    },
}

/// Runs `f` with the selected stacks unsplit, and splits them again
/// afterwards, whether `f` succeeds or not.
pub fn with_unsplit<T, E, F>(
    backend_dir: &Path,
    selection: StackSelection,
    f: F,
) -> Result<T, ScopeError<E>>
where
    E: std::error::Error + 'static,
    F: FnOnce(&[StackName]) -> Result<T, E>,
{
    let unsplitter = Unsplitter::enter(backend_dir, selection).map_err(ScopeError::Enter)?;
    let result = f(unsplitter.stacks());
    let exit = unsplitter.finish();
    match (result, exit) {
        (Ok(r), Ok(())) => Ok(r),
        (Ok(_), Err(e)) => Err(ScopeError::Exit(e)),
        (Err(e), Ok(())) => Err(ScopeError::Operation(e)),
        (Err(operation), Err(exit)) => Err(ScopeError::OperationAndExit { operation, exit }),
    }
}
