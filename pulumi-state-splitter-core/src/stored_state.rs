use std::path::{Path, PathBuf};

use crate::{error::Result, model::State, stack_name::StackName};

/// A stack state stored in a Pulumi `file://` backend directory, in one of
/// the two representations.
pub trait StoredState: Sized {
    fn new(backend_dir: &Path, stack_name: StackName) -> Self;

    /// Finds all stacks stored in this representation.
    fn find(backend_dir: &Path) -> Result<Vec<StackName>>;

    fn backend_dir(&self) -> &Path;

    fn stack_name(&self) -> &StackName;

    /// Main location of the state, for messages.
    fn path(&self) -> PathBuf;

    fn load(&self) -> Result<State>;

    fn save(&self, state: &State) -> Result<()>;

    /// Removes the files of `state`, which must be what [`StoredState::load`] returned.
    fn remove(&self, state: &State) -> Result<()>;
}

/// Moves a loaded state to another representation.
///
/// The target is written completely before anything of the source is
/// removed, so an interruption leaves at least one complete copy behind.
pub fn transfer<S: StoredState, T: StoredState>(source: &S, state: &State) -> Result<T> {
    let target = T::new(source.backend_dir(), source.stack_name().clone());
    target.save(state)?;
    source.remove(state)?;
    Ok(target)
}

