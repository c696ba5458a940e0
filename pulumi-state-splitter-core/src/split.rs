//! Conversion of stacks between the single file and the split representation.

use std::path::Path;

use crate::{
    error::Result,
    model::State,
    stack_name::StackName,
    state_dir::StateDir,
    state_file::StateFile,
    stored_state::{transfer, StoredState},
};

/// Splits a loaded Pulumi stack state file into multiple files.
pub fn split_state_file(state_file: &StateFile, state: &State) -> Result<StateDir> {
    transfer(state_file, state)
}

/// Merges a loaded split stack state into a single state file.
pub fn unsplit_state_dir(state_dir: &StateDir, state: &State) -> Result<StateFile> {
    transfer(state_dir, state)
}

pub fn split_stack(backend_dir: &Path, stack_name: &StackName) -> Result<StateDir> {
    let _span = tracing::info_span!("split", stack = %stack_name).entered();
    let state_file = StateFile::new(backend_dir, stack_name.clone());
    let state = state_file.load()?;
    split_state_file(&state_file, &state)
}

pub fn unsplit_stack(backend_dir: &Path, stack_name: &StackName) -> Result<StateFile> {
    let _span = tracing::info_span!("unsplit", stack = %stack_name).entered();
    let state_dir = StateDir::new(backend_dir, stack_name.clone());
    let state = state_dir.load()?;
    unsplit_state_dir(&state_dir, &state)
}

/// Splits every stack state file in the backend directory.
pub fn split_all(backend_dir: &Path) -> Result<Vec<StackName>> {
    let stacks = StateFile::find(backend_dir)?;
    for stack_name in &stacks {
        split_stack(backend_dir, stack_name)?;
    }
    Ok(stacks)
}

/// Merges every split stack state in the backend directory.
pub fn unsplit_all(backend_dir: &Path) -> Result<Vec<StackName>> {
    let stacks = StateDir::find(backend_dir)?;
    for stack_name in &stacks {
        unsplit_stack(backend_dir, stack_name)?;
    }
    Ok(stacks)
}
