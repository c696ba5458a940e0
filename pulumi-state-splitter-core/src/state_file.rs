//! The single-document representation: the stack state file that Pulumi
//! itself reads and writes, `.pulumi/stacks/{project}/{stack}.json`.

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::Serialize as _;

use crate::{
    error::{Error, Result},
    fs::{prune_empty_dirs, remove_file, visible_subdirs},
    model::{ResolvedResources, State},
    sort::sorted_resources,
    stack_name::StackName,
    stored_state::StoredState,
};

const EXTENSION: &str = "json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateFile {
    backend_dir: PathBuf,
    stack_name: StackName,
}

impl StateFile {
    pub fn stacks_dir(backend_dir: &Path) -> PathBuf {
        backend_dir.join(".pulumi").join("stacks")
    }

    /// Encodes a state the way Pulumi does: four space indentation,
    /// resources ordered so that references point backward.
    pub fn encode(state: &State) -> Result<Vec<u8>> {
        let mut state = state.clone();
        if let Some(latest) = &mut state.checkpoint.latest {
            latest.resources = sorted_resources(&latest.resources)?
                .iter()
                .map(|r| r.without_volatile_fields())
                .collect();
        }
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        state
            .serialize(&mut serializer)
            .map_err(|e| Error::schema("<encoding>", e))?;
        buf.push(b'\n');
        Ok(buf)
    }
}

impl StoredState for StateFile {
    fn new(backend_dir: &Path, stack_name: StackName) -> Self {
        StateFile {
            backend_dir: backend_dir.to_path_buf(),
            stack_name,
        }
    }

    fn find(backend_dir: &Path) -> Result<Vec<StackName>> {
        let mut found = Vec::new();
        for project_dir in visible_subdirs(&Self::stacks_dir(backend_dir))? {
            let Some(project) = project_dir.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            for entry in fs::read_dir(&project_dir).map_err(|e| Error::fs(&project_dir, e))? {
                let path = entry.map_err(|e| Error::fs(&project_dir, e))?.path();
                if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some(EXTENSION)
                {
                    continue;
                }
                if let Some(stack) = path.file_stem().and_then(|s| s.to_str()) {
                    found.push(StackName::new(project, stack));
                }
            }
        }
        found.sort();
        Ok(found)
    }

    fn backend_dir(&self) -> &Path {
        &self.backend_dir
    }

    fn stack_name(&self) -> &StackName {
        &self.stack_name
    }

    fn path(&self) -> PathBuf {
        Self::stacks_dir(&self.backend_dir)
            .join(&self.stack_name.project)
            .join(format!("{}.{}", self.stack_name.stack, EXTENSION))
    }

    fn load(&self) -> Result<State> {
        let path = self.path();
        let bytes = crate::fs::read(&path)?;
        let state: State =
            serde_json::from_slice(&bytes).map_err(|e| Error::schema(&path, e))?;
        ResolvedResources::find_parents(state.resources())?;
        tracing::debug!(
            path = %path.display(),
            resources = state.resources().len(),
            "loaded state file"
        );
        Ok(state)
    }

    fn save(&self, state: &State) -> Result<()> {
        crate::fs::write(&self.path(), &Self::encode(state)?)
    }

    fn remove(&self, _state: &State) -> Result<()> {
        let path = self.path();
        remove_file(&path)?;
        if let Some(parent) = path.parent() {
            prune_empty_dirs(parent, &self.backend_dir)?;
        }
        Ok(())
    }
}
