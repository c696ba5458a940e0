//! The split representation: one YAML document per resource, in a directory
//! tree that mirrors resource ownership.
//!
//! ```text
//! {backend}/{project}/{stack}/
//!     state.yaml                                  checkpoint without resources
//!     outputs.yaml                                outputs of the stack resource
//!     pulumi-pulumi-Stack/{stack resource}.yaml
//!     {type}/{name}.yaml                          resources owned by the stack
//!     {type}/{name}/{child type}/{child}.yaml     resources owned by other resources
//! ```

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use serde::Serialize;
use serde_json::{Map, Value};

use crate::{
    error::{Error, Result},
    fs::{files_below, prune_empty_dirs, remove_file, visible_subdirs},
    model::{ResolvedResources, Resource, State},
    sort::sorted_resources,
    stack_name::StackName,
    stored_state::StoredState,
};

const EXTENSION: &str = "yaml";
pub const STATE_FILE_NAME: &str = "state.yaml";
pub const OUTPUTS_FILE_NAME: &str = "outputs.yaml";

/// Determines where a resource is written to, relative to the stack directory.
///
/// Resources owned by the stack, and the stack itself, go into a directory
/// named after their type. Resources owned by another resource go below a
/// directory named after that resource.
pub fn resource_subpath(resources: &ResolvedResources, index: usize) -> PathBuf {
    let mut chain = vec![index];
    let mut current = index;
    while let Some(parent) = resources.parent_index(current) {
        if resources.get(parent).is_stack() {
            break;
        }
        chain.push(parent);
        current = parent;
    }

    let mut path = PathBuf::new();
    for (depth, &i) in chain.iter().rev().enumerate() {
        let resource = resources.get(i);
        path.push(type_dir_name(&resource.type_));
        if depth + 1 == chain.len() {
            path.push(format!("{}.{}", resource.name(), EXTENSION));
        } else {
            path.push(resource.name());
        }
    }
    path
}

/// Colons are not allowed in Windows file names.
fn type_dir_name(type_: &str) -> String {
    type_.replace(':', "-")
}

fn to_yaml(path: &Path, value: &impl Serialize) -> Result<Vec<u8>> {
    serde_yaml::to_string(value)
        .map(String::into_bytes)
        .map_err(|e| Error::schema(path, e))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateDir {
    backend_dir: PathBuf,
    stack_name: StackName,
}

impl StateDir {
    /// The directory holding all files of the stack.
    pub fn dir(&self) -> PathBuf {
        self.backend_dir
            .join(&self.stack_name.project)
            .join(&self.stack_name.stack)
    }

    fn outputs_path(&self) -> PathBuf {
        self.dir().join(OUTPUTS_FILE_NAME)
    }

    fn load_outputs(&self) -> Result<Option<Map<String, Value>>> {
        let path = self.outputs_path();
        if !path.is_file() {
            return Err(Error::corrupt(&path, "stack outputs file is missing"));
        }
        let outputs: Option<Map<String, Value>> =
            serde_yaml::from_slice(&crate::fs::read(&path)?)
                .map_err(|e| Error::corrupt(&path, e))?;
        Ok(outputs.filter(|o| !o.is_empty()))
    }

    fn load_resource(&self, path: &Path) -> Result<Resource> {
        let mut resource: Resource = serde_yaml::from_slice(&crate::fs::read(path)?)
            .map_err(|e| Error::corrupt(path, e))?;
        if resource.is_stack() {
            resource.outputs = self.load_outputs()?;
        }
        Ok(resource)
    }

    /// Checks that every resource gets a file of its own.
    fn check_layout(&self, resources: &ResolvedResources) -> Result<()> {
        let mut seen: HashMap<PathBuf, &str> = HashMap::with_capacity(resources.len());
        let mut stack: Option<&str> = None;
        for (i, r) in resources.iter() {
            if r.is_stack() {
                if let Some(other) = stack.replace(&r.urn) {
                    return Err(Error::schema(
                        self.dir(),
                        format!("more than one stack resource: {} and {}", other, r.urn),
                    ));
                }
            }
            let subpath = resource_subpath(resources, i);
            if let Some(other) = seen.insert(subpath.clone(), &r.urn) {
                return Err(Error::schema(
                    self.dir(),
                    format!(
                        "resources {} and {} would both be stored at {}",
                        other,
                        r.urn,
                        subpath.display()
                    ),
                ));
            }
        }
        Ok(())
    }
}

impl StoredState for StateDir {
    fn new(backend_dir: &Path, stack_name: StackName) -> Self {
        StateDir {
            backend_dir: backend_dir.to_path_buf(),
            stack_name,
        }
    }

    fn find(backend_dir: &Path) -> Result<Vec<StackName>> {
        let mut found = Vec::new();
        for project_dir in visible_subdirs(backend_dir)? {
            for stack_dir in visible_subdirs(&project_dir)? {
                if !stack_dir.join(STATE_FILE_NAME).is_file() {
                    continue;
                }
                let name = |p: &Path| p.file_name().and_then(|n| n.to_str()).map(str::to_owned);
                if let (Some(project), Some(stack)) = (name(&project_dir), name(&stack_dir)) {
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
        self.dir().join(STATE_FILE_NAME)
    }

    fn load(&self) -> Result<State> {
        let state_path = self.path();
        let mut state: State = serde_yaml::from_slice(&crate::fs::read(&state_path)?)
            .map_err(|e| Error::schema(&state_path, e))?;
        if state.checkpoint.latest.is_none() {
            return Ok(state);
        }

        let dir = self.dir();
        let mut resources = Vec::new();
        for path in files_below(&dir)? {
            if path.parent() == Some(dir.as_path()) {
                continue;
            }
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                tracing::warn!(path = %path.display(), "ignoring unexpected file in split state");
                continue;
            }
            resources.push(self.load_resource(&path)?);
        }
        tracing::debug!(
            dir = %dir.display(),
            resources = resources.len(),
            "loaded split state"
        );
        let resources = ResolvedResources::find_parents(&resources)?.into_resources();
        if let Some(latest) = &mut state.checkpoint.latest {
            latest.resources = resources;
        }
        Ok(state)
    }

    fn save(&self, state: &State) -> Result<()> {
        let dir = self.dir();
        let resolved = ResolvedResources::find_parents(state.resources())?;
        self.check_layout(&resolved)?;
        // Dependencies and providers must resolve too, or the tree could not be
        // turned back into a state file.
        sorted_resources(state.resources())?;

        let state_path = self.path();
        let mut header = serde_json::to_value(state).map_err(|e| Error::schema(&state_path, e))?;
        if let Some(latest) = header
            .pointer_mut("/checkpoint/latest")
            .and_then(Value::as_object_mut)
        {
            latest.shift_remove("resources");
        }
        crate::fs::write(&state_path, &to_yaml(&state_path, &header)?)?;

        if state.checkpoint.latest.is_none() {
            return Ok(());
        }
        for (i, resource) in resolved.iter() {
            let mut resource = resource.without_volatile_fields();
            if resource.is_stack() {
                // Outputs are stored once, in their own file.
                let outputs = resource.outputs.take().unwrap_or_default();
                let outputs_path = self.outputs_path();
                crate::fs::write(&outputs_path, &to_yaml(&outputs_path, &outputs)?)?;
            }
            let path = dir.join(resource_subpath(&resolved, i));
            crate::fs::write(&path, &to_yaml(&path, &resource)?)?;
        }
        Ok(())
    }

    fn remove(&self, state: &State) -> Result<()> {
        let dir = self.dir();
        remove_file(&self.path())?;
        let resolved = ResolvedResources::find_parents(state.resources())?;
        for (i, resource) in resolved.iter() {
            if resource.is_stack() {
                remove_file(&self.outputs_path())?;
            }
            let path = dir.join(resource_subpath(&resolved, i));
            remove_file(&path)?;
            if let Some(parent) = path.parent() {
                prune_empty_dirs(parent, &dir)?;
            }
        }
        prune_empty_dirs(&dir, &self.backend_dir)
    }
}
