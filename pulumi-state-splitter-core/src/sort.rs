//! Ordering of resources for a checkpoint.
//!
//! Pulumi rejects a checkpoint in which a resource refers to a resource that
//! appears later in the list. This module computes a deterministic order in
//! which every dependency, provider and parent comes first.

use std::collections::{BTreeMap, HashMap};

use crate::{
    error::{Error, Result},
    model::Resource,
};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

struct Frame<'a> {
    resource: &'a Resource,
    references: Vec<&'a str>,
    next: usize,
}

impl<'a> Frame<'a> {
    fn new(resource: &'a Resource) -> Frame<'a> {
        let mut references = resource.references();
        references.sort_unstable();
        Frame {
            resource,
            references,
            next: 0,
        }
    }

    fn next_reference(&mut self) -> Option<&'a str> {
        let r = self.references.get(self.next).copied();
        self.next += 1;
        r
    }
}

/// Orders resources so that all references point backward.
///
/// Resources are visited depth first in ascending URN order, and so are the
/// references of each resource, which makes the result independent of the
/// input order.
pub fn sorted_resources(resources: &[Resource]) -> Result<Vec<Resource>> {
    let mut by_urn: BTreeMap<&str, &Resource> = BTreeMap::new();
    for r in resources {
        if by_urn.insert(r.urn.as_str(), r).is_some() {
            return Err(Error::DuplicateUrn(r.urn.clone()));
        }
    }

    let mut marks: HashMap<&str, Mark> = HashMap::with_capacity(by_urn.len());
    let mut sorted = Vec::with_capacity(by_urn.len());

    for (&urn, &root) in &by_urn {
        if marks.contains_key(urn) {
            continue;
        }
        marks.insert(urn, Mark::Visiting);
        let mut stack = vec![Frame::new(root)];

        while let Some(frame) = stack.last_mut() {
            let current = frame.resource;
            let Some(reference) = frame.next_reference() else {
                stack.pop();
                marks.insert(current.urn.as_str(), Mark::Done);
                sorted.push(current.clone());
                continue;
            };
            match marks.get(reference) {
                Some(Mark::Done) => {}
                Some(Mark::Visiting) => {
                    let mut cycle: Vec<String> = stack
                        .iter()
                        .map(|f| f.resource.urn.as_str())
                        .skip_while(|u| *u != reference)
                        .map(str::to_owned)
                        .collect();
                    cycle.push(reference.to_owned());
                    return Err(Error::CyclicDependency { cycle });
                }
                None => {
                    let target =
                        by_urn
                            .get(reference)
                            .copied()
                            .ok_or_else(|| Error::DanglingReference {
                                urn: current.urn.clone(),
                                reference: reference.to_owned(),
                            })?;
                    marks.insert(reference, Mark::Visiting);
                    stack.push(Frame::new(target));
                }
            }
        }
    }

    Ok(sorted)
}
