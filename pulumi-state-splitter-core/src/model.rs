//! Model of a Pulumi stack state, as stored by the `file://` backend.
//!
//! Only the fields that the splitter needs are modelled. Everything else is
//! kept in `other_fields` and written back unchanged.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Type of the resource representing the stack itself.
pub const STACK_TYPE: &str = "pulumi:pulumi:Stack";

/// The only checkpoint version we know how to handle.
pub const STATE_VERSION: u64 = 3;

/// Resource fields that are not written to disk.
///
/// `sourcePosition` is a position in the SDK rather than in the Pulumi program.
/// It differs between environments (e.g. CI vs local) and would show up as
/// noise in every diff.
pub const VOLATILE_FIELDS: &[&str] = &["sourcePosition"];

fn version_is_supported<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let v: u64 = Deserialize::deserialize(deserializer)?;
    if v == STATE_VERSION {
        Ok(v)
    } else {
        Err(serde::de::Error::custom(format!(
            "unsupported state version: expected {}, got {}",
            STATE_VERSION, v
        )))
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn is_blank(s: &Option<String>) -> bool {
    s.as_deref().map_or(true, str::is_empty)
}

fn is_empty_map(m: &Option<Map<String, Value>>) -> bool {
    m.as_ref().map_or(true, Map::is_empty)
}

/// The root of a state document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct State {
    pub checkpoint: Checkpoint,
    #[serde(deserialize_with = "version_is_supported")]
    pub version: u64,
    #[serde(flatten)]
    pub other_fields: Map<String, Value>,
}

impl State {
    pub fn resources(&self) -> &[Resource] {
        match &self.checkpoint.latest {
            Some(latest) => &latest.resources,
            None => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Fully qualified stack name, `[organization/]project/stack`
    pub stack: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest: Option<Latest>,
    #[serde(flatten)]
    pub other_fields: Map<String, Value>,
}

/// The most recent snapshot of a stack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Latest {
    #[serde(default, deserialize_with = "null_as_default")]
    pub resources: Vec<Resource>,
    /// `manifest`, `secrets_providers` and the like, kept verbatim.
    #[serde(flatten)]
    pub other_fields: Map<String, Value>,
}

/// A single resource of a stack snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub urn: String,
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(default, skip_serializing_if = "is_blank")]
    pub parent: Option<String>,
    /// Provider reference, `{provider urn}::{provider id}`
    #[serde(default, skip_serializing_if = "is_blank")]
    pub provider: Option<String>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub dependencies: Vec<String>,
    /// Only meaningful for the stack resource.
    #[serde(default, skip_serializing_if = "is_empty_map")]
    pub outputs: Option<Map<String, Value>>,
    #[serde(flatten)]
    pub other_fields: Map<String, Value>,
}

impl Resource {
    pub fn new(type_: impl Into<String>, urn: impl Into<String>) -> Resource {
        Resource {
            urn: urn.into(),
            type_: type_.into(),
            parent: None,
            provider: None,
            dependencies: Vec::new(),
            outputs: None,
            other_fields: Map::new(),
        }
    }

    /// Pulumi name of the resource: the last `::` separated segment of the URN.
    pub fn name(&self) -> &str {
        self.urn.rsplit("::").next().unwrap_or(&self.urn)
    }

    pub fn is_stack(&self) -> bool {
        self.type_ == STACK_TYPE
    }

    pub fn parent_urn(&self) -> Option<&str> {
        self.parent.as_deref().filter(|p| !p.is_empty())
    }

    /// URN of the provider resource, without the trailing `::{id}`.
    pub fn provider_urn(&self) -> Option<&str> {
        let provider = self.provider.as_deref().filter(|p| !p.is_empty())?;
        Some(provider.rsplit_once("::").map_or(provider, |(urn, _id)| urn))
    }

    /// All URNs that must precede this resource in a checkpoint: explicit
    /// dependencies, the provider and the parent.
    pub fn references(&self) -> Vec<&str> {
        let mut refs: Vec<&str> = self.dependencies.iter().map(String::as_str).collect();
        refs.extend(self.provider_urn());
        refs.extend(self.parent_urn());
        refs
    }

    /// A copy with [`VOLATILE_FIELDS`] removed, as it should be written to disk.
    pub fn without_volatile_fields(&self) -> Resource {
        let mut r = self.clone();
        for field in VOLATILE_FIELDS {
            r.other_fields.shift_remove(*field);
        }
        r
    }
}

/// Resources together with their resolved parent links.
///
/// Parents are stored as indices into the owned resource list, so the
/// structure can be moved and cloned freely.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedResources {
    resources: Vec<Resource>,
    parents: Vec<Option<usize>>,
}

impl ResolvedResources {
    /// Finds parenthood relationships between resources.
    ///
    /// The resources are copied, so the input can be reused. Fails if a parent
    /// is missing, a URN occurs twice, or the parent links form a cycle.
    pub fn find_parents<'a>(
        resources: impl IntoIterator<Item = &'a Resource>,
    ) -> Result<ResolvedResources> {
        let resources: Vec<Resource> = resources.into_iter().cloned().collect();
        let mut by_urn: HashMap<&str, usize> = HashMap::with_capacity(resources.len());
        for (i, r) in resources.iter().enumerate() {
            if by_urn.insert(r.urn.as_str(), i).is_some() {
                return Err(Error::DuplicateUrn(r.urn.clone()));
            }
        }
        let parents = resources
            .iter()
            .map(|r| match r.parent_urn() {
                None => Ok(None),
                Some(parent) => by_urn.get(parent).map(|i| Some(*i)).ok_or_else(|| {
                    Error::DanglingReference {
                        urn: r.urn.clone(),
                        reference: parent.to_owned(),
                    }
                }),
            })
            .collect::<Result<Vec<_>>>()?;
        let resolved = ResolvedResources { resources, parents };
        resolved.check_acyclic()?;
        Ok(resolved)
    }

    fn check_acyclic(&self) -> Result<()> {
        let mut done = vec![false; self.resources.len()];
        for start in 0..self.resources.len() {
            // index -> position on the chain currently being walked
            let mut chain: BTreeMap<usize, usize> = BTreeMap::new();
            let mut order = Vec::new();
            let mut current = Some(start);
            while let Some(i) = current {
                if done[i] {
                    break;
                }
                if let Some(pos) = chain.get(&i) {
                    let mut cycle: Vec<String> = order[*pos..]
                        .iter()
                        .map(|j: &usize| self.resources[*j].urn.clone())
                        .collect();
                    cycle.push(self.resources[i].urn.clone());
                    return Err(Error::CyclicDependency { cycle });
                }
                chain.insert(i, order.len());
                order.push(i);
                current = self.parents[i];
            }
            for i in order {
                done[i] = true;
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn get(&self, index: usize) -> &Resource {
        &self.resources[index]
    }

    pub fn parent_index(&self, index: usize) -> Option<usize> {
        self.parents[index]
    }

    pub fn parent(&self, index: usize) -> Option<&Resource> {
        self.parents[index].map(|p| &self.resources[p])
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &Resource)> {
        self.resources.iter().enumerate()
    }

    pub fn into_resources(self) -> Vec<Resource> {
        self.resources
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn stack_state() -> Value {
        json!({
            "checkpoint": {
                "latest": {
                    "manifest": {"magic": "deadbeef", "version": "v3.99.0"},
                    "resources": [
                        {
                            "custom": false,
                            "outputs": {"test-output": "test string"},
                            "sourcePosition": "project:///.../foo.py#1",
                            "type": "pulumi:pulumi:Stack",
                            "urn": "urn:pulumi:test-stack::test-project::pulumi:pulumi:Stack::test-project-test-stack"
                        },
                        {
                            "custom": true,
                            "id": "true-15dde2980",
                            "parent": "urn:pulumi:test-stack::test-project::pulumi:pulumi:Stack::test-project-test-stack",
                            "propertyDependencies": {"create": null},
                            "type": "command:local:Command",
                            "urn": "urn:pulumi:test-stack::test-project::command:local:Command::true"
                        }
                    ],
                    "secrets_providers": {"type": "passphrase"}
                },
                "stack": "organization/test-project/test-stack"
            },
            "version": 3
        })
    }

    #[test]
    fn test_parse_state() {
        let state: State = serde_json::from_value(stack_state()).unwrap();
        assert_eq!(state.version, 3);
        assert_eq!(state.checkpoint.stack, "organization/test-project/test-stack");
        let resources = state.resources();
        assert_eq!(resources.len(), 2);
        assert!(resources[0].is_stack());
        assert_eq!(resources[0].name(), "test-project-test-stack");
        assert_eq!(resources[1].name(), "true");
        assert_eq!(
            resources[1].other_fields.get("propertyDependencies"),
            Some(&json!({"create": null}))
        );
    }

    #[test]
    fn test_latest_keeps_null_fields() {
        let value = json!({
            "checkpoint": {
                "latest": {"manifest": null, "resources": [], "secrets_providers": null},
                "stack": "organization/test-project/test-stack"
            },
            "version": 3
        });
        let state: State = serde_json::from_value(value.clone()).unwrap();
        assert_eq!(serde_json::to_value(&state).unwrap(), value);
    }

    #[test]
    fn test_state_preserves_unknown_fields() {
        let state: State = serde_json::from_value(stack_state()).unwrap();
        let value = serde_json::to_value(&state).unwrap();
        assert_eq!(value, stack_state());
    }

    #[test]
    fn test_unsupported_version() {
        let mut value = stack_state();
        value["version"] = json!(4);
        let err = serde_json::from_value::<State>(value).unwrap_err();
        assert!(err.to_string().contains("unsupported state version"));
    }

    #[test]
    fn test_missing_type() {
        let r = serde_json::from_value::<Resource>(json!({"urn": "a"}));
        assert!(r.is_err());
    }

    #[test]
    fn test_falsy_fields_omitted() {
        let r: Resource = serde_json::from_value(json!({
            "urn": "a",
            "type": "foo",
            "dependencies": null,
            "parent": "",
            "provider": null,
            "outputs": {},
            "custom": false
        }))
        .unwrap();
        assert!(r.dependencies.is_empty());
        assert_eq!(r.parent_urn(), None);
        assert_eq!(
            serde_json::to_value(&r).unwrap(),
            json!({"urn": "a", "type": "foo", "custom": false})
        );
    }

    #[test]
    fn test_provider_urn() {
        let mut r = Resource::new("foo", "a");
        r.provider = Some("urn:pulumi:s::p::pulumi:providers:aws::default::0123-abcd".to_owned());
        assert_eq!(
            r.provider_urn(),
            Some("urn:pulumi:s::p::pulumi:providers:aws::default")
        );
    }

    #[test]
    fn test_references() {
        let mut r = Resource::new("foo", "a");
        r.dependencies = vec!["b".to_owned()];
        r.provider = Some("p::id".to_owned());
        r.parent = Some("c".to_owned());
        assert_eq!(r.references(), vec!["b", "p", "c"]);
    }

    #[test]
    fn test_without_volatile_fields() {
        let r: Resource = serde_json::from_value(json!({
            "urn": "a",
            "type": "foo",
            "sourcePosition": "project:///foo.py#1",
            "id": "x"
        }))
        .unwrap();
        let stripped = r.without_volatile_fields();
        assert!(!stripped.other_fields.contains_key("sourcePosition"));
        assert_eq!(stripped.other_fields.get("id"), Some(&json!("x")));
        // the original is left alone
        assert!(r.other_fields.contains_key("sourcePosition"));
    }

    #[test]
    fn test_find_parents() {
        let parent = Resource::new("foo", "parent");
        let mut child = Resource::new("bar", "child");
        child.parent = Some("parent".to_owned());
        let input = vec![child, parent];
        let resolved = ResolvedResources::find_parents(&input).unwrap();
        assert_eq!(resolved.parent(0).map(|r| r.urn.as_str()), Some("parent"));
        assert_eq!(resolved.parent(1), None);
        // input is untouched
        assert_eq!(input.len(), 2);
        assert_eq!(resolved.into_resources(), input);
    }

    #[test]
    fn test_find_parents_dangling() {
        let mut child = Resource::new("bar", "child");
        child.parent = Some("missing".to_owned());
        let err = ResolvedResources::find_parents(&[child]).unwrap_err();
        assert!(matches!(
            err,
            Error::DanglingReference { ref urn, ref reference } if urn == "child" && reference == "missing"
        ));
    }

    #[test]
    fn test_find_parents_cycle() {
        let mut a = Resource::new("foo", "a");
        a.parent = Some("b".to_owned());
        let mut b = Resource::new("foo", "b");
        b.parent = Some("a".to_owned());
        let err = ResolvedResources::find_parents(&[a, b]).unwrap_err();
        assert!(matches!(err, Error::CyclicDependency { .. }));
    }

    #[test]
    fn test_find_parents_duplicate() {
        let a = Resource::new("foo", "a");
        let err = ResolvedResources::find_parents(&[a.clone(), a]).unwrap_err();
        assert!(matches!(err, Error::DuplicateUrn(ref urn) if urn == "a"));
    }
}
