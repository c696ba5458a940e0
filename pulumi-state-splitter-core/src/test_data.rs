//! Shared fixtures for the unit tests.

use std::path::Path;

use serde_json::{json, Value};

use crate::{model::State, stack_name::StackName};

pub(crate) const STACK_URN: &str = "urn:pulumi:test-stack::test-project";
pub(crate) const PROVIDER_ID: &str = "7160bd4d-b7cb-4fdd-acd5-3a173fd01793";

pub(crate) fn stack_name() -> StackName {
    StackName::new("test-project", "test-stack")
}

pub(crate) fn provider_urn() -> String {
    format!("{}::pulumi:providers:command::default_0_9_2", STACK_URN)
}

pub(crate) fn stack_resource_urn() -> String {
    format!("{}::pulumi:pulumi:Stack::test-project-test-stack", STACK_URN)
}

/// A small but realistic state document: a provider, the stack and a
/// command owned by the stack.
pub(crate) fn stack_state() -> Value {
    json!({
        "checkpoint": {
            "latest": {
                "manifest": {
                    "magic": "deadbeef".repeat(8),
                    "time": "1970-01-01T00:12:34.0+00:00",
                    "version": "v3.99.0"
                },
                "resources": [
                    {
                        "created": "1970-01-01T00:12:37.0Z",
                        "custom": true,
                        "id": PROVIDER_ID,
                        "inputs": {"version": "0.9.2"},
                        "modified": "1970-01-01T00:12:38.0Z",
                        "outputs": {"version": "0.9.2"},
                        "type": "pulumi:providers:command",
                        "urn": provider_urn()
                    },
                    {
                        "created": "1970-01-01T00:12:35.0Z",
                        "custom": false,
                        "modified": "1970-01-01T00:12:36.0Z",
                        "outputs": {"test-output": "test string"},
                        "sourcePosition": "project:///.../foo.py#1",
                        "type": "pulumi:pulumi:Stack",
                        "urn": stack_resource_urn()
                    },
                    {
                        "created": "1970-01-01T00:12:39.0Z",
                        "custom": true,
                        "modified": "1970-01-01T00:12:40.0Z",
                        "urn": format!("{}::command:local:Command::true", STACK_URN),
                        "id": "true-15dde2980",
                        "inputs": {"create": "true"},
                        "outputs": {"create": "true", "stderr": "", "stdout": ""},
                        "parent": stack_resource_urn(),
                        "propertyDependencies": {"create": null},
                        "provider": format!("{}::{}", provider_urn(), PROVIDER_ID),
                        "sourcePosition": "project:///.../foo.py#2",
                        "type": "command:local:Command"
                    }
                ],
                "secrets_providers": {
                    "state": {"salt": "v1:foo:v1:bar:baz"},
                    "type": "passphrase"
                }
            },
            "stack": "organization/test-project/test-stack"
        },
        "version": 3
    })
}

pub(crate) fn stack_model() -> State {
    serde_json::from_value(stack_state()).unwrap()
}

/// A state without a snapshot, as created by `pulumi stack init`.
pub(crate) fn trivial_model(stack_name: &StackName) -> State {
    serde_json::from_value(json!({
        "checkpoint": {"stack": format!("organization/{}", stack_name)},
        "version": 3
    }))
    .unwrap()
}

/// Same state, with resources in a canonical order and volatile fields removed.
pub(crate) fn normalized(state: &State) -> State {
    let mut state = state.clone();
    if let Some(latest) = &mut state.checkpoint.latest {
        latest.resources = crate::sort::sorted_resources(&latest.resources)
            .unwrap()
            .iter()
            .map(|r| {
                let mut r = r.without_volatile_fields();
                if r.outputs.as_ref().map_or(false, |o| o.is_empty()) {
                    r.outputs = None;
                }
                r
            })
            .collect();
    }
    state
}

pub(crate) fn write_json(path: &Path, value: &Value) {
    crate::fs::write(path, serde_json::to_string_pretty(value).unwrap().as_bytes()).unwrap();
}
