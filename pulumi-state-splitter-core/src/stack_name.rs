use std::{fmt, str::FromStr};

use crate::error::Error;

/// A stack, identified by project and stack name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StackName {
    pub project: String,
    pub stack: String,
}

impl StackName {
    pub fn new(project: impl Into<String>, stack: impl Into<String>) -> StackName {
        StackName {
            project: project.into(),
            stack: stack.into(),
        }
    }

    /// Parses `project/stack` or `organization/project/stack`.
    ///
    /// The `file://` backend only knows the literal `organization`, so any
    /// other organization is rejected.
    pub fn from_path(path: &str) -> Result<StackName, Error> {
        let mut pieces: Vec<&str> = path.split('/').collect();
        if pieces.len() == 3 && pieces[0] == "organization" {
            pieces.remove(0);
        }
        match pieces.as_slice() {
            [project, stack] if !project.is_empty() && !stack.is_empty() => {
                Ok(StackName::new(*project, *stack))
            }
            _ => Err(Error::InvalidStackName(path.to_owned())),
        }
    }
}

impl FromStr for StackName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StackName::from_path(s)
    }
}

impl fmt::Display for StackName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.project, self.stack)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_path() {
        assert_eq!(
            StackName::from_path("proj/stack").unwrap(),
            StackName::new("proj", "stack")
        );
    }

    #[test]
    fn test_from_path_organization() {
        assert_eq!(
            StackName::from_path("organization/proj/stack").unwrap(),
            StackName::from_path("proj/stack").unwrap()
        );
    }

    #[test]
    fn test_from_path_other_organization() {
        assert!(matches!(
            StackName::from_path("acme/proj/stack"),
            Err(Error::InvalidStackName(_))
        ));
    }

    #[test]
    fn test_from_path_wrong_length() {
        for path in ["stack", "a/b/c/d", "", "proj/"] {
            assert!(StackName::from_path(path).is_err(), "{}", path);
        }
    }

    #[test]
    fn test_display() {
        let name: StackName = "organization/proj/stack".parse().unwrap();
        assert_eq!(name.to_string(), "proj/stack");
    }
}
