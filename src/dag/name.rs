// src/dag/name.rs

//! Task names: `resource[:action]`.

use std::fmt;
use std::hash::{Hash, Hasher};

/// Operations a resource can perform. Which ones are valid depends on the
/// resource type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Action {
    Build,
    Pull,
    Push,
    Tag,
    Remove,
    Create,
    Run,
    Up,
    Down,
    Attach,
    Set,
    Capture(String),
}

impl Action {
    /// Parse an action string, accepting the usual aliases. `Ok(None)`
    /// means "use the default action".
    pub fn parse(s: &str) -> Result<Option<Action>, String> {
        let action = match s {
            "" | "default" => return Ok(None),
            "build" => Action::Build,
            "pull" | "download" => Action::Pull,
            "push" | "upload" => Action::Push,
            "tag" => Action::Tag,
            "rm" | "remove" | "delete" => Action::Remove,
            "create" => Action::Create,
            "run" => Action::Run,
            "up" => Action::Up,
            "down" => Action::Down,
            "attach" => Action::Attach,
            "set" => Action::Set,
            other => match capture_variable(other) {
                Some(var) => Action::Capture(var.to_string()),
                None => return Err(format!("invalid action {other:?}")),
            },
        };
        Ok(Some(action))
    }
}

/// `capture(VAR)` where VAR is a word (`[A-Za-z0-9_]+`).
fn capture_variable(s: &str) -> Option<&str> {
    let var = s.strip_prefix("capture(")?.strip_suffix(')')?;
    let is_word = !var.is_empty() && var.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    is_word.then_some(var)
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Build => f.write_str("build"),
            Action::Pull => f.write_str("pull"),
            Action::Push => f.write_str("push"),
            Action::Tag => f.write_str("tag"),
            Action::Remove => f.write_str("rm"),
            Action::Create => f.write_str("create"),
            Action::Run => f.write_str("run"),
            Action::Up => f.write_str("up"),
            Action::Down => f.write_str("down"),
            Action::Attach => f.write_str("attach"),
            Action::Set => f.write_str("set"),
            Action::Capture(var) => write!(f, "capture({var})"),
        }
    }
}

/// A `(resource, action)` pair as named on the command line or in a
/// dependency list.
///
/// Two names are equal when the resources match and either the actions
/// match or both names use the default action. Hashing only covers the
/// resource so it stays consistent with that equality.
#[derive(Debug, Clone, Eq)]
pub struct TaskName {
    resource: String,
    action: Option<Action>,
    is_default: bool,
}

impl TaskName {
    /// Parse `resource` or `resource:action`.
    pub fn parse(s: &str) -> Result<TaskName, String> {
        let (resource, action) = match s.split_once(':') {
            Some((resource, action)) => (resource, action),
            None => (s, ""),
        };
        if resource.is_empty() {
            return Err(format!("invalid task name {s:?}"));
        }
        let action = Action::parse(action)?;
        Ok(TaskName {
            resource: resource.to_string(),
            is_default: action.is_none(),
            action,
        })
    }

    pub fn new(resource: &str, action: Action) -> TaskName {
        TaskName {
            resource: resource.to_string(),
            action: Some(action),
            is_default: false,
        }
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// The explicit or already-resolved action, if any.
    pub fn action(&self) -> Option<&Action> {
        self.action.as_ref()
    }

    pub fn is_default(&self) -> bool {
        self.is_default
    }

    /// Fill in the default action, keeping the "default" marker.
    pub fn with_default(&self, default: Action) -> TaskName {
        TaskName {
            resource: self.resource.clone(),
            action: Some(self.action.clone().unwrap_or(default)),
            is_default: self.is_default,
        }
    }
}

impl PartialEq for TaskName {
    fn eq(&self, other: &Self) -> bool {
        self.resource == other.resource
            && (self.action == other.action || (self.is_default && other.is_default))
    }
}

impl Hash for TaskName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.resource.hash(state);
    }
}

impl fmt::Display for TaskName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.action {
            Some(action) => write!(f, "{}:{}", self.resource, action),
            None => f.write_str(&self.resource),
        }
    }
}
