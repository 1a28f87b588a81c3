// src/dag/stack.rs

//! LIFO stack of task names used to detect dependency cycles.

use crate::dag::name::TaskName;

#[derive(Debug, Default, Clone)]
pub struct Stack {
    items: Vec<TaskName>,
}

impl Stack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: TaskName) {
        self.items.push(name);
    }

    pub fn pop(&mut self) -> Option<TaskName> {
        self.items.pop()
    }

    /// Uses `TaskName` equality, so a default action matches another
    /// default for the same resource.
    pub fn contains(&self, name: &TaskName) -> bool {
        self.items.iter().any(|item| item == name)
    }

    /// Names from the bottom of the stack to the top.
    pub fn names(&self) -> Vec<String> {
        self.items.iter().map(ToString::to_string).collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
