// src/commands/list.rs

//! `dobi list`.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::config::{Config, Resource};

/// Which resources to show and how.
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    /// Include resources without a description.
    pub all: bool,
    /// Keep only resources carrying one of these tags.
    pub tags: Vec<String>,
    /// One heading per annotation group.
    pub group: bool,
}

fn included(resource: &Resource, opts: &ListOptions) -> bool {
    let annotations = resource.annotations();
    if !opts.all && annotations.description.is_empty() {
        return false;
    }
    opts.tags.is_empty() || annotations.tags.iter().any(|t| opts.tags.contains(t))
}

fn line(out: &mut String, name: &str, resource: &Resource) {
    let _ = writeln!(out, "  {name:<20} {resource}");
}

pub fn render(config: &Config, opts: &ListOptions) -> String {
    let mut out = String::new();
    let visible = config
        .resources
        .iter()
        .filter(|(_, resource)| included(resource, opts));

    if !opts.group {
        for (name, resource) in visible {
            line(&mut out, name, resource);
        }
        return out;
    }

    let mut groups: BTreeMap<&str, Vec<(&String, &Resource)>> = BTreeMap::new();
    for (name, resource) in visible {
        let group = resource.annotations().group.as_str();
        groups.entry(group).or_default().push((name, resource));
    }
    for (index, (group, members)) in groups.iter().enumerate() {
        if index > 0 {
            out.push('\n');
        }
        let heading = if group.is_empty() { "Other" } else { group };
        let _ = writeln!(out, "{heading}:");
        for (name, resource) in members {
            line(&mut out, name, resource);
        }
    }
    out
}
