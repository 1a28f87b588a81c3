// src/fs/mock.rs

//! In-memory [`FileSystem`] with a logical clock.
//!
//! Every mutation stamps the touched entry with the next tick of the clock,
//! so "written later" always means "newer mtime". Tests can also pin an
//! explicit mtime with [`MockFileSystem::set_modified`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, SystemTime};

use anyhow::{anyhow, Result};

use super::FileSystem;

#[derive(Debug, Clone)]
pub enum MockEntry {
    File {
        content: Vec<u8>,
        modified: SystemTime,
    },
    Dir {
        children: Vec<String>,
        modified: SystemTime,
    },
}

impl MockEntry {
    fn modified(&self) -> SystemTime {
        match self {
            MockEntry::File { modified, .. } | MockEntry::Dir { modified, .. } => *modified,
        }
    }
}

#[derive(Debug, Default)]
struct MockState {
    entries: HashMap<PathBuf, MockEntry>,
    clock: u64,
}

impl MockState {
    fn tick(&mut self) -> SystemTime {
        self.clock += 1;
        base_time() + Duration::from_secs(self.clock)
    }
}

/// Starting point of the logical clock.
pub fn base_time() -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(1_600_000_000)
}

#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    state: Arc<Mutex<MockState>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        let fs = Self::default();
        {
            let mut state = fs.lock();
            let now = state.tick();
            state.entries.insert(
                PathBuf::from("/"),
                MockEntry::Dir {
                    children: Vec::new(),
                    modified: now,
                },
            );
        }
        fs
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        // A poisoned lock only happens after a panicking test thread.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let path = path.as_ref().to_path_buf();
        let mut state = self.lock();
        let now = state.tick();
        state.entries.insert(
            path.clone(),
            MockEntry::File {
                content: content.into(),
                modified: now,
            },
        );
        link_to_parent(&mut state, &path, now);
    }

    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let path = path.as_ref().to_path_buf();
        let mut state = self.lock();
        let now = state.tick();
        ensure_dir_entry(&mut state, &path, now);
    }

    /// Pin the mtime of an existing entry.
    pub fn set_modified(&self, path: impl AsRef<Path>, time: SystemTime) {
        let mut state = self.lock();
        if let Some(entry) = state.entries.get_mut(path.as_ref()) {
            match entry {
                MockEntry::File { modified, .. } | MockEntry::Dir { modified, .. } => {
                    *modified = time
                }
            }
        }
    }

    /// Current value of the logical clock.
    pub fn now(&self) -> SystemTime {
        base_time() + Duration::from_secs(self.lock().clock)
    }
}

fn parent_of(path: &Path) -> Option<&Path> {
    match path.parent() {
        Some(parent) if parent.as_os_str().is_empty() => Some(Path::new(".")),
        other => other,
    }
}

fn link_to_parent(state: &mut MockState, path: &Path, now: SystemTime) {
    let Some(parent) = parent_of(path) else {
        return;
    };
    if parent == path {
        return;
    }
    ensure_dir_entry(state, parent, now);
    if let Some(MockEntry::Dir { children, .. }) = state.entries.get_mut(parent) {
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            if !children.iter().any(|c| c == name) {
                children.push(name.to_string());
            }
        }
    }
}

fn ensure_dir_entry(state: &mut MockState, path: &Path, now: SystemTime) {
    if state.entries.contains_key(path) {
        return;
    }
    state.entries.insert(
        path.to_path_buf(),
        MockEntry::Dir {
            children: Vec::new(),
            modified: now,
        },
    );
    link_to_parent(state, path, now);
}

impl FileSystem for MockFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        let state = self.lock();
        match state.entries.get(path) {
            Some(MockEntry::File { content, .. }) => {
                String::from_utf8(content.clone()).map_err(|e| anyhow!("Invalid UTF-8: {}", e))
            }
            Some(MockEntry::Dir { .. }) => Err(anyhow!("Is a directory: {:?}", path)),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        self.add_file(path, contents);
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        let mut state = self.lock();
        let entry = state
            .entries
            .remove(from)
            .ok_or_else(|| anyhow!("File not found: {:?}", from))?;
        if let Some(parent) = parent_of(from) {
            if let Some(MockEntry::Dir { children, .. }) = state.entries.get_mut(parent) {
                let name = from.file_name().and_then(|n| n.to_str()).unwrap_or_default();
                children.retain(|c| c != name);
            }
        }
        let now = entry.modified();
        state.entries.insert(to.to_path_buf(), entry);
        link_to_parent(&mut state, to, now);
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.lock().entries.contains_key(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        matches!(self.lock().entries.get(path), Some(MockEntry::File { .. }))
    }

    fn is_dir(&self, path: &Path) -> bool {
        matches!(self.lock().entries.get(path), Some(MockEntry::Dir { .. }))
    }

    fn modified(&self, path: &Path) -> Result<SystemTime> {
        self.lock()
            .entries
            .get(path)
            .map(MockEntry::modified)
            .ok_or_else(|| anyhow!("File not found: {:?}", path))
    }

    fn create_dir_all(&self, path: &Path, _mode: u32) -> Result<()> {
        self.add_dir(path);
        Ok(())
    }

    fn create_file(&self, path: &Path, _mode: u32) -> Result<()> {
        if !self.exists(path) {
            self.add_file(path, Vec::new());
        }
        Ok(())
    }

    fn remove_all(&self, path: &Path) -> Result<()> {
        let mut state = self.lock();
        state.entries.retain(|p, _| !p.starts_with(path));
        if let Some(parent) = parent_of(path) {
            if let Some(MockEntry::Dir { children, .. }) = state.entries.get_mut(parent) {
                let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
                children.retain(|c| c != name);
            }
        }
        Ok(())
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let state = self.lock();
        match state.entries.get(path) {
            Some(MockEntry::Dir { children, .. }) => {
                let mut entries: Vec<PathBuf> =
                    children.iter().map(|name| path.join(name)).collect();
                entries.sort();
                Ok(entries)
            }
            _ => Err(anyhow!("Not a directory or not found: {:?}", path)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_writes_are_newer() {
        let fs = MockFileSystem::new();
        fs.add_file("/work/a.txt", "a");
        fs.add_file("/work/b.txt", "b");

        let a = fs.modified(Path::new("/work/a.txt")).unwrap();
        let b = fs.modified(Path::new("/work/b.txt")).unwrap();
        assert!(b > a);
        assert!(fs.is_dir(Path::new("/work")));
        assert_eq!(
            fs.read_dir(Path::new("/work")).unwrap(),
            vec![PathBuf::from("/work/a.txt"), PathBuf::from("/work/b.txt")]
        );
    }

    #[test]
    fn rename_and_remove() {
        let fs = MockFileSystem::new();
        fs.add_file("/work/.tmp", "x");
        fs.rename(Path::new("/work/.tmp"), Path::new("/work/final")).unwrap();
        assert!(!fs.exists(Path::new("/work/.tmp")));
        assert_eq!(fs.read_to_string(Path::new("/work/final")).unwrap(), "x");

        fs.add_file("/work/dist/out", "bin");
        fs.remove_all(Path::new("/work/dist")).unwrap();
        assert!(!fs.exists(Path::new("/work/dist/out")));
        assert!(!fs.read_dir(Path::new("/work")).unwrap().contains(&PathBuf::from("/work/dist")));
    }
}
