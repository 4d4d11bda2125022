// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crossbeam_channel::{Receiver, Sender};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};

/// Watches a shader directory and reports which shaders changed.
///
/// Events are collected on notify's thread and drained without blocking by
/// [`ShaderWatcher::poll_changed`].
pub struct ShaderWatcher {
    dir: PathBuf,
    receiver: Receiver<String>,
    // Dropping the watcher stops the notifications.
    _watcher: RecommendedWatcher,
}

impl std::fmt::Debug for ShaderWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShaderWatcher")
            .field("dir", &self.dir)
            .finish_non_exhaustive()
    }
}

impl ShaderWatcher {
    /// Starts watching `dir` (not recursively).
    pub fn new(dir: impl Into<PathBuf>) -> notify::Result<Self> {
        let dir = dir.into();
        let (sender, receiver) = crossbeam_channel::unbounded();
        let mut watcher = notify::recommended_watcher(move |event: notify::Result<notify::Event>| {
            forward_event(event, &sender)
        })?;
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;
        log::info!("Watching shaders in {}", dir.display());
        Ok(Self {
            dir,
            receiver,
            _watcher: watcher,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Names of the shaders modified since the last call, without duplicates.
    pub fn poll_changed(&self) -> Vec<String> {
        let mut changed: Vec<String> = self.receiver.try_iter().collect();
        changed.sort();
        changed.dedup();
        changed
    }
}

fn forward_event(event: notify::Result<notify::Event>, sender: &Sender<String>) {
    let event = match event {
        Ok(event) => event,
        Err(e) => {
            log::warn!("Shader watcher error: {e}");
            return;
        }
    };
    if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
        return;
    }
    for name in event.paths.iter().filter_map(|path| shader_name(path)) {
        log::debug!("Shader '{name}' changed on disk");
        // The receiver only goes away with the watcher itself.
        let _ = sender.send(name);
    }
}

/// The stage name of a `.wgsl` file.
fn shader_name(path: &Path) -> Option<String> {
    if path.extension()? != "wgsl" {
        return None;
    }
    path.file_stem()?.to_str().map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    #[test]
    fn only_wgsl_files_are_shaders() {
        assert_eq!(
            shader_name(Path::new("/shaders/octree_tag_node.wgsl")).as_deref(),
            Some("octree_tag_node")
        );
        assert_eq!(shader_name(Path::new("/shaders/notes.txt")), None);
        assert_eq!(shader_name(Path::new("/shaders/.wgsl.swp")), None);
    }

    #[test]
    fn non_modifying_events_are_ignored() {
        let (sender, receiver) = crossbeam_channel::unbounded();
        let path = PathBuf::from("/shaders/octree_alloc_node.wgsl");
        forward_event(
            Ok(notify::Event::new(EventKind::Access(notify::event::AccessKind::Any))
                .add_path(path.clone())),
            &sender,
        );
        forward_event(
            Ok(notify::Event::new(EventKind::Modify(notify::event::ModifyKind::Any))
                .add_path(path)),
            &sender,
        );
        assert_eq!(receiver.try_iter().collect::<Vec<_>>(), vec!["octree_alloc_node"]);
    }

    #[test]
    fn reports_changed_shader_files() {
        let dir = tempfile::tempdir().unwrap();
        let watcher = ShaderWatcher::new(dir.path()).unwrap();
        std::fs::write(dir.path().join("octree_tag_node.wgsl"), "// edited").unwrap();
        std::fs::write(dir.path().join("readme.md"), "ignored").unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        let mut changed = Vec::new();
        while changed.is_empty() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(20));
            changed = watcher.poll_changed();
        }
        assert_eq!(changed, vec!["octree_tag_node".to_string()]);
    }
}
