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

use std::borrow::Cow;
use std::path::{Path, PathBuf};
use sylva_core::renderer::{ShaderError, ShaderSource};

/// Loads `<name>.wgsl` from a directory on every request.
#[derive(Debug, Clone)]
pub struct DirectoryShaderSource {
    dir: PathBuf,
}

impl DirectoryShaderSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The file the shader called `name` is read from.
    pub fn path_of(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.wgsl"))
    }
}

impl ShaderSource for DirectoryShaderSource {
    fn load(&self, name: &str) -> Result<Cow<'static, str>, ShaderError> {
        let path = self.path_of(name);
        let source = std::fs::read_to_string(&path).map_err(|e| ShaderError::LoadError {
            path: path.display().to_string(),
            source_error: e.to_string(),
        })?;
        log::trace!("Loaded shader '{name}' from {}", path.display());
        Ok(Cow::Owned(source))
    }

    fn origin(&self) -> String {
        format!("directory '{}'", self.dir.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_named_files_and_reports_missing_ones() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("octree_init_node.wgsl"),
            "@compute @workgroup_size(64) fn main() {}",
        )
        .unwrap();
        let source = DirectoryShaderSource::new(dir.path());

        let wgsl = source.load("octree_init_node").unwrap();
        assert!(wgsl.contains("@workgroup_size(64)"));
        assert!(source.origin().contains(&dir.path().display().to_string()));

        match source.load("octree_tag_node") {
            Err(ShaderError::LoadError { path, .. }) => {
                assert!(path.ends_with("octree_tag_node.wgsl"));
            }
            other => panic!("expected a load error, got {other:?}"),
        }
    }
}
