/// On-disk shader cache
///
/// Each entry is two files: `<stem>-<entry>.<ext>` with the bytecode and
/// `<stem>-<entry>.reflection` with the serialized reflection. An entry is
/// only a hit when both files load; anything less is a miss.

use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use rustc_hash::FxHasher;
use crate::error::Result;
use crate::shader::reflection::ShaderReflectionData;
use crate::shader::shader_data::TargetIL;

const REFLECTION_EXTENSION: &str = "reflection";

#[derive(Debug, Clone, Default)]
pub struct ShaderCache {
    directory: Option<PathBuf>,
}

impl ShaderCache {
    /// `None` keeps cache files next to the HLSL source
    pub fn new(directory: Option<PathBuf>) -> Self {
        Self { directory }
    }

    pub fn directory(&self) -> Option<&Path> {
        self.directory.as_deref()
    }

    fn cache_path(&self, source: &Path, entry_point: &str, extension: &str) -> PathBuf {
        let stem = source.file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        match &self.directory {
            None => source.with_file_name(format!("{}-{}.{}", stem, entry_point, extension)),
            Some(directory) => {
                // Sources from different folders share one directory
                let normalized = std::fs::canonicalize(source).unwrap_or_else(|_| source.to_path_buf());
                let mut hasher = FxHasher::default();
                normalized.hash(&mut hasher);
                directory.join(format!("{}-{:08x}-{}.{}", stem, hasher.finish() as u32, entry_point, extension))
            }
        }
    }

    pub fn bytecode_path(&self, source: &Path, entry_point: &str, target_il: TargetIL) -> PathBuf {
        self.cache_path(source, entry_point, target_il.extension())
    }

    pub fn reflection_path(&self, source: &Path, entry_point: &str) -> PathBuf {
        self.cache_path(source, entry_point, REFLECTION_EXTENSION)
    }

    /// Cached bytecode and reflection, or `None` on any kind of miss
    pub fn load(&self, source: &Path, entry_point: &str, target_il: TargetIL) -> Option<(Vec<u8>, ShaderReflectionData)> {
        let bytecode_path = self.bytecode_path(source, entry_point, target_il);
        let reflection_path = self.reflection_path(source, entry_point);

        let bytecode = std::fs::read(&bytecode_path).ok()?;
        if bytecode.is_empty() {
            crate::engine_warn!("dz::ShaderCache", "Empty cache entry {}, recompiling", bytecode_path.display());
            return None;
        }

        let blob = match std::fs::read(&reflection_path) {
            Ok(blob) => blob,
            Err(_) => {
                crate::engine_debug!("dz::ShaderCache",
                    "{} has no reflection file, treating as a miss", bytecode_path.display());
                return None;
            }
        };

        match ShaderReflectionData::from_blob(&blob) {
            Ok(reflection) => {
                crate::engine_debug!("dz::ShaderCache", "Cache hit {}", bytecode_path.display());
                Some((bytecode, reflection))
            }
            Err(e) => {
                crate::engine_warn!("dz::ShaderCache", "{} ({}), recompiling", e, reflection_path.display());
                None
            }
        }
    }

    /// Writes both files of an entry
    pub fn store(
        &self,
        source: &Path,
        entry_point: &str,
        target_il: TargetIL,
        bytecode: &[u8],
        reflection: &ShaderReflectionData,
    ) -> Result<()> {
        if let Some(directory) = &self.directory {
            std::fs::create_dir_all(directory)?;
        }
        let blob = reflection.to_blob()?;
        std::fs::write(self.bytecode_path(source, entry_point, target_il), bytecode)?;
        std::fs::write(self.reflection_path(source, entry_point), blob)?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod tests;
