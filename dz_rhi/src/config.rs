//! Process-wide RHI configuration

use std::path::PathBuf;

/// Default register space whose buffers bind at root level (no descriptor table)
pub const DEFAULT_ROOT_LEVEL_BUFFER_REGISTER_SPACE: u32 = 30;

/// Default register space reserved for root constants
pub const DEFAULT_ROOT_CONSTANT_REGISTER_SPACE: u32 = 31;

/// Configuration shared by the shader pipeline, the binding layer and the
/// command lists.
///
/// Read it through [`Engine::configuration`](crate::dz::Engine::configuration).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RhiConfiguration {
    /// Bindings in this space become unindirected root descriptors
    pub root_level_buffer_register_space: u32,
    /// Bindings in this space become inline 32-bit root constants
    pub root_constant_register_space: u32,
    /// Where compiled bytecode and reflection files are cached.
    /// `None` stores them next to the HLSL source.
    pub shader_cache_dir: Option<PathBuf>,
    /// Skip both cache lookup and cache writes when false
    pub enable_shader_cache: bool,
    /// DXC executable
    pub dxc_path: PathBuf,
    /// DXIL to metallib converter executable
    pub metal_converter_path: PathBuf,
    /// Prefer enhanced (batched) barriers when the device supports them
    pub use_enhanced_barriers: bool,
}

impl Default for RhiConfiguration {
    fn default() -> Self {
        Self {
            root_level_buffer_register_space: DEFAULT_ROOT_LEVEL_BUFFER_REGISTER_SPACE,
            root_constant_register_space: DEFAULT_ROOT_CONSTANT_REGISTER_SPACE,
            shader_cache_dir: None,
            enable_shader_cache: true,
            dxc_path: PathBuf::from("dxc"),
            metal_converter_path: PathBuf::from("metal-shaderconverter"),
            use_enhanced_barriers: true,
        }
    }
}

impl RhiConfiguration {
    /// Defaults overridden by `DZ_DXC_PATH`, `DZ_METAL_CONVERTER_PATH`,
    /// `DZ_SHADER_CACHE_DIR` and `DZ_DISABLE_SHADER_CACHE`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable variable source
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(path) = lookup("DZ_DXC_PATH") {
            config.dxc_path = PathBuf::from(path);
        }
        if let Some(path) = lookup("DZ_METAL_CONVERTER_PATH") {
            config.metal_converter_path = PathBuf::from(path);
        }
        if let Some(dir) = lookup("DZ_SHADER_CACHE_DIR") {
            if !dir.is_empty() {
                config.shader_cache_dir = Some(PathBuf::from(dir));
            }
        }
        if let Some(flag) = lookup("DZ_DISABLE_SHADER_CACHE") {
            config.enable_shader_cache = !matches!(flag.as_str(), "1" | "true" | "yes");
        }
        config
    }

    /// Whether `space` is one of the two reserved register spaces
    pub fn is_reserved_space(&self, space: u32) -> bool {
        space == self.root_constant_register_space || space == self.root_level_buffer_register_space
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
