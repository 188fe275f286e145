//! Unit tests for config.rs

use crate::config::RhiConfiguration;
use std::collections::HashMap;
use std::path::PathBuf;

fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn test_default_reserved_spaces() {
    let config = RhiConfiguration::default();
    assert_eq!(config.root_level_buffer_register_space, 30);
    assert_eq!(config.root_constant_register_space, 31);
    assert!(config.is_reserved_space(30));
    assert!(config.is_reserved_space(31));
    assert!(!config.is_reserved_space(0));
}

#[test]
fn test_default_tools_and_cache() {
    let config = RhiConfiguration::default();
    assert_eq!(config.dxc_path, PathBuf::from("dxc"));
    assert!(config.enable_shader_cache);
    assert!(config.shader_cache_dir.is_none());
    assert!(config.use_enhanced_barriers);
}

#[test]
fn test_lookup_overrides() {
    let config = RhiConfiguration::from_lookup(lookup_from(&[
        ("DZ_DXC_PATH", "/opt/dxc/bin/dxc"),
        ("DZ_SHADER_CACHE_DIR", "/tmp/dz-cache"),
        ("DZ_DISABLE_SHADER_CACHE", "1"),
    ]));

    assert_eq!(config.dxc_path, PathBuf::from("/opt/dxc/bin/dxc"));
    assert_eq!(config.shader_cache_dir, Some(PathBuf::from("/tmp/dz-cache")));
    assert!(!config.enable_shader_cache);
}

#[test]
fn test_lookup_empty_cache_dir_is_ignored() {
    let config = RhiConfiguration::from_lookup(lookup_from(&[("DZ_SHADER_CACHE_DIR", "")]));
    assert!(config.shader_cache_dir.is_none());
}

#[test]
fn test_lookup_cache_flag_false_keeps_cache() {
    let config = RhiConfiguration::from_lookup(lookup_from(&[("DZ_DISABLE_SHADER_CACHE", "0")]));
    assert!(config.enable_shader_cache);
}
