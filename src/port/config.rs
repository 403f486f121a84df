//! Run configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::package::format::DEFAULT_EXTENSION;
use crate::package::Format;
use crate::util::{Error, Result, Vec3};

/// One level set: a directory of level files ported together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelSet {
    /// Directory holding the set's source files.
    pub directory: PathBuf,
    /// Where the player starts when the entry file is booted.
    #[serde(default)]
    pub start_location: Option<[f32; 3]>,
    /// Kill height written on the entry file's world settings; 0 leaves it unset.
    #[serde(default)]
    pub kill_z: i32,
}

impl LevelSet {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self { directory: directory.into(), start_location: None, kill_z: 0 }
    }

    pub fn start_point(&self) -> Option<Vec3> {
        self.start_location.map(Vec3::from_array)
    }
}

/// Everything a port run consumes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PortConfig {
    // Formats
    pub target: Format,
    pub source_format: Format,

    // Locations
    pub output_dir: PathBuf,
    pub donor_dir: Option<PathBuf>,
    pub donor_index: Option<PathBuf>,
    pub donor_root: Option<PathBuf>,
    pub helper_name: String,

    // Selection
    pub entry_prefix: String,
    pub placeable_classes: Vec<String>,
    pub native_packages: Vec<String>,

    // Resources
    pub cache_capacity: usize,

    // Debug behaviour
    pub debug_build: bool,
    pub debug_convert_static_lighting: bool,

    // Output
    pub compress_output: bool,
    pub output_extension: String,

    pub level_sets: Vec<LevelSet>,
}

impl Default for PortConfig {
    fn default() -> Self {
        Self {
            target: Format::Le3,
            source_format: Format::Le1,
            output_dir: PathBuf::from("out"),
            donor_dir: None,
            donor_index: None,
            donor_root: None,
            helper_name: "VTestHelper".to_string(),
            entry_prefix: "BioP_".to_string(),
            placeable_classes: [
                "StaticMeshActor",
                "SkeletalMeshActor",
                "BlockingVolume",
                "InterpActor",
                "HeightFog",
                "LensFlareSource",
                "DecalActor",
                "StaticLightCollectionActor",
                "StaticMeshCollectionActor",
            ]
            .map(String::from)
            .to_vec(),
            native_packages: ["Core", "Engine", "GameFramework", "SFXGame", "BIOC_Base", "SFXOnlineFoundation"]
                .map(String::from)
                .to_vec(),
            cache_capacity: 20,
            debug_build: false,
            debug_convert_static_lighting: false,
            compress_output: false,
            output_extension: DEFAULT_EXTENSION.to_string(),
            level_sets: Vec::new(),
        }
    }
}

impl PortConfig {
    /// Load a JSON config and validate it. Relative paths are resolved against the
    /// config file's directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::FileNotFound(path.to_path_buf()),
            _ => Error::Io(e),
        })?;
        let mut config: Self = serde_json::from_str(&text)?;
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        config.validate()?;
        Ok(config)
    }

    fn resolve_paths(&mut self, base: &Path) {
        let join = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        join(&mut self.output_dir);
        for p in [&mut self.donor_dir, &mut self.donor_index, &mut self.donor_root].into_iter().flatten() {
            join(p);
        }
        for set in &mut self.level_sets {
            join(&mut set.directory);
        }
    }

    /// Reject configurations the porter cannot run.
    pub fn validate(&self) -> Result<()> {
        if !self.source_format.can_port_to(self.target) {
            return Err(Error::UnsupportedPort {
                source_format: self.source_format.to_string(),
                target: self.target.to_string(),
            });
        }
        if self.cache_capacity == 0 {
            return Err(Error::config("cache_capacity must be at least 1"));
        }
        if self.output_extension.is_empty() || self.output_extension.contains(|c: char| matches!(c, '.' | '/' | '\\')) {
            return Err(Error::config(format!("bad output_extension '{}'", self.output_extension)));
        }
        if self.helper_name.is_empty() {
            return Err(Error::config("helper_name must not be empty"));
        }
        if self.level_sets.is_empty() {
            return Err(Error::config("no level_sets configured"));
        }
        Ok(())
    }

    /// Unpack collected static lighting into individual lights.
    #[inline]
    pub fn unpack_static_lighting(&self) -> bool {
        self.debug_build && self.debug_convert_static_lighting
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PortConfig::default();
        assert_eq!(config.cache_capacity, 20);
        assert_eq!(config.helper_name, "VTestHelper");
        assert_eq!(config.placeable_classes.len(), 9);
        assert!(!config.unpack_static_lighting());
    }

    #[test]
    fn test_load_resolves_and_validates() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let file = dir.path().join("port.json");
        std::fs::write(
            &file,
            r#"{
                "target": "LE2",
                "output_dir": "cooked",
                "cache_capacity": 4,
                "level_sets": [{ "directory": "levels/wardle", "start_location": [1, 2, 3], "kill_z": -3200 }]
            }"#,
        )?;

        let config = PortConfig::load(&file)?;
        assert_eq!(config.target, Format::Le2);
        assert_eq!(config.source_format, Format::Le1);
        assert_eq!(config.output_dir, dir.path().join("cooked"));
        assert_eq!(config.level_sets[0].directory, dir.path().join("levels/wardle"));
        assert_eq!(config.level_sets[0].start_point(), Some(Vec3::new(1.0, 2.0, 3.0)));
        assert_eq!(config.level_sets[0].kill_z, -3200);
        assert_eq!(config.native_packages.len(), 6);
        Ok(())
    }

    #[test]
    fn test_rejects_unsupported_pair() {
        let config = PortConfig {
            source_format: Format::Le2,
            target: Format::Le3,
            level_sets: vec![LevelSet::new("x")],
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::UnsupportedPort { .. })));
    }

    #[test]
    fn test_rejects_zero_capacity() {
        let config = PortConfig { cache_capacity: 0, level_sets: vec![LevelSet::new("x")], ..Default::default() };
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(PortConfig::load("/nonexistent/port.json"), Err(Error::FileNotFound(_))));
    }
}
