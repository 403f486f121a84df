//! Port orchestration: one source level file in, one destination file out.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use super::config::{LevelSet, PortConfig};
use crate::core::{CacheStats, ContainerCache};
use crate::donor::DonorIndex;
use crate::geom;
use crate::level::{assemble_level, AssemblyOptions};
use crate::model::{tags, AttrValue, Attributes, Container, ObjectEntry, ObjectName, Reference};
use crate::package::PackageIo;
use crate::relink::{Diagnostic, Relinker};
use crate::util::{Error, Result};

/// Helper package export cloned as the entry file's start location.
const START_LOCATION_PATH: &str = "BioStartLocation_0";

/// World settings object of the destination level template.
const WORLD_SETTINGS_PATH: &str = "TheWorld.PersistentLevel.BioWorldInfo_2";

/// How a single file's port ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FileStatus {
    Ported,
    Failed(String),
}

/// Result of porting one source file.
#[derive(Clone, Debug)]
pub struct FileOutcome {
    pub source: PathBuf,
    pub output: Option<PathBuf>,
    pub status: FileStatus,
    /// Source objects cloned into the destination.
    pub cloned: usize,
    /// Source objects skipped (already present or failed).
    pub skipped: usize,
    pub diagnostics: Vec<Diagnostic>,
}

impl FileOutcome {
    fn failed(source: &Path, error: &Error) -> Self {
        Self {
            source: source.to_path_buf(),
            output: None,
            status: FileStatus::Failed(error.to_string()),
            cloned: 0,
            skipped: 0,
            diagnostics: Vec::new(),
        }
    }

    pub fn is_ported(&self) -> bool {
        self.status == FileStatus::Ported
    }
}

/// Summary of a whole run.
#[derive(Clone, Debug, Default)]
pub struct PortReport {
    pub files: Vec<FileOutcome>,
    pub cache: CacheStats,
}

impl PortReport {
    pub fn ported(&self) -> usize {
        self.files.iter().filter(|f| f.is_ported()).count()
    }

    pub fn failed(&self) -> usize {
        self.files.len() - self.ported()
    }

    /// Sorted paths that had no donor, across every file.
    pub fn missing_donors(&self) -> BTreeSet<String> {
        self.files
            .iter()
            .flat_map(|f| f.diagnostics.iter())
            .filter_map(|d| match d {
                Diagnostic::MissingDonor { path, .. } => Some(path.clone()),
                _ => None,
            })
            .collect()
    }
}

/// Drives a port run.
///
/// Owns the run-wide donor index and helper package; the container cache lives
/// for the duration of [`Porter::run`].
pub struct Porter<'io> {
    config: PortConfig,
    io: &'io dyn PackageIo,
    index: DonorIndex,
    helper: Option<Container>,
}

impl<'io> Porter<'io> {
    /// Build the donor index (persisted index, then donor directory scan).
    pub fn new(config: PortConfig, io: &'io dyn PackageIo) -> Result<Self> {
        config.validate()?;
        let base = config.donor_root.clone().or_else(|| config.donor_dir.clone());

        let mut index = match &config.donor_index {
            Some(path) => {
                let index = DonorIndex::load(path)?;
                tracing::info!(path = %path.display(), objects = index.len(), "loaded donor index");
                index
            }
            None => DonorIndex::new(),
        };
        if let Some(base) = base {
            index = index.with_base_dir(base);
        }

        let mut helper = None;
        if let Some(dir) = &config.donor_dir {
            let scan = index.scan_dir(dir, io, &config.helper_name)?;
            tracing::info!(donors = scan.indexed, failed = scan.failed.len(), objects = index.len(), "donor scan complete");
            helper = scan.helper;
        }
        if helper.is_none() {
            tracing::warn!(name = %config.helper_name, "helper package not found; start locations will not be placed");
        }

        Ok(Self { config, io, index, helper })
    }

    /// Build from already-prepared parts.
    pub fn with_parts(config: PortConfig, io: &'io dyn PackageIo, index: DonorIndex, helper: Option<Container>) -> Self {
        Self { config, io, index, helper }
    }

    pub fn config(&self) -> &PortConfig {
        &self.config
    }

    pub fn index(&self) -> &DonorIndex {
        &self.index
    }

    /// Port every file of every level set. Per-file failures are recorded, never
    /// propagated.
    pub fn run(&self) -> Result<PortReport> {
        let mut cache = ContainerCache::new(self.io, self.config.cache_capacity)?;
        let mut report = PortReport::default();

        for set in &self.config.level_sets {
            let files = match self.level_files(&set.directory) {
                Ok(files) => files,
                Err(e) => {
                    tracing::error!(dir = %set.directory.display(), error = %e, "cannot list level set");
                    report.files.push(FileOutcome::failed(&set.directory, &e));
                    continue;
                }
            };
            for file in &files {
                let outcome = match self.port_file(&mut cache, file, set, &files) {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        tracing::error!(file = %file.display(), error = %e, "port failed");
                        FileOutcome::failed(file, &e)
                    }
                };
                report.files.push(outcome);
            }
        }

        report.cache = cache.stats();
        tracing::info!(
            ported = report.ported(),
            failed = report.failed(),
            donors_opened = report.cache.opened,
            "run complete"
        );
        Ok(report)
    }

    /// Sorted package files of a level set directory.
    fn level_files(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let mut files: Vec<PathBuf> = fs::read_dir(dir)?
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| self.io.is_package_file(p))
            .collect();
        files.sort();
        Ok(files)
    }

    fn is_entry_file(&self, file: &Path) -> bool {
        base_name(file).is_some_and(|n| n.starts_with(&self.config.entry_prefix))
    }

    /// Destination file for a source file.
    pub fn output_path(&self, file: &Path) -> Result<PathBuf> {
        let name = base_name(file).ok_or_else(|| Error::invalid(format!("no file name: {}", file.display())))?;
        Ok(self.config.output_dir.join(format!("{name}.{}", self.config.output_extension)))
    }

    /// Port one source file. Errors are fatal for this file only.
    #[tracing::instrument(skip_all, fields(file = %file.display()))]
    pub fn port_file(
        &self,
        cache: &mut ContainerCache<'_>,
        file: &Path,
        set: &LevelSet,
        siblings: &[PathBuf],
    ) -> Result<FileOutcome> {
        let output = self.output_path(file)?;
        tracing::info!(output = %output.display(), "porting");

        let source = self.io.open(file)?;
        let result = self.build_destination(cache, &source, file, set, siblings);
        self.io.close(&source);
        let (dest, mut outcome) = result?;

        fs::create_dir_all(&self.config.output_dir)?;
        self.io.save(&dest, &output, self.config.compress_output)?;
        outcome.output = Some(output);
        Ok(outcome)
    }

    fn build_destination(
        &self,
        cache: &mut ContainerCache<'_>,
        source: &Container,
        file: &Path,
        set: &LevelSet,
        siblings: &[PathBuf],
    ) -> Result<(Container, FileOutcome)> {
        if source.format() != self.config.source_format {
            return Err(Error::UnsupportedPort {
                source_format: source.format().to_string(),
                target: self.config.target.to_string(),
            });
        }
        let src_level = source
            .persistent_level()
            .ok_or_else(|| Error::ObjectNotFound(crate::model::PERSISTENT_LEVEL_PATH.to_string()))?;

        let mut dest = Container::new_level(self.config.target);
        let dest_level = dest.persistent_level();

        let mut relinker = Relinker::new(&self.index, cache)
            .with_helper(self.helper.as_ref())
            .with_native_packages(&self.config.native_packages);
        relinker.reconcile_canonical(source, src_level)?;

        let mut outcome = FileOutcome {
            source: file.to_path_buf(),
            output: None,
            status: FileStatus::Ported,
            cloned: 0,
            skipped: 0,
            diagnostics: Vec::new(),
        };

        for r in self.select(source, src_level) {
            let path = source.path_of(r)?;
            tracing::debug!(%path, "porting object");
            if dest.find_export(&path).is_some() {
                tracing::info!(%path, "already exists");
                outcome.skipped += 1;
                continue;
            }
            match relinker.clone_object(source, r, &mut dest, dest_level) {
                Ok(_) => outcome.cloned += 1,
                Err(e) => {
                    record_clone_failure(&mut relinker, path, e);
                    outcome.skipped += 1;
                }
            }
        }

        if self.is_entry_file(file) {
            self.finish_entry_file(&mut relinker, source, &mut dest, file, set, siblings)?;
        }

        let options = AssemblyOptions::new(self.config.debug_build, self.config.debug_convert_static_lighting);
        assemble_level(&mut dest, options, relinker.diagnostics_mut())?;

        outcome.diagnostics = relinker.take_diagnostics();
        Ok((dest, outcome))
    }

    /// Source objects to carry over: allowlisted classes parented to the level.
    fn select(&self, source: &Container, level: Reference) -> Vec<Reference> {
        source
            .exports()
            .filter(|(_, e)| e.parent() == Some(level))
            .filter(|(_, e)| self.config.placeable_classes.iter().any(|c| c.eq_ignore_ascii_case(&e.class)))
            .map(|(r, _)| r)
            .collect()
    }

    /// Entry-file extras: start location, sibling streaming markers, trigger stream, kill height.
    fn finish_entry_file(
        &self,
        relinker: &mut Relinker<'_, '_>,
        source: &Container,
        dest: &mut Container,
        file: &Path,
        set: &LevelSet,
        siblings: &[PathBuf],
    ) -> Result<()> {
        let dest_level = dest.persistent_level();

        if let Some(point) = set.start_point() {
            match self.helper.as_ref().and_then(|h| find_start_location(h).map(|r| (h, r))) {
                Some((helper, r)) => match relinker.clone_object(helper, r, dest, dest_level) {
                    Ok(placed) => {
                        geom::set_location(dest, placed, point)?;
                    }
                    Err(e) => record_clone_failure(relinker, START_LOCATION_PATH.to_string(), e),
                },
                None => relinker.diagnostics_mut().push(Diagnostic::CloneFailed {
                    path: START_LOCATION_PATH.to_string(),
                    reason: "no helper package supplies a start location".to_string(),
                }),
            }
        }

        let template = first_of_class(source, tags::STREAMING_MARKER);
        let others = siblings.iter().filter(|s| s.as_path() != file);
        for (k, other) in others.enumerate() {
            let Some(package) = base_name(other) else { continue };
            let marker = match template {
                Some(t) => match relinker.clone_object(source, t, dest, dest_level) {
                    Ok(m) => m,
                    Err(e) => {
                        record_clone_failure(relinker, format!("streaming marker for {package}"), e);
                        continue;
                    }
                },
                None => {
                    let number = dest.next_free_counter(dest_level, tags::STREAMING_MARKER, 1)?;
                    let mut entry = ObjectEntry::new(tags::STREAMING_MARKER, ObjectName::new(tags::STREAMING_MARKER, number));
                    entry.parent = dest_level;
                    dest.add_export(entry)?
                }
            };
            let current = dest.get(marker)?.name.number;
            let counter = dest.next_free_counter(dest_level, tags::STREAMING_MARKER, current + 2 + k as u32)?;
            dest.set_counter(marker, counter)?;
            dest.get_mut(marker)?
                .attributes
                .set(Attributes::PACKAGE_NAME, AttrValue::Name(package.to_string()));
            tracing::debug!(%package, "streaming marker added");
        }

        match first_of_class(source, tags::TRIGGER_STREAM) {
            Some(bts) => {
                if let Err(e) = relinker.clone_object(source, bts, dest, dest_level) {
                    record_clone_failure(relinker, tags::TRIGGER_STREAM.to_string(), e);
                }
            }
            None => tracing::debug!("source has no trigger stream"),
        }

        if set.kill_z != 0 {
            match dest.find_export(WORLD_SETTINGS_PATH) {
                Some(ws) => dest
                    .get_mut(ws)?
                    .attributes
                    .set(Attributes::KILL_Z, AttrValue::Float(set.kill_z as f32)),
                None => relinker.diagnostics_mut().push(Diagnostic::MissingWorldSettings {
                    container: base_name(file).unwrap_or_default().to_string(),
                }),
            }
        }
        Ok(())
    }
}

fn record_clone_failure(relinker: &mut Relinker<'_, '_>, path: String, error: Error) {
    let diagnostic = match error {
        Error::StructuralCycle { path } => Diagnostic::StructuralCycle { path },
        other => Diagnostic::CloneFailed { path, reason: other.to_string() },
    };
    relinker.diagnostics_mut().push(diagnostic);
}

fn base_name(path: &Path) -> Option<&str> {
    path.file_stem()?.to_str()
}

fn first_of_class(c: &Container, class: &str) -> Option<Reference> {
    c.exports().find(|(_, e)| e.class == class).map(|(r, _)| r)
}

fn find_start_location(helper: &Container) -> Option<Reference> {
    helper
        .find_export(START_LOCATION_PATH)
        .or_else(|| first_of_class(helper, tags::START_LOCATION))
}
