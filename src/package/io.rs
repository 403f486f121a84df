//! Package I/O collaborator.
//!
//! The porting core never touches the filesystem directly; it goes through
//! [`PackageIo`], which sniffs, opens, saves and closes packages.

use std::path::Path;

use super::format::{DEFAULT_EXTENSION, PACKAGE_MAGIC};
use super::reader::open_package;
use super::writer::save_package;
use crate::model::Container;
use crate::util::Result;

/// Opening, saving and sniffing of package files.
pub trait PackageIo {
    /// Whether a path looks like a package this implementation can open.
    fn is_package_file(&self, path: &Path) -> bool;

    /// Open and decode a package.
    fn open(&self, path: &Path) -> Result<Container>;

    /// Persist a package.
    fn save(&self, container: &Container, path: &Path, compressed: bool) -> Result<()>;

    /// Release whatever resources an opened package holds.
    fn close(&self, container: &Container) {
        let _ = container;
    }
}

/// Default on-disk implementation.
#[derive(Clone, Debug)]
pub struct BinaryPackageIo {
    extensions: Vec<String>,
}

impl BinaryPackageIo {
    /// Accept files with the given extensions (case-insensitive).
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { extensions: extensions.into_iter().map(Into::into).collect() }
    }
}

impl Default for BinaryPackageIo {
    fn default() -> Self {
        Self::new([DEFAULT_EXTENSION, "sfm", "u", "upk"])
    }
}

impl PackageIo for BinaryPackageIo {
    fn is_package_file(&self, path: &Path) -> bool {
        let ext_ok = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| self.extensions.iter().any(|x| x.eq_ignore_ascii_case(e)));
        if !ext_ok || !path.is_file() {
            return false;
        }

        let mut magic = [0u8; 4];
        std::fs::File::open(path)
            .and_then(|mut f| std::io::Read::read_exact(&mut f, &mut magic))
            .is_ok()
            && &magic == PACKAGE_MAGIC
    }

    fn open(&self, path: &Path) -> Result<Container> {
        tracing::debug!(path = %path.display(), "opening package");
        open_package(path)
    }

    fn save(&self, container: &Container, path: &Path, compressed: bool) -> Result<()> {
        tracing::debug!(path = %path.display(), compressed, "saving package");
        save_package(container, path, compressed)
    }

    fn close(&self, container: &Container) {
        tracing::trace!(
            path = %container.locator().map(|p| p.display().to_string()).unwrap_or_default(),
            "closing package"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::Format;

    #[test]
    fn test_sniffing() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let io = BinaryPackageIo::default();

        let good = dir.path().join("BioA_Moon.pcc");
        io.save(&Container::new_level(Format::Le1), &good, false)?;
        assert!(io.is_package_file(&good));

        let wrong_ext = dir.path().join("notes.txt");
        std::fs::write(&wrong_ext, b"WPKG")?;
        assert!(!io.is_package_file(&wrong_ext));

        let wrong_magic = dir.path().join("fake.pcc");
        std::fs::write(&wrong_magic, b"nope, not a package")?;
        assert!(!io.is_package_file(&wrong_magic));
        Ok(())
    }
}
