//! Root-set construction.
//!
//! One request scans an ordered list of directories: for each volume, the
//! user's common folders in catalog order, then the shared public folder on
//! the primary volume, then the caller's extra folders. The list is
//! deduplicated globally by canonical path, and the order it ends up in is
//! the tie-break for every later merge.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::traits::VolumeEnumerator;

/// Per-user folders scanned before anything else, in priority order.
pub const COMMON_FOLDERS: &[&str] = &[
    "Desktop",
    "Documents",
    "Downloads",
    "Pictures",
    "Videos",
    "Music",
    "OneDrive",
    "Google Drive",
    "Dropbox",
];

/// Why a directory is in the root set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provenance {
    CommonFolder,
    ExtraFolder,
    FullVolume,
}

/// A directory to scan, already resolved to its canonical form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Root {
    pub path: PathBuf,
    pub provenance: Provenance,
}

impl Root {
    pub fn new(path: impl Into<PathBuf>, provenance: Provenance) -> Self {
        Self {
            path: path.into(),
            provenance,
        }
    }
}

impl fmt::Display for Root {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

// ---------------------------------------------------------------------------
// Volumes
// ---------------------------------------------------------------------------

/// The host's volumes: drive letters `A:\`..`Z:\` that exist on Windows,
/// `/` elsewhere.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemVolumes;

impl VolumeEnumerator for SystemVolumes {
    fn volumes(&self) -> Vec<PathBuf> {
        if cfg!(windows) {
            (b'A'..=b'Z')
                .map(|d| PathBuf::from(format!("{}:\\", d as char)))
                .filter(|p| p.exists())
                .collect()
        } else {
            vec![PathBuf::from("/")]
        }
    }
}

/// A fixed volume list.
#[derive(Debug, Default, Clone)]
pub struct StaticVolumes(pub Vec<PathBuf>);

impl VolumeEnumerator for StaticVolumes {
    fn volumes(&self) -> Vec<PathBuf> {
        self.0.clone()
    }
}

// ---------------------------------------------------------------------------
// RootSetBuilder
// ---------------------------------------------------------------------------

/// Computes the ordered, deduplicated root list for one request.
///
/// Where the per-user folders live on a given volume:
/// - the home directory, when it sits on that volume;
/// - otherwise `<volume>/Users/<user>` when a user name is known
///   (per-drive profiles on Windows).
#[derive(Debug, Clone)]
pub struct RootSetBuilder {
    catalog: Vec<String>,
    home: Option<PathBuf>,
    user: Option<String>,
    public_dir: Option<PathBuf>,
    extra_folders: Vec<PathBuf>,
}

impl Default for RootSetBuilder {
    fn default() -> Self {
        Self {
            catalog: COMMON_FOLDERS.iter().map(|s| s.to_string()).collect(),
            home: dirs::home_dir(),
            user: std::env::var("USERNAME")
                .or_else(|_| std::env::var("USER"))
                .ok()
                .filter(|u| !u.is_empty()),
            public_dir: std::env::var_os("PUBLIC").map(PathBuf::from),
            extra_folders: Vec::new(),
        }
    }
}

impl RootSetBuilder {
    /// A builder with no home, user, public folder or extras. Useful when
    /// the caller wants full control over the inputs.
    pub fn empty() -> Self {
        Self {
            catalog: COMMON_FOLDERS.iter().map(|s| s.to_string()).collect(),
            home: None,
            user: None,
            public_dir: None,
            extra_folders: Vec::new(),
        }
    }

    pub fn catalog<I, S>(mut self, folders: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.catalog = folders.into_iter().map(Into::into).collect();
        self
    }

    pub fn home(mut self, home: Option<PathBuf>) -> Self {
        self.home = home;
        self
    }

    pub fn user(mut self, user: Option<String>) -> Self {
        self.user = user;
        self
    }

    /// Shared public folder, scanned on the primary (first) volume only.
    pub fn public_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.public_dir = dir;
        self
    }

    /// Extra folders in registration order. Relative entries are ignored.
    pub fn extra_folders(mut self, folders: Vec<PathBuf>) -> Self {
        self.extra_folders = folders;
        self
    }

    /// Append to the extra folders already registered. Duplicates are
    /// dropped later, when the roots are resolved.
    pub(crate) fn append_extra_folders(mut self, folders: Vec<PathBuf>) -> Self {
        self.extra_folders.extend(folders);
        self
    }

    /// The common-folder pass: catalog folders, public folder and extras.
    ///
    /// Candidates that do not exist right now are silently omitted.
    pub fn common_roots(&self, volumes: &[PathBuf]) -> Vec<Root> {
        let mut set = RootSet::default();

        for (i, volume) in volumes.iter().enumerate() {
            if let Some(profile) = self.profile_root(volume) {
                for folder in &self.catalog {
                    set.push(profile.join(folder), Provenance::CommonFolder);
                }
            }
            if i == 0 {
                if let Some(public) = &self.public_dir {
                    set.push(public.clone(), Provenance::CommonFolder);
                }
            }
            for extra in &self.extra_folders {
                if extra.is_absolute() {
                    set.push(extra.clone(), Provenance::ExtraFolder);
                } else {
                    debug!(folder = %extra.display(), "skipping relative extra folder");
                }
            }
        }

        // No volumes at all: still honour the caller's extras.
        if volumes.is_empty() {
            for extra in self.extra_folders.iter().filter(|e| e.is_absolute()) {
                set.push(extra.clone(), Provenance::ExtraFolder);
            }
        }

        set.into_roots()
    }

    /// The full-volume pass over `volumes`, in the given order.
    pub fn volume_roots(&self, volumes: &[PathBuf]) -> Vec<Root> {
        let mut set = RootSet::default();
        for volume in volumes {
            set.push(volume.clone(), Provenance::FullVolume);
        }
        set.into_roots()
    }

    fn profile_root(&self, volume: &Path) -> Option<PathBuf> {
        if let Some(home) = &self.home {
            if home.starts_with(volume) {
                return Some(home.clone());
            }
        }
        self.user
            .as_ref()
            .map(|user| volume.join("Users").join(user))
    }
}

/// Order-preserving root list keyed by canonical path.
#[derive(Default)]
struct RootSet {
    seen: HashSet<PathBuf>,
    roots: Vec<Root>,
}

impl RootSet {
    fn push(&mut self, candidate: PathBuf, provenance: Provenance) {
        let canonical = match dunce::canonicalize(&candidate) {
            Ok(p) if p.is_dir() => p,
            _ => {
                debug!(path = %candidate.display(), "root candidate missing; skipped");
                return;
            }
        };
        if self.seen.insert(canonical.clone()) {
            self.roots.push(Root::new(canonical, provenance));
        }
    }

    fn into_roots(self) -> Vec<Root> {
        self.roots
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn mkdirs(base: &Path, names: &[&str]) {
        for n in names {
            fs::create_dir_all(base.join(n)).unwrap();
        }
    }

    #[test]
    fn catalog_order_then_extras_and_missing_skipped() {
        let vol = tempfile::tempdir().unwrap();
        let home = vol.path().join("home").join("u");
        mkdirs(&home, &["Music", "Desktop", "Downloads"]);
        let extra = vol.path().join("projects");
        fs::create_dir_all(&extra).unwrap();

        let roots = RootSetBuilder::empty()
            .home(Some(home.clone()))
            .extra_folders(vec![extra.clone(), PathBuf::from("relative/dir")])
            .common_roots(&[vol.path().to_path_buf()]);

        let names: Vec<_> = roots
            .iter()
            .map(|r| r.path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["Desktop", "Downloads", "Music", "projects"]);
        assert_eq!(roots[3].provenance, Provenance::ExtraFolder);
        assert!(roots[..3].iter().all(|r| r.provenance == Provenance::CommonFolder));
    }

    #[test]
    fn duplicates_removed_across_volumes_and_aliases() {
        let vol = tempfile::tempdir().unwrap();
        let home = vol.path().join("home");
        mkdirs(&home, &["Documents"]);

        // The extra folder is the same directory spelled differently.
        let alias = home.join("Documents").join("..").join("Documents");
        let roots = RootSetBuilder::empty()
            .home(Some(home.clone()))
            .extra_folders(vec![alias])
            .common_roots(&[vol.path().to_path_buf(), vol.path().to_path_buf()]);

        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].provenance, Provenance::CommonFolder);
    }

    #[test]
    fn per_volume_user_profiles_and_public_on_primary_only() {
        let c = tempfile::tempdir().unwrap();
        let d = tempfile::tempdir().unwrap();
        mkdirs(&c.path().join("Users").join("alex"), &["Desktop"]);
        mkdirs(&d.path().join("Users").join("alex"), &["Documents"]);
        let public = c.path().join("Users").join("Public");
        fs::create_dir_all(&public).unwrap();

        let roots = RootSetBuilder::empty()
            .user(Some("alex".into()))
            .public_dir(Some(public.clone()))
            .common_roots(&[c.path().to_path_buf(), d.path().to_path_buf()]);

        assert_eq!(roots.len(), 3);
        assert!(roots[0].path.ends_with("Desktop"));
        assert!(roots[1].path.ends_with("Public"));
        assert!(roots[2].path.ends_with("Documents"));
    }

    #[test]
    fn volume_roots_keep_selection_order() {
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();
        let roots = RootSetBuilder::empty().volume_roots(&[
            b.path().to_path_buf(),
            a.path().to_path_buf(),
            b.path().to_path_buf(),
            PathBuf::from("/definitely/not/here"),
        ]);
        assert_eq!(roots.len(), 2);
        assert_eq!(roots[0].path, dunce::canonicalize(b.path()).unwrap());
        assert!(roots.iter().all(|r| r.provenance == Provenance::FullVolume));
    }
}
