// ABOUTME: Release artifact inspection and extraction.
// ABOUTME: A release is a tar archive (optionally gzipped) with one top-level directory.

use flate2::read::GzDecoder;
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Component, Path, PathBuf};
use tar::{Archive, EntryType};

use super::error::ArtifactError;

/// Archive compression, chosen from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Gzip,
}

impl Compression {
    pub fn for_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Some(Compression::Gzip)
        } else if name.ends_with(".tar") {
            Some(Compression::None)
        } else {
            None
        }
    }
}

/// A packaged release on disk. Never modified by this tool.
#[derive(Debug, Clone)]
pub struct ReleaseArtifact {
    path: PathBuf,
    compression: Compression,
    digest: String,
}

/// What an artifact contains, as far as the rollout cares.
#[derive(Debug, Clone)]
pub struct ArtifactLayout {
    /// Name of the single top-level directory.
    pub root: String,
    /// Paths below the root, `/`-separated.
    pub entries: BTreeSet<String>,
}

impl ArtifactLayout {
    pub fn contains(&self, relative: &str) -> bool {
        self.entries.contains(relative.trim_start_matches("./"))
    }
}

impl ReleaseArtifact {
    /// Open an artifact and compute its SHA-256 digest.
    pub fn open(path: &Path) -> Result<Self, ArtifactError> {
        if !path.is_file() {
            return Err(ArtifactError::NotFound(path.to_path_buf()));
        }

        let compression = Compression::for_path(path)
            .ok_or_else(|| ArtifactError::UnsupportedFormat(path.to_path_buf()))?;

        let digest = sha256_file(path).map_err(|source| ArtifactError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(Self {
            path: path.to_path_buf(),
            compression,
            digest,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Hex-encoded SHA-256 of the archive file.
    pub fn digest(&self) -> &str {
        &self.digest
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    fn archive(&self) -> Result<Archive<Box<dyn Read>>, ArtifactError> {
        let file = File::open(&self.path).map_err(|source| ArtifactError::Read {
            path: self.path.clone(),
            source,
        })?;
        let reader = BufReader::new(file);
        let reader: Box<dyn Read> = match self.compression {
            Compression::None => Box::new(reader),
            Compression::Gzip => Box::new(GzDecoder::new(reader)),
        };
        Ok(Archive::new(reader))
    }

    fn read_err(&self, source: std::io::Error) -> ArtifactError {
        ArtifactError::Read {
            path: self.path.clone(),
            source,
        }
    }

    /// List the artifact and check that each of `required` exists below its root.
    pub fn inspect(&self, required: &[&str]) -> Result<ArtifactLayout, ArtifactError> {
        let read_err = |source| self.read_err(source);

        let mut archive = self.archive()?;
        let mut roots = BTreeSet::new();
        let mut entries = BTreeSet::new();

        for entry in archive.entries().map_err(read_err)? {
            let entry = entry.map_err(read_err)?;
            if !is_content(entry.header().entry_type()) {
                continue;
            }

            let path = entry.path().map_err(read_err)?;
            let mut parts = normal_parts(&path).into_iter();

            let Some(root) = parts.next() else { continue };
            let rest: Vec<String> = parts.collect();

            if rest.is_empty() && !entry.header().entry_type().is_dir() {
                return Err(ArtifactError::RootIsFile(root));
            }

            roots.insert(root);
            if !rest.is_empty() {
                entries.insert(rest.join("/"));
            }
        }

        let root = match roots.len() {
            0 => return Err(ArtifactError::NoRootDirectory),
            1 => roots.into_iter().next().ok_or(ArtifactError::NoRootDirectory)?,
            _ => return Err(ArtifactError::MultipleRoots(roots.into_iter().collect())),
        };

        let layout = ArtifactLayout { root, entries };
        for name in required {
            if !layout.contains(name) {
                return Err(ArtifactError::MissingEntry {
                    root: layout.root.clone(),
                    entry: (*name).to_string(),
                });
            }
        }

        Ok(layout)
    }

    /// Read one regular file below the root as text, without unpacking.
    pub fn read_entry(
        &self,
        layout: &ArtifactLayout,
        relative: &str,
    ) -> Result<String, ArtifactError> {
        let read_err = |source| self.read_err(source);
        let wanted = relative.trim_start_matches("./");

        let mut archive = self.archive()?;
        for entry in archive.entries().map_err(read_err)? {
            let mut entry = entry.map_err(read_err)?;
            if !entry.header().entry_type().is_file() {
                continue;
            }
            let parts = normal_parts(&entry.path().map_err(read_err)?);
            if parts.len() > 1 && parts[0] == layout.root && parts[1..].join("/") == wanted {
                let mut body = String::new();
                entry.read_to_string(&mut body).map_err(read_err)?;
                return Ok(body);
            }
        }

        Err(ArtifactError::MissingEntry {
            root: layout.root.clone(),
            entry: wanted.to_string(),
        })
    }

    /// Extract the whole archive into `dest`, which must already exist.
    pub fn unpack_into(&self, dest: &Path) -> Result<(), ArtifactError> {
        let mut archive = self.archive()?;
        archive.set_preserve_permissions(true);
        archive.set_preserve_mtime(true);
        archive
            .unpack(dest)
            .map_err(|source| ArtifactError::Unpack {
                path: dest.to_path_buf(),
                source,
            })
    }
}

fn normal_parts(path: &Path) -> Vec<String> {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(p) => Some(p.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect()
}

fn is_content(entry_type: EntryType) -> bool {
    matches!(
        entry_type,
        EntryType::Regular
            | EntryType::Directory
            | EntryType::Symlink
            | EntryType::Link
            | EntryType::Continuous
            | EntryType::GNUSparse
    )
}

fn sha256_file(path: &Path) -> std::io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    std::io::copy(&mut file, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression as GzLevel;
    use flate2::write::GzEncoder;
    use tempfile::TempDir;

    fn append_file<W: std::io::Write>(builder: &mut tar::Builder<W>, path: &str, body: &str) {
        let mut header = tar::Header::new_gnu();
        header.set_size(body.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, path, body.as_bytes())
            .unwrap();
    }

    fn write_tar(dir: &TempDir, name: &str, files: &[(&str, &str)]) -> PathBuf {
        let path = dir.path().join(name);
        let file = File::create(&path).unwrap();
        if name.ends_with(".gz") || name.ends_with(".tgz") {
            let mut builder = tar::Builder::new(GzEncoder::new(file, GzLevel::default()));
            for (p, body) in files {
                append_file(&mut builder, p, body);
            }
            builder.into_inner().unwrap().finish().unwrap();
        } else {
            let mut builder = tar::Builder::new(file);
            for (p, body) in files {
                append_file(&mut builder, p, body);
            }
            builder.finish().unwrap();
        }
        path
    }

    #[test]
    fn detects_compression_from_extension() {
        assert_eq!(
            Compression::for_path(Path::new("a/mybot.tar")),
            Some(Compression::None)
        );
        assert_eq!(
            Compression::for_path(Path::new("mybot.tar.gz")),
            Some(Compression::Gzip)
        );
        assert_eq!(
            Compression::for_path(Path::new("mybot.tgz")),
            Some(Compression::Gzip)
        );
        assert_eq!(Compression::for_path(Path::new("mybot.zip")), None);
    }

    #[test]
    fn missing_artifact_is_not_found() {
        let err = ReleaseArtifact::open(Path::new("/nonexistent/mybot.tar")).unwrap_err();
        assert!(matches!(err, ArtifactError::NotFound(_)));
    }

    #[test]
    fn inspect_finds_root_and_required_files() {
        let dir = TempDir::new().unwrap();
        let path = write_tar(
            &dir,
            "mybot.tar.gz",
            &[
                ("mybot/requirements.txt", "requests==2.31.0\n"),
                ("mybot/mybot.service", "[Service]\nExecStart=/bin/true\n"),
                ("mybot/app/main.py", "print('hi')\n"),
            ],
        );

        let artifact = ReleaseArtifact::open(&path).unwrap();
        let layout = artifact
            .inspect(&["requirements.txt", "mybot.service"])
            .unwrap();

        assert_eq!(layout.root, "mybot");
        assert!(layout.contains("app/main.py"));
        assert_eq!(artifact.digest().len(), 64);
    }

    #[test]
    fn inspect_reports_missing_manifest() {
        let dir = TempDir::new().unwrap();
        let path = write_tar(&dir, "mybot.tar", &[("mybot/mybot.service", "")]);

        let err = ReleaseArtifact::open(&path)
            .unwrap()
            .inspect(&["requirements.txt"])
            .unwrap_err();
        assert!(matches!(
            err,
            ArtifactError::MissingEntry { ref entry, .. } if entry == "requirements.txt"
        ));
    }

    #[test]
    fn inspect_rejects_multiple_roots() {
        let dir = TempDir::new().unwrap();
        let path = write_tar(
            &dir,
            "mybot.tar",
            &[("mybot/a.txt", ""), ("other/b.txt", "")],
        );

        let err = ReleaseArtifact::open(&path).unwrap().inspect(&[]).unwrap_err();
        assert!(matches!(err, ArtifactError::MultipleRoots(_)));
    }

    #[test]
    fn inspect_rejects_top_level_files() {
        let dir = TempDir::new().unwrap();
        let path = write_tar(&dir, "mybot.tar", &[("README", "hello")]);

        let err = ReleaseArtifact::open(&path).unwrap().inspect(&[]).unwrap_err();
        assert!(matches!(err, ArtifactError::RootIsFile(ref name) if name == "README"));
    }

    #[test]
    fn inspect_ignores_leading_dot_components() {
        let dir = TempDir::new().unwrap();
        let path = write_tar(&dir, "mybot.tar", &[("./mybot/requirements.txt", "")]);

        let layout = ReleaseArtifact::open(&path)
            .unwrap()
            .inspect(&["requirements.txt"])
            .unwrap();
        assert_eq!(layout.root, "mybot");
    }

    #[test]
    fn read_entry_returns_file_body() {
        let dir = TempDir::new().unwrap();
        let path = write_tar(
            &dir,
            "mybot.tar.gz",
            &[
                ("mybot/requirements.txt", "requests\n"),
                ("mybot/mybot.service", "[Service]\nExecStart=/bin/true\n"),
            ],
        );
        let artifact = ReleaseArtifact::open(&path).unwrap();
        let layout = artifact.inspect(&[]).unwrap();

        let body = artifact.read_entry(&layout, "mybot.service").unwrap();
        assert!(body.contains("ExecStart=/bin/true"));
        assert!(matches!(
            artifact.read_entry(&layout, "absent.txt"),
            Err(ArtifactError::MissingEntry { .. })
        ));
    }

    #[test]
    fn unpack_extracts_tree() {
        let dir = TempDir::new().unwrap();
        let path = write_tar(
            &dir,
            "mybot.tgz",
            &[("mybot/app/main.py", "print('v2')\n")],
        );
        let dest = dir.path().join("out");
        std::fs::create_dir(&dest).unwrap();

        ReleaseArtifact::open(&path)
            .unwrap()
            .unpack_into(&dest)
            .unwrap();

        let body = std::fs::read_to_string(dest.join("mybot/app/main.py")).unwrap();
        assert_eq!(body, "print('v2')\n");
    }

    #[test]
    fn digest_changes_with_content() {
        let dir = TempDir::new().unwrap();
        let a = write_tar(&dir, "a.tar", &[("mybot/x", "1")]);
        let b = write_tar(&dir, "b.tar", &[("mybot/x", "2")]);

        let a = ReleaseArtifact::open(&a).unwrap();
        let b = ReleaseArtifact::open(&b).unwrap();
        assert_ne!(a.digest(), b.digest());
    }
}
