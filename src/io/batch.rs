use anyhow::{bail, Context};
use nalgebra::Point3;
use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::Path;
use zip::ZipArchive;

use crate::io::stl::parse_stl_bytes;
use crate::processing::validate_cloud;

/// One screw mesh of a batch. A mesh that could not be read is kept with its
/// error so the rest of the batch still runs.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrewEntry {
    pub name: String,
    pub vertices: Result<Vec<Point3<f64>>, String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScrewBatch {
    pub entries: Vec<ScrewEntry>,
}

/// Upper bound on the buffer reserved up front for one archive member. The
/// size in the archive header is untrusted.
const MAX_MEMBER_PREALLOC: u64 = 64 * 1024 * 1024;

fn member_capacity(declared: u64) -> usize {
    declared.min(MAX_MEMBER_PREALLOC) as usize
}

fn is_stl(name: &str) -> bool {
    name.to_ascii_lowercase().ends_with(".stl")
}

fn screw_entry(name: String, bytes: &[u8]) -> ScrewEntry {
    let vertices = parse_stl_bytes(bytes)
        .and_then(|points| {
            validate_cloud("screw", &points)?;
            Ok(points)
        })
        .map_err(|e| format!("{:#}", e));
    if let Err(reason) = &vertices {
        tracing::warn!(screw = %name, %reason, "skipping unreadable screw mesh");
    }
    ScrewEntry { name, vertices }
}

impl ScrewBatch {
    /// Opens a ZIP archive or a directory of STL files.
    pub fn open<P: AsRef<Path>>(path: P, max_screws: usize) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if path.is_dir() {
            Self::from_dir(path, max_screws)
        } else {
            Self::from_zip(path, max_screws)
        }
    }

    /// Reads every `.stl` member of a ZIP archive, in archive order.
    ///
    /// The screw count limit is checked before any mesh is parsed.
    pub fn from_zip<P: AsRef<Path>>(path: P, max_screws: usize) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("failed to open screw archive {}", path.display()))?;
        let mut archive = ZipArchive::new(BufReader::new(file))
            .with_context(|| format!("invalid ZIP archive {}", path.display()))?;

        let mut stl_indices = Vec::new();
        for i in 0..archive.len() {
            let member = archive.by_index(i)?;
            if member.is_file() && is_stl(member.name()) {
                stl_indices.push(i);
            }
        }
        check_count(stl_indices.len(), max_screws)?;

        let mut entries = Vec::with_capacity(stl_indices.len());
        for i in stl_indices {
            let mut member = archive.by_index(i)?;
            let name = member.name().to_string();
            let mut bytes = Vec::with_capacity(member_capacity(member.size()));
            member
                .read_to_end(&mut bytes)
                .with_context(|| format!("failed to extract {} from archive", name))?;
            entries.push(screw_entry(name, &bytes));
        }

        tracing::info!(archive = %path.display(), screws = entries.len(), "loaded screw batch");
        Ok(Self { entries })
    }

    /// Reads every `.stl` file of a directory, sorted by file name.
    pub fn from_dir<P: AsRef<Path>>(dir: P, max_screws: usize) -> anyhow::Result<Self> {
        let dir = dir.as_ref();
        let mut paths = Vec::new();
        for entry in fs::read_dir(dir)
            .with_context(|| format!("failed to list screw directory {}", dir.display()))?
        {
            let path = entry?.path();
            let is_stl_file = path.is_file()
                && path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .map_or(false, is_stl);
            if is_stl_file {
                paths.push(path);
            }
        }
        paths.sort();
        check_count(paths.len(), max_screws)?;

        let mut entries = Vec::with_capacity(paths.len());
        for path in paths {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let bytes = fs::read(&path)
                .with_context(|| format!("failed to read screw mesh {}", path.display()))?;
            entries.push(screw_entry(name, &bytes));
        }

        tracing::info!(dir = %dir.display(), screws = entries.len(), "loaded screw batch");
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn check_count(found: usize, max_screws: usize) -> anyhow::Result<()> {
    if found == 0 {
        bail!("no STL files found in screw batch");
    }
    if found > max_screws {
        bail!("too many STL files in screw batch ({}/{} max)", found, max_screws);
    }
    Ok(())
}

#[cfg(test)]
mod batch_tests {
    use super::*;
    use crate::io::stl::points_to_ascii_stl;
    use crate::utils::synthetic::screw_along_y;
    use std::io::Write;
    use tempfile::tempdir;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    fn write_zip(path: &Path, members: &[(&str, String)]) {
        let file = File::create(path).unwrap();
        let mut zip = ZipWriter::new(file);
        for (name, body) in members {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(body.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }

    fn screw_stl() -> String {
        points_to_ascii_stl("screw", &screw_along_y(10.0, 0.0, 20.5))
    }

    #[test]
    fn test_zip_keeps_bad_members_as_failures() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("screws.zip");
        write_zip(
            &path,
            &[
                ("a.stl", screw_stl()),
                ("notes.txt", "not a mesh".to_string()),
                ("b.STL", "solid tiny\nvertex 0 0 0\nendsolid tiny\n".to_string()),
                ("c.stl", screw_stl()),
            ],
        );

        let batch = ScrewBatch::from_zip(&path, 48).unwrap();
        assert_eq!(batch.len(), 3);
        assert_eq!(batch.entries[1].name, "b.STL");
        assert!(batch.entries[0].vertices.is_ok());
        assert!(batch.entries[1].vertices.is_err());
        assert!(batch.entries[2].vertices.is_ok());
    }

    #[test]
    fn test_zip_over_limit_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("screws.zip");
        let members: Vec<(String, String)> = (0..4)
            .map(|i| (format!("s{}.stl", i), screw_stl()))
            .collect();
        let refs: Vec<(&str, String)> = members.iter().map(|(n, b)| (n.as_str(), b.clone())).collect();
        write_zip(&path, &refs);

        let err = ScrewBatch::from_zip(&path, 3).unwrap_err();
        assert!(err.to_string().contains("4/3"));
    }

    #[test]
    fn test_zip_without_stl_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("screws.zip");
        write_zip(&path, &[("readme.md", "# nothing".to_string())]);
        assert!(ScrewBatch::from_zip(&path, 48).is_err());
    }

    #[test]
    fn test_not_a_zip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("screws.zip");
        fs::write(&path, b"plain text").unwrap();
        assert!(ScrewBatch::from_zip(&path, 48).is_err());
    }

    #[test]
    fn test_member_buffer_ignores_huge_declared_size() {
        assert_eq!(member_capacity(1234), 1234);
        assert_eq!(member_capacity(u64::MAX), MAX_MEMBER_PREALLOC as usize);
    }

    #[test]
    fn test_directory_is_sorted_by_name() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("02.stl"), screw_stl()).unwrap();
        fs::write(dir.path().join("01.stl"), screw_stl()).unwrap();
        fs::write(dir.path().join("ignored.obj"), "o").unwrap();

        let batch = ScrewBatch::open(dir.path(), 48).unwrap();
        let names: Vec<_> = batch.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["01.stl", "02.stl"]);
    }
}
