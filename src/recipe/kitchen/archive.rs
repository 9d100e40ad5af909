// src/recipe/kitchen/archive.rs

//! Archive and source file utilities for the Kitchen

use crate::error::{Error, Result};
use flate2::read::GzDecoder;
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Component, Path, PathBuf};
use tracing::debug;
use xz2::read::XzDecoder;

/// Download a file from a URL
///
/// `http(s)://` URLs are fetched; `file://` URLs and plain paths are copied.
pub fn download_file(url: &str, dest: &Path) -> Result<()> {
    if let Some(path) = url.strip_prefix("file://") {
        return copy_local(Path::new(path), dest);
    }
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return copy_local(Path::new(url), dest);
    }

    let response = reqwest::blocking::get(url)
        .map_err(|e| Error::DownloadError(format!("Failed to download {}: {}", url, e)))?;

    if !response.status().is_success() {
        return Err(Error::DownloadError(format!(
            "Failed to download {}: HTTP {}",
            url,
            response.status()
        )));
    }

    let bytes = response
        .bytes()
        .map_err(|e| Error::DownloadError(format!("Failed to read {}: {}", url, e)))?;
    fs::write(dest, &bytes)?;
    debug!("Downloaded {} ({} bytes)", url, bytes.len());
    Ok(())
}

fn copy_local(src: &Path, dest: &Path) -> Result<()> {
    if !src.is_file() {
        return Err(Error::DownloadError(format!(
            "Source file not found: {}",
            src.display()
        )));
    }
    fs::copy(src, dest)
        .map_err(|e| Error::DownloadError(format!("Failed to copy {}: {}", src.display(), e)))?;
    Ok(())
}

/// SHA-256 of a file, hex encoded
pub fn file_sha256(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}

/// Verify file checksum against an expected hex SHA-256
pub fn verify_file_checksum(path: &Path, expected: &str) -> Result<()> {
    let actual = file_sha256(path)?;
    if actual.eq_ignore_ascii_case(expected) {
        Ok(())
    } else {
        Err(Error::ChecksumMismatch {
            expected: expected.to_string(),
            actual,
        })
    }
}

/// Extract an archive to a destination directory
///
/// Supports: .tar.gz, .tgz, .tar.xz, .txz, .tar
///
/// With `strip_root` the first path component of every entry is dropped,
/// so `proj-9.1.0/CMakeLists.txt` lands at `dest/CMakeLists.txt`. Entries
/// that would land outside `dest` are refused.
pub fn extract_archive(archive: &Path, dest: &Path, strip_root: bool) -> Result<usize> {
    let filename = archive
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("");

    let file = BufReader::new(File::open(archive)?);
    let reader: Box<dyn Read> = if filename.ends_with(".tar.gz") || filename.ends_with(".tgz") {
        Box::new(GzDecoder::new(file))
    } else if filename.ends_with(".tar.xz") || filename.ends_with(".txz") {
        Box::new(XzDecoder::new(file))
    } else if filename.ends_with(".tar") {
        Box::new(file)
    } else {
        return Err(Error::ParseError(format!(
            "Unknown archive format: {}",
            filename
        )));
    };

    fs::create_dir_all(dest)?;
    let real_dest = dest.canonicalize()?;
    let mut tar = tar::Archive::new(reader);
    let mut count = 0;

    let entries = tar
        .entries()
        .map_err(|e| Error::IoError(format!("Failed to read archive {}: {}", filename, e)))?;
    for entry in entries {
        let mut entry =
            entry.map_err(|e| Error::IoError(format!("Corrupt archive {}: {}", filename, e)))?;
        let path = entry
            .path()
            .map_err(|e| Error::IoError(format!("Bad entry path in {}: {}", filename, e)))?
            .into_owned();

        let Some(relative) = entry_destination(&path, strip_root)? else {
            continue;
        };
        let target = dest.join(&relative);
        if let Some(parent) = target.parent() {
            // A symlink unpacked earlier must not redirect this write
            if !resolves_within(&real_dest, parent)? {
                return Err(Error::PreparationError(format!(
                    "Archive entry {} resolves outside the extraction directory",
                    path.display()
                )));
            }
            fs::create_dir_all(parent)?;
        }

        // Never write through a link left by an earlier entry
        if fs::symlink_metadata(&target).is_ok_and(|m| m.file_type().is_symlink()) {
            fs::remove_file(&target)?;
        }

        let kind = entry.header().entry_type();
        if kind.is_symlink() || kind.is_hard_link() {
            let link = entry
                .link_name()
                .map_err(|e| Error::IoError(format!("Bad link in {}: {}", filename, e)))?
                .ok_or_else(|| {
                    Error::PreparationError(format!("Link {} has no target", path.display()))
                })?
                .into_owned();

            if kind.is_hard_link() {
                // Hard link names are archive paths, so strip them the same way
                let source = entry_destination(&link, strip_root)?.ok_or_else(|| {
                    Error::PreparationError(format!(
                        "Hard link {} points at the archive root",
                        path.display()
                    ))
                })?;
                let source = dest.join(source);
                if !resolves_within(&real_dest, &source)? {
                    return Err(Error::PreparationError(format!(
                        "Hard link {} resolves outside the extraction directory",
                        path.display()
                    )));
                }
                if target.exists() {
                    fs::remove_file(&target)?;
                }
                fs::hard_link(&source, &target).map_err(|e| {
                    Error::IoError(format!("Failed to link {}: {}", relative.display(), e))
                })?;
                count += 1;
                continue;
            }
            check_symlink_target(&relative, &link)?;
        }

        entry
            .unpack(&target)
            .map_err(|e| Error::IoError(format!("Failed to extract {}: {}", relative.display(), e)))?;
        count += 1;
    }

    debug!("Extracted {} entries from {}", count, filename);
    Ok(count)
}

/// Where an archive entry lands relative to the extraction root
///
/// `None` for entries that vanish under `strip_root` (the root itself).
fn entry_destination(path: &Path, strip_root: bool) -> Result<Option<PathBuf>> {
    let mut components = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => components.push(part),
            Component::CurDir => {}
            _ => {
                return Err(Error::PreparationError(format!(
                    "Archive entry escapes the extraction directory: {}",
                    path.display()
                )));
            }
        }
    }

    let skip = usize::from(strip_root);
    if components.len() <= skip {
        return Ok(None);
    }
    Ok(Some(components[skip..].iter().collect()))
}

/// Whether the deepest existing ancestor of `path` lies under `root`
fn resolves_within(root: &Path, path: &Path) -> Result<bool> {
    let existing = path.ancestors().find(|p| p.exists()).unwrap_or(root);
    Ok(existing.canonicalize()?.starts_with(root))
}

/// Refuse symlinks whose target is absolute or climbs above the extraction root
fn check_symlink_target(relative: &Path, link: &Path) -> Result<()> {
    let escapes = || {
        Error::PreparationError(format!(
            "Symlink {} -> {} escapes the extraction directory",
            relative.display(),
            link.display()
        ))
    };

    let mut depth = relative.components().count().saturating_sub(1);
    for component in link.components() {
        match component {
            Component::Normal(_) => depth += 1,
            Component::CurDir => {}
            Component::ParentDir => depth = depth.checked_sub(1).ok_or_else(escapes)?,
            Component::RootDir | Component::Prefix(_) => return Err(escapes()),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use tempfile::TempDir;

    fn make_tarball(dir: &Path, name: &str, files: &[(&str, &str)]) -> PathBuf {
        let path = dir.join(name);
        let encoder = GzEncoder::new(File::create(&path).unwrap(), Compression::default());
        let mut builder = tar::Builder::new(encoder);
        for (entry, content) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(content.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder
                .append_data(&mut header, entry, content.as_bytes())
                .unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap();
        path
    }

    #[test]
    fn test_extract_strip_root() {
        let tmp = TempDir::new().unwrap();
        let archive = make_tarball(
            tmp.path(),
            "proj-9.1.0.tar.gz",
            &[
                ("proj-9.1.0/CMakeLists.txt", "project(proj)\n"),
                ("proj-9.1.0/src/proj.h", "// header\n"),
            ],
        );

        let dest = tmp.path().join("src");
        let count = extract_archive(&archive, &dest, true).unwrap();
        assert_eq!(count, 2);
        assert_eq!(
            fs::read_to_string(dest.join("CMakeLists.txt")).unwrap(),
            "project(proj)\n"
        );
        assert!(dest.join("src/proj.h").exists());
    }

    #[test]
    fn test_extract_keep_root() {
        let tmp = TempDir::new().unwrap();
        let archive = make_tarball(
            tmp.path(),
            "v8-src.tgz",
            &[("v8/BUILD.gn", "x"), ("depot_tools/gn", "y")],
        );

        let dest = tmp.path().join("src");
        extract_archive(&archive, &dest, false).unwrap();
        assert!(dest.join("v8/BUILD.gn").exists());
        assert!(dest.join("depot_tools/gn").exists());
    }

    #[test]
    fn test_entry_destination_refuses_escape() {
        assert!(entry_destination(Path::new("../etc/passwd"), false).is_err());
        assert!(entry_destination(Path::new("/etc/passwd"), false).is_err());
        assert_eq!(entry_destination(Path::new("root/"), true).unwrap(), None);
        assert_eq!(
            entry_destination(Path::new("./root/a/b"), true).unwrap(),
            Some(PathBuf::from("a/b"))
        );
    }

    #[test]
    fn test_check_symlink_target() {
        let lib = Path::new("lib/libproj.so");
        assert!(check_symlink_target(lib, Path::new("libproj.so.25")).is_ok());
        assert!(check_symlink_target(lib, Path::new("../include/proj.h")).is_ok());
        assert!(check_symlink_target(lib, Path::new("../../outside")).is_err());
        assert!(check_symlink_target(lib, Path::new("/etc/passwd")).is_err());
        assert!(check_symlink_target(Path::new("top"), Path::new("..")).is_err());
    }

    #[cfg(unix)]
    fn make_tarball_with_link(dir: &Path, link: &str, target: &str, files: &[(&str, &str)]) -> PathBuf {
        let path = dir.join("linked.tar.gz");
        let encoder = GzEncoder::new(File::create(&path).unwrap(), Compression::default());
        let mut builder = tar::Builder::new(encoder);

        let mut header = tar::Header::new_gnu();
        header.set_entry_type(tar::EntryType::Symlink);
        header.set_size(0);
        header.set_mode(0o777);
        builder.append_link(&mut header, link, target).unwrap();

        for (entry, content) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(content.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder
                .append_data(&mut header, entry, content.as_bytes())
                .unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap();
        path
    }

    #[cfg(unix)]
    #[test]
    fn test_extract_refuses_escaping_symlink() {
        let tmp = TempDir::new().unwrap();
        let archive = make_tarball_with_link(
            tmp.path(),
            "pkg/evil",
            "../../outside",
            &[("pkg/evil/payload", "gotcha")],
        );

        let dest = tmp.path().join("work").join("src");
        let err = extract_archive(&archive, &dest, true).unwrap_err();
        assert!(matches!(err, Error::PreparationError(_)), "{:?}", err);
        assert!(!tmp.path().join("outside").exists());
        assert!(!tmp.path().join("work").join("outside").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_extract_refuses_write_through_chained_symlink() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("chained.tar.gz");
        let encoder = GzEncoder::new(File::create(&path).unwrap(), Compression::default());
        let mut builder = tar::Builder::new(encoder);
        for (link, target) in [("pkg/x/up", ".."), ("pkg/y", "x/up/..")] {
            let mut header = tar::Header::new_gnu();
            header.set_entry_type(tar::EntryType::Symlink);
            header.set_size(0);
            header.set_mode(0o777);
            builder.append_link(&mut header, link, target).unwrap();
        }
        let mut header = tar::Header::new_gnu();
        header.set_size(6);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, "pkg/y/sub/payload", &b"gotcha"[..])
            .unwrap();
        builder.into_inner().unwrap().finish().unwrap();

        let dest = tmp.path().join("work").join("src");
        let err = extract_archive(&path, &dest, true).unwrap_err();
        assert!(matches!(err, Error::PreparationError(_)), "{:?}", err);
        assert!(!tmp.path().join("work").join("sub").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_extract_replaces_symlink_with_later_file() {
        let tmp = TempDir::new().unwrap();
        let archive = make_tarball_with_link(
            tmp.path(),
            "pkg/notes.txt",
            "real.txt",
            &[("pkg/real.txt", "keep"), ("pkg/notes.txt", "mine")],
        );

        let dest = tmp.path().join("src");
        extract_archive(&archive, &dest, true).unwrap();
        assert_eq!(fs::read_to_string(dest.join("real.txt")).unwrap(), "keep");
        assert_eq!(fs::read_to_string(dest.join("notes.txt")).unwrap(), "mine");
        assert!(!fs::symlink_metadata(dest.join("notes.txt")).unwrap().file_type().is_symlink());
    }

    #[test]
    fn test_extract_remaps_hard_link() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("hard.tar.gz");
        let encoder = GzEncoder::new(File::create(&path).unwrap(), Compression::default());
        let mut builder = tar::Builder::new(encoder);

        let mut header = tar::Header::new_gnu();
        header.set_size(3);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, "pkg/bin/proj", &b"elf"[..])
            .unwrap();

        let mut header = tar::Header::new_gnu();
        header.set_entry_type(tar::EntryType::Link);
        header.set_size(0);
        header.set_mode(0o644);
        builder
            .append_link(&mut header, "pkg/bin/cs2cs", "pkg/bin/proj")
            .unwrap();
        builder.into_inner().unwrap().finish().unwrap();

        let dest = tmp.path().join("src");
        assert_eq!(extract_archive(&path, &dest, true).unwrap(), 2);
        assert_eq!(fs::read_to_string(dest.join("bin/cs2cs")).unwrap(), "elf");
    }

    #[cfg(unix)]
    #[test]
    fn test_extract_keeps_internal_symlink() {
        let tmp = TempDir::new().unwrap();
        let archive = make_tarball_with_link(
            tmp.path(),
            "pkg/lib/libproj.so",
            "libproj.so.25",
            &[("pkg/lib/libproj.so.25", "elf")],
        );

        let dest = tmp.path().join("src");
        assert_eq!(extract_archive(&archive, &dest, true).unwrap(), 2);
        assert_eq!(fs::read_to_string(dest.join("lib/libproj.so")).unwrap(), "elf");
    }

    #[test]
    fn test_extract_archive_unknown_format() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("file.unknown");
        fs::write(&file, b"").unwrap();
        assert!(extract_archive(&file, tmp.path(), true).is_err());
    }

    #[test]
    fn test_checksum() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("empty");
        fs::write(&file, b"").unwrap();
        verify_file_checksum(
            &file,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855",
        )
        .unwrap();

        let err = verify_file_checksum(&file, "00").unwrap_err();
        assert!(matches!(err, Error::ChecksumMismatch { .. }));
    }

    #[test]
    fn test_download_local_path() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("a.tar.gz");
        fs::write(&src, b"data").unwrap();

        let dest = tmp.path().join("b.tar.gz");
        download_file(&format!("file://{}", src.display()), &dest).unwrap();
        assert_eq!(fs::read(&dest).unwrap(), b"data");

        let missing = download_file("/nonexistent/stockpot.tar.gz", &dest).unwrap_err();
        assert!(matches!(missing, Error::DownloadError(_)));
    }
}
