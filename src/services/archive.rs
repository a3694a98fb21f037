use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use tar::Archive;
use uuid::Uuid;
use zip::ZipArchive;

use crate::errors::{LauncherError, Result};
use crate::utils::file::copy_dir_merge;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ArchiveFormat {
    Zip,
    TarGz,
}

fn detect_format(path: &Path) -> Result<ArchiveFormat> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    if name.ends_with(".zip") {
        Ok(ArchiveFormat::Zip)
    } else if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
        Ok(ArchiveFormat::TarGz)
    } else {
        Err(LauncherError::Archive(format!(
            "unsupported archive type: {}",
            path.display()
        )))
    }
}

/// Unpacks `archive_path` into `dest_dir`.
///
/// Contents land in a scratch directory beside `dest_dir` first. A single
/// top-level folder is stripped, then the result is merged into `dest_dir`.
/// The archive is deleted only after the merge succeeds; the scratch
/// directory is removed either way.
pub fn extract_bundle(archive_path: &Path, dest_dir: &Path) -> Result<u64> {
    let format = detect_format(archive_path)?;
    let scratch = scratch_dir_for(dest_dir);
    fs::create_dir_all(&scratch)?;

    let result = unpack(format, archive_path, &scratch).and_then(|()| {
        let root = normalized_root(&scratch)?;
        Ok(copy_dir_merge(&root, dest_dir)?)
    });

    if let Err(err) = fs::remove_dir_all(&scratch) {
        tracing::warn!(scratch = %scratch.display(), error = %err, "failed to remove scratch dir");
    }

    let copied = result?;
    if let Err(err) = fs::remove_file(archive_path) {
        tracing::warn!(archive = %archive_path.display(), error = %err, "failed to remove archive");
    }
    tracing::info!(
        archive = %archive_path.display(),
        dest = %dest_dir.display(),
        files = copied,
        "bundle extracted"
    );
    Ok(copied)
}

fn scratch_dir_for(dest_dir: &Path) -> PathBuf {
    let name = dest_dir
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("bundle");
    let parent = dest_dir.parent().unwrap_or_else(|| Path::new("."));
    parent.join(format!(".{name}-extract-{}", Uuid::new_v4()))
}

/// The directory whose contents form the bundle: the only child of
/// `scratch` when that child is a directory, otherwise `scratch` itself.
pub fn normalized_root(scratch: &Path) -> io::Result<PathBuf> {
    let entries: Vec<fs::DirEntry> = fs::read_dir(scratch)?.collect::<io::Result<_>>()?;
    if let [only] = entries.as_slice() {
        if only.file_type()?.is_dir() {
            return Ok(only.path());
        }
    }
    Ok(scratch.to_path_buf())
}

fn unpack(format: ArchiveFormat, archive_path: &Path, target: &Path) -> Result<()> {
    let file = File::open(archive_path)?;
    match format {
        ArchiveFormat::Zip => unpack_zip(file, target),
        ArchiveFormat::TarGz => {
            let mut archive = Archive::new(GzDecoder::new(file));
            archive.set_preserve_permissions(true);
            archive
                .unpack(target)
                .map_err(|err| LauncherError::Archive(format!("tar extraction failed: {err}")))
        }
    }
}

fn unpack_zip(file: File, target: &Path) -> Result<()> {
    let mut archive = ZipArchive::new(file)?;
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let Some(relative) = entry.enclosed_name().map(|p| p.to_path_buf()) else {
            tracing::warn!(entry = entry.name(), "skipping unsafe zip entry");
            continue;
        };
        let out_path = target.join(relative);
        if entry.is_dir() {
            fs::create_dir_all(&out_path)?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&out_path)?;
        io::copy(&mut entry, &mut out)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = entry.unix_mode() {
                fs::set_permissions(&out_path, fs::Permissions::from_mode(mode))?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::temp_dir;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;
    use zip::write::FileOptions;

    fn write_zip(path: &Path, files: &[(&str, &[u8])]) {
        let file = File::create(path).expect("create zip");
        let mut writer = zip::ZipWriter::new(file);
        for (name, body) in files {
            writer
                .start_file(*name, FileOptions::default())
                .expect("start zip entry");
            writer.write_all(body).expect("write zip entry");
        }
        writer.finish().expect("finish zip");
    }

    fn write_tar_gz(path: &Path, files: &[(&str, &[u8])]) {
        let file = File::create(path).expect("create tar.gz");
        let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
        for (name, body) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(body.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder
                .append_data(&mut header, name, *body)
                .expect("append tar entry");
        }
        builder
            .into_inner()
            .expect("finish tar")
            .finish()
            .expect("finish gzip");
    }

    #[test]
    fn single_nested_folder_is_flattened() {
        let dir = temp_dir("archive");
        let archive = dir.join("bundle.tar.gz");
        write_tar_gz(&archive, &[("jcef-distrib/a", b"A"), ("jcef-distrib/b", b"B")]);
        let dest = dir.join("jcef-bundle");

        extract_bundle(&archive, &dest).expect("extract");

        assert_eq!(fs::read(dest.join("a")).expect("read a"), b"A");
        assert_eq!(fs::read(dest.join("b")).expect("read b"), b"B");
        assert!(!dest.join("jcef-distrib").exists());
        assert!(!archive.exists());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn flat_archive_is_copied_unchanged() {
        let dir = temp_dir("archive");
        let archive = dir.join("bundle.zip");
        write_zip(&archive, &[("a", b"A"), ("b", b"B")]);
        let dest = dir.join("jcef-bundle");

        extract_bundle(&archive, &dest).expect("extract");

        let mut names: Vec<String> = fs::read_dir(&dest)
            .expect("read dest")
            .map(|e| e.expect("entry").file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec!["a", "b"]);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn extraction_merges_and_cleans_scratch() {
        let dir = temp_dir("archive");
        let archive = dir.join("bundle.zip");
        write_zip(&archive, &[("root/lib/x.so", b"x"), ("root/jcef.jar", b"jar")]);
        let dest = dir.join("jcef-bundle");
        fs::create_dir_all(&dest).expect("create dest");
        fs::write(dest.join("local.cfg"), b"keep").expect("write existing file");

        extract_bundle(&archive, &dest).expect("extract");

        assert!(dest.join("lib").join("x.so").exists());
        assert!(dest.join("jcef.jar").exists());
        assert!(dest.join("local.cfg").exists());
        let leftovers: Vec<_> = fs::read_dir(&dir)
            .expect("read parent")
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().contains("-extract-"))
            .collect();
        assert!(leftovers.is_empty());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn corrupt_archive_is_kept_for_another_attempt() {
        let dir = temp_dir("archive");
        let archive = dir.join("bundle.tar.gz");
        fs::write(&archive, b"definitely not gzip").expect("write junk");
        let dest = dir.join("jcef-bundle");

        assert!(extract_bundle(&archive, &dest).is_err());
        assert!(archive.exists());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn normalized_root_only_strips_a_lone_directory() {
        let dir = temp_dir("archive");
        fs::create_dir_all(dir.join("only")).expect("create only");
        assert_eq!(normalized_root(&dir).expect("root"), dir.join("only"));

        fs::write(dir.join("sibling"), b"").expect("write sibling");
        assert_eq!(normalized_root(&dir).expect("root"), dir);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn unknown_extension_is_rejected() {
        assert!(detect_format(Path::new("bundle.rar")).is_err());
        assert_eq!(detect_format(Path::new("B.TGZ")).expect("tgz"), ArchiveFormat::TarGz);
    }
}
