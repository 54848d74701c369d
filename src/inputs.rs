use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::Result;

/// File extensions picked up from the input folder. Matching is exact, so
/// only the all-lower and all-upper spellings are accepted.
pub const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "bmp", "gif", "tiff", "JPG", "JPEG", "PNG", "BMP", "GIF", "TIFF",
];

pub fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext))
}

/// Image files directly inside `dir`, deduplicated and sorted. A missing
/// folder holds no images.
pub fn find_images(dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            tracing::warn!("input folder {} does not exist", dir.display());
            return Ok(vec![]);
        }
        Err(err) => return Err(err.into()),
    };

    let mut found = BTreeSet::new();

    for entry in entries {
        let path = entry?.path();
        if path.is_file() && has_image_extension(&path) {
            found.insert(path);
        }
    }

    Ok(found.into_iter().collect())
}

/// Create `dir` if needed. Returns `true` when it did not exist before.
pub fn ensure_output_dir(dir: impl AsRef<Path>) -> Result<bool> {
    let dir = dir.as_ref();
    if dir.is_dir() {
        return Ok(false);
    }

    std::fs::create_dir_all(dir)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(dir: &Path, name: &str) {
        std::fs::write(dir.join(name), b"").unwrap();
    }

    #[test]
    fn picks_known_extensions_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.png", "a.JPG", "c.tiff", "notes.txt", "d.Jpg", "e.gif", "noext"] {
            touch(dir.path(), name);
        }
        std::fs::create_dir(dir.path().join("nested.png")).unwrap();

        let names: Vec<_> = find_images(dir.path())
            .unwrap()
            .into_iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();

        assert_eq!(names, ["a.JPG", "b.png", "c.tiff", "e.gif"]);
    }

    #[test]
    fn empty_folder_yields_nothing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(find_images(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn missing_input_folder_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(find_images(dir.path().join("absent")).unwrap().is_empty());
    }

    #[test]
    fn input_path_that_is_a_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "images");
        assert!(find_images(dir.path().join("images")).is_err());
    }

    #[test]
    fn output_dir_created_once() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out").join("nested");

        assert!(ensure_output_dir(&out).unwrap());
        assert!(out.is_dir());
        assert!(!ensure_output_dir(&out).unwrap());
    }
}
