use anyhow::{Context, Result};
use image::imageops::FilterType;
use psylab_core::{ImageId, ImageSource, PsylabError};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Decoded straight-RGBA pixels, already scaled to the image box.
pub struct DecodedImage {
    pub rgba: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Image files found under a directory, in lexicographic path order.
///
/// `ImageId(i)` names the i-th path.
#[derive(Debug, Clone)]
pub struct ImageLibrary {
    dir: PathBuf,
    suffix: String,
    paths: Vec<PathBuf>,
}

impl ImageLibrary {
    /// Recursively collects files whose extension equals `suffix`, ignoring
    /// case. A missing directory yields an empty library.
    pub fn scan(dir: impl AsRef<Path>, suffix: &str) -> psylab_core::Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        let suffix = suffix.trim_start_matches('.').to_string();
        let mut paths = Vec::new();
        if dir.is_dir() {
            collect(&dir, &suffix, &mut paths).map_err(|e| {
                PsylabError::ImageSource(format!("cannot scan {}: {e}", dir.display()))
            })?;
        }
        paths.sort();
        Ok(Self { dir, suffix, paths })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Decodes every image and fits it inside `bounds`, keeping its aspect
    /// ratio. Output order matches [`ImageLibrary::paths`].
    pub fn decode_scaled(&self, bounds: (u32, u32)) -> Result<Vec<DecodedImage>> {
        self.paths
            .iter()
            .map(|path| {
                let img = image::open(path)
                    .with_context(|| format!("failed to decode {}", path.display()))?;
                let scaled = img.resize(bounds.0, bounds.1, FilterType::Triangle).to_rgba8();
                let (width, height) = scaled.dimensions();
                Ok(DecodedImage {
                    rgba: scaled.into_raw(),
                    width,
                    height,
                })
            })
            .collect()
    }
}

impl ImageSource for ImageLibrary {
    fn list_images(&mut self) -> psylab_core::Result<Vec<ImageId>> {
        Ok((0..self.paths.len()).map(ImageId).collect())
    }
}

fn collect(dir: &Path, suffix: &str, out: &mut Vec<PathBuf>) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            collect(&path, suffix, out)?;
        } else if has_suffix(&path, suffix) {
            out.push(path);
        }
    }
    Ok(())
}

fn has_suffix(path: &Path, suffix: &str) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(suffix))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("psylab-images-{name}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn scan_is_recursive_sorted_and_case_insensitive() {
        let dir = scratch("scan");
        fs::create_dir_all(dir.join("b/nested")).unwrap();
        for file in ["c.jpg", "a.JPG", "b/nested/d.jpg", "notes.txt", "e.jpeg"] {
            fs::write(dir.join(file), b"").unwrap();
        }

        let mut library = ImageLibrary::scan(&dir, ".jpg").unwrap();
        let names: Vec<PathBuf> = library
            .paths()
            .iter()
            .map(|p| p.strip_prefix(&dir).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            names,
            vec![
                PathBuf::from("a.JPG"),
                PathBuf::from("b/nested/d.jpg"),
                PathBuf::from("c.jpg"),
            ]
        );
        assert_eq!(library.suffix(), "jpg");
        assert_eq!(
            library.list_images().unwrap(),
            vec![ImageId(0), ImageId(1), ImageId(2)]
        );
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_directory_is_empty() {
        let dir = std::env::temp_dir().join(format!("psylab-missing-{}", std::process::id()));
        let mut library = ImageLibrary::scan(&dir, "jpg").unwrap();
        assert!(library.is_empty());
        assert!(library.list_images().unwrap().is_empty());
    }

    #[test]
    fn decoded_images_fit_the_box_with_aspect_kept() {
        let dir = scratch("decode");
        image::RgbaImage::from_pixel(40, 20, image::Rgba([10, 20, 30, 255]))
            .save(dir.join("wide.png"))
            .unwrap();

        let library = ImageLibrary::scan(&dir, "png").unwrap();
        let decoded = library.decode_scaled((10, 10)).unwrap();
        assert_eq!(decoded.len(), 1);
        assert_eq!((decoded[0].width, decoded[0].height), (10, 5));
        assert_eq!(decoded[0].rgba.len(), 10 * 5 * 4);
        assert_eq!(decoded[0].rgba[3], 255);
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn undecodable_files_fail_with_their_path() {
        let dir = scratch("broken");
        fs::write(dir.join("broken.jpg"), b"not a jpeg").unwrap();
        let library = ImageLibrary::scan(&dir, "jpg").unwrap();
        let err = library.decode_scaled((10, 10)).err().unwrap();
        assert!(err.to_string().contains("broken.jpg"));
        fs::remove_dir_all(&dir).ok();
    }
}
