use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use image::imageops::FilterType;
use log::debug;

use crate::data::dataset::Dataset;
use crate::data::sample::{ImageShape, Sample};
use crate::data::transform::Transform;
use crate::error::{Result, TrainError};

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "gif"];

/// Labelled images laid out as `root/<class>/<image>`.
///
/// Class directories are sorted by name and numbered from 0. Images are
/// listed up front and decoded lazily in `get`: resized to `shape`,
/// converted to grayscale or RGB, scaled to [0, 1], flattened
/// channel-major, and passed through the transforms in order.
pub struct ImageFolder {
    root: PathBuf,
    shape: ImageShape,
    classes: Vec<String>,
    entries: Vec<(PathBuf, usize)>,
    transforms: Vec<Box<dyn Transform>>,
}

impl ImageFolder {
    pub fn open(root: impl AsRef<Path>, shape: ImageShape) -> Result<Self> {
        shape.validate()?;
        let root = root.as_ref().to_path_buf();

        let class_dirs = sorted_paths(read_paths(&root)?, |path| path.is_dir())?;

        let mut classes = Vec::with_capacity(class_dirs.len());
        let mut entries = Vec::new();
        for (label, dir) in class_dirs.iter().enumerate() {
            let name = dir.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
            let files = sorted_paths(read_paths(dir)?, |path| {
                path.is_file() && has_image_extension(path)
            })?;
            debug!("class {label} '{name}': {} images", files.len());
            entries.extend(files.into_iter().map(|path| (path, label)));
            classes.push(name);
        }

        if entries.is_empty() {
            return Err(TrainError::EmptyDataset("image folder"));
        }
        Ok(ImageFolder { root, shape, classes, entries, transforms: Vec::new() })
    }

    /// Appends a transform applied after decoding.
    pub fn with_transform(mut self, transform: impl Transform + 'static) -> Self {
        self.transforms.push(Box::new(transform));
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Class names in label order.
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn shape(&self) -> ImageShape {
        self.shape
    }

    fn decode(&self, path: &Path) -> Result<Vec<f64>> {
        let img = image::open(path).map_err(|source| TrainError::Image {
            path: path.to_path_buf(),
            source,
        })?;
        let resized = img.resize_exact(self.shape.width, self.shape.height, FilterType::Triangle);

        Ok(if self.shape.channels == 1 {
            resized.to_luma8().pixels().map(|p| p.0[0] as f64 / 255.0).collect()
        } else {
            let rgb = resized.to_rgb8();
            let plane = self.shape.plane();
            let mut out = vec![0.0; 3 * plane];
            for (i, p) in rgb.pixels().enumerate() {
                for c in 0..3 {
                    out[c * plane + i] = p.0[c] as f64 / 255.0;
                }
            }
            out
        })
    }
}

impl Dataset for ImageFolder {
    fn len(&self) -> usize {
        self.entries.len()
    }

    fn get(&self, index: usize) -> Result<Sample> {
        let (path, label) = self.entries.get(index)
            .ok_or(TrainError::IndexOutOfBounds { index, len: self.entries.len() })?;
        let mut input = self.decode(path)?;
        for transform in &self.transforms {
            transform.apply(&mut input, self.shape)?;
        }
        Ok(Sample { input, label: *label })
    }
}

fn read_paths(dir: &Path) -> io::Result<impl Iterator<Item = io::Result<PathBuf>>> {
    Ok(fs::read_dir(dir)?.map(|entry| entry.map(|e| e.path())))
}

/// Keeps the paths accepted by `keep`, sorted. The first unreadable entry
/// aborts the listing so labels never shift silently.
fn sorted_paths<I, F>(entries: I, keep: F) -> Result<Vec<PathBuf>>
where
    I: IntoIterator<Item = io::Result<PathBuf>>,
    F: Fn(&Path) -> bool,
{
    let mut paths = Vec::new();
    for entry in entries {
        let path = entry?;
        if keep(&path) {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}
