//! The labeled image corpus: `pharmaceutical_images/<class>/<category>/<image>`.

pub mod pairs;
pub mod split;
pub mod validate;

use crate::error::TrainingResult;
use crate::layout::ProjectLayout;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// File extensions counted as images, compared case-insensitively.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageClass {
    Authentic,
    Counterfeit,
}

impl ImageClass {
    pub const ALL: [Self; 2] = [Self::Authentic, Self::Counterfeit];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Authentic => "authentic",
            Self::Counterfeit => "counterfeit",
        }
    }
}

impl std::fmt::Display for ImageClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single labeled image.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatasetItem {
    pub path: PathBuf,
    pub category: String,
    pub class: ImageClass,
}

/// Items grouped by `(class, category)`.
pub type ItemsByCategory = BTreeMap<(ImageClass, String), Vec<DatasetItem>>;

#[must_use]
pub fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| IMAGE_EXTENSIONS.iter().any(|known| ext.eq_ignore_ascii_case(known)))
}

/// Category subdirectories of `class_dir`, sorted by name. A missing directory yields none.
pub fn list_categories(class_dir: &Path) -> TrainingResult<Vec<(String, PathBuf)>> {
    if !class_dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut out = Vec::new();
    for entry in WalkDir::new(class_dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(std::io::Error::from)?;
        if entry.file_type().is_dir() {
            out.push((entry.file_name().to_string_lossy().into_owned(), entry.into_path()));
        }
    }
    Ok(out)
}

/// Images directly inside `dir` (not recursive), sorted by name.
pub fn list_images(dir: &Path) -> TrainingResult<Vec<PathBuf>> {
    let mut out = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(std::io::Error::from)?;
        if entry.file_type().is_file() && is_image(entry.path()) {
            out.push(entry.into_path());
        }
    }
    Ok(out)
}

/// Every category of both classes with its items. Empty categories are kept with no items.
pub fn discover_items(layout: &ProjectLayout) -> TrainingResult<ItemsByCategory> {
    let mut items = ItemsByCategory::new();
    for class in ImageClass::ALL {
        for (category, dir) in list_categories(&layout.class_dir(class))? {
            let found = list_images(&dir)?
                .into_iter()
                .map(|path| {
                    Ok(DatasetItem {
                        path: std::path::absolute(path)?,
                        category: category.clone(),
                        class,
                    })
                })
                .collect::<std::io::Result<Vec<_>>>()?;
            items.insert((class, category), found);
        }
    }
    Ok(items)
}

/// All authentic and all counterfeit images, pooled across categories.
pub fn load_image_pools(layout: &ProjectLayout) -> TrainingResult<(Vec<PathBuf>, Vec<PathBuf>)> {
    let mut authentic = Vec::new();
    let mut counterfeit = Vec::new();
    for ((class, _), items) in discover_items(layout)? {
        let pool = match class {
            ImageClass::Authentic => &mut authentic,
            ImageClass::Counterfeit => &mut counterfeit,
        };
        pool.extend(items.into_iter().map(|item| item.path));
    }
    Ok((authentic, counterfeit))
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Create `count` empty image files under `<class>/<category>/`.
    pub fn populate(layout: &ProjectLayout, class: ImageClass, category: &str, count: usize) {
        let dir = layout.class_dir(class).join(category);
        std::fs::create_dir_all(&dir).unwrap();
        for i in 0..count {
            let contents = format!("{class}/{category}/{i}");
            std::fs::write(dir.join(format!("img_{i:03}.jpg")), contents).unwrap();
        }
    }
}
