use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use image::RgbaImage;

use crate::error::TileError;

/// Shared handle to one tileset source image.
///
/// A bitmap starts out pending (not decoded) and becomes ready when the
/// owner calls [`Bitmap::load`].  Every load bumps a version counter, which
/// is how the texture array notices new contents without any callback.
/// Clones share the same image and the same identity.
#[derive(Clone, Debug)]
pub struct Bitmap {
    id: u64,
    inner: Rc<RefCell<BitmapInner>>,
}

#[derive(Debug, Default)]
struct BitmapInner {
    image: Option<Rc<RgbaImage>>,
    version: u64,
}

/// Identity plus content version of a bitmap.  Two distinct bitmaps never
/// share a revision, even when both are at the same version.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Revision {
    pub id: u64,
    pub version: u64,
}

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

impl Default for Bitmap {
    fn default() -> Self {
        Self {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            inner: Rc::default(),
        }
    }
}

impl Bitmap {
    /// A bitmap whose image has not been decoded yet.
    pub fn pending() -> Self {
        Self::default()
    }

    pub fn from_image(image: RgbaImage) -> Self {
        let bitmap = Self::pending();
        bitmap.load(image);
        bitmap
    }

    /// Replace the image contents and bump the version.
    pub fn load(&self, image: RgbaImage) {
        let mut inner = self.inner.borrow_mut();
        inner.image = Some(Rc::new(image));
        inner.version += 1;
    }

    pub fn is_ready(&self) -> bool {
        self.inner.borrow().image.is_some()
    }

    /// Monotonic content version; `0` until the first load.
    pub fn version(&self) -> u64 {
        self.inner.borrow().version
    }

    pub fn revision(&self) -> Revision {
        Revision { id: self.id, version: self.version() }
    }

    /// Current image, if decoded.
    pub fn image(&self) -> Option<Rc<RgbaImage>> {
        self.inner.borrow().image.clone()
    }

    /// Pixel dimensions, if decoded.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.inner.borrow().image.as_ref().map(|img| img.dimensions())
    }
}

/// Decode up to `max` PNG tilesets from `dir`, in file-name order.
///
/// Index `n` of the result is tileset set number `n`.
pub fn load_folder(dir: &Path, max: usize) -> Result<Vec<Bitmap>, TileError> {
    let mut paths: Vec<_> = walkdir::WalkDir::new(dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().and_then(|s| s.to_str()) == Some("png"))
        .collect();
    if paths.is_empty() {
        return Err(TileError::EmptyTilesetFolder(dir.to_path_buf()));
    }
    paths.sort();
    if paths.len() > max {
        log::warn!("{} tilesets found in {dir:?}; only the first {max} are used", paths.len());
        paths.truncate(max);
    }

    paths
        .into_iter()
        .map(|path| {
            let image = image::open(&path)
                .map_err(|source| TileError::Image { path: path.clone(), source })?
                .to_rgba8();
            log::info!("tileset {:?} loaded ({}x{})", path, image.width(), image.height());
            Ok(Bitmap::from_image(image))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_bitmap_has_version_zero() {
        let b = Bitmap::pending();
        assert!(!b.is_ready());
        assert_eq!(b.version(), 0);
        assert!(b.dimensions().is_none());
    }

    #[test]
    fn load_is_visible_through_clones() {
        let b = Bitmap::pending();
        let c = b.clone();
        b.load(RgbaImage::new(4, 2));
        assert!(c.is_ready());
        assert_eq!(c.version(), 1);
        assert_eq!(c.dimensions(), Some((4, 2)));
        b.load(RgbaImage::new(4, 2));
        assert_eq!(c.version(), 2);
    }

    #[test]
    fn fresh_bitmaps_at_the_same_version_differ_in_revision() {
        let a = Bitmap::from_image(RgbaImage::new(2, 2));
        let b = Bitmap::from_image(RgbaImage::new(2, 2));
        assert_eq!(a.version(), b.version());
        assert_ne!(a.revision(), b.revision());
        assert_eq!(a.clone().revision(), a.revision());
    }

    #[test]
    fn load_folder_reads_pngs_in_name_order() {
        let dir = std::env::temp_dir().join(format!("tilebatch_load_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        RgbaImage::new(8, 4).save(dir.join("b.png")).unwrap();
        RgbaImage::new(2, 2).save(dir.join("a.png")).unwrap();
        std::fs::write(dir.join("notes.txt"), "skip").unwrap();

        let sets = load_folder(&dir, 9).unwrap();
        assert_eq!(sets.len(), 2);
        assert_eq!(sets[0].dimensions(), Some((2, 2)));
        assert_eq!(sets[1].dimensions(), Some((8, 4)));

        let capped = load_folder(&dir, 1).unwrap();
        assert_eq!(capped.len(), 1);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn load_folder_without_pngs_is_an_error() {
        let dir = std::env::temp_dir().join(format!("tilebatch_empty_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let err = load_folder(&dir, 9).unwrap_err();
        assert!(matches!(err, TileError::EmptyTilesetFolder(_)));
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
