//! Forcing exported pages to landscape geometry.
//!
//! Some LibreOffice builds ignore `IsLandscape` when exporting and write
//! portrait page boxes. Only the page boundary is rewritten here; the page
//! content is not re-laid out.

use std::path::{Path, PathBuf};

use lopdf::{Document, Object, ObjectId};
use thiserror::Error;
use tracing::{debug, info, warn};

/// A4 landscape in points.
pub const LANDSCAPE_WIDTH_PT: f32 = 841.89;
pub const LANDSCAPE_HEIGHT_PT: f32 = 595.28;

/// Bound on `/Parent` hops when resolving inherited attributes.
const MAX_INHERITANCE_DEPTH: usize = 32;

#[derive(Debug, Error)]
enum OrientationError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("malformed {0}")]
    Malformed(&'static str),
}

/// Rewrites every portrait page of `pdf` to A4 landscape, in place.
///
/// Never fails: on any error the file is left as it was and a warning is
/// logged. A PDF without portrait pages is not rewritten at all.
pub async fn correct_orientation(pdf: &Path) {
    let path = pdf.to_path_buf();
    let outcome = tokio::task::spawn_blocking(move || rewrite_file(&path)).await;
    match outcome {
        Ok(Ok(0)) => debug!(pdf = %pdf.display(), "all pages already landscape"),
        Ok(Ok(pages)) => info!(pdf = %pdf.display(), pages, "rewrote portrait pages to landscape"),
        Ok(Err(e)) => warn!(pdf = %pdf.display(), error = %e, "orientation correction skipped"),
        Err(e) => warn!(pdf = %pdf.display(), error = %e, "orientation correction task failed"),
    }
}

fn rewrite_file(path: &Path) -> Result<usize, OrientationError> {
    let bytes = std::fs::read(path)?;
    let mut doc = Document::load_mem(&bytes)?;
    let rewritten = rewrite_portrait_pages(&mut doc)?;
    if rewritten == 0 {
        return Ok(0);
    }

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let mut staged = tempfile::NamedTempFile::new_in(&dir)?;
    doc.save_to(&mut staged)?;
    std::fs::set_permissions(staged.path(), std::fs::metadata(path)?.permissions())?;
    staged.persist(path).map_err(|e| e.error)?;
    Ok(rewritten)
}

/// Replaces the MediaBox (and CropBox, when present) of every page whose box
/// is taller than it is wide. `/Rotate` is not consulted. Returns the number
/// of pages changed.
pub fn rewrite_portrait_pages(doc: &mut Document) -> lopdf::Result<usize> {
    let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();
    let mut rewritten = 0;

    for page_id in page_ids {
        let Some((width, height)) = media_box_size(doc, page_id) else {
            debug!(?page_id, "page without a usable MediaBox");
            continue;
        };
        if height <= width {
            continue;
        }

        let page = doc.get_dictionary_mut(page_id)?;
        page.set("MediaBox", landscape_box());
        if page.has(b"CropBox") {
            page.set("CropBox", landscape_box());
        }
        rewritten += 1;
    }
    Ok(rewritten)
}

fn landscape_box() -> Object {
    Object::Array(vec![
        Object::Integer(0),
        Object::Integer(0),
        Object::Real(LANDSCAPE_WIDTH_PT),
        Object::Real(LANDSCAPE_HEIGHT_PT),
    ])
}

fn media_box_size(doc: &Document, page_id: ObjectId) -> Option<(f32, f32)> {
    let media_box = inherited(doc, page_id, b"MediaBox")?;
    box_size(doc, media_box).ok()
}

/// A page attribute, looked up through the `/Parent` chain.
fn inherited<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut dict = doc.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_INHERITANCE_DEPTH {
        if let Ok(value) = dict.get(key) {
            return resolve(doc, value);
        }
        let parent = dict.get(b"Parent").ok()?.as_reference().ok()?;
        dict = doc.get_dictionary(parent).ok()?;
    }
    None
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

fn box_size(doc: &Document, media_box: &Object) -> Result<(f32, f32), OrientationError> {
    let Object::Array(coords) = media_box else {
        return Err(OrientationError::Malformed("MediaBox"));
    };
    if coords.len() != 4 {
        return Err(OrientationError::Malformed("MediaBox"));
    }
    let mut values = [0.0f32; 4];
    for (slot, obj) in values.iter_mut().zip(coords) {
        *slot = resolve(doc, obj)
            .and_then(extract_number)
            .ok_or(OrientationError::Malformed("MediaBox"))?;
    }
    let [x0, y0, x1, y1] = values;
    Ok(((x1 - x0).abs(), (y1 - y0).abs()))
}

fn extract_number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{Dictionary, Stream};

    fn document(boxes: &[(f32, f32)], rotate: Option<i64>) -> Document {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        let mut kids = Vec::new();
        for &(w, h) in boxes {
            let content_id = doc.add_object(Stream::new(Dictionary::new(), Vec::new()));
            let mut page = Dictionary::new();
            page.set("Type", Object::Name(b"Page".to_vec()));
            page.set("Parent", Object::Reference(pages_id));
            page.set(
                "MediaBox",
                Object::Array(vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Real(w),
                    Object::Real(h),
                ]),
            );
            page.set("Contents", Object::Reference(content_id));
            if let Some(rotate) = rotate {
                page.set("Rotate", Object::Integer(rotate));
            }
            kids.push(Object::Reference(doc.add_object(page)));
        }
        let mut pages = Dictionary::new();
        pages.set("Type", Object::Name(b"Pages".to_vec()));
        pages.set("Count", Object::Integer(boxes.len() as i64));
        pages.set("Kids", Object::Array(kids));
        doc.objects.insert(pages_id, Object::Dictionary(pages));

        let mut catalog = Dictionary::new();
        catalog.set("Type", Object::Name(b"Catalog".to_vec()));
        catalog.set("Pages", Object::Reference(pages_id));
        let catalog_id = doc.add_object(catalog);
        doc.trailer.set("Root", Object::Reference(catalog_id));
        doc
    }

    fn sizes(doc: &Document) -> Vec<(f32, f32)> {
        doc.get_pages()
            .into_values()
            .map(|id| media_box_size(doc, id).unwrap())
            .collect()
    }

    #[test]
    fn test_portrait_pages_become_landscape() {
        let mut doc = document(&[(595.28, 841.89), (841.89, 595.28)], None);
        assert_eq!(rewrite_portrait_pages(&mut doc).unwrap(), 1);
        for (w, h) in sizes(&doc) {
            assert!(w > h, "{w} x {h}");
        }
    }

    #[test]
    fn test_rotate_does_not_change_box_check() {
        let mut doc = document(&[(841.89, 595.28)], Some(90));
        assert_eq!(rewrite_portrait_pages(&mut doc).unwrap(), 0);

        let mut doc = document(&[(595.28, 841.89)], Some(270));
        assert_eq!(rewrite_portrait_pages(&mut doc).unwrap(), 1);
        let page_id = *doc.get_pages().values().next().unwrap();
        let page = doc.get_dictionary(page_id).unwrap();
        assert_eq!(page.get(b"Rotate").unwrap().as_i64().unwrap(), 270);
        let (w, h) = sizes(&doc)[0];
        assert!(w > h, "{w} x {h}");
    }

    #[tokio::test]
    async fn test_rotated_landscape_file_is_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("turned.pdf");
        document(&[(841.89, 595.28)], Some(90)).save(&path).unwrap();
        let before = std::fs::read(&path).unwrap();

        correct_orientation(&path).await;

        assert_eq!(std::fs::read(&path).unwrap(), before);
    }

    #[test]
    fn test_inherited_media_box() {
        let mut doc = document(&[(841.89, 595.28)], None);
        let page_id = *doc.get_pages().values().next().unwrap();
        let pages_id = doc
            .get_dictionary(page_id)
            .unwrap()
            .get(b"Parent")
            .unwrap()
            .as_reference()
            .unwrap();
        doc.get_dictionary_mut(page_id).unwrap().remove(b"MediaBox");
        doc.get_dictionary_mut(pages_id).unwrap().set(
            "MediaBox",
            Object::Array(vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(612),
                Object::Integer(792),
            ]),
        );

        assert_eq!(rewrite_portrait_pages(&mut doc).unwrap(), 1);
        assert!(doc.get_dictionary(page_id).unwrap().has(b"MediaBox"));
    }

    #[tokio::test]
    async fn test_landscape_file_is_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wide.pdf");
        document(&[(841.89, 595.28)], None).save(&path).unwrap();
        let before = std::fs::read(&path).unwrap();

        correct_orientation(&path).await;

        assert_eq!(std::fs::read(&path).unwrap(), before);
    }

    #[tokio::test]
    async fn test_portrait_file_is_rewritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tall.pdf");
        document(&[(595.28, 841.89)], None).save(&path).unwrap();

        correct_orientation(&path).await;

        let doc = Document::load(&path).unwrap();
        let sizes = sizes(&doc);
        assert_eq!(sizes.len(), 1);
        let (w, h) = sizes[0];
        assert!((w - LANDSCAPE_WIDTH_PT).abs() < 0.01);
        assert!((h - LANDSCAPE_HEIGHT_PT).abs() < 0.01);
    }

    #[tokio::test]
    async fn test_garbage_is_left_as_is() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, b"definitely not a pdf").unwrap();

        correct_orientation(&path).await;

        assert_eq!(std::fs::read(&path).unwrap(), b"definitely not a pdf");
    }
}
