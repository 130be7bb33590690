// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF assembler — build a new document by copying pages, in a caller-chosen
// order, out of one or more source documents.
//
// Copying is deep: every object a page references (content streams, fonts,
// images, annotations) is copied into the target. A per-source import map
// makes shared resources land once, and keeps reference cycles finite.

use std::collections::HashMap;

use blattwerk_core::error::BlattwerkError;
use lopdf::{Dictionary, Document, Object, ObjectId, dictionary};
use tracing::{debug, instrument, warn};

use super::reader::PdfReader;

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE_ATTRIBUTES: [&[u8]; 4] = [b"MediaBox", b"CropBox", b"Resources", b"Rotate"];

/// Upper bound on page-tree depth when resolving inherited attributes.
const MAX_TREE_DEPTH: usize = 64;

/// Source object id → target object id, for one source document.
type ImportMap = HashMap<ObjectId, ObjectId>;

/// Accumulates pages into a fresh PDF.
pub struct PdfAssembler {
    target: Document,
    /// Reserved id of the target's root /Pages node.
    pages_id: ObjectId,
    kids: Vec<Object>,
}

impl Default for PdfAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfAssembler {
    pub fn new() -> Self {
        let mut target = Document::with_version("1.7");
        let pages_id = target.new_object_id();
        Self {
            target,
            pages_id,
            kids: Vec::new(),
        }
    }

    /// Number of pages appended so far.
    pub fn page_count(&self) -> usize {
        self.kids.len()
    }

    /// Append `page_numbers` (1-indexed) from `source`, in the given order.
    ///
    /// Links between appended pages survive; references to pages that are
    /// not part of this call become null.
    #[instrument(skip_all, fields(pages = page_numbers.len()))]
    pub fn append_pages(
        &mut self,
        source: &PdfReader,
        page_numbers: &[u32],
    ) -> Result<(), BlattwerkError> {
        let document = source.document();
        let mut imported = ImportMap::new();

        // Reserve target ids for every page first so cross-page references
        // resolve regardless of order.
        let mut planned = Vec::with_capacity(page_numbers.len());
        for &page_number in page_numbers {
            let page_id = source.page_id(page_number)?;
            let new_id = self.target.new_object_id();
            imported.entry(page_id).or_insert(new_id);
            planned.push((page_id, new_id));
        }

        for (page_id, new_id) in planned {
            let page = document
                .get_object(page_id)
                .and_then(Object::as_dict)
                .map_err(|err| {
                    BlattwerkError::PdfError(format!(
                        "cannot read page object {:?}: {}",
                        page_id, err
                    ))
                })?;

            let mut copy = Dictionary::new();
            for (key, value) in page.iter() {
                // The page tree is rebuilt; /Parent is patched below.
                if key == b"Parent" {
                    continue;
                }
                let value = import_value(document, &mut self.target, value, &mut imported)?;
                copy.set(key.clone(), value);
            }

            for key in INHERITABLE_ATTRIBUTES {
                if copy.get(key).is_ok() {
                    continue;
                }
                if let Some(value) = inherited_attribute(document, page, key) {
                    let value = import_value(document, &mut self.target, value, &mut imported)?;
                    copy.set(key.to_vec(), value);
                }
            }

            copy.set("Parent", Object::Reference(self.pages_id));
            self.target.objects.insert(new_id, Object::Dictionary(copy));
            self.kids.push(Object::Reference(new_id));
        }

        debug!(
            total_pages = self.kids.len(),
            objects_copied = imported.len(),
            "Pages appended"
        );
        Ok(())
    }

    /// Write the page tree and catalog, and serialise the document.
    pub fn finish(self) -> Result<Vec<u8>, BlattwerkError> {
        let Self {
            mut target,
            pages_id,
            kids,
        } = self;

        if kids.is_empty() {
            return Err(BlattwerkError::PdfError(
                "refusing to write a document with no pages".to_string(),
            ));
        }

        let count = kids.len() as i64;
        target.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );
        let catalog_id = target.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        target.trailer.set("Root", catalog_id);

        let mut output = Vec::new();
        target.save_to(&mut output).map_err(|err| {
            BlattwerkError::PdfError(format!("failed to serialise assembled PDF: {}", err))
        })?;

        debug!(pages = count, output_bytes = output.len(), "Assembly complete");
        Ok(output)
    }
}

// -- Object import --------------------------------------------------------------

/// Copy `value` into `target`, following references through `imported`.
fn import_value(
    source: &Document,
    target: &mut Document,
    value: &Object,
    imported: &mut ImportMap,
) -> Result<Object, BlattwerkError> {
    Ok(match value {
        Object::Reference(id) => match import_object(source, target, *id, imported)? {
            Some(new_id) => Object::Reference(new_id),
            None => Object::Null,
        },
        Object::Dictionary(dict) => {
            Object::Dictionary(import_dictionary(source, target, dict, imported)?)
        }
        Object::Array(items) => Object::Array(
            items
                .iter()
                .map(|item| import_value(source, target, item, imported))
                .collect::<Result<Vec<_>, _>>()?,
        ),
        Object::Stream(stream) => {
            let mut copy = stream.clone();
            copy.dict = import_dictionary(source, target, &stream.dict, imported)?;
            Object::Stream(copy)
        }
        // Booleans, numbers, strings, names, and null copy as-is.
        other => other.clone(),
    })
}

fn import_dictionary(
    source: &Document,
    target: &mut Document,
    dict: &Dictionary,
    imported: &mut ImportMap,
) -> Result<Dictionary, BlattwerkError> {
    let mut copy = Dictionary::new();
    for (key, value) in dict.iter() {
        copy.set(key.clone(), import_value(source, target, value, imported)?);
    }
    Ok(copy)
}

/// Copy the indirect object `id`, returning its id in `target`.
///
/// Returns `None` for dangling references and for page-tree nodes that were
/// not selected, which would otherwise drag the whole source tree along.
fn import_object(
    source: &Document,
    target: &mut Document,
    id: ObjectId,
    imported: &mut ImportMap,
) -> Result<Option<ObjectId>, BlattwerkError> {
    if let Some(existing) = imported.get(&id) {
        return Ok(Some(*existing));
    }

    let object = match source.get_object(id) {
        Ok(object) => object,
        Err(err) => {
            warn!(?id, %err, "Cannot resolve reference, using Null");
            return Ok(None);
        }
    };

    if is_page_tree_node(object) {
        return Ok(None);
    }

    // Register before recursing so cycles terminate.
    let new_id = target.new_object_id();
    imported.insert(id, new_id);
    let copy = import_value(source, target, object, imported)?;
    target.objects.insert(new_id, copy);
    Ok(Some(new_id))
}

fn is_page_tree_node(object: &Object) -> bool {
    object
        .as_dict()
        .and_then(|dict| dict.get(b"Type"))
        .and_then(Object::as_name)
        .map(|name| name == b"Page" || name == b"Pages")
        .unwrap_or(false)
}

/// Walk up the page tree looking for an inherited attribute.
fn inherited_attribute<'a>(
    document: &'a Document,
    page: &'a Dictionary,
    key: &[u8],
) -> Option<&'a Object> {
    let mut node = page;
    for _ in 0..MAX_TREE_DEPTH {
        let parent_id = node.get(b"Parent").and_then(Object::as_reference).ok()?;
        node = document.get_object(parent_id).and_then(Object::as_dict).ok()?;
        if let Ok(value) = node.get(key) {
            return Some(value);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::fixtures::{page_widths, sample_pdf};

    #[test]
    fn pages_keep_caller_order() {
        let reader = PdfReader::from_bytes(&sample_pdf(&[101, 102, 103, 104])).expect("load");
        let mut assembler = PdfAssembler::new();
        assembler.append_pages(&reader, &[4, 2]).expect("append");
        let output = assembler.finish().expect("finish");
        assert_eq!(page_widths(&output), vec![104, 102]);
    }

    #[test]
    fn pages_from_several_sources_are_concatenated() {
        let a = PdfReader::from_bytes(&sample_pdf(&[101, 102])).expect("load a");
        let b = PdfReader::from_bytes(&sample_pdf(&[201])).expect("load b");
        let mut assembler = PdfAssembler::new();
        assembler.append_pages(&b, &[1]).expect("append b");
        assembler.append_pages(&a, &[1, 2]).expect("append a");
        assert_eq!(assembler.page_count(), 3);
        let output = assembler.finish().expect("finish");
        assert_eq!(page_widths(&output), vec![201, 101, 102]);
    }

    #[test]
    fn shared_font_is_copied_once() {
        let reader = PdfReader::from_bytes(&sample_pdf(&[101, 102, 103])).expect("load");
        let mut assembler = PdfAssembler::new();
        assembler.append_pages(&reader, &[1, 2, 3]).expect("append");
        let output = assembler.finish().expect("finish");

        let doc = Document::load_mem(&output).expect("reload");
        let fonts = doc
            .objects
            .values()
            .filter(|object| {
                object
                    .as_dict()
                    .and_then(|dict| dict.get(b"Type"))
                    .and_then(Object::as_name)
                    .map(|name| name == b"Font")
                    .unwrap_or(false)
            })
            .count();
        assert_eq!(fonts, 1);
    }

    #[test]
    fn inherited_media_box_is_materialised() {
        // Build a document whose MediaBox lives on the /Pages node only.
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![Object::Reference(page_id)],
                "Count" => 1,
                "MediaBox" => vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(321),
                    Object::Integer(200),
                ],
            }),
        );
        let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
        doc.trailer.set("Root", catalog_id);
        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).expect("save");

        let reader = PdfReader::from_bytes(&bytes).expect("load");
        let mut assembler = PdfAssembler::new();
        assembler.append_pages(&reader, &[1]).expect("append");
        let output = assembler.finish().expect("finish");
        assert_eq!(page_widths(&output), vec![321]);
    }

    #[test]
    fn empty_assembly_is_refused() {
        assert!(PdfAssembler::new().finish().is_err());
    }
}
