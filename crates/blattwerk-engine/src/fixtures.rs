// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Shared test doubles: generated PDFs and collaborator fakes.

use std::io::{Cursor, Read};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use blattwerk_core::config::EngineConfig;
use blattwerk_core::error::BlattwerkError;
use blattwerk_document::{
    DocumentLibrary, LopdfLibrary, PageSink, PageSource, RenderEngine, RenderedPage,
    RewriteAdapter, RewriteCommand, RewriteEngine, RewriteError,
};
use image::{DynamicImage, RgbaImage};
use lopdf::{
    Document, EncryptionState, EncryptionVersion, Object, Permissions, Stream, dictionary,
};
use tempfile::TempDir;

use crate::dispatcher::Dispatcher;

/// A PDF whose page `n` has MediaBox width `widths[n - 1]`.
pub fn sample_pdf(widths: &[i64]) -> Vec<u8> {
    save(&mut sample_document(widths))
}

/// `sample_pdf` behind a 128-bit RC4 user password.
pub fn encrypted_pdf(widths: &[i64], user_password: &str) -> Vec<u8> {
    let mut doc = sample_document(widths);
    doc.trailer.set(
        "ID",
        Object::Array(vec![
            Object::string_literal(b"blattwerk-engine".to_vec()),
            Object::string_literal(b"blattwerk-engine".to_vec()),
        ]),
    );
    let state = EncryptionState::try_from(EncryptionVersion::V2 {
        document: &doc,
        owner_password: "owner-secret",
        user_password,
        key_length: 128,
        permissions: Permissions::all(),
    })
    .expect("encryption state");
    doc.encrypt(&state).expect("encrypt fixture");
    save(&mut doc)
}

fn save(doc: &mut Document) -> Vec<u8> {
    let mut out = Vec::new();
    doc.save_to(&mut out).expect("save fixture");
    out
}

fn sample_document(widths: &[i64]) -> Document {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids = Vec::new();
    for width in widths {
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            format!("0 0 {width} 10 re f").into_bytes(),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(*width),
                Object::Integer(200),
            ],
            "Contents" => content_id,
        });
        kids.push(Object::Reference(page_id));
    }
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => widths.len() as i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
    doc.trailer.set("Root", catalog_id);
    doc
}

/// MediaBox widths of every page, in order.
pub fn page_widths(bytes: &[u8]) -> Vec<i64> {
    let doc = Document::load_mem(bytes).expect("load output");
    doc.get_pages()
        .values()
        .map(|id| {
            doc.get_object(*id)
                .and_then(Object::as_dict)
                .and_then(|page| page.get(b"MediaBox"))
                .and_then(Object::as_array)
                .and_then(|media_box| media_box[2].as_i64())
                .expect("page width")
        })
        .collect()
}

/// (name, data) pairs of an archive, read back with the `zip` crate.
pub fn archive_entries(bytes: &[u8]) -> Vec<(String, Vec<u8>)> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).expect("readable archive");
    (0..archive.len())
        .map(|index| {
            let mut file = archive.by_index(index).expect("entry");
            assert_eq!(file.compression(), zip::CompressionMethod::Stored);
            let name = file.name().to_string();
            let mut data = Vec::new();
            file.read_to_end(&mut data).expect("entry data");
            (name, data)
        })
        .collect()
}

/// Renders page `i` as a 2x2 image whose red channel is `i`; counts pages
/// through lopdf.
#[derive(Default)]
pub struct FakeRenderer {
    pub opens: AtomicUsize,
    pub renders: AtomicUsize,
}

impl RenderEngine for FakeRenderer {
    fn render_pages(
        &self,
        document: &[u8],
        scale: f32,
        sink: &mut PageSink<'_>,
    ) -> Result<u32, BlattwerkError> {
        assert!(scale > 0.0);
        self.opens.fetch_add(1, Ordering::SeqCst);
        let page_count = LopdfLibrary.page_count(document)?;
        for index in 0..page_count {
            self.renders.fetch_add(1, Ordering::SeqCst);
            sink(RenderedPage {
                index,
                page_count,
                image: DynamicImage::ImageRgba8(RgbaImage::from_pixel(
                    2,
                    2,
                    image::Rgba([index as u8, 0, 0, 255]),
                )),
            })?;
        }
        Ok(page_count)
    }
}

/// Library that records calls and delegates to lopdf.
#[derive(Default)]
pub struct CountingLibrary {
    pub calls: AtomicUsize,
}

impl DocumentLibrary for CountingLibrary {
    fn page_count(&self, document: &[u8]) -> Result<u32, BlattwerkError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        LopdfLibrary.page_count(document)
    }

    fn assemble(&self, sources: &[PageSource]) -> Result<Vec<u8>, BlattwerkError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        LopdfLibrary.assemble(sources)
    }
}

/// Rewrite engine that rejects every decrypt as a wrong password.
pub struct LockedEngine;

impl RewriteEngine for LockedEngine {
    fn write_file(&self, _name: &str, _data: &[u8]) -> Result<(), RewriteError> {
        Ok(())
    }

    fn read_file(&self, name: &str) -> Result<Vec<u8>, RewriteError> {
        Err(RewriteError::MissingOutput(name.to_string()))
    }

    fn remove_file(&self, _name: &str) -> Result<(), RewriteError> {
        Ok(())
    }

    fn run(&self, command: &RewriteCommand) -> Result<(), RewriteError> {
        match command {
            RewriteCommand::Decrypt { .. } => {
                Err(RewriteError::InvalidPassword("invalid password".to_string()))
            }
            RewriteCommand::Recompress { .. } => Ok(()),
        }
    }
}

/// Collaborators wired for tests. Keep the harness alive while dispatching:
/// it owns the rewrite engine's scratch directory.
pub struct Harness {
    pub dispatcher: Dispatcher,
    pub library: Arc<CountingLibrary>,
    pub renderer: Arc<FakeRenderer>,
    _scratch: TempDir,
}

pub fn harness() -> Harness {
    let scratch = tempfile::tempdir().expect("scratch dir");
    let config = EngineConfig {
        work_dir: Some(scratch.path().to_path_buf()),
        ..Default::default()
    };
    let library = Arc::new(CountingLibrary::default());
    let renderer = Arc::new(FakeRenderer::default());
    let dispatcher = Dispatcher::new(
        Arc::new(RewriteAdapter::lopdf(&config)),
        Arc::clone(&library) as Arc<dyn DocumentLibrary>,
        Arc::clone(&renderer) as Arc<dyn RenderEngine>,
        config,
    );
    Harness {
        dispatcher,
        library,
        renderer,
        _scratch: scratch,
    }
}

/// Dispatcher whose rewrite engine refuses every password.
pub fn locked_dispatcher() -> Dispatcher {
    Dispatcher::new(
        Arc::new(RewriteAdapter::new(|| {
            Ok(Arc::new(LockedEngine) as Arc<dyn RewriteEngine>)
        })),
        Arc::new(LopdfLibrary),
        Arc::new(FakeRenderer::default()),
        EngineConfig::default(),
    )
}
