// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Rewrite engine — a command runner over private working storage.
//
// Callers stage input under a name, run a command that reads one name and
// writes another, then read the result back. The default implementation is
// lopdf over a private temporary directory.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use blattwerk_core::error::BlattwerkError;
use lopdf::encryption::{self, DecryptionError, PasswordAlgorithm};
use lopdf::xref::XrefEntry;
use lopdf::{Document, EncryptionState, Object, ObjectId, ObjectStream, Reader};
use tempfile::TempDir;
use thiserror::Error;
use tracing::{debug, instrument, warn};

/// Failures reported by a rewrite engine.
#[derive(Debug, Error)]
pub enum RewriteError {
    /// The document is encrypted and the password was missing or wrong.
    #[error("invalid password: {0}")]
    InvalidPassword(String),

    #[error("{0}")]
    Failed(String),

    /// A command reported success but left nothing at the output name.
    #[error("no output produced at {0}")]
    MissingOutput(String),

    #[error("working storage: {0}")]
    Io(#[from] std::io::Error),
}

impl From<RewriteError> for BlattwerkError {
    fn from(err: RewriteError) -> Self {
        match err {
            RewriteError::InvalidPassword(detail) => BlattwerkError::PasswordProtected(detail),
            RewriteError::Io(io) => BlattwerkError::Io(io),
            other => BlattwerkError::Rewrite(other.to_string()),
        }
    }
}

/// Commands understood by a rewrite engine. Names refer to working storage.
#[derive(Clone, PartialEq, Eq)]
pub enum RewriteCommand {
    /// Remove encryption. An empty password still attempts the open.
    Decrypt {
        input: String,
        output: String,
        password: String,
    },
    /// Restructure objects and recompress streams.
    Recompress { input: String, output: String },
}

impl RewriteCommand {
    pub fn output(&self) -> &str {
        match self {
            Self::Decrypt { output, .. } | Self::Recompress { output, .. } => output,
        }
    }
}

// Passwords stay out of logs.
impl std::fmt::Debug for RewriteCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Decrypt { input, output, .. } => f
                .debug_struct("Decrypt")
                .field("input", input)
                .field("output", output)
                .finish_non_exhaustive(),
            Self::Recompress { input, output } => f
                .debug_struct("Recompress")
                .field("input", input)
                .field("output", output)
                .finish(),
        }
    }
}

/// The engine seam. Every call is blocking; async callers go through
/// [`RewriteAdapter`](super::adapter::RewriteAdapter).
pub trait RewriteEngine: Send + Sync {
    fn write_file(&self, name: &str, data: &[u8]) -> Result<(), RewriteError>;
    fn read_file(&self, name: &str) -> Result<Vec<u8>, RewriteError>;
    fn remove_file(&self, name: &str) -> Result<(), RewriteError>;
    fn run(&self, command: &RewriteCommand) -> Result<(), RewriteError>;
}

/// lopdf-backed engine whose working storage is a private temp directory,
/// deleted when the engine is dropped.
pub struct LopdfRewriteEngine {
    dir: TempDir,
}

impl LopdfRewriteEngine {
    /// Create the engine, placing its scratch directory under `parent` or the
    /// system temp directory.
    pub fn new(parent: Option<&Path>) -> Result<Self, RewriteError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("blattwerk-rewrite-");
        let dir = match parent {
            Some(parent) => builder.tempdir_in(parent)?,
            None => builder.tempdir()?,
        };
        debug!(path = %dir.path().display(), "Rewrite working storage created");
        Ok(Self { dir })
    }

    /// Location of the working storage.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    fn resolve(&self, name: &str) -> Result<PathBuf, RewriteError> {
        if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(RewriteError::Failed(format!(
                "invalid working file name: {name:?}"
            )));
        }
        Ok(self.dir.path().join(name))
    }

    fn decrypt(&self, input: &str, output: &str, password: &str) -> Result<(), RewriteError> {
        let data = fs::read(self.resolve(input)?)?;
        let shell = Document::load_mem(&data).map_err(|err| {
            let detail = err.to_string();
            if mentions_encryption(&detail) {
                RewriteError::InvalidPassword(detail)
            } else {
                RewriteError::Failed(format!("cannot open document: {detail}"))
            }
        })?;

        let mut document = if !shell.is_encrypted() {
            shell
        } else if shell.encryption_state.is_some() {
            // The loader already opened it with the empty user password.
            debug!("Document opened without a user password");
            shell
        } else {
            decrypt_with_password(&data, shell, password)?
        };
        strip_encryption(&mut document);

        if document.get_pages().is_empty() {
            return Err(RewriteError::Failed(
                "decrypted document has no pages".to_string(),
            ));
        }
        self.save(&mut document, output)
    }

    fn recompress(&self, input: &str, output: &str) -> Result<(), RewriteError> {
        let data = fs::read(self.resolve(input)?)?;
        let mut document = Document::load_mem(&data)
            .map_err(|err| RewriteError::Failed(format!("cannot open document: {err}")))?;
        if document.is_encrypted() {
            return Err(RewriteError::InvalidPassword(
                "document is still encrypted".to_string(),
            ));
        }

        let pruned = document.prune_objects().len();
        document.delete_zero_length_streams();
        document.renumber_objects();
        document.compress();
        debug!(pruned, "Document restructured");

        self.save(&mut document, output)
    }

    fn save(&self, document: &mut Document, output: &str) -> Result<(), RewriteError> {
        let mut file = fs::File::create(self.resolve(output)?)?;
        document
            .save_to(&mut file)
            .map_err(|err| RewriteError::Failed(format!("cannot write document: {err}")))?;
        Ok(())
    }
}

impl RewriteEngine for LopdfRewriteEngine {
    fn write_file(&self, name: &str, data: &[u8]) -> Result<(), RewriteError> {
        fs::write(self.resolve(name)?, data)?;
        Ok(())
    }

    fn read_file(&self, name: &str) -> Result<Vec<u8>, RewriteError> {
        let path = self.resolve(name)?;
        match fs::read(&path) {
            Ok(data) => Ok(data),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(RewriteError::MissingOutput(name.to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }

    fn remove_file(&self, name: &str) -> Result<(), RewriteError> {
        match fs::remove_file(self.resolve(name)?) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    #[instrument(skip(self))]
    fn run(&self, command: &RewriteCommand) -> Result<(), RewriteError> {
        let result = match command {
            RewriteCommand::Decrypt {
                input,
                output,
                password,
            } => self.decrypt(input, output, password),
            RewriteCommand::Recompress { input, output } => self.recompress(input, output),
        };
        if let Err(err) = &result {
            warn!(%err, "Rewrite command failed");
        }
        result
    }
}

// -- Decryption ---------------------------------------------------------------

/// Re-read every object of a user-password protected file and decrypt it.
///
/// The loader keeps only the `/Encrypt` dictionary of such files, so `shell`
/// supplies the cross-reference table and trailer while the objects are
/// parsed again from `data`.
fn decrypt_with_password(
    data: &[u8],
    shell: Document,
    password: &str,
) -> Result<Document, RewriteError> {
    let failed = |err: lopdf::Error| RewriteError::Failed(format!("cannot decrypt document: {err}"));

    let algorithm = PasswordAlgorithm::try_from(&shell).map_err(failed)?;
    let password = algorithm
        .sanitize_password(password)
        .map_err(|err| RewriteError::InvalidPassword(err.to_string()))?;
    // Only the user password derives the file key; an owner password would
    // authenticate but decrypt to noise.
    algorithm
        .authenticate_user_password(&shell, &password)
        .map_err(|err| match err {
            DecryptionError::IncorrectPassword => RewriteError::InvalidPassword(err.to_string()),
            other => RewriteError::Failed(format!("cannot decrypt document: {other}")),
        })?;
    let state = EncryptionState::decode(&shell, &password).map_err(failed)?;
    let encrypt_id = shell
        .trailer
        .get(b"Encrypt")
        .and_then(Object::as_reference)
        .map_err(failed)?;

    let ids: Vec<ObjectId> = shell
        .reference_table
        .entries
        .iter()
        .filter_map(|(&number, entry)| match *entry {
            XrefEntry::Normal { generation, .. } => Some((number, generation)),
            _ => None,
        })
        .filter(|id| *id != encrypt_id)
        .collect();

    let reader = Reader {
        buffer: data,
        document: shell,
        encryption_state: None,
        raw_objects: BTreeMap::new(),
    };
    let mut objects = BTreeMap::new();
    for id in ids {
        let mut object = match reader.get_object(id, &mut HashSet::new()) {
            Ok(object) => object,
            Err(err) => {
                debug!(object = ?id, %err, "Skipping unreadable object");
                continue;
            }
        };
        if let Err(err) = encryption::decrypt_object(&state, id, &mut object) {
            warn!(object = ?id, %err, "Object left as stored");
        }
        objects.insert(id, object);
    }

    // Objects packed in object streams only become readable once their
    // container is decrypted. Direct objects win over packed copies.
    let mut packed = BTreeMap::new();
    for object in objects.values_mut() {
        let Ok(stream) = object.as_stream_mut() else {
            continue;
        };
        if !stream.dict.has_type(b"ObjStm") {
            continue;
        }
        if let Ok(container) = ObjectStream::new(stream) {
            packed.extend(container.objects);
        }
    }
    for (id, object) in packed {
        objects.entry(id).or_insert(object);
    }

    let mut document = reader.document;
    document.objects = objects;
    document.encryption_state = Some(state);
    Ok(document)
}

/// Drop the `/Encrypt` trailer entry and the dictionary it points at.
fn strip_encryption(document: &mut Document) {
    if let Some(Object::Reference(id)) = document.trailer.remove(b"Encrypt") {
        document.objects.remove(&id);
    }
}

fn mentions_encryption(detail: &str) -> bool {
    let detail = detail.to_ascii_lowercase();
    ["password", "decrypt", "encrypt"]
        .iter()
        .any(|needle| detail.contains(needle))
}
