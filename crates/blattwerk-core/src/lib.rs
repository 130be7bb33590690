// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Blattwerk — Core types, job protocol, and error definitions shared across
// all crates.

pub mod config;
pub mod error;
pub mod human_errors;
pub mod pages;
pub mod protocol;
pub mod types;

pub use config::EngineConfig;
pub use error::{BlattwerkError, ErrorKind};
pub use pages::PageSelection;
pub use protocol::{EngineEvent, InputDocument, JobRequest};
pub use types::*;
