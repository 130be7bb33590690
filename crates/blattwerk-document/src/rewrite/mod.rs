// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Rewrite module — decryption and structural recompression of PDFs.
//
// `engine` holds the file-oriented engine seam and its lopdf implementation;
// `adapter` wraps one shared engine behind async, byte-in/byte-out calls.

pub mod adapter;
pub mod engine;
