// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Music theory referenced by the sequence model.
//!
//! Only what the model needs to validate and print scale and root note
//! selections lives here.

pub mod scale;

pub use scale::{print_root_note, print_scale, Note, Scale};
