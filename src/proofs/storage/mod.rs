// Copyright 2022-2024 Protocol Labs
// SPDX-License-Identifier: MIT

pub mod bundle;
pub mod generator;
pub mod layout;
pub mod slots;

pub use bundle::{encode_response, ProofInputObject, SlotWitness};
pub use generator::ProofAssembler;
pub use slots::{compute_mapping_slot, derive_slot, legacy_address_slot, version_slot};
