// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Metascene-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Metascene and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Read-only queries over scene instances.
//!
//! Lookups never mutate and never allocate ids; `validate` reports structural problems.

pub mod lookup;
pub mod validate;

pub use lookup::{find_in_scene, find_instance, InstanceMut, InstanceRef};
pub use validate::{validate_scene, Issue};
