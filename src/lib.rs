// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Metascene-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Metascene and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Metascene: the core of a meta-model driven scene editor.
//!
//! A [`model::MetaModel`] describes which classes, relations, ports and attributes a scene type
//! admits. Scenes are edited through [`editor::Editor`], which keeps the instance graph
//! consistent, re-evaluates visual formulas and talks to the host through the traits in
//! [`host`].

pub mod config;
pub mod editor;
pub mod formula;
pub mod host;
pub mod interaction;
pub mod model;
pub mod ops;
pub mod query;
pub mod reactive;
pub mod store;
