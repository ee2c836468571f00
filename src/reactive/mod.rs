// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Metascene-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Metascene and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Reactions to instance changes: visual re-evaluation and hybrid algorithms.

pub mod hybrid;
pub mod viz;

use uuid::Uuid;

use crate::formula::FormulaError;
use crate::ops::OpsError;

pub use hybrid::{
    HybridAlgorithm, HybridContext, HybridDispatcher, HybridReport, ReferenceResolution,
    StateChangeSync, Trigger,
};
pub use viz::{
    check_for_viz_rep_update, refresh_all, refresh_visual, update_scene_visuals, BatchReport,
    VizOutcome,
};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum VizError {
    #[error(transparent)]
    Ops(#[from] OpsError),
    #[error("visual formula of {instance} failed: {source}")]
    Formula {
        instance: Uuid,
        #[source]
        source: FormulaError,
    },
}
