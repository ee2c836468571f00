// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Metascene-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Metascene and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use super::value::AttributeValue;

/// One drawing instruction produced by a visual formula.
///
/// The renderer interprets `kind` (`box`, `sphere`, `text`, `model`, ...); the core only
/// stores and forwards commands.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DrawCommand {
    pub kind: SmolStr,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<SmolStr, AttributeValue>,
}

impl DrawCommand {
    pub fn new(kind: impl Into<SmolStr>) -> Self {
        Self {
            kind: kind.into(),
            params: BTreeMap::new(),
        }
    }

    pub fn with_param(mut self, key: impl Into<SmolStr>, value: impl Into<AttributeValue>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn param(&self, key: &str) -> Option<&AttributeValue> {
        self.params.get(key)
    }
}

/// The renderable appearance of an instance.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Visual {
    pub commands: Vec<DrawCommand>,
}

impl Visual {
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

/// A derived visual property.
///
/// `user_locked` marks a manual adjustment (e.g. a dragged label) that automatic
/// recomputation must keep verbatim until the user unlocks it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomVariable {
    pub value: AttributeValue,
    #[serde(default)]
    pub user_locked: bool,
}

impl CustomVariable {
    pub fn derived(value: impl Into<AttributeValue>) -> Self {
        Self {
            value: value.into(),
            user_locked: false,
        }
    }

    pub fn locked(value: impl Into<AttributeValue>) -> Self {
        Self {
            value: value.into(),
            user_locked: true,
        }
    }
}

/// Visual state carried by every renderable instance.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VisualState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub representation: Option<Visual>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub custom_variables: BTreeMap<SmolStr, CustomVariable>,
}

impl VisualState {
    /// Drops every custom variable that is not user-locked.
    pub fn clear_derived_variables(&mut self) {
        self.custom_variables.retain(|_, var| var.user_locked);
    }

    pub fn locked_variables(&self) -> impl Iterator<Item = (&SmolStr, &CustomVariable)> {
        self.custom_variables.iter().filter(|(_, var)| var.user_locked)
    }

    /// Sets a derived variable unless a locked one with the same name exists.
    ///
    /// Returns `false` when the write was suppressed by a lock.
    pub fn set_derived(&mut self, name: impl Into<SmolStr>, value: AttributeValue) -> bool {
        let name = name.into();
        match self.custom_variables.get_mut(&name) {
            Some(existing) if existing.user_locked => false,
            Some(existing) => {
                existing.value = value;
                true
            }
            None => {
                self.custom_variables.insert(name, CustomVariable::derived(value));
                true
            }
        }
    }
}
