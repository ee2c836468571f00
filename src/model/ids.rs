// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Metascene-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Metascene and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

/// A stable identifier used across the meta model, the instance graph and scene files.
///
/// Every id is a UUID. The tag parameter only keeps e.g. class ids and port-instance ids
/// apart at compile time; on the wire all ids are plain hyphenated UUID strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Id<T> {
    value: Uuid,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Id<T> {
    pub fn from_uuid(value: Uuid) -> Self {
        Self {
            value,
            _marker: PhantomData,
        }
    }

    /// Allocates a new time-ordered id (UUID v7).
    pub fn fresh() -> Self {
        Self::from_uuid(Uuid::now_v7())
    }

    pub fn parse(value: &str) -> Result<Self, IdError> {
        Uuid::parse_str(value)
            .map(Self::from_uuid)
            .map_err(|source| IdError {
                value: value.to_owned(),
                source,
            })
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.value
    }

    pub fn into_uuid(self) -> Uuid {
        self.value
    }

    /// Reinterprets the id under another tag.
    ///
    /// Used by lookups that receive an id of unknown kind.
    pub fn retag<U>(self) -> Id<U> {
        Id::from_uuid(self.value)
    }
}

impl<T> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.value, f)
    }
}

impl<T> FromStr for Id<T> {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl<T> AsRef<Uuid> for Id<T> {
    fn as_ref(&self) -> &Uuid {
        &self.value
    }
}

impl<T> From<Uuid> for Id<T> {
    fn from(value: Uuid) -> Self {
        Self::from_uuid(value)
    }
}

impl<T> Serialize for Id<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.value.serialize(serializer)
    }
}

impl<'de, T> Deserialize<'de> for Id<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Uuid::deserialize(deserializer).map(Self::from_uuid)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid id {value:?}: {source}")]
pub struct IdError {
    value: String,
    #[source]
    source: uuid::Error,
}

impl IdError {
    pub fn value(&self) -> &str {
        &self.value
    }
}

macro_rules! id_tags {
    ($($tag:ident => $alias:ident),* $(,)?) => {
        $(
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
            pub enum $tag {}
            pub type $alias = Id<$tag>;
        )*
    };
}

id_tags! {
    SceneTypeIdTag => SceneTypeId,
    ClassIdTag => ClassId,
    RelationclassIdTag => RelationclassId,
    PortIdTag => PortId,
    AttributeIdTag => AttributeId,
    AttributeTypeIdTag => AttributeTypeId,
    RoleIdTag => RoleId,
    SceneInstanceIdTag => SceneInstanceId,
    ClassInstanceIdTag => ClassInstanceId,
    RelationclassInstanceIdTag => RelationclassInstanceId,
    PortInstanceIdTag => PortInstanceId,
    AttributeInstanceIdTag => AttributeInstanceId,
    RoleInstanceIdTag => RoleInstanceId,
    TableRowIdTag => TableRowId,
}
