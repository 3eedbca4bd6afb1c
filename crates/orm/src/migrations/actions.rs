//! Action Codec - typed schema-change actions and their persisted records
//!
//! A migration file stores each action as `{ "method": ..., "params": ... }`.
//! [`ActionRecord`] is that record with an opaque payload; [`Action`] is the
//! closed set of typed actions. Decoding fails on an unknown method or a
//! payload that does not fit the method's parameter shape.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::error::{OrmError, OrmResult};

/// Persisted form of an action: method name plus opaque parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRecord {
    pub method: String,
    pub params: Value,
}

/// Action tag, as written in the `method` field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    AddTable,
    DeleteTable,
    AddColumn,
    DeleteColumn,
    AddPrimaryKey,
    DeletePrimaryKey,
    AddRelation,
    DeleteRelation,
    AddUniqueConstraint,
    DeleteUniqueConstraint,
}

impl ActionKind {
    pub const ALL: [ActionKind; 10] = [
        ActionKind::AddTable,
        ActionKind::DeleteTable,
        ActionKind::AddColumn,
        ActionKind::DeleteColumn,
        ActionKind::AddPrimaryKey,
        ActionKind::DeletePrimaryKey,
        ActionKind::AddRelation,
        ActionKind::DeleteRelation,
        ActionKind::AddUniqueConstraint,
        ActionKind::DeleteUniqueConstraint,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::AddTable => "addTable",
            ActionKind::DeleteTable => "deleteTable",
            ActionKind::AddColumn => "addColumn",
            ActionKind::DeleteColumn => "deleteColumn",
            ActionKind::AddPrimaryKey => "addPrimaryKey",
            ActionKind::DeletePrimaryKey => "deletePrimaryKey",
            ActionKind::AddRelation => "addRelation",
            ActionKind::DeleteRelation => "deleteRelation",
            ActionKind::AddUniqueConstraint => "addUniqueConstraint",
            ActionKind::DeleteUniqueConstraint => "deleteUniqueConstraint",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = OrmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActionKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| OrmError::decode(s, "unknown action method"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddTableParams {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeleteTableParams {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AddColumnParams {
    pub table: String,
    pub column: String,
    #[serde(rename = "type")]
    pub column_type: String,
    pub is_nullable: bool,
    /// Older files write `""` for "no default"
    #[serde(
        default,
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub default_value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeleteColumnParams {
    pub table: String,
    pub column: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddPrimaryKeyParams {
    pub table: String,
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeletePrimaryKeyParams {
    pub table: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AddRelationParams {
    pub table: String,
    pub name: String,
    pub columns: Vec<String>,
    pub referenced_table: String,
    pub referenced_columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeleteRelationParams {
    pub table: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddUniqueConstraintParams {
    pub table: String,
    pub name: String,
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeleteUniqueConstraintParams {
    pub table: String,
    pub name: String,
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|v| !v.is_empty()))
}

/// A decoded schema-change action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    AddTable(AddTableParams),
    DeleteTable(DeleteTableParams),
    AddColumn(AddColumnParams),
    DeleteColumn(DeleteColumnParams),
    AddPrimaryKey(AddPrimaryKeyParams),
    DeletePrimaryKey(DeletePrimaryKeyParams),
    AddRelation(AddRelationParams),
    DeleteRelation(DeleteRelationParams),
    AddUniqueConstraint(AddUniqueConstraintParams),
    DeleteUniqueConstraint(DeleteUniqueConstraintParams),
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::AddTable(_) => ActionKind::AddTable,
            Action::DeleteTable(_) => ActionKind::DeleteTable,
            Action::AddColumn(_) => ActionKind::AddColumn,
            Action::DeleteColumn(_) => ActionKind::DeleteColumn,
            Action::AddPrimaryKey(_) => ActionKind::AddPrimaryKey,
            Action::DeletePrimaryKey(_) => ActionKind::DeletePrimaryKey,
            Action::AddRelation(_) => ActionKind::AddRelation,
            Action::DeleteRelation(_) => ActionKind::DeleteRelation,
            Action::AddUniqueConstraint(_) => ActionKind::AddUniqueConstraint,
            Action::DeleteUniqueConstraint(_) => ActionKind::DeleteUniqueConstraint,
        }
    }

    /// Encode into the persisted record form.
    ///
    /// An empty default value is rejected: the record form cannot tell it
    /// apart from "no default", so it would not decode back to `self`.
    pub fn encode(&self) -> OrmResult<ActionRecord> {
        if let Action::AddColumn(p) = self {
            if p.default_value.as_deref() == Some("") {
                return Err(OrmError::Validation(format!(
                    "column {}.{} has an empty default value; use no default instead",
                    p.table, p.column
                )));
            }
        }

        let params = match self {
            Action::AddTable(p) => serde_json::to_value(p),
            Action::DeleteTable(p) => serde_json::to_value(p),
            Action::AddColumn(p) => serde_json::to_value(p),
            Action::DeleteColumn(p) => serde_json::to_value(p),
            Action::AddPrimaryKey(p) => serde_json::to_value(p),
            Action::DeletePrimaryKey(p) => serde_json::to_value(p),
            Action::AddRelation(p) => serde_json::to_value(p),
            Action::DeleteRelation(p) => serde_json::to_value(p),
            Action::AddUniqueConstraint(p) => serde_json::to_value(p),
            Action::DeleteUniqueConstraint(p) => serde_json::to_value(p),
        }
        .map_err(|e| OrmError::decode(self.kind().as_str(), format!("can't encode params: {}", e)))?;

        Ok(ActionRecord {
            method: self.kind().to_string(),
            params,
        })
    }
}

impl ActionRecord {
    /// Decode into a typed action, rejecting unknown methods and mismatched payloads
    pub fn decode(&self) -> OrmResult<Action> {
        let kind: ActionKind = self.method.parse()?;

        let action = match kind {
            ActionKind::AddTable => Action::AddTable(self.params()?),
            ActionKind::DeleteTable => Action::DeleteTable(self.params()?),
            ActionKind::AddColumn => Action::AddColumn(self.params()?),
            ActionKind::DeleteColumn => Action::DeleteColumn(self.params()?),
            ActionKind::AddPrimaryKey => Action::AddPrimaryKey(self.params()?),
            ActionKind::DeletePrimaryKey => Action::DeletePrimaryKey(self.params()?),
            ActionKind::AddRelation => Action::AddRelation(self.params()?),
            ActionKind::DeleteRelation => Action::DeleteRelation(self.params()?),
            ActionKind::AddUniqueConstraint => Action::AddUniqueConstraint(self.params()?),
            ActionKind::DeleteUniqueConstraint => Action::DeleteUniqueConstraint(self.params()?),
        };

        Ok(action)
    }

    fn params<T: for<'de> Deserialize<'de>>(&self) -> OrmResult<T> {
        T::deserialize(&self.params).map_err(|e| OrmError::decode(self.method.as_str(), e.to_string()))
    }
}

impl TryFrom<&ActionRecord> for Action {
    type Error = OrmError;

    fn try_from(record: &ActionRecord) -> Result<Self, Self::Error> {
        record.decode()
    }
}
