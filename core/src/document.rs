//! Typed searchable projections of tables and columns.

use crate::catalog::Catalog;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// An indexed text field.
///
/// `Document` is the name and comments joined by a newline, indexed as a
/// field of its own so that one conjunctive query can span both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Name,
    Comments,
    Document,
}

impl Field {
    pub const ALL: [Field; 3] = [Field::Name, Field::Comments, Field::Document];

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::Comments => "comments",
            Field::Document => "document",
        }
    }

    pub fn parse(s: &str) -> Option<Field> {
        match s.trim().to_ascii_lowercase().as_str() {
            "name" => Some(Field::Name),
            "comments" => Some(Field::Comments),
            "document" => Some(Field::Document),
            _ => None,
        }
    }
}

/// Stored fields returned with every hit. Reference fields are never tokenized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HitFields {
    pub name: String,
    pub comments: String,
    pub dataset_name: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub table_name: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none", default)]
    pub data_type: Option<String>,
}

pub trait Document: Send + Sync {
    /// Index name used in logs and errors.
    const KIND: &'static str;
    /// Fields this document type declares as searchable.
    const FIELDS: &'static [Field];

    fn id(&self) -> &str;
    fn text(&self, field: Field) -> Cow<'_, str>;
    fn hit_fields(&self) -> HitFields;
}

fn merged<'a>(name: &'a str, comments: &'a str) -> Cow<'a, str> {
    Cow::Owned(format!("{name}\n{comments}"))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDocument {
    pub id: String,
    pub name: String,
    pub comments: String,
    pub dataset_name: String,
}

impl Document for TableDocument {
    const KIND: &'static str = "tables";
    const FIELDS: &'static [Field] = &Field::ALL;

    fn id(&self) -> &str {
        &self.id
    }

    fn text(&self, field: Field) -> Cow<'_, str> {
        match field {
            Field::Name => Cow::Borrowed(&self.name),
            Field::Comments => Cow::Borrowed(&self.comments),
            Field::Document => merged(&self.name, &self.comments),
        }
    }

    fn hit_fields(&self) -> HitFields {
        HitFields {
            name: self.name.clone(),
            comments: self.comments.clone(),
            dataset_name: self.dataset_name.clone(),
            table_name: None,
            data_type: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDocument {
    pub id: String,
    pub name: String,
    pub comments: String,
    pub data_type: String,
    pub dataset_name: String,
    pub table_name: String,
}

impl Document for ColumnDocument {
    const KIND: &'static str = "columns";
    const FIELDS: &'static [Field] = &Field::ALL;

    fn id(&self) -> &str {
        &self.id
    }

    fn text(&self, field: Field) -> Cow<'_, str> {
        match field {
            Field::Name => Cow::Borrowed(&self.name),
            Field::Comments => Cow::Borrowed(&self.comments),
            Field::Document => merged(&self.name, &self.comments),
        }
    }

    fn hit_fields(&self) -> HitFields {
        HitFields {
            name: self.name.clone(),
            comments: self.comments.clone(),
            dataset_name: self.dataset_name.clone(),
            table_name: Some(self.table_name.clone()),
            data_type: Some(self.data_type.clone()),
        }
    }
}

pub fn project_tables(catalog: &Catalog) -> Vec<TableDocument> {
    catalog
        .tables()
        .map(|(dataset, table)| TableDocument {
            id: table.id.clone(),
            name: table.name.clone(),
            comments: table.comments.clone(),
            dataset_name: dataset.name.clone(),
        })
        .collect()
}

pub fn project_columns(catalog: &Catalog) -> Vec<ColumnDocument> {
    catalog
        .columns()
        .map(|(dataset, table, column)| ColumnDocument {
            id: column.id.clone(),
            name: column.name.clone(),
            comments: column.comments.clone(),
            data_type: column.data_type.clone(),
            dataset_name: dataset.name.clone(),
            table_name: table.name.clone(),
        })
        .collect()
}
