//! Dataset → table → column hierarchy.
//!
//! Entities are deserialized without ids; [`Catalog::new`] assigns the
//! composite ids once, joining one path segment per level with
//! [`ID_SEPARATOR`]: `sales`, `sales/orders`, `sales/orders/total`.

use serde::{Deserialize, Serialize};

pub const ID_SEPARATOR: &str = "/";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    #[serde(default, skip_deserializing)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub comments: String,
    #[serde(rename = "type", default)]
    pub data_type: String,
}

impl Column {
    pub fn new(name: impl Into<String>, comments: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self { id: String::new(), name: name.into(), comments: comments.into(), data_type: data_type.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    #[serde(default, skip_deserializing)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub comments: String,
    #[serde(default)]
    pub columns: Vec<Column>,
}

impl Table {
    pub fn new(name: impl Into<String>, comments: impl Into<String>, columns: Vec<Column>) -> Self {
        Self { id: String::new(), name: name.into(), comments: comments.into(), columns }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dataset {
    pub id: String,
    pub name: String,
    pub tables: Vec<Table>,
}

impl Dataset {
    pub fn new(name: impl Into<String>, tables: Vec<Table>) -> Self {
        Self { id: String::new(), name: name.into(), tables }
    }
}

pub fn join_id(parent: &str, name: &str) -> String {
    format!("{parent}{ID_SEPARATOR}{name}")
}

/// Immutable catalog snapshot with ids assigned.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    datasets: Vec<Dataset>,
}

impl Catalog {
    pub fn new(mut datasets: Vec<Dataset>) -> Self {
        for dataset in datasets.iter_mut() {
            dataset.id = dataset.name.clone();
            for table in dataset.tables.iter_mut() {
                table.id = join_id(&dataset.id, &table.name);
                for column in table.columns.iter_mut() {
                    column.id = join_id(&table.id, &column.name);
                }
            }
        }
        Self { datasets }
    }

    pub fn datasets(&self) -> &[Dataset] {
        &self.datasets
    }

    pub fn dataset(&self, name: &str) -> Option<&Dataset> {
        self.datasets.iter().find(|d| d.name == name)
    }

    pub fn dataset_names(&self) -> Vec<String> {
        self.datasets.iter().map(|d| d.name.clone()).collect()
    }

    /// Table names of one dataset, `None` when the dataset is unknown.
    pub fn table_names(&self, dataset: &str) -> Option<Vec<String>> {
        self.dataset(dataset).map(|d| d.tables.iter().map(|t| t.name.clone()).collect())
    }

    pub fn table(&self, dataset: &str, table: &str) -> Option<&Table> {
        self.dataset(dataset)?.tables.iter().find(|t| t.name == table)
    }

    pub fn tables(&self) -> impl Iterator<Item = (&Dataset, &Table)> {
        self.datasets.iter().flat_map(|d| d.tables.iter().map(move |t| (d, t)))
    }

    pub fn columns(&self) -> impl Iterator<Item = (&Dataset, &Table, &Column)> {
        self.tables().flat_map(|(d, t)| t.columns.iter().map(move |c| (d, t, c)))
    }

    pub fn num_tables(&self) -> usize {
        self.datasets.iter().map(|d| d.tables.len()).sum()
    }

    pub fn num_columns(&self) -> usize {
        self.tables().map(|(_, t)| t.columns.len()).sum()
    }
}
