//! Reads a catalog directory: one dataset per `.yaml` / `.yml` / `.json` /
//! `.jsonl` file.
//!
//! The dataset name is the file stem. A YAML file is a stream of documents,
//! one table per document. A `.json` file holds an array of table objects (or
//! a single table object); a `.jsonl` file holds one table object per line.
//!
//! Dataset, table and column names are joined into ids with
//! [`ID_SEPARATOR`], so a name containing the separator is rejected.

use crate::catalog::{Dataset, Table, ID_SEPARATOR};
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Yaml,
    Json,
    JsonLines,
}

impl Format {
    fn of(path: &Path) -> Option<Format> {
        match path.extension().and_then(|s| s.to_str())? {
            "yaml" | "yml" => Some(Format::Yaml),
            "json" => Some(Format::Json),
            "jsonl" => Some(Format::JsonLines),
            _ => None,
        }
    }
}

pub fn load_catalog_dir<P: AsRef<Path>>(dir: P) -> Result<Vec<Dataset>> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        bail!("catalog directory not found: {}", dir.display());
    }

    let mut files: Vec<(PathBuf, Format)> = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.with_context(|| format!("reading {}", dir.display()))?;
        let p = entry.path();
        if let Some(format) = Format::of(p).filter(|_| p.is_file()) {
            files.push((p.to_path_buf(), format));
        }
    }

    let mut seen: HashSet<String> = HashSet::new();
    let mut datasets = Vec::with_capacity(files.len());
    for (file, format) in files {
        let name = match file.file_stem().and_then(|s| s.to_str()) {
            Some(stem) if !stem.is_empty() => stem.to_string(),
            _ => continue,
        };
        if !seen.insert(name.clone()) {
            bail!("duplicate dataset name {name:?} (from {})", file.display());
        }
        let tables = match format {
            Format::Yaml => read_yaml(&file)?,
            Format::Json => read_json(&file)?,
            Format::JsonLines => read_jsonl(&file)?,
        };
        check_names(&file, &tables)?;
        tracing::debug!(dataset = %name, tables = tables.len(), "loaded dataset");
        datasets.push(Dataset::new(name, tables));
    }
    tracing::info!(dir = %dir.display(), datasets = datasets.len(), "loaded catalog");
    Ok(datasets)
}

fn read_yaml(file: &Path) -> Result<Vec<Table>> {
    let text = fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;
    parse_yaml_tables(&text).with_context(|| format!("parsing {}", file.display()))
}

fn read_json(file: &Path) -> Result<Vec<Table>> {
    let text = fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;
    parse_tables(&text).with_context(|| format!("parsing {}", file.display()))
}

fn read_jsonl(file: &Path) -> Result<Vec<Table>> {
    let f = File::open(file).with_context(|| format!("opening {}", file.display()))?;
    let reader = BufReader::new(f);
    let mut tables = Vec::new();
    for (lineno, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("reading {} line {}", file.display(), lineno + 1))?;
        if line.trim().is_empty() {
            continue;
        }
        let table: Table = serde_json::from_str(&line).with_context(|| format!("parsing {} line {}", file.display(), lineno + 1))?;
        tables.push(table);
    }
    Ok(tables)
}

/// Parse a YAML stream holding one table per document. Empty documents are
/// skipped.
pub fn parse_yaml_tables(source: &str) -> Result<Vec<Table>> {
    let mut tables = Vec::new();
    for (n, document) in serde_yaml::Deserializer::from_str(source).enumerate() {
        if let Some(table) = Option::<Table>::deserialize(document).with_context(|| format!("document {}", n + 1))? {
            tables.push(table);
        }
    }
    Ok(tables)
}

fn check_names(file: &Path, tables: &[Table]) -> Result<()> {
    for table in tables {
        if table.name.contains(ID_SEPARATOR) {
            bail!("table name {:?} in {} contains {ID_SEPARATOR:?}", table.name, file.display());
        }
        if let Some(column) = table.columns.iter().find(|c| c.name.contains(ID_SEPARATOR)) {
            bail!("column name {:?} of table {:?} in {} contains {ID_SEPARATOR:?}", column.name, table.name, file.display());
        }
    }
    Ok(())
}

/// Parse a JSON document holding either an array of tables or one table.
pub fn parse_tables(source: &str) -> Result<Vec<Table>> {
    let json: serde_json::Value = serde_json::from_str(source)?;
    match json {
        serde_json::Value::Array(_) => Ok(serde_json::from_value(json)?),
        serde_json::Value::Object(_) => Ok(vec![serde_json::from_value(json)?]),
        serde_json::Value::Null => Ok(Vec::new()),
        other => bail!("expected a table object or an array of tables, found {other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn loads_json_and_jsonl_in_file_name_order() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("sales.json"),
            r#"[{"name":"orders","comments":"customer purchase records","columns":[{"name":"total","comments":"order total amount","type":"decimal"}]}]"#,
        )
        .unwrap();
        fs::write(dir.path().join("hr.jsonl"), "{\"name\":\"employees\"}\n\n{\"name\":\"salaries\",\"comments\":\"pay\"}\n").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let datasets = load_catalog_dir(dir.path()).unwrap();
        let names: Vec<&str> = datasets.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["hr", "sales"]);
        assert_eq!(datasets[0].tables.len(), 2);
        assert_eq!(datasets[1].tables[0].columns[0].data_type, "decimal");
    }

    #[test]
    fn loads_multi_document_yaml() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("sales.yaml"),
            "name: orders\ncomments: customer purchase records\ncolumns:\n  - name: total\n    comments: order total amount\n    type: decimal\n---\nname: refunds\n",
        )
        .unwrap();
        fs::write(dir.path().join("hr.yml"), "---\nname: employees\n").unwrap();

        let datasets = load_catalog_dir(dir.path()).unwrap();
        let names: Vec<&str> = datasets.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["hr", "sales"]);
        assert_eq!(datasets[0].tables.len(), 1);
        let sales = &datasets[1].tables;
        assert_eq!(sales.len(), 2);
        assert_eq!(sales[0].columns[0].data_type, "decimal");
        assert_eq!(sales[1].name, "refunds");
        assert!(sales[1].columns.is_empty());
    }

    #[test]
    fn rejects_names_containing_the_id_separator() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("ds.yaml"), "name: a/b\ncolumns:\n  - name: c\n").unwrap();
        let err = load_catalog_dir(dir.path()).unwrap_err();
        assert!(format!("{err:#}").contains("a/b"));

        fs::write(dir.path().join("ds.yaml"), "name: a\ncolumns:\n  - name: b/c\n").unwrap();
        let err = load_catalog_dir(dir.path()).unwrap_err();
        assert!(format!("{err:#}").contains("b/c"));
    }

    #[test]
    fn single_object_file_is_one_table() {
        let tables = parse_tables(r#"{"name":"orders"}"#).unwrap();
        assert_eq!(tables.len(), 1);
        assert!(parse_tables("42").is_err());
    }

    #[test]
    fn rejects_duplicate_dataset_names() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("sales.json"), "[]").unwrap();
        fs::write(dir.path().join("sales.jsonl"), "").unwrap();
        let err = load_catalog_dir(dir.path()).unwrap_err();
        assert!(err.to_string().contains("duplicate dataset name"));
    }

    #[test]
    fn parse_errors_name_the_file() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("broken.json"), "[{\"comments\": 1}]").unwrap();
        let err = load_catalog_dir(dir.path()).unwrap_err();
        assert!(format!("{err:#}").contains("broken.json"));

        let dir = tempdir().unwrap();
        fs::write(dir.path().join("hr.jsonl"), b"{\"name\":\"a\xff\"}\n").unwrap();
        let err = load_catalog_dir(dir.path()).unwrap_err();
        assert!(format!("{err:#}").contains("hr.jsonl line 1"));

        let dir = tempdir().unwrap();
        fs::write(dir.path().join("ops.yaml"), "name: jobs\n---\nname: [unclosed\n").unwrap();
        let err = load_catalog_dir(dir.path()).unwrap_err();
        assert!(format!("{err:#}").contains("ops.yaml"));
    }

    #[test]
    fn missing_directory_is_an_error() {
        assert!(load_catalog_dir("/definitely/not/here").is_err());
    }
}
