//! CSV reading and writing for datasets.
//!
//! Reserved columns (label, group, fold, weight, prediction) and the
//! `probability_<class>` columns map onto [`Row`] fields. Every other column is
//! a numeric feature.

use crate::core::error::{FoldEvalError, Result};
use crate::core::types::*;
use crate::dataset::{Dataset, DatasetConfig, Row};

use csv::{ReaderBuilder, StringRecord, Trim, WriterBuilder};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

/// Column positions resolved from a header row.
#[derive(Debug, Clone, Default)]
pub struct CsvLayout {
    /// Label column position
    pub label: usize,
    /// Group column position
    pub group: Option<usize>,
    /// Fold column position
    pub fold: Option<usize>,
    /// Weight column position
    pub weight: Option<usize>,
    /// Prediction column position
    pub prediction: Option<usize>,
    /// Probability column positions, indexed by class id
    pub probabilities: Vec<usize>,
    /// Feature column positions and names
    pub features: Vec<(usize, String)>,
}

impl CsvLayout {
    /// Resolve column positions from `headers`.
    pub fn from_headers(headers: &StringRecord, config: &DatasetConfig) -> Result<Self> {
        let find = |name: &str| headers.iter().position(|h| h == name);

        let label = find(config.label_column.as_str()).ok_or_else(|| {
            FoldEvalError::data_loading(format!(
                "label column '{}' not found in header",
                config.label_column
            ))
        })?;

        let mut probability_columns: Vec<(ClassId, usize)> = headers
            .iter()
            .enumerate()
            .filter_map(|(i, h)| config.probability_class(h).map(|class| (class, i)))
            .collect();
        probability_columns.sort_unstable();
        for (expected, &(class, _)) in probability_columns.iter().enumerate() {
            if class as usize != expected {
                return Err(FoldEvalError::data_loading(format!(
                    "probability columns must cover classes 0..{} without gaps, missing {}{}",
                    probability_columns.len(),
                    config.probability_prefix,
                    expected
                )));
            }
        }

        let reserved = config.reserved_columns();
        let features = headers
            .iter()
            .enumerate()
            .filter(|(_, h)| !reserved.contains(h) && config.probability_class(h).is_none())
            .map(|(i, h)| (i, h.to_string()))
            .collect();

        Ok(CsvLayout {
            label,
            group: find(config.group_column.as_str()),
            fold: find(config.fold_column.as_str()),
            weight: find(config.weight_column.as_str()),
            prediction: find(config.prediction_column.as_str()),
            probabilities: probability_columns.into_iter().map(|(_, i)| i).collect(),
            features,
        })
    }

    fn parse_row(&self, record: &StringRecord, line: usize) -> Result<Row> {
        let field = |i: usize| record.get(i).unwrap_or("").trim();
        let optional = |i: Option<usize>| i.map(field).filter(|v| !v.is_empty());

        let label = parse_class_id(field(self.label), line, "label")?;

        let features = self
            .features
            .iter()
            .map(|(i, name)| parse_f64(field(*i), line, name))
            .collect::<Result<Vec<_>>>()?;

        let probability = if self.probabilities.is_empty()
            || self.probabilities.iter().all(|&i| field(i).is_empty())
        {
            None
        } else {
            Some(
                self.probabilities
                    .iter()
                    .map(|&i| parse_f64(field(i), line, "probability"))
                    .collect::<Result<Vec<_>>>()?,
            )
        };

        Ok(Row {
            label,
            features,
            group_key: self.group.map(|i| GroupKey::parse(field(i))).unwrap_or_default(),
            weight: optional(self.weight)
                .map(|v| parse_f64(v, line, "weight"))
                .transpose()?,
            fold: optional(self.fold)
                .map(|v| parse_class_id(v, line, "fold").map(|f| f as FoldIndex))
                .transpose()?,
            prediction: optional(self.prediction)
                .map(|v| parse_class_id(v, line, "prediction"))
                .transpose()?,
            probability,
        })
    }
}

fn parse_f64(raw: &str, line: usize, column: &str) -> Result<f64> {
    raw.parse::<f64>().map_err(|_| {
        FoldEvalError::data_loading(format!(
            "line {}: column '{}' has non-numeric value '{}'",
            line, column, raw
        ))
    })
}

/// Accepts `3` as well as `3.0`, since upstream tools often store labels as floats.
fn parse_class_id(raw: &str, line: usize, column: &str) -> Result<ClassId> {
    if let Ok(value) = raw.parse::<ClassId>() {
        return Ok(value);
    }
    let value = parse_f64(raw, line, column)?;
    if value >= 0.0 && value.fract() == 0.0 && value <= ClassId::MAX as f64 {
        Ok(value as ClassId)
    } else {
        Err(FoldEvalError::data_loading(format!(
            "line {}: column '{}' must be a non-negative integer, got '{}'",
            line, column, raw
        )))
    }
}

/// Read a dataset from any CSV source with a header row.
pub fn read_csv<R: Read>(reader: R, config: &DatasetConfig) -> Result<Dataset> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .delimiter(config.delimiter as u8)
        .trim(Trim::All)
        .from_reader(reader);

    let headers = reader.headers()?.clone();
    let layout = CsvLayout::from_headers(&headers, config)?;

    let mut rows = Vec::new();
    for (i, record) in reader.records().enumerate() {
        // header is line 1
        rows.push(layout.parse_row(&record?, i + 2)?);
    }

    let names = layout.features.into_iter().map(|(_, name)| name).collect();
    Dataset::with_feature_names(rows, names)
}

/// Load a dataset from a CSV file.
pub fn load_csv<P: AsRef<Path>>(path: P, config: &DatasetConfig) -> Result<Dataset> {
    let path = path.as_ref();
    log::info!("Loading CSV file: {}", path.display());

    if !path.is_file() {
        return Err(FoldEvalError::data_loading(format!(
            "File does not exist: {}",
            path.display()
        )));
    }

    let dataset = read_csv(File::open(path)?, config)?;
    log::info!(
        "Loaded {} rows with {} features",
        dataset.len(),
        dataset.feature_names().len()
    );
    Ok(dataset)
}

/// Write `dataset` as CSV. Optional columns are only emitted when at least
/// one row carries them.
pub fn write_csv<W: Write>(dataset: &Dataset, writer: W, config: &DatasetConfig) -> Result<()> {
    let rows = dataset.rows();
    let has_group = rows.iter().any(|r| !r.group_key.is_none());
    let has_fold = rows.iter().any(|r| r.fold.is_some());
    let has_weight = rows.iter().any(|r| r.weight.is_some());
    let has_prediction = rows.iter().any(|r| r.prediction.is_some());
    let num_probabilities = rows
        .iter()
        .filter_map(|r| r.probability.as_ref().map(Vec::len))
        .max()
        .unwrap_or(0);

    let mut writer = WriterBuilder::new()
        .delimiter(config.delimiter as u8)
        .from_writer(writer);

    let mut header: Vec<String> = dataset.feature_names().to_vec();
    header.push(config.label_column.clone());
    if has_group {
        header.push(config.group_column.clone());
    }
    if has_fold {
        header.push(config.fold_column.clone());
    }
    if has_weight {
        header.push(config.weight_column.clone());
    }
    if has_prediction {
        header.push(config.prediction_column.clone());
    }
    for class in 0..num_probabilities {
        header.push(format!("{}{}", config.probability_prefix, class));
    }
    writer.write_record(&header)?;

    let or_blank = |v: Option<String>| v.unwrap_or_default();
    for row in rows {
        let mut record: Vec<String> = row.features.iter().map(|v| v.to_string()).collect();
        record.push(row.label.to_string());
        if has_group {
            record.push(row.group_key.to_string());
        }
        if has_fold {
            record.push(or_blank(row.fold.map(|f| f.to_string())));
        }
        if has_weight {
            record.push(or_blank(row.weight.map(|w| w.to_string())));
        }
        if has_prediction {
            record.push(or_blank(row.prediction.map(|p| p.to_string())));
        }
        for class in 0..num_probabilities {
            record.push(or_blank(row.probability_of(class as ClassId).map(|p| p.to_string())));
        }
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(())
}
