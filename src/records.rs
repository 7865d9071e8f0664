//! Delimited text tables exchanged with the outside world: the feature
//! table written by a batch, the hand-counted ground truth, and the joined
//! training dataset.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::calibration::TrainingDataset;
use crate::error::{Error, Result};
use crate::models::FeatureRecord;

pub const FEATURE_HEADER: [&str; 3] = [
    "image filename",
    "front facing kernel count",
    "avg width/height ratio",
];
pub const FEATURE_DELIM: char = '|';
pub const QUOTE_CHAR: char = '/';
pub const GROUND_TRUTH_DELIM: char = ',';
/// Column of the ground-truth table holding the full kernel count.
pub const FULL_COUNT_COLUMN: usize = 3;

fn quote_field(field: &str, delim: char) -> String {
    if field.contains(delim) || field.contains(QUOTE_CHAR) || field.contains('\n') {
        let doubled = field.replace(QUOTE_CHAR, &format!("{QUOTE_CHAR}{QUOTE_CHAR}"));
        format!("{QUOTE_CHAR}{doubled}{QUOTE_CHAR}")
    } else {
        field.to_string()
    }
}

/// Split one line, honoring `/`-quoted fields with doubled quotes inside.
fn split_record(line: &str, delim: char, line_no: usize) -> Result<Vec<String>> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut chars = line.chars().peekable();
    let mut quoted = false;
    while let Some(c) = chars.next() {
        if quoted {
            if c == QUOTE_CHAR {
                if chars.peek() == Some(&QUOTE_CHAR) {
                    field.push(QUOTE_CHAR);
                    chars.next();
                } else {
                    quoted = false;
                }
            } else {
                field.push(c);
            }
        } else if c == QUOTE_CHAR && field.is_empty() {
            quoted = true;
        } else if c == delim {
            fields.push(std::mem::take(&mut field));
        } else {
            field.push(c);
        }
    }
    if quoted {
        return Err(Error::MalformedRecord {
            line: line_no,
            reason: "unterminated quoted field".into(),
        });
    }
    fields.push(field);
    Ok(fields)
}

fn parse_field<T: std::str::FromStr>(fields: &[String], column: usize, line: usize) -> Result<T> {
    let raw = fields.get(column).ok_or_else(|| Error::MalformedRecord {
        line,
        reason: format!("missing column {column}"),
    })?;
    raw.trim().parse().map_err(|_| Error::MalformedRecord {
        line,
        reason: format!("cannot parse '{raw}' in column {column}"),
    })
}

pub fn write_features<W: Write>(writer: W, records: &[FeatureRecord]) -> Result<()> {
    let mut w = BufWriter::new(writer);
    let header: Vec<String> = FEATURE_HEADER.iter().map(|h| quote_field(h, FEATURE_DELIM)).collect();
    writeln!(w, "{}", header.join(&FEATURE_DELIM.to_string()))?;
    for r in records {
        writeln!(
            w,
            "{}{d}{}{d}{}",
            quote_field(&r.image, FEATURE_DELIM),
            r.visible_count,
            r.avg_ratio,
            d = FEATURE_DELIM
        )?;
    }
    w.flush()?;
    Ok(())
}

pub fn read_features<R: Read>(reader: R) -> Result<Vec<FeatureRecord>> {
    let mut records = Vec::new();
    for (i, line) in BufReader::new(reader).lines().enumerate().skip(1) {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let fields = split_record(&line, FEATURE_DELIM, i + 1)?;
        let image = fields[0].clone();
        let visible_count = parse_field(&fields, 1, i + 1)?;
        let avg_ratio = parse_field(&fields, 2, i + 1)?;
        records.push(FeatureRecord::new(image, visible_count, avg_ratio));
    }
    Ok(records)
}

pub fn save_features<P: AsRef<Path>>(path: P, records: &[FeatureRecord]) -> Result<()> {
    write_features(File::create(path)?, records)
}

pub fn load_features<P: AsRef<Path>>(path: P) -> Result<Vec<FeatureRecord>> {
    read_features(File::open(path)?)
}

/// Hand-counted totals keyed by corn ear number.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroundTruth {
    counts: BTreeMap<u32, f64>,
}

impl GroundTruth {
    pub fn get(&self, ear: u32) -> Option<f64> {
        self.counts.get(&ear).copied()
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Parses a comma-separated table with a header row. Column 0 is the
    /// ear number and column 3 the full count.
    pub fn read<R: Read>(reader: R) -> Result<Self> {
        let mut counts = BTreeMap::new();
        for (i, line) in BufReader::new(reader).lines().enumerate().skip(1) {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let fields = split_record(&line, GROUND_TRUTH_DELIM, i + 1)?;
            let ear: u32 = parse_field(&fields, 0, i + 1)?;
            let full: f64 = parse_field(&fields, FULL_COUNT_COLUMN, i + 1)?;
            if counts.insert(ear, full).is_some() {
                return Err(Error::MalformedRecord {
                    line: i + 1,
                    reason: format!("duplicate corn ID {ear}"),
                });
            }
        }
        Ok(Self { counts })
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::read(File::open(path)?)
    }

    /// Copy of `record` carrying its hand-counted total.
    pub fn label(&self, record: &FeatureRecord) -> Result<FeatureRecord> {
        let ear = record.ear_number()?;
        let full = self.get(ear).ok_or_else(|| Error::MissingGroundTruth {
            ear,
            image: record.image.clone(),
        })?;
        Ok(FeatureRecord {
            full_count: Some(full),
            ..record.clone()
        })
    }
}

impl FromIterator<(u32, f64)> for GroundTruth {
    fn from_iter<I: IntoIterator<Item = (u32, f64)>>(iter: I) -> Self {
        Self {
            counts: iter.into_iter().collect(),
        }
    }
}

/// One row per example: features then the full count, no header.
pub fn write_dataset<W: Write>(writer: W, dataset: &TrainingDataset) -> Result<()> {
    let mut w = BufWriter::new(writer);
    for (features, target) in dataset.examples() {
        let row: Vec<String> = features
            .iter()
            .chain(std::iter::once(target))
            .map(|v| v.to_string())
            .collect();
        writeln!(w, "{}", row.join(","))?;
    }
    w.flush()?;
    Ok(())
}

pub fn read_dataset<R: Read>(reader: R) -> Result<TrainingDataset> {
    let mut rows: Vec<(Vec<f64>, f64)> = Vec::new();
    for (i, line) in BufReader::new(reader).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let fields = split_record(&line, ',', i + 1)?;
        let values = (0..fields.len())
            .map(|c| parse_field::<f64>(&fields, c, i + 1))
            .collect::<Result<Vec<f64>>>()?;
        let Some((&target, features)) = values.split_last() else {
            continue;
        };
        rows.push((features.to_vec(), target));
    }
    TrainingDataset::from_rows(rows)
}

pub fn save_dataset<P: AsRef<Path>>(path: P, dataset: &TrainingDataset) -> Result<()> {
    if let Some(parent) = path.as_ref().parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    write_dataset(File::create(path)?, dataset)
}

pub fn load_dataset<P: AsRef<Path>>(path: P) -> Result<TrainingDataset> {
    read_dataset(File::open(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feature_table_layout() {
        let records = vec![
            FeatureRecord::new("1-a.JPG", 120, 0.75),
            FeatureRecord::new("2-b|odd.JPG", 98, 1.25),
        ];
        let mut buf = Vec::new();
        write_features(&mut buf, &records).unwrap();
        let text = String::from_utf8(buf.clone()).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("image filename|front facing kernel count|/avg width//height ratio/")
        );
        assert_eq!(lines.next(), Some("1-a.JPG|120|0.75"));
        assert_eq!(lines.next(), Some("/2-b|odd.JPG/|98|1.25"));
        assert_eq!(read_features(buf.as_slice()).unwrap(), records);
    }

    #[test]
    fn ground_truth_reads_id_and_fourth_column() {
        let text = "corn,rows,per row,total,front\n1,14,30,420,110\n3,16,28,448,120\n";
        let truth = GroundTruth::read(text.as_bytes()).unwrap();
        assert_eq!(truth.len(), 2);
        assert_eq!(truth.get(1), Some(420.0));
        assert_eq!(truth.get(3), Some(448.0));
        assert_eq!(truth.get(2), None);
    }

    #[test]
    fn ground_truth_rejects_bad_rows() {
        let short = "h\n1,2\n";
        assert!(matches!(
            GroundTruth::read(short.as_bytes()),
            Err(Error::MalformedRecord { line: 2, .. })
        ));
        let dup = "h\n1,0,0,5\n1,0,0,6\n";
        assert!(GroundTruth::read(dup.as_bytes()).is_err());
    }

    #[test]
    fn unterminated_quote_is_malformed() {
        assert!(split_record("/abc|1", '|', 4).is_err());
    }
}
