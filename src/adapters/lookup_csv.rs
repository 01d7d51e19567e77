use crate::domain::model::{LookupEntry, LookupKind};
use crate::domain::ports::LookupCatalog;
use crate::utils::error::Result;
use serde::Deserialize;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct LookupRow {
    id: String,
    label: String,
    value: String,
}

/// 記憶體內的對照表，可從 `id,label,value` 格式的 CSV 載入
#[derive(Debug, Clone, Default)]
pub struct LookupTable {
    entries: HashMap<(LookupKind, String), LookupEntry>,
}

impl LookupTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// 同時以 value 與 id 建立索引
    pub fn insert(&mut self, kind: LookupKind, entry: LookupEntry) {
        self.entries
            .insert((kind, entry.id.clone()), entry.clone());
        self.entries.insert((kind, entry.value.clone()), entry);
    }

    pub fn load_reader<R: Read>(&mut self, kind: LookupKind, reader: R) -> Result<usize> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let mut loaded = 0;
        for row in csv_reader.deserialize::<LookupRow>() {
            let row = row?;
            self.insert(
                kind,
                LookupEntry {
                    id: row.id.trim().to_string(),
                    label: row.label.trim().to_string(),
                    value: row.value.trim().to_string(),
                },
            );
            loaded += 1;
        }
        Ok(loaded)
    }

    pub fn load_file<P: AsRef<Path>>(&mut self, kind: LookupKind, path: P) -> Result<usize> {
        let file = std::fs::File::open(path.as_ref())?;
        let loaded = self.load_reader(kind, file)?;
        tracing::info!(
            ?kind,
            loaded,
            path = %path.as_ref().display(),
            "loaded lookup table"
        );
        Ok(loaded)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl LookupCatalog for LookupTable {
    fn resolve(&self, kind: LookupKind, code: &str) -> Option<LookupEntry> {
        self.entries.get(&(kind, code.to_string())).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_reader_indexes_by_id_and_value() {
        let csv_data = "id,label,value\n1,Damascus,damascus\n2, Aleppo ,aleppo\n";
        let mut table = LookupTable::new();
        let loaded = table
            .load_reader(LookupKind::Province, csv_data.as_bytes())
            .unwrap();

        assert_eq!(loaded, 2);
        assert_eq!(
            table.resolve(LookupKind::Province, "aleppo").unwrap().label,
            "Aleppo"
        );
        assert_eq!(
            table.resolve(LookupKind::Province, "1").unwrap().value,
            "damascus"
        );
        assert!(table.resolve(LookupKind::City, "damascus").is_none());
    }

    #[test]
    fn test_load_file_rejects_malformed_rows() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"id,label\n1,Oil change\n").unwrap();

        let mut table = LookupTable::new();
        assert!(table.load_file(LookupKind::Service, temp_file.path()).is_err());
    }
}
