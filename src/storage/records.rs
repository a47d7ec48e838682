use std::{fs, path::Path};

use serde_json::Value;

use super::{InternalStorage, RecordKind, StorageError};

fn read_array(path: &Path) -> Result<Vec<Value>, StorageError> {
    let contents = fs::read_to_string(path).map_err(|e| StorageError::io("read", path, e))?;
    let value: Value = serde_json::from_str(&contents).map_err(|source| StorageError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    match value {
        Value::Array(records) => Ok(records),
        _ => Err(StorageError::NotAnArray(path.to_path_buf())),
    }
}

fn write_array(path: &Path, records: &[Value]) -> Result<(), StorageError> {
    let contents = serde_json::to_string(records).map_err(|source| StorageError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, contents).map_err(|e| StorageError::io("write", path, e))
}

fn record_id<'a>(record: &'a Value, field: &str) -> Option<&'a str> {
    record.get(field).and_then(Value::as_str)
}

impl InternalStorage {
    pub async fn get_records(&self, kind: RecordKind) -> Result<Vec<Value>, StorageError> {
        let path = self.records_path(kind);
        self.execute(move |_| read_array(&path)).await
    }

    pub async fn get_record(
        &self,
        kind: RecordKind,
        id: &str,
    ) -> Result<Option<Value>, StorageError> {
        let records = self.get_records(kind).await?;
        Ok(records
            .into_iter()
            .find(|record| record_id(record, kind.id_field()) == Some(id)))
    }

    /// Replaces the record with the same identifier in place, or appends.
    pub async fn upsert_record(&self, kind: RecordKind, record: Value) -> Result<(), StorageError> {
        let field = kind.id_field();
        let id = record_id(&record, field)
            .ok_or(StorageError::MissingIdentifier(field))?
            .to_string();
        let path = self.records_path(kind);

        self.execute(move |_| {
            let mut records = read_array(&path)?;
            match records
                .iter()
                .position(|existing| record_id(existing, field) == Some(id.as_str()))
            {
                Some(index) => {
                    log::info!("{} {id} exists, replacing", kind.folder());
                    records[index] = record;
                }
                None => records.push(record),
            }
            write_array(&path, &records)
        })
        .await
    }

    pub async fn set_records(
        &self,
        kind: RecordKind,
        records: Vec<Value>,
    ) -> Result<(), StorageError> {
        let path = self.records_path(kind);
        self.execute(move |_| write_array(&path, &records)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn upsert_without_identifier_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let storage = InternalStorage::init(dir.path()).unwrap();

        let err = storage
            .upsert_record(RecordKind::Tickets, json!({ "testimonialID": "x" }))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::MissingIdentifier("ticketID")));
        assert!(storage.get_records(RecordKind::Tickets).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn set_records_replaces_the_collection() {
        let dir = tempfile::tempdir().unwrap();
        let storage = InternalStorage::init(dir.path()).unwrap();

        storage
            .set_records(RecordKind::Tickets, vec![json!({ "ticketID": "a" })])
            .await
            .unwrap();
        assert_eq!(
            storage.get_record(RecordKind::Tickets, "a").await.unwrap(),
            Some(json!({ "ticketID": "a" }))
        );
        assert_eq!(storage.get_record(RecordKind::Tickets, "b").await.unwrap(), None);
    }

    #[tokio::test]
    async fn corrupt_collection_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let storage = InternalStorage::init(dir.path()).unwrap();
        fs::write(storage.records_path(RecordKind::Testimonials), "{}").unwrap();

        let err = storage.get_records(RecordKind::Testimonials).await.unwrap_err();
        assert!(matches!(err, StorageError::NotAnArray(_)));
    }
}
