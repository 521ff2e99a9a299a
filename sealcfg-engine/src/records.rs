//! Conversion between persisted key-group records and wrapped groups.

use sealcfg_crypto::{WrappedGroup, WrappedKey};
use sealcfg_document::{KeyGroupRecord, WrappedKeyRecord};

/// Records group members by scheme; member order is kept within a scheme.
pub(crate) fn to_records(groups: &[WrappedGroup]) -> Vec<KeyGroupRecord> {
    groups
        .iter()
        .map(|group| {
            let mut record = KeyGroupRecord::new();
            for key in &group.keys {
                record.entry(key.scheme.clone()).or_default().push(WrappedKeyRecord {
                    recipient: key.recipient.clone(),
                    enc: key.enc.clone(),
                });
            }
            record
        })
        .collect()
}

pub(crate) fn from_records(records: &[KeyGroupRecord]) -> Vec<WrappedGroup> {
    records
        .iter()
        .map(|record| WrappedGroup {
            keys: record
                .iter()
                .flat_map(|(scheme, keys)| {
                    keys.iter().map(move |key| WrappedKey {
                        scheme: scheme.clone(),
                        recipient: key.recipient.clone(),
                        enc: key.enc.clone(),
                    })
                })
                .collect(),
        })
        .collect()
}
