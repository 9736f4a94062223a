use std::{
    path::Path,
    sync::{Arc, RwLock},
};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    error::{Result, SketchError},
    types::{Descriptor, HU_MOMENT_COUNT},
};

/// Immutable, ordered collection of reference descriptors.
///
/// Every signature is zero-padded to `signature_len`, the longest effective
/// signature seen; each descriptor keeps its own effective length. Rows with
/// a non-finite value can never be matched and are dropped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DescriptorDatabase {
    descriptors: Vec<Descriptor>,
    signature_len: usize,
}

impl DescriptorDatabase {
    pub fn new(descriptors: Vec<Descriptor>) -> Self {
        let descriptors: Vec<Descriptor> = descriptors
            .into_iter()
            .enumerate()
            .filter(|(index, d)| {
                let finite = d.is_finite();
                if !finite {
                    warn!(index, label = %d.label, "dropping descriptor with non-finite values");
                }
                finite
            })
            .map(|(_, d)| d)
            .collect();

        let signature_len = descriptors
            .iter()
            .map(|d| d.signature_len.max(d.signature.len()))
            .max()
            .unwrap_or(0);

        let descriptors = descriptors
            .into_iter()
            .map(|mut d| {
                d.signature_len = d.signature_len.min(d.signature.len());
                d.pad_to(signature_len);
                d
            })
            .collect();

        Self { descriptors, signature_len }
    }

    /// Build from parallel tables: one label, one Hu row and one signature row per descriptor
    pub fn from_tables(
        labels: Vec<String>,
        hu_table: Vec<[f64; HU_MOMENT_COUNT]>,
        signature_table: Vec<Vec<f64>>,
    ) -> Result<Self> {
        if labels.len() != hu_table.len() || labels.len() != signature_table.len() {
            return Err(SketchError::TableShapeMismatch {
                labels: labels.len(),
                hu_rows: hu_table.len(),
                signature_rows: signature_table.len(),
            });
        }

        for (index, (hu, signature)) in hu_table.iter().zip(signature_table.iter()).enumerate() {
            if let Some(value) = hu.iter().chain(signature.iter()).find(|v| !v.is_finite()) {
                return Err(SketchError::MalformedDescriptorRecord {
                    line: index + 1,
                    reason: format!("'{}' has non-finite value {value}", labels[index]),
                });
            }
        }

        let descriptors = labels
            .into_iter()
            .zip(hu_table)
            .zip(signature_table)
            .map(|((label, hu), signature)| Descriptor::new(label, hu, signature))
            .collect();

        Ok(Self::new(descriptors))
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Common (padded) signature length
    pub fn signature_len(&self) -> usize {
        self.signature_len
    }

    pub fn descriptors(&self) -> &[Descriptor] {
        &self.descriptors
    }

    pub fn iter(&self) -> impl Iterator<Item = &Descriptor> {
        self.descriptors.iter()
    }

    /// Distinct labels in first-seen order
    pub fn labels(&self) -> Vec<&str> {
        let mut labels: Vec<&str> = Vec::new();
        for descriptor in &self.descriptors {
            if !labels.contains(&descriptor.label.as_str()) {
                labels.push(&descriptor.label);
            }
        }
        labels
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let parsed: DescriptorDatabase = serde_json::from_str(content)?;
        Ok(Self::new(parsed.descriptors))
    }

    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }
}

/// Shared handle to the current database.
///
/// Starts uninitialized. Loading publishes a whole new database by swapping
/// one `Arc`, so readers holding a snapshot never see a partial reload.
#[derive(Debug, Clone, Default)]
pub struct DescriptorStore {
    current: Arc<RwLock<Option<Arc<DescriptorDatabase>>>>,
}

impl DescriptorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current database
    pub fn load(&self, database: DescriptorDatabase) -> Arc<DescriptorDatabase> {
        let database = Arc::new(database);
        info!(
            descriptors = database.len(),
            signature_len = database.signature_len(),
            "descriptor database loaded"
        );
        let mut slot = self.current.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = Some(Arc::clone(&database));
        database
    }

    /// Bulk-load parallel tables, replacing the current database
    pub fn load_tables(
        &self,
        labels: Vec<String>,
        hu_table: Vec<[f64; HU_MOMENT_COUNT]>,
        signature_table: Vec<Vec<f64>>,
    ) -> Result<Arc<DescriptorDatabase>> {
        let database = DescriptorDatabase::from_tables(labels, hu_table, signature_table)?;
        Ok(self.load(database))
    }

    /// The database current at the time of the call
    pub fn snapshot(&self) -> Option<Arc<DescriptorDatabase>> {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn is_initialized(&self) -> bool {
        self.snapshot().is_some()
    }
}
