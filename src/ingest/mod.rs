//! Ingestion core: title resolution and batch reconciliation

mod reconcile;
mod resolver;

#[cfg(test)]
mod tests;

pub use reconcile::{
    IngestError, IngestResult, ReconcileConfig, ReconcileReport, Reconciler, DEFAULT_MAX_ITEMS,
};
pub use resolver::{DocResolver, Resolution};
