pub mod dataset;
pub mod export;
pub mod firestore;
pub mod ingest;
pub mod training;
