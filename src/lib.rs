//! sheetson - Complexity-aware Excel (XLS/XLSX) to JSON converter
//!
//! This crate ingests spreadsheet files and converts them into structured
//! JSON, routing each sheet through one of two extraction paths depending on
//! structural complexity: a fast tabular parse for simple single-table
//! sheets, and a heavier segmentation path for sheets with merged cells,
//! multiple table regions, misaligned headers, embedded objects, or large
//! sparse regions. Files the local environment cannot handle (non-tabular
//! regions with no layout-aware extractor configured) are delegated
//! one-shot to a remote processing endpoint.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use sheetson::{Dispatcher, LocalStore, ObjectRef};
//!
//! fn main() -> Result<(), sheetson::SheetsonError> {
//!     let dispatcher = Dispatcher::builder()
//!         .with_store(LocalStore::new("/data"))
//!         .build()?;
//!
//!     // Reads /data/uploads/report.xlsx, writes /data/uploads/report.json
//!     let results = dispatcher.process(&ObjectRef::new("uploads", "report.xlsx"))?;
//!     for sheet in &results {
//!         println!("{}: {} region(s)", sheet.sheet_name, sheet.regions.len());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Custom Configuration
//!
//! Thresholds are explicit configuration, never ambient state:
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use sheetson::{Dispatcher, LocalStore, SheetSelector};
//!
//! # fn main() -> Result<(), sheetson::SheetsonError> {
//! let dispatcher = Dispatcher::builder()
//!     .with_store(LocalStore::new("/data"))
//!     .with_sheet_selector(SheetSelector::Name("Report".to_string()))
//!     .with_gap_rows(3)                 // blank-band separator width
//!     .with_sparsity_threshold(0.7)     // sparse_region signal
//!     .with_header_fill_threshold(0.5)  // header detection
//!     .with_min_region_cells(6)         // noise filter
//!     .with_remote_endpoint("https://extractor.example.com/parse")
//!     .with_remote_timeout(Duration::from_secs(120))
//!     .build()?;
//! # Ok(())
//! # }
//! ```
//!
//! # In-memory conversion
//!
//! ```rust,no_run
//! use sheetson::{Dispatcher, LocalStore};
//!
//! # fn main() -> Result<(), sheetson::SheetsonError> {
//! let dispatcher = Dispatcher::builder()
//!     .with_store(LocalStore::new("/data"))
//!     .build()?;
//! let bytes: Vec<u8> = std::fs::read("report.xlsx")?;
//! let results = dispatcher.convert(bytes, None)?;
//! println!("{}", serde_json::to_string_pretty(&results).unwrap());
//! # Ok(())
//! # }
//! ```

mod api;
mod builder;
mod classifier;
mod delegate;
mod dispatcher;
mod error;
mod extract;
mod freetext;
mod grid;
mod output;
mod parser;
mod security;
mod storage;
mod types;

// 公開API
pub use api::SheetSelector;
pub use builder::DispatcherBuilder;
pub use classifier::{Classifier, ComplexitySignal, ComplexityVerdict};
pub use delegate::{HttpDelegate, RemoteDelegate};
pub use dispatcher::Dispatcher;
pub use error::SheetsonError;
pub use extract::{
    ComplexExtractor, Record, RegionExtract, SheetExtractor, SimpleExtractor, TableRegion,
};
pub use freetext::FreeTextExtractor;
pub use grid::Grid;
pub use output::{from_json_bytes, to_json_bytes, ComplexityOutput, ParseResult, RegionOutput};
pub use storage::{LocalStore, ObjectRef, ObjectStore};
pub use types::{CellCoord, CellRange, CellValue, MergedRegion};
