pub mod datasets;

pub use datasets::DatasetRepository;
