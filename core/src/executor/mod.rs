//! Executor framework: the [`TaskExecutor`] trait, the bounded worker pool,
//! and the concrete executors for each built-in task kind.

mod docker;
mod file_ops;
pub mod pool;
mod search;
mod traits;

pub use docker::{DockerRunExecutor, GpuInferenceExecutor, RegistrySyncExecutor};
pub use file_ops::{
    DownsertAction, DownsertBackend, DownsertExecutor, DownsertRecord, FsBackend, StoreBackend,
    UpsertAction, UpsertBackend, UpsertExecutor, UpsertRecord,
};
pub use search::{
    FileReport, ParallelSearchExecutor, SearchFn, ValidationExecutor, ValidatorFn,
};
pub use traits::TaskExecutor;
