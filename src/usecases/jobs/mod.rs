//! Job use cases

mod children;
mod create;
mod next;
mod query;
mod start;
mod update;

pub use children::UpdateChildrenUseCase;
pub use create::CreateJobUseCase;
pub use next::{StartNextJobUseCase, TESSERA_MIN_GAS};
pub use query::{GetJobUseCase, SearchJobsUseCase};
pub use start::{ResendJobTxUseCase, StartJobUseCase};
pub use update::{JobUpdate, UpdateJobUseCase};
