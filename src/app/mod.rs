//! Configuration shared by the server (dehydration) and client (hydration) halves.
mod errors;
mod types;

#[doc(inline)]
pub use errors::{AppError, AppResult};

#[doc(inline)]
pub use types::{FirebaseOptions, DATABASE_ID_ENV, PROJECT_ID_ENV};
