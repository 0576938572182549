//! Request handlers.
//!
//! Handlers validate and translate HTTP shapes, delegate to the engine or
//! the repositories in `refdata_db`, and map errors via [`AppError`](crate::error::AppError).

pub mod import;
