//! Turn pension-disbursement workbooks into bank dispersion templates.
//!
//! The [`dispersion`] module is the synchronous pipeline: load a sheet,
//! resolve the name/account/amount columns, normalize rows and write the
//! template. [`services`] wraps it with stored outputs and a SQLite history.

pub mod cli;
pub mod config;
pub mod dispersion;
pub mod services;
