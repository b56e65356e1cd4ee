// Business logic services layer
//
// Services wrap the dispersion pipeline with stored outputs and a processing
// history so the CLI and any other front end share one implementation.

pub mod processing;

pub use processing::{ProcessingService, is_excel_filename};
