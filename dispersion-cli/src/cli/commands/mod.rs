pub mod history;
pub mod process;
