//! CSV command log input and CSV report output.

pub mod command_reader;
pub mod report_writer;
