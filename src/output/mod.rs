mod formatter;
mod report;

pub use formatter::OutputFormatter;
pub use report::{Report, ReportAssembler, TestUsage, TraversalFinding, TraversalReport};
