use crate::cli::OutputFormat;

mod human;
mod json;

pub(crate) trait OutputFormatter: Send + Sync {
    fn print_header(&self, config: &volley_core::RunConfig);
    fn print_summary(&self, result: &volley_core::RunResult) -> anyhow::Result<()>;
}

pub(crate) fn formatter(format: OutputFormat) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::HumanReadable => Box::new(human::HumanReadableOutput),
        OutputFormat::Json => Box::new(json::JsonOutput),
    }
}
