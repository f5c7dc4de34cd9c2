use std::io::Write as _;

use anyhow::Context as _;

use super::OutputFormatter;

pub(crate) struct JsonOutput;

impl OutputFormatter for JsonOutput {
    fn print_header(&self, _config: &volley_core::RunConfig) {}

    fn print_summary(&self, result: &volley_core::RunResult) -> anyhow::Result<()> {
        let mut out = std::io::stdout().lock();
        serde_json::to_writer(&mut out, result).context("failed to serialize run result")?;
        writeln!(out).context("failed to write run result")?;
        Ok(())
    }
}
