use aggregate_codegen::{CliArgs, CodegenConfig, LoggingConfig, init_logging, run};
use clap::Parser;

fn main() -> anyhow::Result<()> {
    let logging_config = LoggingConfig::from_env();
    let guard = init_logging(logging_config)?;

    let cli = CliArgs::parse();
    let (check, list) = (cli.check, cli.list);
    let config = CodegenConfig::from_args(cli)?;

    let code = run(config, check, list)?;
    if code != 0 {
        // flush buffered log lines before exiting
        drop(guard);
        std::process::exit(code);
    }
    Ok(())
}
