use clap::Parser;
use droid_cli::cli::Cli;
use droid_cli::error::CliError;
use droid_cli::output::{self, OutputFormat, ResultBuilder};
use droid_cli::{commands, logging};

#[tokio::main]
async fn main() {
	let cli = Cli::parse();
	logging::init_logging(cli.verbose);

	let format = cli.format;
	let command = cli.command.name();

	if let Err(err) = commands::dispatch(cli).await {
		if !err.is_output_already_printed() {
			handle_error(err, command, format);
		}
		std::process::exit(1);
	}
}

fn handle_error(err: CliError, command: &str, format: OutputFormat) {
	let cmd_error = err.to_command_error();

	output::print_error_stderr(&cmd_error);

	if format == OutputFormat::Json {
		let result: output::Envelope<()> = ResultBuilder::new(command)
			.error_with(cmd_error)
			.build();
		output::print_result(&result, format);
	}
}
