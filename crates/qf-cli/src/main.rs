use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let matches = qf_cli::command().get_matches();
    qf_cli::init_tracing(matches.get_flag("log-json"), matches.get_flag("verbose"));

    let mut stdout = std::io::stdout().lock();
    match qf_cli::execute(&matches, &mut stdout).await {
        Ok(outcome) => outcome.into(),
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
