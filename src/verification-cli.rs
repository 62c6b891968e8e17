//! A small CLI tool for checking a vote receipt against the election backend.
//! This uses the same verification path as the voting client, so it agrees
//! with whatever a voter sees in the app.

use clap::{Arg, ArgAction, ArgMatches, Command};

use ballot_session::{
    boundary::HttpElectionSource,
    logging::init_logging,
    model::verification::VerificationResult,
    verify::verify,
    Config, Error, ErrorKind,
};

const PROGRAM_NAME: &str = "verify-receipt";

const ABOUT_TEXT: &str = "Check that a vote receipt matches a vote recorded on the ledger.

EXIT CODES:
     0: A matching vote was found.
   255: Ran successfully, but no matching vote exists.
 Other: Error.";

const RECEIPT: &str = "RECEIPT";

const RECEIPT_HELP: &str = "A transaction hash (with or without `0x`),\n\
or the receipt JSON saved after voting";

const API_URL: &str = "api-url";

const API_URL_HELP: &str = "Base URL of the election backend.\n\
Overrides `api_base_url` from Voting.toml and VOTING_API_BASE_URL";

const LOG_CONFIG: &str = "log4rs.yaml";

/// Construct the CLI configuration.
fn cli() -> Command {
    // Make the build dirty when the toml changes.
    include_str!("../Cargo.toml");

    clap::command!(PROGRAM_NAME)
        .about(ABOUT_TEXT)
        .arg(
            Arg::new(RECEIPT)
                .help(RECEIPT_HELP)
                .action(ArgAction::Set)
                .required(true),
        )
        .arg(
            Arg::new(API_URL)
                .long(API_URL)
                .value_name("URL")
                .help(API_URL_HELP)
                .action(ArgAction::Set),
        )
}

/// Load configuration, applying any command-line override.
fn config(args: &ArgMatches) -> Result<Config, Error> {
    let config = Config::load()?;
    Ok(match args.get_one::<String>(API_URL) {
        Some(url) => config.with_api_base_url(url),
        None => config,
    })
}

/// Run verification against the configured backend.
fn check(args: &ArgMatches) -> Result<VerificationResult, Error> {
    // Required argument, so clap has already rejected its absence.
    let receipt = args
        .get_one::<String>(RECEIPT)
        .ok_or_else(|| Error::MalformedHash("no receipt given".to_string()))?;
    let config = config(args)?;
    let source = HttpElectionSource::new(&config).map_err(|e| Error::Transport(e.to_string()))?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| Error::Transport(e.to_string()))?;
    runtime.block_on(verify(&source, receipt, config.read_retry()))
}

/// Report the outcome and return the exit code.
fn report(outcome: Result<VerificationResult, Error>) -> u8 {
    match outcome.and_then(VerificationResult::into_details) {
        Ok(details) => {
            println!("Verification succeeded.");
            println!("Election: {}", details.election_title);
            println!("Recorded: {}", details.timestamp.to_rfc3339());
            println!("Block: {}", details.block_ref);
            println!("Transaction: {}", details.transaction_ref);
            0
        }
        Err(err) if err.kind() == ErrorKind::VerificationNotFound => {
            println!("Verification failed: {}", err.user_message());
            255
        }
        Err(err @ Error::MalformedHash(_)) => {
            println!("Invalid receipt: {}", err);
            1
        }
        Err(err) => {
            println!("Error: {}", err);
            1
        }
    }
}

fn run(args: &ArgMatches) -> u8 {
    report(check(args))
}

fn main() {
    if let Err(err) = init_logging(LOG_CONFIG) {
        eprintln!("Could not initialise logging: {}", err);
    }
    let args = cli().get_matches();
    let exit_code = run(&args);
    std::process::exit(exit_code.into())
}
