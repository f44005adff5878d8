use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

mod asn1parse;
mod decode;
mod fingerprint;
mod input;

/// Environment variable holding a tracing filter directive.
const LOG_ENV: &str = "PEMVIEW_LOG";

/// pemview: decode PEM certificates into a readable report.
#[derive(Parser)]
#[command(name = "pemview")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the certificate report.
    Decode {
        /// Input file (use - for stdin).
        #[arg(default_value = "-")]
        file: String,
        /// Output format.
        #[arg(short, long, value_enum, default_value = "text")]
        format: Format,
        /// Judge validity at this RFC 3339 instant instead of now.
        #[arg(long)]
        at: Option<String>,
        /// Reject non-canonical DER.
        #[arg(long)]
        strict: bool,
    },
    /// Dump the raw DER tree, one node per line.
    Asn1parse {
        /// Input file, PEM or DER (use - for stdin).
        #[arg(default_value = "-")]
        file: String,
        /// Reject non-canonical DER.
        #[arg(long)]
        strict: bool,
    },
    /// Print a certificate fingerprint.
    Fingerprint {
        /// Input file (use - for stdin).
        #[arg(default_value = "-")]
        file: String,
        /// Digest algorithm (md5, sha1, sha256).
        #[arg(short, long, default_value = "sha256")]
        digest: String,
    },
}

fn init_logging(verbose: u8) {
    let fallback = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = if verbose > 0 {
        EnvFilter::new(fallback)
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(fallback))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match &cli.command {
        Commands::Decode {
            file,
            format,
            at,
            strict,
        } => decode::run(file, *format == Format::Json, at.as_deref(), *strict),
        Commands::Asn1parse { file, strict } => asn1parse::run(file, *strict),
        Commands::Fingerprint { file, digest } => fingerprint::run(file, digest),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_decode_defaults() {
        let cli = Cli::try_parse_from(["pemview", "decode"]).unwrap();
        match cli.command {
            Commands::Decode {
                file,
                format,
                at,
                strict,
            } => {
                assert_eq!(file, "-");
                assert_eq!(format, Format::Text);
                assert!(at.is_none());
                assert!(!strict);
            }
            _ => panic!("expected decode"),
        }
    }

    #[test]
    fn test_parse_verbosity_and_flags() {
        let cli = Cli::try_parse_from([
            "pemview", "-vv", "decode", "cert.pem", "--format", "json", "--strict",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(matches!(
            cli.command,
            Commands::Decode {
                format: Format::Json,
                strict: true,
                ..
            }
        ));
    }

    #[test]
    fn test_parse_rejects_unknown_format() {
        assert!(Cli::try_parse_from(["pemview", "decode", "--format", "xml"]).is_err());
    }
}
