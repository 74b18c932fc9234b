use core::time::Duration;

use anyhow::{Context, bail};
use clap::{Parser, ValueEnum};
use flakegen::{FlakeId, GeneratorConfig, SpinStrategy, validate_node_id};

use crate::retry::RetryPolicy;

/// Runtime configuration for the `flakegen` binary.
///
/// All values are parsed from CLI arguments or environment variables (a
/// `.env` file is loaded first), with defaults suitable for a quick run.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "flakegen",
    version,
    about = "Generate and inspect time-ordered 64-bit Snowflake IDs"
)]
pub struct CliArgs {
    /// Node id embedded in every generated ID (0-1023).
    ///
    /// When omitted, the id is derived from the last two octets of the first
    /// up, non-loopback network interface with a hardware address.
    ///
    /// Environment variable: `FLAKEGEN_NODE_ID`
    #[arg(long, env = "FLAKEGEN_NODE_ID", allow_negative_numbers = true)]
    pub node_id: Option<i64>,

    /// Number of IDs generated sequentially and printed to stdout.
    #[arg(short, long, default_value_t = 10)]
    pub count: usize,

    /// Number of additional IDs generated concurrently from the same
    /// generator. Only a summary is logged.
    #[arg(long, default_value_t = 0)]
    pub concurrent: usize,

    /// Worker threads used for `--concurrent`.
    #[arg(long, default_value_t = 4)]
    pub threads: usize,

    /// How to poll the clock while waiting out an exhausted sequence.
    ///
    /// Environment variable: `FLAKEGEN_SPIN`
    #[arg(long, value_enum, env = "FLAKEGEN_SPIN", default_value_t = SpinArg::Yield)]
    pub spin: SpinArg,

    /// Sleep length between polls when `--spin sleep` is selected.
    ///
    /// Environment variable: `FLAKEGEN_SLEEP_MICROS`
    #[arg(long, env = "FLAKEGEN_SLEEP_MICROS", default_value_t = 100)]
    pub sleep_micros: u64,

    /// Give up waiting for the clock after sequence exhaustion after this
    /// many milliseconds. Waits indefinitely when unset.
    ///
    /// Environment variable: `FLAKEGEN_OVERFLOW_TIMEOUT_MS`
    #[arg(long, env = "FLAKEGEN_OVERFLOW_TIMEOUT_MS")]
    pub overflow_timeout_ms: Option<u64>,

    /// How many times a generation that hit backward clock movement is
    /// retried before giving up.
    ///
    /// Environment variable: `FLAKEGEN_MAX_RETRIES`
    #[arg(long, env = "FLAKEGEN_MAX_RETRIES", default_value_t = 3)]
    pub max_retries: u32,

    /// First back-off between retries, doubled on every attempt.
    #[arg(long, default_value_t = 1)]
    pub retry_backoff_ms: u64,

    /// Decompose this ID into its fields and exit.
    #[arg(long, value_name = "ID")]
    pub decompose: Option<String>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpinArg {
    Spin,
    Yield,
    Sleep,
}

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub generator: GeneratorConfig,
    pub count: usize,
    pub concurrent: usize,
    pub threads: usize,
    pub retry: RetryPolicy,
    pub decompose: Option<FlakeId>,
}

impl TryFrom<CliArgs> for RunConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if let Some(node_id) = args.node_id {
            validate_node_id(node_id).context("FLAKEGEN_NODE_ID is out of range")?;
        }

        if args.concurrent > 0 && args.threads == 0 {
            bail!("--threads must be greater than 0 when --concurrent is set");
        }

        if args.spin == SpinArg::Sleep && args.sleep_micros == 0 {
            bail!("--sleep-micros must be greater than 0 with --spin sleep");
        }

        let decompose = args
            .decompose
            .as_deref()
            .map(str::parse::<FlakeId>)
            .transpose()
            .context("invalid value for --decompose")?;

        let spin = match args.spin {
            SpinArg::Spin => SpinStrategy::Spin,
            SpinArg::Yield => SpinStrategy::Yield,
            SpinArg::Sleep => SpinStrategy::Sleep {
                micros: args.sleep_micros,
            },
        };

        Ok(Self {
            generator: GeneratorConfig {
                node_id: args.node_id,
                spin,
                overflow_timeout_ms: args.overflow_timeout_ms,
            },
            count: args.count,
            concurrent: args.concurrent,
            threads: args.threads,
            retry: RetryPolicy {
                max_retries: args.max_retries,
                initial_backoff: Duration::from_millis(args.retry_backoff_ms),
            },
            decompose,
        })
    }
}
