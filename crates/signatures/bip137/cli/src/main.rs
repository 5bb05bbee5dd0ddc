use std::{fs, path::PathBuf, process::ExitCode};

use anyhow::{Context, Result};
use base64::{Engine, engine::general_purpose::STANDARD};
use clap::{Args, Parser, Subcommand};
use defuse_bip137::{
    Address, Network, RecoverableSignature, SignedBip137Payload, signed_message_hash, verify_for,
};
use serde_json::json;
use tracing_subscriber::EnvFilter;

/// Verifies legacy Bitcoin signed messages for P2WPKH addresses
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Network the address must belong to
    #[arg(
        long,
        global = true,
        env = "BIP137_NETWORK",
        default_value_t = Network::Bitcoin
    )]
    network: Network,

    /// Print machine-readable JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Checks a signature against an address.
    ///
    /// Exits with 0 when valid, 1 when the signature belongs to another key
    /// and 2 on malformed input.
    Verify(VerifyArgs),
    /// Prints the witness program of a P2WPKH address
    Decode {
        #[arg(long)]
        address: String,
    },
    /// Prints the digest a wallet signs for a message
    Digest {
        #[arg(long)]
        message: String,
    },
    /// Prints the key recovered for every recovery id
    Recover {
        #[arg(long)]
        message: String,
        /// Base64-encoded 65-byte signature
        #[arg(long)]
        signature: String,
    },
}

#[derive(Debug, Args)]
struct VerifyArgs {
    #[arg(long, required_unless_present = "payload")]
    address: Option<String>,

    #[arg(long, required_unless_present = "payload")]
    message: Option<String>,

    /// Base64-encoded 65-byte signature
    #[arg(long, required_unless_present = "payload")]
    signature: Option<String>,

    /// JSON document with `address`, `message` and base64 `signature`
    #[arg(long, conflicts_with_all = ["address", "message", "signature"])]
    payload: Option<PathBuf>,
}

/// Inputs of a single verification
struct Triple {
    address: String,
    message: String,
    signature: Vec<u8>,
}

impl VerifyArgs {
    fn into_triple(self) -> Result<Triple> {
        if let Some(path) = self.payload {
            let file = fs::read(&path).with_context(|| format!("read {}", path.display()))?;
            let payload: SignedBip137Payload =
                serde_json::from_slice(&file).context("parse payload")?;
            return Ok(Triple {
                address: payload.address,
                message: payload.message,
                signature: payload.signature.to_vec(),
            });
        }

        // clap guarantees these are present without a payload
        let (Some(address), Some(message), Some(signature)) =
            (self.address, self.message, self.signature)
        else {
            anyhow::bail!("--address, --message and --signature are required");
        };
        Ok(Triple {
            address,
            message,
            signature: decode_signature(&signature)?,
        })
    }
}

fn decode_signature(signature: &str) -> Result<Vec<u8>> {
    STANDARD
        .decode(signature.trim())
        .context("signature is not valid base64")
}

impl Cli {
    fn run(self) -> Result<ExitCode> {
        let network = self.network;
        let json = self.json;

        match self.command {
            Commands::Verify(args) => {
                let Triple {
                    address,
                    message,
                    signature,
                } = args.into_triple()?;

                match verify_for(network, &address, &message, &signature) {
                    Ok(result) => {
                        if json {
                            println!("{}", serde_json::to_string(&result)?);
                        } else if let Some(public_key) = result.recovered_pubkey {
                            println!("valid: {public_key}");
                        } else {
                            println!("invalid: signature does not match {address}");
                        }
                        Ok(if result.valid {
                            ExitCode::SUCCESS
                        } else {
                            ExitCode::from(1)
                        })
                    }
                    Err(err) => Ok(report(json, &err)),
                }
            }
            Commands::Decode { address } => {
                let decoded = Address::parse(&address)
                    .and_then(|address| address.require_network(network))
                    .and_then(|address| {
                        Ok((address.witness_version()?, address.witness_program()?))
                    });
                match decoded {
                    Ok((version, program)) => {
                        if json {
                            println!(
                                "{}",
                                json!({
                                    "network": network,
                                    "witness_version": version,
                                    "witness_program": program,
                                })
                            );
                        } else {
                            println!("{program}");
                        }
                        Ok(ExitCode::SUCCESS)
                    }
                    Err(err) => Ok(report(json, &err.into())),
                }
            }
            Commands::Digest { message } => {
                let digest = hex::encode(signed_message_hash(&message));
                if json {
                    println!("{}", json!({ "digest": digest }));
                } else {
                    println!("{digest}");
                }
                Ok(ExitCode::SUCCESS)
            }
            Commands::Recover { message, signature } => {
                recover(network, json, &message, &signature)
            }
        }
    }
}

fn recover(network: Network, json: bool, message: &str, signature: &str) -> Result<ExitCode> {
    let signature = match RecoverableSignature::from_slice(&decode_signature(signature)?) {
        Ok(signature) => signature,
        Err(err) => return Ok(report(json, &err)),
    };
    let candidates = signature.candidates(&signed_message_hash(message));

    if json {
        let candidates: Vec<_> = candidates
            .into_iter()
            .map(|(id, result)| match result {
                Ok(public_key) => json!({
                    "recovery_id": id.to_byte(),
                    "public_key": public_key,
                    "address": public_key.witness_program().to_address(network),
                }),
                Err(err) => json!({
                    "recovery_id": id.to_byte(),
                    "error": err.to_string(),
                }),
            })
            .collect();
        println!("{}", serde_json::Value::Array(candidates));
    } else {
        for (id, result) in candidates {
            match result {
                Ok(public_key) => println!(
                    "{}: {public_key} {}",
                    id.to_byte(),
                    public_key.witness_program().to_address(network)
                ),
                Err(err) => println!("{}: {err}", id.to_byte()),
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn report(json: bool, err: &defuse_bip137::Error) -> ExitCode {
    tracing::debug!(stage = %err.stage(), ?err, "verification failed");
    if json {
        println!(
            "{}",
            json!({ "stage": err.stage(), "error": err.to_string() })
        );
    } else {
        eprintln!("error at {} stage: {err}", err.stage());
    }
    ExitCode::from(2)
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    match Cli::parse().run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(2)
        }
    }
}
