//! zb-sec: Zigbee security operator tool
//!
//! Offline helpers for commissioning and debugging: AES-MMO digests,
//! install-code keys, CBKE certificate dumps, auxiliary header decoding and
//! OTA image signature checks.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::{json, Value};
use tracing::debug;

use zb_crypto::aes_mmo_hash;
use zb_security::domain::install_code;
use zb_security::{
    AuxHeader, Cbke2Certificate, CbkeCertificate, ImplicitCertificate, SecurityConfig,
    SecurityService, StatusCode, TelemetryEventSink, ZigbeeSecurityApi,
};
use zb_telemetry::{init_telemetry, TelemetryConfig};

/// Zigbee link-layer security tool
#[derive(Parser, Debug)]
#[command(name = "zb-sec")]
#[command(about = "Offline Zigbee security helpers", version)]
struct Cli {
    /// Debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// AES-MMO digest of hex input (or UTF-8 text with --text)
    Hash {
        /// Input bytes as hex
        input: String,
        /// Treat the input as text instead of hex
        #[arg(long)]
        text: bool,
    },

    /// Install-code operations
    #[command(subcommand)]
    InstallCode(InstallCodeCommand),

    /// Dump the fields of a CBKE certificate
    Cert {
        /// Certificate suite
        #[arg(long, value_enum, default_value = "cbke1")]
        suite: Suite,
        /// Certificate bytes as hex
        certificate: String,
    },

    /// Decode an auxiliary security header
    Header {
        /// Header bytes as hex, starting at the security control octet
        aux: String,
        /// Accept reserved control bits
        #[arg(long)]
        lenient: bool,
    },

    /// Validate an OTA image signature
    Image {
        /// ECDSA signature suite (1 or 2)
        #[arg(long)]
        suite: u8,
        /// CA public key (hex)
        #[arg(long)]
        ca: String,
        /// Signer certificate (hex)
        #[arg(long)]
        certificate: String,
        /// Signer address and signature (hex)
        #[arg(long)]
        signature: String,
        /// AES-MMO digest of the image (hex)
        #[arg(long)]
        image_digest: String,
        /// AES-MMO digest of the certificate (hex)
        #[arg(long)]
        cert_digest: String,
    },
}

#[derive(Subcommand, Debug)]
enum InstallCodeCommand {
    /// Validate an install code and print its link key
    Derive {
        /// Install code with trailing CRC (hex)
        code: String,
    },
    /// Append the CRC to install-code content
    AppendCrc {
        /// Install code without CRC (hex)
        content: String,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Suite {
    /// 48-byte certificates on sect163k1
    Cbke1,
    /// 74-byte certificates on sect283k1
    Cbke2,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let _telemetry = init_telemetry(TelemetryConfig::for_cli(cli.verbose))
        .context("Failed to initialize logging")?;
    debug!(command = ?cli.command, "running");

    let output = run(cli.command)?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn run(command: Command) -> Result<Value> {
    match command {
        Command::Hash { input, text } => {
            let data = if text {
                input.into_bytes()
            } else {
                parse_hex("input", &input)?
            };
            Ok(json!({ "digest": hex::encode(aes_mmo_hash(&data)) }))
        }
        Command::InstallCode(InstallCodeCommand::Derive { code }) => {
            let code = parse_hex("install code", &code)?;
            let key = install_code::derive_link_key(&code)
                .context("Install code rejected")?;
            Ok(json!({ "link_key": hex::encode(key.as_bytes()) }))
        }
        Command::InstallCode(InstallCodeCommand::AppendCrc { content }) => {
            let content = parse_hex("install code content", &content)?;
            let code = install_code::append_crc(&content).context("Install code rejected")?;
            Ok(json!({ "install_code": hex::encode_upper(code) }))
        }
        Command::Cert { suite, certificate } => {
            let bytes = parse_hex("certificate", &certificate)?;
            match suite {
                Suite::Cbke1 => describe_cbke1(&bytes),
                Suite::Cbke2 => describe_cbke2(&bytes),
            }
        }
        Command::Header { aux, lenient } => {
            let bytes = parse_hex("auxiliary header", &aux)?;
            describe_header(&bytes, !lenient)
        }
        Command::Image {
            suite,
            ca,
            certificate,
            signature,
            image_digest,
            cert_digest,
        } => {
            let service =
                SecurityService::new(SecurityConfig::default(), TelemetryEventSink::new())?;
            let status = service.ecdsa_validate(
                suite,
                &parse_hex("CA public key", &ca)?,
                &parse_hex("certificate", &certificate)?,
                &parse_hex("signature", &signature)?,
                &parse_hex("image digest", &image_digest)?,
                &parse_hex("certificate digest", &cert_digest)?,
            );
            Ok(json!({
                "status": format!("{status:?}"),
                "code": format!("0x{:02X}", status.as_u8()),
                "valid": status == StatusCode::Success,
            }))
        }
    }
}

fn parse_hex(what: &str, input: &str) -> Result<Vec<u8>> {
    let cleaned: String = input
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ':' && *c != '-')
        .collect();
    let cleaned = cleaned.trim_start_matches("0x");
    if cleaned.is_empty() {
        bail!("{what} is empty");
    }
    hex::decode(cleaned).with_context(|| format!("{what} is not valid hex"))
}

fn address(value: u64) -> String {
    format!("{value:016X}")
}

fn describe_cbke1(bytes: &[u8]) -> Result<Value> {
    let cert = CbkeCertificate::parse(bytes)?;
    Ok(json!({
        "suite": CbkeCertificate::SUITE,
        "reconstruction_point": hex::encode(cert.reconstruction_point()),
        "subject": address(cert.subject()),
        "issuer": address(cert.issuer()),
        "profile_data": hex::encode(cert.profile_data()),
        "digest": hex::encode(cert.digest()),
    }))
}

fn describe_cbke2(bytes: &[u8]) -> Result<Value> {
    let cert = Cbke2Certificate::parse(bytes)?;
    Ok(json!({
        "suite": Cbke2Certificate::SUITE,
        "serial": format!("{:016X}", cert.serial()),
        "issuer": address(cert.issuer()),
        "subject": address(cert.subject()),
        "valid_from": cert.valid_from(),
        "valid_to": cert.valid_to(),
        "key_usage": format!("0x{:02X}", cert.key_usage()),
        "reconstruction_point": hex::encode(cert.reconstruction_point()),
        "digest": hex::encode(cert.digest()),
    }))
}

fn describe_header(bytes: &[u8], strict: bool) -> Result<Value> {
    let (header, len) = AuxHeader::decode(bytes, strict)?;
    Ok(json!({
        "length": len,
        "level": format!("{:?}", header.control.level),
        "key_id": header.control.key_id.label(),
        "extended_nonce": header.control.extended_nonce,
        "frame_counter": header.frame_counter,
        "source": header.source.map(address),
        "key_sequence": header.key_sequence,
        "trailing_bytes": bytes.len() - len,
    }))
}
