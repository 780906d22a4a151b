#![forbid(unsafe_code)]

//! soapsig CLI: sign and verify WS-Security SOAP envelopes.

mod telemetry;

use clap::{Args, Parser, Subcommand};
use soapsig_core::{algorithm, Error};
use soapsig_keys::{loader, CertificateInfo};
use soapsig_wsse::WsseContext;
use std::path::{Path, PathBuf};
use std::process;

#[derive(Parser)]
#[command(
    name = "soapsig",
    about = "Sign and verify SOAP envelopes with WS-Security X.509 tokens",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign a SOAP envelope
    Sign {
        /// Input envelope
        file: PathBuf,

        #[command(flatten)]
        keys: KeyArgs,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Verify the signature on a SOAP envelope
    Verify {
        /// Input envelope
        file: PathBuf,

        #[command(flatten)]
        keys: KeyArgs,
    },

    /// List supported algorithms, or describe a certificate
    Info {
        /// Certificate to describe (PEM or DER)
        #[arg(long)]
        cert: Option<PathBuf>,
    },
}

#[derive(Args)]
struct KeyArgs {
    /// Private key (PEM or DER, auto-detected)
    #[arg(short = 'k', long)]
    key: Option<PathBuf>,

    /// X.509 certificate: sent with --key when signing, trusted when verifying
    #[arg(long)]
    cert: Option<PathBuf>,

    /// PEM file holding both the certificate and the private key
    #[arg(short = 'b', long)]
    bundle: Option<PathBuf>,

    /// Register additional ID attribute names
    #[arg(long = "id-attr")]
    id_attr: Vec<String>,

    /// Inclusive namespace prefix for reference transforms (repeatable)
    #[arg(long = "prefix")]
    prefix: Vec<String>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Sign { file, keys, output } => {
            telemetry::init_tracing(keys.verbose);
            cmd_sign(&file, &keys, output)
        }
        Commands::Verify { file, keys } => {
            telemetry::init_tracing(keys.verbose);
            cmd_verify(&file, &keys)
        }
        Commands::Info { cert } => {
            telemetry::init_tracing(false);
            cmd_info(cert)
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn cmd_sign(file: &Path, keys: &KeyArgs, output: Option<PathBuf>) -> Result<(), Error> {
    let envelope = std::fs::read(file)?;
    let ctx = build_context(keys)?;
    tracing::info!(file = %file.display(), "signing envelope");

    let signed = soapsig_wsse::sign_envelope(&ctx, &envelope)?;
    write_output(output, signed.as_bytes())
}

fn cmd_verify(file: &Path, keys: &KeyArgs) -> Result<(), Error> {
    let envelope = std::fs::read(file)?;
    let ctx = build_context(keys)?;
    tracing::info!(file = %file.display(), "verifying envelope");

    let result = soapsig_wsse::verify_envelope(&ctx, &envelope)?;
    match result.reason() {
        None => {
            println!("OK");
            Ok(())
        }
        Some(reason) => {
            eprintln!("INVALID: {reason}");
            process::exit(1);
        }
    }
}

fn cmd_info(cert: Option<PathBuf>) -> Result<(), Error> {
    if let Some(path) = cert {
        let key = loader::load_key_file(&path)?;
        let info = CertificateInfo::from_der(key.require_certificate("--cert")?)?;
        println!("Subject:    {}", info.subject);
        println!("Issuer:     {}", info.issuer);
        println!("Serial:     {}", info.serial);
        println!("Not before: {}", info.not_before);
        println!("Not after:  {}", info.not_after);
        if info.is_self_issued() {
            println!("(self-issued)");
        }
        return Ok(());
    }

    println!("soapsig: WS-Security BinarySecurityToken signatures");
    println!();
    println!("Canonicalization:");
    println!("  {}", algorithm::EXC_C14N);
    println!("  {}", algorithm::EXC_C14N_WITH_COMMENTS);
    println!("Digest:");
    println!("  {}", algorithm::SHA1);
    println!("Signature:");
    println!("  {}", algorithm::RSA_SHA1);
    println!("Token type:");
    println!("  {}", algorithm::X509V3_TOKEN_TYPE);
    println!();
    println!("Key formats: PEM, DER (RSA PKCS#1, PKCS#8, X.509, certificate + key bundle)");
    Ok(())
}

// ── Utility functions ────────────────────────────────────────────────

fn write_output(path: Option<PathBuf>, data: &[u8]) -> Result<(), Error> {
    match path {
        Some(p) => Ok(std::fs::write(p, data)?),
        None => {
            use std::io::Write;
            Ok(std::io::stdout().write_all(data)?)
        }
    }
}

fn build_context(args: &KeyArgs) -> Result<WsseContext, Error> {
    let mut ctx = WsseContext::new();
    if !args.prefix.is_empty() {
        ctx = ctx.with_inclusive_prefixes(args.prefix.iter().cloned())?;
    }
    for attr in &args.id_attr {
        ctx.add_id_attr(attr);
    }
    ctx.debug = args.verbose;

    if let Some(path) = &args.bundle {
        ctx = ctx.with_signing_key(loader::load_key_file(path)?);
    }

    match (&args.key, &args.cert) {
        (Some(key_path), cert_path) => {
            let mut key = loader::load_key_file(key_path)?;
            if let Some(cert_path) = cert_path {
                let cert = loader::load_key_file(cert_path)?;
                let der = cert.require_certificate("--cert")?;
                if loader::certificate_public_key(der)? != *key.rsa_public_key() {
                    return Err(Error::Key(format!(
                        "{} does not match {}",
                        key_path.display(),
                        cert_path.display()
                    )));
                }
                key = key.with_certificate(der.to_vec());
            }
            ctx = ctx.with_signing_key(key);
        }
        (None, Some(cert_path)) => {
            ctx = ctx.with_trust_key(loader::load_key_file(cert_path)?);
        }
        (None, None) => {}
    }
    Ok(ctx)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign_keys(args: &[&str]) -> KeyArgs {
        let argv = ["soapsig", "sign", "envelope.xml"].iter().chain(args);
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Sign { keys, .. } => keys,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_prefix_arguments() {
        let ctx = build_context(&sign_keys(&["--prefix", "urn", "--prefix", "#default"])).unwrap();
        assert_eq!(ctx.inclusive_prefixes, ["urn", "#default"]);

        assert!(matches!(
            build_context(&sign_keys(&["--prefix", "a\"b"])),
            Err(Error::Config(_))
        ));
    }
}
