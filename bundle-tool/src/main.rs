use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::Path;

use anyhow::{bail, Context, Error, Result};
use clap::{ArgAction, Args, Parser, Subcommand};

use p12_data_formats::{
    constants::NO_MAC, Bundle, Certificate, CryptoBackend, OpensslBackend, PrivateKey,
};
use p12_util::settings::{bundle_tool::BundleToolSettings, settings_for};

#[derive(Parser)]
#[clap(version = "0.1")]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Creates a new PKCS#12 archive
    Create(CreateArguments),
    /// Prints the contents of a PKCS#12 archive
    Dump(DumpArguments),
    /// Writes the parts of a PKCS#12 archive to PEM files
    Extract(ExtractArguments),
}

#[derive(Args)]
struct CreateArguments {
    /// Output path for the archive
    output: String,
    /// Path to the certificate (PEM)
    #[clap(long, action = ArgAction::Set)]
    cert: String,
    /// Path to the private key (PEM or DER)
    #[clap(long, action = ArgAction::Set)]
    key: Option<String>,
    /// Path to the CA certificates (PEM)
    #[clap(long, action = ArgAction::Set)]
    ca_chain: Option<String>,
    /// Passphrase protecting the archive
    #[clap(long, action = ArgAction::Set)]
    passphrase: Option<String>,
    /// Friendly name stored with the certificate and key
    #[clap(long, action = ArgAction::Set)]
    friendly_name: Option<String>,
    /// Key derivation iteration count
    #[clap(long, action = ArgAction::Set)]
    iterations: Option<i32>,
    /// MAC iteration count
    #[clap(long, action = ArgAction::Set, allow_hyphen_values = true)]
    mac_iterations: Option<i32>,
    /// Leave the MAC out of the archive
    #[clap(long, conflicts_with = "mac_iterations")]
    no_mac: bool,
}

#[derive(Args)]
struct DumpArguments {
    /// Path to the archive
    path: String,
    /// Passphrase protecting the archive
    #[clap(long, action = ArgAction::Set)]
    passphrase: Option<String>,
}

#[derive(Args)]
struct ExtractArguments {
    /// Path to the archive
    path: String,
    /// Passphrase protecting the archive
    #[clap(long, action = ArgAction::Set)]
    passphrase: Option<String>,
    /// Output path for the certificate
    #[clap(long, action = ArgAction::Set)]
    cert_out: Option<String>,
    /// Output path for the private key
    #[clap(long, action = ArgAction::Set)]
    key_out: Option<String>,
    /// Output path for the CA certificates
    #[clap(long, action = ArgAction::Set)]
    ca_out: Option<String>,
}

fn main() -> Result<()> {
    p12_util::add_version!();
    p12_util::init_logging();

    let cli = Cli::parse();
    let settings: BundleToolSettings = settings_for("bundle-tool")?
        .try_deserialize()
        .context("Error parsing configuration")?;

    match cli.command {
        Commands::Create(args) => create(&args, &settings),
        Commands::Dump(args) => dump(&args),
        Commands::Extract(args) => extract(&args),
    }
}

fn load_private_key(path: &str) -> Result<PrivateKey, Error> {
    let contents = fs::read(path)?;
    Ok(PrivateKey::from_pem_or_der(&contents)?)
}

fn load_certificate(path: &str) -> Result<Certificate, Error> {
    let contents = fs::read(path)?;
    Ok(Certificate::from_pem(&contents)?)
}

fn load_certificates(path: &str) -> Result<Vec<Certificate>, Error> {
    let contents = fs::read(path)?;
    Ok(Certificate::stack_from_pem(&contents)?)
}

fn write_new_file(path: &str, contents: &[u8]) -> Result<(), Error> {
    let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            bail!("Output file {} already exists", path)
        }
        Err(e) => return Err(e).with_context(|| format!("Error creating {}", path)),
    };
    file.write_all(contents)
        .with_context(|| format!("Error writing {}", path))
}

fn create(args: &CreateArguments, settings: &BundleToolSettings) -> Result<(), Error> {
    if Path::new(&args.output).exists() {
        bail!("Output file {} already exists", args.output);
    }

    let mut bundle = Bundle::new();

    let cert = load_certificate(&args.cert).context("Error loading certificate")?;
    if let Some(key) = &args.key {
        let key = load_private_key(key).context("Error loading private key")?;
        if !key
            .matches_certificate(&cert)
            .context("Error comparing private key to certificate")?
        {
            bail!("Private key does not match certificate {}", cert.subject());
        }
        bundle.set_private_key(Some(key));
    }
    bundle.set_certificate(Some(cert));

    if let Some(ca_chain) = &args.ca_chain {
        let chain = load_certificates(ca_chain).context("Error loading CA certificates")?;
        log::debug!("Loaded {} CA certificates", chain.len());
        bundle.set_ca_certificates(Some(chain));
    }

    let mut options = settings.export.to_options();
    if let Some(iterations) = args.iterations {
        options = options.iterations(iterations);
    }
    if let Some(mac_iterations) = args.mac_iterations {
        options = options.mac_iterations(mac_iterations);
    }
    if args.no_mac {
        options = options.mac_iterations(NO_MAC);
    }
    if let Some(friendly_name) = &args.friendly_name {
        options = options.friendly_name(friendly_name);
    }
    if let Some(passphrase) = &args.passphrase {
        options = options.passphrase(passphrase);
    }
    log::debug!("Export options: {:?}", options);

    let archive = bundle
        .export(&options)
        .context("Error creating archive")?;
    write_new_file(&args.output, &archive)?;

    log::info!("Archive written to {}", args.output);

    Ok(())
}

fn dump(args: &DumpArguments) -> Result<(), Error> {
    let backend = OpensslBackend;
    let archive = {
        let contents = fs::read(&args.path).context("Error reading archive")?;
        backend
            .parse_archive(&contents)
            .context("Error decoding archive")?
    };
    let passphrase = args.passphrase.as_deref();

    if backend.has_mac(&archive) {
        let verified = backend
            .verify_mac(&archive, passphrase)
            .context("Error verifying MAC")?;
        println!(
            "MAC: present ({})",
            if verified { "verified" } else { "verification failed" }
        );
    } else {
        println!("MAC: <none>");
    }

    let bundle = Bundle::from_archive(&backend, Some(&archive), passphrase)
        .context("Error extracting archive")?;

    println!("Certificate:");
    let cert = bundle.certificate();
    match &cert {
        None => println!("\t<none>"),
        Some(cert) => {
            println!("\tSubject: {}", cert.subject());
            println!("\tIssuer: {}", cert.issuer());
            println!(
                "\tSHA-256 fingerprint: {}",
                cert.fingerprint().context("Error computing fingerprint")?
            );
        }
    }

    println!("Private key:");
    match bundle.private_key() {
        None => println!("\t<none>"),
        Some(key) => {
            println!("\tType: {} ({} bits)", key.key_type(), key.bits());
            match &cert {
                None => println!("\tMatches certificate: <no certificate>"),
                Some(cert) => println!(
                    "\tMatches certificate: {}",
                    key.matches_certificate(cert)
                        .context("Error comparing private key to certificate")?
                ),
            }
        }
    }

    println!("CA certificates:");
    match bundle.ca_certificates() {
        Some(certs) if !certs.is_empty() => {
            for (num, cert) in certs.iter().enumerate() {
                println!("\tCertificate {}: {}", num, cert.subject());
            }
        }
        _ => println!("\t<none>"),
    }

    Ok(())
}

fn extract(args: &ExtractArguments) -> Result<(), Error> {
    let bundle = {
        let contents = fs::read(&args.path).context("Error reading archive")?;
        Bundle::from_der(&contents, args.passphrase.as_deref())
            .context("Error extracting archive")?
    };

    if let Some(cert_out) = &args.cert_out {
        match bundle.certificate() {
            None => log::warn!("Archive contains no certificate, not writing {}", cert_out),
            Some(cert) => write_new_file(
                cert_out,
                &cert.to_pem().context("Error encoding certificate")?,
            )?,
        }
    }

    if let Some(key_out) = &args.key_out {
        match bundle.private_key() {
            None => log::warn!("Archive contains no private key, not writing {}", key_out),
            Some(key) => write_new_file(
                key_out,
                &key.to_pem_pkcs8().context("Error encoding private key")?,
            )?,
        }
    }

    if let Some(ca_out) = &args.ca_out {
        let certs: Vec<Certificate> = bundle
            .ca_certificates()
            .map(|certs| certs.to_vec())
            .unwrap_or_default();
        let mut contents = Vec::new();
        for cert in certs.iter() {
            contents.extend(cert.to_pem().context("Error encoding CA certificate")?);
        }
        write_new_file(ca_out, &contents)?;
        log::info!("Wrote {} CA certificates to {}", certs.len(), ca_out);
    }

    Ok(())
}
