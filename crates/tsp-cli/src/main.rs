//! RFC 3161 timestamp client
//!
//! `tsp timestamp` obtains a verified token for a file or digest and stores
//! it with the digest as JSON; `tsp inspect` and `tsp verify` read that
//! document back.

use tsp_client::{ClientConfig, TimestampClient, TimestampRequest, TimestampedDigest, VerifyOpts};
use tsp_types::{HashAlgorithm, HashOutput};

use rustls_pki_types::CertificateDer;
use std::env;
use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::process;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

fn main() {
    init_logging();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage(&args[0]);
        process::exit(1);
    }

    let command = &args[1];
    let result = match command.as_str() {
        "timestamp" => timestamp(&args[2..]),
        "inspect" => inspect(&args[2..]),
        "verify" => verify(&args[2..]),
        _ => {
            eprintln!("Unknown command: {}", command);
            print_usage(&args[0]);
            process::exit(1);
        }
    };

    match result {
        Ok(()) => process::exit(0),
        Err(e) => {
            eprintln!("Operation failed:\n{}", e);
            process::exit(1);
        }
    }
}

/// Logs go to stderr; RUST_LOG overrides the default `warn` level
fn init_logging() {
    let filter = env::var("RUST_LOG")
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .and_then(|directive| EnvFilter::try_new(directive).ok())
        .unwrap_or_else(|| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn print_usage(program: &str) {
    eprintln!("Usage:");
    eprintln!("  {} timestamp [--url URL] [--timeout SECS] [--algorithm ALG] [--tsa-cert PEM] [--root PEM] [--output FILE] (--digest HEX | FILE)", program);
    eprintln!("  {} inspect FILE", program);
    eprintln!("  {} verify [--tsa-cert PEM] [--root PEM] FILE", program);
}

/// Trust material shared by `timestamp` and `verify`
#[derive(Debug, Default, PartialEq)]
struct TrustArgs {
    tsa_cert: Option<String>,
    roots: Vec<String>,
}

impl TrustArgs {
    /// Handle `--tsa-cert` / `--root`; returns false for other flags
    fn accept(&mut self, args: &[String], i: &mut usize) -> CliResult<bool> {
        match args[*i].as_str() {
            "--tsa-cert" => self.tsa_cert = Some(flag_value(args, i)?),
            "--root" => self.roots.push(flag_value(args, i)?),
            _ => return Ok(false),
        }
        Ok(true)
    }

    /// The first certificate in `--tsa-cert` is the TSA, any others are
    /// intermediates
    fn verify_opts(&self) -> CliResult<VerifyOpts> {
        let mut opts = VerifyOpts::new();

        if let Some(path) = &self.tsa_cert {
            let mut certs = load_certificates(path)?.into_iter();
            if let Some(tsa) = certs.next() {
                opts = opts.with_tsa_certificate(tsa);
            }
            opts = opts.with_intermediates(certs.collect());
        }

        for path in &self.roots {
            for root in load_certificates(path)? {
                opts = opts.with_root(root);
            }
        }

        Ok(opts)
    }
}

fn load_certificates(path: &str) -> CliResult<Vec<CertificateDer<'static>>> {
    let pem = fs::read_to_string(path).map_err(|e| format!("{}: {}", path, e))?;
    let certs = tsp_crypto::certificates_from_pem(&pem).map_err(|e| format!("{}: {}", path, e))?;
    Ok(certs.into_iter().map(CertificateDer::from).collect())
}

fn flag_value(args: &[String], i: &mut usize) -> CliResult<String> {
    let flag = &args[*i];
    *i += 1;
    args.get(*i)
        .cloned()
        .ok_or_else(|| format!("Missing value for {}", flag).into())
}

#[derive(Debug, PartialEq)]
enum Subject {
    Digest(String),
    File(String),
}

#[derive(Debug, PartialEq)]
struct TimestampArgs {
    url: Option<String>,
    timeout: Option<Duration>,
    algorithm: HashAlgorithm,
    trust: TrustArgs,
    output: Option<String>,
    subject: Subject,
}

fn parse_timestamp_args(args: &[String]) -> CliResult<TimestampArgs> {
    let mut url = None;
    let mut timeout = None;
    let mut algorithm = HashAlgorithm::Sha2256;
    let mut trust = TrustArgs::default();
    let mut output = None;
    let mut digest = None;
    let mut file = None;

    let mut i = 0;
    while i < args.len() {
        if trust.accept(args, &mut i)? {
            i += 1;
            continue;
        }
        match args[i].as_str() {
            "--url" => url = Some(flag_value(args, &mut i)?),
            "--timeout" => {
                let secs: u64 = flag_value(args, &mut i)?
                    .parse()
                    .map_err(|e| format!("Invalid --timeout: {}", e))?;
                timeout = Some(Duration::from_secs(secs));
            }
            "--algorithm" => algorithm = flag_value(args, &mut i)?.parse()?,
            "--output" => output = Some(flag_value(args, &mut i)?),
            "--digest" => digest = Some(flag_value(args, &mut i)?),
            arg if !arg.starts_with("--") => file = Some(arg.to_string()),
            unknown => return Err(format!("Unknown option: {}", unknown).into()),
        }
        i += 1;
    }

    let subject = match (digest, file) {
        (Some(hex), None) => Subject::Digest(hex),
        (None, Some(path)) => Subject::File(path),
        (Some(_), Some(_)) => return Err("Pass either --digest or FILE, not both".into()),
        (None, None) => return Err("Missing --digest or FILE".into()),
    };

    Ok(TimestampArgs {
        url,
        timeout,
        algorithm,
        trust,
        output,
        subject,
    })
}

#[tokio::main]
async fn timestamp(args: &[String]) -> CliResult<()> {
    let args = parse_timestamp_args(args)?;

    let mut config = match &args.url {
        Some(url) => ClientConfig::for_url(url)?,
        None => ClientConfig::default(),
    };
    if let Some(timeout) = args.timeout {
        config = config.with_timeout(timeout);
    }
    config = config.with_verify_opts(args.trust.verify_opts()?);

    let request = match &args.subject {
        Subject::Digest(hex) => TimestampRequest::new(&hex::decode(hex)?, args.algorithm)?,
        Subject::File(path) => {
            let hashed = hash_file(path, args.algorithm)?;
            TimestampRequest::new(&hashed.digest, hashed.algorithm)?
        }
    };

    tracing::info!(
        endpoint = %config.endpoint,
        algorithm = %request.algorithm(),
        digest = %hex::encode(request.digest()),
        "Requesting timestamp"
    );

    let client = TimestampClient::new(config)?;
    let token = client.request_timestamp(&request).await?;

    let document = TimestampedDigest::new(request.hash_output().clone(), token);
    let json = document.to_json()?;

    match &args.output {
        Some(path) => {
            fs::write(path, format!("{}\n", json))?;
            eprintln!(
                "Timestamp from {} written to {}",
                document.timestamp_token.gen_time(),
                path
            );
        }
        None => println!("{}", json),
    }

    Ok(())
}

fn load_document(path: &str) -> CliResult<TimestampedDigest> {
    let json = fs::read_to_string(path).map_err(|e| format!("{}: {}", path, e))?;
    Ok(TimestampedDigest::from_json(&json)?)
}

/// Hash a file without reading it into memory
fn hash_file(path: &str, algorithm: HashAlgorithm) -> CliResult<HashOutput> {
    let file = File::open(path).map_err(|e| format!("{}: {}", path, e))?;
    let mut reader = BufReader::new(file);
    let mut hasher = tsp_crypto::Hasher::new(algorithm);
    let mut buf = [0u8; 64 * 1024];

    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(hasher.finalize())
}

fn inspect(args: &[String]) -> CliResult<()> {
    let [path] = args else {
        return Err("Usage: inspect FILE".into());
    };

    let document = load_document(path)?;
    let token = &document.timestamp_token;

    let asserted_algorithm = match token.hash_algorithm() {
        Some(algorithm) => algorithm.to_string(),
        None => token.hash_algorithm_oid().to_string(),
    };

    println!(
        "Digest:      {} {}",
        document.digest.algorithm,
        document.digest.to_hex()
    );
    println!(
        "Asserted:    {} {}",
        asserted_algorithm,
        hex::encode(token.hashed_message())
    );
    println!("Time:        {}", token.gen_time());
    if let Some(accuracy) = token.accuracy() {
        println!(
            "Accuracy:    {}s {}ms {}us",
            accuracy.seconds.unwrap_or(0),
            accuracy.millis.unwrap_or(0),
            accuracy.micros.unwrap_or(0)
        );
    }
    println!("Serial:      {}", hex::encode(token.serial_number()));
    println!("Policy:      {}", token.policy());
    if let Some(nonce) = token.nonce() {
        println!("Nonce:       {}", hex::encode(nonce));
    }
    for cert in token.certificates() {
        println!("Certificate: {}", cert.tbs_certificate.subject);
    }

    Ok(())
}

fn verify(args: &[String]) -> CliResult<()> {
    let mut trust = TrustArgs::default();
    let mut path = None;

    let mut i = 0;
    while i < args.len() {
        if !trust.accept(args, &mut i)? {
            match args[i].as_str() {
                arg if !arg.starts_with("--") => path = Some(arg.to_string()),
                unknown => return Err(format!("Unknown option: {}", unknown).into()),
            }
        }
        i += 1;
    }

    let path = path.ok_or("Missing FILE")?;
    let document = load_document(&path)?;
    let result = document.verify(&trust.verify_opts()?)?;

    println!(
        "Verified: {} {} timestamped at {} by {}",
        document.digest.algorithm,
        document.digest.to_hex(),
        result.time,
        result.signer.tbs_certificate.subject
    );

    Ok(())
}
