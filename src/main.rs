use std::process;

use anyhow::{anyhow, bail, Context, Result};
use rand::rngs::OsRng;

use rsa_kg::rsa::bigint::RsaBigInt;
use rsa_kg::{KeyGenerator, KeyPair, OperationMode};

const USAGE: &str = "usage: rsa-kg [--crt] [--exponent 3|17|65537] [BITS]";

struct Options {
    mode: OperationMode,
    exponent: u32,
    modulus_bits: u32,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Options> {
    let mut options = Options {
        mode: OperationMode::NonCrt,
        exponent: 65537,
        modulus_bits: 2048,
    };

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--crt" => options.mode = OperationMode::Crt,
            "--exponent" | "-e" => {
                let value = args.next().ok_or_else(|| anyhow!("--exponent needs a value"))?;
                options.exponent = value
                    .parse()
                    .with_context(|| format!("invalid exponent {:?}", value))?;
            }
            "--help" | "-h" => bail!(USAGE),
            bits if !bits.starts_with('-') => {
                options.modulus_bits = bits
                    .parse()
                    .with_context(|| format!("invalid modulus size {:?}", bits))?;
            }
            other => bail!("unknown option {:?}\n{}", other, USAGE),
        }
    }
    Ok(options)
}

fn hex_of(n: &RsaBigInt) -> String {
    hex::encode(n.to_bytes_be())
}

fn print_key_pair(pair: &KeyPair) {
    let public_key = &pair.public_key;
    println!("modulus bits: {}", public_key.n_size_bits);
    println!("n:    {}", hex_of(&public_key.modulus()));
    println!("e:    {}", hex_of(&public_key.exponent()));

    if let Some(db) = pair.private_key.non_crt() {
        println!("d:    {}", hex_of(&db.private_exponent()));
    }
    if let Some(db) = pair.private_key.crt() {
        println!("p:    {}", hex_of(&db.p()));
        println!("q:    {}", hex_of(&db.q()));
        println!("dP:   {}", hex_of(&db.dp()));
        println!("dQ:   {}", hex_of(&db.dq()));
        println!("qInv: {}", hex_of(&db.qinv()));
    }
}

fn run() -> Result<()> {
    let options = parse_args(std::env::args().skip(1))?;
    let exponent = options.exponent.to_be_bytes();
    let exponent = &exponent[exponent.iter().position(|&b| b != 0).unwrap_or(3)..];

    let pair = KeyGenerator::new()
        .generate(&mut OsRng, exponent, options.modulus_bits, options.mode)
        .context("key generation failed")?;

    print_key_pair(&pair);
    Ok(())
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}
