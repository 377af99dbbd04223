//! Runs a client session against the secret driver over an in-memory host.
//!
//! Usage: `secret-driver [GRANTEE_UID]`
//!
//! Opens the device for write, stores "hello world", optionally grants it
//! to `GRANTEE_UID`, closes, then reads it back as the resulting owner.
//! Set `SECRET_DRIVER_CONFIG` to a JSON config file to override defaults.

use anyhow::{bail, Context};
use tracing_subscriber::EnvFilter;

use secret_driver::core::{Principal, GRANT_REQUEST, O_RDONLY, O_WRONLY};
use secret_driver::{DriverConfig, Endpoint, GrantHandle, MemoryHost, Reply, SecretDriver};

const CONFIG_ENV: &str = "SECRET_DRIVER_CONFIG";
const WRITER_UID: u32 = 1000;
const MESSAGE: &[u8] = b"hello world";

const WRITER: Endpoint = Endpoint(1);
const GRANTEE: Endpoint = Endpoint(2);
const WRITE_BUF: GrantHandle = GrantHandle(1);
const GRANT_ARG: GrantHandle = GrantHandle(2);
const READ_BUF: GrantHandle = GrantHandle(3);

fn load_config() -> anyhow::Result<DriverConfig> {
    match std::env::var(CONFIG_ENV) {
        Ok(path) => {
            let json = std::fs::read_to_string(&path)
                .with_context(|| format!("reading config from {path}"))?;
            Ok(DriverConfig::from_json(&json)?)
        }
        Err(_) => Ok(DriverConfig::default()),
    }
}

fn report(step: &str, reply: Reply) -> Reply {
    match reply.errno() {
        Some(errno) => println!("{step}: failed (errno {errno})"),
        None => println!("{step}: {}", reply.status()),
    }
    reply
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let grantee = match std::env::args().nth(1) {
        Some(arg) => Some(Principal::new(
            arg.parse::<u32>()
                .with_context(|| format!("invalid uid: {arg}"))?,
        )),
        None => None,
    };

    let config = load_config()?;
    let host = MemoryHost::new();
    host.register(WRITER, Principal::new(WRITER_UID));
    host.expose(WRITER, WRITE_BUF, MESSAGE.to_vec());

    let (handle, task) = secret_driver::service::spawn(SecretDriver::new(config, host.clone()));

    if !report("open(O_WRONLY)", handle.open(WRITER, O_WRONLY).await?).is_ok() {
        bail!("could not open the device for writing");
    }
    report(
        "write",
        handle.write(WRITER, WRITE_BUF, MESSAGE.len()).await?,
    );

    let (reader, reader_uid) = match grantee {
        Some(uid) => {
            host.expose(WRITER, GRANT_ARG, uid.to_ne_bytes().to_vec());
            let reply = report(
                &format!("grant({uid})"),
                handle.grant(WRITER, GRANT_REQUEST, GRANT_ARG).await?,
            );
            if reply.is_ok() {
                host.register(GRANTEE, uid);
                (GRANTEE, uid)
            } else {
                (WRITER, Principal::new(WRITER_UID))
            }
        }
        None => (WRITER, Principal::new(WRITER_UID)),
    };
    report("close", handle.close(WRITER).await?);

    host.allocate(reader, READ_BUF, MESSAGE.len());
    if report(
        &format!("open(O_RDONLY) as {reader_uid}"),
        handle.open(reader, O_RDONLY).await?,
    )
    .is_ok()
    {
        let read = report("read", handle.read(reader, READ_BUF, MESSAGE.len()).await?);
        if let Some(bytes) = host.region(reader, READ_BUF) {
            println!(
                "secret: {:?}",
                String::from_utf8_lossy(&bytes[..read.transferred()])
            );
        }
        report("close", handle.close(reader).await?);
    }

    drop(handle);
    let driver = task.await.context("service loop panicked")?;
    println!("device phase: {:?}", driver.state().phase());
    Ok(())
}
