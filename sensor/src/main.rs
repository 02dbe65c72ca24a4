#[cfg(target_os = "linux")]
mod host;

#[cfg(target_os = "linux")]
fn main() -> anyhow::Result<()> {
    host::run()
}

#[cfg(not(target_os = "linux"))]
fn main() -> anyhow::Result<()> {
    anyhow::bail!("the SHT4x probe needs a Linux i2c character device")
}
