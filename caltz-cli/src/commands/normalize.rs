use anyhow::Result;
use caltz_core::zone;

pub fn run(name: &str) -> Result<()> {
    let normalized = zone::normalize(Some(name));

    if zone::resolve(&normalized).is_err() {
        tracing::warn!(zone = %name, "not a known timezone, printed unchanged");
    }

    println!("{normalized}");
    Ok(())
}
