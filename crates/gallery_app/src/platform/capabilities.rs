use std::path::Path;

use gallery_core::Capabilities;

/// Overrides detection when set to `1`/`true` or `0`/`false`.
pub const ACCELERATOR_ENV: &str = "GALLERY_ACCELERATOR";

const DEVICE_NODES: &[&str] = &["/dev/nvidia0", "/dev/dri/renderD128"];

/// Capabilities of this host. `assume_accelerator` wins over everything else.
pub fn detect(assume_accelerator: bool) -> Capabilities {
    let accelerator = assume_accelerator
        || parse_override(std::env::var(ACCELERATOR_ENV).ok().as_deref())
            .unwrap_or_else(|| DEVICE_NODES.iter().any(|node| Path::new(node).exists()));
    Capabilities { accelerator }
}

fn parse_override(value: Option<&str>) -> Option<bool> {
    match value?.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => None,
    }
}
