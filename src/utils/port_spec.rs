//! Port specification parsing (`"22,80,1000-1024"`)

use crate::ScanError;

/// Expand a port specification into the ports it covers.
///
/// Tokens are comma-separated single ports or inclusive `start-end` ranges.
/// Order is preserved and duplicates are kept (`"80,80"` yields two entries);
/// collapsing them is the aggregator's job.
pub fn parse_port_spec(port_spec: &str) -> crate::Result<Vec<u16>> {
    let mut ports = Vec::new();

    for part in port_spec.split(',') {
        let part = part.trim();
        if part.is_empty() {
            return Err(ScanError::InvalidPortSpec(format!(
                "empty entry in '{}'",
                port_spec
            )));
        }

        if let Some((start, end)) = part.split_once('-') {
            let start = parse_port(start)?;
            let end = parse_port(end)?;

            if start > end {
                return Err(ScanError::InvalidPortSpec(format!(
                    "Start port {} cannot be greater than end port {}",
                    start, end
                )));
            }
            ports.extend(start..=end);
        } else {
            ports.push(parse_port(part)?);
        }
    }

    Ok(ports)
}

fn parse_port(text: &str) -> crate::Result<u16> {
    let text = text.trim();
    let value: u32 = text
        .parse()
        .map_err(|e| ScanError::InvalidPortSpec(format!("Invalid port '{}': {}", text, e)))?;

    match value {
        0 => Err(ScanError::InvalidPortSpec("Port 0 is not valid".to_string())),
        1..=65535 => Ok(value as u16),
        _ => Err(ScanError::InvalidPortSpec(format!(
            "Port {} is out of range (1-65535)",
            value
        ))),
    }
}
