//! Interface-name filtering and normalization.
//!
//! Polling sources report the same interface under several spellings
//! (`GigabitEthernet0/0/1`, `Gi0/0/1`, `gi0/0/1`). Matching between runs and
//! between the physical table and the interface table only works on one
//! canonical spelling, produced here.

/// Returns whether an interface-table row is worth synchronizing.
///
/// Management, console, span and vendor-internal pseudo interfaces are
/// skipped; slotted names, loopbacks, tunnels, VLANs, bridge domains and
/// port channels pass.
pub fn is_syncable(name: &str) -> bool {
    let lower = name.to_lowercase();
    (!name.is_empty() && name.chars().all(|c| c.is_ascii_digit()))
        || lower == "gi0"
        || lower.starts_with("lo")
        || name.starts_with("Po")
        || (lower.contains("po") && name.contains('/'))
        || lower.starts_with("se")
        || lower.starts_with("tu")
        || lower.starts_with("vl")
        || lower.starts_with("br")
        || lower.starts_with("bd")
        || lower.contains("vlan")
        || name.contains('/')
}

/// The base interface spelling of a dotted name (`"Gi0/0/1.200"` -> `"Gi0/0/1"`).
pub fn base_interface(name: &str) -> &str {
    name.split('.').next().unwrap_or(name)
}

/// The VLAN sub-interface segment (`"Gi0/0/1.200"` -> `Some("200")`).
///
/// Names carrying a service-instance marker are not plain sub-interfaces.
pub fn sub_interface_segment(name: &str) -> Option<&str> {
    if name.to_lowercase().contains(".si") {
        return None;
    }
    let mut parts = name.split('.');
    let _base = parts.next()?;
    parts.next()
}

/// The service-instance segment (`"Gi0/0/1.si.300"` -> `Some("300")`).
pub fn service_instance_segment(name: &str) -> Option<&str> {
    if !name.to_lowercase().contains(".si") {
        return None;
    }
    name.split('.').nth(2)
}

/// Wraps an interface name into its canonical short spelling.
///
/// Port channels keep their `Po` capitalization; everything else is
/// lowercased and the vendor long forms are collapsed (`gigabitethernet` ->
/// `gi`, `tengige` -> `te`, `fastethernet` -> `fa`, ...). Dotted names
/// collapse to the child segment, mirroring how sub-interfaces and service
/// instances are named in the inventory.
pub fn normalize(name: &str) -> String {
    if name.starts_with("Po") {
        return name.trim().to_string();
    }

    let mut n = name.trim().to_lowercase().replace('_', "/");

    // pseudowires keep their digits, spaces stripped
    if n.contains("pw") {
        return n.replace(' ', "");
    }
    if n.contains("tunnel-te") {
        return n.replace("tunnel-te", "tu");
    }

    if let Some(segment) = service_instance_segment(&n) {
        return segment.to_string();
    }
    if let Some(segment) = sub_interface_segment(&n) {
        n = segment.to_string();
    }

    if n.starts_with("lo") && n.len() < 6 && !n.contains('/') {
        return n.replace("lo", "loopback");
    }

    if n.contains("fastethernet") {
        return n.replace("fastethernet", "fa");
    }
    for te_form in ["tengigabitethernet", "tengige", "tentigt", "tengig", "tengi"] {
        if n.contains(te_form) {
            return n.replace(te_form, "te");
        }
    }
    if n.contains("pos") {
        return n;
    }
    if n.contains("po") {
        return n.replace("po", "pos");
    }
    if n.contains("gigabitethernet") {
        return n.replace("gigabitethernet", "gi");
    }
    if n.contains("gi") {
        return n;
    }
    if n.starts_with("ge ") {
        return n.replace("ge ", "gi");
    }
    if n.starts_with("ge") {
        return n.replace("ge", "gi");
    }
    if n.starts_with("se") {
        return n;
    }
    n
}
