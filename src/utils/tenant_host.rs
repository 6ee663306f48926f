/// Tenant subdomain addressed by a `Host` header, if any.
///
/// `acme.localhost:8080` gives `acme`, `acme.hr.example.com` gives `acme`.
/// Bare `localhost`, two-label hosts and IP literals give `None`.
pub fn tenant_from_host(host: &str) -> Option<String> {
    let host = host.trim();
    if host.is_empty() {
        return None;
    }

    let name = strip_port(host);
    if name.parse::<std::net::IpAddr>().is_ok() {
        return None;
    }

    let labels: Vec<&str> = name.split('.').filter(|l| !l.is_empty()).collect();

    if labels.last() == Some(&"localhost") {
        return match labels.as_slice() {
            [sub, .., _] if *sub != "localhost" => Some(sub.to_lowercase()),
            _ => None,
        };
    }

    if labels.len() > 2 {
        return labels.first().map(|s| s.to_lowercase());
    }

    None
}

fn strip_port(host: &str) -> &str {
    // bracketed IPv6, e.g. [::1]:8080
    if let Some(rest) = host.strip_prefix('[') {
        return rest.split(']').next().unwrap_or(rest);
    }
    match host.rsplit_once(':') {
        Some((name, port)) if port.chars().all(|c| c.is_ascii_digit()) => name,
        _ => host,
    }
}
