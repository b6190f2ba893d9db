//! Egress restrictions for proxied calls.

use std::error::Error as StdError;
use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use futures_util::future::{BoxFuture, FutureExt};
use reqwest::dns::{Addrs, Name, Resolve, Resolving};
use thiserror::Error;
use url::{Host, Url};

const BLOCKED_HOSTS: [&str; 4] = ["localhost", "127.0.0.1", "::1", "0.0.0.0"];
const BLOCKED_FRAGMENTS: [&str; 2] = [".local", ".internal"];

/// Raised when a host or address falls inside an internal range.
#[derive(Debug, Error)]
#[error("internal network access denied: {0}")]
pub struct InternalAddress(pub String);

/// Hostnames refused without resolving them.
pub fn is_blocked_host_literal(host: &str) -> bool {
    let host = host
        .trim_start_matches('[')
        .trim_end_matches(']')
        .trim_end_matches('.')
        .to_ascii_lowercase();

    BLOCKED_HOSTS.contains(&host.as_str()) || BLOCKED_FRAGMENTS.iter().any(|f| host.contains(f))
}

/// Loopback, RFC 1918 private, link-local, and `::1`. IPv4-mapped IPv6
/// addresses are checked as IPv4.
pub fn is_private_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_private_v4(v4),
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => is_private_v4(v4),
            None => v6 == Ipv6Addr::LOCALHOST,
        },
    }
}

fn is_private_v4(ip: Ipv4Addr) -> bool {
    // 127/8, 10/8, 172.16/12, 192.168/16, 169.254/16
    ip.is_loopback() || ip.is_private() || ip.is_link_local()
}

/// Whether a URL's host is refused before any lookup happens.
pub fn url_host_is_blocked(url: &Url) -> bool {
    match url.host() {
        Some(Host::Domain(domain)) => is_blocked_host_literal(domain),
        Some(Host::Ipv4(ip)) => is_private_ip(IpAddr::V4(ip)) || ip.is_unspecified(),
        Some(Host::Ipv6(ip)) => is_private_ip(IpAddr::V6(ip)) || ip.is_unspecified(),
        None => true,
    }
}

/// Resolves hostnames for the guard's address check.
pub trait HostResolver: Send + Sync {
    fn resolve<'a>(&'a self, host: &'a str) -> BoxFuture<'a, io::Result<Vec<IpAddr>>>;
}

/// The operating system resolver.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

impl HostResolver for SystemResolver {
    fn resolve<'a>(&'a self, host: &'a str) -> BoxFuture<'a, io::Result<Vec<IpAddr>>> {
        async move {
            let addrs = tokio::net::lookup_host((host, 0)).await?;
            Ok(addrs.map(|a| a.ip()).collect())
        }
        .boxed()
    }
}

/// DNS resolver installed into the reqwest client. Refuses names that
/// resolve into internal ranges, so redirect hops and reconnects are
/// held to the same rule as the initial request.
#[derive(Debug, Clone, Copy, Default)]
pub struct GuardedDnsResolver;

impl Resolve for GuardedDnsResolver {
    fn resolve(&self, name: Name) -> Resolving {
        let host = name.as_str().to_string();
        Box::pin(async move {
            if is_blocked_host_literal(&host) {
                return Err(Box::new(InternalAddress(host)) as Box<dyn StdError + Send + Sync>);
            }

            let addrs: Vec<SocketAddr> = tokio::net::lookup_host((host.as_str(), 0)).await?.collect();
            if let Some(blocked) = addrs.iter().find(|a| is_private_ip(a.ip())) {
                tracing::warn!(host = %host, address = %blocked.ip(), "DNS answer points into internal network");
                return Err(Box::new(InternalAddress(host)) as Box<dyn StdError + Send + Sync>);
            }

            Ok(Box::new(addrs.into_iter()) as Addrs)
        })
    }
}
