use std::{
    io,
    net::{SocketAddr, ToSocketAddrs as _},
};

use thiserror::Error;

/// Errors that could occur while resolving the address of the DogStatsD server.
#[derive(Debug, Error)]
pub enum ResolutionError {
    /// The lookup itself failed.
    #[error("failed to resolve '{host}:{port}': {source}")]
    Lookup {
        /// Host that was being resolved.
        host: String,
        /// Port that was being resolved.
        port: u16,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// The lookup succeeded but returned no addresses.
    #[error("no addresses found for '{host}:{port}'")]
    NoAddresses {
        /// Host that was being resolved.
        host: String,
        /// Port that was being resolved.
        port: u16,
    },
}

/// Resolves the address metrics are sent to.
pub trait AddressResolver: Send + Sync {
    /// Returns the address to send the next datagram to.
    ///
    /// # Errors
    ///
    /// If the address cannot be resolved, an error is returned.
    fn resolve(&self) -> Result<SocketAddr, ResolutionError>;
}

/// Resolves the address once, when created.
///
/// Suitable when the address of the DogStatsD server does not change over the life of the process.
#[derive(Clone, Debug)]
pub struct StaticResolver {
    addr: SocketAddr,
}

impl StaticResolver {
    /// Creates a new `StaticResolver`, resolving `host` and `port` immediately.
    ///
    /// # Errors
    ///
    /// If the address cannot be resolved, an error is returned.
    pub fn new(host: &str, port: u16) -> Result<Self, ResolutionError> {
        lookup(host, port).map(|addr| Self { addr })
    }

    /// Returns the resolved address.
    pub const fn addr(&self) -> SocketAddr {
        self.addr
    }
}

impl From<SocketAddr> for StaticResolver {
    fn from(addr: SocketAddr) -> Self {
        Self { addr }
    }
}

impl AddressResolver for StaticResolver {
    fn resolve(&self) -> Result<SocketAddr, ResolutionError> {
        Ok(self.addr)
    }
}

/// Resolves the address again for every datagram.
///
/// This picks up DNS changes, such as the DogStatsD server moving to a new IP, without having to rebuild the
/// transport, at the cost of a lookup per send.
#[derive(Clone, Debug)]
pub struct RetryingResolver {
    host: String,
    port: u16,
}

impl RetryingResolver {
    /// Creates a new `RetryingResolver`.
    ///
    /// No lookup is performed until [`resolve`][AddressResolver::resolve] is called.
    pub fn new<H>(host: H, port: u16) -> Self
    where
        H: Into<String>,
    {
        Self { host: host.into(), port }
    }
}

impl AddressResolver for RetryingResolver {
    fn resolve(&self) -> Result<SocketAddr, ResolutionError> {
        lookup(&self.host, self.port)
    }
}

fn lookup(host: &str, port: u16) -> Result<SocketAddr, ResolutionError> {
    let addrs = (host, port).to_socket_addrs().map_err(|source| ResolutionError::Lookup {
        host: host.to_string(),
        port,
        source,
    })?;

    // Take the first IPv4 address if the lookup returned both families.
    let mut fallback = None;
    for addr in addrs {
        if addr.is_ipv4() {
            return Ok(addr);
        }
        if fallback.is_none() {
            fallback = Some(addr);
        }
    }

    fallback.ok_or_else(|| ResolutionError::NoAddresses { host: host.to_string(), port })
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use super::{AddressResolver as _, ResolutionError, RetryingResolver, StaticResolver};

    #[test]
    fn static_resolver_freezes_address() {
        let resolver = StaticResolver::new("127.0.0.1", 8125).expect("literal address should resolve");
        let expected = SocketAddr::from(([127, 0, 0, 1], 8125));

        assert_eq!(resolver.addr(), expected);
        assert_eq!(resolver.resolve().unwrap(), expected);
        assert_eq!(resolver.resolve().unwrap(), expected);
    }

    #[test]
    fn retrying_resolver_resolves_on_demand() {
        let resolver = RetryingResolver::new("127.0.0.1", 9125);
        assert_eq!(resolver.resolve().unwrap(), SocketAddr::from(([127, 0, 0, 1], 9125)));
    }

    #[test]
    fn ipv6_literal_resolves() {
        let resolver = RetryingResolver::new("::1", 8125);
        let addr = resolver.resolve().unwrap();
        assert!(addr.is_ipv6());
        assert_eq!(addr.port(), 8125);
    }

    #[test]
    fn unresolvable_host() {
        // An interior NUL is rejected before any lookup is attempted.
        let err = StaticResolver::new("bad\0host", 8125).unwrap_err();
        assert!(matches!(err, ResolutionError::Lookup { port: 8125, .. }));

        let resolver = RetryingResolver::new("bad\0host", 8125);
        assert!(resolver.resolve().is_err());
    }
}
