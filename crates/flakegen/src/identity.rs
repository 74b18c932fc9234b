//! Node identity resolution.
//!
//! A node id is either supplied explicitly or derived from the hardware
//! address of a local network interface. Derivation gives only weak,
//! best-effort uniqueness among hosts sharing a network segment: two hosts
//! whose MAC addresses share the same low 10 bits collide. Fleet-wide
//! uniqueness must come from external provisioning.

#[cfg(feature = "tracing")]
use tracing::debug;

use crate::{Error, FlakeId, Result};

/// A network interface as seen by node id derivation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InterfaceInfo {
    /// Interface name, e.g. `eth0`.
    pub name: String,
    /// Whether this is a loopback interface.
    pub loopback: bool,
    /// Whether the interface is administratively up.
    pub up: bool,
    /// Link-layer address; empty when the interface has none.
    pub hardware_addr: Vec<u8>,
}

impl InterfaceInfo {
    /// An up, non-loopback interface with the given hardware address.
    pub fn new(name: impl Into<String>, hardware_addr: &[u8]) -> Self {
        Self {
            name: name.into(),
            loopback: false,
            up: true,
            hardware_addr: hardware_addr.to_vec(),
        }
    }

    pub fn with_loopback(mut self, loopback: bool) -> Self {
        self.loopback = loopback;
        self
    }

    pub fn with_up(mut self, up: bool) -> Self {
        self.up = up;
        self
    }

    fn qualifies(&self) -> bool {
        !self.loopback && self.up && !self.hardware_addr.is_empty()
    }
}

/// A source of network interfaces used to derive a node id.
///
/// Implementations must return interfaces in a stable order; derivation
/// picks the first qualifying one.
pub trait IdentityProvider {
    /// Lists local interfaces in enumeration order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InterfaceLookup`] if the interfaces cannot be listed.
    fn interfaces(&self) -> Result<Vec<InterfaceInfo>>;
}

impl<P: IdentityProvider + ?Sized> IdentityProvider for &P {
    fn interfaces(&self) -> Result<Vec<InterfaceInfo>> {
        (**self).interfaces()
    }
}

/// Reads the host's real network interfaces.
///
/// Uses `getifaddrs(3)` on Unix. Platforms without link-layer enumeration
/// report no interfaces, so derivation fails with
/// [`Error::NoSuitableIdentity`] there.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemInterfaces;

impl IdentityProvider for SystemInterfaces {
    #[cfg(any(
        target_os = "linux",
        target_os = "android",
        target_os = "macos",
        target_os = "ios",
        target_os = "freebsd",
        target_os = "netbsd",
        target_os = "openbsd",
        target_os = "dragonfly",
    ))]
    fn interfaces(&self) -> Result<Vec<InterfaceInfo>> {
        use nix::{ifaddrs::getifaddrs, net::if_::InterfaceFlags};

        let addrs = getifaddrs().map_err(|errno| Error::InterfaceLookup {
            reason: errno.to_string(),
        })?;

        // getifaddrs yields one entry per address; fold them per interface,
        // keeping first-seen order.
        let mut interfaces: Vec<InterfaceInfo> = Vec::new();
        for ifaddr in addrs {
            let hardware_addr = ifaddr
                .address
                .as_ref()
                .and_then(|addr| addr.as_link_addr())
                .map(link_bytes)
                .unwrap_or_default();

            if let Some(existing) = interfaces
                .iter_mut()
                .find(|iface| iface.name == ifaddr.interface_name)
            {
                if existing.hardware_addr.is_empty() {
                    existing.hardware_addr = hardware_addr;
                }
                continue;
            }

            interfaces.push(InterfaceInfo {
                name: ifaddr.interface_name,
                loopback: ifaddr.flags.contains(InterfaceFlags::IFF_LOOPBACK),
                up: ifaddr.flags.contains(InterfaceFlags::IFF_UP),
                hardware_addr,
            });
        }
        Ok(interfaces)
    }

    #[cfg(not(any(
        target_os = "linux",
        target_os = "android",
        target_os = "macos",
        target_os = "ios",
        target_os = "freebsd",
        target_os = "netbsd",
        target_os = "openbsd",
        target_os = "dragonfly",
    )))]
    fn interfaces(&self) -> Result<Vec<InterfaceInfo>> {
        Ok(Vec::new())
    }
}

// `LinkAddr::addr` always yields six bytes on Linux; `halen` says how many
// are real.
#[cfg(any(target_os = "linux", target_os = "android"))]
fn link_bytes(link: &nix::sys::socket::LinkAddr) -> Vec<u8> {
    let len = link.halen().min(6);
    link.addr()
        .map(|mac| mac[..len].to_vec())
        .unwrap_or_default()
}

#[cfg(any(
    target_os = "macos",
    target_os = "ios",
    target_os = "freebsd",
    target_os = "netbsd",
    target_os = "openbsd",
    target_os = "dragonfly",
))]
fn link_bytes(link: &nix::sys::socket::LinkAddr) -> Vec<u8> {
    link.addr().map(|mac| mac.to_vec()).unwrap_or_default()
}

/// A fixed list of interfaces, for tests and hosts with a known identity.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StaticInterfaces {
    interfaces: Vec<InterfaceInfo>,
}

impl StaticInterfaces {
    pub fn new(interfaces: Vec<InterfaceInfo>) -> Self {
        Self { interfaces }
    }
}

impl IdentityProvider for StaticInterfaces {
    fn interfaces(&self) -> Result<Vec<InterfaceInfo>> {
        Ok(self.interfaces.clone())
    }
}

/// Checks that `node_id` fits the 10-bit node field.
///
/// # Errors
///
/// Returns [`Error::InvalidNodeId`] when `node_id` is outside `[0, 1023]`.
pub fn validate_node_id(node_id: i64) -> Result<u16> {
    u16::try_from(node_id)
        .ok()
        .filter(|id| *id <= FlakeId::MAX_NODE_ID)
        .ok_or(Error::InvalidNodeId { node_id })
}

/// Resolves the node id: the explicit value when given, otherwise one derived
/// from `provider`.
///
/// # Errors
///
/// - [`Error::InvalidNodeId`] if `explicit` is out of range
/// - [`Error::NoSuitableIdentity`] if derivation finds no usable interface
/// - [`Error::InterfaceLookup`] if interfaces cannot be listed
pub fn resolve_node_id<P>(explicit: Option<i64>, provider: &P) -> Result<u16>
where
    P: IdentityProvider + ?Sized,
{
    match explicit {
        Some(node_id) => validate_node_id(node_id),
        None => derive_node_id(provider),
    }
}

/// Derives a node id from the first up, non-loopback interface exposing a
/// hardware address: its last two octets, masked to the node field width.
///
/// # Errors
///
/// - [`Error::NoSuitableIdentity`] if no interface qualifies
/// - [`Error::InterfaceLookup`] if interfaces cannot be listed
pub fn derive_node_id<P>(provider: &P) -> Result<u16>
where
    P: IdentityProvider + ?Sized,
{
    let interfaces = provider.interfaces()?;
    let iface = interfaces
        .iter()
        .find(|iface| iface.qualifies())
        .ok_or(Error::NoSuitableIdentity)?;

    let raw = match iface.hardware_addr.as_slice() {
        [.., hi, lo] => u16::from_be_bytes([*hi, *lo]),
        [lo] => u16::from(*lo),
        [] => return Err(Error::NoSuitableIdentity),
    };
    let node_id = raw & FlakeId::MAX_NODE_ID;

    #[cfg(feature = "tracing")]
    debug!(
        interface = %iface.name,
        mac = %format_mac(&iface.hardware_addr),
        raw,
        node_id,
        "derived node id from network interface"
    );

    Ok(node_id)
}

#[cfg(feature = "tracing")]
fn format_mac(addr: &[u8]) -> String {
    addr.iter()
        .map(|octet| format!("{octet:02x}"))
        .collect::<Vec<_>>()
        .join(":")
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingInterfaces;

    impl IdentityProvider for FailingInterfaces {
        fn interfaces(&self) -> Result<Vec<InterfaceInfo>> {
            Err(Error::InterfaceLookup {
                reason: "permission denied".into(),
            })
        }
    }

    #[test]
    fn explicit_node_id_bounds() {
        let none = StaticInterfaces::default();
        assert_eq!(resolve_node_id(Some(0), &none), Ok(0));
        assert_eq!(resolve_node_id(Some(1023), &none), Ok(1023));
        assert_eq!(
            resolve_node_id(Some(1024), &none),
            Err(Error::InvalidNodeId { node_id: 1024 })
        );
        assert_eq!(
            resolve_node_id(Some(-1), &none),
            Err(Error::InvalidNodeId { node_id: -1 })
        );
        assert_eq!(
            validate_node_id(i64::MAX),
            Err(Error::InvalidNodeId { node_id: i64::MAX })
        );
    }

    #[test]
    fn explicit_node_id_bypasses_provider() {
        assert_eq!(resolve_node_id(Some(7), &FailingInterfaces), Ok(7));
    }

    #[test]
    fn derives_from_last_two_octets() {
        let provider = StaticInterfaces::new(vec![InterfaceInfo::new(
            "eth0",
            &[0x02, 0x42, 0xac, 0x11, 0x01, 0x2f],
        )]);
        // 0x012f & 0x3ff
        assert_eq!(derive_node_id(&provider), Ok(0x012f));
    }

    #[test]
    fn masks_to_node_width() {
        let provider = StaticInterfaces::new(vec![InterfaceInfo::new(
            "eth0",
            &[0xde, 0xad, 0xbe, 0xef, 0xff, 0xff],
        )]);
        assert_eq!(derive_node_id(&provider), Ok(1023));
    }

    #[test]
    fn single_octet_address_is_used_as_is() {
        let provider = StaticInterfaces::new(vec![InterfaceInfo::new("sl0", &[0x2a])]);
        assert_eq!(derive_node_id(&provider), Ok(42));
    }

    #[test]
    fn skips_loopback_down_and_addressless() {
        let provider = StaticInterfaces::new(vec![
            InterfaceInfo::new("lo", &[0, 0, 0, 0, 0, 1]).with_loopback(true),
            InterfaceInfo::new("eth1", &[0, 0, 0, 0, 0, 2]).with_up(false),
            InterfaceInfo::new("tun0", &[]),
            InterfaceInfo::new("eth0", &[0, 0, 0, 0, 0x01, 0x05]),
            InterfaceInfo::new("eth2", &[0, 0, 0, 0, 0, 9]),
        ]);
        assert_eq!(derive_node_id(&provider), Ok(0x0105));
    }

    #[test]
    fn no_qualifying_interface() {
        let provider = StaticInterfaces::new(vec![
            InterfaceInfo::new("lo", &[0, 0, 0, 0, 0, 0]).with_loopback(true),
            InterfaceInfo::new("wg0", &[]),
        ]);
        assert_eq!(derive_node_id(&provider), Err(Error::NoSuitableIdentity));
        assert_eq!(
            resolve_node_id(None, &StaticInterfaces::default()),
            Err(Error::NoSuitableIdentity)
        );
    }

    #[test]
    fn lookup_failure_propagates() {
        assert!(matches!(
            resolve_node_id(None, &FailingInterfaces),
            Err(Error::InterfaceLookup { .. })
        ));
    }

    #[test]
    fn system_interfaces_resolve_or_report() {
        // Sandboxes may have only loopback; either outcome is well-formed.
        match derive_node_id(&SystemInterfaces) {
            Ok(node_id) => assert!(node_id <= FlakeId::MAX_NODE_ID),
            Err(err) => assert!(matches!(
                err,
                Error::NoSuitableIdentity | Error::InterfaceLookup { .. }
            )),
        }
    }
}
