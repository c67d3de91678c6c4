use serde::{Deserialize, Serialize};
use std::{marker::PhantomData, net::IpAddr};

/// Typestate builder for [`SelectProtocol`]; `build` is only reachable
/// once every field has been given.
pub struct SelectProtocolBuilder<Address = (), Port = (), Mode = ()> {
    phantom: PhantomData<(Address, Port, Mode)>,
    address: Option<IpAddr>,
    port: Option<u16>,
    mode: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Hash, Serialize)]
pub struct SelectProtocol {
    pub protocol: String,
    pub data: SelectProtocolData,
}

impl SelectProtocol {
    #[must_use]
    pub const fn builder() -> SelectProtocolBuilder {
        SelectProtocolBuilder::new()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Hash, Serialize)]
pub struct SelectProtocolData {
    #[serde(with = "crate::deserializers::ip_string")]
    pub address: IpAddr,
    pub port: u16,
    pub mode: String,
}

#[allow(private_interfaces)]
mod builder {
    use super::{SelectProtocol, SelectProtocolBuilder, SelectProtocolData};
    use std::{marker::PhantomData, net::IpAddr};

    pub struct WithAddr;
    pub struct WithPort;
    pub struct WithMode;

    impl SelectProtocolBuilder {
        #[must_use]
        pub const fn new() -> Self {
            SelectProtocolBuilder {
                phantom: PhantomData,
                address: None,
                port: None,
                mode: None,
            }
        }
    }

    impl<Port, Mode> SelectProtocolBuilder<(), Port, Mode> {
        #[must_use]
        pub fn address(self, address: IpAddr) -> SelectProtocolBuilder<WithAddr, Port, Mode> {
            SelectProtocolBuilder {
                phantom: PhantomData,
                address: Some(address),
                port: self.port,
                mode: self.mode,
            }
        }
    }

    impl<Addr, Mode> SelectProtocolBuilder<Addr, (), Mode> {
        #[must_use]
        pub fn port(self, port: u16) -> SelectProtocolBuilder<Addr, WithPort, Mode> {
            SelectProtocolBuilder {
                phantom: PhantomData,
                address: self.address,
                port: Some(port),
                mode: self.mode,
            }
        }
    }

    impl<Addr, Port> SelectProtocolBuilder<Addr, Port, ()> {
        #[must_use]
        pub fn mode(self, mode: impl Into<String>) -> SelectProtocolBuilder<Addr, Port, WithMode> {
            SelectProtocolBuilder {
                phantom: PhantomData,
                address: self.address,
                port: self.port,
                mode: Some(mode.into()),
            }
        }
    }

    impl SelectProtocolBuilder<WithAddr, WithPort, WithMode> {
        /// Builds the payload; the protocol is always `udp`.
        #[allow(clippy::missing_panics_doc)]
        #[must_use]
        pub fn build(self) -> SelectProtocol {
            SelectProtocol {
                protocol: "udp".to_owned(),
                data: SelectProtocolData {
                    address: self.address.expect("address is required"),
                    port: self.port.expect("port is required"),
                    mode: self.mode.expect("mode is required"),
                },
            }
        }
    }
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::SelectProtocol;
    use pretty_assertions::assert_eq;
    use std::net::{IpAddr, Ipv4Addr};

    #[test]
    fn builds_udp_payload() {
        let payload = SelectProtocol::builder()
            .mode("aead_aes256_gcm_rtpsize")
            .address(IpAddr::V4(Ipv4Addr::new(203, 0, 113, 5)))
            .port(50000)
            .build();

        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            serde_json::json!({
                "protocol": "udp",
                "data": {
                    "address": "203.0.113.5",
                    "port": 50000,
                    "mode": "aead_aes256_gcm_rtpsize",
                },
            })
        );
    }
}
