//! Sending queries over UDP.

use super::transport::{Inbound, Transport};
use bytes::Bytes;
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tracing::{debug, trace, warn};

//------------ Module Configuration ------------------------------------------

/// How many times do we try a new random port if we get ‘address in use.’
const RETRY_RANDOM_PORT: usize = 10;

/// The size of the receive buffer.
///
/// This is the largest UDP payload.
const RECV_SIZE: usize = 65_535;

//------------ UdpTransport --------------------------------------------------

/// A transport sending queries via UDP.
///
/// The transport has one socket for IPv4 and, if the system supports it,
/// one for IPv6. Both are bound to a random port. Responses are read by
/// [`run`][Self::run] which needs to be spawned as a task.
#[derive(Debug)]
pub struct UdpTransport {
    v4: UdpSocket,
    v6: Option<UdpSocket>,
}

impl UdpTransport {
    /// Binds the sockets.
    ///
    /// Failing to bind the IPv6 socket is not an error. The transport then
    /// can only reach IPv4 servers.
    pub async fn bind() -> Result<Self, io::Error> {
        let v4 = Self::udp_bind(true).await?;
        let v6 = match Self::udp_bind(false).await {
            Ok(sock) => Some(sock),
            Err(err) => {
                debug!("no IPv6 socket: {}", err);
                None
            }
        };
        Ok(UdpTransport { v4, v6 })
    }

    async fn udp_bind(v4: bool) -> Result<UdpSocket, io::Error> {
        let mut i = 0;
        loop {
            let local: SocketAddr = if v4 {
                ([0u8; 4], 0).into()
            } else {
                ([0u16; 8], 0).into()
            };
            match UdpSocket::bind(&local).await {
                Ok(sock) => return Ok(sock),
                Err(err) => {
                    if i == RETRY_RANDOM_PORT {
                        return Err(err);
                    } else {
                        i += 1
                    }
                }
            }
        }
    }

    /// Returns the socket to use for `addr`.
    fn socket(&self, addr: SocketAddr) -> Result<&UdpSocket, io::Error> {
        if addr.is_ipv4() {
            Ok(&self.v4)
        } else {
            self.v6.as_ref().ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::AddrNotAvailable,
                    "no IPv6 socket",
                )
            })
        }
    }

    /// Reads responses and hands them to `inbound`.
    ///
    /// The future only ends if reading fails.
    pub async fn run(self: Arc<Self>, inbound: Inbound) {
        let mut v4_buf = vec![0u8; RECV_SIZE];
        let mut v6_buf = vec![0u8; RECV_SIZE];
        loop {
            let res = match self.v6 {
                Some(ref v6) => {
                    tokio::select! {
                        res = self.v4.recv_from(&mut v4_buf) => {
                            res.map(|(len, source)| (len, source, false))
                        }
                        res = v6.recv_from(&mut v6_buf) => {
                            res.map(|(len, source)| (len, source, true))
                        }
                    }
                }
                None => self
                    .v4
                    .recv_from(&mut v4_buf)
                    .await
                    .map(|(len, source)| (len, source, false)),
            };
            let (len, source, is_v6) = match res {
                Ok(res) => res,
                Err(err) => {
                    warn!("receiving failed: {}", err);
                    return;
                }
            };
            let data = if is_v6 { &v6_buf[..len] } else { &v4_buf[..len] };
            trace!("received {} octets from {}", data.len(), source);
            if let Err(err) = inbound.deliver(source, data) {
                debug!("dropping datagram from {}: {}", source, err);
            }
        }
    }
}

impl Transport for UdpTransport {
    fn send(
        &self,
        dest: SocketAddr,
        data: Bytes,
    ) -> Pin<Box<dyn Future<Output = Result<(), io::Error>> + Send + '_>> {
        Box::pin(async move {
            let sent = self.socket(dest)?.send_to(&data, dest).await?;
            if sent != data.len() {
                return Err(io::Error::new(
                    io::ErrorKind::Other,
                    "short UDP send",
                ));
            }
            Ok(())
        })
    }
}

//============ Testing =======================================================

#[cfg(test)]
mod test {
    use super::*;
    use crate::base::iana::Rtype;
    use crate::base::message::Message;
    use crate::base::question::Question;
    use crate::resolv::conf::ResolvConf;
    use crate::resolv::resolver::Resolver;

    #[tokio::test]
    async fn query_over_loopback() {
        let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let mut conf = ResolvConf::new();
        conf.add_server(server.local_addr().unwrap());
        let resolver = Resolver::builder(conf).build_udp().await.unwrap();

        tokio::spawn(async move {
            let mut buf = vec![0u8; 512];
            let (len, source) = server.recv_from(&mut buf).await.unwrap();
            let query = Message::from_octets(&buf[..len]).unwrap();
            let answer = Message::answer_for(&query).to_vec();
            server.send_to(&answer, source).await.unwrap();
        });

        let qname = "example.com.".parse().unwrap();
        let response = resolver.query(&qname, Rtype::A).await.unwrap();
        assert!(response.is_answer_to(&Question::new_in(qname, Rtype::A)));
        resolver.close();
    }
}
