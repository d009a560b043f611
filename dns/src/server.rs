use crate::error::DnsError;
use crate::resolver::CompositeResolver;
use crate::wire;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, UdpSocket};

/// Where the daemon's resolver listens.
pub const DNS_LISTEN_ADDR: &str = "127.0.0.1:2053";

/// Serves the composite resolver over UDP and TCP on one address.
pub struct DnsServer {
    udp: UdpSocket,
    tcp: TcpListener,
    resolver: Arc<CompositeResolver>,
}

impl DnsServer {
    pub async fn bind(addr: &str, resolver: Arc<CompositeResolver>) -> Result<Self, DnsError> {
        let udp = UdpSocket::bind(addr).await?;
        // TCP listens on the same port the UDP bind landed on, so an
        // ephemeral-port bind still serves both transports in one place.
        let tcp = TcpListener::bind(udp.local_addr()?).await?;
        Ok(Self { udp, tcp, resolver })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, DnsError> {
        Ok(self.udp.local_addr()?)
    }

    pub async fn serve(self) -> Result<(), DnsError> {
        let addr = self.local_addr()?;
        tracing::info!(%addr, "DNS server listening");

        let resolver = self.resolver.clone();
        let udp = self.udp;
        let udp_loop = async move {
            let mut buf = [0u8; 1500];
            loop {
                let (len, peer) = udp.recv_from(&mut buf).await?;
                if let Some(response) = handle_packet(&resolver, &buf[..len]) {
                    let _ = udp.send_to(&response, peer).await;
                }
            }
            #[allow(unreachable_code)]
            Ok::<(), DnsError>(())
        };

        let resolver = self.resolver.clone();
        let tcp = self.tcp;
        let tcp_loop = async move {
            loop {
                let (stream, _) = tcp.accept().await?;
                let resolver = resolver.clone();
                tokio::spawn(async move {
                    let _ = serve_tcp(stream, resolver).await;
                });
            }
            #[allow(unreachable_code)]
            Ok::<(), DnsError>(())
        };

        tokio::try_join!(udp_loop, tcp_loop)?;
        Ok(())
    }
}

/// RFC 1035 TCP framing: 2-byte big-endian length before each message.
async fn serve_tcp(
    mut stream: tokio::net::TcpStream,
    resolver: Arc<CompositeResolver>,
) -> Result<(), DnsError> {
    loop {
        let mut len_buf = [0u8; 2];
        match stream.read_exact(&mut len_buf).await {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(()),
            Err(e) => return Err(e.into()),
        }
        let len = u16::from_be_bytes(len_buf) as usize;
        let mut packet = vec![0u8; len];
        stream.read_exact(&mut packet).await?;

        if let Some(response) = handle_packet(&resolver, &packet) {
            stream
                .write_all(&(response.len() as u16).to_be_bytes())
                .await?;
            stream.write_all(&response).await?;
        }
    }
}

/// Validates, resolves, and encodes one request. Non-standard queries are
/// dropped without a reply.
fn handle_packet(resolver: &CompositeResolver, packet: &[u8]) -> Option<Vec<u8>> {
    if !wire::is_standard_query(packet) {
        tracing::debug!("ignoring non-standard query");
        return None;
    }
    let query = wire::parse_query(packet)?;
    tracing::debug!(name = %query.name, qtype = query.qtype, "dns query");

    match resolver.resolve(&query.name) {
        Some(addresses) => wire::build_answer(packet, &addresses),
        None => wire::build_nxdomain(packet),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::{HostsResolver, Resolver};
    use crate::wire::{encode_query, QTYPE_A};
    use berth_network::HostsTable;

    fn test_resolver() -> Arc<CompositeResolver> {
        let hosts = HostsTable::new();
        hosts.insert("c1.berth.internal.", vec!["192.168.64.9".parse().unwrap()]);
        let hosts_resolver: Arc<dyn Resolver> = Arc::new(HostsResolver::new(hosts));
        Arc::new(CompositeResolver::new(vec![hosts_resolver]))
    }

    #[tokio::test]
    async fn test_udp_query_answered() {
        let server = DnsServer::bind("127.0.0.1:0", test_resolver()).await.unwrap();
        let addr = server.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = server.serve().await;
        });

        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let query = encode_query(42, "c1.berth.internal", QTYPE_A);
        client.send_to(&query, addr).await.unwrap();

        let mut buf = [0u8; 512];
        let (len, _) = client.recv_from(&mut buf).await.unwrap();
        let response = &buf[..len];
        assert_eq!(&response[0..2], &42u16.to_be_bytes());
        assert_eq!(response[3] & 0x0F, 0);
        assert_eq!(&response[len - 4..], &[192, 168, 64, 9]);
    }

    #[tokio::test]
    async fn test_udp_unknown_name_is_nxdomain() {
        let server = DnsServer::bind("127.0.0.1:0", test_resolver()).await.unwrap();
        let addr = server.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = server.serve().await;
        });

        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let query = encode_query(7, "ghost.example", QTYPE_A);
        client.send_to(&query, addr).await.unwrap();

        let mut buf = [0u8; 512];
        let (len, _) = client.recv_from(&mut buf).await.unwrap();
        assert_eq!(buf[3] & 0x0F, 3);
        assert!(len >= 12);
    }

    #[tokio::test]
    async fn test_tcp_query_answered() {
        let server = DnsServer::bind("127.0.0.1:0", test_resolver()).await.unwrap();
        let addr = server.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = server.serve().await;
        });

        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        let query = encode_query(5, "c1.berth.internal", QTYPE_A);
        stream
            .write_all(&(query.len() as u16).to_be_bytes())
            .await
            .unwrap();
        stream.write_all(&query).await.unwrap();

        let mut len_buf = [0u8; 2];
        stream.read_exact(&mut len_buf).await.unwrap();
        let mut response = vec![0u8; u16::from_be_bytes(len_buf) as usize];
        stream.read_exact(&mut response).await.unwrap();
        assert_eq!(&response[response.len() - 4..], &[192, 168, 64, 9]);
    }
}
