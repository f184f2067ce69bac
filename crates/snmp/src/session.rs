//! UDP session against one SNMP agent.

use std::{
    net::{Ipv4Addr, Ipv6Addr, SocketAddr},
    sync::atomic::{AtomicI32, Ordering},
    time::Duration,
};

use tokio::{net::UdpSocket, time::timeout};
use tracing::{debug, trace};
use validator::Validate;

use crate::{
    config::Config,
    error::SnmpError,
    oid::Oid,
    pdu::{encode_get_request, Response, VarBind},
};

/// Largest datagram accepted from the agent.
const MAX_DATAGRAM: usize = 65_507;

/// A connected UDP socket plus request policy.
///
/// Requests are sent one at a time by the caller; the session does not
/// multiplex concurrent `get` calls.
#[derive(Debug)]
pub struct Session {
    socket: UdpSocket,
    peer: SocketAddr,
    community: String,
    timeout: Duration,
    retries: u32,
    next_request_id: AtomicI32,
}

impl Session {
    /// Validates `config`, resolves the agent and connects a UDP socket to it.
    pub async fn connect(config: &Config) -> Result<Self, SnmpError> {
        config.validate()?;

        let target = format!("{}:{}", config.host, config.port);
        let peer = tokio::net::lookup_host(target.as_str())
            .await
            .map_err(|_| SnmpError::Resolve(target.clone()))?
            .next()
            .ok_or_else(|| SnmpError::Resolve(target.clone()))?;

        let bind: SocketAddr = if peer.is_ipv4() {
            SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0))
        } else {
            SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0))
        };
        let socket = UdpSocket::bind(bind).await?;
        socket.connect(peer).await?;
        debug!("SNMP session bound to {} for agent {}", socket.local_addr()?, peer);

        Ok(Self {
            socket,
            peer,
            community: config.community.clone(),
            timeout: config.timeout(),
            retries: config.retries,
            next_request_id: AtomicI32::new(initial_request_id()),
        })
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Fetches the values of `oids` in one GetRequest.
    ///
    /// Every attempt resends the same request id and waits up to the
    /// configured timeout. The returned varbinds are in request order.
    pub async fn get(&self, oids: &[Oid]) -> Result<Vec<VarBind>, SnmpError> {
        let request_id = self.next_request_id();
        let message = encode_get_request(&self.community, request_id, oids);
        let attempts = self.retries + 1;
        let mut buf = vec![0u8; MAX_DATAGRAM];

        for attempt in 1..=attempts {
            self.socket.send(&message).await?;
            trace!(request_id, attempt, "GetRequest sent to {}", self.peer);

            match timeout(self.timeout, self.recv_response(i64::from(request_id), &mut buf)).await {
                Ok(response) => return check_response(response?, oids),
                Err(_) => debug!(
                    request_id,
                    "No response from {} within {:?} (attempt {}/{})",
                    self.peer,
                    self.timeout,
                    attempt,
                    attempts
                ),
            }
        }

        Err(SnmpError::Timeout { attempts })
    }

    async fn recv_response(&self, request_id: i64, buf: &mut [u8]) -> Result<Response, SnmpError> {
        loop {
            let len = self.socket.recv(buf).await?;
            match Response::decode(&buf[..len]) {
                Ok(response) if response.request_id == request_id => return Ok(response),
                Ok(response) => trace!(
                    "Discarding stale response id {} (waiting for {})",
                    response.request_id,
                    request_id
                ),
                Err(e) => debug!("Discarding undecodable datagram from {}: {}", self.peer, e),
            }
        }
    }

    fn next_request_id(&self) -> i32 {
        // Request ids stay positive; some agents mishandle negative ones.
        let id = self.next_request_id.fetch_add(1, Ordering::Relaxed);
        id & i32::MAX
    }
}

fn initial_request_id() -> i32 {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    ((nanos ^ std::process::id()) & 0x3fff_ffff) as i32
}

fn check_response(response: Response, oids: &[Oid]) -> Result<Vec<VarBind>, SnmpError> {
    if response.error_status != 0 {
        return Err(SnmpError::ErrorStatus {
            status: response.error_status,
            index: response.error_index,
        });
    }
    if response.varbinds.len() != oids.len() {
        return Err(SnmpError::MalformedResponse(format!(
            "expected {} varbinds, got {}",
            oids.len(),
            response.varbinds.len()
        )));
    }
    if let Some((vb, oid)) = response
        .varbinds
        .iter()
        .zip(oids)
        .find(|(vb, oid)| vb.oid != **oid)
    {
        return Err(SnmpError::MalformedResponse(format!(
            "varbind {} answers a request for {}",
            vb.oid, oid
        )));
    }
    Ok(response.varbinds)
}
