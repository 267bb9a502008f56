use std::net::SocketAddr;
use std::sync::mpsc::{self, Receiver};
use std::sync::Mutex;
use std::thread;

use bitcode::{deserialize, serialize};
use message_io::network::{Endpoint, NetEvent, Transport as NetTransport};
use message_io::node::{self, NodeHandler};

use crate::fss::error::{FssError, FssResult};
use crate::fss::params::GlobalParams;
use crate::fss::store::PrimitiveStore;
use crate::network::common::{Message, DEALER_SERVER};
use crate::network::transport::Transport;

fn send(handler: &NodeHandler<()>, endpoint: Endpoint, message: &Message) {
    match serialize(message) {
        Ok(bytes) => {
            handler.network().send(endpoint, &bytes);
        }
        Err(e) => eprintln!("failed to serialize {message:?}: {e}"),
    }
}

/// Drives the rendezvous with the dealer, then exposes a [`Transport`] over a
/// direct connection to the one other party (SPEC_FULL.md §4.7: "each
/// `Participant` then runs the three rounds over a framed TCP connection to
/// its peer"). Party 0 always dials out to party 1 once it learns its
/// address; party 1 only ever accepts.
pub struct Participant {
    pub id: u8,
    pub params: GlobalParams,
    pub store: PrimitiveStore,
    handler: NodeHandler<()>,
    peer: Endpoint,
    scalar_rx: Mutex<Receiver<Vec<u64>>>,
    bit_rx: Mutex<Receiver<Vec<u8>>>,
}

impl Participant {
    /// Registers with the dealer server, waits for the peer's address and
    /// this party's primitive batch, connects directly to the peer, and
    /// returns a ready `Participant`. Blocks the calling thread throughout.
    pub fn connect(id: u8, params: GlobalParams) -> FssResult<Participant> {
        let (handler, node_listener) = node::split::<()>();
        let (dealer_endpoint, _) = handler
            .network()
            .connect(NetTransport::FramedTcp, DEALER_SERVER)
            .map_err(|e| FssError::Transport(e.to_string()))?;
        let (_, listen_addr) = handler
            .network()
            .listen(NetTransport::FramedTcp, "127.0.0.1:0")
            .map_err(|e| FssError::Transport(e.to_string()))?;

        let (peer_addr_tx, peer_addr_rx) = mpsc::channel::<SocketAddr>();
        let (peer_endpoint_tx, peer_endpoint_rx) = mpsc::channel::<Endpoint>();
        let (start_tx, start_rx) = mpsc::channel::<PrimitiveStore>();
        let (scalar_tx, scalar_rx) = mpsc::channel::<Vec<u64>>();
        let (bit_tx, bit_rx) = mpsc::channel::<Vec<u8>>();

        let handler_bg = handler.clone();
        thread::spawn(move || {
            node_listener.for_each(move |event| match event.network() {
                NetEvent::Connected(endpoint, established) => {
                    if endpoint == dealer_endpoint && established {
                        send(
                            &handler_bg,
                            dealer_endpoint,
                            &Message::RegisterParticipant(id, listen_addr),
                        );
                    }
                }
                NetEvent::Accepted(endpoint, _) => {
                    let _ = peer_endpoint_tx.send(endpoint);
                }
                NetEvent::Message(_endpoint, input_data) => {
                    let message: Message = match deserialize(&input_data) {
                        Ok(m) => m,
                        Err(e) => {
                            eprintln!("failed to deserialize message: {e}");
                            return;
                        }
                    };
                    match message {
                        Message::ParticipantList(list) => {
                            if let Some((_, addr)) = list.into_iter().find(|(pid, _)| *pid != id) {
                                let _ = peer_addr_tx.send(addr);
                            }
                        }
                        Message::ParticipantNotificationAdded(other_id, addr) => {
                            if other_id != id {
                                let _ = peer_addr_tx.send(addr);
                            }
                        }
                        Message::ProtocolStart {
                            eq_primitives,
                            comp_primitives,
                            xor_add_couples,
                        } => {
                            let store = PrimitiveStore::new();
                            store.push_eq(eq_primitives);
                            store.push_comp(comp_primitives);
                            store.push_xor_add(xor_add_couples);
                            let _ = start_tx.send(store);
                        }
                        Message::RoundScalars(values) => {
                            let _ = scalar_tx.send(values);
                        }
                        Message::RoundBits(values) => {
                            let _ = bit_tx.send(values);
                        }
                        _ => {}
                    }
                }
                NetEvent::Disconnected(_) => {}
            });
        });

        let peer = if id == 0 {
            let peer_addr = peer_addr_rx.recv().map_err(|_| {
                FssError::Transport("dealer channel closed before peer address arrived".into())
            })?;
            let (endpoint, _) = handler
                .network()
                .connect(NetTransport::FramedTcp, peer_addr)
                .map_err(|e| FssError::Transport(e.to_string()))?;
            endpoint
        } else {
            peer_endpoint_rx
                .recv()
                .map_err(|_| FssError::Transport("peer never connected".into()))?
        };

        let store = start_rx.recv().map_err(|_| {
            FssError::Transport("dealer channel closed before ProtocolStart".into())
        })?;

        Ok(Participant {
            id,
            params,
            store,
            handler,
            peer,
            scalar_rx: Mutex::new(scalar_rx),
            bit_rx: Mutex::new(bit_rx),
        })
    }

    /// Convenience wrapper running a batched equality check over this
    /// participant's connection.
    pub fn eq(&self, x1_shares: &[u64], x2_shares: &[u64]) -> FssResult<Vec<u64>> {
        crate::fss::protocol::eq(self.id, &self.params, &self.store, self, x1_shares, x2_shares)
    }

    /// Convenience wrapper running a batched `<=` comparison.
    pub fn le(&self, x1_shares: &[u64], x2_shares: &[u64]) -> FssResult<Vec<u64>> {
        crate::fss::protocol::le(self.id, &self.params, &self.store, self, x1_shares, x2_shares)
    }
}

impl Transport for Participant {
    fn exchange_scalars(&self, values: &[u64]) -> FssResult<Vec<u64>> {
        send(&self.handler, self.peer, &Message::RoundScalars(values.to_vec()));
        self.scalar_rx
            .lock()
            .unwrap()
            .recv()
            .map_err(|_| FssError::Transport("peer scalar channel closed".into()))
    }

    fn exchange_bits(&self, values: &[u8]) -> FssResult<Vec<u8>> {
        send(&self.handler, self.peer, &Message::RoundBits(values.to_vec()));
        self.bit_rx
            .lock()
            .unwrap()
            .recv()
            .map_err(|_| FssError::Transport("peer bit channel closed".into()))
    }
}
