use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use std::{process::exit, thread};

use bitcode::{deserialize, serialize};
use log::{debug, info};
use message_io::network::{Endpoint, NetEvent, Transport as NetTransport};
use message_io::node::{self, NodeHandler, NodeListener};
use rand::thread_rng;

use crate::fss::params::GlobalParams;
use crate::fss::store::Dealer;
use crate::network::common::{Message, DEALER_SERVER, PARTY_COUNT};

struct ParticipantInfo {
    addr: SocketAddr,
    endpoint: Endpoint,
}

/// A small rendezvous + dealer combination: registers exactly two
/// participants, deals each of them a batch of primitives, and signals
/// `ProtocolStart` (SPEC_FULL.md §4.7, "a small `DealerServer`").
pub struct DealerServer {
    handler: NodeHandler<()>,
    node_listener: Option<NodeListener<()>>,
    participants: HashMap<u8, ParticipantInfo>,
    dealer: Dealer,
    batch_size: usize,
}

impl DealerServer {
    pub fn new(params: GlobalParams, batch_size: usize) -> io::Result<DealerServer> {
        let (handler, node_listener) = node::split::<()>();
        handler.network().listen(NetTransport::FramedTcp, DEALER_SERVER)?;
        info!("dealer server listening on {DEALER_SERVER}");

        Ok(DealerServer {
            handler,
            node_listener: Some(node_listener),
            participants: HashMap::new(),
            dealer: Dealer::new(params),
            batch_size,
        })
    }

    pub fn run(mut self) {
        let node_listener = self.node_listener.take().unwrap();
        node_listener.for_each(move |event| match event.network() {
            NetEvent::Connected(_, _) => unreachable!(),
            NetEvent::Accepted(_, _) => (),
            NetEvent::Message(endpoint, input_data) => {
                let message: Message = match deserialize(&input_data) {
                    Ok(m) => m,
                    Err(e) => {
                        eprintln!("failed to deserialize message: {e}");
                        return;
                    }
                };
                match message {
                    Message::RegisterParticipant(id, addr) => self.register(id, addr, endpoint),
                    Message::UnregisterParticipant(id) => self.unregister(id),
                    _ => (),
                }
            }
            NetEvent::Disconnected(endpoint) => {
                let found = self
                    .participants
                    .iter()
                    .find(|(_, info)| info.endpoint == endpoint)
                    .map(|(id, _)| *id);
                if let Some(id) = found {
                    self.unregister(id);
                }
            }
        });
    }

    fn register(&mut self, id: u8, addr: SocketAddr, endpoint: Endpoint) {
        if self.participants.contains_key(&id) {
            return;
        }

        let list = self
            .participants
            .iter()
            .map(|(id, info)| (*id, info.addr))
            .collect();
        self.send(endpoint, &Message::ParticipantList(list));

        let notify = Message::ParticipantNotificationAdded(id, addr);
        for (_, info) in &self.participants {
            self.send(info.endpoint, &notify);
        }

        self.participants
            .insert(id, ParticipantInfo { addr, endpoint });
        debug!("registered party {id} at {addr}");

        if self.participants.len() == PARTY_COUNT {
            // Give both TCP connections a moment to settle before dealing.
            thread::sleep(Duration::from_millis(100));
            self.deal_and_start();
        }
    }

    /// `party_id` 0 must receive the first half of each keygen call and
    /// `party_id` 1 the second — the DPF/DIF tree construction fixes
    /// `t[0] = (0, 1)`, so a party evaluating with the wrong half of its own
    /// key silently produces garbage shares rather than failing loudly.
    fn deal_and_start(&mut self) {
        let mut rng = thread_rng();
        let (mut eq0, mut eq1, _) = self
            .dealer
            .keygen_eq(self.batch_size, &mut rng)
            .expect("dealer keygen_eq failed");
        let (mut comp0, mut comp1, _) = self
            .dealer
            .keygen_comp(self.batch_size, &mut rng)
            .expect("dealer keygen_comp failed");
        let (mut xa0, mut xa1) = self.dealer.keygen_xor_add(self.batch_size, &mut rng);

        let endpoints: Vec<(u8, Endpoint)> = self
            .participants
            .iter()
            .map(|(id, info)| (*id, info.endpoint))
            .collect();
        for (id, endpoint) in endpoints {
            let message = if id == 0 {
                Message::ProtocolStart {
                    eq_primitives: std::mem::take(&mut eq0),
                    comp_primitives: std::mem::take(&mut comp0),
                    xor_add_couples: std::mem::take(&mut xa0),
                }
            } else {
                Message::ProtocolStart {
                    eq_primitives: std::mem::take(&mut eq1),
                    comp_primitives: std::mem::take(&mut comp1),
                    xor_add_couples: std::mem::take(&mut xa1),
                }
            };
            debug!("dealing batch of {} primitives to party {id}", self.batch_size);
            self.send(endpoint, &message);
        }
    }

    fn unregister(&mut self, id: u8) {
        if self.participants.remove(&id).is_some() && self.participants.is_empty() {
            exit(0);
        }
    }

    fn send(&self, endpoint: Endpoint, message: &Message) {
        match serialize(message) {
            Ok(bytes) => {
                self.handler.network().send(endpoint, &bytes);
            }
            Err(e) => eprintln!("failed to serialize {message:?}: {e}"),
        }
    }
}
