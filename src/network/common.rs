use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

use crate::fss::store::{CompPrimitive, EqPrimitive, XorAddCouple};

/// Wire messages for the two-process TCP demonstration (SPEC_FULL.md §4.7).
/// This mirrors the rendezvous/notification shape of this lineage's
/// participant/discovery-server pair, adapted from n-party threshold
/// decryption down to exactly two FSS parties.
#[derive(Serialize, Deserialize, Debug)]
pub enum Message {
    // To DealerServer
    RegisterParticipant(u8, SocketAddr),
    UnregisterParticipant(u8),

    // From DealerServer
    ParticipantList(Vec<(u8, SocketAddr)>),
    ParticipantNotificationAdded(u8, SocketAddr),
    ProtocolStart {
        eq_primitives: Vec<EqPrimitive>,
        comp_primitives: Vec<CompPrimitive>,
        xor_add_couples: Vec<XorAddCouple>,
    },

    // Between the two Participants, driving a Transport round.
    RoundScalars(Vec<u64>),
    RoundBits(Vec<u8>),
}

pub const DEALER_SERVER: &str = "127.0.0.1:5500";

/// Exactly two parties evaluate the online protocol (SPEC_FULL.md Non-goals).
pub const PARTY_COUNT: usize = 2;
