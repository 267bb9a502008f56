//! The `Transport` abstraction the online protocol exchanges masked batches
//! through, and the in-process loopback implementation used by tests and by
//! the single-process convenience entry points (SPEC_FULL.md §4.7).

use std::sync::Mutex;

use tokio::sync::mpsc::{self, Receiver, Sender};

use crate::fss::error::{FssError, FssResult};

/// One round-trip per call: send this party's batch, receive the peer's
/// matching batch. Exchanging whole batches (rather than one message per
/// lane) keeps lane ordering unambiguous when callers parallelize eval across
/// lanes with `rayon` on either side of the round trip.
pub trait Transport {
    fn exchange_scalars(&self, values: &[u64]) -> FssResult<Vec<u64>>;
    fn exchange_bits(&self, values: &[u8]) -> FssResult<Vec<u8>>;
}

/// An in-process transport backed by a pair of `tokio` mpsc channels, one
/// party's sender wired to the other's receiver. Intended for tests, and for
/// an `eq`/`le` convenience path when both parties run in one process
/// (SPEC_FULL.md §4.7 names this exact pairing).
pub struct LoopbackTransport {
    scalar_tx: Sender<Vec<u64>>,
    scalar_rx: Mutex<Receiver<Vec<u64>>>,
    bit_tx: Sender<Vec<u8>>,
    bit_rx: Mutex<Receiver<Vec<u8>>>,
}

impl LoopbackTransport {
    /// Builds a connected pair: `(party_0, party_1)`.
    pub fn pair() -> (LoopbackTransport, LoopbackTransport) {
        let (tx_scalar_0, rx_scalar_0) = mpsc::channel(8);
        let (tx_scalar_1, rx_scalar_1) = mpsc::channel(8);
        let (tx_bit_0, rx_bit_0) = mpsc::channel(8);
        let (tx_bit_1, rx_bit_1) = mpsc::channel(8);

        let party_0 = LoopbackTransport {
            scalar_tx: tx_scalar_0,
            scalar_rx: Mutex::new(rx_scalar_1),
            bit_tx: tx_bit_0,
            bit_rx: Mutex::new(rx_bit_1),
        };
        let party_1 = LoopbackTransport {
            scalar_tx: tx_scalar_1,
            scalar_rx: Mutex::new(rx_scalar_0),
            bit_tx: tx_bit_1,
            bit_rx: Mutex::new(rx_bit_0),
        };
        (party_0, party_1)
    }
}

impl Transport for LoopbackTransport {
    fn exchange_scalars(&self, values: &[u64]) -> FssResult<Vec<u64>> {
        self.scalar_tx
            .blocking_send(values.to_vec())
            .map_err(|e| FssError::Transport(e.to_string()))?;
        self.scalar_rx
            .lock()
            .unwrap()
            .blocking_recv()
            .ok_or_else(|| FssError::Transport("peer scalar channel closed".to_string()))
    }

    fn exchange_bits(&self, values: &[u8]) -> FssResult<Vec<u8>> {
        self.bit_tx
            .blocking_send(values.to_vec())
            .map_err(|e| FssError::Transport(e.to_string()))?;
        self.bit_rx
            .lock()
            .unwrap()
            .blocking_recv()
            .ok_or_else(|| FssError::Transport("peer bit channel closed".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalars_cross_to_the_peer() {
        let (a, b) = LoopbackTransport::pair();
        std::thread::scope(|scope| {
            scope.spawn(|| {
                let got = a.exchange_scalars(&[1, 2, 3]).unwrap();
                assert_eq!(got, vec![10, 20, 30]);
            });
            scope.spawn(|| {
                let got = b.exchange_scalars(&[10, 20, 30]).unwrap();
                assert_eq!(got, vec![1, 2, 3]);
            });
        });
    }

    #[test]
    fn bits_cross_to_the_peer() {
        let (a, b) = LoopbackTransport::pair();
        std::thread::scope(|scope| {
            scope.spawn(|| {
                let got = a.exchange_bits(&[1, 0, 1]).unwrap();
                assert_eq!(got, vec![0, 1, 1]);
            });
            scope.spawn(|| {
                let got = b.exchange_bits(&[0, 1, 1]).unwrap();
                assert_eq!(got, vec![1, 0, 1]);
            });
        });
    }
}
