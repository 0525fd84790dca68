//! Deterministic peer simulator for tests.
//!
//! [`SimPeer`] plays the peripheral side of the four-phase exchange on a
//! fake bus. [`SimProbe`] shares its counters and lets tests inject faults
//! while the peer is owned by a handle.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use spilink_bus::{BusError, SpiBus};
use spilink_frame::{
    checksum, decode_header, verify_checksum, ControlPacket, Header, CONTROL, DATA_ACK,
    HEADER_ACK, HEADER_SIZE, NACK, REQUEST_GET_SERIAL, SERIAL_LEN,
};

pub(crate) const SIM_SERIAL: [u8; SERIAL_LEN] = [
    0x1d, 0x00, 0x2e, 0x00, 0x0b, 0x51, 0x31, 0x32, 0x33, 0x36, 0x34, 0x39,
];
pub(crate) const SIM_SERIAL_HEX: &str = "1d002e000b51313233363439";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Fault {
    None,
    /// Every transfer fails.
    BusError,
    /// Headers after the first `n` fail.
    FailAfterHeaders(usize),
    /// Never answers ACK polls.
    Silent,
    /// NACKs every header.
    NackHeader,
    /// NACKs the next header only.
    NackHeaderOnce,
    /// Accepts the payload, then NACKs the data-ack poll.
    NackData,
    /// Accepts the payload, then never answers data-ack polls.
    SilentData,
    /// Declares this response length and then resets.
    DeclareLength(u16),
    CorruptChecksum,
    /// Answers with the full response regardless of the host's maximum.
    IgnoreMaxRx,
}

enum State {
    Idle,
    HeaderAck(Header),
    Data(Header),
    DataNack,
    DataAck(Vec<u8>),
    Length(Vec<u8>),
    Body(Vec<u8>),
}

#[derive(Default)]
struct Shared {
    fault: Mutex<Option<Fault>>,
    headers: AtomicUsize,
    polls: AtomicUsize,
    data_polls: AtomicUsize,
    body_reads: AtomicUsize,
    lock_calls: AtomicUsize,
    unlocked_transfers: AtomicUsize,
    locked: AtomicBool,
    dropped: AtomicBool,
    exchanges: Mutex<HashMap<u8, usize>>,
    written: Mutex<HashMap<u8, Vec<u8>>>,
    streams: Mutex<HashMap<u8, VecDeque<u8>>>,
    controls: Mutex<Vec<ControlPacket>>,
}

impl Shared {
    fn fault(&self) -> Fault {
        self.fault.lock().unwrap().unwrap_or(Fault::None)
    }
}

pub(crate) struct SimPeer {
    state: State,
    serial: [u8; SERIAL_LEN],
    shared: Arc<Shared>,
}

/// Test-side view of a [`SimPeer`].
#[derive(Clone)]
pub(crate) struct SimProbe {
    shared: Arc<Shared>,
}

impl SimPeer {
    pub(crate) fn new() -> (Self, SimProbe) {
        Self::with_serial(SIM_SERIAL)
    }

    pub(crate) fn with_serial(serial: [u8; SERIAL_LEN]) -> (Self, SimProbe) {
        let shared = Arc::new(Shared::default());
        let probe = SimProbe {
            shared: Arc::clone(&shared),
        };
        let peer = Self {
            state: State::Idle,
            serial,
            shared,
        };
        (peer, probe)
    }

    fn respond(&self, header: &Header, payload: &[u8], fault: Fault) -> Vec<u8> {
        let shared = &self.shared;
        let endpoint = header.endpoint;

        let mut response = if endpoint == CONTROL {
            match ControlPacket::from_bytes(payload) {
                Ok(packet) if packet.request == REQUEST_GET_SERIAL => self.serial.to_vec(),
                Ok(packet) => {
                    shared.controls.lock().unwrap().push(packet);
                    vec![0xc0; usize::from(packet.length)]
                }
                Err(_) => Vec::new(),
            }
        } else if payload.is_empty() {
            let mut streams = shared.streams.lock().unwrap();
            let stream = streams.entry(endpoint).or_default();
            let n = stream.len().min(usize::from(header.max_rx_len));
            stream.drain(..n).collect()
        } else {
            let mut written = shared.written.lock().unwrap();
            written.entry(endpoint).or_default().extend_from_slice(payload);
            Vec::new()
        };

        *shared.exchanges.lock().unwrap().entry(endpoint).or_default() += 1;

        if fault != Fault::IgnoreMaxRx {
            response.truncate(usize::from(header.max_rx_len));
        }
        response
    }
}

impl SpiBus for SimPeer {
    fn transfer(&mut self, tx: &[u8], rx: &mut [u8]) -> spilink_bus::Result<usize> {
        assert_eq!(tx.len(), rx.len(), "full-duplex transfer needs equal lengths");
        let shared = Arc::clone(&self.shared);

        if !shared.locked.load(Ordering::SeqCst) {
            shared.unlocked_transfers.fetch_add(1, Ordering::SeqCst);
        }
        rx.fill(0);

        let fault = shared.fault();
        let state = std::mem::replace(&mut self.state, State::Idle);
        let header_slot = !matches!(state, State::Data(_) | State::Body(_));

        if header_slot && tx.len() == HEADER_SIZE + 1 {
            let count = shared.headers.fetch_add(1, Ordering::SeqCst) + 1;
            let failing = match fault {
                Fault::BusError => true,
                Fault::FailAfterHeaders(n) => count > n,
                _ => false,
            };
            if failing {
                return Err(BusError::Io(std::io::Error::other("simulated bus failure")));
            }
            self.state = match decode_header(tx) {
                Ok(header) => State::HeaderAck(header),
                Err(_) => State::DataNack,
            };
            return Ok(tx.len());
        }

        if fault == Fault::BusError {
            return Err(BusError::Io(std::io::Error::other("simulated bus failure")));
        }

        self.state = match state {
            State::HeaderAck(header) if tx.len() == 1 => {
                shared.polls.fetch_add(1, Ordering::SeqCst);
                match fault {
                    Fault::Silent => State::HeaderAck(header),
                    Fault::NackHeader => {
                        rx[0] = NACK;
                        State::Idle
                    }
                    Fault::NackHeaderOnce => {
                        *shared.fault.lock().unwrap() = None;
                        rx[0] = NACK;
                        State::Idle
                    }
                    _ => {
                        rx[0] = HEADER_ACK;
                        State::Data(header)
                    }
                }
            }
            State::Data(header) if tx.len() == usize::from(header.tx_len) + 1 => {
                if verify_checksum(tx) {
                    State::DataAck(self.respond(&header, &tx[..tx.len() - 1], fault))
                } else {
                    State::DataNack
                }
            }
            State::DataNack if tx.len() == 1 => {
                rx[0] = NACK;
                State::Idle
            }
            State::DataAck(response) if tx.len() == 1 => {
                shared.data_polls.fetch_add(1, Ordering::SeqCst);
                match fault {
                    Fault::SilentData => State::DataAck(response),
                    Fault::NackData => {
                        rx[0] = NACK;
                        State::Idle
                    }
                    _ => {
                        rx[0] = DATA_ACK;
                        State::Length(response)
                    }
                }
            }
            State::Length(response) if tx.len() == 2 => match fault {
                Fault::DeclareLength(len) => {
                    rx.copy_from_slice(&len.to_le_bytes());
                    State::Idle
                }
                _ => {
                    rx.copy_from_slice(&(response.len() as u16).to_le_bytes());
                    State::Body(response)
                }
            },
            State::Body(response) if tx.len() == response.len() + 1 => {
                shared.body_reads.fetch_add(1, Ordering::SeqCst);
                let n = response.len();
                rx[..n].copy_from_slice(&response);

                let mut unit = vec![DATA_ACK];
                unit.extend_from_slice(&(n as u16).to_le_bytes());
                unit.extend_from_slice(&response);
                rx[n] = match fault {
                    Fault::CorruptChecksum => checksum(&unit) ^ 0xff,
                    _ => checksum(&unit),
                };
                State::Idle
            }
            other => other,
        };

        Ok(tx.len())
    }

    fn lock_exclusive(&self) -> spilink_bus::Result<()> {
        self.shared.lock_calls.fetch_add(1, Ordering::SeqCst);
        self.shared.locked.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn unlock(&self) -> spilink_bus::Result<()> {
        self.shared.locked.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn name(&self) -> &str {
        "sim"
    }
}

impl Drop for SimPeer {
    fn drop(&mut self) {
        self.shared.dropped.store(true, Ordering::SeqCst);
    }
}

impl SimProbe {
    pub(crate) fn set_fault(&self, fault: Fault) {
        *self.shared.fault.lock().unwrap() = Some(fault);
    }

    /// Queue bytes served to bulk reads on `endpoint`.
    pub(crate) fn feed(&self, endpoint: u8, data: &[u8]) {
        let mut streams = self.shared.streams.lock().unwrap();
        streams.entry(endpoint).or_default().extend(data);
    }

    pub(crate) fn written(&self, endpoint: u8) -> Vec<u8> {
        let written = self.shared.written.lock().unwrap();
        written.get(&endpoint).cloned().unwrap_or_default()
    }

    /// Exchanges whose data phase reached `endpoint`.
    pub(crate) fn exchanges(&self, endpoint: u8) -> usize {
        let exchanges = self.shared.exchanges.lock().unwrap();
        exchanges.get(&endpoint).copied().unwrap_or(0)
    }

    pub(crate) fn controls(&self) -> Vec<ControlPacket> {
        self.shared.controls.lock().unwrap().clone()
    }

    pub(crate) fn headers(&self) -> usize {
        self.shared.headers.load(Ordering::SeqCst)
    }

    pub(crate) fn polls(&self) -> usize {
        self.shared.polls.load(Ordering::SeqCst)
    }

    pub(crate) fn data_polls(&self) -> usize {
        self.shared.data_polls.load(Ordering::SeqCst)
    }

    pub(crate) fn body_reads(&self) -> usize {
        self.shared.body_reads.load(Ordering::SeqCst)
    }

    pub(crate) fn lock_calls(&self) -> usize {
        self.shared.lock_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn is_locked(&self) -> bool {
        self.shared.locked.load(Ordering::SeqCst)
    }

    pub(crate) fn unlocked_transfers(&self) -> usize {
        self.shared.unlocked_transfers.load(Ordering::SeqCst)
    }

    pub(crate) fn is_dropped(&self) -> bool {
        self.shared.dropped.load(Ordering::SeqCst)
    }

    /// Zero the attempt counters, e.g. after the connection handshake.
    pub(crate) fn reset_counters(&self) {
        self.shared.headers.store(0, Ordering::SeqCst);
        self.shared.polls.store(0, Ordering::SeqCst);
        self.shared.data_polls.store(0, Ordering::SeqCst);
        self.shared.body_reads.store(0, Ordering::SeqCst);
        self.shared.lock_calls.store(0, Ordering::SeqCst);
        self.shared.exchanges.lock().unwrap().clear();
    }
}
