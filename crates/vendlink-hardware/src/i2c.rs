//! Peripheral link over an I2C bus.
//!
//! The controller is the bus master. Every poll is a single read of a fixed
//! number of bytes from the peripheral's address; every reply is a single
//! write to the same address.
//!
//! ```text
//! controller                 peripheral @ 0x09
//!     |  read 50 bytes  -------->  |
//!     |  <------ "CARD0001|11000\xff\xff..."
//!     |  write "OK"     -------->  |
//! ```
//!
//! Any `embedded_hal::i2c::I2c` implementation can be used, for example
//! `linux_embedded_hal::I2cdev` on a Linux host.

use embedded_hal::i2c::{Error as _, I2c, SevenBitAddress};
use tracing::{debug, trace};
use vendlink_core::constants::{MAX_READ_LEN, PERIPHERAL_ADDRESS};
use vendlink_protocol::{Frame, ReplyCode};

use crate::{
    error::{HardwareError, Result},
    traits::PeripheralLink,
};

/// [`PeripheralLink`] implementation over an I2C bus.
#[derive(Debug)]
pub struct I2cPeripheralLink<I> {
    bus: I,
    address: SevenBitAddress,
    buffer: Vec<u8>,
}

impl<I: I2c> I2cPeripheralLink<I> {
    /// Create a link to the peripheral at the default address, reading the
    /// default number of bytes per poll.
    pub fn new(bus: I) -> Self {
        Self::with_address(bus, PERIPHERAL_ADDRESS, MAX_READ_LEN)
    }

    /// Create a link with an explicit address and read length.
    pub fn with_address(bus: I, address: SevenBitAddress, read_len: usize) -> Self {
        debug!(address, read_len, "Creating I2C peripheral link");

        Self {
            bus,
            address,
            buffer: vec![0; read_len],
        }
    }

    /// Peripheral address.
    pub fn address(&self) -> SevenBitAddress {
        self.address
    }

    /// Number of bytes requested per poll.
    pub fn read_len(&self) -> usize {
        self.buffer.len()
    }

    /// Give the bus back.
    pub fn release(self) -> I {
        self.bus
    }
}

impl<I: I2c + Send> PeripheralLink for I2cPeripheralLink<I> {
    async fn poll(&mut self) -> Result<Option<Frame>> {
        let address = self.address;
        self.buffer.fill(0);

        self.bus.read(address, &mut self.buffer).map_err(|e| {
            HardwareError::bus(format!("read from 0x{address:02x} failed: {:?}", e.kind()))
        })?;

        let frame = Frame::from_bytes(&self.buffer)?;
        trace!(address, frame = ?frame.as_ref().map(Frame::as_str), "Polled peripheral");

        Ok(frame)
    }

    async fn send(&mut self, reply: ReplyCode) -> Result<()> {
        let address = self.address;

        self.bus.write(address, reply.as_bytes()).map_err(|e| {
            HardwareError::bus(format!("write to 0x{address:02x} failed: {:?}", e.kind()))
        })?;

        debug!(address, %reply, "Reply written to peripheral");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal::i2c::{ErrorKind, ErrorType, NoAcknowledgeSource, Operation};
    use std::collections::VecDeque;

    /// In-memory bus: scripted read responses, recorded writes.
    #[derive(Default)]
    struct FakeBus {
        reads: VecDeque<std::result::Result<Vec<u8>, ErrorKind>>,
        read_requests: Vec<(u8, usize)>,
        writes: Vec<(u8, Vec<u8>)>,
    }

    impl FakeBus {
        fn respond(mut self, data: &[u8]) -> Self {
            self.reads.push_back(Ok(data.to_vec()));
            self
        }

        fn fail(mut self, kind: ErrorKind) -> Self {
            self.reads.push_back(Err(kind));
            self
        }
    }

    impl ErrorType for FakeBus {
        type Error = ErrorKind;
    }

    impl I2c for FakeBus {
        fn transaction(
            &mut self,
            address: u8,
            operations: &mut [Operation<'_>],
        ) -> std::result::Result<(), Self::Error> {
            for op in operations {
                match op {
                    Operation::Read(buf) => {
                        self.read_requests.push((address, buf.len()));
                        match self.reads.pop_front() {
                            Some(Ok(data)) => {
                                let n = data.len().min(buf.len());
                                buf[..n].copy_from_slice(&data[..n]);
                                buf[n..].fill(0xff);
                            }
                            Some(Err(kind)) => return Err(kind),
                            None => buf.fill(0xff),
                        }
                    }
                    Operation::Write(bytes) => self.writes.push((address, bytes.to_vec())),
                }
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_poll_reads_fixed_size_from_address() {
        let mut link = I2cPeripheralLink::new(FakeBus::default().respond(b"CARD0001|11000"));

        let frame = link.poll().await.unwrap().unwrap();
        assert_eq!(frame.as_str(), "CARD0001|11000");

        let bus = link.release();
        assert_eq!(bus.read_requests, vec![(PERIPHERAL_ADDRESS, MAX_READ_LEN)]);
    }

    #[tokio::test]
    async fn test_poll_padding_only_is_no_data() {
        let mut link = I2cPeripheralLink::new(FakeBus::default());
        assert!(link.poll().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_poll_idle_marker() {
        let mut link = I2cPeripheralLink::new(FakeBus::default().respond(b"X\0"));

        let frame = link.poll().await.unwrap().unwrap();
        assert!(frame.is_idle());
    }

    #[tokio::test]
    async fn test_poll_bus_failure() {
        let bus = FakeBus::default().fail(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
        let mut link = I2cPeripheralLink::new(bus);

        let err = link.poll().await.unwrap_err();
        assert!(matches!(err, HardwareError::Bus { .. }));
        assert!(err.to_string().contains("0x09"));
    }

    #[tokio::test]
    async fn test_poll_overflow_is_invalid_data() {
        let bus = FakeBus::default().respond(&[b'A'; MAX_READ_LEN]);
        let mut link = I2cPeripheralLink::new(bus);

        let err = link.poll().await.unwrap_err();
        assert!(matches!(err, HardwareError::InvalidData { .. }));
    }

    #[tokio::test]
    async fn test_stale_bytes_do_not_leak_between_polls() {
        let bus = FakeBus::default()
            .respond(b"CARD0001|11000")
            .fail(ErrorKind::Bus);
        let mut link = I2cPeripheralLink::with_address(bus, 0x12, 16);

        assert!(link.poll().await.unwrap().is_some());
        assert!(link.poll().await.is_err());
        assert!(link.buffer.iter().all(|b| *b == 0));
    }

    #[tokio::test]
    async fn test_send_writes_reply() {
        let mut link = I2cPeripheralLink::with_address(FakeBus::default(), 0x12, 16);

        link.send(ReplyCode::Ok).await.unwrap();
        link.send(ReplyCode::Err).await.unwrap();

        let bus = link.release();
        assert_eq!(
            bus.writes,
            vec![(0x12, b"OK".to_vec()), (0x12, b"ERR".to_vec())]
        );
    }

    #[test]
    fn test_accessors() {
        let link = I2cPeripheralLink::with_address(FakeBus::default(), 0x20, 32);
        assert_eq!(link.address(), 0x20);
        assert_eq!(link.read_len(), 32);
    }
}
