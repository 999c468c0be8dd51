//! Registered MMIO regions checked ahead of MMU translation.

use thiserror::Error;
use tracing::{debug, warn};

use crate::{HostError, Width};

/// Maximum number of simultaneously registered MMIO regions.
pub const MMIO_REGION_CAPACITY: usize = 32;

/// Failure reported by an [`MmioHandler`]; the core substitutes all-ones for a
/// failed read and drops a failed write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum MmioError {
    /// Device could not complete the read.
    #[error("mmio read failed")]
    ReadFailed,
    /// Device could not complete the write.
    #[error("mmio write failed")]
    WriteFailed,
}

/// Device model behind a registered MMIO region.
pub trait MmioHandler {
    /// Reads `width` bytes at `addr` (`offset` bytes into the region).
    ///
    /// # Errors
    ///
    /// Returns [`MmioError::ReadFailed`] when the device cannot complete the
    /// read; the core then observes all-ones.
    fn read(&mut self, addr: u32, offset: u32, width: Width) -> Result<u32, MmioError>;

    /// Writes the low `width` bytes of `value` at `addr` (`offset` bytes into the region).
    ///
    /// # Errors
    ///
    /// Returns [`MmioError::WriteFailed`] when the device rejects the write;
    /// the core drops it.
    fn write(&mut self, addr: u32, offset: u32, value: u32, width: Width)
        -> Result<(), MmioError>;
}

/// One registered MMIO region.
pub struct MmioRegion {
    base: u32,
    size: u32,
    name: String,
    active: bool,
    handler: Box<dyn MmioHandler>,
}

impl MmioRegion {
    /// First address covered by the region.
    #[must_use]
    pub const fn base(&self) -> u32 {
        self.base
    }

    /// Number of bytes covered by the region.
    #[must_use]
    pub const fn size(&self) -> u32 {
        self.size
    }

    /// Diagnostic name supplied at registration.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns `true` while the region participates in address decode.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Returns `true` when `addr` falls inside the region.
    #[must_use]
    pub const fn contains(&self, addr: u32) -> bool {
        addr >= self.base && addr - self.base < self.size
    }
}

impl std::fmt::Debug for MmioRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MmioRegion")
            .field("base", &self.base)
            .field("size", &self.size)
            .field("name", &self.name)
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}

/// Fixed-capacity table of MMIO regions, scanned linearly in slot order.
#[derive(Debug)]
pub struct MmioTable {
    slots: Vec<Option<MmioRegion>>,
}

impl Default for MmioTable {
    fn default() -> Self {
        Self {
            slots: (0..MMIO_REGION_CAPACITY).map(|_| None).collect(),
        }
    }
}

impl MmioTable {
    /// Registers a region in the first free slot and returns its index.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::EmptyMmioRegion`] for a zero-sized region and
    /// [`HostError::MmioTableFull`] when every slot is taken.
    pub fn register(
        &mut self,
        base: u32,
        size: u32,
        handler: Box<dyn MmioHandler>,
        name: &str,
    ) -> Result<usize, HostError> {
        if size == 0 {
            return Err(HostError::EmptyMmioRegion);
        }
        let index = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or(HostError::MmioTableFull)?;
        debug!(index, base, size, name, "mmio region registered");
        self.slots[index] = Some(MmioRegion {
            base,
            size,
            name: name.to_owned(),
            active: true,
            handler,
        });
        Ok(index)
    }

    /// Removes the region in slot `index`.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::UnknownMmioRegion`] when the slot is empty.
    pub fn unregister(&mut self, index: usize) -> Result<(), HostError> {
        match self.slots.get_mut(index).and_then(Option::take) {
            Some(region) => {
                debug!(index, base = region.base, "mmio region unregistered");
                Ok(())
            }
            None => Err(HostError::UnknownMmioRegion(
                u32::try_from(index).unwrap_or(u32::MAX),
            )),
        }
    }

    /// Removes the region whose base address is `base`.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::UnknownMmioRegion`] when no region starts at `base`.
    pub fn unregister_addr(&mut self, base: u32) -> Result<(), HostError> {
        let index = self
            .slots
            .iter()
            .position(|slot| slot.as_ref().is_some_and(|region| region.base == base))
            .ok_or(HostError::UnknownMmioRegion(base))?;
        self.unregister(index)
    }

    /// Removes every region.
    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
    }

    /// Returns the region in slot `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&MmioRegion> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    /// Returns the slot index of the first active region covering `addr`.
    #[must_use]
    pub fn find(&self, addr: u32) -> Option<usize> {
        self.slots.iter().position(|slot| {
            slot.as_ref()
                .is_some_and(|region| region.active && region.contains(addr))
        })
    }

    /// Number of active regions.
    #[must_use]
    pub fn count(&self) -> usize {
        self.slots
            .iter()
            .flatten()
            .filter(|region| region.active)
            .count()
    }

    /// Enables or disables decode for the region in slot `index`.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::UnknownMmioRegion`] when the slot is empty.
    pub fn set_active(&mut self, index: usize, active: bool) -> Result<(), HostError> {
        let region = self
            .slots
            .get_mut(index)
            .and_then(Option::as_mut)
            .ok_or(HostError::UnknownMmioRegion(
                u32::try_from(index).unwrap_or(u32::MAX),
            ))?;
        region.active = active;
        Ok(())
    }

    /// Reads through the handler in slot `index`; failures read as all-ones.
    pub(crate) fn read(&mut self, index: usize, addr: u32, width: Width) -> u32 {
        let Some(region) = self.slots.get_mut(index).and_then(Option::as_mut) else {
            return width.mask();
        };
        let offset = addr - region.base;
        match region.handler.read(addr, offset, width) {
            Ok(value) => value & width.mask(),
            Err(err) => {
                warn!(addr, region = %region.name, %err, "mmio read failed");
                width.mask()
            }
        }
    }

    /// Writes through the handler in slot `index`; failures are dropped.
    pub(crate) fn write(&mut self, index: usize, addr: u32, value: u32, width: Width) {
        let Some(region) = self.slots.get_mut(index).and_then(Option::as_mut) else {
            return;
        };
        let offset = addr - region.base;
        if let Err(err) = region.handler.write(addr, offset, value & width.mask(), width) {
            warn!(addr, region = %region.name, %err, "mmio write failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::{MmioError, MmioHandler, MmioTable, MMIO_REGION_CAPACITY};
    use crate::{HostError, Width};

    #[derive(Default)]
    struct Recorder {
        log: Rc<RefCell<Vec<(u32, u32, u32, Width)>>>,
    }

    impl MmioHandler for Recorder {
        fn read(&mut self, _addr: u32, offset: u32, _width: Width) -> Result<u32, MmioError> {
            Ok(0xA500 | offset)
        }

        fn write(
            &mut self,
            addr: u32,
            offset: u32,
            value: u32,
            width: Width,
        ) -> Result<(), MmioError> {
            self.log.borrow_mut().push((addr, offset, value, width));
            Ok(())
        }
    }

    struct Broken;

    impl MmioHandler for Broken {
        fn read(&mut self, _addr: u32, _offset: u32, _width: Width) -> Result<u32, MmioError> {
            Err(MmioError::ReadFailed)
        }

        fn write(
            &mut self,
            _addr: u32,
            _offset: u32,
            _value: u32,
            _width: Width,
        ) -> Result<(), MmioError> {
            Err(MmioError::WriteFailed)
        }
    }

    #[test]
    fn register_rejects_empty_region_and_full_table() {
        let mut table = MmioTable::default();
        assert_eq!(
            table.register(0x1000, 0, Box::new(Broken), "empty"),
            Err(HostError::EmptyMmioRegion)
        );
        for i in 0..MMIO_REGION_CAPACITY {
            let base = u32::try_from(i).expect("small index") * 0x100;
            assert_eq!(table.register(base, 0x10, Box::new(Broken), "dev"), Ok(i));
        }
        assert_eq!(
            table.register(0xF000, 0x10, Box::new(Broken), "overflow"),
            Err(HostError::MmioTableFull)
        );
    }

    #[test]
    fn freed_slot_is_reused_first() {
        let mut table = MmioTable::default();
        let a = table.register(0x100, 4, Box::new(Broken), "a").expect("slot");
        let b = table.register(0x200, 4, Box::new(Broken), "b").expect("slot");
        table.unregister(a).expect("registered");
        assert_eq!(table.count(), 1);
        assert_eq!(table.register(0x300, 4, Box::new(Broken), "c"), Ok(a));
        assert_eq!(table.get(b).map(|r| r.name().to_owned()), Some("b".to_owned()));
    }

    #[test]
    fn find_skips_inactive_regions() {
        let mut table = MmioTable::default();
        let idx = table
            .register(0x8000, 0x20, Box::new(Broken), "uart")
            .expect("slot");
        assert_eq!(table.find(0x801F), Some(idx));
        assert_eq!(table.find(0x8020), None);
        table.set_active(idx, false).expect("registered");
        assert_eq!(table.find(0x8000), None);
        assert_eq!(table.count(), 0);
        table.unregister_addr(0x8000).expect("registered");
        assert_eq!(
            table.unregister_addr(0x8000),
            Err(HostError::UnknownMmioRegion(0x8000))
        );
    }

    #[test]
    fn handlers_see_region_offsets_and_widths() {
        let recorder = Recorder::default();
        let log = Rc::clone(&recorder.log);
        let mut table = MmioTable::default();
        let idx = table
            .register(0x4000, 0x100, Box::new(recorder), "rec")
            .expect("slot");

        assert_eq!(table.read(idx, 0x4010, Width::Byte), 0x10);
        assert_eq!(table.read(idx, 0x4010, Width::Word), 0xA510);
        table.write(idx, 0x4004, 0x1234_5678, Width::Word);
        assert_eq!(log.borrow().as_slice(), &[(0x4004, 4, 0x5678, Width::Word)]);
    }

    #[test]
    fn failing_handler_reads_all_ones() {
        let mut table = MmioTable::default();
        let idx = table.register(0, 8, Box::new(Broken), "broken").expect("slot");
        assert_eq!(table.read(idx, 2, Width::Word), 0xFFFF);
        table.write(idx, 2, 0, Width::Byte);
    }
}
