//! Address-decoded memory bus: main memory plus a list of mapped
//! peripheral ranges, first match wins, main memory as fallback.

use crate::interrupt::InterruptHandle;
use std::cell::RefCell;
use std::rc::Rc;

/// Anything mapped onto the bus. Every call receives the untranslated,
/// absolute address; a peripheral is responsible for subtracting its
/// own base if its internal storage is zero-based.
pub trait Peripheral {
    fn clock(&mut self, cycles: u32, interrupts: &InterruptHandle);
    fn read(&mut self, addr: u32, buf: &mut [u8]);
    fn write(&mut self, addr: u32, buf: &[u8], interrupts: &InterruptHandle);
}

/// Raised when an access falls outside main memory and every mapped
/// peripheral range. Carries the faulting address for `Abort(addr)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BusFault {
    pub addr: u32,
}

#[derive(Debug)]
pub struct MountError {
    pub message: String,
}

struct Mapping {
    start: u32,
    len: u32,
    peripheral: Rc<RefCell<dyn Peripheral>>,
}

impl Mapping {
    fn contains(&self, addr: u32, size: u32) -> bool {
        let end = match self.start.checked_add(self.len) {
            Some(e) => e,
            None => return false,
        };
        let access_end = match addr.checked_add(size) {
            Some(e) => e,
            None => return false,
        };
        addr >= self.start && access_end <= end
    }

    fn overlaps(&self, start: u32, len: u32) -> bool {
        let self_end = self.start as u64 + self.len as u64;
        let other_end = start as u64 + len as u64;
        (start as u64) < self_end && (self.start as u64) < other_end
    }
}

pub struct MemoryBus {
    main_memory: Vec<u8>,
    mappings: Vec<Mapping>,
}

impl MemoryBus {
    pub fn new(main_memory_size: u32) -> MemoryBus {
        MemoryBus {
            main_memory: vec![0; main_memory_size as usize],
            mappings: Vec::new(),
        }
    }

    pub fn main_memory_size(&self) -> u32 {
        self.main_memory.len() as u32
    }

    pub fn mount(
        &mut self,
        start: u32,
        len: u32,
        peripheral: Rc<RefCell<dyn Peripheral>>,
    ) -> Result<(), MountError> {
        if self.mappings.iter().any(|m| m.overlaps(start, len)) {
            let message = format!(
                "peripheral range [{:#x}, {:#x}) overlaps an existing mapping",
                start,
                start as u64 + len as u64
            );
            log::warn!("{}", message);
            return Err(MountError { message });
        }
        self.mappings.push(Mapping {
            start,
            len,
            peripheral,
        });
        Ok(())
    }

    fn find_mapping(&self, addr: u32, size: u32) -> Option<&Mapping> {
        self.mappings.iter().find(|m| m.contains(addr, size))
    }

    pub fn read(&mut self, addr: u32, buf: &mut [u8]) -> Result<(), BusFault> {
        let size = buf.len() as u32;
        if let Some(idx) = self.mappings.iter().position(|m| m.contains(addr, size)) {
            self.mappings[idx].peripheral.borrow_mut().read(addr, buf);
            return Ok(());
        }
        self.read_main_memory(addr, buf)
    }

    pub fn write(
        &mut self,
        addr: u32,
        buf: &[u8],
        interrupts: &InterruptHandle,
    ) -> Result<(), BusFault> {
        let size = buf.len() as u32;
        if let Some(idx) = self.mappings.iter().position(|m| m.contains(addr, size)) {
            self.mappings[idx]
                .peripheral
                .borrow_mut()
                .write(addr, buf, interrupts);
            return Ok(());
        }
        self.write_main_memory(addr, buf)
    }

    fn read_main_memory(&self, addr: u32, buf: &mut [u8]) -> Result<(), BusFault> {
        let end = addr as u64 + buf.len() as u64;
        if end > self.main_memory.len() as u64 {
            return Err(BusFault { addr });
        }
        let start = addr as usize;
        buf.copy_from_slice(&self.main_memory[start..start + buf.len()]);
        Ok(())
    }

    fn write_main_memory(&mut self, addr: u32, buf: &[u8]) -> Result<(), BusFault> {
        let end = addr as u64 + buf.len() as u64;
        if end > self.main_memory.len() as u64 {
            return Err(BusFault { addr });
        }
        let start = addr as usize;
        self.main_memory[start..start + buf.len()].copy_from_slice(buf);
        Ok(())
    }

    /// Copies `data` into main memory starting at `addr`, used by the
    /// loader to place object-file sections before the first reset.
    pub fn load(&mut self, addr: u32, data: &[u8]) -> Result<(), BusFault> {
        self.write_main_memory(addr, data)
    }

    pub fn clear_main_memory(&mut self) {
        for byte in self.main_memory.iter_mut() {
            *byte = 0;
        }
    }

    pub fn clock(&mut self, cycles: u32, interrupts: &InterruptHandle) {
        for mapping in self.mappings.iter() {
            mapping.peripheral.borrow_mut().clock(cycles, interrupts);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    struct Echo;
    impl Peripheral for Echo {
        fn clock(&mut self, _cycles: u32, _interrupts: &InterruptHandle) {}
        fn read(&mut self, _addr: u32, buf: &mut [u8]) {
            for b in buf.iter_mut() {
                *b = 0xAB;
            }
        }
        fn write(&mut self, _addr: u32, _buf: &[u8], _interrupts: &InterruptHandle) {}
    }

    #[test]
    fn main_memory_round_trips() {
        let mut bus = MemoryBus::new(1024);
        let handle = crate::interrupt::new_handle();
        bus.write(0x100, &[0xEF, 0xBE, 0xAD, 0xDE], &handle).unwrap();
        let mut buf = [0u8; 4];
        bus.read(0x100, &mut buf).unwrap();
        assert_eq!(buf, [0xEF, 0xBE, 0xAD, 0xDE]);
    }

    #[test]
    fn out_of_range_access_aborts() {
        let mut bus = MemoryBus::new(16);
        let mut buf = [0u8; 4];
        assert_eq!(bus.read(100, &mut buf), Err(BusFault { addr: 100 }));
    }

    #[test]
    fn peripheral_mapping_wins_over_main_memory() {
        let mut bus = MemoryBus::new(1024);
        bus.mount(0x200, 4, Rc::new(RefCell::new(Echo))).unwrap();
        let mut buf = [0u8; 4];
        bus.read(0x200, &mut buf).unwrap();
        assert_eq!(buf, [0xAB; 4]);
    }

    #[test]
    fn overlapping_mount_is_rejected() {
        let mut bus = MemoryBus::new(1024);
        bus.mount(0x200, 8, Rc::new(RefCell::new(Echo))).unwrap();
        assert!(bus.mount(0x204, 4, Rc::new(RefCell::new(Echo))).is_err());
    }
}
