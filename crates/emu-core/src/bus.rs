//! Memory bus interface.

/// Byte-addressable memory bus over a 16-bit address space.
///
/// The bus handles address decoding and routing — cartridge mapping,
/// RAM, memory-mapped I/O registers all live behind it. Both
/// operations are infallible from the CPU's point of view; a bus that
/// wants to report a bad access does so out-of-band.
pub trait Bus {
    /// Read a byte from the given address.
    fn read(&mut self, address: u16) -> u8;

    /// Write a byte to the given address.
    fn write(&mut self, address: u16, value: u8);
}
