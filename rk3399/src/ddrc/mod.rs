//! # Denali DDR controller, protocol interface and PHY
//!
//! The three blocks are large flat arrays of 32-bit registers. The raw words are accessed
//! through [MmioDenaliCtl::read_raw] and friends, which is mostly used to copy the vendor
//! computed register images. Every register field which is computed at run-time has a typed
//! [bitbybit] definition in the [ctl], [pi] and [phy] modules, accessed through the
//! [Register] and [SliceRegister] traits.
pub const DDRC0_BASE_ADDR: usize = 0xFFA8_0000;
pub const DDRC1_BASE_ADDR: usize = 0xFFA8_8000;
pub const PI_OFFSET: usize = 0x800;
pub const PHY_OFFSET: usize = 0x2000;

pub const CTL_REG_COUNT: usize = 332;
pub const PI_REG_COUNT: usize = 200;
pub const PHY_REG_COUNT: usize = 959;

/// Word distance between two replicated PHY slices.
pub const PHY_SLICE_STRIDE: usize = 128;
/// Number of data (byte lane) slices of the PHY.
pub const PHY_DATA_SLICES: usize = 4;
/// Number of address/control slices of the PHY.
pub const PHY_ADDR_SLICES: usize = 3;

#[inline]
pub const fn ddrc_base_addr(channel: usize) -> usize {
    match channel {
        0 => DDRC0_BASE_ADDR,
        _ => DDRC1_BASE_ADDR,
    }
}

/// A typed register at a fixed word offset of a Denali block.
pub trait Register: Copy {
    /// Word offset of the register inside its block.
    const OFFSET: usize;

    fn from_raw(raw: u32) -> Self;
    fn to_raw(self) -> u32;
}

/// A typed register which is replicated once per PHY slice.
///
/// [Register::OFFSET] is the offset of the first slice, the other slices follow with a
/// distance of [PHY_SLICE_STRIDE] words.
pub trait SliceRegister: Register {
    const SLICES: usize;
}

/// Implements [Register] for a [bitbybit] bitfield.
macro_rules! register {
    ($ty:ident, $offset:expr) => {
        impl $crate::ddrc::Register for $ty {
            const OFFSET: usize = $offset;

            #[inline]
            fn from_raw(raw: u32) -> Self {
                Self::new_with_raw_value(raw)
            }

            #[inline]
            fn to_raw(self) -> u32 {
                self.raw_value()
            }
        }
    };
}

/// Implements [Register] and [SliceRegister] for a register replicated per PHY slice.
macro_rules! slice_register {
    ($ty:ident, $offset:expr, $slices:expr) => {
        register!($ty, $offset);

        impl $crate::ddrc::SliceRegister for $ty {
            const SLICES: usize = $slices;
        }
    };
}

pub(crate) use {register, slice_register};

pub mod ctl;
pub mod phy;
pub mod pi;

/// Generates a Denali register block and its raw and typed accessors.
macro_rules! denali_block {
    ($(#[$meta:meta])* $name:ident, $mmio:ident, $count:expr, $offset:expr) => {
        $(#[$meta])*
        #[derive(derive_mmio::Mmio)]
        #[repr(C)]
        pub struct $name {
            regs: [u32; $count],
        }

        static_assertions::const_assert_eq!(core::mem::size_of::<$name>(), $count * 4);

        impl $name {
            /// Number of 32-bit registers in this block.
            pub const REG_COUNT: usize = $count;

            /// Create a new MMIO handle for the block of the given DDR channel.
            ///
            /// # Safety
            ///
            /// This API can be used to potentially create a driver to the same peripheral
            /// structure from multiple threads. The user must ensure that concurrent accesses are
            /// safe and do not interfere with each other.
            pub const unsafe fn new_mmio_fixed(channel: usize) -> $mmio<'static> {
                unsafe { Self::new_mmio_at(ddrc_base_addr(channel) + $offset) }
            }
        }

        impl $mmio<'_> {
            /// Reads the raw register at word index `index`.
            ///
            /// Panics if the index is out of range of the block.
            #[inline]
            pub fn read_raw(&mut self, index: usize) -> u32 {
                assert!(index < $count, "register index {} out of range", index);
                // Safety: Index was checked above.
                unsafe { self.read_regs_unchecked(index) }
            }

            /// Writes the raw register at word index `index`.
            ///
            /// Panics if the index is out of range of the block.
            #[inline]
            pub fn write_raw(&mut self, index: usize, value: u32) {
                assert!(index < $count, "register index {} out of range", index);
                // Safety: Index was checked above.
                unsafe { self.write_regs_unchecked(index, value) }
            }

            /// Clears the bits of `clear` and then sets the bits of `set`.
            #[inline]
            pub fn clrsetbits_raw(&mut self, index: usize, clear: u32, set: u32) {
                let value = self.read_raw(index);
                self.write_raw(index, (value & !clear) | set);
            }

            /// Copies the words of `range` from a register image with the same layout.
            pub fn copy_from_image(
                &mut self,
                image: &[u32; $count],
                range: core::ops::RangeInclusive<usize>,
            ) {
                for index in range {
                    self.write_raw(index, image[index]);
                }
            }

            #[inline]
            pub fn read<R: Register>(&mut self) -> R {
                R::from_raw(self.read_raw(R::OFFSET))
            }

            #[inline]
            pub fn write<R: Register>(&mut self, value: R) {
                self.write_raw(R::OFFSET, value.to_raw());
            }

            #[inline]
            pub fn modify<R: Register>(&mut self, f: impl FnOnce(R) -> R) {
                let value = self.read::<R>();
                self.write(f(value));
            }

            /// Reads the instance of a replicated register which belongs to `slice`.
            #[inline]
            pub fn read_slice<R: SliceRegister>(&mut self, slice: usize) -> R {
                assert!(slice < R::SLICES);
                R::from_raw(self.read_raw(R::OFFSET + slice * PHY_SLICE_STRIDE))
            }

            #[inline]
            pub fn modify_slice<R: SliceRegister>(&mut self, slice: usize, f: impl FnOnce(R) -> R) {
                assert!(slice < R::SLICES);
                let index = R::OFFSET + slice * PHY_SLICE_STRIDE;
                let value = R::from_raw(self.read_raw(index));
                self.write_raw(index, f(value).to_raw());
            }

            /// Applies the same modification to every slice of a replicated register.
            #[inline]
            pub fn modify_all_slices<R: SliceRegister>(&mut self, mut f: impl FnMut(R) -> R) {
                for slice in 0..R::SLICES {
                    self.modify_slice(slice, &mut f);
                }
            }
        }
    };
}

denali_block!(
    /// Denali DDR controller (CTL) registers.
    DenaliCtl,
    MmioDenaliCtl,
    CTL_REG_COUNT,
    0
);

denali_block!(
    /// Denali protocol interface (PI) registers.
    DenaliPi,
    MmioDenaliPi,
    PI_REG_COUNT,
    PI_OFFSET
);

denali_block!(
    /// Denali PHY registers.
    DenaliPhy,
    MmioDenaliPhy,
    PHY_REG_COUNT,
    PHY_OFFSET
);

impl MmioDenaliPhy<'_> {
    /// Raw word index of `offset` inside data slice `slice`.
    #[inline]
    pub const fn data_slice_index(offset: usize, slice: usize) -> usize {
        offset + slice * PHY_SLICE_STRIDE
    }
}
