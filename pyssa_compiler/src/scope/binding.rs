//! Per-name binding facts collected by the first resolver pass.

use pyssa_bytecode::Opcode;
use std::sync::Arc;

/// Flags recording how a name is accessed within one procedure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BindingFlags(u16);

impl BindingFlags {
    pub const NONE: BindingFlags = BindingFlags(0);
    /// Read.
    pub const LOAD: BindingFlags = BindingFlags(1 << 0);
    /// Written.
    pub const STORE: BindingFlags = BindingFlags(1 << 1);
    /// Deleted.
    pub const DELETE: BindingFlags = BindingFlags(1 << 2);
    /// Accessed via a `*_NAME` operation.
    pub const VIA_NAME: BindingFlags = BindingFlags(1 << 3);
    /// Accessed via a `*_FAST` operation.
    pub const VIA_FAST: BindingFlags = BindingFlags(1 << 4);
    /// Accessed via a `*_GLOBAL` operation.
    pub const VIA_GLOBAL: BindingFlags = BindingFlags(1 << 5);
    /// Accessed via a cell operation.
    pub const VIA_CELL: BindingFlags = BindingFlags(1 << 6);

    /// Every access-route flag.
    pub const ROUTES: BindingFlags = BindingFlags(
        Self::VIA_NAME.0 | Self::VIA_FAST.0 | Self::VIA_GLOBAL.0 | Self::VIA_CELL.0,
    );

    #[inline]
    pub const fn contains(self, other: BindingFlags) -> bool {
        (self.0 & other.0) == other.0
    }

    #[inline]
    pub const fn intersects(self, other: BindingFlags) -> bool {
        (self.0 & other.0) != 0
    }

    #[inline]
    pub const fn union(self, other: BindingFlags) -> BindingFlags {
        BindingFlags(self.0 | other.0)
    }

    #[inline]
    pub const fn intersection(self, other: BindingFlags) -> BindingFlags {
        BindingFlags(self.0 & other.0)
    }

    /// Number of distinct access routes recorded.
    #[inline]
    pub const fn route_count(self) -> u32 {
        self.intersection(Self::ROUTES).0.count_ones()
    }

    /// The access and route flags an opcode contributes, if it names a scoped variable.
    pub fn for_opcode(opcode: Opcode) -> Option<BindingFlags> {
        use BindingFlags as F;
        Some(match opcode {
            Opcode::LoadName => F::LOAD | F::VIA_NAME,
            Opcode::StoreName => F::STORE | F::VIA_NAME,
            Opcode::DeleteName => F::DELETE | F::VIA_NAME,
            Opcode::LoadFast => F::LOAD | F::VIA_FAST,
            Opcode::StoreFast => F::STORE | F::VIA_FAST,
            Opcode::DeleteFast => F::DELETE | F::VIA_FAST,
            Opcode::LoadGlobal => F::LOAD | F::VIA_GLOBAL,
            Opcode::StoreGlobal => F::STORE | F::VIA_GLOBAL,
            Opcode::DeleteGlobal => F::DELETE | F::VIA_GLOBAL,
            Opcode::LoadDeref | Opcode::LoadClassDeref | Opcode::LoadClosure => {
                F::LOAD | F::VIA_CELL
            }
            Opcode::StoreDeref => F::STORE | F::VIA_CELL,
            _ => return None,
        })
    }
}

impl std::ops::BitOr for BindingFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        self.union(rhs)
    }
}

impl std::ops::BitOrAssign for BindingFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Everything the first pass learned about one name.
#[derive(Debug, Clone)]
pub struct Binding {
    pub name: Arc<str>,
    pub flags: BindingFlags,
    /// Offset and opcode of the first access.
    pub first: (u32, Opcode),
    /// Offset and opcode of the first access through a second route, if any.
    pub conflict: Option<(u32, Opcode)>,
}

impl Binding {
    pub fn new(name: Arc<str>, offset: u32, opcode: Opcode) -> Self {
        Self {
            name,
            flags: BindingFlags::NONE,
            first: (offset, opcode),
            conflict: None,
        }
    }

    /// Record one access.
    pub fn record(&mut self, flags: BindingFlags, offset: u32, opcode: Opcode) {
        let before = self.flags.route_count();
        self.flags |= flags;
        if before > 0 && self.flags.route_count() > before && self.conflict.is_none() {
            self.conflict = Some((offset, opcode));
        }
    }
}
